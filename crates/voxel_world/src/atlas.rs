//! Texture atlas: maps a voxel type + face to UV rectangles in a texture grid.

use crate::voxel::{self, AtlasSlot, Face, VoxelId};
use std::collections::HashMap;

/// Rectangle in a texture atlas (normalized 0..1 coordinates).
#[derive(Debug, Clone, Copy)]
pub struct AtlasRect {
    pub u: f32,
    pub v: f32,
    pub w: f32,
    pub h: f32,
}

impl AtlasRect {
    pub fn new(u: f32, v: f32, w: f32, h: f32) -> Self {
        Self { u, v, w, h }
    }

    /// UV coordinates of the rect's 4 corners: BL, BR, TR, TL.
    pub fn get_uvs(&self) -> [[f32; 2]; 4] {
        let u0 = self.u;
        let v0 = self.v;
        let u1 = self.u + self.w;
        let v1 = self.v + self.h;
        [[u0, v0], [u1, v0], [u1, v1], [u0, v1]]
    }

    pub fn bottom_left(&self) -> [f32; 2] {
        [self.u, self.v]
    }
}

/// Texture atlas mapping (voxel type, atlas slot) -> atlas rectangle.
///
/// Every voxel type occupies one tile per distinct [`AtlasSlot`] its
/// [`voxel::FacePattern`] requires (main always, side/bottom only when the
/// pattern calls for them). Unmapped (type, slot) pairs fall back to a
/// single reserved tile.
pub struct TextureAtlas {
    mapping: HashMap<(VoxelId, AtlasSlot), AtlasRect>,
    fallback: AtlasRect,
    tile_size: f32,
}

const GRID: usize = 16;

impl TextureAtlas {
    /// Build a 16x16-tile atlas, assigning consecutive tiles to each voxel
    /// type in registry order for every atlas slot its face pattern needs.
    pub fn new_16x16() -> Self {
        let tile_size = 1.0 / GRID as f32;
        let mut atlas = Self {
            mapping: HashMap::new(),
            fallback: AtlasRect::new(0.0, (GRID - 1) as f32 * tile_size, tile_size, tile_size),
            tile_size,
        };

        let mut next_tile: usize = 0;
        for id in 0u16..=255 {
            let id = id as VoxelId;
            if id == voxel::AIR {
                continue;
            }
            let props = voxel::properties(id);
            if props.name == "unknown" {
                continue;
            }
            let mut slots = vec![AtlasSlot::Main];
            if props.face_pattern.requires_side_atlas() {
                slots.push(AtlasSlot::Side);
            }
            if props.face_pattern.requires_bottom_atlas() {
                slots.push(AtlasSlot::Bottom);
            }
            for slot in slots {
                let (tx, ty) = (next_tile % GRID, next_tile / GRID);
                atlas.mapping.insert(
                    (id, slot),
                    AtlasRect::new(tx as f32 * tile_size, ty as f32 * tile_size, tile_size, tile_size),
                );
                next_tile += 1;
            }
        }
        atlas
    }

    fn slot_rect(&self, id: VoxelId, slot: AtlasSlot) -> AtlasRect {
        self.mapping.get(&(id, slot)).copied().unwrap_or(self.fallback)
    }

    /// Atlas rectangle a given voxel face should sample.
    pub fn rect_for_face(&self, id: VoxelId, face: Face) -> AtlasRect {
        let slot = voxel::properties(id).atlas_slot_for(face);
        self.slot_rect(id, slot)
    }

    pub fn uvs_for_face(&self, id: VoxelId, face: Face) -> [[f32; 2]; 4] {
        self.rect_for_face(id, face).get_uvs()
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }
}

impl Default for TextureAtlas {
    fn default() -> Self {
        Self::new_16x16()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_block_same_rect_every_face() {
        let atlas = TextureAtlas::new_16x16();
        let top = atlas.rect_for_face(1, Face::Top);
        let side = atlas.rect_for_face(1, Face::North);
        assert_eq!((top.u, top.v), (side.u, side.v));
    }

    #[test]
    fn grass_top_bottom_side_all_differ() {
        let atlas = TextureAtlas::new_16x16();
        let top = atlas.rect_for_face(3, Face::Top);
        let bottom = atlas.rect_for_face(3, Face::Bottom);
        let side = atlas.rect_for_face(3, Face::North);
        assert_ne!((top.u, top.v), (bottom.u, bottom.v));
        assert_ne!((top.u, top.v), (side.u, side.v));
        assert_ne!((bottom.u, bottom.v), (side.u, side.v));
    }

    #[test]
    fn unknown_block_falls_back() {
        let atlas = TextureAtlas::new_16x16();
        let rect = atlas.rect_for_face(250, Face::Top);
        assert_eq!((rect.u, rect.v), (atlas.fallback.u, atlas.fallback.v));
    }
}
