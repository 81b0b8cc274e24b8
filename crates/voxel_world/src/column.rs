//! A fixed vertical stack of segments at one (X,Z) footprint.

use crate::chunk::{ChunkSegment, SEGMENT_SIZE};

/// Number of segments stacked vertically in one column (256 voxels tall).
pub const COLUMN_HEIGHT: usize = 8;

/// World-space coordinate of a column: its segment-aligned (X,Z) base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnKey {
    pub x: i64,
    pub z: i64,
}

impl ColumnKey {
    pub fn new(x: i64, z: i64) -> Self {
        ColumnKey { x, z }
    }

    pub fn from_world(world_x: i64, world_z: i64) -> Self {
        let s = SEGMENT_SIZE as i64;
        ColumnKey::new(world_x.div_euclid(s) * s, world_z.div_euclid(s) * s)
    }
}

/// All segments at one (X,Z) footprint, pre-materialised to AIR on
/// construction so cross-segment sampling never needs a presence check.
pub struct ChunkColumn {
    base_x: i64,
    base_z: i64,
    segments: Vec<ChunkSegment>,
}

impl ChunkColumn {
    pub fn new(base_x: i64, base_z: i64) -> Self {
        let mut segments = Vec::with_capacity(COLUMN_HEIGHT);
        for _ in 0..COLUMN_HEIGHT {
            segments.push(ChunkSegment::new_empty());
        }
        ChunkColumn { base_x, base_z, segments }
    }

    pub fn base(&self) -> (i64, i64) {
        (self.base_x, self.base_z)
    }

    pub fn key(&self) -> ColumnKey {
        ColumnKey::new(self.base_x, self.base_z)
    }

    pub fn segment(&self, segment_y: i32) -> Option<&ChunkSegment> {
        if segment_y < 0 || segment_y as usize >= COLUMN_HEIGHT {
            return None;
        }
        Some(&self.segments[segment_y as usize])
    }

    pub fn segment_mut(&mut self, segment_y: i32) -> Option<&mut ChunkSegment> {
        if segment_y < 0 || segment_y as usize >= COLUMN_HEIGHT {
            return None;
        }
        Some(&mut self.segments[segment_y as usize])
    }

    pub fn segments(&self) -> impl Iterator<Item = (usize, &ChunkSegment)> {
        self.segments.iter().enumerate()
    }

    pub fn segments_mut(&mut self) -> impl Iterator<Item = (usize, &mut ChunkSegment)> {
        self.segments.iter_mut().enumerate()
    }

    fn world_to_local(&self, world_x: i64, world_y: i64, world_z: i64) -> (i32, usize, usize, usize) {
        let s = SEGMENT_SIZE as i64;
        let segment_y = world_y.div_euclid(s) as i32;
        let lx = (world_x - self.base_x) as usize;
        let ly = world_y.rem_euclid(s) as usize;
        let lz = (world_z - self.base_z) as usize;
        (segment_y, lx, ly, lz)
    }

    /// AIR for any vertical range outside `[0, COLUMN_HEIGHT)`.
    pub fn get_voxel(&self, world_x: i64, world_y: i64, world_z: i64) -> crate::voxel::VoxelId {
        let (segment_y, lx, ly, lz) = self.world_to_local(world_x, world_y, world_z);
        match self.segment(segment_y) {
            Some(seg) => seg.get(lx, ly, lz),
            None => crate::voxel::AIR,
        }
    }

    /// Silent no-op outside `[0, COLUMN_HEIGHT)`.
    pub fn set_voxel(&mut self, world_x: i64, world_y: i64, world_z: i64, value: crate::voxel::VoxelId) {
        let (segment_y, lx, ly, lz) = self.world_to_local(world_x, world_y, world_z);
        if let Some(seg) = self.segment_mut(segment_y) {
            seg.set(lx, ly, lz, value);
        }
    }
}
