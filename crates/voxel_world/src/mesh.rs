//! Shared mesh types and the four meshing algorithms.
//!
//! Every algorithm implements the same signature: given a segment, a texture
//! atlas, and a cross-segment voxel sampler, produce a [`Mesh`]. They differ
//! only in how many quads they emit for the same visible surface.

use crate::atlas::TextureAtlas;
use crate::chunk::{ChunkSegment, SEGMENT_SIZE};
use crate::voxel::{self, Face, VoxelId};
use glam::IVec3;

/// One mesh vertex. UVs are split so the renderer can tile a merged quad's
/// single atlas tile across its full `quad_uv` extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub quad_uv: [f32; 2],
    pub atlas_tile_origin_uv: [f32; 2],
    pub light: f32,
    pub atlas_id: u8,
}

#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MeshStats {
    pub vertex_count: usize,
    pub triangle_count: usize,
}

impl Mesh {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn stats(&self) -> MeshStats {
        MeshStats {
            vertex_count: self.vertices.len(),
            triangle_count: self.indices.len() / 3,
        }
    }

    fn push_quad(&mut self, positions: [[f32; 3]; 4], normal: [f32; 3], quad_w: f32, quad_h: f32, tile_origin: [f32; 2], atlas_id: u8) {
        let base = self.vertices.len() as u32;
        let uv_corners = [[0.0, 0.0], [quad_w, 0.0], [quad_w, quad_h], [0.0, quad_h]];
        for (p, uv) in positions.iter().zip(uv_corners.iter()) {
            self.vertices.push(Vertex {
                position: *p,
                normal,
                quad_uv: *uv,
                atlas_tile_origin_uv: tile_origin,
                light: 1.0,
                atlas_id,
            });
        }
        self.indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
}

/// The four interchangeable meshing strategies. See module docs for shared
/// contract. `GreedyLegacy` is known to drop faces in some concave
/// topologies and is kept only for comparison against `TwoPhaseGreedy`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum MeshAlgorithm {
    Naive,
    CulledFace,
    GreedyLegacy,
    #[default]
    TwoPhaseGreedy,
}

/// Build a mesh for `segment` at `chunk_coord` (segment-grid coordinates),
/// sampling neighbouring voxels (including across segment boundaries)
/// through `sample`.
pub fn mesh_segment(
    algorithm: MeshAlgorithm,
    segment: &ChunkSegment,
    atlas: &TextureAtlas,
    sample: impl Fn(i32, i32, i32) -> VoxelId,
    chunk_coord: IVec3,
) -> Mesh {
    match algorithm {
        MeshAlgorithm::Naive => naive::mesh(segment, atlas, sample),
        MeshAlgorithm::CulledFace => culled_face::mesh(segment, atlas, sample),
        MeshAlgorithm::GreedyLegacy => greedy_legacy::mesh(segment, atlas, sample, chunk_coord),
        MeshAlgorithm::TwoPhaseGreedy => two_phase_greedy::mesh(segment, atlas, sample, chunk_coord),
    }
}

const S: i32 = SEGMENT_SIZE as i32;

/// Unit offsets and the four local corner vectors for each of the six
/// cardinal directions, in an order shared by the naive and culled-face
/// meshers.
const FACE_DIRS: [(i32, i32, i32); 6] = [
    (1, 0, 0),
    (-1, 0, 0),
    (0, 1, 0),
    (0, -1, 0),
    (0, 0, 1),
    (0, 0, -1),
];

fn face_corners(x: i32, y: i32, z: i32, dir: (i32, i32, i32)) -> [[f32; 3]; 4] {
    let (fx, fy, fz) = (x as f32, y as f32, z as f32);
    match dir {
        (1, 0, 0) => [[fx + 1.0, fy, fz], [fx + 1.0, fy, fz + 1.0], [fx + 1.0, fy + 1.0, fz + 1.0], [fx + 1.0, fy + 1.0, fz]],
        (-1, 0, 0) => [[fx, fy, fz + 1.0], [fx, fy, fz], [fx, fy + 1.0, fz], [fx, fy + 1.0, fz + 1.0]],
        (0, 1, 0) => [[fx, fy + 1.0, fz], [fx + 1.0, fy + 1.0, fz], [fx + 1.0, fy + 1.0, fz + 1.0], [fx, fy + 1.0, fz + 1.0]],
        (0, -1, 0) => [[fx, fy, fz + 1.0], [fx + 1.0, fy, fz + 1.0], [fx + 1.0, fy, fz], [fx, fy, fz]],
        (0, 0, 1) => [[fx + 1.0, fy, fz + 1.0], [fx, fy, fz + 1.0], [fx, fy + 1.0, fz + 1.0], [fx + 1.0, fy + 1.0, fz + 1.0]],
        _ => [[fx, fy, fz], [fx + 1.0, fy, fz], [fx + 1.0, fy + 1.0, fz], [fx, fy + 1.0, fz]],
    }
}

fn emit_unit_face(mesh: &mut Mesh, atlas: &TextureAtlas, id: VoxelId, x: i32, y: i32, z: i32, dir: (i32, i32, i32)) {
    let face = Face::from_normal(dir.0, dir.1, dir.2);
    let rect = atlas.rect_for_face(id, face);
    mesh.push_quad(
        face_corners(x, y, z, dir),
        [dir.0 as f32, dir.1 as f32, dir.2 as f32],
        1.0,
        1.0,
        rect.bottom_left(),
        voxel::properties(id).atlas_slot_for(face) as u8,
    );
}

mod naive {
    use super::*;

    pub fn mesh(segment: &ChunkSegment, atlas: &TextureAtlas, _sample: impl Fn(i32, i32, i32) -> VoxelId) -> Mesh {
        let mut mesh = Mesh::default();
        for z in 0..S {
            for y in 0..S {
                for x in 0..S {
                    let id = segment.get(x as usize, y as usize, z as usize);
                    if !voxel::is_solid(id) {
                        continue;
                    }
                    for dir in FACE_DIRS {
                        emit_unit_face(&mut mesh, atlas, id, x, y, z, dir);
                    }
                }
            }
        }
        mesh
    }
}

mod culled_face {
    use super::*;

    pub fn mesh(segment: &ChunkSegment, atlas: &TextureAtlas, sample: impl Fn(i32, i32, i32) -> VoxelId) -> Mesh {
        let mut mesh = Mesh::default();
        for z in 0..S {
            for y in 0..S {
                for x in 0..S {
                    let id = segment.get(x as usize, y as usize, z as usize);
                    if !voxel::is_solid(id) {
                        continue;
                    }
                    for dir in FACE_DIRS {
                        let (nx, ny, nz) = (x + dir.0, y + dir.1, z + dir.2);
                        let neighbor = sample_local_or(segment, &sample, nx, ny, nz);
                        if !voxel::is_solid(neighbor) {
                            emit_unit_face(&mut mesh, atlas, id, x, y, z, dir);
                        }
                    }
                }
            }
        }
        mesh
    }
}

/// Sample a coordinate that may lie inside or outside the segment: inside
/// goes through the segment directly, outside goes through the
/// cross-segment `sample` closure.
fn sample_local_or(segment: &ChunkSegment, sample: &impl Fn(i32, i32, i32) -> VoxelId, x: i32, y: i32, z: i32) -> VoxelId {
    if (0..S).contains(&x) && (0..S).contains(&y) && (0..S).contains(&z) {
        segment.get(x as usize, y as usize, z as usize)
    } else {
        sample(x, y, z)
    }
}

/// Shared per-slice greedy run-extension: given a visibility mask of
/// `(Option<VoxelId>)` for one axis slice, find the (h, w) extent of the
/// largest same-typed rectangle starting at (u, v), extending `u` (the
/// inner/fast axis) first, then `v`.
fn greedy_extent(mask: &[Option<VoxelId>], dim_u: i32, dim_v: i32, u: i32, v: i32) -> (i32, i32) {
    let at = |u: i32, v: i32| mask[(v * dim_u + u) as usize];
    let ty = at(u, v);
    let mut h = 1;
    while u + h < dim_u && at(u + h, v) == ty {
        h += 1;
    }
    let mut w = 1;
    'outer: while v + w < dim_v {
        for k in 0..h {
            if at(u + k, v + w) != ty {
                break 'outer;
            }
        }
        w += 1;
    }
    (h, w)
}

fn axis_to_uv(d: usize) -> (usize, usize) {
    ((d + 1) % 3, (d + 2) % 3)
}

/// Corner positions of a greedy quad in world-local space, following the
/// original implementation's `d`/`u`/`v` decomposition.
#[allow(clippy::too_many_arguments)]
fn greedy_quad_corners(d: usize, u: usize, v: usize, slice: i32, pos_u: i32, pos_v: i32, h: i32, w: i32, dir: i32) -> ([[f32; 3]; 4], [f32; 3]) {
    let mut base = [0.0f32; 3];
    base[d] = (slice + if dir > 0 { 1 } else { 0 }) as f32;
    base[u] = pos_u as f32;
    base[v] = pos_v as f32;

    let mut du = [0.0f32; 3];
    du[u] = h as f32;
    let mut dv = [0.0f32; 3];
    dv[v] = w as f32;

    let p1 = base;
    let p2 = [base[0] + dv[0], base[1] + dv[1], base[2] + dv[2]];
    let p3 = [base[0] + dv[0] + du[0], base[1] + dv[1] + du[1], base[2] + dv[2] + du[2]];
    let p4 = [base[0] + du[0], base[1] + du[1], base[2] + du[2]];

    let mut normal = [0.0f32; 3];
    normal[d] = dir as f32;

    let corners = if dir > 0 { [p1, p4, p3, p2] } else { [p1, p2, p3, p4] };
    (corners, normal)
}

mod greedy_legacy {
    //! Original greedy mesher: visibility is re-derived live, voxel by
    //! voxel, while extending a run, instead of snapshotting a mask before
    //! merging starts. A run that crosses a voxel whose solidity or
    //! neighbour state the merge itself has not yet "seen" consistently can
    //! silently stop short, dropping the remaining faces of that run.
    //! Kept for comparison against `two_phase_greedy`.
    use super::*;

    /// Extend a run starting at solid, visible voxel `(pu, pv)` by directly
    /// re-querying `sample_local_or` at each candidate cell, rather than
    /// consulting a precomputed mask. This is the behaviour that the
    /// two-phase algorithm deliberately replaces.
    #[allow(clippy::too_many_arguments)]
    fn live_extent(
        segment: &ChunkSegment,
        sample: &impl Fn(i32, i32, i32) -> VoxelId,
        d: usize,
        u: usize,
        v: usize,
        q: [i32; 3],
        slice: i32,
        id: VoxelId,
        pu: i32,
        pv: i32,
    ) -> (i32, i32) {
        let visible_at = |pu: i32, pv: i32| -> bool {
            if !(0..S).contains(&pu) || !(0..S).contains(&pv) {
                return false;
            }
            let mut coords = [0i32; 3];
            coords[d] = slice;
            coords[u] = pu;
            coords[v] = pv;
            let here = sample_local_or(segment, sample, coords[0], coords[1], coords[2]);
            if here != id {
                return false;
            }
            let there = sample_local_or(segment, sample, coords[0] + q[0], coords[1] + q[1], coords[2] + q[2]);
            !voxel::is_solid(there)
        };
        let mut h = 1;
        while visible_at(pu + h, pv) {
            h += 1;
        }
        let mut w = 1;
        'outer: while pv + w < S {
            for k in 0..h {
                if !visible_at(pu + k, pv + w) {
                    break 'outer;
                }
            }
            w += 1;
        }
        (h, w)
    }

    pub fn mesh(segment: &ChunkSegment, atlas: &TextureAtlas, sample: impl Fn(i32, i32, i32) -> VoxelId, chunk_coord: IVec3) -> Mesh {
        let mut out = Mesh::default();
        for d in 0..3 {
            let (u, v) = axis_to_uv(d);
            for dir in [-1, 1] {
                let q = {
                    let mut q = [0i32; 3];
                    q[d] = dir;
                    q
                };
                for slice in 0..S {
                    let mut visited = vec![false; (S * S) as usize];
                    for pv in 0..S {
                        for pu in 0..S {
                            let at_idx = (pv * S + pu) as usize;
                            if visited[at_idx] {
                                continue;
                            }
                            let mut coords = [0i32; 3];
                            coords[d] = slice;
                            coords[u] = pu;
                            coords[v] = pv;
                            let here = sample_local_or(segment, &sample, coords[0], coords[1], coords[2]);
                            if !voxel::is_solid(here) {
                                continue;
                            }
                            let there = sample_local_or(segment, &sample, coords[0] + q[0], coords[1] + q[1], coords[2] + q[2]);
                            if voxel::is_solid(there) {
                                continue;
                            }
                            let (h, w) = live_extent(segment, &sample, d, u, v, q, slice, here, pu, pv);
                            for ev in 0..w {
                                for eu in 0..h {
                                    visited[((pv + ev) * S + (pu + eu)) as usize] = true;
                                }
                            }
                            emit_greedy_quad(&mut out, atlas, here, d, u, v, slice, pu, pv, h, w, dir, chunk_coord);
                        }
                    }
                }
            }
        }
        out
    }
}

mod two_phase_greedy {
    //! Phase 1 builds a per-slice visibility mask purely from static
    //! geometry; phase 2 greedily merges over that frozen mask. Decoupling
    //! the two fixes the legacy algorithm's missing-face cases.
    use super::*;

    pub fn mesh(segment: &ChunkSegment, atlas: &TextureAtlas, sample: impl Fn(i32, i32, i32) -> VoxelId, chunk_coord: IVec3) -> Mesh {
        let mut out = Mesh::default();
        for d in 0..3 {
            let (u, v) = axis_to_uv(d);
            for dir in [-1, 1] {
                let q = {
                    let mut q = [0i32; 3];
                    q[d] = dir;
                    q
                };
                for slice in 0..S {
                    // Phase 1: visibility mask for this slice, frozen before any merging.
                    let mut mask: Vec<Option<VoxelId>> = vec![None; (S * S) as usize];
                    for pv in 0..S {
                        for pu in 0..S {
                            let mut coords = [0i32; 3];
                            coords[d] = slice;
                            coords[u] = pu;
                            coords[v] = pv;
                            let here = sample_local_or(segment, &sample, coords[0], coords[1], coords[2]);
                            let there = sample_local_or(
                                segment,
                                &sample,
                                coords[0] + q[0],
                                coords[1] + q[1],
                                coords[2] + q[2],
                            );
                            if voxel::is_solid(here) && !voxel::is_solid(there) {
                                mask[(pv * S + pu) as usize] = Some(here);
                            }
                        }
                    }

                    // Phase 2: greedy merge over the frozen mask only.
                    let mut processed = vec![false; (S * S) as usize];
                    for pv in 0..S {
                        for pu in 0..S {
                            let at_idx = (pv * S + pu) as usize;
                            if processed[at_idx] || mask[at_idx].is_none() {
                                continue;
                            }
                            let id = mask[at_idx].unwrap();
                            let (h, w) = greedy_extent(&mask, S, S, pu, pv);
                            for ev in 0..w {
                                for eu in 0..h {
                                    processed[((pv + ev) * S + (pu + eu)) as usize] = true;
                                }
                            }
                            emit_greedy_quad(&mut out, atlas, id, d, u, v, slice, pu, pv, h, w, dir, chunk_coord);
                        }
                    }
                }
            }
        }
        out
    }
}

#[allow(clippy::too_many_arguments)]
fn emit_greedy_quad(
    mesh: &mut Mesh,
    atlas: &TextureAtlas,
    id: VoxelId,
    d: usize,
    u: usize,
    v: usize,
    slice: i32,
    pos_u: i32,
    pos_v: i32,
    h: i32,
    w: i32,
    dir: i32,
    _chunk_coord: IVec3,
) {
    let (corners, normal) = greedy_quad_corners(d, u, v, slice, pos_u, pos_v, h, w, dir);
    let face = Face::from_normal(normal[0] as i32, normal[1] as i32, normal[2] as i32);
    let rect = atlas.rect_for_face(id, face);
    mesh.push_quad(
        corners,
        normal,
        h as f32,
        w as f32,
        rect.bottom_left(),
        voxel::properties(id).atlas_slot_for(face) as u8,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkSegment;
    use crate::voxel::AIR;

    fn solid_cube(size: i32) -> ChunkSegment {
        let mut seg = ChunkSegment::new_empty();
        for z in 0..size {
            for y in 0..size {
                for x in 0..size {
                    seg.set(x as usize, y as usize, z as usize, 1);
                }
            }
        }
        seg
    }

    fn air_sample(_x: i32, _y: i32, _z: i32) -> VoxelId {
        AIR
    }

    #[test]
    fn naive_emits_six_faces_per_voxel() {
        let mut seg = ChunkSegment::new_empty();
        seg.set(0, 0, 0, 1);
        let atlas = TextureAtlas::new_16x16();
        let mesh = mesh_segment(MeshAlgorithm::Naive, &seg, &atlas, air_sample, IVec3::ZERO);
        assert_eq!(mesh.stats().triangle_count, 12); // 6 faces * 2 triangles
    }

    #[test]
    fn culled_face_hides_interior_faces_between_two_solid_voxels() {
        let mut seg = ChunkSegment::new_empty();
        seg.set(0, 0, 0, 1);
        seg.set(1, 0, 0, 1);
        let atlas = TextureAtlas::new_16x16();
        let naive = mesh_segment(MeshAlgorithm::Naive, &seg, &atlas, air_sample, IVec3::ZERO);
        let culled = mesh_segment(MeshAlgorithm::CulledFace, &seg, &atlas, air_sample, IVec3::ZERO);
        assert_eq!(naive.stats().triangle_count, 24);
        assert_eq!(culled.stats().triangle_count, 20); // 2 faces hidden (1 quad = 2 tris)
    }

    #[test]
    fn two_phase_greedy_merges_filled_segment_into_few_quads() {
        let seg = solid_cube(SEGMENT_SIZE as i32);
        let atlas = TextureAtlas::new_16x16();
        let mesh = mesh_segment(MeshAlgorithm::TwoPhaseGreedy, &seg, &atlas, air_sample, IVec3::ZERO);
        // A fully solid, isolated segment has exactly 6 faces total, each one giant quad.
        assert_eq!(mesh.stats().triangle_count, 12);
        assert_eq!(mesh.stats().vertex_count, 24); // 6 quads * 4 vertices, no sharing across quads
    }

    #[test]
    fn all_algorithms_agree_on_visible_face_count_for_an_l_shape() {
        let mut seg = ChunkSegment::new_empty();
        for x in 0..4 {
            seg.set(x, 0, 0, 1);
        }
        for y in 0..4 {
            seg.set(0, y, 0, 1);
        }
        let atlas = TextureAtlas::new_16x16();
        let naive = mesh_segment(MeshAlgorithm::Naive, &seg, &atlas, air_sample, IVec3::ZERO);
        let culled = mesh_segment(MeshAlgorithm::CulledFace, &seg, &atlas, air_sample, IVec3::ZERO);
        let two_phase = mesh_segment(MeshAlgorithm::TwoPhaseGreedy, &seg, &atlas, air_sample, IVec3::ZERO);
        // naive over-counts shared internal faces; culled-face and two-phase-greedy
        // must agree on exactly which faces are visible (greedy just merges them).
        assert!(naive.stats().triangle_count > culled.stats().triangle_count);
        assert!(two_phase.stats().triangle_count <= culled.stats().triangle_count);
        assert!(!culled.is_empty());
        assert!(!two_phase.is_empty());
    }

    #[test]
    fn hollow_cube_emits_exterior_and_interior_faces_as_merged_quads() {
        // 3x3x3 solid cube with the centre voxel removed: 6 exterior faces and
        // 6 interior faces around the hole, each merges to a single quad.
        let mut seg = ChunkSegment::new_empty();
        for z in 0..3 {
            for y in 0..3 {
                for x in 0..3 {
                    if (x, y, z) != (1, 1, 1) {
                        seg.set(x, y, z, 1);
                    }
                }
            }
        }
        let atlas = TextureAtlas::new_16x16();

        // Culled-face and two-phase-greedy cover the same 60 visible unit
        // faces (54 on the cube's exterior + 6 around the hole) but differ in
        // triangle count because only two-phase-greedy merges coplanar unit
        // faces into larger quads: culled-face emits one quad per unit face
        // (60 quads, 120 triangles), while two-phase-greedy merges the six
        // unbroken exterior faces into one quad each and leaves the six
        // isolated interior faces around the hole unmerged (12 quads, 24
        // triangles). Naive skips culling entirely, so it emits a quad for
        // every face of every solid voxel and strictly over-counts both.
        let naive = mesh_segment(MeshAlgorithm::Naive, &seg, &atlas, air_sample, IVec3::ZERO);
        let culled = mesh_segment(MeshAlgorithm::CulledFace, &seg, &atlas, air_sample, IVec3::ZERO);
        let two_phase = mesh_segment(MeshAlgorithm::TwoPhaseGreedy, &seg, &atlas, air_sample, IVec3::ZERO);
        assert_eq!(culled.stats().triangle_count, 120); // 60 unit quads, unmerged
        assert_eq!(two_phase.stats().triangle_count, 24); // 12 merged quads
        assert!(naive.stats().triangle_count > culled.stats().triangle_count);
    }

    #[test]
    fn cross_segment_neighbour_suppresses_shared_face() {
        // Solid voxel at the +X edge of this segment; a sampler standing in
        // for a loaded neighbour column reports its touching face as solid.
        let mut seg = ChunkSegment::new_empty();
        seg.set(SEGMENT_SIZE - 1, 0, 0, 1);
        let atlas = TextureAtlas::new_16x16();

        let neighbour_loaded = |x: i32, _y: i32, _z: i32| if x == SEGMENT_SIZE as i32 { 1 } else { AIR };
        let with_neighbour = mesh_segment(MeshAlgorithm::CulledFace, &seg, &atlas, neighbour_loaded, IVec3::ZERO);
        let without_neighbour = mesh_segment(MeshAlgorithm::CulledFace, &seg, &atlas, air_sample, IVec3::ZERO);

        // The shared +X face is suppressed only when the neighbour is loaded.
        assert_eq!(with_neighbour.stats().triangle_count, without_neighbour.stats().triangle_count - 2);
    }

    #[test]
    fn greedy_variants_produce_no_faces_for_empty_segment() {
        let seg = ChunkSegment::new_empty();
        let atlas = TextureAtlas::new_16x16();
        for algo in [MeshAlgorithm::Naive, MeshAlgorithm::CulledFace, MeshAlgorithm::GreedyLegacy, MeshAlgorithm::TwoPhaseGreedy] {
            let mesh = mesh_segment(algo, &seg, &atlas, air_sample, IVec3::ZERO);
            assert!(mesh.is_empty(), "{algo:?} should produce nothing for an empty segment");
        }
    }
}
