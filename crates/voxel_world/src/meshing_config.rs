//! Meshing configuration: which of the four algorithms to run, and how.

use crate::atlas::TextureAtlas;
use crate::chunk::ChunkSegment;
use crate::mesh::{self, Mesh, MeshAlgorithm};
use crate::voxel::VoxelId;
use glam::IVec3;
use rayon::prelude::*;

/// Selects a meshing algorithm. A thin strategy object rather than a
/// runtime-dispatched trait: the algorithm set is closed (§9), so a plain
/// enum plus a dispatch function covers it without an extension point that
/// nothing needs.
#[derive(Debug, Clone, Copy)]
pub struct MeshingConfig {
    pub algorithm: MeshAlgorithm,
}

impl Default for MeshingConfig {
    fn default() -> Self {
        MeshingConfig { algorithm: MeshAlgorithm::TwoPhaseGreedy }
    }
}

/// One parallel meshing batch entry: the segment's chunk coordinate, the
/// segment itself, and a boxed neighbour sampler self-contained enough to
/// cross column boundaries.
pub type MeshBatchEntry<'a> = (IVec3, &'a ChunkSegment, Box<dyn Fn(i32, i32, i32) -> VoxelId + Sync + 'a>);

impl MeshingConfig {
    pub fn new(algorithm: MeshAlgorithm) -> Self {
        MeshingConfig { algorithm }
    }

    /// Cheapest correct algorithm: culled-face, no merging overhead.
    pub fn fast() -> Self {
        MeshingConfig { algorithm: MeshAlgorithm::CulledFace }
    }

    /// Fewest vertices: two-phase greedy merging.
    pub fn quality() -> Self {
        MeshingConfig { algorithm: MeshAlgorithm::TwoPhaseGreedy }
    }

    pub fn mesh_segment(
        &self,
        segment: &ChunkSegment,
        atlas: &TextureAtlas,
        sample: impl Fn(i32, i32, i32) -> VoxelId,
        chunk_coord: IVec3,
    ) -> Mesh {
        mesh::mesh_segment(self.algorithm, segment, atlas, sample, chunk_coord)
    }

    /// Mesh multiple segments in parallel. Each closure in `jobs` must be
    /// self-contained (own its neighbour sampler) since segments may belong
    /// to different columns.
    pub fn mesh_segments_parallel<'a>(
        &self,
        jobs: &'a [MeshBatchEntry<'a>],
        atlas: &TextureAtlas,
    ) -> Vec<(IVec3, Mesh)> {
        jobs.par_iter()
            .map(|(coord, segment, sample)| {
                let mesh = self.mesh_segment(segment, atlas, sample, *coord);
                (*coord, mesh)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_two_phase_greedy() {
        let config = MeshingConfig::default();
        assert_eq!(config.algorithm, MeshAlgorithm::TwoPhaseGreedy);
    }

    #[test]
    fn fast_config_is_culled_face() {
        let config = MeshingConfig::fast();
        assert_eq!(config.algorithm, MeshAlgorithm::CulledFace);
    }

    #[test]
    fn quality_config_is_two_phase_greedy() {
        let config = MeshingConfig::quality();
        assert_eq!(config.algorithm, MeshAlgorithm::TwoPhaseGreedy);
    }
}
