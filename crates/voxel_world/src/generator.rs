//! External generator contract (§6): the world manager calls this to
//! populate a freshly created segment that has no save record.

use crate::chunk::{ChunkSegment, SEGMENT_SIZE};
use crate::voxel::AIR;

/// Implemented by any terrain source. The manager never inspects state
/// beyond the voxels this writes into `segment`.
pub trait TerrainGenerator: Send + Sync {
    fn generate_segment(&self, segment: &mut ChunkSegment, base_x: i64, segment_y: i32, base_z: i64);
}

/// Deterministic flat-world generator: a seeded height function with a
/// dirt-over-stone profile and a flat water table. Sufficient to exercise
/// the pipeline without specifying real procedural terrain internals.
#[derive(Debug, Clone)]
pub struct FlatWorldGenerator {
    pub base_height: f32,
    pub amplitude: f32,
    pub frequency: f32,
    pub water_level: i64,
    pub seed: u32,
}

impl Default for FlatWorldGenerator {
    fn default() -> Self {
        FlatWorldGenerator {
            base_height: 16.0,
            amplitude: 12.0,
            frequency: 0.03,
            water_level: 10,
            seed: 12345,
        }
    }
}

impl FlatWorldGenerator {
    fn height_at(&self, world_x: i64, world_z: i64) -> i64 {
        let fx = world_x as f32;
        let fz = world_z as f32;
        let s = self.seed as f32 * 0.0001;
        let n = ((fx * self.frequency + s).sin() + (fz * self.frequency + s * 1.7).cos()) * 0.5;
        (self.base_height + n * self.amplitude) as i64
    }
}

impl TerrainGenerator for FlatWorldGenerator {
    fn generate_segment(&self, segment: &mut ChunkSegment, base_x: i64, segment_y: i32, base_z: i64) {
        let s = SEGMENT_SIZE as i64;
        let segment_base_y = segment_y as i64 * s;
        for lz in 0..SEGMENT_SIZE {
            for lx in 0..SEGMENT_SIZE {
                let wx = base_x + lx as i64;
                let wz = base_z + lz as i64;
                let height = self.height_at(wx, wz);
                for ly in 0..SEGMENT_SIZE {
                    let wy = segment_base_y + ly as i64;
                    let id = if wy > height {
                        if wy <= self.water_level {
                            6 // water
                        } else {
                            AIR
                        }
                    } else if wy == height {
                        3 // grass
                    } else if wy > height - 4 {
                        2 // dirt
                    } else {
                        1 // stone
                    };
                    segment.set(lx, ly, lz, id);
                }
            }
        }
        segment.mark_generated();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_segment_is_marked_generated() {
        let gen = FlatWorldGenerator::default();
        let mut seg = ChunkSegment::new_empty();
        gen.generate_segment(&mut seg, 0, 0, 0);
        assert!(seg.is_generated());
    }

    #[test]
    fn deterministic_for_same_inputs() {
        let gen = FlatWorldGenerator::default();
        let mut a = ChunkSegment::new_empty();
        let mut b = ChunkSegment::new_empty();
        gen.generate_segment(&mut a, 32, 0, 64);
        gen.generate_segment(&mut b, 32, 0, 64);
        for z in 0..SEGMENT_SIZE {
            for y in 0..SEGMENT_SIZE {
                for x in 0..SEGMENT_SIZE {
                    assert_eq!(a.get(x, y, z), b.get(x, y, z));
                }
            }
        }
    }

    #[test]
    fn below_surface_is_solid() {
        let gen = FlatWorldGenerator::default();
        let mut seg = ChunkSegment::new_empty();
        gen.generate_segment(&mut seg, 0, 0, 0);
        assert!(crate::voxel::is_solid(seg.get(0, 0, 0)));
    }
}
