//! A single 32x32x32 volume of voxels: the atomic unit of storage and meshing.

use crate::mesh::Mesh;
use crate::voxel::{VoxelId, AIR};

pub const SEGMENT_SIZE: usize = 32;
const VOLUME: usize = SEGMENT_SIZE * SEGMENT_SIZE * SEGMENT_SIZE;

fn in_bounds(x: usize, y: usize, z: usize) -> bool {
    x < SEGMENT_SIZE && y < SEGMENT_SIZE && z < SEGMENT_SIZE
}

#[inline]
const fn idx(x: usize, y: usize, z: usize) -> usize {
    x + y * SEGMENT_SIZE + z * SEGMENT_SIZE * SEGMENT_SIZE
}

/// A fixed 32^3 voxel volume, owning its mesh once built.
pub struct ChunkSegment {
    voxels: Box<[VoxelId; VOLUME]>,
    is_dirty_mesh: bool,
    is_generated: bool,
    is_rebuilding: bool,
    mesh: Option<Mesh>,
}

impl ChunkSegment {
    pub fn new_empty() -> Self {
        ChunkSegment {
            voxels: Box::new([AIR; VOLUME]),
            is_dirty_mesh: false,
            is_generated: false,
            is_rebuilding: false,
            mesh: None,
        }
    }

    /// Out-of-range coordinates return AIR; this lets meshing algorithms
    /// sample one voxel past an edge without a separate bounds check.
    pub fn get(&self, x: usize, y: usize, z: usize) -> VoxelId {
        if !in_bounds(x, y, z) {
            return AIR;
        }
        self.voxels[idx(x, y, z)]
    }

    /// Out-of-range coordinates are a silent no-op. A write that doesn't
    /// change the value doesn't dirty the mesh.
    pub fn set(&mut self, x: usize, y: usize, z: usize, value: VoxelId) {
        if !in_bounds(x, y, z) {
            return;
        }
        let i = idx(x, y, z);
        if self.voxels[i] == value {
            return;
        }
        self.voxels[i] = value;
        self.is_dirty_mesh = true;
    }

    pub fn is_dirty_mesh(&self) -> bool {
        self.is_dirty_mesh
    }

    pub fn is_generated(&self) -> bool {
        self.is_generated
    }

    pub fn mark_generated(&mut self) {
        self.is_generated = true;
    }

    pub fn mark_dirty(&mut self) {
        self.is_dirty_mesh = true;
    }

    pub fn is_rebuilding(&self) -> bool {
        self.is_rebuilding
    }

    pub fn mark_rebuilding(&mut self) {
        self.is_rebuilding = true;
    }

    pub fn mesh(&self) -> Option<&Mesh> {
        self.mesh.as_ref()
    }

    /// Takes ownership of the installed mesh, leaving the segment with none.
    pub fn take_mesh(&mut self) -> Option<Mesh> {
        self.mesh.take()
    }

    /// Install a freshly built mesh, clearing both the dirty and rebuilding
    /// flags. The only path by which those flags clear in normal operation.
    pub fn install_mesh(&mut self, mesh: Mesh) {
        self.mesh = Some(mesh);
        self.is_dirty_mesh = false;
        self.is_rebuilding = false;
    }

    /// Raw voxel slice in storage order, for the save layer.
    pub fn voxels(&self) -> &[VoxelId; VOLUME] {
        &self.voxels
    }

    pub fn from_voxels(voxels: Box<[VoxelId; VOLUME]>) -> Self {
        ChunkSegment {
            voxels,
            is_dirty_mesh: true,
            is_generated: true,
            is_rebuilding: false,
            mesh: None,
        }
    }
}
