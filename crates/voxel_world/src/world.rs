//! WorldManager: owns loaded columns, the spatial index, and the active-set
//! and save-dirty bookkeeping. Grounded on the original world manager's
//! voxel access, column lifecycle, and active-chunk update logic.

use crate::column::{ChunkColumn, ColumnKey, COLUMN_HEIGHT};
use crate::generator::TerrainGenerator;
use crate::job_queue::{JobQueue, MeshJob, MeshJobResult};
use crate::logging::{log_at, LogLevel};
use crate::quadtree::{Aabb2d, Quadtree};
use crate::voxel::{VoxelId, AIR};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::Instant;

pub const SEGMENT_SIZE_I64: i64 = crate::chunk::SEGMENT_SIZE as i64;

fn column_key_for(world_x: i64, world_z: i64) -> ColumnKey {
    ColumnKey::from_world(world_x, world_z)
}

/// The columns map is the only piece of world state meshing workers touch
/// concurrently with the owning thread, so it alone lives behind a lock;
/// everything else here (quadtree, dirty tracker, loading gate) is mutated
/// only by the owning thread and needs no synchronization.
pub struct WorldManager {
    columns: Arc<RwLock<HashMap<ColumnKey, ChunkColumn>>>,
    quadtree: Quadtree,
    save_dirty: HashSet<ColumnKey>,
    modified_at: HashMap<ColumnKey, Instant>,
    loaded_from_disk: HashSet<ColumnKey>,
    loading: bool,
    generator: Arc<dyn TerrainGenerator>,
}

impl WorldManager {
    pub fn new(generator: Arc<dyn TerrainGenerator>) -> Self {
        let bounds = Aabb2d::new(i64::MIN / 2, i64::MIN / 2, i64::MAX / 2, i64::MAX / 2);
        WorldManager {
            columns: Arc::new(RwLock::new(HashMap::new())),
            quadtree: Quadtree::new(bounds),
            save_dirty: HashSet::new(),
            modified_at: HashMap::new(),
            loaded_from_disk: HashSet::new(),
            loading: false,
            generator,
        }
    }

    /// Shared handle to the column map, for the mesh job system to sample
    /// voxels from without touching any other `WorldManager` state.
    pub fn columns_handle(&self) -> Arc<RwLock<HashMap<ColumnKey, ChunkColumn>>> {
        Arc::clone(&self.columns)
    }

    pub fn get_voxel(&self, x: i64, y: i64, z: i64) -> VoxelId {
        let key = column_key_for(x, z);
        let columns = self.columns.read().unwrap_or_else(|p| p.into_inner());
        match columns.get(&key) {
            Some(col) => col.get_voxel(x, y, z),
            None => AIR,
        }
    }

    /// Writes the voxel, marks the owning segment mesh-dirty (via the
    /// column), and marks the column save-dirty with a fresh timestamp.
    pub fn set_voxel(&mut self, x: i64, y: i64, z: i64, value: VoxelId) {
        let key = column_key_for(x, z);
        self.get_or_create_column(key);
        {
            let mut columns = self.columns.write().unwrap_or_else(|p| p.into_inner());
            if let Some(col) = columns.get_mut(&key) {
                col.set_voxel(x, y, z, value);
            }
        }
        self.save_dirty.insert(key);
        self.modified_at.insert(key, Instant::now());
    }

    /// Ensures a column exists at `key`, generating its segments unless the
    /// column came from disk or the loading gate is active.
    pub fn get_or_create_column(&mut self, key: ColumnKey) -> bool {
        {
            let columns = self.columns.read().unwrap_or_else(|p| p.into_inner());
            if columns.contains_key(&key) {
                return false;
            }
        }
        let should_generate = !self.loaded_from_disk.contains(&key) && !self.loading;
        let mut column = ChunkColumn::new(key.x, key.z);
        if should_generate {
            for segment_y in 0..COLUMN_HEIGHT as i32 {
                if let Some(seg) = column.segment_mut(segment_y) {
                    self.generator.generate_segment(seg, key.x, segment_y, key.z);
                }
            }
        }
        self.quadtree.insert(key);
        let mut columns = self.columns.write().unwrap_or_else(|p| p.into_inner());
        columns.insert(key, column);
        true
    }

    /// Like [`Self::get_or_create_column`] but always marks the column
    /// "loaded" and skips generation, for the load path.
    pub fn get_or_create_empty_column(&mut self, key: ColumnKey) -> bool {
        self.loaded_from_disk.insert(key);
        let created = {
            let columns = self.columns.read().unwrap_or_else(|p| p.into_inner());
            !columns.contains_key(&key)
        };
        if created {
            let column = ChunkColumn::new(key.x, key.z);
            self.quadtree.insert(key);
            let mut columns = self.columns.write().unwrap_or_else(|p| p.into_inner());
            columns.insert(key, column);
        }
        created
    }

    fn evict_column(&mut self, key: ColumnKey) {
        self.quadtree.remove(key);
        self.loaded_from_disk.remove(&key);
        let mut columns = self.columns.write().unwrap_or_else(|p| p.into_inner());
        columns.remove(&key);
    }

    /// Computes the set of columns within `radius_chunks` of `center_x,
    /// center_z` (in world coordinates) and reconciles the loaded set with
    /// it: creates/generates missing columns in range, evicts columns out
    /// of range. Eviction is skipped while `jobs_in_flight` is nonzero or
    /// the loading gate is active, honouring the ownership rule that a
    /// column outstanding in a mesh job must not be destroyed.
    pub fn update_active_set(&mut self, center_x: i64, center_z: i64, radius_chunks: i64, jobs_in_flight: usize) -> (Vec<ColumnKey>, Vec<ColumnKey>) {
        let s = SEGMENT_SIZE_I64;
        let center_key = column_key_for(center_x, center_z);
        let mut desired = HashSet::new();
        for dz in -radius_chunks..=radius_chunks {
            for dx in -radius_chunks..=radius_chunks {
                desired.insert(ColumnKey::new(center_key.x + dx * s, center_key.z + dz * s));
            }
        }

        let loaded: HashSet<ColumnKey> = {
            let columns = self.columns.read().unwrap_or_else(|p| p.into_inner());
            columns.keys().copied().collect()
        };

        let mut to_load: Vec<ColumnKey> = desired.difference(&loaded).copied().collect();
        to_load.sort();
        for key in &to_load {
            self.get_or_create_column(*key);
        }

        let mut to_unload = Vec::new();
        if jobs_in_flight == 0 && !self.loading {
            let mut candidates: Vec<ColumnKey> = loaded.difference(&desired).copied().collect();
            candidates.sort();
            for key in candidates {
                self.evict_column(key);
                to_unload.push(key);
            }
        }

        log_at(
            LogLevel::Verbose,
            "WorldManager",
            &format!("active set update: +{} -{}", to_load.len(), to_unload.len()),
        );
        (to_load, to_unload)
    }

    pub fn query_region(&self, x_min: i64, z_min: i64, x_max: i64, z_max: i64) -> Vec<ColumnKey> {
        self.quadtree.query_region(Aabb2d::new(x_min, z_min, x_max, z_max))
    }

    /// Drains and returns the set of columns modified since the last save.
    pub fn take_modified(&mut self) -> Vec<(ColumnKey, Instant)> {
        let keys: Vec<ColumnKey> = self.save_dirty.drain().collect();
        keys.into_iter().map(|k| (k, *self.modified_at.get(&k).unwrap())).collect()
    }

    pub fn clear_save_dirty(&mut self) {
        self.save_dirty.clear();
    }

    /// Re-marks a set of columns as save-dirty, used after load to ensure
    /// a subsequent save re-persists everything.
    pub fn mark_all_save_dirty(&mut self, keys: impl IntoIterator<Item = ColumnKey>) {
        let now = Instant::now();
        for key in keys {
            self.save_dirty.insert(key);
            self.modified_at.insert(key, now);
        }
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Clears all world state and rebuilds the spatial index. Used before a
    /// load replaces the current world.
    pub fn reset(&mut self) {
        let bounds = Aabb2d::new(i64::MIN / 2, i64::MIN / 2, i64::MAX / 2, i64::MAX / 2);
        let mut columns = self.columns.write().unwrap_or_else(|p| p.into_inner());
        columns.clear();
        drop(columns);
        self.quadtree = Quadtree::new(bounds);
        self.save_dirty.clear();
        self.modified_at.clear();
        self.loaded_from_disk.clear();
        self.loading = false;
    }

    pub fn with_column<R>(&self, key: ColumnKey, f: impl FnOnce(&ChunkColumn) -> R) -> Option<R> {
        let columns = self.columns.read().unwrap_or_else(|p| p.into_inner());
        columns.get(&key).map(f)
    }

    pub fn with_column_mut<R>(&self, key: ColumnKey, f: impl FnOnce(&mut ChunkColumn) -> R) -> Option<R> {
        let mut columns = self.columns.write().unwrap_or_else(|p| p.into_inner());
        columns.get_mut(&key).map(f)
    }

    pub fn loaded_column_keys(&self) -> Vec<ColumnKey> {
        let columns = self.columns.read().unwrap_or_else(|p| p.into_inner());
        columns.keys().copied().collect()
    }

    pub fn column_count(&self) -> usize {
        let columns = self.columns.read().unwrap_or_else(|p| p.into_inner());
        columns.len()
    }

    /// Phase one of the two-phase dirty-mesh update: scan every loaded
    /// segment that is mesh-dirty and not already rebuilding, mark it
    /// rebuilding, and enqueue a job. Returns how many jobs were enqueued.
    pub fn enqueue_dirty_segments(&mut self, queue: &JobQueue) -> usize {
        let mut columns = self.columns.write().unwrap_or_else(|p| p.into_inner());
        let mut enqueued = 0;
        for (key, column) in columns.iter_mut() {
            for (segment_y, segment) in column.segments_mut() {
                if segment.is_dirty_mesh() && !segment.is_rebuilding() {
                    segment.mark_rebuilding();
                    queue.push(MeshJob { column_key: *key, segment_y: segment_y as i32 });
                    enqueued += 1;
                }
            }
        }
        enqueued
    }

    /// Phase two: drain the job queue's completed results and install each
    /// finished mesh into its segment. A result for a column that has since
    /// been evicted is simply dropped.
    pub fn install_finished_meshes(&mut self, queue: &JobQueue) -> usize {
        let results: Vec<MeshJobResult> = queue.drain_completed();
        let installed = results.len();
        let mut columns = self.columns.write().unwrap_or_else(|p| p.into_inner());
        for result in results {
            if let Some(column) = columns.get_mut(&result.column_key) {
                if let Some(segment) = column.segment_mut(result.segment_y) {
                    segment.install_mesh(result.mesh);
                }
            }
        }
        installed
    }

    /// All segment meshes currently installed across every loaded column,
    /// for the rendering backend to consume.
    pub fn all_segment_meshes(&self) -> Vec<crate::mesh::Mesh> {
        let columns = self.columns.read().unwrap_or_else(|p| p.into_inner());
        columns
            .values()
            .flat_map(|col| col.segments())
            .filter_map(|(_, seg)| seg.mesh().cloned())
            .collect()
    }

    /// Marks every loaded segment mesh-dirty, forcing a full remesh on the
    /// next `enqueue_dirty_segments` pass.
    pub fn mark_all_segments_dirty(&mut self) {
        let mut columns = self.columns.write().unwrap_or_else(|p| p.into_inner());
        for column in columns.values_mut() {
            for (_, segment) in column.segments_mut() {
                segment.mark_dirty();
            }
        }
    }
}
