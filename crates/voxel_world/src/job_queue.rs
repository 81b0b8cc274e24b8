//! Mesh job system: a worker pool that builds meshes off the owning thread.
//!
//! Grounded on the teacher's job queue — SPMC job queue, MPSC result queue,
//! panic isolation per job, poisoned-mutex recovery on drain.

use crate::atlas::TextureAtlas;
use crate::chunk::SEGMENT_SIZE;
use crate::column::{ChunkColumn, ColumnKey};
use crate::logging::warn;
use crate::mesh::{Mesh, MeshAlgorithm};
use crate::meshing_config::MeshingConfig;
use crate::voxel::{VoxelId, AIR};
use glam::IVec3;
use std::collections::{HashMap, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct MeshJob {
    pub column_key: ColumnKey,
    pub segment_y: i32,
}

pub struct MeshJobResult {
    pub column_key: ColumnKey,
    pub segment_y: i32,
    pub mesh: Mesh,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JobStats {
    pub total_meshed: u64,
    pub total_panics: u64,
    pub total_meshing_time_ms: f64,
}

impl JobStats {
    pub fn avg_meshing_time_ms(&self) -> f64 {
        if self.total_meshed == 0 {
            0.0
        } else {
            self.total_meshing_time_ms / self.total_meshed as f64
        }
    }
}

/// A snapshot of one segment's voxels plus its six face-adjacent neighbour
/// segments, taken under a single short-lived lock so the worker can then
/// mesh without holding any lock for the (potentially expensive) duration
/// of the algorithm.
struct Neighborhood {
    center: Box<[VoxelId]>,
    neighbors: [Option<Box<[VoxelId]>>; 6],
}

const NEIGHBOR_OFFSETS: [(i64, i32, i64); 6] = [
    (1, 0, 0),
    (-1, 0, 0),
    (0, 1, 0),
    (0, -1, 0),
    (0, 0, 1),
    (0, 0, -1),
];

fn snapshot_segment(col: &ChunkColumn, segment_y: i32) -> Option<Box<[VoxelId]>> {
    col.segment(segment_y).map(|seg| seg.voxels().to_vec().into_boxed_slice())
}

fn take_neighborhood(columns: &HashMap<ColumnKey, ChunkColumn>, key: ColumnKey, segment_y: i32) -> Option<Neighborhood> {
    let center_col = columns.get(&key)?;
    let center = snapshot_segment(center_col, segment_y)?;
    let s = SEGMENT_SIZE as i64;
    let mut neighbors: [Option<Box<[VoxelId]>>; 6] = Default::default();
    for (i, (dx, dy, dz)) in NEIGHBOR_OFFSETS.iter().enumerate() {
        let neighbor_segment_y = segment_y + dy;
        let neighbor_key = ColumnKey::new(key.x + dx * s, key.z + dz * s);
        neighbors[i] = columns.get(&neighbor_key).and_then(|col| snapshot_segment(col, neighbor_segment_y));
    }
    Some(Neighborhood { center, neighbors })
}

fn sample_neighborhood(n: &Neighborhood, x: i32, y: i32, z: i32) -> VoxelId {
    let s = SEGMENT_SIZE as i32;
    let in_range = |v: i32| (0..s).contains(&v);
    if in_range(x) && in_range(y) && in_range(z) {
        let idx = x as usize + y as usize * SEGMENT_SIZE + z as usize * SEGMENT_SIZE * SEGMENT_SIZE;
        return n.center[idx];
    }
    // Exactly one axis can be out of range for a unit-offset neighbour query.
    let (neighbor_idx, lx, ly, lz) = if x < 0 {
        (1, x + s, y, z)
    } else if x >= s {
        (0, x - s, y, z)
    } else if y < 0 {
        (3, x, y + s, z)
    } else if y >= s {
        (2, x, y - s, z)
    } else if z < 0 {
        (5, x, y, z + s)
    } else {
        (4, x, y, z - s)
    };
    if !in_range(lx) || !in_range(ly) || !in_range(lz) {
        return AIR; // diagonal / multi-axis overshoot: outside modeled neighbourhood
    }
    match &n.neighbors[neighbor_idx] {
        Some(voxels) => {
            let idx = lx as usize + ly as usize * SEGMENT_SIZE + lz as usize * SEGMENT_SIZE * SEGMENT_SIZE;
            voxels[idx]
        }
        None => AIR,
    }
}

/// Shared queue state: pending jobs, completed results, and the resources
/// every worker needs to build a mesh.
pub struct JobQueue {
    pending: Mutex<VecDeque<MeshJob>>,
    completed: Mutex<Vec<MeshJobResult>>,
    stats: Mutex<JobStats>,
    columns: Arc<RwLock<HashMap<ColumnKey, ChunkColumn>>>,
    atlas: Arc<TextureAtlas>,
    config: MeshingConfig,
}

impl JobQueue {
    pub fn new(columns: Arc<RwLock<HashMap<ColumnKey, ChunkColumn>>>, atlas: Arc<TextureAtlas>, config: MeshingConfig) -> Arc<Self> {
        Arc::new(JobQueue {
            pending: Mutex::new(VecDeque::new()),
            completed: Mutex::new(Vec::new()),
            stats: Mutex::new(JobStats::default()),
            columns,
            atlas,
            config,
        })
    }

    pub fn push(&self, job: MeshJob) {
        self.pending.lock().unwrap_or_else(|p| p.into_inner()).push_back(job);
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    fn pop(&self) -> Option<MeshJob> {
        self.pending.lock().unwrap_or_else(|p| p.into_inner()).pop_front()
    }

    /// Process up to `max_jobs` pending jobs on the calling thread. Each
    /// job's panic is isolated so one bad segment doesn't kill the worker.
    pub fn process_jobs(&self, max_jobs: usize) -> usize {
        let mut processed = 0;
        for _ in 0..max_jobs {
            let Some(job) = self.pop() else { break };
            let result = catch_unwind(AssertUnwindSafe(|| self.run_job(job)));
            match result {
                Ok(Some((mesh, elapsed_ms))) => {
                    self.completed.lock().unwrap_or_else(|p| p.into_inner()).push(MeshJobResult {
                        column_key: job.column_key,
                        segment_y: job.segment_y,
                        mesh,
                    });
                    let mut stats = self.stats.lock().unwrap_or_else(|p| p.into_inner());
                    stats.total_meshed += 1;
                    stats.total_meshing_time_ms += elapsed_ms;
                }
                Ok(None) => {
                    // Column/segment evicted out from under us; drop the job.
                }
                Err(e) => {
                    self.stats.lock().unwrap_or_else(|p| p.into_inner()).total_panics += 1;
                    warn(
                        "JobQueue",
                        &format!("PANIC in meshing worker for column {:?} segment {}: {:?}", job.column_key, job.segment_y, e),
                    );
                }
            }
            processed += 1;
        }
        processed
    }

    fn run_job(&self, job: MeshJob) -> Option<(Mesh, f64)> {
        let neighborhood = {
            let columns = self.columns.read().unwrap_or_else(|p| p.into_inner());
            take_neighborhood(&columns, job.column_key, job.segment_y)?
        };
        let start = Instant::now();
        // Rebuild a throwaway segment view over the snapshot so the shared
        // mesh_segment() entry point can be reused unchanged; voxel reads
        // for the center segment go through `segment`, everything else is
        // served by the neighbourhood sampler.
        let mut segment = crate::chunk::ChunkSegment::new_empty();
        for z in 0..SEGMENT_SIZE {
            for y in 0..SEGMENT_SIZE {
                for x in 0..SEGMENT_SIZE {
                    let idx = x + y * SEGMENT_SIZE + z * SEGMENT_SIZE * SEGMENT_SIZE;
                    segment.set(x, y, z, neighborhood.center[idx]);
                }
            }
        }
        let sample = |x: i32, y: i32, z: i32| sample_neighborhood(&neighborhood, x, y, z);
        let mesh = self.config.mesh_segment(
            &segment,
            &self.atlas,
            sample,
            IVec3::new(job.column_key.x as i32, job.segment_y, job.column_key.z as i32),
        );
        Some((mesh, start.elapsed().as_secs_f64() * 1000.0))
    }

    /// Drain all completed results. Handles a poisoned mutex by recovering
    /// its contents rather than propagating the panic further.
    pub fn drain_completed(&self) -> Vec<MeshJobResult> {
        let result = catch_unwind(AssertUnwindSafe(|| {
            let mut guard = match self.completed.lock() {
                Ok(g) => g,
                Err(poisoned) => {
                    warn("JobQueue", "completed-results mutex was poisoned, recovering");
                    poisoned.into_inner()
                }
            };
            std::mem::take(&mut *guard)
        }));
        result.unwrap_or_default()
    }

    pub fn stats(&self) -> JobStats {
        *self.stats.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn algorithm(&self) -> MeshAlgorithm {
        self.config.algorithm
    }
}

/// Owns a fixed-size pool of worker threads draining a shared [`JobQueue`].
pub struct WorkerHandle {
    running: Arc<Mutex<bool>>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerHandle {
    pub fn spawn(queue: Arc<JobQueue>, worker_count: usize) -> Self {
        let running = Arc::new(Mutex::new(true));
        let mut handles = Vec::with_capacity(worker_count);
        for id in 0..worker_count {
            let queue = Arc::clone(&queue);
            let running = Arc::clone(&running);
            handles.push(std::thread::spawn(move || {
                loop {
                    if !*running.lock().unwrap_or_else(|p| p.into_inner()) {
                        break;
                    }
                    let did_work = queue.process_jobs(10) > 0;
                    if !did_work {
                        std::thread::sleep(Duration::from_millis(10));
                    }
                }
                crate::logging::log_at(crate::logging::LogLevel::Verbose, "JobQueue", &format!("worker {id} stopped"));
            }));
        }
        WorkerHandle { running, handles }
    }

    pub fn stop(mut self) {
        *self.running.lock().unwrap_or_else(|p| p.into_inner()) = false;
        for handle in std::mem::take(&mut self.handles) {
            let _ = handle.join();
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        *self.running.lock().unwrap_or_else(|p| p.into_inner()) = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ChunkColumn;

    fn single_column_world() -> (Arc<RwLock<HashMap<ColumnKey, ChunkColumn>>>, ColumnKey) {
        let mut col = ChunkColumn::new(0, 0);
        col.set_voxel(0, 0, 0, 1);
        let key = col.key();
        let mut map = HashMap::new();
        map.insert(key, col);
        (Arc::new(RwLock::new(map)), key)
    }

    #[test]
    fn process_jobs_produces_a_mesh_for_a_dirty_segment() {
        let (columns, key) = single_column_world();
        let queue = JobQueue::new(columns, Arc::new(TextureAtlas::new_16x16()), MeshingConfig::fast());
        queue.push(MeshJob { column_key: key, segment_y: 0 });
        let processed = queue.process_jobs(10);
        assert_eq!(processed, 1);
        let results = queue.drain_completed();
        assert_eq!(results.len(), 1);
        assert!(!results[0].mesh.is_empty());
    }

    #[test]
    fn job_for_missing_column_is_dropped_without_panic() {
        let columns: Arc<RwLock<HashMap<ColumnKey, ChunkColumn>>> = Arc::new(RwLock::new(HashMap::new()));
        let queue = JobQueue::new(columns, Arc::new(TextureAtlas::new_16x16()), MeshingConfig::default());
        queue.push(MeshJob { column_key: ColumnKey::new(0, 0), segment_y: 0 });
        let processed = queue.process_jobs(10);
        assert_eq!(processed, 1);
        assert!(queue.drain_completed().is_empty());
    }

    #[test]
    fn worker_pool_drains_pushed_jobs() {
        let (columns, key) = single_column_world();
        let queue = JobQueue::new(columns, Arc::new(TextureAtlas::new_16x16()), MeshingConfig::fast());
        queue.push(MeshJob { column_key: key, segment_y: 0 });
        let workers = WorkerHandle::spawn(Arc::clone(&queue), 2);
        let mut found = false;
        for _ in 0..200 {
            if !queue.drain_completed().is_empty() {
                found = true;
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        workers.stop();
        assert!(found, "worker pool never produced a result");
    }
}
