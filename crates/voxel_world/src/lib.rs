#![forbid(unsafe_code)]
#![deny(warnings)]

//! In-memory voxel world: hierarchical chunk storage, a pluggable meshing
//! pipeline, and the spatial index and job system that tie them together.
//! Persistence lives in the sibling `world_save` crate.

pub mod atlas;
pub mod chunk;
pub mod column;
pub mod config;
pub mod generator;
pub mod job_queue;
pub mod logging;
pub mod mesh;
pub mod meshing_config;
pub mod quadtree;
pub mod voxel;
pub mod world;

pub use atlas::{AtlasRect, TextureAtlas};
pub use chunk::{ChunkSegment, SEGMENT_SIZE};
pub use column::{ChunkColumn, ColumnKey, COLUMN_HEIGHT};
pub use config::{EngineConfig, SaveConfig, WorldConfig};
pub use generator::{FlatWorldGenerator, TerrainGenerator};
pub use job_queue::{JobQueue, JobStats, MeshJob, MeshJobResult, WorkerHandle};
pub use logging::LogLevel;
pub use mesh::{mesh_segment, Mesh, MeshAlgorithm, MeshStats, Vertex};
pub use meshing_config::MeshingConfig;
pub use quadtree::{Aabb2d, Quadtree};
pub use voxel::{is_solid, is_transparent, properties, Face, FacePattern, VoxelId, AIR};
pub use world::WorldManager;
