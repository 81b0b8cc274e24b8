//! Save/load orchestration: full-save commit protocol, load, quick-save,
//! auto-save, continuous single-column saving, and save browsing.
//!
//! Grounded on the original `SaveManager`'s operation sequence (mutex-gated
//! save/load, temp-dir-then-rename commit, manifest merge) adapted to the
//! teacher's `Result<_, String>` + tagged-logging idiom and an explicit
//! `Arc<Mutex<WorldManager>>` in place of a raw pointer shared with a game
//! object.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, TryLockError};
use std::thread::JoinHandle;
use std::time::Duration;

use voxel_world::{logging::log_at, logging::warn, ColumnKey, LogLevel, WorldManager};

use crate::chunk_file::{self, chunk_file_name};
use crate::manifest::Manifest;
use crate::metadata::{self, CameraMode, SaveMetadata};

const TAG: &str = "SaveManager";

/// Summary of one save directory, as returned by [`SaveManager::list_saves`]
/// and [`SaveManager::get_save_info`].
#[derive(Debug, Clone, PartialEq)]
pub struct SaveInfo {
    pub name: String,
    pub display_name: String,
    pub play_time_seconds: u64,
    pub player_position: [f32; 3],
    pub camera_mode: CameraMode,
    pub has_quick_save: bool,
    pub has_auto_save: bool,
}

struct AutoSaveHandle {
    shutdown: Arc<(Mutex<bool>, Condvar)>,
    handle: JoinHandle<()>,
}

pub struct SaveManager {
    base_dir: PathBuf,
    world: Arc<Mutex<WorldManager>>,
    save_mutex: Mutex<()>,
    current_save_name: Mutex<Option<String>>,
    autosave: Mutex<Option<AutoSaveHandle>>,
}

impl SaveManager {
    pub fn new(base_dir: impl Into<PathBuf>, world: Arc<Mutex<WorldManager>>) -> Self {
        let base_dir = base_dir.into();
        if let Err(e) = fs::create_dir_all(&base_dir) {
            warn(TAG, &format!("failed to create base save directory {}: {}", base_dir.display(), e));
        } else {
            log_at(LogLevel::Normal, TAG, &format!("initialized with save directory: {}", base_dir.display()));
        }
        SaveManager {
            base_dir,
            world,
            save_mutex: Mutex::new(()),
            current_save_name: Mutex::new(None),
            autosave: Mutex::new(None),
        }
    }

    fn save_path(&self, name: &str) -> PathBuf {
        self.base_dir.join(name)
    }

    /// Non-blocking acquire: `Err` means a save/load is already in flight.
    fn try_acquire(&self) -> Result<std::sync::MutexGuard<'_, ()>, ()> {
        match self.save_mutex.try_lock() {
            Ok(guard) => Ok(guard),
            Err(TryLockError::Poisoned(p)) => Ok(p.into_inner()),
            Err(TryLockError::WouldBlock) => Err(()),
        }
    }

    pub fn is_operation_in_progress(&self) -> bool {
        self.save_mutex.try_lock().is_err()
    }

    pub fn current_save_name(&self) -> Option<String> {
        self.current_save_name.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Creates a new, empty save directory with initial metadata. A no-op
    /// (not an error) if the save already exists.
    pub fn create_save(&self, name: &str, display_name: Option<&str>) -> bool {
        if name.is_empty() {
            warn(TAG, "cannot create save with empty name");
            return false;
        }
        let path = self.save_path(name);
        if path.exists() {
            log_at(LogLevel::Normal, TAG, &format!("save already exists: {name}"));
            return true;
        }
        if let Err(e) = fs::create_dir_all(path.join("chunks")) {
            warn(TAG, &format!("failed to create save directories for {name}: {e}"));
            return false;
        }
        let meta = SaveMetadata::new(display_name.unwrap_or(name));
        if let Err(e) = meta.save(&path.join("metadata.json")) {
            warn(TAG, &format!("failed to write initial metadata for {name}: {e}"));
            return false;
        }
        log_at(LogLevel::Normal, TAG, &format!("created new save: {name}"));
        true
    }

    /// Full save to `name`: metadata, player blob, every modified chunk, and
    /// a merged manifest, committed atomically via temp-dir-then-rename.
    pub fn save_game(
        &self,
        name: &str,
        player_position: [f32; 3],
        camera_mode: CameraMode,
        camera_yaw: f32,
        camera_pitch: f32,
    ) -> bool {
        let _guard = match self.try_acquire() {
            Ok(g) => g,
            Err(()) => {
                log_at(LogLevel::Normal, TAG, "save rejected: operation already in progress");
                return false;
            }
        };

        log_at(LogLevel::Normal, TAG, &format!("starting save: {name}"));
        let save_path = self.save_path(name);
        let temp_path = self.save_path(&format!("{name}_temp"));

        if let Err(e) = fs::create_dir_all(temp_path.join("chunks")) {
            warn(TAG, &format!("failed to create temp save directories for {name}: {e}"));
            return false;
        }

        let mut meta = SaveMetadata::new(name);
        meta.player_position = player_position;
        meta.camera_mode = camera_mode;
        meta.camera_yaw = camera_yaw;
        meta.camera_pitch = camera_pitch;
        if let Err(e) = meta.save(&temp_path.join("metadata.json")) {
            warn(TAG, &format!("failed to save metadata for {name}: {e}"));
            let _ = fs::remove_dir_all(&temp_path);
            return false;
        }

        if let Err(e) = metadata::save_player_blob(&temp_path.join("player.json"), &metadata::default_player_blob()) {
            warn(TAG, &format!("failed to save player data for {name}: {e}"));
            let _ = fs::remove_dir_all(&temp_path);
            return false;
        }

        let modified = {
            let mut world = self.world.lock().unwrap_or_else(|p| p.into_inner());
            world.take_modified()
        };

        // On prior manifest: start from the old save's manifest (if any) so
        // a full save of only the changed chunks still lists everything.
        let old_manifest_path = save_path.join("chunks/manifest.json");
        let mut manifest = match Manifest::load(&old_manifest_path) {
            Ok(m) => m,
            Err(e) => {
                warn(TAG, &format!("failed to read prior manifest for {name}, starting fresh: {e}"));
                Manifest::default()
            }
        };

        let chunks_path = temp_path.join("chunks");
        let world = self.world.lock().unwrap_or_else(|p| p.into_inner());
        let mut saved_keys = Vec::with_capacity(modified.len());
        for (key, _) in &modified {
            let file_path = chunks_path.join(chunk_file_name(*key));
            let result = world.with_column(*key, |col| chunk_file::write_column(&file_path, col));
            match result {
                Some(Ok(())) => saved_keys.push((key.x, key.z)),
                Some(Err(e)) => warn(TAG, &format!("failed to save chunk ({}, {}): {}", key.x, key.z, e)),
                None => {} // evicted since it was marked dirty; nothing to persist
            }
        }
        drop(world);

        manifest.merge(saved_keys.iter().copied());
        if let Err(e) = manifest.save(&chunks_path.join("manifest.json")) {
            warn(TAG, &format!("failed to write manifest for {name}: {e}"));
            let _ = fs::remove_dir_all(&temp_path);
            // modification tracker is left untouched so a retry re-saves these chunks
            let mut world = self.world.lock().unwrap_or_else(|p| p.into_inner());
            world.mark_all_save_dirty(modified.into_iter().map(|(k, _)| k));
            return false;
        }

        if let Err(e) = commit_temp_dir(&temp_path, &save_path) {
            warn(TAG, &format!("failed to finalize save {name}: {e}"));
            let mut world = self.world.lock().unwrap_or_else(|p| p.into_inner());
            world.mark_all_save_dirty(modified.into_iter().map(|(k, _)| k));
            return false;
        }

        *self.current_save_name.lock().unwrap_or_else(|p| p.into_inner()) = Some(name.to_string());
        log_at(LogLevel::Normal, TAG, &format!("save completed: {name} ({} chunks)", saved_keys.len()));
        true
    }

    /// Loads `name`, resetting the world manager before repopulating it.
    pub fn load_game(&self, name: &str) -> Option<SaveInfo> {
        let _guard = match self.try_acquire() {
            Ok(g) => g,
            Err(()) => {
                log_at(LogLevel::Normal, TAG, "load rejected: operation already in progress");
                return None;
            }
        };

        log_at(LogLevel::Normal, TAG, &format!("starting load: {name}"));
        let save_path = self.save_path(name);
        if !save_path.exists() {
            warn(TAG, &format!("save does not exist: {name}"));
            return None;
        }

        let meta = match SaveMetadata::load(&save_path.join("metadata.json")) {
            Ok(m) => m,
            Err(e) => {
                warn(TAG, &format!("failed to load metadata for {name}: {e}"));
                return None;
            }
        };

        let result = self.load_chunks(&save_path);

        {
            let mut world = self.world.lock().unwrap_or_else(|p| p.into_inner());
            world.set_loading(false);
        }

        if let Err(e) = result {
            warn(TAG, &format!("failed to load chunks for {name}: {e}"));
            return None;
        }

        *self.current_save_name.lock().unwrap_or_else(|p| p.into_inner()) = Some(name.to_string());
        log_at(LogLevel::Normal, TAG, &format!("load completed: {name}"));
        Some(SaveInfo {
            name: name.to_string(),
            display_name: meta.world_name,
            play_time_seconds: meta.play_time_seconds,
            player_position: meta.player_position,
            camera_mode: meta.camera_mode,
            has_quick_save: self.save_path("quicksave").exists(),
            has_auto_save: self.save_path("autosave").exists(),
        })
    }

    fn load_chunks(&self, save_path: &Path) -> Result<(), String> {
        let manifest = Manifest::load(&save_path.join("chunks/manifest.json"))?;

        let mut world = self.world.lock().unwrap_or_else(|p| p.into_inner());
        world.reset();
        world.set_loading(true);

        let mut loaded_keys = Vec::with_capacity(manifest.chunks.len());
        for entry in &manifest.chunks {
            let key = ColumnKey::new(entry.x, entry.z);
            world.get_or_create_empty_column(key);
            let file_path = save_path.join("chunks").join(chunk_file_name(key));
            let result = world
                .with_column_mut(key, |col| chunk_file::read_column(&file_path, key, col))
                .ok_or_else(|| format!("column {key:?} vanished immediately after creation"))?;
            result?;
            loaded_keys.push(key);
        }
        world.mark_all_save_dirty(loaded_keys);
        Ok(())
    }

    pub fn quick_save(&self, player_position: [f32; 3], camera_mode: CameraMode, camera_yaw: f32, camera_pitch: f32) -> bool {
        self.save_game("quicksave", player_position, camera_mode, camera_yaw, camera_pitch)
    }

    pub fn quick_load(&self) -> Option<SaveInfo> {
        self.load_game("quicksave")
    }

    pub fn perform_auto_save(&self) -> bool {
        self.save_game("autosave", [0.0, 70.0, 0.0], CameraMode::FreeFlying, -90.0, 0.0)
    }

    /// Starts a background thread that calls [`Self::perform_auto_save`]
    /// every `interval`, sleeping on a condition variable so a shutdown
    /// request wakes it immediately instead of waiting out the interval.
    pub fn start_auto_save(self: &Arc<Self>, interval: Duration) {
        self.stop_auto_save();
        let shutdown = Arc::new((Mutex::new(false), Condvar::new()));
        let manager = Arc::clone(self);
        let shutdown_thread = Arc::clone(&shutdown);
        let handle = std::thread::spawn(move || {
            let (lock, cvar) = &*shutdown_thread;
            let mut stop = lock.lock().unwrap_or_else(|p| p.into_inner());
            loop {
                let (guard, result) = cvar
                    .wait_timeout_while(stop, interval, |stop| !*stop)
                    .unwrap_or_else(|p| p.into_inner());
                stop = guard;
                if *stop {
                    break;
                }
                if result.timed_out() {
                    manager.perform_auto_save();
                }
            }
            log_at(LogLevel::Verbose, TAG, "auto-save thread stopped");
        });
        *self.autosave.lock().unwrap_or_else(|p| p.into_inner()) = Some(AutoSaveHandle { shutdown, handle });
        log_at(LogLevel::Normal, TAG, &format!("auto-save started with interval {:?}", interval));
    }

    pub fn stop_auto_save(&self) {
        let handle = self.autosave.lock().unwrap_or_else(|p| p.into_inner()).take();
        if let Some(handle) = handle {
            {
                let (lock, cvar) = &*handle.shutdown;
                *lock.lock().unwrap_or_else(|p| p.into_inner()) = true;
                cvar.notify_one();
            }
            let _ = handle.handle.join();
            log_at(LogLevel::Normal, TAG, "auto-save stopped");
        }
    }

    /// Writes one column immediately outside the full-save commit path.
    /// Skips (without error) if a full save currently holds the mutex, or
    /// if no save is active yet. Idempotent: safe to call repeatedly for
    /// the same column.
    pub fn save_column_immediately(&self, key: ColumnKey) -> Result<(), String> {
        let _guard = match self.try_acquire() {
            Ok(g) => g,
            Err(()) => return Ok(()),
        };
        let Some(name) = self.current_save_name() else {
            return Ok(());
        };
        let chunks_path = self.save_path(&name).join("chunks");
        let file_path = chunks_path.join(chunk_file_name(key));

        let written = {
            let world = self.world.lock().unwrap_or_else(|p| p.into_inner());
            world.with_column(key, |col| chunk_file::write_column(&file_path, col))
        };
        match written {
            Some(Ok(())) => {}
            Some(Err(e)) => return Err(e),
            None => return Ok(()), // column no longer loaded
        }

        let manifest_path = chunks_path.join("manifest.json");
        let mut manifest = Manifest::load(&manifest_path)?;
        manifest.merge([(key.x, key.z)]);
        manifest.save(&manifest_path)
    }

    pub fn list_saves(&self) -> Vec<SaveInfo> {
        let mut saves = Vec::new();
        let entries = match fs::read_dir(&self.base_dir) {
            Ok(e) => e,
            Err(_) => return saves,
        };
        for entry in entries.flatten() {
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if name.ends_with("_temp") {
                continue;
            }
            if let Some(info) = self.get_save_info(&name) {
                saves.push(info);
            }
        }
        saves
    }

    pub fn get_save_info(&self, name: &str) -> Option<SaveInfo> {
        let meta = SaveMetadata::load(&self.save_path(name).join("metadata.json")).ok()?;
        Some(SaveInfo {
            name: name.to_string(),
            display_name: meta.world_name,
            play_time_seconds: meta.play_time_seconds,
            player_position: meta.player_position,
            camera_mode: meta.camera_mode,
            has_quick_save: self.save_path("quicksave").exists(),
            has_auto_save: self.save_path("autosave").exists(),
        })
    }

    pub fn delete_save(&self, name: &str) -> bool {
        let path = self.save_path(name);
        if !path.exists() {
            warn(TAG, &format!("save does not exist: {name}"));
            return false;
        }
        match fs::remove_dir_all(&path) {
            Ok(()) => {
                log_at(LogLevel::Normal, TAG, &format!("deleted save: {name}"));
                true
            }
            Err(e) => {
                warn(TAG, &format!("failed to delete save {name}: {e}"));
                false
            }
        }
    }
}

/// Commit point: replace any existing `dst` with `temp` in as close to one
/// step as `std::fs` allows. If the process dies before this point, `dst`
/// (the prior save) is untouched and `temp` is garbage the next save/list
/// pass tolerates; if it dies during the two-step replace, `dst` may
/// transiently be missing, which is an accepted window for this commit
/// strategy.
fn commit_temp_dir(temp: &Path, dst: &Path) -> Result<(), String> {
    if dst.exists() {
        fs::remove_dir_all(dst).map_err(|e| format!("failed to remove prior save {}: {}", dst.display(), e))?;
    }
    fs::rename(temp, dst).map_err(|e| format!("failed to rename {} to {}: {}", temp.display(), dst.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use voxel_world::{FlatWorldGenerator, TerrainGenerator};

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("world_save_mgr_{}_{}", tag, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn manager(tag: &str) -> (SaveManager, Arc<Mutex<WorldManager>>) {
        let world = Arc::new(Mutex::new(WorldManager::new(Arc::new(FlatWorldGenerator::default()))));
        let mgr = SaveManager::new(scratch_dir(tag), Arc::clone(&world));
        (mgr, world)
    }

    /// Wraps `FlatWorldGenerator` to count how many segments it actually
    /// populates, so a load can be checked against "the generator was not
    /// invoked for this column".
    struct CountingGenerator {
        inner: FlatWorldGenerator,
        calls: AtomicUsize,
    }

    impl TerrainGenerator for CountingGenerator {
        fn generate_segment(&self, segment: &mut voxel_world::ChunkSegment, base_x: i64, segment_y: i32, base_z: i64) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.generate_segment(segment, base_x, segment_y, base_z);
        }
    }

    #[test]
    fn create_save_then_list_finds_it() {
        let (mgr, _world) = manager("create_list");
        assert!(mgr.create_save("world1", Some("My World")));
        let saves = mgr.list_saves();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].display_name, "My World");
    }

    #[test]
    fn save_then_load_round_trips_voxel_edits() {
        let (mgr, world) = manager("roundtrip");
        {
            let mut w = world.lock().unwrap();
            w.set_voxel(10, 10, 10, 42);
        }
        assert!(mgr.save_game("world1", [1.0, 2.0, 3.0], CameraMode::FirstPerson, 45.0, -10.0));

        let info = mgr.load_game("world1").expect("load should succeed");
        assert_eq!(info.camera_mode, CameraMode::FirstPerson);
        assert_eq!(info.player_position, [1.0, 2.0, 3.0]);

        let w = world.lock().unwrap();
        assert_eq!(w.get_voxel(10, 10, 10), 42);
    }

    #[test]
    fn load_missing_save_returns_none() {
        let (mgr, _world) = manager("load_missing");
        assert!(mgr.load_game("nope").is_none());
    }

    #[test]
    fn incremental_save_preserves_prior_manifest_entries() {
        let (mgr, world) = manager("incremental");
        {
            let mut w = world.lock().unwrap();
            w.set_voxel(0, 0, 0, 1);
        }
        assert!(mgr.save_game("world1", [0.0; 3], CameraMode::FreeFlying, 0.0, 0.0));
        {
            let mut w = world.lock().unwrap();
            w.set_voxel(1000, 0, 1000, 2);
        }
        assert!(mgr.save_game("world1", [0.0; 3], CameraMode::FreeFlying, 0.0, 0.0));

        let manifest = Manifest::load(&mgr.save_path("world1").join("chunks/manifest.json")).unwrap();
        assert_eq!(manifest.chunks.len(), 2);
    }

    #[test]
    fn second_save_while_first_in_flight_is_rejected() {
        let (mgr, _world) = manager("race");
        let _guard = mgr.try_acquire().unwrap();
        assert!(!mgr.save_game("world1", [0.0; 3], CameraMode::FreeFlying, 0.0, 0.0));
    }

    #[test]
    fn delete_save_removes_directory() {
        let (mgr, _world) = manager("delete");
        mgr.create_save("world1", None);
        assert!(mgr.delete_save("world1"));
        assert!(!mgr.save_path("world1").exists());
    }

    #[test]
    fn quick_save_and_quick_load_use_conventional_name() {
        let (mgr, _world) = manager("quicksave");
        assert!(mgr.quick_save([5.0, 6.0, 7.0], CameraMode::FreeFlying, 0.0, 0.0));
        assert!(mgr.save_path("quicksave").exists());
        assert!(mgr.quick_load().is_some());
    }

    #[test]
    fn continuous_save_writes_a_single_column_without_full_save() {
        let (mgr, world) = manager("continuous");
        mgr.create_save("world1", None);
        *mgr.current_save_name.lock().unwrap() = Some("world1".to_string());
        let key = {
            let mut w = world.lock().unwrap();
            w.set_voxel(0, 0, 0, 9);
            ColumnKey::new(0, 0)
        };
        mgr.save_column_immediately(key).unwrap();
        let file = mgr.save_path("world1").join("chunks").join(chunk_file_name(key));
        assert!(file.exists());
    }

    #[test]
    fn empty_world_save_round_trips_metadata_with_no_chunks() {
        let (mgr, world) = manager("empty_world");
        mgr.create_save("empty", Some("Empty"));
        assert!(mgr.save_game("empty", [1.0, 2.0, 3.0], CameraMode::FirstPerson, 0.5, -0.2));

        let manifest = Manifest::load(&mgr.save_path("empty").join("chunks/manifest.json")).unwrap();
        assert!(manifest.chunks.is_empty());

        assert!(mgr.load_game("empty").is_some());
        let w = world.lock().unwrap();
        assert_eq!(w.get_voxel(0, 0, 0), voxel_world::AIR);
        assert_eq!(w.get_voxel(1234, 56, -789), voxel_world::AIR);
    }

    #[test]
    fn load_does_not_regenerate_persisted_columns_but_does_generate_new_ones() {
        let dir = scratch_dir("load_no_regen");

        // First process: populate and save a single column.
        {
            let world = Arc::new(Mutex::new(WorldManager::new(Arc::new(FlatWorldGenerator::default()))));
            let mgr = SaveManager::new(dir.clone(), Arc::clone(&world));
            mgr.create_save("world1", None);
            {
                let mut w = world.lock().unwrap();
                w.update_active_set(0, 0, 0, 0); // just the origin column
            }
            assert!(mgr.save_game("world1", [0.0; 3], CameraMode::FreeFlying, 0.0, 0.0));
        }

        // Second process: fresh world backed by a call-counting generator.
        let generator = Arc::new(CountingGenerator { inner: FlatWorldGenerator::default(), calls: AtomicUsize::new(0) });
        let world = Arc::new(Mutex::new(WorldManager::new(Arc::clone(&generator) as Arc<dyn TerrainGenerator>)));
        let mgr = SaveManager::new(dir, Arc::clone(&world));
        assert!(mgr.load_game("world1").is_some());
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0, "generator must not run for a persisted column");

        {
            let mut w = world.lock().unwrap();
            w.update_active_set(10_000 * voxel_world::SEGMENT_SIZE as i64, 0, 0, 0);
        }
        assert!(generator.calls.load(Ordering::SeqCst) > 0, "generator must run for a newly demanded column");
    }
}
