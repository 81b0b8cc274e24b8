//! Per-column binary file format (`chunk_<X>_<Z>.bin`): a magic header, a
//! segment presence bitmap, and one flat voxel-id array per present segment.

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use voxel_world::{ChunkColumn, ColumnKey, COLUMN_HEIGHT, SEGMENT_SIZE};

const MAGIC: [u8; 4] = *b"VCWC";
const VERSION: u32 = 1;
const SEGMENT_VOLUME: usize = SEGMENT_SIZE * SEGMENT_SIZE * SEGMENT_SIZE;

pub fn chunk_file_name(key: ColumnKey) -> String {
    format!("chunk_{}_{}.bin", key.x, key.z)
}

/// Writes `column` as a `VCWC` binary file. Only segments that have been
/// generated are persisted; the rest are implied AIR on load.
pub fn write_column(path: &Path, column: &ChunkColumn) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create chunks directory {}: {}", parent.display(), e))?;
    }

    let mut bitmap: u16 = 0;
    for (i, segment) in column.segments() {
        if segment.is_generated() {
            bitmap |= 1 << i;
        }
    }

    let mut buf = Vec::with_capacity(4 + 4 + 8 + 8 + 2 + (bitmap.count_ones() as usize) * SEGMENT_VOLUME);
    buf.extend_from_slice(&MAGIC);
    buf.extend_from_slice(&VERSION.to_le_bytes());
    let (base_x, base_z) = column.base();
    buf.extend_from_slice(&base_x.to_le_bytes());
    buf.extend_from_slice(&base_z.to_le_bytes());
    buf.extend_from_slice(&bitmap.to_le_bytes());
    for (i, segment) in column.segments() {
        if bitmap & (1 << i) != 0 {
            buf.extend_from_slice(segment.voxels().as_slice());
        }
    }

    let mut file = fs::File::create(path)
        .map_err(|e| format!("Failed to create chunk file {}: {}", path.display(), e))?;
    file.write_all(&buf)
        .map_err(|e| format!("Failed to write chunk file {}: {}", path.display(), e))
}

/// Reads a `VCWC` binary file into `column`, which must already exist
/// (typically via `get_or_create_empty_column`). Validates magic, version,
/// and that the file's coordinates match `expected_key`; any mismatch or
/// truncation aborts without partially applying the file.
pub fn read_column(path: &Path, expected_key: ColumnKey, column: &mut ChunkColumn) -> Result<(), String> {
    let mut file = fs::File::open(path)
        .map_err(|e| format!("Failed to open chunk file {}: {}", path.display(), e))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| format!("Failed to read chunk file {}: {}", path.display(), e))?;

    let header_len = 4 + 4 + 8 + 8 + 2;
    if bytes.len() < header_len {
        return Err(format!("Chunk file {} is truncated (no header)", path.display()));
    }

    if bytes[0..4] != MAGIC {
        return Err(format!("Chunk file {} has invalid magic", path.display()));
    }

    let version = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
    if version != VERSION {
        return Err(format!("Chunk file {} has unsupported version {}", path.display(), version));
    }

    let base_x = i64::from_le_bytes(bytes[8..16].try_into().unwrap());
    let base_z = i64::from_le_bytes(bytes[16..24].try_into().unwrap());
    if base_x != expected_key.x || base_z != expected_key.z {
        return Err(format!(
            "Chunk file {} coordinates ({}, {}) do not match expected ({}, {})",
            path.display(),
            base_x,
            base_z,
            expected_key.x,
            expected_key.z
        ));
    }

    let bitmap = u16::from_le_bytes(bytes[24..26].try_into().unwrap());
    let mut offset = header_len;
    for i in 0..COLUMN_HEIGHT {
        if bitmap & (1 << i) == 0 {
            continue;
        }
        if offset + SEGMENT_VOLUME > bytes.len() {
            return Err(format!("Chunk file {} is truncated (segment {})", path.display(), i));
        }
        let mut voxels = Box::new([0u8; SEGMENT_VOLUME]);
        voxels.copy_from_slice(&bytes[offset..offset + SEGMENT_VOLUME]);
        offset += SEGMENT_VOLUME;

        if let Some(segment) = column.segment_mut(i as i32) {
            *segment = voxel_world::ChunkSegment::from_voxels(voxels);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxel_world::AIR;

    fn scratch_path(tag: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("world_save_chunkfile_{}_{}.bin", tag, std::process::id()))
    }

    #[test]
    fn write_then_read_round_trips_voxel_data() {
        let key = ColumnKey::new(64, -32);
        let mut column = ChunkColumn::new(key.x, key.z);
        column.set_voxel(64, 5, -32, 7);
        column.segment_mut(0).unwrap().mark_generated();

        let path = scratch_path("roundtrip");
        write_column(&path, &column).unwrap();

        let mut loaded = ChunkColumn::new(key.x, key.z);
        read_column(&path, key, &mut loaded).unwrap();
        assert_eq!(loaded.get_voxel(64, 5, -32), 7);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn ungenerated_segments_are_not_persisted() {
        let key = ColumnKey::new(0, 0);
        let mut column = ChunkColumn::new(key.x, key.z);
        column.segment_mut(0).unwrap().mark_generated();
        // segment 1 left ungenerated

        let path = scratch_path("sparse");
        write_column(&path, &column).unwrap();
        let bytes = fs::read(&path).unwrap();
        let bitmap = u16::from_le_bytes(bytes[24..26].try_into().unwrap());
        assert_eq!(bitmap, 0b1);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn mismatched_key_is_rejected() {
        let key = ColumnKey::new(0, 0);
        let column = ChunkColumn::new(key.x, key.z);
        let path = scratch_path("mismatch");
        write_column(&path, &column).unwrap();

        let mut loaded = ChunkColumn::new(32, 32);
        let err = read_column(&path, ColumnKey::new(32, 32), &mut loaded).unwrap_err();
        assert!(err.contains("coordinates"));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let path = scratch_path("badmagic");
        fs::write(&path, [0u8; 30]).unwrap();
        let mut loaded = ChunkColumn::new(0, 0);
        let err = read_column(&path, ColumnKey::new(0, 0), &mut loaded).unwrap_err();
        assert!(err.contains("magic"));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn absent_segments_read_back_as_air() {
        let key = ColumnKey::new(0, 0);
        let mut column = ChunkColumn::new(key.x, key.z);
        column.segment_mut(0).unwrap().mark_generated();
        let path = scratch_path("absent_air");
        write_column(&path, &column).unwrap();

        let mut loaded = ChunkColumn::new(key.x, key.z);
        read_column(&path, key, &mut loaded).unwrap();
        assert_eq!(loaded.get_voxel(0, 250, 0), AIR); // segment 7, never written
        let _ = fs::remove_file(&path);
    }
}
