//! # Shapefile Index Restore
//!
//! Rebuilds a missing `.shx` sidecar by walking the record headers of the
//! `.shp` main file. The index is a copy of the main-file header (with its
//! own length) followed by one `(offset, content_length)` pair per record,
//! both big-endian and measured in 16-bit words.

use std::path::{Path, PathBuf};

use crate::error::{GeoError, Result};

/// Main-file header size in bytes
const HEADER_LEN: usize = 100;
/// Record header size in bytes (record number + content length)
const RECORD_HEADER_LEN: usize = 8;
/// ESRI file code at offset 0
const FILE_CODE: i32 = 9994;

/// One `.shx` entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// Record header offset, in 16-bit words
    pub offset_words: i32,
    /// Record content length, in 16-bit words
    pub content_words: i32,
}

fn read_be_i32(bytes: &[u8], at: usize) -> i32 {
    i32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Sidecar of `shp_path` with extension `ext`, in whichever case exists on
/// disk (`lots.prj` or `LOTS.PRJ`). When neither exists, the case follows the
/// `.shp` extension.
pub fn sidecar_path(shp_path: &Path, ext: &str) -> PathBuf {
    let lower = shp_path.with_extension(ext.to_ascii_lowercase());
    let upper = shp_path.with_extension(ext.to_ascii_uppercase());
    if lower.exists() {
        return lower;
    }
    if upper.exists() {
        return upper;
    }

    let shp_is_upper = shp_path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.chars().any(|c| c.is_ascii_uppercase()) && !e.chars().any(|c| c.is_ascii_lowercase()));
    if shp_is_upper {
        upper
    } else {
        lower
    }
}

/// Path of the index sidecar for a `.shp` file
pub fn index_path(shp_path: &Path) -> PathBuf {
    sidecar_path(shp_path, "shx")
}

/// Scan `.shp` bytes and list the record index entries
pub fn scan_records(shp_path: &Path, bytes: &[u8]) -> Result<Vec<IndexEntry>> {
    let corrupt = |reason: String| GeoError::Corrupt {
        path: shp_path.to_path_buf(),
        reason,
    };

    if bytes.len() < HEADER_LEN {
        return Err(corrupt(format!("{} bytes is shorter than the header", bytes.len())));
    }
    let code = read_be_i32(bytes, 0);
    if code != FILE_CODE {
        return Err(corrupt(format!("file code {} (expected {})", code, FILE_CODE)));
    }

    let mut entries = Vec::new();
    let mut pos = HEADER_LEN;
    while pos < bytes.len() {
        if pos + RECORD_HEADER_LEN > bytes.len() {
            return Err(corrupt(format!("truncated record header at byte {}", pos)));
        }
        let content_words = read_be_i32(bytes, pos + 4);
        if content_words < 0 {
            return Err(corrupt(format!("negative content length at byte {}", pos)));
        }
        let end = pos + RECORD_HEADER_LEN + content_words as usize * 2;
        if end > bytes.len() {
            return Err(corrupt(format!(
                "record at byte {} runs past end of file ({} > {})",
                pos,
                end,
                bytes.len()
            )));
        }
        entries.push(IndexEntry {
            offset_words: (pos / 2) as i32,
            content_words,
        });
        pos = end;
    }

    Ok(entries)
}

/// Serialize an index file for the given main-file header and entries
pub fn encode_index(shp_header: &[u8], entries: &[IndexEntry]) -> Vec<u8> {
    let total = HEADER_LEN + entries.len() * RECORD_HEADER_LEN;
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&shp_header[..HEADER_LEN]);
    out[24..28].copy_from_slice(&((total / 2) as i32).to_be_bytes());
    for entry in entries {
        out.extend_from_slice(&entry.offset_words.to_be_bytes());
        out.extend_from_slice(&entry.content_words.to_be_bytes());
    }
    out
}

/// Rebuild `<name>.shx` next to `<name>.shp`. Returns the written path.
pub fn restore_index(shp_path: &Path) -> Result<PathBuf> {
    let bytes = std::fs::read(shp_path).map_err(|source| GeoError::Io {
        path: shp_path.to_path_buf(),
        source,
    })?;
    let entries = scan_records(shp_path, &bytes)?;

    let shx_path = index_path(shp_path);
    std::fs::write(&shx_path, encode_index(&bytes, &entries)).map_err(|source| GeoError::Write {
        path: shx_path.clone(),
        source,
    })?;

    tracing::warn!(
        "Restored missing spatial index {} ({} records)",
        shx_path.display(),
        entries.len()
    );
    Ok(shx_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{clockwise_square, polygon_shp_bytes};

    fn square(x: f64, y: f64) -> Vec<(f64, f64)> {
        clockwise_square(x, y, 1.0)
    }

    #[test]
    fn scans_every_record() {
        let bytes = polygon_shp_bytes(&[square(0.0, 0.0), square(5.0, 5.0)]);
        let entries = scan_records(Path::new("lots.shp"), &bytes).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].offset_words, 50);
        // shape type + bbox + counts + one part index + 5 points
        let content_bytes = 4 + 32 + 4 + 4 + 4 + 5 * 16;
        assert_eq!(entries[0].content_words, content_bytes / 2);
        assert_eq!(entries[1].offset_words, 50 + 4 + content_bytes / 2);
    }

    #[test]
    fn encoded_index_has_own_length() {
        let bytes = polygon_shp_bytes(&[square(0.0, 0.0)]);
        let entries = scan_records(Path::new("lots.shp"), &bytes).unwrap();
        let shx = encode_index(&bytes, &entries);

        assert_eq!(shx.len(), 108);
        assert_eq!(read_be_i32(&shx, 0), FILE_CODE);
        assert_eq!(read_be_i32(&shx, 24), 54);
        assert_eq!(read_be_i32(&shx, 100), 50);
    }

    #[test]
    fn rejects_bad_file_code_and_truncation() {
        let mut bytes = polygon_shp_bytes(&[square(0.0, 0.0)]);
        bytes.truncate(bytes.len() - 3);
        assert!(matches!(
            scan_records(Path::new("lots.shp"), &bytes),
            Err(GeoError::Corrupt { .. })
        ));

        let mut bytes = polygon_shp_bytes(&[square(0.0, 0.0)]);
        bytes[3] = 0;
        assert!(matches!(
            scan_records(Path::new("lots.shp"), &bytes),
            Err(GeoError::Corrupt { .. })
        ));
    }

    #[test]
    fn restore_writes_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let shp = dir.path().join("lots.shp");
        std::fs::write(&shp, polygon_shp_bytes(&[square(0.0, 0.0)])).unwrap();

        let shx = restore_index(&shp).unwrap();
        assert_eq!(shx, dir.path().join("lots.shx"));
        assert_eq!(std::fs::read(&shx).unwrap().len(), 108);
    }

    #[test]
    fn unwritable_sidecar_is_a_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let shp = dir.path().join("lots.shp");
        std::fs::write(&shp, polygon_shp_bytes(&[square(0.0, 0.0)])).unwrap();
        // A directory in the way fails the write regardless of privileges
        std::fs::create_dir(dir.path().join("lots.shx")).unwrap();

        let err = restore_index(&shp).unwrap_err();
        assert!(matches!(err, GeoError::Write { .. }));
        assert!(err.to_string().starts_with("Failed to write"));
    }

    #[test]
    fn sidecars_follow_either_case() {
        let dir = tempfile::tempdir().unwrap();
        let shp = dir.path().join("LOTS.SHP");
        assert_eq!(index_path(&shp), dir.path().join("LOTS.SHX"));
        assert_eq!(index_path(&dir.path().join("lots.shp")), dir.path().join("lots.shx"));

        std::fs::write(dir.path().join("LOTS.PRJ"), "GEOGCS[]").unwrap();
        assert!(sidecar_path(&shp, "prj").exists());
        assert!(sidecar_path(&dir.path().join("LOTS.shp"), "prj").exists());
    }
}
