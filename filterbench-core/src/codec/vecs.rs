//! Length-prefixed binary vector files (`.fvecs` / `.ivecs`).
//!
//! # Format
//!
//! A file is a sequence of records:
//! ```text
//! [dim:i32 LE][elem:4 bytes LE]*dim
//! ```
//! Elements are `f32` for vector files and `i32` for integer lists such as
//! ground truth. A trailing record that cannot be read completely marks the
//! end of the file; it is not an error.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use memmap2::Mmap;
use tracing::{error, warn};

use crate::error::{Error, Result};
use crate::vector::VectorSet;

/// One integer list per query, in file order.
pub type IdLists = Vec<Vec<i32>>;

/// Iterates over the complete records of a vecs buffer.
struct Records<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Records<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Logs bytes left over after the last decodable record.
    fn warn_if_truncated(&self) {
        let leftover = self.bytes.len() - self.pos;
        if leftover > 0 {
            warn!(
                offset = self.pos,
                bytes = leftover,
                "undecodable trailing bytes ignored"
            );
        }
    }
}

impl<'a> Iterator for Records<'a> {
    /// (dimension, payload bytes)
    type Item = (usize, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let header = self.bytes.get(self.pos..self.pos + 4)?;
        let dim = i32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        if dim < 0 {
            return None;
        }
        let dim = dim as usize;
        let start = self.pos + 4;
        let payload = self.bytes.get(start..start + dim * 4)?;
        self.pos = start + dim * 4;
        Some((dim, payload))
    }
}

/// Decodes an fvecs buffer.
///
/// The dimension of the first record becomes the set's dimension. A later
/// record of a different dimension cannot be stored in a rectangular set, so
/// decoding stops there with a warning.
pub fn decode_fvecs(bytes: &[u8]) -> VectorSet {
    let mut records = Records::new(bytes);
    let Some((dimension, first)) = records.next() else {
        records.warn_if_truncated();
        return VectorSet::default();
    };

    let mut data: Vec<f32> = Vec::with_capacity(bytes.len() / 4);
    data.extend(first.chunks_exact(4).map(le_f32));
    let mut count = 1usize;
    let mut dimension_changed = false;

    for (dim, payload) in records.by_ref() {
        if dim != dimension {
            warn!(
                record = count,
                expected = dimension,
                got = dim,
                "fvecs dimension changed mid-file, stopping"
            );
            dimension_changed = true;
            break;
        }
        data.extend(payload.chunks_exact(4).map(le_f32));
        count += 1;
    }
    if !dimension_changed {
        records.warn_if_truncated();
    }

    // data.len() == count * dimension by construction
    VectorSet::from_flat(dimension, data).unwrap_or_default()
}

/// Decodes an ivecs buffer. Lists may have different lengths.
pub fn decode_ivecs(bytes: &[u8]) -> IdLists {
    let mut records = Records::new(bytes);
    let lists: IdLists = records
        .by_ref()
        .map(|(_, payload)| payload.chunks_exact(4).map(le_i32).collect())
        .collect();
    records.warn_if_truncated();
    lists
}

/// Reads an fvecs file.
///
/// An unreadable path is logged and yields an empty set; callers must check
/// for emptiness.
pub fn read_fvecs<P: AsRef<Path>>(path: P) -> VectorSet {
    let path = path.as_ref();
    match with_mapped(path, decode_fvecs) {
        Ok(set) => set,
        Err(e) => {
            error!(path = %path.display(), error = %e, "unable to open vector file");
            VectorSet::default()
        }
    }
}

/// Reads an ivecs file. Same failure behavior as [`read_fvecs`].
pub fn read_ivecs<P: AsRef<Path>>(path: P) -> IdLists {
    let path = path.as_ref();
    match with_mapped(path, decode_ivecs) {
        Ok(lists) => lists,
        Err(e) => {
            error!(path = %path.display(), error = %e, "unable to open integer-list file");
            Vec::new()
        }
    }
}

/// Maps `path` read-only and hands the bytes to `decode`.
fn with_mapped<T: Default>(path: &Path, decode: impl FnOnce(&[u8]) -> T) -> Result<T> {
    let file = File::open(path)
        .map_err(|e| Error::Io(format!("open {} failed: {}", path.display(), e)))?;
    let len = file
        .metadata()
        .map_err(|e| Error::Io(format!("metadata {} failed: {}", path.display(), e)))?
        .len();
    if len == 0 {
        return Ok(T::default());
    }

    // SAFETY: the map is read-only and dropped before returning. Input files
    // are not expected to be modified while a run reads them.
    let mmap = unsafe { Mmap::map(&file) }
        .map_err(|e| Error::Io(format!("mmap {} failed: {}", path.display(), e)))?;
    Ok(decode(&mmap[..]))
}

/// Writes a vector set as fvecs.
pub fn write_fvecs<P: AsRef<Path>>(path: P, vectors: &VectorSet) -> Result<()> {
    let dim = vectors.dimension() as i32;
    write_records(path.as_ref(), vectors.rows(), |w, row| {
        w.write_all(&dim.to_le_bytes())?;
        for v in row {
            w.write_all(&v.to_le_bytes())?;
        }
        Ok(())
    })
}

/// Writes integer lists as ivecs.
pub fn write_ivecs<P: AsRef<Path>>(path: P, lists: &[Vec<i32>]) -> Result<()> {
    write_records(path.as_ref(), lists.iter(), |w, list| {
        w.write_all(&(list.len() as i32).to_le_bytes())?;
        for v in list {
            w.write_all(&v.to_le_bytes())?;
        }
        Ok(())
    })
}

fn write_records<I, F>(path: &Path, records: I, mut write_one: F) -> Result<()>
where
    I: Iterator,
    F: FnMut(&mut BufWriter<File>, I::Item) -> std::io::Result<()>,
{
    let file = File::create(path)
        .map_err(|e| Error::Io(format!("create {} failed: {}", path.display(), e)))?;
    let mut writer = BufWriter::new(file);
    for record in records {
        write_one(&mut writer, record)
            .map_err(|e| Error::Io(format!("write {} failed: {}", path.display(), e)))?;
    }
    writer
        .flush()
        .map_err(|e| Error::Io(format!("flush {} failed: {}", path.display(), e)))
}

#[inline]
fn le_f32(b: &[u8]) -> f32 {
    f32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

#[inline]
fn le_i32(b: &[u8]) -> i32 {
    i32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_path(ext: &str) -> PathBuf {
        let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join("filterbench_test_vecs");
        let _ = std::fs::create_dir_all(&dir);
        dir.join(format!("v_{}_{}.{}", std::process::id(), id, ext))
    }

    fn fvecs_record(values: &[f32]) -> Vec<u8> {
        let mut out = (values.len() as i32).to_le_bytes().to_vec();
        for v in values {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out
    }

    #[test]
    fn test_truncated_trailing_record_is_eof() {
        let mut bytes = Vec::new();
        for i in 0..3 {
            let base = i as f32;
            bytes.extend(fvecs_record(&[base, base + 1.0, base + 2.0, base + 3.0]));
        }
        // 4th record: header says 4 but only 2 elements follow
        bytes.extend_from_slice(&4i32.to_le_bytes());
        bytes.extend_from_slice(&9.0f32.to_le_bytes());
        bytes.extend_from_slice(&9.5f32.to_le_bytes());

        let set = decode_fvecs(&bytes);
        assert_eq!(set.len(), 3);
        assert_eq!(set.dimension(), 4);
        assert_eq!(set.row(2), &[2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_truncated_header_is_eof() {
        let mut bytes = fvecs_record(&[1.0, 2.0]);
        bytes.extend_from_slice(&[2, 0]);
        assert_eq!(decode_fvecs(&bytes).len(), 1);
    }

    #[test]
    fn test_dimension_change_stops_decoding() {
        let mut bytes = fvecs_record(&[1.0, 2.0]);
        bytes.extend(fvecs_record(&[3.0, 4.0]));
        bytes.extend(fvecs_record(&[5.0, 6.0, 7.0]));
        bytes.extend(fvecs_record(&[8.0, 9.0]));

        let set = decode_fvecs(&bytes);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_ivecs_variable_lengths() {
        let mut bytes = Vec::new();
        for list in [vec![1i32, 2, 3], vec![], vec![7]] {
            bytes.extend_from_slice(&(list.len() as i32).to_le_bytes());
            for v in list {
                bytes.extend_from_slice(&v.to_le_bytes());
            }
        }
        assert_eq!(decode_ivecs(&bytes), vec![vec![1, 2, 3], vec![], vec![7]]);
    }

    #[test]
    fn test_empty_buffer() {
        assert!(decode_fvecs(&[]).is_empty());
        assert!(decode_ivecs(&[]).is_empty());
    }

    #[test]
    fn test_write_then_read_files() {
        let path = temp_path("fvecs");
        let set = VectorSet::from_rows(&[vec![0.5f32, -1.0, 2.0], vec![3.0, 4.0, 5.0]]).unwrap();
        write_fvecs(&path, &set).unwrap();
        assert_eq!(read_fvecs(&path), set);
        let _ = std::fs::remove_file(&path);

        let path = temp_path("ivecs");
        let lists = vec![vec![4, 2], vec![9, 8, 7]];
        write_ivecs(&path, &lists).unwrap();
        assert_eq!(read_ivecs(&path), lists);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file_yields_empty() {
        let path = temp_path("missing");
        assert!(read_fvecs(&path).is_empty());
        assert!(read_ivecs(&path).is_empty());
    }

    #[test]
    fn test_empty_file_yields_empty() {
        let path = temp_path("fvecs");
        std::fs::write(&path, b"").unwrap();
        assert!(read_fvecs(&path).is_empty());
        let _ = std::fs::remove_file(&path);
    }
}
