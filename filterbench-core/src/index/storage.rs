//! On-disk format for [`HnswIndex`].
//!
//! # Format
//!
//! All integers and floats are little-endian.
//!
//! ```text
//! [magic:8 = "FBHNSWIX"][version:u32][header_len:u32][header:json]
//! [vectors:f32*count*dim]
//! [metadata:i32*count]
//! count × ([level:u32] (level+1) × ([len:u32][ids:u32*len]))
//! [crc32:u32]
//! ```
//!
//! The trailing checksum covers every byte before it. Any validation
//! failure on load is reported as [`Error::IndexCorrupted`].

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::index::hnsw::{HnswIndex, HnswParams, Node};
use crate::vector::VectorSet;

const MAGIC: &[u8; 8] = b"FBHNSWIX";
const VERSION: u32 = 1;
/// magic + version + header_len + crc
const MIN_FILE_LEN: usize = 8 + 4 + 4 + 4;

#[derive(Debug, Serialize, Deserialize)]
struct IndexHeader {
    params: HnswParams,
    dimension: usize,
    count: usize,
    entry_point: Option<u32>,
    max_level: usize,
}

/// Writer that feeds everything it writes into a CRC32.
struct ChecksumWriter<W: Write> {
    inner: W,
    hasher: crc32fast::Hasher,
}

impl<W: Write> ChecksumWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: crc32fast::Hasher::new(),
        }
    }

    fn put(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_all(bytes)
            .map_err(|e| Error::Io(format!("write index failed: {}", e)))
    }

    fn put_u32(&mut self, value: u32) -> Result<()> {
        self.put(&value.to_le_bytes())
    }

    /// Writes the checksum trailer and flushes.
    fn finish(mut self) -> Result<()> {
        let checksum = self.hasher.finalize();
        self.inner
            .write_all(&checksum.to_le_bytes())
            .and_then(|_| self.inner.flush())
            .map_err(|e| Error::Io(format!("write index trailer failed: {}", e)))
    }
}

impl<W: Write> Write for ChecksumWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.hasher.update(&buf[..written]);
        Ok(written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Bounds-checked little-endian reader over the checksummed body.
struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| Error::IndexCorrupted(format!("truncated while reading {}", what)))?;
        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn u32(&mut self, what: &str) -> Result<u32> {
        let bytes = self.take(4, what)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn words(&mut self, count: usize, what: &str) -> Result<impl Iterator<Item = [u8; 4]> + 'a> {
        let len = count
            .checked_mul(4)
            .ok_or_else(|| Error::IndexCorrupted(format!("{} length overflows", what)))?;
        let bytes = self.take(len, what)?;
        Ok(bytes
            .chunks_exact(4)
            .map(|c| [c[0], c[1], c[2], c[3]]))
    }

    fn is_exhausted(&self) -> bool {
        self.pos == self.buf.len()
    }
}

impl HnswIndex {
    /// Writes the index to `path`, replacing any existing file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .map_err(|e| Error::Io(format!("create {} failed: {}", path.display(), e)))?;
        let mut writer = ChecksumWriter::new(BufWriter::new(file));

        let header = IndexHeader {
            params: self.params.clone(),
            dimension: self.vectors.dimension(),
            count: self.nodes.len(),
            entry_point: self.entry_point,
            max_level: self.max_level,
        };
        let header_json = serde_json::to_vec(&header)
            .map_err(|e| Error::Io(format!("header serialization failed: {}", e)))?;

        writer.put(MAGIC)?;
        writer.put_u32(VERSION)?;
        writer.put_u32(header_json.len() as u32)?;
        writer.put(&header_json)?;

        for &value in self.vectors.as_flat() {
            writer.put(&value.to_le_bytes())?;
        }
        for &value in &self.metadata {
            writer.put(&value.to_le_bytes())?;
        }
        for node in &self.nodes {
            writer.put_u32(node.level() as u32)?;
            for list in &node.neighbors {
                writer.put_u32(list.len() as u32)?;
                for &id in list {
                    writer.put_u32(id)?;
                }
            }
        }
        writer.finish()?;

        info!(
            path = %path.display(),
            items = self.nodes.len(),
            "index saved"
        );
        Ok(())
    }

    /// Reads an index written by [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if the file cannot be read, [`Error::IndexCorrupted`]
    /// if its contents fail any check.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .map_err(|e| Error::Io(format!("read {} failed: {}", path.display(), e)))?;
        if bytes.len() < MIN_FILE_LEN {
            return Err(Error::IndexCorrupted(format!(
                "file is {} bytes, shorter than any index",
                bytes.len()
            )));
        }

        let (body, trailer) = bytes.split_at(bytes.len() - 4);
        let expected = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
        let actual = crc32fast::hash(body);
        if actual != expected {
            return Err(Error::IndexCorrupted(format!(
                "checksum mismatch: expected {}, got {}",
                expected, actual
            )));
        }

        let index = decode_body(body)?;
        info!(
            path = %path.display(),
            items = index.nodes.len(),
            max_level = index.max_level,
            "index loaded"
        );
        Ok(index)
    }
}

fn decode_body(body: &[u8]) -> Result<HnswIndex> {
    let mut reader = ByteReader::new(body);

    if reader.take(MAGIC.len(), "magic")? != MAGIC {
        return Err(Error::IndexCorrupted("bad magic".into()));
    }
    let version = reader.u32("version")?;
    if version != VERSION {
        return Err(Error::IndexCorrupted(format!(
            "unsupported version {}",
            version
        )));
    }

    let header_len = reader.u32("header length")? as usize;
    let header: IndexHeader = serde_json::from_slice(reader.take(header_len, "header")?)
        .map_err(|e| Error::IndexCorrupted(format!("header: {}", e)))?;
    header
        .params
        .validate()
        .map_err(|e| Error::IndexCorrupted(format!("header params: {}", e)))?;

    let count = header.count;
    let value_count = count
        .checked_mul(header.dimension)
        .ok_or_else(|| Error::IndexCorrupted("vector block size overflows".into()))?;
    let data: Vec<f32> = reader
        .words(value_count, "vectors")?
        .map(f32::from_le_bytes)
        .collect();
    let vectors = VectorSet::from_flat(header.dimension, data)
        .map_err(|e| Error::IndexCorrupted(format!("vectors: {}", e)))?;
    if vectors.len() != count {
        return Err(Error::IndexCorrupted("vector count disagrees with header".into()));
    }

    let metadata: Vec<i32> = reader
        .words(count, "metadata")?
        .map(i32::from_le_bytes)
        .collect();

    let mut nodes = Vec::with_capacity(count);
    for id in 0..count {
        let level = reader.u32("node level")? as usize;
        if level > header.max_level {
            return Err(Error::IndexCorrupted(format!(
                "node {} has level {} above max level {}",
                id, level, header.max_level
            )));
        }
        let mut node = Node::new(level);
        for list in node.neighbors.iter_mut() {
            let len = reader.u32("neighbor count")? as usize;
            for neighbor in reader.words(len, "neighbor ids")?.map(u32::from_le_bytes) {
                if neighbor as usize >= count {
                    return Err(Error::IndexCorrupted(format!(
                        "node {} links to {} but the index has {} items",
                        id, neighbor, count
                    )));
                }
                list.push(neighbor);
            }
        }
        nodes.push(node);
    }
    if !reader.is_exhausted() {
        return Err(Error::IndexCorrupted("trailing bytes after graph".into()));
    }

    match header.entry_point {
        None if count > 0 => {
            return Err(Error::IndexCorrupted("missing entry point".into()));
        }
        Some(ep) if ep as usize >= count || nodes[ep as usize].level() != header.max_level => {
            return Err(Error::IndexCorrupted(format!("invalid entry point {}", ep)));
        }
        _ => {}
    }

    Ok(HnswIndex {
        params: header.params,
        vectors,
        metadata,
        nodes,
        entry_point: header.entry_point,
        max_level: header.max_level,
    })
}
