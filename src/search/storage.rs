//! Binary storage for the product vector index.
//!
//! File format: products.bin
//!
//! Header (47 bytes):
//! - version: u8 (1)
//! - model_id: [u8; 32] (SHA256 hash of the embedding model name)
//! - dimensions: u16 (little-endian)
//! - entry_count: u64 (little-endian)
//! - checksum: u32 (CRC32 of header fields before checksum)
//!
//! Entries (repeated, in position order; position N here is candidate
//! position N at query time):
//! - product_id: u64 (little-endian)
//! - embedding: [f32; dimensions] (little-endian)
//!
//! The offline catalog-embedding job writes this file; the daemon only
//! reads it. `save` exists for that job and for tests.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::search::index::ProductIndex;

/// Current file format version
const FORMAT_VERSION: u8 = 1;

/// Header size in bytes: version(1) + model_id(32) + dimensions(2) + entry_count(8) + checksum(4)
const HEADER_SIZE: usize = 47;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexStorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Version mismatch: file version {0}, supported version {1}")]
    VersionMismatch(u8, u8),

    #[error("Model mismatch: file uses different model")]
    ModelMismatch,

    #[error("Checksum mismatch: file may be corrupted")]
    ChecksumMismatch,

    #[error("Dimension mismatch: expected {expected}, file has {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Storage manager for the index file.
pub struct IndexStorage {
    path: PathBuf,
}

impl IndexStorage {
    /// Create a new storage manager for the given path.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Get the storage file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the storage file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the product index from storage.
    ///
    /// # Arguments
    /// * `expected_model_id` - SHA256 hash of the expected model name
    /// * `expected_dimensions` - Expected embedding dimensions
    pub fn load(
        &self,
        expected_model_id: &[u8; 32],
        expected_dimensions: usize,
    ) -> Result<ProductIndex, IndexStorageError> {
        let file = File::open(&self.path)?;
        let mut reader = BufReader::new(file);

        let header = self.read_header(&mut reader)?;
        self.validate_header(&header, expected_model_id, expected_dimensions)?;

        let dimensions = header.dimensions as usize;
        let mut index = ProductIndex::with_capacity(dimensions, header.entry_count as usize);

        for _ in 0..header.entry_count {
            let (id, embedding) = self.read_entry(&mut reader, dimensions)?;
            // push only fails on a dimension mismatch, ruled out above
            let _ = index.push(id, embedding);
        }

        Ok(index)
    }

    /// Save the product index to storage.
    ///
    /// Uses atomic write: temp file -> fsync -> rename
    pub fn save(&self, index: &ProductIndex, model_id: &[u8; 32]) -> Result<(), IndexStorageError> {
        let temp_path = self.path.with_extension("tmp");

        let result = self.write_to_file(&temp_path, index, model_id);

        if result.is_err() {
            let _ = std::fs::remove_file(&temp_path);
            return result;
        }

        std::fs::rename(&temp_path, &self.path)?;

        Ok(())
    }

    /// Write index to a file.
    fn write_to_file(
        &self,
        path: &Path,
        index: &ProductIndex,
        model_id: &[u8; 32],
    ) -> Result<(), IndexStorageError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        let header = Header {
            version: FORMAT_VERSION,
            model_id: *model_id,
            dimensions: index.dimensions() as u16,
            entry_count: index.len() as u64,
        };
        self.write_header(&mut writer, &header)?;

        for (id, row) in index.iter() {
            self.write_entry(&mut writer, id, row)?;
        }

        writer.flush()?;
        let file = writer
            .into_inner()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        file.sync_all()?;

        Ok(())
    }

    /// Read header from file.
    fn read_header(&self, reader: &mut BufReader<File>) -> Result<Header, IndexStorageError> {
        let mut header_bytes = [0u8; HEADER_SIZE];
        reader.read_exact(&mut header_bytes)?;

        let version = header_bytes[0];

        // Version check first
        if version > FORMAT_VERSION {
            return Err(IndexStorageError::VersionMismatch(version, FORMAT_VERSION));
        }

        let mut model_id = [0u8; 32];
        model_id.copy_from_slice(&header_bytes[1..33]);

        let dimensions = u16::from_le_bytes([header_bytes[33], header_bytes[34]]);
        let mut count_bytes = [0u8; 8];
        count_bytes.copy_from_slice(&header_bytes[35..43]);
        let entry_count = u64::from_le_bytes(count_bytes);

        let mut checksum_bytes = [0u8; 4];
        checksum_bytes.copy_from_slice(&header_bytes[43..47]);
        let stored_checksum = u32::from_le_bytes(checksum_bytes);

        // Verify checksum (computed over header without checksum field)
        let computed_checksum = crc32fast::hash(&header_bytes[0..43]);
        if stored_checksum != computed_checksum {
            return Err(IndexStorageError::ChecksumMismatch);
        }

        Ok(Header {
            version,
            model_id,
            dimensions,
            entry_count,
        })
    }

    /// Validate header against expected values.
    fn validate_header(
        &self,
        header: &Header,
        expected_model_id: &[u8; 32],
        expected_dimensions: usize,
    ) -> Result<(), IndexStorageError> {
        if header.model_id != *expected_model_id {
            return Err(IndexStorageError::ModelMismatch);
        }

        if header.dimensions as usize != expected_dimensions {
            return Err(IndexStorageError::DimensionMismatch {
                expected: expected_dimensions,
                got: header.dimensions as usize,
            });
        }

        Ok(())
    }

    /// Write header to file.
    fn write_header(
        &self,
        writer: &mut BufWriter<File>,
        header: &Header,
    ) -> Result<(), IndexStorageError> {
        let mut header_bytes = [0u8; HEADER_SIZE];

        header_bytes[0] = header.version;
        header_bytes[1..33].copy_from_slice(&header.model_id);
        header_bytes[33..35].copy_from_slice(&header.dimensions.to_le_bytes());
        header_bytes[35..43].copy_from_slice(&header.entry_count.to_le_bytes());

        let checksum = crc32fast::hash(&header_bytes[0..43]);
        header_bytes[43..47].copy_from_slice(&checksum.to_le_bytes());

        writer.write_all(&header_bytes)?;
        Ok(())
    }

    /// Read a single entry from file.
    fn read_entry(
        &self,
        reader: &mut BufReader<File>,
        dimensions: usize,
    ) -> Result<(u64, Vec<f32>), IndexStorageError> {
        let mut id_bytes = [0u8; 8];
        reader.read_exact(&mut id_bytes)?;
        let id = u64::from_le_bytes(id_bytes);

        let mut row_bytes = vec![0u8; dimensions * 4];
        reader.read_exact(&mut row_bytes)?;
        let embedding = row_bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        Ok((id, embedding))
    }

    /// Write a single entry to file.
    fn write_entry(
        &self,
        writer: &mut BufWriter<File>,
        id: u64,
        row: &[f32],
    ) -> Result<(), IndexStorageError> {
        writer.write_all(&id.to_le_bytes())?;

        for &value in row {
            writer.write_all(&value.to_le_bytes())?;
        }

        Ok(())
    }
}

/// File header structure.
#[derive(Debug)]
struct Header {
    version: u8,
    model_id: [u8; 32],
    dimensions: u16,
    entry_count: u64,
}
