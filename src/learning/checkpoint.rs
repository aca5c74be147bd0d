//! Weight network persistence.
//!
//! # Binary Format
//!
//! All integers and weights are little-endian.
//!
//! | Offset | Size | Field | Description |
//! |--------|------|-------|-------------|
//! | 0 | 4 | table_count | u32 |
//! | 4 | 8 | len\[0\] | u64 entry count of table 0 |
//! | 12 | 4 × len\[0\] | weights\[0\] | f32 entries of table 0 |
//! | ... | | | repeated for every table |
//!
//! Reading back a written network reproduces every weight bit for bit.
//! Saving goes through a temporary file that is renamed over the target,
//! so an interrupted save never leaves a half-written snapshot behind.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::evaluator::{WeightNetwork, WeightTable};
use crate::learning::LearningError;
use crate::pattern::{MAX_TUPLE_LEN, RADIX};

/// Largest table a snapshot may declare (a full 6-tuple table)
pub const MAX_TABLE_ENTRIES: u64 = (RADIX as u64).pow(MAX_TUPLE_LEN as u32);

/// Weights converted per read/write chunk
const CHUNK_ENTRIES: usize = 1 << 14;

/// Serialize `network` into `writer`.
pub fn write_network<W: Write>(writer: &mut W, network: &WeightNetwork) -> Result<(), LearningError> {
    let count = u32::try_from(network.len()).map_err(|_| {
        LearningError::InvalidCheckpoint(format!("too many tables: {}", network.len()))
    })?;
    if let Some((i, table)) = network
        .tables()
        .iter()
        .enumerate()
        .find(|(_, table)| table.len() as u64 > MAX_TABLE_ENTRIES)
    {
        return Err(LearningError::InvalidCheckpoint(format!(
            "table {} has {} entries (limit {})",
            i,
            table.len(),
            MAX_TABLE_ENTRIES
        )));
    }
    writer.write_all(&count.to_le_bytes())?;

    let mut buf = Vec::with_capacity(CHUNK_ENTRIES * 4);
    for table in network.tables() {
        writer.write_all(&(table.len() as u64).to_le_bytes())?;
        for chunk in table.as_slice().chunks(CHUNK_ENTRIES) {
            buf.clear();
            for weight in chunk {
                buf.extend_from_slice(&weight.to_le_bytes());
            }
            writer.write_all(&buf)?;
        }
    }
    Ok(())
}

/// Deserialize a network from `reader`.
///
/// # Errors
///
/// `LearningError::InvalidCheckpoint` if the data is truncated, declares a
/// table larger than [`MAX_TABLE_ENTRIES`], or has bytes past the last
/// table. Other I/O failures come back as `LearningError::Io`.
pub fn read_network<R: Read>(reader: &mut R) -> Result<WeightNetwork, LearningError> {
    let mut buf4 = [0u8; 4];
    read_field(reader, &mut buf4, "table count")?;
    let count = u32::from_le_bytes(buf4);

    let mut network = WeightNetwork::new();
    let mut buf8 = [0u8; 8];
    let mut bytes = vec![0u8; CHUNK_ENTRIES * 4];

    for id in 0..count {
        read_field(reader, &mut buf8, &format!("length of table {}", id))?;
        let len = u64::from_le_bytes(buf8);
        if len > MAX_TABLE_ENTRIES {
            return Err(LearningError::InvalidCheckpoint(format!(
                "table {} declares {} entries (limit {})",
                id, len, MAX_TABLE_ENTRIES
            )));
        }

        let len = len as usize;
        let mut weights = Vec::with_capacity(len);
        while weights.len() < len {
            let n = (len - weights.len()).min(CHUNK_ENTRIES);
            let chunk = &mut bytes[..n * 4];
            read_field(reader, chunk, &format!("weights of table {}", id))?;
            weights.extend(
                chunk
                    .chunks_exact(4)
                    .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])),
            );
        }
        network.push(WeightTable::from_weights(weights));
    }

    let mut extra = [0u8; 1];
    if reader.read(&mut extra)? != 0 {
        return Err(LearningError::InvalidCheckpoint(
            "unexpected data after the last table".to_string(),
        ));
    }

    Ok(network)
}

/// Write `network` to `path` atomically.
///
/// # Returns
///
/// Size of the written snapshot in bytes
pub fn save_network<P: AsRef<Path>>(path: P, network: &WeightNetwork) -> Result<u64, LearningError> {
    let path = path.as_ref();
    let start_time = Instant::now();
    let temp_path = temp_path_for(path);

    let file = File::create(&temp_path)?;
    let written = write_to(file, network)
        .and_then(|()| fs::rename(&temp_path, path).map_err(LearningError::from));
    if let Err(e) = written {
        // Leave no partial temporary file behind
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    let file_size = fs::metadata(path)?.len();
    log::info!(
        "Weights saved: {} ({} tables, {} bytes, {:.2}s)",
        path.display(),
        network.len(),
        file_size,
        start_time.elapsed().as_secs_f64()
    );
    Ok(file_size)
}

/// Read a network from `path`.
pub fn load_network<P: AsRef<Path>>(path: P) -> Result<WeightNetwork, LearningError> {
    let path = path.as_ref();
    let start_time = Instant::now();

    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let network = read_network(&mut reader)?;

    log::info!(
        "Weights loaded: {} ({} tables, {} entries, {:.2}s)",
        path.display(),
        network.len(),
        network.sizes().iter().sum::<usize>(),
        start_time.elapsed().as_secs_f64()
    );
    Ok(network)
}

fn read_field<R: Read>(reader: &mut R, buf: &mut [u8], what: &str) -> Result<(), LearningError> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => {
            LearningError::InvalidCheckpoint(format!("truncated while reading {}", what))
        }
        _ => LearningError::Io(e),
    })
}

fn write_to(file: File, network: &WeightNetwork) -> Result<(), LearningError> {
    let mut writer = BufWriter::new(file);
    write_network(&mut writer, network)?;
    writer.flush()?;
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}
