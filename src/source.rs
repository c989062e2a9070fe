//! Local file loaders for datasets and schemas.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde_json::Value;

use crate::schema::{Record, Schema};
use crate::CompressionFormat;

/// Open `path` for reading, decompressing on the fly. An explicit format wins;
/// otherwise it is taken from the file extension.
fn open_reader(path: &Path, compression: Option<CompressionFormat>) -> Result<Box<dyn Read>> {
    let file = File::open(path).map_err(|e| eyre!("Failed to open {}: {}", path.display(), e))?;
    let reader = BufReader::new(file);
    let compression = compression.or_else(|| CompressionFormat::from_extension(path));
    Ok(match compression {
        Some(CompressionFormat::Gzip) => Box::new(flate2::read::GzDecoder::new(reader)),
        Some(CompressionFormat::Zstd) => Box::new(zstd::Decoder::new(reader)?),
        Some(CompressionFormat::Bzip2) => Box::new(bzip2::read::BzDecoder::new(reader)),
        Some(CompressionFormat::Xz) => Box::new(xz2::read::XzDecoder::new(reader)),
        None => Box::new(reader),
    })
}

fn read_json(path: &Path, compression: Option<CompressionFormat>) -> Result<Value> {
    let reader = open_reader(path, compression)?;
    serde_json::from_reader(reader)
        .map_err(|e| eyre!("Failed to parse JSON in {}: {}", path.display(), e))
}

/// Turn a JSON array of objects into records.
pub fn records_from_json(value: Value) -> Result<Vec<Record>> {
    let Value::Array(items) = value else {
        return Err(eyre!("Dataset must be a JSON array of objects"));
    };
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(record) => Ok(record),
            other => Err(eyre!(
                "Dataset element {} is not an object: {}",
                i,
                other
            )),
        })
        .collect()
}

/// Load a dataset file: a JSON array of flat objects.
pub fn load_records(path: &Path, compression: Option<CompressionFormat>) -> Result<Vec<Record>> {
    let value = read_json(path, compression)?;
    records_from_json(value).map_err(|e| eyre!("{}: {}", path.display(), e))
}

/// Load a schema file: a JSON object mapping field names to type tags.
pub fn load_schema(path: &Path) -> Result<Schema> {
    let value = read_json(path, None)?;
    Schema::from_json(&value).map_err(|e| eyre!("{}: {}", path.display(), e))
}
