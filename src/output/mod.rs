//! Output module for harvest results
//!
//! This module handles:
//! - Writing results as pretty-printed JSON to a file or stdout
//! - Summarising a batch of collections

pub mod stats;

pub use stats::{print_statistics, HarvestStatistics};

use crate::HarvestError;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Writes `value` as pretty-printed JSON
///
/// # Arguments
///
/// * `value` - Anything serialisable: results, profiles, endpoint lists
/// * `path` - Destination file; stdout when `None`
pub fn write_json<T: Serialize + ?Sized>(value: &T, path: Option<&Path>) -> Result<(), HarvestError> {
    match path {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(&mut writer, value)?;
            writeln!(writer)?;
            writer.flush()?;
            tracing::info!("Wrote results to {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            serde_json::to_writer_pretty(&mut writer, value)?;
            writeln!(writer)?;
        }
    }
    Ok(())
}
