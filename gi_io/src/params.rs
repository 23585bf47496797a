//! Human-readable parameter log.
//!
//! Scalars are written as `key: value`. Lists are written as `key:` followed
//! by one entry per line.

use std::fmt::Display;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// File name of the parameter log inside the model directory.
pub const PARAMETER_FILE: &str = "parameters.txt";

/// A logged parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// Single value.
    Scalar(String),
    /// Multi-line list.
    List(Vec<String>),
}

impl ParamValue {
    /// Scalar from anything displayable.
    pub fn scalar(value: impl Display) -> Self {
        ParamValue::Scalar(value.to_string())
    }
}

/// Write the parameter log to `dir/parameters.txt`, creating `dir` if needed.
pub fn write_parameter_log(dir: &Path, entries: &[(String, ParamValue)]) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(PARAMETER_FILE);
    let mut writer = BufWriter::new(File::create(&path)?);

    for (key, value) in entries {
        match value {
            ParamValue::Scalar(v) => writeln!(writer, "{key}: {v}")?,
            ParamValue::List(items) => {
                writeln!(writer, "{key}:")?;
                for item in items {
                    writeln!(writer, "{item}")?;
                }
            }
        }
    }
    writer.flush()?;

    log::info!("Parameters saved to {}", path.display());
    Ok(path)
}
