use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetFormat {
    Csv,
    Json,
    Txt,
}

impl DatasetFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "csv" => Some(DatasetFormat::Csv),
            "json" => Some(DatasetFormat::Json),
            "txt" => Some(DatasetFormat::Txt),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetFormat::Csv => "csv",
            DatasetFormat::Json => "json",
            DatasetFormat::Txt => "txt",
        }
    }
}

impl fmt::Display for DatasetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reader flags passed to the engine's loader (e.g. `header`, `inferSchema`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReadOptions(BTreeMap<String, String>);

impl ReadOptions {
    pub fn set(mut self, key: &str, value: &str) -> Self {
        self.0.insert(key.to_string(), value.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Boolean flag; anything other than a case-insensitive "true" is false.
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetDescriptor {
    pub file_name: String,
    pub extension: DatasetFormat,
    pub read_options: ReadOptions,
}

pub struct DatasetResolver;

impl DatasetResolver {
    /// Inspect a local dataset file and work out how the engine should read it.
    pub fn resolve(local_path: &Path) -> Result<DatasetDescriptor> {
        if !local_path.is_file() {
            return Err(PipelineError::NotFound(local_path.display().to_string()));
        }

        let file_name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                PipelineError::Validation(format!(
                    "dataset path has no usable file name: {}",
                    local_path.display()
                ))
            })?
            .to_string();

        let ext = file_name
            .rsplit('.')
            .next()
            .unwrap_or_default()
            .to_lowercase();

        let extension = DatasetFormat::from_extension(&ext)
            .ok_or_else(|| PipelineError::UnsupportedFormat(ext.clone()))?;

        let read_options = match extension {
            DatasetFormat::Csv => ReadOptions::default()
                .set("header", "true")
                .set("inferSchema", "true"),
            DatasetFormat::Json | DatasetFormat::Txt => ReadOptions::default(),
        };

        Ok(DatasetDescriptor {
            file_name,
            extension,
            read_options,
        })
    }
}
