//! # Fixture Data
//!
//! Static payloads shared by every simulated user: the analysis process loaded
//! from `analysis.json`, thirty sequence-file descriptors used both as process
//! output references and as upload names, and two input-file descriptors used to
//! seed an input bundle.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const ANALYSIS_FILE_NAME: &str = "analysis.json";
pub const FASTQ_BASE_NAME: &str = "ERR16300";
pub const OUTPUT_FILE_COUNT: usize = 30;
pub const INPUT_FILE_COUNT: usize = 2;
pub const SEQUENCE_FILE_SCHEMA: &str =
    "https://schema.humancellatlas.org/type/file/6.1.1/sequence_file";
pub const UPLOAD_CONTENT_TYPE: &str = "application/tar+gzip;dcp-type=data";

/// Errors raised while loading fixtures at startup.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("Failed to read fixture {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed fixture {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Fixture {0} must contain a JSON object")]
    NotAnObject(PathBuf),
}

/// File metadata sent as a process output reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    pub file_name: String,
    pub content: FileContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileContent {
    #[serde(rename = "describedBy")]
    pub described_by: String,
    pub schema_type: String,
    pub read_index: String,
    pub lane_index: u32,
    pub file_core: FileCore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileCore {
    pub file_name: String,
    pub file_format: Option<String>,
}

/// Body of a single upload-area PUT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadDescriptor {
    pub file_name: String,
    pub content_type: String,
}

impl FileDescriptor {
    /// Specializes the sequence-file template for `name`.
    pub fn sequence_file(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            content: FileContent {
                described_by: SEQUENCE_FILE_SCHEMA.to_string(),
                schema_type: "file".to_string(),
                read_index: "read1".to_string(),
                lane_index: 1,
                file_core: FileCore {
                    file_name: name.clone(),
                    file_format: file_format(&name).map(str::to_string),
                },
            },
            file_name: name,
        }
    }

    pub fn upload_descriptor(&self) -> UploadDescriptor {
        UploadDescriptor {
            file_name: self.file_name.clone(),
            content_type: UPLOAD_CONTENT_TYPE.to_string(),
        }
    }
}

/// Everything after the first `.` of a file name (`"a.fastq.gz"` → `"fastq.gz"`).
pub fn file_format(name: &str) -> Option<&str> {
    name.split_once('.').map(|(_, format)| format)
}

/// `ERR16300<NN>.fastq.gz`, numbered from 1.
pub fn output_file_name(index: usize) -> String {
    format!("{FASTQ_BASE_NAME}{index:02}.fastq.gz")
}

/// `input_file_<NN>.fastq.gz`, numbered from 0.
pub fn input_file_name(index: usize) -> String {
    format!("input_file_{index:02}.fastq.gz")
}

/// The fixture set generated once per process.
#[derive(Debug, Clone, PartialEq)]
pub struct Fixtures {
    pub analysis: Value,
    pub output_files: Vec<FileDescriptor>,
    pub input_files: Vec<FileDescriptor>,
}

impl Fixtures {
    /// Builds the generated descriptors around an already-loaded analysis payload.
    pub fn with_analysis(analysis: Value) -> Self {
        Self {
            analysis,
            output_files: (1..=OUTPUT_FILE_COUNT)
                .map(|index| FileDescriptor::sequence_file(output_file_name(index)))
                .collect(),
            input_files: (0..INPUT_FILE_COUNT)
                .map(|index| FileDescriptor::sequence_file(input_file_name(index)))
                .collect(),
        }
    }

    /// Loads `analysis.json` from `directory` and generates the file descriptors.
    pub fn load(directory: &Path) -> Result<Self, FixtureError> {
        let path = directory.join(ANALYSIS_FILE_NAME);
        debug!(path = %path.display(), "Loading analysis fixture");

        let raw = fs::read_to_string(&path).map_err(|source| FixtureError::Io {
            path: path.clone(),
            source,
        })?;
        let analysis: Value = serde_json::from_str(&raw).map_err(|source| FixtureError::Json {
            path: path.clone(),
            source,
        })?;
        if !analysis.is_object() {
            return Err(FixtureError::NotAnObject(path));
        }

        let fixtures = Self::with_analysis(analysis);
        info!(
            outputs = fixtures.output_files.len(),
            inputs = fixtures.input_files.len(),
            "Fixtures ready"
        );
        Ok(fixtures)
    }

    pub fn upload_descriptors(&self) -> Vec<UploadDescriptor> {
        self.output_files
            .iter()
            .map(FileDescriptor::upload_descriptor)
            .collect()
    }
}
