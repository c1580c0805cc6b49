//! Writing aggregated result tables to disk.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::aggregate::AggregatedResult;
use crate::error::{Error, Result};
use crate::{ParameterSet, Value};
use crate::{ARTIFACT_FILE_EXTENSION, EXPERIMENTS_DIR_NAME, SENSITIVITY_DIR_NAME};

/// Kind of batch an artifact was produced by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtifactCategory {
    Experiment,
    Sensitivity,
}

impl ArtifactCategory {
    /// Short prefix used in artifact identifiers.
    pub fn prefix(&self) -> &'static str {
        match self {
            ArtifactCategory::Experiment => "exp",
            ArtifactCategory::Sensitivity => "sens",
        }
    }

    pub fn dir_name(&self) -> &'static str {
        match self {
            ArtifactCategory::Experiment => EXPERIMENTS_DIR_NAME,
            ArtifactCategory::Sensitivity => SENSITIVITY_DIR_NAME,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub created: DateTime<Utc>,
    pub category: ArtifactCategory,
    pub name: String,
    pub value: Option<Value>,
    pub replications: usize,
    pub ticks: usize,
    /// Parameter set the batch was run with, in application order
    pub parameters: Vec<(String, Value)>,
}

/// Persisted result table along with its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub metadata: ArtifactMetadata,
    pub table: AggregatedResult,
}

/// Location of a saved artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactHandle {
    pub id: String,
    pub path: PathBuf,
}

/// On-disk wrapper around the serialized artifact.
///
/// `payload_size` is the size of the uncompressed payload.
#[derive(Serialize, Deserialize)]
struct Envelope {
    compressed: bool,
    payload_size: u32,
    payload: Vec<u8>,
}

/// Saves result tables under a root directory, one subdirectory per
/// artifact category.
#[derive(Debug, Clone)]
pub struct Persister {
    root: PathBuf,
    compress: bool,
}

impl Persister {
    pub fn new(root: impl Into<PathBuf>, compress: bool) -> Self {
        Persister {
            root: root.into(),
            compress,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Builds the artifact identifier,
    /// `<category>_series_<name>[_<value>]_<replications>r`.
    pub fn identifier(
        category: ArtifactCategory,
        name: &str,
        value: Option<&Value>,
        replications: usize,
    ) -> String {
        let mut id = format!("{}_series_{}", category.prefix(), sanitize(name));
        if let Some(value) = value {
            id.push('_');
            id.push_str(&sanitize(&value.to_label()));
        }
        id.push_str(&format!("_{}r", replications));
        id
    }

    /// Path an artifact with the given identifier is stored at.
    pub fn path_for(&self, category: ArtifactCategory, id: &str) -> PathBuf {
        self.root
            .join(category.dir_name())
            .join(format!("{}.{}", id, ARTIFACT_FILE_EXTENSION))
    }

    /// Saves the table, silently replacing any artifact stored under the
    /// same identifier.
    pub fn save(
        &self,
        table: &AggregatedResult,
        category: ArtifactCategory,
        name: &str,
        value: Option<&Value>,
        replications: usize,
        parameters: &ParameterSet,
    ) -> Result<ArtifactHandle> {
        let id = Self::identifier(category, name, value, replications);
        let path = self.path_for(category, &id);
        let artifact = Artifact {
            metadata: ArtifactMetadata {
                created: Utc::now(),
                category,
                name: name.to_string(),
                value: value.cloned(),
                replications,
                ticks: table.ticks(),
                parameters: parameters.to_vec(),
            },
            table: table.clone(),
        };
        let bytes = self.encode(&artifact)?;

        let dir = self.root.join(category.dir_name());
        fs::create_dir_all(&dir).map_err(|e| persistence(&dir, e))?;
        let tmp = dir.join(format!(".{}.tmp", id));
        if let Err(e) = write_file(&tmp, &bytes)
            .and_then(|_| fs::rename(&tmp, &path).map_err(|e| persistence(&path, e)))
        {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }

        info!("saved {}", path.to_string_lossy());
        Ok(ArtifactHandle { id, path })
    }

    /// Reads an artifact back from disk.
    pub fn load(path: &Path) -> Result<Artifact> {
        let bytes = fs::read(path).map_err(|e| persistence(path, e))?;
        let envelope: Envelope = bincode::deserialize(&bytes)
            .map_err(|e| Error::PersistenceError(format!("malformed artifact: {}", e)))?;
        let payload = if envelope.compressed {
            decompress(&envelope)?
        } else {
            envelope.payload
        };
        let artifact: Artifact = bincode::deserialize(&payload)
            .map_err(|e| Error::PersistenceError(format!("malformed artifact payload: {}", e)))?;
        artifact.table.check().map_err(|e| {
            Error::PersistenceError(format!(
                "inconsistent table in {}: {}",
                path.to_string_lossy(),
                e
            ))
        })?;
        Ok(artifact)
    }

    fn encode(&self, artifact: &Artifact) -> Result<Vec<u8>> {
        let data = bincode::serialize(artifact)
            .map_err(|e| Error::PersistenceError(e.to_string()))?;
        let payload_size = data.len() as u32;
        let (compressed, payload) = if self.compress {
            compress(data)?
        } else {
            (false, data)
        };
        bincode::serialize(&Envelope {
            compressed,
            payload_size,
            payload,
        })
        .map_err(|e| Error::PersistenceError(e.to_string()))
    }
}

#[cfg(feature = "lz4")]
fn compress(data: Vec<u8>) -> Result<(bool, Vec<u8>)> {
    let out = lz4::block::compress(&data, None, false)
        .map_err(|e| Error::PersistenceError(format!("compression failed: {}", e)))?;
    Ok((true, out))
}

#[cfg(not(feature = "lz4"))]
fn compress(data: Vec<u8>) -> Result<(bool, Vec<u8>)> {
    warn!("compression requested but lz4 feature is not enabled, writing uncompressed");
    Ok((false, data))
}

#[cfg(feature = "lz4")]
fn decompress(envelope: &Envelope) -> Result<Vec<u8>> {
    lz4::block::decompress(&envelope.payload, Some(envelope.payload_size as i32))
        .map_err(|e| Error::PersistenceError(format!("decompression failed: {}", e)))
}

#[cfg(not(feature = "lz4"))]
fn decompress(_envelope: &Envelope) -> Result<Vec<u8>> {
    Err(Error::PersistenceError(format!(
        "artifact is compressed, enable the {} feature to read it",
        crate::FEATURE_NAME_LZ4
    )))
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = fs::File::create(path).map_err(|e| persistence(path, e))?;
    file.write_all(bytes).map_err(|e| persistence(path, e))?;
    file.sync_all().map_err(|e| persistence(path, e))?;
    Ok(())
}

fn persistence(path: &Path, e: std::io::Error) -> Error {
    Error::PersistenceError(format!("{}: {}", path.to_string_lossy(), e))
}

/// Keeps identifiers usable as file names.
fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '-',
            c if c.is_whitespace() => '-',
            c => c,
        })
        .collect()
}
