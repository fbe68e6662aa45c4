//! Artifact loading: reads exported model parameters from disk.
//!
//! Every artifact is fingerprinted with SHA-256. When a `manifest.json` sits
//! next to an artifact, the artifact must be listed in it with a matching
//! digest, so a stale or swapped file is refused instead of silently scored
//! with.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// File name of the digest manifest looked up next to each artifact.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Errors raised while reading or validating an artifact.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid artifact format in {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid manifest: {0}")]
    Manifest(String),

    #[error("Digest mismatch for {file}: manifest has {expected}, file has {actual}")]
    DigestMismatch {
        file: String,
        expected: String,
        actual: String,
    },

    #[error("Shape mismatch in {artifact}: {detail}")]
    Shape {
        artifact: &'static str,
        detail: String,
    },

    #[error("Invalid parameter in {artifact}: {detail}")]
    Parameter {
        artifact: &'static str,
        detail: String,
    },
}

/// Options controlling how artifacts are verified.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArtifactOptions {
    /// Refuse artifacts that have no manifest next to them.
    pub require_manifest: bool,
}

/// Identity of a loaded artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactInfo {
    pub path: PathBuf,
    /// Lowercase hex SHA-256 of the file contents
    pub sha256: String,
    /// Whether a manifest bound this file
    pub manifest_verified: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct DigestManifest {
    version: u32,
    files: BTreeMap<String, String>,
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Read, verify and deserialize a JSON artifact.
///
/// # Errors
/// Returns an `ArtifactError` if the file cannot be read, fails manifest
/// verification or does not match the expected JSON shape.
pub fn load_json<T: DeserializeOwned>(
    path: &Path,
    options: ArtifactOptions,
) -> Result<(T, ArtifactInfo), ArtifactError> {
    let bytes = std::fs::read(path).map_err(|source| ArtifactError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let sha256 = sha256_hex(&bytes);
    let manifest_verified = verify_against_manifest(path, &sha256, options)?;

    let value = serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::info!(
        "Loaded artifact {:?} (sha256={}, manifest_verified={})",
        path,
        &sha256[..12],
        manifest_verified
    );

    Ok((
        value,
        ArtifactInfo {
            path: path.to_path_buf(),
            sha256,
            manifest_verified,
        },
    ))
}

fn verify_against_manifest(
    path: &Path,
    actual: &str,
    options: ArtifactOptions,
) -> Result<bool, ArtifactError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let manifest_path = dir.join(MANIFEST_FILE);

    if !manifest_path.exists() {
        if options.require_manifest {
            return Err(ArtifactError::Manifest(format!(
                "{MANIFEST_FILE} required but not found in {dir:?}"
            )));
        }
        tracing::debug!("No manifest next to {:?}; skipping digest binding", path);
        return Ok(false);
    }

    let content = std::fs::read(&manifest_path).map_err(|source| ArtifactError::Read {
        path: manifest_path.clone(),
        source,
    })?;
    let manifest: DigestManifest = serde_json::from_slice(&content)
        .map_err(|e| ArtifactError::Manifest(format!("unreadable {MANIFEST_FILE}: {e}")))?;

    if manifest.version != 1 {
        return Err(ArtifactError::Manifest(format!(
            "unsupported manifest version {}",
            manifest.version
        )));
    }

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            ArtifactError::Manifest(format!("artifact path {path:?} has no file name"))
        })?;

    let expected = manifest.files.get(file_name).ok_or_else(|| {
        ArtifactError::Manifest(format!("{file_name} is not listed in {MANIFEST_FILE}"))
    })?;

    if !expected.trim().eq_ignore_ascii_case(actual) {
        return Err(ArtifactError::DigestMismatch {
            file: file_name.to_string(),
            expected: expected.clone(),
            actual: actual.to_string(),
        });
    }

    Ok(true)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Write `files` and a manifest binding them into `dir`.
    pub fn write_manifest(dir: &Path, files: &[(&str, &[u8])]) {
        let manifest = DigestManifest {
            version: 1,
            files: files
                .iter()
                .map(|(name, bytes)| ((*name).to_string(), sha256_hex(bytes)))
                .collect(),
        };
        let json = serde_json::to_vec_pretty(&manifest).expect("serialize manifest");
        std::fs::write(dir.join(MANIFEST_FILE), json).expect("write manifest");
    }
}
