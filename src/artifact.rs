//! Artifact publication: bundle the output directory under a stable name.
//!
//! The bundle is a directory `<artifact_root>/<artifact_name>/` holding a
//! copy of every regular file directly inside the output directory. A CI
//! upload step (or anything else) can then pick it up by name after the job.
//! Contents are not inspected.

use crate::config::{IfNoFilesFound, JobConfig};
use crate::error::FetchError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// What was published.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactReport {
    pub name: String,
    /// Bundle directory; `None` when nothing was published.
    pub path: Option<PathBuf>,
    /// File names in the bundle, sorted.
    pub files: Vec<String>,
    pub total_bytes: u64,
}

impl ArtifactReport {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Publish `source_dir` as the artifact named in `config`.
///
/// A missing or empty source directory is handled by
/// [`JobConfig::if_no_files_found`]: with the default `Warn` policy the
/// function logs a warning and still returns `Ok`.
pub async fn publish(source_dir: &Path, config: &JobConfig) -> Result<ArtifactReport, FetchError> {
    let name = config.artifact_name.clone();
    let files = list_files(source_dir).await?;

    let dest = config.artifact_root.join(&name);
    let dir_err = |e: std::io::Error| FetchError::DirectoryFailed {
        path: dest.clone(),
        source: e,
    };

    if same_dir(source_dir, &dest) {
        return Err(FetchError::InvalidConfig(format!(
            "artifact directory '{}' is the output directory itself",
            dest.display()
        )));
    }

    // The bundle mirrors the output directory, empty or not.
    if tokio::fs::metadata(&dest).await.is_ok() {
        tokio::fs::remove_dir_all(&dest).await.map_err(dir_err)?;
    }

    if files.is_empty() {
        match config.if_no_files_found {
            IfNoFilesFound::Error => {
                return Err(FetchError::EmptyArtifact {
                    name,
                    path: source_dir.to_path_buf(),
                })
            }
            IfNoFilesFound::Warn => warn!(
                "No files were found in '{}'. No artifact '{}' will be published.",
                source_dir.display(),
                name
            ),
            IfNoFilesFound::Ignore => {}
        }
        return Ok(ArtifactReport {
            name,
            path: None,
            files,
            total_bytes: 0,
        });
    }

    tokio::fs::create_dir_all(&dest).await.map_err(dir_err)?;

    let mut total_bytes = 0;
    for file in &files {
        let target = dest.join(file);
        total_bytes += tokio::fs::copy(source_dir.join(file), &target)
            .await
            .map_err(|e| FetchError::OutputWriteFailed {
                path: target.clone(),
                source: e,
            })?;
    }

    info!(
        "Published artifact '{}': {} files, {} bytes → {}",
        name,
        files.len(),
        total_bytes,
        dest.display()
    );

    Ok(ArtifactReport {
        name,
        path: Some(dest),
        files,
        total_bytes,
    })
}

/// Regular files directly inside `dir`, sorted. Missing dir → empty list.
///
/// In-progress `.part` files are never part of a bundle.
async fn list_files(dir: &Path) -> Result<Vec<String>, FetchError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(FetchError::DirectoryFailed {
                path: dir.to_path_buf(),
                source: e,
            })
        }
    };

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| FetchError::DirectoryFailed {
            path: dir.to_path_buf(),
            source: e,
        })?
    {
        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_file && !name.ends_with(".part") {
            files.push(name);
        }
    }
    files.sort();
    Ok(files)
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(root: &Path, policy: IfNoFilesFound) -> JobConfig {
        JobConfig::builder()
            .artifact_root(root)
            .if_no_files_found(policy)
            .build()
            .unwrap()
    }

    #[test]
    fn copies_files_and_skips_subdirs() {
        let src = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join("pib_1.pdf"), b"%PDF-1.4 a").unwrap();
        std::fs::write(src.path().join("notes.txt"), b"x").unwrap();
        std::fs::write(src.path().join("pib_2.pdf.part"), b"partial").unwrap();
        std::fs::create_dir(src.path().join("nested")).unwrap();

        let config = config_for(root.path(), IfNoFilesFound::Warn);
        let report = tokio_test::block_on(publish(src.path(), &config)).unwrap();

        assert_eq!(report.files, vec!["notes.txt", "pib_1.pdf"]);
        assert_eq!(report.total_bytes, 11);
        let bundle = root.path().join("pib-pdfs");
        assert_eq!(report.path.as_deref(), Some(bundle.as_path()));
        assert!(bundle.join("pib_1.pdf").exists());
        assert!(!bundle.join("nested").exists());
    }

    #[test]
    fn empty_dir_warns_by_default() {
        let src = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let config = config_for(root.path(), IfNoFilesFound::Warn);
        let report = tokio_test::block_on(publish(src.path(), &config)).unwrap();
        assert!(report.is_empty());
        assert!(report.path.is_none());
        assert!(!root.path().join("pib-pdfs").exists());
    }

    #[test]
    fn missing_dir_counts_as_empty() {
        let root = tempfile::tempdir().unwrap();
        let config = config_for(root.path(), IfNoFilesFound::Ignore);
        let report =
            tokio_test::block_on(publish(&root.path().join("never-created"), &config)).unwrap();
        assert!(report.is_empty());
    }

    #[test]
    fn empty_dir_with_error_policy_fails() {
        let src = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let config = config_for(root.path(), IfNoFilesFound::Error);
        let err = tokio_test::block_on(publish(src.path(), &config)).unwrap_err();
        assert!(matches!(err, FetchError::EmptyArtifact { .. }));
    }

    #[test]
    fn republish_replaces_previous_bundle() {
        let src = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let config = config_for(root.path(), IfNoFilesFound::Warn);

        std::fs::write(src.path().join("old.pdf"), b"old").unwrap();
        tokio_test::block_on(publish(src.path(), &config)).unwrap();
        std::fs::remove_file(src.path().join("old.pdf")).unwrap();
        std::fs::write(src.path().join("new.pdf"), b"new").unwrap();
        let report = tokio_test::block_on(publish(src.path(), &config)).unwrap();

        assert_eq!(report.files, vec!["new.pdf"]);
        assert!(!root.path().join("pib-pdfs").join("old.pdf").exists());
    }

    #[test]
    fn emptied_output_clears_previous_bundle() {
        let src = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let config = config_for(root.path(), IfNoFilesFound::Warn);

        std::fs::write(src.path().join("old.pdf"), b"old").unwrap();
        tokio_test::block_on(publish(src.path(), &config)).unwrap();
        std::fs::remove_file(src.path().join("old.pdf")).unwrap();
        let report = tokio_test::block_on(publish(src.path(), &config)).unwrap();

        assert!(report.is_empty());
        assert!(!root.path().join("pib-pdfs").exists());
    }
}
