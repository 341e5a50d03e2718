//! Artifact writer.
//!
//! Rendered artifacts are first written into a staging directory created
//! next to the output directory, then moved into place. A run that fails
//! while writing leaves the output directory as it was.

use crate::error::GenerateError;
use crate::render::{ArtifactSet, METADATA_FILE};
use log::{debug, info};
use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// How the writer treats existing output
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// Overwrite a non-empty output directory
    pub force: bool,
    /// Extra locations that receive a copy of the metadata document
    pub metadata_targets: Vec<PathBuf>,
}

/// What a successful write produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub output_dir: PathBuf,
    /// Written files, relative to `output_dir`
    pub files: Vec<PathBuf>,
    pub metadata_copies: Vec<PathBuf>,
}

/// Write every artifact below `output_dir`.
pub fn write_artifacts(
    artifacts: &ArtifactSet,
    output_dir: &Path,
    options: &WriteOptions,
) -> Result<WriteSummary, GenerateError> {
    let target_exists = check_target(output_dir, options.force)?;

    let parent = match output_dir.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)
        .map_err(|e| GenerateError::io("create directory", &parent, e))?;

    let staging = tempfile::Builder::new()
        .prefix(".labgen-staging-")
        .tempdir_in(&parent)
        .map_err(|e| GenerateError::io("create staging directory in", &parent, e))?;
    debug!("Staging artifacts in {}", staging.path().display());

    for (relative, contents) in artifacts.iter() {
        let staged = staging.path().join(relative);
        create_parent(&staged)?;
        fs::write(&staged, contents).map_err(|e| GenerateError::io("write", &staged, e))?;
    }

    if target_exists {
        for relative in artifacts.paths() {
            let staged = staging.path().join(relative);
            let target = output_dir.join(relative);
            create_parent(&target)?;
            fs::rename(&staged, &target).map_err(|e| GenerateError::io("move into place", &target, e))?;
        }
    } else {
        fs::rename(staging.path(), output_dir)
            .map_err(|e| GenerateError::io("move into place", output_dir, e))?;
    }

    let metadata_copies = match artifacts.get(METADATA_FILE) {
        Some(metadata) => write_metadata_copies(metadata, output_dir, &options.metadata_targets)?,
        None => Vec::new(),
    };

    info!(
        "Wrote {} files to {}",
        artifacts.len(),
        output_dir.display()
    );

    Ok(WriteSummary {
        output_dir: output_dir.to_path_buf(),
        files: artifacts.paths().map(Path::to_path_buf).collect(),
        metadata_copies,
    })
}

/// Returns whether the target already exists and may be written into.
fn check_target(output_dir: &Path, force: bool) -> Result<bool, GenerateError> {
    if !output_dir.exists() {
        return Ok(false);
    }
    if !output_dir.is_dir() {
        return Err(GenerateError::io(
            "use output directory",
            output_dir,
            std::io::Error::new(std::io::ErrorKind::AlreadyExists, "path exists and is not a directory"),
        ));
    }

    let mut entries = fs::read_dir(output_dir)
        .map_err(|e| GenerateError::io("read output directory", output_dir, e))?;
    if entries.next().is_some() && !force {
        return Err(GenerateError::OutputNotEmpty {
            path: output_dir.to_path_buf(),
        });
    }
    Ok(true)
}

fn create_parent(path: &Path) -> Result<(), GenerateError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| GenerateError::io("create directory", parent, e))?;
    }
    Ok(())
}

/// Copy the metadata document to each extra target once. Targets are
/// compared by their resolved location, and the copy inside the output
/// directory itself is skipped.
fn write_metadata_copies(
    metadata: &str,
    output_dir: &Path,
    targets: &[PathBuf],
) -> Result<Vec<PathBuf>, GenerateError> {
    let primary = resolve_file(&output_dir.join(METADATA_FILE))?;
    let mut seen: BTreeSet<PathBuf> = BTreeSet::new();
    seen.insert(primary);

    let mut written = Vec::new();
    for target in targets {
        let resolved = resolve_file(target)?;
        if !seen.insert(resolved.clone()) {
            debug!("Skipping duplicate metadata target {}", target.display());
            continue;
        }
        let dir = resolved.parent().unwrap_or(Path::new("/"));

        let mut file = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| GenerateError::io("create temporary file in", dir, e))?;
        file.write_all(metadata.as_bytes())
            .map_err(|e| GenerateError::io("write", target, e))?;
        file.persist(&resolved)
            .map_err(|e| GenerateError::io("write", target, e.error))?;

        debug!("Copied topology metadata to {}", resolved.display());
        written.push(target.clone());
    }
    Ok(written)
}

/// Absolute location of a file: its parent directory is created and
/// canonicalized, so different spellings of one path compare equal.
fn resolve_file(path: &Path) -> Result<PathBuf, GenerateError> {
    let file_name = path.file_name().ok_or_else(|| {
        GenerateError::io(
            "resolve",
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "path does not name a file"),
        )
    })?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|e| GenerateError::io("create directory", &dir, e))?;
    let dir = fs::canonicalize(&dir).map_err(|e| GenerateError::io("resolve", &dir, e))?;
    Ok(dir.join(file_name))
}
