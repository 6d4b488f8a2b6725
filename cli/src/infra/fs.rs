//! Filesystem infrastructure: implements `ManifestReader` and `ArtifactWriter`.

use std::io::Write;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, bail};

use crate::application::ports::{ArtifactWriter, CancelFlag, ManifestReader, WriteOutcome, WriteStatus};
use crate::domain::artifact::{Artifact, ArtifactSet, validate_relative_path};
use crate::domain::error::ExportError;
use crate::domain::manifest::{DocumentFormat, RawManifest};
use crate::domain::options::PlatformOptions;

// ── Manifest reader ───────────────────────────────────────────────────────────

/// Reads manifests and option files from disk. The format follows the file
/// extension; anything else is tried as YAML, then JSON.
pub struct FsManifestReader;

impl ManifestReader for FsManifestReader {
    fn read(&self, path: &Path) -> Result<RawManifest> {
        let text = read_text(path)?;
        Ok(RawManifest::parse(
            path.display().to_string(),
            text,
            DocumentFormat::from_path(path),
        ))
    }

    fn read_options(&self, path: &Path) -> Result<PlatformOptions> {
        let text = read_text(path)?;
        let value: serde_json::Value = serde_yaml::from_str(&text)
            .with_context(|| format!("cannot parse {}", path.display()))?;
        if !value.is_object() {
            bail!("{} must contain a mapping of option names to values", path.display());
        }
        serde_json::from_value(value).with_context(|| format!("cannot parse {}", path.display()))
    }
}

fn read_text(path: &Path) -> Result<String> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ExportError::ManifestNotFound(path.display().to_string()).into())
        }
        Err(e) => Err(e).with_context(|| format!("cannot read {}", path.display())),
    }
}

/// Writes a single text document, creating parent directories.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn write_document(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("cannot create {}", parent.display()))?;
    }
    std::fs::write(path, content).with_context(|| format!("cannot write {}", path.display()))
}

// ── Artifact writer ───────────────────────────────────────────────────────────

/// Writes artifact sets under an output root, one atomic file at a time.
pub struct FsArtifactWriter;

/// Bookkeeping for one `write` call: what this call created and may undo.
#[derive(Default)]
struct WritePass {
    created_files: Vec<PathBuf>,
    created_dirs: Vec<PathBuf>,
    touched: Vec<PathBuf>,
}

impl WritePass {
    /// Removes the files and directories this pass created. Pre-existing
    /// files stay, including ones this pass overwrote.
    fn roll_back(self, status: WriteStatus) -> WriteOutcome {
        for file in &self.created_files {
            if let Err(e) = std::fs::remove_file(file) {
                tracing::warn!(path = %file.display(), error = %e, "cannot remove partial output");
            }
        }
        for dir in self.created_dirs.iter().rev() {
            // Fails harmlessly when something else now lives in the directory.
            let _ = std::fs::remove_dir(dir);
        }
        let written = self
            .touched
            .into_iter()
            .filter(|p| !self.created_files.contains(p))
            .collect();
        WriteOutcome { status, written }
    }

    fn ensure_dir(&mut self, dir: &Path) -> Result<()> {
        let mut missing: Vec<PathBuf> = dir
            .ancestors()
            .take_while(|p| !p.as_os_str().is_empty() && !p.exists())
            .map(Path::to_path_buf)
            .collect();
        missing.reverse();
        for d in missing {
            std::fs::create_dir(&d).with_context(|| format!("cannot create {}", d.display()))?;
            self.created_dirs.push(d);
        }
        Ok(())
    }

    fn write_one(&mut self, root: &Path, artifact: &Artifact) -> Result<()> {
        let dest = resolve(root, &artifact.relative_path)?;
        let parent = dest.parent().unwrap_or(root);
        self.ensure_dir(parent)?;
        let existed = dest.exists();

        let mut tmp = tempfile::NamedTempFile::new_in(parent)
            .with_context(|| format!("cannot create temporary file in {}", parent.display()))?;
        tmp.write_all(artifact.content.as_bytes())
            .with_context(|| format!("cannot write {}", dest.display()))?;
        set_mode(tmp.path(), artifact.is_executable_hint)?;
        tmp.persist(&dest)
            .map_err(|e| e.error)
            .with_context(|| format!("cannot persist {}", dest.display()))?;

        tracing::debug!(path = %dest.display(), bytes = artifact.content.len(), "wrote artifact");
        if !existed {
            self.created_files.push(dest.clone());
        }
        self.touched.push(dest);
        Ok(())
    }
}

impl ArtifactWriter for FsArtifactWriter {
    fn write(&self, root: &Path, artifacts: &ArtifactSet, cancel: &CancelFlag) -> WriteOutcome {
        let mut pass = WritePass::default();
        for artifact in artifacts.iter() {
            if cancel.is_cancelled() {
                tracing::warn!(root = %root.display(), "write cancelled");
                return pass.roll_back(WriteStatus::Cancelled);
            }
            if let Err(e) = pass.write_one(root, artifact) {
                tracing::warn!(root = %root.display(), error = %e, "write failed");
                return pass.roll_back(WriteStatus::Failed(format!("{e:#}")));
            }
        }
        WriteOutcome {
            status: WriteStatus::Completed,
            written: pass.touched,
        }
    }
}

/// Joins `relative` onto `root`, refusing anything that could escape it.
fn resolve(root: &Path, relative: &str) -> Result<PathBuf> {
    validate_relative_path(relative)?;
    let rel = Path::new(relative);
    if rel
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        bail!("artifact path '{relative}' must stay inside the output root");
    }
    Ok(root.join(rel))
}

fn set_mode(path: &Path, executable: bool) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = if executable { 0o755 } else { 0o644 };
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
            .with_context(|| format!("cannot set permissions on {}", path.display()))?;
    }
    #[cfg(not(unix))]
    let _ = (path, executable);
    Ok(())
}
