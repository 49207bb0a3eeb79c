//! Output-file paths: supplied by the controller or synthesized locally.
//!
//! A remote controller names every output file it wants. A standalone run has
//! nobody to ask, so paths are made up under a private temporary directory:
//! `<tmpdir>/<label>` for global slots and `<tmpdir>/<label>-<iteration>` for
//! per-iteration slots. Synthesized files are owned by the test and removed at
//! teardown unless the process was asked to keep them.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::lifecycle::RunLevel;
use crate::registry::Registry;

#[derive(Error, Debug)]
pub enum OutputFileError {
    #[error("unknown output file {label:?}")]
    Unknown { label: String },

    #[error("output file {label:?} is not available while {level}")]
    ScopeViolation { label: String, level: RunLevel },

    /// Remote mode and the controller did not supply a path
    #[error("no path was supplied for output file {label:?}")]
    NoOutputPath { label: String },

    #[error("failed to create {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Path cache and ownership of synthesized files for one test instance.
#[derive(Debug, Default)]
pub struct OutputFiles {
    supplied: BTreeMap<String, PathBuf>,
    synthesized: BTreeMap<String, PathBuf>,
    created: Vec<PathBuf>,
    tmpdir: Option<PathBuf>,
    base_dir: Option<PathBuf>,
    keep_unnamed: bool,
}

impl OutputFiles {
    /// `base_dir` is the parent of the temporary directory (system default
    /// when `None`).
    pub fn new(base_dir: Option<PathBuf>, keep_unnamed: bool) -> Self {
        Self {
            supplied: BTreeMap::new(),
            synthesized: BTreeMap::new(),
            created: Vec::new(),
            tmpdir: None,
            base_dir,
            keep_unnamed,
        }
    }

    /// Forget every cached path. Runs once per `Idle → Setup`.
    pub fn reset(&mut self) {
        self.supplied.clear();
        self.synthesized.clear();
    }

    /// Replace the externally supplied paths.
    pub fn replace_supplied(&mut self, paths: &BTreeMap<String, PathBuf>) {
        self.supplied = paths.clone();
    }

    /// Drop per-iteration synthesized paths so the next iteration gets fresh
    /// names.
    pub fn end_iteration(&mut self, registry: &Registry) {
        self.synthesized
            .retain(|label, _| registry.output_file(label).is_some_and(|decl| decl.global));
    }

    pub fn tmpdir(&self) -> Option<&Path> {
        self.tmpdir.as_deref()
    }

    /// Resolve the path of output file `label`.
    ///
    /// # Errors
    ///
    /// Fails for undeclared labels, for labels out of scope at `level`, when
    /// no path was supplied in remote mode, and when the temporary directory
    /// or file cannot be created.
    pub fn resolve(
        &mut self,
        registry: &Registry,
        level: RunLevel,
        iteration: u32,
        standalone: bool,
        label: &str,
    ) -> Result<PathBuf, OutputFileError> {
        let decl = registry
            .output_file(label)
            .ok_or_else(|| OutputFileError::Unknown {
                label: label.to_string(),
            })?;
        let in_scope = match level {
            RunLevel::Started => true,
            RunLevel::Setup => decl.global,
            RunLevel::Idle => false,
        };
        if !in_scope {
            return Err(OutputFileError::ScopeViolation {
                label: label.to_string(),
                level,
            });
        }

        if let Some(path) = self.supplied.get(label).or_else(|| self.synthesized.get(label)) {
            return Ok(path.clone());
        }
        if !standalone {
            return Err(OutputFileError::NoOutputPath {
                label: label.to_string(),
            });
        }

        let name = if decl.global {
            label.to_string()
        } else {
            format!("{label}-{iteration}")
        };
        let path = self.ensure_tmpdir()?.join(name);
        fs::File::create(&path).map_err(|source| OutputFileError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(label, path = %path.display(), "synthesized output file");
        if !self.created.contains(&path) {
            self.created.push(path.clone());
        }
        self.synthesized.insert(label.to_string(), path.clone());
        Ok(path)
    }

    fn ensure_tmpdir(&mut self) -> Result<PathBuf, OutputFileError> {
        if let Some(dir) = &self.tmpdir {
            return Ok(dir.clone());
        }
        let base = self.base_dir.clone().unwrap_or_else(std::env::temp_dir);
        let dir = tempfile::Builder::new()
            .prefix("insanity-")
            .tempdir_in(&base)
            .map_err(|source| OutputFileError::Io { path: base, source })?
            .keep();
        self.tmpdir = Some(dir.clone());
        Ok(dir)
    }

    /// Delete synthesized files (unless kept) and the temporary directory.
    ///
    /// Idempotent. A directory that still holds files is left in place.
    pub fn cleanup(&mut self) {
        if !self.keep_unnamed {
            for path in self.created.drain(..) {
                if let Err(e) = fs::remove_file(&path) {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        tracing::debug!(path = %path.display(), error = %e, "could not remove output file");
                    }
                }
            }
        }
        if let Some(dir) = self.tmpdir.take() {
            if let Err(e) = fs::remove_dir(&dir) {
                tracing::debug!(dir = %dir.display(), error = %e, "temporary directory left in place");
            }
        }
        self.synthesized.clear();
    }
}

impl Drop for OutputFiles {
    fn drop(&mut self) {
        self.cleanup();
    }
}
