//! Argument resolution: supplied values merged over declared defaults.
//!
//! Every setup/start carries a [`CallArgs`] batch. The batch is checked as a
//! whole against the [`Registry`] before anything is applied, so one
//! mistyped value rejects the entire call rather than leaving a half-applied
//! argument map behind.

use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;

use crate::lifecycle::RunLevel;
use crate::registry::{LOG_LEVEL_KEY, Registry};
use crate::value::{Value, ValueKind};

/// Errors raised while applying or reading arguments.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArgumentError {
    #[error("unknown argument {label:?}")]
    Unknown { label: String },

    /// Non-global argument read while the test is idle
    #[error("argument {label:?} is not available while {level}")]
    ScopeViolation { label: String, level: RunLevel },

    #[error("argument {label:?} expects {expected}, got {found}")]
    TypeMismatch {
        label: String,
        expected: ValueKind,
        found: ValueKind,
    },

    /// A nested map where a scalar was expected, or the reverse
    #[error("argument {label:?} has the wrong shape")]
    NotAScalar { label: String },

    /// Command-line text that does not convert to the declared type
    #[error("argument {label:?}: cannot read {raw:?} as {expected}")]
    Unparsable {
        label: String,
        raw: String,
        expected: ValueKind,
    },
}

/// One setup/start batch, already split by destination.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    /// Values for declared arguments.
    pub arguments: BTreeMap<String, Value>,
    /// Externally chosen paths for declared output files.
    pub output_files: BTreeMap<String, PathBuf>,
    /// Raw `log-level` setting, when supplied.
    pub log_level: Option<String>,
}

impl CallArgs {
    /// Build a batch from command-line `label=value` pairs.
    ///
    /// Values for declared arguments are converted to the type of the
    /// declared default; output-file labels take the value as a path. Pairs
    /// without `=` or naming nothing declared are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ArgumentError::Unparsable`] if a value does not convert.
    pub fn from_cli<S: AsRef<str>>(registry: &Registry, pairs: &[S]) -> Result<Self, ArgumentError> {
        let mut batch = Self::default();
        for pair in pairs {
            let pair = pair.as_ref();
            let Some((label, raw)) = pair.split_once('=') else {
                tracing::warn!(arg = pair, "ignoring command-line argument without '='");
                continue;
            };
            if label == LOG_LEVEL_KEY {
                batch.log_level = Some(raw.to_string());
            } else if let Some(decl) = registry.argument(label) {
                let expected = decl.default_value.kind();
                let value = expected.parse(raw).ok_or_else(|| ArgumentError::Unparsable {
                    label: label.to_string(),
                    raw: raw.to_string(),
                    expected,
                })?;
                batch.arguments.insert(label.to_string(), value);
            } else if registry.output_file(label).is_some() {
                batch.output_files.insert(label.to_string(), PathBuf::from(raw));
            } else {
                tracing::warn!(label, "ignoring undeclared command-line argument");
            }
        }
        Ok(batch)
    }
}

/// Check a supplied value against its declaration.
pub fn check_supplied(registry: &Registry, label: &str, value: &Value) -> Result<(), ArgumentError> {
    let decl = registry.argument(label).ok_or_else(|| ArgumentError::Unknown {
        label: label.to_string(),
    })?;
    let expected = decl.default_value.kind();
    if value.kind() != expected {
        return Err(ArgumentError::TypeMismatch {
            label: label.to_string(),
            expected,
            found: value.kind(),
        });
    }
    Ok(())
}

/// Per-run supplied argument values.
#[derive(Debug, Clone, Default)]
pub struct SuppliedArguments {
    values: BTreeMap<String, Value>,
}

impl SuppliedArguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole map with `batch`, or change nothing.
    ///
    /// # Errors
    ///
    /// Returns the first [`ArgumentError`] found; the previous map is kept.
    pub fn replace_from(
        &mut self,
        registry: &Registry,
        batch: &BTreeMap<String, Value>,
    ) -> Result<(), ArgumentError> {
        for (label, value) in batch {
            check_supplied(registry, label, value)?;
        }
        self.values = batch.clone();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn supplied(&self, label: &str) -> Option<&Value> {
        self.values.get(label)
    }

    /// Supplied value for `label`, else its declared default.
    ///
    /// # Errors
    ///
    /// [`ArgumentError::Unknown`] for an undeclared label;
    /// [`ArgumentError::ScopeViolation`] for a non-global argument read while
    /// idle.
    pub fn resolve(
        &self,
        registry: &Registry,
        level: RunLevel,
        label: &str,
    ) -> Result<Value, ArgumentError> {
        let decl = registry.argument(label).ok_or_else(|| ArgumentError::Unknown {
            label: label.to_string(),
        })?;
        if !decl.global && level == RunLevel::Idle {
            return Err(ArgumentError::ScopeViolation {
                label: label.to_string(),
                level,
            });
        }
        Ok(self
            .values
            .get(label)
            .cloned()
            .unwrap_or_else(|| decl.default_value.clone()))
    }
}
