//! Declaration registry: the immutable catalog a test publishes.
//!
//! Checklist items, arguments, output-file slots and extra-info labels are
//! registered once, before the first run. After [`Registry::seal`] every
//! registration is refused, so the catalog a controller reads from the
//! metadata document is the catalog the test runs with.
//!
//! Labels are namespaced per kind, with one exception: an argument and an
//! output file may not share a label, because both travel in the same
//! argument map on the wire.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::value::Value;

/// Setup argument carrying the log-level configuration.
pub const LOG_LEVEL_KEY: &str = "log-level";
/// Legacy nested map of output-file paths in setup/start arguments.
pub const OUTPUT_FILES_KEY: &str = "outputfiles";

/// Which catalog a declaration lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationKind {
    ChecklistItem,
    Argument,
    OutputFile,
    ExtraInfo,
}

impl fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ChecklistItem => "checklist item",
            Self::Argument => "argument",
            Self::OutputFile => "output file",
            Self::ExtraInfo => "extra info",
        };
        f.write_str(s)
    }
}

/// Errors raised while building the catalog.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Label does not match `[A-Za-z][A-Za-z0-9.-]*`
    #[error("invalid label {label:?}: must match [A-Za-z][A-Za-z0-9.-]*")]
    InvalidLabel { label: String },

    /// Same label registered twice under one kind
    #[error("{kind} {label:?} is already declared")]
    Duplicate { kind: DeclarationKind, label: String },

    /// Argument and output file share a label
    #[error("label {label:?} is used by both an argument and an output file")]
    Collision { label: String },

    /// Label is reserved by the wire protocol
    #[error("label {label:?} is reserved")]
    Reserved { label: String },

    /// Registration attempted after the first setup
    #[error("cannot declare {label:?}: declarations are sealed once the test has been set up")]
    Sealed { label: String },
}

/// A named pass/fail criterion.
#[derive(Debug, Clone, PartialEq)]
pub struct ChecklistItem {
    pub label: String,
    pub description: String,
    pub likely_error: Option<String>,
    pub global: bool,
}

/// A declared parameter. Its type is the type of `default_value`, for life.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub label: String,
    pub description: String,
    pub full_description: Option<String>,
    pub global: bool,
    pub default_value: Value,
}

/// A declared output-file slot.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputFileItem {
    pub label: String,
    pub description: String,
    pub global: bool,
}

/// A declared extra-info label.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtraInfo {
    pub label: String,
    pub description: String,
}

/// Returns `true` if `label` matches `[A-Za-z][A-Za-z0-9.-]*`.
pub fn is_valid_label(label: &str) -> bool {
    let mut chars = label.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
}

/// The per-test catalog of declarations.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    checklist: BTreeMap<String, ChecklistItem>,
    arguments: BTreeMap<String, Argument>,
    output_files: BTreeMap<String, OutputFileItem>,
    extra_infos: BTreeMap<String, ExtraInfo>,
    sealed: bool,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse all further registrations.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    fn admit(&self, kind: DeclarationKind, label: &str) -> Result<(), RegistryError> {
        if self.sealed {
            return Err(RegistryError::Sealed {
                label: label.to_string(),
            });
        }
        if !is_valid_label(label) {
            return Err(RegistryError::InvalidLabel {
                label: label.to_string(),
            });
        }
        let taken = match kind {
            DeclarationKind::ChecklistItem => self.checklist.contains_key(label),
            DeclarationKind::Argument => self.arguments.contains_key(label),
            DeclarationKind::OutputFile => self.output_files.contains_key(label),
            DeclarationKind::ExtraInfo => self.extra_infos.contains_key(label),
        };
        if taken {
            return Err(RegistryError::Duplicate {
                kind,
                label: label.to_string(),
            });
        }
        if matches!(kind, DeclarationKind::Argument | DeclarationKind::OutputFile) {
            if label == LOG_LEVEL_KEY || label == OUTPUT_FILES_KEY {
                return Err(RegistryError::Reserved {
                    label: label.to_string(),
                });
            }
            let collides = match kind {
                DeclarationKind::Argument => self.output_files.contains_key(label),
                _ => self.arguments.contains_key(label),
            };
            if collides {
                return Err(RegistryError::Collision {
                    label: label.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Declare a checklist item.
    ///
    /// `likely_error` is an optional hint shown to whoever reads a failure.
    pub fn add_checklist_item(
        &mut self,
        label: &str,
        description: &str,
        likely_error: Option<&str>,
        global: bool,
    ) -> Result<(), RegistryError> {
        self.admit(DeclarationKind::ChecklistItem, label)?;
        self.checklist.insert(
            label.to_string(),
            ChecklistItem {
                label: label.to_string(),
                description: description.to_string(),
                likely_error: likely_error.map(str::to_string),
                global,
            },
        );
        Ok(())
    }

    /// Declare an argument. The default value fixes the argument's type.
    pub fn add_argument(
        &mut self,
        label: &str,
        description: &str,
        full_description: Option<&str>,
        global: bool,
        default_value: impl Into<Value>,
    ) -> Result<(), RegistryError> {
        self.admit(DeclarationKind::Argument, label)?;
        self.arguments.insert(
            label.to_string(),
            Argument {
                label: label.to_string(),
                description: description.to_string(),
                full_description: full_description.map(str::to_string),
                global,
                default_value: default_value.into(),
            },
        );
        Ok(())
    }

    /// Declare an output-file slot.
    pub fn add_output_file(
        &mut self,
        label: &str,
        description: &str,
        global: bool,
    ) -> Result<(), RegistryError> {
        self.admit(DeclarationKind::OutputFile, label)?;
        self.output_files.insert(
            label.to_string(),
            OutputFileItem {
                label: label.to_string(),
                description: description.to_string(),
                global,
            },
        );
        Ok(())
    }

    /// Declare an extra-info label.
    pub fn add_extra_info(&mut self, label: &str, description: &str) -> Result<(), RegistryError> {
        self.admit(DeclarationKind::ExtraInfo, label)?;
        self.extra_infos.insert(
            label.to_string(),
            ExtraInfo {
                label: label.to_string(),
                description: description.to_string(),
            },
        );
        Ok(())
    }

    pub fn checklist_item(&self, label: &str) -> Option<&ChecklistItem> {
        self.checklist.get(label)
    }

    pub fn argument(&self, label: &str) -> Option<&Argument> {
        self.arguments.get(label)
    }

    pub fn output_file(&self, label: &str) -> Option<&OutputFileItem> {
        self.output_files.get(label)
    }

    pub fn extra_info(&self, label: &str) -> Option<&ExtraInfo> {
        self.extra_infos.get(label)
    }

    /// Checklist items in label order.
    pub fn checklist_items(&self) -> impl Iterator<Item = &ChecklistItem> {
        self.checklist.values()
    }

    pub fn arguments(&self) -> impl Iterator<Item = &Argument> {
        self.arguments.values()
    }

    pub fn output_files(&self) -> impl Iterator<Item = &OutputFileItem> {
        self.output_files.values()
    }

    pub fn extra_infos(&self) -> impl Iterator<Item = &ExtraInfo> {
        self.extra_infos.values()
    }

    pub fn checklist_len(&self) -> usize {
        self.checklist.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ─── Label syntax ────────────────────────────────────────────────────────

    #[test]
    fn valid_labels() {
        for label in ["a", "Z9", "uri", "some-int", "cpu.load-2", "dummy-output-file"] {
            assert!(is_valid_label(label), "{label} should be valid");
        }
    }

    #[test]
    fn invalid_labels() {
        for label in ["", "9lives", "-x", ".x", "has space", "under_score", "é"] {
            assert!(!is_valid_label(label), "{label:?} should be invalid");
        }
    }

    // ─── Registration ────────────────────────────────────────────────────────

    #[test]
    fn registration_succeeds_once_per_kind() {
        let mut reg = Registry::new();
        reg.add_checklist_item("ok", "works", None, false).unwrap();
        let err = reg.add_checklist_item("ok", "again", None, false).unwrap_err();
        assert_eq!(
            err,
            RegistryError::Duplicate {
                kind: DeclarationKind::ChecklistItem,
                label: "ok".into()
            }
        );
    }

    #[test]
    fn same_label_across_unrelated_kinds_is_allowed() {
        let mut reg = Registry::new();
        reg.add_checklist_item("x", "item", None, true).unwrap();
        reg.add_extra_info("x", "info").unwrap();
        reg.add_argument("x", "arg", None, true, 1).unwrap();
        assert!(reg.checklist_item("x").is_some());
        assert!(reg.extra_info("x").is_some());
        assert!(reg.argument("x").is_some());
    }

    #[test]
    fn argument_and_output_file_may_not_collide() {
        let mut reg = Registry::new();
        reg.add_argument("out", "arg", None, true, "v").unwrap();
        assert_eq!(
            reg.add_output_file("out", "file", false).unwrap_err(),
            RegistryError::Collision { label: "out".into() }
        );

        let mut reg = Registry::new();
        reg.add_output_file("log", "file", true).unwrap();
        assert_eq!(
            reg.add_argument("log", "arg", None, true, 1).unwrap_err(),
            RegistryError::Collision { label: "log".into() }
        );
    }

    #[test]
    fn invalid_label_is_rejected() {
        let mut reg = Registry::new();
        let err = reg.add_extra_info("1st", "nope").unwrap_err();
        assert!(matches!(err, RegistryError::InvalidLabel { .. }));
    }

    #[test]
    fn reserved_wire_keys_are_rejected() {
        let mut reg = Registry::new();
        assert!(matches!(
            reg.add_argument(LOG_LEVEL_KEY, "x", None, true, "").unwrap_err(),
            RegistryError::Reserved { .. }
        ));
        assert!(matches!(
            reg.add_output_file(OUTPUT_FILES_KEY, "x", true).unwrap_err(),
            RegistryError::Reserved { .. }
        ));
        // Checklist items are not carried in the argument map.
        reg.add_checklist_item(LOG_LEVEL_KEY, "x", None, true).unwrap();
    }

    #[test]
    fn sealed_registry_refuses_everything() {
        let mut reg = Registry::new();
        reg.add_checklist_item("a", "a", None, true).unwrap();
        reg.seal();
        assert!(reg.is_sealed());
        assert!(matches!(
            reg.add_checklist_item("b", "b", None, true).unwrap_err(),
            RegistryError::Sealed { .. }
        ));
        assert!(matches!(
            reg.add_argument("c", "c", None, true, 0).unwrap_err(),
            RegistryError::Sealed { .. }
        ));
        assert_eq!(reg.checklist_len(), 1);
    }

    #[test]
    fn iteration_is_label_ordered() {
        let mut reg = Registry::new();
        reg.add_checklist_item("zeta", "z", None, true).unwrap();
        reg.add_checklist_item("alpha", "a", Some("hint"), false).unwrap();
        let labels: Vec<_> = reg.checklist_items().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, ["alpha", "zeta"]);
        assert_eq!(
            reg.checklist_item("alpha").unwrap().likely_error.as_deref(),
            Some("hint")
        );
    }
}
