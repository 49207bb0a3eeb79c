//! The metadata document printed by `--insanity-metadata`.
//!
//! It is the contract a controller reads to learn what a test declares and
//! what it may supply. Keys use the historical `__name__` style.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::registry::Registry;
use crate::value::{Value, ValueKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistMeta {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likely_error: Option<String>,
    pub global: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgumentMeta {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_description: Option<String>,
    pub global: bool,
    #[serde(rename = "type")]
    pub kind: ValueKind,
    pub default: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputFileMeta {
    pub description: String,
    pub global: bool,
}

/// Everything a test declares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestMetadata {
    #[serde(rename = "__name__")]
    pub name: String,
    #[serde(rename = "__description__")]
    pub description: String,
    #[serde(
        rename = "__full_description__",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub full_description: Option<String>,
    #[serde(rename = "__checklist__", default)]
    pub checklist: BTreeMap<String, ChecklistMeta>,
    #[serde(rename = "__arguments__", default)]
    pub arguments: BTreeMap<String, ArgumentMeta>,
    #[serde(rename = "__extra_infos__", default)]
    pub extra_infos: BTreeMap<String, String>,
    #[serde(rename = "__output_files__", default)]
    pub output_files: BTreeMap<String, OutputFileMeta>,
}

impl TestMetadata {
    pub fn from_registry(
        name: &str,
        description: &str,
        full_description: Option<&str>,
        registry: &Registry,
    ) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            full_description: full_description.map(str::to_string),
            checklist: registry
                .checklist_items()
                .map(|i| {
                    (
                        i.label.clone(),
                        ChecklistMeta {
                            description: i.description.clone(),
                            likely_error: i.likely_error.clone(),
                            global: i.global,
                        },
                    )
                })
                .collect(),
            arguments: registry
                .arguments()
                .map(|a| {
                    (
                        a.label.clone(),
                        ArgumentMeta {
                            description: a.description.clone(),
                            full_description: a.full_description.clone(),
                            global: a.global,
                            kind: a.default_value.kind(),
                            default: a.default_value.clone(),
                        },
                    )
                })
                .collect(),
            extra_infos: registry
                .extra_infos()
                .map(|e| (e.label.clone(), e.description.clone()))
                .collect(),
            output_files: registry
                .output_files()
                .map(|o| {
                    (
                        o.label.clone(),
                        OutputFileMeta {
                            description: o.description.clone(),
                            global: o.global,
                        },
                    )
                })
                .collect(),
        }
    }

    /// Pretty-printed JSON.
    pub fn to_json_pretty(&self) -> String {
        // Every field is a string, bool, map or Value; serialization cannot fail.
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
