//! Command-line `label=value` pairs typed against a metadata document.

use std::path::PathBuf;

use insanity_core::{ArgumentError, CallArgs, TestMetadata};

/// Reserved key carrying the test's log-level setting.
const LOG_LEVEL_KEY: &str = "log-level";

/// Convert `label=value` pairs into a call batch, using the argument types
/// the test declared.
///
/// Output-file labels take the value as a path. Pairs without `=` or naming
/// nothing declared are logged and skipped.
///
/// # Errors
///
/// Returns [`ArgumentError::Unparsable`] if a value does not convert to the
/// declared type.
pub fn call_args_from_pairs<S: AsRef<str>>(
    metadata: &TestMetadata,
    pairs: &[S],
) -> Result<CallArgs, ArgumentError> {
    let mut batch = CallArgs::default();
    for pair in pairs {
        let pair = pair.as_ref();
        let Some((label, raw)) = pair.split_once('=') else {
            tracing::warn!(arg = pair, "ignoring argument without '='");
            continue;
        };
        if label == LOG_LEVEL_KEY {
            batch.log_level = Some(raw.to_string());
        } else if let Some(meta) = metadata.arguments.get(label) {
            let value = meta.kind.parse(raw).ok_or_else(|| ArgumentError::Unparsable {
                label: label.to_string(),
                raw: raw.to_string(),
                expected: meta.kind,
            })?;
            batch.arguments.insert(label.to_string(), value);
        } else if metadata.output_files.contains_key(label) {
            batch.output_files.insert(label.to_string(), PathBuf::from(raw));
        } else {
            tracing::warn!(label, test = %metadata.name, "test declares no such argument");
        }
    }
    Ok(batch)
}
