//! Frames exchanged between a controller and a test process.
//!
//! One JSON object per line. Method and signal names mirror the D-Bus
//! surface existing controllers already speak.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::arguments::{ArgumentError, CallArgs, check_supplied};
use crate::registry::{LOG_LEVEL_KEY, OUTPUT_FILES_KEY, Registry};
use crate::value::{Value, ValueKind};

pub const TEST_INTERFACE: &str = "net.gstreamer.Insanity.Test";
pub const INTROSPECTABLE_INTERFACE: &str = "org.freedesktop.DBus.Introspectable";

pub const METHOD_INTROSPECT: &str = "Introspect";
pub const METHOD_SET_UP: &str = "remoteSetUp";
pub const METHOD_START: &str = "remoteStart";
pub const METHOD_STOP: &str = "remoteStop";
pub const METHOD_TEAR_DOWN: &str = "remoteTearDown";

pub const SIGNAL_VALIDATE: &str = "remoteValidateChecklistItemSignal";
pub const SIGNAL_EXTRA_INFO: &str = "remoteExtraInfoSignal";
pub const SIGNAL_DONE: &str = "remoteDoneSignal";
pub const SIGNAL_PING: &str = "remotePingSignal";
pub const SIGNAL_READY: &str = "remoteReadySignal";

pub const ERROR_WRONG_STATE: &str = "net.gstreamer.Insanity.Test.Error.WrongState";
pub const ERROR_UNKNOWN_METHOD: &str = "org.freedesktop.DBus.Error.UnknownMethod";
pub const ERROR_INVALID_ARGS: &str = "org.freedesktop.DBus.Error.InvalidArgs";

/// Bus name a test registers for run `uuid`.
pub fn service_name(uuid: &str) -> String {
    format!("{TEST_INTERFACE}.Test{uuid}")
}

/// Object path a test exports for run `uuid`.
pub fn object_path(uuid: &str) -> String {
    format!("/net/gstreamer/Insanity/Test/Test{uuid}")
}

/// Introspection document returned by `Introspect`.
pub fn introspection_xml(uuid: &str) -> String {
    format!(
        concat!(
            "<!DOCTYPE node PUBLIC \"-//freedesktop//DTD D-BUS Object Introspection 1.0//EN\" ",
            "\"http://www.freedesktop.org/standards/dbus/1.0/introspect.dtd\">\n",
            "<node name=\"{path}\">\n",
            "  <interface name=\"{introspectable}\">\n",
            "    <method name=\"{introspect}\">\n",
            "      <arg direction=\"out\" type=\"s\" />\n",
            "    </method>\n",
            "  </interface>\n",
            "  <interface name=\"{iface}\">\n",
            "    <method name=\"{setup}\"> <arg direction=\"in\" type=\"a{{sv}}\" /> </method>\n",
            "    <method name=\"{start}\"> <arg direction=\"in\" type=\"a{{sv}}\" /> </method>\n",
            "    <method name=\"{stop}\"> </method>\n",
            "    <method name=\"{teardown}\"> </method>\n",
            "  </interface>\n",
            "</node>\n",
        ),
        path = object_path(uuid),
        introspectable = INTROSPECTABLE_INTERFACE,
        introspect = METHOD_INTROSPECT,
        iface = TEST_INTERFACE,
        setup = METHOD_SET_UP,
        start = METHOD_START,
        stop = METHOD_STOP,
        teardown = METHOD_TEAR_DOWN,
    )
}

/// One argument in a setup/start map: a scalar or a nested map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireArg {
    Value(Value),
    Map(BTreeMap<String, WireArg>),
}

impl From<Value> for WireArg {
    fn from(v: Value) -> Self {
        Self::Value(v)
    }
}

pub type WireArgs = BTreeMap<String, WireArg>;

/// One line on the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "frame", rename_all = "snake_case")]
pub enum Frame {
    Hello {
        name: String,
        path: String,
    },
    Call {
        serial: u64,
        interface: String,
        method: String,
        #[serde(default)]
        args: WireArgs,
    },
    Reply {
        serial: u64,
        #[serde(default)]
        values: Vec<Value>,
    },
    Error {
        serial: u64,
        name: String,
        message: String,
    },
    Signal {
        path: String,
        interface: String,
        name: String,
        #[serde(default)]
        args: Vec<Value>,
    },
}

/// Answer to an inbound call.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Values(Vec<Value>),
    Error { name: String, message: String },
}

impl Reply {
    pub fn empty() -> Self {
        Self::Values(Vec::new())
    }

    pub fn boolean(ok: bool) -> Self {
        Self::Values(vec![Value::Bool(ok)])
    }

    pub fn error(name: &str, message: impl Into<String>) -> Self {
        Self::Error {
            name: name.to_string(),
            message: message.into(),
        }
    }

    /// The frame carrying this reply for call `serial`.
    pub fn into_frame(self, serial: u64) -> Frame {
        match self {
            Self::Values(values) => Frame::Reply { serial, values },
            Self::Error { name, message } => Frame::Error {
                serial,
                name,
                message,
            },
        }
    }
}

fn expect_string(label: &str, arg: &WireArg) -> Result<String, ArgumentError> {
    match arg {
        WireArg::Value(Value::String(s)) => Ok(s.clone()),
        WireArg::Value(other) => Err(ArgumentError::TypeMismatch {
            label: label.to_string(),
            expected: ValueKind::String,
            found: other.kind(),
        }),
        WireArg::Map(_) => Err(ArgumentError::NotAScalar {
            label: label.to_string(),
        }),
    }
}

/// Split a wire argument map into a typed [`CallArgs`] batch.
///
/// Declared arguments are type-checked, declared output files must carry a
/// string path, and the nested `outputfiles` map is merged into the output
/// files. Undeclared keys are ignored.
///
/// # Errors
///
/// The first mistyped entry rejects the whole map.
pub fn call_args_from_wire(registry: &Registry, args: &WireArgs) -> Result<CallArgs, ArgumentError> {
    let mut batch = CallArgs::default();
    for (key, arg) in args {
        if key == OUTPUT_FILES_KEY {
            let WireArg::Map(files) = arg else {
                return Err(ArgumentError::NotAScalar { label: key.clone() });
            };
            for (label, path) in files {
                let path = expect_string(label, path)?;
                if registry.output_file(label).is_some() {
                    batch.output_files.insert(label.clone(), PathBuf::from(path));
                } else {
                    tracing::debug!(label = %label, "ignoring undeclared output file");
                }
            }
        } else if key == LOG_LEVEL_KEY {
            batch.log_level = Some(expect_string(key, arg)?);
        } else if registry.argument(key).is_some() {
            let WireArg::Value(value) = arg else {
                return Err(ArgumentError::NotAScalar { label: key.clone() });
            };
            check_supplied(registry, key, value)?;
            batch.arguments.insert(key.clone(), value.clone());
        } else if registry.output_file(key).is_some() {
            let path = expect_string(key, arg)?;
            batch.output_files.insert(key.clone(), PathBuf::from(path));
        } else {
            tracing::debug!(label = %key, "ignoring undeclared argument");
        }
    }
    Ok(batch)
}

/// Inverse of [`call_args_from_wire`], used by controllers.
pub fn call_args_to_wire(batch: &CallArgs) -> WireArgs {
    let mut args: WireArgs = batch
        .arguments
        .iter()
        .map(|(k, v)| (k.clone(), WireArg::Value(v.clone())))
        .collect();
    for (label, path) in &batch.output_files {
        args.insert(
            label.clone(),
            WireArg::Value(Value::String(path.to_string_lossy().into_owned())),
        );
    }
    if let Some(level) = &batch.log_level {
        args.insert(LOG_LEVEL_KEY.to_string(), WireArg::Value(Value::String(level.clone())));
    }
    args
}
