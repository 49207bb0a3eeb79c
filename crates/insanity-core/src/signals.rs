//! Outbound notifications and where they go.
//!
//! A remote test turns every [`Signal`] into a bus signal. A standalone test
//! has nobody listening, so validations and extra info are printed for the
//! operator instead and `Done`/`Ping`/`Ready` only touch the local watchdog.

use std::io::Write;
use std::sync::Arc;

use crate::channel::Channel;
use crate::value::Value;
use crate::wire::{SIGNAL_DONE, SIGNAL_EXTRA_INFO, SIGNAL_PING, SIGNAL_READY, SIGNAL_VALIDATE};

#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    ValidateChecklistItem {
        label: String,
        success: bool,
        description: Option<String>,
    },
    ExtraInfo {
        label: String,
        value: Value,
    },
    Done,
    Ping,
    Ready,
}

impl Signal {
    /// Bus member name and positional arguments.
    pub fn to_wire(&self) -> (&'static str, Vec<Value>) {
        match self {
            Self::ValidateChecklistItem {
                label,
                success,
                description,
            } => (
                SIGNAL_VALIDATE,
                vec![
                    Value::String(label.clone()),
                    Value::Bool(*success),
                    Value::String(description.clone().unwrap_or_default()),
                ],
            ),
            Self::ExtraInfo { label, value } => {
                (SIGNAL_EXTRA_INFO, vec![Value::String(label.clone()), value.clone()])
            }
            Self::Done => (SIGNAL_DONE, Vec::new()),
            Self::Ping => (SIGNAL_PING, Vec::new()),
            Self::Ready => (SIGNAL_READY, Vec::new()),
        }
    }

    /// Inverse of [`Self::to_wire`]; `None` for unknown names or malformed
    /// arguments.
    pub fn from_wire(name: &str, args: &[Value]) -> Option<Self> {
        match (name, args) {
            (SIGNAL_VALIDATE, [label, success, rest @ ..]) => {
                let description = match rest.first() {
                    Some(d) => d.as_str().filter(|d| !d.is_empty()).map(str::to_string),
                    None => None,
                };
                Some(Self::ValidateChecklistItem {
                    label: label.as_str()?.to_string(),
                    success: success.as_bool()?,
                    description,
                })
            }
            (SIGNAL_EXTRA_INFO, [label, value]) => Some(Self::ExtraInfo {
                label: label.as_str()?.to_string(),
                value: value.clone(),
            }),
            (SIGNAL_DONE, _) => Some(Self::Done),
            (SIGNAL_PING, _) => Some(Self::Ping),
            (SIGNAL_READY, _) => Some(Self::Ready),
            _ => None,
        }
    }
}

/// Receiver of outbound signals.
pub trait SignalSink: Send {
    fn emit(&mut self, signal: &Signal);
}

/// Prints validations and extra info for a standalone run.
pub struct ConsoleSink {
    out: Box<dyn Write + Send>,
}

impl ConsoleSink {
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self { out }
    }
}

impl SignalSink for ConsoleSink {
    fn emit(&mut self, signal: &Signal) {
        let written = match signal {
            Signal::ValidateChecklistItem {
                label,
                success,
                description,
            } => {
                let verdict = if *success { "PASS" } else { "FAIL" };
                match description.as_deref().filter(|d| !d.is_empty()) {
                    Some(d) => writeln!(self.out, "step: {label}: {verdict} ({d})"),
                    None => writeln!(self.out, "step: {label}: {verdict}"),
                }
            }
            Signal::ExtraInfo { label, value } => writeln!(self.out, "Extra info: {label}: {value}"),
            Signal::Done | Signal::Ping | Signal::Ready => Ok(()),
        };
        if let Err(e) = written.and_then(|()| self.out.flush()) {
            tracing::debug!(error = %e, "failed to print signal");
        }
    }
}

/// Forwards signals onto the bus under the test's object path.
pub struct ChannelSink {
    channel: Arc<dyn Channel>,
    path: String,
}

impl ChannelSink {
    pub fn new(channel: Arc<dyn Channel>, path: impl Into<String>) -> Self {
        Self {
            channel,
            path: path.into(),
        }
    }
}

impl SignalSink for ChannelSink {
    fn emit(&mut self, signal: &Signal) {
        let (name, args) = signal.to_wire();
        if let Err(e) = self.channel.send_signal(&self.path, name, args) {
            tracing::warn!(signal = name, error = %e, "failed to send signal");
        }
    }
}
