//! In-process channel pair.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use super::{Channel, ChannelError, InboundCall, frame_to_call};
use crate::wire::{Frame, WireArgs};

/// Test-side end of an in-process bus.
#[derive(Debug)]
pub struct MemoryChannel {
    inbound: Mutex<Receiver<Frame>>,
    outbound: Sender<Frame>,
}

/// Controller-side end of an in-process bus.
#[derive(Debug)]
pub struct MemoryPeer {
    to_test: Sender<Frame>,
    from_test: Receiver<Frame>,
}

impl MemoryChannel {
    /// A connected channel and the peer that drives it.
    pub fn pair() -> (Self, MemoryPeer) {
        let (to_test, inbound) = mpsc::channel();
        let (outbound, from_test) = mpsc::channel();
        (
            Self {
                inbound: Mutex::new(inbound),
                outbound,
            },
            MemoryPeer { to_test, from_test },
        )
    }
}

impl Channel for MemoryChannel {
    fn send_frame(&self, frame: &Frame) -> Result<(), ChannelError> {
        self.outbound
            .send(frame.clone())
            .map_err(|_| ChannelError::Closed)
    }

    fn poll(&self, timeout: Duration) -> Result<Option<InboundCall>, ChannelError> {
        let inbound = self.inbound.lock().unwrap_or_else(PoisonError::into_inner);
        match inbound.recv_timeout(timeout) {
            Ok(frame) => Ok(frame_to_call(frame)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(ChannelError::Closed),
        }
    }
}

impl MemoryPeer {
    /// Send a method call to the test.
    pub fn call(&self, serial: u64, interface: &str, method: &str, args: WireArgs) -> Result<(), ChannelError> {
        self.to_test
            .send(Frame::Call {
                serial,
                interface: interface.to_string(),
                method: method.to_string(),
                args,
            })
            .map_err(|_| ChannelError::Closed)
    }

    /// Next frame from the test, if one arrives within `timeout`.
    pub fn recv(&self, timeout: Duration) -> Option<Frame> {
        self.from_test.recv_timeout(timeout).ok()
    }

    /// Frames sent by the test so far, without waiting.
    pub fn drain(&self) -> Vec<Frame> {
        self.from_test.try_iter().collect()
    }
}
