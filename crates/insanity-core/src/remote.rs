//! Controller-driven runs: the bus control loop.
//!
//! The loop polls the channel on a short interval, answers each call in
//! order and stops once teardown raises the exit flag. Signals from a worker
//! thread go out through the same channel concurrently.

use std::sync::Arc;

use crate::channel::{Channel, ChannelError, InboundCall};
use crate::config::HarnessConfig;
use crate::signals::ChannelSink;
use crate::test::Test;
use crate::value::Value;
use crate::wire::{
    ERROR_INVALID_ARGS, ERROR_UNKNOWN_METHOD, ERROR_WRONG_STATE, Frame, INTROSPECTABLE_INTERFACE,
    METHOD_INTROSPECT, METHOD_SET_UP, METHOD_START, METHOD_STOP, METHOD_TEAR_DOWN, Reply,
    TEST_INTERFACE, call_args_from_wire, introspection_xml, object_path, service_name,
};

impl Test {
    /// Serve one controller on `channel` until teardown.
    ///
    /// Announces itself with a `hello` frame naming the bus name and object
    /// path derived from `uuid`.
    ///
    /// # Errors
    ///
    /// Transport failures, including the controller going away before
    /// teardown.
    pub fn serve(
        &self,
        channel: Arc<dyn Channel>,
        uuid: &str,
        config: &HarnessConfig,
    ) -> Result<(), ChannelError> {
        let path = object_path(uuid);
        channel.send_frame(&Frame::Hello {
            name: service_name(uuid),
            path: path.clone(),
        })?;
        self.configure(config, false, Box::new(ChannelSink::new(Arc::clone(&channel), path)));
        tracing::info!(test = %self.name(), uuid, "serving controller");

        let interval = config.poll_interval();
        while !self.exit_requested() {
            let Some(call) = channel.poll(interval)? else {
                continue;
            };
            tracing::debug!(serial = call.serial, method = %call.method, "inbound call");
            let reply = self.dispatch(&call, uuid);
            channel.reply(call.serial, reply)?;
        }
        tracing::info!("torn down, leaving control loop");
        Ok(())
    }

    fn dispatch(&self, call: &InboundCall, uuid: &str) -> Reply {
        let method = call.method.as_str();
        if call.interface == INTROSPECTABLE_INTERFACE && method == METHOD_INTROSPECT {
            return Reply::Values(vec![Value::String(introspection_xml(uuid))]);
        }
        if call.interface != TEST_INTERFACE {
            return unknown_method(call);
        }
        match method {
            METHOD_SET_UP | METHOD_START => {
                let args = match call_args_from_wire(self.registry(), &call.args) {
                    Ok(args) => args,
                    Err(e) => {
                        tracing::warn!(method, error = %e, "rejecting argument map");
                        return Reply::boolean(false);
                    }
                };
                let result = if method == METHOD_SET_UP {
                    self.do_setup(&args)
                } else {
                    self.do_start(&args)
                };
                if let Err(e) = &result {
                    tracing::warn!(method, error = %e, "transition failed");
                }
                Reply::boolean(result.is_ok())
            }
            METHOD_STOP | METHOD_TEAR_DOWN => {
                let result = if method == METHOD_STOP {
                    self.do_stop()
                } else {
                    self.do_teardown()
                };
                match result {
                    Ok(()) => Reply::empty(),
                    Err(e) => {
                        tracing::warn!(method, error = %e, "transition failed");
                        Reply::error(ERROR_WRONG_STATE, e.to_string())
                    }
                }
            }
            _ => unknown_method(call),
        }
    }
}

fn unknown_method(call: &InboundCall) -> Reply {
    tracing::debug!(interface = %call.interface, method = %call.method, "unknown method");
    if call.method.is_empty() {
        return Reply::error(ERROR_INVALID_ARGS, "empty method name");
    }
    Reply::error(
        ERROR_UNKNOWN_METHOD,
        format!("no method {}.{}", call.interface, call.method),
    )
}
