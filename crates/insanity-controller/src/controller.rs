//! Driving one test process over a private bus.
//!
//! [`TestController::spawn`] binds a Unix socket in a fresh temp directory,
//! starts the test in remote mode pointed at it and waits for the `hello`
//! frame. A background task then reads the bus: replies complete pending
//! calls by serial, signals are queued for [`TestController::wait_done`].

use std::collections::{BTreeMap, HashMap};
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use insanity_core::channel::BUS_ADDRESS_ENV;
use insanity_core::signals::Signal;
use insanity_core::wire::{
    self, Frame, INTROSPECTABLE_INTERFACE, METHOD_INTROSPECT, METHOD_SET_UP, METHOD_START,
    METHOD_STOP, METHOD_TEAR_DOWN, TEST_INTERFACE, WireArgs, call_args_to_wire,
};
use insanity_core::{CallArgs, TestMetadata, Value, WaitOutcome};
use tokio::net::UnixListener;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout, timeout_at};
use uuid::Uuid;

use crate::error::ControllerError;
use crate::framing::{FrameReader, write_frame};

/// Checklist item the controller records itself: `false` when the test
/// stopped making progress.
pub const NO_TIMEOUT_ITEM: &str = "no-timeout";

/// Timeouts and extra command-line arguments for a spawned test.
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    /// Bound on the test connecting and sending `hello`.
    pub connect_timeout: Duration,
    /// Bound on each request/reply.
    pub call_timeout: Duration,
    /// How long to wait for the process to exit after teardown before
    /// killing it.
    pub exit_timeout: Duration,
    /// Passed to the test after `--run --dbus-uuid=<uuid>`.
    pub extra_args: Vec<OsString>,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            call_timeout: Duration::from_secs(10),
            exit_timeout: Duration::from_secs(5),
            extra_args: Vec::new(),
        }
    }
}

type CallResult = Result<Vec<Value>, ControllerError>;
type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<CallResult>>>>;

/// Request/reply half of the bus connection.
pub struct BusClient {
    writer: Mutex<OwnedWriteHalf>,
    pending: Pending,
    next_serial: AtomicU64,
    call_timeout: Duration,
}

impl BusClient {
    /// Send a method call and wait for its reply.
    ///
    /// # Errors
    ///
    /// [`ControllerError::Remote`] when the test answers with an error frame,
    /// [`ControllerError::CallTimeout`] when no answer arrives in time and
    /// [`ControllerError::Closed`] when the connection drops first.
    pub async fn call(&self, interface: &str, method: &str, args: WireArgs) -> CallResult {
        let serial = self.next_serial.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(serial, tx);

        let frame = Frame::Call {
            serial,
            interface: interface.to_string(),
            method: method.to_string(),
            args,
        };
        let written = {
            let mut writer = self.writer.lock().await;
            write_frame(&mut *writer, &frame).await
        };
        if let Err(e) = written {
            self.pending.lock().await.remove(&serial);
            return Err(e.into());
        }
        tracing::debug!(serial, method, "call sent");

        match timeout(self.call_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ControllerError::Closed),
            Err(_) => {
                self.pending.lock().await.remove(&serial);
                Err(ControllerError::CallTimeout {
                    method: method.to_string(),
                    after: self.call_timeout,
                })
            }
        }
    }
}

/// What a driven run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub checklist: BTreeMap<String, bool>,
    pub extra_info: BTreeMap<String, Value>,
    pub timed_out: bool,
    /// `None` when the process had to be killed.
    pub exit_status: Option<ExitStatus>,
}

impl RunOutcome {
    /// No timeout, every reported item passed and the process exited cleanly.
    pub fn passed(&self) -> bool {
        !self.timed_out
            && self.checklist.values().all(|ok| *ok)
            && self.exit_status.is_some_and(|s| s.success())
    }

    /// Outcome lines against the declared checklist: reported items as
    /// `PASS`/`FAIL`, declared but unreported items as `SKIP`.
    pub fn report<'a>(&'a self, metadata: &'a TestMetadata) -> OutcomeReport<'a> {
        OutcomeReport {
            outcome: self,
            metadata,
        }
    }
}

/// Display adapter returned by [`RunOutcome::report`].
pub struct OutcomeReport<'a> {
    outcome: &'a RunOutcome,
    metadata: &'a TestMetadata,
}

impl OutcomeReport<'_> {
    /// Failed plus skipped items.
    pub fn failed(&self) -> usize {
        let skipped = self
            .metadata
            .checklist
            .keys()
            .filter(|label| !self.outcome.checklist.contains_key(*label))
            .count();
        self.outcome.checklist.values().filter(|ok| !**ok).count() + skipped
    }

    pub fn passed(&self) -> bool {
        self.outcome.passed() && self.failed() == 0
    }
}

impl fmt::Display for OutcomeReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut labels: Vec<&String> = self
            .metadata
            .checklist
            .keys()
            .chain(self.outcome.checklist.keys())
            .collect();
        labels.sort();
        labels.dedup();
        for label in &labels {
            let status = match self.outcome.checklist.get(*label) {
                Some(true) => "PASS",
                Some(false) => "FAIL",
                None => "SKIP",
            };
            writeln!(f, "{label}: {status}")?;
        }
        for (label, value) in &self.outcome.extra_info {
            writeln!(f, "Extra info: {label}: {value}")?;
        }
        write!(f, "{}/{} failed tests", self.failed(), labels.len())
    }
}

/// A test process under remote control.
pub struct TestController {
    child: Child,
    client: BusClient,
    signals: mpsc::UnboundedReceiver<Signal>,
    reader: JoinHandle<()>,
    service: String,
    path: String,
    options: ControllerOptions,
    checklist: BTreeMap<String, bool>,
    extra_info: BTreeMap<String, Value>,
    // Done arrived since the last setup/start, possibly before its reply.
    done_seen: bool,
    // Holds the socket; removed on drop.
    _bus_dir: tempfile::TempDir,
}

impl TestController {
    /// Start `program` in remote mode and complete the handshake.
    ///
    /// # Errors
    ///
    /// Fails if the socket cannot be bound, the program cannot be started,
    /// exits early, or does not connect and announce itself within
    /// `connect_timeout`.
    pub async fn spawn(program: impl AsRef<OsStr>, options: ControllerOptions) -> Result<Self, ControllerError> {
        let program = program.as_ref();
        let bus_dir = tempfile::Builder::new().prefix("insanity-bus-").tempdir()?;
        let socket = bus_dir.path().join("bus.sock");
        let listener = UnixListener::bind(&socket)?;
        let uuid = Uuid::new_v4().simple().to_string();

        let mut child = Command::new(program)
            .arg("--run")
            .arg(format!("--dbus-uuid={uuid}"))
            .args(&options.extra_args)
            .env(BUS_ADDRESS_ENV, format!("unix:path={}", socket.display()))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ControllerError::Spawn {
                program: PathBuf::from(program),
                source,
            })?;
        tracing::info!(program = %PathBuf::from(program).display(), %uuid, "spawned test");

        let stream = tokio::select! {
            accepted = listener.accept() => accepted?.0,
            status = child.wait() => return Err(ControllerError::ExitedEarly(status?)),
            () = tokio::time::sleep(options.connect_timeout) => {
                return Err(ControllerError::ConnectTimeout(options.connect_timeout));
            }
        };

        let (read_half, write_half) = stream.into_split();
        let mut reader = FrameReader::new(read_half);
        let hello = timeout(options.connect_timeout, reader.next_frame())
            .await
            .map_err(|_| ControllerError::ConnectTimeout(options.connect_timeout))??;
        let (service, path) = match hello {
            Some(Frame::Hello { name, path }) if name == wire::service_name(&uuid) => (name, path),
            other => return Err(ControllerError::Handshake(format!("{other:?}"))),
        };
        tracing::debug!(%service, %path, "test connected");

        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let (signal_tx, signals) = mpsc::unbounded_channel();
        let reader = tokio::spawn(read_loop(reader, Arc::clone(&pending), signal_tx));

        Ok(Self {
            child,
            client: BusClient {
                writer: Mutex::new(write_half),
                pending,
                next_serial: AtomicU64::new(1),
                call_timeout: options.call_timeout,
            },
            signals,
            reader,
            service,
            path,
            options,
            checklist: BTreeMap::new(),
            extra_info: BTreeMap::new(),
            done_seen: false,
            _bus_dir: bus_dir,
        })
    }

    /// Bus name the test announced.
    pub fn service_name(&self) -> &str {
        &self.service
    }

    /// Object path the test announced.
    pub fn object_path(&self) -> &str {
        &self.path
    }

    pub fn client(&self) -> &BusClient {
        &self.client
    }

    /// Checklist results received so far.
    pub fn checklist(&self) -> &BTreeMap<String, bool> {
        &self.checklist
    }

    /// Extra info received so far.
    pub fn extra_info(&self) -> &BTreeMap<String, Value> {
        &self.extra_info
    }

    /// The introspection document.
    pub async fn introspect(&self) -> Result<String, ControllerError> {
        let values = self
            .client
            .call(INTROSPECTABLE_INTERFACE, METHOD_INTROSPECT, WireArgs::new())
            .await?;
        values
            .first()
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ControllerError::MalformedReply {
                method: METHOD_INTROSPECT.to_string(),
            })
    }

    /// `remoteSetUp`. Clears results collected by a previous run.
    pub async fn set_up(&mut self, args: &CallArgs) -> Result<bool, ControllerError> {
        self.checklist.clear();
        self.extra_info.clear();
        self.done_seen = false;
        self.bool_call(METHOD_SET_UP, args).await
    }

    /// `remoteStart`. A test may finish before the reply arrives; that
    /// `done` is kept for [`Self::wait_done`].
    pub async fn start(&mut self, args: &CallArgs) -> Result<bool, ControllerError> {
        let finished = std::mem::take(&mut self.done_seen);
        let accepted = self.bool_call(METHOD_START, args).await?;
        if !accepted {
            self.done_seen |= finished;
        }
        Ok(accepted)
    }

    /// `remoteStop`.
    pub async fn stop(&mut self) -> Result<(), ControllerError> {
        self.client.call(TEST_INTERFACE, METHOD_STOP, WireArgs::new()).await?;
        self.drain_signals();
        Ok(())
    }

    /// `remoteTearDown`. Signals sent during teardown, such as `cpu-load`,
    /// are collected before this returns.
    pub async fn tear_down(&mut self) -> Result<(), ControllerError> {
        self.client
            .call(TEST_INTERFACE, METHOD_TEAR_DOWN, WireArgs::new())
            .await?;
        self.drain_signals();
        Ok(())
    }

    async fn bool_call(&mut self, method: &'static str, args: &CallArgs) -> Result<bool, ControllerError> {
        let values = self
            .client
            .call(TEST_INTERFACE, method, call_args_to_wire(args))
            .await?;
        self.drain_signals();
        let accepted = values.first().and_then(Value::as_bool).ok_or_else(|| {
            ControllerError::MalformedReply {
                method: method.to_string(),
            }
        })?;
        if !accepted {
            tracing::warn!(method, "test refused transition");
        }
        Ok(accepted)
    }

    /// Consume signals until `done` arrives or the test goes quiet for
    /// `period`. Validations, extra info and pings re-arm the deadline;
    /// `None` waits indefinitely.
    ///
    /// # Errors
    ///
    /// [`ControllerError::Closed`] if the connection ends first.
    pub async fn wait_done(&mut self, period: Option<Duration>) -> Result<WaitOutcome, ControllerError> {
        let mut deadline = period.and_then(|p| Instant::now().checked_add(p));
        loop {
            if self.done_seen {
                return Ok(WaitOutcome::Done);
            }
            let next = match deadline {
                Some(at) => match timeout_at(at, self.signals.recv()).await {
                    Ok(next) => next,
                    Err(_) => {
                        tracing::warn!(service = %self.service, "no progress, giving up on the test");
                        return Ok(WaitOutcome::TimedOut);
                    }
                },
                None => self.signals.recv().await,
            };
            let Some(signal) = next else {
                return Err(ControllerError::Closed);
            };
            if self.record(signal) {
                if let Some(p) = period {
                    deadline = Instant::now().checked_add(p);
                }
            }
        }
    }

    /// Record one signal; `true` when it counts as progress.
    fn record(&mut self, signal: Signal) -> bool {
        match signal {
            Signal::ValidateChecklistItem {
                label,
                success,
                description,
            } => {
                tracing::info!(
                    %label,
                    success,
                    description = description.as_deref().unwrap_or(""),
                    "checklist item"
                );
                let entry = self.checklist.entry(label).or_insert(true);
                *entry &= success;
                true
            }
            Signal::ExtraInfo { label, value } => {
                tracing::info!(%label, %value, "extra info");
                self.extra_info.insert(label, value);
                true
            }
            Signal::Ping => true,
            Signal::Done => {
                self.done_seen = true;
                false
            }
            Signal::Ready => false,
        }
    }

    fn drain_signals(&mut self) {
        while let Ok(signal) = self.signals.try_recv() {
            self.record(signal);
        }
    }

    /// Wait for the process to exit, killing it after `exit_timeout`.
    /// Returns `None` if it had to be killed.
    pub async fn wait_exit(&mut self) -> Result<Option<ExitStatus>, ControllerError> {
        match timeout(self.options.exit_timeout, self.child.wait()).await {
            Ok(status) => Ok(Some(status?)),
            Err(_) => {
                tracing::warn!(service = %self.service, "test did not exit after teardown, killing it");
                self.child.kill().await?;
                Ok(None)
            }
        }
    }

    /// Kill the process without a teardown.
    pub async fn kill(&mut self) -> Result<(), ControllerError> {
        self.child.kill().await?;
        Ok(())
    }

    /// The whole sequence: setup and start with `args`, wait for done, stop,
    /// teardown, wait for exit.
    ///
    /// Records [`NO_TIMEOUT_ITEM`] as `false` when the wait timed out and
    /// `true` otherwise.
    ///
    /// # Errors
    ///
    /// [`ControllerError::Refused`] when setup or start is refused, plus any
    /// bus error.
    pub async fn run(mut self, args: &CallArgs, period: Option<Duration>) -> Result<RunOutcome, ControllerError> {
        if !self.set_up(args).await? {
            self.kill().await?;
            return Err(ControllerError::Refused { method: METHOD_SET_UP });
        }
        if !self.start(args).await? {
            self.tear_down().await?;
            self.wait_exit().await?;
            return Err(ControllerError::Refused { method: METHOD_START });
        }

        let timed_out = self.wait_done(period).await? == WaitOutcome::TimedOut;
        self.checklist.insert(NO_TIMEOUT_ITEM.to_string(), !timed_out);
        self.stop().await?;
        self.tear_down().await?;
        let exit_status = self.wait_exit().await?;

        Ok(RunOutcome {
            checklist: std::mem::take(&mut self.checklist),
            extra_info: std::mem::take(&mut self.extra_info),
            timed_out,
            exit_status,
        })
    }
}

impl Drop for TestController {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn read_loop(
    mut reader: FrameReader<OwnedReadHalf>,
    pending: Pending,
    signals: mpsc::UnboundedSender<Signal>,
) {
    loop {
        let frame = match reader.next_frame().await {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "bus read failed");
                break;
            }
        };
        match frame {
            Frame::Reply { serial, values } => complete(&pending, serial, Ok(values)).await,
            Frame::Error { serial, name, message } => {
                complete(&pending, serial, Err(ControllerError::Remote { name, message })).await;
            }
            Frame::Signal { name, args, .. } => match Signal::from_wire(&name, &args) {
                Some(signal) => {
                    tracing::debug!(%name, "signal");
                    let _ = signals.send(signal);
                }
                None => tracing::warn!(%name, "unrecognised signal"),
            },
            other => tracing::warn!(?other, "unexpected frame from test"),
        }
    }
    tracing::debug!("bus closed by test");
    // Dropping the senders fails every outstanding call with Closed.
    pending.lock().await.clear();
}

async fn complete(pending: &Pending, serial: u64, result: CallResult) {
    match pending.lock().await.remove(&serial) {
        Some(tx) => {
            let _ = tx.send(result);
        }
        None => tracing::debug!(serial, "reply for unknown or expired call"),
    }
}

/// Run `program --insanity-metadata` and parse the document it prints.
///
/// # Errors
///
/// Fails if the program cannot be run, exits non-zero or prints something
/// that is not a metadata document.
pub async fn fetch_metadata(program: impl AsRef<OsStr>) -> Result<TestMetadata, ControllerError> {
    let program = program.as_ref();
    let output = Command::new(program)
        .arg("--insanity-metadata")
        .stdin(Stdio::null())
        .stderr(Stdio::inherit())
        .output()
        .await
        .map_err(|source| ControllerError::Spawn {
            program: PathBuf::from(program),
            source,
        })?;
    if !output.status.success() {
        return Err(ControllerError::MetadataFailed {
            program: PathBuf::from(program),
            status: output.status,
        });
    }
    let text = String::from_utf8_lossy(&output.stdout);
    Ok(TestMetadata::from_json(&text)?)
}
