//! In-memory ledger plugin and STREAM transport for tests.
//!
//! The fakes append to a shared [`EventLog`] so tests can assert on the
//! order in which money moved, requests were issued and resources released.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use rust_decimal::Decimal;

use crate::error::{BoxError, PluginError};
use crate::plugin::LedgerPlugin;
use crate::receipt::AssetDetails;
use crate::signal::{Signal, SignalTrigger, signal};
use crate::stream::{MoneyStream, StreamConnection, StreamTransport};

/// Ordered record of named events, shared between fakes and the test body.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    /// Appends an event.
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().expect("event log poisoned").push(event.into());
    }

    /// Snapshot of all events so far.
    #[must_use]
    pub fn events(&self) -> Vec<String> {
        self.0.lock().expect("event log poisoned").clone()
    }

    /// Index of the first occurrence of `event`.
    #[must_use]
    pub fn position(&self, event: &str) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }

    /// Number of occurrences of `event`.
    #[must_use]
    pub fn count(&self, event: &str) -> usize {
        self.events().iter().filter(|e| *e == event).count()
    }
}

/// A ledger plugin that counts lifecycle calls.
#[derive(Debug)]
pub struct FakePlugin {
    log: EventLog,
    fail_connect: bool,
    /// Number of `connect` calls.
    pub connects: AtomicUsize,
    /// Number of `disconnect` calls.
    pub disconnects: AtomicUsize,
}

impl FakePlugin {
    /// A plugin that connects successfully.
    #[must_use]
    pub fn new(log: EventLog) -> Arc<Self> {
        Arc::new(Self {
            log,
            fail_connect: false,
            connects: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
        })
    }

    /// A plugin whose `connect` always fails.
    #[must_use]
    pub fn unreachable(log: EventLog) -> Arc<Self> {
        Arc::new(Self {
            log,
            fail_connect: true,
            connects: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
        })
    }
}

#[async_trait::async_trait]
impl LedgerPlugin for FakePlugin {
    async fn connect(&self) -> Result<(), PluginError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.log.push("plugin:connect");
        if self.fail_connect {
            return Err(PluginError::Connect("ledger unreachable".into()));
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), PluginError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.log.push("plugin:disconnect");
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Observed {
    last_connect: Option<(String, Vec<u8>)>,
    last_send_max: Option<Decimal>,
    stream: Option<Arc<FakeStream>>,
}

/// A STREAM transport whose streams send fixed-size chunks on a spawned task.
#[derive(Debug, Clone)]
pub struct FakeStreamTransport {
    log: EventLog,
    chunk: Decimal,
    ack: bool,
    drains: bool,
    fail_connect: bool,
    source: AssetDetails,
    destination: AssetDetails,
    observed: Arc<Mutex<Observed>>,
}

impl FakeStreamTransport {
    /// A transport that connects, sends in chunks of 10 and acknowledges money.
    #[must_use]
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            chunk: Decimal::TEN,
            ack: true,
            drains: true,
            fail_connect: false,
            source: AssetDetails::new("XRP", 9),
            destination: AssetDetails::new("USD", 2),
            observed: Arc::default(),
        }
    }

    /// Sets the amount sent per packet.
    #[must_use]
    pub const fn with_chunk(mut self, chunk: Decimal) -> Self {
        self.chunk = chunk;
        self
    }

    /// Receiver never emits a `data` event.
    #[must_use]
    pub const fn without_ack(mut self) -> Self {
        self.ack = false;
        self
    }

    /// Ended streams never report `end`.
    #[must_use]
    pub const fn without_drain(mut self) -> Self {
        self.drains = false;
        self
    }

    /// Every connection attempt fails.
    #[must_use]
    pub const fn failing_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    /// Overrides the reported assets; `None` leaves both fields unset.
    #[must_use]
    pub fn with_assets(
        mut self,
        source: Option<AssetDetails>,
        destination: Option<AssetDetails>,
    ) -> Self {
        self.source = source.unwrap_or_default();
        self.destination = destination.unwrap_or_default();
        self
    }

    /// Asset reported for the sending end.
    #[must_use]
    pub fn source_asset(&self) -> AssetDetails {
        self.source.clone()
    }

    /// Asset reported for the receiving end.
    #[must_use]
    pub fn destination_asset(&self) -> AssetDetails {
        self.destination.clone()
    }

    /// Destination and secret of the most recent connection.
    #[must_use]
    pub fn last_connect(&self) -> Option<(String, Vec<u8>)> {
        self.observed().last_connect.clone()
    }

    /// Send max set on the most recent stream.
    #[must_use]
    pub fn last_send_max(&self) -> Option<Decimal> {
        self.observed().last_send_max
    }

    /// Total sent on the most recent stream.
    #[must_use]
    pub fn total_sent(&self) -> Decimal {
        self.observed()
            .stream
            .as_ref()
            .map_or(Decimal::ZERO, |s| s.total_sent())
    }

    /// Whether the most recent stream is still open.
    #[must_use]
    pub fn stream_open(&self) -> bool {
        self.observed().stream.as_ref().is_some_and(|s| s.is_open())
    }

    fn observed(&self) -> std::sync::MutexGuard<'_, Observed> {
        self.observed.lock().expect("observed state poisoned")
    }
}

#[async_trait::async_trait]
impl StreamTransport for FakeStreamTransport {
    async fn connect(
        &self,
        _plugin: Arc<dyn LedgerPlugin>,
        destination: &str,
        shared_secret: &[u8],
    ) -> Result<Box<dyn StreamConnection>, BoxError> {
        self.log.push("connection:open");
        if self.fail_connect {
            return Err("handshake rejected".into());
        }
        self.observed().last_connect = Some((destination.to_owned(), shared_secret.to_vec()));
        Ok(Box::new(FakeConnection(self.clone())))
    }
}

#[derive(Debug)]
struct FakeConnection(FakeStreamTransport);

#[async_trait::async_trait]
impl StreamConnection for FakeConnection {
    fn create_stream(&self) -> Box<dyn MoneyStream> {
        let stream = Arc::new(FakeStream::new(self.0.clone()));
        self.0.observed().stream = Some(Arc::clone(&stream));
        Box::new(SharedStream(stream))
    }

    fn source_asset(&self) -> AssetDetails {
        self.0.source.clone()
    }

    fn destination_asset(&self) -> AssetDetails {
        self.0.destination.clone()
    }

    async fn close(&self) -> Result<(), BoxError> {
        self.0.log.push("connection:close");
        Ok(())
    }
}

#[derive(Debug)]
struct StreamState {
    send_max: Decimal,
    total: Decimal,
    open: bool,
}

#[derive(Debug)]
struct FakeStream {
    transport: FakeStreamTransport,
    state: Mutex<StreamState>,
    data: (SignalTrigger, Signal),
    end: (SignalTrigger, Signal),
}

impl FakeStream {
    fn new(transport: FakeStreamTransport) -> Self {
        Self {
            transport,
            state: Mutex::new(StreamState {
                send_max: Decimal::ZERO,
                total: Decimal::ZERO,
                open: true,
            }),
            data: signal(),
            end: signal(),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, StreamState> {
        self.state.lock().expect("stream state poisoned")
    }

    fn total_sent(&self) -> Decimal {
        self.state().total
    }

    fn is_open(&self) -> bool {
        self.state().open
    }

    async fn send_loop(self: Arc<Self>) {
        loop {
            {
                let mut state = self.state();
                if !state.open {
                    break;
                }
                let next = (state.total + self.transport.chunk).min(state.send_max);
                if next <= state.total {
                    break;
                }
                state.total = next;
            }
            self.transport.log.push("stream:sent");
            if self.transport.ack && !self.data.0.has_fired() {
                self.transport.log.push("stream:data");
                self.data.0.fire();
            }
            tokio::task::yield_now().await;
        }
    }
}

#[derive(Debug)]
struct SharedStream(Arc<FakeStream>);

#[async_trait::async_trait]
impl MoneyStream for SharedStream {
    fn set_send_max(&self, amount: Decimal) {
        self.0.state().send_max = amount;
        self.0.transport.observed().last_send_max = Some(amount);
        tokio::spawn(Arc::clone(&self.0).send_loop());
    }

    fn total_sent(&self) -> Decimal {
        self.0.total_sent()
    }

    fn is_open(&self) -> bool {
        self.0.is_open()
    }

    fn end(&self) {
        self.0.state().open = false;
        self.0.transport.log.push("stream:end");
        if self.0.transport.drains && !self.0.end.0.has_fired() {
            self.0.transport.log.push("stream:drained");
            self.0.end.0.fire();
        }
    }

    async fn data_received(&self) {
        self.0.data.1.fired().await;
    }

    async fn ended(&self) {
        self.0.end.1.fired().await;
    }
}
