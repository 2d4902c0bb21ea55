//! Mock transport and recording sink shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use rand::SeedableRng;
use rand::rngs::StdRng;
use smartlock_controller_lib::core::bluetooth::transport::{Transport, TransportEvent};
use smartlock_controller_lib::core::codec::{CodeWidth, WireCodec};
use smartlock_controller_lib::core::identity::FixedClock;
use smartlock_controller_lib::core::lock_state::{ConnectionState, LockState};
use smartlock_controller_lib::core::presentation::{MessageStyle, PresentationSink, StatusMessage};
use smartlock_controller_lib::core::session::CommandSession;

pub const PHONE_ID: &str = "D1";
pub const RNG_SEED: u64 = 7;

/// Everything the session asked of the transport, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Connect,
    Disconnect,
    EnableNotifications,
    Send(Vec<u8>),
}

#[derive(Default)]
pub struct MockTransport {
    calls: Mutex<Vec<TransportCall>>,
    ready: AtomicBool,
    fail_send: AtomicBool,
    fail_connect: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            ready: AtomicBool::new(true),
            ..Self::default()
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn fail_sends(&self) {
        self.fail_send.store(true, Ordering::SeqCst);
    }

    pub fn fail_connects(&self) {
        self.fail_connect.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Frames written so far, as text
    pub fn sent(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                TransportCall::Send(frame) => Some(String::from_utf8(frame).unwrap()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: TransportCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn connect(&self) -> Result<()> {
        self.record(TransportCall::Connect);
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(anyhow!("adapter unavailable"));
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.record(TransportCall::Disconnect);
        Ok(())
    }

    async fn enable_notifications(&self) -> Result<()> {
        self.record(TransportCall::EnableNotifications);
        Ok(())
    }

    async fn send(&self, frame: &[u8]) -> Result<()> {
        self.record(TransportCall::Send(frame.to_vec()));
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(anyhow!("write failed"));
        }
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

/// One thing pushed to the sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Message(StatusMessage),
    Lock(LockState),
    Connection(ConnectionState),
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<StatusMessage> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SinkEvent::Message(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn last_message(&self) -> Option<StatusMessage> {
        self.messages().pop()
    }

    pub fn lock_changes(&self) -> Vec<LockState> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SinkEvent::Lock(state) => Some(state),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl PresentationSink for RecordingSink {
    fn on_status_message(&self, text: &str, style: MessageStyle) {
        self.events
            .lock()
            .unwrap()
            .push(SinkEvent::Message(StatusMessage::new(text, style)));
    }

    fn on_lock_state_changed(&self, state: LockState) {
        self.events.lock().unwrap().push(SinkEvent::Lock(state));
    }

    fn on_connection_state_changed(&self, state: ConnectionState) {
        self.events.lock().unwrap().push(SinkEvent::Connection(state));
    }
}

pub type TestSession = CommandSession<MockTransport, RecordingSink>;

/// A session with a fixed clock (2024-01-01 12:00) and seeded rng, not yet connected
pub fn session() -> (TestSession, Arc<MockTransport>, Arc<RecordingSink>) {
    let transport = Arc::new(MockTransport::new());
    let sink = Arc::new(RecordingSink::default());
    let session = CommandSession::new(
        transport.clone(),
        sink.clone(),
        WireCodec::default(),
        PHONE_ID,
    )
    .with_clock(FixedClock::at(2024, 1, 1, 12, 0).unwrap())
    .with_rng(StdRng::seed_from_u64(RNG_SEED));
    (session, transport, sink)
}

/// A connected session with the connect handshake cleared from the recorders
pub async fn connected_session() -> (TestSession, Arc<MockTransport>, Arc<RecordingSink>) {
    let (mut session, transport, sink) = session();
    session.connect().await.unwrap();
    session.handle_transport_event(TransportEvent::Connected).await;
    transport.calls.lock().unwrap().clear();
    sink.clear();
    (session, transport, sink)
}

pub fn status(session: &mut TestSession, code: u16) {
    session.handle_status(code, CodeWidth::U8);
}
