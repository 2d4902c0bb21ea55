//! Command session for the SmartLock
//! Turns user intents into frames, feeds inbound status codes through the
//! codec into the state machine, and reports everything to the presentation sink.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use rand::RngCore;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::core::bluetooth::constants::RESPONSE_TIMEOUT_SECS;
use crate::core::bluetooth::transport::{Transport, TransportEvent};
use crate::core::codec::{CodeWidth, Command, CommandKind, EncodeError, WireCodec};
use crate::core::error::SessionError;
use crate::core::identity::{Clock, Identity, SystemClock};
use crate::core::lock_state::{ConnectionEvent, ConnectionState, LockState, LockStateMachine};
use crate::core::presentation::{PresentationSink, StatusMessage};

/// A sent command still waiting for any status from the lock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingCommand {
    pub kind: CommandKind,
    pub sent_at: Instant,
}

pub struct CommandSession<T: Transport, P: PresentationSink> {
    transport: Arc<T>,
    sink: Arc<P>,
    codec: WireCodec,
    machine: LockStateMachine,
    phone_id: String,
    clock: Box<dyn Clock>,
    rng: Box<dyn RngCore + Send + Sync>,
    response_timeout: Option<Duration>,
    pending: Option<PendingCommand>,
    disconnect_requested: bool,
}

impl<T: Transport, P: PresentationSink> CommandSession<T, P> {
    pub fn new(transport: Arc<T>, sink: Arc<P>, codec: WireCodec, phone_id: impl Into<String>) -> Self {
        Self {
            transport,
            sink,
            codec,
            machine: LockStateMachine::new(),
            phone_id: phone_id.into(),
            clock: Box::new(SystemClock),
            rng: Box::new(StdRng::from_entropy()),
            response_timeout: Some(Duration::from_secs(RESPONSE_TIMEOUT_SECS)),
            pending: None,
            disconnect_requested: false,
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_rng(mut self, rng: impl RngCore + Send + Sync + 'static) -> Self {
        self.rng = Box::new(rng);
        self
    }

    /// `None` disables lost-response reporting
    pub fn with_response_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn lock_state(&self) -> LockState {
        self.machine.lock_state()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.machine.connection()
    }

    pub fn pending(&self) -> Option<PendingCommand> {
        self.pending
    }

    pub async fn connect(&mut self) -> Result<(), SessionError> {
        if self.machine.connection() == ConnectionState::Connected {
            info!("Locker already connected.");
            return Ok(());
        }

        self.disconnect_requested = false;
        self.update_connection(ConnectionEvent::ConnectRequested);
        if let Err(e) = self.transport.connect().await {
            error!("Failed to connect to Locker: {}", e);
            self.update_connection(ConnectionEvent::Disconnected);
            self.emit(StatusMessage::error("Failed to connect to Locker"));
            return Err(SessionError::Transport(e));
        }
        Ok(())
    }

    /// Closes the link; the state change arrives as a transport event
    pub async fn disconnect(&mut self) -> Result<(), SessionError> {
        self.disconnect_requested = true;
        if let Err(e) = self.transport.disconnect().await {
            error!("Failed to disconnect from Locker: {}", e);
            self.disconnect_requested = false;
            return Err(SessionError::Transport(e));
        }
        Ok(())
    }

    pub async fn unlock(&mut self, code: &str) -> Result<(), SessionError> {
        self.send_code_command(CommandKind::Unlock, code).await
    }

    pub async fn lock(&mut self, code: &str) -> Result<(), SessionError> {
        self.send_code_command(CommandKind::Lock, code).await
    }

    /// Generates fresh access digits and provisions them on the lock
    pub async fn update_codes(&mut self) -> Result<(), SessionError> {
        self.ensure_ready().await?;

        let count = self.codec.profile().update_code_digits;
        let command = Command::update_code(&mut *self.rng, count);
        let announced = match &command {
            Command::UpdateCode { digits } => digits
                .chars()
                .map(String::from)
                .collect::<Vec<_>>()
                .join(", "),
            _ => String::new(),
        };

        let notice = StatusMessage::notice(format!("Generate new access code {announced}"));
        self.dispatch(command, notice).await
    }

    pub async fn app_ready(&mut self) -> Result<(), SessionError> {
        self.ensure_ready().await?;
        self.dispatch(
            Command::AppReady,
            StatusMessage::notice("Send Ready CMD to Locker"),
        )
        .await
    }

    /// Resets the lock; the lock defaults to locked, so the state follows
    /// immediately without waiting for the answer
    pub async fn reset(&mut self) -> Result<(), SessionError> {
        self.ensure_ready().await?;
        self.dispatch(Command::Reset, StatusMessage::notice("Reset Locker"))
            .await?;

        if self.machine.set_lock_state(LockState::Locked) {
            self.sink.on_lock_state_changed(LockState::Locked);
        }
        Ok(())
    }

    /// Routes one transport event through the state machine
    pub async fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected => {
                if self.update_connection(ConnectionEvent::Connected) == Some(ConnectionState::Connected) {
                    info!("Locker connected, setting up notifications...");
                    self.emit(StatusMessage::notice("Connected to Locker"));
                    if let Err(e) = self.transport.enable_notifications().await {
                        error!("Failed to subscribe to Locker notifications: {}", e);
                        self.emit(StatusMessage::error(
                            "Failed to subscribe to Locker notifications",
                        ));
                    }
                }
            }
            TransportEvent::Disconnected => {
                let was = self.machine.connection();
                // A cancelled attempt is a plain disconnect, not a failure.
                let requested = std::mem::take(&mut self.disconnect_requested);
                if self.update_connection(ConnectionEvent::Disconnected).is_some() {
                    self.pending = None;
                    if was == ConnectionState::Connecting && !requested {
                        warn!("Locker connection attempt failed.");
                        self.emit(StatusMessage::error("Failed to connect to Locker"));
                    } else {
                        info!("Locker disconnected.");
                        self.emit(StatusMessage::notice("Disconnected from Locker"));
                    }
                }
            }
            TransportEvent::StatusReceived { code, width } => self.handle_status(code, width),
        }
    }

    /// Decodes one status code and applies it
    pub fn handle_status(&mut self, code: u16, width: CodeWidth) {
        debug!("Received status code {:#04x} ({}-bit)", code, width.bits());

        // Any status answers the outstanding command; the protocol carries no ids.
        self.pending = None;

        let event = self.codec.decode(code);
        let transition = self.machine.apply(event);
        if let Some(message) = transition.message {
            self.emit(message);
        }
        if transition.lock_changed {
            info!("Lock state is now {}", transition.lock_state);
            self.sink.on_lock_state_changed(transition.lock_state);
        }
    }

    /// Reports a lost response once the timeout has elapsed since the last send.
    /// Returns whether a report was made.
    pub fn check_response_timeout(&mut self, now: Instant) -> bool {
        let (Some(timeout), Some(pending)) = (self.response_timeout, self.pending) else {
            return false;
        };
        if now.saturating_duration_since(pending.sent_at) < timeout {
            return false;
        }

        warn!(
            "No response to {:?} after {} ms",
            pending.kind,
            timeout.as_millis()
        );
        self.pending = None;
        self.emit(StatusMessage::error("No response from Locker"));
        true
    }

    async fn send_code_command(&mut self, kind: CommandKind, code: &str) -> Result<(), SessionError> {
        if code.is_empty() {
            return Err(self.reject(SessionError::InvalidInput(EncodeError::EmptyCode)));
        }
        self.ensure_ready().await?;

        let (target, already) = match kind {
            CommandKind::Unlock => (LockState::Unlocked, "Locker is already unlocked"),
            _ => (LockState::Locked, "Locker is already locked"),
        };
        if self.machine.lock_state() == target {
            info!("{:?} skipped, lock state is already {}", kind, target);
            self.emit(StatusMessage::notice(already));
            return Ok(());
        }

        let (command, notice) = match kind {
            CommandKind::Unlock => (
                Command::Unlock {
                    code: code.to_string(),
                },
                StatusMessage::notice(format!("Sending access code {code} to unlock Locker")),
            ),
            _ => (
                Command::Lock {
                    code: code.to_string(),
                },
                StatusMessage::notice("Trying to lock Locker ..."),
            ),
        };
        self.dispatch(command, notice).await
    }

    async fn ensure_ready(&mut self) -> Result<(), SessionError> {
        if self.machine.connection() != ConnectionState::Connected || !self.transport.is_ready().await {
            return Err(self.reject(SessionError::NotReady));
        }
        Ok(())
    }

    async fn dispatch(&mut self, command: Command, notice: StatusMessage) -> Result<(), SessionError> {
        let kind = command.kind();
        let identity = Identity::new(self.phone_id.as_str(), self.clock.timestamp());

        let frame = match self.codec.encode(&command, &identity) {
            Ok(frame) => frame,
            Err(e) => return Err(self.reject(e.into())),
        };

        info!("Sending frame to Locker: {}", String::from_utf8_lossy(&frame));
        self.emit(notice);

        if let Err(e) = self.transport.send(&frame).await {
            error!("Failed to send {:?} frame: {}", kind, e);
            self.emit(StatusMessage::error("Failed to send command to Locker"));
            return Err(SessionError::Transport(e));
        }

        if kind.expects_response() && self.response_timeout.is_some() {
            self.pending = Some(PendingCommand {
                kind,
                sent_at: Instant::now(),
            });
        }
        Ok(())
    }

    /// Surfaces a rejected operation to the user and hands the error back
    fn reject(&self, err: SessionError) -> SessionError {
        warn!("Command rejected: {}", err);
        let message = match &err {
            SessionError::NotReady => StatusMessage::error("Locker is not connected"),
            SessionError::InvalidInput(e) if e.is_code_error() => {
                StatusMessage::error("Please input a valid code")
            }
            SessionError::InvalidInput(e) => StatusMessage::error(format!("Invalid phone ID: {e}")),
            SessionError::EncodeOverflow(e) => {
                StatusMessage::error(format!("Command too long for Locker: {e}"))
            }
            SessionError::Transport(_) => StatusMessage::error("Failed to send command to Locker"),
            SessionError::SessionClosed => StatusMessage::error("Session is closed"),
        };
        self.emit(message);
        err
    }

    fn update_connection(&mut self, event: ConnectionEvent) -> Option<ConnectionState> {
        let changed = self.machine.apply_connection(event);
        if let Some(state) = changed {
            self.sink.on_connection_state_changed(state);
        }
        changed
    }

    fn emit(&self, message: StatusMessage) {
        self.sink.on_status_message(&message.text, message.style);
    }
}
