//! Session driver
//! One task owns the [`CommandSession`] and drains user intents, transport
//! events and the watchdog tick in order, so the lock state is only ever
//! touched from a single place.

use std::time::{Duration, Instant};

use log::{debug, info};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::core::bluetooth::transport::{Transport, TransportEventReceiver};
use crate::core::codec::CommandKind;
use crate::core::error::SessionError;
use crate::core::lock_state::{ConnectionState, LockState};
use crate::core::presentation::PresentationSink;
use crate::core::session::CommandSession;

/// Intent queue depth; callers wait when it is full
const REQUEST_QUEUE_DEPTH: usize = 32;

/// Something the user asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserIntent {
    Connect,
    Disconnect,
    Unlock(String),
    Lock(String),
    UpdateCodes,
    AppReady,
    Reset,
}

/// Point-in-time view of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub connection: ConnectionState,
    pub lock: LockState,
    pub pending: Option<CommandKind>,
}

enum DriverMessage {
    Intent {
        intent: UserIntent,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    Snapshot(oneshot::Sender<SessionSnapshot>),
}

/// A clonable handle that sends intents to the session task.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<DriverMessage>,
}

impl SessionHandle {
    /// Runs one intent on the session and waits for its outcome
    /// (not for the lock's answer)
    pub async fn submit(&self, intent: UserIntent) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(DriverMessage::Intent { intent, reply })
            .await
            .map_err(|_| SessionError::SessionClosed)?;
        rx.await.map_err(|_| SessionError::SessionClosed)?
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(DriverMessage::Snapshot(reply))
            .await
            .map_err(|_| SessionError::SessionClosed)?;
        rx.await.map_err(|_| SessionError::SessionClosed)
    }
}

pub struct SessionDriver<T: Transport, P: PresentationSink> {
    session: CommandSession<T, P>,
    events: TransportEventReceiver,
    requests: mpsc::Receiver<DriverMessage>,
    cancel_token: CancellationToken,
    tick: Duration,
}

impl<T, P> SessionDriver<T, P>
where
    T: Transport + 'static,
    P: PresentationSink + 'static,
{
    /// Spawns the driver task. It runs until `cancel_token` fires or every
    /// handle is dropped, then hands the session back.
    pub fn spawn(
        session: CommandSession<T, P>,
        events: TransportEventReceiver,
        cancel_token: CancellationToken,
        tick: Duration,
    ) -> (SessionHandle, JoinHandle<CommandSession<T, P>>) {
        let (tx, requests) = mpsc::channel(REQUEST_QUEUE_DEPTH);
        let driver = Self {
            session,
            events,
            requests,
            cancel_token,
            tick,
        };
        let handle = tokio::spawn(driver.run());
        info!("Session driver started.");
        (SessionHandle { tx }, handle)
    }

    async fn run(mut self) -> CommandSession<T, P> {
        let mut watchdog = tokio::time::interval(self.tick);
        watchdog.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => {
                    info!("Session driver cancelled.");
                    break;
                }
                Some(event) = self.events.recv() => {
                    self.session.handle_transport_event(event).await;
                }
                message = self.requests.recv() => {
                    match message {
                        Some(message) => self.handle_message(message).await,
                        None => {
                            info!("All session handles dropped, stopping driver.");
                            break;
                        }
                    }
                }
                _ = watchdog.tick() => {
                    self.session.check_response_timeout(Instant::now());
                }
            }
        }

        self.session
    }

    async fn handle_message(&mut self, message: DriverMessage) {
        match message {
            DriverMessage::Intent { intent, reply } => {
                debug!("Handling intent {:?}", intent);
                let result = match intent {
                    UserIntent::Connect => self.session.connect().await,
                    UserIntent::Disconnect => self.session.disconnect().await,
                    UserIntent::Unlock(code) => self.session.unlock(&code).await,
                    UserIntent::Lock(code) => self.session.lock(&code).await,
                    UserIntent::UpdateCodes => self.session.update_codes().await,
                    UserIntent::AppReady => self.session.app_ready().await,
                    UserIntent::Reset => self.session.reset().await,
                };
                // The caller may have given up waiting; the outcome was already reported.
                let _ = reply.send(result);
            }
            DriverMessage::Snapshot(reply) => {
                let _ = reply.send(SessionSnapshot {
                    connection: self.session.connection_state(),
                    lock: self.session.lock_state(),
                    pending: self.session.pending().map(|p| p.kind),
                });
            }
        }
    }
}
