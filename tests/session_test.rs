//! Command session tests against a recording transport

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{
    MockTransport, RecordingSink, SinkEvent, TransportCall, connected_session, session, status,
};
use smartlock_controller_lib::core::bluetooth::transport::TransportEvent;
use smartlock_controller_lib::core::codec::{CommandKind, EncodeError, WireCodec};
use smartlock_controller_lib::core::error::SessionError;
use smartlock_controller_lib::core::lock_state::{ConnectionState, LockState};
use smartlock_controller_lib::core::presentation::StatusMessage;
use smartlock_controller_lib::core::session::CommandSession;

#[tokio::test]
async fn unlock_sends_frame_and_waits_for_status() {
    let (mut session, transport, sink) = connected_session().await;

    session.unlock("42").await.unwrap();

    assert_eq!(transport.sent(), vec!["0242D12401011200"]);
    assert_eq!(
        sink.messages(),
        vec![StatusMessage::notice("Sending access code 42 to unlock Locker")]
    );
    // Nothing changes until the lock answers.
    assert_eq!(session.lock_state(), LockState::Locked);
    assert_eq!(session.pending().map(|p| p.kind), Some(CommandKind::Unlock));

    status(&mut session, 0x11);
    assert_eq!(session.lock_state(), LockState::Unlocked);
    assert_eq!(sink.lock_changes(), vec![LockState::Unlocked]);
    assert_eq!(
        sink.last_message(),
        Some(StatusMessage::success("Unlock successful!"))
    );
    assert!(session.pending().is_none());
}

#[tokio::test]
async fn lock_sends_frame_when_unlocked() {
    let (mut session, transport, sink) = connected_session().await;
    status(&mut session, 0xD1);
    sink.clear();

    session.lock("7").await.unwrap();

    assert_eq!(transport.sent(), vec!["117D12401011200"]);
    assert_eq!(
        sink.messages(),
        vec![StatusMessage::notice("Trying to lock Locker ...")]
    );

    status(&mut session, 0x10);
    assert_eq!(session.lock_state(), LockState::Locked);
    assert_eq!(
        sink.last_message(),
        Some(StatusMessage::success("Lock successful!"))
    );
}

#[tokio::test]
async fn empty_code_is_rejected_before_anything_else() {
    // Connected or not, an empty code never reaches the transport.
    let (mut connected, transport, sink) = connected_session().await;
    let result = connected.unlock("").await;
    assert!(matches!(result, Err(SessionError::InvalidInput(EncodeError::EmptyCode))));
    assert!(transport.sent().is_empty());
    assert_eq!(
        sink.last_message(),
        Some(StatusMessage::error("Please input a valid code"))
    );

    let (mut offline, transport, sink) = session();
    let result = offline.lock("").await;
    assert!(matches!(result, Err(SessionError::InvalidInput(EncodeError::EmptyCode))));
    assert!(transport.calls().is_empty());
    assert_eq!(
        sink.last_message(),
        Some(StatusMessage::error("Please input a valid code"))
    );
}

#[tokio::test]
async fn non_digit_code_is_invalid_input() {
    let (mut session, transport, sink) = connected_session().await;
    let result = session.unlock("12a").await;
    assert!(matches!(result, Err(SessionError::InvalidInput(EncodeError::NonDigitCode))));
    assert!(transport.sent().is_empty());
    assert_eq!(
        sink.last_message(),
        Some(StatusMessage::error("Please input a valid code"))
    );
}

#[tokio::test]
async fn lock_when_already_locked_sends_nothing() {
    let (mut session, transport, sink) = connected_session().await;

    session.lock("1234").await.unwrap();

    assert!(transport.sent().is_empty());
    assert_eq!(
        sink.messages(),
        vec![StatusMessage::notice("Locker is already locked")]
    );
    assert!(session.pending().is_none());
}

#[tokio::test]
async fn unlock_when_already_unlocked_sends_nothing() {
    let (mut session, transport, sink) = connected_session().await;
    status(&mut session, 0xD1);
    sink.clear();

    session.unlock("1234").await.unwrap();

    assert!(transport.sent().is_empty());
    assert_eq!(
        sink.messages(),
        vec![StatusMessage::notice("Locker is already unlocked")]
    );
}

#[tokio::test]
async fn unusable_lock_still_accepts_both_commands() {
    let (mut session, transport, _sink) = connected_session().await;
    status(&mut session, 0x17);
    assert_eq!(session.lock_state(), LockState::Unusable);

    session.lock("12").await.unwrap();
    session.unlock("12").await.unwrap();

    assert_eq!(
        transport.sent(),
        vec!["1212D12401011200", "0212D12401011200"]
    );
}

#[tokio::test]
async fn commands_need_a_connection() {
    let (mut session, transport, sink) = session();

    assert!(matches!(session.unlock("42").await, Err(SessionError::NotReady)));
    assert!(matches!(session.reset().await, Err(SessionError::NotReady)));
    assert!(matches!(session.update_codes().await, Err(SessionError::NotReady)));
    assert!(matches!(session.app_ready().await, Err(SessionError::NotReady)));

    assert!(transport.calls().is_empty());
    assert_eq!(
        sink.last_message(),
        Some(StatusMessage::error("Locker is not connected"))
    );
}

#[tokio::test]
async fn transport_without_write_path_is_not_ready() {
    let (mut session, transport, _sink) = connected_session().await;
    transport.set_ready(false);

    assert!(matches!(session.unlock("42").await, Err(SessionError::NotReady)));
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn over_long_code_overflows() {
    let (mut session, transport, _sink) = connected_session().await;

    let result = session.unlock("1234567890").await;
    assert!(matches!(
        result,
        Err(SessionError::EncodeOverflow(EncodeError::CodeTooLong { len: 10, max: 9 }))
    ));
    assert!(transport.sent().is_empty());
    assert!(session.pending().is_none());
}

#[tokio::test]
async fn over_long_phone_id_overflows() {
    let transport = Arc::new(MockTransport::new());
    let mut session = CommandSession::new(
        transport.clone(),
        Arc::new(RecordingSink::default()),
        WireCodec::default(),
        "ABCDEFGHIJKLMNOPQ",
    );
    session.handle_transport_event(TransportEvent::Connected).await;

    let result = session.reset().await;
    assert!(matches!(
        result,
        Err(SessionError::EncodeOverflow(EncodeError::DeviceIdTooLong { len: 17, max: 16 }))
    ));
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn reset_forces_locked() {
    let (mut session, transport, sink) = connected_session().await;
    status(&mut session, 0xD1);
    sink.clear();

    session.reset().await.unwrap();

    assert_eq!(transport.sent(), vec!["4D12401011200"]);
    assert_eq!(session.lock_state(), LockState::Locked);
    assert_eq!(
        sink.events(),
        vec![
            SinkEvent::Message(StatusMessage::notice("Reset Locker")),
            SinkEvent::Lock(LockState::Locked),
        ]
    );

    status(&mut session, 0x13);
    assert_eq!(sink.last_message(), Some(StatusMessage::success("Reset done!")));
}

#[tokio::test]
async fn app_ready_expects_no_answer() {
    let (mut session, transport, sink) = connected_session().await;

    session.app_ready().await.unwrap();

    assert_eq!(transport.sent(), vec!["3"]);
    assert_eq!(
        sink.messages(),
        vec![StatusMessage::notice("Send Ready CMD to Locker")]
    );
    assert!(session.pending().is_none());
}

#[tokio::test]
async fn update_codes_is_deterministic_with_a_seed() {
    let (mut first, first_transport, first_sink) = connected_session().await;
    let (mut second, second_transport, _) = connected_session().await;

    first.update_codes().await.unwrap();
    second.update_codes().await.unwrap();

    let frames = first_transport.sent();
    assert_eq!(frames, second_transport.sent());
    assert_eq!(frames.len(), 1);

    let frame = &frames[0];
    assert_eq!(frame.len(), 17);
    assert!(frame.starts_with("23"));
    assert!(frame.ends_with("D12401011200"));
    let digits = &frame[2..5];
    assert!(digits.bytes().all(|b| b.is_ascii_digit()));

    let announced = digits
        .chars()
        .map(String::from)
        .collect::<Vec<_>>()
        .join(", ");
    assert_eq!(
        first_sink.messages(),
        vec![StatusMessage::notice(format!("Generate new access code {announced}"))]
    );
    assert_eq!(first.pending().map(|p| p.kind), Some(CommandKind::UpdateCode));
}

#[tokio::test]
async fn failed_send_is_reported() {
    let (mut session, transport, sink) = connected_session().await;
    transport.fail_sends();

    let result = session.unlock("42").await;

    assert!(matches!(result, Err(SessionError::Transport(_))));
    assert_eq!(
        sink.messages(),
        vec![
            StatusMessage::notice("Sending access code 42 to unlock Locker"),
            StatusMessage::error("Failed to send command to Locker"),
        ]
    );
    assert!(session.pending().is_none());
}

#[tokio::test]
async fn statuses_apply_in_arrival_order() {
    let (mut session, _transport, sink) = connected_session().await;

    status(&mut session, 0x10);
    status(&mut session, 0xD1);

    assert_eq!(session.lock_state(), LockState::Unlocked);
    assert_eq!(sink.lock_changes(), vec![LockState::Unlocked]);
}

#[tokio::test]
async fn unknown_status_is_reported_not_applied() {
    let (mut session, _transport, sink) = connected_session().await;
    status(&mut session, 0xD1);
    sink.clear();

    status(&mut session, 0x42);

    assert_eq!(session.lock_state(), LockState::Unlocked);
    assert_eq!(sink.events(), vec![SinkEvent::Message(StatusMessage::error("Unknown values"))]);
}

#[tokio::test]
async fn connection_lifecycle() {
    let (mut session, transport, sink) = session();

    session.connect().await.unwrap();
    assert_eq!(session.connection_state(), ConnectionState::Connecting);
    assert_eq!(transport.calls(), vec![TransportCall::Connect]);

    session.handle_transport_event(TransportEvent::Connected).await;
    assert_eq!(session.connection_state(), ConnectionState::Connected);
    assert_eq!(
        transport.calls(),
        vec![TransportCall::Connect, TransportCall::EnableNotifications]
    );

    // A repeated signal does not subscribe twice.
    session.handle_transport_event(TransportEvent::Connected).await;
    assert_eq!(transport.calls().len(), 2);

    session.unlock("42").await.unwrap();
    session.disconnect().await.unwrap();
    session.handle_transport_event(TransportEvent::Disconnected).await;
    assert_eq!(session.connection_state(), ConnectionState::Disconnected);
    assert!(session.pending().is_none());

    assert_eq!(
        sink.events(),
        vec![
            SinkEvent::Connection(ConnectionState::Connecting),
            SinkEvent::Connection(ConnectionState::Connected),
            SinkEvent::Message(StatusMessage::notice("Connected to Locker")),
            SinkEvent::Message(StatusMessage::notice("Sending access code 42 to unlock Locker")),
            SinkEvent::Connection(ConnectionState::Disconnected),
            SinkEvent::Message(StatusMessage::notice("Disconnected from Locker")),
        ]
    );
}

#[tokio::test]
async fn connect_error_returns_to_disconnected() {
    let (mut session, transport, sink) = session();
    transport.fail_connects();

    let result = session.connect().await;

    assert!(matches!(result, Err(SessionError::Transport(_))));
    assert_eq!(session.connection_state(), ConnectionState::Disconnected);
    assert_eq!(
        sink.last_message(),
        Some(StatusMessage::error("Failed to connect to Locker"))
    );
}

#[tokio::test]
async fn dropped_connect_attempt_is_a_failure() {
    let (mut session, _transport, sink) = session();

    session.connect().await.unwrap();
    session.handle_transport_event(TransportEvent::Disconnected).await;

    assert_eq!(session.connection_state(), ConnectionState::Disconnected);
    assert_eq!(
        sink.last_message(),
        Some(StatusMessage::error("Failed to connect to Locker"))
    );
}

#[tokio::test]
async fn cancelled_connect_is_a_disconnect() {
    let (mut session, transport, sink) = session();

    session.connect().await.unwrap();
    session.disconnect().await.unwrap();
    session.handle_transport_event(TransportEvent::Disconnected).await;

    assert_eq!(session.connection_state(), ConnectionState::Disconnected);
    assert_eq!(
        transport.calls(),
        vec![TransportCall::Connect, TransportCall::Disconnect]
    );
    assert_eq!(
        sink.last_message(),
        Some(StatusMessage::notice("Disconnected from Locker"))
    );
    assert!(
        !sink
            .messages()
            .contains(&StatusMessage::error("Failed to connect to Locker"))
    );

    // The cancel does not leak into the next attempt.
    session.connect().await.unwrap();
    session.handle_transport_event(TransportEvent::Disconnected).await;
    assert_eq!(
        sink.last_message(),
        Some(StatusMessage::error("Failed to connect to Locker"))
    );
}

#[tokio::test]
async fn lost_response_is_reported_once() {
    let (mut session, _transport, sink) = connected_session().await;
    session.unlock("42").await.unwrap();
    sink.clear();

    assert!(!session.check_response_timeout(Instant::now()));

    let later = Instant::now() + Duration::from_secs(11);
    assert!(session.check_response_timeout(later));
    assert!(!session.check_response_timeout(later + Duration::from_secs(11)));

    assert_eq!(
        sink.events(),
        vec![SinkEvent::Message(StatusMessage::error("No response from Locker"))]
    );
    // No rollback.
    assert_eq!(session.lock_state(), LockState::Locked);
}

#[tokio::test]
async fn any_status_clears_the_pending_command() {
    let (mut session, _transport, sink) = connected_session().await;
    session.unlock("42").await.unwrap();

    status(&mut session, 0x14);
    sink.clear();

    assert!(!session.check_response_timeout(Instant::now() + Duration::from_secs(60)));
    assert!(sink.events().is_empty());
}

#[tokio::test]
async fn watchdog_can_be_disabled() {
    let (session, _transport, _sink) = connected_session().await;
    let mut session = session.with_response_timeout(None);

    session.unlock("42").await.unwrap();

    assert!(session.pending().is_none());
    assert!(!session.check_response_timeout(Instant::now() + Duration::from_secs(3600)));
}

#[tokio::test]
async fn every_known_status_reaches_the_sink() {
    let expected: [(u16, Option<StatusMessage>); 6] = [
        (0x12, Some(StatusMessage::success("Update access codes successfully!"))),
        (0x15, Some(StatusMessage::error("Codes are running out. Locker needs new codes"))),
        (0x16, Some(StatusMessage::error("Out of Sync! Update required"))),
        (0x18, Some(StatusMessage::error("Code is outdated. Update required."))),
        (0x1A, Some(StatusMessage::error("Phone ID is not correct."))),
        (0xD2, None),
    ];

    for (code, message) in expected {
        let (mut session, _transport, sink) = connected_session().await;
        status(&mut session, code);
        assert_eq!(sink.last_message(), message, "code {code:#x}");
    }
}
