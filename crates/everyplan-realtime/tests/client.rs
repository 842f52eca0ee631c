use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use everyplan_core::CredentialPair;
use everyplan_realtime::{
    BoxFuture, ConnectRequest, ConnectionState, EventConnector, FrameStream, RealtimeClient,
    RealtimeConfig, RealtimeError, RealtimeNotification, RealtimeResult, ReminderEvent, SseFrame,
    StreamAuth, TestEvent,
};
use everyplan_session::{CredentialStore, SessionConfig, SessionContext};
use futures_util::{StreamExt, stream};
use tokio::sync::mpsc;
use tokio::time::Instant;

enum Step {
    Fail(RealtimeError),
    /// Opens, yields the items, then closes.
    Frames(Vec<RealtimeResult<SseFrame>>),
    /// Opens, yields the frames, then stays open.
    Hold(Vec<SseFrame>),
}

#[derive(Default)]
struct Script {
    steps: VecDeque<Step>,
    attempts: Vec<(Instant, ConnectRequest)>,
}

/// Plays back a fixed sequence of connection outcomes; once the script
/// runs out every attempt is refused.
#[derive(Clone, Default)]
struct ScriptedConnector(Arc<Mutex<Script>>);

impl ScriptedConnector {
    fn new(steps: Vec<Step>) -> Self {
        Self(Arc::new(Mutex::new(Script {
            steps: steps.into(),
            attempts: Vec::new(),
        })))
    }

    fn attempt_count(&self) -> usize {
        self.0.lock().unwrap().attempts.len()
    }

    fn attempt_offsets(&self, start: Instant) -> Vec<u64> {
        self.0
            .lock()
            .unwrap()
            .attempts
            .iter()
            .map(|(at, _)| at.duration_since(start).as_secs())
            .collect()
    }

    fn requests(&self) -> Vec<ConnectRequest> {
        self.0
            .lock()
            .unwrap()
            .attempts
            .iter()
            .map(|(_, request)| request.clone())
            .collect()
    }
}

impl EventConnector for ScriptedConnector {
    fn connect<'a>(
        &'a self,
        request: &'a ConnectRequest,
    ) -> BoxFuture<'a, RealtimeResult<FrameStream>> {
        let step = {
            let mut script = self.0.lock().unwrap();
            script.attempts.push((Instant::now(), request.clone()));
            script.steps.pop_front()
        };
        Box::pin(async move {
            match step {
                None => Err(RealtimeError::transport("connection refused")),
                Some(Step::Fail(e)) => Err(e),
                Some(Step::Frames(items)) => Ok(stream::iter(items).boxed()),
                Some(Step::Hold(frames)) => Ok(stream::iter(frames.into_iter().map(Ok))
                    .chain(stream::pending())
                    .boxed()),
            }
        })
    }
}

fn session(access_token: Option<&str>) -> SessionContext {
    let config = SessionConfig::new("http://127.0.0.1:9").unwrap();
    let store = match access_token {
        Some(token) => CredentialStore::with_pair(CredentialPair::new(token, "r.r.r").unwrap()),
        None => CredentialStore::new(),
    };
    SessionContext::builder(config)
        .with_store(store)
        .build()
        .unwrap()
}

fn client(ctx: &SessionContext, auth: StreamAuth, connector: ScriptedConnector) -> RealtimeClient {
    let config = RealtimeConfig::for_session(ctx.config(), auth).unwrap();
    RealtimeClient::with_connector(ctx.clone(), config, connector)
}

fn reminder(id: &str) -> SseFrame {
    SseFrame::new(
        "reminder",
        format!(r#"{{"scheduleId":"{}","title":"meeting {}"}}"#, id, id),
    )
}

fn reminder_id(notification: &RealtimeNotification) -> Option<&str> {
    match notification {
        RealtimeNotification::Reminder(ReminderEvent { schedule_id, .. }) => schedule_id.as_deref(),
        _ => None,
    }
}

fn drain(rx: &mut mpsc::UnboundedReceiver<RealtimeNotification>) -> Vec<RealtimeNotification> {
    let mut out = Vec::new();
    while let Ok(notification) = rx.try_recv() {
        out.push(notification);
    }
    out
}

#[tokio::test(start_paused = true)]
async fn reconnect_delays_double_up_to_ceiling() {
    let connector = ScriptedConnector::default();
    let ctx = session(Some("h.p.s"));
    let start = Instant::now();
    let subscription = client(&ctx, StreamAuth::QueryToken, connector.clone()).subscribe(());

    tokio::time::sleep(Duration::from_secs(70)).await;
    subscription.stop();
    subscription.join().await;

    assert_eq!(connector.attempt_offsets(start), vec![0, 1, 3, 7, 15, 31, 61]);
}

#[tokio::test(start_paused = true)]
async fn successful_open_resets_delay() {
    let connector = ScriptedConnector::new(vec![
        Step::Fail(RealtimeError::http(502)),
        Step::Fail(RealtimeError::http(502)),
        Step::Frames(Vec::new()),
    ]);
    let ctx = session(Some("h.p.s"));
    let start = Instant::now();
    let subscription = client(&ctx, StreamAuth::QueryToken, connector.clone()).subscribe(());

    tokio::time::sleep(Duration::from_millis(6500)).await;
    subscription.stop();

    // 0 fail, +1 fail, +2 open and close, +1 (reset) fail, +2 fail
    assert_eq!(connector.attempt_offsets(start), vec![0, 1, 3, 4, 6]);
}

#[tokio::test(start_paused = true)]
async fn stop_during_backoff_prevents_reconnect() {
    let connector = ScriptedConnector::default();
    let ctx = session(Some("h.p.s"));
    let subscription = client(&ctx, StreamAuth::QueryToken, connector.clone()).subscribe(());

    // Attempts at 0s and 1s; the loop is now waiting 2s.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(connector.attempt_count(), 2);
    assert_eq!(subscription.state(), ConnectionState::Disconnected);

    subscription.stop();
    subscription.stop();
    assert!(subscription.is_stopped());

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(connector.attempt_count(), 2);
    assert_eq!(subscription.state(), ConnectionState::Stopped);
    subscription.join().await;
}

#[tokio::test(start_paused = true)]
async fn stop_closes_open_connection() {
    let connector = ScriptedConnector::new(vec![Step::Hold(Vec::new())]);
    let ctx = session(Some("h.p.s"));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let subscription = client(&ctx, StreamAuth::QueryToken, connector.clone()).subscribe(tx);

    assert_eq!(rx.recv().await, Some(RealtimeNotification::Opened));
    assert_eq!(subscription.state(), ConnectionState::Connected);

    subscription.stop();
    let mut states = subscription.watch_state();
    states
        .wait_for(|state| *state == ConnectionState::Stopped)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(connector.attempt_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn dispatches_typed_events() {
    let connector = ScriptedConnector::new(vec![Step::Hold(vec![
        reminder("X"),
        reminder("X"),
        SseFrame::new("reminder", "{not json"),
        SseFrame::new("test", r#"{"message":"ping"}"#),
        SseFrame::new("test", r#"{"message":"ping"}"#),
        SseFrame::new("heartbeat", "{}"),
        SseFrame::new("message", "hello"),
        SseFrame::new("reminder", r#"{"title":"no id"}"#),
        SseFrame::new(
            "schedule-reminder",
            r#"{"scheduleId":"Y","title":"Lunch","message":"Lunch in 10 minutes"}"#,
        ),
    ])]);
    let ctx = session(Some("h.p.s"));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let subscription = client(&ctx, StreamAuth::QueryToken, connector).subscribe(tx);

    tokio::time::sleep(Duration::from_millis(100)).await;
    let notifications = drain(&mut rx);
    subscription.stop();

    assert_eq!(notifications.len(), 6, "{notifications:#?}");
    assert_eq!(notifications[0], RealtimeNotification::Opened);
    assert_eq!(reminder_id(&notifications[1]), Some("X"));
    assert!(matches!(
        &notifications[2],
        RealtimeNotification::Error(RealtimeError::MalformedPayload { event, .. }) if event == "reminder"
    ));
    let ping = RealtimeNotification::Test(TestEvent {
        message: "ping".into(),
    });
    assert_eq!(notifications[3], ping);
    assert_eq!(notifications[4], ping);
    match &notifications[5] {
        RealtimeNotification::Reminder(event) => {
            assert_eq!(event.identifier(), Some("Y"));
            assert_eq!(event.display_text(), "Lunch in 10 minutes");
        }
        other => panic!("expected reminder, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn duplicates_across_reconnects_are_suppressed() {
    let connector = ScriptedConnector::new(vec![
        Step::Frames(vec![Ok(reminder("X"))]),
        Step::Frames(vec![Ok(reminder("X")), Ok(reminder("Z"))]),
    ]);
    let ctx = session(Some("h.p.s"));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let subscription = client(&ctx, StreamAuth::QueryToken, connector).subscribe(tx);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    subscription.stop();
    let ids: Vec<String> = drain(&mut rx)
        .iter()
        .filter_map(|n| reminder_id(n).map(str::to_string))
        .collect();
    assert_eq!(ids, vec!["X".to_string(), "Z".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn broken_stream_reports_error_and_reconnects() {
    let connector = ScriptedConnector::new(vec![Step::Frames(vec![
        Ok(SseFrame::new("test", r#"{"message":"before"}"#)),
        Err(RealtimeError::transport("connection reset")),
    ])]);
    let ctx = session(Some("h.p.s"));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let subscription = client(&ctx, StreamAuth::QueryToken, connector.clone()).subscribe(tx);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    subscription.stop();
    let notifications = drain(&mut rx);

    assert_eq!(notifications[0], RealtimeNotification::Opened);
    assert!(matches!(notifications[1], RealtimeNotification::Test(_)));
    assert_eq!(
        notifications[2],
        RealtimeNotification::Error(RealtimeError::transport("connection reset"))
    );
    // The reconnect one second later is refused by the exhausted script.
    assert_eq!(connector.attempt_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn malformed_token_defers_connection() {
    let connector = ScriptedConnector::default();
    let ctx = session(Some("user@example.com"));
    let subscription = client(&ctx, StreamAuth::QueryToken, connector.clone()).subscribe(());

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(connector.attempt_count(), 0);

    ctx.store()
        .set(CredentialPair::new("h.p.s", "r.r.r").unwrap());
    // Deferred waits so far: 1s, 2s, then 4s (due at t=7s).
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(connector.attempt_count(), 1);

    let request = &connector.requests()[0];
    assert_eq!(request.auth, StreamAuth::QueryToken);
    assert_eq!(request.url.path(), "/api/notifications/stream");
    assert_eq!(request.url.query(), Some("token=h.p.s"));
    subscription.stop();
}

#[tokio::test(start_paused = true)]
async fn session_cookie_mode_sends_no_token() {
    let connector = ScriptedConnector::new(vec![Step::Hold(Vec::new())]);
    let ctx = session(None);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let subscription = client(&ctx, StreamAuth::SessionCookie, connector.clone()).subscribe(tx);

    assert_eq!(rx.recv().await, Some(RealtimeNotification::Opened));
    let request = &connector.requests()[0];
    assert_eq!(request.auth, StreamAuth::SessionCookie);
    assert_eq!(request.url.path(), "/api/notifications/subscribe");
    assert_eq!(request.url.query(), None);
    subscription.stop();
}

#[tokio::test(start_paused = true)]
async fn session_end_stops_the_client() {
    let connector = ScriptedConnector::new(vec![Step::Hold(Vec::new())]);
    let ctx = session(Some("h.p.s"));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let subscription = client(&ctx, StreamAuth::QueryToken, connector.clone()).subscribe(tx);
    assert_eq!(rx.recv().await, Some(RealtimeNotification::Opened));

    ctx.logout();
    subscription.join().await;
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(connector.attempt_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn dropping_subscription_stops_the_client() {
    let connector = ScriptedConnector::default();
    let ctx = session(Some("h.p.s"));
    let subscription = client(&ctx, StreamAuth::QueryToken, connector.clone()).subscribe(());

    tokio::time::sleep(Duration::from_millis(500)).await;
    drop(subscription);
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(connector.attempt_count(), 1);
}
