//! Per-connection duty loops bridging the hub to a websocket.
//!
//! Each session runs an inbound loop (decode frames, hand envelopes to the
//! plugged-in handler) and an outbound loop (drain the bounded queue the hub
//! feeds, send liveness pings). Whichever loop stops first triggers the
//! shared teardown; the teardown runs once.

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::ws::Message;
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::hub::Hub;
use crate::constants::{
    COALESCE_SEPARATOR, DEFAULT_MAX_FRAME_BYTES, DEFAULT_PONG_WAIT_SECS, DEFAULT_SEND_BUFFER,
    DEFAULT_WRITE_WAIT_SECS, MAX_COALESCED_ENVELOPES, ping_period_secs,
};
use crate::models::{Envelope, Identity};

pub type SessionId = u64;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Capacity of the outbound queue. A full queue gets the session torn down.
    pub send_buffer: usize,
    pub max_frame_bytes: usize,
    /// Longest silence tolerated from the peer, pongs included.
    pub pong_wait: Duration,
    /// Must stay below the peer's read timeout.
    pub ping_period: Duration,
    pub write_wait: Duration,
}

impl SessionConfig {
    pub fn from_secs(
        send_buffer: usize,
        max_frame_bytes: usize,
        pong_wait_secs: u64,
        write_wait_secs: u64,
    ) -> Self {
        Self {
            send_buffer,
            max_frame_bytes,
            pong_wait: Duration::from_secs(pong_wait_secs),
            ping_period: Duration::from_secs(ping_period_secs(pong_wait_secs)),
            write_wait: Duration::from_secs(write_wait_secs),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from_secs(
            DEFAULT_SEND_BUFFER,
            DEFAULT_MAX_FRAME_BYTES,
            DEFAULT_PONG_WAIT_SECS,
            DEFAULT_WRITE_WAIT_SECS,
        )
    }
}

/// The hub's view of a live session: where to enqueue frames and how to
/// ask the session to shut down.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: SessionId,
    user_id: Uuid,
    outbound: mpsc::Sender<String>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl SessionHandle {
    pub fn new(id: SessionId, user_id: Uuid, capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (outbound, queue) = mpsc::channel(capacity.max(1));
        let (shutdown, _) = watch::channel(false);
        let handle = Self {
            id,
            user_id,
            outbound,
            shutdown: Arc::new(shutdown),
        };
        (handle, queue)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    /// Never waits: a full or closed queue is reported back to the hub.
    pub fn try_enqueue(&self, frame: String) -> Result<(), TrySendError<String>> {
        self.outbound.try_send(frame)
    }

    pub fn close(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.shutdown.borrow()
    }

    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }
}

/// Who is on the other end of a session.
#[derive(Debug, Clone, Copy)]
pub struct SessionContext {
    pub session_id: SessionId,
    pub identity: Identity,
}

/// Receives every well-formed inbound envelope of a session.
#[async_trait]
pub trait InboundHandler: Send + Sync {
    async fn handle(&self, session: &SessionContext, envelope: Envelope);
}

/// Deregisters and closes a session exactly once, whichever loop asks first.
pub(crate) struct Teardown {
    hub: Hub,
    handle: SessionHandle,
    done: AtomicBool,
}

impl Teardown {
    pub(crate) fn new(hub: Hub, handle: SessionHandle) -> Self {
        Self {
            hub,
            handle,
            done: AtomicBool::new(false),
        }
    }

    /// Returns false when the session was already torn down.
    pub(crate) fn run(&self, reason: &str) -> bool {
        if self.done.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.hub.deregister(self.handle.user_id(), self.handle.id());
        self.handle.close();
        info!(
            user_id = %self.handle.user_id(),
            session_id = self.handle.id(),
            reason,
            "session closed"
        );
        true
    }
}

/// Registers a session for `identity` and runs both duty loops until the
/// connection dies or the hub tears the session down.
pub async fn run_session<S>(
    socket: S,
    hub: Hub,
    identity: Identity,
    config: SessionConfig,
    handler: Arc<dyn InboundHandler>,
) where
    S: Stream<Item = Result<Message, axum::Error>> + Sink<Message, Error = axum::Error> + Send + 'static,
{
    let session_id = hub.next_session_id();
    let (handle, queue) = SessionHandle::new(session_id, identity.user_id, config.send_buffer);

    if let Some(previous) = hub.register(handle.clone()) {
        debug!(
            user_id = %identity.user_id,
            previous_session = previous.id(),
            "newer session displaced an existing registration"
        );
    }
    info!(user_id = %identity.user_id, role = %identity.role, session_id, "session opened");

    let teardown = Arc::new(Teardown::new(hub, handle.clone()));
    let (sink, stream) = socket.split();

    let writer = {
        let teardown = teardown.clone();
        let shutdown = handle.shutdown_signal();
        let config = config.clone();
        tokio::spawn(async move {
            let reason = outbound_loop(sink, queue, &config, shutdown).await;
            teardown.run(reason);
        })
    };

    let context = SessionContext { session_id, identity };
    let reason = inbound_loop(
        stream,
        &context,
        handler.as_ref(),
        &config,
        handle.shutdown_signal(),
    )
    .await;
    teardown.run(reason);

    if let Err(error) = writer.await {
        warn!(session_id, %error, "outbound loop panicked");
    }
}

async fn wait_closed(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

fn decode_envelope(raw: &[u8], session: &SessionContext) -> Option<Envelope> {
    match serde_json::from_slice::<Envelope>(raw) {
        Ok(envelope) => Some(envelope),
        Err(error) => {
            warn!(
                user_id = %session.identity.user_id,
                session_id = session.session_id,
                %error,
                "skipping malformed frame"
            );
            None
        }
    }
}

pub(crate) async fn inbound_loop<R, E>(
    mut stream: R,
    session: &SessionContext,
    handler: &dyn InboundHandler,
    config: &SessionConfig,
    mut shutdown: watch::Receiver<bool>,
) -> &'static str
where
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: fmt::Display,
{
    loop {
        let next = tokio::select! {
            _ = wait_closed(&mut shutdown) => return "shutdown requested",
            next = tokio::time::timeout(config.pong_wait, stream.next()) => next,
        };

        let message = match next {
            Err(_) => return "read timed out",
            Ok(None) => return "peer went away",
            Ok(Some(Err(error))) => {
                debug!(session_id = session.session_id, %error, "read failed");
                return "read failed";
            }
            Ok(Some(Ok(message))) => message,
        };

        let envelope = match &message {
            Message::Text(text) if text.as_str().len() > config.max_frame_bytes => {
                warn!(session_id = session.session_id, size = text.as_str().len(), "frame over limit");
                return "frame too large";
            }
            Message::Binary(bytes) if bytes.len() > config.max_frame_bytes => {
                warn!(session_id = session.session_id, size = bytes.len(), "frame over limit");
                return "frame too large";
            }
            Message::Text(text) => decode_envelope(text.as_str().as_bytes(), session),
            Message::Binary(bytes) => decode_envelope(bytes, session),
            Message::Close(_) => return "peer closed",
            Message::Ping(_) | Message::Pong(_) => None,
        };

        if let Some(envelope) = envelope {
            handler.handle(session, envelope).await;
        }
    }
}

/// Folds whatever is already queued behind `first` into one frame.
pub(crate) fn coalesce(first: String, queue: &mut mpsc::Receiver<String>) -> String {
    let mut frame = first;
    for _ in 1..MAX_COALESCED_ENVELOPES {
        match queue.try_recv() {
            Ok(next) => {
                frame.push(COALESCE_SEPARATOR);
                frame.push_str(&next);
            }
            Err(_) => break,
        }
    }
    frame
}

async fn write_frame<W>(sink: &mut W, message: Message, write_wait: Duration) -> Result<(), String>
where
    W: Sink<Message> + Unpin,
    W::Error: fmt::Display,
{
    match tokio::time::timeout(write_wait, sink.send(message)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(error)) => Err(error.to_string()),
        Err(_) => Err("write timed out".to_string()),
    }
}

pub(crate) async fn outbound_loop<W>(
    mut sink: W,
    mut queue: mpsc::Receiver<String>,
    config: &SessionConfig,
    mut shutdown: watch::Receiver<bool>,
) -> &'static str
where
    W: Sink<Message> + Unpin,
    W::Error: fmt::Display,
{
    let mut ping = tokio::time::interval_at(Instant::now() + config.ping_period, config.ping_period);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = wait_closed(&mut shutdown) => {
                let _ = write_frame(&mut sink, Message::Close(None), config.write_wait).await;
                return "shutdown requested";
            }
            next = queue.recv() => {
                let Some(first) = next else {
                    let _ = write_frame(&mut sink, Message::Close(None), config.write_wait).await;
                    return "queue closed";
                };
                let frame = coalesce(first, &mut queue);
                if let Err(error) = write_frame(&mut sink, Message::Text(frame.into()), config.write_wait).await {
                    debug!(%error, "outbound write failed");
                    return "write failed";
                }
            }
            _ = ping.tick() => {
                if let Err(error) = write_frame(&mut sink, Message::Ping(Bytes::new()), config.write_wait).await {
                    debug!(%error, "liveness ping failed");
                    return "ping failed";
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use std::convert::Infallible;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<Envelope>>,
    }

    #[async_trait]
    impl InboundHandler for Recorder {
        async fn handle(&self, _session: &SessionContext, envelope: Envelope) {
            self.seen.lock().unwrap().push(envelope);
        }
    }

    fn context() -> SessionContext {
        SessionContext {
            session_id: 1,
            identity: Identity::new(Uuid::new_v4(), Role::JobSeeker),
        }
    }

    fn quick_config() -> SessionConfig {
        SessionConfig {
            send_buffer: 8,
            max_frame_bytes: 64,
            pong_wait: Duration::from_millis(50),
            ping_period: Duration::from_secs(30),
            write_wait: Duration::from_secs(1),
        }
    }

    fn text(raw: &str) -> Result<Message, Infallible> {
        Ok(Message::Text(raw.to_string().into()))
    }

    #[tokio::test]
    async fn malformed_frames_are_skipped() {
        let (handle, _queue) = SessionHandle::new(1, Uuid::new_v4(), 4);
        let recorder = Recorder::default();
        let frames = futures::stream::iter(vec![
            text("not json"),
            text(r#"{"type":"typing","payload":{"match_id":"x"}}"#),
            text(r#"{"payload":{}}"#),
            Ok(Message::Close(None)),
        ]);

        let reason = inbound_loop(
            frames,
            &context(),
            &recorder,
            &quick_config(),
            handle.shutdown_signal(),
        )
        .await;

        assert_eq!(reason, "peer closed");
        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].kind, "typing");
    }

    #[tokio::test]
    async fn oversized_frame_ends_the_session() {
        let (handle, _queue) = SessionHandle::new(1, Uuid::new_v4(), 4);
        let recorder = Recorder::default();
        let big = format!(r#"{{"type":"typing","payload":"{}"}}"#, "x".repeat(200));
        let frames = futures::stream::iter(vec![text(&big), text(r#"{"type":"typing"}"#)]);

        let reason = inbound_loop(
            frames,
            &context(),
            &recorder,
            &quick_config(),
            handle.shutdown_signal(),
        )
        .await;

        assert_eq!(reason, "frame too large");
        assert!(recorder.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn idle_reader_times_out() {
        let (handle, _queue) = SessionHandle::new(1, Uuid::new_v4(), 4);
        let silent = futures::stream::pending::<Result<Message, Infallible>>();

        let reason = inbound_loop(
            silent,
            &context(),
            &Recorder::default(),
            &quick_config(),
            handle.shutdown_signal(),
        )
        .await;

        assert_eq!(reason, "read timed out");
    }

    #[tokio::test]
    async fn queued_frames_are_coalesced_into_one_write() {
        let (handle, queue) = SessionHandle::new(1, Uuid::new_v4(), 8);
        for frame in ["a", "b", "c"] {
            handle.try_enqueue(frame.to_string()).unwrap();
        }
        let (sink, mut written) = futures::channel::mpsc::unbounded::<Message>();
        let config = quick_config();
        let shutdown = handle.shutdown_signal();

        let writer = tokio::spawn(async move { outbound_loop(sink, queue, &config, shutdown).await });

        let first = written.next().await.unwrap();
        assert_eq!(first, Message::Text("a\nb\nc".to_string().into()));

        handle.close();
        assert_eq!(writer.await.unwrap(), "shutdown requested");
        assert_eq!(written.next().await.unwrap(), Message::Close(None));
    }

    #[tokio::test]
    async fn idle_writer_sends_pings() {
        let (handle, queue) = SessionHandle::new(1, Uuid::new_v4(), 8);
        let (sink, mut written) = futures::channel::mpsc::unbounded::<Message>();
        let config = SessionConfig {
            ping_period: Duration::from_millis(20),
            ..quick_config()
        };
        let shutdown = handle.shutdown_signal();

        let writer = tokio::spawn(async move { outbound_loop(sink, queue, &config, shutdown).await });

        let frame = tokio::time::timeout(Duration::from_secs(1), written.next())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(frame, Message::Ping(_)));

        handle.close();
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn failed_write_stops_the_writer() {
        let (handle, queue) = SessionHandle::new(1, Uuid::new_v4(), 8);
        let (sink, written) = futures::channel::mpsc::unbounded::<Message>();
        drop(written);
        handle.try_enqueue("lost".to_string()).unwrap();

        let reason = outbound_loop(sink, queue, &quick_config(), handle.shutdown_signal()).await;
        assert_eq!(reason, "write failed");
    }

    #[test]
    fn coalescing_respects_the_envelope_cap() {
        let (handle, mut queue) = SessionHandle::new(1, Uuid::new_v4(), MAX_COALESCED_ENVELOPES + 8);
        for i in 0..MAX_COALESCED_ENVELOPES + 4 {
            handle.try_enqueue(i.to_string()).unwrap();
        }
        let first = queue.try_recv().unwrap();
        let frame = coalesce(first, &mut queue);

        assert_eq!(frame.split(COALESCE_SEPARATOR).count(), MAX_COALESCED_ENVELOPES);
        assert_eq!(queue.try_recv().unwrap(), MAX_COALESCED_ENVELOPES.to_string());
    }

    #[test]
    fn teardown_runs_once() {
        let hub = Hub::new();
        let (handle, _queue) = SessionHandle::new(hub.next_session_id(), Uuid::new_v4(), 4);
        hub.register(handle.clone());

        let teardown = Teardown::new(hub.clone(), handle.clone());
        assert!(teardown.run("reader finished"));
        assert!(!teardown.run("writer finished"));
        assert!(!hub.is_online(handle.user_id()));
        assert!(handle.is_closed());
    }
}
