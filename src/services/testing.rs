//! Scripted API doubles shared by the service tests.

use std::{
    collections::VecDeque,
    io,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use futures::future::BoxFuture;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::{
    api::{ApiError, ApiResult, InteractionApi, SessionApi},
    dao::{local_store::MemoryStore, preferences::Preferences},
    dto::{
        artifact::{ArtifactsResponse, PuzzleSubmitRequest, PuzzleSubmitResponse},
        chat::{ChatMessage, ChatResponse, SignalRequest},
        decision::{DecisionResults, DecisionsResponse},
        participant::{JoinRequest, JoinResponse, MeResponse, Participant, ReadyResponse},
        session::{PlaySession, PublicSessionResponse, SessionStatus},
    },
    services::context::SessionContext,
    state::SessionState,
};

pub const CODE: &str = "ABCD";
pub const TOKEN: &str = "token-0123456789";

/// Scripted reply of one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Ok,
    Status(u16),
    Network,
}

impl Reply {
    fn into_result<T>(self, path: &str, value: T, retry_after: Option<Duration>) -> ApiResult<T> {
        match self {
            Reply::Ok => Ok(value),
            Reply::Status(status) => Err(ApiError::Status {
                path: path.into(),
                status,
                code: None,
                message: format!("HTTP {status}"),
                retry_after,
            }),
            Reply::Network => Err(ApiError::network(
                path,
                io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
            )),
        }
    }
}

pub fn session_id() -> Uuid {
    Uuid::from_u128(0x5e55)
}

pub fn participant() -> Participant {
    Participant {
        id: Uuid::from_u128(0xbeef),
        display_name: "Ada".into(),
        role: Some("scout".into()),
        is_ready: false,
        position: None,
        is_next_starter: false,
    }
}

/// `SessionApi` double replaying queued replies, then `Ok` forever.
pub struct FakeSessionApi {
    pub status: Mutex<SessionStatus>,
    pub retry_after: Mutex<Option<Duration>>,
    session_replies: Mutex<VecDeque<Reply>>,
    me_replies: Mutex<VecDeque<Reply>>,
    rejoin_replies: Mutex<VecDeque<Reply>>,
    stall: Mutex<Option<Arc<Notify>>>,
    pub session_calls: AtomicUsize,
    pub me_calls: AtomicUsize,
    pub rejoin_calls: AtomicUsize,
    pub heartbeat_calls: AtomicUsize,
    pub join_calls: AtomicUsize,
}

impl Default for FakeSessionApi {
    fn default() -> Self {
        Self {
            status: Mutex::new(SessionStatus::Active),
            retry_after: Mutex::new(None),
            session_replies: Mutex::default(),
            me_replies: Mutex::default(),
            rejoin_replies: Mutex::default(),
            stall: Mutex::new(None),
            session_calls: AtomicUsize::new(0),
            me_calls: AtomicUsize::new(0),
            rejoin_calls: AtomicUsize::new(0),
            heartbeat_calls: AtomicUsize::new(0),
            join_calls: AtomicUsize::new(0),
        }
    }
}

impl FakeSessionApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn queue_session(&self, replies: &[Reply]) {
        self.session_replies.lock().unwrap().extend(replies);
    }

    pub fn queue_me(&self, replies: &[Reply]) {
        self.me_replies.lock().unwrap().extend(replies);
    }

    pub fn queue_rejoin(&self, replies: &[Reply]) {
        self.rejoin_replies.lock().unwrap().extend(replies);
    }

    /// Make every session fetch wait until the returned notify fires.
    pub fn stall_sessions(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.stall.lock().unwrap() = Some(notify.clone());
        notify
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn next(queue: &Mutex<VecDeque<Reply>>) -> Reply {
        queue.lock().unwrap().pop_front().unwrap_or(Reply::Ok)
    }

    fn session_payload(&self) -> PublicSessionResponse {
        PublicSessionResponse {
            session: PlaySession {
                id: session_id(),
                status: *self.status.lock().unwrap(),
                display_name: "Night walk".into(),
                session_code: CODE.into(),
                participant_count: 1,
                game_id: None,
            },
            participants: Vec::new(),
        }
    }
}

impl SessionApi for FakeSessionApi {
    fn fetch_session(&self, _code: &str) -> BoxFuture<'static, ApiResult<PublicSessionResponse>> {
        self.session_calls.fetch_add(1, Ordering::SeqCst);
        let reply = Self::next(&self.session_replies);
        let payload = self.session_payload();
        let retry_after = *self.retry_after.lock().unwrap();
        let stall = self.stall.lock().unwrap().clone();
        Box::pin(async move {
            if let Some(stall) = stall {
                stall.notified().await;
            }
            reply.into_result("/session", payload, retry_after)
        })
    }

    fn fetch_me(&self, _code: &str, _token: &str) -> BoxFuture<'static, ApiResult<MeResponse>> {
        self.me_calls.fetch_add(1, Ordering::SeqCst);
        let reply = Self::next(&self.me_replies);
        let retry_after = *self.retry_after.lock().unwrap();
        Box::pin(async move {
            reply.into_result(
                "/me",
                MeResponse {
                    participant: participant(),
                },
                retry_after,
            )
        })
    }

    fn rejoin(&self, _code: &str, _token: &str) -> BoxFuture<'static, ApiResult<()>> {
        self.rejoin_calls.fetch_add(1, Ordering::SeqCst);
        let reply = Self::next(&self.rejoin_replies);
        Box::pin(async move { reply.into_result("/rejoin", (), None) })
    }

    fn join(&self, request: JoinRequest) -> BoxFuture<'static, ApiResult<JoinResponse>> {
        self.join_calls.fetch_add(1, Ordering::SeqCst);
        let mut participant = participant();
        participant.display_name = request.display_name;
        Box::pin(async move {
            Ok(JoinResponse {
                participant_token: TOKEN.into(),
                participant,
            })
        })
    }

    fn heartbeat(&self, _code: &str, _token: &str) -> BoxFuture<'static, ApiResult<()>> {
        self.heartbeat_calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(()) })
    }

    fn set_ready(
        &self,
        _code: &str,
        _token: &str,
        is_ready: bool,
    ) -> BoxFuture<'static, ApiResult<ReadyResponse>> {
        Box::pin(async move { Ok(ReadyResponse { is_ready }) })
    }
}

/// `InteractionApi` double counting writes; votes can be held on a notify.
#[derive(Default)]
pub struct FakeInteractionApi {
    pub votes: AtomicUsize,
    pub signals: AtomicUsize,
    pub chats: AtomicUsize,
    pub vote_gate: Option<Arc<Notify>>,
}

impl InteractionApi for FakeInteractionApi {
    fn list_artifacts(&self, _: Uuid, _: &str) -> BoxFuture<'static, ApiResult<ArtifactsResponse>> {
        Box::pin(async { Ok(ArtifactsResponse { artifacts: Vec::new() }) })
    }

    fn submit_puzzle(
        &self,
        _: Uuid,
        _: Uuid,
        _: &str,
        _: PuzzleSubmitRequest,
    ) -> BoxFuture<'static, ApiResult<PuzzleSubmitResponse>> {
        Box::pin(async { Err(ApiError::status("/puzzle", 404)) })
    }

    fn list_decisions(&self, _: Uuid, _: &str) -> BoxFuture<'static, ApiResult<DecisionsResponse>> {
        Box::pin(async { Ok(DecisionsResponse { decisions: Vec::new() }) })
    }

    fn cast_vote(&self, _: Uuid, _: Uuid, _: &str, _: Uuid) -> BoxFuture<'static, ApiResult<()>> {
        self.votes.fetch_add(1, Ordering::SeqCst);
        let gate = self.vote_gate.clone();
        Box::pin(async move {
            if let Some(gate) = gate {
                gate.notified().await;
            }
            Ok(())
        })
    }

    fn decision_results(
        &self,
        _: Uuid,
        decision_id: Uuid,
        _: &str,
    ) -> BoxFuture<'static, ApiResult<DecisionResults>> {
        Box::pin(async move {
            Ok(DecisionResults {
                decision_id,
                results: Vec::new(),
                total_votes: 0,
            })
        })
    }

    fn list_chat(&self, _: Uuid, _: &str) -> BoxFuture<'static, ApiResult<ChatResponse>> {
        Box::pin(async { Ok(ChatResponse { messages: Vec::new() }) })
    }

    fn send_chat(&self, _: Uuid, _: &str, body: String) -> BoxFuture<'static, ApiResult<ChatMessage>> {
        self.chats.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            Ok(ChatMessage {
                id: Uuid::new_v4(),
                sender_name: "Ada".into(),
                body,
                created_at: "2026-01-01T10:00:00Z".into(),
            })
        })
    }

    fn send_signal(&self, _: Uuid, _: &str, _: SignalRequest) -> BoxFuture<'static, ApiResult<()>> {
        self.signals.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(()) })
    }
}

/// Context over a fresh in-memory store, optionally holding [`TOKEN`].
pub fn context(api: Arc<FakeSessionApi>, with_token: bool) -> SessionContext {
    let preferences = Preferences::new(Arc::new(MemoryStore::new()));
    if with_token {
        preferences.store_participant_token(CODE, TOKEN).unwrap();
    }
    SessionContext {
        code: CODE.into(),
        state: SessionState::new(CODE),
        api,
        preferences,
    }
}
