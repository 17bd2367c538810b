use std::{sync::Arc, time::Duration};

use async_stream::stream;
use futures::{StreamExt, future::BoxFuture};
use reqwest::{
    Client, Method, RequestBuilder, Response, StatusCode,
    header::{ACCEPT, RETRY_AFTER},
};
use serde::de::DeserializeOwned;
use time::{OffsetDateTime, format_description::well_known::Rfc2822};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::dto::{
    artifact::{ArtifactsResponse, PuzzleSubmitRequest, PuzzleSubmitResponse},
    chat::{ChatMessage, ChatResponse, SendChatRequest, SignalRequest},
    decision::{DecisionResults, DecisionsResponse, VoteRequest},
    error::ErrorEnvelope,
    participant::{
        JoinRequest, JoinResponse, MeResponse, ReadyRequest, ReadyResponse, RejoinRequest,
    },
    run::{ProgressPayload, StartRunResponse},
    session::{HostCommand, PublicSessionResponse, SessionCommandRequest, SessionCommandResponse},
};

use super::{
    HostApi, InteractionApi, PlayEventStream, RunApi, SessionApi, SignalFeed,
    config::ApiConfig,
    error::{ApiError, ApiResult},
    sse::{SseDecoder, decode_play_event},
};

/// Header carrying the participant token on participant endpoints.
pub const PARTICIPANT_TOKEN_HEADER: &str = "x-participant-token";

/// `reqwest` implementation of every play API seam.
#[derive(Clone)]
pub struct HttpPlayApi {
    client: Client,
    base_url: Arc<str>,
    timeout: Option<Duration>,
    host_token: Option<Arc<str>>,
}

impl HttpPlayApi {
    /// Build a client for the configured API.
    pub fn new(config: ApiConfig) -> ApiResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| ApiError::ClientBuilder {
                source: Box::new(source),
            })?;

        Ok(Self {
            client,
            base_url: Arc::from(config.base_url.trim_end_matches('/')),
            timeout: config.request_timeout,
            host_token: config.host_token.map(Arc::from),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match self.timeout {
            Some(timeout) => builder.timeout(timeout),
            None => builder,
        }
    }

    fn participant(&self, method: Method, path: &str, token: &str) -> RequestBuilder {
        self.request(method, path)
            .header(PARTICIPANT_TOKEN_HEADER, token)
    }

    fn host(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.request(method, path);
        match self.host_token {
            Some(ref token) => builder.bearer_auth(token.as_ref()),
            None => builder,
        }
    }

    async fn send(builder: RequestBuilder, path: &str) -> ApiResult<Response> {
        let response = builder
            .send()
            .await
            .map_err(|source| transport_error(path, source))?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(status_error(path, response).await)
        }
    }

    async fn json<T>(builder: RequestBuilder, path: String) -> ApiResult<T>
    where
        T: DeserializeOwned,
    {
        let response = Self::send(builder, &path).await?;
        let status = response.status().as_u16();
        response
            .json::<T>()
            .await
            .map_err(|source| body_error(&path, status, source))
    }

    async fn empty(builder: RequestBuilder, path: String) -> ApiResult<()> {
        Self::send(builder, &path).await.map(|_| ())
    }
}

fn transport_error(path: &str, source: reqwest::Error) -> ApiError {
    if source.is_timeout() {
        ApiError::Timeout {
            path: path.to_string(),
        }
    } else {
        ApiError::network(path, source)
    }
}

fn body_error(path: &str, status: u16, source: reqwest::Error) -> ApiError {
    if source.is_decode() {
        ApiError::Decode {
            path: path.to_string(),
            status,
            source: Box::new(source),
        }
    } else {
        transport_error(path, source)
    }
}

async fn status_error(path: &str, response: Response) -> ApiError {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| parse_retry_after(value, OffsetDateTime::now_utc()));

    let envelope = match response.bytes().await {
        Ok(body) => serde_json::from_slice::<ErrorEnvelope>(&body).ok(),
        Err(err) => {
            debug!(path, error = %err, "failed to read error body");
            None
        }
    };

    let (code, message) = match envelope {
        Some(envelope) => envelope.error.into_parts(),
        None => (None, default_message(status)),
    };

    ApiError::Status {
        path: path.to_string(),
        status: status.as_u16(),
        code,
        message,
        retry_after,
    }
}

fn default_message(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}

/// Parse a `Retry-After` header given as delta-seconds or an HTTP date.
///
/// Dates in the past yield a zero delay.
pub fn parse_retry_after(value: &str, now: OffsetDateTime) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    let normalized = match value.strip_suffix(" GMT") {
        Some(prefix) => format!("{prefix} +0000"),
        None => value.to_string(),
    };
    let at = OffsetDateTime::parse(&normalized, &Rfc2822).ok()?;
    let delta = at - now;
    Some(if delta.is_negative() {
        Duration::ZERO
    } else {
        delta.unsigned_abs()
    })
}

impl SessionApi for HttpPlayApi {
    fn fetch_session(&self, code: &str) -> BoxFuture<'static, ApiResult<PublicSessionResponse>> {
        let path = format!("/api/play/sessions/{code}");
        let builder = self.request(Method::GET, &path);
        Box::pin(Self::json(builder, path))
    }

    fn fetch_me(&self, code: &str, token: &str) -> BoxFuture<'static, ApiResult<MeResponse>> {
        let path = format!("/api/play/sessions/{code}/me");
        let builder = self.participant(Method::GET, &path, token);
        Box::pin(Self::json(builder, path))
    }

    fn rejoin(&self, code: &str, token: &str) -> BoxFuture<'static, ApiResult<()>> {
        let path = format!("/api/play/sessions/{code}/me");
        let builder = self
            .participant(Method::POST, &path, token)
            .json(&RejoinRequest {
                participant_token: token.to_string(),
            });
        Box::pin(Self::empty(builder, path))
    }

    fn join(&self, request: JoinRequest) -> BoxFuture<'static, ApiResult<JoinResponse>> {
        let path = "/api/play/sessions/join".to_string();
        let builder = self.request(Method::POST, &path).json(&request);
        Box::pin(Self::json(builder, path))
    }

    fn heartbeat(&self, code: &str, token: &str) -> BoxFuture<'static, ApiResult<()>> {
        let path = format!("/api/play/sessions/{code}/heartbeat");
        let builder = self.participant(Method::POST, &path, token);
        Box::pin(Self::empty(builder, path))
    }

    fn set_ready(
        &self,
        code: &str,
        token: &str,
        is_ready: bool,
    ) -> BoxFuture<'static, ApiResult<ReadyResponse>> {
        let path = format!("/api/play/sessions/{code}/ready");
        let builder = self
            .participant(Method::POST, &path, token)
            .json(&ReadyRequest { is_ready });
        Box::pin(Self::json(builder, path))
    }
}

impl RunApi for HttpPlayApi {
    fn start_run(&self, plan_id: &str) -> BoxFuture<'static, ApiResult<StartRunResponse>> {
        let path = format!("/api/play/{plan_id}/start");
        let builder = self.host(Method::POST, &path);
        Box::pin(Self::json(builder, path))
    }

    fn update_progress(
        &self,
        run_id: Uuid,
        payload: ProgressPayload,
    ) -> BoxFuture<'static, ApiResult<()>> {
        let path = format!("/api/play/runs/{run_id}/progress");
        let builder = self.host(Method::POST, &path).json(&payload);
        Box::pin(Self::empty(builder, path))
    }

    fn complete_run(&self, run_id: Uuid) -> BoxFuture<'static, ApiResult<()>> {
        let path = format!("/api/play/runs/{run_id}/complete");
        let builder = self.host(Method::POST, &path);
        Box::pin(Self::empty(builder, path))
    }

    fn abandon_run(&self, run_id: Uuid) -> BoxFuture<'static, ApiResult<()>> {
        let path = format!("/api/play/runs/{run_id}/abandon");
        let builder = self.host(Method::POST, &path);
        Box::pin(Self::empty(builder, path))
    }
}

impl InteractionApi for HttpPlayApi {
    fn list_artifacts(
        &self,
        session_id: Uuid,
        token: &str,
    ) -> BoxFuture<'static, ApiResult<ArtifactsResponse>> {
        let path = format!("/api/play/sessions/{session_id}/artifacts");
        let builder = self.participant(Method::GET, &path, token);
        Box::pin(Self::json(builder, path))
    }

    fn submit_puzzle(
        &self,
        session_id: Uuid,
        artifact_id: Uuid,
        token: &str,
        request: PuzzleSubmitRequest,
    ) -> BoxFuture<'static, ApiResult<PuzzleSubmitResponse>> {
        let path = format!("/api/play/sessions/{session_id}/artifacts/{artifact_id}/puzzle");
        let builder = self.participant(Method::POST, &path, token).json(&request);
        Box::pin(Self::json(builder, path))
    }

    fn list_decisions(
        &self,
        session_id: Uuid,
        token: &str,
    ) -> BoxFuture<'static, ApiResult<DecisionsResponse>> {
        let path = format!("/api/play/sessions/{session_id}/decisions");
        let builder = self.participant(Method::GET, &path, token);
        Box::pin(Self::json(builder, path))
    }

    fn cast_vote(
        &self,
        session_id: Uuid,
        decision_id: Uuid,
        token: &str,
        option_id: Uuid,
    ) -> BoxFuture<'static, ApiResult<()>> {
        let path = format!("/api/play/sessions/{session_id}/decisions/{decision_id}/vote");
        let builder = self
            .participant(Method::POST, &path, token)
            .json(&VoteRequest { option_id });
        Box::pin(Self::empty(builder, path))
    }

    fn decision_results(
        &self,
        session_id: Uuid,
        decision_id: Uuid,
        token: &str,
    ) -> BoxFuture<'static, ApiResult<DecisionResults>> {
        let path = format!("/api/play/sessions/{session_id}/decisions/{decision_id}/results");
        let builder = self.participant(Method::GET, &path, token);
        Box::pin(Self::json(builder, path))
    }

    fn list_chat(&self, session_id: Uuid, token: &str) -> BoxFuture<'static, ApiResult<ChatResponse>> {
        let path = format!("/api/play/sessions/{session_id}/chat");
        let builder = self.participant(Method::GET, &path, token);
        Box::pin(Self::json(builder, path))
    }

    fn send_chat(
        &self,
        session_id: Uuid,
        token: &str,
        body: String,
    ) -> BoxFuture<'static, ApiResult<ChatMessage>> {
        let path = format!("/api/play/sessions/{session_id}/chat");
        let builder = self
            .participant(Method::POST, &path, token)
            .json(&SendChatRequest { body });
        Box::pin(Self::json(builder, path))
    }

    fn send_signal(
        &self,
        session_id: Uuid,
        token: &str,
        request: SignalRequest,
    ) -> BoxFuture<'static, ApiResult<()>> {
        let path = format!("/api/play/sessions/{session_id}/signals");
        let builder = self.participant(Method::POST, &path, token).json(&request);
        Box::pin(Self::empty(builder, path))
    }
}

impl HostApi for HttpPlayApi {
    fn send_command(
        &self,
        session_id: Uuid,
        command: HostCommand,
    ) -> BoxFuture<'static, ApiResult<SessionCommandResponse>> {
        let path = format!("/api/play/sessions/{session_id}/status");
        let builder = self
            .host(Method::POST, &path)
            .json(&SessionCommandRequest { action: command });
        Box::pin(Self::json(builder, path))
    }
}

impl SignalFeed for HttpPlayApi {
    fn subscribe(&self, code: &str) -> BoxFuture<'static, ApiResult<PlayEventStream>> {
        let path = format!("/api/play/sessions/{code}/events");
        // The stream stays open indefinitely, so no request timeout here.
        let builder = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .header(ACCEPT, "text/event-stream");

        Box::pin(async move {
            let response = Self::send(builder, &path).await?;
            let mut chunks = response.bytes_stream();

            let events = stream! {
                let mut decoder = SseDecoder::new();
                while let Some(chunk) = chunks.next().await {
                    let chunk = match chunk {
                        Ok(chunk) => chunk,
                        Err(source) => {
                            yield Err(transport_error(&path, source));
                            break;
                        }
                    };
                    for frame in decoder.push(&chunk) {
                        match decode_play_event(&frame) {
                            Ok(Some(event)) => yield Ok(event),
                            Ok(None) => {}
                            Err(err) => warn!(path = %path, error = %err, "dropping malformed play event"),
                        }
                    }
                }
            };

            Ok(events.boxed())
        })
    }
}
