//! JSON request/response surface over `ChatService`

use std::sync::Arc;

use axum::extract::{FromRequestParts, Query, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use campus_chat::{ChatError, ChatService};
use campus_store::{Conversation, Message};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use crate::ws;

/// Header carrying the authenticated user id, set by the upstream auth layer
pub const USER_HEADER: &str = "x-user-id";

pub type AppState = Arc<ChatService>;

pub fn router(service: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(ws::upgrade))
        .route("/api/chat/user-conversations", get(conversations))
        .route("/api/chat/history", get(history))
        .route("/api/chat/mark-read", post(mark_read))
        .route("/api/chat/delete-conversation", delete(delete_conversation))
        .route("/api/chat/unread-count", get(unread_count))
        .route("/api/chat/send", post(send))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(service)
}

/// The caller's identity, taken from `x-user-id`
pub struct AuthUser(pub String);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| AuthUser(value.to_string()))
            .ok_or(ApiError::Unauthenticated)
    }
}

#[derive(Debug)]
pub enum ApiError {
    Unauthenticated,
    Chat(ChatError),
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        ApiError::Chat(err)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    code: &'static str,
    error: String,
}

fn status_for(err: &ChatError) -> StatusCode {
    match err {
        ChatError::Validation(_) => StatusCode::BAD_REQUEST,
        ChatError::Forbidden(_) => StatusCode::FORBIDDEN,
        ChatError::RoomLimit(_) => StatusCode::TOO_MANY_REQUESTS,
        ChatError::PersistenceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse {
                    code: "unauthenticated",
                    error: format!("Missing {} header", USER_HEADER),
                },
            ),
            ApiError::Chat(err) => {
                let status = status_for(&err);
                if status.is_server_error() {
                    warn!("Request failed: {}", err);
                }
                (
                    status,
                    ErrorResponse {
                        code: err.code(),
                        error: err.to_string(),
                    },
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    rooms: usize,
    sessions: usize,
}

async fn health(State(service): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        rooms: service.registry().room_count(),
        sessions: service.registry().session_count(),
    })
}

async fn conversations(
    State(service): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<Conversation>>, ApiError> {
    Ok(Json(service.conversations(&user_id).await?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryParams {
    listing_id: String,
    other_id: String,
    /// Read without marking anything as read
    #[serde(default)]
    peek: bool,
}

async fn history(
    State(service): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let messages = if params.peek {
        service
            .history(&params.listing_id, &user_id, &params.other_id)
            .await?
    } else {
        service
            .open_conversation(&params.listing_id, &user_id, &params.other_id)
            .await?
    };
    Ok(Json(messages))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MarkReadRequest {
    listing_id: String,
    #[serde(alias = "otherUserId")]
    other_id: String,
}

#[derive(Serialize)]
struct MarkReadResponse {
    updated: u64,
}

async fn mark_read(
    State(service): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<MarkReadRequest>,
) -> Result<Json<MarkReadResponse>, ApiError> {
    let updated = service
        .mark_read(&req.listing_id, &user_id, &req.other_id)
        .await?;
    Ok(Json(MarkReadResponse { updated }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteConversationRequest {
    listing_id: String,
    #[serde(alias = "otherId")]
    other_user_id: String,
}

#[derive(Serialize)]
struct DeleteConversationResponse {
    success: bool,
    hidden: u64,
}

async fn delete_conversation(
    State(service): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<DeleteConversationRequest>,
) -> Result<Json<DeleteConversationResponse>, ApiError> {
    let hidden = service
        .delete_conversation(&req.listing_id, &user_id, &req.other_user_id)
        .await?;
    Ok(Json(DeleteConversationResponse {
        success: true,
        hidden,
    }))
}

#[derive(Serialize)]
struct UnreadCountResponse {
    count: u64,
}

async fn unread_count(
    State(service): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UnreadCountResponse>, ApiError> {
    let count = service.unread_count(&user_id).await?;
    Ok(Json(UnreadCountResponse { count }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendRequest {
    listing_id: String,
    receiver: String,
    #[serde(alias = "body")]
    message: String,
    /// Accepted only when it matches the caller
    sender: Option<String>,
}

#[derive(Serialize)]
struct SendResponse {
    success: bool,
    message: Message,
    delivered: usize,
}

async fn send(
    State(service): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<SendRequest>,
) -> Result<(StatusCode, Json<SendResponse>), ApiError> {
    if let Some(sender) = req.sender.filter(|s| *s != user_id) {
        return Err(ChatError::Forbidden(format!("cannot send as {}", sender)).into());
    }

    let report = service
        .send(&req.listing_id, &user_id, &req.receiver, &req.message)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SendResponse {
            success: true,
            message: report.message,
            delivered: report.delivered,
        }),
    ))
}
