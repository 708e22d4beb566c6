use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::{AppJson, AppQuery};
use crate::models::content::*;
use crate::models::shared::{LikeResponse, MessageResponse};
use crate::services::content::ContentService;
use crate::state::AppState;

/// Client-chosen identifier used to debounce repeated view counts.
pub const VIEW_SESSION_HEADER: &str = "x-view-session";
const MAX_VIEW_SESSION_LEN: usize = 128;

fn view_session(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(VIEW_SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty() && s.len() <= MAX_VIEW_SESSION_LEN)
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Content",
    operation_id = "listContent",
    summary = "List published content",
    description = "Returns a page of content ordered by publish date, newest first. Filters: `category` (`all` disables it), `featured`, `author`, and `search` (full-text over title, description, body and tags). Only published content is listed unless the caller is an admin, or is listing their own content, and passes `status`.",
    params(ContentListQuery),
    responses(
        (status = 200, description = "Page of content", body = ContentListResponse),
        (status = 400, description = "Invalid filter (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Invalid token (TOKEN_INVALID)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_content(
    auth_user: Option<AuthUser>,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ContentListQuery>,
) -> Result<Json<ContentListResponse>, AppError> {
    let service = ContentService::new(&state.db, &state.config.content);
    let filters = service.filters(auth_user.as_ref(), query)?;
    Ok(Json(service.list(auth_user.as_ref(), filters).await?))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Content",
    operation_id = "createContent",
    summary = "Publish a new content item",
    description = "Creates a content item owned by the caller. Tags may be a JSON array or a comma-separated string. `status` defaults to `published`.",
    request_body = CreateContentRequest,
    responses(
        (status = 201, description = "Content created", body = ContentEnvelope),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn create_content(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateContentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let content = ContentService::new(&state.db, &state.config.content)
        .create(&auth_user, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(ContentEnvelope { content })))
}

#[utoipa::path(
    get,
    path = "/stats",
    tag = "Content",
    operation_id = "contentStats",
    summary = "Aggregate content statistics",
    description = "Total content, total views, total likes and a per-category breakdown with percentage shares. Admin only.",
    responses(
        (status = 200, description = "Statistics", body = StatsResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not an admin (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn content_stats(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<StatsResponse>, AppError> {
    let stats = ContentService::new(&state.db, &state.config.content)
        .stats(&auth_user)
        .await?;
    Ok(Json(StatsResponse { stats }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Content",
    operation_id = "getContent",
    summary = "Get a content item",
    description = "Returns one content item. With `incrementView=true` a view is counted first and the response carries the updated counter. Requests sharing an `X-View-Session` header value are counted at most once per debounce window. Unpublished items return 404 unless the caller is the author or an admin.",
    params(
        ("id" = i32, Path, description = "Content ID"),
        ("X-View-Session" = Option<String>, Header, description = "Opaque per-client view session"),
        ContentDetailQuery,
    ),
    responses(
        (status = 200, description = "Content item", body = ContentEnvelope),
        (status = 401, description = "Invalid token (TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Content not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, auth_user, headers, query), fields(id))]
pub async fn get_content(
    auth_user: Option<AuthUser>,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppQuery(query): AppQuery<ContentDetailQuery>,
    headers: HeaderMap,
) -> Result<Json<ContentEnvelope>, AppError> {
    tracing::Span::current().record("id", id);
    let content = ContentService::new(&state.db, &state.config.content)
        .get_by_id(
            auth_user.as_ref(),
            id,
            query.increment_view.unwrap_or(false),
            view_session(&headers),
        )
        .await?;
    Ok(Json(ContentEnvelope { content }))
}

#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Content",
    operation_id = "updateContent",
    summary = "Update a content item",
    description = "Partial update by the author or an admin. `featured` is applied for admins only and silently ignored otherwise. Moving an item into `published` refreshes its publish date.",
    params(("id" = i32, Path, description = "Content ID")),
    request_body = UpdateContentRequest,
    responses(
        (status = 200, description = "Content updated", body = ContentEnvelope),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the author (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Content not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_content(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateContentRequest>,
) -> Result<Json<ContentEnvelope>, AppError> {
    tracing::Span::current().record("id", id);
    let content = ContentService::new(&state.db, &state.config.content)
        .update(&auth_user, id, payload)
        .await?;
    Ok(Json(ContentEnvelope { content }))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Content",
    operation_id = "deleteContent",
    summary = "Delete a content item",
    description = "Deletes the item with its likes, comments and comment likes. Author or admin only.",
    params(("id" = i32, Path, description = "Content ID")),
    responses(
        (status = 200, description = "Content deleted", body = MessageResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the author (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Content not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_content(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<MessageResponse>, AppError> {
    tracing::Span::current().record("id", id);
    ContentService::new(&state.db, &state.config.content)
        .delete(&auth_user, id)
        .await?;
    Ok(Json(MessageResponse::new("Content deleted successfully")))
}

#[utoipa::path(
    post,
    path = "/{id}/like",
    tag = "Content",
    operation_id = "toggleContentLike",
    summary = "Like or unlike a content item",
    params(("id" = i32, Path, description = "Content ID")),
    responses(
        (status = 200, description = "New like state", body = LikeResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Content not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn toggle_content_like(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<LikeResponse>, AppError> {
    tracing::Span::current().record("id", id);
    let like = ContentService::new(&state.db, &state.config.content)
        .toggle_like(&auth_user, id)
        .await?;
    Ok(Json(like))
}
