use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::comment::*;
use crate::models::shared::LikeResponse;
use crate::services::comment::CommentService;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/",
    tag = "Comments",
    operation_id = "createComment",
    summary = "Comment on a content item",
    description = "Creates a top-level comment, or a reply when `parentCommentId` is set. Replies must target a top-level comment on the same content item.",
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment created", body = CommentEnvelope),
        (status = 400, description = "Empty or too long text, or invalid reply target (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Content or parent comment not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(content_id = payload.content_id))]
pub async fn create_comment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let comment = CommentService::new(&state.db)
        .create(&auth_user, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(CommentEnvelope { comment })))
}

#[utoipa::path(
    get,
    path = "/content/{content_id}",
    tag = "Comments",
    operation_id = "listComments",
    summary = "List comments on a content item",
    description = "Top-level comments newest first, each with its replies oldest first.",
    params(("content_id" = i32, Path, description = "Content ID")),
    responses(
        (status = 200, description = "Threaded comments", body = CommentListResponse),
        (status = 401, description = "Invalid token (TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Content not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, auth_user), fields(content_id))]
pub async fn list_comments(
    auth_user: Option<AuthUser>,
    State(state): State<AppState>,
    Path(content_id): Path<i32>,
) -> Result<Json<CommentListResponse>, AppError> {
    tracing::Span::current().record("content_id", content_id);
    let comments = CommentService::new(&state.db)
        .list_by_content(auth_user.as_ref(), content_id)
        .await?;
    Ok(Json(CommentListResponse { comments }))
}

#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Comments",
    operation_id = "updateComment",
    summary = "Edit a comment",
    description = "Replaces the comment text and marks it edited. Author only.",
    params(("id" = i32, Path, description = "Comment ID")),
    request_body = UpdateCommentRequest,
    responses(
        (status = 200, description = "Comment updated", body = CommentEnvelope),
        (status = 400, description = "Empty or too long text (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the author (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Comment not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_comment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateCommentRequest>,
) -> Result<Json<CommentEnvelope>, AppError> {
    tracing::Span::current().record("id", id);
    let comment = CommentService::new(&state.db)
        .update(&auth_user, id, payload)
        .await?;
    Ok(Json(CommentEnvelope { comment }))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Comments",
    operation_id = "deleteComment",
    summary = "Delete a comment and its replies",
    params(("id" = i32, Path, description = "Comment ID")),
    responses(
        (status = 200, description = "Comment deleted", body = DeleteCommentResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Neither author nor admin (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Comment not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_comment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<DeleteCommentResponse>, AppError> {
    tracing::Span::current().record("id", id);
    let deleted_replies = CommentService::new(&state.db)
        .delete(&auth_user, id)
        .await?;
    Ok(Json(DeleteCommentResponse {
        message: "Comment deleted successfully".into(),
        deleted_replies,
    }))
}

#[utoipa::path(
    post,
    path = "/{id}/like",
    tag = "Comments",
    operation_id = "toggleCommentLike",
    summary = "Like or unlike a comment",
    params(("id" = i32, Path, description = "Comment ID")),
    responses(
        (status = 200, description = "New like state", body = LikeResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Comment not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn toggle_comment_like(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<LikeResponse>, AppError> {
    tracing::Span::current().record("id", id);
    let like = CommentService::new(&state.db)
        .toggle_like(&auth_user, id)
        .await?;
    Ok(Json(like))
}
