use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::shared::UserSummary;
use crate::entity::comment;
use crate::error::AppError;

pub const MAX_COMMENT_CHARS: usize = 1000;

#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    #[schema(example = 12)]
    pub content_id: i32,
    #[schema(example = "Great write-up!")]
    pub text: String,
    /// Top-level comment being replied to; omit or null for a top-level comment.
    pub parent_comment_id: Option<i32>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateCommentRequest {
    pub text: String,
}

#[derive(Clone, Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: i32,
    pub content_id: i32,
    pub author: Option<UserSummary>,
    pub text: String,
    pub parent_comment_id: Option<i32>,
    pub likes_count: i32,
    pub is_edited: bool,
    /// Present when the caller is authenticated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liked: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CommentResponse {
    pub fn from_model(m: comment::Model, author: Option<UserSummary>, liked: Option<bool>) -> Self {
        Self {
            id: m.id,
            content_id: m.content_id,
            author,
            text: m.text,
            parent_comment_id: m.parent_comment_id,
            likes_count: m.likes_count,
            is_edited: m.is_edited,
            liked,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// A top-level comment with its replies, oldest reply first.
#[derive(Clone, Debug, Serialize, utoipa::ToSchema)]
pub struct ThreadedComment {
    #[serde(flatten)]
    pub comment: CommentResponse,
    pub replies: Vec<CommentResponse>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CommentEnvelope {
    pub comment: CommentResponse,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CommentListResponse {
    pub comments: Vec<ThreadedComment>,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteCommentResponse {
    pub message: String,
    /// Number of replies removed along with the comment.
    pub deleted_replies: u64,
}

/// Validate comment text and return it trimmed.
pub fn validate_comment_text(text: &str) -> Result<String, AppError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::Validation("Comment cannot be empty".into()));
    }
    if text.chars().count() > MAX_COMMENT_CHARS {
        return Err(AppError::Validation(format!(
            "Comment must be at most {MAX_COMMENT_CHARS} characters"
        )));
    }
    Ok(text.to_string())
}

/// Check that `parent` can take a reply on `content_id`: same content item and
/// itself top-level, which keeps threads at most two levels deep.
pub fn validate_reply_target(parent: &comment::Model, content_id: i32) -> Result<(), AppError> {
    if parent.content_id != content_id {
        return Err(AppError::Validation(
            "Parent comment belongs to different content".into(),
        ));
    }
    if parent.parent_comment_id.is_some() {
        return Err(AppError::Validation("Cannot reply to a reply".into()));
    }
    Ok(())
}

/// Attach replies to their top-level comments.
///
/// `top_level` keeps its given order. Replies are sorted oldest first; replies
/// whose parent is not in `top_level` are dropped.
pub fn build_threads(
    top_level: Vec<CommentResponse>,
    replies: Vec<CommentResponse>,
) -> Vec<ThreadedComment> {
    let mut by_parent: HashMap<i32, Vec<CommentResponse>> = HashMap::new();
    for reply in replies {
        if let Some(parent_id) = reply.parent_comment_id {
            by_parent.entry(parent_id).or_default().push(reply);
        }
    }

    top_level
        .into_iter()
        .map(|comment| {
            let mut replies = by_parent.remove(&comment.id).unwrap_or_default();
            replies.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
            ThreadedComment { comment, replies }
        })
        .collect()
}
