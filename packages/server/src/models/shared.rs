use serde::{Deserialize, Deserializer, Serialize};

use crate::entity::user;
use crate::error::AppError;

/// Author / participant info attached to responses.
#[derive(Clone, Debug, Serialize, utoipa::ToSchema)]
pub struct UserSummary {
    #[schema(example = 42)]
    pub id: i32,
    #[schema(example = "Alice")]
    pub name: String,
    pub avatar: Option<String>,
    /// Only on single-item detail responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

impl UserSummary {
    /// Summary including the profile bio.
    pub fn profile(u: user::Model) -> Self {
        let bio = Some(u.bio.clone());
        Self {
            bio,
            ..Self::from(u)
        }
    }
}

impl From<user::Model> for UserSummary {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            name: u.name,
            avatar: u.avatar,
            bio: None,
        }
    }
}

/// Result of a like toggle on content or a comment.
#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    /// Whether the caller likes the item after the toggle.
    pub liked: bool,
    #[schema(example = 3)]
    pub likes_count: i32,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct MessageResponse {
    #[schema(example = "Content deleted successfully")]
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Number of pages needed for `total` items at `per_page` items each.
pub fn total_pages(total: u64, per_page: u64) -> u64 {
    if per_page == 0 {
        return 0;
    }
    total.div_ceil(per_page)
}

/// Normalize `page` / `limit` query values: page is 1-based, limit is clamped.
pub fn page_window(page: Option<u64>, limit: Option<u64>, default: u64, max: u64) -> (u64, u64) {
    let page = Ord::max(page.unwrap_or(1), 1);
    let limit = limit.unwrap_or(default).clamp(1, Ord::max(max, 1));
    (page, limit)
}

/// Row offset for a 1-based `page`. Pages past what a SQL `OFFSET` can
/// address are rejected.
pub fn page_offset(page: u64, page_size: u64) -> Result<u64, AppError> {
    page.saturating_sub(1)
        .checked_mul(page_size)
        .filter(|offset| i64::try_from(*offset).is_ok())
        .ok_or_else(|| AppError::Validation("Page number is out of range".into()))
}

/// Serde helper for update semantics on nullable fields.
///
/// * JSON field absent  => `None`          (don't update)
/// * JSON field = null  => `Some(None)`    (set to NULL)
/// * JSON field = value => `Some(Some(v))` (set to value)
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

/// Validate a trimmed, required text field against a character limit.
pub fn validate_text_field(value: &str, field: &str, max_chars: usize) -> Result<(), AppError> {
    let value = value.trim();
    if value.is_empty() || value.chars().count() > max_chars {
        return Err(AppError::Validation(format!(
            "{field} must be 1-{max_chars} characters"
        )));
    }
    Ok(())
}

/// Validate a required field that has no upper bound beyond the request size.
pub fn validate_non_empty(value: &str, field: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}
