use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::shared::{UserSummary, validate_non_empty, validate_text_field};
use crate::entity::content;
use crate::entity::enums::{Category, ContentStatus};
use crate::error::AppError;

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_DESCRIPTION_CHARS: usize = 500;
pub const MAX_IMAGES: usize = 5;
pub const MAX_TAGS: usize = 20;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ContentImage {
    #[schema(example = "https://cdn.example.com/lantern.jpg")]
    pub url: String,
    #[serde(default)]
    pub caption: String,
}

/// Tags arrive either as a JSON array or as a comma-separated string.
#[derive(Clone, Debug, Deserialize, utoipa::ToSchema)]
#[serde(untagged)]
pub enum TagsInput {
    List(Vec<String>),
    Csv(String),
}

impl TagsInput {
    /// Trim every tag, drop empties and exact duplicates, keep first-seen order.
    pub fn normalize(self) -> Vec<String> {
        let raw: Vec<String> = match self {
            TagsInput::List(list) => list,
            TagsInput::Csv(csv) => csv.split(',').map(str::to_string).collect(),
        };
        let mut seen = HashSet::new();
        raw.into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .filter(|t| seen.insert(t.clone()))
            .collect()
    }
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateContentRequest {
    #[schema(example = "Lantern festival in Hoi An")]
    pub title: String,
    pub description: String,
    pub body: String,
    /// One of: history, fun, memes, festivals, travel, food, culture, other.
    #[schema(example = "festivals")]
    pub category: String,
    #[serde(default)]
    pub tags: Option<TagsInput>,
    #[serde(default)]
    pub images: Vec<ContentImage>,
    pub status: Option<ContentStatus>,
}

/// Partial update. `featured` is honoured for admins only and silently
/// ignored for everyone else.
#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateContentRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub body: Option<String>,
    pub category: Option<String>,
    pub tags: Option<TagsInput>,
    pub images: Option<Vec<ContentImage>>,
    pub status: Option<ContentStatus>,
    pub featured: Option<bool>,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ContentListQuery {
    /// 1-based page number. Default: 1.
    pub page: Option<u64>,
    /// Page size. Default: 10, max: 100.
    pub limit: Option<u64>,
    /// Category filter; `all` disables it.
    pub category: Option<String>,
    /// Full-text search over title, description, body and tags.
    pub search: Option<String>,
    /// Only featured content when true.
    pub featured: Option<bool>,
    /// Only content by this author.
    pub author: Option<i32>,
    /// Status filter, admins only. Everyone else always gets published content.
    pub status: Option<ContentStatus>,
}

#[derive(Deserialize, Default, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct ContentDetailQuery {
    /// Count this fetch as a view.
    pub increment_view: Option<bool>,
}

/// Normalized, validated list filters handed to the service.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContentFilters {
    pub category: Option<Category>,
    pub featured_only: bool,
    pub search: Option<String>,
    pub author: Option<i32>,
    pub status: Option<ContentStatus>,
    pub page: u64,
    pub page_size: u64,
}

#[derive(Clone, Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContentResponse {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub body: String,
    pub category: Category,
    pub tags: Vec<String>,
    pub images: Vec<ContentImage>,
    pub author: Option<UserSummary>,
    pub likes_count: i32,
    pub views: i32,
    pub status: ContentStatus,
    pub featured: bool,
    /// Present when the caller is authenticated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liked: Option<bool>,
    pub published_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContentResponse {
    pub fn from_model(m: content::Model, author: Option<UserSummary>, liked: Option<bool>) -> Self {
        Self {
            id: m.id,
            title: m.title,
            description: m.description,
            body: m.body,
            category: m.category,
            tags: serde_json::from_value(m.tags).unwrap_or_default(),
            images: serde_json::from_value(m.images).unwrap_or_default(),
            author,
            likes_count: m.likes_count,
            views: m.views,
            status: m.status,
            featured: m.featured,
            liked,
            published_at: m.published_at,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ContentEnvelope {
    pub content: ContentResponse,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContentListResponse {
    pub content: Vec<ContentResponse>,
    pub current_page: u64,
    pub total_pages: u64,
    pub total_content: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, utoipa::ToSchema)]
pub struct CategoryCount {
    pub category: Category,
    pub count: u64,
    /// Share of all content in percent, one decimal.
    pub percentage: f64,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContentStats {
    pub total_content: u64,
    pub total_views: i64,
    pub total_likes: i64,
    pub content_by_category: Vec<CategoryCount>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct StatsResponse {
    pub stats: ContentStats,
}

pub fn parse_category(raw: &str) -> Result<Category, AppError> {
    raw.trim().parse::<Category>().map_err(AppError::Validation)
}

/// `None` and `"all"` both mean "no category filter".
pub fn parse_category_filter(raw: Option<&str>) -> Result<Option<Category>, AppError> {
    match raw.map(str::trim) {
        None | Some("") | Some("all") => Ok(None),
        Some(other) => parse_category(other).map(Some),
    }
}

fn validate_images(images: &[ContentImage]) -> Result<(), AppError> {
    if images.len() > MAX_IMAGES {
        return Err(AppError::Validation(format!(
            "At most {MAX_IMAGES} images are allowed"
        )));
    }
    if images.iter().any(|i| i.url.trim().is_empty()) {
        return Err(AppError::Validation("Image url must not be empty".into()));
    }
    Ok(())
}

fn validate_tags(tags: &[String]) -> Result<(), AppError> {
    if tags.len() > MAX_TAGS {
        return Err(AppError::Validation(format!(
            "At most {MAX_TAGS} tags are allowed"
        )));
    }
    Ok(())
}

/// Validate a create request and return its parsed category and normalized tags.
pub fn validate_create_content(
    req: &CreateContentRequest,
) -> Result<(Category, Vec<String>), AppError> {
    validate_text_field(&req.title, "Title", MAX_TITLE_CHARS)?;
    validate_text_field(&req.description, "Description", MAX_DESCRIPTION_CHARS)?;
    validate_non_empty(&req.body, "Body")?;
    let category = parse_category(&req.category)?;
    let tags = req.tags.clone().map(TagsInput::normalize).unwrap_or_default();
    validate_tags(&tags)?;
    validate_images(&req.images)?;
    Ok((category, tags))
}

pub fn validate_update_content(req: &UpdateContentRequest) -> Result<(), AppError> {
    if let Some(ref title) = req.title {
        validate_text_field(title, "Title", MAX_TITLE_CHARS)?;
    }
    if let Some(ref description) = req.description {
        validate_text_field(description, "Description", MAX_DESCRIPTION_CHARS)?;
    }
    if let Some(ref body) = req.body {
        validate_non_empty(body, "Body")?;
    }
    if let Some(ref category) = req.category {
        parse_category(category)?;
    }
    if let Some(ref tags) = req.tags {
        validate_tags(&tags.clone().normalize())?;
    }
    if let Some(ref images) = req.images {
        validate_images(images)?;
    }
    Ok(())
}

/// Per-category counts with their percentage of `total`, largest first.
pub fn category_breakdown(counts: Vec<(Category, u64)>, total: u64) -> Vec<CategoryCount> {
    let mut rows: Vec<CategoryCount> = counts
        .into_iter()
        .map(|(category, count)| {
            let percentage = if total == 0 {
                0.0
            } else {
                (count as f64 * 1000.0 / total as f64).round() / 10.0
            };
            CategoryCount {
                category,
                count,
                percentage,
            }
        })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count).then(a.category.as_str().cmp(b.category.as_str())));
    rows
}
