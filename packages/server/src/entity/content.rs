use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::enums::{Category, ContentStatus};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "content")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    #[sea_orm(column_type = "Text")]
    pub body: String, // rich text
    #[sea_orm(indexed)]
    pub category: Category,
    /// JSON array of strings.
    #[sea_orm(column_type = "JsonBinary")]
    pub tags: serde_json::Value,
    /// Ordered JSON array of {url, caption} objects.
    #[sea_orm(column_type = "JsonBinary")]
    pub images: serde_json::Value,

    pub author_id: i32,
    #[sea_orm(belongs_to, from = "author_id", to = "id")]
    pub author: HasOne<super::user::Entity>,

    /// Always equals the number of `content_like` rows for this item.
    #[sea_orm(default_value = 0)]
    pub likes_count: i32,
    #[sea_orm(default_value = 0)]
    pub views: i32,
    #[sea_orm(indexed)]
    pub status: ContentStatus,
    #[sea_orm(default_value = false)]
    pub featured: bool,

    #[sea_orm(has_many)]
    pub comments: HasMany<super::comment::Entity>,

    pub published_at: DateTimeUtc,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
