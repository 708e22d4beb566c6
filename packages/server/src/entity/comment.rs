use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A comment on a content item. `parent_comment_id` is NULL for top-level
/// comments and points at a top-level comment for replies; replies never
/// have replies of their own.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "comment")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(indexed)]
    pub content_id: i32,
    #[sea_orm(belongs_to, from = "content_id", to = "id")]
    pub content: HasOne<super::content::Entity>,

    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    #[sea_orm(column_type = "Text")]
    pub text: String,

    #[sea_orm(indexed)]
    pub parent_comment_id: Option<i32>,

    #[sea_orm(default_value = 0)]
    pub likes_count: i32,
    #[sea_orm(default_value = false)]
    pub is_edited: bool,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
