use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Last counted view per (content, client view session).
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "content_view")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub content_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub session: String,
    #[sea_orm(belongs_to, from = "content_id", to = "id")]
    pub content: HasOne<super::content::Entity>,

    pub viewed_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
