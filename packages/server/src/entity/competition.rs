use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::enums::CompetitionStatus;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "competition")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    #[sea_orm(column_type = "Text")]
    pub rules: String,
    /// JSON array of {position, description} objects.
    #[sea_orm(column_type = "JsonBinary")]
    pub prizes: serde_json::Value,

    pub start_date: DateTimeUtc,
    pub end_date: DateTimeUtc,
    pub registration_deadline: DateTimeUtc,
    pub max_participants: Option<i32>,

    pub category: String,
    pub image: Option<String>,
    #[sea_orm(indexed)]
    pub status: CompetitionStatus,

    /// JSON array of {fieldName, fieldType, required} definitions.
    #[sea_orm(column_type = "JsonBinary")]
    pub custom_fields: serde_json::Value,

    pub created_by: i32,
    #[sea_orm(belongs_to, from = "created_by", to = "id")]
    pub creator: HasOne<super::user::Entity>,

    #[sea_orm(has_many)]
    pub participants: HasMany<super::competition_participant::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
