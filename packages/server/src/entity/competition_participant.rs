use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::enums::ParticipantStatus;

/// One registration. The composite key keeps a user from appearing twice.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "competition_participant")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub competition_id: i32,
    #[sea_orm(primary_key)]
    pub user_id: i32,
    #[sea_orm(belongs_to, from = "competition_id", to = "id")]
    pub competition: HasOne<super::competition::Entity>,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    pub registered_at: DateTimeUtc,
    /// Map of custom field name to a string, number or boolean answer.
    #[sea_orm(column_type = "JsonBinary")]
    pub answers: serde_json::Value,
    pub status: ParticipantStatus,
}

impl ActiveModelBehavior for ActiveModel {}
