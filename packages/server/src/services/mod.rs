//! Business logic for the three ContentHub services.
//!
//! Handlers stay thin: they extract the caller and payload and hand both to a
//! service. Every service method takes the caller identity explicitly.

use std::collections::{HashMap, HashSet};

use sea_orm::*;

use crate::entity::user;
use crate::models::shared::UserSummary;

pub mod comment;
pub mod competition;
pub mod content;

/// Load display info for a set of users, keyed by id. Unknown ids are skipped.
pub(crate) async fn user_summaries<C: ConnectionTrait>(
    db: &C,
    ids: impl IntoIterator<Item = i32>,
) -> Result<HashMap<i32, UserSummary>, DbErr> {
    let ids: HashSet<i32> = ids.into_iter().collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let users = user::Entity::find()
        .filter(user::Column::Id.is_in(ids))
        .all(db)
        .await?;
    Ok(users.into_iter().map(|u| (u.id, u.into())).collect())
}

pub(crate) async fn user_summary<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<Option<UserSummary>, DbErr> {
    Ok(user::Entity::find_by_id(id).one(db).await?.map(Into::into))
}

/// Like [`user_summary`] but with the profile bio attached.
pub(crate) async fn user_profile<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<Option<UserSummary>, DbErr> {
    Ok(user::Entity::find_by_id(id)
        .one(db)
        .await?
        .map(UserSummary::profile))
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
