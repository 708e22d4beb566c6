use std::collections::HashSet;

use chrono::Utc;
use sea_orm::sea_query::LockType;
use sea_orm::*;
use tracing::info;

use super::content::find_visible_content;
use super::{user_summaries, user_summary};
use crate::entity::{comment, comment_like};
use crate::error::AppError;
use crate::extractors::auth::AuthUser;
use crate::models::comment::*;
use crate::models::shared::LikeResponse;

async fn find_comment<C: ConnectionTrait>(db: &C, id: i32) -> Result<comment::Model, AppError> {
    comment::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".into()))
}

pub struct CommentService<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> CommentService<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        caller: &AuthUser,
        req: CreateCommentRequest,
    ) -> Result<CommentResponse, AppError> {
        find_visible_content(self.db, req.content_id, Some(caller)).await?;
        let text = validate_comment_text(&req.text)?;

        if let Some(parent_id) = req.parent_comment_id {
            let parent = comment::Entity::find_by_id(parent_id)
                .one(self.db)
                .await?
                .ok_or_else(|| AppError::NotFound("Parent comment not found".into()))?;
            validate_reply_target(&parent, req.content_id)?;
        }

        let now = Utc::now();
        let model = comment::ActiveModel {
            content_id: Set(req.content_id),
            user_id: Set(caller.user_id),
            text: Set(text),
            parent_comment_id: Set(req.parent_comment_id),
            likes_count: Set(0),
            is_edited: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(self.db)
        .await?;

        info!(
            comment_id = model.id,
            content_id = model.content_id,
            parent_comment_id = ?model.parent_comment_id,
            user_id = caller.user_id,
            "Comment created"
        );

        let author = user_summary(self.db, model.user_id).await?;
        Ok(CommentResponse::from_model(model, author, Some(false)))
    }

    /// Top-level comments newest first, each with its replies oldest first.
    pub async fn list_by_content(
        &self,
        caller: Option<&AuthUser>,
        content_id: i32,
    ) -> Result<Vec<ThreadedComment>, AppError> {
        find_visible_content(self.db, content_id, caller).await?;

        let top_level = comment::Entity::find()
            .filter(comment::Column::ContentId.eq(content_id))
            .filter(comment::Column::ParentCommentId.is_null())
            .order_by_desc(comment::Column::CreatedAt)
            .order_by_desc(comment::Column::Id)
            .all(self.db)
            .await?;

        let replies = if top_level.is_empty() {
            Vec::new()
        } else {
            comment::Entity::find()
                .filter(comment::Column::ParentCommentId.is_in(top_level.iter().map(|c| c.id)))
                .order_by_asc(comment::Column::CreatedAt)
                .order_by_asc(comment::Column::Id)
                .all(self.db)
                .await?
        };

        let top_level = self.decorate(caller, top_level).await?;
        let replies = self.decorate(caller, replies).await?;
        Ok(build_threads(top_level, replies))
    }

    /// Author-only text edit. Marks the comment as edited.
    pub async fn update(
        &self,
        caller: &AuthUser,
        id: i32,
        req: UpdateCommentRequest,
    ) -> Result<CommentResponse, AppError> {
        let existing = find_comment(self.db, id).await?;
        if existing.user_id != caller.user_id {
            return Err(AppError::Forbidden(
                "Not authorized to update this comment".into(),
            ));
        }
        let text = validate_comment_text(&req.text)?;

        let mut active: comment::ActiveModel = existing.into();
        active.text = Set(text);
        active.is_edited = Set(true);
        active.updated_at = Set(Utc::now());
        let model = active.update(self.db).await?;

        info!(comment_id = id, user_id = caller.user_id, "Comment updated");

        let mut decorated = self.decorate(Some(caller), vec![model]).await?;
        decorated
            .pop()
            .ok_or_else(|| AppError::Internal("decorate dropped a comment".into()))
    }

    /// Delete a comment and its direct replies in one transaction.
    /// Returns the number of replies removed.
    pub async fn delete(&self, caller: &AuthUser, id: i32) -> Result<u64, AppError> {
        let existing = find_comment(self.db, id).await?;
        if !caller.owns_or_admin(existing.user_id) {
            return Err(AppError::Forbidden(
                "Not authorized to delete this comment".into(),
            ));
        }

        let txn = self.db.begin().await?;

        let mut doomed: Vec<i32> = comment::Entity::find()
            .filter(comment::Column::ParentCommentId.eq(id))
            .select_only()
            .column(comment::Column::Id)
            .into_tuple::<i32>()
            .all(&txn)
            .await?;
        doomed.push(id);

        comment_like::Entity::delete_many()
            .filter(comment_like::Column::CommentId.is_in(doomed))
            .exec(&txn)
            .await?;
        let replies = comment::Entity::delete_many()
            .filter(comment::Column::ParentCommentId.eq(id))
            .exec(&txn)
            .await?;
        comment::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;

        info!(
            comment_id = id,
            user_id = caller.user_id,
            deleted_replies = replies.rows_affected,
            "Comment deleted"
        );
        Ok(replies.rows_affected)
    }

    pub async fn toggle_like(&self, caller: &AuthUser, id: i32) -> Result<LikeResponse, AppError> {
        let txn = self.db.begin().await?;
        let model = comment::Entity::find_by_id(id)
            .lock(LockType::Update)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment not found".into()))?;

        let liked = match comment_like::Entity::find_by_id((id, caller.user_id))
            .one(&txn)
            .await?
        {
            Some(_) => {
                comment_like::Entity::delete_by_id((id, caller.user_id))
                    .exec(&txn)
                    .await?;
                false
            }
            None => {
                comment_like::ActiveModel {
                    comment_id: Set(id),
                    user_id: Set(caller.user_id),
                    created_at: Set(Utc::now()),
                }
                .insert(&txn)
                .await?;
                true
            }
        };

        // Recount under the row lock so the counter always equals the set size.
        let likes = comment_like::Entity::find()
            .filter(comment_like::Column::CommentId.eq(id))
            .count(&txn)
            .await?;
        let likes_count = i32::try_from(likes)
            .map_err(|_| AppError::Internal(format!("like count overflow on comment {id}")))?;
        let mut active: comment::ActiveModel = model.into();
        active.likes_count = Set(likes_count);
        active.update(&txn).await?;

        txn.commit().await?;
        info!(comment_id = id, user_id = caller.user_id, liked, likes_count, "Comment like toggled");
        Ok(LikeResponse { liked, likes_count })
    }

    async fn decorate(
        &self,
        caller: Option<&AuthUser>,
        models: Vec<comment::Model>,
    ) -> Result<Vec<CommentResponse>, AppError> {
        let authors = user_summaries(self.db, models.iter().map(|m| m.user_id)).await?;

        let liked: Option<HashSet<i32>> = match caller {
            Some(c) if !models.is_empty() => Some(
                comment_like::Entity::find()
                    .filter(comment_like::Column::UserId.eq(c.user_id))
                    .filter(comment_like::Column::CommentId.is_in(models.iter().map(|m| m.id)))
                    .select_only()
                    .column(comment_like::Column::CommentId)
                    .into_tuple::<i32>()
                    .all(self.db)
                    .await?
                    .into_iter()
                    .collect(),
            ),
            Some(_) => Some(HashSet::new()),
            None => None,
        };

        Ok(models
            .into_iter()
            .map(|m| {
                let author = authors.get(&m.user_id).cloned();
                let liked = liked.as_ref().map(|set| set.contains(&m.id));
                CommentResponse::from_model(m, author, liked)
            })
            .collect())
    }
}
