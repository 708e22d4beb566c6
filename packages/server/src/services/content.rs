use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use sea_orm::prelude::Expr;
use sea_orm::sea_query::LockType;
use sea_orm::*;
use tracing::info;

use super::{is_unique_violation, user_profile, user_summaries, user_summary};
use crate::config::ContentConfig;
use crate::entity::enums::{Category, ContentStatus};
use crate::entity::{comment, comment_like, content, content_like, content_view};
use crate::error::AppError;
use crate::extractors::auth::AuthUser;
use crate::models::content::*;
use crate::models::shared::{LikeResponse, page_offset, page_window, total_pages};

/// Document searched by `?search=`. The GIN index in `seed::ensure_indexes`
/// is built over exactly this expression.
pub const SEARCH_DOCUMENT: &str = "to_tsvector('simple', coalesce(title, '') || ' ' || \
     coalesce(description, '') || ' ' || coalesce(body, '') || ' ' || coalesce(tags::text, ''))";

/// Fetch a content item the caller is allowed to see.
///
/// Non-published items are only visible to their author and admins; everyone
/// else gets the same 404 as for a missing id.
pub(crate) async fn find_visible_content<C: ConnectionTrait>(
    db: &C,
    id: i32,
    caller: Option<&AuthUser>,
) -> Result<content::Model, AppError> {
    let model = content::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Content not found".into()))?;
    let visible = model.status == ContentStatus::Published
        || caller.is_some_and(|c| c.owns_or_admin(model.author_id));
    if !visible {
        return Err(AppError::NotFound("Content not found".into()));
    }
    Ok(model)
}

async fn find_content<C: ConnectionTrait>(db: &C, id: i32) -> Result<content::Model, AppError> {
    content::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Content not found".into()))
}

pub struct ContentService<'a> {
    db: &'a DatabaseConnection,
    config: &'a ContentConfig,
}

impl<'a> ContentService<'a> {
    pub fn new(db: &'a DatabaseConnection, config: &'a ContentConfig) -> Self {
        Self { db, config }
    }

    pub async fn create(
        &self,
        caller: &AuthUser,
        req: CreateContentRequest,
    ) -> Result<ContentResponse, AppError> {
        let (category, tags) = validate_create_content(&req)?;

        let now = Utc::now();
        let model = content::ActiveModel {
            title: Set(req.title.trim().to_string()),
            description: Set(req.description.trim().to_string()),
            body: Set(req.body),
            category: Set(category),
            tags: Set(serde_json::json!(tags)),
            images: Set(serde_json::json!(req.images)),
            author_id: Set(caller.user_id),
            likes_count: Set(0),
            views: Set(0),
            status: Set(req.status.unwrap_or_default()),
            featured: Set(false),
            published_at: Set(now),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(self.db)
        .await?;

        info!(content_id = model.id, author_id = caller.user_id, category = %model.category, "Content created");

        let author = user_summary(self.db, model.author_id).await?;
        Ok(ContentResponse::from_model(model, author, Some(false)))
    }

    /// Resolve raw query parameters against the caller's privileges.
    pub fn filters(
        &self,
        caller: Option<&AuthUser>,
        query: ContentListQuery,
    ) -> Result<ContentFilters, AppError> {
        let (page, page_size) = page_window(
            query.page,
            query.limit,
            self.config.default_page_size,
            self.config.max_page_size,
        );
        let category = parse_category_filter(query.category.as_deref())?;
        let search = query
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        // Admins may list any status, authors may list their own drafts.
        let may_pick_status = caller.is_some_and(|c| {
            c.is_admin() || query.author.is_some_and(|author| author == c.user_id)
        });
        let status = match query.status {
            Some(status) if may_pick_status => status,
            _ => ContentStatus::Published,
        };

        Ok(ContentFilters {
            category,
            featured_only: query.featured.unwrap_or(false),
            search,
            author: query.author,
            status: Some(status),
            page,
            page_size,
        })
    }

    pub async fn list(
        &self,
        caller: Option<&AuthUser>,
        filters: ContentFilters,
    ) -> Result<ContentListResponse, AppError> {
        let mut select = content::Entity::find();

        if let Some(status) = filters.status {
            select = select.filter(content::Column::Status.eq(status));
        }
        if let Some(category) = filters.category {
            select = select.filter(content::Column::Category.eq(category));
        }
        if filters.featured_only {
            select = select.filter(content::Column::Featured.eq(true));
        }
        if let Some(author) = filters.author {
            select = select.filter(content::Column::AuthorId.eq(author));
        }
        if let Some(ref search) = filters.search {
            select = select.filter(Expr::cust_with_values(
                format!("{SEARCH_DOCUMENT} @@ plainto_tsquery('simple', $1)"),
                [search.clone()],
            ));
        }

        let offset = page_offset(filters.page, filters.page_size)?;
        let total = select.clone().count(self.db).await?;

        let models = select
            .order_by_desc(content::Column::PublishedAt)
            .order_by_desc(content::Column::Id)
            .offset(offset)
            .limit(filters.page_size)
            .all(self.db)
            .await?;

        let content = self.decorate(caller, models).await?;

        Ok(ContentListResponse {
            content,
            current_page: filters.page,
            total_pages: total_pages(total, filters.page_size),
            total_content: total,
        })
    }

    /// Fetch one item. With `increment_view`, counts a view through a separate
    /// atomic update and reports the counter as it stands afterwards.
    pub async fn get_by_id(
        &self,
        caller: Option<&AuthUser>,
        id: i32,
        increment_view: bool,
        view_session: Option<&str>,
    ) -> Result<ContentResponse, AppError> {
        let mut model = find_visible_content(self.db, id, caller).await?;

        if increment_view && self.record_view(id, view_session).await? {
            let views: Option<i32> = content::Entity::find_by_id(id)
                .select_only()
                .column(content::Column::Views)
                .into_tuple::<i32>()
                .one(self.db)
                .await?;
            // Item deleted between the read and the increment.
            model.views = views.ok_or_else(|| AppError::NotFound("Content not found".into()))?;
        }

        let author_id = model.author_id;
        let mut decorated = self.decorate(caller, vec![model]).await?;
        let mut response = decorated
            .pop()
            .ok_or_else(|| AppError::Internal("decorate dropped a content item".into()))?;
        response.author = user_profile(self.db, author_id).await?;
        Ok(response)
    }

    /// Returns whether the view was counted.
    async fn record_view(&self, id: i32, session: Option<&str>) -> Result<bool, AppError> {
        let window = self.config.view_debounce_secs;
        let Some(session) = session.filter(|_| window > 0) else {
            increment_views(self.db, id).await?;
            return Ok(true);
        };

        let window = i64::try_from(window)
            .ok()
            .and_then(Duration::try_seconds)
            .ok_or_else(|| AppError::Internal(format!("view debounce window {window}s out of range")))?;
        let now = Utc::now();
        let txn = self.db.begin().await?;
        let marker = content_view::Entity::find_by_id((id, session.to_string()))
            .lock(LockType::Update)
            .one(&txn)
            .await?;

        match marker {
            Some(m) if now - m.viewed_at < window => {
                txn.commit().await?;
                return Ok(false);
            }
            Some(m) => {
                let mut active: content_view::ActiveModel = m.into();
                active.viewed_at = Set(now);
                active.update(&txn).await?;
            }
            None => {
                let inserted = content_view::ActiveModel {
                    content_id: Set(id),
                    session: Set(session.to_string()),
                    viewed_at: Set(now),
                }
                .insert(&txn)
                .await;
                match inserted {
                    Ok(_) => {}
                    // A concurrent request with the same session won the insert.
                    Err(e) if is_unique_violation(&e) => return Ok(false),
                    Err(e) => return Err(e.into()),
                }
            }
        }

        increment_views(&txn, id).await?;
        txn.commit().await?;

        prune_view_markers(self.db, id, now - window).await;
        Ok(true)
    }

    pub async fn update(
        &self,
        caller: &AuthUser,
        id: i32,
        req: UpdateContentRequest,
    ) -> Result<ContentResponse, AppError> {
        let existing = find_content(self.db, id).await?;
        if !caller.owns_or_admin(existing.author_id) {
            return Err(AppError::Forbidden(
                "Not authorized to update this content".into(),
            ));
        }
        validate_update_content(&req)?;

        let now = Utc::now();
        let was_published = existing.status == ContentStatus::Published;
        let mut active: content::ActiveModel = existing.into();

        if let Some(title) = req.title {
            active.title = Set(title.trim().to_string());
        }
        if let Some(description) = req.description {
            active.description = Set(description.trim().to_string());
        }
        if let Some(body) = req.body {
            active.body = Set(body);
        }
        if let Some(ref category) = req.category {
            active.category = Set(parse_category(category)?);
        }
        if let Some(tags) = req.tags {
            active.tags = Set(serde_json::json!(tags.normalize()));
        }
        if let Some(images) = req.images {
            active.images = Set(serde_json::json!(images));
        }
        if let Some(status) = req.status {
            active.status = Set(status);
            if status == ContentStatus::Published && !was_published {
                active.published_at = Set(now);
            }
        }
        // Non-admins keep the stored flag.
        if let Some(featured) = req.featured
            && caller.is_admin()
        {
            active.featured = Set(featured);
        }
        active.updated_at = Set(now);

        let model = active.update(self.db).await?;
        info!(content_id = id, user_id = caller.user_id, "Content updated");

        let mut decorated = self.decorate(Some(caller), vec![model]).await?;
        decorated
            .pop()
            .ok_or_else(|| AppError::Internal("decorate dropped a content item".into()))
    }

    /// Delete an item together with its likes, view markers, comments and
    /// comment likes.
    pub async fn delete(&self, caller: &AuthUser, id: i32) -> Result<(), AppError> {
        let existing = find_content(self.db, id).await?;
        if !caller.owns_or_admin(existing.author_id) {
            return Err(AppError::Forbidden(
                "Not authorized to delete this content".into(),
            ));
        }

        let txn = self.db.begin().await?;

        let comment_ids: Vec<i32> = comment::Entity::find()
            .filter(comment::Column::ContentId.eq(id))
            .select_only()
            .column(comment::Column::Id)
            .into_tuple::<i32>()
            .all(&txn)
            .await?;
        if !comment_ids.is_empty() {
            comment_like::Entity::delete_many()
                .filter(comment_like::Column::CommentId.is_in(comment_ids.clone()))
                .exec(&txn)
                .await?;
        }
        // Replies first, parents reference nothing after that.
        comment::Entity::delete_many()
            .filter(comment::Column::ContentId.eq(id))
            .filter(comment::Column::ParentCommentId.is_not_null())
            .exec(&txn)
            .await?;
        comment::Entity::delete_many()
            .filter(comment::Column::ContentId.eq(id))
            .exec(&txn)
            .await?;
        content_like::Entity::delete_many()
            .filter(content_like::Column::ContentId.eq(id))
            .exec(&txn)
            .await?;
        content_view::Entity::delete_many()
            .filter(content_view::Column::ContentId.eq(id))
            .exec(&txn)
            .await?;
        content::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        info!(
            content_id = id,
            user_id = caller.user_id,
            comments = comment_ids.len(),
            "Content deleted"
        );
        Ok(())
    }

    pub async fn toggle_like(&self, caller: &AuthUser, id: i32) -> Result<LikeResponse, AppError> {
        let txn = self.db.begin().await?;
        let model = content::Entity::find_by_id(id)
            .lock(LockType::Update)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Content not found".into()))?;

        let existing = content_like::Entity::find_by_id((id, caller.user_id))
            .one(&txn)
            .await?;
        let liked = match existing {
            Some(_) => {
                content_like::Entity::delete_by_id((id, caller.user_id))
                    .exec(&txn)
                    .await?;
                false
            }
            None => {
                content_like::ActiveModel {
                    content_id: Set(id),
                    user_id: Set(caller.user_id),
                    created_at: Set(Utc::now()),
                }
                .insert(&txn)
                .await?;
                true
            }
        };

        let likes = content_like::Entity::find()
            .filter(content_like::Column::ContentId.eq(id))
            .count(&txn)
            .await?;
        let likes_count = i32::try_from(likes)
            .map_err(|_| AppError::Internal(format!("like count overflow on content {id}")))?;
        let mut active: content::ActiveModel = model.into();
        active.likes_count = Set(likes_count);
        active.update(&txn).await?;

        txn.commit().await?;
        info!(content_id = id, user_id = caller.user_id, liked, likes_count, "Content like toggled");
        Ok(LikeResponse { liked, likes_count })
    }

    pub async fn stats(&self, caller: &AuthUser) -> Result<ContentStats, AppError> {
        caller.require_admin()?;

        let total_content = content::Entity::find().count(self.db).await?;

        let (total_views, total_likes) = content::Entity::find()
            .select_only()
            .column_as(content::Column::Views.sum(), "total_views")
            .column_as(content::Column::LikesCount.sum(), "total_likes")
            .into_tuple::<(Option<i64>, Option<i64>)>()
            .one(self.db)
            .await?
            .unwrap_or_default();

        let per_category: Vec<(Category, i64)> = content::Entity::find()
            .select_only()
            .column(content::Column::Category)
            .column_as(content::Column::Id.count(), "count")
            .group_by(content::Column::Category)
            .into_tuple()
            .all(self.db)
            .await?;
        let counts = per_category
            .into_iter()
            .map(|(category, count)| (category, u64::try_from(count).unwrap_or(0)))
            .collect();

        Ok(ContentStats {
            total_content,
            total_views: total_views.unwrap_or(0),
            total_likes: total_likes.unwrap_or(0),
            content_by_category: category_breakdown(counts, total_content),
        })
    }

    /// Attach author info and, for a known caller, the `liked` flag.
    async fn decorate(
        &self,
        caller: Option<&AuthUser>,
        models: Vec<content::Model>,
    ) -> Result<Vec<ContentResponse>, AppError> {
        let authors = user_summaries(self.db, models.iter().map(|m| m.author_id)).await?;

        let liked: Option<HashSet<i32>> = match caller {
            Some(c) if !models.is_empty() => Some(
                content_like::Entity::find()
                    .filter(content_like::Column::UserId.eq(c.user_id))
                    .filter(content_like::Column::ContentId.is_in(models.iter().map(|m| m.id)))
                    .select_only()
                    .column(content_like::Column::ContentId)
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
                let author = authors.get(&m.author_id).cloned();
                let liked = liked.as_ref().map(|set| set.contains(&m.id));
                ContentResponse::from_model(m, author, liked)
            })
            .collect())
    }
}

/// Drop markers for `content_id` last touched before `cutoff`; they no longer
/// debounce anything. Runs after the counting transaction and only logs on
/// failure.
async fn prune_view_markers(db: &DatabaseConnection, content_id: i32, cutoff: DateTime<Utc>) {
    let result = content_view::Entity::delete_many()
        .filter(content_view::Column::ContentId.eq(content_id))
        .filter(content_view::Column::ViewedAt.lt(cutoff))
        .exec(db)
        .await;
    match result {
        Ok(res) if res.rows_affected > 0 => {
            tracing::debug!(content_id, pruned = res.rows_affected, "Pruned stale view markers");
        }
        Ok(_) => {}
        Err(e) => tracing::warn!(content_id, "Failed to prune view markers: {}", e),
    }
}

async fn increment_views<C: ConnectionTrait>(db: &C, id: i32) -> Result<(), DbErr> {
    content::Entity::update_many()
        .col_expr(content::Column::Views, Expr::col(content::Column::Views).add(1))
        .filter(content::Column::Id.eq(id))
        .exec(db)
        .await?;
    Ok(())
}
