use sea_orm::sea_query::{Index, IndexCreateStatement, PostgresQueryBuilder};
use sea_orm::*;
use tracing::info;

use crate::entity::{comment, content};
use crate::services::content::SEARCH_DOCUMENT;

async fn ensure_index(db: &DatabaseConnection, name: &str, stmt: &str) {
    match db.execute_unprepared(stmt).await {
        Ok(_) => info!("Ensured index {} exists", name),
        Err(e) => tracing::warn!("Failed to create index {}: {}", name, e),
    }
}

fn composite(name: &str, stmt: &mut IndexCreateStatement) -> String {
    stmt.if_not_exists().name(name).to_string(PostgresQueryBuilder)
}

/// Ensure required database indexes exist.
///
/// SeaORM's schema-sync only creates single-column indexes, so the composite
/// listing indexes and the full-text GIN index are created here on startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Category listing: WHERE status = 'published' AND category = ? ORDER BY published_at DESC
    let name = "idx_content_category_published";
    let stmt = composite(
        name,
        Index::create()
            .table(content::Entity)
            .col(content::Column::Category)
            .col(content::Column::PublishedAt),
    );
    ensure_index(db, name, &stmt).await;

    let name = "idx_content_featured_published";
    let stmt = composite(
        name,
        Index::create()
            .table(content::Entity)
            .col(content::Column::Featured)
            .col(content::Column::PublishedAt),
    );
    ensure_index(db, name, &stmt).await;

    // Thread loading: top-level comments per content, replies per parent.
    let name = "idx_comment_content_parent";
    let stmt = composite(
        name,
        Index::create()
            .table(comment::Entity)
            .col(comment::Column::ContentId)
            .col(comment::Column::ParentCommentId),
    );
    ensure_index(db, name, &stmt).await;

    // Must match the expression used by `?search=` for the planner to use it.
    let name = "idx_content_search";
    let stmt =
        format!(r#"CREATE INDEX IF NOT EXISTS {name} ON "content" USING GIN ({SEARCH_DOCUMENT})"#);
    ensure_index(db, name, &stmt).await;

    Ok(())
}
