use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::health::health))
        .nest("/content", content_routes())
        .nest("/comments", comment_routes())
        .nest("/competitions", competition_routes())
}

fn content_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::content::list_content,
            handlers::content::create_content
        ))
        .routes(routes!(handlers::content::content_stats))
        .routes(routes!(
            handlers::content::get_content,
            handlers::content::update_content,
            handlers::content::delete_content
        ))
        .routes(routes!(handlers::content::toggle_content_like))
}

fn comment_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::comment::create_comment))
        .routes(routes!(handlers::comment::list_comments))
        .routes(routes!(
            handlers::comment::update_comment,
            handlers::comment::delete_comment
        ))
        .routes(routes!(handlers::comment::toggle_comment_like))
}

fn competition_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::competition::list_competitions,
            handlers::competition::create_competition
        ))
        .routes(routes!(
            handlers::competition::get_competition,
            handlers::competition::update_competition,
            handlers::competition::delete_competition
        ))
        .routes(routes!(handlers::competition::register_for_competition))
        .routes(routes!(handlers::competition::update_participant))
}
