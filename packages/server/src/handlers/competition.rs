use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::{AppJson, AppQuery};
use crate::models::competition::*;
use crate::models::shared::MessageResponse;
use crate::services::competition::CompetitionService;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/",
    tag = "Competitions",
    operation_id = "listCompetitions",
    summary = "List competitions",
    description = "All competitions ordered by start date, latest first, with participant counts. Optional `status` filter.",
    params(CompetitionListQuery),
    responses(
        (status = 200, description = "Competitions", body = CompetitionListResponse),
        (status = 400, description = "Unknown status (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_competitions(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<CompetitionListQuery>,
) -> Result<Json<CompetitionListResponse>, AppError> {
    let competitions = CompetitionService::new(&state.db)
        .list(query.status)
        .await?;
    Ok(Json(CompetitionListResponse { competitions }))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Competitions",
    operation_id = "createCompetition",
    summary = "Create a competition",
    description = "Admin only. `registrationDeadline` must not be after `endDate`, and `endDate` must not be before `startDate`.",
    request_body = CreateCompetitionRequest,
    responses(
        (status = 201, description = "Competition created", body = CompetitionEnvelope),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not an admin (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(title = %payload.title))]
pub async fn create_competition(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateCompetitionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let competition = CompetitionService::new(&state.db)
        .create(&auth_user, payload)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(CompetitionEnvelope { competition }),
    ))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Competitions",
    operation_id = "getCompetition",
    summary = "Get a competition",
    description = "Competition details with its participant list. Registration answers are included for admins, the creator, and each participant's own entry.",
    params(("id" = i32, Path, description = "Competition ID")),
    responses(
        (status = 200, description = "Competition", body = CompetitionEnvelope),
        (status = 401, description = "Invalid token (TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Competition not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_competition(
    auth_user: Option<AuthUser>,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<CompetitionEnvelope>, AppError> {
    tracing::Span::current().record("id", id);
    let competition = CompetitionService::new(&state.db)
        .get(auth_user.as_ref(), id)
        .await?;
    Ok(Json(CompetitionEnvelope { competition }))
}

#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Competitions",
    operation_id = "updateCompetition",
    summary = "Update a competition",
    description = "Partial update by an admin or the creator. Send `null` for `maxParticipants` or `image` to clear them. The schedule is validated against the merged values.",
    params(("id" = i32, Path, description = "Competition ID")),
    request_body = UpdateCompetitionRequest,
    responses(
        (status = 200, description = "Competition updated", body = CompetitionEnvelope),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Neither admin nor creator (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Competition not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_competition(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateCompetitionRequest>,
) -> Result<Json<CompetitionEnvelope>, AppError> {
    tracing::Span::current().record("id", id);
    let competition = CompetitionService::new(&state.db)
        .update(&auth_user, id, payload)
        .await?;
    Ok(Json(CompetitionEnvelope { competition }))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Competitions",
    operation_id = "deleteCompetition",
    summary = "Delete a competition",
    description = "Deletes the competition and all registrations. Admin or creator only.",
    params(("id" = i32, Path, description = "Competition ID")),
    responses(
        (status = 200, description = "Competition deleted", body = MessageResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Neither admin nor creator (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Competition not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_competition(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<MessageResponse>, AppError> {
    tracing::Span::current().record("id", id);
    CompetitionService::new(&state.db)
        .delete(&auth_user, id)
        .await?;
    Ok(Json(MessageResponse::new("Competition deleted successfully")))
}

#[utoipa::path(
    post,
    path = "/{id}/register",
    tag = "Competitions",
    operation_id = "registerForCompetition",
    summary = "Register for a competition",
    description = "Registers the caller. Rejected when the registration deadline has passed, when the competition is full, when the caller is already registered, or when the answers do not match the competition's custom fields, checked in that order.",
    params(("id" = i32, Path, description = "Competition ID")),
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Registered", body = RegisterResponse),
        (status = 400, description = "Deadline passed, full, already registered, or invalid answers (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Competition not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id, user_id = auth_user.user_id))]
pub async fn register_for_competition(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    payload: Option<AppJson<RegisterRequest>>,
) -> Result<Json<RegisterResponse>, AppError> {
    tracing::Span::current().record("id", id);
    let payload = payload.map(|AppJson(p)| p).unwrap_or_default();
    let participant = CompetitionService::new(&state.db)
        .register(&auth_user, id, payload)
        .await?;
    Ok(Json(RegisterResponse {
        message: "Successfully registered for competition".into(),
        participant,
    }))
}

#[utoipa::path(
    put,
    path = "/{id}/participants/{user_id}",
    tag = "Competitions",
    operation_id = "updateParticipant",
    summary = "Set a participant's status",
    description = "Marks a participant as `registered`, `submitted` or `winner`. Admin or creator only.",
    params(
        ("id" = i32, Path, description = "Competition ID"),
        ("user_id" = i32, Path, description = "Participant user ID"),
    ),
    request_body = UpdateParticipantRequest,
    responses(
        (status = 200, description = "Participant updated", body = ParticipantEnvelope),
        (status = 400, description = "Unknown status (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Neither admin nor creator (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Competition or participant not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id, user_id))]
pub async fn update_participant(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((id, user_id)): Path<(i32, i32)>,
    AppJson(payload): AppJson<UpdateParticipantRequest>,
) -> Result<Json<ParticipantEnvelope>, AppError> {
    let span = tracing::Span::current();
    span.record("id", id);
    span.record("user_id", user_id);
    let participant = CompetitionService::new(&state.db)
        .set_participant_status(&auth_user, id, user_id, payload)
        .await?;
    Ok(Json(ParticipantEnvelope { participant }))
}
