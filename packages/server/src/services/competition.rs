use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::LockType;
use sea_orm::*;
use tracing::info;

use super::{is_unique_violation, user_summaries, user_summary};
use crate::entity::enums::{CompetitionStatus, ParticipantStatus};
use crate::entity::{competition, competition_participant};
use crate::error::AppError;
use crate::extractors::auth::AuthUser;
use crate::models::competition::*;

async fn find_competition<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<competition::Model, AppError> {
    competition::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Competition not found".into()))
}

async fn find_competition_for_update(
    txn: &DatabaseTransaction,
    id: i32,
) -> Result<competition::Model, AppError> {
    competition::Entity::find_by_id(id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Competition not found".into()))
}

async fn participant_count<C: ConnectionTrait>(db: &C, competition_id: i32) -> Result<u64, DbErr> {
    competition_participant::Entity::find()
        .filter(competition_participant::Column::CompetitionId.eq(competition_id))
        .count(db)
        .await
}

fn stored_custom_fields(model: &competition::Model) -> Result<Vec<CustomField>, AppError> {
    serde_json::from_value(model.custom_fields.clone()).map_err(|e| {
        AppError::Internal(format!(
            "competition {} has malformed custom fields: {e}",
            model.id
        ))
    })
}

pub struct CompetitionService<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> CompetitionService<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        caller: &AuthUser,
        req: CreateCompetitionRequest,
    ) -> Result<CompetitionResponse, AppError> {
        caller.require_admin()?;
        validate_create_competition(&req)?;

        let now = Utc::now();
        let model = competition::ActiveModel {
            title: Set(req.title.trim().to_string()),
            description: Set(req.description),
            rules: Set(req.rules),
            prizes: Set(serde_json::json!(req.prizes)),
            start_date: Set(req.start_date),
            end_date: Set(req.end_date),
            registration_deadline: Set(req.registration_deadline),
            max_participants: Set(req.max_participants),
            category: Set(req.category.trim().to_string()),
            image: Set(req.image),
            status: Set(req.status.unwrap_or_default()),
            custom_fields: Set(serde_json::json!(normalize_custom_fields(
                req.custom_fields
            ))),
            created_by: Set(caller.user_id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(self.db)
        .await?;

        info!(competition_id = model.id, created_by = caller.user_id, "Competition created");

        let creator = user_summary(self.db, model.created_by).await?;
        Ok(CompetitionResponse::from_model(model, creator, 0))
    }

    /// All competitions, latest start date first, with participant counts.
    pub async fn list(
        &self,
        status: Option<CompetitionStatus>,
    ) -> Result<Vec<CompetitionResponse>, AppError> {
        let mut select = competition::Entity::find();
        if let Some(status) = status {
            select = select.filter(competition::Column::Status.eq(status));
        }
        let models = select
            .order_by_desc(competition::Column::StartDate)
            .order_by_desc(competition::Column::Id)
            .all(self.db)
            .await?;

        let counts: HashMap<i32, i64> = if models.is_empty() {
            HashMap::new()
        } else {
            competition_participant::Entity::find()
                .filter(
                    competition_participant::Column::CompetitionId
                        .is_in(models.iter().map(|m| m.id)),
                )
                .select_only()
                .column(competition_participant::Column::CompetitionId)
                .column_as(competition_participant::Column::UserId.count(), "count")
                .group_by(competition_participant::Column::CompetitionId)
                .into_tuple::<(i32, i64)>()
                .all(self.db)
                .await?
                .into_iter()
                .collect()
        };
        let creators = user_summaries(self.db, models.iter().map(|m| m.created_by)).await?;

        Ok(models
            .into_iter()
            .map(|m| {
                let count = counts.get(&m.id).copied().unwrap_or(0);
                let creator = creators.get(&m.created_by).cloned();
                CompetitionResponse::from_model(m, creator, u64::try_from(count).unwrap_or(0))
            })
            .collect())
    }

    /// Detail view with the participant list. Answers are only shown to
    /// admins, the creator, and each participant for their own entry.
    pub async fn get(
        &self,
        caller: Option<&AuthUser>,
        id: i32,
    ) -> Result<CompetitionResponse, AppError> {
        let model = find_competition(self.db, id).await?;

        let participants = competition_participant::Entity::find()
            .filter(competition_participant::Column::CompetitionId.eq(id))
            .order_by_asc(competition_participant::Column::RegisteredAt)
            .all(self.db)
            .await?;

        let mut user_ids: Vec<i32> = participants.iter().map(|p| p.user_id).collect();
        user_ids.push(model.created_by);
        let users = user_summaries(self.db, user_ids).await?;

        let manages = caller.is_some_and(|c| c.owns_or_admin(model.created_by));
        let registered = caller.map(|c| participants.iter().any(|p| p.user_id == c.user_id));
        let count = participants.len() as u64;

        let participants = participants
            .into_iter()
            .map(|p| {
                let show_answers = manages || caller.is_some_and(|c| c.user_id == p.user_id);
                let user = users.get(&p.user_id).cloned();
                ParticipantResponse::from_model(p, user, show_answers)
            })
            .collect();

        let creator = users.get(&model.created_by).cloned();
        let mut response = CompetitionResponse::from_model(model, creator, count);
        response.participants = Some(participants);
        response.registered = registered;
        Ok(response)
    }

    pub async fn update(
        &self,
        caller: &AuthUser,
        id: i32,
        req: UpdateCompetitionRequest,
    ) -> Result<CompetitionResponse, AppError> {
        let existing = find_competition(self.db, id).await?;
        if !caller.owns_or_admin(existing.created_by) {
            return Err(AppError::Forbidden(
                "Not authorized to update this competition".into(),
            ));
        }
        validate_update_competition(&req)?;
        validate_schedule(
            req.start_date.unwrap_or(existing.start_date),
            req.end_date.unwrap_or(existing.end_date),
            req.registration_deadline
                .unwrap_or(existing.registration_deadline),
        )?;

        let mut active: competition::ActiveModel = existing.into();
        if let Some(title) = req.title {
            active.title = Set(title.trim().to_string());
        }
        if let Some(description) = req.description {
            active.description = Set(description);
        }
        if let Some(rules) = req.rules {
            active.rules = Set(rules);
        }
        if let Some(prizes) = req.prizes {
            active.prizes = Set(serde_json::json!(prizes));
        }
        if let Some(start_date) = req.start_date {
            active.start_date = Set(start_date);
        }
        if let Some(end_date) = req.end_date {
            active.end_date = Set(end_date);
        }
        if let Some(deadline) = req.registration_deadline {
            active.registration_deadline = Set(deadline);
        }
        if let Some(max_participants) = req.max_participants {
            active.max_participants = Set(max_participants);
        }
        if let Some(category) = req.category {
            active.category = Set(category.trim().to_string());
        }
        if let Some(image) = req.image {
            active.image = Set(image);
        }
        if let Some(status) = req.status {
            active.status = Set(status);
        }
        if let Some(fields) = req.custom_fields {
            active.custom_fields = Set(serde_json::json!(normalize_custom_fields(fields)));
        }
        active.updated_at = Set(Utc::now());

        let model = active.update(self.db).await?;
        info!(competition_id = id, user_id = caller.user_id, "Competition updated");

        let count = participant_count(self.db, id).await?;
        let creator = user_summary(self.db, model.created_by).await?;
        Ok(CompetitionResponse::from_model(model, creator, count))
    }

    /// Remove a competition and all of its registrations.
    pub async fn delete(&self, caller: &AuthUser, id: i32) -> Result<(), AppError> {
        let txn = self.db.begin().await?;
        let existing = find_competition_for_update(&txn, id).await?;
        if !caller.owns_or_admin(existing.created_by) {
            return Err(AppError::Forbidden(
                "Not authorized to delete this competition".into(),
            ));
        }

        let removed = competition_participant::Entity::delete_many()
            .filter(competition_participant::Column::CompetitionId.eq(id))
            .exec(&txn)
            .await?;
        competition::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        info!(
            competition_id = id,
            user_id = caller.user_id,
            participants = removed.rows_affected,
            "Competition deleted"
        );
        Ok(())
    }

    /// Register the caller.
    ///
    /// The competition row is locked for the whole check-then-insert so two
    /// concurrent registrations cannot both pass the capacity check.
    pub async fn register(
        &self,
        caller: &AuthUser,
        id: i32,
        req: RegisterRequest,
    ) -> Result<ParticipantResponse, AppError> {
        let txn = self.db.begin().await?;
        let model = find_competition_for_update(&txn, id).await?;

        let count = participant_count(&txn, id).await?;
        let already_registered = competition_participant::Entity::find_by_id((id, caller.user_id))
            .one(&txn)
            .await?
            .is_some();

        check_registration(
            Utc::now(),
            model.registration_deadline,
            model.max_participants,
            count,
            already_registered,
        )?;
        validate_answers(&stored_custom_fields(&model)?, &req.answers)?;

        let inserted = competition_participant::ActiveModel {
            competition_id: Set(id),
            user_id: Set(caller.user_id),
            registered_at: Set(Utc::now()),
            answers: Set(serde_json::json!(req.answers)),
            status: Set(ParticipantStatus::Registered),
        }
        .insert(&txn)
        .await;

        let participant = match inserted {
            Ok(p) => p,
            Err(e) if is_unique_violation(&e) => {
                return Err(RegistrationError::AlreadyRegistered.into());
            }
            Err(e) => return Err(e.into()),
        };
        txn.commit().await?;

        info!(
            competition_id = id,
            user_id = caller.user_id,
            participants = count + 1,
            "Registered for competition"
        );

        let user = user_summary(self.db, caller.user_id).await?;
        Ok(ParticipantResponse::from_model(participant, user, true))
    }

    /// Set one participant's status. Admin or competition creator only.
    pub async fn set_participant_status(
        &self,
        caller: &AuthUser,
        id: i32,
        user_id: i32,
        req: UpdateParticipantRequest,
    ) -> Result<ParticipantResponse, AppError> {
        let competition = find_competition(self.db, id).await?;
        if !caller.owns_or_admin(competition.created_by) {
            return Err(AppError::Forbidden(
                "Not authorized to manage this competition".into(),
            ));
        }

        let participant = competition_participant::Entity::find_by_id((id, user_id))
            .one(self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Participant not found".into()))?;

        let mut active: competition_participant::ActiveModel = participant.into();
        active.status = Set(req.status);
        let participant = active.update(self.db).await?;

        info!(
            competition_id = id,
            participant_id = user_id,
            status = ?req.status,
            "Participant status updated"
        );

        let user = user_summary(self.db, user_id).await?;
        Ok(ParticipantResponse::from_model(participant, user, true))
    }
}
