use std::collections::{BTreeMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::shared::{UserSummary, double_option, validate_non_empty, validate_text_field};
use crate::entity::enums::{CompetitionStatus, ParticipantStatus};
use crate::entity::{competition, competition_participant};
use crate::error::AppError;

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_TEXT_ANSWER_CHARS: usize = 1000;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Prize {
    #[schema(example = "1st")]
    pub position: String,
    #[schema(example = "Weekend trip for two")]
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Boolean,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extra registration question declared on a competition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomField {
    #[schema(example = "teamName")]
    pub field_name: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(untagged)]
pub enum AnswerValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl AnswerValue {
    fn matches(&self, field_type: FieldType) -> bool {
        matches!(
            (self, field_type),
            (Self::Bool(_), FieldType::Boolean)
                | (Self::Number(_), FieldType::Number)
                | (Self::Text(_), FieldType::Text)
        )
    }
}

/// Field name to answer. Ordered so stored JSON is stable.
pub type Answers = BTreeMap<String, AnswerValue>;

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum AnswerError {
    #[error("Missing answer for required field '{0}'")]
    MissingRequired(String),
    #[error("Unknown registration field '{0}'")]
    UnknownField(String),
    #[error("Answer for '{field}' must be a {expected}")]
    TypeMismatch { field: String, expected: FieldType },
    #[error("Answer for '{0}' must be at most {MAX_TEXT_ANSWER_CHARS} characters")]
    TooLong(String),
}

/// Reasons a registration is refused, checked in declaration order.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum RegistrationError {
    #[error("Registration deadline has passed")]
    DeadlinePassed,
    #[error("Competition is full")]
    Full,
    #[error("Already registered for this competition")]
    AlreadyRegistered,
    #[error(transparent)]
    Answers(#[from] AnswerError),
}

impl From<AnswerError> for AppError {
    fn from(err: AnswerError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<RegistrationError> for AppError {
    fn from(err: RegistrationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// Check `answers` against the declared fields.
pub fn validate_answers(fields: &[CustomField], answers: &Answers) -> Result<(), AnswerError> {
    for (name, value) in answers {
        let field = fields
            .iter()
            .find(|f| &f.field_name == name)
            .ok_or_else(|| AnswerError::UnknownField(name.clone()))?;
        if !value.matches(field.field_type) {
            return Err(AnswerError::TypeMismatch {
                field: name.clone(),
                expected: field.field_type,
            });
        }
        if let AnswerValue::Text(text) = value
            && text.chars().count() > MAX_TEXT_ANSWER_CHARS
        {
            return Err(AnswerError::TooLong(name.clone()));
        }
    }

    for field in fields.iter().filter(|f| f.required) {
        let present = match answers.get(&field.field_name) {
            Some(AnswerValue::Text(text)) => !text.trim().is_empty(),
            Some(_) => true,
            None => false,
        };
        if !present {
            return Err(AnswerError::MissingRequired(field.field_name.clone()));
        }
    }
    Ok(())
}

/// Deadline, capacity and duplicate gates for a registration attempt.
///
/// `participant_count` must be read under the same lock that guards the insert.
pub fn check_registration(
    now: DateTime<Utc>,
    deadline: DateTime<Utc>,
    max_participants: Option<i32>,
    participant_count: u64,
    already_registered: bool,
) -> Result<(), RegistrationError> {
    if now > deadline {
        return Err(RegistrationError::DeadlinePassed);
    }
    if let Some(cap) = max_participants
        && participant_count >= u64::try_from(cap).unwrap_or(0)
    {
        return Err(RegistrationError::Full);
    }
    if already_registered {
        return Err(RegistrationError::AlreadyRegistered);
    }
    Ok(())
}

pub fn validate_schedule(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    registration_deadline: DateTime<Utc>,
) -> Result<(), AppError> {
    if end < start {
        return Err(AppError::Validation(
            "End date must not be before start date".into(),
        ));
    }
    if registration_deadline > end {
        return Err(AppError::Validation(
            "Registration deadline must not be after end date".into(),
        ));
    }
    Ok(())
}

pub fn validate_custom_fields(fields: &[CustomField]) -> Result<(), AppError> {
    let mut seen = HashSet::new();
    for field in fields {
        let name = field.field_name.trim();
        if name.is_empty() {
            return Err(AppError::Validation(
                "Custom field name must not be empty".into(),
            ));
        }
        if !seen.insert(name) {
            return Err(AppError::Validation(format!(
                "Duplicate custom field '{name}'"
            )));
        }
    }
    Ok(())
}

/// Trim declared field names so answers are matched on the trimmed key.
pub fn normalize_custom_fields(fields: Vec<CustomField>) -> Vec<CustomField> {
    fields
        .into_iter()
        .map(|f| CustomField {
            field_name: f.field_name.trim().to_string(),
            ..f
        })
        .collect()
}

pub fn validate_prizes(prizes: &[Prize]) -> Result<(), AppError> {
    if prizes
        .iter()
        .any(|p| p.position.trim().is_empty() || p.description.trim().is_empty())
    {
        return Err(AppError::Validation(
            "Each prize needs a position and a description".into(),
        ));
    }
    Ok(())
}

fn validate_max_participants(max: Option<i32>) -> Result<(), AppError> {
    if matches!(max, Some(n) if n < 1) {
        return Err(AppError::Validation(
            "maxParticipants must be at least 1".into(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Request DTOs
// ---------------------------------------------------------------------------

#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCompetitionRequest {
    #[schema(example = "Best street food photo")]
    pub title: String,
    pub description: String,
    pub rules: String,
    #[serde(default)]
    pub prizes: Vec<Prize>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub registration_deadline: DateTime<Utc>,
    /// Omit or null for unlimited capacity.
    pub max_participants: Option<i32>,
    #[schema(example = "photography")]
    pub category: String,
    pub image: Option<String>,
    pub status: Option<CompetitionStatus>,
    #[serde(default)]
    pub custom_fields: Vec<CustomField>,
}

#[derive(Deserialize, Default, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCompetitionRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub rules: Option<String>,
    pub prizes: Option<Vec<Prize>>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub registration_deadline: Option<DateTime<Utc>>,
    /// `null` removes the cap.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i32>)]
    pub max_participants: Option<Option<i32>>,
    pub category: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub image: Option<Option<String>>,
    pub status: Option<CompetitionStatus>,
    pub custom_fields: Option<Vec<CustomField>>,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CompetitionListQuery {
    /// Only competitions with this status.
    pub status: Option<CompetitionStatus>,
}

#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct RegisterRequest {
    #[serde(default)]
    pub answers: Answers,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateParticipantRequest {
    pub status: ParticipantStatus,
}

pub fn validate_create_competition(req: &CreateCompetitionRequest) -> Result<(), AppError> {
    validate_text_field(&req.title, "Title", MAX_TITLE_CHARS)?;
    validate_non_empty(&req.description, "Description")?;
    validate_non_empty(&req.rules, "Rules")?;
    validate_non_empty(&req.category, "Category")?;
    validate_schedule(req.start_date, req.end_date, req.registration_deadline)?;
    validate_max_participants(req.max_participants)?;
    validate_prizes(&req.prizes)?;
    validate_custom_fields(&req.custom_fields)
}

/// Field-level checks only; the merged schedule is checked by the service.
pub fn validate_update_competition(req: &UpdateCompetitionRequest) -> Result<(), AppError> {
    if let Some(ref title) = req.title {
        validate_text_field(title, "Title", MAX_TITLE_CHARS)?;
    }
    if let Some(ref description) = req.description {
        validate_non_empty(description, "Description")?;
    }
    if let Some(ref rules) = req.rules {
        validate_non_empty(rules, "Rules")?;
    }
    if let Some(ref category) = req.category {
        validate_non_empty(category, "Category")?;
    }
    if let Some(max) = req.max_participants {
        validate_max_participants(max)?;
    }
    if let Some(ref prizes) = req.prizes {
        validate_prizes(prizes)?;
    }
    if let Some(ref fields) = req.custom_fields {
        validate_custom_fields(fields)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Response DTOs
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantResponse {
    pub user_id: i32,
    pub user: Option<UserSummary>,
    pub registered_at: DateTime<Utc>,
    /// Visible to admins, the competition creator and the participant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answers: Option<Answers>,
    pub status: ParticipantStatus,
}

impl ParticipantResponse {
    pub fn from_model(
        m: competition_participant::Model,
        user: Option<UserSummary>,
        show_answers: bool,
    ) -> Self {
        let answers = show_answers.then(|| serde_json::from_value(m.answers).unwrap_or_default());
        Self {
            user_id: m.user_id,
            user,
            registered_at: m.registered_at,
            answers,
            status: m.status,
        }
    }
}

#[derive(Clone, Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompetitionResponse {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub rules: String,
    pub prizes: Vec<Prize>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub registration_deadline: DateTime<Utc>,
    pub max_participants: Option<i32>,
    pub category: String,
    pub image: Option<String>,
    pub status: CompetitionStatus,
    pub custom_fields: Vec<CustomField>,
    pub creator: Option<UserSummary>,
    pub participant_count: u64,
    /// Only on the detail view.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participants: Option<Vec<ParticipantResponse>>,
    /// Whether the caller is registered. Present when the caller is authenticated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registered: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CompetitionResponse {
    pub fn from_model(
        m: competition::Model,
        creator: Option<UserSummary>,
        participant_count: u64,
    ) -> Self {
        Self {
            id: m.id,
            title: m.title,
            description: m.description,
            rules: m.rules,
            prizes: serde_json::from_value(m.prizes).unwrap_or_default(),
            start_date: m.start_date,
            end_date: m.end_date,
            registration_deadline: m.registration_deadline,
            max_participants: m.max_participants,
            category: m.category,
            image: m.image,
            status: m.status,
            custom_fields: serde_json::from_value(m.custom_fields).unwrap_or_default(),
            creator,
            participant_count,
            participants: None,
            registered: None,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CompetitionEnvelope {
    pub competition: CompetitionResponse,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CompetitionListResponse {
    pub competitions: Vec<CompetitionResponse>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ParticipantEnvelope {
    pub participant: ParticipantResponse,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RegisterResponse {
    #[schema(example = "Successfully registered for competition")]
    pub message: String,
    pub participant: ParticipantResponse,
}
