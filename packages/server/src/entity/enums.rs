use std::fmt;
use std::str::FromStr;

use sea_orm::prelude::StringLen;
use serde::{Deserialize, Serialize};

/// Closed set of content categories.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    utoipa::ToSchema,
    sea_orm::DeriveActiveEnum,
    sea_orm::EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[sea_orm(string_value = "history")]
    History,
    #[sea_orm(string_value = "fun")]
    Fun,
    #[sea_orm(string_value = "memes")]
    Memes,
    #[sea_orm(string_value = "festivals")]
    Festivals,
    #[sea_orm(string_value = "travel")]
    Travel,
    #[sea_orm(string_value = "food")]
    Food,
    #[sea_orm(string_value = "culture")]
    Culture,
    #[sea_orm(string_value = "other")]
    Other,
}

impl Category {
    pub const ALL: &'static [Category] = &[
        Self::History,
        Self::Fun,
        Self::Memes,
        Self::Festivals,
        Self::Travel,
        Self::Food,
        Self::Culture,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::History => "history",
            Self::Fun => "fun",
            Self::Memes => "memes",
            Self::Festivals => "festivals",
            Self::Travel => "travel",
            Self::Food => "food",
            Self::Culture => "culture",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| {
                let allowed: Vec<&str> = Self::ALL.iter().map(|c| c.as_str()).collect();
                format!("Category must be one of: {}", allowed.join(", "))
            })
    }
}

/// Publication lifecycle of a content item.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    utoipa::ToSchema,
    sea_orm::DeriveActiveEnum,
    sea_orm::EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[default]
    #[sea_orm(string_value = "published")]
    Published,
    #[sea_orm(string_value = "archived")]
    Archived,
}

/// Admin-set competition status. No transitions are enforced.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    utoipa::ToSchema,
    sea_orm::DeriveActiveEnum,
    sea_orm::EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum CompetitionStatus {
    #[default]
    #[sea_orm(string_value = "upcoming")]
    Upcoming,
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

/// Per-participant status inside a competition.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    utoipa::ToSchema,
    sea_orm::DeriveActiveEnum,
    sea_orm::EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum ParticipantStatus {
    #[default]
    #[sea_orm(string_value = "registered")]
    Registered,
    #[sea_orm(string_value = "submitted")]
    Submitted,
    #[sea_orm(string_value = "winner")]
    Winner,
}
