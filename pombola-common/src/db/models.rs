//! Database row models

use crate::ApproximateDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParliamentarySession {
    pub id: i64,
    pub slug: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceKind {
    pub id: i64,
    pub slug: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Place {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub kind_id: i64,
    pub parliamentary_session_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organisation {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub kind_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: i64,
    pub legal_name: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionTitle {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

/// A time-bounded association between a person and an organisation,
/// place and/or title
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub id: i64,
    pub person_id: i64,
    pub organisation_id: Option<i64>,
    pub place_id: Option<i64>,
    pub title_id: Option<i64>,
    pub category: String,
    /// External reference (e.g. IEBC candidate code); empty when untracked
    pub external_id: String,
    pub start_date: Option<ApproximateDate>,
    pub end_date: Option<ApproximateDate>,
}

impl Position {
    pub fn external_code(&self) -> Option<&str> {
        let code = self.external_id.trim();
        (!code.is_empty()).then_some(code)
    }
}
