//! IEBC API response types
//!
//! Only the fields the importer uses are modelled; everything else in the
//! responses is ignored.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::normalize::normalize_name;

/// Electoral area levels queried for candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AreaType {
    County,
    Constituency,
    Ward,
}

impl AreaType {
    /// Order in which a run walks the area levels
    pub const ALL: [AreaType; 3] = [AreaType::County, AreaType::Constituency, AreaType::Ward];

    pub fn as_str(&self) -> &'static str {
        match self {
            AreaType::County => "county",
            AreaType::Constituency => "constituency",
            AreaType::Ward => "ward",
        }
    }
}

impl fmt::Display for AreaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `/county/`, `/constituency/`, `/ward/` response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AreaList {
    pub region: Region,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Region {
    #[serde(default)]
    pub locations: Vec<Area>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Area {
    #[serde(deserialize_with = "string_or_number")]
    pub code: String,
    pub name: String,
}

/// `/candidate/` response: one entry per race in the area
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CandidateList {
    #[serde(default)]
    pub candidates: Vec<Race>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Race {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Candidate {
    /// Stable IEBC candidate code
    #[serde(deserialize_with = "string_or_number")]
    pub code: String,
    #[serde(default)]
    pub other_name: Option<String>,
    #[serde(default)]
    pub surname: Option<String>,
    pub contest_type: String,
    #[serde(default)]
    pub party: Option<Party>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Party {
    #[serde(default)]
    pub name: Option<String>,
}

impl Candidate {
    pub fn first_names(&self) -> String {
        normalize_name(self.other_name.as_deref().unwrap_or(""))
    }

    pub fn surname(&self) -> String {
        normalize_name(self.surname.as_deref().unwrap_or(""))
    }

    /// Names as published, normalized for display and matching
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_names(), self.surname())
            .trim()
            .to_string()
    }

    /// Party named in the feed, if any
    pub fn party_name(&self) -> Option<&str> {
        self.party
            .as_ref()
            .and_then(|p| p.name.as_deref())
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// Codes appear as strings in some responses and bare numbers in others
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number code, got {}",
            other
        ))),
    }
}
