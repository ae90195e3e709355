//! Contest type mapping
//!
//! Each IEBC contest type corresponds to a kind of place, the parliamentary
//! session those places belong to, and the aspirant position title used for
//! its candidates.

use pombola_common::config::{IebcConfig, RaceConfig};
use std::collections::{HashMap, HashSet};

/// Result of looking up a contest type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaceLookup<'a> {
    Mapped(&'a RaceConfig),
    Ignored,
    Unknown,
}

#[derive(Debug, Clone)]
pub struct RaceTable {
    by_contest: HashMap<String, RaceConfig>,
    ignored: HashSet<String>,
}

/// Contest types are compared trimmed and lowercased
pub fn contest_key(contest_type: &str) -> String {
    contest_type.trim().to_lowercase()
}

fn race(contest: &str, kind: &str, session: &str, title: &str, race_type: &str) -> RaceConfig {
    RaceConfig {
        contest_type: contest.to_string(),
        place_kind: kind.to_string(),
        session: session.to_string(),
        title: title.to_string(),
        race_type: race_type.to_string(),
    }
}

impl RaceTable {
    pub fn new(races: Vec<RaceConfig>, ignored: &[String]) -> Self {
        Self {
            by_contest: races
                .into_iter()
                .map(|r| (contest_key(&r.contest_type), r))
                .collect(),
            ignored: ignored.iter().map(|c| contest_key(c)).collect(),
        }
    }

    /// Races of the 2013 Kenyan general election
    pub fn kenya_2013() -> Self {
        Self::new(
            vec![
                race("governor", "county", "s2013", "aspirant-governor", "Governor"),
                race("senator", "county", "s2013", "aspirant-senator", "Senator"),
                race(
                    "women representative",
                    "county",
                    "s2013",
                    "aspirant-women-representative",
                    "Women Representative",
                ),
                race("mp", "constituency", "na2013", "aspirant-mp", "National Assembly"),
                race(
                    "ward representative",
                    "ward",
                    "na2013",
                    "aspirant-ward-representative",
                    "County Assembly",
                ),
            ],
            &["president".to_string()],
        )
    }

    /// Table from configuration, falling back to the built-in races
    pub fn from_config(config: &IebcConfig) -> Self {
        if config.races.is_empty() {
            let mut table = Self::kenya_2013();
            table.ignored = config.ignored_contest_types.iter().map(|c| contest_key(c)).collect();
            table
        } else {
            Self::new(config.races.clone(), &config.ignored_contest_types)
        }
    }

    pub fn lookup(&self, contest_type: &str) -> RaceLookup<'_> {
        let key = contest_key(contest_type);
        if self.ignored.contains(&key) {
            return RaceLookup::Ignored;
        }
        match self.by_contest.get(&key) {
            Some(race) => RaceLookup::Mapped(race),
            None => RaceLookup::Unknown,
        }
    }

    pub fn len(&self) -> usize {
        self.by_contest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_contest.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let table = RaceTable::kenya_2013();
        match table.lookup("  Ward Representative ") {
            RaceLookup::Mapped(race) => {
                assert_eq!(race.place_kind, "ward");
                assert_eq!(race.title, "aspirant-ward-representative");
            }
            other => panic!("unexpected lookup result: {:?}", other),
        }
    }

    #[test]
    fn test_president_ignored_and_unknown_reported() {
        let table = RaceTable::kenya_2013();
        assert_eq!(table.lookup("PRESIDENT"), RaceLookup::Ignored);
        assert_eq!(table.lookup("mayor"), RaceLookup::Unknown);
        assert_eq!(table.len(), 5);
    }

    #[test]
    fn test_config_overrides_table() {
        let config = IebcConfig {
            races: vec![race("mca", "ward", "ca2013", "aspirant-mca", "MCA")],
            ignored_contest_types: vec![],
            ..Default::default()
        };

        let table = RaceTable::from_config(&config);

        assert!(matches!(table.lookup("MCA"), RaceLookup::Mapped(_)));
        assert_eq!(table.lookup("mp"), RaceLookup::Unknown);
        assert_eq!(table.lookup("president"), RaceLookup::Unknown);
    }

    #[test]
    fn test_default_config_uses_builtin_races() {
        let table = RaceTable::from_config(&IebcConfig::default());
        assert!(matches!(table.lookup("senator"), RaceLookup::Mapped(_)));
        assert_eq!(table.lookup("president"), RaceLookup::Ignored);
    }
}
