//! Per-race reconciliation
//!
//! A race is the set of candidates for one contest type in one place. The
//! positions currently held for that place and aspirant title are compared
//! with the candidates the IEBC reports, keyed by candidate code:
//!
//! - codes only in the feed get a position (and a person, and a party
//!   membership, when needed)
//! - codes only in the database have their positions ended yesterday
//! - codes in both are left alone
//!
//! Every candidate is resolved to a person before anything is written, so a
//! race that needs manual review makes no changes at all.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Datelike;
use pombola_common::config::RaceConfig;
use pombola_common::dates::yesterday;
use pombola_common::db::{Organisation, ParliamentarySession, Person, Place, PlaceKind, Position};
use pombola_common::{slugify, ApproximateDate};
use serde::Serialize;
use sqlx::SqliteConnection;

use crate::corrections::Corrections;
use crate::db::positions::{self, NewPosition};
use crate::db::{organisations, places};
use crate::iebc::Candidate;
use crate::importer::ImportSettings;
use crate::normalize::{place_slug, title_case};
use crate::person_matcher::{find_person_by_names, make_new_person};
use crate::same_person::{SamePersonChecker, Verdict};
use crate::{ImportError, ImportResult};

/// Organisation every aspirant position belongs to
pub const ASPIRANT_ORGANISATION: &str = "REPUBLIC OF KENYA";
pub const POLITICAL_CATEGORY: &str = "political";
pub const PARTY_KIND: &str = "party";
pub const PARTY_MEMBER_TITLE: &str = "Member";

/// What a race needs doing, by candidate code
#[derive(Debug, Clone, PartialEq)]
pub struct RacePlan<'a> {
    /// Candidates with no tracked position, ordered by code
    pub to_add: Vec<&'a Candidate>,
    /// Tracked positions whose code is no longer reported, ordered by code
    pub to_end: Vec<&'a Position>,
    /// Codes tracked and still reported
    pub unchanged: Vec<String>,
}

/// Compare tracked positions with reported candidates
///
/// Positions without an external code are not tracked and never ended.
/// Several positions may carry the same code; all of them are ended when the
/// code disappears. A code reported twice is added once.
pub fn plan_race<'a>(existing: &'a [Position], candidates: &'a [Candidate]) -> RacePlan<'a> {
    let mut tracked: BTreeMap<&str, Vec<&Position>> = BTreeMap::new();
    for position in existing {
        if let Some(code) = position.external_code() {
            tracked.entry(code).or_default().push(position);
        }
    }

    let mut reported: BTreeMap<&str, &Candidate> = BTreeMap::new();
    for candidate in candidates {
        reported.entry(candidate.code.trim()).or_insert(candidate);
    }

    let to_add = reported
        .iter()
        .filter(|(code, _)| !tracked.contains_key(*code))
        .map(|(_, candidate)| *candidate)
        .collect();

    let to_end = tracked
        .iter()
        .filter(|(code, _)| !reported.contains_key(*code))
        .flat_map(|(_, positions)| positions.iter().copied())
        .collect();

    let unchanged = tracked
        .keys()
        .filter(|code| reported.contains_key(*code))
        .map(|code| code.to_string())
        .collect();

    RacePlan {
        to_add,
        to_end,
        unchanged,
    }
}

/// Counts of what reconciling one race did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RaceOutcome {
    pub candidates_added: usize,
    pub candidates_removed: usize,
    pub candidates_unchanged: usize,
    pub people_created: usize,
    pub parties_created: usize,
    pub positions_created: usize,
    pub positions_updated: usize,
    pub positions_ended: usize,
}

impl RaceOutcome {
    pub fn absorb(&mut self, other: &RaceOutcome) {
        self.candidates_added += other.candidates_added;
        self.candidates_removed += other.candidates_removed;
        self.candidates_unchanged += other.candidates_unchanged;
        self.people_created += other.people_created;
        self.parties_created += other.parties_created;
        self.positions_created += other.positions_created;
        self.positions_updated += other.positions_updated;
        self.positions_ended += other.positions_ended;
    }
}

/// How a new candidate maps to a person
enum Resolution {
    Existing(Person),
    NewPerson,
}

/// Reference rows a race needs
struct RaceReferences {
    kind: PlaceKind,
    session: ParliamentarySession,
    title_id: i64,
    organisation_id: i64,
}

pub struct Reconciler<'a> {
    corrections: &'a Corrections,
    checker: &'a mut SamePersonChecker,
    settings: &'a ImportSettings,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        corrections: &'a Corrections,
        checker: &'a mut SamePersonChecker,
        settings: &'a ImportSettings,
    ) -> Self {
        Self {
            corrections,
            checker,
            settings,
        }
    }

    /// Bring one race in line with the reported candidates
    pub async fn reconcile_race(
        &mut self,
        conn: &mut SqliteConnection,
        area_name: &str,
        race: &RaceConfig,
        candidates: &[Candidate],
    ) -> ImportResult<RaceOutcome> {
        let refs = load_references(conn, race).await?;
        let place = self.match_place(conn, area_name, &refs.kind, &refs.session).await?;
        let today = self.settings.today;

        let existing =
            positions::active_positions_for_place_title(conn, place.id, refs.title_id, today).await?;
        let plan = plan_race(&existing, candidates);

        tracing::debug!(
            place = %place.slug,
            race = %race.race_type,
            add = plan.to_add.len(),
            end = plan.to_end.len(),
            unchanged = plan.unchanged.len(),
            "Planned race"
        );

        let resolutions = self.resolve_people(conn, &plan.to_add, &place, race).await?;

        let mut outcome = RaceOutcome {
            candidates_added: plan.to_add.len(),
            candidates_removed: plan.to_end.len(),
            candidates_unchanged: plan.unchanged.len(),
            ..Default::default()
        };

        // Codes whose positions must not be re-tagged or ended by an addition
        let mut claimed: BTreeSet<String> = plan.unchanged.iter().cloned().collect();
        // Positions an addition re-tagged or ended; retirement leaves them alone
        let mut handled: BTreeSet<i64> = BTreeSet::new();

        for (candidate, resolution) in plan.to_add.iter().zip(resolutions) {
            let person = match resolution {
                Resolution::Existing(person) => person,
                Resolution::NewPerson => {
                    outcome.people_created += 1;
                    make_new_person(conn, candidate).await?
                }
            };

            let code = candidate.code.trim();
            self.update_parties(conn, &person, candidate.party_name(), &mut outcome)
                .await?;
            self.add_aspirant(conn, &person, &place, &refs, code, &claimed, &mut handled, &mut outcome)
                .await?;
            claimed.insert(code.to_string());
        }

        let ended = yesterday(today);
        for position in plan.to_end.iter().filter(|p| !handled.contains(&p.id)) {
            positions::set_end_date(conn, position.id, &ended).await?;
            outcome.positions_ended += 1;
            tracing::info!(
                place = %place.slug,
                position = position.id,
                code = position.external_code().unwrap_or_default(),
                "Ended aspirant position"
            );
        }

        Ok(outcome)
    }

    /// Decide who every new candidate is, queueing doubtful matches for review
    async fn resolve_people(
        &mut self,
        conn: &mut SqliteConnection,
        candidates: &[&Candidate],
        place: &Place,
        race: &RaceConfig,
    ) -> ImportResult<Vec<Resolution>> {
        let mut resolutions = Vec::with_capacity(candidates.len());
        let mut needs_review = Vec::new();

        for candidate in candidates {
            if candidate.code.trim().is_empty() {
                return Err(ImportError::InvalidCandidate {
                    code: String::new(),
                    problem: format!("({}) has no candidate code", candidate.full_name()),
                });
            }
            let first_names = candidate.first_names();
            let surname = candidate.surname();
            if first_names.is_empty() && surname.is_empty() {
                return Err(ImportError::InvalidCandidate {
                    code: candidate.code.clone(),
                    problem: "has no usable name".to_string(),
                });
            }

            let found = find_person_by_names(
                conn,
                &first_names,
                &surname,
                self.settings.person_match_threshold,
            )
            .await?;

            let resolution = match found {
                None => Resolution::NewPerson,
                Some(found) => match self.checker.check(candidate, place, &race.race_type, &found.person) {
                    Verdict::Same => Resolution::Existing(found.person),
                    Verdict::Different => Resolution::NewPerson,
                    Verdict::NeedsReview => {
                        needs_review.push(candidate.full_name());
                        Resolution::NewPerson
                    }
                },
            };
            resolutions.push(resolution);
        }

        if !needs_review.is_empty() {
            return Err(ImportError::NeedsReview(needs_review));
        }
        Ok(resolutions)
    }

    /// Tag one of the person's matching aspirant positions with the code, or create one
    ///
    /// Positions already carrying a claimed code are left alone. Of the rest,
    /// the oldest is re-tagged and any duplicates end yesterday.
    #[allow(clippy::too_many_arguments)]
    async fn add_aspirant(
        &self,
        conn: &mut SqliteConnection,
        person: &Person,
        place: &Place,
        refs: &RaceReferences,
        code: &str,
        claimed: &BTreeSet<String>,
        handled: &mut BTreeSet<i64>,
        outcome: &mut RaceOutcome,
    ) -> ImportResult<()> {
        let today = self.settings.today;
        let matching: Vec<Position> = positions::active_matching_positions(
            conn,
            person.id,
            refs.organisation_id,
            place.id,
            refs.title_id,
            POLITICAL_CATEGORY,
            today,
        )
        .await?
        .into_iter()
        .filter(|p| !p.external_code().is_some_and(|c| claimed.contains(c)))
        .collect();

        let Some((kept, duplicates)) = matching.split_first() else {
            let id = positions::insert_position(
                conn,
                &NewPosition {
                    person_id: person.id,
                    organisation_id: Some(refs.organisation_id),
                    place_id: Some(place.id),
                    title_id: Some(refs.title_id),
                    category: POLITICAL_CATEGORY.to_string(),
                    external_id: code.to_string(),
                    start_date: ApproximateDate::exact(today),
                    end_date: ApproximateDate::Future,
                },
            )
            .await?;
            outcome.positions_created += 1;
            tracing::info!(place = %place.slug, person = %person.legal_name, code, position = id, "Created aspirant position");
            return Ok(());
        };

        positions::tag_position(conn, kept.id, code).await?;
        handled.insert(kept.id);
        outcome.positions_updated += 1;
        tracing::info!(place = %place.slug, person = %person.legal_name, code, position = kept.id, "Tagged existing aspirant position");

        let ended = yesterday(today);
        for duplicate in duplicates {
            positions::set_end_date(conn, duplicate.id, &ended).await?;
            handled.insert(duplicate.id);
            outcome.positions_ended += 1;
            tracing::info!(place = %place.slug, person = %person.legal_name, position = duplicate.id, "Ended duplicate aspirant position");
        }

        Ok(())
    }

    /// Make the person's current party memberships agree with the feed
    async fn update_parties(
        &self,
        conn: &mut SqliteConnection,
        person: &Person,
        party_name: Option<&str>,
        outcome: &mut RaceOutcome,
    ) -> ImportResult<()> {
        let today = self.settings.today;
        let ended = yesterday(today);
        let memberships = positions::active_party_memberships(conn, person.id, today).await?;

        let Some(party_name) = party_name else {
            for membership in &memberships {
                positions::set_end_date(conn, membership.id, &ended).await?;
                outcome.positions_ended += 1;
            }
            return Ok(());
        };

        let party = self.match_party(conn, party_name, outcome).await?;

        let mut has_membership = false;
        for membership in &memberships {
            if membership.organisation_id == Some(party.id) {
                has_membership = true;
                if membership.end_date != Some(ApproximateDate::Future) {
                    positions::set_end_date(conn, membership.id, &ApproximateDate::Future).await?;
                    outcome.positions_updated += 1;
                }
            } else {
                positions::set_end_date(conn, membership.id, &ended).await?;
                outcome.positions_ended += 1;
                tracing::info!(person = %person.legal_name, position = membership.id, "Ended previous party membership");
            }
        }

        if !has_membership {
            let member = positions::find_title_by_name(conn, PARTY_MEMBER_TITLE)
                .await?
                .ok_or_else(|| ImportError::MissingReference(format!("position title '{}'", PARTY_MEMBER_TITLE)))?;

            positions::insert_position(
                conn,
                &NewPosition {
                    person_id: person.id,
                    organisation_id: Some(party.id),
                    place_id: None,
                    title_id: Some(member.id),
                    category: POLITICAL_CATEGORY.to_string(),
                    external_id: String::new(),
                    start_date: ApproximateDate::exact(today),
                    end_date: ApproximateDate::Future,
                },
            )
            .await?;
            outcome.positions_created += 1;
            tracing::info!(person = %person.legal_name, party = %party.name, "Created party membership");
        }

        Ok(())
    }

    /// The place a race is contested in
    pub async fn match_place(
        &self,
        conn: &mut SqliteConnection,
        area_name: &str,
        kind: &PlaceKind,
        session: &ParliamentarySession,
    ) -> ImportResult<Place> {
        let name = self.corrections.places.correct(area_name);
        let slug = place_slug(name, &kind.slug);

        let place = places::find_place(conn, &slug, kind.id, session.id).await?;
        place.ok_or_else(|| ImportError::PlaceNotFound {
            slug,
            kind: kind.slug.clone(),
            session: session.slug.clone(),
        })
    }

    /// The party a candidate stands for, created when unknown and allowed
    pub async fn match_party(
        &self,
        conn: &mut SqliteConnection,
        party_name: &str,
        outcome: &mut RaceOutcome,
    ) -> ImportResult<Organisation> {
        let name = self.corrections.parties.correct(party_name);
        let kind_id = organisations::find_organisation_kind_id(conn, PARTY_KIND)
            .await?
            .ok_or_else(|| ImportError::MissingReference(format!("organisation kind '{}'", PARTY_KIND)))?;

        let mut matches = organisations::find_by_name_iexact(conn, kind_id, name).await?;
        if matches.is_empty() {
            matches = organisations::find_by_name_istartswith(conn, kind_id, name).await?;
        }

        match matches.len() {
            0 => {
                if !self.settings.create_missing_parties {
                    return Err(ImportError::PartyNotFound(name.to_string()));
                }
                let display_name = title_case(name);
                let base_slug = slugify(&display_name);
                if base_slug.is_empty() {
                    return Err(ImportError::PartyNotFound(name.to_string()));
                }
                let slug = organisations::unique_slug(conn, &base_slug).await?;
                let started = ApproximateDate::year(self.settings.today.year());
                let party =
                    organisations::insert_organisation(conn, &display_name, &slug, kind_id, &started).await?;
                outcome.parties_created += 1;
                tracing::info!(party = %party.name, slug = %party.slug, "Created party");
                Ok(party)
            }
            1 => Ok(matches.remove(0)),
            _ => Err(ImportError::AmbiguousParty {
                name: name.to_string(),
                matches: matches.into_iter().map(|o| o.name).collect(),
            }),
        }
    }
}

async fn load_references(conn: &mut SqliteConnection, race: &RaceConfig) -> ImportResult<RaceReferences> {
    let missing = |what: &str, slug: &str| ImportError::MissingReference(format!("{} '{}'", what, slug));

    let kind = places::find_place_kind(conn, &race.place_kind)
        .await?
        .ok_or_else(|| missing("place kind", &race.place_kind))?;
    let session = places::find_session(conn, &race.session)
        .await?
        .ok_or_else(|| missing("parliamentary session", &race.session))?;
    let title = positions::find_title_by_slug(conn, &race.title)
        .await?
        .ok_or_else(|| missing("position title", &race.title))?;
    let organisation = organisations::find_organisation_by_name(conn, ASPIRANT_ORGANISATION)
        .await?
        .ok_or_else(|| missing("organisation", ASPIRANT_ORGANISATION))?;

    Ok(RaceReferences {
        kind,
        session,
        title_id: title.id,
        organisation_id: organisation.id,
    })
}
