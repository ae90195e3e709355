//! Matching candidates to people already in the database
//!
//! Candidate names are compared with every person's legal name using
//! Jaro-Winkler similarity. A high score only *proposes* a match; the
//! same-person review file has the final say.

use pombola_common::db::Person;
use pombola_common::slugify;
use sqlx::SqliteConnection;

use crate::db::people;
use crate::iebc::Candidate;
use crate::normalize::{normalize_name, title_case};
use crate::{ImportError, ImportResult};

/// A proposed match and its similarity score
#[derive(Debug, Clone, PartialEq)]
pub struct PersonMatch {
    pub person: Person,
    pub score: f64,
}

fn similarity(a: &str, b: &str) -> f64 {
    strsim::jaro_winkler(&a.trim().to_lowercase(), &b.trim().to_lowercase())
}

/// Best scoring person at or above `threshold`
///
/// Both "first names surname" and "surname first names" orderings are tried.
/// Ties go to the earliest person in `people`.
pub fn best_match<'a>(
    people: &'a [Person],
    first_names: &str,
    surname: &str,
    threshold: f64,
) -> Option<(&'a Person, f64)> {
    let forward = format!("{} {}", first_names, surname);
    let reversed = format!("{} {}", surname, first_names);

    let mut best: Option<(&Person, f64)> = None;
    for person in people {
        let legal_name = normalize_name(&person.legal_name);
        let score = similarity(&forward, &legal_name).max(similarity(&reversed, &legal_name));
        if score < threshold {
            continue;
        }
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((person, score));
        }
    }
    best
}

/// Look for an existing person resembling the candidate's names
pub async fn find_person_by_names(
    conn: &mut SqliteConnection,
    first_names: &str,
    surname: &str,
    threshold: f64,
) -> ImportResult<Option<PersonMatch>> {
    if first_names.is_empty() && surname.is_empty() {
        return Ok(None);
    }

    let everyone = people::all_people(conn).await?;
    let found = best_match(&everyone, first_names, surname, threshold).map(|(person, score)| {
        PersonMatch {
            person: person.clone(),
            score,
        }
    });

    if let Some(found) = &found {
        tracing::debug!(
            candidate = %format!("{} {}", first_names, surname).trim(),
            person = %found.person.legal_name,
            score = found.score,
            "Possible existing person"
        );
    }

    Ok(found)
}

/// Legal name for a new person: title-cased other names, then surname
pub fn legal_name_for(candidate: &Candidate) -> String {
    let first = normalize_name(&title_case(candidate.other_name.as_deref().unwrap_or("")));
    let surname = normalize_name(&title_case(candidate.surname.as_deref().unwrap_or("")));

    let mut legal_name = first;
    if !legal_name.is_empty() && !surname.is_empty() {
        legal_name.push(' ');
    }
    legal_name.push_str(&surname);
    legal_name
}

/// Create a person for a candidate with no existing counterpart
pub async fn make_new_person(conn: &mut SqliteConnection, candidate: &Candidate) -> ImportResult<Person> {
    let legal_name = legal_name_for(candidate);
    let base_slug = slugify(&legal_name);
    if base_slug.is_empty() {
        return Err(ImportError::InvalidCandidate {
            code: candidate.code.clone(),
            problem: "has no usable name".to_string(),
        });
    }

    let slug = people::unique_slug(conn, &base_slug).await?;
    let person = people::insert_person(conn, &legal_name, &slug).await?;

    tracing::info!(person = %person.legal_name, slug = %person.slug, code = %candidate.code, "Created person");
    Ok(person)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(id: i64, legal_name: &str) -> Person {
        Person {
            id,
            legal_name: legal_name.to_string(),
            slug: slugify(legal_name),
        }
    }

    fn candidate(other_name: Option<&str>, surname: Option<&str>) -> Candidate {
        Candidate {
            code: "C1".to_string(),
            other_name: other_name.map(str::to_string),
            surname: surname.map(str::to_string),
            contest_type: "mp".to_string(),
            party: None,
        }
    }

    #[test]
    fn test_exact_name_matches_regardless_of_case() {
        let people = vec![person(1, "John Mbadi"), person(2, "Jane Kamau")];
        let (found, score) = best_match(&people, "JOHN", "MBADI", 0.92).unwrap();
        assert_eq!(found.id, 1);
        assert!((score - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_surname_first_ordering_matches() {
        let people = vec![person(7, "Mbadi John")];
        let found = best_match(&people, "John", "Mbadi", 0.92);
        assert_eq!(found.map(|(p, _)| p.id), Some(7));
    }

    #[test]
    fn test_dissimilar_names_rejected() {
        let people = vec![person(1, "Peter Otieno")];
        assert!(best_match(&people, "Jane", "Kamau", 0.92).is_none());
    }

    #[test]
    fn test_tie_goes_to_earliest() {
        let people = vec![person(3, "Jane Kamau"), person(4, "Jane Kamau")];
        let (found, _) = best_match(&people, "Jane", "Kamau", 0.92).unwrap();
        assert_eq!(found.id, 3);
    }

    #[test]
    fn test_legal_name_for() {
        assert_eq!(
            legal_name_for(&candidate(Some("JOHN  MBADI"), Some("NG'ONGO"))),
            "John Mbadi Ng'Ongo"
        );
        assert_eq!(legal_name_for(&candidate(None, Some("ODHIAMBO"))), "Odhiambo");
        assert_eq!(legal_name_for(&candidate(Some("amina"), None)), "Amina");
        assert_eq!(legal_name_for(&candidate(None, None)), "");
    }
}
