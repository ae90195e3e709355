//! End-to-end reconciliation runs against an in-memory database

mod helpers;

use helpers::*;
use pombola_common::db::settings::{get_setting, LAST_ASPIRANT_IMPORT_KEY};
use pombola_iebc::corrections::{CorrectionTable, Corrections};
use pombola_iebc::iebc::AreaType;
use pombola_iebc::ImportError;

fn nairobi_governors() -> StaticFeed {
    StaticFeed::default().with_race(
        AreaType::County,
        "047",
        "NAIROBI",
        vec![
            candidate("G1", "EVANS", "KIDERO", "Governor", Some("ORANGE DEMOCRATIC MOVEMENT")),
            candidate("G2", "FERDINAND", "WAITITU", "Governor", Some("WIPER DEMOCRATIC MOVEMENT")),
        ],
    )
}

#[tokio::test]
async fn test_new_candidates_get_people_parties_and_positions() {
    let pool = test_pool().await;
    let seed = seed(&pool).await;
    let data = DataDir::new();

    let report = importer(nairobi_governors(), &data, settings(true))
        .run(&pool)
        .await
        .unwrap();

    assert!(report.committed);
    assert_eq!(report.races_processed, 1);
    assert_eq!(report.races_succeeded, 1);
    assert!(report.is_clean());
    assert_eq!(report.totals.people_created, 2);
    assert_eq!(report.totals.parties_created, 1);
    // Two aspirant positions and two party memberships
    assert_eq!(report.totals.positions_created, 4);

    let people: Vec<String> = sqlx::query_scalar("SELECT legal_name FROM people ORDER BY legal_name")
        .fetch_all(&pool)
        .await
        .unwrap();
    assert_eq!(people, vec!["Evans Kidero", "Ferdinand Waititu"]);

    let (code, start, end): (String, String, String) = sqlx::query_as(
        r#"
        SELECT p.external_id, p.start_date, p.end_date FROM positions p
        JOIN people pe ON pe.id = p.person_id
        WHERE pe.slug = 'evans-kidero' AND p.place_id = ? AND p.title_id = ? AND p.organisation_id = ?
        "#,
    )
    .bind(seed.nairobi_county)
    .bind(seed.governor_title)
    .bind(seed.republic)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(code, "G1");
    assert_eq!(start, TODAY);
    assert_eq!(end, FUTURE);

    let wiper: (String, String, String) =
        sqlx::query_as("SELECT name, slug, started FROM organisations WHERE slug = 'wiper-democratic-movement'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(wiper.0, "Wiper Democratic Movement");
    assert_eq!(wiper.2, "2013-00-00");

    let odm_members = count(
        &pool,
        &format!(
            "SELECT COUNT(*) FROM positions WHERE organisation_id = {} AND title_id = {} AND end_date = '{}'",
            seed.odm, seed.member_title, FUTURE
        ),
    )
    .await;
    assert_eq!(odm_members, 1);
}

#[tokio::test]
async fn test_dry_run_reports_changes_but_keeps_database() {
    let pool = test_pool().await;
    seed(&pool).await;
    let data = DataDir::new();

    let report = importer(nairobi_governors(), &data, settings(false))
        .run(&pool)
        .await
        .unwrap();

    assert!(!report.committed);
    assert_eq!(report.totals.people_created, 2);
    assert_eq!(report.totals.positions_created, 4);

    assert_eq!(count(&pool, "SELECT COUNT(*) FROM people").await, 0);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM positions").await, 0);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM import_runs").await, 0);
    assert_eq!(
        count(&pool, "SELECT COUNT(*) FROM organisations WHERE slug = 'wiper-democratic-movement'").await,
        0
    );
}

#[tokio::test]
async fn test_committed_run_is_recorded() {
    let pool = test_pool().await;
    seed(&pool).await;
    let data = DataDir::new();

    importer(nairobi_governors(), &data, settings(true))
        .run(&pool)
        .await
        .unwrap();

    assert_eq!(
        count(&pool, "SELECT COUNT(*) FROM import_runs WHERE source = 'iebc-aspirants' AND committed = 1").await,
        1
    );

    let mut conn = pool.acquire().await.unwrap();
    let last: Option<String> = get_setting(&mut conn, LAST_ASPIRANT_IMPORT_KEY).await.unwrap();
    assert!(last.is_some());
}

#[tokio::test]
async fn test_dropped_candidates_end_yesterday_and_reported_ones_stay() {
    let pool = test_pool().await;
    let seed = seed(&pool).await;
    let data = DataDir::new();

    let kept_person = insert_person(&pool, "Amina Mohamed", "amina-mohamed").await;
    let dropped_person = insert_person(&pool, "Peter Kenneth", "peter-kenneth").await;
    let untracked_person = insert_person(&pool, "Margaret Wanjiru", "margaret-wanjiru").await;

    let kept = insert_position(&pool, kept_person, seed.republic, Some(seed.westlands), seed.mp_title, "M1", FUTURE).await;
    let dropped =
        insert_position(&pool, dropped_person, seed.republic, Some(seed.westlands), seed.mp_title, "M2", FUTURE).await;
    let untracked =
        insert_position(&pool, untracked_person, seed.republic, Some(seed.westlands), seed.mp_title, "", FUTURE).await;

    let feed = StaticFeed::default().with_race(
        AreaType::Constituency,
        "277",
        "WESTLANDS",
        vec![candidate("M1", "AMINA", "MOHAMED", "MP", None)],
    );

    let report = importer(feed, &data, settings(true)).run(&pool).await.unwrap();

    assert_eq!(report.totals.candidates_unchanged, 1);
    assert_eq!(report.totals.candidates_removed, 1);
    assert_eq!(report.totals.positions_ended, 1);
    assert_eq!(report.totals.people_created, 0);

    assert_eq!(end_date_of(&pool, kept).await, FUTURE);
    assert_eq!(end_date_of(&pool, dropped).await, YESTERDAY);
    assert_eq!(end_date_of(&pool, untracked).await, FUTURE);
}

#[tokio::test]
async fn test_unmatched_place_fails_only_its_race() {
    let pool = test_pool().await;
    seed(&pool).await;
    let data = DataDir::new();

    let feed = nairobi_governors().with_race(
        AreaType::County,
        "099",
        "ATLANTIS",
        vec![candidate("X1", "NOBODY", "ATALL", "Governor", None)],
    );

    let report = importer(feed, &data, settings(true)).run(&pool).await.unwrap();

    assert_eq!(report.races_processed, 2);
    assert_eq!(report.races_succeeded, 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].area_name, "ATLANTIS");
    assert_eq!(report.failed[0].area_type, AreaType::County);
    assert!(report.failed[0].reason.contains("atlantis-county"));

    // Nairobi still went through; nothing from Atlantis was kept
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM people").await, 2);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM people WHERE slug = 'nobody-atall'").await, 0);
}

#[tokio::test]
async fn test_place_corrections_are_applied() {
    let pool = test_pool().await;
    let seed = seed(&pool).await;
    let data = DataDir::new();

    let feed = StaticFeed::default().with_race(
        AreaType::Ward,
        "1402",
        "KITISURU WARD",
        vec![candidate("W1", "ZIPPORAH", "OTIENO", "Ward Representative", None)],
    );
    let corrections = Corrections {
        places: CorrectionTable::from_pairs([("KITISURU WARD", "Kitisuru")]),
        parties: CorrectionTable::default(),
    };

    let report = importer_with_corrections(feed, &data, settings(true), corrections)
        .run(&pool)
        .await
        .unwrap();

    assert!(report.is_clean(), "unexpected failures: {:?}", report.failed);
    let on_ward = count(
        &pool,
        &format!("SELECT COUNT(*) FROM positions WHERE place_id = {} AND external_id = 'W1'", seed.kitisuru),
    )
    .await;
    assert_eq!(on_ward, 1);
}

#[tokio::test]
async fn test_similar_person_defers_race_until_reviewed() {
    let pool = test_pool().await;
    let seed = seed(&pool).await;
    let data = DataDir::new();
    let jane = insert_person(&pool, "Jane Wanjiru Kamau", "jane-wanjiru-kamau").await;

    let feed = || {
        StaticFeed::default().with_race(
            AreaType::County,
            "047",
            "NAIROBI",
            vec![
                candidate("G7", "JANE WANJIRU", "KAMAU", "Governor", None),
                candidate("G8", "FERDINAND", "WAITITU", "Governor", None),
            ],
        )
    };

    // First run: the lookalike is queued and nothing in the race changes
    let report = importer(feed(), &data, settings(true)).run(&pool).await.unwrap();

    assert_eq!(report.deferred.len(), 1);
    assert_eq!(report.races_succeeded, 0);
    assert!(report.review_file.is_some());
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM people").await, 1);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM positions").await, 0);

    let review = std::fs::read_to_string(data.review_path()).unwrap();
    assert!(review.contains("G7,JANE WANJIRU KAMAU,nairobi-county,Governor,jane-wanjiru-kamau,Jane Wanjiru Kamau,"));

    // Someone confirms the match
    data.write_review_file(
        "G7,JANE WANJIRU KAMAU,nairobi-county,Governor,jane-wanjiru-kamau,Jane Wanjiru Kamau,yes\n",
    );

    let report = importer(feed(), &data, settings(true)).run(&pool).await.unwrap();

    assert!(report.is_clean());
    assert_eq!(report.totals.people_created, 1);
    let jane_positions = count(
        &pool,
        &format!(
            "SELECT COUNT(*) FROM positions WHERE person_id = {} AND title_id = {} AND external_id = 'G7'",
            jane, seed.governor_title
        ),
    )
    .await;
    assert_eq!(jane_positions, 1);
}

#[tokio::test]
async fn test_rejected_match_creates_new_person() {
    let pool = test_pool().await;
    seed(&pool).await;
    let data = DataDir::new();
    insert_person(&pool, "Jane Wanjiru Kamau", "jane-wanjiru-kamau").await;
    data.write_review_file(
        "G7,JANE WANJIRU KAMAU,nairobi-county,Governor,jane-wanjiru-kamau,Jane Wanjiru Kamau,no\n",
    );

    let feed = StaticFeed::default().with_race(
        AreaType::County,
        "047",
        "NAIROBI",
        vec![candidate("G7", "JANE WANJIRU", "KAMAU", "Governor", None)],
    );

    let report = importer(feed, &data, settings(true)).run(&pool).await.unwrap();

    assert!(report.is_clean());
    let slugs: Vec<String> = sqlx::query_scalar("SELECT slug FROM people ORDER BY id")
        .fetch_all(&pool)
        .await
        .unwrap();
    assert_eq!(slugs, vec!["jane-wanjiru-kamau", "jane-wanjiru-kamau-2"]);
}

#[tokio::test]
async fn test_confirmed_person_positions_and_parties_updated() {
    let pool = test_pool().await;
    let seed = seed(&pool).await;
    let data = DataDir::new();

    let evans = insert_person(&pool, "Evans Kidero", "evans-kidero").await;
    let untagged =
        insert_position(&pool, evans, seed.republic, Some(seed.nairobi_county), seed.governor_title, "", FUTURE).await;
    let odm_membership = insert_position(&pool, evans, seed.odm, None, seed.member_title, "", "2013-06-00").await;
    let kanu_membership = insert_position(&pool, evans, seed.kanu, None, seed.member_title, "", FUTURE).await;

    data.write_review_file("G1,EVANS KIDERO,nairobi-county,Governor,evans-kidero,Evans Kidero,y\n");

    let feed = StaticFeed::default().with_race(
        AreaType::County,
        "047",
        "NAIROBI",
        vec![candidate("G1", "EVANS", "KIDERO", "Governor", Some("Orange Democratic"))],
    );

    let report = importer(feed, &data, settings(true)).run(&pool).await.unwrap();

    assert!(report.is_clean(), "unexpected failures: {:?}", report.failed);
    assert_eq!(report.totals.people_created, 0);
    assert_eq!(report.totals.parties_created, 0);

    let (code, end): (String, String) = sqlx::query_as("SELECT external_id, end_date FROM positions WHERE id = ?")
        .bind(untagged)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(code, "G1");
    assert_eq!(end, FUTURE);

    // Prefix match on the party name finds ODM; the KANU membership ends
    assert_eq!(end_date_of(&pool, odm_membership).await, FUTURE);
    assert_eq!(end_date_of(&pool, kanu_membership).await, YESTERDAY);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM positions").await, 3);
}

#[tokio::test]
async fn test_candidate_without_party_loses_memberships() {
    let pool = test_pool().await;
    let seed = seed(&pool).await;
    let data = DataDir::new();

    let evans = insert_person(&pool, "Evans Kidero", "evans-kidero").await;
    let membership = insert_position(&pool, evans, seed.odm, None, seed.member_title, "", FUTURE).await;
    data.write_review_file("G1,EVANS KIDERO,nairobi-county,Governor,evans-kidero,Evans Kidero,yes\n");

    let feed = StaticFeed::default().with_race(
        AreaType::County,
        "047",
        "NAIROBI",
        vec![candidate("G1", "EVANS", "KIDERO", "Governor", None)],
    );

    importer(feed, &data, settings(true)).run(&pool).await.unwrap();

    assert_eq!(end_date_of(&pool, membership).await, YESTERDAY);
}

#[tokio::test]
async fn test_missing_party_fails_race_when_creation_disabled() {
    let pool = test_pool().await;
    seed(&pool).await;
    let data = DataDir::new();

    let mut strict = settings(true);
    strict.create_missing_parties = false;

    let report = importer(nairobi_governors(), &data, strict).run(&pool).await.unwrap();

    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].reason.contains("WIPER DEMOCRATIC MOVEMENT"));
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM people").await, 0);
}

#[tokio::test]
async fn test_president_ignored_and_unknown_contest_reported() {
    let pool = test_pool().await;
    seed(&pool).await;
    let data = DataDir::new();

    let feed = StaticFeed::default()
        .with_race(
            AreaType::County,
            "047",
            "NAIROBI",
            vec![candidate("P1", "UHURU", "KENYATTA", "President", None)],
        )
        .with_race(
            AreaType::County,
            "047",
            "NAIROBI",
            vec![candidate("Z1", "ODD", "CONTEST", "Mayor", None)],
        );

    let report = importer(feed, &data, settings(true)).run(&pool).await.unwrap();

    assert_eq!(report.races_ignored, 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].contest_type, "mayor");
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM people").await, 0);
}

#[tokio::test]
async fn test_areas_sharing_a_name_form_one_race() {
    let pool = test_pool().await;
    let seed = seed(&pool).await;
    let data = DataDir::new();

    let feed = StaticFeed::default()
        .with_race(
            AreaType::Constituency,
            "277",
            "WESTLANDS",
            vec![candidate("M1", "AMINA", "MOHAMED", "mp", None)],
        )
        .with_race(
            AreaType::Constituency,
            "278",
            "WESTLANDS",
            vec![candidate("M2", "PETER", "KENNETH", "mp", None)],
        );

    let report = importer(feed, &data, settings(true)).run(&pool).await.unwrap();

    assert_eq!(report.races_processed, 1);
    let on_westlands = count(
        &pool,
        &format!("SELECT COUNT(*) FROM positions WHERE place_id = {} AND title_id = {}", seed.westlands, seed.mp_title),
    )
    .await;
    assert_eq!(on_westlands, 2);
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let pool = test_pool().await;
    seed(&pool).await;
    let data = DataDir::new();

    importer(nairobi_governors(), &data, settings(true)).run(&pool).await.unwrap();
    let positions_before = count(&pool, "SELECT COUNT(*) FROM positions").await;

    let report = importer(nairobi_governors(), &data, settings(true)).run(&pool).await.unwrap();

    assert_eq!(report.totals.candidates_added, 0);
    assert_eq!(report.totals.candidates_unchanged, 2);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM positions").await, positions_before);
}

#[tokio::test]
async fn test_new_code_for_confirmed_person_keeps_their_position_active() {
    let pool = test_pool().await;
    let seed = seed(&pool).await;
    let data = DataDir::new();

    let evans = insert_person(&pool, "Evans Kidero", "evans-kidero").await;
    let position =
        insert_position(&pool, evans, seed.republic, Some(seed.nairobi_county), seed.governor_title, "OLD", FUTURE)
            .await;
    data.write_review_file("NEW,EVANS KIDERO,nairobi-county,Governor,evans-kidero,Evans Kidero,yes\n");

    let feed = StaticFeed::default().with_race(
        AreaType::County,
        "047",
        "NAIROBI",
        vec![candidate("NEW", "EVANS", "KIDERO", "Governor", None)],
    );

    let report = importer(feed, &data, settings(true)).run(&pool).await.unwrap();

    assert!(report.is_clean(), "unexpected failures: {:?}", report.failed);
    assert_eq!(report.totals.candidates_removed, 1);
    assert_eq!(report.totals.positions_updated, 1);
    assert_eq!(report.totals.positions_ended, 0);

    let (code, end): (String, String) = sqlx::query_as("SELECT external_id, end_date FROM positions WHERE id = ?")
        .bind(position)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(code, "NEW");
    assert_eq!(end, FUTURE);
    assert_eq!(
        count(&pool, "SELECT COUNT(*) FROM positions WHERE external_id = 'NEW' AND end_date = '9999-12-31'").await,
        1
    );
}

#[tokio::test]
async fn test_duplicate_positions_leave_one_per_code() {
    let pool = test_pool().await;
    let seed = seed(&pool).await;
    let data = DataDir::new();

    let evans = insert_person(&pool, "Evans Kidero", "evans-kidero").await;
    let first =
        insert_position(&pool, evans, seed.republic, Some(seed.nairobi_county), seed.governor_title, "", FUTURE).await;
    let duplicate =
        insert_position(&pool, evans, seed.republic, Some(seed.nairobi_county), seed.governor_title, "", FUTURE).await;
    data.write_review_file("G1,EVANS KIDERO,nairobi-county,Governor,evans-kidero,Evans Kidero,yes\n");

    let feed = StaticFeed::default().with_race(
        AreaType::County,
        "047",
        "NAIROBI",
        vec![candidate("G1", "EVANS", "KIDERO", "Governor", None)],
    );

    let report = importer(feed, &data, settings(true)).run(&pool).await.unwrap();

    assert!(report.is_clean(), "unexpected failures: {:?}", report.failed);
    assert_eq!(
        count(&pool, "SELECT COUNT(*) FROM positions WHERE external_id = 'G1' AND end_date = '9999-12-31'").await,
        1
    );
    assert_eq!(end_date_of(&pool, first).await, FUTURE);
    assert_eq!(end_date_of(&pool, duplicate).await, YESTERDAY);
    assert_eq!(report.totals.positions_ended, 1);
}

#[tokio::test]
async fn test_position_of_a_still_reported_code_is_not_taken() {
    let pool = test_pool().await;
    let seed = seed(&pool).await;
    let data = DataDir::new();

    let evans = insert_person(&pool, "Evans Kidero", "evans-kidero").await;
    let reported =
        insert_position(&pool, evans, seed.republic, Some(seed.nairobi_county), seed.governor_title, "G1", FUTURE)
            .await;
    data.write_review_file("G9,EVANS KIDERO,nairobi-county,Governor,evans-kidero,Evans Kidero,yes\n");

    let feed = StaticFeed::default().with_race(
        AreaType::County,
        "047",
        "NAIROBI",
        vec![
            candidate("G1", "EVANS", "KIDERO", "Governor", None),
            candidate("G9", "EVANS", "KIDERO", "Governor", None),
        ],
    );

    let report = importer(feed, &data, settings(true)).run(&pool).await.unwrap();

    assert!(report.is_clean(), "unexpected failures: {:?}", report.failed);
    assert_eq!(report.totals.positions_created, 1);
    assert_eq!(end_date_of(&pool, reported).await, FUTURE);
    assert_eq!(
        count(&pool, "SELECT COUNT(*) FROM positions WHERE external_id IN ('G1', 'G9') AND end_date = '9999-12-31'")
            .await,
        2
    );
}

#[tokio::test]
async fn test_ambiguous_party_fails_only_its_race() {
    let pool = test_pool().await;
    seed(&pool).await;
    insert_organisation(&pool, "Kenya National Congress", "knc", "party").await;
    let data = DataDir::new();

    // "KENYA" is a prefix of both KANU and KNC
    let feed = nairobi_governors().with_race(
        AreaType::Constituency,
        "277",
        "WESTLANDS",
        vec![candidate("M1", "JOHN", "OMONDI", "MP", Some("KENYA"))],
    );

    let report = importer(feed, &data, settings(true)).run(&pool).await.unwrap();

    assert_eq!(report.races_processed, 2);
    assert_eq!(report.races_succeeded, 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].area_name, "WESTLANDS");
    assert_eq!(report.failed[0].area_type, AreaType::Constituency);
    assert!(report.failed[0].reason.contains("Multiple parties matched 'KENYA'"));

    assert_eq!(count(&pool, "SELECT COUNT(*) FROM people WHERE slug = 'john-omondi'").await, 0);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM people").await, 2);
}

#[tokio::test]
async fn test_candidate_without_code_fails_race_every_run() {
    let pool = test_pool().await;
    seed(&pool).await;
    let data = DataDir::new();

    let feed = || {
        StaticFeed::default().with_race(
            AreaType::Constituency,
            "277",
            "WESTLANDS",
            vec![candidate("  ", "JOHN", "OMONDI", "MP", None)],
        )
    };

    for _ in 0..2 {
        let report = importer(feed(), &data, settings(true)).run(&pool).await.unwrap();

        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].reason.contains("no candidate code"));
        assert!(report.deferred.is_empty());
    }

    assert_eq!(count(&pool, "SELECT COUNT(*) FROM people").await, 0);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM positions").await, 0);
}

#[tokio::test]
async fn test_api_failure_aborts_run_without_changes() {
    let pool = test_pool().await;
    seed(&pool).await;
    let data = DataDir::new();

    let feed = nairobi_governors().with_unavailable(AreaType::Ward);
    let result = importer(feed, &data, settings(true)).run(&pool).await;

    assert!(matches!(result, Err(ImportError::Api(_))), "expected API error, got {:?}", result.err());
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM people").await, 0);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM import_runs").await, 0);
}
