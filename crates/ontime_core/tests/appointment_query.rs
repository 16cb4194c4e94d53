use futures::executor::block_on;
use futures::{StreamExt, TryStreamExt};
use ontime_core::db::open_db_in_memory;
use ontime_core::repo::stream::STREAM_BATCH_SIZE;
use ontime_core::{
    paginate_stream, Appointment, AppointmentId, AppointmentRepository, PaginationInfo,
    RepoError, SearchCriteria, ServiceError, SqliteAppointmentRepository,
};
use rusqlite::Connection;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;
const BASE_MS: i64 = 1_767_225_600_000;

fn stored(
    repo: &SqliteAppointmentRepository<'_>,
    objective: &str,
    appointment_at: i64,
    posted_at: i64,
    classification_id: i64,
) -> AppointmentId {
    let mut appointment = Appointment::new(objective, appointment_at, classification_id);
    appointment.posted_at = posted_at;
    repo.add_appointment(&appointment).unwrap()
}

fn ids(appointments: &[Appointment]) -> Vec<AppointmentId> {
    appointments.iter().map(|item| item.id).collect()
}

fn objectives(appointments: &[Appointment]) -> Vec<&str> {
    appointments.iter().map(|item| item.objective.as_str()).collect()
}

fn collect_filtered(
    repo: &SqliteAppointmentRepository<'_>,
    classification: &str,
) -> Vec<Appointment> {
    block_on(repo.filter_appointments_stream(classification).try_collect()).unwrap()
}

fn setup(conn: &Connection) -> SqliteAppointmentRepository<'_> {
    SqliteAppointmentRepository::try_new(conn).unwrap()
}

#[test]
fn filter_orders_by_appointment_time_then_posted_time() {
    let conn = open_db_in_memory().unwrap();
    let repo = setup(&conn);

    stored(&repo, "early", BASE_MS, 10, 1);
    stored(&repo, "late-old-post", BASE_MS + DAY_MS, 10, 1);
    stored(&repo, "late-new-post", BASE_MS + DAY_MS, 20, 1);
    stored(&repo, "middle", BASE_MS + DAY_MS / 2, 5, 1);

    let filtered = repo.filter_appointments("Awaiting").unwrap();
    assert_eq!(
        objectives(&filtered),
        vec!["late-new-post", "late-old-post", "middle", "early"]
    );
}

#[test]
fn full_ties_break_by_ascending_id() {
    let conn = open_db_in_memory().unwrap();
    let repo = setup(&conn);

    let first = stored(&repo, "first", BASE_MS, 7, 1);
    let second = stored(&repo, "second", BASE_MS, 7, 1);
    let third = stored(&repo, "third", BASE_MS, 7, 1);

    assert_eq!(
        ids(&repo.filter_appointments("Awaiting").unwrap()),
        vec![first, second, third]
    );
    assert_eq!(ids(&collect_filtered(&repo, "Awaiting")), vec![first, second, third]);
}

#[test]
fn filter_is_scoped_to_one_classification() {
    let conn = open_db_in_memory().unwrap();
    let repo = setup(&conn);

    stored(&repo, "waiting", BASE_MS, 1, 1);
    stored(&repo, "done", BASE_MS, 1, 2);
    stored(&repo, "skipped", BASE_MS, 1, 3);

    assert_eq!(objectives(&repo.filter_appointments("Awaiting").unwrap()), vec!["waiting"]);
    assert_eq!(objectives(&repo.filter_appointments("Succesfull").unwrap()), vec!["done"]);
    assert_eq!(objectives(&repo.filter_appointments("Missed").unwrap()), vec!["skipped"]);
    assert!(repo
        .filter_appointments("Missed")
        .unwrap()
        .iter()
        .all(|item| item.classification_name() == Some("Missed")));
}

#[test]
fn unknown_or_differently_cased_classification_yields_empty_results() {
    let conn = open_db_in_memory().unwrap();
    let repo = setup(&conn);
    stored(&repo, "waiting", BASE_MS, 1, 1);

    assert!(repo.filter_appointments("Cancelled").unwrap().is_empty());
    assert!(repo.filter_appointments("awaiting").unwrap().is_empty());
    assert!(collect_filtered(&repo, "Cancelled").is_empty());

    let criteria = SearchCriteria::from_query(Some("waiting")).unwrap();
    assert!(repo.search_appointments(&criteria, "Cancelled").unwrap().is_empty());
}

#[test]
fn search_matches_any_text_field_case_insensitively() {
    let conn = open_db_in_memory().unwrap();
    let repo = setup(&conn);

    let by_objective = stored(&repo, "Annual DENTIST visit", BASE_MS + 3, 1, 1);
    let mut with_reason = Appointment::new("Check", BASE_MS + 2, 1);
    with_reason.reason = Some("dentist referral".to_string());
    let by_reason = repo.add_appointment(&with_reason).unwrap();
    let mut with_info = Appointment::new("Other", BASE_MS + 1, 1);
    with_info.additional_info = Some("Ask the Dentist about x-rays".to_string());
    let by_info = repo.add_appointment(&with_info).unwrap();
    stored(&repo, "Unrelated", BASE_MS, 1, 1);
    stored(&repo, "Dentist but done", BASE_MS, 1, 2);

    let criteria = SearchCriteria::from_query(Some("  dEnTiSt ")).unwrap();
    let found = repo.search_appointments(&criteria, "Awaiting").unwrap();
    assert_eq!(ids(&found), vec![by_objective, by_reason, by_info]);
}

#[test]
fn search_with_multi_word_term_matches_collapsed_substring() {
    let conn = open_db_in_memory().unwrap();
    let repo = setup(&conn);

    stored(&repo, "blood test results", BASE_MS, 1, 1);
    stored(&repo, "blood pressure", BASE_MS, 1, 1);

    let criteria = SearchCriteria::from_query(Some("blood    test")).unwrap();
    assert_eq!(criteria.term(), "blood test");
    let found = repo.search_appointments(&criteria, "Awaiting").unwrap();
    assert_eq!(objectives(&found), vec!["blood test results"]);
}

#[test]
fn empty_criteria_degenerates_to_filtering() {
    let conn = open_db_in_memory().unwrap();
    let repo = setup(&conn);

    stored(&repo, "a", BASE_MS + 1, 1, 1);
    stored(&repo, "b", BASE_MS, 1, 1);
    stored(&repo, "c", BASE_MS, 1, 3);

    let empty = SearchCriteria::default();
    assert_eq!(
        repo.search_appointments(&empty, "Awaiting").unwrap(),
        repo.filter_appointments("Awaiting").unwrap()
    );
    let streamed: Vec<Appointment> =
        block_on(repo.search_appointments_stream(&empty, "Awaiting").try_collect()).unwrap();
    assert_eq!(objectives(&streamed), vec!["a", "b"]);
}

#[test]
fn streams_match_eager_results_across_batches() {
    let conn = open_db_in_memory().unwrap();
    let repo = setup(&conn);

    let total = i64::from(STREAM_BATCH_SIZE) * 2 + 5;
    for index in 0..total {
        // Shared times force the id tie-break across batch boundaries.
        let objective = if index % 3 == 0 {
            format!("Needle {index}")
        } else {
            format!("Hay {index}")
        };
        stored(&repo, &objective, BASE_MS + (index % 7), index % 4, 1);
    }
    stored(&repo, "Needle elsewhere", BASE_MS, 0, 2);

    let eager = repo.filter_appointments("Awaiting").unwrap();
    let streamed = collect_filtered(&repo, "Awaiting");
    assert_eq!(eager.len(), total as usize);
    assert_eq!(streamed, eager);

    let criteria = SearchCriteria::from_query(Some("needle")).unwrap();
    let eager_search = repo.search_appointments(&criteria, "Awaiting").unwrap();
    let streamed_search: Vec<Appointment> =
        block_on(repo.search_appointments_stream(&criteria, "Awaiting").try_collect()).unwrap();
    assert_eq!(streamed_search, eager_search);
    assert_eq!(eager_search.len(), ((total + 2) / 3) as usize);
}

#[test]
fn streams_can_be_abandoned_early() {
    let conn = open_db_in_memory().unwrap();
    let repo = setup(&conn);

    for index in 0..10 {
        stored(&repo, &format!("item {index}"), BASE_MS + index, 1, 1);
    }

    let head: Vec<Appointment> = block_on(
        repo.filter_appointments_stream("Awaiting")
            .take(3)
            .try_collect(),
    )
    .unwrap();
    assert_eq!(objectives(&head), vec!["item 9", "item 8", "item 7"]);

    let tail: Vec<Appointment> = block_on(
        repo.filter_appointments_stream("Awaiting")
            .skip(8)
            .try_collect(),
    )
    .unwrap();
    assert_eq!(objectives(&tail), vec!["item 1", "item 0"]);

    // Abandoned streams leave the connection usable for writes.
    drop(repo.filter_appointments_stream("Awaiting"));
    stored(&repo, "after", BASE_MS, 1, 1);
}

#[test]
fn stream_reports_storage_failure_then_ends() {
    let conn = open_db_in_memory().unwrap();
    let repo = setup(&conn);
    stored(&repo, "doomed", BASE_MS, 1, 1);

    conn.execute_batch("DROP TABLE appointments;").unwrap();

    let items: Vec<Result<Appointment, RepoError>> =
        block_on(repo.filter_appointments_stream("Awaiting").collect());
    assert_eq!(items.len(), 1);
    assert!(matches!(items[0], Err(RepoError::Db(_))));
}

#[test]
fn five_daily_appointments_page_two_of_size_two() {
    let conn = open_db_in_memory().unwrap();
    let repo = setup(&conn);

    let day_ids: Vec<AppointmentId> = (0..5)
        .map(|day| stored(&repo, &format!("day {day}"), BASE_MS + day * DAY_MS, 1, 1))
        .collect();

    let page = block_on(paginate_stream(
        repo.filter_appointments_stream("Awaiting")
            .map_err(ServiceError::from),
        2,
        2,
    ))
    .unwrap();

    assert_eq!(ids(&page.items), vec![day_ids[2], day_ids[1]]);
    assert_eq!(
        page.info,
        PaginationInfo {
            items_per_page: 2,
            current_page: 2,
            total_items: 5,
            total_pages: 3,
        }
    );
}

#[test]
fn page_past_the_end_is_empty_with_full_metadata() {
    let conn = open_db_in_memory().unwrap();
    let repo = setup(&conn);
    for day in 0..3 {
        stored(&repo, &format!("day {day}"), BASE_MS + day * DAY_MS, 1, 1);
    }

    let page = block_on(paginate_stream(
        repo.filter_appointments_stream("Awaiting")
            .map_err(ServiceError::from),
        2,
        9,
    ))
    .unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.info.current_page, 9);
    assert_eq!(page.info.total_items, 3);
    assert_eq!(page.info.total_pages, 2);
}
