use futures::executor::block_on;
use futures::TryStreamExt;
use ontime_core::db::open_db_in_memory;
use ontime_core::{
    AppointmentAudit, AppointmentRepository, AuditActionType, AuditRepository,
    AuditSearchCriteria, Appointment, SqliteAppointmentRepository, SqliteAuditRepository,
};
use rusqlite::Connection;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;
const BASE_MS: i64 = 1_767_225_600_000;

fn day0() -> i64 {
    BASE_MS
}

fn day1() -> i64 {
    BASE_MS + DAY_MS
}

fn day2() -> i64 {
    BASE_MS + 2 * DAY_MS
}

fn repo_at(conn: &Connection, clock: fn() -> i64) -> SqliteAppointmentRepository<'_> {
    SqliteAppointmentRepository::with_clock(conn, clock).unwrap()
}

fn actions(audits: &[AppointmentAudit]) -> Vec<AuditActionType> {
    audits.iter().map(|audit| audit.action_type).collect()
}

#[test]
fn add_records_snapshot_of_new_appointment() {
    let conn = open_db_in_memory().unwrap();
    let repo = repo_at(&conn, day0);
    let audits = SqliteAuditRepository::try_new(&conn).unwrap();

    let mut draft = Appointment::new("Physio", day1(), 1);
    draft.reason = Some("Knee".to_string());
    draft.additional_info = Some("Wear shorts".to_string());
    repo.add_appointment(&draft).unwrap();

    let history = audits.get_all_audits().unwrap();
    assert_eq!(history.len(), 1);
    let record = &history[0];
    assert!(record.id > 0);
    assert_eq!(record.action_type, AuditActionType::Add);
    assert_eq!(record.action_at, day0());
    assert_eq!(record.posted_at, day0());
    assert_eq!(record.objective, "Physio");
    assert_eq!(record.reason.as_deref(), Some("Knee"));
    assert_eq!(record.additional_info.as_deref(), Some("Wear shorts"));
    assert_eq!(record.classification, "Awaiting");
}

#[test]
fn edit_records_new_state_and_delete_records_prior_state() {
    let conn = open_db_in_memory().unwrap();
    let audits = SqliteAuditRepository::try_new(&conn).unwrap();

    let id = repo_at(&conn, day0)
        .add_appointment(&Appointment::new("Original", day0(), 1))
        .unwrap();

    let editor = repo_at(&conn, day1);
    let mut edited = editor.get_appointment(id).unwrap().unwrap();
    edited.objective = "Edited".to_string();
    edited.classification_id = 2;
    editor.update_appointment(&edited).unwrap();

    repo_at(&conn, day2).remove_by_id(id).unwrap();

    let history = audits.get_all_audits().unwrap();
    assert_eq!(
        actions(&history),
        vec![
            AuditActionType::Delete,
            AuditActionType::Edit,
            AuditActionType::Add
        ]
    );

    let edit = &history[1];
    assert_eq!(edit.objective, "Edited");
    assert_eq!(edit.classification, "Succesfull");
    assert_eq!(edit.posted_at, day1());

    let delete = &history[0];
    assert_eq!(delete.action_at, day2());
    assert_eq!(delete.objective, "Edited");
    assert_eq!(delete.classification, "Succesfull");
    assert_eq!(delete.posted_at, day1());
}

#[test]
fn mark_records_update_without_touching_posted_time() {
    let conn = open_db_in_memory().unwrap();
    let audits = SqliteAuditRepository::try_new(&conn).unwrap();

    let id = repo_at(&conn, day0)
        .add_appointment(&Appointment::new("Review", day0(), 1))
        .unwrap();
    repo_at(&conn, day1).set_classification(id, "Missed").unwrap();

    let history = audits.get_all_audits().unwrap();
    assert_eq!(history[0].action_type, AuditActionType::Update);
    assert_eq!(history[0].action_at, day1());
    assert_eq!(history[0].posted_at, day0());
    assert_eq!(history[0].classification, "Missed");
}

#[test]
fn history_is_newest_first_regardless_of_insertion_order() {
    let conn = open_db_in_memory().unwrap();
    let audits = SqliteAuditRepository::try_new(&conn).unwrap();

    repo_at(&conn, day2)
        .add_appointment(&Appointment::new("latest", day0(), 1))
        .unwrap();
    repo_at(&conn, day0)
        .add_appointment(&Appointment::new("earliest", day0(), 1))
        .unwrap();
    repo_at(&conn, day1)
        .add_appointment(&Appointment::new("middle", day0(), 1))
        .unwrap();

    let eager = audits.get_all_audits().unwrap();
    let objectives: Vec<&str> = eager.iter().map(|audit| audit.objective.as_str()).collect();
    assert_eq!(objectives, vec!["latest", "middle", "earliest"]);

    let streamed: Vec<AppointmentAudit> =
        block_on(audits.get_all_audits_stream().try_collect()).unwrap();
    assert_eq!(streamed, eager);
}

#[test]
fn same_instant_records_order_by_descending_id() {
    let conn = open_db_in_memory().unwrap();
    let repo = repo_at(&conn, day0);
    let audits = SqliteAuditRepository::try_new(&conn).unwrap();

    for objective in ["one", "two", "three"] {
        repo.add_appointment(&Appointment::new(objective, day0(), 1))
            .unwrap();
    }

    let history = audits.get_all_audits().unwrap();
    assert!(history.windows(2).all(|pair| pair[0].id > pair[1].id));
    assert_eq!(history[0].objective, "three");
}

#[test]
fn search_covers_text_fields_and_classification() {
    let conn = open_db_in_memory().unwrap();
    let audits = SqliteAuditRepository::try_new(&conn).unwrap();

    let cardio = repo_at(&conn, day0)
        .add_appointment(&Appointment::new("Cardiology", day0(), 1))
        .unwrap();
    let mut eye = Appointment::new("Eye exam", day0(), 1);
    eye.reason = Some("blurry vision".to_string());
    repo_at(&conn, day1).add_appointment(&eye).unwrap();
    repo_at(&conn, day2)
        .set_classification(cardio, "Missed")
        .unwrap();

    let by_reason = AuditSearchCriteria::from_query(Some("VISION")).unwrap();
    let found = audits.search_audits(&by_reason).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].objective, "Eye exam");

    let by_classification = AuditSearchCriteria::from_query(Some("missed")).unwrap();
    let found = audits.search_audits(&by_classification).unwrap();
    assert_eq!(actions(&found), vec![AuditActionType::Update]);

    let by_objective = AuditSearchCriteria::from_query(Some("cardio")).unwrap();
    let streamed: Vec<AppointmentAudit> =
        block_on(audits.search_audits_stream(&by_objective).try_collect()).unwrap();
    assert_eq!(
        actions(&streamed),
        vec![AuditActionType::Update, AuditActionType::Add]
    );
    assert_eq!(streamed, audits.search_audits(&by_objective).unwrap());

    let nothing = AuditSearchCriteria::from_query(Some("dermatology")).unwrap();
    assert!(audits.search_audits(&nothing).unwrap().is_empty());
}

#[test]
fn audit_rows_reject_update_and_delete() {
    let conn = open_db_in_memory().unwrap();
    repo_at(&conn, day0)
        .add_appointment(&Appointment::new("Immutable", day0(), 1))
        .unwrap();

    let update_err = conn
        .execute("UPDATE appointment_audits SET objective = 'tampered';", [])
        .unwrap_err();
    assert!(update_err.to_string().contains("append-only"));

    let delete_err = conn
        .execute("DELETE FROM appointment_audits;", [])
        .unwrap_err();
    assert!(delete_err.to_string().contains("append-only"));

    let audits = SqliteAuditRepository::try_new(&conn).unwrap();
    let history = audits.get_all_audits().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].objective, "Immutable");
}

#[test]
fn edit_mark_delete_on_consecutive_days_read_back_newest_first() {
    let conn = open_db_in_memory().unwrap();
    let audits = SqliteAuditRepository::try_new(&conn).unwrap();

    // Seed outside the window so only the three mutations are compared.
    let id = SqliteAppointmentRepository::with_clock(&conn, || BASE_MS - DAY_MS)
        .unwrap()
        .add_appointment(&Appointment::new("Consult", day0(), 1))
        .unwrap();

    let editor = repo_at(&conn, day0);
    let mut edited = editor.get_appointment(id).unwrap().unwrap();
    edited.reason = Some("follow-up".to_string());
    editor.update_appointment(&edited).unwrap();
    repo_at(&conn, day1).set_classification(id, "Succesfull").unwrap();
    repo_at(&conn, day2).remove_by_id(id).unwrap();

    let history = audits.get_all_audits().unwrap();
    assert_eq!(
        actions(&history[..3]),
        vec![
            AuditActionType::Delete,
            AuditActionType::Update,
            AuditActionType::Edit
        ]
    );
    let times: Vec<i64> = history[..3].iter().map(|audit| audit.action_at).collect();
    assert_eq!(times, vec![day2(), day1(), day0()]);
}

#[test]
fn audit_wire_shape_uses_upper_case_action_types() {
    let conn = open_db_in_memory().unwrap();
    repo_at(&conn, day0)
        .add_appointment(&Appointment::new("Wire", day0(), 1))
        .unwrap();

    let audits = SqliteAuditRepository::try_new(&conn).unwrap();
    let history = audits.get_all_audits().unwrap();
    let json = serde_json::to_value(&history[0]).unwrap();
    assert_eq!(json["action_type"], "ADD");
    assert_eq!(json["classification"], "Awaiting");
}
