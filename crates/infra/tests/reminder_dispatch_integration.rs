//! Reminder dispatch against the real schema and a mock HTTP gateway.
//!
//! Covers the wiring the unit tests mock out: SQLite ledger claims, the
//! day-before marker, and HTTP delivery classification all working together
//! across repeated poll cycles.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use roundtable_core::{ReminderService, ReminderServiceConfig};
use roundtable_domain::{Meeting, MeetingMember, MeetingStatus};
use roundtable_infra::database::{
    DbManager, SqliteMeetingRepository, SqliteReminderLedger, SqliteServiceState,
};
use roundtable_infra::notify::{HttpNotificationGateway, HttpNotificationGatewayConfig};
use tempfile::TempDir;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    #[allow(dead_code)]
    temp_dir: TempDir,
    manager: Arc<DbManager>,
    // Held so wiremock's expectations are verified when the harness drops.
    #[allow(dead_code)]
    server: MockServer,
    service: ReminderService,
}

async fn harness(server: MockServer) -> Harness {
    let temp_dir = TempDir::new().expect("temp dir created");
    let db_path = temp_dir.path().join("dispatch.db");
    let manager = Arc::new(DbManager::new(&db_path, 4).expect("manager created"));
    manager.run_migrations().expect("migrations applied");

    let gateway = HttpNotificationGateway::new(HttpNotificationGatewayConfig {
        base_url: server.uri(),
        auth_token: None,
        timeout: Duration::from_secs(2),
    })
    .expect("gateway built");

    let service = ReminderService::new(
        Arc::new(SqliteMeetingRepository::new(Arc::clone(&manager))),
        Arc::new(SqliteReminderLedger::new(Arc::clone(&manager))),
        Arc::new(SqliteServiceState::new(Arc::clone(&manager))),
        Arc::new(gateway),
        ReminderServiceConfig {
            retry_base_delay: Duration::from_millis(1),
            ..ReminderServiceConfig::default()
        },
    );

    Harness { temp_dir, manager, server, service }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

async fn insert_confirmed_meeting(
    manager: &Arc<DbManager>,
    d: NaiveDate,
    hour: u32,
    members: &[i64],
) -> Uuid {
    let repo = SqliteMeetingRepository::new(Arc::clone(manager));
    let meeting = Meeting {
        id: Uuid::new_v4(),
        name: "Berlin roundtable".into(),
        date: d,
        time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
        city: "Berlin".into(),
        venue: "Cafe Einstein".into(),
        venue_address: None,
        status: MeetingStatus::Confirmed,
        created_by: None,
        created_at: chrono::Utc::now(),
    };
    use roundtable_core::MeetingRepository;
    repo.insert(&meeting).await.expect("meeting inserted");
    for user_id in members {
        repo.add_member(&MeetingMember {
            meeting_id: meeting.id,
            user_id: *user_id,
            display_name: Some(format!("user-{user_id}")),
            joined_at: chrono::Utc::now(),
            added_by: None,
        })
        .await
        .expect("member added");
    }
    meeting.id
}

#[tokio::test(flavor = "multi_thread")]
async fn hour_before_reminders_are_delivered_exactly_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let harness = harness(server).await;
    insert_confirmed_meeting(&harness.manager, date(2024, 6, 5), 18, &[10, 11]).await;

    // 17:10 - inside the 40-80 minute band.
    let now = date(2024, 6, 5).and_hms_opt(17, 10, 0).unwrap();
    let report = harness.service.run_cycle(now).await.expect("cycle runs");
    assert_eq!(report.hour_before_sent, 2);
    assert_eq!(report.failures, 0);

    // Polled again five minutes later: no further requests (wiremock
    // enforces expect(2) on drop).
    let now = date(2024, 6, 5).and_hms_opt(17, 15, 0).unwrap();
    let report = harness.service.run_cycle(now).await.expect("cycle runs");
    assert_eq!(report.hour_before_sent, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn day_before_survives_marker_loss_without_duplicates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let harness = harness(server).await;
    insert_confirmed_meeting(&harness.manager, date(2024, 6, 6), 18, &[7]).await;

    let now = date(2024, 6, 5).and_hms_opt(9, 0, 0).unwrap();
    let report = harness.service.run_cycle(now).await.expect("cycle runs");
    assert_eq!(report.day_before_sent, 1);

    // Wipe the marker, simulating a restart that lost in-memory state but
    // kept the database. The durable ledger still blocks a re-send.
    {
        let conn = harness.manager.get_connection().expect("connection");
        conn.execute("DELETE FROM service_state", []).expect("marker cleared");
    }

    let report = harness.service.run_cycle(now).await.expect("cycle runs");
    assert_eq!(report.day_before_sent, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn gateway_outage_is_retried_on_a_later_cycle() {
    let server = MockServer::start().await;
    // Three transient failures (one per attempt in cycle one), then success.
    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(3)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let harness = harness(server).await;
    insert_confirmed_meeting(&harness.manager, date(2024, 6, 5), 18, &[3]).await;

    let now = date(2024, 6, 5).and_hms_opt(17, 5, 0).unwrap();
    let report = harness.service.run_cycle(now).await.expect("cycle runs");
    assert_eq!(report.failures, 1, "all in-cycle attempts exhausted");
    assert_eq!(report.hour_before_sent, 0);

    // Next poll, still inside the band: the released claim is retaken and
    // delivery succeeds.
    let now = date(2024, 6, 5).and_hms_opt(17, 10, 0).unwrap();
    let report = harness.service.run_cycle(now).await.expect("cycle runs");
    assert_eq!(report.hour_before_sent, 1);
    assert_eq!(report.failures, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn blocked_recipient_is_skipped_for_good() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(403).set_body_string("user blocked the bot"))
        .expect(1)
        .mount(&server)
        .await;

    let harness = harness(server).await;
    insert_confirmed_meeting(&harness.manager, date(2024, 6, 5), 18, &[9]).await;

    let now = date(2024, 6, 5).and_hms_opt(17, 10, 0).unwrap();
    let report = harness.service.run_cycle(now).await.expect("cycle runs");
    assert_eq!(report.failures, 1);

    // A later poll must not retry a permanent failure (expect(1) above).
    let now = date(2024, 6, 5).and_hms_opt(17, 14, 0).unwrap();
    let report = harness.service.run_cycle(now).await.expect("cycle runs");
    assert_eq!(report.failures, 0);
    assert_eq!(report.hour_before_sent, 0);
}
