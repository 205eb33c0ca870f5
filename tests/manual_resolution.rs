mod support;

use chrono::{Duration, Utc};
use ticket_bridge::models::{IssueSyncRecord, Side, SyncStatus};
use ticket_bridge::reconcile::IssueReconciler;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn resolving_a_conflict_picks_the_chosen_side_as_source() {
    let left_server = MockServer::start().await;
    let right_server = MockServer::start().await;

    let last_sync_watermark = Utc::now() - Duration::hours(2);
    let source_time = Utc::now();

    Mock::given(method("GET"))
        .and(path("/rest/api/3/issue/LEFT-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(support::issue_json("LEFT-1", "Left wins", "To Do", source_time)))
        .mount(&left_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/api/3/issue/RIGHT-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(support::issue_json("RIGHT-1", "Stale target", "To Do", last_sync_watermark)))
        .mount(&right_server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/rest/api/3/issue/RIGHT-1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&right_server)
        .await;

    let store = support::test_store().await;
    let mut record = IssueSyncRecord::new_half_formed("LEFT-1", Side::Left, last_sync_watermark);
    record.set_key(Side::Right, "RIGHT-1".into());
    record.set_watermark(Side::Right, last_sync_watermark);
    record.recanonicalize_sync_id();
    record.status = SyncStatus::Conflict.to_string();
    record.requires_manual_resolution = true;
    record.conflict_details = Some("both sides changed".into());
    store.save_issue_record(&record).await.unwrap();
    let sync_id = record.sync_id.clone();

    let left = support::remote_client(&left_server.uri(), "LEFT");
    let right = support::remote_client(&right_server.uri(), "RIGHT");
    let config = support::sync_config(&left_server.uri(), &right_server.uri());
    let reconciler = IssueReconciler::new(left, right, store.clone(), config);

    let outcome = reconciler.resolve_conflict(&sync_id, Side::Left).await.unwrap();

    assert!(outcome.success, "{:?}", outcome.error_message);
    assert_eq!(outcome.record.status, "success");
    assert!(!outcome.record.requires_manual_resolution);
    assert!(outcome.record.conflict_details.is_none());

    let requests = right_server.received_requests().await.unwrap();
    let put = requests.iter().find(|r| r.method.as_str() == "PUT").expect("expected a PUT applying the left-authoritative summary");
    let body: serde_json::Value = put.body_json().unwrap();
    assert_eq!(body["fields"]["summary"], "Left wins");
}
