mod support;

use chrono::{Duration, Utc};
use ticket_bridge::models::{IssueSyncRecord, Side};
use ticket_bridge::reconcile::IssueReconciler;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn transitions_peer_when_source_status_changed() {
    let left_server = MockServer::start().await;
    let right_server = MockServer::start().await;

    let target_time = Utc::now() - Duration::hours(1);
    let source_time = Utc::now();

    Mock::given(method("GET"))
        .and(path("/rest/api/3/issue/LEFT-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(support::issue_json("LEFT-1", "Ship it", "Done", source_time)))
        .mount(&left_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/api/3/issue/RIGHT-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(support::issue_json("RIGHT-1", "Ship it", "To Do", target_time)))
        .mount(&right_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/api/3/issue/RIGHT-1/transitions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "transitions": [
                { "id": "21", "to": { "name": "In Progress" } },
                { "id": "31", "to": { "name": "Done" } },
            ]
        })))
        .mount(&right_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/api/3/issue/RIGHT-1/transitions"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&right_server)
        .await;

    let store = support::test_store().await;
    let mut record = IssueSyncRecord::new_half_formed("LEFT-1", Side::Left, target_time);
    record.set_key(Side::Right, "RIGHT-1".into());
    record.set_watermark(Side::Right, target_time);
    record.recanonicalize_sync_id();
    store.save_issue_record(&record).await.unwrap();

    let left = support::remote_client(&left_server.uri(), "LEFT");
    let right = support::remote_client(&right_server.uri(), "RIGHT");
    let config = support::sync_config(&left_server.uri(), &right_server.uri());
    let reconciler = IssueReconciler::new(left, right, store.clone(), config);

    let outcome = reconciler.sync_issue("LEFT-1", Side::Left).await.unwrap();

    assert!(outcome.success, "{:?}", outcome.error_message);

    let requests = right_server.received_requests().await.unwrap();
    let transition_post = requests
        .iter()
        .find(|r| r.method.as_str() == "POST" && r.url.path().ends_with("/transitions"))
        .expect("expected a transition POST");
    let body: serde_json::Value = transition_post.body_json().unwrap();
    assert_eq!(body["transition"]["id"], "31");
}
