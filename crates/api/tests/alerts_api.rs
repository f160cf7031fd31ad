//! Integration tests for alert submission and the critical-alert flow.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::{body_json, get, job_body, post_json};
use serde_json::json;

#[tokio::test]
async fn submitted_alerts_are_listed_newest_first() {
    let (app, _) = common::build_test_app();

    for message in ["coolant low", "chuck vibration"] {
        let response = post_json(
            app.clone(),
            "/api/v1/machines/LATHE-01/alerts",
            json!({ "message": message, "operator_id": "op-1" }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let alert = body_json(response).await;
        assert_eq!(alert["data"]["severity"], 3);
        assert_eq!(alert["data"]["alert_type"], "General");
        assert_eq!(alert["data"]["status"], "active");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let list = body_json(get(app, "/api/v1/machines/LATHE-01/alerts").await).await;
    let alerts = list["data"].as_array().unwrap();
    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[0]["message"], "chuck vibration");
}

#[tokio::test]
async fn blank_or_out_of_range_alerts_are_rejected() {
    let (app, _) = common::build_test_app();

    let response = post_json(
        app.clone(),
        "/api/v1/machines/LATHE-01/alerts",
        json!({ "message": "   " }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(
        app,
        "/api/v1/machines/LATHE-01/alerts",
        json!({ "message": "hot", "severity": 9 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn critical_alert_without_a_running_job_conflicts() {
    let (app, _) = common::build_test_app();

    let response = post_json(
        app,
        "/api/v1/machines/LATHE-01/alerts/critical",
        json!({ "message": "spindle noise" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(
        body_json(response).await["error"],
        "No ongoing job found for this machine"
    );
}

#[tokio::test]
async fn critical_alert_stops_the_job_and_flags_maintenance() {
    let (app, state) = common::build_test_app();

    let response = post_json(app.clone(), "/api/v1/machines/LATHE-03/jobs", job_body(10.0)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let job_id = body_json(response).await["data"]["id"].clone();

    let response = post_json(
        app.clone(),
        "/api/v1/machines/LATHE-03/alerts/critical",
        json!({ "message": "  spindle bearing smoking ", "operator_id": "op-9" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["data"]["alert"]["message"], "spindle bearing smoking");
    assert_eq!(body["data"]["stopped_job_id"], job_id);
    assert_eq!(body["data"]["alert"]["severity"], 5);
    assert_eq!(body["data"]["alert"]["alert_type"], "Critical Failure Risk");
    assert_eq!(body["data"]["alert"]["triggered_by"], "op-9");
    assert_eq!(body["data"]["notification"]["type"], "critical");
    assert_eq!(body["data"]["notification"]["requiresMaintenance"], true);

    // Wait for the worker to close the job.
    for _ in 0..100 {
        if state.registry.active_count().await == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let list = body_json(get(app.clone(), "/api/v1/machines/LATHE-03/alerts").await).await;
    assert_eq!(list["data"][0]["message"], "spindle bearing smoking");

    let status = body_json(get(app, "/api/v1/machines/LATHE-03/alerts/status").await).await;
    assert_eq!(status["data"]["has_critical_alert"], true);
    assert_eq!(status["data"]["requires_maintenance"], true);
    assert_eq!(status["data"]["job_status"], "completed");
    assert_eq!(status["data"]["alert_details"]["severity"], 5);
}

#[tokio::test]
async fn critical_alert_requires_a_message() {
    let (app, state) = common::build_test_app();

    let response = post_json(app.clone(), "/api/v1/machines/LATHE-04/jobs", job_body(10.0)).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = post_json(
        app,
        "/api/v1/machines/LATHE-04/alerts/critical",
        json!({ "message": "   " }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // The blank request must not have stopped the job.
    assert_eq!(state.registry.active_count().await, 1);
    state.registry.shutdown().await;
}
