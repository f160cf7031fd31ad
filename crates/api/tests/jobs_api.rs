//! Integration tests for starting, inspecting and stopping jobs.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::{body_json, get, job_body, post_empty, post_json};
use lathe_core::job::JobStatus;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn start_returns_201_and_second_start_conflicts() {
    let (app, state) = common::build_test_app();

    let response = post_json(app.clone(), "/api/v1/machines/LATHE-01/jobs", job_body(10.0)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let job = body_json(response).await;
    assert_eq!(job["data"]["machine_id"], "LATHE-01");
    assert_eq!(job["data"]["status"], "ongoing");
    assert_eq!(job["data"]["material"], "Aluminum");

    let response = post_json(app, "/api/v1/machines/LATHE-01/jobs", job_body(10.0)).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let err = body_json(response).await;
    assert_eq!(err["code"], "CONFLICT");
    assert_eq!(err["error"], "Machine LATHE-01 is already running a job");

    assert_eq!(state.registry.active_count().await, 1);
    state.registry.shutdown().await;
}

#[tokio::test]
async fn path_machine_id_overrides_body() {
    let (app, state) = common::build_test_app();

    let mut body = job_body(10.0);
    body["machine_id"] = json!("LATHE-05");
    let response = post_json(app, "/api/v1/machines/LATHE-02/jobs", body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["data"]["machine_id"], "LATHE-02");

    state.registry.shutdown().await;
}

#[tokio::test]
async fn invalid_start_requests_are_rejected() {
    let (app, _) = common::build_test_app();

    let response = post_json(app.clone(), "/api/v1/machines/LATHE-99/jobs", job_body(5.0)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let mut custom = job_body(5.0);
    custom["material"] = json!("Custom");
    let response = post_json(app.clone(), "/api/v1/machines/LATHE-01/jobs", custom).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");

    let response = post_json(app.clone(), "/api/v1/machines/LATHE-01/jobs", job_body(0.0)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let mut bad_tool = job_body(5.0);
    bad_tool["tool_number"] = json!(51);
    let response = post_json(app, "/api/v1/machines/LATHE-01/jobs", bad_tool).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stop_closes_the_job_as_completed() {
    let (app, state) = common::build_test_app();

    let response = post_json(app.clone(), "/api/v1/machines/LATHE-03/jobs", job_body(10.0)).await;
    let job_id = body_json(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .parse::<Uuid>()
        .unwrap();

    tokio::time::sleep(Duration::from_millis(120)).await;

    let response = post_empty(app.clone(), &format!("/api/v1/jobs/{job_id}/stop")).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let mut status = JobStatus::Ongoing;
    for _ in 0..100 {
        status = state.stores.jobs.find_job(job_id).await.unwrap().unwrap().status;
        if status != JobStatus::Ongoing {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(status, JobStatus::Completed);

    let response = get(app.clone(), &format!("/api/v1/jobs/{job_id}/samples")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let samples = body_json(response).await;
    assert!(!samples["data"].as_array().unwrap().is_empty());

    // Stopping again: the job exists but has no live worker.
    let response = post_empty(app.clone(), &format!("/api/v1/jobs/{job_id}/stop")).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = get(app, "/api/v1/machines/LATHE-03/jobs").await;
    let history = body_json(response).await;
    assert_eq!(history["data"][0]["status"], "completed");
}

#[tokio::test]
async fn unknown_jobs_return_404() {
    let (app, _) = common::build_test_app();
    let id = Uuid::new_v4();

    assert_eq!(
        get(app.clone(), &format!("/api/v1/jobs/{id}")).await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        get(app.clone(), &format!("/api/v1/jobs/{id}/samples")).await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        post_empty(app, &format!("/api/v1/jobs/{id}/stop")).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn sample_range_must_be_ordered() {
    let (app, _) = common::build_test_app();
    let id = Uuid::new_v4();
    let response = get(
        app,
        &format!("/api/v1/jobs/{id}/samples?from=2025-01-02T00:00:00Z&to=2025-01-01T00:00:00Z"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
