mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::TestServer;

async fn submit(server: &TestServer, body: Value) -> Result<reqwest::Response> {
    Ok(server
        .client
        .post(server.url("/api/whistleblower/report"))
        .json(&body)
        .send()
        .await?)
}

#[tokio::test]
async fn anonymous_report_is_trackable_by_reference() -> Result<()> {
    let server = TestServer::start().await?;

    let response = submit(&server, json!({ "message": "test", "isAnonymous": true })).await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await?;
    let reference = body["referenceNumber"].as_str().unwrap().to_string();
    assert_eq!(reference.len(), 8);
    assert!(reference.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    assert_eq!(body["isAnonymous"], true);
    assert!(body.get("id").is_none());

    let tracked: Value = server
        .client
        .get(server.url(&format!("/api/whistleblower/status/{}", reference)))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(tracked["status"], "Pending");
    assert_eq!(tracked["referenceNumber"], reference);
    assert!(tracked.get("message").is_none());
    assert!(tracked.get("email").is_none());
    Ok(())
}

#[tokio::test]
async fn empty_message_and_unknown_reference_fail() -> Result<()> {
    let server = TestServer::start().await?;

    let response = submit(&server, json!({ "message": "   " })).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = server
        .client
        .get(server.url("/api/whistleblower/status/DEADBEEF"))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn admin_triage_flow() -> Result<()> {
    let server = TestServer::start().await?;
    let token = server.admin_token().await?;

    submit(
        &server,
        json!({ "name": "Ana", "email": "ana@example.com", "message": "fraud", "isAnonymous": false }),
    )
    .await?;

    let response = server.client.get(server.url("/api/whistleblower/reports")).send().await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let reports: Vec<Value> = server
        .client
        .get(server.url("/api/whistleblower/reports"))
        .bearer_auth(&token)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["name"], "Ana");
    let id = reports[0]["id"].as_i64().unwrap();

    let response = server
        .client
        .put(server.url(&format!("/api/whistleblower/reports/{}/status", id)))
        .bearer_auth(&token)
        .json(&json!({ "status": "Closed" }))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = server
        .client
        .put(server.url(&format!("/api/whistleblower/reports/{}/status", id)))
        .bearer_auth(&token)
        .json(&json!({ "status": "In Progress" }))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    for note in ["first", "second"] {
        let response = server
            .client
            .post(server.url(&format!("/api/whistleblower/reports/{}/notes", id)))
            .bearer_auth(&token)
            .json(&json!({ "note": note }))
            .send()
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let report: Value = server
        .client
        .get(server.url(&format!("/api/whistleblower/reports/{}", id)))
        .bearer_auth(&token)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(report["status"], "In Progress");
    let notes = report["admin_notes"].as_str().unwrap();
    assert!(notes.find("second").unwrap() < notes.find("first").unwrap());

    let filtered: Vec<Value> = server
        .client
        .get(server.url("/api/whistleblower/reports?status=Pending"))
        .bearer_auth(&token)
        .send()
        .await?
        .json()
        .await?;
    assert!(filtered.is_empty());

    let stats: Value = server
        .client
        .get(server.url("/api/whistleblower/statistics"))
        .bearer_auth(&token)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(stats["anonymousData"]["identified"], 1);
    Ok(())
}
