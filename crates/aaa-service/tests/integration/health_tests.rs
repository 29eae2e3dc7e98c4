//! Integration tests for the health and metrics endpoints

use aaa_test_utils::TestAaaServer;
use reqwest::StatusCode;

#[tokio::test]
async fn test_health_endpoint_returns_ok() -> Result<(), anyhow::Error> {
    let server = TestAaaServer::spawn_with_auth().await?;

    let response = reqwest::get(format!("{}/health", server.url())).await?;

    // Health stays reachable without credentials even when auth is on
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await?, "OK");

    Ok(())
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_http_metrics() -> Result<(), anyhow::Error> {
    let server = TestAaaServer::spawn().await?;
    let client = reqwest::Client::new();

    client
        .get(format!("{}/health", server.url()))
        .send()
        .await?;

    let response = client
        .get(format!("{}/metrics", server.url()))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.text().await?;
    assert!(
        body.contains("aaa_http_requests_total"),
        "metrics should include request counter, got: {body}"
    );

    Ok(())
}
