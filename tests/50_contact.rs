mod common;

use anyhow::Result;
use common::{expect_json, TestServer, ADMIN_EMAIL};
use reqwest::StatusCode;
use serde_json::json;

async fn send_message(server: &TestServer, name: &str, message: &str) -> Result<reqwest::Response> {
    Ok(server
        .client
        .post(server.url("/api/contact"))
        .json(&json!({ "name": name, "email": "visitor@example.com", "message": message }))
        .send()
        .await?)
}

#[tokio::test]
async fn visitor_can_leave_message() -> Result<()> {
    let server = TestServer::spawn().await?;

    let res = send_message(&server, "John Doe", "Hello! I like your portfolio.").await?;
    let body = expect_json(res, StatusCode::CREATED).await?;

    assert_eq!(body["message"], "Message sent successfully");
    assert_eq!(body["data"]["name"], "John Doe");
    assert_eq!(server.state.contacts.list_messages().await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn invalid_message_reports_every_field() -> Result<()> {
    let server = TestServer::spawn().await?;

    let res = server
        .client
        .post(server.url("/api/contact"))
        .json(&json!({ "email": "not-an-email", "message": "short" }))
        .send()
        .await?;
    let body = expect_json(res, StatusCode::BAD_REQUEST).await?;

    assert_eq!(body["message"], "The given data was invalid.");
    assert!(body["field_errors"]["name"].is_string());
    assert!(body["field_errors"]["email"].is_string());
    assert!(body["field_errors"]["message"].is_string());
    assert!(server.state.contacts.list_messages().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn inbox_is_admin_only_and_newest_first() -> Result<()> {
    let server = TestServer::spawn().await?;
    send_message(&server, "First", "The first message sent.").await?;
    send_message(&server, "Second", "The second message sent.").await?;

    let res = server.client.get(server.url("/api/contact")).send().await?;
    expect_json(res, StatusCode::UNAUTHORIZED).await?;

    let token = server.login(ADMIN_EMAIL).await?;
    let res = server.client.get(server.url("/api/contact")).bearer_auth(&token).send().await?;
    let body = expect_json(res, StatusCode::OK).await?;

    let names: Vec<&str> = body["data"].as_array().unwrap().iter().map(|m| m["name"].as_str().unwrap()).collect();
    assert_eq!(names, ["Second", "First"]);
    Ok(())
}
