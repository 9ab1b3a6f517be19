mod common;

use anyhow::Result;
use common::{expect_json, TestServer, ADMIN_EMAIL, USER_EMAIL};
use portfolio_api::auth::Role;
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn non_admin_is_forbidden() -> Result<()> {
    let server = TestServer::spawn().await?;
    let token = server.login(USER_EMAIL).await?;

    let res = server
        .client
        .post(server.url("/api/skills"))
        .bearer_auth(&token)
        .json(&json!({ "name": "Rust" }))
        .send()
        .await?;
    let body = expect_json(res, StatusCode::FORBIDDEN).await?;
    assert_eq!(body["code"], "FORBIDDEN");
    assert_eq!(body["message"], "Forbidden: Admins only");

    let res = server.client.get(server.url("/api/contact")).bearer_auth(&token).send().await?;
    expect_json(res, StatusCode::FORBIDDEN).await?;

    // Nothing was written
    assert!(server.state.skills.list_skills().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn admin_manages_skills() -> Result<()> {
    let server = TestServer::spawn().await?;
    let token = server.login(ADMIN_EMAIL).await?;

    let res = server
        .client
        .post(server.url("/api/skills"))
        .bearer_auth(&token)
        .json(&json!({ "name": "Rust", "category": "Languages", "level": 90 }))
        .send()
        .await?;
    let body = expect_json(res, StatusCode::CREATED).await?;
    assert_eq!(body["message"], "Skill created");
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let res = server
        .client
        .put(server.url(&format!("/api/skills/{}", id)))
        .bearer_auth(&token)
        .json(&json!({ "level": 95 }))
        .send()
        .await?;
    let body = expect_json(res, StatusCode::OK).await?;
    assert_eq!(body["data"]["level"], 95);
    assert_eq!(body["data"]["name"], "Rust");
    assert_eq!(body["data"]["category"], "Languages");

    // Public listing sees the change
    let body = expect_json(server.client.get(server.url("/api/skills")).send().await?, StatusCode::OK).await?;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
async fn skill_validation_reports_fields() -> Result<()> {
    let server = TestServer::spawn().await?;
    let token = server.login(ADMIN_EMAIL).await?;

    let res = server
        .client
        .post(server.url("/api/skills"))
        .bearer_auth(&token)
        .json(&json!({ "category": "x".repeat(51), "level": 101 }))
        .send()
        .await?;
    let body = expect_json(res, StatusCode::BAD_REQUEST).await?;

    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["field_errors"]["name"].is_string());
    assert!(body["field_errors"]["category"].is_string());
    assert!(body["field_errors"]["level"].is_string());
    Ok(())
}

#[tokio::test]
async fn unknown_skill_is_not_found() -> Result<()> {
    let server = TestServer::spawn().await?;
    let token = server.login(ADMIN_EMAIL).await?;

    for id in ["00000000-0000-0000-0000-000000000000", "42"] {
        let res = server
            .client
            .put(server.url(&format!("/api/skills/{}", id)))
            .bearer_auth(&token)
            .json(&json!({ "level": 10 }))
            .send()
            .await?;
        assert_eq!(expect_json(res, StatusCode::NOT_FOUND).await?["code"], "NOT_FOUND");
    }
    Ok(())
}

#[tokio::test]
async fn role_changes_apply_to_live_tokens() -> Result<()> {
    let server = TestServer::spawn().await?;
    let token = server.login(ADMIN_EMAIL).await?;

    let res = server.client.get(server.url("/api/contact")).bearer_auth(&token).send().await?;
    expect_json(res, StatusCode::OK).await?;

    server.state.users.set_role(server.admin.id, Role::User).await?;

    let res = server.client.get(server.url("/api/contact")).bearer_auth(&token).send().await?;
    expect_json(res, StatusCode::FORBIDDEN).await?;
    Ok(())
}
