//! End-to-end login and logout against a mock OAuth host.


use predicates::prelude::*;
use tempfile::tempdir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fixtures::{mount_profile, pikto_cmd, seed_token};

#[tokio::test]
async fn test_login_with_code_stores_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(query_param("code", "code-1"))
        .and(query_param("client_id", "ak-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "tok-1"
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_profile(&server).await;

    let dir = tempdir().unwrap();
    pikto_cmd(dir.path(), &server)
        .args(["login", "--code", "code-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged in as Ada Lovelace (@ada)"));

    assert!(dir.path().join("token.json").exists());
    assert!(dir.path().join("state.json").exists());
}

#[tokio::test]
async fn test_login_accepts_redirect_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(query_param("code", "code-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "tok-2"
        })))
        .mount(&server)
        .await;
    mount_profile(&server).await;

    let dir = tempdir().unwrap();
    pikto_cmd(dir.path(), &server)
        .args(["login", "--code", "https://example.test/cb?code=code-2&state=x"])
        .assert()
        .success();
}

#[tokio::test]
async fn test_login_with_bad_code_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(serde_json::json!({"errors": ["invalid code"]})),
        )
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    pikto_cmd(dir.path(), &server)
        .args(["login", "--code", "code-bad"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid code"));

    assert!(!dir.path().join("token.json").exists());
}

#[tokio::test]
async fn test_logout_removes_token() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    seed_token(dir.path(), "tok-1");

    pikto_cmd(dir.path(), &server)
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged out."));

    assert!(!dir.path().join("token.json").exists());

    // Logging out again is harmless.
    pikto_cmd(dir.path(), &server)
        .arg("logout")
        .assert()
        .success();
}

#[tokio::test]
async fn test_feed_without_login_fails() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();

    pikto_cmd(dir.path(), &server)
        .arg("feed")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not logged in"));
}
