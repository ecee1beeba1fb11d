//! Browsing and like toggling with a stored token.


use predicates::prelude::*;
use tempfile::tempdir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fixtures::{mount_profile, photo_json, pikto_cmd, seed_token};

#[tokio::test]
async fn test_feed_lists_photos_across_pages() {
    let server = MockServer::start().await;
    mount_profile(&server).await;
    Mock::given(method("GET"))
        .and(path("/photos"))
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([photo_json("aaa", false), photo_json("bbb", true)])),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/photos"))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!([photo_json("ccc", false)])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    seed_token(dir.path(), "tok-1");

    pikto_cmd(dir.path(), &server)
        .args(["feed", "--pages", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("aaa"))
        .stdout(predicate::str::contains("bbb"))
        .stdout(predicate::str::contains("ccc"))
        .stdout(predicate::str::contains("3 photos in feed"));
}

#[tokio::test]
async fn test_feed_stops_at_end() {
    let server = MockServer::start().await;
    mount_profile(&server).await;
    Mock::given(method("GET"))
        .and(path("/photos"))
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!([photo_json("aaa", false)])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/photos"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    seed_token(dir.path(), "tok-1");

    // Asking for more pages than exist stops quietly at the end.
    pikto_cmd(dir.path(), &server)
        .args(["feed", "--pages", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 photos in feed"));
}

#[tokio::test]
async fn test_feed_json_output() {
    let server = MockServer::start().await;
    mount_profile(&server).await;
    Mock::given(method("GET"))
        .and(path("/photos"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!([photo_json("aaa", true)])),
        )
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    seed_token(dir.path(), "tok-1");

    pikto_cmd(dir.path(), &server)
        .args(["feed", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"id\": \"aaa\""))
        .stdout(predicate::str::contains("\"is_liked\": true"));
}

#[tokio::test]
async fn test_likes_uses_the_user_endpoint() {
    let server = MockServer::start().await;
    mount_profile(&server).await;
    Mock::given(method("GET"))
        .and(path("/users/ada/likes"))
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!([photo_json("fav", true)])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    seed_token(dir.path(), "tok-1");

    pikto_cmd(dir.path(), &server)
        .arg("likes")
        .assert()
        .success()
        .stdout(predicate::str::contains("fav"))
        .stdout(predicate::str::contains("1 photos in likes"));
}

#[tokio::test]
async fn test_like_and_unlike() {
    let server = MockServer::start().await;
    mount_profile(&server).await;
    Mock::given(method("POST"))
        .and(path("/photos/aaa/like"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(serde_json::json!({ "photo": photo_json("aaa", true) })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/photos/aaa/like"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "photo": photo_json("aaa", false) })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    seed_token(dir.path(), "tok-1");

    pikto_cmd(dir.path(), &server)
        .args(["like", "aaa"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Liked photo aaa"));

    pikto_cmd(dir.path(), &server)
        .args(["unlike", "aaa"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed like from photo aaa"));
}

#[tokio::test]
async fn test_profile_command() {
    let server = MockServer::start().await;
    mount_profile(&server).await;

    let dir = tempdir().unwrap();
    seed_token(dir.path(), "tok-1");

    pikto_cmd(dir.path(), &server)
        .arg("profile")
        .assert()
        .success()
        .stdout(predicate::str::contains("@ada"))
        .stdout(predicate::str::contains("Ada Lovelace"))
        .stdout(predicate::str::contains("likes: 2"));
}
