//! E2E tests for profiles and the follow graph

mod common;

use common::TestServer;
use serde_json::Value;

#[tokio::test]
async fn test_follow_public_account() {
    let server = TestServer::new().await;
    let alice = server.register("alice").await;
    let bob = server.register("bob").await;

    let response = server
        .client
        .post(server.url(&format!("/api/users/{}/follow", alice.id)))
        .header("Authorization", bob.bearer())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let outcome: Value = response.json().await.unwrap();
    assert_eq!(outcome["is_accepted"], true);

    let (_, status) = server
        .get_json(&format!("/api/users/{}/follow-status", alice.id), Some(&bob))
        .await;
    assert_eq!(status["is_following"], true);
    assert_eq!(status["is_accepted"], true);

    let (_, profile) = server.get_json("/api/users/alice", None).await;
    assert_eq!(profile["follower_count"], 1);
    assert_eq!(profile["following_count"], 0);

    let (_, followers) = server
        .get_json(&format!("/api/users/{}/followers", alice.id), None)
        .await;
    assert_eq!(followers[0]["username"], "bob");

    let (_, following) = server
        .get_json(&format!("/api/users/{}/following", bob.id), None)
        .await;
    assert_eq!(following[0]["username"], "alice");

    let response = server
        .client
        .post(server.url(&format!("/api/users/{}/follow", alice.id)))
        .header("Authorization", bob.bearer())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);

    let response = server
        .client
        .delete(server.url(&format!("/api/users/{}/follow", alice.id)))
        .header("Authorization", bob.bearer())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);

    let (_, profile) = server.get_json("/api/users/alice", None).await;
    assert_eq!(profile["follower_count"], 0);
}

#[tokio::test]
async fn test_self_follow_is_rejected() {
    let server = TestServer::new().await;
    let alice = server.register("alice").await;

    let response = server
        .client
        .post(server.url(&format!("/api/users/{}/follow", alice.id)))
        .header("Authorization", alice.bearer())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let error: Value = response.json().await.unwrap();
    assert_eq!(error["kind"], "invalid_argument");
}

#[tokio::test]
async fn test_private_account_request_flow() {
    let server = TestServer::new().await;
    let alice = server.register("alice").await;
    let bob = server.register("bob").await;
    let carol = server.register("carol").await;

    let response = server
        .client
        .put(server.url("/api/users/me"))
        .header("Authorization", alice.bearer())
        .json(&serde_json::json!({"is_private": true, "bio": "private person"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let profile: Value = response.json().await.unwrap();
    assert_eq!(profile["is_private"], true);

    let secret = server
        .create_post(&alice, serde_json::json!({"content": "secret", "is_private": true}))
        .await;
    let secret_path = format!("/api/posts/{}", secret["id"].as_str().unwrap());

    for follower in [&bob, &carol] {
        let response = server
            .client
            .post(server.url(&format!("/api/users/{}/follow", alice.id)))
            .header("Authorization", follower.bearer())
            .send()
            .await
            .unwrap();
        let outcome: Value = response.json().await.unwrap();
        assert_eq!(outcome["is_accepted"], false);
    }

    let (_, pending) = server.get_json("/api/follow-requests", Some(&alice)).await;
    assert_eq!(pending.as_array().unwrap().len(), 2);

    // Pending followers cannot see private posts yet, nor act on them.
    let (status, _) = server.get_json(&secret_path, Some(&bob)).await;
    assert_eq!(status, 404);
    for action in ["like", "bookmark", "repost"] {
        let response = server
            .client
            .post(server.url(&format!("{secret_path}/{action}")))
            .header("Authorization", bob.bearer())
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 404, "{action}");
    }
    let response = server
        .client
        .post(server.url("/api/posts"))
        .header("Authorization", bob.bearer())
        .json(&serde_json::json!({"content": "hi", "reply_to_post_id": secret["id"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    let (_, unread) = server
        .get_json("/api/notifications/unread-count", Some(&alice))
        .await;
    // Only the two follow requests.
    assert_eq!(unread["count"], 2);

    let response = server
        .client
        .post(server.url(&format!("/api/follow-requests/{}/accept", bob.id)))
        .header("Authorization", alice.bearer())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);

    let response = server
        .client
        .post(server.url(&format!("/api/follow-requests/{}/reject", carol.id)))
        .header("Authorization", alice.bearer())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);

    let (status, _) = server.get_json(&secret_path, Some(&bob)).await;
    assert_eq!(status, 200);
    let (status, _) = server.get_json(&secret_path, Some(&carol)).await;
    assert_eq!(status, 404);
    let (status, _) = server.get_json(&secret_path, None).await;
    assert_eq!(status, 404);

    let (_, pending) = server.get_json("/api/follow-requests", Some(&alice)).await;
    assert!(pending.as_array().unwrap().is_empty());

    let (_, status) = server
        .get_json(&format!("/api/users/{}/follow-status", alice.id), Some(&carol))
        .await;
    assert_eq!(status["is_following"], false);
}

#[tokio::test]
async fn test_profile_updates() {
    let server = TestServer::new().await;
    let alice = server.register("alice").await;

    let response = server
        .client
        .put(server.url("/api/users/me"))
        .header("Authorization", alice.bearer())
        .json(&serde_json::json!({"website": "ftp://example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let response = server
        .client
        .put(server.url("/api/users/me/avatar"))
        .header("Authorization", alice.bearer())
        .json(&serde_json::json!({"avatar_url": "https://cdn.example.com/a.png"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let (_, profile) = server.get_json("/api/users/alice", None).await;
    assert_eq!(profile["avatar_url"], "https://cdn.example.com/a.png");
    assert!(profile.get("password_hash").is_none());

    let (status, _) = server.get_json("/api/users/nobody", None).await;
    assert_eq!(status, 404);
}
