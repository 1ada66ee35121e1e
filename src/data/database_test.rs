//! Database tests

use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::config::DatabaseConfig;
use crate::error::AppError;
use tempfile::TempDir;

/// Helper to create a test database
async fn create_test_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::connect(&DatabaseConfig::at(temp_dir.path().join("test.db")))
        .await
        .unwrap();
    (db, temp_dir)
}

async fn create_user(db: &Database, username: &str) -> User {
    db.insert_user(&NewUser {
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password_hash: "not-a-real-hash".to_string(),
        display_name: None,
    })
    .await
    .unwrap()
}

async fn create_post(db: &Database, author: &EntityId, reply_to: Option<&EntityId>) -> EntityId {
    let (id, _) = db
        .insert_post(&NewPost {
            author_id: author.clone(),
            content: "hello".to_string(),
            is_private: false,
            reply_to: reply_to.cloned(),
            media_urls: vec![],
            allow_replies: true,
        })
        .await
        .unwrap();
    id
}

async fn like_count(db: &Database, post: &EntityId) -> i64 {
    db.get_post(post, None).await.unwrap().unwrap().like_count
}

#[tokio::test]
async fn test_database_connection() {
    let (_db, _temp_dir) = create_test_db().await;
}

// =============================================================================
// Users
// =============================================================================

#[tokio::test]
async fn test_user_insert_and_lookup() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;

    let by_id = db.get_user(&alice.id).await.unwrap().unwrap();
    assert_eq!(by_id.username, "alice");
    assert!(!by_id.is_private);

    let by_name = db.get_user_by_username("alice").await.unwrap().unwrap();
    assert_eq!(by_name.id, alice.id);

    let credential = db.get_credential_by_username("alice").await.unwrap().unwrap();
    assert_eq!(credential.id, alice.id);
    assert!(db.get_credential_by_username("nobody").await.unwrap().is_none());

    let by_email = db
        .get_credential_by_email("alice@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_email.id, alice.id);
    assert!(db.get_credential_by_email("alice").await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_username_or_email_conflicts() {
    let (db, _temp_dir) = create_test_db().await;
    create_user(&db, "alice").await;

    let same_name = db
        .insert_user(&NewUser {
            username: "alice".to_string(),
            email: "other@example.com".to_string(),
            password_hash: "x".to_string(),
            display_name: None,
        })
        .await;
    assert!(matches!(same_name, Err(AppError::Conflict(msg)) if msg.contains("username")));

    let same_email = db
        .insert_user(&NewUser {
            username: "alice2".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "x".to_string(),
            display_name: None,
        })
        .await;
    assert!(matches!(same_email, Err(AppError::Conflict(msg)) if msg.contains("email")));
}

#[tokio::test]
async fn test_profile_update_keeps_unset_fields() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;

    db.update_user_profile(
        &alice.id,
        &ProfileUpdate {
            bio: Some("hi".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    db.update_user_profile(
        &alice.id,
        &ProfileUpdate {
            location: Some("Lisbon".to_string()),
            is_private: Some(true),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    db.update_user_avatar(&alice.id, "https://cdn.example.com/a.png")
        .await
        .unwrap();

    let user = db.get_user(&alice.id).await.unwrap().unwrap();
    assert_eq!(user.bio.as_deref(), Some("hi"));
    assert_eq!(user.location.as_deref(), Some("Lisbon"));
    assert_eq!(user.avatar_url.as_deref(), Some("https://cdn.example.com/a.png"));
    assert!(user.is_private);
}

// =============================================================================
// Posts and ledgers
// =============================================================================

#[tokio::test]
async fn test_post_insert_starts_with_zero_counters() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;
    let post_id = create_post(&db, &alice.id, None).await;

    let post = db.get_post(&post_id, Some(&alice.id)).await.unwrap().unwrap();
    assert_eq!(post.author.username, "alice");
    assert_eq!(post.like_count, 0);
    assert_eq!(post.repost_count, 0);
    assert_eq!(post.reply_count, 0);
    assert!(!post.has_liked);
}

#[tokio::test]
async fn test_reply_parent_must_exist_and_allow_replies() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;

    let missing = db
        .insert_post(&NewPost {
            author_id: alice.id.clone(),
            content: "reply".to_string(),
            is_private: false,
            reply_to: Some(EntityId::new()),
            media_urls: vec![],
            allow_replies: true,
        })
        .await;
    assert!(matches!(missing, Err(AppError::NotFound)));

    let (closed, _) = db
        .insert_post(&NewPost {
            author_id: alice.id.clone(),
            content: "no replies please".to_string(),
            is_private: false,
            reply_to: None,
            media_urls: vec![],
            allow_replies: false,
        })
        .await
        .unwrap();
    let forbidden = db
        .insert_post(&NewPost {
            author_id: alice.id.clone(),
            content: "reply".to_string(),
            is_private: false,
            reply_to: Some(closed),
            media_urls: vec![],
            allow_replies: true,
        })
        .await;
    assert!(matches!(forbidden, Err(AppError::Forbidden)));
}

#[tokio::test]
async fn test_reply_count_is_derived_on_every_read_path() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;
    let root = create_post(&db, &alice.id, None).await;
    let first = create_post(&db, &bob.id, Some(&root)).await;
    create_post(&db, &bob.id, Some(&root)).await;

    db.soft_delete_post(&first, &bob.id).await.unwrap();

    let single = db.get_post(&root, None).await.unwrap().unwrap();
    let timeline = db.list_posts(None, Page::default()).await.unwrap();
    let from_timeline = timeline.iter().find(|p| p.id == root).unwrap();
    let from_user = db.list_user_posts(&alice.id, None, Page::default()).await.unwrap();

    assert_eq!(single.reply_count, 1);
    assert_eq!(from_timeline.reply_count, 1);
    assert_eq!(from_user[0].reply_count, 1);

    let replies = db.list_post_replies(&root, None, Page::default()).await.unwrap();
    assert_eq!(replies.len(), 1);
    let user_replies = db.list_user_replies(&bob.id, None, Page::default()).await.unwrap();
    assert_eq!(user_replies.len(), 1);
}

#[tokio::test]
async fn test_like_ledger_and_counter_agree() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;
    let post = create_post(&db, &alice.id, None).await;

    let owner = db.add_to_ledger(Ledger::Likes, &post, &bob.id).await.unwrap();
    assert_eq!(owner, alice.id);
    assert_eq!(like_count(&db, &post).await, 1);

    let again = db.add_to_ledger(Ledger::Likes, &post, &bob.id).await;
    assert!(matches!(again, Err(AppError::AlreadyExists(_))));
    assert_eq!(like_count(&db, &post).await, 1);
    assert_eq!(db.count_ledger(Ledger::Likes, &post).await.unwrap(), 1);

    assert!(db.remove_from_ledger(Ledger::Likes, &post, &bob.id).await.unwrap());
    assert!(!db.remove_from_ledger(Ledger::Likes, &post, &bob.id).await.unwrap());
    assert_eq!(like_count(&db, &post).await, 0);
    assert_eq!(db.count_ledger(Ledger::Likes, &post).await.unwrap(), 0);
}

#[tokio::test]
async fn test_bookmarks_do_not_touch_counters() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;
    let post = create_post(&db, &alice.id, None).await;

    db.add_to_ledger(Ledger::Bookmarks, &post, &alice.id).await.unwrap();
    let viewed = db.get_post(&post, Some(&alice.id)).await.unwrap().unwrap();
    assert!(viewed.has_bookmarked);
    assert_eq!(viewed.like_count, 0);

    let bookmarks = db
        .list_ledger_posts(Ledger::Bookmarks, &alice.id, Some(&alice.id), Page::default())
        .await
        .unwrap();
    assert_eq!(bookmarks.len(), 1);
}

#[tokio::test]
async fn test_ledger_on_missing_or_deleted_post_is_not_found() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;
    let post = create_post(&db, &alice.id, None).await;
    db.soft_delete_post(&post, &alice.id).await.unwrap();

    let deleted = db.add_to_ledger(Ledger::Likes, &post, &alice.id).await;
    assert!(matches!(deleted, Err(AppError::NotFound)));
    let missing = db.add_to_ledger(Ledger::Reposts, &EntityId::new(), &alice.id).await;
    assert!(matches!(missing, Err(AppError::NotFound)));
    assert!(db.get_post(&post, Some(&alice.id)).await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_likes_keep_counter_consistent() {
    let (db, _temp_dir) = create_test_db().await;
    let db = Arc::new(db);
    let alice = create_user(&db, "alice").await;
    let post = create_post(&db, &alice.id, None).await;

    let mut likers = Vec::new();
    for i in 0..12 {
        likers.push(create_user(&db, &format!("liker{i}")).await.id);
    }

    let mut handles = Vec::new();
    for liker in likers.clone() {
        let db = db.clone();
        let post = post.clone();
        handles.push(tokio::spawn(async move {
            db.add_to_ledger(Ledger::Likes, &post, &liker).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    assert_eq!(like_count(&db, &post).await, 12);

    let mut handles = Vec::new();
    for liker in likers.into_iter().take(5) {
        let db = db.clone();
        let post = post.clone();
        handles.push(tokio::spawn(async move {
            db.remove_from_ledger(Ledger::Likes, &post, &liker).await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().unwrap());
    }

    assert_eq!(like_count(&db, &post).await, 7);
    assert_eq!(db.count_ledger(Ledger::Likes, &post).await.unwrap(), 7);
}

#[tokio::test]
async fn test_update_and_delete_require_owner() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;
    let post = create_post(&db, &alice.id, None).await;

    let update = db.update_post_content(&post, &bob.id, "mine now").await;
    assert!(matches!(update, Err(AppError::Unauthorized)));
    let delete = db.soft_delete_post(&post, &bob.id).await;
    assert!(matches!(delete, Err(AppError::Unauthorized)));

    db.update_post_content(&post, &alice.id, "edited").await.unwrap();
    let post_view = db.get_post(&post, None).await.unwrap().unwrap();
    assert_eq!(post_view.content, "edited");

    let missing = db.update_post_content(&EntityId::new(), &alice.id, "x").await;
    assert!(matches!(missing, Err(AppError::NotFound)));
}

#[tokio::test]
async fn test_private_posts_visible_to_owner_and_accepted_followers() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;
    let carol = create_user(&db, "carol").await;
    let (post, _) = db
        .insert_post(&NewPost {
            author_id: alice.id.clone(),
            content: "followers only".to_string(),
            is_private: true,
            reply_to: None,
            media_urls: vec![],
            allow_replies: true,
        })
        .await
        .unwrap();

    db.insert_follow(&bob.id, &alice.id).await.unwrap();

    assert!(db.get_post(&post, Some(&alice.id)).await.unwrap().is_some());
    assert!(db.get_post(&post, Some(&bob.id)).await.unwrap().is_some());
    assert!(db.get_post(&post, Some(&carol.id)).await.unwrap().is_none());
    assert!(db.get_post(&post, None).await.unwrap().is_none());
}

#[tokio::test]
async fn test_hidden_private_post_rejects_interactions() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;
    let carol = create_user(&db, "carol").await;
    let (post, _) = db
        .insert_post(&NewPost {
            author_id: alice.id.clone(),
            content: "followers only".to_string(),
            is_private: true,
            reply_to: None,
            media_urls: vec![],
            allow_replies: true,
        })
        .await
        .unwrap();
    db.insert_follow(&bob.id, &alice.id).await.unwrap();

    for ledger in [Ledger::Likes, Ledger::Bookmarks, Ledger::Reposts] {
        assert!(matches!(
            db.add_to_ledger(ledger, &post, &carol.id).await,
            Err(AppError::NotFound)
        ));
    }
    let reply = db
        .insert_post(&NewPost {
            author_id: carol.id.clone(),
            content: "let me in".to_string(),
            is_private: false,
            reply_to: Some(post.clone()),
            media_urls: vec![],
            allow_replies: true,
        })
        .await;
    assert!(matches!(reply, Err(AppError::NotFound)));
    assert!(matches!(
        db.update_post_content(&post, &carol.id, "edited").await,
        Err(AppError::NotFound)
    ));

    let seen = db.get_post(&post, Some(&alice.id)).await.unwrap().unwrap();
    assert_eq!(seen.like_count, 0);
    assert_eq!(seen.repost_count, 0);
    assert_eq!(seen.reply_count, 0);
    assert_eq!(db.count_unread_notifications(&alice.id).await.unwrap(), 0);

    // Accepted followers and the author can still interact.
    assert_eq!(
        db.add_to_ledger(Ledger::Likes, &post, &bob.id).await.unwrap(),
        alice.id
    );
    db.add_to_ledger(Ledger::Bookmarks, &post, &alice.id)
        .await
        .unwrap();
    assert_eq!(like_count_as(&db, &post, &alice.id).await, 1);
}

async fn like_count_as(db: &Database, post: &EntityId, viewer: &EntityId) -> i64 {
    db.get_post(post, Some(viewer)).await.unwrap().unwrap().like_count
}

// =============================================================================
// Follow graph
// =============================================================================

#[tokio::test]
async fn test_follow_acceptance_depends_on_privacy() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;
    db.update_user_profile(
        &bob.id,
        &ProfileUpdate {
            is_private: Some(true),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert!(db.insert_follow(&bob.id, &alice.id).await.unwrap());
    assert!(!db.insert_follow(&alice.id, &bob.id).await.unwrap());

    let again = db.insert_follow(&alice.id, &bob.id).await;
    assert!(matches!(again, Err(AppError::AlreadyExists(_))));

    let pending = db
        .list_pending_follow_requests(&bob.id, Page::default())
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].user.id, alice.id);
    assert!(db.list_followers(&bob.id, Page::default()).await.unwrap().is_empty());

    db.accept_follow(&alice.id, &bob.id).await.unwrap();
    db.accept_follow(&alice.id, &bob.id).await.unwrap();
    assert_eq!(db.get_follow_edge(&alice.id, &bob.id).await.unwrap(), Some(true));

    let profile = db.get_user_profile(&bob.id).await.unwrap().unwrap();
    assert_eq!(profile.follower_count, 1);
    assert_eq!(profile.following_count, 1);
}

#[tokio::test]
async fn test_follow_missing_user_and_missing_edges() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;
    let ghost = EntityId::new();

    assert!(matches!(
        db.insert_follow(&alice.id, &ghost).await,
        Err(AppError::NotFound)
    ));
    assert!(matches!(
        db.accept_follow(&ghost, &alice.id).await,
        Err(AppError::NotFound)
    ));
    assert!(!db.delete_follow(&alice.id, &ghost).await.unwrap());
    assert!(!db.reject_follow(&ghost, &alice.id).await.unwrap());
}

#[tokio::test]
async fn test_self_follow_is_rejected_by_schema() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;

    let result = db.insert_follow(&alice.id, &alice.id).await;
    assert!(matches!(result, Err(AppError::Database(_))));
}

// =============================================================================
// Notifications
// =============================================================================

#[tokio::test]
async fn test_notification_read_state_is_scoped_to_recipient() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;
    let post = create_post(&db, &alice.id, None).await;

    let id = db
        .insert_notification(&NewNotification {
            recipient_id: alice.id.clone(),
            actor_id: bob.id.clone(),
            post_id: Some(post.clone()),
            parent_post_id: None,
            kind: NotificationType::Like,
        })
        .await
        .unwrap();

    let listed = db.list_notifications(&alice.id, Page::default()).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].actor.username, "bob");
    assert_eq!(listed[0].kind, NotificationType::Like);
    assert_eq!(listed[0].post_content.as_deref(), Some("hello"));
    assert_eq!(db.count_unread_notifications(&alice.id).await.unwrap(), 1);

    assert!(!db.mark_notification_read(&id, &bob.id).await.unwrap());
    assert!(db.mark_notification_read(&id, &alice.id).await.unwrap());
    assert_eq!(db.count_unread_notifications(&alice.id).await.unwrap(), 0);

    assert!(!db.soft_delete_notification(&id, &bob.id).await.unwrap());
    assert!(db.soft_delete_notification(&id, &alice.id).await.unwrap());
    assert!(db.list_notifications(&alice.id, Page::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_notification_hides_text_of_deleted_posts() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;
    let post = create_post(&db, &alice.id, None).await;
    let reply = create_post(&db, &bob.id, Some(&post)).await;

    db.insert_notification(&NewNotification {
        recipient_id: alice.id.clone(),
        actor_id: bob.id.clone(),
        post_id: Some(reply.clone()),
        parent_post_id: Some(post.clone()),
        kind: NotificationType::Reply,
    })
    .await
    .unwrap();

    db.soft_delete_post(&reply, &bob.id).await.unwrap();
    let listed = db.list_notifications(&alice.id, Page::default()).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].post_content, None);
    assert_eq!(listed[0].parent_post_content.as_deref(), Some("hello"));

    db.soft_delete_post(&post, &alice.id).await.unwrap();
    let listed = db.list_notifications(&alice.id, Page::default()).await.unwrap();
    assert_eq!(listed[0].parent_post_content, None);
}

// =============================================================================
// Write transactions
// =============================================================================

#[tokio::test]
async fn test_dropped_transaction_discards_writes() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;
    let post = create_post(&db, &alice.id, None).await;

    {
        let mut tx = db.begin_write().await.unwrap();
        sqlx::query("UPDATE posts SET like_count = 99 WHERE id = ?")
            .bind(&post)
            .execute(tx.conn().unwrap())
            .await
            .unwrap();
    }

    assert_eq!(like_count(&db, &post).await, 0);
    // The pool is still usable for writers after the abandoned transaction.
    db.add_to_ledger(Ledger::Likes, &post, &alice.id).await.unwrap();
    assert_eq!(like_count(&db, &post).await, 1);
}

#[tokio::test]
async fn test_failed_body_rolls_back_earlier_statements() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;
    let post = create_post(&db, &alice.id, None).await;

    let mut tx = db.begin_write().await.unwrap();
    let result: Result<(), AppError> = async {
        sqlx::query("UPDATE posts SET like_count = 5 WHERE id = ?")
            .bind(&post)
            .execute(tx.conn()?)
            .await?;
        Err(AppError::Forbidden)
    }
    .await;
    assert!(matches!(tx.finish(result).await, Err(AppError::Forbidden)));

    assert_eq!(like_count(&db, &post).await, 0);
}

#[tokio::test]
async fn test_transaction_timeout_rolls_back() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = DatabaseConfig::at(temp_dir.path().join("test.db"));
    config.transaction_timeout_ms = 50;
    let db = Database::connect(&config).await.unwrap();
    let alice = create_user(&db, "alice").await;
    let post = create_post(&db, &alice.id, None).await;

    let mut tx = db.begin_write().await.unwrap();
    let result: Result<(), AppError> = db
        .bounded(async {
            sqlx::query("UPDATE posts SET like_count = 7 WHERE id = ?")
                .bind(&post)
                .execute(tx.conn()?)
                .await?;
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok(())
        })
        .await;
    assert!(matches!(tx.finish(result).await, Err(AppError::Internal(_))));

    assert_eq!(like_count(&db, &post).await, 0);
}
