use crate::store::TokenStore;
use crate::tests::test_support::temp_store_path;
use crate::types::UserProfile;

fn profile(id: &str, email: &str) -> UserProfile {
    UserProfile {
        id: id.to_string(),
        email: email.to_string(),
        phone: None,
        first_name: Some("Ada".to_string()),
        last_name: None,
        locale: None,
        notifications_enabled: Some(true),
    }
}

#[tokio::test]
async fn clear_empties_every_key() {
    let store = TokenStore::new(temp_store_path("clear"));
    assert!(store.set_tokens("access-1", "refresh-1").await);
    assert!(store.set_user(&profile("u-1", "a@example.com")).await);

    assert!(store.clear().await);

    assert_eq!(store.access_token().await, None);
    assert_eq!(store.refresh_token().await, None);
    assert!(store.user().await.is_none());
}

#[tokio::test]
async fn set_access_leaves_the_refresh_token_alone() {
    let store = TokenStore::new(temp_store_path("access"));
    store.set_tokens("access-1", "refresh-1").await;
    store.set_access("access-2").await;

    assert_eq!(store.access_token().await.as_deref(), Some("access-2"));
    assert_eq!(store.refresh_token().await.as_deref(), Some("refresh-1"));
}

#[tokio::test]
async fn access_only_state_is_reachable() {
    let store = TokenStore::new(temp_store_path("access-only"));
    store.set_access("access-1").await;

    assert_eq!(store.access_token().await.as_deref(), Some("access-1"));
    assert_eq!(store.refresh_token().await, None);
}

#[tokio::test]
async fn missing_file_reads_as_an_empty_session() {
    let store = TokenStore::new(temp_store_path("missing"));
    assert_eq!(store.access_token().await, None);
    assert_eq!(store.refresh_token().await, None);
    assert!(store.user().await.is_none());
}

#[tokio::test]
async fn corrupt_file_reads_as_an_empty_session() {
    let path = temp_store_path("corrupt");
    tokio::fs::write(&path, b"{not json").await.unwrap();

    let store = TokenStore::new(path.clone());
    assert_eq!(store.access_token().await, None);

    // the store recovers on the next write
    assert!(store.set_tokens("access-1", "refresh-1").await);
    assert_eq!(store.refresh_token().await.as_deref(), Some("refresh-1"));
}

#[tokio::test]
async fn snapshot_is_overwritten_wholesale() {
    let store = TokenStore::new(temp_store_path("snapshot"));
    store.set_user(&profile("u-1", "a@example.com")).await;

    let replacement = UserProfile {
        id: "u-2".to_string(),
        email: "b@example.com".to_string(),
        phone: None,
        first_name: None,
        last_name: None,
        locale: None,
        notifications_enabled: None,
    };
    store.set_user(&replacement).await;

    let user = store.user().await.expect("snapshot present");
    assert_eq!(user.id, "u-2");
    assert_eq!(user.first_name, None);
    assert_eq!(user.notifications_enabled, None);
}
