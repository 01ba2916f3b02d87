/// Single-item document operations
///
/// Covers put/get/delete semantics against the in-process backend.
mod helpers;
use docstore::{AttributeValue, Record};
use helpers::*;

#[tokio::test]
async fn test_put_and_get() {
    let (_backend, users) = memory_users().await;

    users.put(&yamada()).await.unwrap();

    let got = users.get("yama1010", "man").await.unwrap();
    assert_eq!(got, Some(yamada()));
}

#[tokio::test]
async fn test_get_missing_returns_none() {
    let (_backend, users) = memory_users().await;

    assert_eq!(users.get("nobody", "man").await.unwrap(), None);
    assert_eq!(users.get_by_key(&key("yama1010", "woman")).await.unwrap(), None);
}

#[tokio::test]
async fn test_last_write_wins() {
    let (_backend, users) = memory_users().await;

    users.put(&yamada()).await.unwrap();

    let older = UserModel {
        age: Some(11),
        name: None,
        ..yamada()
    };
    users.put(&older).await.unwrap();

    let got = users.get("yama1010", "man").await.unwrap().unwrap();
    assert_eq!(got.age, Some(11));
    assert_eq!(got.name, None, "put replaces the whole attribute set");
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let (backend, users) = memory_users().await;
    users.put(&yamada()).await.unwrap();

    let k = key("yama1010", "man");
    users.delete(&k).await.unwrap();
    users.delete(&k).await.unwrap();

    assert_eq!(users.get_by_key(&k).await.unwrap(), None);
    assert_eq!(backend.item_count("UserModel").await, Some(0));
}

#[tokio::test]
async fn test_delete_document_uses_its_key() {
    let (_backend, users) = memory_users().await;
    users.put(&yamada()).await.unwrap();
    users.put(&morita()).await.unwrap();

    users.delete_document(&yamada()).await.unwrap();

    assert_eq!(users.get("yama1010", "man").await.unwrap(), None);
    assert_eq!(users.get("mori9910", "man").await.unwrap(), Some(morita()));
}

#[tokio::test]
async fn test_empty_key_is_rejected_before_backend() {
    let (backend, users) = memory_users().await;

    let nameless = UserModel {
        id: String::new(),
        ..yamada()
    };
    let err = users.put(&nameless).await.unwrap_err();
    assert!(err.is_validation_error(), "unexpected error: {err}");

    let err = users.get("yama1010", "").await.unwrap_err();
    assert!(err.is_validation_error(), "unexpected error: {err}");

    assert_eq!(backend.item_count("UserModel").await, Some(0));
}

#[tokio::test]
async fn test_records_are_identified_by_key_only() {
    let (_backend, users) = memory_users().await;

    let first = Record::new(key("yama1010", "man"))
        .with_attribute("name", AttributeValue::S("yamada".into()));
    let second = Record::new(key("yama1010", "man"))
        .with_attribute("name", AttributeValue::S("someone else".into()));
    assert_eq!(first, second);

    users.put_record(first).await.unwrap();
    users.put_record(second).await.unwrap();

    let stored = users
        .get_record(&key("yama1010", "man"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        stored.attribute("name"),
        Some(&AttributeValue::S("someone else".into()))
    );
}

#[tokio::test]
async fn test_undeclared_attributes_are_dropped() {
    let (_backend, users) = memory_users().await;

    let record = Record::new(key("yama1010", "man"))
        .with_attribute("name", AttributeValue::S("yamada".into()))
        .with_attribute("nickname", AttributeValue::S("yama".into()));
    users.put_record(record).await.unwrap();

    let stored = users
        .get_record(&key("yama1010", "man"))
        .await
        .unwrap()
        .unwrap();
    assert!(stored.attribute("nickname").is_none());
    assert!(stored.attribute("name").is_some());
}

#[tokio::test]
async fn test_operations_on_missing_table_fail() {
    init_tracing();
    let users: DocumentClient<UserModel, _> = DocumentClient::new(MemoryBackend::new()).unwrap();

    let err = users.get("yama1010", "man").await.unwrap_err();
    assert!(err.is_table_not_found(), "unexpected error: {err}");

    let err = users.put(&yamada()).await.unwrap_err();
    assert!(err.is_table_not_found(), "unexpected error: {err}");
}
