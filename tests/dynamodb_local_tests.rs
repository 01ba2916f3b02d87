/// Tests against a running DynamoDB Local
///
/// Start one with `docker run -p 8000:8000 amazon/dynamodb-local` and run
/// `cargo test -- --ignored`. Set `DOCSTORE_ENDPOINT_URL` to target another
/// endpoint.
use serial_test::serial;

mod helpers;
use docstore::{ConnectionConfig, DynamoBackend};
use helpers::*;
use rusty_ulid::generate_ulid_string;

async fn local_backend() -> DynamoBackend {
    init_tracing();
    let config = if std::env::var("DOCSTORE_ENDPOINT_URL").is_ok() {
        ConnectionConfig::from_env()
    } else {
        ConnectionConfig::local()
    };
    DynamoBackend::connect(&config).await
}

async fn setup() -> (TableManager<DynamoBackend>, DocumentClient<UserModel, DynamoBackend>) {
    let backend = local_backend().await;
    let tables = TableManager::new(backend.clone());
    tables.ensure_table_for::<UserModel>().await.unwrap();

    let users = DocumentClient::new(backend).unwrap();
    (tables, users)
}

#[tokio::test]
#[serial]
#[ignore = "requires DynamoDB Local"]
async fn test_crud_against_dynamodb() {
    let (_tables, users) = setup().await;

    let user = UserModel {
        id: generate_ulid_string(),
        ..yamada()
    };
    users.put(&user).await.unwrap();
    assert_eq!(users.get(&user.id, "man").await.unwrap(), Some(user.clone()));

    users.delete_document(&user).await.unwrap();
    users.delete_document(&user).await.unwrap();
    assert_eq!(users.get(&user.id, "man").await.unwrap(), None);
}

#[tokio::test]
#[serial]
#[ignore = "requires DynamoDB Local"]
async fn test_batches_against_dynamodb() {
    let (_tables, users) = setup().await;

    let prefix = generate_ulid_string();
    let data = sample_users(&prefix, 130);
    let summary = users.batch_put(&data).await.unwrap();
    assert_eq!(summary.items, 130);
    assert!(summary.backend_calls >= 6);

    let mut keys: Vec<_> = data.iter().rev().map(|u| key(&u.id, &u.gender)).collect();
    keys.insert(3, key(&generate_ulid_string(), "man"));

    let got = users.batch_get(&keys).await.unwrap();
    assert_eq!(got.len(), 131);
    assert_eq!(got[0].as_ref(), data.last());
    assert_eq!(got[3], None);

    let _ = users.batch_delete(&keys).await.unwrap();
    let got = users.batch_get(&keys).await.unwrap();
    assert!(got.iter().all(Option::is_none));
}

#[tokio::test]
#[serial]
#[ignore = "requires DynamoDB Local"]
async fn test_seed_scenario_against_dynamodb() {
    let (tables, users) = setup().await;

    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/seed-data-usermodel.json");
    assert_eq!(users.load_seed_file(path, &JsonCodec).await.unwrap(), 2);

    let loaded = users
        .batch_load(&[key("yama1010", "man"), key("mori9910", "man")])
        .await
        .unwrap();
    assert_eq!(loaded["UserModel"], vec![yamada(), morita()]);

    tables.drop_table_for::<UserModel>().await.unwrap();
    let err = users.get("yama1010", "man").await.unwrap_err();
    assert!(err.is_table_not_found(), "unexpected error: {err}");
}
