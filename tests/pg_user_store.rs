//! Runs the store against a real Postgres. Set `TEST_DATABASE_URL` to enable;
//! without it every test returns early.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use userstore::config::{AppConfig, LogConfig};
use userstore::users::store::{DUPLICATE_EMAIL, USER_NOT_FOUND};
use userstore::{db, telemetry, NewUser, PgUserRepository, StoreError, UserStore, UserUpdate};

static COUNTER: AtomicU32 = AtomicU32::new(0);

async fn pg_store() -> Option<UserStore<PgUserRepository>> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let config = AppConfig {
        database_url: url,
        max_connections: 2,
        log: LogConfig {
            filter: "userstore=debug".into(),
            json: false,
        },
    };
    telemetry::init(&config.log);

    let pool = db::connect(&config).await.expect("connect to test database");
    db::migrate(&pool).await.expect("migrate test database");
    Some(UserStore::new(PgUserRepository::new(pool)))
}

// Tests share one database, so every user gets its own address.
fn unique_email(tag: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{tag}-{}-{nanos}-{n}@example.test", std::process::id())
}

fn new_user(name: &str, email: &str) -> NewUser {
    NewUser {
        name: name.into(),
        email: email.into(),
        password: "hunter22".into(),
    }
}

#[tokio::test]
async fn create_lookup_and_authenticate() {
    let Some(store) = pg_store().await else { return };
    let email = unique_email("create");

    let created = store.create(&new_user("Grace", &email)).await.expect("create");
    assert_eq!(created.email, email);

    let found = store.get_by_id(created.id).await.expect("lookup");
    assert_eq!(found.name, "Grace");
    assert_eq!(found.email, email);

    store.authenticate(&email, "hunter22").await.expect("authenticate");
    assert!(matches!(
        store.authenticate(&email, "hunter23").await,
        Err(StoreError::Authentication(_))
    ));

    let all = store.list_all().await.expect("list");
    let row = all.iter().find(|u| u.id == created.id).expect("listed");
    assert_ne!(row.password, "hunter22");
}

#[tokio::test]
async fn duplicate_email_is_rejected_twice() {
    let Some(store) = pg_store().await else { return };
    let email = unique_email("dup");
    store.create(&new_user("Grace", &email)).await.expect("create");

    for _ in 0..2 {
        match store.create(&new_user("Copy", &email)).await {
            Err(StoreError::Validation(msg)) => assert_eq!(msg, DUPLICATE_EMAIL),
            other => panic!("expected duplicate-email validation, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn update_token_and_delete() {
    let Some(store) = pg_store().await else { return };
    let email = unique_email("lifecycle");
    let created = store.create(&new_user("Grace", &email)).await.expect("create");

    let new_email = unique_email("renamed");
    let rows = store
        .update(&UserUpdate {
            id: created.id,
            name: "Grace Hopper".into(),
            email: new_email.clone(),
        })
        .await
        .expect("update");
    assert_eq!(rows, 1);

    let token = format!("rt-{}", created.id);
    store
        .update_refresh_token(&new_email, &token)
        .await
        .expect("set token");
    let by_token = store.get_by_refresh_token(&token).await.expect("by token");
    assert_eq!(by_token.id, created.id);
    assert_eq!(by_token.name, "Grace Hopper");

    assert_eq!(store.delete_by_id(created.id).await.expect("delete"), 1);
    match store.get_by_id(created.id).await {
        Err(StoreError::NotFound(msg)) => assert_eq!(msg, USER_NOT_FOUND),
        other => panic!("expected not found, got {other:?}"),
    }
    assert!(matches!(
        store.delete_by_id(created.id).await,
        Err(StoreError::NotFound(_))
    ));
}
