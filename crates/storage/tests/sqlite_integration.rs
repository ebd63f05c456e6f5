use storage::repository::SessionStore;
use storage::sqlite::SqliteRepository;
use tutor_core::model::{AuthSession, User, UserId};

fn session(token: &str, username: &str) -> AuthSession {
    AuthSession::new(
        token,
        User {
            id: UserId::new(7),
            username: username.to_owned(),
            email: Some(format!("{username}@example.com")),
        },
    )
}

#[tokio::test]
async fn sqlite_session_round_trip() {
    let url = "sqlite:file:memdb_session_roundtrip?mode=memory&cache=shared";
    let repo = SqliteRepository::connect(url).await.expect("connect");
    repo.migrate().await.expect("migrate");

    assert!(repo.load_session().await.unwrap().is_none());

    let saved = session("tok-1", "ada");
    repo.save_session(&saved).await.unwrap();
    let loaded = repo.load_session().await.unwrap().expect("stored session");
    assert_eq!(loaded, saved);
    assert_eq!(loaded.user().email.as_deref(), Some("ada@example.com"));
}

#[tokio::test]
async fn saving_again_replaces_the_single_session_row() {
    let url = "sqlite:file:memdb_session_replace?mode=memory&cache=shared";
    let repo = SqliteRepository::connect(url).await.expect("connect");
    repo.migrate().await.expect("migrate");

    repo.save_session(&session("tok-1", "ada")).await.unwrap();
    repo.save_session(&session("tok-2", "grace")).await.unwrap();

    let loaded = repo.load_session().await.unwrap().expect("stored session");
    assert_eq!(loaded.token(), "tok-2");
    assert_eq!(loaded.user().username, "grace");

    let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM auth_sessions")
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn clearing_removes_the_session_and_is_idempotent() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_session_clear?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    repo.save_session(&session("tok-1", "ada")).await.unwrap();
    repo.clear_session().await.unwrap();
    assert!(repo.load_session().await.unwrap().is_none());
    repo.clear_session().await.unwrap();
}

#[tokio::test]
async fn migrations_can_run_twice() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_migrate_twice?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("first migrate");
    repo.migrate().await.expect("second migrate");

    let (versions,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM schema_migrations")
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert_eq!(versions, 2);
}
