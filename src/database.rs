use async_trait::async_trait;
use log::debug;
use rusqlite::{Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum SqliteDatabaseError {
    #[error("Could not open database: {source}")]
    RusqliteError {
        #[from]
        source: rusqlite::Error,
    },
    #[error("Could not apply database migrations: {source}")]
    MigrationError {
        #[from]
        source: refinery::Error,
    },
}

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("./sql_migrations");
}

pub fn apply_migrations(connection: &mut Connection) -> Result<(), SqliteDatabaseError> {
    let report = embedded::migrations::runner().run(connection)?;
    debug!(
        "Applied {} migrations",
        report.applied_migrations().len()
    );
    Ok(())
}

pub fn create_sqlite_database_on_disk(
    file_path: impl Into<PathBuf>,
) -> Result<Connection, SqliteDatabaseError> {
    let file_path = file_path.into();
    let mut connection = Connection::open(&file_path)?;
    apply_migrations(&mut connection)?;
    Ok(connection)
}

/// Create an in-memory sqlite database with all migrations applied.
///
/// Nothing written to the returned connection survives a restart.
#[cfg(test)]
pub fn create_sqlite_database_in_memory() -> Result<Connection, SqliteDatabaseError> {
    let mut connection = Connection::open_in_memory()?;
    apply_migrations(&mut connection)?;
    Ok(connection)
}

/// Key-value string storage, the server side stand-in for browser local
/// storage.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn read(&self, key: &str) -> Result<Option<String>, SqliteDatabaseError>;
    async fn write(&self, key: &str, value: &str) -> Result<(), SqliteDatabaseError>;
}

/// Storage backed by the `local_storage` table, scoped to a single user.
#[derive(Clone)]
pub struct UserStorage {
    connection: Arc<Mutex<Connection>>,
    user_id: i64,
}

impl UserStorage {
    pub fn new(connection: Arc<Mutex<Connection>>, user_id: i64) -> Self {
        UserStorage {
            connection,
            user_id,
        }
    }
}

#[async_trait]
impl Storage for UserStorage {
    async fn read(&self, key: &str) -> Result<Option<String>, SqliteDatabaseError> {
        let conn = self.connection.lock().await;
        let value = conn
            .query_row(
                "SELECT value FROM local_storage WHERE user_id = (?1) AND key = (?2)",
                (self.user_id, key),
                |row| row.get::<usize, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), SqliteDatabaseError> {
        let conn = self.connection.lock().await;
        conn.execute(
            "INSERT INTO local_storage (user_id, key, value) VALUES ((?1), (?2), (?3))
             ON CONFLICT (user_id, key) DO UPDATE SET value = excluded.value",
            (self.user_id, key, value),
        )?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    data: Arc<Mutex<HashMap<String, String>>>,
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn read(&self, key: &str) -> Result<Option<String>, SqliteDatabaseError> {
        Ok(self.data.lock().await.get(key).cloned())
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), SqliteDatabaseError> {
        self.data
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::models::user::User;

    fn create_connection() -> Arc<Mutex<Connection>> {
        Arc::new(Mutex::new(
            create_sqlite_database_in_memory().expect("in-memory database"),
        ))
    }

    #[tokio::test]
    async fn given_no_previous_write_then_read_returns_none() {
        let storage = InMemoryStorage::default();
        assert_eq!(storage.read("favorites").await.unwrap(), None);
    }

    #[tokio::test]
    async fn user_storage_overwrites_previous_value() {
        let connection = create_connection();
        let user = User::create_from_external(
            connection.clone(),
            "test".to_string(),
            "test".to_string(),
            "1",
        )
        .await
        .unwrap();
        let storage = UserStorage::new(connection, user.id);
        storage.write("favorites", "[\"Paris\"]").await.unwrap();
        storage.write("favorites", "[\"Oslo\"]").await.unwrap();
        assert_eq!(
            storage.read("favorites").await.unwrap().as_deref(),
            Some("[\"Oslo\"]")
        );
    }

    #[tokio::test]
    async fn user_storage_is_scoped_per_user() {
        let connection = create_connection();
        let alice = User::create_from_external(
            connection.clone(),
            "alice".to_string(),
            "test".to_string(),
            "1",
        )
        .await
        .unwrap();
        let bob = User::create_from_external(
            connection.clone(),
            "bob".to_string(),
            "test".to_string(),
            "2",
        )
        .await
        .unwrap();
        UserStorage::new(connection.clone(), alice.id)
            .write("favorites", "[\"Paris\"]")
            .await
            .unwrap();
        assert_eq!(
            UserStorage::new(connection, bob.id)
                .read("favorites")
                .await
                .unwrap(),
            None
        );
    }
}
