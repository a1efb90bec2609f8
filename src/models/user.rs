use std::sync::Arc;

use rusqlite::{Connection, Error};
use tokio::sync::Mutex;

use crate::error::InternalError;

#[derive(Clone, Debug, PartialEq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub provider: String,
}

impl User {
    pub async fn create_from_external(
        connection: Arc<Mutex<Connection>>,
        name: String,
        provider: String,
        external_id: &str,
    ) -> Result<User, InternalError> {
        let conn = connection.lock().await;
        conn.execute(
            "insert into user (username, provider, external_id) values ((?1), (?2), (?3))",
            (&name, &provider, external_id),
        )
        .map_err(|err| InternalError::new(format!("Failed to insert user in db: {err}")))?;
        Ok(User {
            id: conn.last_insert_rowid(),
            name,
            provider,
        })
    }

    pub async fn fetch_with_external_id(
        connection: Arc<Mutex<Connection>>,
        provider: &str,
        external_id: &str,
    ) -> Result<Option<User>, InternalError> {
        let conn = connection.lock().await;
        match conn.query_row(
            "select id, username, provider from user where provider = (?1) and external_id = (?2)",
            (provider, external_id),
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    provider: row.get(2)?,
                })
            },
        ) {
            Ok(user) => Ok(Some(user)),
            Err(Error::QueryReturnedNoRows) => Ok(None),
            Err(err) => Err(InternalError::new(format!(
                "Failed to fetch user from db: {err}"
            ))),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::database::create_sqlite_database_in_memory;

    #[tokio::test]
    async fn created_user_can_be_fetched_by_external_id() {
        let connection = Arc::new(Mutex::new(create_sqlite_database_in_memory().unwrap()));
        let created = User::create_from_external(
            connection.clone(),
            "frood".to_string(),
            "github".to_string(),
            "42",
        )
        .await
        .unwrap();
        let fetched = User::fetch_with_external_id(connection.clone(), "github", "42")
            .await
            .unwrap();
        assert_eq!(fetched, Some(created));
        assert_eq!(
            User::fetch_with_external_id(connection, "google", "42")
                .await
                .unwrap(),
            None
        );
    }
}
