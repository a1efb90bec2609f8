use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use log::trace;
use oauth2::CsrfToken;
use rand::Rng;
use rusqlite::{Connection, Error};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::{error::InternalError, models::user::User};

fn generate_random_bytes(num_bytes: usize) -> Vec<u8> {
    let mut result = vec![0; num_bytes];
    rand::rng().fill(result.as_mut_slice());
    result
}

// Url safe so the token can be put in a cookie as is.
fn create_session_token() -> String {
    BASE64_URL_SAFE_NO_PAD.encode(generate_random_bytes(20))
}

pub async fn start_oauth2_login(
    connection: Arc<Mutex<Connection>>,
    provider: &str,
    csrf_token: &CsrfToken,
) -> Result<(), InternalError> {
    let conn = connection.lock().await;
    conn.execute(
        "insert into pending_oauth2 (csrf_token, provider) values ((?1), (?2))",
        (csrf_token.secret(), provider),
    )
    .map_err(|err| {
        InternalError::new(format!(
            "Failed to insert pending oauth2 action in db: {err}"
        ))
    })?;
    Ok(())
}

/// Consume a pending login and return the name of the provider it was
/// started against. Each CSRF token can only be completed once.
pub async fn complete_oauth2_login(
    connection: Arc<Mutex<Connection>>,
    csrf_token: &str,
) -> Result<String, InternalError> {
    let conn = connection.lock().await;
    let (id, provider) = conn
        .query_row(
            "SELECT id, provider FROM pending_oauth2 WHERE csrf_token = (?1)",
            (csrf_token,),
            |row| Ok((row.get::<usize, i64>(0)?, row.get::<usize, String>(1)?)),
        )
        .map_err(|err| InternalError::new(format!("No pending oauth login found: {err}")))?;
    conn.execute("DELETE FROM pending_oauth2 WHERE id = (?1)", (id,))
        .map_err(|err| {
            InternalError::new(format!(
                "Failed to clear complete pending oauth2 action in db: {err}"
            ))
        })?;

    Ok(provider)
}

#[derive(Clone, Debug)]
pub struct Session {
    pub token: String,
    pub user: User,
}

impl Session {
    pub async fn fetch(
        connection: Arc<Mutex<Connection>>,
        token: &str,
    ) -> Result<Option<Session>, InternalError> {
        let conn = connection.lock().await;
        match conn.query_row(
            "SELECT token, user.id, username, provider FROM session INNER JOIN user ON session.user_id = user.id WHERE session.token = (?1)",
            (token,),
            |row| {
                Ok(Session {
                    token: row.get(0)?,
                    user: User {
                        id: row.get(1)?,
                        name: row.get(2)?,
                        provider: row.get(3)?,
                    },
                })
            },
        ) {
            Ok(session) => Ok(Some(session)),
            Err(Error::QueryReturnedNoRows) => Ok(None),
            Err(err) => {
                trace!("Error running fetch session query");
                Err(InternalError::new(format!(
                    "Failed to fetch session from db: {err}"
                )))
            }
        }
    }

    pub async fn create(
        connection: Arc<Mutex<Connection>>,
        user: &User,
    ) -> Result<Session, InternalError> {
        let conn = connection.lock().await;
        let token = create_session_token();
        conn.execute(
            "insert into session (token, user_id) values ((?1), (?2))",
            (&token, &user.id),
        )
        .map_err(|err| InternalError::new(format!("Failed to insert session in db: {err}")))?;

        Ok(Session {
            token,
            user: user.clone(),
        })
    }

    pub async fn delete(self, connection: Arc<Mutex<Connection>>) -> Result<(), InternalError> {
        let conn = connection.lock().await;

        conn.execute("DELETE FROM session WHERE token = (?1)", (self.token,))
            .map_err(|err| InternalError::new(format!("Failed to delete session in db: {err}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::database::{SqliteDatabaseError, create_sqlite_database_in_memory};
    use crate::models::user::User;

    fn create_connection() -> Result<Arc<Mutex<Connection>>, SqliteDatabaseError> {
        Ok(Arc::new(Mutex::new(create_sqlite_database_in_memory()?)))
    }

    #[tokio::test]
    async fn test_complete_oauth2_with_incorrect_csrf_token_fails() {
        let connection = create_connection().unwrap();
        start_oauth2_login(connection.clone(), "test", &CsrfToken::new_random())
            .await
            .unwrap();
        assert!(
            complete_oauth2_login(connection, CsrfToken::new_random().secret())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_complete_oauth2_clears_request() {
        let connection = create_connection().unwrap();
        let csrf_token = CsrfToken::new_random();
        start_oauth2_login(connection.clone(), "test", &csrf_token)
            .await
            .unwrap();
        // First completion is valid
        assert_eq!(
            "test",
            complete_oauth2_login(connection.clone(), csrf_token.secret())
                .await
                .unwrap()
        );
        // Second fails since the request is cleared
        assert!(
            complete_oauth2_login(connection.clone(), csrf_token.secret())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_create_and_delete_session() {
        let connection = create_connection().unwrap();
        let user = User::create_from_external(
            connection.clone(),
            "test".to_string(),
            "test".to_string(),
            "1",
        )
        .await
        .unwrap();
        let created_session = Session::create(connection.clone(), &user).await.unwrap();
        let fetched_session = Session::fetch(connection.clone(), &created_session.token)
            .await
            .unwrap()
            .expect("session should exist");
        assert_eq!(created_session.token, fetched_session.token);
        assert_eq!(fetched_session.user, user);

        fetched_session.delete(connection.clone()).await.unwrap();
        assert!(
            Session::fetch(connection, &created_session.token)
                .await
                .unwrap()
                .is_none()
        );
    }
}
