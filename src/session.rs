//! Persisted login state shared by the auth flow, the route guard and the
//! API client.

use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, RwLock};
use tracing::{debug, info};

use crate::db::{Database, StorageError};

const TOKEN_KEY: &str = "token";
const USERNAME_KEY: &str = "username";
const LOGGED_IN_AT_KEY: &str = "logged_in_at";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub token: Option<String>,
    pub username: Option<String>,
    pub logged_in_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// The single session context for a process.
///
/// `open` loads whatever a previous run persisted; `set` and `clear` write
/// through to storage before updating the in-memory copy.
pub struct SessionStore {
    db: Mutex<Database>,
    current: RwLock<Session>,
}

impl SessionStore {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        Self::from_database(Database::open(path)?)
    }

    pub fn from_database(db: Database) -> Result<Self, StorageError> {
        let logged_in_at = db
            .get(LOGGED_IN_AT_KEY)?
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc));
        let session = Session {
            token: db.get(TOKEN_KEY)?,
            username: db.get(USERNAME_KEY)?,
            logged_in_at,
        };
        debug!(
            authenticated = session.is_authenticated(),
            "loaded persisted session"
        );
        Ok(SessionStore {
            db: Mutex::new(db),
            current: RwLock::new(session),
        })
    }

    pub fn get(&self) -> Session {
        self.current
            .read()
            .map(|s| s.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn token(&self) -> Option<String> {
        self.get().token
    }

    pub fn username(&self) -> Option<String> {
        self.get().username
    }

    pub fn set(&self, token: &str, username: &str) -> Result<Session, StorageError> {
        let now = Utc::now();
        let stamp = now.to_rfc3339();
        self.lock_db().set_many(&[
            (TOKEN_KEY, token),
            (USERNAME_KEY, username),
            (LOGGED_IN_AT_KEY, stamp.as_str()),
        ])?;

        let session = Session {
            token: Some(token.to_string()),
            username: Some(username.to_string()),
            logged_in_at: Some(now),
        };
        self.replace(session.clone());
        info!(%username, "session stored");
        Ok(session)
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.lock_db()
            .remove_many(&[TOKEN_KEY, USERNAME_KEY, LOGGED_IN_AT_KEY])?;
        self.replace(Session::default());
        info!("session cleared");
        Ok(())
    }

    fn replace(&self, session: Session) {
        match self.current.write() {
            Ok(mut guard) => *guard = session,
            Err(poisoned) => *poisoned.into_inner() = session,
        }
    }

    fn lock_db(&self) -> MutexGuard<'_, Database> {
        self.db.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
