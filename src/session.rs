//! Signed-in session: an explicitly owned context with a restore/establish/
//! clear lifecycle, backed by a small key-value store.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, error, warn};

pub const ACCESS_TOKEN: &str = "access_token";
pub const REFRESH_TOKEN: &str = "refresh_token";
pub const TOKEN_TYPE: &str = "token_type";
pub const CURRENT_USER: &str = "current_user";

const SESSION_KEYS: [&str; 4] = [ACCESS_TOKEN, REFRESH_TOKEN, TOKEN_TYPE, CURRENT_USER];

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to write session store {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode session data: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub email: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: Option<String>,
}

/// Persistent key-value storage for the session. Writes of several keys land
/// together or not at all.
pub trait SessionStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set_many(&mut self, entries: &[(&str, &str)]) -> Result<(), SessionError>;
    fn remove_many(&mut self, keys: &[&str]) -> Result<(), SessionError>;
}

/// In-process store, nothing survives the process.
#[derive(Debug, Default, Clone)]
pub struct MemorySessionStore {
    entries: BTreeMap<String, String>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set_many(&mut self, entries: &[(&str, &str)]) -> Result<(), SessionError> {
        for (key, value) in entries {
            self.entries.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }

    fn remove_many(&mut self, keys: &[&str]) -> Result<(), SessionError> {
        for key in keys {
            self.entries.remove(*key);
        }
        Ok(())
    }
}

/// JSON object on disk. Every write goes to a temp file first and is renamed
/// over the old one.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileSessionStore {
    /// Open (or start) the store at `path`. A corrupt file is treated as empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "session file unreadable, starting empty");
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), SessionError> {
        let io = |source| SessionError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(entries)?).map_err(io)?;
        fs::rename(&tmp, &self.path).map_err(io)?;
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set_many(&mut self, entries: &[(&str, &str)]) -> Result<(), SessionError> {
        let mut next = self.entries.clone();
        for (key, value) in entries {
            next.insert(key.to_string(), value.to_string());
        }
        self.flush(&next)?;
        self.entries = next;
        Ok(())
    }

    fn remove_many(&mut self, keys: &[&str]) -> Result<(), SessionError> {
        let mut next = self.entries.clone();
        for key in keys {
            next.remove(*key);
        }
        self.flush(&next)?;
        self.entries = next;
        Ok(())
    }
}

/// Who is signed in. Handed explicitly to whatever needs it.
pub struct Session {
    store: Box<dyn SessionStore>,
    user: Option<User>,
    authenticated: bool,
}

impl Session {
    pub fn new(store: Box<dyn SessionStore>) -> Self {
        Self {
            store,
            user: None,
            authenticated: false,
        }
    }

    /// Session restored from whatever the store holds.
    pub fn restored(store: Box<dyn SessionStore>) -> Self {
        let mut session = Self::new(store);
        session.restore();
        session
    }

    /// Signed in only when both a token and a user record are stored. A user
    /// record that does not parse wipes the store.
    pub fn restore(&mut self) -> bool {
        let token = self.store.get(ACCESS_TOKEN);
        let user = self.store.get(CURRENT_USER);

        match (token, user) {
            (Some(_), Some(raw)) => match serde_json::from_str::<User>(&raw) {
                Ok(user) => {
                    debug!(email = %user.email, "session restored");
                    self.user = Some(user);
                    self.authenticated = true;
                }
                Err(e) => {
                    error!(error = %e, "stored user is corrupt, clearing session");
                    self.clear();
                }
            },
            _ => {
                self.user = None;
                self.authenticated = false;
            }
        }
        self.authenticated
    }

    /// Record a successful sign-in. Keys this sign-in does not supply are
    /// removed, so the store never mixes two logins.
    pub fn establish(&mut self, user: Option<User>, tokens: Option<&Tokens>) {
        let user_json = user.as_ref().and_then(|u| serde_json::to_string(u).ok());

        let mut entries: Vec<(&str, &str)> = Vec::new();
        if let Some(json) = user_json.as_deref() {
            entries.push((CURRENT_USER, json));
        }
        if let Some(tokens) = tokens {
            entries.push((ACCESS_TOKEN, tokens.access_token.as_str()));
            if let Some(refresh) = tokens.refresh_token.as_deref() {
                entries.push((REFRESH_TOKEN, refresh));
            }
            if let Some(kind) = tokens.token_type.as_deref() {
                entries.push((TOKEN_TYPE, kind));
            }
        }

        let stale: Vec<&str> = SESSION_KEYS
            .into_iter()
            .filter(|key| !entries.iter().any(|(k, _)| k == key))
            .collect();
        if let Err(e) = self.store.remove_many(&stale) {
            error!(error = %e, "failed to drop stale session keys");
        }
        if let Err(e) = self.store.set_many(&entries) {
            error!(error = %e, "failed to persist session");
        }
        self.authenticated = user.is_some() || tokens.is_some();
        self.user = user;
    }

    /// Forget everything, in memory and in the store.
    pub fn clear(&mut self) {
        self.user = None;
        self.authenticated = false;
        if let Err(e) = self.store.remove_many(&SESSION_KEYS) {
            error!(error = %e, "failed to clear stored session");
        }
    }

    /// Checks the store again when not signed in in memory.
    pub fn is_authenticated(&mut self) -> bool {
        if !self.authenticated {
            self.restore();
        }
        self.authenticated
    }

    pub fn current_user(&mut self) -> Option<&User> {
        if self.user.is_none() {
            self.restore();
        }
        self.user.as_ref()
    }

    pub fn access_token(&self) -> Option<String> {
        self.store.get(ACCESS_TOKEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user(email: &str) -> User {
        serde_json::from_value(json!({ "id": 7, "email": email, "name": "Tester" })).unwrap()
    }

    fn tokens() -> Tokens {
        Tokens {
            access_token: "acc".into(),
            refresh_token: Some("ref".into()),
            token_type: Some("Bearer".into()),
        }
    }

    #[test]
    fn test_establish_then_restore() {
        let mut store = MemorySessionStore::new();
        {
            let mut session = Session::new(Box::new(store.clone()));
            session.establish(Some(user("a@b.c")), Some(&tokens()));
            assert!(session.is_authenticated());
            assert_eq!(session.access_token().as_deref(), Some("acc"));
        }

        // A fresh store never saw those writes.
        let mut session = Session::restored(Box::new(store.clone()));
        assert!(!session.is_authenticated());

        let json = serde_json::to_string(&user("a@b.c")).unwrap();
        store
            .set_many(&[(ACCESS_TOKEN, "acc"), (CURRENT_USER, &json)])
            .unwrap();
        let mut session = Session::restored(Box::new(store));
        assert!(session.is_authenticated());
        assert_eq!(session.current_user().map(|u| u.email.as_str()), Some("a@b.c"));
        assert_eq!(session.current_user().unwrap().extra["name"], "Tester");
    }

    #[test]
    fn test_relogin_drops_keys_the_new_login_lacks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let mut session = Session::new(Box::new(FileSessionStore::open(&path)));
        session.establish(Some(user("first@b.c")), Some(&tokens()));

        let bare = Tokens {
            access_token: "acc-2".into(),
            refresh_token: None,
            token_type: None,
        };
        session.establish(Some(user("second@b.c")), Some(&bare));

        let reopened = FileSessionStore::open(&path);
        assert_eq!(reopened.get(ACCESS_TOKEN).as_deref(), Some("acc-2"));
        assert_eq!(reopened.get(REFRESH_TOKEN), None);
        assert_eq!(reopened.get(TOKEN_TYPE), None);
        assert_eq!(session.current_user().map(|u| u.email.as_str()), Some("second@b.c"));
    }

    #[test]
    fn test_restore_needs_token_and_user() {
        let mut store = MemorySessionStore::new();
        store.set_many(&[(ACCESS_TOKEN, "acc")]).unwrap();
        let mut session = Session::restored(Box::new(store));
        assert!(!session.is_authenticated());
        assert!(session.current_user().is_none());
    }

    #[test]
    fn test_corrupt_user_clears_everything() {
        let mut store = MemorySessionStore::new();
        store
            .set_many(&[(ACCESS_TOKEN, "acc"), (CURRENT_USER, "{not json"), (TOKEN_TYPE, "Bearer")])
            .unwrap();
        let mut session = Session::restored(Box::new(store));
        assert!(!session.is_authenticated());
        assert_eq!(session.access_token(), None);
    }

    #[test]
    fn test_file_store_persists_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let mut session = Session::new(Box::new(FileSessionStore::open(&path)));
        session.establish(Some(user("x@y.z")), Some(&tokens()));
        assert!(path.exists());

        let reopened = FileSessionStore::open(&path);
        assert_eq!(reopened.get(REFRESH_TOKEN).as_deref(), Some("ref"));
        assert_eq!(reopened.get(TOKEN_TYPE).as_deref(), Some("Bearer"));

        let mut session = Session::restored(Box::new(reopened));
        assert!(session.is_authenticated());
        session.clear();

        let reopened = FileSessionStore::open(&path);
        for key in SESSION_KEYS {
            assert_eq!(reopened.get(key), None, "{key} should be gone");
        }
    }

    #[test]
    fn test_file_store_ignores_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "garbage").unwrap();
        let store = FileSessionStore::open(&path);
        assert_eq!(store.get(ACCESS_TOKEN), None);
        assert_eq!(store.path(), path.as_path());
    }
}
