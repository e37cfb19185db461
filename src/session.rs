use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const SUBJECT_KEY: &str = "sub";

/// Durable key-value session storage shared with the login flow.
///
/// The chat core only reads from it; `set` exists for the flows that own the
/// credential.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCredential {
    pub access_token: String,
    pub subject: Option<String>,
}

/// Reads the credential under the agreed keys. Blank tokens count as absent.
pub fn read_credential(store: &dyn SessionStore) -> Option<SessionCredential> {
    let access_token = store
        .get(ACCESS_TOKEN_KEY)
        .filter(|token| !token.trim().is_empty())?;
    Some(SessionCredential {
        access_token,
        subject: store.get(SUBJECT_KEY),
    })
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .map_err(|_| anyhow::anyhow!("session store lock poisoned"))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Session store backed by a flat JSON object on disk.
///
/// Reads go to the file every time so a credential written by another
/// process (the login flow) is picked up without restarting.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read session file {}", self.path.display()))?;
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid session file {}", self.path.display()))
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Option<String> {
        match self.load() {
            Ok(mut entries) => entries.remove(key),
            Err(error) => {
                tracing::warn!(error = %error, "session store unreadable");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow::anyhow!("session store lock poisoned"))?;
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_vec_pretty(&entries)?)
            .with_context(|| format!("failed to write session file {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_credential_round_trip() {
        let store = MemorySessionStore::default();
        assert_eq!(read_credential(&store), None);

        store.set(ACCESS_TOKEN_KEY, "abc").unwrap();
        store.set(SUBJECT_KEY, "student-7").unwrap();
        assert_eq!(
            read_credential(&store),
            Some(SessionCredential {
                access_token: "abc".to_string(),
                subject: Some("student-7".to_string()),
            })
        );
    }

    #[test]
    fn test_blank_token_is_absent() {
        let store = MemorySessionStore::default();
        store.set(ACCESS_TOKEN_KEY, "  ").unwrap();
        assert_eq!(read_credential(&store), None);
    }

    #[test]
    fn test_file_store_sees_writes_from_another_handle() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("session.json");
        let writer = FileSessionStore::new(&path);
        let reader = FileSessionStore::new(&path);

        assert_eq!(reader.get(ACCESS_TOKEN_KEY), None);
        writer.set(ACCESS_TOKEN_KEY, "tok").unwrap();
        writer.set(SUBJECT_KEY, "42").unwrap();

        let credential = read_credential(&reader).unwrap();
        assert_eq!(credential.access_token, "tok");
        assert_eq!(credential.subject.as_deref(), Some("42"));
    }

    #[test]
    fn test_corrupt_file_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();

        let store = FileSessionStore::new(&path);
        assert_eq!(store.get(ACCESS_TOKEN_KEY), None);
        assert!(store.set(ACCESS_TOKEN_KEY, "x").is_err());
    }
}
