//! One-PIN-per-user credential store
//!
//! Credentials live in a single JSON document:
//!
//! ```json
//! { "passwords": [ { "uid": "1234:5678", "password": "1,2,4,8" } ] }
//! ```
//!
//! The file on disk is authoritative. Every write reloads it first, then
//! replaces the whole file: the old file is deleted, a new one is created and
//! the document is written and flushed once. Between the delete and the
//! write there is no valid file on disk; a crash inside that window loses the
//! store. Writers are serialized by a lock held across the whole cycle.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::account::AccountUid;
use crate::error::{CoreError, Result};
use crate::pin::PinCode;

/// In-memory view of the credential file, keyed by uid string
pub type Credentials = BTreeMap<String, PinCode>;

/// On-disk document
#[derive(Debug, Default, Serialize, Deserialize)]
struct CredentialFile {
    passwords: Vec<CredentialRecord>,
}

/// One user's record
#[derive(Debug, Serialize, Deserialize)]
struct CredentialRecord {
    uid: String,
    password: String,
}

/// Parse the contents of a credential file
///
/// Blank contents are an empty store. Later records for the same uid
/// replace earlier ones.
pub fn parse_credentials(contents: &str) -> Result<Credentials> {
    if contents.trim().is_empty() {
        debug!("Credential file is empty");
        return Ok(Credentials::new());
    }

    let file: CredentialFile = serde_json::from_str(contents)
        .map_err(|e| CoreError::MalformedStore(e.to_string()))?;

    let mut credentials = Credentials::new();
    for record in file.passwords {
        credentials.insert(record.uid, PinCode::from_stored(record.password));
    }

    Ok(credentials)
}

/// File-backed credential store
pub struct CredentialStore {
    /// Path to the credential file
    path: PathBuf,
    /// Serializes load-modify-store cycles
    lock: Mutex<()>,
}

impl CredentialStore {
    /// Create a store backed by the given file (not touched until used)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all credentials, treating any failure as an empty store
    pub fn load(&self) -> Credentials {
        match self.try_load() {
            Ok(credentials) => credentials,
            Err(e) => {
                error!("Could not load credential store {:?}: {}", self.path, e);
                Credentials::new()
            }
        }
    }

    /// Load all credentials
    ///
    /// A missing or empty file is an empty store. A file that is present but
    /// not a valid document is an error; nothing of it is recovered.
    pub fn try_load(&self) -> Result<Credentials> {
        debug!("Loading credential store at {:?}", self.path);

        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No credential file yet");
                return Ok(Credentials::new());
            }
            Err(e) => return Err(e.into()),
        };

        parse_credentials(&contents)
    }

    /// Stored PIN for a user, if any
    pub fn get(&self, uid: &AccountUid) -> Option<PinCode> {
        self.load().remove(&uid.to_string())
    }

    /// Whether a PIN has been set up for a user
    pub fn has_credential(&self, uid: &AccountUid) -> bool {
        self.load().contains_key(&uid.to_string())
    }

    /// Store (or replace) the PIN of a user
    pub fn save(&self, uid: &AccountUid, pin: &PinCode) -> Result<()> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| CoreError::LockPoisoned)?;

        // Refuse to replace a file we could not read
        let mut credentials = self.try_load()?;
        credentials.insert(uid.to_string(), pin.clone());

        self.write(&credentials)?;
        info!("Saved PIN for user {}", uid);
        Ok(())
    }

    /// Forget the PIN of a user
    pub fn remove(&self, uid: &AccountUid) -> Result<bool> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| CoreError::LockPoisoned)?;

        let mut credentials = self.try_load()?;
        if credentials.remove(&uid.to_string()).is_none() {
            return Ok(false);
        }

        self.write(&credentials)?;
        info!("Removed PIN for user {}", uid);
        Ok(true)
    }

    /// Replace the credential file with the given records
    fn write(&self, credentials: &Credentials) -> Result<()> {
        let document = CredentialFile {
            passwords: credentials
                .iter()
                .map(|(uid, pin)| CredentialRecord {
                    uid: uid.clone(),
                    password: pin.as_str().to_string(),
                })
                .collect(),
        };
        let contents = serde_json::to_string(&document)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != ErrorKind::NotFound {
                warn!("Could not delete the current credential file: {}", e);
            }
        }

        let mut file = File::create(&self.path)?;
        file.write_all(contents.as_bytes())?;
        file.flush()?;

        debug!("Wrote {} credential record(s)", document.passwords.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn alice() -> AccountUid {
        AccountUid::new(1, 2)
    }

    fn bob() -> AccountUid {
        AccountUid::new(3, 4)
    }

    #[test]
    fn test_missing_file_is_empty() {
        let temp_dir = tempdir().unwrap();
        let store = CredentialStore::new(temp_dir.path().join("passwords.json"));

        assert!(store.try_load().unwrap().is_empty());
        assert!(!store.has_credential(&alice()));
        assert!(store.get(&alice()).is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("passwords.json");
        let store = CredentialStore::new(&path);

        let pin = PinCode::encode(&[1, 2, 3, 4]);
        store.save(&alice(), &pin).unwrap();

        let reopened = CredentialStore::new(&path);
        let credentials = reopened.load();
        assert_eq!(credentials.len(), 1);
        assert_eq!(credentials.get("1:2"), Some(&pin));
    }

    #[test]
    fn test_file_format() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("passwords.json");
        let store = CredentialStore::new(&path);

        store.save(&alice(), &PinCode::encode(&[1, 2, 4, 8])).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["passwords"][0]["uid"], "1:2");
        assert_eq!(raw["passwords"][0]["password"], "1,2,4,8");
    }

    #[test]
    fn test_one_record_per_user() {
        let temp_dir = tempdir().unwrap();
        let store = CredentialStore::new(temp_dir.path().join("passwords.json"));

        store.save(&alice(), &PinCode::encode(&[1, 1, 1, 1])).unwrap();
        store.save(&bob(), &PinCode::encode(&[2, 2, 2, 2])).unwrap();
        store.save(&alice(), &PinCode::encode(&[3, 3, 3, 3])).unwrap();

        let credentials = store.load();
        assert_eq!(credentials.len(), 2);
        assert_eq!(store.get(&alice()), Some(PinCode::encode(&[3, 3, 3, 3])));
        assert_eq!(store.get(&bob()), Some(PinCode::encode(&[2, 2, 2, 2])));
    }

    #[test]
    fn test_creates_missing_directory() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("dir").join("passwords.json");
        let store = CredentialStore::new(&path);

        store.save(&alice(), &PinCode::encode(&[1, 2, 3, 4])).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_malformed_file_loads_empty_and_is_not_overwritten() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("passwords.json");
        fs::write(&path, "{ not json").unwrap();
        let store = CredentialStore::new(&path);

        assert!(matches!(store.try_load(), Err(CoreError::MalformedStore(_))));
        assert!(store.load().is_empty());

        assert!(store.save(&alice(), &PinCode::encode(&[1, 2, 3, 4])).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn test_parse_keeps_last_duplicate() {
        let contents = r#"{"passwords":[
            {"uid":"1:2","password":"1,1,1,1"},
            {"uid":"1:2","password":"2,2,2,2"}
        ]}"#;

        let credentials = parse_credentials(contents).unwrap();
        assert_eq!(credentials.len(), 1);
        assert_eq!(credentials.get("1:2").unwrap().as_str(), "2,2,2,2");
    }

    #[test]
    fn test_parse_rejects_missing_fields() {
        assert!(parse_credentials(r#"{"passwords":[{"uid":"1:2"}]}"#).is_err());
        assert!(parse_credentials("  \n").unwrap().is_empty());
    }

    #[test]
    fn test_empty_file_is_empty_store() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("passwords.json");
        fs::write(&path, "").unwrap();
        let store = CredentialStore::new(&path);

        assert!(store.try_load().unwrap().is_empty());
        store.save(&alice(), &PinCode::encode(&[1, 2, 3, 4])).unwrap();
        assert!(store.has_credential(&alice()));
    }

    #[test]
    fn test_remove() {
        let temp_dir = tempdir().unwrap();
        let store = CredentialStore::new(temp_dir.path().join("passwords.json"));

        store.save(&alice(), &PinCode::encode(&[1, 2, 3, 4])).unwrap();
        store.save(&bob(), &PinCode::encode(&[4, 3, 2, 1])).unwrap();

        assert!(store.remove(&alice()).unwrap());
        assert!(!store.remove(&alice()).unwrap());
        assert!(!store.has_credential(&alice()));
        assert!(store.has_credential(&bob()));
    }
}
