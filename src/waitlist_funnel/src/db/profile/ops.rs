use std::{path::Path, sync::Mutex};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, warn};

use super::{Profile, ProfilePatch, PROFILE_KEY};
use crate::{
    db::utils::create_tables_if_not_exist,
    error::{FunnelError, FunnelResult},
};

/// Owner of the visitor's profile record.
///
/// `merge` is the only write path; each call is one atomic read-modify-write.
pub trait ProfileStore: Send + Sync {
    /// `None` when nothing is stored or the stored document does not decode.
    fn load(&self) -> Option<Profile>;

    fn merge(&self, patch: ProfilePatch) -> FunnelResult<Profile>;
}

fn decode(raw: Option<String>) -> Option<Profile> {
    let raw = raw?;
    match serde_json::from_str::<Profile>(&raw) {
        Ok(profile) => Some(profile),
        Err(err) => {
            warn!(%err, "stored profile is unreadable, treating it as absent");
            None
        }
    }
}

fn merge_document(raw: Option<String>, patch: ProfilePatch) -> FunnelResult<(Profile, String)> {
    let mut profile = decode(raw).unwrap_or_default();
    profile.apply(patch, Utc::now());
    let encoded = serde_json::to_string(&profile)?;
    Ok((profile, encoded))
}

pub struct SqliteProfileStore {
    conn: Mutex<Connection>,
}

impl SqliteProfileStore {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let conn = Connection::open(path)?;
        create_tables_if_not_exist(&conn)?;
        Ok(SqliteProfileStore {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        create_tables_if_not_exist(&conn)?;
        Ok(SqliteProfileStore {
            conn: Mutex::new(conn),
        })
    }

    fn read_raw(conn: &Connection) -> rusqlite::Result<Option<String>> {
        conn.query_row(
            "SELECT value FROM KeyValue WHERE key = ?1",
            params![PROFILE_KEY],
            |row| row.get(0),
        )
        .optional()
    }
}

impl ProfileStore for SqliteProfileStore {
    fn load(&self) -> Option<Profile> {
        let conn = match self.conn.lock() {
            Ok(conn) => conn,
            Err(err) => {
                warn!(%err, "profile connection lock poisoned");
                return None;
            }
        };
        match Self::read_raw(&conn) {
            Ok(raw) => decode(raw),
            Err(err) => {
                warn!(%err, "failed to read profile");
                None
            }
        }
    }

    fn merge(&self, patch: ProfilePatch) -> FunnelResult<Profile> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|err| FunnelError::Lock(err.to_string()))?;

        let tx = conn.transaction()?;
        let (profile, encoded) = merge_document(Self::read_raw(&tx)?, patch)?;
        tx.execute(
            "INSERT INTO KeyValue (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![PROFILE_KEY, encoded],
        )?;
        tx.commit()?;

        debug!(email = ?profile.email, "profile merged");
        Ok(profile)
    }
}

/// Keeps the encoded document in memory. Same decode rules as the SQLite store.
#[derive(Default)]
pub struct MemoryProfileStore {
    raw: Mutex<Option<String>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_raw(raw: impl Into<String>) -> Self {
        MemoryProfileStore {
            raw: Mutex::new(Some(raw.into())),
        }
    }
}

impl ProfileStore for MemoryProfileStore {
    fn load(&self) -> Option<Profile> {
        match self.raw.lock() {
            Ok(raw) => decode(raw.clone()),
            Err(err) => {
                warn!(%err, "profile lock poisoned");
                None
            }
        }
    }

    fn merge(&self, patch: ProfilePatch) -> FunnelResult<Profile> {
        let mut raw = self
            .raw
            .lock()
            .map_err(|err| FunnelError::Lock(err.to_string()))?;
        let (profile, encoded) = merge_document(raw.clone(), patch)?;
        *raw = Some(encoded);
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn email_patch(email: &str) -> ProfilePatch {
        ProfilePatch {
            email: Some(email.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn empty_store_loads_nothing() {
        assert!(MemoryProfileStore::new().load().is_none());
        assert!(SqliteProfileStore::open_in_memory().unwrap().load().is_none());
    }

    #[test]
    fn corrupt_document_is_treated_as_absent() {
        let store = MemoryProfileStore::with_raw("{not json");
        assert!(store.load().is_none());

        let merged = store
            .merge(ProfilePatch {
                name: Some("Ada".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(merged.name.as_deref(), Some("Ada"));
        assert!(merged.email.is_none());
    }

    #[test]
    fn disjoint_merges_accumulate() {
        let store = SqliteProfileStore::open_in_memory().unwrap();
        store.merge(email_patch("a@b.co")).unwrap();
        store
            .merge(ProfilePatch {
                wallet_address: Some("0x1".to_string()),
                ..Default::default()
            })
            .unwrap();
        store
            .merge(ProfilePatch {
                discord_username: Some("ada_l".to_string()),
                discord_joined: Some(true),
                ..Default::default()
            })
            .unwrap();

        let profile = store.load().unwrap();
        assert_eq!(profile.email.as_deref(), Some("a@b.co"));
        assert_eq!(profile.wallet_address.as_deref(), Some("0x1"));
        assert_eq!(profile.discord_username.as_deref(), Some("ada_l"));
        assert!(profile.discord_joined);
        assert!(profile.updated_at.is_some());
    }

    #[test]
    fn disjoint_merges_commute() {
        let patches = vec![
            email_patch("a@b.co"),
            ProfilePatch {
                wallet_address: Some("0x1".to_string()),
                ..Default::default()
            },
            ProfilePatch {
                twitter_username: Some("ada".to_string()),
                twitter_followed: Some(true),
                ..Default::default()
            },
            ProfilePatch {
                name: Some("Ada".to_string()),
                referral_code: Some("abcd1234".to_string()),
                ..Default::default()
            },
        ];

        let forward = MemoryProfileStore::new();
        for patch in patches.iter().cloned() {
            forward.merge(patch).unwrap();
        }
        let backward = SqliteProfileStore::open_in_memory().unwrap();
        for patch in patches.into_iter().rev() {
            backward.merge(patch).unwrap();
        }

        let unstamped = |profile: Profile| Profile {
            updated_at: None,
            ..profile
        };
        assert_eq!(
            unstamped(forward.load().unwrap()),
            unstamped(backward.load().unwrap())
        );
    }

    #[test]
    fn memory_store_keeps_only_the_encoded_merge_result() {
        let store = MemoryProfileStore::with_raw(r#"{"email":"a@b.co"}"#);
        let merged = store
            .merge(ProfilePatch {
                name: Some("Ada".to_string()),
                ..Default::default()
            })
            .unwrap();

        let raw = store.raw.lock().unwrap().clone().unwrap();
        assert_eq!(serde_json::from_str::<Profile>(&raw).unwrap(), merged);
        assert_eq!(merged.email.as_deref(), Some("a@b.co"));
    }

    #[test]
    fn overlapping_merges_keep_the_last_value() {
        let store = MemoryProfileStore::new();
        store.merge(email_patch("first@b.co")).unwrap();
        store.merge(email_patch("second@b.co")).unwrap();
        assert_eq!(store.load().unwrap().email.as_deref(), Some("second@b.co"));
    }

    #[test]
    fn sqlite_profile_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("waitlist.db");
        {
            let store = SqliteProfileStore::open(&path).unwrap();
            store.merge(email_patch("a@b.co")).unwrap();
        }
        let store = SqliteProfileStore::open(&path).unwrap();
        assert_eq!(store.load().unwrap().email.as_deref(), Some("a@b.co"));
    }

    #[test]
    fn sqlite_corrupt_row_is_treated_as_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("waitlist.db");
        let store = SqliteProfileStore::open(&path).unwrap();
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute(
                "INSERT INTO KeyValue (key, value) VALUES (?1, ?2)",
                params![PROFILE_KEY, "[1, 2"],
            )
            .unwrap();
        }
        assert!(store.load().is_none());
        let merged = store.merge(email_patch("a@b.co")).unwrap();
        assert_eq!(merged.email.as_deref(), Some("a@b.co"));
        assert_eq!(store.load().unwrap(), merged);
    }

    #[test]
    fn concurrent_merges_do_not_lose_fields() {
        let store = Arc::new(MemoryProfileStore::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    let patch = match i {
                        0 => email_patch("a@b.co"),
                        1 => ProfilePatch {
                            name: Some("Ada".to_string()),
                            ..Default::default()
                        },
                        2 => ProfilePatch {
                            wallet_address: Some("0x1".to_string()),
                            ..Default::default()
                        },
                        _ => ProfilePatch {
                            referral_code: Some("abcd1234".to_string()),
                            ..Default::default()
                        },
                    };
                    store.merge(patch).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let profile = store.load().unwrap();
        assert_eq!(profile.email.as_deref(), Some("a@b.co"));
        assert_eq!(profile.name.as_deref(), Some("Ada"));
        assert_eq!(profile.wallet_address.as_deref(), Some("0x1"));
        assert_eq!(profile.referral_code.as_deref(), Some("abcd1234"));
    }
}
