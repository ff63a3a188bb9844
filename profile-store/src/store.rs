use std::path::Path;

use async_trait::async_trait;
use sled::{Db, IVec, Tree};

use crate::error::{Result, StoreError};
use crate::profile::{validate_email, Profile, ProfileChanges};

/// Name of the sled tree holding profile records, keyed by email bytes.
const PROFILES_TREE: &str = "profiles";

/// Durable mapping from email to [`Profile`], with uniqueness enforced by
/// the backend's key space rather than application-level locking.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Persist a new profile. Fails with [`StoreError::AlreadyExists`] if the
    /// email is taken and [`StoreError::InvalidInput`] if it is missing or
    /// has no `@`.
    async fn create(
        &self,
        email: &str,
        name: Option<String>,
        address: Option<String>,
    ) -> Result<Profile>;

    async fn get(&self, email: &str) -> Result<Profile>;

    /// Every stored profile, in key (email) order.
    async fn list_all(&self) -> Result<Vec<Profile>>;

    /// Overwrite only the fields supplied in `changes`; the rest keep their
    /// stored values.
    async fn update(&self, email: &str, changes: ProfileChanges) -> Result<Profile>;

    /// Create-if-absent-else-overwrite. Unlike [`ProfileStore::update`], both
    /// fields are written unconditionally. Returns the record and whether it
    /// was newly created.
    async fn upsert(
        &self,
        email: &str,
        name: Option<String>,
        address: Option<String>,
    ) -> Result<(Profile, bool)>;

    async fn delete(&self, email: &str) -> Result<()>;

    /// Remove every record and report how many were removed. Destructive;
    /// callers are expected to gate this behind an explicit flag or prompt.
    async fn delete_all(&self) -> Result<usize>;
}

#[derive(Clone, Debug)]
pub struct SledStore {
    db: Db,
    tree: Tree,
}

impl SledStore {
    /// Open (or create) the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        let tree = db.open_tree(PROFILES_TREE)?;
        Ok(SledStore { db, tree })
    }

    /// An in-memory database that is discarded on drop. Backs tests and
    /// one-off experiments.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        let tree = db.open_tree(PROFILES_TREE)?;
        Ok(SledStore { db, tree })
    }

    /// Flush outstanding writes. Call once on the way out; sled flushes
    /// periodically on its own while running.
    pub async fn close(&self) -> Result<()> {
        self.db.flush_async().await?;
        Ok(())
    }

    fn decode(bytes: &IVec) -> Result<Profile> {
        Ok(bincode::deserialize(bytes)?)
    }

    fn encode(profile: &Profile) -> Result<Vec<u8>> {
        Ok(bincode::serialize(profile)?)
    }
}

#[async_trait]
impl ProfileStore for SledStore {
    async fn create(
        &self,
        email: &str,
        name: Option<String>,
        address: Option<String>,
    ) -> Result<Profile> {
        validate_email(email)?;
        let profile = Profile {
            email: email.to_owned(),
            name,
            address,
        };
        let bytes = Self::encode(&profile)?;
        // Compare-and-swap against an absent key: racing creates for the
        // same email resolve in the tree, exactly one wins.
        match self
            .tree
            .compare_and_swap(email.as_bytes(), None as Option<&[u8]>, Some(bytes))?
        {
            Ok(()) => Ok(profile),
            Err(_) => Err(StoreError::AlreadyExists(email.to_owned())),
        }
    }

    async fn get(&self, email: &str) -> Result<Profile> {
        let bytes = self
            .tree
            .get(email.as_bytes())?
            .ok_or_else(|| StoreError::NotFound(email.to_owned()))?;
        Self::decode(&bytes)
    }

    async fn list_all(&self) -> Result<Vec<Profile>> {
        let mut profiles = Vec::new();
        for entry in self.tree.iter() {
            let (_, value) = entry?;
            profiles.push(Self::decode(&value)?);
        }
        Ok(profiles)
    }

    async fn update(&self, email: &str, changes: ProfileChanges) -> Result<Profile> {
        loop {
            let current = self
                .tree
                .get(email.as_bytes())?
                .ok_or_else(|| StoreError::NotFound(email.to_owned()))?;
            let mut profile = Self::decode(&current)?;
            changes.apply(&mut profile);
            let next = Self::encode(&profile)?;
            match self
                .tree
                .compare_and_swap(email.as_bytes(), Some(&current), Some(next))?
            {
                Ok(()) => return Ok(profile),
                // Lost a race with another writer; re-read and retry.
                Err(_) => continue,
            }
        }
    }

    async fn upsert(
        &self,
        email: &str,
        name: Option<String>,
        address: Option<String>,
    ) -> Result<(Profile, bool)> {
        validate_email(email)?;
        let profile = Profile {
            email: email.to_owned(),
            name,
            address,
        };
        let previous = self.tree.insert(email.as_bytes(), Self::encode(&profile)?)?;
        Ok((profile, previous.is_none()))
    }

    async fn delete(&self, email: &str) -> Result<()> {
        self.tree
            .remove(email.as_bytes())?
            .ok_or_else(|| StoreError::NotFound(email.to_owned()))?;
        Ok(())
    }

    async fn delete_all(&self) -> Result<usize> {
        let mut removed = 0;
        for entry in self.tree.iter() {
            let (key, _) = entry?;
            if self.tree.remove(key)?.is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SledStore {
        SledStore::temporary().expect("temporary store")
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = store();
        let created = store
            .create("a@b.com", Some("A".to_string()), Some("X".to_string()))
            .await
            .unwrap();
        assert_eq!(created.email, "a@b.com");

        let fetched = store.get("a@b.com").await.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.name.as_deref(), Some("A"));
        assert_eq!(fetched.address.as_deref(), Some("X"));
    }

    #[tokio::test]
    async fn duplicate_create_fails_and_keeps_the_original() {
        let store = store();
        store
            .create("a@b.com", Some("A".to_string()), None)
            .await
            .unwrap();

        let err = store
            .create("a@b.com", Some("B".to_string()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));

        let kept = store.get("a@b.com").await.unwrap();
        assert_eq!(kept.name.as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn create_rejects_emails_without_at_sign() {
        let store = store();
        let err = store
            .create("not-an-email", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_rejects_blank_emails() {
        let store = store();
        let err = store.create("  ", None, None).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_all_returns_every_record() {
        let store = store();
        store.create("a@b.com", None, None).await.unwrap();
        store.create("c@d.com", None, None).await.unwrap();
        store.create("e@f.com", None, None).await.unwrap();

        let emails: Vec<String> = store
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.email)
            .collect();
        assert_eq!(emails, vec!["a@b.com", "c@d.com", "e@f.com"]);
    }

    #[tokio::test]
    async fn partial_update_keeps_unsupplied_fields() {
        let store = store();
        store
            .create("a@b.com", Some("A".to_string()), Some("X".to_string()))
            .await
            .unwrap();

        let updated = store
            .update(
                "a@b.com",
                ProfileChanges {
                    name: None,
                    address: Some("Y".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name.as_deref(), Some("A"));
        assert_eq!(updated.address.as_deref(), Some("Y"));

        let stored = store.get("a@b.com").await.unwrap();
        assert_eq!(stored, updated);
    }

    #[tokio::test]
    async fn update_with_no_fields_is_a_no_op() {
        let store = store();
        store
            .create("a@b.com", Some("A".to_string()), Some("X".to_string()))
            .await
            .unwrap();

        let updated = store
            .update("a@b.com", ProfileChanges::default())
            .await
            .unwrap();
        assert_eq!(updated.name.as_deref(), Some("A"));
        assert_eq!(updated.address.as_deref(), Some("X"));
    }

    #[tokio::test]
    async fn update_of_unknown_email_is_not_found() {
        let store = store();
        let err = store
            .update("ghost@b.com", ProfileChanges::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn upsert_creates_when_absent() {
        let store = store();
        let (profile, was_created) = store
            .upsert("a@b.com", Some("A".to_string()), None)
            .await
            .unwrap();
        assert!(was_created);
        assert_eq!(profile.name.as_deref(), Some("A"));
        assert_eq!(store.get("a@b.com").await.unwrap(), profile);
    }

    #[tokio::test]
    async fn upsert_overwrites_both_fields_when_present() {
        let store = store();
        store
            .create("a@b.com", Some("A".to_string()), Some("X".to_string()))
            .await
            .unwrap();

        // Unlike update, an absent field clears the stored value.
        let (profile, was_created) = store
            .upsert("a@b.com", Some("B".to_string()), None)
            .await
            .unwrap();
        assert!(!was_created);
        assert_eq!(profile.name.as_deref(), Some("B"));
        assert_eq!(profile.address, None);

        let stored = store.get("a@b.com").await.unwrap();
        assert_eq!(stored, profile);
    }

    #[tokio::test]
    async fn upsert_validates_the_email() {
        let store = store();
        let err = store.upsert("nope", None, None).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let store = store();
        store.create("a@b.com", None, None).await.unwrap();

        store.delete("a@b.com").await.unwrap();
        assert!(matches!(
            store.get("a@b.com").await.unwrap_err(),
            StoreError::NotFound(_)
        ));
        assert!(matches!(
            store.delete("a@b.com").await.unwrap_err(),
            StoreError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn delete_all_reports_the_removed_count() {
        let store = store();
        store.create("a@b.com", None, None).await.unwrap();
        store.create("c@d.com", None, None).await.unwrap();

        assert_eq!(store.delete_all().await.unwrap(), 2);
        assert!(store.list_all().await.unwrap().is_empty());
        assert_eq!(store.delete_all().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn concurrent_creates_resolve_to_one_winner() {
        let store = store();
        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .create("a@b.com", Some(format!("writer-{i}")), None)
                    .await
            }));
        }

        let mut wins = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => wins += 1,
                Err(StoreError::AlreadyExists(_)) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(wins, 1);
    }
}
