use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StoreError;
use crate::profile::profile_model::{
    Credential, Profile, ProfileEntry, StoredProfile, now_ms,
};

// ============================================================================
// Store traits: what the autofill pass reads
// ============================================================================

pub trait CredentialStore {
    fn get_credential(&self) -> Result<Option<Credential>, StoreError>;
    fn set_credential(&mut self, credential: Credential) -> Result<(), StoreError>;
    fn clear_credential(&mut self) -> Result<(), StoreError>;
}

pub trait ProfileStore {
    fn list_profiles(&self) -> Result<Vec<StoredProfile>, StoreError>;
    fn add_profile(
        &mut self,
        name: &str,
        entries: Vec<ProfileEntry>,
    ) -> Result<StoredProfile, StoreError>;
    /// Replace an existing profile by id and refresh its `updated_at_ms`.
    fn update_profile(&mut self, profile: StoredProfile) -> Result<StoredProfile, StoreError>;
    fn delete_profile(&mut self, id: &str) -> Result<(), StoreError>;
    fn set_active_profile(&mut self, id: &str) -> Result<(), StoreError>;
    /// The selected profile, or the first stored one when none is selected.
    fn active_profile(&self) -> Result<Option<StoredProfile>, StoreError>;

    /// Active profile flattened for matching, or `None` when no profile exists.
    fn get_profile(&self) -> Result<Option<Profile>, StoreError> {
        Ok(self.active_profile()?.map(|p| p.to_profile()))
    }
}

// ============================================================================
// Store: in-memory or backed by a single JSON file
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreData {
    #[serde(default)]
    credential: Option<Credential>,
    #[serde(default)]
    profiles: Vec<StoredProfile>,
    #[serde(default)]
    active_profile: Option<String>,
    #[serde(default)]
    next_profile_seq: u64,
}

/// Credential and profile store.
///
/// When opened on a path every mutation is written back immediately; a
/// missing file is treated as an empty store.
#[derive(Debug, Default)]
pub struct Store {
    path: Option<PathBuf>,
    data: StoreData,
}

impl Store {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let data = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).map_err(|e| StoreError::Json {
                path: path.display().to_string(),
                source: e,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreData::default(),
            Err(e) => {
                return Err(StoreError::Io {
                    path: path.display().to_string(),
                    source: e,
                });
            }
        };
        debug!(path = %path.display(), profiles = data.profiles.len(), "opened store");
        Ok(Self {
            path: Some(path),
            data,
        })
    }

    fn persist(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(&self.data).map_err(|e| StoreError::Json {
            path: path.display().to_string(),
            source: e,
        })?;
        std::fs::write(path, json).map_err(|e| StoreError::Io {
            path: path.display().to_string(),
            source: e,
        })
    }

    fn position(&self, id: &str) -> Result<usize, StoreError> {
        self.data
            .profiles
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| StoreError::ProfileNotFound(id.to_string()))
    }
}

impl CredentialStore for Store {
    fn get_credential(&self) -> Result<Option<Credential>, StoreError> {
        Ok(self.data.credential.clone())
    }

    fn set_credential(&mut self, credential: Credential) -> Result<(), StoreError> {
        self.data.credential = Some(credential);
        self.persist()
    }

    fn clear_credential(&mut self) -> Result<(), StoreError> {
        self.data.credential = None;
        self.persist()
    }
}

impl ProfileStore for Store {
    fn list_profiles(&self) -> Result<Vec<StoredProfile>, StoreError> {
        Ok(self.data.profiles.clone())
    }

    fn add_profile(
        &mut self,
        name: &str,
        entries: Vec<ProfileEntry>,
    ) -> Result<StoredProfile, StoreError> {
        self.data.next_profile_seq += 1;
        let id = format!("profile-{}", self.data.next_profile_seq);
        let profile = StoredProfile::new(&id, name, entries);
        self.data.profiles.push(profile.clone());
        self.persist()?;
        Ok(profile)
    }

    fn update_profile(&mut self, mut profile: StoredProfile) -> Result<StoredProfile, StoreError> {
        let index = self.position(&profile.id)?;
        profile.created_at_ms = self.data.profiles[index].created_at_ms;
        profile.updated_at_ms = now_ms();
        self.data.profiles[index] = profile.clone();
        self.persist()?;
        Ok(profile)
    }

    fn delete_profile(&mut self, id: &str) -> Result<(), StoreError> {
        let index = self.position(id)?;
        self.data.profiles.remove(index);
        if self.data.active_profile.as_deref() == Some(id) {
            self.data.active_profile = None;
        }
        self.persist()
    }

    fn set_active_profile(&mut self, id: &str) -> Result<(), StoreError> {
        self.position(id)?;
        self.data.active_profile = Some(id.to_string());
        self.persist()
    }

    fn active_profile(&self) -> Result<Option<StoredProfile>, StoreError> {
        let selected = self
            .data
            .active_profile
            .as_deref()
            .and_then(|id| self.data.profiles.iter().find(|p| p.id == id));
        Ok(selected.or(self.data.profiles.first()).cloned())
    }
}
