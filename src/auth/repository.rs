//! Credential record repository.
//!
//! Only the secret half of an [`AuthUser`] is written to the credentials
//! file. The identity half lives in the user repository and is joined back
//! in on every read, keyed by the shared id.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use super::model::AuthUser;
use crate::error::{AppError, AppResult, OptionExt};
use crate::storage::JsonFile;
use crate::user::SharedUserRepository;

/// Persisted credential row.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CredentialRecord {
    id: Uuid,
    password: String,
    refresh_token: Option<String>,
}

impl From<&AuthUser> for CredentialRecord {
    fn from(auth_user: &AuthUser) -> Self {
        Self {
            id: auth_user.id,
            password: auth_user.password.clone(),
            refresh_token: auth_user.refresh_token.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct CredentialStore {
    credentials: Vec<CredentialRecord>,
}

/// Trait for credential record operations.
pub trait AuthUserRepository: Send + Sync {
    /// Find a credential record by its (user) ID.
    fn find_by_id(&self, id: Uuid) -> AppResult<Option<AuthUser>>;

    /// Find a credential record through its user's email.
    fn find_by_user_email(&self, email: &str) -> AppResult<Option<AuthUser>>;

    /// Insert or update a credential record.
    ///
    /// The embedded user is saved only when the record is new; updates
    /// write the credential half alone.
    fn save(&self, auth_user: AuthUser) -> AppResult<AuthUser>;
}

/// JSON file-based credential repository layered over a user repository.
pub struct JsonAuthUserRepository {
    file: JsonFile,
    users: SharedUserRepository,
    cache: RwLock<HashMap<Uuid, CredentialRecord>>,
}

impl JsonAuthUserRepository {
    pub fn new(file_path: impl AsRef<Path>, users: SharedUserRepository) -> AppResult<Self> {
        let file = JsonFile::new(file_path);
        let store: CredentialStore = file.load()?;

        let cache: HashMap<Uuid, CredentialRecord> =
            store.credentials.into_iter().map(|c| (c.id, c)).collect();
        tracing::info!(
            path = %file.path().display(),
            count = cache.len(),
            "Loaded credential records from file"
        );

        Ok(Self {
            file,
            users,
            cache: RwLock::new(cache),
        })
    }

    fn persist(&self, cache: &HashMap<Uuid, CredentialRecord>) -> AppResult<()> {
        let store = CredentialStore {
            credentials: cache.values().cloned().collect(),
        };
        self.file.save(&store)
    }

    fn join(&self, record: CredentialRecord) -> AppResult<AuthUser> {
        let user = self
            .users
            .find_by_id(record.id)?
            .ok_or_not_found(format!("User {} not found for credential record", record.id))?;

        Ok(AuthUser {
            id: record.id,
            password: record.password,
            refresh_token: record.refresh_token,
            user,
        })
    }
}

impl AuthUserRepository for JsonAuthUserRepository {
    fn find_by_id(&self, id: Uuid) -> AppResult<Option<AuthUser>> {
        let record = self.cache.read().get(&id).cloned();
        record.map(|r| self.join(r)).transpose()
    }

    fn find_by_user_email(&self, email: &str) -> AppResult<Option<AuthUser>> {
        match self.users.find_by_email(email)? {
            Some(user) => self.find_by_id(user.id),
            None => Ok(None),
        }
    }

    fn save(&self, auth_user: AuthUser) -> AppResult<AuthUser> {
        if auth_user.id != auth_user.user.id {
            return Err(AppError::Validation(format!(
                "Credential id {} does not match user id {}",
                auth_user.id, auth_user.user.id
            )));
        }
        if auth_user.password.is_empty() {
            return Err(AppError::Validation("Password hash is required".to_string()));
        }

        // Held across the cascade so a concurrent save cannot also see the row as new
        let mut cache = self.cache.write();
        let is_new = !cache.contains_key(&auth_user.id);

        // A new record brings its user along; remember whether we created it
        let created_user = if is_new {
            let existed = self.users.find_by_id(auth_user.id)?.is_some();
            self.users.save(auth_user.user.clone())?;
            !existed
        } else {
            false
        };

        let record = CredentialRecord::from(&auth_user);
        let previous = cache.insert(auth_user.id, record.clone());
        if let Err(e) = self.persist(&cache) {
            match previous {
                Some(previous) => cache.insert(auth_user.id, previous),
                None => cache.remove(&auth_user.id),
            };
            if created_user {
                if let Err(undo) = self.users.delete(auth_user.id) {
                    tracing::error!(
                        user_id = %auth_user.id,
                        error = %undo,
                        "Failed to roll back user after credential write failure"
                    );
                }
            }
            return Err(e);
        }
        drop(cache);

        tracing::debug!(
            user_id = %auth_user.id,
            created = is_new,
            has_session = auth_user.refresh_token.is_some(),
            "Saved credential record"
        );
        self.join(record)
    }
}

/// Thread-safe wrapper for credential repository.
pub type SharedAuthUserRepository = Arc<dyn AuthUserRepository>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::{JsonUserRepository, User};
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        dir: TempDir,
        users: SharedUserRepository,
        repo: JsonAuthUserRepository,
    }

    fn fixture() -> Fixture {
        let dir = tempdir().unwrap();
        let users: SharedUserRepository =
            Arc::new(JsonUserRepository::new(dir.path().join("users.json")).unwrap());
        let repo =
            JsonAuthUserRepository::new(dir.path().join("auth_users.json"), users.clone()).unwrap();
        Fixture {
            dir,
            users,
            repo,
        }
    }

    fn sample(email: &str) -> AuthUser {
        AuthUser::new(User::new(email.to_string(), "Sample".to_string()), "hash".to_string())
    }

    #[test]
    fn test_save_cascades_user() {
        let f = fixture();
        let auth_user = sample("ada@example.com");

        f.repo.save(auth_user.clone()).unwrap();

        assert_eq!(f.users.find_by_id(auth_user.id).unwrap(), Some(auth_user.user.clone()));
        assert_eq!(f.repo.find_by_id(auth_user.id).unwrap(), Some(auth_user));
    }

    #[test]
    fn test_find_by_user_email() {
        let f = fixture();
        let auth_user = sample("ada@example.com");
        f.repo.save(auth_user.clone()).unwrap();

        let found = f.repo.find_by_user_email("ADA@example.com").unwrap();
        assert_eq!(found.map(|a| a.id), Some(auth_user.id));
        assert!(f.repo.find_by_user_email("nobody@example.com").unwrap().is_none());
    }

    #[test]
    fn test_user_without_credentials_is_a_miss() {
        let f = fixture();
        let user = User::new("plain@example.com".to_string(), "Plain".to_string());
        f.users.save(user.clone()).unwrap();

        assert!(f.repo.find_by_user_email("plain@example.com").unwrap().is_none());
        assert!(f.repo.find_by_id(user.id).unwrap().is_none());
    }

    #[test]
    fn test_mismatched_ids_are_rejected() {
        let f = fixture();
        let mut auth_user = sample("ada@example.com");
        auth_user.id = Uuid::new_v4();

        let result = f.repo.save(auth_user);
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_save_overwrites_refresh_token() {
        let f = fixture();
        let auth_user = sample("ada@example.com");
        f.repo.save(auth_user.with_refresh_token("first".to_string())).unwrap();
        f.repo.save(auth_user.with_refresh_token("second".to_string())).unwrap();

        let stored = f.repo.find_by_id(auth_user.id).unwrap().unwrap();
        assert_eq!(stored.refresh_token.as_deref(), Some("second"));
    }

    #[test]
    fn test_update_leaves_user_row_alone() {
        let f = fixture();
        let auth_user = sample("ada@example.com");
        f.repo.save(auth_user.clone()).unwrap();

        let mut renamed = auth_user.user.clone();
        renamed.name = "Ada Lovelace".to_string();
        f.users.save(renamed).unwrap();

        // Stale copy of the user rides along with the new refresh token
        let saved = f
            .repo
            .save(auth_user.with_refresh_token("rt".to_string()))
            .unwrap();

        assert_eq!(saved.user.name, "Ada Lovelace");
        assert_eq!(f.users.find_by_id(auth_user.id).unwrap().unwrap().name, "Ada Lovelace");
        assert_eq!(saved.refresh_token.as_deref(), Some("rt"));
    }

    #[test]
    fn test_failed_credential_write_rolls_back_new_user() {
        let f = fixture();
        let credentials_path = f.dir.path().join("auth_users.json");
        std::fs::create_dir(&credentials_path).unwrap();

        let auth_user = sample("ada@example.com");
        let result = f.repo.save(auth_user.clone());
        assert!(matches!(result, Err(AppError::Io(_))));
        assert!(f.users.find_by_email("ada@example.com").unwrap().is_none());
        assert!(f.repo.find_by_id(auth_user.id).unwrap().is_none());

        std::fs::remove_dir(&credentials_path).unwrap();
        f.repo.save(sample("ada@example.com")).unwrap();
    }

    #[test]
    fn test_failed_credential_write_keeps_existing_user() {
        let f = fixture();
        let user = User::new("plain@example.com".to_string(), "Plain".to_string());
        f.users.save(user.clone()).unwrap();
        let credentials_path = f.dir.path().join("auth_users.json");
        std::fs::create_dir(&credentials_path).unwrap();

        let result = f.repo.save(AuthUser::new(user.clone(), "hash".to_string()));
        assert!(result.is_err());
        assert_eq!(f.users.find_by_id(user.id).unwrap(), Some(user));
    }

    #[test]
    fn test_email_conflict_surfaces_from_user_store() {
        let f = fixture();
        f.repo.save(sample("ada@example.com")).unwrap();

        let result = f.repo.save(sample("ada@example.com"));
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[test]
    fn test_credentials_survive_reload() {
        let dir = tempdir().unwrap();
        let users: SharedUserRepository =
            Arc::new(JsonUserRepository::new(dir.path().join("users.json")).unwrap());
        let path = dir.path().join("auth_users.json");
        let auth_user = sample("ada@example.com").with_refresh_token("rt".to_string());

        JsonAuthUserRepository::new(&path, users.clone())
            .unwrap()
            .save(auth_user.clone())
            .unwrap();
        let reloaded = JsonAuthUserRepository::new(&path, users).unwrap();

        assert_eq!(reloaded.find_by_id(auth_user.id).unwrap(), Some(auth_user));
    }
}
