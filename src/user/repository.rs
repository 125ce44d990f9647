//! User data model and repository.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::storage::JsonFile;

/// User model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique user ID.
    pub id: Uuid,
    /// Email address (unique, case-insensitive).
    pub email: String,
    /// Display name.
    pub name: String,
    /// Account creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with a fresh ID.
    pub fn new(email: String, name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            name,
            created_at: Utc::now(),
        }
    }

    /// Convert to a public representation.
    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            created_at: self.created_at,
        }
    }
}

/// Public user representation (safe to expose via API).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// User storage format for JSON file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct UserStore {
    users: Vec<User>,
}

/// Trait for user repository operations.
pub trait UserRepository: Send + Sync {
    /// Find a user by ID.
    fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Find a user by email.
    fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Insert or update a user.
    fn save(&self, user: User) -> AppResult<User>;

    /// Delete a user by ID.
    fn delete(&self, id: Uuid) -> AppResult<bool>;

    /// Count total users.
    fn count(&self) -> AppResult<usize>;
}

/// JSON file-based user repository.
#[derive(Debug)]
pub struct JsonUserRepository {
    file: JsonFile,
    /// In-memory cache for fast reads.
    cache: RwLock<HashMap<Uuid, User>>,
}

impl JsonUserRepository {
    /// Create a new JSON user repository, loading any existing users.
    pub fn new(file_path: impl AsRef<Path>) -> AppResult<Self> {
        let file = JsonFile::new(file_path);
        let store: UserStore = file.load()?;

        let cache: HashMap<Uuid, User> = store.users.into_iter().map(|u| (u.id, u)).collect();
        tracing::info!(path = %file.path().display(), count = cache.len(), "Loaded users from file");

        Ok(Self {
            file,
            cache: RwLock::new(cache),
        })
    }

    fn persist(&self, cache: &HashMap<Uuid, User>) -> AppResult<()> {
        let store = UserStore {
            users: cache.values().cloned().collect(),
        };
        self.file.save(&store)
    }
}

fn same_email(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

impl UserRepository for JsonUserRepository {
    fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let cache = self.cache.read();
        Ok(cache.get(&id).cloned())
    }

    fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let cache = self.cache.read();
        Ok(cache
            .values()
            .find(|u| same_email(&u.email, email))
            .cloned())
    }

    fn save(&self, user: User) -> AppResult<User> {
        let mut cache = self.cache.write();

        // Email must stay unique across users
        if cache
            .values()
            .any(|u| u.id != user.id && same_email(&u.email, &user.email))
        {
            return Err(AppError::email_taken(&user.email));
        }

        let previous = cache.insert(user.id, user.clone());
        if let Err(e) = self.persist(&cache) {
            // Keep the cache in line with what is on disk
            match previous {
                Some(previous) => cache.insert(user.id, previous),
                None => cache.remove(&user.id),
            };
            return Err(e);
        }

        tracing::debug!(user_id = %user.id, created = previous.is_none(), "Saved user");
        Ok(user)
    }

    fn delete(&self, id: Uuid) -> AppResult<bool> {
        let mut cache = self.cache.write();
        let Some(removed) = cache.remove(&id) else {
            return Ok(false);
        };

        if let Err(e) = self.persist(&cache) {
            cache.insert(id, removed);
            return Err(e);
        }

        tracing::info!(user_id = %id, "Deleted user");
        Ok(true)
    }

    fn count(&self) -> AppResult<usize> {
        let cache = self.cache.read();
        Ok(cache.len())
    }
}

/// Thread-safe wrapper for user repository.
pub type SharedUserRepository = Arc<dyn UserRepository>;
