use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("user {0} not found")]
    NotFound(Uuid),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub nickname: Option<String>,
    pub discriminator: String,
    pub email: String,
    pub email_verified: bool,
    pub created_date: DateTime<Utc>,
    pub updated_date: DateTime<Utc>,
    pub is_active: bool,
}

impl User {
    /// The canned user representation the demo serves for any id.
    pub fn stub(id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id,
            username: "demo".to_string(),
            nickname: Some("Demo".to_string()),
            discriminator: "0000".to_string(),
            email: "demo@example.com".to_string(),
            email_verified: true,
            created_date: now,
            updated_date: now,
            is_active: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    pub username: Option<String>,
    pub nickname: Option<String>,
    pub email: Option<String>,
}

/// Stub-backed store. `get` materializes a canned user on first access so
/// later PATCH/DELETE calls have something to act on; ids never seen by
/// `get` are unknown to PATCH/DELETE.
#[derive(Default)]
pub struct UserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl UserStore {
    pub fn get(&self, id: Uuid) -> User {
        if let Some(user) = self.users.read().get(&id) {
            return user.clone();
        }
        let user = User::stub(id);
        self.users.write().insert(id, user.clone());
        user
    }

    pub fn patch(&self, id: Uuid, patch: UserPatch) -> Result<User, UserError> {
        let mut users = self.users.write();
        let user = users.get_mut(&id).ok_or(UserError::NotFound(id))?;
        if let Some(username) = patch.username {
            user.username = username;
        }
        if let Some(nickname) = patch.nickname {
            user.nickname = Some(nickname);
        }
        if let Some(email) = patch.email {
            user.email = email;
            user.email_verified = false;
        }
        user.updated_date = Utc::now();
        Ok(user.clone())
    }

    pub fn delete(&self, id: Uuid) -> Result<(), UserError> {
        self.users
            .write()
            .remove(&id)
            .map(|_| ())
            .ok_or(UserError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_materializes_and_caches_a_stub() {
        let store = UserStore::default();
        let id = Uuid::new_v4();
        let first = store.get(id);
        let second = store.get(id);
        assert_eq!(first.id, id);
        assert_eq!(first.created_date, second.created_date);
    }

    #[test]
    fn patch_unknown_id_is_not_found() {
        let store = UserStore::default();
        let err = store.patch(Uuid::new_v4(), UserPatch::default()).unwrap_err();
        assert!(matches!(err, UserError::NotFound(_)));
    }

    #[test]
    fn patch_updates_fields_and_resets_verification() {
        let store = UserStore::default();
        let id = Uuid::new_v4();
        store.get(id);
        let patched = store
            .patch(
                id,
                UserPatch {
                    email: Some("new@example.com".into()),
                    ..UserPatch::default()
                },
            )
            .unwrap();
        assert_eq!(patched.email, "new@example.com");
        assert!(!patched.email_verified);
    }

    #[test]
    fn delete_then_patch_is_not_found() {
        let store = UserStore::default();
        let id = Uuid::new_v4();
        store.get(id);
        store.delete(id).unwrap();
        assert!(store.patch(id, UserPatch::default()).is_err());
        assert!(store.delete(id).is_err());
    }
}
