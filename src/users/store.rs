use std::collections::HashMap;

use parking_lot::RwLock;

use super::model::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("user already exists")]
    AlreadyExists,

    #[error("user not found")]
    NotFound,
}

/// What the user handler needs from a backend.
///
/// Swapping the in-memory map for something persistent means implementing
/// this trait; the router and handler stay untouched.
pub trait UserStore: Send + Sync + 'static {
    /// Inserts `user` under its own id. Fails if that id is taken.
    fn create(&self, user: User) -> Result<User, StoreError>;

    /// Every record, in no particular order.
    fn list(&self) -> Vec<User>;

    fn get(&self, id: i64) -> Result<User, StoreError>;

    /// Replaces name, email and phone number of record `id`. The stored id
    /// is always `id`, whatever `changes.id` says.
    fn update(&self, id: i64, changes: User) -> Result<User, StoreError>;

    /// Removes record `id` if present. Removing a missing id is not an error.
    fn delete(&self, id: i64);
}

/// [`UserStore`] over a `HashMap` behind one read/write lock.
///
/// The lock covers the whole map, not single keys: all writes serialize
/// regardless of which id they touch, and a write excludes every reader for
/// the duration of one map operation. Fine at this scale; shard the map or
/// move to a concurrent map before reusing it under heavy write load.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<i64, User>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }
}

impl UserStore for MemoryStore {
    fn create(&self, user: User) -> Result<User, StoreError> {
        let mut users = self.users.write();
        if users.contains_key(&user.id) {
            return Err(StoreError::AlreadyExists);
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    fn list(&self) -> Vec<User> {
        self.users.read().values().cloned().collect()
    }

    fn get(&self, id: i64) -> Result<User, StoreError> {
        self.users.read().get(&id).cloned().ok_or(StoreError::NotFound)
    }

    fn update(&self, id: i64, changes: User) -> Result<User, StoreError> {
        let mut users = self.users.write();
        let slot = users.get_mut(&id).ok_or(StoreError::NotFound)?;
        *slot = User { id, ..changes };
        Ok(slot.clone())
    }

    fn delete(&self, id: i64) {
        self.users.write().remove(&id);
    }
}
