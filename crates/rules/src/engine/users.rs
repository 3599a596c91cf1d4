//! Users, context definitions and the [`UserState`] view handed to handlers.

use std::sync::Arc;

use dds_core::{Context, DdsError, Result, User, UserId, UserState, Value};
use tracing::{debug, info, warn};

use super::Engine;
use crate::recency::EntityKey;

impl Engine {
    /// Create a user seeded with a copy of every context definition.
    pub fn add_user(&self, user_id: UserId) -> Result<()> {
        let defs = self.context_defs.read().expect("context defs lock poisoned");
        let mut users = self.users.write().expect("users lock poisoned");
        if users.contains_key(&user_id) {
            return Err(DdsError::DuplicateUser(user_id));
        }

        let user = User::new(user_id);
        for context in defs.values() {
            user.contexts().put(context.clone());
        }
        users.insert(user_id, Arc::new(user));
        info!(user_id, contexts = defs.len(), "user added");
        Ok(())
    }

    /// Drop a user and their context values; returns whether the user existed.
    pub fn remove_user(&self, user_id: UserId) -> bool {
        let removed = self
            .users
            .write()
            .expect("users lock poisoned")
            .remove(&user_id)
            .is_some();
        if removed {
            debug!(user_id, "user removed");
        }
        removed
    }

    pub fn user_ids(&self) -> Vec<UserId> {
        let mut ids: Vec<UserId> = self
            .users
            .read()
            .expect("users lock poisoned")
            .keys()
            .copied()
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn has_user(&self, user_id: UserId) -> bool {
        self.users
            .read()
            .expect("users lock poisoned")
            .contains_key(&user_id)
    }

    pub(super) fn user(&self, user_id: UserId) -> Result<Arc<User>> {
        self.users
            .read()
            .expect("users lock poisoned")
            .get(&user_id)
            .cloned()
            .ok_or(DdsError::UnknownUser(user_id))
    }

    /// Define (or redefine) a context and give every user a copy of it.
    pub fn add_context(&self, context: Context) {
        let mut defs = self.context_defs.write().expect("context defs lock poisoned");
        let users = self.users.read().expect("users lock poisoned");
        for user in users.values() {
            user.contexts().put(context.clone());
        }
        debug!(
            context = context.name(),
            value_type = %context.value_type(),
            users = users.len(),
            "context defined"
        );
        defs.insert(context.name().to_string(), context);
    }

    /// Drop a context definition and every user's copy of it.
    ///
    /// Refused while any registered criterion still compares against it.
    pub fn remove_context(&self, name: &str) -> Result<()> {
        let criteria = self.criteria.read().expect("criteria lock poisoned");
        if let Some((id, criterion)) = criteria.iter().find(|(_, c)| c.context_name() == name) {
            warn!(context = name, criterion_id = %id, "context removal blocked");
            return Err(DdsError::IntegrityViolation {
                entity: format!("Context '{name}'"),
                blocker: format!("Criterion {id} ({criterion})"),
            });
        }

        {
            let mut defs = self.context_defs.write().expect("context defs lock poisoned");
            if defs.shift_remove(name).is_none() {
                return Err(DdsError::UnknownContext(name.to_string()));
            }
            let users = self.users.read().expect("users lock poisoned");
            for user in users.values() {
                user.contexts().remove(name);
            }
        }
        // Lock order puts the ledger ahead of the definitions.
        self.recency.forget(&EntityKey::Context(name.to_string()));
        debug!(context = name, "context removed");
        Ok(())
    }

    /// The definition (initial value) of a context.
    pub fn context(&self, name: &str) -> Option<Context> {
        self.context_defs
            .read()
            .expect("context defs lock poisoned")
            .get(name)
            .cloned()
    }

    /// The user's current copy of a context.
    pub fn user_context(&self, user_id: UserId, name: &str) -> Result<Context> {
        self.user(user_id)?
            .contexts()
            .get(name)
            .ok_or_else(|| DdsError::UnknownContext(name.to_string()))
    }
}

impl UserState for Engine {
    fn get_value(&self, user_id: UserId, key: &str) -> Result<Value> {
        self.user(user_id)?.contexts().typed_value(key)
    }

    /// Rejects values that do not parse as the context's declared type.
    fn set_value(&self, user_id: UserId, key: &str, raw: &str) -> Result<()> {
        self.user(user_id)?.contexts().set_value(key, raw)
    }

    fn context_names(&self) -> Vec<String> {
        self.context_defs
            .read()
            .expect("context defs lock poisoned")
            .keys()
            .cloned()
            .collect()
    }
}
