use crate::entity::UserId;
use crate::store::ContextStore;

/// A user and their private context values.
#[derive(Debug)]
pub struct User {
    id: UserId,
    contexts: ContextStore,
}

impl User {
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            contexts: ContextStore::new(),
        }
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn contexts(&self) -> &ContextStore {
        &self.contexts
    }
}
