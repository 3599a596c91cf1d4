//! Per-user context storage.
//!
//! [`ContextStore`] wraps a [`SplayTree`] keyed by context name behind an
//! `RwLock`. Because every access splays the tree, reads take the write side
//! of the lock too; the lock is held only for the single tree operation.

mod splay;

use std::sync::RwLock;

pub use self::splay::SplayTree;

use crate::context::Context;
use crate::error::{DdsError, Result};
use crate::value::Value;

#[derive(Debug, Default)]
pub struct ContextStore {
    tree: RwLock<SplayTree<String, Context>>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the named context.
    pub fn get(&self, name: &str) -> Option<Context> {
        let mut tree = self.tree.write().expect("context store lock poisoned");
        tree.get(name).cloned()
    }

    /// Insert or overwrite the context under its own name.
    pub fn put(&self, context: Context) {
        let mut tree = self.tree.write().expect("context store lock poisoned");
        tree.put(context.name().to_string(), context);
    }

    pub fn remove(&self, name: &str) -> Option<Context> {
        let mut tree = self.tree.write().expect("context store lock poisoned");
        tree.remove(name)
    }

    /// Replace the raw value of an existing context.
    ///
    /// The value must parse as the context's declared type; the check and the
    /// write happen under one guard.
    pub fn set_value(&self, name: &str, raw: impl Into<String>) -> Result<()> {
        let raw = raw.into();
        let mut tree = self.tree.write().expect("context store lock poisoned");
        let context = tree
            .get_mut(name)
            .ok_or_else(|| DdsError::UnknownContext(name.to_string()))?;
        context.value_type().parse(&raw)?;
        context.set_value(raw);
        Ok(())
    }

    /// The named context's value parsed per its declared type.
    pub fn typed_value(&self, name: &str) -> Result<Value> {
        self.get(name)
            .ok_or_else(|| DdsError::UnknownContext(name.to_string()))?
            .typed_value()
    }

    pub fn contains(&self, name: &str) -> bool {
        let mut tree = self.tree.write().expect("context store lock poisoned");
        tree.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tree.read().expect("context store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
