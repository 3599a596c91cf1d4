use crate::entity::UserId;
use crate::error::Result;
use crate::value::Value;

/// Read/write access to live per-user state.
///
/// The engine implements this; response handlers receive it as a
/// `&dyn UserState` so they can read or adjust state when a response fires.
pub trait UserState: Send + Sync {
    /// The user's value for `key`, parsed per the context's declared type.
    fn get_value(&self, user_id: UserId, key: &str) -> Result<Value>;

    /// Replace the raw value stored under `key` for the user.
    fn set_value(&self, user_id: UserId, key: &str, raw: &str) -> Result<()>;

    /// Names of every registered context definition.
    fn context_names(&self) -> Vec<String>;
}
