//! Durable key-value storage.
//!
//! The session survives restarts by living in a small string-keyed store.
//! [`FileStore`] is the durable implementation; [`MemoryStore`] keeps
//! everything in process and is what tests and embedders without a disk use.

mod file;
mod memory;

use std::fmt;

use crate::Result;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Key under which the access token is stored.
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Key under which the refresh token is stored.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Key holding the UI language preference.
pub const LANG_KEY: &str = "lang";

/// A string-keyed store shared by every component of one client.
///
/// Implementations are unversioned and do no locking beyond what is needed
/// to keep their own memory safe.
pub trait KeyValueStore: Send + Sync + fmt::Debug {
    /// Read a value.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write several values in a single operation.
    fn set_many(&self, entries: &[(&str, &str)]) -> Result<()>;

    /// Remove several keys in a single operation. Missing keys are ignored.
    fn remove_many(&self, keys: &[&str]) -> Result<()>;

    /// Write one value.
    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.set_many(&[(key, value)])
    }

    /// Remove one key.
    fn remove(&self, key: &str) -> Result<()> {
        self.remove_many(&[key])
    }

    /// True if the key holds a value.
    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }
}
