//! Cookie persistence boundary.
//!
//! [`CookieStore`] is the storage abstraction the jar drives. The reference
//! implementation is [`MemoryCookieStore`](memory::MemoryCookieStore);
//! persistent backends implement the same trait.
//!
//! # Concurrency model
//! - [`CookieStoreHandle`] is `Arc<dyn CookieStore>`.
//! - Stores are expected to manage their **own internal synchronization**
//!   (e.g. `RwLock`, connection pools). The trait methods take `&self`.
//! - Within one jar operation, store calls are sequential and ordered.
//!   Across concurrent jar operations the jar makes no atomicity guarantee:
//!   between a `find_cookie` and a following `put_cookie` another caller
//!   may insert, so `put_cookie` must replace idempotently on an identical
//!   `(domain, path, key)` tuple.
//!
//! All methods return eagerly here; an implementation backed by deferred
//! I/O is free to block or to wrap the trait in its own task machinery.

pub mod memory;

use std::sync::Arc;

use crate::cookie::Cookie;

pub use memory::MemoryCookieStore;

/// Boxed error surfaced by store implementations. The jar never swallows
/// these, even when parse errors are being ignored.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// A handle to a type-erased cookie store.
pub type CookieStoreHandle = Arc<dyn CookieStore>;

/// Storage for cookie records, indexed by `(domain, path, key)`.
pub trait CookieStore: Send + Sync {
    /// Looks up the single record at the exact tuple. Absence is `Ok(None)`,
    /// never an error.
    fn find_cookie(&self, domain: &str, path: &str, key: &str)
        -> Result<Option<Cookie>, StoreError>;

    /// Returns every record whose stored domain domain-matches `domain`
    /// and, when `path` is given, whose stored path path-matches it.
    /// `path = None` enumerates every path. Implementations may over-return;
    /// the jar applies the final filters.
    fn find_cookies(&self, domain: &str, path: Option<&str>) -> Result<Vec<Cookie>, StoreError>;

    /// Inserts `cookie`, replacing any record with the same
    /// `(domain, path, key)` tuple.
    fn put_cookie(&self, cookie: Cookie) -> Result<(), StoreError>;

    /// Semantically identical to [`put_cookie`](Self::put_cookie); exists so
    /// stores can optimize value-only updates.
    fn update_cookie(&self, old: &Cookie, new: Cookie) -> Result<(), StoreError> {
        let _ = old;
        self.put_cookie(new)
    }

    /// Removes the record at the exact tuple. Idempotent; absence is not an
    /// error.
    fn remove_cookie(&self, domain: &str, path: &str, key: &str) -> Result<(), StoreError>;

    /// Drops every record under `domain`, or only those at exactly `path`
    /// when one is given.
    fn remove_cookies(&self, domain: &str, path: Option<&str>) -> Result<(), StoreError>;

    /// Every record, ordered by creation index.
    fn all_cookies(&self) -> Result<Vec<Cookie>, StoreError>;

    /// Identifier recorded in serialized jars.
    fn store_type(&self) -> &'static str {
        "CustomStore"
    }
}
