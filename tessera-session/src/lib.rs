//! Server-side sessions for Tessera.
//!
//! A session is a bag of named JSON values stored as a single record in a
//! cache backend, keyed by `<prefix>_<session id>` and refreshed to the
//! configured time-to-live on every write.
//!
//! The pieces:
//!
//! - [`Store`] - the driver registry. It maps a connection string such as
//!   `redis://127.0.0.1:6379` to a shared cache handle, opening each distinct
//!   string once.
//! - [`SessionConfig`] - connection string, expiration, key prefix, cookie
//!   attributes and the attached [`Store`].
//! - [`Session`] - a session bound to an id, read from a request cookie
//!   ([`Session::from_cookies`]) or an explicit [`SessionContext`]
//!   ([`Session::from_context`]).
//!
//! # Features
//!
//! - `redis` - Redis backend (enabled by default)
//! - `redis-cluster` - Redis Cluster backend
//! - `memcached` - Memcached backend (requires opt-in)
//! - `embedded` - Embedded redb backend, on disk or in memory
//!
//! # Examples
//!
//! ```
//! use http::HeaderMap;
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tessera_session::*;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), SessionError> {
//! let config = SessionConfig::new("memory:")
//!     .with_expiration(Duration::from_secs(1800))
//!     .with_store(Arc::new(Store::new([Driver::memory()])))
//!     .validate()?;
//!
//! // First request: no cookie, so a new id is minted and handed back.
//! let mut response = HeaderMap::new();
//! let session = Session::from_cookies(&config, &HeaderMap::new(), Some(&mut response)).await?;
//! session.set("hello", "world").await?;
//! assert!(response.contains_key(http::header::SET_COOKIE));
//!
//! let hello: String = session.get("hello").await?;
//! assert_eq!(hello, "world");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod identity;
pub mod session;
pub mod store;

pub use config::{
    CookieConfig, DEFAULT_COOKIE_NAME, DEFAULT_COOKIE_PATH, DEFAULT_SESSION_KEY,
    DEFAULT_SESSION_PREFIX, SameSite, SessionConfig, default_config, init_default_config,
};
pub use error::{SessionError, SessionResult};
pub use identity::{IdSource, SessionContext, generate_session_id};
pub use session::{Session, SessionData};
pub use store::Store;

pub use tessera_cache::{CacheError, CacheStore, Driver, DriverName, InMemoryCache, SharedCache};

/// Prelude for common imports.
///
/// ```
/// use tessera_session::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{CookieConfig, SameSite, SessionConfig};
    pub use crate::error::{SessionError, SessionResult};
    pub use crate::identity::SessionContext;
    pub use crate::session::Session;
    pub use crate::store::Store;
    pub use tessera_cache::Driver;
}
