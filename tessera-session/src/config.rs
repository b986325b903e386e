//! Session configuration.

use crate::error::{SessionError, SessionResult};
use crate::store::Store;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Default cookie name carrying the session id.
pub const DEFAULT_COOKIE_NAME: &str = "ns-session-id";

/// Default context key carrying the session id.
pub const DEFAULT_SESSION_KEY: &str = "session-id";

/// Default prefix of session record keys.
pub const DEFAULT_SESSION_PREFIX: &str = "session";

/// Default cookie path.
pub const DEFAULT_COOKIE_PATH: &str = "/";

/// Cookie SameSite attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Attributes of the session cookie.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieConfig {
    /// Cookie name for the session id
    pub name: String,
    /// Cookie path
    pub path: String,
    /// Cookie domain (host-only when unset)
    pub domain: Option<String>,
    /// Absolute expiry; a session cookie when unset
    pub expires: Option<DateTime<Utc>>,
    /// Max-Age in seconds
    pub max_age: Option<i64>,
    /// Cookie secure flag (HTTPS only)
    pub secure: bool,
    /// Cookie SameSite policy
    pub same_site: Option<SameSite>,
}

impl CookieConfig {
    /// Set cookie name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set cookie path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set cookie domain
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Set cookie expiry
    pub fn with_expires(mut self, expires: DateTime<Utc>) -> Self {
        self.expires = Some(expires);
        self
    }

    /// Set cookie Max-Age in seconds
    pub fn with_max_age(mut self, max_age: i64) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Set cookie secure flag
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Set cookie SameSite policy
    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }
}

/// Session configuration.
///
/// Built with the `with_*` setters, then passed through
/// [`SessionConfig::validate`] to fill defaults and check that a store
/// registry is attached.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use tessera_session::{Driver, SessionConfig, Store};
///
/// let config = SessionConfig::new("memory:")
///     .with_expiration(Duration::from_secs(3600))
///     .with_store(Arc::new(Store::new([Driver::memory()])))
///     .validate()
///     .unwrap();
///
/// assert_eq!(config.session_prefix, "session");
/// assert_eq!(config.cookie.name, "ns-session-id");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Connection string of the cache backend
    pub connection: String,
    /// Time-to-live of session records; zero stores them without expiry
    #[serde(with = "duration_secs")]
    pub expiration: Duration,
    /// Prefix of session record keys (`<prefix>_<id>`)
    pub session_prefix: String,
    /// Context key carrying the session id
    pub session_key: String,
    /// Session cookie attributes
    pub cookie: CookieConfig,
    /// Store registry resolving `connection`
    #[serde(skip)]
    pub store: Option<Arc<Store>>,
}

impl SessionConfig {
    /// Create a configuration for the given connection string.
    pub fn new(connection: impl Into<String>) -> Self {
        Self {
            connection: connection.into(),
            ..Default::default()
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Reads `TESSERA_SESSION_CONNECTION`, `TESSERA_SESSION_EXPIRATION`
    /// (seconds), `TESSERA_SESSION_PREFIX`, `TESSERA_SESSION_KEY` and
    /// `TESSERA_SESSION_COOKIE_NAME`. Unset or unparsable variables are
    /// left at their empty values; the store must still be attached.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(connection) = std::env::var("TESSERA_SESSION_CONNECTION") {
            config.connection = connection;
        }

        if let Ok(expiration) = std::env::var("TESSERA_SESSION_EXPIRATION")
            && let Ok(secs) = expiration.parse() {
                config.expiration = Duration::from_secs(secs);
            }

        if let Ok(prefix) = std::env::var("TESSERA_SESSION_PREFIX") {
            config.session_prefix = prefix;
        }

        if let Ok(key) = std::env::var("TESSERA_SESSION_KEY") {
            config.session_key = key;
        }

        if let Ok(name) = std::env::var("TESSERA_SESSION_COOKIE_NAME") {
            config.cookie.name = name;
        }

        config
    }

    /// Set the connection string.
    pub fn with_connection(mut self, connection: impl Into<String>) -> Self {
        self.connection = connection.into();
        self
    }

    /// Set the record time-to-live.
    pub fn with_expiration(mut self, expiration: Duration) -> Self {
        self.expiration = expiration;
        self
    }

    /// Set the record key prefix.
    pub fn with_session_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.session_prefix = prefix.into();
        self
    }

    /// Set the context key carrying the session id.
    pub fn with_session_key(mut self, key: impl Into<String>) -> Self {
        self.session_key = key.into();
        self
    }

    /// Set the cookie attributes.
    pub fn with_cookie(mut self, cookie: CookieConfig) -> Self {
        self.cookie = cookie;
        self
    }

    /// Attach the store registry.
    pub fn with_store(mut self, store: Arc<Store>) -> Self {
        self.store = Some(store);
        self
    }

    /// Fill in defaults and check that a store is attached.
    ///
    /// # Errors
    ///
    /// [`SessionError::NilStore`] if no store registry is attached.
    pub fn validate(mut self) -> SessionResult<Self> {
        if self.store.is_none() {
            return Err(SessionError::NilStore);
        }
        if self.cookie.name.is_empty() {
            self.cookie.name = DEFAULT_COOKIE_NAME.to_string();
        }
        if self.cookie.path.is_empty() {
            self.cookie.path = DEFAULT_COOKIE_PATH.to_string();
        }
        if self.session_key.is_empty() {
            self.session_key = DEFAULT_SESSION_KEY.to_string();
        }
        if self.session_prefix.is_empty() {
            self.session_prefix = DEFAULT_SESSION_PREFIX.to_string();
        }
        Ok(self)
    }

    /// The attached store registry.
    pub fn store(&self) -> SessionResult<&Arc<Store>> {
        self.store.as_ref().ok_or(SessionError::NilStore)
    }

    /// Build the record key for a session id.
    pub fn session_key_for(&self, session_id: &str) -> String {
        format!("{}_{}", self.session_prefix, session_id)
    }
}

static DEFAULT_CONFIG: Lazy<RwLock<Option<Arc<SessionConfig>>>> = Lazy::new(|| RwLock::new(None));

/// Initialize the process-wide default configuration.
///
/// This is a convenience for applications with a single session setup;
/// every entry point also accepts an explicit configuration.
///
/// # Errors
///
/// [`SessionError::NilConfig`] for `None`, [`SessionError::NilStore`] if
/// the configuration has no store.
pub fn init_default_config(config: Option<SessionConfig>) -> SessionResult<()> {
    let config = config.ok_or(SessionError::NilConfig)?.validate()?;
    *DEFAULT_CONFIG.write() = Some(Arc::new(config));
    Ok(())
}

/// The process-wide default configuration.
///
/// # Errors
///
/// [`SessionError::NilConfig`] if [`init_default_config`] has not succeeded.
pub fn default_config() -> SessionResult<Arc<SessionConfig>> {
    DEFAULT_CONFIG.read().clone().ok_or(SessionError::NilConfig)
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
