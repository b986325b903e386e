//! Session record operations.

use crate::config::{SessionConfig, default_config};
use crate::error::{SessionError, SessionResult};
use crate::identity::{IdSource, SessionContext, generate_session_id, read_cookie, write_cookie};
use http::HeaderMap;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::time::Duration;
use tessera_cache::SharedCache;
use tracing::{debug, trace};

/// The stored form of a session: every field in one blob.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    /// Session data as key-value pairs
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,
}

/// A bound session: an id, the cache holding its record, and the expiration
/// applied on every write.
///
/// All fields of a session live in a single cache entry under
/// `<prefix>_<id>`, so `set` and `remove` load, modify and write back the
/// whole record. Two requests mutating the same session concurrently race
/// and the last write wins.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use tessera_session::*;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), SessionError> {
/// let config = SessionConfig::new("memory:")
///     .with_expiration(Duration::from_secs(3600))
///     .with_store(Arc::new(Store::new([Driver::memory()])))
///     .validate()?;
///
/// let mut ctx = SessionContext::new();
/// let session = Session::from_context(&config, &mut ctx).await?;
///
/// session.set("user_id", &123).await?;
/// let user_id: i32 = session.get("user_id").await?;
/// assert_eq!(user_id, 123);
///
/// session.clear().await?;
/// assert!(session.get::<i32>("user_id").await.unwrap_err().is_not_found());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Session {
    id: String,
    key: String,
    source: IdSource,
    expiration: Duration,
    cache: SharedCache,
}

impl Session {
    /// Bind a session to the id in the request's session cookie.
    ///
    /// A missing or empty cookie yields a fresh id. The fresh id is written
    /// back as a `Set-Cookie` header when `response` is given; without one
    /// the session still works for this call chain but is not persisted to
    /// the client. A supplied id is reused verbatim without validation.
    pub async fn from_cookies(
        config: &SessionConfig,
        request: &HeaderMap,
        response: Option<&mut HeaderMap>,
    ) -> SessionResult<Self> {
        let id = match read_cookie(request, &config.cookie.name).filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => {
                let id = generate_session_id();
                match response {
                    Some(response) => write_cookie(response, &config.cookie, &id),
                    None => debug!("no response to carry the new session cookie"),
                }
                id
            }
        };

        Self::bind(config, id, IdSource::Cookie).await
    }

    /// Bind a session to the id carried by a request context.
    ///
    /// A missing id is generated and bound into `ctx` under the configured
    /// session key so downstream calls see the same session.
    pub async fn from_context(config: &SessionConfig, ctx: &mut SessionContext) -> SessionResult<Self> {
        let id = match ctx.value(&config.session_key) {
            Some(id) => id.to_string(),
            None => {
                let id = generate_session_id();
                ctx.insert(config.session_key.clone(), id.clone());
                id
            }
        };

        Self::bind(config, id, IdSource::Context).await
    }

    /// [`Session::from_cookies`] with the process-wide default configuration.
    pub async fn default_from_cookies(
        request: &HeaderMap,
        response: Option<&mut HeaderMap>,
    ) -> SessionResult<Self> {
        let config = default_config()?;
        Self::from_cookies(&config, request, response).await
    }

    /// [`Session::from_context`] with the process-wide default configuration.
    pub async fn default_from_context(ctx: &mut SessionContext) -> SessionResult<Self> {
        let config = default_config()?;
        Self::from_context(&config, ctx).await
    }

    async fn bind(config: &SessionConfig, id: String, source: IdSource) -> SessionResult<Self> {
        let cache = config.store()?.resolve(&config.connection).await?;
        let key = config.session_key_for(&id);
        debug!(session_key = %key, ?source, "session bound");

        Ok(Self {
            id,
            key,
            source,
            expiration: config.expiration,
            cache,
        })
    }

    /// The session id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The cache key holding this session's record.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Where the session id came from.
    pub fn source(&self) -> IdSource {
        self.source
    }

    /// Get a field, decoded into `T`.
    ///
    /// # Errors
    ///
    /// - [`SessionError::NotFound`] if the session or the field is absent
    /// - [`SessionError::Encoding`] if the stored value does not decode as `T`
    pub async fn get<T: DeserializeOwned>(&self, field: &str) -> SessionResult<T> {
        let value = self.load().await?.data.remove(field);
        match value {
            None | Some(serde_json::Value::Null) => Err(SessionError::NotFound),
            Some(value) => Ok(serde_json::from_value(value)?),
        }
    }

    /// Set a field, refreshing the record's time-to-live.
    pub async fn set<T: Serialize + ?Sized>(&self, field: &str, value: &T) -> SessionResult<()> {
        let value = serde_json::to_value(value)?;
        let mut record = self.load_or_default().await?;
        record.data.insert(field.to_string(), value);
        self.save(&record).await
    }

    /// Remove a field. Removing from a missing session is a no-op.
    ///
    /// Removing the last field leaves an empty record behind.
    pub async fn remove(&self, field: &str) -> SessionResult<()> {
        let mut record = match self.load().await {
            Ok(record) => record,
            Err(SessionError::NotFound) => return Ok(()),
            Err(e) => return Err(e),
        };
        record.data.remove(field);
        self.save(&record).await
    }

    /// Delete the whole session record.
    pub async fn clear(&self) -> SessionResult<()> {
        trace!(session_key = %self.key, "clearing session record");
        self.cache.remove(&self.key).await?;
        Ok(())
    }

    /// Whether a field is set.
    pub async fn contains(&self, field: &str) -> SessionResult<bool> {
        match self.load().await {
            Ok(record) => Ok(record
                .data
                .get(field)
                .is_some_and(|value| !value.is_null())),
            Err(SessionError::NotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Names of the fields currently set, sorted.
    pub async fn fields(&self) -> SessionResult<Vec<String>> {
        let record = self.load_or_default().await?;
        let mut fields: Vec<String> = record.data.into_keys().collect();
        fields.sort();
        Ok(fields)
    }

    async fn load(&self) -> SessionResult<SessionData> {
        trace!(session_key = %self.key, "loading session record");
        Ok(tessera_cache::get(self.cache.as_ref(), &self.key).await?)
    }

    async fn load_or_default(&self) -> SessionResult<SessionData> {
        match self.load().await {
            Err(SessionError::NotFound) => Ok(SessionData::default()),
            other => other,
        }
    }

    async fn save(&self, record: &SessionData) -> SessionResult<()> {
        trace!(session_key = %self.key, fields = record.data.len(), "saving session record");
        tessera_cache::set(self.cache.as_ref(), &self.key, record, self.expiration).await?;
        Ok(())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("source", &self.source)
            .field("expiration", &self.expiration)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use async_trait::async_trait;
    use http::header::{COOKIE, HeaderValue, SET_COOKIE};
    use std::sync::Arc;
    use tessera_cache::{CacheError, CacheResult, CacheStore, Driver, InMemoryCache};

    /// A store whose `memory` driver always hands out `cache`.
    fn store_over(cache: Arc<InMemoryCache>) -> Arc<Store> {
        Arc::new(Store::new([Driver::new("memory", move |_conn: &str| {
            let cache = cache.clone();
            Box::pin(async move { Ok(cache as SharedCache) })
        })]))
    }

    fn config_over(cache: Arc<InMemoryCache>, expiration: Duration) -> SessionConfig {
        SessionConfig::new("memory:")
            .with_expiration(expiration)
            .with_store(store_over(cache))
            .validate()
            .unwrap()
    }

    fn memory_config() -> SessionConfig {
        config_over(Arc::new(InMemoryCache::new()), Duration::from_secs(60))
    }

    async fn context_session(config: &SessionConfig, id: &str) -> Session {
        let mut ctx = SessionContext::new().with_value(config.session_key.clone(), id);
        Session::from_context(config, &mut ctx).await.unwrap()
    }

    struct UnreachableCache;

    #[async_trait]
    impl CacheStore for UnreachableCache {
        async fn get(&self, _key: &str) -> CacheResult<String> {
            Err(CacheError::Connection("refused".to_string()))
        }

        async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> CacheResult<()> {
            Err(CacheError::Connection("refused".to_string()))
        }

        async fn remove(&self, _key: &str) -> CacheResult<()> {
            Err(CacheError::Connection("refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_set_get_remove_clear() {
        let config = memory_config();
        let session = context_session(&config, "abc").await;

        session.set("hello", "world").await.unwrap();
        session.set("visits", &3).await.unwrap();

        let hello: String = session.get("hello").await.unwrap();
        assert_eq!(hello, "world");
        assert_eq!(session.get::<u32>("visits").await.unwrap(), 3);

        session.remove("hello").await.unwrap();
        assert!(session.get::<String>("hello").await.unwrap_err().is_not_found());
        assert_eq!(session.get::<u32>("visits").await.unwrap(), 3);

        session.clear().await.unwrap();
        assert!(session.get::<u32>("visits").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_record_layout() {
        let cache = Arc::new(InMemoryCache::new());
        let config = config_over(cache.clone(), Duration::from_secs(60));
        let session = context_session(&config, "abc").await;

        assert_eq!(session.key(), "session_abc");
        session.set("hello", "world").await.unwrap();

        let raw = cache.get("session_abc").await.unwrap();
        let record: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(record, serde_json::json!({ "data": { "hello": "world" } }));
    }

    #[tokio::test]
    async fn test_hello_world_scenario() {
        let config = memory_config();
        let session = context_session(&config, "abc").await;

        session.set("hello", "world").await.unwrap();
        assert_eq!(session.get::<String>("hello").await.unwrap(), "world");

        session.remove("hello").await.unwrap();
        assert!(session.get::<String>("hello").await.unwrap_err().is_not_found());

        session.set("hello", "again").await.unwrap();
        assert_eq!(session.get::<String>("hello").await.unwrap(), "again");

        session.clear().await.unwrap();
        assert!(session.get::<String>("hello").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_clear_then_set() {
        let config = memory_config();
        let session = context_session(&config, "abc").await;

        session.set("step", &1).await.unwrap();
        session.set("other", &true).await.unwrap();
        session.clear().await.unwrap();

        session.set("step", &2).await.unwrap();
        assert_eq!(session.get::<u32>("step").await.unwrap(), 2);
        assert!(session.get::<bool>("other").await.unwrap_err().is_not_found());
        assert_eq!(session.fields().await.unwrap(), vec!["step"]);
    }

    #[tokio::test]
    async fn test_remove_unknown_field_keeps_record() {
        let config = memory_config();
        let session = context_session(&config, "abc").await;

        session.set("hello", "world").await.unwrap();
        session.remove("never-written").await.unwrap();

        assert_eq!(session.get::<String>("hello").await.unwrap(), "world");
        assert_eq!(session.fields().await.unwrap(), vec!["hello"]);
    }

    #[tokio::test]
    async fn test_corrupt_record_is_encoding_error() {
        let cache = Arc::new(InMemoryCache::new());
        let config = config_over(cache.clone(), Duration::from_secs(60));
        let session = context_session(&config, "abc").await;

        cache
            .set("session_abc", "not json".to_string(), Duration::ZERO)
            .await
            .unwrap();
        assert!(matches!(
            session.get::<String>("hello").await,
            Err(SessionError::Encoding(_))
        ));
    }

    #[tokio::test]
    async fn test_get_missing_session_is_not_found() {
        let config = memory_config();
        let session = context_session(&config, "nobody").await;
        assert!(matches!(
            session.get::<String>("hello").await,
            Err(SessionError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_null_value_reads_as_absent() {
        let config = memory_config();
        let session = context_session(&config, "abc").await;

        session.set("maybe", &None::<u32>).await.unwrap();
        assert!(session.get::<Option<u32>>("maybe").await.unwrap_err().is_not_found());
        assert!(!session.contains("maybe").await.unwrap());
    }

    #[tokio::test]
    async fn test_get_with_wrong_type_is_encoding_error() {
        let config = memory_config();
        let session = context_session(&config, "abc").await;

        session.set("name", "alice").await.unwrap();
        assert!(matches!(
            session.get::<u32>("name").await,
            Err(SessionError::Encoding(_))
        ));
    }

    #[tokio::test]
    async fn test_remove_from_missing_session_is_noop() {
        let cache = Arc::new(InMemoryCache::new());
        let config = config_over(cache.clone(), Duration::from_secs(60));
        let session = context_session(&config, "abc").await;

        session.remove("hello").await.unwrap();
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_remove_last_field_keeps_empty_record() {
        let cache = Arc::new(InMemoryCache::new());
        let config = config_over(cache.clone(), Duration::from_secs(60));
        let session = context_session(&config, "abc").await;

        session.set("hello", "world").await.unwrap();
        session.remove("hello").await.unwrap();

        assert_eq!(cache.get("session_abc").await.unwrap(), r#"{"data":{}}"#);
        assert!(session.fields().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_contains_and_fields() {
        let config = memory_config();
        let session = context_session(&config, "abc").await;

        assert!(!session.contains("b").await.unwrap());
        assert!(session.fields().await.unwrap().is_empty());

        session.set("b", &2).await.unwrap();
        session.set("a", &1).await.unwrap();

        assert!(session.contains("a").await.unwrap());
        assert_eq!(session.fields().await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_set_refreshes_expiration() {
        let cache = Arc::new(InMemoryCache::new());
        let config = config_over(cache.clone(), Duration::from_secs(10));
        let session = context_session(&config, "abc").await;

        session.set("a", &1).await.unwrap();
        tokio::time::advance(Duration::from_secs(6)).await;

        session.set("b", &2).await.unwrap();
        assert_eq!(cache.ttl("session_abc").await, Some(Duration::from_secs(10)));
        tokio::time::advance(Duration::from_secs(6)).await;

        assert_eq!(session.get::<u32>("a").await.unwrap(), 1);

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(session.get::<u32>("a").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_backend_failure_is_not_not_found() {
        let store = Arc::new(Store::new([Driver::new("down", |_conn: &str| {
            Box::pin(async { Ok(Arc::new(UnreachableCache) as SharedCache) })
        })]));
        let config = SessionConfig::new("down://host").with_store(store).validate().unwrap();
        let session = context_session(&config, "abc").await;

        let err = session.get::<String>("hello").await.unwrap_err();
        assert!(matches!(err, SessionError::Backend(CacheError::Connection(_))));
        assert!(session.set("hello", "world").await.is_err());
        assert!(session.remove("hello").await.is_err());
        assert!(session.clear().await.is_err());
        assert!(session.contains("hello").await.is_err());
    }

    #[tokio::test]
    async fn test_from_context_reuses_id() {
        let config = memory_config();
        let mut ctx = SessionContext::new().with_value("session-id", "abc");

        let session = Session::from_context(&config, &mut ctx).await.unwrap();
        assert_eq!(session.id(), "abc");
        assert_eq!(session.source(), IdSource::Context);
    }

    #[tokio::test]
    async fn test_from_context_generates_and_binds_id() {
        let config = memory_config();
        let mut ctx = SessionContext::new();

        let first = Session::from_context(&config, &mut ctx).await.unwrap();
        assert_eq!(ctx.value("session-id"), Some(first.id()));

        first.set("hello", "world").await.unwrap();
        let second = Session::from_context(&config, &mut ctx).await.unwrap();
        assert_eq!(second.id(), first.id());
        assert_eq!(second.get::<String>("hello").await.unwrap(), "world");
    }

    #[tokio::test]
    async fn test_from_cookies_reuses_id_without_set_cookie() {
        let config = memory_config();
        let mut request = HeaderMap::new();
        request.insert(COOKIE, HeaderValue::from_static("ns-session-id=abc"));
        let mut response = HeaderMap::new();

        let session = Session::from_cookies(&config, &request, Some(&mut response))
            .await
            .unwrap();

        assert_eq!(session.id(), "abc");
        assert_eq!(session.source(), IdSource::Cookie);
        assert!(response.get(SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn test_from_cookies_generates_id_and_sets_cookie() {
        let config = memory_config();
        let mut response = HeaderMap::new();

        let session = Session::from_cookies(&config, &HeaderMap::new(), Some(&mut response))
            .await
            .unwrap();

        let set_cookie = response.get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(set_cookie.starts_with(&format!("ns-session-id={};", session.id())));
        assert!(set_cookie.contains("HttpOnly"));
    }

    #[tokio::test]
    async fn test_from_cookies_empty_value_generates_id() {
        let config = memory_config();
        let mut request = HeaderMap::new();
        request.insert(COOKIE, HeaderValue::from_static("ns-session-id="));

        let session = Session::from_cookies(&config, &request, None).await.unwrap();
        assert!(!session.id().is_empty());
    }

    #[tokio::test]
    async fn test_bind_rejects_unsupported_connection() {
        let config = SessionConfig::new("redis://127.0.0.1:6379")
            .with_store(Arc::new(Store::new([Driver::memory()])))
            .validate()
            .unwrap();

        let err = Session::from_context(&config, &mut SessionContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::UnsupportedDriver(_)));
    }
}
