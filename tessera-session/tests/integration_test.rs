//! Integration tests for tessera-session

use http::HeaderMap;
use http::header::{COOKIE, HeaderValue, SET_COOKIE};
use std::sync::Arc;
use std::time::Duration;
use tessera_session::*;

fn memory_config() -> SessionConfig {
    SessionConfig::new("memory:")
        .with_expiration(Duration::from_secs(60))
        .with_store(Arc::new(Store::new([Driver::memory()])))
        .validate()
        .unwrap()
}

#[tokio::test]
async fn test_hello_world_over_cookies() {
    let config = memory_config();

    let mut response = HeaderMap::new();
    let session = Session::from_cookies(&config, &HeaderMap::new(), Some(&mut response))
        .await
        .unwrap();
    session.set("hello", "world").await.unwrap();

    // Replay the issued cookie on the next request.
    let issued = response.get(SET_COOKIE).unwrap().to_str().unwrap();
    let pair = issued.split(';').next().unwrap();
    let mut request = HeaderMap::new();
    request.insert(COOKIE, HeaderValue::from_str(pair).unwrap());

    let again = Session::from_cookies(&config, &request, None).await.unwrap();
    assert_eq!(again.id(), session.id());
    assert_eq!(again.get::<String>("hello").await.unwrap(), "world");

    again.remove("hello").await.unwrap();
    assert!(session.get::<String>("hello").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_sessions_are_isolated_by_id() {
    let config = memory_config();
    let alice = Session::from_context(&config, &mut SessionContext::new()).await.unwrap();
    let bob = Session::from_context(&config, &mut SessionContext::new()).await.unwrap();

    alice.set("name", "alice").await.unwrap();
    assert_ne!(alice.id(), bob.id());
    assert!(bob.get::<String>("name").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_prefix_separates_applications() {
    let store = Arc::new(Store::new([Driver::memory()]));
    let shop = SessionConfig::new("memory:")
        .with_session_prefix("shop")
        .with_store(store.clone())
        .validate()
        .unwrap();
    let blog = SessionConfig::new("memory:")
        .with_session_prefix("blog")
        .with_store(store.clone())
        .validate()
        .unwrap();

    let mut ctx = SessionContext::new().with_value("session-id", "same-id");
    let in_shop = Session::from_context(&shop, &mut ctx).await.unwrap();
    let in_blog = Session::from_context(&blog, &mut ctx).await.unwrap();

    in_shop.set("cart", &vec![1, 2, 3]).await.unwrap();
    assert_eq!(in_shop.key(), "shop_same-id");
    assert!(in_blog.get::<Vec<u32>>("cart").await.unwrap_err().is_not_found());
    assert_eq!(store.len().await, 1);
}

#[cfg(feature = "redis")]
#[tokio::test]
async fn test_redis_only_store_rejects_memory() {
    let config = SessionConfig::new("memory:")
        .with_store(Arc::new(Store::new([Driver::redis()])))
        .validate()
        .unwrap();

    let err = Session::from_context(&config, &mut SessionContext::new())
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::UnsupportedDriver(ref d) if d == "memory"));
}

#[tokio::test]
async fn test_default_config_flow() {
    init_default_config(Some(memory_config())).unwrap();

    let mut ctx = SessionContext::new();
    let session = Session::default_from_context(&mut ctx).await.unwrap();
    session.set("visits", &1).await.unwrap();

    let mut request = HeaderMap::new();
    let cookie = format!("{}={}", DEFAULT_COOKIE_NAME, session.id());
    request.insert(COOKIE, HeaderValue::from_str(&cookie).unwrap());

    let same = Session::default_from_cookies(&request, None).await.unwrap();
    assert_eq!(same.get::<u32>("visits").await.unwrap(), 1);
}

#[test]
fn test_config_errors_display() {
    assert_eq!(SessionError::NilConfig.to_string(), "config is nil");
    assert_eq!(SessionError::NilStore.to_string(), "store is nil");
    assert_eq!(SessionError::NotFound.to_string(), "session: nil");
}

// Note: These tests would require Redis/Memcached running
// They are disabled by default but can be run with: cargo test -- --ignored

#[cfg(feature = "redis")]
#[tokio::test]
#[ignore]
async fn test_redis_session() {
    let config = SessionConfig::new("redis://127.0.0.1:6379")
        .with_expiration(Duration::from_secs(60))
        .with_store(Arc::new(Store::new([Driver::redis()])))
        .validate()
        .unwrap();

    let session = Session::from_context(&config, &mut SessionContext::new())
        .await
        .unwrap();
    session.set("hello", "world").await.unwrap();
    assert_eq!(session.get::<String>("hello").await.unwrap(), "world");

    session.clear().await.unwrap();
    assert!(session.get::<String>("hello").await.unwrap_err().is_not_found());
}

#[cfg(feature = "memcached")]
#[tokio::test]
#[ignore]
async fn test_memcached_session() {
    let config = SessionConfig::new("memcached://127.0.0.1:11211")
        .with_expiration(Duration::from_secs(60))
        .with_store(Arc::new(Store::new([Driver::memcached()])))
        .validate()
        .unwrap();

    let session = Session::from_context(&config, &mut SessionContext::new())
        .await
        .unwrap();
    session.set("hello", "world").await.unwrap();
    assert_eq!(session.get::<String>("hello").await.unwrap(), "world");

    session.clear().await.unwrap();
    assert!(session.get::<String>("hello").await.unwrap_err().is_not_found());
}

#[cfg(feature = "embedded")]
#[tokio::test]
async fn test_embedded_session() {
    let config = SessionConfig::new("embedded://:memory:")
        .with_expiration(Duration::from_secs(60))
        .with_store(Arc::new(Store::new([Driver::embedded()])))
        .validate()
        .unwrap();

    let mut ctx = SessionContext::new();
    let session = Session::from_context(&config, &mut ctx).await.unwrap();
    session.set("hello", "world").await.unwrap();

    let again = Session::from_context(&config, &mut ctx).await.unwrap();
    assert_eq!(again.get::<String>("hello").await.unwrap(), "world");

    again.clear().await.unwrap();
    assert!(session.get::<String>("hello").await.unwrap_err().is_not_found());
}
