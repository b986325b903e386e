// Tessera - server-side sessions over pluggable cache backends
//
// This library re-exports the session layer (driver registry, session records,
// cookie and context identity) together with the cache backends it runs on.

// Re-export the session layer
pub use tessera_session::*;

// Re-export member crates
pub use tessera_cache;
pub use tessera_session;

/// Prelude for common imports.
///
/// ```
/// use tessera::prelude::*;
/// ```
pub mod prelude {
    pub use tessera_cache::{CacheStore, SharedCache};
    pub use tessera_session::prelude::*;
}
