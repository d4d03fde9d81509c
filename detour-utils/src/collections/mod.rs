//! Collections such as [`LruCache`] provided by detour,
//! mostly for internal usage, but available for others to use as well.

mod lru;
#[doc(inline)]
pub use lru::{EvictionListener, LruCache, Weigher};
