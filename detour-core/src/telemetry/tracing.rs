//! Tracing core rexport, for your convenience.
//!
//! detour never installs a subscriber itself,
//! that is left to the application.

#[doc(inline)]
pub use ::tracing::*;
