//! Http [`Layer`][detour_core::Layer]s provided by detour.
//!
//! A [`Layer`][detour_core::Layer], as defined in [`detour_core::Service`],
//! is a middleware that can modify the request and/or response of a [`Service`][detour_core::Service].

pub mod progress;
pub mod redirect;
