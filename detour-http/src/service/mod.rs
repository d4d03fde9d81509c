//! Http services provided by detour.

pub mod download;
