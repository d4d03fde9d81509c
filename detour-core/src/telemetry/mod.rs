//! Telemetry modules for detour.

pub mod tracing;
