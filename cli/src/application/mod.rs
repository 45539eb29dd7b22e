//! Application layer: use-case services and port trait definitions.
//!
//! Services import only from `crate::domain` and `crate::application::ports`.
//! All host I/O is routed through injected port traits.

pub mod ports;
pub mod services;
