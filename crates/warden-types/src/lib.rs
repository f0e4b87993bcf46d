//! # Warden Types
//!
//! Core types, models, and error definitions for Warden.
//!
//! This crate provides the foundational type system for the Warden ecosystem:
//!
//! - **`error`** - Typed error hierarchy for devices, wipe operations, and configuration
//! - **`models`** - Domain models (Device, GeofenceConfig, WipeOperation, Action)
//! - **`protocol`** - Agent/server HTTP wire types
//!
//! ## Architecture Role
//!
//! `warden-types` sits at the bottom of the dependency graph:
//!
//! ```text
//!               warden-types (this crate)
//!                       │
//!       ┌───────────────┼───────────────┐
//!       ▼               ▼               ▼
//!  warden-core    warden-client        ...
//!       │               │
//!       └───────┬───────┘
//!          ┌────┴─────┐
//!          ▼          ▼
//!   warden-server  warden-agent
//! ```
//!
//! All types are designed to be:
//! - **Serializable** via serde for the HTTP API
//! - **Clone** for cheap sharing across async boundaries
//! - **PartialEq** for testing and comparison

pub mod error;
pub mod models;
pub mod protocol;

// Re-export error types for convenience
pub use error::{ConfigError, DeviceError, Result, TypedError, WipeError};

// Re-export core model types
pub use models::{
    Action, ApprovedFolder, Device, DeviceStatus, EntryKind, FileEntry, GeofenceConfig,
    GeofenceMode, WipeOperation, WipeStatus,
};
