//! Core domain models for Warden.
//!
//! This module contains all shared data structures used across the Warden ecosystem.

mod action;
mod device;
mod wipe;

// Re-export all models
pub use action::Action;
pub use device::{Device, DeviceStatus, GeofenceConfig, GeofenceMode};
pub use wipe::{ApprovedFolder, EntryKind, FileEntry, WipeOperation, WipeStatus};
