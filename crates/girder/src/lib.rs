//! Girder - milestone dependency graph core.
//!
//! This crate provides the dependency-tracking core for milestone-based
//! project planning: an in-memory edge store with cycle-checked mutations,
//! dependency chain analysis, hop-count critical path finding, and
//! renderable graph assembly.
//!
//! Girder is a library with no CLI or wire protocol of its own; it is
//! embedded in-process by a surrounding CRUD/API layer, which owns
//! milestone content (titles, dates, status) and supplies it to the graph
//! builder on demand.

#![forbid(unsafe_code)]

// Public modules for library usage
pub mod config;
pub mod domain;
pub mod error;
pub mod id_generation;
pub mod store;
