//! State management module
//!
//! This module handles the labelling session, including:
//! - The label taxonomy and image catalog (taxonomy.rs, catalog.rs)
//! - Current annotations and per-label counts (annotations.rs, counts.rs)
//! - The CSV table on disk (persistence.rs)
//! - Navigation through the catalog (cursor.rs)
//! - The session that ties them together (session.rs)

pub mod annotations;
pub mod catalog;
pub mod counts;
pub mod cursor;
pub mod data;
pub mod persistence;
pub mod session;
pub mod taxonomy;
