//! Image preview module
//!
//! This module handles:
//! - Decoding image files for display
//! - Downscaling them to fit the viewer

pub mod thumbnail;
