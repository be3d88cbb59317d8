// src/exec/keys.rs

//! Data keys read and written by the built-in task kinds.

/// Where `download` fetches from (URL or file path).
pub const SOURCE: &str = "source";
/// Artifact locator produced by `download` and `blur`, consumed by `blur`
/// and `color_filter`.
pub const IMAGE_URI: &str = "image_uri";
/// Artifact locator produced by `color_filter`.
pub const FILTER_URI: &str = "filter_uri";
/// Blur radius, in bytes either side.
pub const RADIUS: &str = "radius";
/// Colour filter gain.
pub const SCALE: &str = "scale";

pub const DEFAULT_RADIUS: i64 = 1;
pub const DEFAULT_SCALE: f64 = 1.0;
