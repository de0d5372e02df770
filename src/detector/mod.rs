//! Client for the external UI-element detection service.
pub mod client;
pub mod types;

pub use client::{find_at_point, find_by_text, DetectionClient};
