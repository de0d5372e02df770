pub mod cache;
pub mod geometry;
pub mod screenshot;
pub mod traits;
pub mod types;
