//! rusty-archive/crates/ra-core/src/lib.rs
//!
//! The content model, the store/source ports and the archiver that ties them
//! together.

pub mod archiver;
pub mod error;
pub mod interval;
pub mod models;
pub mod registry;
pub mod traits;

// Re-exporting for easier access in other crates
pub use archiver::*;
pub use error::*;
pub use interval::{format_interval, parse_interval};
pub use models::*;
pub use registry::SourceRegistry;
pub use traits::*;
