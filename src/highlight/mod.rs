pub mod error;
pub mod types;
pub mod config;
pub mod matcher;
pub mod overlap;
pub mod annotator;
pub mod selector;
pub mod watcher;
pub mod coordinator;

pub use error::*;
pub use types::*;
pub use config::*;
pub use matcher::*;
pub use overlap::*;
pub use annotator::*;
pub use selector::*;
pub use watcher::*;
pub use coordinator::*;

#[cfg(test)]
mod tests;
