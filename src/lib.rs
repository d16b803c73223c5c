//! InkCore: incremental in-place text annotation
//!
//! Finds user-defined terms (literal, wildcard or regex, grouped and
//! colored) in the visible text of a live document and wraps each hit in a
//! marker element. Content that arrives later is picked up incrementally.
//!
//! # Architecture
//!
//! ## Engine (`highlight`)
//! - `matcher.rs` - PatternMatcher: terms to compiled patterns, match finding
//! - `overlap.rs` - OverlapResolver: greedy leftmost-longest selection
//! - `annotator.rs` - Annotator: wrap spans in markers, strip them again
//! - `selector.rs` - NodeSelector: eligible text leaves under a root
//! - `watcher.rs` - ChangeWatcher: debounced structural change tracking
//! - `coordinator.rs` - ScanCoordinator: full scans, incremental scans, resets
//! - `config.rs` - Configuration snapshot, store interface, engine options
//!
//! ## Document (`tree`)
//! - `mod.rs` - NodeTree / MarkerTree / MutationSource capability traits
//! - `document.rs` - Document: arena-backed tree with mutation records
//!
//! # Usage (Rust)
//! ```rust,ignore
//! use inkcore::{Configuration, Document, EngineOptions, ScanCoordinator};
//!
//! let mut doc = Document::new();
//! let p = doc.append_element(doc.root(), "p")?;
//! doc.append_text(p, "Senior Java developer")?;
//!
//! let mut engine = ScanCoordinator::new(EngineOptions::default());
//! let stats = engine.start(&mut doc, Configuration::default());
//! assert_eq!(stats.applied, 1);
//!
//! // later, from the host's timer
//! engine.poll(&mut doc, instant::Instant::now());
//! ```
//!
//! # Usage (WASM)
//! ```javascript,ignore
//! import init, { InkMatcher } from 'inkcore';
//!
//! await init();
//! const matcher = new InkMatcher(null); // default configuration
//! matcher.scanText("Ping jane@corp.com about React");
//! // [{ start: 5, end: 18, matchedText: "jane@corp.com", groupId: ..., color: ... }, ...]
//! ```

pub mod highlight;
pub mod tree;
pub mod wasm;

// Public exports - Engine
pub use highlight::*;

// Public exports - Document
pub use tree::*;

use wasm_bindgen::prelude::*;

// When the `wee_alloc` feature is enabled, use `wee_alloc` as the global
// allocator for smaller WASM bundle size.
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Get version information
#[wasm_bindgen]
pub fn version() -> String {
    format!("inkcore v{}", env!("CARGO_PKG_VERSION"))
}
