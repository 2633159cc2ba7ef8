//! `graphupdate` applies SPARQL Update style operations to an RDF quad store.
//!
//! Operations arrive already parsed (see [`operation::Operation`]); the engine resolves graph
//! targets for DROP, CLEAR and CREATE, delegates LOAD to a [`loader::DocumentLoader`], and runs
//! pattern-based DELETE/INSERT by evaluating the WHERE pattern into bindings and substituting
//! each binding into the quad templates.
//!
//! ```no_run
//! use graphupdate::{apply_request, MemoryGraphStore, UpdateRequest};
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut store = MemoryGraphStore::new()?;
//! let request = UpdateRequest::from_file(std::path::Path::new("request.json"))?;
//! let report = apply_request(&request, &mut store, None)?;
//! println!("{}", report);
//! # Ok(())
//! # }
//! ```

extern crate derive_builder;

pub mod config;
pub mod consts;
pub mod engine;
pub mod errors;
pub mod eval;
pub mod loader;
pub mod node;
pub mod operation;
pub mod options;
pub mod pattern;
pub mod store;
pub mod substitute;
pub mod target;
pub mod util;

pub use crate::config::Config;
pub use crate::engine::{UpdateEngine, UpdateReport};
pub use crate::errors::UpdateError;
pub use crate::node::{Binding, Node, QuadPattern, TriplePattern};
pub use crate::operation::{Operation, UpdateRequest};
pub use crate::options::Silent;
pub use crate::pattern::GraphPattern;
pub use crate::store::{FileGraphStore, GraphStore, MemoryGraphStore};
pub use crate::target::GraphTarget;

use anyhow::Result;

pub fn init_logging() {
    // GRAPHUPDATE_LOG takes precedence over RUST_LOG
    if let Ok(log_level) = std::env::var(consts::LOG_ENV_VAR) {
        std::env::set_var("RUST_LOG", log_level);
    }
}

/// Applies one operation with the default evaluator and loader.
pub fn apply<S: GraphStore + ?Sized>(
    operation: &Operation,
    store: &mut S,
    initial: Option<&Binding>,
) -> Result<()> {
    let mut engine = UpdateEngine::new(store);
    if let Some(binding) = initial {
        engine = engine.with_initial_binding(binding.clone());
    }
    engine.apply(operation)
}

/// Applies every operation of `request` in order with the default evaluator and loader.
///
/// The first failing operation aborts the request; operations applied before it stay applied.
pub fn apply_request<S: GraphStore + ?Sized>(
    request: &UpdateRequest,
    store: &mut S,
    initial: Option<&Binding>,
) -> Result<UpdateReport> {
    let mut engine = UpdateEngine::new(store);
    if let Some(binding) = initial {
        engine = engine.with_initial_binding(binding.clone());
    }
    engine.apply_request(request)?;
    Ok(engine.into_report())
}
