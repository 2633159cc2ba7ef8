//! Applies update operations to a graph store.

use crate::config::Config;
use crate::errors::UpdateError;
use crate::eval::{eval_bindings, PatternEvaluator, SparqlPatternEvaluator};
use crate::loader::{DocumentLoader, RdfDocumentLoader};
use crate::node::{Binding, QuadPattern};
use crate::operation::{Operation, UpdateRequest};
use crate::options::{ClearMode, Silent};
use crate::pattern::{blank_nodes_to_variables, GraphPattern};
use crate::store::GraphStore;
use crate::substitute::{substitute, GraphTriples};
use crate::target;
use anyhow::{Error, Result};
use log::{debug, info, warn};
use oxigraph::model::{GraphNameRef, NamedNode, Triple};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Counters collected while a request is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateReport {
    pub operations_applied: usize,
    /// Triples handed to the store for insertion, including LOADed ones.
    pub triples_inserted: usize,
    /// Triples handed to the store for deletion, whether or not they were present.
    pub triples_deleted: usize,
    /// Template quads dropped because a variable stayed unbound.
    pub unbound_quads: usize,
    /// Template quads dropped because a term could not occupy its position.
    pub ill_formed_quads: usize,
}

impl UpdateReport {
    fn record_substitution(&mut self, acc: &GraphTriples) {
        self.unbound_quads += acc.unbound();
        self.ill_formed_quads += acc.ill_formed();
    }
}

impl fmt::Display for UpdateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} operations applied: {} triples inserted, {} triples deleted",
            self.operations_applied, self.triples_inserted, self.triples_deleted
        )?;
        if self.unbound_quads > 0 || self.ill_formed_quads > 0 {
            write!(
                f,
                " ({} unbound and {} ill-formed template quads skipped)",
                self.unbound_quads, self.ill_formed_quads
            )?;
        }
        Ok(())
    }
}

/// Executes operations against one store for the duration of one update request.
///
/// The engine borrows the store and owns its collaborators: the pattern evaluator used by
/// DELETE WHERE and MODIFY, and the document loader used by LOAD. Operations are applied in
/// order; a failing operation aborts the request but nothing already applied is undone.
pub struct UpdateEngine<'a, S: GraphStore + ?Sized> {
    store: &'a mut S,
    initial: Option<Binding>,
    evaluator: Box<dyn PatternEvaluator + 'a>,
    loader: Box<dyn DocumentLoader + 'a>,
    report: UpdateReport,
}

impl<'a, S: GraphStore + ?Sized> UpdateEngine<'a, S> {
    /// Creates an engine with the SPARQL evaluator and a loader using the default [`Config`].
    pub fn new(store: &'a mut S) -> Self {
        Self {
            store,
            initial: None,
            evaluator: Box::new(SparqlPatternEvaluator),
            loader: Box::new(RdfDocumentLoader::default()),
            report: UpdateReport::default(),
        }
    }

    /// Uses `binding` as the starting point of every pattern evaluation.
    pub fn with_initial_binding(mut self, binding: Binding) -> Self {
        self.initial = Some(binding);
        self
    }

    pub fn with_evaluator(mut self, evaluator: impl PatternEvaluator + 'a) -> Self {
        self.evaluator = Box::new(evaluator);
        self
    }

    pub fn with_loader(mut self, loader: impl DocumentLoader + 'a) -> Self {
        self.loader = Box::new(loader);
        self
    }

    /// Replaces the loader with an [`RdfDocumentLoader`] driven by `config`.
    pub fn with_config(self, config: Config) -> Self {
        self.with_loader(RdfDocumentLoader::new(config))
    }

    pub fn report(&self) -> &UpdateReport {
        &self.report
    }

    pub fn into_report(self) -> UpdateReport {
        self.report
    }

    /// Applies every operation of the request in order, stopping at the first error.
    pub fn apply_request(&mut self, request: &UpdateRequest) -> Result<()> {
        for (i, operation) in request.operations.iter().enumerate() {
            self.apply(operation).map_err(|e| {
                warn!(
                    "Operation {} of {} failed: {}",
                    i + 1,
                    request.operations.len(),
                    operation
                );
                e
            })?;
        }
        Ok(())
    }

    pub fn apply(&mut self, operation: &Operation) -> Result<()> {
        debug!("Applying {}", operation);
        match operation {
            Operation::Drop { silent, target } => {
                target::drop_or_clear(&mut *self.store, target.as_ref(), *silent, ClearMode::Drop)?
            }
            Operation::Clear { silent, target } => {
                target::drop_or_clear(&mut *self.store, target.as_ref(), *silent, ClearMode::Clear)?
            }
            Operation::Create { silent, graph } => {
                target::create(&mut *self.store, graph.as_ref(), *silent)?
            }
            Operation::Load {
                silent,
                source,
                destination,
            } => self.load(source, destination.as_ref(), *silent)?,
            Operation::InsertData { quads } => self.insert_data(quads)?,
            Operation::DeleteData { quads } => self.delete_data(quads)?,
            Operation::DeleteWhere { quads } => self.delete_where(quads)?,
            Operation::Modify {
                with,
                delete,
                insert,
                using,
                using_named,
                pattern,
            } => {
                if !using.is_empty() || !using_named.is_empty() {
                    warn!("Graph selection from the dataset not supported - ignored");
                }
                self.modify(with.as_ref(), delete, insert, pattern.as_ref())?
            }
        }
        self.report.operations_applied += 1;
        Ok(())
    }

    fn load(&mut self, source: &str, destination: Option<&NamedNode>, silent: Silent) -> Result<()> {
        let graph = match self.loader.load(source) {
            Ok(graph) => graph,
            Err(e) if silent.is_silent() => {
                warn!("LOAD SILENT of {} failed, ignored: {:#}", source, e);
                return Ok(());
            }
            Err(e) => {
                return Err(Error::new(UpdateError::LoaderFailure {
                    source: source.to_string(),
                    cause: e,
                }))
            }
        };
        let triples: Vec<Triple> = graph.iter().map(|t| t.into_owned()).collect();
        let graph_name = match destination {
            Some(name) => GraphNameRef::NamedNode(name.as_ref()),
            None => GraphNameRef::DefaultGraph,
        };
        info!("Adding {} triples from {} to {}", triples.len(), source, graph_name);
        self.store.add_triples(graph_name, &triples)?;
        self.report.triples_inserted += triples.len();
        Ok(())
    }

    fn insert_data(&mut self, quads: &[QuadPattern]) -> Result<()> {
        for quad in quads {
            let quad = ground_quad(quad)?;
            self.store.add_quad(quad.as_ref())?;
        }
        self.report.triples_inserted += quads.len();
        Ok(())
    }

    fn delete_data(&mut self, quads: &[QuadPattern]) -> Result<()> {
        for quad in quads {
            let quad = ground_quad(quad)?;
            self.store.delete_quad(quad.as_ref())?;
        }
        self.report.triples_deleted += quads.len();
        Ok(())
    }

    fn delete_where(&mut self, quads: &[QuadPattern]) -> Result<()> {
        if quads.is_empty() {
            return Ok(());
        }
        // blank nodes match anything; the rewritten template is both pattern and delete set.
        // Initially bound names are reserved so a wildcard is never pre-constrained.
        let template = blank_nodes_to_variables(quads, self.initial.as_ref());
        let pattern = GraphPattern::from_quads(&template);
        let bindings = self.eval(Some(&pattern))?;
        self.exec_delete(&template, None, &bindings)
    }

    fn modify(
        &mut self,
        with: Option<&NamedNode>,
        delete: &[QuadPattern],
        insert: &[QuadPattern],
        pattern: Option<&GraphPattern>,
    ) -> Result<()> {
        let bindings = self.eval(pattern)?;
        // every deletion lands before the first insertion
        self.exec_delete(delete, with, &bindings)?;
        self.exec_insert(insert, with, &bindings)
    }

    fn eval(&self, pattern: Option<&GraphPattern>) -> Result<Vec<Binding>> {
        eval_bindings(
            self.evaluator.as_ref(),
            pattern,
            self.store.store(),
            self.initial.as_ref(),
        )
    }

    fn exec_delete(
        &mut self,
        quads: &[QuadPattern],
        dft_graph: Option<&NamedNode>,
        bindings: &[Binding],
    ) -> Result<()> {
        let Some(acc) = substitute(quads, dft_graph, bindings) else {
            return Ok(());
        };
        self.report.record_substitution(&acc);
        for (graph, triples) in acc.iter() {
            debug!("Deleting {} triples from {}", triples.len(), graph);
            self.store.delete_triples(graph.as_ref(), triples)?;
            self.report.triples_deleted += triples.len();
        }
        Ok(())
    }

    fn exec_insert(
        &mut self,
        quads: &[QuadPattern],
        dft_graph: Option<&NamedNode>,
        bindings: &[Binding],
    ) -> Result<()> {
        let Some(acc) = substitute(quads, dft_graph, bindings) else {
            return Ok(());
        };
        self.report.record_substitution(&acc);
        for (graph, triples) in acc.iter() {
            debug!("Inserting {} triples into {}", triples.len(), graph);
            self.store.add_triples(graph.as_ref(), triples)?;
            self.report.triples_inserted += triples.len();
        }
        Ok(())
    }
}

fn ground_quad(quad: &QuadPattern) -> Result<oxigraph::model::Quad> {
    if !quad.is_concrete() {
        return Err(Error::new(UpdateError::internal(format!(
            "Data quad {} contains a variable",
            quad
        ))));
    }
    quad.to_quad()
}
