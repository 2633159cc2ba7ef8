//! Resolves the target of DROP, CLEAR and CREATE into concrete graphs and applies them.

use crate::errors::UpdateError;
use crate::options::{ClearMode, Silent};
use crate::store::GraphStore;
use anyhow::{Error, Result};
use log::{debug, info};
use oxigraph::model::{GraphNameRef, NamedNode, NamedOrBlankNodeRef};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The graphs a graph-management operation applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GraphTarget {
    Default,
    Named {
        #[serde(with = "crate::util::named_node_serde")]
        graph: NamedNode,
    },
    All,
    AllNamed,
}

impl GraphTarget {
    pub fn named(graph: NamedNode) -> Self {
        GraphTarget::Named { graph }
    }
}

impl fmt::Display for GraphTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphTarget::Default => f.write_str("DEFAULT"),
            GraphTarget::Named { graph } => write!(f, "GRAPH {}", graph),
            GraphTarget::All => f.write_str("ALL"),
            GraphTarget::AllNamed => f.write_str("NAMED"),
        }
    }
}

/// Applies DROP (`ClearMode::Drop`) or CLEAR (`ClearMode::Clear`) to a target.
///
/// The default graph is only ever cleared; it cannot be removed from the store. A missing
/// target means the operation object is malformed, which is fatal even when silent.
pub fn drop_or_clear<S: GraphStore + ?Sized>(
    store: &mut S,
    target: Option<&GraphTarget>,
    silent: Silent,
    mode: ClearMode,
) -> Result<()> {
    let Some(target) = target else {
        return Err(Error::new(UpdateError::internal(
            "Target is undefined for DROP/CLEAR",
        )));
    };
    debug!("{:?} {} (silent: {})", mode, target, silent.is_silent());
    match target {
        GraphTarget::All => {
            apply_one(store, GraphNameRef::DefaultGraph, silent, ClearMode::Clear)?;
            apply_all_named(store, silent, mode)
        }
        GraphTarget::AllNamed => apply_all_named(store, silent, mode),
        GraphTarget::Default => apply_one(store, GraphNameRef::DefaultGraph, silent, ClearMode::Clear),
        GraphTarget::Named { graph } => apply_one(store, graph.as_ref().into(), silent, mode),
    }
}

fn apply_all_named<S: GraphStore + ?Sized>(
    store: &mut S,
    silent: Silent,
    mode: ClearMode,
) -> Result<()> {
    // snapshot first: the store's enumeration must not be live while graphs are removed
    let names = store.graph_names()?;
    for name in &names {
        let graph: GraphNameRef<'_> = match name.as_ref() {
            NamedOrBlankNodeRef::NamedNode(n) => n.into(),
            NamedOrBlankNodeRef::BlankNode(b) => b.into(),
        };
        apply_one(store, graph, silent, mode)?;
    }
    Ok(())
}

fn apply_one<S: GraphStore + ?Sized>(
    store: &mut S,
    graph: GraphNameRef<'_>,
    silent: Silent,
    mode: ClearMode,
) -> Result<()> {
    let name: NamedOrBlankNodeRef<'_> = match graph {
        GraphNameRef::DefaultGraph => {
            store.clear_graph(graph)?;
            return Ok(());
        }
        GraphNameRef::NamedNode(n) => n.into(),
        GraphNameRef::BlankNode(b) => b.into(),
    };
    if !store.contains_graph(name)? {
        if silent.is_silent() {
            debug!("No such graph {}; ignored", name);
            return Ok(());
        }
        return Err(Error::new(UpdateError::graph_not_found(name)));
    }
    match mode {
        ClearMode::Clear => {
            info!("Clearing graph {}", name);
            store.clear_graph(graph)
        }
        ClearMode::Drop => {
            info!("Dropping graph {}", name);
            store.remove_graph(name)
        }
    }
}

/// Creates an empty named graph. A missing graph name is a no-op.
pub fn create<S: GraphStore + ?Sized>(
    store: &mut S,
    graph: Option<&NamedNode>,
    silent: Silent,
) -> Result<()> {
    let Some(graph) = graph else {
        return Ok(());
    };
    if store.contains_graph(graph.as_ref().into())? {
        if silent.is_silent() {
            debug!("Graph {} already exists; ignored", graph);
            return Ok(());
        }
        return Err(Error::new(UpdateError::graph_already_exists(graph)));
    }
    info!("Creating graph {}", graph);
    store.add_graph(graph.as_ref().into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryGraphStore;
    use oxigraph::model::{GraphName, NamedNodeRef, Triple};

    fn iri(s: &str) -> NamedNode {
        NamedNode::new(s).unwrap()
    }

    fn sample() -> Triple {
        Triple::new(
            iri("http://example.org/a"),
            iri("http://example.org/b"),
            iri("http://example.org/c"),
        )
    }

    fn store_with_graphs(names: &[&str]) -> MemoryGraphStore {
        let mut store = MemoryGraphStore::new().unwrap();
        store
            .add_triples(GraphNameRef::DefaultGraph, &[sample()])
            .unwrap();
        for name in names {
            let g = NamedNodeRef::new(name).unwrap();
            store.add_triples(g.into(), &[sample()]).unwrap();
        }
        store
    }

    fn kind(err: &Error) -> &UpdateError {
        err.downcast_ref::<UpdateError>().unwrap()
    }

    #[test]
    fn test_clear_named_twice() {
        let mut store = store_with_graphs(&["http://example.org/g"]);
        let target = GraphTarget::named(iri("http://example.org/g"));
        for _ in 0..2 {
            drop_or_clear(&mut store, Some(&target), Silent::No, ClearMode::Clear).unwrap();
            let g = GraphName::NamedNode(iri("http://example.org/g"));
            assert!(store.triples(g.as_ref()).unwrap().is_empty());
            assert!(store
                .contains_graph(NamedNodeRef::new("http://example.org/g").unwrap().into())
                .unwrap());
        }
    }

    #[test]
    fn test_drop_missing_graph() {
        let mut store = store_with_graphs(&[]);
        let target = GraphTarget::named(iri("http://example.org/missing"));
        let err = drop_or_clear(&mut store, Some(&target), Silent::No, ClearMode::Drop)
            .unwrap_err();
        assert!(matches!(kind(&err), UpdateError::GraphNotFound { .. }));

        drop_or_clear(&mut store, Some(&target), Silent::Yes, ClearMode::Drop).unwrap();
        assert_eq!(store.size().unwrap().num_triples, 1);
    }

    #[test]
    fn test_drop_all_keeps_default_graph() {
        let mut store = store_with_graphs(&["http://example.org/g1", "http://example.org/g2"]);
        drop_or_clear(&mut store, Some(&GraphTarget::All), Silent::No, ClearMode::Drop).unwrap();
        assert!(store.graph_names().unwrap().is_empty());
        assert!(store
            .triples(GraphNameRef::DefaultGraph)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_clear_all_named_keeps_graphs() {
        let mut store = store_with_graphs(&["http://example.org/g1", "http://example.org/g2"]);
        drop_or_clear(
            &mut store,
            Some(&GraphTarget::AllNamed),
            Silent::No,
            ClearMode::Clear,
        )
        .unwrap();
        assert_eq!(store.graph_names().unwrap().len(), 2);
        // only the default graph's triple is left
        assert_eq!(store.size().unwrap().num_triples, 1);
    }

    #[test]
    fn test_drop_default_only_clears() {
        let mut store = store_with_graphs(&["http://example.org/g"]);
        drop_or_clear(
            &mut store,
            Some(&GraphTarget::Default),
            Silent::No,
            ClearMode::Drop,
        )
        .unwrap();
        assert!(store
            .triples(GraphNameRef::DefaultGraph)
            .unwrap()
            .is_empty());
        assert_eq!(store.graph_names().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_target_is_fatal_even_when_silent() {
        let mut store = store_with_graphs(&[]);
        let err = drop_or_clear(&mut store, None, Silent::Yes, ClearMode::Drop).unwrap_err();
        assert!(matches!(
            kind(&err),
            UpdateError::InternalInvariantViolation { .. }
        ));
    }

    #[test]
    fn test_create() {
        let mut store = store_with_graphs(&["http://example.org/g"]);
        let g = iri("http://example.org/g");
        let err = create(&mut store, Some(&g), Silent::No).unwrap_err();
        assert!(matches!(kind(&err), UpdateError::GraphAlreadyExists { .. }));

        create(&mut store, Some(&g), Silent::Yes).unwrap();
        assert_eq!(
            store.triples(GraphNameRef::NamedNode(g.as_ref())).unwrap(),
            vec![sample()]
        );

        let fresh = iri("http://example.org/fresh");
        create(&mut store, Some(&fresh), Silent::No).unwrap();
        assert!(store.contains_graph(fresh.as_ref().into()).unwrap());

        create(&mut store, None, Silent::No).unwrap();
    }
}
