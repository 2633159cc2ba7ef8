//! Instantiates quad templates once per binding and groups the results by target graph.

use crate::node::{Binding, Node, QuadPattern};
use log::warn;
use oxigraph::model::{BlankNode, GraphName, NamedNode, Triple};
use std::collections::HashMap;

/// Concrete triples keyed by destination graph, in order of first appearance of each graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphTriples {
    groups: Vec<(GraphName, Vec<Triple>)>,
    unbound: usize,
    ill_formed: usize,
}

impl GraphTriples {
    pub fn push(&mut self, graph: GraphName, triple: Triple) {
        match self.groups.iter_mut().find(|(name, _)| *name == graph) {
            Some((_, triples)) => triples.push(triple),
            None => self.groups.push((graph, vec![triple])),
        }
    }

    pub fn get(&self, graph: &GraphName) -> Option<&[Triple]> {
        self.groups
            .iter()
            .find(|(name, _)| name == graph)
            .map(|(_, triples)| triples.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GraphName, &[Triple])> {
        self.groups
            .iter()
            .map(|(name, triples)| (name, triples.as_slice()))
    }

    pub fn graph_count(&self) -> usize {
        self.groups.len()
    }

    /// Total number of triples over all graphs.
    pub fn len(&self) -> usize {
        self.groups.iter().map(|(_, triples)| triples.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Template quads skipped because a variable stayed unbound.
    pub fn unbound(&self) -> usize {
        self.unbound
    }

    /// Template quads skipped because a term cannot occupy its position.
    pub fn ill_formed(&self) -> usize {
        self.ill_formed
    }
}

/// Substitutes every binding into every template quad.
///
/// Blank nodes of the template are re-minted per binding: within one binding a template blank
/// node always yields the same fresh node, across bindings it never does. When `dft_graph` is
/// set, template quads in the default graph target it instead. Quads left with an unbound
/// variable are dropped with a warning.
///
/// Returns `None` when there is nothing to do: no template quads or no bindings.
pub fn substitute(
    quads: &[QuadPattern],
    dft_graph: Option<&NamedNode>,
    bindings: &[Binding],
) -> Option<GraphTriples> {
    if quads.is_empty() || bindings.is_empty() {
        return None;
    }
    let mut acc = GraphTriples::default();
    for binding in bindings {
        let mut bnode_map: HashMap<BlankNode, BlankNode> = HashMap::new();
        for quad in quads {
            substitute_quad(&mut acc, quad, dft_graph, binding, &mut bnode_map);
        }
    }
    Some(acc)
}

fn substitute_quad(
    acc: &mut GraphTriples,
    template: &QuadPattern,
    dft_graph: Option<&NamedNode>,
    binding: &Binding,
    bnode_map: &mut HashMap<BlankNode, BlankNode>,
) {
    let quad = match dft_graph {
        Some(graph) if template.graph.is_default_graph() => QuadPattern {
            graph: Node::Iri(graph.clone()),
            ..template.clone()
        },
        _ => template.clone(),
    };
    let quad = quad.map_nodes(|node| match node {
        Node::Blank(bnode) => Node::Blank(
            bnode_map
                .entry(bnode.clone())
                .or_insert_with(BlankNode::default)
                .clone(),
        ),
        other => binding.apply(other),
    });
    if !quad.is_concrete() {
        warn!("Unbound quad: {}", template);
        acc.unbound += 1;
        return;
    }
    match quad.to_quad() {
        Ok(quad) => acc.push(
            quad.graph_name,
            Triple::new(quad.subject, quad.predicate, quad.object),
        ),
        Err(e) => {
            warn!("Skipping quad {}: {}", quad, e);
            acc.ill_formed += 1;
        }
    }
}
