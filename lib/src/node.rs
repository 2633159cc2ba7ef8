//! Term, quad template and binding types used by the update engine.
//!
//! IRIs, literals and blank nodes are the oxigraph model types. [`Node`] adds the two things a
//! template needs on top of them: variables and the default-graph sentinel.

use crate::consts::DEFAULT_GRAPH_KEYWORD;
use anyhow::{anyhow, bail, Result};
use oxigraph::model::{BlankNode, GraphName, Literal, NamedNode, NamedOrBlankNode, Quad, Term};
use oxigraph::sparql::Variable;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// An RDF term as it appears in update templates and patterns.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Node {
    /// Graph component meaning "the store's default graph".
    DefaultGraph,
    Iri(NamedNode),
    Literal(Literal),
    Blank(BlankNode),
    Variable(Variable),
}

impl Node {
    pub fn is_blank(&self) -> bool {
        matches!(self, Node::Blank(_))
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Node::Variable(_))
    }

    /// Everything except a variable is concrete.
    pub fn is_concrete(&self) -> bool {
        !self.is_variable()
    }

    pub fn is_default_graph(&self) -> bool {
        matches!(self, Node::DefaultGraph)
    }

    /// Converts to an oxigraph term; `None` for variables and the default-graph sentinel.
    pub fn to_term(&self) -> Option<Term> {
        match self {
            Node::Iri(n) => Some(n.clone().into()),
            Node::Literal(l) => Some(l.clone().into()),
            Node::Blank(b) => Some(b.clone().into()),
            Node::DefaultGraph | Node::Variable(_) => None,
        }
    }

    /// Converts a graph component into an oxigraph graph name.
    pub fn to_graph_name(&self) -> Result<GraphName> {
        match self {
            Node::DefaultGraph => Ok(GraphName::DefaultGraph),
            Node::Iri(n) => Ok(n.clone().into()),
            Node::Blank(b) => Ok(b.clone().into()),
            other => bail!("{} cannot be used as a graph name", other),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::DefaultGraph => f.write_str(DEFAULT_GRAPH_KEYWORD),
            Node::Iri(n) => write!(f, "{}", n),
            Node::Literal(l) => write!(f, "{}", l),
            Node::Blank(b) => write!(f, "{}", b),
            Node::Variable(v) => write!(f, "{}", v),
        }
    }
}

impl FromStr for Node {
    type Err = anyhow::Error;

    /// Parses N-Triples term syntax, `?name` / `$name` variables and the `DEFAULT` keyword.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s == DEFAULT_GRAPH_KEYWORD {
            return Ok(Node::DefaultGraph);
        }
        if let Some(name) = s.strip_prefix('?').or_else(|| s.strip_prefix('$')) {
            let var = Variable::new(name).map_err(|e| anyhow!("Invalid variable {}: {}", s, e))?;
            return Ok(Node::Variable(var));
        }
        let term = Term::from_str(s).map_err(|e| anyhow!("Invalid RDF term {}: {}", s, e))?;
        Node::try_from(term)
    }
}

impl Serialize for Node {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Node::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl From<NamedNode> for Node {
    fn from(node: NamedNode) -> Self {
        Node::Iri(node)
    }
}

impl From<BlankNode> for Node {
    fn from(node: BlankNode) -> Self {
        Node::Blank(node)
    }
}

impl From<Literal> for Node {
    fn from(literal: Literal) -> Self {
        Node::Literal(literal)
    }
}

impl From<Variable> for Node {
    fn from(var: Variable) -> Self {
        Node::Variable(var)
    }
}

impl From<NamedOrBlankNode> for Node {
    fn from(node: NamedOrBlankNode) -> Self {
        match node {
            NamedOrBlankNode::NamedNode(n) => Node::Iri(n),
            NamedOrBlankNode::BlankNode(b) => Node::Blank(b),
        }
    }
}

impl From<GraphName> for Node {
    fn from(graph: GraphName) -> Self {
        match graph {
            GraphName::NamedNode(n) => Node::Iri(n),
            GraphName::BlankNode(b) => Node::Blank(b),
            GraphName::DefaultGraph => Node::DefaultGraph,
        }
    }
}

impl TryFrom<Term> for Node {
    type Error = anyhow::Error;

    fn try_from(term: Term) -> Result<Self> {
        match term {
            Term::NamedNode(n) => Ok(Node::Iri(n)),
            Term::BlankNode(b) => Ok(Node::Blank(b)),
            Term::Literal(l) => Ok(Node::Literal(l)),
            #[allow(unreachable_patterns)]
            other => Err(anyhow!("Unsupported term in update: {}", other)),
        }
    }
}

/// A triple whose positions may hold variables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriplePattern {
    pub subject: Node,
    pub predicate: Node,
    pub object: Node,
}

impl TriplePattern {
    pub fn new(
        subject: impl Into<Node>,
        predicate: impl Into<Node>,
        object: impl Into<Node>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }
}

impl fmt::Display for TriplePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)
    }
}

/// A quad template: graph, subject, predicate and object, any of which may be a variable or
/// blank node. Ground data uses the same type with only concrete positions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuadPattern {
    pub graph: Node,
    pub subject: Node,
    pub predicate: Node,
    pub object: Node,
}

impl QuadPattern {
    pub fn new(
        graph: impl Into<Node>,
        subject: impl Into<Node>,
        predicate: impl Into<Node>,
        object: impl Into<Node>,
    ) -> Self {
        Self {
            graph: graph.into(),
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }

    /// A template quad targeting the default graph.
    pub fn in_default_graph(
        subject: impl Into<Node>,
        predicate: impl Into<Node>,
        object: impl Into<Node>,
    ) -> Self {
        Self::new(Node::DefaultGraph, subject, predicate, object)
    }

    pub fn is_concrete(&self) -> bool {
        self.nodes().iter().all(|n| n.is_concrete())
    }

    /// The four components in graph, subject, predicate, object order.
    pub fn nodes(&self) -> [&Node; 4] {
        [&self.graph, &self.subject, &self.predicate, &self.object]
    }

    /// Applies `f` to every component, producing a new quad.
    pub fn map_nodes(&self, mut f: impl FnMut(&Node) -> Node) -> QuadPattern {
        QuadPattern {
            graph: f(&self.graph),
            subject: f(&self.subject),
            predicate: f(&self.predicate),
            object: f(&self.object),
        }
    }

    pub fn triple_pattern(&self) -> TriplePattern {
        TriplePattern {
            subject: self.subject.clone(),
            predicate: self.predicate.clone(),
            object: self.object.clone(),
        }
    }

    /// Converts a concrete template quad into an oxigraph quad.
    ///
    /// Fails when a component is still a variable or a position cannot hold its term
    /// (literal subject, non-IRI predicate, literal graph name).
    pub fn to_quad(&self) -> Result<Quad> {
        let subject: NamedOrBlankNode = match &self.subject {
            Node::Iri(n) => n.clone().into(),
            Node::Blank(b) => b.clone().into(),
            other => bail!("{} cannot be used as a subject", other),
        };
        let predicate = match &self.predicate {
            Node::Iri(n) => n.clone(),
            other => bail!("{} cannot be used as a predicate", other),
        };
        let object = self
            .object
            .to_term()
            .ok_or_else(|| anyhow!("{} cannot be used as an object", self.object))?;
        let graph_name = self.graph.to_graph_name()?;
        Ok(Quad::new(subject, predicate, object, graph_name))
    }
}

impl fmt::Display for QuadPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.graph.is_default_graph() {
            write!(f, "{} {} {}", self.subject, self.predicate, self.object)
        } else {
            write!(
                f,
                "GRAPH {} {{ {} {} {} }}",
                self.graph, self.subject, self.predicate, self.object
            )
        }
    }
}

/// A partial mapping from variables to concrete nodes produced by pattern evaluation.
///
/// The empty binding is the root binding: it constrains nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Binding {
    values: HashMap<Variable, Node>,
}

impl Binding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of this binding with `var` mapped to `value`.
    pub fn with(mut self, var: Variable, value: impl Into<Node>) -> Self {
        self.values.insert(var, value.into());
        self
    }

    pub fn get(&self, var: &Variable) -> Option<&Node> {
        self.values.get(var)
    }

    pub fn contains(&self, var: &Variable) -> bool {
        self.values.contains_key(var)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Variable, &Node)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Replaces a bound variable by its value; everything else is returned unchanged.
    pub fn apply(&self, node: &Node) -> Node {
        match node {
            Node::Variable(var) => self
                .values
                .get(var)
                .cloned()
                .unwrap_or_else(|| node.clone()),
            other => other.clone(),
        }
    }
}

impl FromIterator<(Variable, Node)> for Binding {
    fn from_iter<I: IntoIterator<Item = (Variable, Node)>>(iter: I) -> Self {
        Binding {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iri(s: &str) -> NamedNode {
        NamedNode::new(s).unwrap()
    }

    #[test]
    fn test_parse_nodes() {
        assert_eq!(Node::from_str("DEFAULT").unwrap(), Node::DefaultGraph);
        assert_eq!(
            Node::from_str("<http://example.org/a>").unwrap(),
            Node::Iri(iri("http://example.org/a"))
        );
        assert_eq!(
            Node::from_str("?x").unwrap(),
            Node::Variable(Variable::new("x").unwrap())
        );
        assert_eq!(
            Node::from_str("$x").unwrap(),
            Node::Variable(Variable::new("x").unwrap())
        );
        assert!(Node::from_str("_:b1").unwrap().is_blank());
        assert_eq!(
            Node::from_str("\"hello\"@en").unwrap(),
            Node::Literal(Literal::new_language_tagged_literal("hello", "en").unwrap())
        );
        assert!(Node::from_str("not a term").is_err());
    }

    #[test]
    fn test_display_parses_back() {
        let nodes = vec![
            Node::DefaultGraph,
            Node::Iri(iri("http://example.org/a")),
            Node::Literal(Literal::new_simple_literal("with \"quotes\"")),
            Node::Variable(Variable::new("y").unwrap()),
        ];
        for node in nodes {
            assert_eq!(Node::from_str(&node.to_string()).unwrap(), node);
        }
    }

    #[test]
    fn test_quad_concreteness() {
        let p = iri("http://example.org/p");
        let concrete = QuadPattern::in_default_graph(
            iri("http://example.org/a"),
            p.clone(),
            BlankNode::default(),
        );
        assert!(concrete.is_concrete());
        let quad = concrete.to_quad().unwrap();
        assert_eq!(quad.graph_name, GraphName::DefaultGraph);

        let open = QuadPattern::in_default_graph(
            Variable::new("s").unwrap(),
            p.clone(),
            iri("http://example.org/o"),
        );
        assert!(!open.is_concrete());
        assert!(open.to_quad().is_err());

        // literal subjects are concrete but not storable
        let bad = QuadPattern::in_default_graph(
            Literal::new_simple_literal("x"),
            p,
            iri("http://example.org/o"),
        );
        assert!(bad.is_concrete());
        assert!(bad.to_quad().is_err());
    }

    #[test]
    fn test_binding_apply() {
        let x = Variable::new("x").unwrap();
        let y = Variable::new("y").unwrap();
        let a = Node::Iri(iri("http://example.org/a"));
        let b = Binding::new().with(x.clone(), a.clone());
        assert_eq!(b.apply(&Node::Variable(x)), a);
        assert_eq!(b.apply(&Node::Variable(y.clone())), Node::Variable(y));
        assert_eq!(b.apply(&Node::DefaultGraph), Node::DefaultGraph);
        assert!(Binding::default().is_empty());
    }

    #[test]
    fn test_quad_pattern_json() {
        let json = r#"{"graph":"DEFAULT","subject":"?s","predicate":"<http://example.org/p>","object":"\"v\""}"#;
        let quad: QuadPattern = serde_json::from_str(json).unwrap();
        assert!(quad.graph.is_default_graph());
        assert!(quad.subject.is_variable());
        assert_eq!(quad.object, Node::Literal(Literal::new_simple_literal("v")));
    }
}
