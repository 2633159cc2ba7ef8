//! Graph patterns handed to the pattern evaluator.
//!
//! Patterns are kept deliberately small: blocks of triple patterns, named-graph restrictions,
//! nested groups, and a verbatim SPARQL body for anything richer (FILTER, OPTIONAL, ...) that the
//! upstream parser wants evaluated. Every pattern renders as a SPARQL group graph pattern; a
//! SPARQL body is spliced into its parent group so a FILTER sees the group's variables.

use crate::consts::BNODE_VARIABLE_PREFIX;
use crate::node::{Binding, Node, QuadPattern, TriplePattern};
use oxigraph::model::BlankNode;
use oxigraph::sparql::Variable;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GraphPattern {
    /// Conjunction of the inner patterns.
    Group { patterns: Vec<GraphPattern> },
    /// A basic graph pattern matched against the active graph.
    Triples { triples: Vec<TriplePattern> },
    /// Restricts `pattern` to the graph `name` (an IRI or a variable).
    Graph {
        name: Node,
        pattern: Box<GraphPattern>,
    },
    /// A SPARQL group graph pattern body, without the enclosing braces.
    Sparql { text: String },
}

impl GraphPattern {
    pub fn triples(triples: Vec<TriplePattern>) -> Self {
        GraphPattern::Triples { triples }
    }

    pub fn sparql(text: impl Into<String>) -> Self {
        GraphPattern::Sparql { text: text.into() }
    }

    /// Builds a pattern from a quad template.
    ///
    /// Quads are grouped by graph component in order of first appearance. The default-graph
    /// block is left unwrapped; every other block is restricted with `GRAPH`.
    pub fn from_quads(quads: &[QuadPattern]) -> Self {
        let mut blocks: Vec<(Node, Vec<TriplePattern>)> = Vec::new();
        for quad in quads {
            match blocks.iter_mut().find(|(graph, _)| *graph == quad.graph) {
                Some((_, triples)) => triples.push(quad.triple_pattern()),
                None => blocks.push((quad.graph.clone(), vec![quad.triple_pattern()])),
            }
        }
        let patterns = blocks
            .into_iter()
            .map(|(graph, triples)| {
                let block = GraphPattern::Triples { triples };
                if graph.is_default_graph() {
                    block
                } else {
                    GraphPattern::Graph {
                        name: graph,
                        pattern: Box::new(block),
                    }
                }
            })
            .collect();
        GraphPattern::Group { patterns }
    }

    /// Names of the variables the pattern mentions.
    ///
    /// SPARQL bodies are scanned lexically, so a variable that only appears inside a nested
    /// sub-select still counts.
    pub fn variables(&self) -> HashSet<&str> {
        let mut names = HashSet::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables<'a>(&'a self, names: &mut HashSet<&'a str>) {
        match self {
            GraphPattern::Group { patterns } => {
                for pattern in patterns {
                    pattern.collect_variables(names);
                }
            }
            GraphPattern::Triples { triples } => {
                for triple in triples {
                    for node in [&triple.subject, &triple.predicate, &triple.object] {
                        if let Node::Variable(var) = node {
                            names.insert(var.as_str());
                        }
                    }
                }
            }
            GraphPattern::Graph { name, pattern } => {
                if let Node::Variable(var) = name {
                    names.insert(var.as_str());
                }
                pattern.collect_variables(names);
            }
            GraphPattern::Sparql { text } => names.extend(sparql_variables(text)),
        }
    }

    /// Wraps the pattern into a query projecting every in-scope variable.
    pub fn select_all_query(&self) -> String {
        format!("SELECT * WHERE {}", self)
    }

    fn write_body(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphPattern::Group { patterns } => {
                for pattern in patterns {
                    pattern.write_element(f)?;
                }
                Ok(())
            }
            GraphPattern::Triples { triples } => {
                for triple in triples {
                    write!(f, "{} . ", triple)?;
                }
                Ok(())
            }
            GraphPattern::Graph { name, pattern } if name.is_default_graph() => pattern.write_body(f),
            GraphPattern::Graph { name, pattern } => {
                write!(f, "GRAPH {} {{ ", name)?;
                pattern.write_body(f)?;
                f.write_str("} ")
            }
            GraphPattern::Sparql { text } => {
                let text = text.trim();
                if text.is_empty() {
                    return Ok(());
                }
                // the line break ends a trailing comment, the dot a trailing triple
                if text.ends_with('.') {
                    writeln!(f, "{}", text)
                } else {
                    write!(f, "{}\n. ", text)
                }
            }
        }
    }

    // an element nested inside a group; SPARQL bodies stay in the group's scope
    fn write_element(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphPattern::Group { .. } => {
                f.write_str("{ ")?;
                self.write_body(f)?;
                f.write_str("} ")
            }
            _ => self.write_body(f),
        }
    }
}

impl fmt::Display for GraphPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{ ")?;
        self.write_body(f)?;
        f.write_str("}")
    }
}

/// Replaces every blank node of a template with a fresh variable.
///
/// The same blank node always maps to the same variable; the generated names never collide with
/// variables already present in the template or bound by `reserved`.
pub fn blank_nodes_to_variables(
    quads: &[QuadPattern],
    reserved: Option<&Binding>,
) -> Vec<QuadPattern> {
    let mut used: HashSet<&str> = quads
        .iter()
        .flat_map(|quad| quad.nodes())
        .filter_map(|node| match node {
            Node::Variable(var) => Some(var.as_str()),
            _ => None,
        })
        .collect();
    if let Some(binding) = reserved {
        used.extend(binding.iter().map(|(var, _)| var.as_str()));
    }
    let mut mapping: HashMap<BlankNode, Variable> = HashMap::new();
    let mut counter = 0usize;
    let mut rewritten = Vec::with_capacity(quads.len());
    for quad in quads {
        rewritten.push(quad.map_nodes(|node| match node {
            Node::Blank(bnode) => {
                let var = mapping
                    .entry(bnode.clone())
                    .or_insert_with(|| fresh_variable(&used, &mut counter));
                Node::Variable(var.clone())
            }
            other => other.clone(),
        }));
    }
    rewritten
}

fn fresh_variable(used: &HashSet<&str>, counter: &mut usize) -> Variable {
    loop {
        let name = format!("{}{}", BNODE_VARIABLE_PREFIX, counter);
        *counter += 1;
        if !used.contains(name.as_str()) {
            return Variable::new_unchecked(name);
        }
    }
}

// Variable names in a SPARQL body. IRIs, string literals and comments are skipped so a `?` in a
// query string or an IRI is not mistaken for a variable.
fn sparql_variables(text: &str) -> HashSet<&str> {
    let mut names = HashSet::new();
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match c {
            '?' | '$' => {
                let start = i + c.len_utf8();
                let mut end = start;
                while let Some(&(j, next)) = chars.peek() {
                    if !(next.is_alphanumeric() || next == '_' || next == '\u{b7}') {
                        break;
                    }
                    end = j + next.len_utf8();
                    chars.next();
                }
                if end > start {
                    names.insert(&text[start..end]);
                }
            }
            '"' | '\'' => {
                while let Some((_, next)) = chars.next() {
                    if next == '\\' {
                        chars.next();
                    } else if next == c {
                        break;
                    }
                }
            }
            '#' => {
                for (_, next) in chars.by_ref() {
                    if next == '\n' {
                        break;
                    }
                }
            }
            '<' => {
                // an IRI reference runs to `>` without whitespace; a `<` comparison does not
                let rest = &text[i + 1..];
                let stop = rest.find(|ch: char| ch.is_whitespace() || "<>\"{}|^`\\".contains(ch));
                if let Some(len) = stop.filter(|&len| rest[len..].starts_with('>')) {
                    let close = i + 1 + len;
                    while chars.next_if(|&(j, _)| j <= close).is_some() {}
                }
            }
            _ => {}
        }
    }
    names
}
