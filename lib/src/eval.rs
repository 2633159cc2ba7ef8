//! Turns a graph pattern into the sequence of bindings the substitution step consumes.

use crate::node::{Binding, Node};
use crate::pattern::GraphPattern;
use anyhow::{anyhow, Result};
use log::debug;
use oxigraph::sparql::{QueryResults, SparqlEvaluator};
use oxigraph::store::Store;

/// Evaluates graph patterns against a store.
pub trait PatternEvaluator {
    /// Returns every solution of `pattern`, in the evaluator's order, each extended with
    /// `initial`.
    fn evaluate(&self, pattern: &GraphPattern, store: &Store, initial: &Binding)
        -> Result<Vec<Binding>>;
}

/// Evaluates patterns with Oxigraph's SPARQL engine as `SELECT * WHERE { ... }` queries.
#[derive(Debug, Default, Clone, Copy)]
pub struct SparqlPatternEvaluator;

impl PatternEvaluator for SparqlPatternEvaluator {
    fn evaluate(
        &self,
        pattern: &GraphPattern,
        store: &Store,
        initial: &Binding,
    ) -> Result<Vec<Binding>> {
        let query = pattern.select_all_query();
        debug!("Evaluating {}", query);
        let prepared = SparqlEvaluator::new()
            .parse_query(&query)
            .map_err(|e| anyhow!("Failed to parse generated query {}: {}", query, e))?;
        // Oxigraph only substitutes projected variables; the rest reach each solution below
        let mentioned = pattern.variables();
        let mut bound = prepared.on_store(store);
        for (var, value) in initial.iter() {
            if !mentioned.contains(var.as_str()) {
                continue;
            }
            if let Some(term) = value.to_term() {
                bound = bound.substitute_variable(var.clone(), term);
            }
        }
        let QueryResults::Solutions(solutions) = bound.execute()? else {
            return Err(anyhow!("Expected solutions from {}", query));
        };
        // the solution iterator is dropped on every exit from this loop
        let mut bindings = Vec::new();
        for solution in solutions {
            let solution = solution?;
            let mut binding = initial.clone();
            for (var, term) in solution.iter() {
                binding = binding.with(var.clone(), Node::try_from(term.clone())?);
            }
            bindings.push(binding);
        }
        debug!("Pattern produced {} bindings", bindings.len());
        Ok(bindings)
    }
}

/// Materializes the bindings for an optional pattern.
///
/// Without a pattern the result is a single binding: `initial` if given, else the root binding.
pub fn eval_bindings(
    evaluator: &dyn PatternEvaluator,
    pattern: Option<&GraphPattern>,
    store: &Store,
    initial: Option<&Binding>,
) -> Result<Vec<Binding>> {
    match pattern {
        Some(pattern) => {
            let root = Binding::default();
            evaluator.evaluate(pattern, store, initial.unwrap_or(&root))
        }
        None => Ok(vec![initial.cloned().unwrap_or_default()]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{QuadPattern, TriplePattern};
    use oxigraph::model::{GraphNameRef, Literal, NamedNode, QuadRef};
    use oxigraph::sparql::Variable;

    fn iri(s: &str) -> NamedNode {
        NamedNode::new(s).unwrap()
    }

    fn var(s: &str) -> Variable {
        Variable::new(s).unwrap()
    }

    fn store_with(triples: &[(&str, &str, &str)], graph: GraphNameRef<'_>) -> Store {
        let store = Store::new().unwrap();
        for (s, p, o) in triples {
            store
                .insert(QuadRef::new(
                    &iri(s),
                    &iri(p),
                    &iri(o),
                    graph,
                ))
                .unwrap();
        }
        store
    }

    #[test]
    fn test_no_pattern_yields_single_binding() {
        let store = Store::new().unwrap();
        let root = eval_bindings(&SparqlPatternEvaluator, None, &store, None).unwrap();
        assert_eq!(root, vec![Binding::default()]);

        let initial = Binding::new().with(var("x"), iri("http://example.org/a"));
        let bindings =
            eval_bindings(&SparqlPatternEvaluator, None, &store, Some(&initial)).unwrap();
        assert_eq!(bindings, vec![initial]);
    }

    #[test]
    fn test_evaluate_default_graph_pattern() {
        let store = store_with(
            &[
                ("http://example.org/a", "http://example.org/p", "http://example.org/b"),
                ("http://example.org/c", "http://example.org/p", "http://example.org/d"),
                ("http://example.org/e", "http://example.org/q", "http://example.org/f"),
            ],
            GraphNameRef::DefaultGraph,
        );
        let pattern = GraphPattern::triples(vec![TriplePattern::new(
            var("s"),
            iri("http://example.org/p"),
            var("o"),
        )]);
        let bindings =
            eval_bindings(&SparqlPatternEvaluator, Some(&pattern), &store, None).unwrap();
        assert_eq!(bindings.len(), 2);
        for binding in &bindings {
            assert!(binding.contains(&var("s")));
            assert!(binding.contains(&var("o")));
        }
    }

    #[test]
    fn test_evaluate_named_graph_pattern() {
        let g = iri("http://example.org/g");
        let store = store_with(
            &[("http://example.org/a", "http://example.org/p", "http://example.org/b")],
            GraphNameRef::NamedNode(g.as_ref()),
        );
        let default_only = GraphPattern::from_quads(&[QuadPattern::in_default_graph(
            var("s"),
            var("p"),
            var("o"),
        )]);
        let bindings =
            eval_bindings(&SparqlPatternEvaluator, Some(&default_only), &store, None).unwrap();
        assert!(bindings.is_empty());

        let in_graph = GraphPattern::from_quads(&[QuadPattern::new(
            g,
            var("s"),
            var("p"),
            var("o"),
        )]);
        let bindings =
            eval_bindings(&SparqlPatternEvaluator, Some(&in_graph), &store, None).unwrap();
        assert_eq!(bindings.len(), 1);
        assert_eq!(
            bindings[0].get(&var("s")),
            Some(&Node::Iri(iri("http://example.org/a")))
        );
    }

    #[test]
    fn test_initial_binding_constrains_and_extends() {
        let store = store_with(
            &[
                ("http://example.org/a", "http://example.org/p", "http://example.org/b"),
                ("http://example.org/c", "http://example.org/p", "http://example.org/d"),
            ],
            GraphNameRef::DefaultGraph,
        );
        let pattern = GraphPattern::triples(vec![TriplePattern::new(
            var("s"),
            iri("http://example.org/p"),
            var("o"),
        )]);
        let initial = Binding::new()
            .with(var("s"), iri("http://example.org/c"))
            .with(var("extra"), iri("http://example.org/z"));
        let bindings =
            eval_bindings(&SparqlPatternEvaluator, Some(&pattern), &store, Some(&initial))
                .unwrap();
        assert_eq!(bindings.len(), 1);
        assert_eq!(
            bindings[0].get(&var("o")),
            Some(&Node::Iri(iri("http://example.org/d")))
        );
        assert_eq!(
            bindings[0].get(&var("extra")),
            Some(&Node::Iri(iri("http://example.org/z")))
        );
    }

    #[test]
    fn test_group_filter_sees_outer_variables() {
        let store = Store::new().unwrap();
        let p = iri("http://example.org/p");
        for (s, o) in [("http://example.org/a", 2), ("http://example.org/c", 1)] {
            store
                .insert(QuadRef::new(
                    &iri(s),
                    &p,
                    &Literal::from(o),
                    GraphNameRef::DefaultGraph,
                ))
                .unwrap();
        }
        let pattern = GraphPattern::Group {
            patterns: vec![
                GraphPattern::triples(vec![TriplePattern::new(var("s"), p.clone(), var("o"))]),
                GraphPattern::sparql("FILTER(?o > 1)"),
            ],
        };
        let bindings =
            eval_bindings(&SparqlPatternEvaluator, Some(&pattern), &store, None).unwrap();
        assert_eq!(bindings.len(), 1);
        assert_eq!(
            bindings[0].get(&var("s")),
            Some(&Node::Iri(iri("http://example.org/a")))
        );

        // a body ending in a triple is followed by more triples
        let pattern = GraphPattern::Group {
            patterns: vec![
                GraphPattern::sparql("?s <http://example.org/p> ?o # trailing comment"),
                GraphPattern::triples(vec![TriplePattern::new(var("s"), p, var("o2"))]),
            ],
        };
        let bindings =
            eval_bindings(&SparqlPatternEvaluator, Some(&pattern), &store, None).unwrap();
        assert_eq!(bindings.len(), 2);
    }
}
