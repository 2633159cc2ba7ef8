//! The update operations the engine applies, and the request that sequences them.
//!
//! Operations arrive already parsed. They are plain serde data so a request can be stored
//! or exchanged as JSON:
//!
//! ```json
//! {"operations": [
//!   {"type": "create", "graph": "http://example.org/g"},
//!   {"type": "insert_data", "quads": [
//!     {"graph": "<http://example.org/g>", "subject": "<http://example.org/a>",
//!      "predicate": "<http://example.org/p>", "object": "\"v\""}
//!   ]}
//! ]}
//! ```

use crate::node::QuadPattern;
use crate::options::Silent;
use crate::pattern::GraphPattern;
use crate::target::GraphTarget;
use anyhow::{Context, Result};
use oxigraph::model::NamedNode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::BufReader;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    Drop {
        #[serde(default)]
        silent: Silent,
        #[serde(default)]
        target: Option<GraphTarget>,
    },
    Clear {
        #[serde(default)]
        silent: Silent,
        #[serde(default)]
        target: Option<GraphTarget>,
    },
    Create {
        #[serde(default)]
        silent: Silent,
        #[serde(default, with = "crate::util::opt_named_node_serde")]
        graph: Option<NamedNode>,
    },
    Load {
        #[serde(default)]
        silent: Silent,
        source: String,
        /// Destination graph; the default graph when absent.
        #[serde(default, with = "crate::util::opt_named_node_serde")]
        destination: Option<NamedNode>,
    },
    InsertData {
        quads: Vec<QuadPattern>,
    },
    DeleteData {
        quads: Vec<QuadPattern>,
    },
    /// The template doubles as the match pattern.
    DeleteWhere {
        quads: Vec<QuadPattern>,
    },
    Modify {
        #[serde(default, with = "crate::util::opt_named_node_serde")]
        with: Option<NamedNode>,
        #[serde(default)]
        delete: Vec<QuadPattern>,
        #[serde(default)]
        insert: Vec<QuadPattern>,
        #[serde(default, with = "crate::util::vec_named_node_serde")]
        using: Vec<NamedNode>,
        #[serde(default, with = "crate::util::vec_named_node_serde")]
        using_named: Vec<NamedNode>,
        /// The WHERE clause; absent means a single empty solution.
        #[serde(default)]
        pattern: Option<GraphPattern>,
    },
}

impl Operation {
    /// Short uppercase name, as the operation would be introduced in SPARQL Update.
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Drop { .. } => "DROP",
            Operation::Clear { .. } => "CLEAR",
            Operation::Create { .. } => "CREATE",
            Operation::Load { .. } => "LOAD",
            Operation::InsertData { .. } => "INSERT DATA",
            Operation::DeleteData { .. } => "DELETE DATA",
            Operation::DeleteWhere { .. } => "DELETE WHERE",
            Operation::Modify { .. } => "MODIFY",
        }
    }
}

fn silent_keyword(silent: &Silent) -> &'static str {
    if silent.is_silent() {
        " SILENT"
    } else {
        ""
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Drop { silent, target } | Operation::Clear { silent, target } => {
                write!(f, "{}{}", self.kind(), silent_keyword(silent))?;
                match target {
                    Some(target) => write!(f, " {}", target),
                    None => f.write_str(" <no target>"),
                }
            }
            Operation::Create { silent, graph } => {
                write!(f, "CREATE{}", silent_keyword(silent))?;
                match graph {
                    Some(graph) => write!(f, " GRAPH {}", graph),
                    None => f.write_str(" <no graph>"),
                }
            }
            Operation::Load {
                silent,
                source,
                destination,
            } => {
                write!(f, "LOAD{} <{}>", silent_keyword(silent), source)?;
                if let Some(destination) = destination {
                    write!(f, " INTO GRAPH {}", destination)?;
                }
                Ok(())
            }
            Operation::InsertData { quads }
            | Operation::DeleteData { quads }
            | Operation::DeleteWhere { quads } => {
                write!(f, "{} ({} quads)", self.kind(), quads.len())
            }
            Operation::Modify {
                with,
                delete,
                insert,
                using,
                using_named,
                pattern,
            } => {
                f.write_str("MODIFY")?;
                if let Some(with) = with {
                    write!(f, " WITH {}", with)?;
                }
                write!(f, " DELETE ({} quads) INSERT ({} quads)", delete.len(), insert.len())?;
                if !using.is_empty() || !using_named.is_empty() {
                    write!(f, " USING ({} graphs)", using.len() + using_named.len())?;
                }
                match pattern {
                    Some(pattern) => write!(f, " WHERE {}", pattern),
                    None => Ok(()),
                }
            }
        }
    }
}

/// An ordered list of operations, applied one after the other.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRequest {
    pub operations: Vec<Operation>,
}

impl UpdateRequest {
    pub fn new(operations: Vec<Operation>) -> Self {
        Self { operations }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Cannot open request {}", path.display()))?;
        let request = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Invalid request {}", path.display()))?;
        Ok(request)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

impl From<Vec<Operation>> for UpdateRequest {
    fn from(operations: Vec<Operation>) -> Self {
        Self::new(operations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;

    #[test]
    fn test_parse_request() {
        let json = r#"{"operations": [
            {"type": "drop", "silent": true, "target": {"kind": "named", "graph": "http://example.org/g"}},
            {"type": "clear", "target": {"kind": "all"}},
            {"type": "create", "graph": "http://example.org/g"},
            {"type": "load", "source": "data.ttl"},
            {"type": "insert_data", "quads": [
                {"graph": "DEFAULT", "subject": "<http://example.org/a>",
                 "predicate": "<http://example.org/p>", "object": "\"v\""}
            ]},
            {"type": "modify", "with": "http://example.org/g",
             "delete": [{"graph": "DEFAULT", "subject": "?s", "predicate": "?p", "object": "?o"}],
             "pattern": {"type": "sparql", "text": "?s ?p ?o"}}
        ]}"#;
        let request = UpdateRequest::from_json(json).unwrap();
        assert_eq!(request.len(), 6);
        assert_eq!(
            request.operations[0],
            Operation::Drop {
                silent: Silent::Yes,
                target: Some(GraphTarget::Named {
                    graph: NamedNode::new("http://example.org/g").unwrap()
                }),
            }
        );
        assert_eq!(
            request.operations[1],
            Operation::Clear {
                silent: Silent::No,
                target: Some(GraphTarget::All),
            }
        );
        match &request.operations[3] {
            Operation::Load {
                silent,
                source,
                destination,
            } => {
                assert!(!silent.is_silent());
                assert_eq!(source, "data.ttl");
                assert!(destination.is_none());
            }
            other => panic!("unexpected operation {}", other),
        }
        match &request.operations[4] {
            Operation::InsertData { quads } => {
                assert_eq!(quads.len(), 1);
                assert_eq!(quads[0].graph, Node::DefaultGraph);
            }
            other => panic!("unexpected operation {}", other),
        }
        match &request.operations[5] {
            Operation::Modify {
                with,
                insert,
                using,
                pattern,
                ..
            } => {
                assert_eq!(with.as_ref().unwrap().as_str(), "http://example.org/g");
                assert!(insert.is_empty());
                assert!(using.is_empty());
                assert_eq!(pattern, &Some(GraphPattern::sparql("?s ?p ?o")));
            }
            other => panic!("unexpected operation {}", other),
        }

        let reparsed = UpdateRequest::from_json(&request.to_json().unwrap()).unwrap();
        assert_eq!(reparsed, request);
    }

    #[test]
    fn test_missing_target_parses() {
        let request = UpdateRequest::from_json(r#"{"operations": [{"type": "drop"}]}"#).unwrap();
        assert_eq!(
            request.operations[0],
            Operation::Drop {
                silent: Silent::No,
                target: None
            }
        );
    }

    #[test]
    fn test_rejects_invalid_iri() {
        let json = r#"{"operations": [{"type": "create", "graph": "not an iri"}]}"#;
        assert!(UpdateRequest::from_json(json).is_err());
    }

    #[test]
    fn test_named_target_requires_graph() {
        let json = r#"{"operations": [{"type": "clear", "target": {"kind": "named"}}]}"#;
        assert!(UpdateRequest::from_json(json).is_err());
        let json = r#"{"operations": [{"type": "clear", "target": {"kind": "named", "graph": "nope"}}]}"#;
        assert!(UpdateRequest::from_json(json).is_err());

        let target = GraphTarget::named(NamedNode::new("http://example.org/g").unwrap());
        assert_eq!(
            serde_json::to_value(&target).unwrap(),
            serde_json::json!({"kind": "named", "graph": "http://example.org/g"})
        );
    }

    #[test]
    fn test_display() {
        let op = Operation::Drop {
            silent: Silent::Yes,
            target: Some(GraphTarget::AllNamed),
        };
        assert_eq!(op.to_string(), "DROP SILENT NAMED");
        let op = Operation::Load {
            silent: Silent::No,
            source: "http://example.org/data.ttl".to_string(),
            destination: Some(NamedNode::new("http://example.org/g").unwrap()),
        };
        assert_eq!(
            op.to_string(),
            "LOAD <http://example.org/data.ttl> INTO GRAPH <http://example.org/g>"
        );
    }
}
