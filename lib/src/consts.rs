//! Constants shared by the term model, the pattern builder and the logging setup.

/// Keyword used in the textual form of the default-graph sentinel.
pub const DEFAULT_GRAPH_KEYWORD: &str = "DEFAULT";

/// Prefix for variables that stand in for template blank nodes in DELETE WHERE.
pub const BNODE_VARIABLE_PREFIX: &str = "_bnode";

/// Environment variable that overrides `RUST_LOG` for this library.
pub const LOG_ENV_VAR: &str = "GRAPHUPDATE_LOG";

/// Suffix of the file next to a dataset that lists its named graphs, empty ones included.
pub const GRAPH_LIST_SUFFIX: &str = ".graphs";

pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Media types negotiated by LOAD, highest priority first.
pub const DEFAULT_ACCEPT: &[&str] = &[
    "text/turtle",
    "application/n-quads",
    "application/trig",
    "application/rdf+xml",
    "application/n-triples",
    "application/ld+json",
    "text/n3",
];
