//! Serde helpers for oxigraph types that appear in operation objects.

/// (De)serializes a `NamedNode` as its bare IRI string.
pub mod named_node_serde {
    use oxigraph::model::NamedNode;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(node: &NamedNode, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(node.as_str())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NamedNode, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NamedNode::new(s).map_err(serde::de::Error::custom)
    }
}

/// Same as [`named_node_serde`] for optional fields; `null` or a missing field is `None`.
pub mod opt_named_node_serde {
    use oxigraph::model::NamedNode;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(node: &Option<NamedNode>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match node {
            Some(node) => serializer.serialize_some(node.as_str()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NamedNode>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: Option<String> = Option::deserialize(deserializer)?;
        s.map(|s| NamedNode::new(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

/// Same as [`named_node_serde`] for lists of IRIs.
pub mod vec_named_node_serde {
    use oxigraph::model::NamedNode;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(nodes: &[NamedNode], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let iris: Vec<&str> = nodes.iter().map(|n| n.as_str()).collect();
        iris.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<NamedNode>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let iris: Vec<String> = Vec::deserialize(deserializer)?;
        iris.into_iter()
            .map(|s| NamedNode::new(s).map_err(serde::de::Error::custom))
            .collect()
    }
}
