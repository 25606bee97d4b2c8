//! Configuration tree view.
//!
//! A thin, borrowed view over a `serde_json::Value` that knows its own
//! absolute location. Objects are path nodes, arrays are list nodes and
//! scalar children of an object are attributes.

use crate::core::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Owned configuration tree.
#[derive(Clone, Debug)]
pub struct ConfigTree {
    root: Value,
}

impl ConfigTree {
    /// Wrap an already-parsed value.
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    /// Parse a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let root = serde_json::from_str(json)
            .map_err(|e| Error::config_with("Invalid configuration document", e))?;
        Ok(Self { root })
    }

    /// Root node.
    pub fn root(&self) -> ConfigNode<'_> {
        ConfigNode::new("/", &self.root)
    }
}

/// A node in a configuration tree.
#[derive(Clone, Debug)]
pub struct ConfigNode<'a> {
    path: String,
    value: &'a Value,
}

impl<'a> ConfigNode<'a> {
    /// Create a node at `path`.
    pub fn new(path: impl Into<String>, value: &'a Value) -> Self {
        Self {
            path: path.into(),
            value,
        }
    }

    /// Absolute location of this node.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Underlying value.
    pub fn value(&self) -> &'a Value {
        self.value
    }

    /// Named child of a path node.
    pub fn child(&self, name: &str) -> Option<ConfigNode<'a>> {
        let value = self.value.as_object()?.get(name)?;
        let path = format!("{}/{}", self.path.trim_end_matches('/'), name);
        Some(ConfigNode::new(path, value))
    }

    /// Named child, or a configuration error naming this node.
    pub fn require_child(&self, name: &str) -> Result<ConfigNode<'a>> {
        self.child(name).ok_or_else(|| {
            Error::config(format!(
                "Missing required node '{}'. [node={}]",
                name, self.path
            ))
        })
    }

    /// Elements of this node.
    ///
    /// A list yields each of its entries, null yields nothing and any other
    /// node yields itself, so single elements and lists can be walked the
    /// same way.
    pub fn elements(&self) -> Vec<ConfigNode<'a>> {
        match self.value {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, v)| ConfigNode::new(format!("{}[{}]", self.path, i), v))
                .collect(),
            Value::Null => Vec::new(),
            _ => vec![self.clone()],
        }
    }

    /// String attribute. Empty strings count as absent.
    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.value
            .as_object()?
            .get(name)?
            .as_str()
            .filter(|s| !s.is_empty())
    }

    /// String attribute, or a configuration error naming the attribute and
    /// this node's location.
    pub fn require_attribute(&self, name: &str) -> Result<&'a str> {
        self.attribute(name).ok_or_else(|| {
            Error::config(format!(
                "Missing required attribute '{}'. [node={}]",
                name, self.path
            ))
        })
    }

    /// Boolean attribute. Accepts JSON booleans and "true"/"false" strings.
    pub fn bool_attribute(&self, name: &str) -> Result<Option<bool>> {
        let Some(value) = self.value.as_object().and_then(|o| o.get(name)) else {
            return Ok(None);
        };
        match value {
            Value::Null => Ok(None),
            Value::Bool(b) => Ok(Some(*b)),
            Value::String(s) => s.trim().parse().map(Some).map_err(|_| {
                Error::config(format!(
                    "Invalid boolean attribute '{}'. [value={}][node={}]",
                    name, s, self.path
                ))
            }),
            other => Err(Error::config(format!(
                "Invalid boolean attribute '{}'. [value={}][node={}]",
                name, other, self.path
            ))),
        }
    }

    /// List of strings. A single string is a one-element list.
    pub fn string_list(&self, name: &str) -> Result<Option<Vec<String>>> {
        let invalid = || {
            Error::config(format!(
                "Invalid string list '{}'. [node={}]",
                name, self.path
            ))
        };
        let Some(value) = self.value.as_object().and_then(|o| o.get(name)) else {
            return Ok(None);
        };
        match value {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(vec![s.clone()])),
            Value::Array(items) => items
                .iter()
                .map(|v| v.as_str().map(str::to_string).ok_or_else(&invalid))
                .collect::<Result<Vec<_>>>()
                .map(Some),
            _ => Err(invalid()),
        }
    }

    /// Deserialize this node into `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.value.clone()).map_err(|e| {
            Error::config_with(format!("Invalid configuration. [node={}]", self.path), e)
        })
    }
}

/// Types that read their own settings from a configuration node.
pub trait Configurable {
    /// Configure this instance from `node`.
    fn configure(&mut self, node: &ConfigNode<'_>) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorKind;
    use serde::Deserialize;
    use serde_json::json;

    fn tree() -> ConfigTree {
        ConfigTree::new(json!({
            "audit-manager": {
                "logger": [
                    { "type": "store", "name": "a", "default": "true" },
                    { "name": "b", "entities": "Order" }
                ]
            },
            "single": { "type": "store" }
        }))
    }

    #[test]
    fn test_child_paths() {
        let tree = tree();
        let logger = tree
            .root()
            .child("audit-manager")
            .and_then(|n| n.child("logger"))
            .unwrap();
        assert_eq!(logger.path(), "/audit-manager/logger");

        let elements = logger.elements();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[1].path(), "/audit-manager/logger[1]");
    }

    #[test]
    fn test_single_node_elements() {
        let tree = tree();
        let single = tree.root().child("single").unwrap();
        let elements = single.elements();
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].attribute("type"), Some("store"));
    }

    #[test]
    fn test_attributes() {
        let tree = tree();
        let logger = tree.root().child("audit-manager").unwrap().child("logger").unwrap();
        let elements = logger.elements();

        assert_eq!(elements[0].bool_attribute("default").unwrap(), Some(true));
        assert_eq!(elements[1].bool_attribute("default").unwrap(), None);
        assert_eq!(
            elements[1].string_list("entities").unwrap(),
            Some(vec!["Order".to_string()])
        );
        assert_eq!(elements[0].string_list("entities").unwrap(), None);
        assert_eq!(elements[1].attribute("type"), None);
    }

    #[test]
    fn test_malformed_attributes_rejected() {
        let tree = ConfigTree::new(json!({
            "default": "maybe",
            "audited": 1,
            "entities": ["Order", 7]
        }));
        let root = tree.root();

        let err = root.bool_attribute("default").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("'default'"));
        assert!(root.bool_attribute("audited").is_err());
        assert!(root.string_list("entities").is_err());
    }

    #[test]
    fn test_require_attribute_names_location() {
        let tree = tree();
        let logger = tree.root().child("audit-manager").unwrap().child("logger").unwrap();
        let err = logger.elements()[1].require_attribute("type").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Configuration);
        let msg = err.to_string();
        assert!(msg.contains("'type'"));
        assert!(msg.contains("/audit-manager/logger[1]"));
    }

    #[test]
    fn test_deserialize() {
        #[derive(Deserialize)]
        struct Named {
            name: String,
        }

        let tree = tree();
        let elements = tree
            .root()
            .child("audit-manager")
            .unwrap()
            .child("logger")
            .unwrap()
            .elements();
        let named: Named = elements[0].deserialize().unwrap();
        assert_eq!(named.name, "a");

        let single = tree.root().child("single").unwrap();
        assert!(single.deserialize::<Named>().is_err());
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        let err = ConfigTree::from_json("{ not json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
