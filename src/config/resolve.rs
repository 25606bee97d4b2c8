//! Type resolution.
//!
//! Turns a configuration node into a live, configured instance. A node either
//! references a shared, registry-owned instance by name or names a concrete
//! type to construct.

use crate::config::node::{ConfigNode, Configurable};
use crate::config::registry::FactoryMap;
use crate::core::{Error, Result};
use std::sync::Arc;
use tracing::debug;

/// Attribute naming the concrete type to construct.
pub const TYPE_ATTR: &str = "type";

/// Attribute naming a shared instance to reuse.
pub const REFERENCE_ATTR: &str = "reference";

/// Construct and configure the type named by `node`'s type attribute.
///
/// The returned instance belongs to the caller; nothing is registered.
pub fn instantiate<T>(node: &ConfigNode<'_>, factories: &FactoryMap<T>) -> Result<Box<T>>
where
    T: ?Sized + Configurable,
{
    let kind = factories.kind();
    let type_id = node.attribute(TYPE_ATTR).ok_or_else(|| {
        Error::config(format!(
            "Invalid {} configuration: missing '{}' attribute. [node={}]",
            kind,
            TYPE_ATTR,
            node.path()
        ))
    })?;

    let mut instance = factories.create(type_id).ok_or_else(|| {
        Error::config(format!(
            "Unknown {} type '{}'. [node={}][known={}]",
            kind,
            type_id,
            node.path(),
            factories.identifiers().join(",")
        ))
    })?;

    instance.configure(node).map_err(|e| {
        Error::config_with(
            format!(
                "Failed to configure {} of type '{}'. [node={}]",
                kind,
                type_id,
                node.path()
            ),
            e,
        )
    })?;

    debug!(kind, type_id, node = node.path(), "Instantiated configured type");
    Ok(instance)
}

/// Resolve `node` to a shared reference or a freshly built instance.
///
/// A reference attribute wins over a type attribute. An unknown reference is
/// a configuration error, never a silent fallback to construction.
pub fn resolve_shared<T, F>(
    node: &ConfigNode<'_>,
    lookup: F,
    factories: &FactoryMap<T>,
) -> Result<Arc<T>>
where
    T: ?Sized + Configurable,
    F: FnOnce(&str) -> Option<Arc<T>>,
{
    if let Some(reference) = node.attribute(REFERENCE_ATTR) {
        return lookup(reference).ok_or_else(|| {
            Error::config(format!(
                "Invalid {} reference. [reference={}][node={}]",
                factories.kind(),
                reference,
                node.path()
            ))
        });
    }
    instantiate(node, factories).map(Arc::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::node::ConfigTree;
    use crate::core::ErrorKind;
    use serde_json::json;
    use std::error::Error as _;

    trait Widget: Configurable + Send + Sync {
        fn label(&self) -> &str;
    }

    #[derive(Default)]
    struct Gear {
        label: String,
    }

    impl Configurable for Gear {
        fn configure(&mut self, node: &ConfigNode<'_>) -> Result<()> {
            self.label = node.require_attribute("label")?.to_string();
            Ok(())
        }
    }

    impl Widget for Gear {
        fn label(&self) -> &str {
            &self.label
        }
    }

    fn factories() -> FactoryMap<dyn Widget> {
        let mut map: FactoryMap<dyn Widget> = FactoryMap::new("widget");
        map.register("gear", || Box::new(Gear::default()));
        map
    }

    #[test]
    fn test_instantiate() {
        let tree = ConfigTree::new(json!({ "type": "gear", "label": "g1" }));
        let widget = instantiate(&tree.root(), &factories()).unwrap();
        assert_eq!(widget.label(), "g1");
    }

    #[test]
    fn test_missing_type_attribute() {
        let tree = ConfigTree::new(json!({ "label": "g1" }));
        let err = instantiate(&tree.root(), &factories()).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("missing 'type'"));
    }

    #[test]
    fn test_unknown_type_lists_known() {
        let tree = ConfigTree::new(json!({ "type": "sprocket" }));
        let err = instantiate(&tree.root(), &factories()).err().unwrap();
        let msg = err.to_string();
        assert!(msg.contains("sprocket"));
        assert!(msg.contains("known=gear"));
    }

    #[test]
    fn test_configure_failure_is_wrapped() {
        let tree = ConfigTree::new(json!({ "type": "gear" }));
        let err = instantiate(&tree.root(), &factories()).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("Failed to configure"));
        assert!(err.source().unwrap().to_string().contains("'label'"));
    }

    #[test]
    fn test_reference_wins() {
        let shared: Arc<dyn Widget> = Arc::new(Gear {
            label: "shared".to_string(),
        });
        let tree = ConfigTree::new(json!({ "reference": "main", "type": "gear" }));

        let resolved = resolve_shared(
            &tree.root(),
            |name| (name == "main").then(|| shared.clone()),
            &factories(),
        )
        .unwrap();
        assert!(Arc::ptr_eq(&resolved, &shared));
    }

    #[test]
    fn test_unknown_reference() {
        let tree = ConfigTree::new(json!({ "reference": "missing" }));
        let err = resolve_shared(&tree.root(), |_| None, &factories()).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("reference=missing"));
    }

    #[test]
    fn test_resolve_without_reference_builds_new() {
        let tree = ConfigTree::new(json!({ "type": "gear", "label": "fresh" }));
        let resolved = resolve_shared(&tree.root(), |_| None, &factories()).unwrap();
        assert_eq!(resolved.label(), "fresh");
        assert_eq!(Arc::strong_count(&resolved), 1);
    }
}
