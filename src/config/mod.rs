//! Configuration tree, type registry and dynamic wiring.

pub mod node;
pub mod registry;
pub mod resolve;

pub use node::{ConfigNode, ConfigTree, Configurable};
pub use registry::{EntityTypeInfo, Factory, FactoryMap, TypeRegistry};
pub use resolve::{instantiate, resolve_shared, REFERENCE_ATTR, TYPE_ATTR};
