//! Entities and principals.

use serde::{Deserialize, Serialize};

/// Stable identity key of an entity.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey(pub String);

impl EntityKey {
    /// Create a new key.
    pub fn new(key: &str) -> Self {
        Self(key.to_string())
    }

    /// Get the key string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for EntityKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// A persistable, auditable type.
pub trait Entity: Serialize + Send + Sync + 'static {
    /// Name used for this type in configuration and storage.
    const TYPE_NAME: &'static str;

    /// Audited marker: logger to use when the entity index has no entry
    /// for this type.
    const AUDIT_LOGGER: Option<&'static str> = None;

    /// Identity key.
    fn key(&self) -> EntityKey;
}

/// The actor performing an operation. Opaque apart from its name.
pub trait Principal: Send + Sync {
    /// Principal name.
    fn name(&self) -> &str;
}

/// Plain named principal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User name
    pub name: String,
}

impl User {
    /// Create a user principal.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

impl Principal for User {
    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Plain;

    impl Entity for Plain {
        const TYPE_NAME: &'static str = "Plain";

        fn key(&self) -> EntityKey {
            EntityKey::new("plain")
        }
    }

    #[test]
    fn test_entity_key() {
        let key = EntityKey::new("k-1");
        assert_eq!(key.as_str(), "k-1");
        assert_eq!(key.to_string(), "k-1");
        assert_eq!(EntityKey::from("k-1".to_string()), key);
    }

    #[test]
    fn test_marker_defaults_to_none() {
        assert_eq!(Plain::AUDIT_LOGGER, None);
        assert_eq!(Plain.key().as_str(), "plain");
    }

    #[test]
    fn test_user_principal() {
        let user = User::new("alice");
        let principal: &dyn Principal = &user;
        assert_eq!(principal.name(), "alice");
    }
}
