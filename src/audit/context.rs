//! Audit context generators.

use crate::core::Context;

/// Produces extra context attached to records audited on behalf of a data
/// store. Selected per store through the descriptor's
/// `auditContextProvider` type identifier.
pub trait AuditContextGenerator: Send + Sync {
    /// Context for a mutation of `entity_type` in `store`, if any.
    fn generate(
        &self,
        store: &str,
        entity_type: &str,
        ctx: Option<&Context>,
    ) -> Option<serde_json::Value>;
}
