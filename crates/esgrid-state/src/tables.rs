//! redb table definitions for the esgrid state store.

use redb::TableDefinition;

/// Every node of the hierarchy, keyed by its absolute path
/// (`/elasticsearch/state/frameworkId`). Intermediate nodes hold an empty
/// value.
pub const ZNODES: TableDefinition<&str, &[u8]> = TableDefinition::new("znodes");
