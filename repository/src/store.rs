//! Boundary between the registrar and the key-value store.

use crate::config::Billing;
use crate::error::Result;
use async_trait::async_trait;
use model::contact::{self, Item};

/// One page of a ListTables call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TablePage {
    pub table_names: Vec<String>,
    /// Continuation token, `None` on the last page.
    pub last_evaluated_table_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableStatus {
    Creating,
    Active,
    Updating,
    Deleting,
    Other(String),
}

/// String-typed key attributes of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySchema {
    pub hash_key: String,
    pub range_key: Option<String>,
}

impl KeySchema {
    /// `id` as partition key, `status` as sort key.
    pub fn contact() -> KeySchema {
        KeySchema {
            hash_key: contact::ID.to_string(),
            range_key: Some(contact::STATUS.to_string()),
        }
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.hash_key.as_str()).chain(self.range_key.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefinition {
    pub name: String,
    pub key_schema: KeySchema,
    pub billing: Billing,
}

#[async_trait]
pub trait TableCatalog: Send + Sync {
    async fn list_tables_page(&self, exclusive_start: Option<String>) -> Result<TablePage>;

    async fn create_table(&self, definition: &TableDefinition) -> Result<()>;

    /// Returns `None` when the table does not exist.
    async fn describe_table_status(&self, name: &str) -> Result<Option<TableStatus>>;
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Unconditional overwrite of the item with the same primary key.
    async fn put_item(&self, table: &str, item: Item) -> Result<()>;

    async fn get_item(&self, table: &str, key: Item) -> Result<Option<Item>>;
}
