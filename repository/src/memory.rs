//! In-process store with DynamoDB-like table semantics, used by tests and
//! local runs of the lambdas.

use crate::error::{RepositoryError, Result};
use crate::store::{KeySchema, RecordStore, TableCatalog, TableDefinition, TablePage, TableStatus};
use async_trait::async_trait;
use model::contact::Item;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Number of calls the store has served, per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub list_tables: usize,
    pub create_table: usize,
    pub describe_table: usize,
    pub put_item: usize,
    pub get_item: usize,
}

struct MemoryTable {
    key_schema: KeySchema,
    /// Describe calls left before a new table reports ACTIVE.
    pending_polls: u32,
    items: HashMap<Vec<String>, Item>,
}

impl MemoryTable {
    fn status(&self) -> TableStatus {
        if self.pending_polls == 0 {
            TableStatus::Active
        } else {
            TableStatus::Creating
        }
    }

    fn key_of(&self, item: &Item, operation: &'static str) -> Result<Vec<String>> {
        self.key_schema
            .attribute_names()
            .map(|name| {
                item.get(name)
                    .and_then(|value| value.as_s().ok())
                    .cloned()
                    .ok_or_else(|| RepositoryError::StoreUnavailable {
                        operation,
                        source: format!("missing key attribute `{}`", name).into(),
                    })
            })
            .collect()
    }
}

#[derive(Default)]
struct Inner {
    tables: BTreeMap<String, MemoryTable>,
    calls: CallCounts,
}

pub struct MemoryStore {
    inner: Mutex<Inner>,
    page_size: usize,
    activation_polls: u32,
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new()
    }
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore {
            inner: Mutex::new(Inner::default()),
            page_size: 100,
            activation_polls: 0,
        }
    }

    /// Maximum number of names returned by one ListTables page.
    pub fn with_page_size(mut self, page_size: usize) -> MemoryStore {
        self.page_size = page_size.max(1);
        self
    }

    /// Tables created afterwards stay CREATING for this many describe calls.
    pub fn with_activation_polls(mut self, polls: u32) -> MemoryStore {
        self.activation_polls = polls;
        self
    }

    pub fn with_active_table(self, name: &str, key_schema: KeySchema) -> MemoryStore {
        self.with_table(name, key_schema, 0)
    }

    /// Adds a table that is still CREATING, as if another caller had just
    /// issued CreateTable for it.
    pub fn with_creating_table(self, name: &str, key_schema: KeySchema, polls: u32) -> MemoryStore {
        self.with_table(name, key_schema, polls)
    }

    fn with_table(self, name: &str, key_schema: KeySchema, pending_polls: u32) -> MemoryStore {
        self.lock().tables.insert(
            name.to_string(),
            MemoryTable {
                key_schema,
                pending_polls,
                items: HashMap::new(),
            },
        );
        self
    }

    pub fn calls(&self) -> CallCounts {
        self.lock().calls
    }

    pub fn table_names(&self) -> Vec<String> {
        self.lock().tables.keys().cloned().collect()
    }

    pub fn items(&self, table: &str) -> Vec<Item> {
        self.lock()
            .tables
            .get(table)
            .map(|table| table.items.values().cloned().collect())
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn active_table<'a>(
    inner: &'a mut Inner,
    name: &str,
    operation: &'static str,
) -> Result<&'a mut MemoryTable> {
    match inner.tables.get_mut(name) {
        Some(table) if table.status() == TableStatus::Active => Ok(table),
        _ => Err(RepositoryError::StoreUnavailable {
            operation,
            source: format!("ResourceNotFoundException: requested resource not found: {}", name)
                .into(),
        }),
    }
}

#[async_trait]
impl TableCatalog for MemoryStore {
    async fn list_tables_page(&self, exclusive_start: Option<String>) -> Result<TablePage> {
        let mut inner = self.lock();
        inner.calls.list_tables += 1;

        let remaining: Vec<&String> = inner
            .tables
            .keys()
            .filter(|name| exclusive_start.as_ref().map_or(true, |start| *name > start))
            .collect();

        let table_names: Vec<String> = remaining
            .iter()
            .take(self.page_size)
            .map(|name| name.to_string())
            .collect();

        let last_evaluated_table_name = if remaining.len() > self.page_size {
            table_names.last().cloned()
        } else {
            None
        };

        Ok(TablePage {
            table_names,
            last_evaluated_table_name,
        })
    }

    async fn create_table(&self, definition: &TableDefinition) -> Result<()> {
        let mut inner = self.lock();
        inner.calls.create_table += 1;

        if inner.tables.contains_key(&definition.name) {
            return Err(RepositoryError::TableInUse {
                table: definition.name.clone(),
            });
        }

        inner.tables.insert(
            definition.name.clone(),
            MemoryTable {
                key_schema: definition.key_schema.clone(),
                pending_polls: self.activation_polls,
                items: HashMap::new(),
            },
        );
        Ok(())
    }

    async fn describe_table_status(&self, name: &str) -> Result<Option<TableStatus>> {
        let mut inner = self.lock();
        inner.calls.describe_table += 1;

        Ok(inner.tables.get_mut(name).map(|table| {
            let status = table.status();
            table.pending_polls = table.pending_polls.saturating_sub(1);
            status
        }))
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn put_item(&self, table: &str, item: Item) -> Result<()> {
        let mut inner = self.lock();
        inner.calls.put_item += 1;

        let table = active_table(&mut inner, table, "PutItem")?;
        let key = table.key_of(&item, "PutItem")?;
        table.items.insert(key, item);
        Ok(())
    }

    async fn get_item(&self, table: &str, key: Item) -> Result<Option<Item>> {
        let mut inner = self.lock();
        inner.calls.get_item += 1;

        let table = active_table(&mut inner, table, "GetItem")?;
        let key = table.key_of(&key, "GetItem")?;
        Ok(table.items.get(&key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Billing;
    use aws_sdk_dynamodb::types::AttributeValue;

    fn definition(name: &str) -> TableDefinition {
        TableDefinition {
            name: name.to_string(),
            key_schema: KeySchema::contact(),
            billing: Billing::OnDemand,
        }
    }

    fn item(id: &str, status: &str) -> Item {
        let mut item = Item::new();
        item.insert("id".to_string(), AttributeValue::S(id.to_string()));
        item.insert("status".to_string(), AttributeValue::S(status.to_string()));
        item
    }

    #[tokio::test]
    async fn list_tables_pages_in_name_order() {
        let store = MemoryStore::new()
            .with_page_size(2)
            .with_active_table("c", KeySchema::contact())
            .with_active_table("a", KeySchema::contact())
            .with_active_table("b", KeySchema::contact());

        let first = store.list_tables_page(None).await.unwrap();
        assert_eq!(first.table_names, vec!["a", "b"]);
        assert_eq!(first.last_evaluated_table_name.as_deref(), Some("b"));

        let second = store
            .list_tables_page(first.last_evaluated_table_name)
            .await
            .unwrap();
        assert_eq!(second.table_names, vec!["c"]);
        assert_eq!(second.last_evaluated_table_name, None);
    }

    #[tokio::test]
    async fn new_table_reports_creating_until_polled() {
        let store = MemoryStore::new().with_activation_polls(2);
        store.create_table(&definition("contacts")).await.unwrap();

        assert_eq!(
            store.describe_table_status("contacts").await.unwrap(),
            Some(TableStatus::Creating)
        );
        assert_eq!(
            store.describe_table_status("contacts").await.unwrap(),
            Some(TableStatus::Creating)
        );
        assert_eq!(
            store.describe_table_status("contacts").await.unwrap(),
            Some(TableStatus::Active)
        );
        assert_eq!(store.describe_table_status("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn creating_an_existing_table_fails() {
        let store = MemoryStore::new().with_creating_table("contacts", KeySchema::contact(), 1);

        let err = store.create_table(&definition("contacts")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::TableInUse { table } if table == "contacts"));
        assert_eq!(
            store.describe_table_status("contacts").await.unwrap(),
            Some(TableStatus::Creating)
        );
    }

    #[tokio::test]
    async fn put_overwrites_by_primary_key() {
        let store = MemoryStore::new().with_active_table("contacts", KeySchema::contact());

        let mut first = item("1", "active");
        first.insert("firstName".to_string(), AttributeValue::S("Ada".to_string()));
        store.put_item("contacts", first).await.unwrap();

        let mut second = item("1", "active");
        second.insert("firstName".to_string(), AttributeValue::S("Grace".to_string()));
        store.put_item("contacts", second.clone()).await.unwrap();
        store.put_item("contacts", item("1", "created")).await.unwrap();

        assert_eq!(store.items("contacts").len(), 2);
        assert_eq!(
            store.get_item("contacts", item("1", "active")).await.unwrap(),
            Some(second)
        );
        assert_eq!(store.get_item("contacts", item("2", "active")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn writes_to_a_creating_table_are_rejected() {
        let store = MemoryStore::new().with_activation_polls(1);
        store.create_table(&definition("contacts")).await.unwrap();

        let err = store.put_item("contacts", item("1", "active")).await.unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::StoreUnavailable {
                operation: "PutItem",
                ..
            }
        ));
        assert!(std::error::Error::source(&err)
            .unwrap()
            .to_string()
            .starts_with("ResourceNotFoundException"));
    }

    #[tokio::test]
    async fn item_without_key_attribute_is_rejected() {
        let store = MemoryStore::new().with_active_table("contacts", KeySchema::contact());

        let mut partial = item("1", "active");
        partial.remove("status");

        assert!(store.put_item("contacts", partial).await.is_err());
        assert_eq!(store.calls().put_item, 1);
    }
}
