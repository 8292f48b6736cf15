use crate::config::RegistrarConfig;
use crate::error::{RepositoryError, Result};
use crate::store::{KeySchema, TableCatalog, TableDefinition, TableStatus};
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::{sleep, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioned {
    AlreadyExists,
    Created,
}

/// Makes sure the contact table exists before anything is written to it.
pub struct TableProvisioner<'a, C: ?Sized> {
    catalog: &'a C,
    config: &'a RegistrarConfig,
}

impl<'a, C> TableProvisioner<'a, C>
where
    C: TableCatalog + ?Sized,
{
    pub fn new(catalog: &'a C, config: &'a RegistrarConfig) -> TableProvisioner<'a, C> {
        TableProvisioner { catalog, config }
    }

    /// Creates the table when listing does not find it. Whether found, created
    /// or lost to a concurrent CreateTable, the table is then awaited until
    /// ACTIVE unless the activation timeout is disabled.
    pub async fn ensure_table(&self, name: &str) -> Result<Provisioned> {
        let provisioned = if self.table_exists(name).await? {
            tracing::debug!(table = name, "table already exists");
            Provisioned::AlreadyExists
        } else {
            self.create_table(name).await?
        };

        match self.config.activation_timeout {
            Some(timeout) => self.wait_until_active(name, timeout).await?,
            None => tracing::warn!(
                table = name,
                "not waiting for table to become active, writes may fail until it is"
            ),
        }

        Ok(provisioned)
    }

    async fn create_table(&self, name: &str) -> Result<Provisioned> {
        let definition = TableDefinition {
            name: name.to_string(),
            key_schema: KeySchema::contact(),
            billing: self.config.billing,
        };

        match self.catalog.create_table(&definition).await {
            Ok(()) => {
                tracing::info!(table = name, billing = ?definition.billing, "created table");
                Ok(Provisioned::Created)
            }
            Err(RepositoryError::TableInUse { .. }) => {
                tracing::info!(table = name, "table was created concurrently");
                Ok(Provisioned::AlreadyExists)
            }
            Err(err) => Err(err),
        }
    }

    /// Walks ListTables pages until `name` shows up or the listing ends.
    /// A continuation token that was already followed ends the listing.
    pub async fn table_exists(&self, name: &str) -> Result<bool> {
        let mut seen_tokens = HashSet::new();
        let mut exclusive_start = None;
        let mut pages = 0;

        loop {
            let page = self.catalog.list_tables_page(exclusive_start.take()).await?;
            pages += 1;

            if page.table_names.iter().any(|table| table == name) {
                return Ok(true);
            }

            match page.last_evaluated_table_name {
                Some(token) if seen_tokens.insert(token.clone()) => exclusive_start = Some(token),
                Some(token) => {
                    tracing::warn!(token = %token, pages, "duplicate ListTables token, stopping");
                    return Ok(false);
                }
                None => {
                    tracing::debug!(pages, "listed all tables");
                    return Ok(false);
                }
            }
        }
    }

    async fn wait_until_active(&self, name: &str, timeout: Duration) -> Result<()> {
        let started = Instant::now();
        let deadline = started + timeout;

        loop {
            let status = self.catalog.describe_table_status(name).await?;
            if status == Some(TableStatus::Active) {
                tracing::info!(table = name, waited = ?started.elapsed(), "table is active");
                return Ok(());
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(RepositoryError::TableActivationTimeout {
                    table: name.to_string(),
                    waited: now - started,
                });
            }

            tracing::debug!(table = name, status = ?status, "waiting for table");
            sleep(self.config.poll_interval.min(deadline - now)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::store::TablePage;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn config() -> RegistrarConfig {
        RegistrarConfig {
            poll_interval: Duration::from_millis(1),
            ..RegistrarConfig::new("contactsFredy")
        }
    }

    /// Serves a fixed sequence of pages, the last one repeating forever.
    struct ScriptedCatalog {
        pages: Vec<TablePage>,
        served: Mutex<usize>,
        created: Mutex<Vec<String>>,
    }

    impl ScriptedCatalog {
        fn new(pages: Vec<TablePage>) -> ScriptedCatalog {
            ScriptedCatalog {
                pages,
                served: Mutex::new(0),
                created: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TableCatalog for ScriptedCatalog {
        async fn list_tables_page(&self, _: Option<String>) -> Result<TablePage> {
            let mut served = self.served.lock().unwrap();
            let page = self.pages[(*served).min(self.pages.len() - 1)].clone();
            *served += 1;
            Ok(page)
        }

        async fn create_table(&self, definition: &TableDefinition) -> Result<()> {
            self.created.lock().unwrap().push(definition.name.clone());
            Ok(())
        }

        async fn describe_table_status(&self, _: &str) -> Result<Option<TableStatus>> {
            Ok(Some(TableStatus::Active))
        }
    }

    fn page(names: &[&str], token: Option<&str>) -> TablePage {
        TablePage {
            table_names: names.iter().map(|name| name.to_string()).collect(),
            last_evaluated_table_name: token.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn creates_missing_table_once() {
        let store = MemoryStore::new();
        let config = config();
        let provisioner = TableProvisioner::new(&store, &config);

        assert_eq!(
            provisioner.ensure_table("contactsFredy").await.unwrap(),
            Provisioned::Created
        );
        assert_eq!(
            provisioner.ensure_table("contactsFredy").await.unwrap(),
            Provisioned::AlreadyExists
        );

        assert_eq!(store.table_names(), vec!["contactsFredy"]);
        assert_eq!(store.calls().create_table, 1);
    }

    #[tokio::test]
    async fn finds_table_on_a_later_page() {
        let store = MemoryStore::new()
            .with_page_size(1)
            .with_active_table("alpha", KeySchema::contact())
            .with_active_table("beta", KeySchema::contact())
            .with_active_table("contactsFredy", KeySchema::contact());
        let config = config();

        let provisioned = TableProvisioner::new(&store, &config)
            .ensure_table("contactsFredy")
            .await
            .unwrap();

        assert_eq!(provisioned, Provisioned::AlreadyExists);
        assert_eq!(store.calls().list_tables, 3);
        assert_eq!(store.calls().create_table, 0);
    }

    #[tokio::test]
    async fn repeated_continuation_token_ends_listing() {
        let catalog = ScriptedCatalog::new(vec![
            page(&["alpha"], Some("alpha")),
            page(&["beta"], Some("beta")),
            page(&["gamma"], Some("alpha")),
        ]);
        let config = config();

        let provisioned = TableProvisioner::new(&catalog, &config)
            .ensure_table("contactsFredy")
            .await
            .unwrap();

        assert_eq!(provisioned, Provisioned::Created);
        assert_eq!(*catalog.served.lock().unwrap(), 3);
        assert_eq!(*catalog.created.lock().unwrap(), vec!["contactsFredy"]);
    }

    #[tokio::test]
    async fn self_repeating_token_terminates() {
        let catalog = ScriptedCatalog::new(vec![page(&["alpha"], Some("alpha"))]);
        let config = config();

        let exists = TableProvisioner::new(&catalog, &config)
            .table_exists("contactsFredy")
            .await
            .unwrap();

        assert!(!exists);
        assert_eq!(*catalog.served.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn waits_until_new_table_is_active() {
        let store = MemoryStore::new().with_activation_polls(3);
        let config = config();

        TableProvisioner::new(&store, &config)
            .ensure_table("contactsFredy")
            .await
            .unwrap();

        assert_eq!(store.calls().describe_table, 4);
    }

    #[tokio::test]
    async fn existing_creating_table_is_awaited() {
        let store = MemoryStore::new().with_creating_table("contactsFredy", KeySchema::contact(), 2);
        let config = config();

        let provisioned = TableProvisioner::new(&store, &config)
            .ensure_table("contactsFredy")
            .await
            .unwrap();

        assert_eq!(provisioned, Provisioned::AlreadyExists);
        assert_eq!(store.calls().create_table, 0);
        assert_eq!(store.calls().describe_table, 3);
    }

    /// Lists nothing, then loses the CreateTable race to another caller.
    struct RacingCatalog {
        describes: Mutex<u32>,
    }

    #[async_trait]
    impl TableCatalog for RacingCatalog {
        async fn list_tables_page(&self, _: Option<String>) -> Result<TablePage> {
            Ok(page(&[], None))
        }

        async fn create_table(&self, definition: &TableDefinition) -> Result<()> {
            Err(RepositoryError::TableInUse {
                table: definition.name.clone(),
            })
        }

        async fn describe_table_status(&self, _: &str) -> Result<Option<TableStatus>> {
            let mut describes = self.describes.lock().unwrap();
            *describes += 1;
            Ok(Some(if *describes < 3 {
                TableStatus::Creating
            } else {
                TableStatus::Active
            }))
        }
    }

    #[tokio::test]
    async fn table_in_use_waits_for_the_other_creator() {
        let catalog = RacingCatalog {
            describes: Mutex::new(0),
        };
        let config = config();

        let provisioned = TableProvisioner::new(&catalog, &config)
            .ensure_table("contactsFredy")
            .await
            .unwrap();

        assert_eq!(provisioned, Provisioned::AlreadyExists);
        assert_eq!(*catalog.describes.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_activation_timeout() {
        let store = MemoryStore::new().with_activation_polls(u32::MAX);
        let config = RegistrarConfig {
            activation_timeout: Some(Duration::from_millis(20)),
            poll_interval: Duration::from_millis(5),
            ..RegistrarConfig::new("contactsFredy")
        };

        let err = TableProvisioner::new(&store, &config)
            .ensure_table("contactsFredy")
            .await
            .unwrap_err();

        match err {
            RepositoryError::TableActivationTimeout { table, waited } => {
                assert_eq!(table, "contactsFredy");
                assert!(waited >= Duration::from_millis(20));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn fire_and_forget_skips_describe() {
        let store = MemoryStore::new().with_activation_polls(1);
        let config = RegistrarConfig {
            activation_timeout: None,
            ..config()
        };

        let provisioned = TableProvisioner::new(&store, &config)
            .ensure_table("contactsFredy")
            .await
            .unwrap();

        assert_eq!(provisioned, Provisioned::Created);
        assert_eq!(store.calls().describe_table, 0);
    }

    #[tokio::test]
    async fn listing_error_aborts_without_creating() {
        struct FailingCatalog;

        #[async_trait]
        impl TableCatalog for FailingCatalog {
            async fn list_tables_page(&self, _: Option<String>) -> Result<TablePage> {
                Err(RepositoryError::StoreUnavailable {
                    operation: "ListTables",
                    source: "AccessDeniedException".into(),
                })
            }

            async fn create_table(&self, _: &TableDefinition) -> Result<()> {
                panic!("create_table must not be called");
            }

            async fn describe_table_status(&self, _: &str) -> Result<Option<TableStatus>> {
                panic!("describe_table_status must not be called");
            }
        }

        let config = config();
        let err = TableProvisioner::new(&FailingCatalog, &config)
            .ensure_table("contactsFredy")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RepositoryError::StoreUnavailable {
                operation: "ListTables",
                ..
            }
        ));
    }
}
