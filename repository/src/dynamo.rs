use crate::config::Billing;
use crate::error::{RepositoryError, Result};
use crate::store::{RecordStore, TableCatalog, TableDefinition, TablePage, TableStatus};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_dynamodb::error::BuildError;
use aws_sdk_dynamodb::operation::create_table::CreateTableError;
use aws_sdk_dynamodb::operation::describe_table::DescribeTableError;
use aws_sdk_dynamodb::types::{
    self, AttributeDefinition, BillingMode, KeySchemaElement, KeyType, ProvisionedThroughput,
    ScalarAttributeType,
};
use aws_sdk_dynamodb::Client;
use model::contact::Item;

pub struct DynamoStore {
    client: Client,
}

impl DynamoStore {
    pub fn new(shared_config: &SdkConfig) -> DynamoStore {
        DynamoStore {
            client: Client::new(shared_config),
        }
    }

    pub fn from_client(client: Client) -> DynamoStore {
        DynamoStore { client }
    }
}

#[async_trait]
impl TableCatalog for DynamoStore {
    async fn list_tables_page(&self, exclusive_start: Option<String>) -> Result<TablePage> {
        let output = self
            .client
            .list_tables()
            .set_exclusive_start_table_name(exclusive_start)
            .send()
            .await
            .map_err(|err| RepositoryError::store("ListTables", err))?;

        Ok(TablePage {
            table_names: output.table_names().to_vec(),
            last_evaluated_table_name: output.last_evaluated_table_name().map(str::to_string),
        })
    }

    async fn create_table(&self, definition: &TableDefinition) -> Result<()> {
        let build_error = |err: BuildError| RepositoryError::store("CreateTable", err);

        let mut request = self.client.create_table().table_name(&definition.name);

        let key_types = [KeyType::Hash, KeyType::Range];
        for (name, key_type) in definition.key_schema.attribute_names().zip(key_types) {
            request = request
                .key_schema(
                    KeySchemaElement::builder()
                        .attribute_name(name)
                        .key_type(key_type)
                        .build()
                        .map_err(build_error)?,
                )
                .attribute_definitions(
                    AttributeDefinition::builder()
                        .attribute_name(name)
                        .attribute_type(ScalarAttributeType::S)
                        .build()
                        .map_err(build_error)?,
                );
        }

        request = match definition.billing {
            Billing::OnDemand => request.billing_mode(BillingMode::PayPerRequest),
            Billing::Provisioned { read, write } => request
                .billing_mode(BillingMode::Provisioned)
                .provisioned_throughput(
                    ProvisionedThroughput::builder()
                        .read_capacity_units(read)
                        .write_capacity_units(write)
                        .build()
                        .map_err(build_error)?,
                ),
        };

        match request.send().await {
            Ok(_) => Ok(()),
            Err(err) => match err.as_service_error() {
                Some(CreateTableError::ResourceInUseException(_)) => {
                    Err(RepositoryError::TableInUse {
                        table: definition.name.clone(),
                    })
                }
                _ => Err(RepositoryError::store("CreateTable", err)),
            },
        }
    }

    async fn describe_table_status(&self, name: &str) -> Result<Option<TableStatus>> {
        match self.client.describe_table().table_name(name).send().await {
            Ok(output) => Ok(output
                .table()
                .and_then(|table| table.table_status())
                .map(table_status)),
            Err(err) => match err.as_service_error() {
                Some(DescribeTableError::ResourceNotFoundException(_)) => Ok(None),
                _ => Err(RepositoryError::store("DescribeTable", err)),
            },
        }
    }
}

#[async_trait]
impl RecordStore for DynamoStore {
    async fn put_item(&self, table: &str, item: Item) -> Result<()> {
        self.client
            .put_item()
            .table_name(table)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|err| RepositoryError::store("PutItem", err))?;
        Ok(())
    }

    async fn get_item(&self, table: &str, key: Item) -> Result<Option<Item>> {
        let output = self
            .client
            .get_item()
            .table_name(table)
            .set_key(Some(key))
            .consistent_read(true)
            .send()
            .await
            .map_err(|err| RepositoryError::store("GetItem", err))?;

        Ok(output.item().cloned())
    }
}

fn table_status(status: &types::TableStatus) -> TableStatus {
    match status {
        types::TableStatus::Active => TableStatus::Active,
        types::TableStatus::Creating => TableStatus::Creating,
        types::TableStatus::Updating => TableStatus::Updating,
        types::TableStatus::Deleting => TableStatus::Deleting,
        other => TableStatus::Other(other.as_str().to_string()),
    }
}
