use crate::config::RegistrarConfig;
use crate::error::{RepositoryError, Result};
use crate::store::RecordStore;
use model::contact::{Contact, ContactRequest, Status};

pub struct ContactRepository<'a, S: ?Sized> {
    store: &'a S,
    table_name: &'a str,
    status: Status,
}

impl<'a, S> ContactRepository<'a, S>
where
    S: RecordStore + ?Sized,
{
    pub fn new(store: &'a S, config: &'a RegistrarConfig) -> ContactRepository<'a, S> {
        ContactRepository {
            store,
            table_name: &config.table_name,
            status: config.status,
        }
    }

    /// Writes a new contact under a fresh id. Repeated calls with the same
    /// names create separate rows.
    pub async fn insert(&self, request: ContactRequest) -> Result<Contact> {
        let contact = Contact::new(request, self.status);

        self.store
            .put_item(self.table_name, contact.to_dynamo_item())
            .await?;

        tracing::info!(table = self.table_name, id = %contact.id, status = %contact.status, "inserted contact");
        Ok(contact)
    }

    pub async fn retrieve(&self, id: &str, status: Status) -> Result<Contact> {
        let item = self
            .store
            .get_item(self.table_name, Contact::key(id, status))
            .await?
            .ok_or_else(|| RepositoryError::NotFound { id: id.to_string() })?;

        Ok(Contact::from_dynamo_item(&item)?)
    }
}
