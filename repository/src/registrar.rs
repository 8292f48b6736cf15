use crate::config::RegistrarConfig;
use crate::contact::ContactRepository;
use crate::error::RepositoryError;
use crate::store::{RecordStore, TableCatalog};
use crate::table::TableProvisioner;
use model::contact::{Contact, ContactRequest};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Provision,
    Insert,
    Retrieve,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Step::Provision => write!(f, "provision"),
            Step::Insert => write!(f, "insert"),
            Step::Retrieve => write!(f, "retrieve"),
        }
    }
}

/// A repository failure tagged with the step that produced it.
#[derive(Error, Debug)]
#[error("{step} step failed: {source}")]
pub struct RegistrarError {
    pub step: Step,
    #[source]
    pub source: RepositoryError,
}

impl RegistrarError {
    pub fn step(&self) -> Step {
        self.step
    }

    pub fn is_not_found(&self) -> bool {
        self.source.is_not_found()
    }
}

trait AtStep<T> {
    fn at(self, step: Step) -> Result<T, RegistrarError>;
}

impl<T> AtStep<T> for Result<T, RepositoryError> {
    fn at(self, step: Step) -> Result<T, RegistrarError> {
        self.map_err(|source| RegistrarError { step, source })
    }
}

/// Provisions the contact table, writes the contact and optionally reads it
/// back. The first failing step aborts the rest.
pub struct ContactRegistrar<S> {
    store: S,
    config: RegistrarConfig,
}

impl<S> ContactRegistrar<S> {
    pub fn new(store: S, config: RegistrarConfig) -> ContactRegistrar<S> {
        ContactRegistrar { store, config }
    }

    pub fn config(&self) -> &RegistrarConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S> ContactRegistrar<S>
where
    S: TableCatalog + RecordStore,
{
    pub async fn register(&self, request: ContactRequest) -> Result<Contact, RegistrarError> {
        let table = self.config.table_name.as_str();

        TableProvisioner::new(&self.store, &self.config)
            .ensure_table(table)
            .await
            .at(Step::Provision)?;

        let repository = ContactRepository::new(&self.store, &self.config);
        let contact = repository.insert(request).await.at(Step::Insert)?;

        if self.config.verify_after_insert {
            let stored = repository
                .retrieve(&contact.id, contact.status)
                .await
                .at(Step::Retrieve)?;
            if stored != contact {
                tracing::warn!(table, id = %contact.id, ?stored, "stored contact differs from inserted one");
            } else {
                tracing::info!(table, id = %contact.id, "verified contact");
            }
        }

        Ok(contact)
    }
}

impl<S> ContactRegistrar<S>
where
    S: RecordStore,
{
    /// Looks up a contact under the configured status.
    pub async fn lookup(&self, id: &str) -> Result<Contact, RegistrarError> {
        ContactRepository::new(&self.store, &self.config)
            .retrieve(id, self.config.status)
            .await
            .at(Step::Retrieve)
    }
}
