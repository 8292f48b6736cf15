use aws_sdk_dynamodb::error::DisplayErrorContext;
use model::contact::ModelError;
use std::error::Error as StdError;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RepositoryError>;

pub type BoxError = Box<dyn StdError + Send + Sync>;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("{operation} failed: {}", DisplayErrorContext(.source.as_ref()))]
    StoreUnavailable {
        operation: &'static str,
        #[source]
        source: BoxError,
    },

    /// CreateTable lost to a table of the same name, possibly still CREATING.
    #[error("table `{table}` is already in use")]
    TableInUse { table: String },

    #[error("contact `{id}` not found")]
    NotFound { id: String },

    #[error("malformed contact item: {0}")]
    MalformedItem(#[from] ModelError),

    #[error("table `{table}` did not become active within {waited:?}")]
    TableActivationTimeout { table: String, waited: Duration },
}

impl RepositoryError {
    pub fn store<E>(operation: &'static str, err: E) -> RepositoryError
    where
        E: StdError + Send + Sync + 'static,
    {
        RepositoryError::StoreUnavailable {
            operation,
            source: Box::new(err),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound { .. })
    }
}
