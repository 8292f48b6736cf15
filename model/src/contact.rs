use aws_sdk_dynamodb::types::AttributeValue;
use maplit::hashmap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

pub const ID: &str = "id";
pub const STATUS: &str = "status";
pub const FIRST_NAME: &str = "firstName";
pub const LAST_NAME: &str = "lastName";

pub type Item = HashMap<String, AttributeValue>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("`{0}` attribute is missing in the contact entry")]
    MissingAttribute(&'static str),

    #[error("`{0}` attribute is not an S field")]
    NotAString(&'static str),

    #[error("unknown contact status `{0}`, expected `active` or `created`")]
    UnknownStatus(String),
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Active,
    Created,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Active => "active",
            Status::Created => "created",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Status, ModelError> {
        match s {
            "active" => Ok(Status::Active),
            "created" => Ok(Status::Created),
            other => Err(ModelError::UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContactRequest {
    pub first_name: String,
    pub last_name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: String,
    pub status: Status,
    pub first_name: String,
    pub last_name: String,
}

impl Contact {
    /// Builds a new contact with a freshly generated v4 identifier.
    pub fn new(request: ContactRequest, status: Status) -> Contact {
        Contact {
            id: Uuid::new_v4().to_string(),
            status,
            first_name: request.first_name,
            last_name: request.last_name,
        }
    }

    /// Primary key of the contact table: `id` (HASH) and `status` (RANGE).
    pub fn key(id: &str, status: Status) -> Item {
        hashmap! {
            ID.to_string() => AttributeValue::S(id.to_string()),
            STATUS.to_string() => AttributeValue::S(status.to_string()),
        }
    }

    pub fn to_dynamo_item(&self) -> Item {
        hashmap! {
            ID.to_string() => AttributeValue::S(self.id.clone()),
            STATUS.to_string() => AttributeValue::S(self.status.to_string()),
            FIRST_NAME.to_string() => AttributeValue::S(self.first_name.clone()),
            LAST_NAME.to_string() => AttributeValue::S(self.last_name.clone()),
        }
    }

    pub fn from_dynamo_item(item: &Item) -> Result<Contact, ModelError> {
        Ok(Contact {
            id: string_attribute(item, ID)?,
            status: string_attribute(item, STATUS)?.parse()?,
            first_name: string_attribute(item, FIRST_NAME)?,
            last_name: string_attribute(item, LAST_NAME)?,
        })
    }
}

fn string_attribute(item: &Item, name: &'static str) -> Result<String, ModelError> {
    item.get(name)
        .ok_or(ModelError::MissingAttribute(name))?
        .as_s()
        .map(|value| value.to_owned())
        .map_err(|_| ModelError::NotAString(name))
}
