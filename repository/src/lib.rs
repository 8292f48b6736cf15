pub mod config;
pub mod contact;
pub mod dynamo;
pub mod error;
pub mod memory;
pub mod registrar;
pub mod store;
pub mod table;
