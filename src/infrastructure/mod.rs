pub mod driver_registry;
pub mod local_storage;
pub mod oracle;
pub mod sqlite;
