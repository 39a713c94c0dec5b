//! Lookup of database drivers by identifier.

use crate::domain::errors::{ExportError, Result};
use crate::infrastructure::oracle::oracle_driver::OracleDriver;
use crate::infrastructure::sqlite::sqlite_driver::SqliteDriver;
use crate::ports::database_port::DatabaseDriver;
use std::collections::HashMap;
use std::sync::Arc;

/// Maps driver identifiers (case-insensitive) to driver implementations.
#[derive(Default)]
pub struct DriverRegistry {
    drivers: HashMap<String, Arc<dyn DatabaseDriver>>,
}

impl DriverRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in Oracle and SQLite drivers.
    pub fn with_default_drivers(prefetch_rows: u32) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(OracleDriver::new(prefetch_rows)));
        registry.register(Arc::new(SqliteDriver));
        registry
    }

    /// Adds `driver` under its own name, replacing any previous registration.
    pub fn register(&mut self, driver: Arc<dyn DatabaseDriver>) {
        self.drivers.insert(driver.name().to_lowercase(), driver);
    }

    /// Finds the driver for `name`.
    ///
    /// A missing driver is a connection failure: it surfaces when an attempt
    /// tries to connect and is counted like any other attempt failure.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn DatabaseDriver>> {
        self.drivers
            .get(&name.trim().to_lowercase())
            .cloned()
            .ok_or_else(|| {
                let mut known: Vec<&str> = self.drivers.keys().map(String::as_str).collect();
                known.sort_unstable();
                ExportError::ConnectionError(format!(
                    "no driver registered for '{}' (available: {})",
                    name,
                    known.join(", ")
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_drivers_resolve_case_insensitively() {
        let registry = DriverRegistry::with_default_drivers(1000);
        assert_eq!(registry.resolve("oracle").unwrap().name(), "oracle");
        assert_eq!(registry.resolve(" SQLite ").unwrap().name(), "sqlite");
    }

    #[test]
    fn test_unknown_driver_is_connection_error() {
        let registry = DriverRegistry::with_default_drivers(1000);
        match registry.resolve("mysql") {
            Err(ExportError::ConnectionError(msg)) => {
                assert!(msg.contains("mysql"));
                assert!(msg.contains("oracle, sqlite"));
            }
            Err(e) => panic!("unexpected error {:?}", e),
            Ok(_) => panic!("mysql should not resolve"),
        }
    }
}
