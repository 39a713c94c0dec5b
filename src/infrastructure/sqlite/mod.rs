pub mod sqlite_driver;
