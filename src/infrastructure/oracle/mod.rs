pub mod oracle_driver;
