pub mod database_port;
