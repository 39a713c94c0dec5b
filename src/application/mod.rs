pub mod export_runner;
pub mod row_serializer;
