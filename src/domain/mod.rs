pub mod errors;
pub mod export_models;
