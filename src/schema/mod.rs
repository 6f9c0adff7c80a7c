pub mod assembler;
pub mod schema_model;
pub mod store;
