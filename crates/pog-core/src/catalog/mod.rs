pub mod database;
pub mod dataset;
pub mod schema;
