pub mod catalog;
pub mod db;
pub mod schema;
pub mod scoring;
pub mod settings;
pub mod utils;
