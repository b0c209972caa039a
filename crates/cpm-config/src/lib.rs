pub mod config;

pub use config::{Config, DB_FILE_NAME};
