pub mod config;
pub mod debug;
pub mod error;
pub mod extract;
pub mod models;
pub mod page;
pub mod parser;
pub mod schema;
pub mod store;
pub mod tui;
pub mod utils;

pub use config::StoreOptions;
pub use error::StoreError;
pub use models::{ReconcileReport, Record};
pub use store::RecordStore;
