pub mod connection;
pub mod models;
pub mod schema;
pub mod store;

pub use connection::{Credentials, DatabaseConfig};
pub use store::PgMeasurementStore;
