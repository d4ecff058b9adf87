pub mod models;
pub mod routes;
pub mod store;

pub use models::{EmailAddress, NameField, PersonName, PersonRecord, ValidationError};
pub use routes::router;
pub use store::{ConnectionSource, PersonStore, StoreError};
