pub mod calculations;
pub mod db;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod service;
pub mod store;

pub use calculations::{FeeCalculator, filing_deadline, is_late};
pub use db::repository::{DeclarationRepository, RepositoryError};
pub use error::DeclarationError;
pub use lifecycle::LifecycleController;
pub use models::*;
pub use service::{DeclarationService, ServiceConfig};
pub use store::{DeclarationStore, DeletePolicy};
