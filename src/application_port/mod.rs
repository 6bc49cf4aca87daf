mod auth_service;
mod country_status_service;

pub use auth_service::*;
pub use country_status_service::*;
