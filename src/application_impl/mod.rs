mod auth_service_impl;
mod country_status_service_impl;

pub use auth_service_impl::*;
pub use country_status_service_impl::*;
