// repo

mod country_status_repo;
mod user_repo;

pub use country_status_repo::*;
pub use user_repo::*;
