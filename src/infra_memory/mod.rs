mod country_status_repo_memory;
mod user_repo_memory;

pub use country_status_repo_memory::*;
pub use user_repo_memory::*;
