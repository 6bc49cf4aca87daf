mod country_status_repo_mysql;
mod user_repo_mysql;

pub use country_status_repo_mysql::*;
pub use user_repo_mysql::*;

mod util;
