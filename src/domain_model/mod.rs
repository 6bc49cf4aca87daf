mod country_status;
mod user;

pub use country_status::*;
pub use user::*;
