//! HTTP surface: auth endpoints and the per-user country collection.

mod error;
mod handler;
mod router;

pub use error::{ApiError, ApiErrorCode, recover_error};
pub use router::routes;

use crate::server::Server;
use std::convert::Infallible;
use std::sync::Arc;
use warp::Filter;

/// Routes with error recovery and request tracing applied; what gets served.
pub fn app(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = Infallible> + Clone {
    routes(server)
        .recover(recover_error)
        .with(warp::trace::request())
}
