//! HTTP adaptation layer for feed delivery.

mod feeds;
mod middleware;

pub use feeds::{HttpState, build_router};
pub use middleware::RequestContext;
