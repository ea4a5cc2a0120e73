//! Service layer
//!
//! Business logic between the HTTP handlers and the data layer.

mod post;
mod timeline;

pub use post::PostService;
pub use timeline::TimelineService;
