//! HTTP API handlers for tally-collector
//!
//! Admin REST surface plus the SSE change stream.

pub mod collection;
pub mod content;
pub mod health;
pub mod results;
pub mod review;
pub mod sources;
pub mod sse;

pub use collection::collection_routes;
pub use content::content_routes;
pub use health::health_routes;
pub use results::result_routes;
pub use review::review_routes;
pub use sources::source_routes;
pub use sse::event_stream;
