//! HTTP layer for Thumb Streamer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           HTTP Layer                            │
//! │                                                                 │
//! │  ┌────────────┐  ┌────────────┐  ┌────────────┐  ┌───────────┐  │
//! │  │   layer    │  │  pipeline  │  │    auth    │  │  routes   │  │
//! │  │ (tower     │─►│ (gates and │  │ (signed    │  │ (router,  │  │
//! │  │  service)  │  │  render)   │  │  URLs)     │  │  CORS)    │  │
//! │  └────────────┘  └─────┬──────┘  └────────────┘  └───────────┘  │
//! │                        ▼                                        │
//! │                  ┌────────────┐                                 │
//! │                  │  response  │                                 │
//! │                  └────────────┘                                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod layer;
pub mod pipeline;
pub mod response;
pub mod routes;

pub use auth::{AuthError, DigestAlgorithm, ThumbSigner};
pub use layer::{ThumbLayer, ThumbService};
pub use pipeline::{Outcome, Thumbnailer};
pub use response::{bad_request, head_response, rendered_response};
pub use routes::{build_router, create_router, health_handler, HealthResponse, RouterConfig};
