//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, classification, disposition)
//!     → response.rs (health payload / local errors)      [local replies]
//!     → request.rs (Host, X-Request-ID, X-Forwarded-For) [forwards]
//!     → forward.rs (hyper client to the chosen origin)
//!     → response.rs (request id, HSTS)
//!     → Send to client
//! ```

pub mod forward;
pub mod request;
pub mod response;
pub mod server;

pub use forward::{ForwardError, Forwarder, HttpForwarder};
pub use server::{AppState, HttpServer};
