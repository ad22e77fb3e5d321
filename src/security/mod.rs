//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Request accepted by a forwarding stage:
//!     → limits.rs (bounded body read, 413 on overflow)
//!     → headers.rs (strip hop-by-hop, add X-Forwarded-For)
//!     → Forwarder
//!
//! Response:
//!     → headers.rs (Strict-Transport-Security when secure)
//! ```
//!
//! # Design Decisions
//! - Fail closed: oversized bodies never reach a backend
//! - No trust in client-supplied hop-by-hop headers

pub mod headers;
pub mod limits;
