//! # SCORM Gateway
//!
//! HTTP service for uploading SCORM packages and managing stored folders.
//!
//! This crate provides:
//! - **Folder upload**: Multipart requests carrying whole package trees
//! - **Chunked upload**: Large files sent in numbered chunks, merged in order
//! - **Folder management**: Listing and recursive deletion
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  Browser frontend                   │
//! └─────────────────────────┬───────────────────────────┘
//!                           │
//! ┌─────────────────────────▼───────────────────────────┐
//! │                   SCORM Gateway                     │
//! ├─────────────────────────────────────────────────────┤
//! │      CORS │ Request ID │ Logging │ Body limits      │
//! ├─────────────────────────────────────────────────────┤
//! │  Upload │ Chunk sessions │ Folder list / delete     │
//! ├─────────────────────────────────────────────────────┤
//! │                  scorm-storage                      │
//! │          (local filesystem or cloud API)            │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod chunks;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod server;
pub mod state;

pub use config::{GatewayConfig, StorageBackend};
pub use error::{ApiError, ErrorCode};
pub use server::{run_server, run_server_with_shutdown};
pub use state::AppState;
