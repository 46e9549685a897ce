//! File relay: fetches attachment bytes on the widget's behalf.
//!
//! ```text
//! ┌──────────┐  POST /api/download-file {assetId}  ┌──────────────────────┐
//! │  Widget  │ ──────────────────────────────────> │ api.rs               │
//! │  / CLI   │ <────────── streamed bytes ──────── │  resolve_asset()     │──> platform API
//! └──────────┘                                     │  origin fetch        │──> file host
//!                                                  └──────────────────────┘
//! ```
//!
//! Each request is independent; the only shared state is the read-only
//! [`api::RelayState`].

pub mod api;
pub mod server;

pub use api::{RelayError, RelayState};
pub use server::{ServerConfig, build_router, start_server};
