//! Realtime notification socket with auto-reconnect.
//!
//! Connects to the notification endpoint with the viewer identity as an
//! `email` query parameter and forwards every text frame, in arrival order,
//! through a [`tokio::sync::mpsc`] channel. Connection health is published on
//! a [`tokio::sync::watch`] channel as [`ConnectionState`].
//!
//! # Example
//!
//! ```rust,ignore
//! use campus_api::websocket::{ConnectionManager, ReconnectConfig, TungsteniteTransport};
//!
//! let (manager, mut frames) = ConnectionManager::new(
//!     "wss://ws.example.edu/dev",
//!     ReconnectConfig::always_on(),
//!     TungsteniteTransport,
//! );
//! manager.connect("ana@uni.edu").await;
//!
//! while let Some(frame) = frames.recv().await {
//!     println!("{frame}");
//! }
//!
//! manager.disconnect().await;
//! ```

mod manager;
mod policy;
mod transport;

pub use manager::{ConnectionManager, ConnectionState};
pub use policy::{Backoff, ReconnectConfig};
pub use transport::{Connection, Transport, TungsteniteConnection, TungsteniteTransport, endpoint_url};
