//! # framecrypt
//!
//! Live camera frames streamed to browsers over server-sent events, with
//! every frame encrypted under AES-256-CBC.
//!
//! ```text
//! FrameSource ──► Pipeline ──► FrameSlot ──┬──► Broadcaster ──► client
//!                 (encrypt)    (latest)    ├──► Broadcaster ──► client
//!                                          └──► Broadcaster ──► client
//! ```
//!
//! The producer publishes into a single-slot [`FrameSlot`]; each connected
//! client gets its own [`Broadcaster`] that waits on the slot and writes one
//! `data: <ciphertext>|<original>|<latency>` event per observed frame.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use framecrypt::{
//!     CipherConfig, FrameCipher, FrameSlot, MjpegSource, Pipeline, ServerConfig,
//!     StreamServer, StreamStats,
//! };
//!
//! #[tokio::main]
//! async fn main() -> framecrypt::Result<()> {
//!     let cipher_config = CipherConfig::generate();
//!     let slot = Arc::new(FrameSlot::new());
//!     let stats = Arc::new(StreamStats::new());
//!
//!     let pipeline = Pipeline::new(
//!         MjpegSource::new(tokio::io::stdin()),
//!         FrameCipher::new(cipher_config.clone()),
//!         Arc::clone(&slot),
//!         Arc::clone(&stats),
//!     );
//!     tokio::spawn(pipeline.run());
//!
//!     let server = StreamServer::new(ServerConfig::default(), &cipher_config, slot, stats);
//!     server
//!         .run_until(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await
//! }
//! ```

pub mod crypto;
pub mod error;
pub mod pipeline;
pub mod server;
pub mod slot;
pub mod source;
pub mod stats;
pub mod stream;

pub use crypto::{CipherConfig, EncryptedFrame, FrameCipher, FrameEncryptor};
pub use error::{CipherError, Error, EventError, Result, SlotError, SourceError};
pub use pipeline::Pipeline;
pub use server::{ServerConfig, StreamServer};
pub use slot::{FrameRecord, FrameSlot, Subscriber};
pub use source::{DirectorySource, FrameSource, MjpegSource};
pub use stats::{StatsSnapshot, StreamStats};
pub use stream::{parse_event, Broadcaster, EventReader, StreamEvent};
