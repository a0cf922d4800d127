//! Bufreg Core - handle-based byte buffer registry
//!
//! This crate owns byte buffers on behalf of callers that may only refer to
//! them through opaque handles. It has no `unsafe` code; the C boundary lives
//! in `bufreg-ffi`.
//!
//! # Main Components
//!
//! - **Keys**: slot-plus-generation intern keys that detect stale handles
//! - **Buffers**: fixed-capacity storage with a read cursor and offset I/O
//! - **Store**: sharded key-to-buffer table with per-buffer locking
//! - **Registry**: opaque handles, resolution, and the handle lifecycle
//! - **Configuration and logging**: TOML/env configuration and `tracing` setup
//!
//! # Example
//!
//! ```
//! use bufreg_core::{HandleRegistry, Result};
//!
//! fn example() -> Result<()> {
//!     let registry = HandleRegistry::default();
//!     let handle = registry.create(16)?;
//!     registry.write(&handle, b"hello")?;
//!
//!     let mut out = [0u8; 16];
//!     let read = registry.read(&handle, &mut out)?;
//!     assert_eq!(&out[..read], b"hello");
//!
//!     registry.invalidate(&handle)?;
//!     Ok(())
//! }
//! # example().unwrap();
//! ```

pub mod buffer;
pub mod config;
pub mod error;
pub mod key;
pub mod logging;
pub mod registry;
pub mod store;

// Re-export main types for convenience
pub use buffer::{Buffer, BufferInfo};
pub use config::RegistryConfig;
pub use error::{Error, Result};
pub use key::{InternKey, KeyAllocator, KeyStatus};
pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use registry::{BufferHandle, HandleRegistry, HandleState};
pub use store::{BufferRef, BufferStore, StoreStats};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
