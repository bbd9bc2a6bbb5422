//! Collins: a service-gear bootstrapper
//!
//! A host registers gears, reads a configuration directory (one master file
//! plus one file per gear), resolves inherited properties and drives every
//! gear through initialize and connect.
//!
//! ```no_run
//! use collins::{Collins, LifecycleEvent};
//!
//! # async fn demo() -> collins::Result<()> {
//! let mut collins = Collins::with_path("./configs");
//! let mut events = collins.subscribe();
//! collins.run().await?;
//! if let Ok(LifecycleEvent::Ready { gears, .. }) = events.recv().await {
//!     println!("ready: {gears:?}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod gear;
pub mod host;
pub mod logging;
pub mod pipeline;

pub use error::{CollinsError, ErrorKind, Result};
pub use events::LifecycleEvent;
pub use gear::{GearRegistry, ServiceGear};
pub use host::Collins;
