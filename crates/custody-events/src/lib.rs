//! # custody-events
//!
//! Typed, synchronous publish/subscribe hub that sequences the Custody
//! pipeline stages.
//!
//! Each [`EventKind`] has exactly one payload type ([`DiscoveredItem`] or
//! [`VerifiedItem`]). Handlers registered for a kind are invoked in
//! registration order, synchronously, each with a shared reference to the
//! same payload.
//!
//! ```rust
//! use std::sync::Arc;
//! use custody_events::{DiscoveredItem, EventBus};
//!
//! let bus = EventBus::new();
//! bus.subscribe::<DiscoveredItem>(Arc::new(|item: &DiscoveredItem| {
//!     println!("found {}", item.path.display());
//! }));
//! bus.publish(&DiscoveredItem::new("/evidence/a.txt"));
//! ```

pub mod bus;
pub mod event;

pub use bus::{Event, EventBus, Handler};
pub use event::{DiscoveredItem, EventKind, VerifiedItem};
