//! # convoy-track
//!
//! Shipment movement tracking engine.
//!
//! ## Architecture
//!
//! ```text
//! HostPositionApi ──► PositionSource ──► bounded queue ──► session worker
//!   (ws / replay /                                         ├── ThrottledPublisher (local display + throttle)
//!    manual feed)                                          └── MovementStateMachine ──► RecordStore
//!
//! ViewerProjection ──► RecordStore (read, expand order) ──► LocationResolver ──► Geocoder
//! ```
//!
//! One [`session::TrackingSession`] runs per tracked movement; the
//! [`tracker::Tracker`] addresses sessions by movement id. Sessions share no
//! mutable state.
//!
//! - [`source`]: host position contract and the start/stop wrapper
//! - [`feed`]: host position feeds (WebSocket, replay, manual)
//! - [`resolver`]: stored → order → geocoded coordinate fallback
//! - [`throttle`]: persistence rate limiting
//! - [`machine`]: movement status state machine, sole writer
//! - [`session`]: per-movement worker task
//! - [`tracker`]: session registry
//! - [`control`]: driver commands routed through the tracker
//! - [`projection`]: read-only viewer reconstruction
//! - [`event`]: notifications for the UI layer

pub mod control;
pub mod event;
pub mod feed;
pub mod machine;
pub mod projection;
pub mod resolver;
pub mod session;
pub mod source;
pub mod throttle;
pub mod tracker;

pub use control::DriverCommand;
pub use event::{TrackEvent, TrackEventReceiver, TrackEventSender};
pub use machine::MovementStateMachine;
pub use projection::{Projection, ViewerProjection};
pub use resolver::{LocationResolver, ResolvedLocations};
pub use session::{SessionSettings, SessionStats, TrackingSession};
pub use source::{HostPositionApi, PositionSource, WatchHandle, WatchOptions};
pub use throttle::{Throttle, ThrottledPublisher};
pub use tracker::Tracker;
