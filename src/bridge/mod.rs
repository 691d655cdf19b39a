//! IRC-Discord message relay.
//!
//! ## Module Structure
//!
//! - `channels`: Communication channel structures
//! - `dispatch`: Per-platform ordered send queues
//! - `mapping`: IRC channel <-> `guild#channel` lookup
//! - `mentions`: Mention, channel, role and emoji translation
//! - `orchestrator`: Relay tasks (`Relay`)
//! - `paginate`: Line wrapping and overflow clipping
//! - `paste`: Storage for clipped text
//! - `roster`: Snapshot of the Discord guilds
//! - `router`: Message routing (`BridgeRouter`)
//! - `state`: Bridge state (`PendingBridgeState`, `ResolvedBridgeState`)

pub mod channels;
pub mod dispatch;
pub mod mapping;
pub mod mentions;
pub mod orchestrator;
pub mod paginate;
pub mod paste;
pub mod roster;
pub mod router;
pub mod state;

pub use channels::ChannelBundle;
pub use dispatch::DispatchQueue;
pub use orchestrator::{Outlet, Relay};
pub use router::BridgeRouter;
pub use state::PendingBridgeState;
