//! Domain types: agents, instruments, inventory lots, events.

pub mod agent;
pub mod event;
pub mod instrument;
pub mod lot;

pub use agent::{Agent, AgentKind};
pub use event::{Event, EventLog};
pub use instrument::{FungibilityKey, Instrument, InstrumentClass, InstrumentId, InstrumentKind};
pub use lot::{InventoryLot, LotId, LotKey};
