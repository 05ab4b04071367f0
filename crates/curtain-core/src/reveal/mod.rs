mod gate;
mod location;

pub use gate::{RevealGate, RevealPhase, RevealTrigger};
pub use location::PageLocation;
