mod engine;

pub use engine::{
    Breakdown, CountdownEngine, CountdownState, CountdownTick, DisplayedUnits, UnitReading,
    HIDDEN_DAYS,
};
