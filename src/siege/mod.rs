//! Siege escalation: per-room state machine, breach windows, and the intent
//! director that turns breaches into rate-limited invasion intents.

pub mod breach;
pub mod intent;
pub mod machine;
pub mod state;

pub use breach::BreachWindow;
pub use intent::IntentDirector;
pub use machine::{PressureOutcome, SiegeStateMachine, SiegeTimings};
pub use state::{SiegeDebugState, SiegeState, SiegeTier};
