//! Background upkeep running next to the dispatcher.

mod sweeper;

pub use sweeper::{SweeperMessage, TokenSweeper};
