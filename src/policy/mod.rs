/*!
policy - Selection (which IRQs to evict) and placement (where they land).

Split exactly along the spec's own `choose_irqs_to_move` / `balance`
boundary so each half can be tested and reasoned about independently.
*/

pub mod placement;
pub mod selection;

pub use placement::balance;
pub use selection::choose_irqs_to_move;

use std::str::FromStr;

/// Selection strategy for which IRQ to evict from an overloaded CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Max,
    Min,
    Rnd,
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::Rnd
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "max" => Ok(Strategy::Max),
            "min" => Ok(Strategy::Min),
            "rnd" => Ok(Strategy::Rnd),
            other => Err(format!("unknown strategy '{other}', expected min|max|rnd")),
        }
    }
}
