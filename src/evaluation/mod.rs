pub mod engine;
pub mod state;

pub use engine::{evaluate, parse_load};
pub use state::{EvaluationResult, Verdict};
