//! The rule engine: working table, rule passes, recommendation selection,
//! and the evaluation orchestrator.

pub mod aid;
pub mod recommend;
pub mod rules;
pub mod table;

pub use aid::{AidEngine, AidOutcome};
pub use recommend::select_recommendation;
pub use table::{TrtDosing, WorkingTable};
