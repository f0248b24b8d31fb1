//! Gout treatment decision-aid engine.
//!
//! Given a subject's demographics, medical histories, allergies, and genetic
//! test results, the engine evaluates the catalog of gout treatments for one
//! of three treatment settings (flare, prophylaxis, urate-lowering therapy),
//! applies contraindication and dose-adjustment rules, and returns the
//! surviving options, a recommendation, and a persistable snapshot of the
//! decision. A separate sub-engine scores symptom episodes for the
//! likelihood that they represent a gout flare.
//!
//! The engine is pure over its inputs: all persistence-layer data arrives
//! pre-fetched, and evaluating the same inputs twice yields identical
//! results.

pub mod catalog;
pub mod defaults;
pub mod engine;
pub mod error;
pub mod extract;
pub mod flares;
pub mod models;
pub mod snapshot;

pub use defaults::DefaultsStore;
pub use engine::{AidEngine, AidOutcome, TrtDosing, WorkingTable};
pub use error::AidError;
pub use extract::extract_facts;
pub use models::enums::{Treatment, TrtType};
pub use models::facts::{AidSubject, FactSet};
