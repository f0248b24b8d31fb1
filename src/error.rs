use thiserror::Error;

use crate::models::enums::{Treatment, TrtType};

/// Error taxonomy for the decision-aid engine.
///
/// Configuration and invariant variants indicate seed-data or upstream bugs
/// and are fatal to the evaluation; they are never produced by ordinary
/// clinical inputs (absent facts, vetoed preferences, unknown CKD stage are
/// all normal branches, not errors).
#[derive(Error, Debug)]
pub enum AidError {
    /// No system-wide default settings exist for a treatment type. The
    /// defaults table was never seeded; the caller must treat this as a
    /// deployment bug, not a user-facing condition.
    #[error("No system default settings seeded for treatment type {trttype}")]
    MissingDefaults { trttype: TrtType },

    /// No system-wide default dosing records exist for a treatment type.
    #[error("No system default treatments seeded for treatment type {trttype}")]
    MissingDefaultTreatments { trttype: TrtType },

    /// A (treatment, treatment-type) pair outside the catalog.
    #[error("{treatment} is not a valid {trttype} treatment")]
    InvalidTreatmentForType {
        treatment: Treatment,
        trttype: TrtType,
    },

    /// Subject carries both its own demographics and an owning user's.
    /// Exactly one source must be populated; enforced upstream, re-checked
    /// here so a violation fails loudly instead of producing wrong dosing.
    #[error("Subject has both an owning user and its own demographics")]
    AmbiguousDemographics,

    /// Subject carries neither its own demographics nor an owning user's.
    #[error("Subject has neither an owning user nor its own demographics")]
    MissingDemographics,

    /// ULT evaluation requested but the resolved settings record carries no
    /// ULT policy block.
    #[error("Settings record for {trttype} is missing its ULT policy")]
    MissingUltPolicy { trttype: TrtType },

    #[error("Invalid {field} value: {value}")]
    InvalidEnum { field: String, value: String },

    /// Snapshot encode/decode failure (malformed JSON, unrecognized field
    /// value, or a dose/duration string that matches no known pattern).
    #[error("Decision snapshot error: {0}")]
    Snapshot(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
