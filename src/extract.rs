//! Fact extraction: flattens a persistence-layer subject into the canonical
//! [`FactSet`] every rule pass reads. Demographics come from exactly one
//! source, the subject itself or its owning user.

use tracing::debug;

use crate::error::AidError;
use crate::models::facts::{AidSubject, FactSet};

/// Build the evaluation fact set from a subject.
///
/// Enforces the demographics exclusivity invariant: a subject owned by a
/// user must not carry its own demographics, and an anonymous subject must
/// carry them. Either violation is an upstream bug and fails the whole
/// evaluation rather than guessing which source to trust.
pub fn extract_facts(subject: &AidSubject) -> Result<FactSet, AidError> {
    let (user, demographics) = match (&subject.owner, &subject.demographics) {
        (Some(_), Some(_)) => return Err(AidError::AmbiguousDemographics),
        (None, None) => return Err(AidError::MissingDemographics),
        (Some(owner), None) => (Some(owner.user_id), owner.demographics.clone()),
        (None, Some(demo)) => (None, demo.clone()),
    };

    debug!(
        subject = %subject.id,
        owned = user.is_some(),
        histories = subject.medhistorys.len(),
        allergies = subject.medallergys.len(),
        "extracted facts"
    );

    Ok(FactSet::new(
        user,
        demographics,
        subject.medhistorys.clone(),
        subject.medallergys.clone(),
        subject.hlab5801,
    ))
}
