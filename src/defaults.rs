//! Two-tier default configuration: a seeded system-wide layer plus optional
//! per-user overrides, resolved at evaluation time. A user row always beats
//! the system row for the same key; the system layer is complete by
//! construction, so resolution never silently comes up empty.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;
use uuid::Uuid;

use crate::catalog;
use crate::error::AidError;
use crate::models::enums::{Contraindication, MedHistoryType, Treatment, TrtType};
use crate::models::facts::MedHistory;
use crate::models::records::{ContraRecord, DosingRecord, SettingsRecord};

/// In-memory defaults store handed to the engine by the caller. The seeded
/// constructor carries every system default; override setters layer user
/// rows on top after validating them against the catalog.
#[derive(Debug, Clone)]
pub struct DefaultsStore {
    settings: Vec<SettingsRecord>,
    dosing: Vec<DosingRecord>,
    contras: Vec<ContraRecord>,
}

impl DefaultsStore {
    /// A store holding only the seeded system layer.
    pub fn seeded() -> Self {
        Self {
            settings: vec![
                SettingsRecord::default_flare(),
                SettingsRecord::default_ppx(),
                SettingsRecord::default_ult(),
            ],
            dosing: catalog::system_default_dosing(),
            contras: catalog::system_default_contras(),
        }
    }

    /// Layer a per-user settings override. Replaces any prior row for the
    /// same (user, treatment type).
    pub fn set_settings(&mut self, record: SettingsRecord) -> Result<(), AidError> {
        for &trt in record.preferences() {
            catalog::validate_pair(trt, record.trttype)?;
        }
        if record.trttype == TrtType::Ult {
            record.ult_policy()?;
        }
        self.settings
            .retain(|r| !(r.user == record.user && r.trttype == record.trttype));
        self.settings.push(record);
        Ok(())
    }

    /// Layer a per-user dosing override for one (treatment, type) pair.
    pub fn set_dosing(&mut self, record: DosingRecord) -> Result<(), AidError> {
        record.validate()?;
        self.dosing.retain(|r| {
            !(r.user == record.user && r.treatment == record.treatment && r.trttype == record.trttype)
        });
        self.dosing.push(record);
        Ok(())
    }

    /// Layer a per-user contraindication override.
    pub fn set_contra(&mut self, record: ContraRecord) -> Result<(), AidError> {
        catalog::validate_pair(record.treatment, record.trttype)?;
        self.contras.retain(|r| {
            !(r.user == record.user
                && r.medhistorytype == record.medhistorytype
                && r.treatment == record.treatment
                && r.trttype == record.trttype)
        });
        self.contras.push(record);
        Ok(())
    }

    /// Settings for one treatment type: the user's row when present, the
    /// system row otherwise. A missing system row is a seeding bug.
    pub fn resolve_settings(
        &self,
        user: Option<Uuid>,
        trttype: TrtType,
    ) -> Result<SettingsRecord, AidError> {
        if user.is_some() {
            if let Some(row) = self
                .settings
                .iter()
                .find(|r| r.user == user && r.trttype == trttype)
            {
                debug!(%trttype, "resolved user settings override");
                return Ok(row.clone());
            }
        }
        self.settings
            .iter()
            .find(|r| r.user.is_none() && r.trttype == trttype)
            .cloned()
            .ok_or(AidError::MissingDefaults { trttype })
    }

    /// Baseline dosing for every treatment valid for the type, keyed by
    /// treatment, with user overrides layered over the system records.
    pub fn resolve_default_treatments(
        &self,
        user: Option<Uuid>,
        trttype: TrtType,
    ) -> Result<BTreeMap<Treatment, DosingRecord>, AidError> {
        let mut resolved: BTreeMap<Treatment, DosingRecord> = self
            .dosing
            .iter()
            .filter(|r| r.user.is_none() && r.trttype == trttype)
            .map(|r| (r.treatment, r.clone()))
            .collect();
        if resolved.is_empty() {
            return Err(AidError::MissingDefaultTreatments { trttype });
        }
        if user.is_some() {
            for row in self
                .dosing
                .iter()
                .filter(|r| r.user == user && r.trttype == trttype)
            {
                debug!(%trttype, treatment = %row.treatment, "resolved user dosing override");
                resolved.insert(row.treatment, row.clone());
            }
        }
        Ok(resolved)
    }

    /// Contraindication levels relevant to the given history facts, keyed
    /// by (history type, treatment), user overrides winning per key. Empty
    /// facts resolve to an empty map; a subject with no comorbidities gets
    /// an unmodified baseline table.
    pub fn resolve_default_contras(
        &self,
        user: Option<Uuid>,
        trttype: TrtType,
        medhistorys: &[MedHistory],
    ) -> BTreeMap<(MedHistoryType, Treatment), Contraindication> {
        if medhistorys.is_empty() {
            return BTreeMap::new();
        }
        let relevant: BTreeSet<MedHistoryType> =
            medhistorys.iter().map(|mh| mh.mhtype).collect();
        let mut resolved: BTreeMap<(MedHistoryType, Treatment), Contraindication> = self
            .contras
            .iter()
            .filter(|r| {
                r.user.is_none() && r.trttype == trttype && relevant.contains(&r.medhistorytype)
            })
            .map(|r| ((r.medhistorytype, r.treatment), r.contraindication))
            .collect();
        if user.is_some() {
            for row in self.contras.iter().filter(|r| {
                r.user == user && r.trttype == trttype && relevant.contains(&r.medhistorytype)
            }) {
                resolved.insert((row.medhistorytype, row.treatment), row.contraindication);
            }
        }
        resolved
    }
}

impl Default for DefaultsStore {
    fn default() -> Self {
        Self::seeded()
    }
}
