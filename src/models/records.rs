use chrono::{NaiveDateTime, TimeDelta};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AidError;

use super::enums::{CkdStage, Contraindication, Freq, MedHistoryType, Treatment, TrtType};

/// Maximum number of ordered treatment preferences a settings record carries.
pub const MAX_PREFERENCES: usize = 5;

/// Baseline dosing for one (treatment, treatment-type) pair. `user == None`
/// marks the system-wide default; a Some(user) record is that user's
/// override for the same pair.
///
/// Flare records carry durations; ULT and PPX dosing is open-ended and all
/// duration fields stay None.
#[derive(Debug, Clone, PartialEq)]
pub struct DosingRecord {
    pub user: Option<Uuid>,
    pub treatment: Treatment,
    pub trttype: TrtType,
    pub dose: Decimal,
    pub dose2: Option<Decimal>,
    pub dose3: Option<Decimal>,
    pub dose_adj: Decimal,
    pub max_dose: Decimal,
    pub freq: Freq,
    pub freq2: Option<Freq>,
    pub freq3: Option<Freq>,
    pub duration: Option<TimeDelta>,
    pub duration2: Option<TimeDelta>,
    pub duration3: Option<TimeDelta>,
}

impl DosingRecord {
    /// Validate the record against the catalog: the (treatment, trttype)
    /// pair must exist, every non-null dose must be an enumerated dose for
    /// the treatment and stay at or under max_dose, durations are
    /// flare-only, and a "once" step cannot carry a duration.
    pub fn validate(&self) -> Result<(), AidError> {
        crate::catalog::validate_pair(self.treatment, self.trttype)?;

        let allowed = crate::catalog::allowed_doses(self.treatment);
        for dose in [Some(self.dose), self.dose2, self.dose3, Some(self.dose_adj)]
            .into_iter()
            .flatten()
        {
            if !allowed.contains(&dose) {
                return Err(AidError::InvalidEnum {
                    field: format!("{} dose", self.treatment),
                    value: dose.to_string(),
                });
            }
        }
        if !allowed.contains(&self.max_dose) {
            return Err(AidError::InvalidEnum {
                field: format!("{} max_dose", self.treatment),
                value: self.max_dose.to_string(),
            });
        }
        for dose in [Some(self.dose), self.dose2, self.dose3].into_iter().flatten() {
            if dose > self.max_dose {
                return Err(AidError::InvalidEnum {
                    field: format!("{} dose exceeds max_dose", self.treatment),
                    value: dose.to_string(),
                });
            }
        }
        if self.trttype != TrtType::Flare
            && (self.duration.is_some() || self.duration2.is_some() || self.duration3.is_some())
        {
            return Err(AidError::InvalidEnum {
                field: format!("{} duration", self.treatment),
                value: format!("{} dosing has no duration", self.trttype),
            });
        }
        if (self.freq2 == Some(Freq::Once) && self.duration2.is_some())
            || (self.freq3 == Some(Freq::Once) && self.duration3.is_some())
        {
            return Err(AidError::InvalidEnum {
                field: format!("{} freq", self.treatment),
                value: "a 'once' step cannot carry a duration".into(),
            });
        }
        Ok(())
    }
}

/// One default contraindication: how a medical-history type interacts with a
/// (treatment, treatment-type) pair. `user == None` is the system default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContraRecord {
    pub user: Option<Uuid>,
    pub medhistorytype: MedHistoryType,
    pub treatment: Treatment,
    pub trttype: TrtType,
    pub contraindication: Contraindication,
}

/// ULT-specific clinical policy toggles, nested on the ULT settings record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UltPolicy {
    /// Fix allopurinol at the lowest catalog dose for any CKD, instead of
    /// tiering dose/frequency by stage.
    pub allo_ckd_fixed_dose: bool,
    /// Use allopurinol at all in dialysis patients.
    pub allo_dialysis: bool,
    /// Use allopurinol with neither ethnicity information nor an HLA-B*5801
    /// test on file.
    pub allo_no_ethnicity_no_hlab5801: bool,
    /// Use allopurinol in a high-risk ethnicity without an HLA-B*5801 test.
    pub allo_risk_ethnicity_no_hlab5801: bool,
    /// Initial febuxostat dose once CKD triggers a dose adjustment.
    pub febu_ckd_initial_dose: Decimal,
    /// Use febuxostat in the setting of cardiovascular disease.
    pub febu_cv_disease: bool,
    /// CKD stage at or above which probenecid is contraindicated.
    pub prob_ckd_stage_contra: CkdStage,
}

impl Default for UltPolicy {
    fn default() -> Self {
        Self {
            allo_ckd_fixed_dose: true,
            allo_dialysis: true,
            allo_no_ethnicity_no_hlab5801: true,
            allo_risk_ethnicity_no_hlab5801: false,
            febu_ckd_initial_dose: Decimal::from(20),
            febu_cv_disease: true,
            prob_ckd_stage_contra: CkdStage::Three,
        }
    }
}

/// Clinical policy bundle for one treatment type, system-wide
/// (`user == None`) or per-user. The ULT record additionally carries an
/// [`UltPolicy`]; flare and PPX records leave it None.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsRecord {
    pub user: Option<Uuid>,
    pub trttype: TrtType,
    /// Use renally-dosed colchicine in CKD (stage <= 3) rather than
    /// contraindicating outright.
    pub colch_ckd: bool,
    /// When colchicine is renally adjusted, halve the dose; otherwise widen
    /// the frequency instead.
    pub colch_dose_adjust: bool,
    /// Use NSAIDs past age 65.
    pub nsaid_age: bool,
    /// Treat all NSAIDs as one contraindication class.
    pub nsaids_equivalent: bool,
    /// Use low-dose steroids with diabetes.
    pub pred_dm: bool,
    /// Treat all corticosteroids as one contraindication class.
    pub steroids_equivalent: bool,
    /// Ordered treatment preferences, at most [`MAX_PREFERENCES`].
    pub preferences: Vec<Treatment>,
    pub ult: Option<UltPolicy>,
    pub created: NaiveDateTime,
    pub modified: NaiveDateTime,
}

impl SettingsRecord {
    fn base(trttype: TrtType, preferences: Vec<Treatment>, ult: Option<UltPolicy>) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            user: None,
            trttype,
            colch_ckd: true,
            colch_dose_adjust: true,
            nsaid_age: true,
            nsaids_equivalent: true,
            pred_dm: true,
            steroids_equivalent: true,
            preferences,
            ult,
            created: now,
            modified: now,
        }
    }

    /// System default flare settings.
    pub fn default_flare() -> Self {
        Self::base(
            TrtType::Flare,
            vec![
                Treatment::Naproxen,
                Treatment::Colchicine,
                Treatment::Prednisone,
            ],
            None,
        )
    }

    /// System default prophylaxis settings.
    pub fn default_ppx() -> Self {
        Self::base(
            TrtType::Ppx,
            vec![
                Treatment::Naproxen,
                Treatment::Colchicine,
                Treatment::Prednisone,
            ],
            None,
        )
    }

    /// System default ULT settings.
    pub fn default_ult() -> Self {
        Self::base(
            TrtType::Ult,
            vec![
                Treatment::Allopurinol,
                Treatment::Febuxostat,
                Treatment::Probenecid,
            ],
            Some(UltPolicy::default()),
        )
    }

    /// Ordered preference list, clamped to the maximum of five.
    pub fn preferences(&self) -> &[Treatment] {
        let n = self.preferences.len().min(MAX_PREFERENCES);
        &self.preferences[..n]
    }

    /// The ULT policy block; an error when evaluating ULT against a record
    /// that was never given one (a seed-data bug).
    pub fn ult_policy(&self) -> Result<&UltPolicy, AidError> {
        self.ult.as_ref().ok_or(AidError::MissingUltPolicy {
            trttype: self.trttype,
        })
    }
}
