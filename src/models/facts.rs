use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{CkdStage, DialysisType, Ethnicity, Gender, MedHistoryType, Treatment};

/// Kidney-function detail attached to a CKD history. A CKD history without a
/// detail record means stage and dialysis status are unknown (treated as
/// worst case by the renal rules).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CkdDetail {
    pub stage: Option<CkdStage>,
    pub dialysis: bool,
    pub dialysis_type: Option<DialysisType>,
    pub baseline_creatinine: Option<Decimal>,
}

/// One medical-history fact. Only CKD facts carry a detail sub-record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedHistory {
    pub mhtype: MedHistoryType,
    pub ckd_detail: Option<CkdDetail>,
}

impl MedHistory {
    pub fn new(mhtype: MedHistoryType) -> Self {
        Self {
            mhtype,
            ckd_detail: None,
        }
    }

    pub fn ckd(detail: Option<CkdDetail>) -> Self {
        Self {
            mhtype: MedHistoryType::Ckd,
            ckd_detail: detail,
        }
    }
}

/// A recorded drug allergy to one catalog treatment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedAllergy {
    pub treatment: Treatment,
}

/// Demographic facts, sourced either from the subject itself or from its
/// owning user, never both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Demographics {
    pub age: Option<u32>,
    pub gender: Option<Gender>,
    pub ethnicity: Option<Ethnicity>,
}

/// The owning user of a decision-aid subject, carrying the user's
/// demographics. A subject with an owner never stores its own demographics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectOwner {
    pub user_id: Uuid,
    pub demographics: Demographics,
}

/// A decision-aid subject as handed over by the persistence layer: either an
/// anonymous aggregate with its own demographics, or one owned by a user.
/// The persisted `decisionaid` snapshot is a derived cache and may be stale
/// or absent; it is regenerated from the other fields on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AidSubject {
    pub id: Uuid,
    pub owner: Option<SubjectOwner>,
    pub demographics: Option<Demographics>,
    pub medhistorys: Vec<MedHistory>,
    pub medallergys: Vec<MedAllergy>,
    /// HLA-B*5801 genotype result; None when the test was never performed.
    pub hlab5801: Option<bool>,
    pub decisionaid: Option<String>,
}

impl AidSubject {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            owner: None,
            demographics: None,
            medhistorys: Vec::new(),
            medallergys: Vec::new(),
            hlab5801: None,
            decisionaid: None,
        }
    }
}

/// Canonical per-evaluation fact set, assembled once by the extraction layer
/// and consumed read-only by every rule pass. The history index is built
/// once so rule code does keyed lookups instead of repeated linear scans.
#[derive(Debug, Clone)]
pub struct FactSet {
    pub user: Option<Uuid>,
    pub age: Option<u32>,
    pub gender: Option<Gender>,
    pub ethnicity: Option<Ethnicity>,
    pub medhistorys: Vec<MedHistory>,
    pub medallergys: Vec<MedAllergy>,
    pub hlab5801: Option<bool>,
    index: BTreeMap<MedHistoryType, usize>,
}

impl FactSet {
    pub fn new(
        user: Option<Uuid>,
        demographics: Demographics,
        medhistorys: Vec<MedHistory>,
        medallergys: Vec<MedAllergy>,
        hlab5801: Option<bool>,
    ) -> Self {
        // First fact of a type wins; duplicates carry no extra signal.
        let mut index = BTreeMap::new();
        for (i, mh) in medhistorys.iter().enumerate() {
            index.entry(mh.mhtype).or_insert(i);
        }
        Self {
            user,
            age: demographics.age,
            gender: demographics.gender,
            ethnicity: demographics.ethnicity,
            medhistorys,
            medallergys,
            hlab5801,
            index,
        }
    }

    /// Generic tagged-fact lookup, replacing per-type scan helpers.
    pub fn find(&self, mhtype: MedHistoryType) -> Option<&MedHistory> {
        self.index.get(&mhtype).map(|&i| &self.medhistorys[i])
    }

    pub fn has(&self, mhtype: MedHistoryType) -> bool {
        self.index.contains_key(&mhtype)
    }

    pub fn ckd(&self) -> Option<&MedHistory> {
        self.find(MedHistoryType::Ckd)
    }

    /// The CKD fact's kidney detail; None when the subject has no CKD
    /// history, or has one without a recorded detail.
    pub fn ckd_detail(&self) -> Option<&CkdDetail> {
        self.ckd().and_then(|mh| mh.ckd_detail.as_ref())
    }

    pub fn gout(&self) -> bool {
        self.has(MedHistoryType::Gout)
    }

    pub fn menopause(&self) -> bool {
        self.has(MedHistoryType::Menopause)
    }

    /// Any cardiovascular-disease-class history, or hypertension. Only the
    /// flare prevalence score counts hypertension alongside the CV class.
    pub fn cv_disease_or_hypertension(&self) -> bool {
        self.has(MedHistoryType::Hypertension)
            || self.medhistorys.iter().any(|mh| mh.mhtype.is_cv_disease())
    }
}
