//! The working table: per-treatment dosing state the rule passes mutate.
//! A veto is monotonic; once a treatment is contraindicated no later pass
//! can restore it.

use std::collections::BTreeMap;

use chrono::TimeDelta;
use rust_decimal::Decimal;

use crate::models::enums::{Freq, Treatment};
use crate::models::records::DosingRecord;

/// Working dosing state for one treatment. Starts as a copy of the resolved
/// baseline record; rule passes adjust doses and frequencies in place or
/// veto the treatment outright.
#[derive(Debug, Clone, PartialEq)]
pub struct TrtDosing {
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
    contra: bool,
}

impl TrtDosing {
    pub fn from_record(record: &DosingRecord) -> Self {
        Self {
            dose: record.dose,
            dose2: record.dose2,
            dose3: record.dose3,
            dose_adj: record.dose_adj,
            max_dose: record.max_dose,
            freq: record.freq,
            freq2: record.freq2,
            freq3: record.freq3,
            duration: record.duration,
            duration2: record.duration2,
            duration3: record.duration3,
            contra: false,
        }
    }

    /// Rehydrate an entry from a decoded snapshot, veto state included.
    pub(crate) fn rehydrate(dosing: TrtDosingFields, contra: bool) -> Self {
        Self {
            dose: dosing.dose,
            dose2: dosing.dose2,
            dose3: dosing.dose3,
            dose_adj: dosing.dose_adj,
            max_dose: dosing.max_dose,
            freq: dosing.freq,
            freq2: dosing.freq2,
            freq3: dosing.freq3,
            duration: dosing.duration,
            duration2: dosing.duration2,
            duration3: dosing.duration3,
            contra,
        }
    }

    pub fn vetoed(&self) -> bool {
        self.contra
    }

    /// Contraindicate this treatment. There is no inverse operation.
    pub fn veto(&mut self) {
        self.contra = true;
    }
}

/// Plain field bundle used by the snapshot codec to rebuild an entry.
#[derive(Debug, Clone)]
pub(crate) struct TrtDosingFields {
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

/// Per-evaluation table of candidate treatments, keyed by treatment so the
/// iteration order (and therefore the snapshot field order) is stable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkingTable {
    entries: BTreeMap<Treatment, TrtDosing>,
}

impl WorkingTable {
    pub fn from_dosing(dosing: &BTreeMap<Treatment, DosingRecord>) -> Self {
        Self {
            entries: dosing
                .iter()
                .map(|(&trt, record)| (trt, TrtDosing::from_record(record)))
                .collect(),
        }
    }

    pub(crate) fn insert(&mut self, treatment: Treatment, entry: TrtDosing) {
        self.entries.insert(treatment, entry);
    }

    pub fn get(&self, treatment: Treatment) -> Option<&TrtDosing> {
        self.entries.get(&treatment)
    }

    pub fn get_mut(&mut self, treatment: Treatment) -> Option<&mut TrtDosing> {
        self.entries.get_mut(&treatment)
    }

    pub fn veto(&mut self, treatment: Treatment) {
        if let Some(entry) = self.entries.get_mut(&treatment) {
            entry.veto();
        }
    }

    pub fn is_vetoed(&self, treatment: Treatment) -> bool {
        self.entries
            .get(&treatment)
            .is_some_and(TrtDosing::vetoed)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Treatment, &TrtDosing)> {
        self.entries.iter().map(|(&trt, entry)| (trt, entry))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Treatment, &mut TrtDosing)> {
        self.entries.iter_mut().map(|(&trt, entry)| (trt, entry))
    }

    /// Treatments still on the table, with their working dosing.
    pub fn options(&self) -> BTreeMap<Treatment, &TrtDosing> {
        self.entries
            .iter()
            .filter(|(_, entry)| !entry.vetoed())
            .map(|(&trt, entry)| (trt, entry))
            .collect()
    }

    /// Treatments ruled out by a contraindication.
    pub fn not_options(&self) -> Vec<Treatment> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.vetoed())
            .map(|(&trt, _)| trt)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
