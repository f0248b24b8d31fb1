//! Static treatment reference data: drug classes, enumerated dose sets,
//! (treatment, treatment-type) validity, and the seeded system-wide default
//! dosing and contraindication records.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::TimeDelta;
use rust_decimal::Decimal;

use crate::error::AidError;
use crate::models::enums::{Contraindication, Freq, MedHistoryType, Treatment, TrtType};
use crate::models::records::{ContraRecord, DosingRecord};

fn d(mantissa: i64, scale: u32) -> Decimal {
    Decimal::new(mantissa, scale)
}

/// Enumerated allowed doses per treatment, ascending. Every dose field on a
/// dosing record must come from this set.
static ALLOWED_DOSES: LazyLock<BTreeMap<Treatment, Vec<Decimal>>> = LazyLock::new(|| {
    let mut m = BTreeMap::new();
    m.insert(
        Treatment::Allopurinol,
        (1..=16).map(|i| d(50 * i, 0)).collect(),
    );
    m.insert(Treatment::Celecoxib, vec![d(200, 0), d(400, 0)]);
    m.insert(Treatment::Colchicine, vec![d(3, 1), d(6, 1), d(12, 1)]);
    m.insert(
        Treatment::Diclofenac,
        vec![d(25, 0), d(50, 0), d(75, 0), d(100, 0), d(150, 0)],
    );
    m.insert(
        Treatment::Febuxostat,
        vec![d(20, 0), d(40, 0), d(60, 0), d(80, 0), d(100, 0), d(120, 0)],
    );
    m.insert(
        Treatment::Ibuprofen,
        vec![d(200, 0), d(400, 0), d(600, 0), d(800, 0)],
    );
    m.insert(Treatment::Indomethacin, vec![d(25, 0), d(50, 0)]);
    m.insert(Treatment::Meloxicam, vec![d(75, 1), d(15, 0)]);
    m.insert(
        Treatment::Methylprednisolone,
        vec![
            d(4, 0),
            d(8, 0),
            d(16, 0),
            d(20, 0),
            d(24, 0),
            d(32, 0),
            d(40, 0),
            d(80, 0),
        ],
    );
    m.insert(
        Treatment::Naproxen,
        vec![d(220, 0), d(250, 0), d(440, 0), d(500, 0)],
    );
    m.insert(
        Treatment::Prednisone,
        vec![
            d(25, 1),
            d(5, 0),
            d(10, 0),
            d(15, 0),
            d(20, 0),
            d(30, 0),
            d(40, 0),
            d(60, 0),
            d(80, 0),
        ],
    );
    m.insert(
        Treatment::Probenecid,
        vec![d(250, 0), d(500, 0), d(750, 0), d(1000, 0)],
    );
    m
});

pub fn allowed_doses(treatment: Treatment) -> &'static [Decimal] {
    ALLOWED_DOSES
        .get(&treatment)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Lowest enumerated dose for a treatment, the target of renal fixed dosing.
pub fn lowest_dose(treatment: Treatment) -> Decimal {
    allowed_doses(treatment)
        .first()
        .copied()
        .unwrap_or_default()
}

/// Reject (treatment, treatment-type) pairs outside the catalog.
pub fn validate_pair(treatment: Treatment, trttype: TrtType) -> Result<(), AidError> {
    if treatment.valid_for(trttype) {
        Ok(())
    } else {
        Err(AidError::InvalidTreatmentForType { treatment, trttype })
    }
}

struct Dosing {
    dose: Decimal,
    dose2: Option<Decimal>,
    dose3: Option<Decimal>,
    dose_adj: Decimal,
    max_dose: Decimal,
    freq: Freq,
    freq2: Option<Freq>,
    freq3: Option<Freq>,
    days: Option<i64>,
}

fn record(treatment: Treatment, trttype: TrtType, dosing: Dosing) -> DosingRecord {
    DosingRecord {
        user: None,
        treatment,
        trttype,
        dose: dosing.dose,
        dose2: dosing.dose2,
        dose3: dosing.dose3,
        dose_adj: dosing.dose_adj,
        max_dose: dosing.max_dose,
        freq: dosing.freq,
        freq2: dosing.freq2,
        freq3: dosing.freq3,
        duration: dosing.days.map(TimeDelta::days),
        duration2: None,
        duration3: None,
    }
}

/// System-wide default dosing, one record per valid (treatment, type) pair.
///
/// The flare colchicine ladder reads: 0.6 mg twice daily for a week as the
/// primary step, with a 1.2 mg loading dose and a 0.6 mg follow-up an hour
/// later, both one-time steps.
pub fn system_default_dosing() -> Vec<DosingRecord> {
    let mut records = vec![
        // ULT
        record(
            Treatment::Allopurinol,
            TrtType::Ult,
            Dosing {
                dose: d(100, 0),
                dose2: None,
                dose3: None,
                dose_adj: d(100, 0),
                max_dose: d(750, 0),
                freq: Freq::Qday,
                freq2: None,
                freq3: None,
                days: None,
            },
        ),
        record(
            Treatment::Febuxostat,
            TrtType::Ult,
            Dosing {
                dose: d(40, 0),
                dose2: None,
                dose3: None,
                dose_adj: d(20, 0),
                max_dose: d(120, 0),
                freq: Freq::Qday,
                freq2: None,
                freq3: None,
                days: None,
            },
        ),
        record(
            Treatment::Probenecid,
            TrtType::Ult,
            Dosing {
                dose: d(250, 0),
                dose2: None,
                dose3: None,
                dose_adj: d(250, 0),
                max_dose: d(1000, 0),
                freq: Freq::Bid,
                freq2: None,
                freq3: None,
                days: None,
            },
        ),
        // FLARE
        record(
            Treatment::Celecoxib,
            TrtType::Flare,
            Dosing {
                dose: d(200, 0),
                dose2: Some(d(400, 0)),
                dose3: None,
                dose_adj: d(200, 0),
                max_dose: d(400, 0),
                freq: Freq::Bid,
                freq2: Some(Freq::Once),
                freq3: None,
                days: Some(7),
            },
        ),
        record(
            Treatment::Colchicine,
            TrtType::Flare,
            Dosing {
                dose: d(6, 1),
                dose2: Some(d(12, 1)),
                dose3: Some(d(6, 1)),
                dose_adj: d(6, 1),
                max_dose: d(12, 1),
                freq: Freq::Bid,
                freq2: Some(Freq::Once),
                freq3: Some(Freq::Once),
                days: Some(7),
            },
        ),
        record(
            Treatment::Diclofenac,
            TrtType::Flare,
            Dosing {
                dose: d(50, 0),
                dose2: None,
                dose3: None,
                dose_adj: d(25, 0),
                max_dose: d(150, 0),
                freq: Freq::Tid,
                freq2: None,
                freq3: None,
                days: Some(7),
            },
        ),
        record(
            Treatment::Ibuprofen,
            TrtType::Flare,
            Dosing {
                dose: d(800, 0),
                dose2: None,
                dose3: None,
                dose_adj: d(400, 0),
                max_dose: d(800, 0),
                freq: Freq::Tid,
                freq2: None,
                freq3: None,
                days: Some(7),
            },
        ),
        record(
            Treatment::Indomethacin,
            TrtType::Flare,
            Dosing {
                dose: d(50, 0),
                dose2: None,
                dose3: None,
                dose_adj: d(25, 0),
                max_dose: d(50, 0),
                freq: Freq::Tid,
                freq2: None,
                freq3: None,
                days: Some(7),
            },
        ),
        record(
            Treatment::Meloxicam,
            TrtType::Flare,
            Dosing {
                dose: d(15, 0),
                dose2: None,
                dose3: None,
                dose_adj: d(75, 1),
                max_dose: d(15, 0),
                freq: Freq::Qday,
                freq2: None,
                freq3: None,
                days: Some(7),
            },
        ),
        record(
            Treatment::Methylprednisolone,
            TrtType::Flare,
            Dosing {
                dose: d(32, 0),
                dose2: None,
                dose3: None,
                dose_adj: d(16, 0),
                max_dose: d(80, 0),
                freq: Freq::Qday,
                freq2: None,
                freq3: None,
                days: Some(7),
            },
        ),
        record(
            Treatment::Naproxen,
            TrtType::Flare,
            Dosing {
                dose: d(500, 0),
                dose2: None,
                dose3: None,
                dose_adj: d(250, 0),
                max_dose: d(500, 0),
                freq: Freq::Bid,
                freq2: None,
                freq3: None,
                days: Some(7),
            },
        ),
        record(
            Treatment::Prednisone,
            TrtType::Flare,
            Dosing {
                dose: d(40, 0),
                dose2: None,
                dose3: None,
                dose_adj: d(20, 0),
                max_dose: d(80, 0),
                freq: Freq::Qday,
                freq2: None,
                freq3: None,
                days: Some(7),
            },
        ),
        // PPX
        record(
            Treatment::Celecoxib,
            TrtType::Ppx,
            Dosing {
                dose: d(200, 0),
                dose2: None,
                dose3: None,
                dose_adj: d(200, 0),
                max_dose: d(400, 0),
                freq: Freq::Qday,
                freq2: None,
                freq3: None,
                days: None,
            },
        ),
        record(
            Treatment::Colchicine,
            TrtType::Ppx,
            Dosing {
                dose: d(6, 1),
                dose2: None,
                dose3: None,
                dose_adj: d(3, 1),
                max_dose: d(12, 1),
                freq: Freq::Qday,
                freq2: None,
                freq3: None,
                days: None,
            },
        ),
        record(
            Treatment::Diclofenac,
            TrtType::Ppx,
            Dosing {
                dose: d(25, 0),
                dose2: None,
                dose3: None,
                dose_adj: d(25, 0),
                max_dose: d(150, 0),
                freq: Freq::Bid,
                freq2: None,
                freq3: None,
                days: None,
            },
        ),
        record(
            Treatment::Ibuprofen,
            TrtType::Ppx,
            Dosing {
                dose: d(400, 0),
                dose2: None,
                dose3: None,
                dose_adj: d(200, 0),
                max_dose: d(800, 0),
                freq: Freq::Bid,
                freq2: None,
                freq3: None,
                days: None,
            },
        ),
        record(
            Treatment::Indomethacin,
            TrtType::Ppx,
            Dosing {
                dose: d(25, 0),
                dose2: None,
                dose3: None,
                dose_adj: d(25, 0),
                max_dose: d(50, 0),
                freq: Freq::Bid,
                freq2: None,
                freq3: None,
                days: None,
            },
        ),
        record(
            Treatment::Meloxicam,
            TrtType::Ppx,
            Dosing {
                dose: d(75, 1),
                dose2: None,
                dose3: None,
                dose_adj: d(75, 1),
                max_dose: d(15, 0),
                freq: Freq::Qday,
                freq2: None,
                freq3: None,
                days: None,
            },
        ),
        record(
            Treatment::Methylprednisolone,
            TrtType::Ppx,
            Dosing {
                dose: d(4, 0),
                dose2: None,
                dose3: None,
                dose_adj: d(4, 0),
                max_dose: d(8, 0),
                freq: Freq::Qday,
                freq2: None,
                freq3: None,
                days: None,
            },
        ),
        record(
            Treatment::Naproxen,
            TrtType::Ppx,
            Dosing {
                dose: d(500, 0),
                dose2: None,
                dose3: None,
                dose_adj: d(250, 0),
                max_dose: d(500, 0),
                freq: Freq::Qday,
                freq2: None,
                freq3: None,
                days: None,
            },
        ),
        record(
            Treatment::Prednisone,
            TrtType::Ppx,
            Dosing {
                dose: d(5, 0),
                dose2: None,
                dose3: None,
                dose_adj: d(25, 1),
                max_dose: d(10, 0),
                freq: Freq::Qday,
                freq2: None,
                freq3: None,
                days: None,
            },
        ),
    ];
    records.sort_by_key(|r| (r.treatment, r.trttype));
    records
}

/// How each medical-history type interacts with NSAIDs. Applied uniformly to
/// every NSAID-class treatment for both flare and prophylaxis dosing.
const NSAID_CONTRAS: &[(MedHistoryType, Contraindication)] = &[
    (MedHistoryType::Angina, Contraindication::Absolute),
    (MedHistoryType::Anticoagulation, Contraindication::Relative),
    (MedHistoryType::Bleed, Contraindication::Absolute),
    (MedHistoryType::Cad, Contraindication::Relative),
    (MedHistoryType::Chf, Contraindication::Absolute),
    (MedHistoryType::Ckd, Contraindication::Absolute),
    (MedHistoryType::GastricBypass, Contraindication::Relative),
    (MedHistoryType::HeartAttack, Contraindication::Relative),
    (MedHistoryType::Ibd, Contraindication::Relative),
    (MedHistoryType::Pvd, Contraindication::Relative),
    (MedHistoryType::Stroke, Contraindication::Relative),
];

fn contra(
    mhtype: MedHistoryType,
    treatment: Treatment,
    trttype: TrtType,
    level: Contraindication,
) -> ContraRecord {
    ContraRecord {
        user: None,
        medhistorytype: mhtype,
        treatment,
        trttype,
        contraindication: level,
    }
}

/// System-wide default contraindication records.
pub fn system_default_contras() -> Vec<ContraRecord> {
    let mut records = Vec::new();

    for &treatment in Treatment::ALL {
        if treatment.is_nsaid() {
            for &(mhtype, level) in NSAID_CONTRAS {
                records.push(contra(mhtype, treatment, TrtType::Flare, level));
                records.push(contra(mhtype, treatment, TrtType::Ppx, level));
            }
        }
    }

    for trttype in [TrtType::Flare, TrtType::Ppx] {
        records.push(contra(
            MedHistoryType::Ckd,
            Treatment::Colchicine,
            trttype,
            Contraindication::DoseAdj,
        ));
        records.push(contra(
            MedHistoryType::ColchicineInteraction,
            Treatment::Colchicine,
            trttype,
            Contraindication::Relative,
        ));
    }

    records.push(contra(
        MedHistoryType::AllopurinolHypersensitivity,
        Treatment::Allopurinol,
        TrtType::Ult,
        Contraindication::Absolute,
    ));
    records.push(contra(
        MedHistoryType::Ckd,
        Treatment::Allopurinol,
        TrtType::Ult,
        Contraindication::DoseAdj,
    ));
    records.push(contra(
        MedHistoryType::XoiInteraction,
        Treatment::Allopurinol,
        TrtType::Ult,
        Contraindication::Absolute,
    ));

    records.push(contra(
        MedHistoryType::Ckd,
        Treatment::Febuxostat,
        TrtType::Ult,
        Contraindication::DoseAdj,
    ));
    records.push(contra(
        MedHistoryType::FebuxostatHypersensitivity,
        Treatment::Febuxostat,
        TrtType::Ult,
        Contraindication::Absolute,
    ));
    records.push(contra(
        MedHistoryType::XoiInteraction,
        Treatment::Febuxostat,
        TrtType::Ult,
        Contraindication::Absolute,
    ));
    for &cvd in crate::models::enums::CV_DISEASES {
        records.push(contra(
            cvd,
            Treatment::Febuxostat,
            TrtType::Ult,
            Contraindication::Relative,
        ));
    }

    records.push(contra(
        MedHistoryType::Ckd,
        Treatment::Probenecid,
        TrtType::Ult,
        Contraindication::Relative,
    ));

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::CV_DISEASES;

    #[test]
    fn seeded_dosing_is_catalog_valid() {
        let records = system_default_dosing();
        assert!(!records.is_empty());
        for r in &records {
            r.validate()
                .unwrap_or_else(|e| panic!("{} {}: {e}", r.treatment, r.trttype));
        }
    }

    #[test]
    fn seeded_dosing_covers_every_valid_pair() {
        let records = system_default_dosing();
        for &trt in Treatment::ALL {
            for trttype in [TrtType::Ult, TrtType::Flare, TrtType::Ppx] {
                let seeded = records
                    .iter()
                    .any(|r| r.treatment == trt && r.trttype == trttype);
                assert_eq!(seeded, trt.valid_for(trttype), "{trt} {trttype}");
            }
        }
    }

    #[test]
    fn doses_never_exceed_max() {
        for r in system_default_dosing() {
            assert!(r.dose <= r.max_dose, "{}", r.treatment);
            for dose in [r.dose2, r.dose3].into_iter().flatten() {
                assert!(dose <= r.max_dose, "{}", r.treatment);
            }
        }
    }

    #[test]
    fn flare_records_have_durations_others_do_not() {
        for r in system_default_dosing() {
            if r.trttype == TrtType::Flare {
                assert!(r.duration.is_some(), "{}", r.treatment);
            } else {
                assert!(r.duration.is_none(), "{} {}", r.treatment, r.trttype);
            }
        }
    }

    #[test]
    fn lowest_allopurinol_dose_is_50() {
        assert_eq!(lowest_dose(Treatment::Allopurinol), Decimal::from(50));
        assert_eq!(lowest_dose(Treatment::Colchicine), Decimal::new(3, 1));
    }

    #[test]
    fn invalid_pair_rejected() {
        assert!(validate_pair(Treatment::Allopurinol, TrtType::Flare).is_err());
        assert!(validate_pair(Treatment::Naproxen, TrtType::Ppx).is_ok());
    }

    #[test]
    fn contra_seed_covers_nsaid_class() {
        let records = system_default_contras();
        for &trt in Treatment::ALL {
            if trt.is_nsaid() {
                assert!(records.iter().any(|c| {
                    c.treatment == trt
                        && c.trttype == TrtType::Flare
                        && c.medhistorytype == MedHistoryType::Ckd
                        && c.contraindication == Contraindication::Absolute
                }));
            }
        }
    }

    #[test]
    fn febuxostat_cvd_contras_are_relative() {
        let records = system_default_contras();
        for &cvd in CV_DISEASES {
            let rec = records
                .iter()
                .find(|c| c.treatment == Treatment::Febuxostat && c.medhistorytype == cvd)
                .unwrap();
            assert_eq!(rec.contraindication, Contraindication::Relative);
        }
    }
}
