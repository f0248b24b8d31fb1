//! Rule passes over the working table. Each pass is a pure function of the
//! fact set, the resolved settings, and the resolved contraindication
//! defaults; the only state it touches is the table it is handed.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tracing::debug;

use crate::catalog;
use crate::error::AidError;
use crate::models::enums::{
    CkdStage, Contraindication, DialysisType, Freq, MedHistoryType, Treatment, TrtType,
};
use crate::models::facts::{CkdDetail, FactSet};
use crate::models::records::{SettingsRecord, UltPolicy};

use super::table::WorkingTable;

/// Age past which NSAIDs are withheld unless the settings allow them.
const NSAID_AGE_CUTOFF: u32 = 65;

/// Exact-value renal mapping for the colchicine ladder: 0.6 drops to 0.3
/// and 1.2 to 0.6. An already-reduced dose maps to itself, so re-applying
/// the pass changes nothing and every result stays in the enumerated set.
fn reduced_colchicine_dose(dose: Decimal) -> Decimal {
    if dose == Decimal::new(6, 1) {
        Decimal::new(3, 1)
    } else if dose == Decimal::new(12, 1) {
        Decimal::new(6, 1)
    } else {
        dose
    }
}

/// Apply every medical-history fact against the resolved contraindication
/// defaults. Absolute and relative contraindications veto; dose-adjust
/// contraindications rewrite the entry's dosing, falling back to a veto when
/// the adjustment's own preconditions fail.
pub fn apply_medhistorys(
    table: &mut WorkingTable,
    facts: &FactSet,
    settings: &SettingsRecord,
    trttype: TrtType,
    contras: &BTreeMap<(MedHistoryType, Treatment), Contraindication>,
) -> Result<(), AidError> {
    let treatments: Vec<Treatment> = table.iter().map(|(trt, _)| trt).collect();
    // Duplicate facts of one type carry no extra signal and must not apply
    // a dose adjustment twice.
    let mut seen = std::collections::BTreeSet::new();
    for mh in &facts.medhistorys {
        if !seen.insert(mh.mhtype) {
            continue;
        }
        for &trt in &treatments {
            let Some(&level) = contras.get(&(mh.mhtype, trt)) else {
                continue;
            };
            match level {
                Contraindication::Absolute => {
                    debug!(treatment = %trt, history = %mh.mhtype, "absolute contraindication");
                    table.veto(trt);
                }
                Contraindication::Relative => {
                    if relative_contra_vetoes(mh.mhtype, trt, facts, settings)? {
                        debug!(treatment = %trt, history = %mh.mhtype, "relative contraindication");
                        table.veto(trt);
                    }
                }
                Contraindication::DoseAdj => {
                    apply_dose_adjustment(table, mh.mhtype, trt, trttype, facts, settings)?;
                }
            }
        }
    }
    Ok(())
}

/// Whether a relative contraindication actually vetoes. Two are conditional
/// on ULT policy: febuxostat in cardiovascular disease, and probenecid in
/// CKD below the configured stage threshold.
fn relative_contra_vetoes(
    mhtype: MedHistoryType,
    trt: Treatment,
    facts: &FactSet,
    settings: &SettingsRecord,
) -> Result<bool, AidError> {
    if trt == Treatment::Febuxostat && mhtype.is_cv_disease() {
        return Ok(!settings.ult_policy()?.febu_cv_disease);
    }
    if trt == Treatment::Probenecid && mhtype == MedHistoryType::Ckd {
        let threshold = settings.ult_policy()?.prob_ckd_stage_contra;
        return Ok(match facts.ckd_detail().and_then(|d| d.stage) {
            // Unknown stage is treated as at-threshold.
            None => true,
            Some(stage) => stage >= threshold,
        });
    }
    Ok(true)
}

/// The renal sub-rules only fire for a CKD history; a dose-adjust record
/// keyed to any other history type takes the generic path, which adjusts
/// dosing and never vetoes.
fn apply_dose_adjustment(
    table: &mut WorkingTable,
    mhtype: MedHistoryType,
    trt: Treatment,
    trttype: TrtType,
    facts: &FactSet,
    settings: &SettingsRecord,
) -> Result<(), AidError> {
    match (mhtype, trt) {
        (MedHistoryType::Ckd, Treatment::Allopurinol) => {
            if xoi_ckd_needs_adjustment(facts.ckd_detail()) {
                adjust_allopurinol(table, facts.ckd_detail(), settings.ult_policy()?);
            }
        }
        (MedHistoryType::Ckd, Treatment::Febuxostat) => {
            if xoi_ckd_needs_adjustment(facts.ckd_detail()) {
                let initial = settings.ult_policy()?.febu_ckd_initial_dose;
                if let Some(entry) = table.get_mut(trt) {
                    entry.dose = initial;
                    entry.dose_adj = initial;
                }
            }
        }
        (MedHistoryType::Ckd, Treatment::Colchicine) => {
            adjust_colchicine(table, trttype, facts.ckd_detail(), settings);
        }
        _ => {
            // Generic adjustment: drop to the record's adjusted dose.
            if let Some(entry) = table.get_mut(trt) {
                entry.dose = entry.dose_adj;
            }
        }
    }
    Ok(())
}

/// Xanthine-oxidase inhibitors are renally adjusted for CKD with an unknown
/// stage, any dialysis, or stage 3 and above. Documented stage 1 or 2
/// without dialysis needs no change.
fn xoi_ckd_needs_adjustment(detail: Option<&CkdDetail>) -> bool {
    match detail {
        None => true,
        Some(d) => d.dialysis || d.stage.map_or(true, |s| s >= CkdStage::Three),
    }
}

/// Renal allopurinol dosing. Everything starts from the lowest catalog dose;
/// dialysis modality and CKD stage set the frequency.
fn adjust_allopurinol(table: &mut WorkingTable, detail: Option<&CkdDetail>, policy: &UltPolicy) {
    let lowest = catalog::lowest_dose(Treatment::Allopurinol);
    let dialysis = detail.is_some_and(|d| d.dialysis);
    if dialysis && !policy.allo_dialysis {
        table.veto(Treatment::Allopurinol);
        return;
    }
    let Some(entry) = table.get_mut(Treatment::Allopurinol) else {
        return;
    };
    entry.dose = lowest;
    entry.dose_adj = lowest;
    entry.freq = if dialysis {
        match detail.and_then(|d| d.dialysis_type) {
            Some(DialysisType::Peritoneal) => Freq::Qday,
            // Hemodialysis, and dialysis of unrecorded modality, dose after
            // each session.
            _ => Freq::Tiw,
        }
    } else if policy.allo_ckd_fixed_dose {
        Freq::Qday
    } else {
        match detail.and_then(|d| d.stage) {
            Some(CkdStage::Four) => Freq::Qotherday,
            Some(CkdStage::Five) => Freq::Biw,
            // Stage 3, and CKD of unknown stage, stay daily at the floor.
            _ => Freq::Qday,
        }
    };
}

/// Renal colchicine. Documented stage 1 or 2 without dialysis needs no
/// change; at stage 3 the settings may permit reduced-intensity dosing;
/// anything worse, or an undocumented stage, is an absolute veto.
fn adjust_colchicine(
    table: &mut WorkingTable,
    trttype: TrtType,
    detail: Option<&CkdDetail>,
    settings: &SettingsRecord,
) {
    let gated = match detail {
        None => true,
        Some(d) => d.dialysis || d.stage.map_or(true, |s| s >= CkdStage::Three),
    };
    if !gated {
        return;
    }
    let adjustable = settings.colch_ckd
        && detail.is_some_and(|d| d.stage.is_some_and(|s| s <= CkdStage::Three));
    if !adjustable {
        table.veto(Treatment::Colchicine);
        return;
    }
    let Some(entry) = table.get_mut(Treatment::Colchicine) else {
        return;
    };
    if entry.vetoed() {
        return;
    }
    match (trttype, settings.colch_dose_adjust) {
        // Reduce every rung of the ladder.
        (TrtType::Flare, true) => {
            entry.dose = reduced_colchicine_dose(entry.dose);
            entry.dose2 = entry.dose2.map(reduced_colchicine_dose);
            entry.dose3 = entry.dose3.map(reduced_colchicine_dose);
        }
        // Keep the dose, thin the schedule.
        (TrtType::Flare, false) => {
            entry.dose2 = entry.dose2.map(reduced_colchicine_dose);
            entry.freq = Freq::Qday;
        }
        (_, true) => entry.dose = reduced_colchicine_dose(entry.dose),
        (_, false) => entry.freq = Freq::Qotherday,
    }
}

/// Veto any treatment the subject is allergic to.
pub fn apply_allergys(table: &mut WorkingTable, facts: &FactSet) {
    for allergy in &facts.medallergys {
        if table.get(allergy.treatment).is_some() {
            debug!(treatment = %allergy.treatment, "allergy veto");
            table.veto(allergy.treatment);
        }
    }
}

/// NSAID class pass: the age rule first, then class equivalence. When NSAIDs
/// are configured as interchangeable, one vetoed NSAID vetoes them all.
pub fn apply_nsaids(table: &mut WorkingTable, facts: &FactSet, settings: &SettingsRecord) {
    if !settings.nsaid_age && facts.age.is_some_and(|age| age > NSAID_AGE_CUTOFF) {
        for (trt, entry) in table.iter_mut() {
            if trt.is_nsaid() {
                entry.veto();
            }
        }
        return;
    }
    if settings.nsaids_equivalent {
        veto_class_together(table, Treatment::is_nsaid);
    }
}

/// Steroid class pass: the diabetes rule, then class equivalence.
pub fn apply_steroids(table: &mut WorkingTable, facts: &FactSet, settings: &SettingsRecord) {
    if !settings.pred_dm && facts.has(MedHistoryType::Diabetes) {
        for (trt, entry) in table.iter_mut() {
            if trt.is_steroid() {
                entry.veto();
            }
        }
        return;
    }
    if settings.steroids_equivalent {
        veto_class_together(table, Treatment::is_steroid);
    }
}

fn veto_class_together(table: &mut WorkingTable, in_class: impl Fn(&Treatment) -> bool) {
    let any_vetoed = table
        .iter()
        .any(|(trt, entry)| in_class(&trt) && entry.vetoed());
    if any_vetoed {
        for (trt, entry) in table.iter_mut() {
            if in_class(&trt) {
                entry.veto();
            }
        }
    }
}

/// HLA-B*58:01 pass, ULT only. A positive test always vetoes allopurinol;
/// with no test on file, the veto depends on ethnicity risk and policy.
pub fn apply_hlab5801(
    table: &mut WorkingTable,
    facts: &FactSet,
    settings: &SettingsRecord,
) -> Result<(), AidError> {
    if table.get(Treatment::Allopurinol).is_none() {
        return Ok(());
    }
    let policy = settings.ult_policy()?;
    let veto = match facts.hlab5801 {
        Some(true) => true,
        Some(false) => false,
        None => match facts.ethnicity {
            Some(eth) if eth.hlab5801_risk() => !policy.allo_risk_ethnicity_no_hlab5801,
            Some(_) => false,
            None => !policy.allo_no_ethnicity_no_hlab5801,
        },
    };
    if veto {
        debug!("allopurinol vetoed on HLA-B*58:01 risk");
        table.veto(Treatment::Allopurinol);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::DefaultsStore;
    use crate::models::enums::{Ethnicity, Gender};
    use crate::models::facts::{Demographics, MedAllergy, MedHistory};

    fn facts(medhistorys: Vec<MedHistory>) -> FactSet {
        FactSet::new(
            None,
            Demographics {
                age: Some(50),
                gender: Some(Gender::Male),
                ethnicity: None,
            },
            medhistorys,
            vec![],
            None,
        )
    }

    fn setup(trttype: TrtType) -> (WorkingTable, SettingsRecord, ContraMap) {
        let store = DefaultsStore::seeded();
        let table = WorkingTable::from_dosing(&store.resolve_default_treatments(None, trttype).unwrap());
        let settings = store.resolve_settings(None, trttype).unwrap();
        // Resolve against every history type so each test can reuse one map.
        let every_history: Vec<MedHistory> = MedHistoryType::ALL
            .iter()
            .map(|&t| MedHistory::new(t))
            .collect();
        let contras = store.resolve_default_contras(None, trttype, &every_history);
        (table, settings, contras)
    }

    type ContraMap = BTreeMap<(MedHistoryType, Treatment), Contraindication>;

    fn ckd(stage: Option<CkdStage>) -> MedHistory {
        MedHistory::ckd(Some(CkdDetail {
            stage,
            dialysis: false,
            dialysis_type: None,
            baseline_creatinine: None,
        }))
    }

    fn dialysis(dialysis_type: Option<DialysisType>) -> MedHistory {
        MedHistory::ckd(Some(CkdDetail {
            stage: Some(CkdStage::Five),
            dialysis: true,
            dialysis_type,
            baseline_creatinine: None,
        }))
    }

    #[test]
    fn chf_vetoes_all_nsaids_via_equivalence() {
        let (mut table, settings, contras) = setup(TrtType::Flare);
        let facts = facts(vec![MedHistory::new(MedHistoryType::Chf)]);
        apply_medhistorys(&mut table, &facts, &settings, TrtType::Flare, &contras).unwrap();
        apply_nsaids(&mut table, &facts, &settings);
        for &trt in Treatment::ALL {
            if trt.is_nsaid() {
                assert!(table.is_vetoed(trt), "{trt}");
            }
        }
        assert!(!table.is_vetoed(Treatment::Colchicine));
        assert!(!table.is_vetoed(Treatment::Prednisone));
    }

    #[test]
    fn independent_nsaids_veto_only_the_contraindicated_one() {
        let (mut table, mut settings, contras) = setup(TrtType::Flare);
        settings.nsaids_equivalent = false;
        // Allergy to one NSAID only.
        let facts = FactSet::new(
            None,
            Demographics {
                age: Some(50),
                gender: Some(Gender::Male),
                ethnicity: None,
            },
            vec![],
            vec![MedAllergy {
                treatment: Treatment::Ibuprofen,
            }],
            None,
        );
        apply_medhistorys(&mut table, &facts, &settings, TrtType::Flare, &contras).unwrap();
        apply_allergys(&mut table, &facts);
        apply_nsaids(&mut table, &facts, &settings);
        assert!(table.is_vetoed(Treatment::Ibuprofen));
        assert!(!table.is_vetoed(Treatment::Naproxen));
    }

    #[test]
    fn nsaid_age_rule_vetoes_past_cutoff() {
        let (mut table, mut settings, _) = setup(TrtType::Flare);
        settings.nsaid_age = false;
        let facts = FactSet::new(
            None,
            Demographics {
                age: Some(70),
                gender: Some(Gender::Male),
                ethnicity: None,
            },
            vec![],
            vec![],
            None,
        );
        apply_nsaids(&mut table, &facts, &settings);
        assert!(table.is_vetoed(Treatment::Naproxen));
        assert!(table.is_vetoed(Treatment::Celecoxib));
        assert!(!table.is_vetoed(Treatment::Prednisone));
    }

    #[test]
    fn steroid_equivalence_propagates_allergy() {
        let (mut table, settings, _) = setup(TrtType::Flare);
        let facts = FactSet::new(
            None,
            Demographics::default(),
            vec![],
            vec![MedAllergy {
                treatment: Treatment::Prednisone,
            }],
            None,
        );
        apply_allergys(&mut table, &facts);
        apply_steroids(&mut table, &facts, &settings);
        assert!(table.is_vetoed(Treatment::Methylprednisolone));
    }

    #[test]
    fn diabetes_vetoes_steroids_when_policy_forbids() {
        let (mut table, mut settings, _) = setup(TrtType::Ppx);
        settings.pred_dm = false;
        let facts = facts(vec![MedHistory::new(MedHistoryType::Diabetes)]);
        apply_steroids(&mut table, &facts, &settings);
        assert!(table.is_vetoed(Treatment::Prednisone));
        assert!(!table.is_vetoed(Treatment::Naproxen));
    }

    #[test]
    fn colchicine_ckd_stage3_halves_flare_ladder() {
        let (mut table, settings, contras) = setup(TrtType::Flare);
        let facts = facts(vec![ckd(Some(CkdStage::Three))]);
        apply_medhistorys(&mut table, &facts, &settings, TrtType::Flare, &contras).unwrap();
        let colch = table.get(Treatment::Colchicine).unwrap();
        assert!(!colch.vetoed());
        assert_eq!(colch.dose, Decimal::new(3, 1));
        assert_eq!(colch.dose2, Some(Decimal::new(6, 1)));
        assert_eq!(colch.dose3, Some(Decimal::new(3, 1)));
    }

    #[test]
    fn colchicine_early_ckd_is_untouched() {
        let (mut table, settings, contras) = setup(TrtType::Flare);
        let facts = facts(vec![ckd(Some(CkdStage::Two))]);
        apply_medhistorys(&mut table, &facts, &settings, TrtType::Flare, &contras).unwrap();
        let colch = table.get(Treatment::Colchicine).unwrap();
        assert!(!colch.vetoed());
        assert_eq!(colch.dose, Decimal::new(6, 1));
        assert_eq!(colch.dose2, Some(Decimal::new(12, 1)));
    }

    #[test]
    fn colchicine_ckd_without_dose_adjust_thins_schedule() {
        let (mut table, mut settings, contras) = setup(TrtType::Flare);
        settings.colch_dose_adjust = false;
        let facts = facts(vec![ckd(Some(CkdStage::Three))]);
        apply_medhistorys(&mut table, &facts, &settings, TrtType::Flare, &contras).unwrap();
        let colch = table.get(Treatment::Colchicine).unwrap();
        assert_eq!(colch.dose, Decimal::new(6, 1));
        assert_eq!(colch.dose2, Some(Decimal::new(6, 1)));
        assert_eq!(colch.freq, Freq::Qday);
    }

    #[test]
    fn colchicine_ppx_ckd_halves_single_dose() {
        let (mut table, settings, contras) = setup(TrtType::Ppx);
        let facts = facts(vec![ckd(Some(CkdStage::Three))]);
        apply_medhistorys(&mut table, &facts, &settings, TrtType::Ppx, &contras).unwrap();
        let colch = table.get(Treatment::Colchicine).unwrap();
        assert_eq!(colch.dose, Decimal::new(3, 1));
    }

    #[test]
    fn repeated_history_pass_leaves_table_unchanged() {
        let (mut table, settings, contras) = setup(TrtType::Flare);
        let facts = facts(vec![
            ckd(Some(CkdStage::Three)),
            MedHistory::new(MedHistoryType::Chf),
        ]);
        apply_medhistorys(&mut table, &facts, &settings, TrtType::Flare, &contras).unwrap();
        let once = table.clone();
        apply_medhistorys(&mut table, &facts, &settings, TrtType::Flare, &contras).unwrap();
        assert_eq!(table, once);
        // The reduced ladder stays put instead of shrinking further, and
        // every dose remains in the enumerated set.
        let colch = table.get(Treatment::Colchicine).unwrap();
        assert_eq!(colch.dose, Decimal::new(3, 1));
        assert_eq!(colch.dose2, Some(Decimal::new(6, 1)));
        assert_eq!(colch.dose3, Some(Decimal::new(3, 1)));
        let allowed = crate::catalog::allowed_doses(Treatment::Colchicine);
        for dose in [Some(colch.dose), colch.dose2, colch.dose3].into_iter().flatten() {
            assert!(allowed.contains(&dose), "{dose}");
        }
    }

    #[test]
    fn non_renal_dose_adjustment_never_vetoes() {
        let (mut table, settings, mut contras) = setup(TrtType::Flare);
        // Override records keying a dose adjustment to a non-renal history.
        contras.insert(
            (MedHistoryType::Hepatitis, Treatment::Colchicine),
            Contraindication::DoseAdj,
        );
        contras.insert(
            (MedHistoryType::Hepatitis, Treatment::Naproxen),
            Contraindication::DoseAdj,
        );
        let facts = facts(vec![MedHistory::new(MedHistoryType::Hepatitis)]);
        apply_medhistorys(&mut table, &facts, &settings, TrtType::Flare, &contras).unwrap();

        // No CKD on file: the renal colchicine rule must not engage, much
        // less veto; the generic path just drops to the adjusted dose.
        let colch = table.get(Treatment::Colchicine).unwrap();
        assert!(!colch.vetoed());
        assert_eq!(colch.dose, Decimal::new(6, 1));
        let naproxen = table.get(Treatment::Naproxen).unwrap();
        assert!(!naproxen.vetoed());
        assert_eq!(naproxen.dose, Decimal::from(250));
    }

    #[test]
    fn colchicine_ckd_stage4_is_absolute() {
        let (mut table, settings, contras) = setup(TrtType::Flare);
        let facts = facts(vec![ckd(Some(CkdStage::Four))]);
        apply_medhistorys(&mut table, &facts, &settings, TrtType::Flare, &contras).unwrap();
        assert!(table.is_vetoed(Treatment::Colchicine));
    }

    #[test]
    fn colchicine_ckd_unknown_stage_is_absolute() {
        let (mut table, settings, contras) = setup(TrtType::Flare);
        let facts = facts(vec![MedHistory::ckd(None)]);
        apply_medhistorys(&mut table, &facts, &settings, TrtType::Flare, &contras).unwrap();
        assert!(table.is_vetoed(Treatment::Colchicine));
    }

    #[test]
    fn allopurinol_ckd_stage3_drops_to_floor() {
        let (mut table, settings, contras) = setup(TrtType::Ult);
        let facts = facts(vec![ckd(Some(CkdStage::Three))]);
        apply_medhistorys(&mut table, &facts, &settings, TrtType::Ult, &contras).unwrap();
        let allo = table.get(Treatment::Allopurinol).unwrap();
        assert_eq!(allo.dose, Decimal::from(50));
        assert_eq!(allo.freq, Freq::Qday);
    }

    #[test]
    fn allopurinol_staged_dosing_when_fixed_dose_off() {
        let (mut table, mut settings, contras) = setup(TrtType::Ult);
        if let Some(ult) = settings.ult.as_mut() {
            ult.allo_ckd_fixed_dose = false;
        }
        let facts = facts(vec![ckd(Some(CkdStage::Four))]);
        apply_medhistorys(&mut table, &facts, &settings, TrtType::Ult, &contras).unwrap();
        let allo = table.get(Treatment::Allopurinol).unwrap();
        assert_eq!(allo.dose, Decimal::from(50));
        assert_eq!(allo.freq, Freq::Qotherday);
    }

    #[test]
    fn allopurinol_hemodialysis_doses_thrice_weekly() {
        let (mut table, settings, contras) = setup(TrtType::Ult);
        let facts = facts(vec![dialysis(Some(DialysisType::Hemodialysis))]);
        apply_medhistorys(&mut table, &facts, &settings, TrtType::Ult, &contras).unwrap();
        let allo = table.get(Treatment::Allopurinol).unwrap();
        assert_eq!(allo.dose, Decimal::from(50));
        assert_eq!(allo.freq, Freq::Tiw);
    }

    #[test]
    fn allopurinol_peritoneal_dialysis_doses_daily() {
        let (mut table, settings, contras) = setup(TrtType::Ult);
        let facts = facts(vec![dialysis(Some(DialysisType::Peritoneal))]);
        apply_medhistorys(&mut table, &facts, &settings, TrtType::Ult, &contras).unwrap();
        assert_eq!(
            table.get(Treatment::Allopurinol).unwrap().freq,
            Freq::Qday
        );
    }

    #[test]
    fn allopurinol_dialysis_vetoed_when_policy_forbids() {
        let (mut table, mut settings, contras) = setup(TrtType::Ult);
        if let Some(ult) = settings.ult.as_mut() {
            ult.allo_dialysis = false;
        }
        let facts = facts(vec![dialysis(None)]);
        apply_medhistorys(&mut table, &facts, &settings, TrtType::Ult, &contras).unwrap();
        assert!(table.is_vetoed(Treatment::Allopurinol));
    }

    #[test]
    fn febuxostat_ckd_gets_initial_dose() {
        let (mut table, settings, contras) = setup(TrtType::Ult);
        let facts = facts(vec![ckd(Some(CkdStage::Four))]);
        apply_medhistorys(&mut table, &facts, &settings, TrtType::Ult, &contras).unwrap();
        let febu = table.get(Treatment::Febuxostat).unwrap();
        assert_eq!(febu.dose, Decimal::from(20));
        assert!(!febu.vetoed());
    }

    #[test]
    fn febuxostat_early_ckd_unchanged() {
        let (mut table, settings, contras) = setup(TrtType::Ult);
        let facts = facts(vec![ckd(Some(CkdStage::Two))]);
        apply_medhistorys(&mut table, &facts, &settings, TrtType::Ult, &contras).unwrap();
        assert_eq!(
            table.get(Treatment::Febuxostat).unwrap().dose,
            Decimal::from(40)
        );
    }

    #[test]
    fn febuxostat_cv_disease_permitted_by_default_policy() {
        let (mut table, settings, contras) = setup(TrtType::Ult);
        let facts = facts(vec![MedHistory::new(MedHistoryType::HeartAttack)]);
        apply_medhistorys(&mut table, &facts, &settings, TrtType::Ult, &contras).unwrap();
        assert!(!table.is_vetoed(Treatment::Febuxostat));
    }

    #[test]
    fn febuxostat_cv_disease_vetoed_when_policy_forbids() {
        let (mut table, mut settings, contras) = setup(TrtType::Ult);
        if let Some(ult) = settings.ult.as_mut() {
            ult.febu_cv_disease = false;
        }
        let facts = facts(vec![MedHistory::new(MedHistoryType::HeartAttack)]);
        apply_medhistorys(&mut table, &facts, &settings, TrtType::Ult, &contras).unwrap();
        assert!(table.is_vetoed(Treatment::Febuxostat));
    }

    #[test]
    fn probenecid_ckd_stage_threshold() {
        let (mut table, settings, contras) = setup(TrtType::Ult);
        let facts_ok = facts(vec![ckd(Some(CkdStage::Two))]);
        apply_medhistorys(&mut table, &facts_ok, &settings, TrtType::Ult, &contras).unwrap();
        assert!(!table.is_vetoed(Treatment::Probenecid));

        let (mut table, settings, contras) = setup(TrtType::Ult);
        let facts_bad = facts(vec![ckd(Some(CkdStage::Three))]);
        apply_medhistorys(&mut table, &facts_bad, &settings, TrtType::Ult, &contras).unwrap();
        assert!(table.is_vetoed(Treatment::Probenecid));

        let (mut table, settings, contras) = setup(TrtType::Ult);
        let facts_unknown = facts(vec![MedHistory::ckd(None)]);
        apply_medhistorys(&mut table, &facts_unknown, &settings, TrtType::Ult, &contras).unwrap();
        assert!(table.is_vetoed(Treatment::Probenecid));
    }

    #[test]
    fn xoi_interaction_vetoes_both_xois() {
        let (mut table, settings, contras) = setup(TrtType::Ult);
        let facts = facts(vec![MedHistory::new(MedHistoryType::XoiInteraction)]);
        apply_medhistorys(&mut table, &facts, &settings, TrtType::Ult, &contras).unwrap();
        assert!(table.is_vetoed(Treatment::Allopurinol));
        assert!(table.is_vetoed(Treatment::Febuxostat));
        assert!(!table.is_vetoed(Treatment::Probenecid));
    }

    #[test]
    fn hlab5801_positive_vetoes_allopurinol() {
        let (mut table, settings, _) = setup(TrtType::Ult);
        let facts = FactSet::new(None, Demographics::default(), vec![], vec![], Some(true));
        apply_hlab5801(&mut table, &facts, &settings).unwrap();
        assert!(table.is_vetoed(Treatment::Allopurinol));
    }

    #[test]
    fn hlab5801_negative_clears_risk_ethnicity() {
        let (mut table, settings, _) = setup(TrtType::Ult);
        let facts = FactSet::new(
            None,
            Demographics {
                age: None,
                gender: None,
                ethnicity: Some(Ethnicity::HanChinese),
            },
            vec![],
            vec![],
            Some(false),
        );
        apply_hlab5801(&mut table, &facts, &settings).unwrap();
        assert!(!table.is_vetoed(Treatment::Allopurinol));
    }

    #[test]
    fn hlab5801_untested_risk_ethnicity_vetoes_by_default() {
        let (mut table, settings, _) = setup(TrtType::Ult);
        let facts = FactSet::new(
            None,
            Demographics {
                age: None,
                gender: None,
                ethnicity: Some(Ethnicity::Korean),
            },
            vec![],
            vec![],
            None,
        );
        apply_hlab5801(&mut table, &facts, &settings).unwrap();
        assert!(table.is_vetoed(Treatment::Allopurinol));
    }

    #[test]
    fn hlab5801_untested_low_risk_ethnicity_allowed() {
        // A recorded low-risk ethnicity clears allopurinol even when the
        // stricter no-ethnicity policy is in force.
        let (mut table, mut settings, _) = setup(TrtType::Ult);
        if let Some(ult) = settings.ult.as_mut() {
            ult.allo_no_ethnicity_no_hlab5801 = false;
        }
        let facts = FactSet::new(
            None,
            Demographics {
                age: None,
                gender: None,
                ethnicity: Some(Ethnicity::Hispanic),
            },
            vec![],
            vec![],
            None,
        );
        apply_hlab5801(&mut table, &facts, &settings).unwrap();
        assert!(!table.is_vetoed(Treatment::Allopurinol));
    }

    #[test]
    fn hlab5801_unknown_ethnicity_untested_allowed_by_default() {
        let (mut table, settings, _) = setup(TrtType::Ult);
        let facts = FactSet::new(None, Demographics::default(), vec![], vec![], None);
        apply_hlab5801(&mut table, &facts, &settings).unwrap();
        assert!(!table.is_vetoed(Treatment::Allopurinol));

        // Flipping the policy forbids it.
        let (mut table, mut settings, _) = setup(TrtType::Ult);
        if let Some(ult) = settings.ult.as_mut() {
            ult.allo_no_ethnicity_no_hlab5801 = false;
        }
        let facts = FactSet::new(None, Demographics::default(), vec![], vec![], None);
        apply_hlab5801(&mut table, &facts, &settings).unwrap();
        assert!(table.is_vetoed(Treatment::Allopurinol));
    }
}
