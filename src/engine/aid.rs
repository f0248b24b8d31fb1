//! Evaluation orchestrator: facts in, finished table plus snapshot out.

use tracing::info;

use crate::defaults::DefaultsStore;
use crate::error::AidError;
use crate::extract::extract_facts;
use crate::models::enums::{Treatment, TrtType};
use crate::models::facts::AidSubject;
use crate::snapshot;

use super::recommend::select_recommendation;
use super::rules;
use super::table::{TrtDosing, WorkingTable};

/// Result of one evaluation: the finished working table, the selected
/// recommendation with its working dosing, and the persisted snapshot form.
#[derive(Debug, Clone, PartialEq)]
pub struct AidOutcome {
    pub trttype: TrtType,
    pub table: WorkingTable,
    pub recommendation: Option<(Treatment, TrtDosing)>,
    pub snapshot: String,
}

/// The decision-aid engine, parameterized only by a defaults store. Holds no
/// per-subject state; evaluations are independent and repeatable.
#[derive(Debug, Clone)]
pub struct AidEngine<'a> {
    defaults: &'a DefaultsStore,
}

impl<'a> AidEngine<'a> {
    pub fn new(defaults: &'a DefaultsStore) -> Self {
        Self { defaults }
    }

    /// Run the full pipeline for one subject and treatment type: extract
    /// facts, resolve configuration, build the working table, run every
    /// rule pass, select a recommendation, and encode the snapshot.
    pub fn evaluate(
        &self,
        subject: &AidSubject,
        trttype: TrtType,
    ) -> Result<AidOutcome, AidError> {
        let facts = extract_facts(subject)?;

        let settings = self.defaults.resolve_settings(facts.user, trttype)?;
        let dosing = self.defaults.resolve_default_treatments(facts.user, trttype)?;
        let contras =
            self.defaults
                .resolve_default_contras(facts.user, trttype, &facts.medhistorys);

        let mut table = WorkingTable::from_dosing(&dosing);
        rules::apply_medhistorys(&mut table, &facts, &settings, trttype, &contras)?;
        rules::apply_allergys(&mut table, &facts);
        match trttype {
            // The class passes only concern flare and prophylaxis tables;
            // a ULT table holds neither NSAIDs nor steroids.
            TrtType::Flare | TrtType::Ppx => {
                rules::apply_nsaids(&mut table, &facts, &settings);
                rules::apply_steroids(&mut table, &facts, &settings);
            }
            TrtType::Ult => rules::apply_hlab5801(&mut table, &facts, &settings)?,
        }

        let recommendation =
            select_recommendation(&table, &settings).map(|(trt, entry)| (trt, entry.clone()));
        let encoded = snapshot::encode(
            &table,
            trttype,
            recommendation.as_ref().map(|(trt, _)| *trt),
        )?;

        info!(
            subject = %subject.id,
            %trttype,
            options = table.options().len(),
            vetoed = table.not_options().len(),
            recommendation = recommendation
                .as_ref()
                .map(|(trt, _)| trt.as_str())
                .unwrap_or("none"),
            "evaluated decision aid"
        );

        Ok(AidOutcome {
            trttype,
            table,
            recommendation,
            snapshot: encoded,
        })
    }
}
