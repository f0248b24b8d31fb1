//! Flare scoring sub-engine: scores a symptom episode for gout prevalence,
//! collects features arguing against gout, and combines both into a
//! diagnostic likelihood.

use chrono::{NaiveDate, TimeDelta};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use serde::de::Error as _;

use crate::error::AidError;
use crate::models::enums::{str_enum, Gender};
use crate::models::facts::FactSet;

str_enum!(Joint {
    Mtp1R => "MTP1R",
    Mtp1L => "MTP1L",
    FootR => "RFOOT",
    FootL => "LFOOT",
    AnkleR => "ANKLER",
    AnkleL => "ANKLEL",
    KneeR => "KNEER",
    KneeL => "KNEEL",
    HipR => "HIPR",
    HipL => "HIPL",
    HandR => "RHAND",
    HandL => "LHAND",
    WristR => "WRISTR",
    WristL => "WRISTL",
    ElbowR => "ELBOWR",
    ElbowL => "ELBOWL",
    ShoulderR => "SHOULDERR",
    ShoulderL => "SHOULDERL",
});

/// Joints where gout flares typically occur. Hips and shoulders are the
/// notable exclusions; involvement limited to them argues against gout.
pub const COMMON_GOUT_JOINTS: &[Joint] = &[
    Joint::Mtp1R,
    Joint::Mtp1L,
    Joint::FootR,
    Joint::FootL,
    Joint::AnkleR,
    Joint::AnkleL,
    Joint::KneeR,
    Joint::KneeL,
    Joint::HandR,
    Joint::HandL,
    Joint::WristR,
    Joint::WristL,
    Joint::ElbowR,
    Joint::ElbowL,
];

str_enum!(Prevalence {
    Low => "LOW",
    Medium => "MEDIUM",
    High => "HIGH",
});

str_enum!(Likelihood {
    Unlikely => "UNLIKELY",
    Equivocal => "EQUIVOCAL",
    Likely => "LIKELY",
});

str_enum!(LessLikely {
    Female => "FEMALE",
    TooYoung => "TOOYOUNG",
    TooLong => "TOOLONG",
    TooShort => "TOOSHORT",
    Joints => "JOINTS",
    NegCrystals => "NEGCRYSTALS",
});

/// Serum urate above this level scores as hyperuricemic.
const URATE_CUTOFF: Decimal = Decimal::from_parts(588, 0, 0, false, 2);

/// Episode duration at or past this many days argues against gout.
const DURATION_TOO_LONG_DAYS: i64 = 14;
/// A completed episode at or under this many days argues against gout.
const DURATION_TOO_SHORT_DAYS: i64 = 2;
/// Age below this in a female patient argues against gout, short of
/// documented menopause or CKD.
const FEMALE_UNLIKELY_AGE: u32 = 45;
const ADULT_AGE: u32 = 18;

/// One symptom episode under assessment. Dates are calendar-level; an open
/// episode has no end date and its duration runs to the assessment day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlareEpisode {
    pub date_started: NaiveDate,
    pub date_ended: Option<NaiveDate>,
    /// Symptoms reached their worst within a day of onset.
    pub onset: bool,
    pub redness: bool,
    pub joints: Vec<Joint>,
    /// Serum urate drawn during the episode, mg/dL.
    pub urate: Option<Decimal>,
    /// Synovial fluid crystal analysis result, when aspirated.
    pub crystal_analysis: Option<bool>,
    /// Clinician's impression that this is gout, when one was recorded.
    pub diagnosed: Option<bool>,
}

/// Scored assessment of one episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlareAssessment {
    pub points: Decimal,
    pub prevalence: Prevalence,
    pub less_likelys: Vec<LessLikely>,
    pub likelihood: Likelihood,
    #[serde(with = "duration_days")]
    pub duration: TimeDelta,
}

mod duration_days {
    use super::*;

    pub fn serialize<S: Serializer>(d: &TimeDelta, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(d.num_days())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<TimeDelta, D::Error> {
        let days = i64::deserialize(deserializer)?;
        if days < 0 {
            return Err(D::Error::custom("negative duration"));
        }
        TimeDelta::try_days(days).ok_or_else(|| D::Error::custom("duration out of range"))
    }
}

fn prevalence_points(episode: &FlareEpisode, facts: &FactSet) -> Decimal {
    let mut points = Decimal::ZERO;
    if facts.gender == Some(Gender::Male) {
        points += Decimal::from(2);
    }
    if facts.gout() {
        points += Decimal::from(2);
    }
    if episode.onset {
        points += Decimal::new(5, 1);
    }
    if episode.redness {
        points += Decimal::ONE;
    }
    if episode
        .joints
        .iter()
        .any(|j| matches!(j, Joint::Mtp1R | Joint::Mtp1L))
    {
        points += Decimal::new(25, 1);
    }
    if facts.cv_disease_or_hypertension() {
        points += Decimal::new(15, 1);
    }
    if episode.urate.is_some_and(|u| u > URATE_CUTOFF) {
        points += Decimal::new(35, 1);
    }
    points
}

fn prevalence_from_points(points: Decimal) -> Prevalence {
    if points >= Decimal::from(8) {
        Prevalence::High
    } else if points >= Decimal::from(4) {
        Prevalence::Medium
    } else {
        Prevalence::Low
    }
}

fn collect_less_likelys(
    episode: &FlareEpisode,
    facts: &FactSet,
    duration: TimeDelta,
) -> Vec<LessLikely> {
    let mut found = Vec::new();
    if facts.gender == Some(Gender::Female)
        && facts.age.is_some_and(|age| age < FEMALE_UNLIKELY_AGE)
        && !facts.menopause()
        && facts.ckd().is_none()
    {
        found.push(LessLikely::Female);
    }
    if facts.age.is_some_and(|age| age < ADULT_AGE) {
        found.push(LessLikely::TooYoung);
    }
    if duration.num_days() >= DURATION_TOO_LONG_DAYS {
        found.push(LessLikely::TooLong);
    }
    if episode.date_ended.is_some() && duration.num_days() <= DURATION_TOO_SHORT_DAYS {
        found.push(LessLikely::TooShort);
    }
    if !episode
        .joints
        .iter()
        .any(|j| COMMON_GOUT_JOINTS.contains(j))
    {
        found.push(LessLikely::Joints);
    }
    if episode.crystal_analysis == Some(false) {
        found.push(LessLikely::NegCrystals);
    }
    found
}

/// Score one episode against the subject's facts.
///
/// A clinician diagnosis paired with a crystal analysis result is decisive
/// in either direction; a diagnosis without an aspiration carries no extra
/// weight and the episode is scored like any other. Fails when the episode's
/// end date precedes its start.
pub fn assess(
    episode: &FlareEpisode,
    facts: &FactSet,
    today: NaiveDate,
) -> Result<FlareAssessment, AidError> {
    let end = episode.date_ended.unwrap_or(today);
    let duration = end - episode.date_started;
    if duration < TimeDelta::zero() {
        return Err(AidError::InvalidEnum {
            field: "flare dates".into(),
            value: format!("episode ends {end} before it starts {}", episode.date_started),
        });
    }

    let points = prevalence_points(episode, facts);
    let prevalence = prevalence_from_points(points);
    let less_likelys = collect_less_likelys(episode, facts, duration);

    let likelihood = match (episode.diagnosed, episode.crystal_analysis) {
        (Some(true), Some(true)) => Likelihood::Likely,
        (Some(true), Some(false)) => Likelihood::Unlikely,
        _ => match (prevalence, less_likelys.is_empty()) {
            (Prevalence::High, true) => Likelihood::Likely,
            (Prevalence::High, false) | (Prevalence::Medium, true) => Likelihood::Equivocal,
            (Prevalence::Medium, false) | (Prevalence::Low, _) => Likelihood::Unlikely,
        },
    };

    debug!(%points, %prevalence, %likelihood, less_likelys = less_likelys.len(), "assessed flare");

    Ok(FlareAssessment {
        points,
        prevalence,
        less_likelys,
        likelihood,
        duration,
    })
}
