//! Decision snapshot codec. The finished working table, the treatment type,
//! and the recommendation are persisted as one JSON document so a stored
//! decision can be redisplayed without re-running the rules.
//!
//! Doses travel as decimal strings, normalized so that re-encoding a decoded
//! snapshot reproduces it byte for byte ("0.60" never survives a round
//! trip). Durations travel in the day-resolution form `P7DT00H00M00S`.
//! String values are checked against shape recognizers before parsing so a
//! corrupted document fails with a field-level error instead of a panic.

use std::str::FromStr;
use std::sync::LazyLock;

use chrono::TimeDelta;
use regex::Regex;
use rust_decimal::Decimal;
use serde_json::{json, Map, Value};

use crate::engine::table::{TrtDosing, TrtDosingFields, WorkingTable};
use crate::error::AidError;
use crate::models::enums::{Freq, Treatment, TrtType};

static DURATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^P(\d+)DT00H00M00S$").unwrap());

static DECIMAL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+(\.\d+)?$").unwrap());

/// A snapshot rehydrated from its persisted JSON form.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSnapshot {
    pub trttype: TrtType,
    pub table: WorkingTable,
    pub recommendation: Option<Treatment>,
}

fn dec_value(d: Decimal) -> Value {
    Value::String(d.normalize().to_string())
}

fn opt_dec_value(d: Option<Decimal>) -> Value {
    d.map(dec_value).unwrap_or(Value::Null)
}

fn dur_value(d: Option<TimeDelta>) -> Value {
    match d {
        Some(delta) => Value::String(format!("P{}DT00H00M00S", delta.num_days())),
        None => Value::Null,
    }
}

fn freq_value(f: Option<Freq>) -> Value {
    match f {
        Some(freq) => Value::String(freq.as_str().into()),
        None => Value::Null,
    }
}

/// Serialize a finished table to the persisted snapshot document.
pub fn encode(
    table: &WorkingTable,
    trttype: TrtType,
    recommendation: Option<Treatment>,
) -> Result<String, AidError> {
    let mut treatments = Map::new();
    for (trt, entry) in table.iter() {
        treatments.insert(
            trt.as_str().into(),
            json!({
                "dose": dec_value(entry.dose),
                "dose2": opt_dec_value(entry.dose2),
                "dose3": opt_dec_value(entry.dose3),
                "dose_adj": dec_value(entry.dose_adj),
                "max_dose": dec_value(entry.max_dose),
                "freq": freq_value(Some(entry.freq)),
                "freq2": freq_value(entry.freq2),
                "freq3": freq_value(entry.freq3),
                "duration": dur_value(entry.duration),
                "duration2": dur_value(entry.duration2),
                "duration3": dur_value(entry.duration3),
                "contra": entry.vetoed(),
            }),
        );
    }
    let doc = json!({
        "trttype": trttype.as_str(),
        "treatments": Value::Object(treatments),
        "recommendation": recommendation
            .map(|t| Value::String(t.as_str().into()))
            .unwrap_or(Value::Null),
    });
    Ok(serde_json::to_string(&doc)?)
}

fn bad(field: &str, detail: impl std::fmt::Display) -> AidError {
    AidError::Snapshot(format!("{field}: {detail}"))
}

fn parse_decimal(field: &str, s: &str) -> Result<Decimal, AidError> {
    if !DECIMAL_RE.is_match(s) {
        return Err(bad(field, format!("not a dose value: {s:?}")));
    }
    let d = Decimal::from_str(s).map_err(|e| bad(field, e))?;
    Ok(d.normalize())
}

fn parse_duration(field: &str, s: &str) -> Result<TimeDelta, AidError> {
    let caps = DURATION_RE
        .captures(s)
        .ok_or_else(|| bad(field, format!("not a duration value: {s:?}")))?;
    let days: i64 = caps[1].parse().map_err(|e| bad(field, e))?;
    TimeDelta::try_days(days).ok_or_else(|| bad(field, format!("duration out of range: {days} days")))
}

fn req_str<'a>(obj: &'a Map<String, Value>, field: &str) -> Result<&'a str, AidError> {
    obj.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| bad(field, "missing or not a string"))
}

fn opt_str<'a>(obj: &'a Map<String, Value>, field: &str) -> Result<Option<&'a str>, AidError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(bad(field, format!("unexpected value: {other}"))),
    }
}

fn req_decimal(obj: &Map<String, Value>, field: &str) -> Result<Decimal, AidError> {
    parse_decimal(field, req_str(obj, field)?)
}

fn opt_decimal(obj: &Map<String, Value>, field: &str) -> Result<Option<Decimal>, AidError> {
    opt_str(obj, field)?.map(|s| parse_decimal(field, s)).transpose()
}

fn opt_freq(obj: &Map<String, Value>, field: &str) -> Result<Option<Freq>, AidError> {
    opt_str(obj, field)?
        .map(|s| Freq::from_str(s).map_err(|e| bad(field, e)))
        .transpose()
}

fn opt_duration(obj: &Map<String, Value>, field: &str) -> Result<Option<TimeDelta>, AidError> {
    opt_str(obj, field)?.map(|s| parse_duration(field, s)).transpose()
}

fn decode_entry(trt: Treatment, value: &Value) -> Result<TrtDosing, AidError> {
    let obj = value
        .as_object()
        .ok_or_else(|| bad(trt.as_str(), "treatment entry is not an object"))?;
    let fields = TrtDosingFields {
        dose: req_decimal(obj, "dose")?,
        dose2: opt_decimal(obj, "dose2")?,
        dose3: opt_decimal(obj, "dose3")?,
        dose_adj: req_decimal(obj, "dose_adj")?,
        max_dose: req_decimal(obj, "max_dose")?,
        freq: Freq::from_str(req_str(obj, "freq")?).map_err(|e| bad("freq", e))?,
        freq2: opt_freq(obj, "freq2")?,
        freq3: opt_freq(obj, "freq3")?,
        duration: opt_duration(obj, "duration")?,
        duration2: opt_duration(obj, "duration2")?,
        duration3: opt_duration(obj, "duration3")?,
    };
    let contra = obj
        .get("contra")
        .and_then(Value::as_bool)
        .ok_or_else(|| bad("contra", "missing or not a boolean"))?;
    Ok(TrtDosing::rehydrate(fields, contra))
}

/// Parse a persisted snapshot document back into a working table.
pub fn decode(document: &str) -> Result<DecodedSnapshot, AidError> {
    let doc: Value = serde_json::from_str(document)?;
    let root = doc
        .as_object()
        .ok_or_else(|| bad("snapshot", "document is not an object"))?;

    let trttype =
        TrtType::from_str(req_str(root, "trttype")?).map_err(|e| bad("trttype", e))?;

    let treatments = root
        .get("treatments")
        .and_then(Value::as_object)
        .ok_or_else(|| bad("treatments", "missing or not an object"))?;
    let mut table = WorkingTable::default();
    for (name, entry) in treatments {
        let trt = Treatment::from_str(name).map_err(|e| bad("treatments", e))?;
        crate::catalog::validate_pair(trt, trttype)?;
        table.insert(trt, decode_entry(trt, entry)?);
    }

    let recommendation = match root.get("recommendation") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => {
            let trt = Treatment::from_str(s).map_err(|e| bad("recommendation", e))?;
            if table.get(trt).is_none() {
                return Err(bad("recommendation", format!("{trt} is not on the table")));
            }
            Some(trt)
        }
        Some(other) => return Err(bad("recommendation", format!("unexpected value: {other}"))),
    };

    Ok(DecodedSnapshot {
        trttype,
        table,
        recommendation,
    })
}
