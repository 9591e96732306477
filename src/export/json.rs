//! JSON snapshot of the ledger. Export writes the activities verbatim; import checks the shape of
//! every element before anything is deserialized, so a bad file never reaches the ledger.

use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use crate::ledger::{entities::Activity, Ledger};

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("expected a list of activities")]
    NotAnArray,
    #[error("activity #{index} is malformed: {reason}")]
    Validation { index: usize, reason: String },
}

pub fn export_json(ledger: &Ledger) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(ledger.activities())
}

#[instrument(skip(raw), fields(bytes = raw.len()))]
pub fn import_json(raw: &str) -> Result<Ledger, ImportError> {
    let mut value: Value = serde_json::from_str(raw)?;
    validate(&value).inspect_err(|e| warn!("Rejected import: {e}"))?;
    normalize_elapsed(&mut value);

    let activities: Vec<Activity> = serde_json::from_value(value)?;
    let ledger = Ledger::from_activities(activities).map_err(|e| ImportError::Validation {
        index: e.index,
        reason: e.to_string(),
    })?;
    debug!("Imported {} activities", ledger.len());
    Ok(ledger)
}

/// Checks the shape of an import payload. `startTimes`/`endTimes` may be missing, older exports
/// did not have them.
pub fn validate(value: &Value) -> Result<(), ImportError> {
    let Value::Array(items) = value else {
        return Err(ImportError::NotAnArray);
    };
    for (index, item) in items.iter().enumerate() {
        validate_activity(item).map_err(|reason| ImportError::Validation { index, reason })?;
    }
    Ok(())
}

fn validate_activity(item: &Value) -> Result<(), String> {
    let Value::Object(fields) = item else {
        return Err("expected an object".into());
    };

    let id = required(fields, "id")?;
    if !id.as_u64().is_some_and(|v| u32::try_from(v).is_ok()) {
        return Err("`id` must be a non-negative integer".into());
    }
    if !required(fields, "name")?.is_string() {
        return Err("`name` must be a string".into());
    }
    if whole_seconds(required(fields, "time")?).is_none() {
        return Err(
            "`time` must be a whole, non-negative number of seconds, fractions are not accepted"
                .into(),
        );
    }
    for key in ["totalPauseTime", "totalTime"] {
        if !required(fields, key)?.is_number() {
            return Err(format!("`{key}` must be a number"));
        }
    }

    let Value::Array(comments) = required(fields, "comments")? else {
        return Err("`comments` must be a list".into());
    };
    for (position, comment) in comments.iter().enumerate() {
        let well_formed = comment.as_object().is_some_and(|comment| {
            comment.get("text").is_some_and(Value::is_string)
                && comment.get("timestamp").is_some_and(Value::is_string)
        });
        if !well_formed {
            return Err(format!(
                "comment {position} must have string `text` and `timestamp`"
            ));
        }
    }

    for key in ["startTimes", "endTimes"] {
        match fields.get(key) {
            None => {}
            Some(Value::Array(values)) if values.iter().all(Value::is_string) => {}
            Some(_) => return Err(format!("`{key}` must be a list of strings")),
        }
    }
    Ok(())
}

/// `time` counts ticks. `40` and `40.0` are the same count, `40.5` is not a count.
fn whole_seconds(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|v| *v >= 0. && v.fract() == 0. && *v <= u64::MAX as f64)
            .map(|v| v as u64)
    })
}

/// Rewrites whole-valued float `time` fields as integers so they deserialize into the counter.
fn normalize_elapsed(value: &mut Value) {
    let Value::Array(items) = value else {
        return;
    };
    for item in items {
        if let Some(time) = item.get_mut("time") {
            if let Some(seconds) = whole_seconds(time) {
                *time = Value::from(seconds);
            }
        }
    }
}

fn required<'a>(fields: &'a Map<String, Value>, key: &str) -> Result<&'a Value, String> {
    fields.get(key).ok_or_else(|| format!("missing `{key}`"))
}
