//! AI threat-analysis intake
//!
//! The assistant replies with free text that should contain one JSON object
//! `{"threats": [...]}`. Everything in it is untrusted: the object is cut
//! out of the reply, every suggestion is checked on its own, and a bad
//! suggestion is rejected with a reason instead of failing the batch.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use risk_engine::validator::validate_value;
use risk_engine::FactorSource;
use types::risk::{Factor, RiskFactors};
use types::threat::{NewRemediation, NewThreat};

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("AI response contains no JSON object")]
    NoJsonObject,

    #[error("Malformed AI response: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// A suggestion that could not be turned into a threat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedThreat {
    /// Position in the reply's `threats` array
    pub index: usize,
    pub title: Option<String>,
    pub reason: String,
}

/// Outcome of parsing one AI reply
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiAnalysis {
    /// Suggestions ready for `ThreatStore::create_threat`, in reply order
    pub accepted: Vec<NewThreat>,
    pub rejected: Vec<RejectedThreat>,
}

impl AiAnalysis {
    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty() && self.rejected.is_empty()
    }
}

#[derive(Deserialize)]
struct RawAnalysis {
    #[serde(default)]
    threats: Option<Vec<Value>>,
}

#[derive(Deserialize)]
struct RawThreat {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, rename = "type")]
    category: Option<Value>,
    /// Older replies name the field `categories`; `type` wins when both
    /// are present.
    #[serde(default)]
    categories: Option<Value>,
    #[serde(default)]
    remediation: Option<RawRemediation>,
    #[serde(default)]
    risk: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRemediation {
    Text(String),
    Detailed {
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        control_tags: Option<Vec<String>>,
    },
}

/// Parse an assistant reply.
///
/// Takes the text from the first `{` to the last `}`. A missing `threats`
/// field means no suggestions.
pub fn parse_ai_response(text: &str) -> Result<AiAnalysis, IntakeError> {
    let start = text.find('{').ok_or(IntakeError::NoJsonObject)?;
    let end = text.rfind('}').ok_or(IntakeError::NoJsonObject)?;
    if end < start {
        return Err(IntakeError::NoJsonObject);
    }

    let raw: RawAnalysis = serde_json::from_str(&text[start..=end])?;
    let mut analysis = AiAnalysis::default();

    for (index, value) in raw.threats.unwrap_or_default().into_iter().enumerate() {
        let title = value.get("title").and_then(Value::as_str).map(str::to_string);
        match serde_json::from_value::<RawThreat>(value)
            .map_err(|err| err.to_string())
            .and_then(into_new_threat)
        {
            Ok(threat) => analysis.accepted.push(threat),
            Err(reason) => analysis.rejected.push(RejectedThreat {
                index,
                title,
                reason,
            }),
        }
    }

    Ok(analysis)
}

fn into_new_threat(raw: RawThreat) -> Result<NewThreat, String> {
    let risk = match raw.risk {
        Some(map) => Some(parse_factors(&map)?),
        None => None,
    };

    let remediation = raw.remediation.map(|remediation| match remediation {
        RawRemediation::Text(description) => NewRemediation {
            description: Some(description),
            control_tags: Vec::new(),
        },
        RawRemediation::Detailed {
            description,
            control_tags,
        } => NewRemediation {
            description,
            control_tags: control_tags.unwrap_or_default(),
        },
    });

    Ok(NewThreat {
        title: raw.title,
        description: raw.description,
        category: raw
            .category
            .as_ref()
            .and_then(category_text)
            .or_else(|| raw.categories.as_ref().and_then(category_text)),
        risk,
        remediation,
    })
}

/// Category as text; a list of names is joined so the normalizer can pick
/// the first recognizable one.
fn category_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Array(items) => {
            let names: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            (!names.is_empty()).then(|| names.join(", "))
        }
        _ => None,
    }
}

/// Read and validate factor values against the OWASP option sets.
///
/// Unknown keys are ignored; `null` leaves a factor unset.
fn parse_factors(map: &Map<String, Value>) -> Result<RiskFactors, String> {
    let mut risk = RiskFactors::default();
    for factor in Factor::ALL {
        let Some(value) = map.get(factor.name()) else {
            continue;
        };
        let Some(number) = factor_number(value)? else {
            continue;
        };
        validate_value(factor, number, FactorSource::Ai).map_err(|err| err.to_string())?;
        risk.set(factor, Some(number));
    }
    Ok(risk)
}

/// A factor value as an integer; numeric strings such as `"5"` are accepted.
fn factor_number(value: &Value) -> Result<Option<u8>, String> {
    let parsed = match value {
        Value::Null => return Ok(None),
        Value::Number(number) => number.as_u64().or_else(|| {
            number
                .as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                .map(|f| f as u64)
        }),
        Value::String(text) => text.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed
        .and_then(|n| u8::try_from(n).ok())
        .map(Some)
        .ok_or_else(|| format!("expected an integer factor value, got {value}"))
}
