use geo::MultiPolygon;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;

/// Region identifier with loose equality: `"01001"`, `"1001"`, `1001` and
/// `1001.0` are the same region.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RegionId {
    Code(i64),
    Label(String),
}

impl RegionId {
    /// Canonicalize a JSON identifier. Booleans, null and containers have no
    /// identity and yield `None`.
    pub fn from_json(value: &Value) -> Option<RegionId> {
        match value {
            Value::Number(n) => {
                if let Some(code) = n.as_i64() {
                    Some(RegionId::Code(code))
                } else {
                    n.as_f64().map(RegionId::from_f64)
                }
            }
            Value::String(s) => Some(RegionId::parse(s)),
            _ => None,
        }
    }

    pub fn parse(text: &str) -> RegionId {
        let trimmed = text.trim();
        if let Ok(code) = trimmed.parse::<i64>() {
            return RegionId::Code(code);
        }
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() => RegionId::from_f64(v),
            _ => RegionId::Label(trimmed.to_string()),
        }
    }

    fn from_f64(v: f64) -> RegionId {
        if v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
            RegionId::Code(v as i64)
        } else {
            RegionId::Label(v.to_string())
        }
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionId::Code(c) => write!(f, "{}", c),
            RegionId::Label(s) => f.write_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for RegionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        RegionId::from_json(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid region identifier: {}", value)))
    }
}

/// One row of the education statistics table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatRecord {
    #[serde(rename = "fips")]
    pub id: RegionId,
    #[serde(rename = "area_name")]
    pub name: String,
    #[serde(rename = "state")]
    pub parent: String,
    #[serde(rename = "bachelorsOrHigher", default, deserialize_with = "lenient_number")]
    pub attainment: Option<f64>,
}

// Missing or non-numeric values become None, never zero.
fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(number.filter(|v| v.is_finite()))
}

/// A county shape with its (optional) statistics attached.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionFeature {
    pub id: Option<RegionId>,
    pub geometry: MultiPolygon<f64>,
    pub stat: Option<StatRecord>,
}

impl RegionFeature {
    /// Attainment value when a record with a numeric value is attached.
    pub fn attainment(&self) -> Option<f64> {
        self.stat.as_ref().and_then(|s| s.attainment)
    }
}
