// Records returned by the service. Field names follow the service's
// PascalCase JSON; timestamps and flags are normalized on the way in so
// callers only ever see `DateTime<Utc>` and `bool`.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    #[serde(rename = "RouteID")]
    pub route_id: i64,
    #[serde(rename = "Label", default)]
    pub label: String,
    #[serde(rename = "HiddenOnDevice", default, deserialize_with = "flag")]
    pub hidden_on_device: bool,
    #[serde(rename = "ShowOnMapShare", default, deserialize_with = "flag")]
    pub show_on_map_share: bool,
    #[serde(rename = "CreatedDate", deserialize_with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "ModifiedDate", deserialize_with = "timestamp")]
    pub modified_at: DateTime<Utc>,
}

/// A waypoint. Only the id is fixed; everything else the service sends is
/// kept as-is in `fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    #[serde(rename = "WaypointID")]
    pub waypoint_id: i64,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl Waypoint {
    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.fields.get(name)
    }
}

/// One route created by a bulk import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    #[serde(rename = "RouteID")]
    pub route_id: i64,
    #[serde(rename = "Label", default)]
    pub label: String,
}

/// Parse a service timestamp. Accepts the `/Date(ms)/` form (with an
/// optional `+hhmm` offset suffix, which does not change the instant),
/// RFC 3339, and naive ISO-8601 taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Some(inner) = value
        .strip_prefix("/Date(")
        .and_then(|rest| rest.strip_suffix(")/"))
    {
        // the sign of the offset can't be confused with a negative epoch
        let offset = inner
            .get(1..)
            .and_then(|rest| rest.find(|c: char| c == '+' || c == '-'));
        let millis = match offset {
            Some(i) => &inner[..=i],
            None => inner,
        };
        let millis: i64 = millis.parse().ok()?;
        return Utc.timestamp_millis_opt(millis).single();
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

fn timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp `{raw}`")))
}

fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
        Null(()),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => Ok(b),
        Flag::Null(()) => Ok(false),
        Flag::Text(s) => match s.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" | "" => Ok(false),
            other => Err(serde::de::Error::custom(format!("invalid flag `{other}`"))),
        },
    }
}
