//! Worker record data model
//!
//! One JSON document per worker describes its identity, control state and
//! health. Workers write these records themselves; the coordinator only
//! mutates the control status during stop requests. Unknown fields are
//! preserved across read-modify-write so a coordinator write never destroys
//! worker-owned state.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Run/stop state advertised in a worker's control section.
///
/// Workers may write custom states; those round-trip through `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BotStatus {
    Active,
    Inactive,
    Paused,
    Exit,
    Other(String),
}

impl BotStatus {
    pub fn as_str(&self) -> &str {
        match self {
            BotStatus::Active => "active",
            BotStatus::Inactive => "inactive",
            BotStatus::Paused => "paused",
            BotStatus::Exit => "exit",
            BotStatus::Other(raw) => raw,
        }
    }
}

impl From<String> for BotStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "active" => BotStatus::Active,
            "inactive" => BotStatus::Inactive,
            "paused" => BotStatus::Paused,
            "exit" => BotStatus::Exit,
            _ => BotStatus::Other(raw),
        }
    }
}

impl From<&str> for BotStatus {
    fn from(raw: &str) -> Self {
        BotStatus::from(raw.to_string())
    }
}

impl From<BotStatus> for String {
    fn from(status: BotStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for BotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Control section of a worker record.
///
/// `status` is the authoritative run/stop signal; `watchdog_ping` is the
/// heartbeat a live worker refreshes periodically (absent until the first
/// heartbeat after start).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotControl {
    pub status: BotStatus,
    #[serde(with = "micro_ts")]
    pub started: NaiveDateTime,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "micro_ts_opt"
    )]
    pub watchdog_ping: Option<NaiveDateTime>,
    /// Worker-owned control fields we do not interpret (startmethod, manual
    /// sell flags, ...). Carried verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BotControl {
    pub fn new(status: BotStatus, started: NaiveDateTime) -> Self {
        Self {
            status,
            started,
            watchdog_ping: None,
            extra: Map::new(),
        }
    }
}

/// One worker's persisted state record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerRecord {
    #[serde(default)]
    pub exchange: String,
    /// Open-position marker; blank or absent means the worker is flat.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub botcontrol: Option<BotControl>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorkerRecord {
    /// Whether the worker reports an open position (non-blank `margin`).
    pub fn has_open_position(&self) -> bool {
        self.margin
            .as_deref()
            .map(|m| !m.trim().is_empty())
            .unwrap_or(false)
    }
}

/// Timestamps on disk use the worker's own format: ISO-8601 with microsecond
/// precision and no timezone (e.g. `2024-03-01T09:15:00.000123`).
pub(crate) mod micro_ts {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(crate) const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";
    // Lenient on parse: accept any fractional-second width, including none.
    pub(crate) const PARSE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    pub fn serialize<S>(dt: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&dt.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, PARSE_FORMAT).map_err(serde::de::Error::custom)
    }
}

pub(crate) mod micro_ts_opt {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::micro_ts;

    pub fn serialize<S>(dt: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match dt {
            Some(dt) => serializer.serialize_str(&dt.format(micro_ts::FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        raw.map(|s| {
            NaiveDateTime::parse_from_str(&s, micro_ts::PARSE_FORMAT)
                .map_err(serde::de::Error::custom)
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for raw in ["active", "inactive", "paused", "exit", "scanning"] {
            let status = BotStatus::from(raw);
            assert_eq!(String::from(status.clone()), raw);
        }
        assert_eq!(BotStatus::from("scanning"), BotStatus::Other("scanning".into()));
    }

    #[test]
    fn test_record_round_trip_preserves_unknown_fields() {
        let raw = r#"{
            "exchange": "binance",
            "margin": " ",
            "buy_count": 3,
            "botcontrol": {
                "status": "active",
                "started": "2024-03-01T09:15:00.000123",
                "watchdog_ping": "2024-03-01T09:20:00.500000",
                "startmethod": "telegram"
            }
        }"#;

        let record: WorkerRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.exchange, "binance");
        assert!(!record.has_open_position());
        let control = record.botcontrol.as_ref().unwrap();
        assert_eq!(control.status, BotStatus::Active);
        assert!(control.watchdog_ping.is_some());
        assert_eq!(control.extra["startmethod"], "telegram");
        assert_eq!(record.extra["buy_count"], 3);

        let encoded = serde_json::to_string(&record).unwrap();
        let reread: WorkerRecord = serde_json::from_str(&encoded).unwrap();
        assert_eq!(record, reread);
        assert!(encoded.contains("2024-03-01T09:15:00.000123"));
    }

    #[test]
    fn test_missing_control_and_blank_margin() {
        let record: WorkerRecord = serde_json::from_str(r#"{"exchange": "kraken"}"#).unwrap();
        assert!(record.botcontrol.is_none());
        assert!(!record.has_open_position());

        let open: WorkerRecord =
            serde_json::from_str(r#"{"exchange": "kraken", "margin": "12.5%"}"#).unwrap();
        assert!(open.has_open_position());
    }

    #[test]
    fn test_timestamp_parse_without_fraction() {
        let control: BotControl = serde_json::from_str(
            r#"{"status": "active", "started": "2024-03-01T09:15:00"}"#,
        )
        .unwrap();
        assert_eq!(control.watchdog_ping, None);
        assert_eq!(control.started.and_utc().timestamp_subsec_micros(), 0);
    }
}
