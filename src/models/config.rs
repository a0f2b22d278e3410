//! Persisted test configuration.
//!
//! The on-disk shape is a flat JSON object that operators are expected to
//! edit by hand, so every field is decoded leniently: a missing or mistyped
//! value falls back to its default instead of failing the whole load.

use chrono::Local;
use log::warn;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};

use crate::error::{HarnessError, HarnessResult};
use crate::evaluation::parse_load;

use super::FieldKey;

pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Rated capacity in tonnes.
///
/// Holds the raw text only while it does not parse; once a value parses it is
/// always stored as a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Capacity {
    Tonnes(f64),
    Text(String),
}

impl Default for Capacity {
    fn default() -> Self {
        Capacity::Text(String::new())
    }
}

impl Capacity {
    pub fn from_input(raw: &str) -> Self {
        match parse_load(raw) {
            Some(value) => Capacity::Tonnes(value),
            None => Capacity::Text(raw.to_string()),
        }
    }

    pub fn tonnes(&self) -> Option<f64> {
        match self {
            Capacity::Tonnes(value) if value.is_finite() => Some(*value),
            _ => None,
        }
    }

    fn normalized(self) -> Self {
        match self {
            Capacity::Text(text) => Capacity::from_input(&text),
            number => number,
        }
    }
}

impl std::fmt::Display for Capacity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capacity::Tonnes(value) => write!(f, "{value}"),
            Capacity::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Signatory {
    #[serde(deserialize_with = "lenient")]
    pub name: String,
    #[serde(deserialize_with = "lenient")]
    pub designation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(deserialize_with = "lenient")]
    pub com_port: String,
    #[serde(deserialize_with = "lenient_baud_rate")]
    pub baud_rate: u32,
    #[serde(deserialize_with = "lenient")]
    pub date: String,
    #[serde(deserialize_with = "lenient")]
    pub equipment_name: String,
    #[serde(deserialize_with = "lenient")]
    pub equipment_make: String,
    #[serde(deserialize_with = "lenient_capacity")]
    pub capacity_t: Capacity,
    #[serde(deserialize_with = "lenient")]
    pub conducted_by: Signatory,
    #[serde(deserialize_with = "lenient")]
    pub approved_by: Signatory,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            com_port: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            date: String::new(),
            equipment_name: String::new(),
            equipment_make: String::new(),
            capacity_t: Capacity::default(),
            conducted_by: Signatory::default(),
            approved_by: Signatory::default(),
        }
    }
}

impl Config {
    pub fn capacity(&self) -> Option<f64> {
        self.capacity_t.tonnes()
    }

    /// Applies one edit from the presentation layer.
    ///
    /// A baud rate that does not parse is rejected and the previous value kept.
    /// Session-only keys are not part of the config and are rejected.
    pub fn apply(&mut self, key: FieldKey, value: &str) -> HarnessResult<()> {
        match key {
            FieldKey::ComPort => self.com_port = value.to_string(),
            FieldKey::BaudRate => self.baud_rate = parse_baud_rate(value)?,
            FieldKey::Date => self.date = value.to_string(),
            FieldKey::EquipmentName => self.equipment_name = value.to_string(),
            FieldKey::EquipmentMake => self.equipment_make = value.to_string(),
            FieldKey::CapacityT => self.capacity_t = Capacity::from_input(value),
            FieldKey::ConductedByName => self.conducted_by.name = value.to_string(),
            FieldKey::ConductedByDesignation => self.conducted_by.designation = value.to_string(),
            FieldKey::ApprovedByName => self.approved_by.name = value.to_string(),
            FieldKey::ApprovedByDesignation => self.approved_by.designation = value.to_string(),
            FieldKey::TestLoad | FieldKey::LoadCellValue | FieldKey::Duration => {
                return Err(HarnessError::UnknownField(key.as_str().to_string()))
            }
        }
        Ok(())
    }

    /// Text form of a persisted field, for seeding input widgets.
    pub fn field(&self, key: FieldKey) -> Option<String> {
        let value = match key {
            FieldKey::ComPort => self.com_port.clone(),
            FieldKey::BaudRate => self.baud_rate.to_string(),
            FieldKey::Date => self.date.clone(),
            FieldKey::EquipmentName => self.equipment_name.clone(),
            FieldKey::EquipmentMake => self.equipment_make.clone(),
            FieldKey::CapacityT => self.capacity_t.to_string(),
            FieldKey::ConductedByName => self.conducted_by.name.clone(),
            FieldKey::ConductedByDesignation => self.conducted_by.designation.clone(),
            FieldKey::ApprovedByName => self.approved_by.name.clone(),
            FieldKey::ApprovedByDesignation => self.approved_by.designation.clone(),
            FieldKey::TestLoad | FieldKey::LoadCellValue | FieldKey::Duration => return None,
        };
        Some(value)
    }

    /// Stamps today's local date as `YYYY-MM-DD` and returns it.
    pub fn set_date_today(&mut self) -> String {
        let today = Local::now().format("%Y-%m-%d").to_string();
        self.date = today.clone();
        today
    }
}

pub fn parse_baud_rate(value: &str) -> HarnessResult<u32> {
    value
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|baud| *baud > 0)
        .ok_or_else(|| HarnessError::Parse {
            field: FieldKey::BaudRate.as_str().to_string(),
            value: value.to_string(),
        })
}

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => Ok(parsed),
        Err(err) => {
            warn!("Ignoring unusable config value {value}: {err}");
            Ok(T::default())
        }
    }
}

fn lenient_baud_rate<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let parsed = match &value {
        serde_json::Value::Number(number) => number
            .as_u64()
            .and_then(|baud| u32::try_from(baud).ok())
            .filter(|baud| *baud > 0),
        serde_json::Value::String(text) => parse_baud_rate(text).ok(),
        _ => None,
    };

    Ok(parsed.unwrap_or_else(|| {
        warn!("Ignoring unusable baud_rate {value}; using {DEFAULT_BAUD_RATE}");
        DEFAULT_BAUD_RATE
    }))
}

fn lenient_capacity<'de, D>(deserializer: D) -> Result<Capacity, D::Error>
where
    D: Deserializer<'de>,
{
    let capacity: Capacity = lenient(deserializer)?;
    Ok(capacity.normalized())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_takes_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.capacity(), None);
    }

    #[test]
    fn mistyped_fields_degrade_individually() {
        let raw = r#"{
            "com_port": 6,
            "baud_rate": "19200",
            "equipment_name": "Crane hook",
            "capacity_t": "25.5",
            "conducted_by": "nobody",
            "approved_by": { "name": "R. Iyer", "designation": null }
        }"#;
        let config: Config = serde_json::from_str(raw).unwrap();

        assert_eq!(config.com_port, "");
        assert_eq!(config.baud_rate, 19200);
        assert_eq!(config.equipment_name, "Crane hook");
        assert_eq!(config.capacity_t, Capacity::Tonnes(25.5));
        assert_eq!(config.conducted_by, Signatory::default());
        assert_eq!(config.approved_by.name, "R. Iyer");
        assert_eq!(config.approved_by.designation, "");
    }

    #[test]
    fn invalid_baud_in_file_falls_back_to_default() {
        let config: Config = serde_json::from_str(r#"{"baud_rate": "fast"}"#).unwrap();
        assert_eq!(config.baud_rate, DEFAULT_BAUD_RATE);
    }

    #[test]
    fn capacity_is_stored_as_number_once_it_parses() {
        let mut config = Config::default();
        config.apply(FieldKey::CapacityT, "fif").unwrap();
        assert_eq!(config.capacity_t, Capacity::Text("fif".into()));

        config.apply(FieldKey::CapacityT, "50.0").unwrap();
        assert_eq!(config.capacity_t, Capacity::Tonnes(50.0));

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["capacity_t"], serde_json::json!(50.0));
    }

    #[test]
    fn rejected_baud_rate_keeps_previous_value() {
        let mut config = Config::default();
        let err = config.apply(FieldKey::BaudRate, "96oo").unwrap_err();
        assert!(matches!(err, HarnessError::Parse { .. }));
        assert_eq!(config.baud_rate, DEFAULT_BAUD_RATE);

        config.apply(FieldKey::BaudRate, "115200").unwrap();
        assert_eq!(config.baud_rate, 115_200);
    }

    #[test]
    fn session_keys_are_not_config_fields() {
        let mut config = Config::default();
        assert!(config.apply(FieldKey::Duration, "30").is_err());
        assert_eq!(config.field(FieldKey::TestLoad), None);
    }

    #[test]
    fn date_stamp_uses_iso_format() {
        let mut config = Config::default();
        let today = config.set_date_today();
        assert_eq!(today.len(), 10);
        assert_eq!(config.date, today);
        assert!(chrono::NaiveDate::parse_from_str(&today, "%Y-%m-%d").is_ok());
    }
}
