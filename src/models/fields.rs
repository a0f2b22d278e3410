use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::HarnessError;

/// Every editable field the presentation layer can push through `update_field`.
///
/// Persisted keys use the config file's names; nested signatory fields are
/// addressed with a dot (`conducted_by.name`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FieldKey {
    ComPort,
    BaudRate,
    Date,
    EquipmentName,
    EquipmentMake,
    CapacityT,
    #[serde(rename = "conducted_by.name")]
    ConductedByName,
    #[serde(rename = "conducted_by.designation")]
    ConductedByDesignation,
    #[serde(rename = "approved_by.name")]
    ApprovedByName,
    #[serde(rename = "approved_by.designation")]
    ApprovedByDesignation,
    TestLoad,
    LoadCellValue,
    Duration,
}

impl FieldKey {
    pub const ALL: [FieldKey; 13] = [
        FieldKey::ComPort,
        FieldKey::BaudRate,
        FieldKey::Date,
        FieldKey::EquipmentName,
        FieldKey::EquipmentMake,
        FieldKey::CapacityT,
        FieldKey::ConductedByName,
        FieldKey::ConductedByDesignation,
        FieldKey::ApprovedByName,
        FieldKey::ApprovedByDesignation,
        FieldKey::TestLoad,
        FieldKey::LoadCellValue,
        FieldKey::Duration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKey::ComPort => "com_port",
            FieldKey::BaudRate => "baud_rate",
            FieldKey::Date => "date",
            FieldKey::EquipmentName => "equipment_name",
            FieldKey::EquipmentMake => "equipment_make",
            FieldKey::CapacityT => "capacity_t",
            FieldKey::ConductedByName => "conducted_by.name",
            FieldKey::ConductedByDesignation => "conducted_by.designation",
            FieldKey::ApprovedByName => "approved_by.name",
            FieldKey::ApprovedByDesignation => "approved_by.designation",
            FieldKey::TestLoad => "test_load",
            FieldKey::LoadCellValue => "load_cell_value",
            FieldKey::Duration => "duration",
        }
    }

    /// Session-only fields live for one run and never reach the config file.
    pub fn is_persisted(&self) -> bool {
        !matches!(
            self,
            FieldKey::TestLoad | FieldKey::LoadCellValue | FieldKey::Duration
        )
    }
}

impl FromStr for FieldKey {
    type Err = HarnessError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        FieldKey::ALL
            .iter()
            .copied()
            .find(|field| field.as_str() == key)
            .ok_or_else(|| HarnessError::UnknownField(key.to_string()))
    }
}
