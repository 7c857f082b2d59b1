use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Operational status of a device.
///
/// The backend stores status as a free-form string, so [`Device::status`]
/// keeps the raw value and [`Device::status_kind`] maps it onto this enum.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeviceStatus {
    #[default]
    Active,
    Inactive,
    Maintenance,
}

/// Device types offered by the registration form.
///
/// Not a closed set: the backend accepts any string up to 50 characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum DeviceType {
    Server,
    Router,
    Switch,
    Firewall,
    Workstation,
    Printer,
    Iot,
}

impl DeviceType {
    /// Label shown in selection prompts.
    pub fn label(&self) -> &'static str {
        match self {
            DeviceType::Server => "Server",
            DeviceType::Router => "Router",
            DeviceType::Switch => "Switch",
            DeviceType::Firewall => "Firewall",
            DeviceType::Workstation => "Workstation",
            DeviceType::Printer => "Printer",
            DeviceType::Iot => "IoT Device",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// Server-assigned numeric id
    pub id: i64,
    /// Business key, unique across the inventory
    pub device_id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub status: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Device {
    /// The status as a known variant, or `None` for values the client
    /// does not recognise.
    pub fn status_kind(&self) -> Option<DeviceStatus> {
        self.status.parse().ok()
    }
}

/// Payload for `POST /devices/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewDevice {
    pub device_id: String,
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub status: DeviceStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDeviceResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub device: Device,
}

/// Accepts RFC 3339 timestamps as well as the offset-less ISO-8601 form the
/// backend emits for its UTC `created_at` column.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!("invalid created_at timestamp: {}", raw))
    })
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}
