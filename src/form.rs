//! Device registration form.
//!
//! Holds the field values, validates them locally, submits through
//! [`ApiClient::create_device`] and reports the outcome as a notification.
//! A successful submission bumps the shared [`RefreshTrigger`].

use std::fmt;
use std::sync::Arc;

use crate::api::{ApiClient, ApiError, ApiErrorKind};
use crate::models::{DeviceStatus, NewDevice};
use crate::notify::{Notification, Notifier};
use crate::shell::RefreshTrigger;

pub const NAME_MAX_CHARS: usize = 100;
pub const TYPE_MAX_CHARS: usize = 50;
pub const LOCATION_MAX_CHARS: usize = 200;

const DEFAULT_SUCCESS_MESSAGE: &str = "Device added successfully!";
const GENERIC_FAILURE_MESSAGE: &str = "Failed to add device. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    DeviceId,
    Name,
    Type,
    IpAddress,
    Location,
    Status,
}

impl Field {
    pub fn label(&self) -> &'static str {
        match self {
            Field::DeviceId => "Device ID",
            Field::Name => "Device Name",
            Field::Type => "Device Type",
            Field::IpAddress => "IP Address",
            Field::Location => "Location",
            Field::Status => "Status",
        }
    }
}

/// Raw values as entered by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceFormValues {
    pub device_id: String,
    pub name: String,
    pub device_type: Option<String>,
    pub ip_address: String,
    pub location: String,
    pub status: DeviceStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: Field,
    pub message: &'static str,
}

/// Client-side validation failures, at most one per field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    pub fn get(&self, field: Field) -> Option<&'static str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message)
    }

    fn push(&mut self, field: Field, message: &'static str) {
        self.errors.push(FieldError { field, message });
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<_> = self.errors.iter().map(|e| e.message).collect();
        write!(f, "{}", messages.join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

impl DeviceFormValues {
    /// Check the length and presence rules and build the create payload.
    ///
    /// Empty or blank optional fields are left out of the payload.
    pub fn validate(&self) -> Result<NewDevice, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        if self.device_id.is_empty() {
            errors.push(Field::DeviceId, "Please input device ID!");
        }

        let name_len = self.name.chars().count();
        if name_len == 0 {
            errors.push(Field::Name, "Please input device name!");
        } else if name_len > NAME_MAX_CHARS {
            errors.push(Field::Name, "Name must be between 1 and 100 characters");
        }

        let device_type = self.device_type.as_deref().filter(|t| !t.trim().is_empty());
        if device_type.is_some_and(|t| t.chars().count() > TYPE_MAX_CHARS) {
            errors.push(Field::Type, "Type must be at most 50 characters");
        }

        if self.location.chars().count() > LOCATION_MAX_CHARS {
            errors.push(Field::Location, "Location must be at most 200 characters");
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(NewDevice {
            device_id: self.device_id.clone(),
            name: self.name.clone(),
            device_type: device_type.map(String::from),
            ip_address: non_empty(&self.ip_address),
            location: non_empty(&self.location),
            status: self.status,
        })
    }
}

fn non_empty(value: &str) -> Option<String> {
    Some(value).filter(|v| !v.trim().is_empty()).map(String::from)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormState {
    #[default]
    Idle,
    Submitting,
}

/// Result of a single submit attempt.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// Created; the form has been reset
    Added { message: String },
    /// Blocked locally, no request was made
    Invalid(ValidationErrors),
    /// The server rejected the request; the values are kept for a retry
    Failed { message: String, error: ApiError },
    /// Another submission is still in flight
    Busy,
}

impl SubmitOutcome {
    pub fn is_added(&self) -> bool {
        matches!(self, SubmitOutcome::Added { .. })
    }
}

pub struct DeviceForm {
    api: ApiClient,
    notifier: Arc<dyn Notifier>,
    on_added: RefreshTrigger,
    values: DeviceFormValues,
    state: FormState,
}

impl DeviceForm {
    pub fn new(api: ApiClient, notifier: Arc<dyn Notifier>, on_added: RefreshTrigger) -> Self {
        Self {
            api,
            notifier,
            on_added,
            values: DeviceFormValues::default(),
            state: FormState::Idle,
        }
    }

    pub fn values(&self) -> &DeviceFormValues {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut DeviceFormValues {
        &mut self.values
    }

    pub fn set_values(&mut self, values: DeviceFormValues) {
        self.values = values;
    }

    pub fn state(&self) -> FormState {
        self.state
    }

    pub fn is_submitting(&self) -> bool {
        self.state == FormState::Submitting
    }

    /// Clear every field back to its default (status `active`).
    pub fn reset(&mut self) {
        self.values = DeviceFormValues::default();
    }

    pub async fn submit(&mut self) -> SubmitOutcome {
        if self.is_submitting() {
            return SubmitOutcome::Busy;
        }

        let payload = match self.values.validate() {
            Ok(payload) => payload,
            Err(errors) => {
                tracing::debug!(errors = %errors, "Device form failed validation");
                return SubmitOutcome::Invalid(errors);
            }
        };

        self.state = FormState::Submitting;
        let result = self.api.create_device(&payload).await;
        self.state = FormState::Idle;

        match result {
            Ok(response) => {
                let message = response
                    .message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| DEFAULT_SUCCESS_MESSAGE.to_string());
                tracing::info!(
                    device_id = %response.device.device_id,
                    id = response.device.id,
                    "Device added"
                );
                self.notifier.notify(Notification::success(message.clone()));
                self.reset();
                self.on_added.bump();
                SubmitOutcome::Added { message }
            }
            Err(error) => {
                tracing::error!(error = %error, device_id = %payload.device_id, "Error adding device");
                let message = failure_message(&error);
                self.notifier.notify(Notification::error(message.clone()));
                SubmitOutcome::Failed { message, error }
            }
        }
    }
}

fn failure_message(error: &ApiError) -> String {
    match (error.kind(), error.detail()) {
        (ApiErrorKind::Conflict, detail) => {
            format!("Duplicate device: {}", detail.unwrap_or_default())
        }
        (_, Some(detail)) => format!("Error: {}", detail),
        (_, None) => GENERIC_FAILURE_MESSAGE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    fn valid_values() -> DeviceFormValues {
        DeviceFormValues {
            device_id: "DEV-001".into(),
            name: "Main Server".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_are_empty_and_active() {
        let values = DeviceFormValues::default();
        assert_eq!(values.status, DeviceStatus::Active);
        assert!(values.device_id.is_empty());
        assert!(values.name.is_empty());
        assert_eq!(values.device_type, None);
    }

    #[test]
    fn test_required_fields() {
        let errors = DeviceFormValues::default().validate().unwrap_err();
        assert_eq!(errors.get(Field::DeviceId), Some("Please input device ID!"));
        assert_eq!(errors.get(Field::Name), Some("Please input device name!"));
        assert_eq!(errors.iter().count(), 2);
    }

    #[test]
    fn test_length_limits_count_characters() {
        let mut values = valid_values();
        values.name = "é".repeat(NAME_MAX_CHARS);
        values.location = "ü".repeat(LOCATION_MAX_CHARS);
        values.device_type = Some("x".repeat(TYPE_MAX_CHARS));
        assert!(values.validate().is_ok());

        values.name.push('é');
        values.location.push('ü');
        values.device_type = Some("x".repeat(TYPE_MAX_CHARS + 1));
        let errors = values.validate().unwrap_err();
        assert_eq!(errors.get(Field::Name), Some("Name must be between 1 and 100 characters"));
        assert_eq!(errors.get(Field::Type), Some("Type must be at most 50 characters"));
        assert_eq!(
            errors.get(Field::Location),
            Some("Location must be at most 200 characters")
        );
    }

    #[test]
    fn test_ip_address_not_format_checked() {
        let mut values = valid_values();
        values.ip_address = "not-an-ip".into();
        let payload = values.validate().unwrap();
        assert_eq!(payload.ip_address.as_deref(), Some("not-an-ip"));
    }

    #[test]
    fn test_empty_optionals_dropped_from_payload() {
        let mut values = valid_values();
        values.device_type = Some(String::new());
        let payload = values.validate().unwrap();
        assert_eq!(payload.device_type, None);
        assert_eq!(payload.ip_address, None);
        assert_eq!(payload.location, None);
        assert_eq!(payload.status, DeviceStatus::Active);
    }

    #[test]
    fn test_blank_optionals_dropped_from_payload() {
        let mut values = valid_values();
        values.device_type = Some("  ".into());
        values.ip_address = "   ".into();
        values.location = "\t".into();
        let payload = values.validate().unwrap();
        assert_eq!(payload.device_type, None);
        assert_eq!(payload.ip_address, None);
        assert_eq!(payload.location, None);
    }

    #[test]
    fn test_failure_messages() {
        let conflict = ApiError::Status {
            status: StatusCode::CONFLICT,
            detail: Some("device already exists".into()),
        };
        assert_eq!(failure_message(&conflict), "Duplicate device: device already exists");

        let rejected = ApiError::Status {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            detail: Some("name: Field required".into()),
        };
        assert_eq!(failure_message(&rejected), "Error: name: Field required");

        let broken = ApiError::Status {
            status: StatusCode::BAD_GATEWAY,
            detail: None,
        };
        assert_eq!(failure_message(&broken), GENERIC_FAILURE_MESSAGE);
    }
}
