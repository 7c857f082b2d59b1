//! API client contract against the mock backend.

use axum::http::StatusCode;
use chrono::{TimeZone, Utc};

mod common;
use common::*;

use devinv::api::{ApiClient, ApiError, ApiErrorKind};
use devinv::models::{DeviceStatus, NewDevice};

fn new_device(device_id: &str, name: &str) -> NewDevice {
    NewDevice {
        device_id: device_id.into(),
        name: name.into(),
        device_type: Some("router".into()),
        ip_address: Some("192.168.1.1".into()),
        location: None,
        status: DeviceStatus::Active,
    }
}

#[tokio::test]
async fn test_list_parses_backend_timestamps() {
    let harness = start(two_devices()).await;

    let devices = harness.api.list_devices().await.unwrap();

    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].device_id, "DEV-001");
    assert_eq!(
        devices[0].created_at,
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    );
    assert_eq!(devices[1].status_kind(), Some(DeviceStatus::Maintenance));
}

#[tokio::test]
async fn test_create_returns_message_and_device() {
    let harness = start(vec![]).await;

    let created = harness
        .api
        .create_device(&new_device("DEV-100", "Branch Router"))
        .await
        .unwrap();

    assert_eq!(created.message.as_deref(), Some("Device created successfully"));
    assert_eq!(created.device.device_id, "DEV-100");
    assert_eq!(created.device.device_type.as_deref(), Some("router"));
    assert_eq!(created.device.location, None);
    assert_eq!(created.device.status, "active");
    assert_eq!(harness.backend.device_ids(), vec!["DEV-100"]);
}

#[tokio::test]
async fn test_duplicate_create_is_conflict() {
    let harness = start(two_devices()).await;

    let err = harness
        .api
        .create_device(&new_device("DEV-002", "Another Switch"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ApiErrorKind::Conflict);
    assert_eq!(err.status(), Some(StatusCode::CONFLICT));
    assert_eq!(
        err.detail(),
        Some("Device with device_id 'DEV-002' already exists")
    );
}

#[tokio::test]
async fn test_server_side_validation_detail_list() {
    let harness = start(vec![]).await;

    let err = harness
        .api
        .create_device(&new_device("DEV-100", ""))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ApiErrorKind::Other);
    assert_eq!(err.status(), Some(StatusCode::UNPROCESSABLE_ENTITY));
    assert_eq!(
        err.detail(),
        Some("name: String should have at least 1 character")
    );
}

#[tokio::test]
async fn test_get_device_by_key() {
    let harness = start(two_devices()).await;

    let device = harness.api.get_device("DEV-002").await.unwrap();
    assert_eq!(device.name, "Core Switch");

    let err = harness.api.get_device(42).await.unwrap_err();
    assert_eq!(err.kind(), ApiErrorKind::NotFound);
    assert_eq!(err.detail(), Some("Device with device_id '42' not found"));
}

#[tokio::test]
async fn test_delete_by_business_key() {
    let harness = start(two_devices()).await;

    harness.api.delete_device("DEV-001").await.unwrap();
    assert_eq!(harness.backend.deleted(), vec!["DEV-001"]);
    assert_eq!(harness.backend.device_ids(), vec!["DEV-002"]);

    let err = harness.api.delete_device("DEV-001").await.unwrap_err();
    assert_eq!(err.kind(), ApiErrorKind::NotFound);
}

#[tokio::test]
async fn test_business_key_with_reserved_characters() {
    let harness = start(vec![device(
        5,
        "rack 4/unit 2",
        "Patch Panel",
        "active",
        "2024-01-01T00:00:00",
    )])
    .await;

    harness.api.delete_device("rack 4/unit 2").await.unwrap();
    assert_eq!(harness.backend.deleted(), vec!["rack 4/unit 2"]);
}

#[tokio::test]
async fn test_transport_failure_propagates() {
    let api = ApiClient::new("http://127.0.0.1:1");

    let err = api.list_devices().await.unwrap_err();

    assert!(matches!(err, ApiError::Transport(_)));
    assert_eq!(err.kind(), ApiErrorKind::Other);
    assert_eq!(err.detail(), None);
}
