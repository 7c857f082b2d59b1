//! Device table: the fetched collection plus a client-side view over it.
//!
//! The collection is always replaced wholesale by a fetch. Fetches are
//! numbered; a response older than the last one applied is dropped so a slow
//! request cannot overwrite newer rows.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Local;
use strum::{AsRefStr, Display, EnumString};
use tokio::sync::watch;

use crate::api::{self, ApiClient, ApiErrorKind};
use crate::models::{Device, DeviceStatus};
use crate::notify::{Notification, Notifier};

pub const DEFAULT_PAGE_SIZE: usize = 10;
const PLACEHOLDER: &str = "-";
pub const DELETE_PROMPT: &str = "Are you sure you want to delete this device?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum SortColumn {
    DeviceId,
    Name,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub column: SortColumn,
    pub order: SortOrder,
}

impl Sort {
    pub fn ascending(column: SortColumn) -> Self {
        Self {
            column,
            order: SortOrder::Ascending,
        }
    }

    pub fn descending(column: SortColumn) -> Self {
        Self {
            column,
            order: SortOrder::Descending,
        }
    }

    fn compare(&self, a: &Device, b: &Device) -> Ordering {
        let ordering = match self.column {
            SortColumn::DeviceId => a.device_id.cmp(&b.device_id),
            SortColumn::Name => a.name.cmp(&b.name),
            SortColumn::CreatedAt => a.created_at.cmp(&b.created_at),
        };
        match self.order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    }
}

/// Sort, filter and pagination settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableView {
    pub sort: Option<Sort>,
    /// Empty means every status is shown
    pub status_filter: BTreeSet<DeviceStatus>,
    /// 1-based
    pub page: usize,
    pub page_size: usize,
}

impl Default for TableView {
    fn default() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }
}

impl TableView {
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            sort: None,
            status_filter: BTreeSet::new(),
            page: 1,
            page_size: page_size.max(1),
        }
    }

    /// Filter, sort and slice `devices` into the visible page.
    pub fn apply(&self, devices: &[Device]) -> Page {
        let window = self.window(devices);
        Page {
            rows: window.devices.into_iter().map(Row::from).collect(),
            page: window.page,
            page_count: window.page_count,
            page_size: window.page_size,
            total: window.total,
        }
    }

    /// The devices on the visible page, in display order.
    pub fn page_devices<'a>(&self, devices: &'a [Device]) -> Vec<&'a Device> {
        self.window(devices).devices
    }

    fn window<'a>(&self, devices: &'a [Device]) -> Window<'a> {
        let mut visible: Vec<&Device> = devices
            .iter()
            .filter(|d| {
                self.status_filter.is_empty()
                    || d.status_kind().is_some_and(|s| self.status_filter.contains(&s))
            })
            .collect();

        if let Some(sort) = self.sort {
            visible.sort_by(|a, b| sort.compare(a, b));
        }

        let total = visible.len();
        let page_size = self.page_size.max(1);
        let page_count = total.div_ceil(page_size).max(1);
        let page = self.page.clamp(1, page_count);

        let devices = visible
            .into_iter()
            .skip((page - 1) * page_size)
            .take(page_size)
            .collect();

        Window {
            devices,
            page,
            page_count,
            page_size,
            total,
        }
    }
}

struct Window<'a> {
    devices: Vec<&'a Device>,
    page: usize,
    page_count: usize,
    page_size: usize,
    total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagColor {
    Green,
    Red,
    Orange,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTag {
    pub label: String,
    pub color: TagColor,
}

impl StatusTag {
    pub fn for_status(raw: &str) -> Self {
        let color = match raw.parse::<DeviceStatus>() {
            Ok(DeviceStatus::Active) => TagColor::Green,
            Ok(DeviceStatus::Inactive) => TagColor::Red,
            Ok(DeviceStatus::Maintenance) => TagColor::Orange,
            Err(_) => TagColor::Default,
        };
        Self {
            label: raw.to_uppercase(),
            color,
        }
    }
}

/// One rendered table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: i64,
    pub device_id: String,
    pub name: String,
    pub device_type: String,
    pub ip_address: String,
    pub location: String,
    pub status: StatusTag,
    pub created_at: String,
}

impl From<&Device> for Row {
    fn from(device: &Device) -> Self {
        Self {
            id: device.id,
            device_id: device.device_id.clone(),
            name: device.name.clone(),
            device_type: or_placeholder(device.device_type.as_deref()),
            ip_address: or_placeholder(device.ip_address.as_deref()),
            location: or_placeholder(device.location.as_deref()),
            status: StatusTag::for_status(&device.status),
            created_at: device
                .created_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
        }
    }
}

fn or_placeholder(value: Option<&str>) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or(PLACEHOLDER)
        .to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub rows: Vec<Row>,
    /// 1-based, clamped to the last page
    pub page: usize,
    pub page_count: usize,
    pub page_size: usize,
    /// Rows matching the filter across all pages
    pub total: usize,
}

impl Page {
    pub fn footer(&self) -> String {
        format!("Total {} devices", self.total)
    }
}

/// Asks the user before a destructive action.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F: Fn(&str) -> bool> Confirm for F {
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Skips the question, for `--yes` style invocations.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Rows replaced with this many devices
    Applied(usize),
    /// A newer fetch already landed; response dropped
    Stale,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Cancelled,
    Failed { message: String },
}

#[derive(Debug)]
struct TableState {
    devices: Vec<Device>,
    in_flight: usize,
    applied_seq: u64,
    view: TableView,
}

pub struct DeviceTable {
    api: ApiClient,
    notifier: Arc<dyn Notifier>,
    refresh: watch::Receiver<u64>,
    fetch_seq: AtomicU64,
    state: Mutex<TableState>,
}

impl DeviceTable {
    pub fn new(
        api: ApiClient,
        notifier: Arc<dyn Notifier>,
        refresh: watch::Receiver<u64>,
        page_size: usize,
    ) -> Self {
        Self {
            api,
            notifier,
            refresh,
            fetch_seq: AtomicU64::new(0),
            state: Mutex::new(TableState {
                devices: Vec::new(),
                in_flight: 0,
                applied_seq: 0,
                view: TableView::with_page_size(page_size),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TableState> {
        // Updates are single assignments, so a poisoned lock still holds valid state.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Initial load. Marks the current refresh value as seen.
    pub async fn mount(&mut self) -> FetchOutcome {
        self.refresh.borrow_and_update();
        self.refresh().await
    }

    /// Re-fetch if the refresh trigger moved since the last check.
    pub async fn sync(&mut self) -> Option<FetchOutcome> {
        match self.refresh.has_changed() {
            Ok(true) => {
                let value = *self.refresh.borrow_and_update();
                tracing::debug!(trigger = value, "Refresh trigger changed");
                Some(self.refresh().await)
            }
            _ => None,
        }
    }

    /// Wait for the next refresh signal, then fetch.
    ///
    /// Returns `None` once the trigger has been dropped.
    pub async fn next_refresh(&mut self) -> Option<FetchOutcome> {
        self.refresh.changed().await.ok()?;
        self.refresh.borrow_and_update();
        Some(self.refresh().await)
    }

    /// Fetch the full collection and replace the rows.
    pub async fn refresh(&self) -> FetchOutcome {
        let seq = self.begin_fetch();
        let result = self.api.list_devices().await;
        self.finish_fetch(seq, result)
    }

    fn begin_fetch(&self) -> u64 {
        let seq = self.fetch_seq.fetch_add(1, AtomicOrdering::SeqCst) + 1;
        self.lock().in_flight += 1;
        seq
    }

    fn finish_fetch(&self, seq: u64, result: api::Result<Vec<Device>>) -> FetchOutcome {
        let mut state = self.lock();
        state.in_flight = state.in_flight.saturating_sub(1);

        match result {
            Ok(devices) if seq > state.applied_seq => {
                let count = devices.len();
                state.devices = devices;
                state.applied_seq = seq;
                tracing::debug!(seq, count, "Applied device list");
                FetchOutcome::Applied(count)
            }
            Ok(_) => {
                tracing::debug!(seq, applied = state.applied_seq, "Discarding stale device list");
                FetchOutcome::Stale
            }
            Err(error) if seq <= state.applied_seq => {
                tracing::debug!(seq, applied = state.applied_seq, error = %error, "Ignoring failure of stale fetch");
                FetchOutcome::Stale
            }
            Err(error) => {
                drop(state);
                tracing::error!(error = %error, "Error fetching devices");
                self.notifier
                    .notify(Notification::error("Failed to fetch devices"));
                FetchOutcome::Failed
            }
        }
    }

    /// Delete by business key after confirmation, then re-fetch everything.
    pub async fn delete(&self, device_id: &str, confirm: &dyn Confirm) -> DeleteOutcome {
        if !confirm.confirm(DELETE_PROMPT) {
            tracing::debug!(device_id = %device_id, "Delete cancelled");
            return DeleteOutcome::Cancelled;
        }

        match self.api.delete_device(device_id).await {
            Ok(()) => {
                tracing::info!(device_id = %device_id, "Device deleted");
                self.notifier
                    .notify(Notification::success("Device deleted successfully"));
                self.refresh().await;
                DeleteOutcome::Deleted
            }
            Err(error) => {
                tracing::error!(error = %error, device_id = %device_id, "Error deleting device");
                let message = match error.kind() {
                    ApiErrorKind::NotFound => "Device not found",
                    _ => "Failed to delete device",
                };
                self.notifier.notify(Notification::error(message));
                DeleteOutcome::Failed {
                    message: message.to_string(),
                }
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        self.lock().in_flight > 0
    }

    pub fn devices(&self) -> Vec<Device> {
        self.lock().devices.clone()
    }

    pub fn view(&self) -> TableView {
        self.lock().view.clone()
    }

    pub fn page(&self) -> Page {
        let state = self.lock();
        state.view.apply(&state.devices)
    }

    pub fn set_sort(&self, sort: Option<Sort>) {
        self.lock().view.sort = sort;
    }

    pub fn set_status_filter(&self, statuses: impl IntoIterator<Item = DeviceStatus>) {
        let mut state = self.lock();
        state.view.status_filter = statuses.into_iter().collect();
        state.view.page = 1;
    }

    pub fn set_page(&self, page: usize) {
        self.lock().view.page = page.max(1);
    }

    pub fn set_page_size(&self, page_size: usize) {
        let mut state = self.lock();
        state.view.page_size = page_size.max(1);
    }
}
