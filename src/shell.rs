//! Layout composing the registration form and the device table.
//!
//! The only coupling between the two is the [`RefreshTrigger`]: the form
//! bumps it after a successful add, the table watches it and re-fetches.

use std::sync::Arc;

use console::style;
use dialoguer::{Input, MultiSelect, Select};
use strum::IntoEnumIterator;
use tokio::sync::watch;

use crate::api::ApiClient;
use crate::error::Result;
use crate::form::{DeviceForm, DeviceFormValues, Field, SubmitOutcome, ValidationErrors};
use crate::models::{DeviceStatus, DeviceType};
use crate::notify::Notifier;
use crate::render;
use crate::table::{Confirm, DeviceTable, Sort, SortColumn};

const PAGE_SIZE_OPTIONS: [usize; 4] = [10, 20, 50, 100];

/// Observable counter signalling that the device list is out of date.
///
/// Only changes matter, not the value itself.
#[derive(Debug, Clone)]
pub struct RefreshTrigger {
    tx: Arc<watch::Sender<u64>>,
}

impl Default for RefreshTrigger {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshTrigger {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    /// Increment by one and wake every subscriber.
    pub fn bump(&self) {
        self.tx.send_modify(|n| *n += 1);
    }

    pub fn value(&self) -> u64 {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }
}

/// Terminal confirmation prompt, defaulting to "No".
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptConfirm;

impl Confirm for PromptConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuItem {
    AddDevice,
    Refresh,
    FilterStatus,
    Sort,
    NextPage,
    PreviousPage,
    PageSize,
    DeleteDevice,
    Quit,
}

impl MenuItem {
    const ALL: [MenuItem; 9] = [
        MenuItem::AddDevice,
        MenuItem::Refresh,
        MenuItem::FilterStatus,
        MenuItem::Sort,
        MenuItem::NextPage,
        MenuItem::PreviousPage,
        MenuItem::PageSize,
        MenuItem::DeleteDevice,
        MenuItem::Quit,
    ];

    fn label(&self) -> &'static str {
        match self {
            MenuItem::AddDevice => "Add device",
            MenuItem::Refresh => "Refresh",
            MenuItem::FilterStatus => "Filter by status",
            MenuItem::Sort => "Sort",
            MenuItem::NextPage => "Next page",
            MenuItem::PreviousPage => "Previous page",
            MenuItem::PageSize => "Page size",
            MenuItem::DeleteDevice => "Delete device",
            MenuItem::Quit => "Quit",
        }
    }
}

pub struct Shell {
    trigger: RefreshTrigger,
    form: DeviceForm,
    table: DeviceTable,
}

impl Shell {
    pub fn new(api: ApiClient, notifier: Arc<dyn Notifier>, page_size: usize) -> Self {
        let trigger = RefreshTrigger::new();
        let form = DeviceForm::new(api.clone(), notifier.clone(), trigger.clone());
        let table = DeviceTable::new(api, notifier, trigger.subscribe(), page_size);
        Self {
            trigger,
            form,
            table,
        }
    }

    pub fn trigger(&self) -> &RefreshTrigger {
        &self.trigger
    }

    pub fn form(&mut self) -> &mut DeviceForm {
        &mut self.form
    }

    pub fn table(&mut self) -> &mut DeviceTable {
        &mut self.table
    }

    /// Submit the form, then let the table catch up with the trigger.
    pub async fn submit(&mut self) -> SubmitOutcome {
        let outcome = self.form.submit().await;
        self.table.sync().await;
        outcome
    }

    /// Interactive menu loop. Returns when the user quits.
    pub async fn run(&mut self) -> Result<()> {
        render::print_header();
        self.table.mount().await;

        loop {
            self.table.sync().await;
            render::print_page(&self.table.page(), &self.table.view());
            println!();

            let labels: Vec<_> = MenuItem::ALL.iter().map(MenuItem::label).collect();
            let choice = Select::new()
                .with_prompt("Action")
                .items(&labels)
                .default(0)
                .interact()?;

            match MenuItem::ALL[choice] {
                MenuItem::AddDevice => self.add_device().await?,
                MenuItem::Refresh => {
                    self.table.refresh().await;
                }
                MenuItem::FilterStatus => self.choose_filter()?,
                MenuItem::Sort => self.choose_sort()?,
                MenuItem::NextPage => {
                    let page = self.table.page();
                    self.table.set_page((page.page + 1).min(page.page_count));
                }
                MenuItem::PreviousPage => {
                    let page = self.table.page();
                    self.table.set_page(page.page.saturating_sub(1));
                }
                MenuItem::PageSize => self.choose_page_size()?,
                MenuItem::DeleteDevice => self.delete_device().await?,
                MenuItem::Quit => return Ok(()),
            }
        }
    }

    async fn add_device(&mut self) -> Result<()> {
        let mut errors = ValidationErrors::default();
        loop {
            let values = prompt_values(self.form.values(), &errors)?;
            self.form.set_values(values);

            println!("{}", style("Adding device...").dim());
            match self.submit().await {
                SubmitOutcome::Invalid(invalid) => {
                    for error in invalid.iter() {
                        println!(
                            "  {} {}: {}",
                            style("!").red().bold(),
                            error.field.label(),
                            style(error.message).red()
                        );
                    }
                    let retry = dialoguer::Confirm::new()
                        .with_prompt("Edit and resubmit?")
                        .default(true)
                        .interact()?;
                    if !retry {
                        return Ok(());
                    }
                    errors = invalid;
                }
                SubmitOutcome::Failed { .. } => {
                    let retry = dialoguer::Confirm::new()
                        .with_prompt("Edit and resubmit?")
                        .default(false)
                        .interact()?;
                    if !retry {
                        return Ok(());
                    }
                    errors = ValidationErrors::default();
                }
                SubmitOutcome::Added { .. } | SubmitOutcome::Busy => return Ok(()),
            }
        }
    }

    fn choose_filter(&mut self) -> Result<()> {
        let view = self.table.view();
        let statuses: Vec<DeviceStatus> = DeviceStatus::iter().collect();
        let labels: Vec<_> = statuses.iter().map(|s| s.to_string()).collect();
        let defaults: Vec<bool> = statuses
            .iter()
            .map(|s| view.status_filter.contains(s))
            .collect();

        let picked = MultiSelect::new()
            .with_prompt("Show statuses (none selected shows all)")
            .items(&labels)
            .defaults(&defaults)
            .interact()?;

        self.table
            .set_status_filter(picked.into_iter().map(|i| statuses[i]));
        Ok(())
    }

    fn choose_sort(&mut self) -> Result<()> {
        let options = [
            ("Device ID ascending", Some(Sort::ascending(SortColumn::DeviceId))),
            ("Device ID descending", Some(Sort::descending(SortColumn::DeviceId))),
            ("Name ascending", Some(Sort::ascending(SortColumn::Name))),
            ("Name descending", Some(Sort::descending(SortColumn::Name))),
            ("Created at ascending", Some(Sort::ascending(SortColumn::CreatedAt))),
            ("Created at descending", Some(Sort::descending(SortColumn::CreatedAt))),
            ("Unsorted", None),
        ];
        let labels: Vec<_> = options.iter().map(|(label, _)| *label).collect();
        let current = self.table.view().sort;
        let default = options
            .iter()
            .position(|(_, sort)| *sort == current)
            .unwrap_or(options.len() - 1);

        let choice = Select::new()
            .with_prompt("Sort by")
            .items(&labels)
            .default(default)
            .interact()?;

        self.table.set_sort(options[choice].1);
        Ok(())
    }

    fn choose_page_size(&mut self) -> Result<()> {
        let current = self.table.view().page_size;
        let labels: Vec<_> = PAGE_SIZE_OPTIONS
            .iter()
            .map(|n| format!("{} / page", n))
            .collect();
        let default = PAGE_SIZE_OPTIONS
            .iter()
            .position(|n| *n == current)
            .unwrap_or(0);

        let choice = Select::new()
            .with_prompt("Page size")
            .items(&labels)
            .default(default)
            .interact()?;

        self.table.set_page_size(PAGE_SIZE_OPTIONS[choice]);
        Ok(())
    }

    async fn delete_device(&mut self) -> Result<()> {
        let page = self.table.page();
        if page.rows.is_empty() {
            println!("{}", style("No devices on this page.").yellow());
            return Ok(());
        }

        let mut labels: Vec<_> = page
            .rows
            .iter()
            .map(|r| format!("{}  {}", r.device_id, r.name))
            .collect();
        labels.push("Cancel".to_string());

        let choice = Select::new()
            .with_prompt("Delete which device?")
            .items(&labels)
            .default(labels.len() - 1)
            .interact()?;

        if let Some(row) = page.rows.get(choice) {
            self.table.delete(&row.device_id, &PromptConfirm).await;
        }
        Ok(())
    }
}

/// Prompt for every field, pre-filled with `current`.
fn prompt_values(current: &DeviceFormValues, errors: &ValidationErrors) -> Result<DeviceFormValues> {
    let device_id = prompt_text(Field::DeviceId, &current.device_id, errors, "e.g., DEV-001")?;
    let name = prompt_text(Field::Name, &current.name, errors, "e.g., Main Server")?;

    let types: Vec<DeviceType> = DeviceType::iter().collect();
    let mut type_labels: Vec<String> = vec!["(none)".to_string()];
    type_labels.extend(types.iter().map(|t| t.label().to_string()));
    let custom_type = current
        .device_type
        .as_deref()
        .filter(|t| t.parse::<DeviceType>().is_err() && !t.is_empty());
    if let Some(custom) = custom_type {
        type_labels.push(custom.to_string());
    }
    let type_default = match current.device_type.as_deref() {
        Some(t) if custom_type.is_some() => type_labels.iter().position(|l| l == t).unwrap_or(0),
        Some(t) => types
            .iter()
            .position(|known| known.to_string() == t)
            .map(|i| i + 1)
            .unwrap_or(0),
        None => 0,
    };
    let type_choice = Select::new()
        .with_prompt(label_with_error(Field::Type, errors))
        .items(&type_labels)
        .default(type_default)
        .interact()?;
    let device_type = match type_choice {
        0 => None,
        i if i <= types.len() => Some(types[i - 1].to_string()),
        _ => custom_type.map(String::from),
    };

    let ip_address = prompt_text(Field::IpAddress, &current.ip_address, errors, "e.g., 192.168.1.100")?;
    let location = prompt_text(Field::Location, &current.location, errors, "e.g., Server Room A")?;

    let statuses: Vec<DeviceStatus> = DeviceStatus::iter().collect();
    let status_labels: Vec<_> = statuses.iter().map(|s| s.to_string()).collect();
    let status_default = statuses
        .iter()
        .position(|s| *s == current.status)
        .unwrap_or(0);
    let status_choice = Select::new()
        .with_prompt(Field::Status.label())
        .items(&status_labels)
        .default(status_default)
        .interact()?;

    Ok(DeviceFormValues {
        device_id,
        name,
        device_type,
        ip_address,
        location,
        status: statuses[status_choice],
    })
}

fn label_with_error(field: Field, errors: &ValidationErrors) -> String {
    match errors.get(field) {
        Some(message) => format!("{} ({})", field.label(), style(message).red()),
        None => field.label().to_string(),
    }
}

fn prompt_text(
    field: Field,
    current: &str,
    errors: &ValidationErrors,
    placeholder: &str,
) -> Result<String> {
    let prompt = if current.is_empty() && errors.get(field).is_none() {
        format!("{} [{}]", field.label(), style(placeholder).dim())
    } else {
        label_with_error(field, errors)
    };

    let value: String = Input::new()
        .with_prompt(prompt)
        .with_initial_text(current)
        .allow_empty(true)
        .interact_text()?;
    Ok(value)
}
