//! Command-line surface.
//!
//! With no subcommand the interactive shell starts; the one-shot subcommands
//! drive the same form and table components.

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use console::style;

use crate::api::{ApiClient, ApiErrorKind};
use crate::config::Config;
use crate::error::Result;
use crate::form::{DeviceFormValues, SubmitOutcome};
use crate::models::DeviceStatus;
use crate::notify::{ConsoleNotifier, Notification, Notifier};
use crate::render;
use crate::shell::{PromptConfirm, Shell};
use crate::table::{AssumeYes, Confirm, DeleteOutcome, FetchOutcome, Sort, SortColumn};

/// Device inventory client
#[derive(Parser, Debug)]
#[command(name = "devinv")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Backend base URL (overrides DEVICE_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive session with the registration form and device table
    Shell,

    /// List devices
    List(ListArgs),

    /// Register a new device
    Add(AddArgs),

    /// Show a single device
    Get {
        /// Device key as understood by GET /devices/{id}
        id: String,
    },

    /// Delete a device by its device ID
    Delete {
        device_id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only show devices with this status (repeatable)
    #[arg(long, value_enum)]
    pub status: Vec<StatusArg>,

    /// Sort column
    #[arg(long, value_enum)]
    pub sort: Option<SortArg>,

    /// Sort descending instead of ascending
    #[arg(long, requires = "sort")]
    pub desc: bool,

    /// Page to show (1-based)
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    /// Rows per page (defaults to DEVICE_PAGE_SIZE or 10)
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    #[arg(long)]
    pub device_id: String,

    #[arg(long)]
    pub name: String,

    /// Device type (server, router, switch, firewall, workstation, printer, iot, ...)
    #[arg(long = "type")]
    pub device_type: Option<String>,

    #[arg(long)]
    pub ip_address: Option<String>,

    #[arg(long)]
    pub location: Option<String>,

    #[arg(long, value_enum, default_value = "active")]
    pub status: StatusArg,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum StatusArg {
    Active,
    Inactive,
    Maintenance,
}

impl From<StatusArg> for DeviceStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Active => DeviceStatus::Active,
            StatusArg::Inactive => DeviceStatus::Inactive,
            StatusArg::Maintenance => DeviceStatus::Maintenance,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum SortArg {
    DeviceId,
    Name,
    CreatedAt,
}

impl From<SortArg> for SortColumn {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::DeviceId => SortColumn::DeviceId,
            SortArg::Name => SortColumn::Name,
            SortArg::CreatedAt => SortColumn::CreatedAt,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl Cli {
    pub async fn execute(self, config: Config) -> Result<ExitCode> {
        let config = config.with_api_url(self.api_url);
        tracing::debug!(api_url = %config.api_url, "Using device backend");

        let api = ApiClient::new(config.api_url.clone());
        let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier);
        let mut shell = Shell::new(api.clone(), notifier.clone(), config.page_size);

        match self.command.unwrap_or(Commands::Shell) {
            Commands::Shell => {
                shell.run().await?;
                Ok(ExitCode::SUCCESS)
            }
            Commands::List(args) => list(&mut shell, args).await,
            Commands::Add(args) => add(&mut shell, args).await,
            Commands::Get { id } => get(&api, notifier.as_ref(), &id).await,
            Commands::Delete { device_id, yes } => {
                let confirm: &dyn Confirm = if yes { &AssumeYes } else { &PromptConfirm };
                delete(&mut shell, &device_id, confirm).await
            }
        }
    }
}

async fn list(shell: &mut Shell, args: ListArgs) -> Result<ExitCode> {
    let table = shell.table();
    if table.mount().await == FetchOutcome::Failed {
        return Ok(ExitCode::FAILURE);
    }

    table.set_status_filter(args.status.into_iter().map(DeviceStatus::from));
    table.set_sort(args.sort.map(|column| {
        if args.desc {
            Sort::descending(column.into())
        } else {
            Sort::ascending(column.into())
        }
    }));
    if let Some(page_size) = args.page_size {
        table.set_page_size(page_size);
    }
    table.set_page(args.page);

    match args.format {
        OutputFormat::Table => render::print_page(&table.page(), &table.view()),
        OutputFormat::Json => {
            let devices = table.devices();
            let visible = table.view().page_devices(&devices);
            println!("{}", serde_json::to_string_pretty(&visible)?);
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn add(shell: &mut Shell, args: AddArgs) -> Result<ExitCode> {
    shell.form().set_values(DeviceFormValues {
        device_id: args.device_id,
        name: args.name,
        device_type: args.device_type,
        ip_address: args.ip_address.unwrap_or_default(),
        location: args.location.unwrap_or_default(),
        status: args.status.into(),
    });

    match shell.form().submit().await {
        SubmitOutcome::Added { .. } => Ok(ExitCode::SUCCESS),
        SubmitOutcome::Invalid(errors) => {
            for error in errors.iter() {
                eprintln!(
                    "{} {}: {}",
                    style("✗").red().bold(),
                    error.field.label(),
                    error.message
                );
            }
            Ok(ExitCode::FAILURE)
        }
        SubmitOutcome::Failed { .. } | SubmitOutcome::Busy => Ok(ExitCode::FAILURE),
    }
}

async fn get(api: &ApiClient, notifier: &dyn Notifier, id: &str) -> Result<ExitCode> {
    match api.get_device(id).await {
        Ok(device) => {
            render::print_device(&device);
            Ok(ExitCode::SUCCESS)
        }
        Err(error) => {
            tracing::error!(error = %error, id = %id, "Error fetching device");
            let message = match error.kind() {
                ApiErrorKind::NotFound => "Device not found",
                _ => "Failed to fetch device",
            };
            notifier.notify(Notification::error(message));
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn delete(shell: &mut Shell, device_id: &str, confirm: &dyn Confirm) -> Result<ExitCode> {
    match shell.table().delete(device_id, confirm).await {
        DeleteOutcome::Deleted => {
            let table = shell.table();
            render::print_page(&table.page(), &table.view());
            Ok(ExitCode::SUCCESS)
        }
        DeleteOutcome::Cancelled => {
            println!("Cancelled.");
            Ok(ExitCode::SUCCESS)
        }
        DeleteOutcome::Failed { .. } => Ok(ExitCode::FAILURE),
    }
}
