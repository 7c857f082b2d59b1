//! Terminal rendering for the device table and single devices.

use console::{style, truncate_str, StyledObject};

use crate::models::Device;
use crate::table::{Page, Row, SortOrder, StatusTag, TableView, TagColor};

pub const TITLE: &str = "Device Management System";

pub fn print_header() {
    println!();
    println!("{}", style(TITLE).bold().cyan());
    println!();
}

fn tag(status: &StatusTag) -> StyledObject<String> {
    let styled = style(status.label.clone());
    match status.color {
        TagColor::Green => styled.green(),
        TagColor::Red => styled.red(),
        TagColor::Orange => styled.yellow(),
        TagColor::Default => styled.dim(),
    }
}

fn cell(value: &str, width: usize) -> String {
    truncate_str(value, width, "…").into_owned()
}

pub fn print_page(page: &Page, view: &TableView) {
    println!();
    println!(
        "{:>5} {:14} {:22} {:12} {:16} {:20} {:12} {:19}",
        style("ID").bold().underlined(),
        style("DEVICE ID").bold().underlined(),
        style("NAME").bold().underlined(),
        style("TYPE").bold().underlined(),
        style("IP ADDRESS").bold().underlined(),
        style("LOCATION").bold().underlined(),
        style("STATUS").bold().underlined(),
        style("CREATED AT").bold().underlined(),
    );

    if page.rows.is_empty() {
        println!("{}", style("No devices.").yellow());
    }

    for row in &page.rows {
        print_row(row);
    }

    println!();
    let mut footer = format!(
        "{}  (page {}/{}, {} per page)",
        style(page.footer()).bold(),
        page.page,
        page.page_count,
        page.page_size
    );
    if !view.status_filter.is_empty() {
        let statuses: Vec<_> = view.status_filter.iter().map(|s| s.to_string()).collect();
        footer.push_str(&format!("  status: {}", statuses.join(",")));
    }
    if let Some(sort) = view.sort {
        let arrow = match sort.order {
            SortOrder::Ascending => "↑",
            SortOrder::Descending => "↓",
        };
        footer.push_str(&format!("  sort: {} {}", sort.column, arrow));
    }
    println!("{}", footer);
}

fn print_row(row: &Row) {
    println!(
        "{:>5} {:14} {:22} {:12} {:16} {:20} {:12} {:19}",
        row.id,
        cell(&row.device_id, 14),
        cell(&row.name, 22),
        cell(&row.device_type, 12),
        cell(&row.ip_address, 16),
        cell(&row.location, 20),
        tag(&row.status),
        row.created_at,
    );
}

pub fn print_device(device: &Device) {
    let row = Row::from(device);
    println!();
    println!("{:12} {}", style("ID").bold(), row.id);
    println!("{:12} {}", style("Device ID").bold(), row.device_id);
    println!("{:12} {}", style("Name").bold(), row.name);
    println!("{:12} {}", style("Type").bold(), row.device_type);
    println!("{:12} {}", style("IP Address").bold(), row.ip_address);
    println!("{:12} {}", style("Location").bold(), row.location);
    println!("{:12} {}", style("Status").bold(), tag(&row.status));
    println!("{:12} {}", style("Created At").bold(), row.created_at);
}
