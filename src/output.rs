use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use chrono::{DateTime, Local, Utc};
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use circle::types::{PriorityInfo, Status};

use crate::cli::OutputFormat;

/// Global output settings, written once from the parsed CLI flags.
static FORMAT: AtomicU8 = AtomicU8::new(0);
static QUIET: AtomicBool = AtomicBool::new(false);

pub fn set_format(format: OutputFormat) {
    let raw = match format {
        OutputFormat::Table => 0,
        OutputFormat::Json => 1,
        OutputFormat::Compact => 2,
    };
    FORMAT.store(raw, Ordering::Relaxed);
}

pub fn format() -> OutputFormat {
    match FORMAT.load(Ordering::Relaxed) {
        1 => OutputFormat::Json,
        2 => OutputFormat::Compact,
        _ => OutputFormat::Table,
    }
}

pub fn set_quiet(quiet: bool) {
    QUIET.store(quiet, Ordering::Relaxed);
}

pub fn is_quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

pub fn is_json_output() -> bool {
    format() == OutputFormat::Json
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

pub fn render_table<R: Tabled>(rows: Vec<R>) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Print items as a table, one compact line each, or JSON
pub fn print_table<T, R, F, C>(items: &[T], to_row: F, to_compact: C)
where
    T: Serialize,
    R: Tabled,
    F: Fn(&T) -> R,
    C: Fn(&T) -> String,
{
    match format() {
        OutputFormat::Json => print_json(items),
        OutputFormat::Compact => {
            for item in items {
                println!("{}", to_compact(item));
            }
        }
        OutputFormat::Table => {
            let rows: Vec<R> = items.iter().map(to_row).collect();
            println!("{}", render_table(rows));
        }
    }
}

/// Print a single item or JSON depending on output mode
pub fn print_item<T: Serialize>(item: &T, display: impl FnOnce(&T)) {
    if is_json_output() {
        print_json(item);
    } else {
        display(item);
    }
}

/// Print a success message; `--quiet` silences it.
pub fn print_message(message: &str) {
    if is_quiet() {
        return;
    }
    if is_json_output() {
        print_json(&serde_json::json!({ "message": message }));
    } else {
        println!("{message}");
    }
}

/// Status name in its stored color, with its glyph.
pub fn status_colored(status: &Status) -> String {
    let text = format!("{} {}", status.icon.glyph(), status.name);
    match parse_hex_color(&status.color) {
        Some((r, g, b)) => text.truecolor(r, g, b).to_string(),
        None => text,
    }
}

pub fn priority_colored(priority: &PriorityInfo) -> String {
    match priority.level() {
        Some(level) => format!("{} {}", priority.icon.glyph(), level.colored()),
        None => priority.name.bright_black().to_string(),
    }
}

/// Color a label name; accepts `#rrggbb` or a basic color name.
pub fn label_colored(name: &str, color: &str) -> String {
    if let Some((r, g, b)) = parse_hex_color(color) {
        return name.truecolor(r, g, b).to_string();
    }
    match color {
        "red" => name.red().to_string(),
        "green" => name.green().to_string(),
        "yellow" | "orange" => name.yellow().to_string(),
        "blue" | "indigo" => name.blue().to_string(),
        "purple" | "pink" => name.magenta().to_string(),
        "teal" | "cyan" => name.cyan().to_string(),
        "gray" | "grey" => name.bright_black().to_string(),
        _ => name.to_string(),
    }
}

fn parse_hex_color(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

pub fn format_date(dt: &DateTime<Utc>) -> String {
    let local: DateTime<Local> = (*dt).into();
    local.format("%Y-%m-%d %H:%M").to_string()
}

pub fn format_date_only(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d").to_string()
}

/// Format a relative time (e.g., "2 days ago")
pub fn format_relative(dt: &DateTime<Utc>) -> String {
    let diff = Utc::now().signed_duration_since(*dt);

    if diff.num_seconds() < 60 {
        "just now".to_string()
    } else if diff.num_minutes() < 60 {
        let mins = diff.num_minutes();
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if diff.num_hours() < 24 {
        let hours = diff.num_hours();
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if diff.num_days() < 30 {
        let days = diff.num_days();
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_date_only(dt)
    }
}

/// Truncate to `max` characters with an ellipsis.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 8), "abcde...");
        assert_eq!(truncate("ボタンのリファクタリング", 6), "ボタン...");
    }

    #[test]
    fn hex_colors() {
        assert_eq!(parse_hex_color("#A7F3D0"), Some((0xa7, 0xf3, 0xd0)));
        assert_eq!(parse_hex_color("A7F3D0"), None);
        assert_eq!(parse_hex_color("#fff"), None);
    }
}
