//! Output formatting for human-readable and JSON modes.
//!
//! Human mode uses colored terminal output.
//! JSON mode prints one JSON document per result with no ANSI escapes.

use colored::Colorize;
use serde::Serialize;
use swiftvault_types::SwiftvaultError;

/// Prints a success message.
pub fn print_success(msg: &str, json_mode: bool) {
    if json_mode {
        let obj = serde_json::json!({ "status": "ok", "message": msg });
        println!("{obj}");
    } else {
        println!("{} {}", "✓".green().bold(), msg);
    }
}

/// Prints labelled values, one per line, or a single JSON object.
pub fn print_fields(fields: &[(&str, String)], json_mode: bool) {
    if json_mode {
        let mut obj = serde_json::Map::new();
        for (key, value) in fields {
            obj.insert((*key).to_string(), serde_json::Value::String(value.clone()));
        }
        println!("{}", serde_json::Value::Object(obj));
    } else {
        let width = fields.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
        for (key, value) in fields {
            println!("{:<width$}  {}", format!("{key}:").bold(), value, width = width + 1);
        }
    }
}

/// Prints a serializable value as compact JSON or pretty JSON.
pub fn print_value<T: Serialize>(value: &T, json_mode: bool) {
    let rendered = if json_mode {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    };
    match rendered {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("Error formatting output: {e}"),
    }
}

/// Prints a warning to stderr. Suppressed in JSON mode.
pub fn print_warning(msg: &str, json_mode: bool) {
    if !json_mode {
        eprintln!("{} {}", "warning:".yellow().bold(), msg);
    }
}

/// Prints an error to stderr.
pub fn print_error(err: &SwiftvaultError, json_mode: bool) {
    if json_mode {
        let obj = serde_json::json!({
            "error": err.to_string(),
            "transient": err.is_transient(),
        });
        eprintln!("{obj}");
    } else {
        eprintln!("{} {}", "error:".red().bold(), err);
        if let SwiftvaultError::VaultCorrupted { .. } = err {
            eprintln!("  recover the wallet from its phrase with {}", "swiftvault recover".bold());
        }
    }
}

/// Prints a table of rows in human mode, JSON array in JSON mode.
pub fn print_table(headers: &[&str], rows: &[Vec<String>], json_mode: bool) {
    if json_mode {
        let arr: Vec<serde_json::Value> = rows
            .iter()
            .map(|row| {
                let mut obj = serde_json::Map::new();
                for (i, h) in headers.iter().enumerate() {
                    let val = row.get(i).cloned().unwrap_or_default();
                    obj.insert(h.to_string(), serde_json::Value::String(val));
                }
                serde_json::Value::Object(obj)
            })
            .collect();
        println!("{}", serde_json::Value::Array(arr));
        return;
    }

    if rows.is_empty() {
        println!("{}", "(no results)".dimmed());
        return;
    }

    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() && cell.len() > widths[i] {
                widths[i] = cell.len();
            }
        }
    }

    let header_line: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:<w$}", h.to_uppercase(), w = widths[i]))
        .collect();
    println!("{}", header_line.join("  ").bold());

    let sep: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    println!("{}", sep.join("  ").dimmed());

    for row in rows {
        let line: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let w = widths.get(i).copied().unwrap_or(0);
                format!("{cell:<w$}")
            })
            .collect();
        println!("{}", line.join("  "));
    }
}

/// Formats a raw token amount with its decimals, trimming trailing zeros.
pub fn format_token_amount(raw: u64, decimals: u8) -> String {
    if decimals == 0 {
        return raw.to_string();
    }
    let digits = format!("{raw:0>width$}", width = decimals as usize + 1);
    let (whole, frac) = digits.split_at(digits.len() - decimals as usize);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{frac}")
    }
}
