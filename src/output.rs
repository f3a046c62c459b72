//! Human and JSON rendering
//!
//! Text goes to stdout with optional colour; with `--json` every command
//! prints exactly one JSON document and nothing else on stdout.

use std::io::{self, Write};

use crossterm::style::{Color, Stylize};
use crossterm::tty::IsTty;
use flow_app::doctor::CheckStatus;
use flow_core::prelude::*;
use serde::Serialize;
use serde_json::json;

/// Whether coloured text should be used
pub fn color_enabled(configured: bool) -> bool {
    configured && std::env::var_os("NO_COLOR").is_none() && io::stdout().is_tty()
}

#[derive(Debug, Clone, Copy)]
pub struct Output {
    json: bool,
    color: bool,
}

impl Output {
    pub fn new(json: bool, color: bool) -> Self {
        Self { json, color }
    }

    pub fn is_json(&self) -> bool {
        self.json
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.color {
            text.with(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        if self.color {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }

    /// Print the command's JSON document
    pub fn json<T: Serialize>(&self, value: &T) -> Result<()> {
        let mut stdout = io::stdout().lock();
        serde_json::to_writer_pretty(&mut stdout, value)?;
        writeln!(stdout)?;
        Ok(())
    }

    pub fn heading(&self, text: &str) {
        if !self.json {
            println!("{}", self.bold(text));
        }
    }

    pub fn line(&self, text: &str) {
        if !self.json {
            println!("{}", text);
        }
    }

    pub fn success(&self, text: &str) {
        if !self.json {
            println!("{} {}", self.paint("✓", Color::Green), text);
        }
    }

    /// Warnings go to stderr so they never mix with parseable output
    pub fn warning(&self, text: &str) {
        eprintln!("{} {}", self.paint("warning:", Color::Yellow), text);
    }

    pub fn hint(&self, text: &str) {
        if !self.json {
            println!("  {}", self.paint(text, Color::DarkGrey));
        }
    }

    /// "[2/5] flutter build apk --release"
    pub fn step(&self, index: usize, total: usize, label: &str) {
        if !self.json {
            let counter = format!("[{}/{}]", index + 1, total);
            println!("{} {}", self.paint(&counter, Color::Cyan), label);
        }
    }

    pub fn status(&self, status: CheckStatus) -> String {
        match status {
            CheckStatus::Ok => self.paint("ok", Color::Green),
            CheckStatus::Warning => self.paint("warning", Color::Yellow),
            CheckStatus::Missing => self.paint("missing", Color::Red),
        }
    }

    /// Report a failed command on stderr, or as the JSON document
    pub fn error(&self, err: &Error) {
        if self.json {
            let mut body = json!({
                "kind": err.kind(),
                "message": err.to_string(),
                "exit_code": err.exit_code(),
            });
            if !err.choices().is_empty() {
                body["choices"] = json!(err.choices());
            }
            if let Error::DispatchFailed { step, total, label, code, output } = err {
                body["step"] = json!(step);
                body["total"] = json!(total);
                body["label"] = json!(label);
                body["code"] = json!(code);
                body["output"] = json!(output);
            }
            if let Err(e) = self.json(&json!({ "error": body })) {
                error!("Failed to write error document: {}", e);
            }
            return;
        }

        eprintln!("{} {}", self.paint("error:", Color::Red), err);
        match err {
            Error::TargetAmbiguous { kind, .. } => {
                eprintln!("  Pass --{} to choose one.", kind);
            }
            Error::NoProject { .. } => {
                eprintln!("  Run flow inside a Flutter app or pass --project PATH.");
            }
            _ => {}
        }
    }
}

/// Render rows as left-aligned columns
pub fn columns(rows: &[Vec<String>]) -> Vec<String> {
    let widths = rows.iter().fold(Vec::<usize>::new(), |mut widths, row| {
        for (i, cell) in row.iter().enumerate() {
            let len = cell.chars().count();
            match widths.get_mut(i) {
                Some(w) => *w = (*w).max(len),
                None => widths.push(len),
            }
        }
        widths
    });

    rows.iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(i, cell)| format!("{:width$}", cell, width = widths[i]))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        })
        .collect()
}
