// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! CLI output reporter with colored formatting

use super::runner::{ConvertRun, InfoRun};
use crate::io::Diagnostic;
use colored::*;
use std::path::Path;
use std::time::Duration;

/// CLI reporter for formatted output
pub struct Reporter;

impl Reporter {
    /// Report a finished conversion
    pub fn report_conversion(input: &Path, run: &ConvertRun) {
        let summary = &run.summary;
        println!("\n{}", "━".repeat(80).bright_black());
        println!(
            "{} {} {} {}",
            "Converted:".bold(),
            input.display().to_string().cyan(),
            "→".bright_black(),
            run.output.display().to_string().cyan()
        );
        println!("{}", "━".repeat(80).bright_black());
        println!(
            "  {} {} → {}",
            "Formats:".bright_black(),
            summary.source.to_string().yellow(),
            summary.target.to_string().yellow()
        );
        println!(
            "  {} {}",
            "Triangles:".bright_black(),
            summary.triangles.to_string().cyan()
        );
        println!(
            "  {} {}",
            "Time:".bright_black(),
            Self::format_duration(run.duration).yellow()
        );
        Self::report_diagnostics(&summary.diagnostics);
        println!("{}", "━".repeat(80).bright_black());
    }

    /// Report a document summary
    pub fn report_document(input: &Path, run: &InfoRun) {
        let summary = &run.summary;
        println!("\n{}", "━".repeat(80).bright_black());
        println!("{} {}", "File:".bold(), input.display().to_string().cyan());
        println!("{}", "━".repeat(80).bright_black());
        println!("  {} {}", "Unit:".bright_black(), summary.unit.cyan());
        for (name, value) in &summary.metadata {
            println!("  {} {}", format!("{name}:").bright_black(), value);
        }

        println!("\n{}", "Resources:".bold());
        for resource in &summary.resources {
            let name = resource
                .name
                .as_deref()
                .map(|name| format!(" \"{name}\""))
                .unwrap_or_default();
            let detail = match resource.kind.as_str() {
                "mesh object" => format!(
                    "{} vertices, {} triangles, {} beams",
                    resource.entries, resource.triangles, resource.beams
                ),
                "components object" => format!("{} components", resource.components),
                _ => format!("{} entries", resource.entries),
            };
            println!(
                "  {} {}{} {}",
                format!("#{}", resource.id).yellow(),
                resource.kind,
                name.cyan(),
                format!("({detail})").bright_black()
            );
        }

        println!("\n{}", "Build:".bold());
        println!(
            "  {} {}",
            "Items:".bright_black(),
            summary.build_items.to_string().cyan()
        );
        println!(
            "  {} {}",
            "Placed triangles:".bright_black(),
            summary.placed_triangles.to_string().cyan()
        );
        if let Some(b) = summary.bbox {
            println!(
                "  {} ({:.2}, {:.2}, {:.2}) → ({:.2}, {:.2}, {:.2})",
                "Bounds:".bright_black(),
                b[0],
                b[1],
                b[2],
                b[3],
                b[4],
                b[5]
            );
        }
        if !summary.attachments.is_empty() {
            println!(
                "  {} {}",
                "Attachments:".bright_black(),
                summary.attachments.join(", ")
            );
        }
        println!(
            "  {} {}",
            "Time:".bright_black(),
            Self::format_duration(run.duration).yellow()
        );
        Self::report_diagnostics(&run.diagnostics);
        println!("{}", "━".repeat(80).bright_black());
    }

    fn report_diagnostics(diagnostics: &[Diagnostic]) {
        if diagnostics.is_empty() {
            return;
        }
        println!(
            "\n{} {}",
            "⚠️  Tolerated:".yellow().bold(),
            format!("{} malformed elements", diagnostics.len()).yellow()
        );
        for diagnostic in diagnostics {
            println!(
                "  {} {}",
                format!("{}:", diagnostic.element).bright_black(),
                diagnostic.message
            );
        }
    }

    /// Report error
    pub fn report_error(message: &str) {
        eprintln!("\n{} {}", "❌ Error:".red().bold(), message);
    }

    /// Report warning
    pub fn report_warning(message: &str) {
        println!("\n{} {}", "⚠️  Warning:".yellow().bold(), message);
    }

    /// Report info
    pub fn report_info(message: &str) {
        println!("{} {}", "ℹ️".bright_blue(), message);
    }

    /// Format duration for display
    fn format_duration(duration: Duration) -> String {
        let micros = duration.as_micros();

        if micros < 1_000 {
            format!("{}µs", micros)
        } else if micros < 1_000_000 {
            format!("{:.2}ms", micros as f64 / 1_000.0)
        } else {
            format!("{:.2}s", micros as f64 / 1_000_000.0)
        }
    }

    /// Print success message
    pub fn success(message: &str) {
        println!("{} {}", "✅".green(), message.green());
    }
}
