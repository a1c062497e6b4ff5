//! The `mscz-recover` run: wire the carver to its collaborators.

use std::sync::atomic::AtomicBool;

use anyhow::{Context, Result};
use colored::Colorize;
use serde::{Deserialize, Serialize};

use crate::carve::{ArchiveSink, CarveResult, Carver, DiscardSink, RecoveredFile};
use crate::cli::{Cli, OutputFormat};
use crate::config::Config;
use crate::export::DirectorySink;
use crate::progress::{human_size, ScanProgress};

/// Everything a run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub result: CarveResult,
    pub files: Vec<RecoveredFile>,
}

/// Scan the medium named on the command line.
///
/// Returns an error only for failures that end the run: unreadable medium,
/// bad options, or an output directory that cannot be created.
pub fn run_recovery(cli: &Cli, config: &Config, cancel: &AtomicBool) -> Result<RunReport> {
    let options = cli.carve_options(config);
    let carver = Carver::new(options)
        .with_context(|| format!("Failed to open input: {}", cli.file_path.display()))?;

    tracing::info!(
        "Input file: {}, size: {}, to be parsed: {}",
        carver.source().display(),
        human_size(carver.medium_size()),
        human_size(carver.parse_size())
    );

    let mut sink: Box<dyn ArchiveSink> = if cli.dry_run {
        Box::new(DiscardSink)
    } else {
        let output_dir = cli.output_dir(config);
        Box::new(DirectorySink::create(&output_dir).with_context(|| {
            format!("Failed to create output directory: {}", output_dir.display())
        })?)
    };

    let progress = match cli.output_format {
        OutputFormat::Human => ScanProgress::new(carver.parse_size()),
        OutputFormat::Json => ScanProgress::hidden(carver.parse_size()),
    };

    let outcome = carver.carve_with_progress(sink.as_mut(), cancel, |done, msg| {
        progress.update(done, msg);
    });

    match outcome {
        Ok((files, result)) => {
            progress.finish(if result.cancelled { "Cancelled" } else { "Done" });
            Ok(RunReport { result, files })
        }
        Err(e) => {
            progress.finish("Failed");
            Err(e).with_context(|| format!("Scan of {} failed", cli.file_path.display()))
        }
    }
}

/// Print the run summary in the requested format
pub fn print_report(report: &RunReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        OutputFormat::Human => {
            print!("{}", format_report(report));
        }
    }
    Ok(())
}

/// Human-readable summary
pub fn format_report(report: &RunReport) -> String {
    let r = &report.result;
    let mut out = String::new();

    out.push_str(&format!(
        "\n  {} {}\n",
        "mscz-recover".bright_cyan().bold(),
        if r.cancelled { "(cancelled)".yellow().to_string() } else { String::new() }
    ));
    out.push_str(&format!(
        "  Scanned {} in {} chunks, {} EOCD signatures, {} candidates, {} rejected\n",
        human_size(r.bytes_scanned),
        r.chunks,
        r.signatures_found,
        r.candidates,
        r.rejected
    ));

    for file in &report.files {
        let target = match &file.path {
            Some(p) => p.display().to_string(),
            None => "(not written)".dimmed().to_string(),
        };
        out.push_str(&format!(
            "  {} {:#014x} {:>10}  {} -> {}\n",
            "✓".green(),
            file.offset,
            human_size(file.size),
            file.entry_name,
            target
        ));
    }

    out.push_str(&format!(
        "  Recovered {} archive(s), {} written, {} failed, {} total\n",
        r.archives_recovered,
        r.archives_written,
        r.write_failures,
        human_size(r.bytes_recovered)
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn missing_input_is_an_error() {
        let cli = Cli::try_parse_from(["mscz-recover", "-f", "/nonexistent/disk.img"]).unwrap();
        let err = run_recovery(&cli, &Config::default(), &AtomicBool::new(false)).unwrap_err();
        assert!(err.to_string().contains("Failed to open input"));
    }

    #[test]
    fn report_lists_recovered_files() {
        colored::control::set_override(false);
        let report = RunReport {
            result: CarveResult {
                chunks: 3,
                signatures_found: 2,
                candidates: 1,
                archives_recovered: 1,
                archives_written: 1,
                bytes_recovered: 2048,
                ..Default::default()
            },
            files: vec![RecoveredFile {
                offset: 0x1000,
                size: 2048,
                entry_name: "Waltz.mscx".into(),
                path: Some("out/Waltz.mscz".into()),
                hash: "00".into(),
            }],
        };

        let text = format_report(&report);
        assert!(text.contains("0x000000001000"));
        assert!(text.contains("Waltz.mscx -> out/Waltz.mscz"));
        assert!(text.contains("Recovered 1 archive(s), 1 written, 0 failed"));
    }
}
