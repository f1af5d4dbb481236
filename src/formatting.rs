use std::fmt::Write as FmtWrite;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use ogshot_lib::{ErrorOutput, OgError, OgOutput, PageStatus, OUTPUT_VERSION};

use crate::cli::OutputFormat;

/// Write output in the requested format.
pub fn write_output(
    body: &OgOutput,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => write_json_output(body, output.as_deref())?,
        OutputFormat::Pretty => write_pretty_output(body, output.as_deref())?,
    };
    Ok(())
}

/// Render an error and return the appropriate exit code.
pub fn render_error(err: OgError, format: OutputFormat, output: Option<PathBuf>) -> ExitCode {
    let error_payload = err.to_payload();
    let payload = OgOutput::Error(ErrorOutput {
        version: OUTPUT_VERSION.to_string(),
        message: Some(error_payload.message.clone()),
        error: error_payload,
    });

    match format {
        OutputFormat::Json => {
            let content =
                serde_json::to_string(&payload).unwrap_or_else(|_| "{\"mode\":\"error\"}".into());
            if let Some(path) = output {
                if let Err(write_err) = std::fs::write(&path, &content) {
                    eprintln!("Failed to write error output: {}", write_err);
                    println!("{content}");
                }
            } else {
                println!("{content}");
            }
        }
        OutputFormat::Pretty => {
            if let Err(write_err) = write_pretty_output(&payload, output.as_deref()) {
                eprintln!("Failed to write error output: {}", write_err);
            }
        }
    };

    // Exit code 2 is fatal; failed captures use 1.
    ExitCode::from(2)
}

/// Write JSON output to file or stdout.
fn write_json_output(body: &OgOutput, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let content = serde_json::to_string(body)?;
    if let Some(path) = output {
        std::fs::write(path, content)?;
    } else {
        println!("{content}");
    }
    Ok(())
}

/// Write pretty output to file or stdout.
fn write_pretty_output(body: &OgOutput, output: Option<&Path>) -> io::Result<()> {
    let stdout_is_tty = std::io::stdout().is_terminal();
    let use_human = output.is_none() && stdout_is_tty;

    if use_human {
        let content = format_pretty(body, true);
        println!("{content}");
        return Ok(());
    }

    // Non-tty or file output: keep JSON shape for pipelines/files.
    let content =
        serde_json::to_string_pretty(body).unwrap_or_else(|_| "{\"mode\":\"error\"}".to_string());
    if let Some(path) = output {
        std::fs::write(path, &content)?;
    } else {
        println!("{content}");
    }
    Ok(())
}

/// Format output for human consumption in a terminal.
pub fn format_pretty(body: &OgOutput, colorize: bool) -> String {
    match body {
        OgOutput::Generate(out) => {
            let mut buf = String::new();
            let status = if out.succeeded() { "OK" } else { "FAIL" };
            let status_colored = color(status, if out.succeeded() { "32" } else { "31" }, colorize);
            writeln!(
                buf,
                "{} {} of {} preview image{} written to {}",
                status_colored,
                out.summary.succeeded,
                out.summary.queued,
                if out.summary.queued == 1 { "" } else { "s" },
                out.output_dir.display()
            )
            .ok();
            writeln!(buf, "Pages: {}", out.summary.pages).ok();
            if let Some(setup) = &out.report.setup_error {
                writeln!(
                    buf,
                    "{} {} ({} not attempted)",
                    color("Setup failed:", "31", colorize),
                    setup,
                    out.report.not_attempted
                )
                .ok();
            }
            let failures: Vec<_> = out.report.results.iter().filter(|r| !r.succeeded()).collect();
            if !failures.is_empty() {
                writeln!(buf, "Failed captures:").ok();
                for result in failures {
                    writeln!(
                        buf,
                        "- {} {}",
                        result.route,
                        color(result.error.as_deref().unwrap_or_default(), "31", colorize)
                    )
                    .ok();
                }
            }
            write_page_errors(&mut buf, &out.pages, colorize);
            buf
        }
        OgOutput::Inspect(out) => {
            let mut buf = String::new();
            let header = color("[INSPECT]", "36", colorize);
            writeln!(
                buf,
                "{} {} page{}, {} queued ({})",
                header,
                out.summary.pages,
                if out.summary.pages == 1 { "" } else { "s" },
                out.summary.queued,
                out.output_dir.display()
            )
            .ok();
            if !out.planned.is_empty() {
                writeln!(buf, "Planned images:").ok();
                for planned in &out.planned {
                    writeln!(
                        buf,
                        "- {:24} {} ({} {}x{})",
                        planned.route,
                        planned.output_path.display(),
                        planned.options.component,
                        planned.options.width,
                        planned.options.height
                    )
                    .ok();
                }
            }
            let skipped: Vec<_> = out
                .pages
                .iter()
                .filter_map(|p| p.outcome.as_ref().map(|o| (p, o)))
                .filter(|(_, o)| !matches!(o, PageStatus::Queued { .. } | PageStatus::NoImage))
                .collect();
            if !skipped.is_empty() {
                writeln!(buf, "Not captured:").ok();
                for (page, outcome) in skipped {
                    writeln!(buf, "- {:24} {}", page.route, status_label(outcome)).ok();
                }
            }
            write_page_errors(&mut buf, &out.pages, colorize);
            buf
        }
        OgOutput::Error(out) => {
            let mut buf = String::new();
            let header = color("[ERROR]", "31", colorize);
            let message = out
                .message
                .as_deref()
                .unwrap_or_else(|| out.error.message.as_str());
            writeln!(buf, "{} {}", header, message).ok();
            if let Some(remediation) = &out.error.remediation {
                writeln!(buf, "Hint: {}", remediation).ok();
            }
            buf
        }
    }
}

fn write_page_errors(buf: &mut String, pages: &[ogshot_lib::site::PageReport], colorize: bool) {
    let errors: Vec<_> = pages.iter().filter(|p| p.error.is_some()).collect();
    if errors.is_empty() {
        return;
    }
    writeln!(buf, "Page errors:").ok();
    for page in errors {
        writeln!(
            buf,
            "- {} {}",
            page.route,
            color(page.error.as_deref().unwrap_or_default(), "31", colorize)
        )
        .ok();
    }
}

/// Short human label for a page status.
fn status_label(status: &PageStatus) -> String {
    match status {
        PageStatus::Skipped => "skipped".to_string(),
        PageStatus::NotRenderable => "not renderable".to_string(),
        PageStatus::NoImage => "no image".to_string(),
        PageStatus::Suppressed => "suppressed by route rule".to_string(),
        PageStatus::OtherProvider { provider } => format!("provider {provider} not captured"),
        PageStatus::NotStatic => "not static (use --all)".to_string(),
        PageStatus::Queued { order } => format!("queued #{order}"),
    }
}

/// Apply ANSI color codes when enabled.
fn color(text: &str, code: &str, colorize: bool) -> String {
    if colorize {
        format!("\x1b[{}m{}\x1b[0m", code, text)
    } else {
        text.to_string()
    }
}

/// Exit code for a generate run: 0 when clean, 1 when any page or job failed.
pub fn exit_code_for_run(clean: bool) -> ExitCode {
    if clean {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}
