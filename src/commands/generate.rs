use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use ogshot_lib::site::run_render_pass;
use ogshot_lib::{
    BuildEvent, CaptureWorker, GenerateOutput, OgError, OgOutput, PipelineContext,
    PlaywrightLauncher, ProgressReporter, Summary, OUTPUT_VERSION,
};

use crate::cli::OutputFormat;
use crate::formatting::{exit_code_for_run, render_error, write_output};
use crate::settings::{apply_settings, load_config, log_effective_config, resolve_settings};

/// Run the generate command.
#[allow(clippy::too_many_arguments)]
pub async fn run_generate(
    config_path: Option<PathBuf>,
    output_dir: PathBuf,
    all: bool,
    format: OutputFormat,
    output: Option<PathBuf>,
    ready_timeout: Option<u64>,
    no_color: bool,
) -> ExitCode {
    let mut config = match load_config(config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => return render_error(err, format, output),
    };
    let resolved = resolve_settings(all, ready_timeout, &config);
    apply_settings(&mut config, &resolved);
    log_effective_config(config_path.as_deref(), &config);

    let mut ctx = match PipelineContext::from_config(&config, resolved.prerender_all) {
        Ok(ctx) => ctx,
        Err(err) => return render_error(err, format, output),
    };
    let pass = match run_render_pass(&mut ctx, &output_dir, true) {
        Ok(pass) => pass,
        Err(err) => return render_error(err, format, output),
    };
    tracing::info!(
        pages = pass.pages.len(),
        queued = ctx.queue_len(),
        errors = pass.errors(),
        "render pass finished"
    );

    let colorize = !no_color && std::io::stderr().is_terminal();
    let launcher = Arc::new(PlaywrightLauncher::new(config.browser.clone()));
    let mut worker = CaptureWorker::new(
        output_dir.clone(),
        config.server.clone(),
        launcher,
        config.capture.clone(),
        config.output.dir_policy,
    )
    .with_progress(ProgressReporter::stderr_sink(), colorize);
    let report = ctx
        .on_build_event(BuildEvent::GenerationClosed, &mut worker)
        .await;

    let body = GenerateOutput {
        version: OUTPUT_VERSION.to_string(),
        output_dir,
        prerender_all: resolved.prerender_all,
        summary: Summary::new(&pass, Some(&report)),
        pages: pass.pages,
        report,
    };
    let clean = body.succeeded();
    if let Err(err) = write_output(&OgOutput::Generate(body), format, output.clone()) {
        return render_error(OgError::Unknown(err.to_string()), format, output);
    }
    exit_code_for_run(clean)
}
