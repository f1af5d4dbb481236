use std::path::PathBuf;
use std::process::ExitCode;

use ogshot_lib::site::run_render_pass;
use ogshot_lib::{
    InspectOutput, OgError, OgOutput, PipelineContext, PlannedImage, Summary, OUTPUT_VERSION,
};

use crate::cli::OutputFormat;
use crate::formatting::{exit_code_for_run, render_error, write_output};
use crate::settings::{apply_settings, load_config, log_effective_config, resolve_settings};

/// Run the inspect command: the render pass without side effects.
pub fn run_inspect(
    config_path: Option<PathBuf>,
    output_dir: PathBuf,
    all: bool,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> ExitCode {
    let mut config = match load_config(config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => return render_error(err, format, output),
    };
    let resolved = resolve_settings(all, None, &config);
    apply_settings(&mut config, &resolved);
    log_effective_config(config_path.as_deref(), &config);

    let mut ctx = match PipelineContext::from_config(&config, resolved.prerender_all) {
        Ok(ctx) => ctx,
        Err(err) => return render_error(err, format, output),
    };
    let pass = match run_render_pass(&mut ctx, &output_dir, false) {
        Ok(pass) => pass,
        Err(err) => return render_error(err, format, output),
    };

    let summary = Summary::new(&pass, None);
    let body = OgOutput::Inspect(InspectOutput {
        version: OUTPUT_VERSION.to_string(),
        output_dir,
        prerender_all: resolved.prerender_all,
        summary,
        pages: pass.pages,
        planned: ctx.queued().iter().map(PlannedImage::from).collect(),
    });
    if let Err(err) = write_output(&body, format, output.clone()) {
        return render_error(OgError::Unknown(err.to_string()), format, output);
    }
    exit_code_for_run(summary.is_clean())
}
