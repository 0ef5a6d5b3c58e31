use anyhow::{Context, Result};
use params::{ParameterSet, Preset};
use renderer::{Renderer, RendererConfig, WINDOW_HEIGHT, WINDOW_WIDTH};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

pub fn run(args: Cli) -> Result<()> {
    initialise_tracing();

    let config = build_config(&args)?;
    tracing::info!(
        shader_dir = %config.shader_dir.display(),
        width = config.window_size.0,
        height = config.window_size.1,
        ui = config.show_ui,
        "starting chaos game"
    );
    Renderer::new(config).run()
}

fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

pub(crate) fn build_config(args: &Cli) -> Result<RendererConfig> {
    let mut params = ParameterSet::default();
    if let Some(path) = args.preset.as_deref() {
        let preset = Preset::load(path)
            .with_context(|| format!("failed to load preset {}", path.display()))?;
        preset.apply_to(&mut params);
        tracing::info!(
            preset = %path.display(),
            mode = params.selection_mode().label(),
            vertices = params.vertex_count(),
            "preset applied"
        );
    }

    Ok(RendererConfig {
        window_size: args.size.unwrap_or((WINDOW_WIDTH, WINDOW_HEIGHT)),
        shader_dir: args.shader_dir.clone(),
        show_ui: !args.hidden_ui,
        params,
    })
}
