use std::path::PathBuf;

use clap::Parser;
use renderer::DEFAULT_SHADER_DIR;

#[derive(Parser, Debug)]
#[command(
    name = "chaosgame",
    author,
    version,
    about = "Progressive GPU chaos game fractal viewer"
)]
pub struct Cli {
    /// Directory holding `simulate.wgsl`, `normalize.wgsl` and `present.wgsl`.
    /// Edits to these files are picked up while running.
    #[arg(long, value_name = "DIR", default_value = DEFAULT_SHADER_DIR)]
    pub shader_dir: PathBuf,

    /// TOML preset applied over the default parameters.
    #[arg(long, value_name = "FILE")]
    pub preset: Option<PathBuf>,

    /// Start with the settings panels hidden (F1 toggles them).
    #[arg(long)]
    pub hidden_ui: bool,

    /// Window size in physical pixels (e.g. `1920x1080`); the simulation runs at half of it.
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_window_size)]
    pub size: Option<(u32, u32)>,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_window_size(value: &str) -> Result<(u32, u32), String> {
    let trimmed = value.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, e.g. 1920x1080, got '{trimmed}'"))?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width '{}'", width.trim()))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height '{}'", height.trim()))?;

    // the render target is half the window; both halves must stay non-empty
    if width < 2 || height < 2 {
        return Err("window dimensions must be at least 2x2".to_string());
    }
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_fixed_layout() {
        let cli = Cli::try_parse_from(["chaosgame"]).expect("parses");
        assert_eq!(cli.shader_dir, PathBuf::from("shaders"));
        assert!(cli.preset.is_none());
        assert!(!cli.hidden_ui);
        assert!(cli.size.is_none());
    }

    #[test]
    fn flags_are_parsed() {
        let cli = Cli::try_parse_from([
            "chaosgame",
            "--shader-dir",
            "/tmp/stages",
            "--preset",
            "presets/sierpinski.toml",
            "--hidden-ui",
            "--size",
            "1280x720",
        ])
        .expect("parses");
        assert_eq!(cli.shader_dir, PathBuf::from("/tmp/stages"));
        assert_eq!(cli.preset, Some(PathBuf::from("presets/sierpinski.toml")));
        assert!(cli.hidden_ui);
        assert_eq!(cli.size, Some((1280, 720)));
    }

    #[test]
    fn window_size_accepts_common_separators() {
        assert_eq!(parse_window_size("800x600"), Ok((800, 600)));
        assert_eq!(parse_window_size(" 800 X 600 "), Ok((800, 600)));
        assert_eq!(parse_window_size("800×600"), Ok((800, 600)));
    }

    #[test]
    fn window_size_rejects_malformed_input() {
        assert!(parse_window_size("800").is_err());
        assert!(parse_window_size("axb").is_err());
        assert!(parse_window_size("1x600").is_err());
        assert!(Cli::try_parse_from(["chaosgame", "--size", "0x0"]).is_err());
    }
}
