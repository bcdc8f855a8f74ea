// ============================================================================
// lgtmify CLI — headless captioning via command-line arguments
// ============================================================================
//
// Usage examples:
//   lgtmify --input photo.jpg                       (writes lgtm-photo.png)
//   lgtmify -i photo.jpg -o reviewed.png
//   lgtmify -i "shots/*.png" --output-dir stamped/
//   lgtmify -i huge.png --max-width 1200 --max-height 800
//
// No window is opened in CLI mode. All processing runs synchronously on the
// current thread.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::compositor::{Bounds, CAPTION, Compositor, RenderSurface};
use crate::exporter::{lgtm_filename, write_png};
use crate::loader::{LoaderConfig, load_image};

/// lgtmify headless image captioner.
///
/// Stamp the LGTM caption onto images and save them as PNG — no GUI required.
#[derive(Parser, Debug)]
#[command(
    name = "lgtmify",
    about = "Stamp a bold LGTM caption onto images, headless",
    long_about = "Fit each input image into the given bounds, overlay the LGTM\n\
                  caption, and write the result as a PNG without opening the GUI.\n\
                  Accepts JPEG, PNG, GIF, and WebP inputs up to 10 MiB.\n\n\
                  Example:\n  \
                  lgtmify --input photo.jpg --output reviewed.png\n  \
                  lgtmify -i \"*.png\" --output-dir stamped/"
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.png", "shots/*.jpg").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Output file path. Only valid for single-file input.
    /// For batch input use --output-dir instead.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    /// Files are written here named lgtm-<stem>.png.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Maximum output width in pixels.
    #[arg(long, default_value_t = Bounds::default().max_width, value_name = "PX")]
    pub max_width: f32,

    /// Maximum output height in pixels.
    #[arg(long, default_value_t = Bounds::default().max_height, value_name = "PX")]
    pub max_height: f32,

    /// Print per-file timing information.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// Returns `true` when any CLI-mode flag is present in the real process
    /// arguments. Used by `main()` to route before creating a window.
    pub fn is_cli_mode() -> bool {
        std::env::args().any(|a| a == "--input" || a == "-i")
    }
}

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs) -> ExitCode {
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    if inputs.len() > 1 && args.output.is_some() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    if args.max_width <= 0.0 || args.max_height <= 0.0 {
        eprintln!("error: --max-width and --max-height must be positive.");
        return ExitCode::FAILURE;
    }
    let bounds = Bounds::new(args.max_width, args.max_height);

    if let Some(dir) = &args.output_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!(
            "error: could not create output directory '{}': {}",
            dir.display(),
            e
        );
        return ExitCode::FAILURE;
    }

    // Missing raster/text capability is fatal for the whole run, reported
    // once up front rather than per file.
    let mut compositor = match Compositor::new() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let config = LoaderConfig::default();
    let mut surface = RenderSurface::new();

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }

        let file_start = Instant::now();

        let output_path =
            build_output_path(input_path, args.output.as_deref(), args.output_dir.as_deref());

        match run_one(
            input_path,
            &output_path,
            &config,
            &mut compositor,
            &mut surface,
            bounds,
        ) {
            Ok(()) => {
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        output_path.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if any_failure {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Load, composite, and save one file.
fn run_one(
    input: &Path,
    output: &Path,
    config: &LoaderConfig,
    compositor: &mut Compositor,
    surface: &mut RenderSurface,
    bounds: Bounds,
) -> Result<(), String> {
    let image = load_image(input, config).map_err(|e| format!("load failed: {}", e))?;
    compositor.render(surface, &image, CAPTION, bounds);
    write_png(surface, output).map_err(|e| format!("save failed: {}", e))?;
    Ok(())
}

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// Compute the output path for a single input file.
///
/// Priority:
/// 1. `--output` (explicit path, single-file input)
/// 2. `--output-dir` joined with the derived lgtm filename
/// 3. Fallback: derived lgtm filename next to the input
fn build_output_path(input: &Path, output: Option<&Path>, output_dir: Option<&Path>) -> PathBuf {
    if let Some(out) = output {
        return out.to_path_buf();
    }

    let name = lgtm_filename(
        input
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default()
            .as_ref(),
    );

    if let Some(dir) = output_dir {
        return dir.join(name);
    }

    input.parent().unwrap_or(Path::new(".")).join(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_output_wins() {
        let p = build_output_path(
            Path::new("shots/photo.jpg"),
            Some(Path::new("custom.png")),
            None,
        );
        assert_eq!(p, PathBuf::from("custom.png"));
    }

    #[test]
    fn output_dir_uses_the_derived_name() {
        let p = build_output_path(Path::new("shots/photo.jpg"), None, Some(Path::new("out")));
        assert_eq!(p, PathBuf::from("out/lgtm-photo.png"));
    }

    #[test]
    fn fallback_writes_next_to_the_input() {
        let p = build_output_path(Path::new("shots/photo.jpg"), None, None);
        assert_eq!(p, PathBuf::from("shots/lgtm-photo.png"));
    }

    #[test]
    fn derived_name_never_collides_with_the_input() {
        // The lgtm- prefix plus forced .png extension guarantees this.
        let p = build_output_path(Path::new("a.png"), None, None);
        assert_eq!(p, PathBuf::from("lgtm-a.png"));
    }
}
