use anyhow::{Context, Result, bail};
use backdrop_core::{
    Backdrop, BackgroundSpec, Config, EXPORT_FILE_NAME, ImageAsset, Rgb, init,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Image to submit on start-up
    input: Option<PathBuf>,

    /// Process INPUT without opening a window and write the result to --output
    #[arg(long, requires = "input")]
    headless: bool,

    /// Solid background colour for headless mode, e.g. "#ff0000"
    #[arg(long, conflicts_with = "background_image")]
    color: Option<Rgb>,

    /// Background image for headless mode
    #[arg(long)]
    background_image: Option<PathBuf>,

    /// Where headless mode writes the PNG
    #[arg(short, long, default_value = EXPORT_FILE_NAME)]
    output: PathBuf,

    /// Override the backend URL defined in .env
    #[arg(long)]
    backend_url: Option<String>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup
    init();
    let args = Args::parse();
    init_tracing(args.verbose);

    // Load config and override backend if specified via CLI
    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(url) = &args.backend_url {
        config = Config::builder()
            .with_backend_url(url.as_str())
            .with_request_timeout(config.request_timeout)
            .with_window_size(config.window_size[0], config.window_size[1])
            .build()
            .context("Invalid --backend-url")?;
    }
    tracing::debug!(backend = %config.backend_url, "configuration loaded");

    let app = Backdrop::with_config(config).context("Failed to initialize segmentation client")?;

    let input = match &args.input {
        Some(path) => Some(
            ImageAsset::open(path)
                .with_context(|| format!("Failed to read image {}", path.display()))?,
        ),
        None => None,
    };

    if !args.headless {
        if args.color.is_some() || args.background_image.is_some() {
            tracing::warn!("--color and --background-image only apply with --headless");
        }
        app.run_interactive(input)?;
        return Ok(());
    }

    let Some(raw) = input else {
        bail!("--headless needs an input image");
    };
    let background = background_from_args(&args)?;
    run_headless(&app, raw, background, &args.output).await
}

fn background_from_args(args: &Args) -> Result<BackgroundSpec> {
    if let Some(color) = args.color {
        return Ok(BackgroundSpec::SolidColor(color));
    }
    if let Some(path) = &args.background_image {
        let image = ImageAsset::open(path)
            .with_context(|| format!("Failed to read background image {}", path.display()))?;
        return Ok(BackgroundSpec::Image(image));
    }
    Ok(BackgroundSpec::Transparent)
}

async fn run_headless(
    app: &Backdrop,
    raw: ImageAsset,
    background: BackgroundSpec,
    output: &Path,
) -> Result<()> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
            .template("{spinner:.green} {msg}")?,
    );
    spinner.set_message(format!("Removing background from {}...", raw.name()));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = app.process(raw, background).await;
    spinner.finish_and_clear();

    let export = match result {
        Ok(export) => export,
        Err(e) => {
            eprintln!("{}", e.user_message());
            return Err(e).context("Background removal failed");
        }
    };

    std::fs::write(output, &export.bytes).with_context(|| format!("Failed to write {}", output.display()))?;
    println!(
        "Saved {}x{} image to {}",
        export.width,
        export.height,
        output.display()
    );
    Ok(())
}

/// `RUST_LOG` wins; otherwise `-v` flags pick the level.
fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
