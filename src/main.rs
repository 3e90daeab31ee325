use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::rc::Rc;
use sukashi::config::Config;
use sukashi::controller::attach;
use sukashi::host::{ElementRef, MemoryHost, BACKGROUND_IMAGE, BACKGROUND_REPEAT};
use sukashi::logging::LogFormat;
use sukashi::reactive::Observable;
use sukashi::watermark::{render_tile, RasterSurfaceFactory};

/// Sukashi - render tiled text watermarks as background images
#[derive(Parser, Debug)]
#[command(name = "sukashi")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Test configuration and exit
    #[arg(long)]
    test: bool,

    /// Container width, overrides `container.width`
    #[arg(long)]
    width: Option<f64>,

    /// Container height, overrides `container.height`
    #[arg(long)]
    height: Option<f64>,

    /// Viewport width, overrides `viewport.width`
    #[arg(long)]
    viewport_width: Option<f64>,

    /// Write the rendered PNG here instead of printing style declarations
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log output format (json or compact)
    #[arg(long, default_value = "json")]
    log_format: LogFormat,
}

fn main() {
    // Parse command-line arguments
    let args = Args::parse();

    // Initialize logging subsystem
    if let Err(e) = sukashi::logging::init_subscriber(args.log_format) {
        eprintln!("Failed to initialize logging subsystem: {}", e);
        std::process::exit(1);
    }

    // Load configuration from file
    let mut config = Config::from_file(&args.config).unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::process::exit(1);
    });

    if let Some(width) = args.width {
        config.container.width = width;
    }
    if let Some(height) = args.height {
        config.container.height = height;
    }
    if let Some(viewport_width) = args.viewport_width {
        config.viewport.width = viewport_width;
    }

    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    tracing::info!(
        config_file = %args.config.display(),
        mode = ?config.watermark.tile_mode(),
        container_width = config.container.width,
        container_height = config.container.height,
        viewport_width = config.viewport.width,
        system_fonts = config.fonts.system_fonts,
        "Configuration loaded successfully"
    );

    if args.test {
        println!("Configuration OK");
        return;
    }

    if let Err(e) = run(&args, &config) {
        tracing::error!(error = %format!("{:#}", e), "Failed to render watermark");
        std::process::exit(1);
    }
}

fn run(args: &Args, config: &Config) -> Result<()> {
    if config.watermark.is_inert() {
        tracing::info!("Watermark text is empty, nothing to render");
        return Ok(());
    }

    let fonts = config
        .fonts
        .font_book()
        .context("Failed to load fonts")?;
    let surfaces = RasterSurfaceFactory::with_font_book(fonts);

    match &args.output {
        Some(path) => {
            let tile = render_tile(
                &config.watermark,
                config.container.canvas_size(),
                config.viewport.width,
                &surfaces,
            )
            .context("Failed to generate watermark image")?;
            let png = tile.png_bytes().context("Failed to decode rendered image")?;
            std::fs::write(path, png)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(
                output = %path.display(),
                width = tile.width,
                height = tile.height,
                "Wrote watermark image"
            );
        }
        None => {
            // Declarations are read back from a watermarked container
            let host = Rc::new(
                MemoryHost::new()
                    .with_surfaces(Box::new(surfaces))
                    .with_viewport_width(config.viewport.width),
            );
            let element = host.create_element(config.container.width, config.container.height);
            let container = Observable::new(Some(element.clone() as ElementRef));
            let handle = attach(config.watermark.clone(), host.clone(), &container);
            let rounds = host.flush();

            let applied = handle
                .applied_background()
                .context("Failed to generate watermark image")?;
            tracing::info!(
                rounds = rounds,
                bytes = applied.image.len(),
                repeat = %applied.repeat,
                "Applied watermark to container"
            );

            println!("{}: {};", BACKGROUND_IMAGE, applied.image);
            println!("{}: {};", BACKGROUND_REPEAT, applied.repeat);
            handle.teardown();
        }
    }

    Ok(())
}
