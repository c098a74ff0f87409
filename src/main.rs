use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use leaf_doctor::bot::detect_and_annotate;
use leaf_doctor::config::VisionConfig;
use leaf_doctor::vision::{self, Annotator};
use leaf_doctor::{Config, Daemon, advisory};

/// Leaf Doctor - LINE bot that diagnoses leaf diseases from photos
#[derive(Parser)]
#[command(name = "leaf-doctor", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Config file (defaults to the user config directory)
    #[arg(short, long, global = true, env = "LEAF_DOCTOR_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the webhook server (default)
    Serve,
    /// Run the detector on a local image and print the diagnosis
    Detect {
        /// Image to diagnose
        image: PathBuf,
        /// Where to write the annotated copy (defaults to `<stem>_result.jpg`)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,leaf_doctor=info",
        1 => "info,leaf_doctor=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(cli.config.as_deref()).await,
        Command::Detect { image, output } => {
            let config = VisionConfig::load(cli.config.as_deref())?;
            tokio::task::spawn_blocking(move || detect(&config, &image, output))
                .await
                .map_err(|e| anyhow::anyhow!("detect task failed: {e}"))?
        }
    }
}

async fn serve(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = Config::load(config_path)?;

    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        static_dir = %config.media.static_dir.display(),
        "starting leaf-doctor"
    );

    Daemon::new(config).run().await?;
    Ok(())
}

fn detect(config: &VisionConfig, image_path: &Path, output: Option<PathBuf>) -> anyhow::Result<()> {
    let detector = vision::load_detector(config)?;
    let annotator = Annotator::load(config.font_path.as_deref());

    let image = image::open(image_path)?;
    let output = output.unwrap_or_else(|| result_path_for(image_path));
    let detections = detect_and_annotate(detector.as_ref(), &annotator, &image, &output)?;

    println!("{} detection(s) in {}", detections.len(), image_path.display());
    for d in &detections {
        println!(
            "  {:<16} {:.2}  [{:.0}, {:.0}, {:.0}, {:.0}]",
            d.class_name, d.confidence, d.bbox.xmin, d.bbox.ymin, d.bbox.xmax, d.bbox.ymax
        );
    }

    match advisory::diagnose(&detections) {
        Some(advisory) => println!("\n{}", advisory.text),
        None => println!("\n{}", advisory::NO_DISEASE_TEXT),
    }
    println!("\nannotated image: {}", output.display());

    Ok(())
}

fn result_path_for(image_path: &Path) -> PathBuf {
    let stem = image_path
        .file_stem()
        .map_or_else(|| "image".into(), |s| s.to_string_lossy());
    image_path.with_file_name(format!("{stem}_result.jpg"))
}
