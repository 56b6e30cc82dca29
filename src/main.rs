use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use getsub::config::{load_config, load_default_config, Config};
use getsub::downloader::DownloaderRegistry;
use getsub::pipeline::{Pipeline, RunReport, VideoOutcome};
use getsub::video::{collect_videos, Video};
use getsub::Error;

#[derive(Parser)]
#[command(name = "getsub")]
#[command(about = "Find, score and extract the best matching subtitle for a video")]
#[command(version)]
struct Cli {
    /// The video's name or full path, or a directory with videos
    name: String,

    /// Store subtitles in this directory instead of next to the video
    #[arg(short = 'p', long = "directory")]
    directory: Option<PathBuf>,

    /// Replace subtitles that already exist
    #[arg(short = 'o', long)]
    over: bool,

    /// Also save the downloaded archive
    #[arg(short = 'm', long)]
    more: bool,

    /// Extract both the .ass and the .srt subtitle
    #[arg(short = 'b', long)]
    both: bool,

    /// Number of search results to consider
    #[arg(short = 'n', long = "number")]
    number: Option<usize>,

    /// Only search this site
    #[arg(short = 'd', long)]
    downloader: Option<String>,

    /// Local directory of subtitle archives to search
    #[arg(short = 'l', long)]
    library: Option<PathBuf>,

    /// Name subtitles `<video>.zh.<ext>` for Plex
    #[arg(long)]
    plex: bool,

    /// Show debug logs
    #[arg(long)]
    debug: bool,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,

    /// Config file (default: the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    /// Command line flags take precedence over the config file.
    fn apply(&self, config: &mut Config) {
        if let Some(directory) = &self.directory {
            config.store_path = Some(directory.clone());
        }
        if let Some(number) = self.number {
            config.sub_num = number;
        }
        if let Some(downloader) = &self.downloader {
            config.downloader = Some(downloader.clone());
        }
        if let Some(library) = &self.library {
            config.library = Some(library.clone());
        }
        config.over |= self.over;
        config.more |= self.more;
        config.both |= self.both;
        config.plex |= self.plex;
    }
}

fn init_tracing(debug: bool) {
    let default_filter = if debug { "getsub=debug" } else { "getsub=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_outcome(video: &Video, outcome: &VideoOutcome) {
    println!();
    println!("- Video: {}", video.file_name());
    println!("- Video Path: {}", video.dir.display());
    println!("- Subtitles Store Path: {}", video.store_path.display());

    match outcome {
        VideoOutcome::Skipped => println!("subtitle already exists, add '-o' to replace it."),
        VideoOutcome::Done(extracted) => {
            for subtitle in extracted {
                println!("Extracted: {}", getsub::file_name(&subtitle.source));
            }
        }
        VideoOutcome::NoResults | VideoOutcome::NoMatch(_) => {
            if let Some(error) = outcome.failure() {
                println!("ERROR: {}", error);
            }
        }
    }
}

fn print_report(report: &RunReport) {
    if !report.failed.is_empty() {
        println!();
        println!("=============================== FAILED LIST ===============================");
        for (i, failed) in report.failed.iter().enumerate() {
            println!("{:>2}. name: {}", i + 1, failed.name);
            println!("    path: {}", failed.path);
            println!("    info: {}", failed.error);
        }
    }

    println!();
    println!(
        "total: {}  success: {}  fail: {}",
        report.total, report.success, report.fail
    );
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => load_default_config()?,
    };
    cli.apply(&mut config);
    config.validate()?;

    let registry = DownloaderRegistry::from_config(&config)?;
    if registry.is_empty() {
        return Err(Error::Config(
            "no downloaders configured, pass --library or set `library` in the config file"
                .to_string(),
        )
        .into());
    }

    let videos = collect_videos(&cli.name, config.store_path.as_deref(), config.identifier())?;
    let pipeline = Pipeline::new(config, registry);

    if cli.json {
        let report = pipeline.run(&videos);
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let report = pipeline.run_with(&videos, print_outcome);
        print_report(&report);
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
