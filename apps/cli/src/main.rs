use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vidsum_core::{ApiConfig, SummarizerConfig, find_video_files, process_video_file};

#[derive(Parser)]
#[command(name = "vidsum")]
#[command(
    about = "Batch-process a directory of videos into transcripts, AI summaries, word clouds, and HTML reports"
)]
struct Cli {
    /// Directory containing video files to process
    directory: PathBuf,

    /// Path segment or filename to skip; may be given multiple times
    #[arg(long, value_name = "TOKEN")]
    exclude: Vec<String>,
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", secs / 60.0, secs % 60.0)
    }
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vidsum=info,vidsum_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // Validate the API credential early, before any work starts
    let api = match ApiConfig::from_env() {
        Ok(api) => api,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            std::process::exit(1);
        }
    };
    let summarizer = SummarizerConfig::default();

    if !cli.directory.is_dir() {
        eprintln!(
            "{} {} is not a directory",
            style("Error:").red().bold(),
            cli.directory.display()
        );
        std::process::exit(1);
    }

    println!(
        "\n{}  {}\n",
        style("vidsum").cyan().bold(),
        style("Video Summarizer").dim()
    );

    let videos = find_video_files(&cli.directory, &cli.exclude);
    if videos.is_empty() {
        println!(
            "{} No video files found in {}",
            style("!").yellow().bold(),
            cli.directory.display()
        );
        return Ok(());
    }

    println!(
        "{} Found {} video file(s)",
        style("✓").green().bold(),
        videos.len()
    );
    println!("{}", style("─".repeat(60)).dim());

    let total_start = Instant::now();
    let mut processed = 0usize;
    let mut failed = 0usize;

    for video in &videos {
        let step_start = Instant::now();
        let name = video
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| video.display().to_string());

        let spinner = create_spinner(&format!("Processing {name}..."));
        match process_video_file(video, &api, &summarizer).await {
            Ok(report) => {
                processed += 1;
                spinner.finish_with_message(format!(
                    "{} {} {} {}",
                    style("✓").green().bold(),
                    name,
                    style(format!("→ {}", report.display())).dim(),
                    style(format!("[{}]", format_duration(step_start.elapsed()))).dim()
                ));
            }
            // One bad file must not stop the batch
            Err(e) => {
                failed += 1;
                spinner.finish_with_message(format!(
                    "{} {} {}",
                    style("✗").red().bold(),
                    name,
                    style(format!("[{}]", format_duration(step_start.elapsed()))).dim()
                ));
                error!(video = %video.display(), error = %e, "failed to process video");
            }
        }
    }

    println!("{}", style("─".repeat(60)).dim());
    println!(
        "\n{} {} processed, {} failed {}\n",
        style("Done:").cyan().bold(),
        processed,
        failed,
        style(format!("[{}]", format_duration(total_start.elapsed()))).dim()
    );

    Ok(())
}
