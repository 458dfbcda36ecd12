use std::path::{Path, PathBuf};

use tracing::info;

use crate::{
    audio::{compress_audio, extract_audio},
    config::{ApiConfig, SummarizerConfig},
    error::Result,
    html::generate_html_summary,
    summarize::summarize_transcript,
    transcribe::extract_transcript,
    wordcloud::generate_word_cloud,
    workdir::WorkDir,
};

/// Run all six stages for one source video, in order, returning the HTML
/// report path.
///
/// Each stage short-circuits when its final-named output already exists, so
/// re-running a partially processed video resumes where it left off. The
/// first stage failure aborts the rest of the chain for this video; the
/// caller decides what to do with the batch.
pub async fn process_video_file(
    video: &Path,
    api: &ApiConfig,
    summarizer: &SummarizerConfig,
) -> Result<PathBuf> {
    info!(video = %video.display(), "processing video");

    let work = WorkDir::for_video(video)?;
    work.ensure_dir().await?;

    let audio = extract_audio(video, &work).await?;
    let compressed = compress_audio(&audio, &work).await?;
    let transcript = extract_transcript(&compressed, &work, api).await?;
    let summaries = summarize_transcript(&transcript, &work, api, summarizer).await?;
    generate_word_cloud(&transcript, &work).await?;
    let html = generate_html_summary(&summaries, &work).await?;

    info!(report = %html.display(), "video processed");
    Ok(html)
}
