use std::path::{Path, PathBuf};

use crate::error::{Result, StageError};

/// The six pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ExtractAudio,
    CompressAudio,
    Transcribe,
    Summarize,
    WordCloud,
    RenderHtml,
}

/// Per-video record of where every derived artifact lives.
///
/// All artifact names are derived once from the source video's stem. Nothing
/// downstream ever recovers the stem by parsing suffixes off a prior
/// artifact's filename.
#[derive(Debug, Clone)]
pub struct WorkDir {
    video: PathBuf,
    stem: String,
    dir: PathBuf,
}

impl WorkDir {
    /// Build the artifact record for a source video. The work directory is a
    /// sibling of the video, named after its stem; it is not created here.
    pub fn for_video(video: &Path) -> Result<Self> {
        let stem = video
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| StageError::Tool {
                tool: "walker",
                path: video.to_path_buf(),
                reason: "video path has no file stem".into(),
            })?;
        let dir = video
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(&stem);
        Ok(WorkDir {
            video: video.to_path_buf(),
            stem,
            dir,
        })
    }

    pub fn video(&self) -> &Path {
        &self.video
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// Relative reference from the HTML page back to the source video.
    pub fn video_href(&self) -> String {
        let name = self
            .video
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{}.mp4", self.stem));
        format!("../{name}")
    }

    pub fn audio_path(&self) -> PathBuf {
        self.dir.join(format!("{}.audio.mp3", self.stem))
    }

    pub fn compressed_audio_path(&self) -> PathBuf {
        self.dir.join(format!("{}.compressed_audio.mp3", self.stem))
    }

    pub fn transcript_json_path(&self) -> PathBuf {
        self.dir.join(format!("{}.transcript.json", self.stem))
    }

    pub fn transcript_txt_path(&self) -> PathBuf {
        self.dir.join(format!("{}.transcript.txt", self.stem))
    }

    pub fn summaries_path(&self) -> PathBuf {
        self.dir.join(format!("{}.summaries.json", self.stem))
    }

    pub fn wordcloud_path(&self) -> PathBuf {
        self.dir.join(format!("{}.wordcloud.png", self.stem))
    }

    pub fn html_path(&self) -> PathBuf {
        self.dir.join(format!("{}.html", self.stem))
    }

    /// Every final-named file a stage must produce for it to count as done.
    pub fn stage_outputs(&self, stage: Stage) -> Vec<PathBuf> {
        match stage {
            Stage::ExtractAudio => vec![self.audio_path()],
            Stage::CompressAudio => vec![self.compressed_audio_path()],
            Stage::Transcribe => {
                vec![self.transcript_json_path(), self.transcript_txt_path()]
            }
            Stage::Summarize => vec![self.summaries_path()],
            Stage::WordCloud => vec![self.wordcloud_path()],
            Stage::RenderHtml => vec![self.html_path()],
        }
    }

    /// A stage is complete when all of its final-named outputs exist.
    /// Presence is the only signal; contents are never validated.
    pub fn stage_complete(&self, stage: Stage) -> bool {
        self.stage_outputs(stage).iter().all(|p| p.exists())
    }
}

/// Transient name a stage writes to before renaming to the final name.
pub fn incomplete_path(final_path: &Path) -> PathBuf {
    let mut name = final_path.as_os_str().to_os_string();
    name.push(".incomplete");
    PathBuf::from(name)
}

/// Best-effort removal of a partially written output.
pub async fn discard_partial(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::warn!(path = %path.display(), error = %e, "failed to remove partial output");
    }
}
