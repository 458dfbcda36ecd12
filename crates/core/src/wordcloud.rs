use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ab_glyph::{FontVec, PxScale};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::{
    error::{Result, StageError},
    types::Transcript,
    workdir::{WorkDir, discard_partial, incomplete_path},
};

const CANVAS: u32 = 1000;
const CENTER: f32 = 500.0;
const MASK_RADIUS: f32 = 400.0;
const MIN_FONT_PX: f32 = 14.0;
const MAX_FONT_PX: f32 = 96.0;
const MAX_WORDS: usize = 120;
const PADDING: i32 = 2;

/// Indigo → cyan → magenta, interpolated by glyph size.
const GRADIENT: [[u8; 3]; 3] = [[75, 0, 130], [0, 255, 255], [255, 0, 255]];

/// Render a word cloud from the transcript text.
///
/// Words are laid out largest-first on a deterministic spiral inside a
/// circular mask, so the same transcript always produces the same image.
pub async fn generate_word_cloud(transcript_json: &Path, work: &WorkDir) -> Result<PathBuf> {
    let output_path = work.wordcloud_path();
    if output_path.exists() {
        debug!(path = %output_path.display(), "word cloud already exists, skipping");
        return Ok(output_path);
    }

    info!(transcript = %transcript_json.display(), "generating word cloud");

    let content = fs::read_to_string(transcript_json).await?;
    let transcript: Transcript = serde_json::from_str(&content)?;

    let frequencies = word_frequencies(&transcript.text);
    if frequencies.is_empty() {
        warn!(transcript = %transcript_json.display(), "no usable words, rendering empty cloud");
    }

    let font = load_font()?;
    let img = render(&frequencies, &font);

    let tmp_path = incomplete_path(&output_path);
    if let Err(e) = img.save_with_format(&tmp_path, image::ImageFormat::Png) {
        discard_partial(&tmp_path).await;
        return Err(StageError::Tool {
            tool: "png encoder",
            path: output_path,
            reason: e.to_string(),
        });
    }
    if let Err(e) = fs::rename(&tmp_path, &output_path).await {
        discard_partial(&tmp_path).await;
        return Err(e.into());
    }

    info!(path = %output_path.display(), "word cloud saved");
    Ok(output_path)
}

/// Count non-stopword words, most frequent first. Ties break alphabetically
/// to keep the layout deterministic.
fn word_frequencies(text: &str) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for raw in text.split(|c: char| !c.is_alphanumeric() && c != '\'') {
        let word = raw.trim_matches('\'').to_lowercase();
        if word.len() < 2 || is_stopword(&word) {
            continue;
        }
        *counts.entry(word).or_default() += 1;
    }

    let mut frequencies: Vec<_> = counts.into_iter().collect();
    frequencies.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    frequencies.truncate(MAX_WORDS);
    frequencies
}

fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word) || FILLER_WORDS.contains(&word)
}

/// Load the first readable system font. The glyph shapes barely matter for a
/// word cloud; any sans-serif TTF will do.
fn load_font() -> Result<FontVec> {
    const CANDIDATES: &[&str] = &[
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        "/usr/share/fonts/truetype/freefont/FreeSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/Library/Fonts/Arial.ttf",
        "/System/Library/Fonts/Supplemental/Arial.ttf",
    ];
    for path in CANDIDATES {
        if let Ok(data) = std::fs::read(path)
            && let Ok(font) = FontVec::try_from_vec(data)
        {
            return Ok(font);
        }
    }
    Err(StageError::FontNotFound)
}

fn render(frequencies: &[(String, usize)], font: &FontVec) -> RgbaImage {
    let mut img = RgbaImage::from_pixel(CANVAS, CANVAS, Rgba([0, 0, 0, 255]));
    let max_count = frequencies.first().map(|(_, n)| *n).unwrap_or(1) as f32;
    let mut placed: Vec<(i32, i32, i32, i32)> = Vec::new();

    for (index, (word, count)) in frequencies.iter().enumerate() {
        // Square-root scaling keeps mid-frequency words readable instead of
        // letting the top word dwarf everything.
        let t = (*count as f32 / max_count).sqrt();
        let px = MIN_FONT_PX + (MAX_FONT_PX - MIN_FONT_PX) * t;
        let scale = PxScale::from(px);

        let (w, h) = text_size(scale, font, word);
        let w = w as i32;
        let h = h as i32;
        if w <= 0 || h <= 0 {
            continue;
        }

        if let Some((x, y)) = place(index, w, h, &placed) {
            let color = gradient_color((px - MIN_FONT_PX) / (MAX_FONT_PX - MIN_FONT_PX));
            draw_text_mut(&mut img, color, x, y, scale, font, word);
            placed.push((x, y, w, h));
        }
    }

    img
}

/// Walk a spiral out from the center until the word's bounding box fits
/// inside the circular mask without touching an earlier word. The starting
/// angle rotates per word so successive words fan out instead of queueing
/// on one ray.
fn place(word_index: usize, w: i32, h: i32, placed: &[(i32, i32, i32, i32)]) -> Option<(i32, i32)> {
    const GOLDEN_ANGLE: f32 = 2.399_963;
    const ANGLE_STEP: f32 = 0.4;
    const RADIUS_STEP: f32 = 0.35;

    let start = word_index as f32 * GOLDEN_ANGLE;
    let mut step = 0u32;
    loop {
        let radius = RADIUS_STEP * step as f32;
        if radius > MASK_RADIUS {
            return None;
        }
        let theta = start + ANGLE_STEP * step as f32;
        let x = (CENTER + radius * theta.cos() - w as f32 / 2.0) as i32;
        let y = (CENTER + radius * theta.sin() - h as f32 / 2.0) as i32;

        if fits_in_mask(x, y, w, h) && !placed.iter().any(|r| overlaps((x, y, w, h), *r)) {
            return Some((x, y));
        }
        step += 1;
    }
}

fn fits_in_mask(x: i32, y: i32, w: i32, h: i32) -> bool {
    let corners = [
        (x, y),
        (x + w, y),
        (x, y + h),
        (x + w, y + h),
    ];
    corners.iter().all(|&(cx, cy)| {
        let dx = cx as f32 - CENTER;
        let dy = cy as f32 - CENTER;
        dx * dx + dy * dy <= MASK_RADIUS * MASK_RADIUS
    })
}

fn overlaps(a: (i32, i32, i32, i32), b: (i32, i32, i32, i32)) -> bool {
    let (ax, ay, aw, ah) = a;
    let (bx, by, bw, bh) = b;
    ax < bx + bw + PADDING
        && bx < ax + aw + PADDING
        && ay < by + bh + PADDING
        && by < ay + ah + PADDING
}

/// Piecewise-linear interpolation through the three gradient anchors.
fn gradient_color(t: f32) -> Rgba<u8> {
    let t = t.clamp(0.0, 1.0);
    let (from, to, local) = if t <= 0.5 {
        (GRADIENT[0], GRADIENT[1], t * 2.0)
    } else {
        (GRADIENT[1], GRADIENT[2], (t - 0.5) * 2.0)
    };
    let lerp = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * local).round() as u8;
    Rgba([lerp(from[0], to[0]), lerp(from[1], to[1]), lerp(from[2], to[2]), 255])
}

/// English stopwords, the usual closed-class words.
const STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "ain", "all", "am", "an", "and", "any",
    "are", "aren't", "as", "at", "be", "because", "been", "before", "being", "below", "between",
    "both", "but", "by", "can", "can't", "cannot", "could", "couldn't", "did", "didn't", "do",
    "does", "doesn't", "doing", "don't", "down", "during", "each", "few", "for", "from",
    "further", "had", "hadn't", "has", "hasn't", "have", "haven't", "having", "he", "he'd",
    "he'll", "he's", "her", "here", "here's", "hers", "herself", "him", "himself", "his", "how",
    "how's", "i'd", "i'll", "i'm", "i've", "if", "in", "into", "is", "isn't", "it", "it's",
    "its", "itself", "just", "let's", "me", "more", "most", "mustn't", "my", "myself", "no",
    "nor", "not", "now", "of", "off", "on", "once", "only", "or", "other", "ought", "our",
    "ours", "ourselves", "out", "over", "own", "same", "shan't", "she", "she'd", "she'll",
    "she's", "should", "shouldn't", "so", "some", "such", "than", "that", "that's", "the",
    "their", "theirs", "them", "themselves", "then", "there", "there's", "these", "they",
    "they'd", "they'll", "they're", "they've", "this", "those", "through", "to", "too", "under",
    "until", "up", "very", "was", "wasn't", "we", "we'd", "we'll", "we're", "we've", "were",
    "weren't", "what", "what's", "when", "when's", "where", "where's", "which", "while", "who",
    "who's", "whom", "why", "why's", "will", "with", "won't", "would", "wouldn't", "you",
    "you'd", "you'll", "you're", "you've", "your", "yours", "yourself", "yourselves",
];

/// Spoken-filler words that dominate raw transcripts.
const FILLER_WORDS: &[&str] = &["um", "uh", "like", "know", "mean", "yeah", "gonna"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frequencies_filter_stopwords_and_fillers() {
        let words =
            word_frequencies("the pipeline um the pipeline uh processes like video and video");
        assert_eq!(words[0], ("pipeline".to_string(), 2));
        assert_eq!(words[1], ("video".to_string(), 2));
        assert_eq!(words.len(), 3);
        assert_eq!(words[2].0, "processes");
    }

    #[test]
    fn frequencies_order_by_count_then_alphabetically() {
        let words = word_frequencies("beta alpha beta alpha gamma");
        assert_eq!(words[0].0, "alpha");
        assert_eq!(words[1].0, "beta");
        assert_eq!(words[2].0, "gamma");
    }

    #[test]
    fn empty_text_yields_no_words() {
        assert!(word_frequencies("").is_empty());
        assert!(word_frequencies("the a and um uh").is_empty());
    }

    #[test]
    fn gradient_hits_the_three_anchors() {
        assert_eq!(gradient_color(0.0), Rgba([75, 0, 130, 255]));
        assert_eq!(gradient_color(0.5), Rgba([0, 255, 255, 255]));
        assert_eq!(gradient_color(1.0), Rgba([255, 0, 255, 255]));
        // Out-of-range sizes clamp instead of wrapping.
        assert_eq!(gradient_color(-1.0), gradient_color(0.0));
        assert_eq!(gradient_color(2.0), gradient_color(1.0));
    }

    #[test]
    fn first_word_lands_near_the_center() {
        let (x, y) = place(0, 100, 40, &[]).unwrap();
        assert!((x - (500 - 50)).abs() <= 2);
        assert!((y - (500 - 20)).abs() <= 2);
    }

    #[test]
    fn placement_respects_the_circular_mask() {
        // A rect wider than the mask diameter can never fit.
        assert!(place(0, 900, 40, &[]).is_none());
        assert!(fits_in_mask(450, 480, 100, 40));
        assert!(!fits_in_mask(0, 0, 100, 40));
    }

    #[test]
    fn placed_words_do_not_overlap() {
        let mut placed = Vec::new();
        for i in 0..20 {
            if let Some((x, y)) = place(i, 80, 30, &placed) {
                placed.push((x, y, 80, 30));
            }
        }
        assert!(placed.len() > 1);
        for (i, a) in placed.iter().enumerate() {
            for b in &placed[i + 1..] {
                assert!(!overlaps(*a, *b));
            }
        }
    }

    #[tokio::test]
    async fn existing_cloud_short_circuits_without_reading_transcript() {
        let tmp = tempfile::tempdir().unwrap();
        let video = tmp.path().join("clip.mp4");
        std::fs::write(&video, b"").unwrap();
        let work = WorkDir::for_video(&video).unwrap();
        work.ensure_dir().await.unwrap();
        std::fs::write(work.wordcloud_path(), b"cached").unwrap();

        let missing_transcript = work.transcript_json_path();
        let result = generate_word_cloud(&missing_transcript, &work)
            .await
            .unwrap();
        assert_eq!(result, work.wordcloud_path());
    }

    #[tokio::test]
    async fn renders_a_png_for_a_real_transcript() {
        // Skip when the test host has no system fonts.
        if load_font().is_err() {
            return;
        }

        let tmp = tempfile::tempdir().unwrap();
        let video = tmp.path().join("clip.mp4");
        std::fs::write(&video, b"").unwrap();
        let work = WorkDir::for_video(&video).unwrap();
        work.ensure_dir().await.unwrap();
        let transcript = serde_json::json!({
            "text": "pipelines process video video video into transcripts transcripts"
        });
        std::fs::write(work.transcript_json_path(), transcript.to_string()).unwrap();

        let path = generate_word_cloud(&work.transcript_json_path(), &work)
            .await
            .unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..4], b"\x89PNG");
        assert!(!incomplete_path(&path).exists());
    }
}
