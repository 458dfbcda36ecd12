use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};

use crate::{
    error::Result,
    types::SummaryDoc,
    workdir::{WorkDir, discard_partial, incomplete_path},
};

/// Render the static HTML report for a summarized video.
///
/// One self-contained page: inline styles, the source video embedded for
/// playback via a relative reference, and a collapsible provenance section
/// showing exactly how the summary was produced.
pub async fn generate_html_summary(summaries: &Path, work: &WorkDir) -> Result<PathBuf> {
    let output_path = work.html_path();
    if output_path.exists() {
        debug!(path = %output_path.display(), "HTML summary already exists, skipping");
        return Ok(output_path);
    }

    info!(summaries = %summaries.display(), "generating HTML summary");

    let content = fs::read_to_string(summaries).await?;
    let doc: SummaryDoc = serde_json::from_str(&content)?;

    let page = render_page(&doc, work.stem(), &work.video_href());

    let tmp_path = incomplete_path(&output_path);
    if let Err(e) = fs::write(&tmp_path, &page).await {
        discard_partial(&tmp_path).await;
        return Err(e.into());
    }
    if let Err(e) = fs::rename(&tmp_path, &output_path).await {
        discard_partial(&tmp_path).await;
        return Err(e.into());
    }

    info!(path = %output_path.display(), "HTML summary saved");
    Ok(output_path)
}

fn markdown_to_html(markdown: &str) -> String {
    let parser = pulldown_cmark::Parser::new(markdown);
    let mut html = String::new();
    pulldown_cmark::html::push_html(&mut html, parser);
    html
}

fn html_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn push_chips(out: &mut String, items: &[String]) {
    for item in items {
        out.push_str(&format!("<span>{}</span>\n", html_escape(item)));
    }
}

fn render_page(doc: &SummaryDoc, title: &str, video_href: &str) -> String {
    let title = html_escape(title);
    let page_summary_html = markdown_to_html(&doc.fields.page_summary);
    let schema_pretty = serde_json::to_string_pretty(&doc.llm_details.output_json_schema)
        .unwrap_or_else(|_| String::new());

    let mut out = String::new();
    out.push_str(&format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title}</title>
<style>
body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #FFFFFF; background-color: #000000; max-width: 1200px; margin: 0 auto; padding: 20px; }}
.container {{ display: flex; flex-wrap: wrap; gap: 20px; }}
.full-width {{ width: 100%; }}
.column {{ flex: 1; min-width: 300px; }}
h1 {{ color: #FF00FF; }}
h2 {{ color: #00FFFF; }}
.topics, .keywords {{ background-color: #4B0082; padding: 10px; border-radius: 5px; }}
.topics span, .keywords span {{ display: inline-block; margin-right: 10px; background-color: #DE3163; color: white; padding: 2px 8px; border-radius: 3px; }}
.pull-quote {{ background-color: #4B0082; padding: 10px; margin: 10px 0; border-radius: 5px; font-style: italic; }}
.summary {{ background-color: #1A1A1A; padding: 15px; border-radius: 5px; }}
#togglePrompt {{ cursor: pointer; color: #00FFFF; }}
pre {{ background-color: #1A1A1A; padding: 10px; border-radius: 5px; overflow-x: auto; color: #FFFFFF; }}
code {{ background-color: #111111; padding: 2px 4px; border-radius: 3px; color: #DE3163; }}
#promptDetails {{ max-height: 0; overflow: hidden; transition: max-height 0.5s ease-out, opacity 0.5s ease-out; opacity: 0; }}
#promptDetails.show {{ max-height: 2000px; transition: max-height 0.5s ease-in, opacity 0.5s ease-in; opacity: 1; }}
.video-container {{ display: flex; justify-content: center; align-items: center; margin: 20px 0; }}
.video-container video {{ max-width: 80%; height: auto; }}
</style>
</head>
<body>
<div class="container">
<div class="full-width">
<h1>{title}</h1>
<p id="togglePrompt"><small>as summarized by </small><code>{model}</code><small> at temperature </small><code>{temperature}</code></p>
<div id="promptDetails">
<h3>System Prompt:</h3>
<pre>{system_prompt}</pre>
<h3>Output Schema:</h3>
<pre>{schema}</pre>
</div>
<div class="video-container">
<video width="100%" controls>
<source src="{video_href}" type="video/mp4">
Your browser does not support the video tag.
</video>
</div>
<p><strong>{sentence}</strong></p>
"#,
        model = html_escape(&doc.llm_details.model),
        temperature = doc.llm_details.temperature,
        system_prompt = html_escape(&doc.llm_details.system_prompt),
        schema = html_escape(&schema_pretty),
        sentence = html_escape(&doc.fields.sentence_summary),
    ));

    out.push_str("<p class=\"topics\">\n<strong>Topics:</strong><br/>\n<small>\n");
    push_chips(&mut out, &doc.fields.topics);
    out.push_str("</small>\n</p>\n</div>\n");

    out.push_str("<div class=\"column\">\n<h2>Abstract</h2>\n");
    out.push_str(&format!(
        "<p>{}</p>\n",
        html_escape(&doc.fields.paragraph_summary)
    ));
    out.push_str("<p class=\"keywords\">\n<strong>Keywords:</strong><br/>\n<small>\n");
    push_chips(&mut out, &doc.fields.keywords);
    out.push_str("</small>\n</p>\n");
    for quote in &doc.fields.pull_quotes {
        out.push_str(&format!(
            "<p class=\"pull-quote\">{}</p>\n",
            html_escape(quote)
        ));
    }
    out.push_str("</div>\n");

    out.push_str("<div class=\"column\">\n<div class=\"summary\">\n");
    out.push_str(&page_summary_html);
    out.push_str("</div>\n</div>\n</div>\n");

    out.push_str(
        r#"<script>
document.getElementById('togglePrompt').addEventListener('click', function() {
    var details = document.getElementById('promptDetails');
    details.classList.toggle('show');
});
</script>
</body>
</html>
"#,
    );

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LlmDetails, SummaryFields};
    use serde_json::json;

    fn sample_doc() -> SummaryDoc {
        SummaryDoc {
            fields: SummaryFields {
                page_summary: "# Heading\n\n- first point".into(),
                paragraph_summary: "A paragraph about <tags> & things.".into(),
                sentence_summary: "One sentence.".into(),
                topics: vec!["distributed systems".into()],
                keywords: vec!["consensus".into()],
                pull_quotes: vec!["\"memorable quote\"".into()],
            },
            llm_details: LlmDetails {
                model: "gpt-4o-2024-08-06".into(),
                temperature: 0.0,
                system_prompt: "You are an expert summarizer.".into(),
                output_json_schema: json!({"type": "json_schema"}),
                input_file: "clip.transcript.json".into(),
            },
        }
    }

    #[test]
    fn page_references_the_source_video() {
        let page = render_page(&sample_doc(), "clip", "../clip.mp4");
        assert!(page.contains("<source src=\"../clip.mp4\" type=\"video/mp4\">"));
        assert!(page.contains("<title>clip</title>"));
    }

    #[test]
    fn page_embeds_all_summary_fields() {
        let page = render_page(&sample_doc(), "clip", "../clip.mp4");
        assert!(page.contains("One sentence."));
        assert!(page.contains("distributed systems"));
        assert!(page.contains("consensus"));
        assert!(page.contains("&quot;memorable quote&quot;"));
        assert!(page.contains("gpt-4o-2024-08-06"));
    }

    #[test]
    fn page_summary_markdown_is_rendered() {
        let page = render_page(&sample_doc(), "clip", "../clip.mp4");
        assert!(page.contains("<h1>Heading</h1>"));
        assert!(page.contains("<li>first point</li>"));
    }

    #[test]
    fn untrusted_text_is_escaped() {
        let page = render_page(&sample_doc(), "clip", "../clip.mp4");
        assert!(page.contains("A paragraph about &lt;tags&gt; &amp; things."));
    }

    #[tokio::test]
    async fn writes_the_report_next_to_the_other_artifacts() {
        let tmp = tempfile::tempdir().unwrap();
        let video = tmp.path().join("clip.mp4");
        std::fs::write(&video, b"").unwrap();
        let work = WorkDir::for_video(&video).unwrap();
        work.ensure_dir().await.unwrap();
        std::fs::write(
            work.summaries_path(),
            serde_json::to_string(&sample_doc()).unwrap(),
        )
        .unwrap();

        let path = generate_html_summary(&work.summaries_path(), &work)
            .await
            .unwrap();
        assert_eq!(path, work.html_path());
        let html = std::fs::read_to_string(&path).unwrap();
        assert!(html.contains("../clip.mp4"));
        assert!(!incomplete_path(&path).exists());
    }

    #[tokio::test]
    async fn existing_report_short_circuits_without_reading_summaries() {
        let tmp = tempfile::tempdir().unwrap();
        let video = tmp.path().join("clip.mp4");
        std::fs::write(&video, b"").unwrap();
        let work = WorkDir::for_video(&video).unwrap();
        work.ensure_dir().await.unwrap();
        std::fs::write(work.html_path(), b"cached").unwrap();

        let missing_summaries = work.summaries_path();
        let result = generate_html_summary(&missing_summaries, &work)
            .await
            .unwrap();
        assert_eq!(result, work.html_path());
    }
}
