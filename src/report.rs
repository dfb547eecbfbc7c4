//! JSON and HTML artifacts.
//!
//! Everything lands under [`ReaderConfig::output_dir`] as `<title>.json` and
//! `<title>.html`. Files are written to a `.tmp` sibling and renamed into
//! place so a crash never leaves a half-written report.
//!
//! The HTML page is self-contained (inline CSS, remote `img` links only).
//! The gallery is built from the PNG pass alone; the generic image list only
//! shows up in the JSON.

use crate::config::ReaderConfig;
use crate::error::PaperReaderError;
use crate::output::{url_basename, PaperRecord, PaperReport};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

static RE_FIGURE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"x(\d+)").unwrap());

const STYLESHEET: &str = r#"
        body { font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; line-height: 1.6; margin: 0; padding: 20px; background-color: #f5f5f5; color: #333; }
        .container { max-width: 1200px; margin: 0 auto; background: white; padding: 30px; border-radius: 10px; box-shadow: 0 2px 10px rgba(0,0,0,0.1); }
        .header { text-align: center; border-bottom: 2px solid #007acc; padding-bottom: 20px; margin-bottom: 30px; }
        .header h1 { color: #007acc; margin: 0; font-size: 2.5em; }
        .meta-info { background: #f8f9fa; padding: 15px; border-radius: 5px; margin-bottom: 20px; border-left: 4px solid #007acc; }
        .meta-info p { margin: 5px 0; }
        .summary-section { margin-bottom: 30px; }
        .summary-section h2, .images-section h2 { color: #007acc; border-bottom: 1px solid #ddd; padding-bottom: 10px; }
        .summary-content { background: #fafafa; padding: 20px; border-radius: 5px; white-space: pre-wrap; line-height: 1.8; }
        .images-section { margin-top: 30px; }
        .image-gallery { display: grid; grid-template-columns: repeat(auto-fit, minmax(300px, 1fr)); gap: 20px; margin-top: 20px; }
        .image-item { text-align: center; background: #f8f9fa; padding: 15px; border-radius: 8px; border: 1px solid #ddd; }
        .image-item img { max-width: 100%; height: auto; border-radius: 5px; box-shadow: 0 2px 5px rgba(0,0,0,0.1); }
        .image-caption { margin-top: 10px; font-size: 0.9em; color: #666; }
        .original-text { margin-top: 30px; padding: 20px; background: #f8f9fa; border-radius: 5px; max-height: 400px; overflow-y: auto; border: 1px solid #ddd; }
        .original-text h3 { color: #007acc; margin-top: 0; }
        .footer { text-align: center; margin-top: 30px; padding-top: 20px; border-top: 1px solid #ddd; color: #666; }
        @media (max-width: 768px) { .container { padding: 15px; } .image-gallery { grid-template-columns: 1fr; } }
"#;

/// Create `dir` (and parents) if missing.
pub async fn ensure_output_dir(dir: &Path) -> Result<(), PaperReaderError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| PaperReaderError::OutputWriteFailed {
            path: dir.to_path_buf(),
            source: e,
        })
}

/// Write `contents` to `path` via a temporary sibling and a rename.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), PaperReaderError> {
    let write_err = |e: std::io::Error| PaperReaderError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp_path, contents).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    debug!("wrote {} ({} bytes)", path.display(), contents.len());
    Ok(())
}

/// Pretty-print `value` as JSON (non-ASCII kept) into `path`.
pub async fn write_json_pretty<T: Serialize>(
    path: &Path,
    value: &T,
) -> Result<(), PaperReaderError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| PaperReaderError::Internal(format!("JSON encoding: {e}")))?;
    write_atomic(path, json.as_bytes()).await
}

/// Write `<title>.json` under `dir`; returns its path.
pub async fn write_json_report(
    dir: &Path,
    title: &str,
    report: &PaperReport,
) -> Result<PathBuf, PaperReaderError> {
    ensure_output_dir(dir).await?;
    let path = dir.join(format!("{title}.json"));
    write_json_pretty(&path, report).await?;
    Ok(path)
}

/// Gallery caption stem for the `index`-th (1-based) PNG.
///
/// The file name up to its first `.`, rewritten to `Figure N` when it
/// contains `x<N>` (arXiv HTML names figures `x1.png`, `x2.png`, ...).
/// Falls back to `PNG图片 <index>` when the URL has no usable file name.
pub fn image_caption(url: &str, index: usize) -> String {
    let mut name = format!("PNG图片 {index}");
    if url.contains('/') {
        let filename = url_basename(url);
        if let Some((stem, _)) = filename.split_once('.') {
            name = stem.to_string();
        }
    }
    match RE_FIGURE_NUMBER.captures(&name) {
        Some(caps) => format!("Figure {}", &caps[1]),
        None => name,
    }
}

/// First `max_chars` characters of `text`, plus `...` when longer.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

fn render_gallery(png_images: &[String], limit: usize) -> String {
    if png_images.is_empty() {
        return String::new();
    }

    let mut out = String::from(
        "<div class=\"images-section\">\n<h2>📷 论文PNG图片</h2>\n<div class=\"image-gallery\">\n",
    );
    for (i, img_url) in png_images.iter().take(limit).enumerate() {
        let caption = image_caption(img_url, i + 1);
        let src = html_escape::encode_double_quoted_attribute(img_url);
        let alt = html_escape::encode_double_quoted_attribute(&caption);
        out.push_str(&format!(
            r#"
            <div class="image-item">
                <img src="{src}" alt="{alt}" onerror="this.style.display='none'; this.nextElementSibling.innerHTML='图片加载失败'">
                <p class="image-caption">{caption} (PNG)</p>
            </div>"#,
            caption = html_escape::encode_text(&caption),
        ));
    }
    out.push_str("</div>\n</div>\n");
    out
}

/// Render the HTML report of `record`. `model_name` goes in the footer.
pub fn render_html_report(
    record: &PaperRecord,
    config: &ReaderConfig,
    model_name: &str,
    generated_at: &str,
) -> String {
    let model = html_escape::encode_text(model_name);
    let url_attr = html_escape::encode_double_quoted_attribute(&record.content_url);
    let url_text = html_escape::encode_text(&record.content_url);
    let summary = html_escape::encode_text(&record.text_summary);
    let original = excerpt(&record.scraped_text, config.excerpt_chars);
    let original = html_escape::encode_text(&original);
    let gallery = render_gallery(&record.png_images, config.gallery_limit);

    format!(
        r#"<!DOCTYPE html>
<html lang="zh-CN">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>论文阅读报告</title>
    <style>{STYLESHEET}    </style>
</head>
<body>
    <div class="container">
        <div class="header">
            <h1>📚 论文阅读报告</h1>
            <p>AI智能论文分析工具生成</p>
        </div>

        <div class="meta-info">
            <p><strong>📄 论文链接：</strong><a href="{url_attr}" target="_blank">{url_text}</a></p>
            <p><strong>📅 生成时间：</strong>{generated_at}</p>
        </div>

        <div class="summary-section">
            <h2>📝 论文摘要</h2>
            <div class="summary-content">{summary}</div>
        </div>

        {gallery}

        <div class="original-text">
            <h3>📄 原始文本（前{excerpt_chars}字符）</h3>
            <p>{original}</p>
        </div>

        <div class="footer">
            <p>由论文阅读工具生成 | 基于 {model}</p>
        </div>
    </div>
</body>
</html>"#,
        excerpt_chars = config.excerpt_chars,
    )
}

/// Render and write `<title>.html` under `dir`; returns its path.
pub async fn write_html_report(
    dir: &Path,
    record: &PaperRecord,
    config: &ReaderConfig,
    model_name: &str,
) -> Result<PathBuf, PaperReaderError> {
    ensure_output_dir(dir).await?;
    let generated_at = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let html = render_html_report(record, config, model_name, &generated_at);
    let path = dir.join(format!("{}.html", record.paper_title));
    write_atomic(&path, html.as_bytes()).await?;
    Ok(path)
}
