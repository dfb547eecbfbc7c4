//! Prompts and sentinel strings.
//!
//! Every fixed piece of text the pipeline produces or sends lives here, so
//! the wording can be changed (or inspected by tests) in exactly one place.
//! Callers can override the system prompt via
//! [`crate::config::ReaderConfig::system_prompt`]; the constants here are
//! used only when no override is provided.

/// Title used when no heuristic produced one ("unknown paper").
pub const UNKNOWN_TITLE: &str = "未知论文";

/// Marker embedded in `scraped_text` when the page fetch failed.
pub const SCRAPE_FAILED_MARKER: &str = "爬取失败";

/// Summary returned without calling the model when there is nothing to summarise.
pub const SUMMARY_SKIPPED: &str = "无法总结：内容爬取失败";

/// Prefix of the summary when the model call failed.
pub const MODEL_FAILED_PREFIX: &str = "LLM调用失败";

/// Summary returned when the model answered without content.
pub const EMPTY_RESPONSE: &str = "错误：API返回空响应";

/// Appended to model input that was cut to the character budget.
pub const TRUNCATION_MARKER: &str = "...[内容已截取]";

/// Default system prompt for the paper summary.
///
/// Asks for: basic bibliographic info, a per-section summary, an objective
/// academic register, no formulas or code blocks, explicit data and figure
/// references, and a closing source line.
pub const SUMMARY_SYSTEM_PROMPT: &str = r#"你是一个学术论文总结助手。请用中文总结论文内容，要求如下：
1. 包含基本信息：标题、作者、机构等
2. 按章节结构总结，每部分约200字
3. 保持客观性，使用学术语言
4. 避免数学公式和代码块
5. 标注重要数据和图表引用
6. 在最后注明原始来源

格式要求：
- 使用二级标题（##）划分章节
- 保持关键术语的英文原文，必要时加中文翻译
- 以要点形式呈现核心贡献
- 保持句子简洁，去除冗余论证
- 在最后添加"来源：论文标题""#;

/// Build the user message wrapping the (already truncated) paper text.
pub fn summary_user_prompt(text: &str) -> String {
    format!("请基于以下论文内容生成结构化的中文摘要：\n\n{}", text)
}

/// Marker string stored as `scraped_text` after a failed page fetch.
pub fn scrape_failed(error: &dyn std::fmt::Display) -> String {
    format!("{}：{}", SCRAPE_FAILED_MARKER, error)
}

/// Summary string embedding a model failure.
pub fn model_failed(error: &dyn std::fmt::Display) -> String {
    format!("{}：{}", MODEL_FAILED_PREFIX, error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_lists_required_sections() {
        for needle in ["基本信息", "章节", "客观", "数学公式", "图表", "来源"] {
            assert!(
                SUMMARY_SYSTEM_PROMPT.contains(needle),
                "prompt is missing {needle}"
            );
        }
    }

    #[test]
    fn user_prompt_wraps_text() {
        let p = summary_user_prompt("Attention Is All You Need");
        assert!(p.ends_with("Attention Is All You Need"));
    }

    #[test]
    fn scrape_failure_marker_is_detectable() {
        let s = scrape_failed(&"HTTP 404");
        assert!(s.contains(SCRAPE_FAILED_MARKER));
        assert!(s.ends_with("HTTP 404"));
    }
}
