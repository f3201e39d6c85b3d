use crate::core::DigestError;
use crate::news::ArticleBatch;

const NEWS_SUMMARY_PROMPT: &str = "\
You are writing a short daily market news digest for a retail investor.

Summarize the articles below. Group related stories, lead with the most market-moving \
ones, and keep each item to two or three plain sentences explaining what happened and why \
it matters. Mention the ticker symbols involved. Do not invent facts, prices, or \
recommendations that are not in the articles. Do not add a greeting or a sign-off.

Articles (JSON):
";

/// Builds the summarization prompt with the batch embedded as pretty JSON.
pub(crate) fn news_summary_prompt(articles: &ArticleBatch) -> Result<String, DigestError> {
    let json = serde_json::to_string_pretty(articles)?;
    Ok(format!("{NEWS_SUMMARY_PROMPT}{json}\n"))
}
