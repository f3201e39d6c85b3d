use std::collections::HashSet;

use crate::news::Article;

/// Removes repeated articles, keeping the first occurrence of each `id-url-headline` key.
///
/// Order is preserved and the operation is idempotent.
pub fn dedupe<I>(articles: I) -> Vec<Article>
where
    I: IntoIterator<Item = Article>,
{
    let mut seen = HashSet::new();
    articles
        .into_iter()
        .filter(|a| seen.insert(a.dedupe_key()))
        .collect()
}
