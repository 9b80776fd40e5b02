use crate::diary_entry::EntryId;
use crate::error::SuggestError;
use futures::future::BoxFuture;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const MAX_KEYWORD_TAGS: usize = 5;
const STOPWORDS: &[&str] = &[
    "about", "after", "again", "also", "been", "before", "being", "could", "every", "from",
    "have", "into", "just", "like", "more", "much", "once", "only", "other", "over", "some",
    "than", "that", "their", "them", "then", "there", "these", "they", "this", "time", "upon",
    "very", "were", "what", "when", "where", "which", "while", "with", "would", "your",
];

/// Advisory tag source. Results are candidates, not commitments.
pub trait TagSuggester: Send + Sync {
    fn suggest(&self, content: String) -> BoxFuture<'_, Result<Vec<String>, SuggestError>>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SuggestRequest<'a> {
    diary_content: &'a str,
}

#[derive(Deserialize)]
struct SuggestResponse {
    tags: Vec<String>,
}

/// Posts the entry text to a tagging endpoint.
pub struct HttpTagSuggester {
    client: reqwest::Client,
    url: String,
}

impl HttpTagSuggester {
    pub fn new(url: impl Into<String>) -> Self {
        HttpTagSuggester {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

impl TagSuggester for HttpTagSuggester {
    fn suggest(&self, content: String) -> BoxFuture<'_, Result<Vec<String>, SuggestError>> {
        Box::pin(async move {
            let response: SuggestResponse = self
                .client
                .post(&self.url)
                .json(&SuggestRequest {
                    diary_content: &content,
                })
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            info!("Received {} tag suggestions", response.tags.len());
            Ok(response.tags)
        })
    }
}

/// Offline fallback: the most frequent longer words of the entry.
pub struct KeywordTagSuggester;

impl KeywordTagSuggester {
    fn keywords(content: &str) -> Vec<String> {
        let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
        let words = content
            .split(|c: char| !c.is_alphanumeric())
            .map(|w| w.to_lowercase())
            .filter(|w| w.chars().count() >= 4 && !STOPWORDS.contains(&w.as_str()));
        for (pos, word) in words.enumerate() {
            counts.entry(word).or_insert((0, pos)).0 += 1;
        }

        let mut ranked: Vec<_> = counts.into_iter().collect();
        ranked.sort_by(|(_, (ca, pa)), (_, (cb, pb))| cb.cmp(ca).then(pa.cmp(pb)));
        ranked
            .into_iter()
            .take(MAX_KEYWORD_TAGS)
            .map(|(word, _)| word)
            .collect()
    }
}

impl TagSuggester for KeywordTagSuggester {
    fn suggest(&self, content: String) -> BoxFuture<'_, Result<Vec<String>, SuggestError>> {
        Box::pin(async move { Ok(Self::keywords(&content)) })
    }
}

/// Asks `suggester` for tags, refusing empty text before any call and
/// dropping tags the entry already carries.
pub async fn suggest_tags(
    suggester: &dyn TagSuggester,
    content: String,
    current_tags: &[String],
) -> Result<Vec<String>, SuggestError> {
    if content.trim().is_empty() {
        return Err(SuggestError::EmptyContent);
    }
    let tags = suggester.suggest(content).await?;
    let mut fresh: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim().to_string();
        if !tag.is_empty() && !current_tags.contains(&tag) && !fresh.contains(&tag) {
            fresh.push(tag);
        }
    }
    debug!("{} new tag suggestions", fresh.len());
    Ok(fresh)
}

/// Suggestions currently on offer for one entry.
#[derive(Debug, Default)]
pub struct TagSuggestions {
    entry: Option<EntryId>,
    tags: Vec<String>,
    loading: bool,
}

impl TagSuggestions {
    pub fn start(&mut self, entry: EntryId) {
        self.entry = Some(entry);
        self.tags.clear();
        self.loading = true;
    }

    pub fn finish(&mut self, entry: &EntryId, result: Option<Vec<String>>) {
        if self.entry.as_ref() != Some(entry) {
            return;
        }
        self.loading = false;
        self.tags = result.unwrap_or_default();
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Suggestions for `entry`, empty when they belong to another entry.
    pub fn for_entry(&self, entry: &EntryId) -> &[String] {
        if self.entry.as_ref() == Some(entry) {
            &self.tags
        } else {
            &[]
        }
    }

    /// Removes and returns the suggestion at `index`.
    pub fn take(&mut self, entry: &EntryId, index: usize) -> Option<String> {
        if self.entry.as_ref() != Some(entry) || index >= self.tags.len() {
            return None;
        }
        Some(self.tags.remove(index))
    }

    pub fn clear(&mut self) {
        *self = TagSuggestions::default();
    }
}
