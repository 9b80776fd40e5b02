use crate::auth::{AuthProvider, LocalAuth};
use crate::blob_store::{BlobStore, LocalBlobStore};
use crate::config::Config;
use crate::entry_store::{EntryStore, LocalEntryStore};
use crate::tag_suggestions::{HttpTagSuggester, KeywordTagSuggester, TagSuggester};
use log::info;
use std::sync::Arc;

/// Handles to every backend the diary talks to. Built once at startup and
/// handed to the app; cloning shares the same backends.
#[derive(Clone)]
pub struct Services {
    pub auth: Arc<dyn AuthProvider>,
    pub entries: Arc<dyn EntryStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub tags: Arc<dyn TagSuggester>,
}

impl Services {
    pub fn from_config(config: &Config) -> Self {
        let tags: Arc<dyn TagSuggester> = match &config.tag_suggest_url {
            Some(url) => {
                info!("Using tag suggestions from {}", url);
                Arc::new(HttpTagSuggester::new(url.clone()))
            }
            None => Arc::new(KeywordTagSuggester),
        };

        Services {
            auth: Arc::new(LocalAuth::new(config.accounts.clone())),
            entries: Arc::new(LocalEntryStore::open(&config.data_dir)),
            blobs: Arc::new(LocalBlobStore::new(config.data_dir.join("blobs"))),
            tags,
        }
    }
}
