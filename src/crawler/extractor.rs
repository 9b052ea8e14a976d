//! Article extraction
//!
//! Extraction runs in two phases because the parsed tree cannot cross an await:
//! [`ArticleExtractor::extract`] reads everything it needs from the document
//! synchronously, then [`ExtractedArticle::offload_images`] downloads and
//! stores the images before the final [`Article`] is built.

use crate::article::{Article, Image};
use crate::config::{DedupKeyKind, ExtractorConfig};
use crate::crawler::document::ParsedDocument;
use crate::media::MediaOffloader;
use crate::storage::DedupKey;
use crate::{ConfigError, ConfigResult};
use scraper::Selector;

/// Inline token marking an image position in the body text
pub fn placeholder(index: usize) -> String {
    format!("{{{{img{}}}}}", index)
}

/// Compiled selectors for one site layout
#[derive(Debug)]
pub struct ArticleExtractor {
    headline: Selector,
    time: Selector,
    body: Selector,
    image: Selector,
    caption: Selector,
    noise: Selector,
}

impl ArticleExtractor {
    pub fn new(config: &ExtractorConfig) -> ConfigResult<Self> {
        Ok(Self {
            headline: compile("headline-selector", &config.headline_selector)?,
            time: compile("time-selector", &config.time_selector)?,
            body: compile("body-selector", &config.body_selector)?,
            image: compile("image", "img")?,
            caption: compile("caption-selector", &config.caption_selector)?,
            noise: compile("noise-selector", &config.noise_selector)?,
        })
    }

    /// Headline (trimmed) and timestamp (verbatim); empty when missing
    pub fn headline(&self, doc: &ParsedDocument) -> (String, String) {
        let title = doc
            .first_text(&self.headline)
            .map(|t| t.trim().to_string())
            .unwrap_or_default();
        (title, doc.first_text(&self.time).unwrap_or_default())
    }

    /// Reads title, time, body and image references out of `doc`
    ///
    /// Noise blocks are stripped first. Images are marked before the body text
    /// is read so placeholders land in the body and captions do not.
    pub fn extract(&self, mut doc: ParsedDocument, source: &str, link: &str) -> ExtractedArticle {
        let (title, published_at) = self.headline(&doc);

        let removed = doc.remove(&self.noise);
        if removed > 0 {
            tracing::trace!(link, removed, "Stripped noise blocks");
        }

        let slots = doc.mark_images(&self.body, &self.image, &self.caption, placeholder);
        let page = doc.url().clone();
        let images = slots
            .into_iter()
            .map(|slot| ImageCandidate {
                index: slot.index,
                // Unresolvable sources are kept raw and rejected by the offloader
                url: page
                    .join(&slot.src)
                    .map(|u| u.to_string())
                    .unwrap_or(slot.src),
                description: slot.caption,
            })
            .collect();

        let body = doc.text_of(&self.body).trim().to_string();

        ExtractedArticle {
            title,
            published_at,
            body,
            images,
            source: source.to_string(),
            link: link.to_string(),
        }
    }
}

fn compile(field: &'static str, selector: &str) -> ConfigResult<Selector> {
    Selector::parse(selector).map_err(|_| ConfigError::InvalidSelector {
        field,
        selector: selector.to_string(),
    })
}

/// An image reference waiting to be offloaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCandidate {
    pub index: usize,
    pub url: String,
    pub description: String,
}

/// Article content read from a page, before image offload
#[derive(Debug, Clone)]
pub struct ExtractedArticle {
    pub title: String,
    pub published_at: String,
    pub body: String,
    pub images: Vec<ImageCandidate>,
    pub source: String,
    pub link: String,
}

/// Image offload counts for one article
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OffloadTally {
    pub stored: usize,
    pub failed: usize,
}

impl ExtractedArticle {
    /// Dedup key of the configured kind
    ///
    /// A page without a headline has no usable title+time identity, so it
    /// falls back to its link.
    pub fn dedup_key(&self, kind: DedupKeyKind) -> DedupKey {
        match kind {
            DedupKeyKind::TitleTime if self.title.is_empty() => DedupKey::Link(self.link.clone()),
            DedupKeyKind::Link => DedupKey::Link(self.link.clone()),
            DedupKeyKind::TitleTime => DedupKey::TitleTime {
                title: self.title.clone(),
                time: self.published_at.clone(),
            },
        }
    }

    /// Offloads images in document order and builds the article
    ///
    /// Failed images are dropped; their placeholders stay in the body.
    pub async fn offload_images(self, offloader: &MediaOffloader) -> (Article, OffloadTally) {
        let mut tally = OffloadTally::default();
        let mut images = Vec::with_capacity(self.images.len());

        for candidate in self.images {
            match offloader.offload(&candidate.url).await {
                Ok(stored) => {
                    tally.stored += 1;
                    images.push(Image {
                        public_url: stored.location,
                        description: candidate.description,
                    });
                }
                Err(e) => {
                    tally.failed += 1;
                    tracing::warn!(
                        image = %candidate.url,
                        index = candidate.index,
                        kind = e.kind(),
                        "Image offload failed: {}",
                        e
                    );
                }
            }
        }

        let article = Article {
            title: self.title,
            published_at: self.published_at,
            body: self.body,
            images,
            source: self.source,
            link: self.link,
        };

        (article, tally)
    }
}
