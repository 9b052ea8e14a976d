//! Article data model
//!
//! An [`Article`] is produced once per crawled article page and handed to the
//! result sink at the end of the wave. It is never mutated after construction.

use serde::Serialize;

/// An image that was successfully offloaded to the storage backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Image {
    /// Public URL (remote backend) or absolute path (local backend)
    pub public_url: String,

    /// Caption text taken from the enclosing figure
    pub description: String,
}

/// A fully extracted article
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Article {
    /// Headline text, empty when the page has no canonical headline
    pub title: String,

    /// Site-provided timestamp string, kept verbatim
    pub published_at: String,

    /// Body text carrying `{{imgN}}` placeholders
    pub body: String,

    /// Offloaded images in document order
    pub images: Vec<Image>,

    /// Source tag from configuration
    pub source: String,

    /// Canonical link of the article page
    pub link: String,
}

impl Article {
    /// Number of images that were successfully offloaded
    pub fn image_count(&self) -> usize {
        self.images.len()
    }
}
