//! Result sink: one bulk write per wave

use crate::article::Article;
use crate::storage::{ArticleStore, InsertReport, StoreError};
use std::collections::HashSet;
use std::sync::Arc;

pub struct ResultSink {
    store: Arc<dyn ArticleStore>,
}

impl ResultSink {
    pub fn new(store: Arc<dyn ArticleStore>) -> Self {
        Self { store }
    }

    /// Writes wave `wave_id`'s articles in a single bulk insert
    ///
    /// Articles sharing a link with an earlier one in the batch are left out.
    /// Failure is all-or-nothing; nothing is retried.
    pub fn flush(&self, wave_id: i64, articles: Vec<Article>) -> Result<InsertReport, StoreError> {
        let produced = articles.len();
        let batch = unique_by_link(articles);
        if batch.len() < produced {
            tracing::warn!(
                duplicates = produced - batch.len(),
                "Dropped duplicate links from the batch"
            );
        }

        if batch.is_empty() {
            tracing::info!("No new articles to insert");
            return Ok(InsertReport::default());
        }

        let report = self.store.insert_wave(wave_id, &batch)?;
        tracing::info!("Inserted count: {}", report.inserted_count);
        Ok(report)
    }
}

fn unique_by_link(articles: Vec<Article>) -> Vec<Article> {
    let mut links = HashSet::new();
    articles
        .into_iter()
        .filter(|article| links.insert(article.link.clone()))
        .collect()
}
