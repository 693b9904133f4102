//! Record batching, enrichment and persistence
//!
//! A batch is enriched with one embedding call and inserted with one storage
//! call. Record order is kept throughout, so vector `i` lands on record `i`.
//! A failed embedding call drops the whole batch; nothing is inserted.

use crate::embedding::{EnrichmentError, Embedder};
use crate::storage::{ArticleRecord, Storage};
use crate::HarvestError;
use tracing::{debug, info};

/// Records waiting to be flushed
#[derive(Debug)]
pub struct PendingBatch {
    records: Vec<ArticleRecord>,
    capacity: usize,
}

impl PendingBatch {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Adds a record; returns true once the batch is full
    pub fn push(&mut self, record: ArticleRecord) -> bool {
        self.records.push(record);
        self.is_full()
    }

    pub fn is_full(&self) -> bool {
        self.records.len() >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Empties the batch, handing back its records in insertion order
    pub fn take(&mut self) -> Vec<ArticleRecord> {
        std::mem::replace(&mut self.records, Vec::with_capacity(self.capacity))
    }
}

/// Attaches one embedding per record, in order
///
/// Without an embedder, or when the service returns no vectors, records keep
/// a null embedding.
pub async fn enrich(
    embedder: Option<&dyn Embedder>,
    records: &mut [ArticleRecord],
) -> Result<(), EnrichmentError> {
    let Some(embedder) = embedder else {
        return Ok(());
    };
    if records.is_empty() {
        return Ok(());
    }

    let texts: Vec<String> = records.iter().map(ArticleRecord::embedding_text).collect();
    let Some(vectors) = embedder.embed(&texts).await? else {
        debug!("Embedding service returned no vectors for {} records", records.len());
        return Ok(());
    };

    if vectors.len() != records.len() {
        return Err(EnrichmentError::LengthMismatch {
            expected: records.len(),
            got: vectors.len(),
        });
    }

    for (record, vector) in records.iter_mut().zip(vectors) {
        record.embedding = Some(vector);
    }
    Ok(())
}

/// Enriches and inserts one batch
///
/// # Returns
///
/// The number of rows actually inserted; links already stored are absorbed.
pub async fn flush_batch(
    mut records: Vec<ArticleRecord>,
    embedder: Option<&dyn Embedder>,
    storage: &dyn Storage,
) -> Result<usize, HarvestError> {
    if records.is_empty() {
        return Ok(0);
    }

    enrich(embedder, &mut records).await?;
    let inserted = storage.insert_batch(&records)?;

    info!(
        "Persisted {} of {} records ({} already stored)",
        inserted,
        records.len(),
        records.len() - inserted
    );
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStorage;
    use crate::ArchiveId;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::Mutex;

    /// Encodes each text's position as its vector
    struct IndexEmbedder {
        calls: Mutex<Vec<Vec<String>>>,
        drop_last: bool,
    }

    impl IndexEmbedder {
        fn new(drop_last: bool) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                drop_last,
            }
        }
    }

    #[async_trait]
    impl Embedder for IndexEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Option<Vec<Vec<f32>>>, EnrichmentError> {
            self.calls.lock().unwrap().push(texts.to_vec());
            let mut vectors: Vec<Vec<f32>> = (0..texts.len()).map(|i| vec![i as f32]).collect();
            if self.drop_last {
                vectors.pop();
            }
            Ok(Some(vectors))
        }
    }

    struct NullEmbedder;

    #[async_trait]
    impl Embedder for NullEmbedder {
        async fn embed(&self, _texts: &[String]) -> Result<Option<Vec<Vec<f32>>>, EnrichmentError> {
            Ok(None)
        }
    }

    fn records(count: usize) -> Vec<ArticleRecord> {
        (0..count)
            .map(|i| {
                let mut record = ArticleRecord::new(
                    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                    ArchiveId::new("stubpress"),
                    format!("https://stub.example/article/{}", i),
                );
                record.title = Some(format!("Title {}", i));
                record
            })
            .collect()
    }

    #[test]
    fn test_pending_batch_fills_at_capacity() {
        let mut batch = PendingBatch::new(2);
        let mut input = records(3).into_iter();
        assert!(!batch.push(input.next().unwrap()));
        assert!(batch.push(input.next().unwrap()));

        let taken = batch.take();
        assert_eq!(taken.len(), 2);
        assert!(batch.is_empty());
        assert_eq!(taken[0].link, "https://stub.example/article/0");
    }

    #[tokio::test]
    async fn test_vectors_follow_record_order() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        let embedder = IndexEmbedder::new(false);

        let inserted = flush_batch(records(32), Some(&embedder), &storage).await.unwrap();
        assert_eq!(inserted, 32);
        assert_eq!(embedder.calls.lock().unwrap().len(), 1);
        assert_eq!(embedder.calls.lock().unwrap()[0][5], "Title 5\n\n");

        for i in [0usize, 9, 31] {
            let stored = storage
                .get_record(&format!("https://stub.example/article/{}", i))
                .unwrap()
                .unwrap();
            assert_eq!(stored.embedding, Some(vec![i as f32]));
        }
    }

    #[tokio::test]
    async fn test_length_mismatch_drops_batch() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        let embedder = IndexEmbedder::new(true);

        let err = flush_batch(records(4), Some(&embedder), &storage).await.unwrap_err();
        assert!(matches!(
            err,
            HarvestError::Enrichment(EnrichmentError::LengthMismatch {
                expected: 4,
                got: 3
            })
        ));
        assert_eq!(storage.count_archive(&ArchiveId::new("stubpress")).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_without_embedder_records_have_no_vector() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        flush_batch(records(2), None, &storage).await.unwrap();
        flush_batch(records(2), Some(&NullEmbedder), &storage).await.unwrap();

        let stored = storage
            .get_record("https://stub.example/article/1")
            .unwrap()
            .unwrap();
        assert_eq!(stored.embedding, None);
        assert_eq!(storage.count_archive(&ArchiveId::new("stubpress")).unwrap(), 2);
    }

    #[tokio::test]
    async fn test_empty_batch_skips_everything() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        let embedder = IndexEmbedder::new(false);
        assert_eq!(flush_batch(Vec::new(), Some(&embedder), &storage).await.unwrap(), 0);
        assert!(embedder.calls.lock().unwrap().is_empty());
    }
}
