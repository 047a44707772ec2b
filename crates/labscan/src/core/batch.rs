//! Bounded concurrent batch extraction.
//!
//! Each document's pipeline is strictly sequential; across documents, batch
//! extraction runs multiple pipelines concurrently under a small fixed
//! concurrency limit (table detection and optical recognition are CPU- and
//! memory-heavy). Results come back in arrival order, and per-document
//! failures become failed-result entries rather than cancelling sibling
//! work.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::core::config::{DEFAULT_MAX_CONCURRENT_EXTRACTIONS, ExtractionConfig};
use crate::core::orchestrator::{GLOBAL_RUNTIME, extract_bytes, extract_file};
use crate::types::{ExtractionMethod, ExtractionResult};

/// Extract lab values from multiple files concurrently.
///
/// Concurrency is bounded by `ExtractionConfig::max_concurrent_extractions`
/// (default 3). Results are returned in the same order as the input paths;
/// a panicking task yields a failed-result entry for its slot.
pub async fn batch_extract_file(paths: Vec<impl AsRef<Path>>, config: &ExtractionConfig) -> Vec<ExtractionResult> {
    if paths.is_empty() {
        return Vec::new();
    }

    tracing::info!(files = paths.len(), "starting batch extraction");

    let config = Arc::new(config.clone());
    let max_concurrent = config
        .max_concurrent_extractions
        .unwrap_or(DEFAULT_MAX_CONCURRENT_EXTRACTIONS)
        .max(1);
    let semaphore = Arc::new(Semaphore::new(max_concurrent));

    let mut tasks = JoinSet::new();

    for (index, path) in paths.into_iter().enumerate() {
        let path_buf = path.as_ref().to_path_buf();
        let config_clone = Arc::clone(&config);
        let semaphore_clone = Arc::clone(&semaphore);

        tasks.spawn(async move {
            let _permit = semaphore_clone.acquire().await.unwrap();
            let result = extract_file(&path_buf, None, &config_clone).await;
            (index, result)
        });
    }

    let mut results: Vec<Option<ExtractionResult>> = Vec::new();
    results.resize_with(tasks.len(), || None);

    while let Some(task_result) = tasks.join_next().await {
        match task_result {
            Ok((index, result)) => results[index] = Some(result),
            Err(join_err) => {
                tracing::error!(error = %join_err, "batch extraction task panicked");
            }
        }
    }

    results
        .into_iter()
        .map(|slot| slot.unwrap_or_else(|| ExtractionResult::failed("extraction task panicked")))
        .collect()
}

/// Extract lab values from multiple in-memory documents concurrently.
///
/// Each entry is `(bytes, media_type)`. Semantics match
/// [`batch_extract_file`].
pub async fn batch_extract_bytes(contents: Vec<(&[u8], &str)>, config: &ExtractionConfig) -> Vec<ExtractionResult> {
    if contents.is_empty() {
        return Vec::new();
    }

    let config = Arc::new(config.clone());
    let max_concurrent = config
        .max_concurrent_extractions
        .unwrap_or(DEFAULT_MAX_CONCURRENT_EXTRACTIONS)
        .max(1);
    let semaphore = Arc::new(Semaphore::new(max_concurrent));

    let owned_contents: Vec<(Vec<u8>, String)> = contents
        .into_iter()
        .map(|(bytes, mime)| (bytes.to_vec(), mime.to_string()))
        .collect();

    let mut tasks = JoinSet::new();

    for (index, (bytes, media_type)) in owned_contents.into_iter().enumerate() {
        let config_clone = Arc::clone(&config);
        let semaphore_clone = Arc::clone(&semaphore);

        tasks.spawn(async move {
            let _permit = semaphore_clone.acquire().await.unwrap();
            let result = extract_bytes(&bytes, &media_type, &config_clone).await;
            (index, result)
        });
    }

    let mut results: Vec<Option<ExtractionResult>> = Vec::new();
    results.resize_with(tasks.len(), || None);

    while let Some(task_result) = tasks.join_next().await {
        match task_result {
            Ok((index, result)) => results[index] = Some(result),
            Err(join_err) => {
                tracing::error!(error = %join_err, "batch extraction task panicked");
            }
        }
    }

    results
        .into_iter()
        .map(|slot| slot.unwrap_or_else(|| ExtractionResult::failed("extraction task panicked")))
        .collect()
}

/// Synchronous wrapper for [`batch_extract_file`].
pub fn batch_extract_file_sync(paths: Vec<impl AsRef<Path>>, config: &ExtractionConfig) -> Vec<ExtractionResult> {
    GLOBAL_RUNTIME.block_on(batch_extract_file(paths, config))
}

/// Synchronous wrapper for [`batch_extract_bytes`].
pub fn batch_extract_bytes_sync(contents: Vec<(&[u8], &str)>, config: &ExtractionConfig) -> Vec<ExtractionResult> {
    GLOBAL_RUNTIME.block_on(batch_extract_bytes(contents, config))
}

/// Summary statistics over a batch of extraction results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionStatistics {
    pub total_files: usize,
    /// Results that recovered at least one lab value
    pub successful_extractions: usize,
    /// Results at or above 0.8 overall confidence
    pub high_confidence_extractions: usize,
    pub needs_manual_review: usize,
    pub total_lab_values_extracted: usize,
    pub average_confidence: f64,
    /// Distinct methods seen, in first-seen order
    pub extraction_methods: Vec<ExtractionMethod>,
}

/// Compute summary statistics for a batch of results.
pub fn extraction_statistics(results: &[ExtractionResult]) -> ExtractionStatistics {
    if results.is_empty() {
        return ExtractionStatistics {
            total_files: 0,
            successful_extractions: 0,
            high_confidence_extractions: 0,
            needs_manual_review: 0,
            total_lab_values_extracted: 0,
            average_confidence: 0.0,
            extraction_methods: Vec::new(),
        };
    }

    let successful = results.iter().filter(|r| !r.lab_values.is_empty()).count();
    let high_confidence = results.iter().filter(|r| r.overall_confidence >= 0.8).count();
    let needs_review = results.iter().filter(|r| r.requires_manual_review).count();
    let total_lab_values = results.iter().map(|r| r.lab_values.len()).sum();
    let average_confidence = results.iter().map(|r| r.overall_confidence).sum::<f64>() / results.len() as f64;

    let mut methods: Vec<ExtractionMethod> = Vec::new();
    for result in results {
        if !methods.contains(&result.method) {
            methods.push(result.method);
        }
    }

    ExtractionStatistics {
        total_files: results.len(),
        successful_extractions: successful,
        high_confidence_extractions: high_confidence,
        needs_manual_review: needs_review,
        total_lab_values_extracted: total_lab_values,
        average_confidence,
        extraction_methods: methods,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LabValue;

    fn result_with(confidence: f64, values: usize, method: ExtractionMethod) -> ExtractionResult {
        ExtractionResult {
            lab_values: (0..values)
                .map(|i| LabValue {
                    test_name: format!("test_{}", i),
                    value: 1.0,
                    unit: "mg/dL".to_string(),
                    reference_range: String::new(),
                    confidence,
                    is_abnormal: None,
                    source: None,
                    converted: false,
                })
                .collect(),
            method,
            stages_attempted: Vec::new(),
            overall_confidence: confidence,
            requires_manual_review: confidence < 0.7,
            errors: Vec::new(),
            content: None,
        }
    }

    #[test]
    fn test_statistics_empty() {
        let stats = extraction_statistics(&[]);
        assert_eq!(stats.total_files, 0);
        assert_eq!(stats.average_confidence, 0.0);
    }

    #[test]
    fn test_statistics_counts() {
        let results = vec![
            result_with(0.9, 3, ExtractionMethod::Tables),
            result_with(0.6, 1, ExtractionMethod::Text),
            result_with(0.0, 0, ExtractionMethod::Failed),
        ];

        let stats = extraction_statistics(&results);
        assert_eq!(stats.total_files, 3);
        assert_eq!(stats.successful_extractions, 2);
        assert_eq!(stats.high_confidence_extractions, 1);
        assert_eq!(stats.needs_manual_review, 2);
        assert_eq!(stats.total_lab_values_extracted, 4);
        assert!((stats.average_confidence - 0.5).abs() < 1e-9);
        assert_eq!(
            stats.extraction_methods,
            vec![ExtractionMethod::Tables, ExtractionMethod::Text, ExtractionMethod::Failed]
        );
    }

    #[tokio::test]
    async fn test_batch_empty_input() {
        let config = ExtractionConfig::default();
        let results = batch_extract_file(Vec::<&str>::new(), &config).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    #[cfg(feature = "ocr")]
    async fn test_batch_preserves_arrival_order_and_isolates_failures() {
        let config = ExtractionConfig::default();

        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("note.png");
        image::DynamicImage::new_luma8(8, 8).save(&good).unwrap();

        let missing = dir.path().join("missing.pdf");

        let results = batch_extract_file(vec![missing.clone(), good.clone()], &config).await;

        assert_eq!(results.len(), 2);
        // First slot: the missing file, failed but present
        assert_eq!(results[0].method, ExtractionMethod::Failed);
        assert!(results[0].requires_manual_review);
        // Second slot: processed independently of the sibling failure
        assert_ne!(results[1].method, ExtractionMethod::Failed);
    }
}
