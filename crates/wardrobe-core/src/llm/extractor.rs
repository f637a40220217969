//! Attribute extraction engine.
//!
//! Takes prepared (letterboxed) garment photos and runs the vision model
//! over them with bounded concurrency (semaphore). Results are delivered
//! via a callback as they complete. The default bound is 1, which walks the
//! batch sequentially; raising it opts into parallel API calls.

use super::parse;
use super::provider::{ImageInput, LlmProvider, LlmRequest};
use super::retry;
use crate::attributes::GarmentAttributes;
use crate::config::Config;
use crate::pipeline::PreparedImage;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Configuration for the extraction engine.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Maximum concurrent LLM calls
    pub parallel: usize,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    /// Maximum retries per image
    pub retry_attempts: u32,
    /// Base backoff delay in milliseconds
    pub retry_delay_ms: u64,
    /// The extraction prompt sent with every photo
    pub prompt: String,
    /// Maximum tokens the model may generate
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            parallel: 1,
            timeout_ms: 60_000,
            retry_attempts: 3,
            retry_delay_ms: 1000,
            prompt: super::prompt::default_prompt(),
            max_tokens: 500,
            temperature: 0.0,
        }
    }
}

impl ExtractOptions {
    /// Build options from the loaded configuration.
    pub fn from_config(config: &Config, prompt: String) -> Self {
        Self {
            parallel: config.processing.parallel_workers,
            timeout_ms: config.limits.llm_timeout_ms,
            retry_attempts: config.extraction.retry_attempts,
            retry_delay_ms: config.extraction.retry_delay_ms,
            prompt,
            max_tokens: config.extraction.max_tokens,
            temperature: config.extraction.temperature,
        }
    }
}

/// Result of extracting attributes from a single photo.
#[derive(Debug)]
pub enum ExtractOutcome {
    Success(GarmentAttributes),
    Failure(PathBuf, String),
}

/// Bounded-concurrency attribute extraction engine.
pub struct AttributeExtractor {
    provider: Arc<dyn LlmProvider>,
    options: ExtractOptions,
}

impl AttributeExtractor {
    pub fn new(provider: Box<dyn LlmProvider>, options: ExtractOptions) -> Self {
        Self {
            provider: Arc::from(provider),
            options,
        }
    }

    /// Extract attributes for a batch of prepared photos.
    ///
    /// Spawns one tokio task per photo, bounded by a semaphore. Calls
    /// `on_result` for each completed extraction so the CLI can stream
    /// records and advance its progress bar in real time.
    ///
    /// Returns `(succeeded, failed)` counts.
    pub async fn extract_batch<F>(&self, images: &[PreparedImage], on_result: F) -> (usize, usize)
    where
        F: Fn(ExtractOutcome) + Send + Sync + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.options.parallel));
        let on_result = Arc::new(on_result);
        let mut handles = Vec::with_capacity(images.len());

        for image in images {
            let permit = semaphore.clone().acquire_owned().await;
            if permit.is_err() {
                tracing::warn!("Extraction semaphore closed unexpectedly — stopping batch");
                break;
            }
            let permit = permit.unwrap();

            let provider = self.provider.clone();
            let options = self.options.clone();
            let on_result = on_result.clone();
            let image = image.clone();

            let handle = tokio::spawn(async move {
                let result = extract_single(&provider, &image, &options).await;
                let success = matches!(&result, ExtractOutcome::Success(_));
                drop(permit); // Release concurrency permit before callback
                on_result(result);
                success
            });

            handles.push(handle);
        }

        // Wait for all tasks and count results
        let mut succeeded = 0usize;
        let mut failed = 0usize;

        for handle in handles {
            match handle.await {
                Ok(true) => succeeded += 1,
                Ok(false) => failed += 1,
                Err(e) => {
                    tracing::error!("Extraction task panicked: {e}");
                    failed += 1;
                }
            }
        }

        (succeeded, failed)
    }
}

/// Extract attributes for a single photo with retry logic.
async fn extract_single(
    provider: &Arc<dyn LlmProvider>,
    image: &PreparedImage,
    options: &ExtractOptions,
) -> ExtractOutcome {
    // The letterboxed copy is what the model sees
    let image_bytes = match tokio::fs::read(&image.resized_path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return ExtractOutcome::Failure(
                image.resized_path.clone(),
                format!("Failed to read resized image: {e}"),
            );
        }
    };

    let image_input = ImageInput::from_bytes(&image_bytes, "jpeg");
    let request = LlmRequest::extract_attributes(
        image_input,
        &options.prompt,
        options.max_tokens,
        options.temperature,
    );

    // Retry loop
    let mut last_error = String::new();
    for attempt in 0..=options.retry_attempts {
        if attempt > 0 {
            let delay = retry::backoff_duration(attempt - 1, options.retry_delay_ms);
            tracing::debug!(
                "Retry {attempt}/{} for {:?} after {delay:?}",
                options.retry_attempts,
                image.source_path
            );
            tokio::time::sleep(delay).await;
        }

        match tokio::time::timeout(
            std::time::Duration::from_millis(options.timeout_ms),
            provider.generate(&request),
        )
        .await
        {
            Ok(Ok(response)) => {
                return match parse::parse_attribute_response(&response.text, &image.id) {
                    Ok(attrs) => {
                        tracing::debug!(
                            "Extracted {:?} from {:?} in {}ms",
                            attrs.kind,
                            image.source_path,
                            response.latency_ms
                        );
                        ExtractOutcome::Success(attrs)
                    }
                    // A syntactically broken response is a final failure:
                    // re-asking the same model the same question is not a retry
                    Err(e) => ExtractOutcome::Failure(
                        image.source_path.clone(),
                        format!("Unparseable response: {e}"),
                    ),
                };
            }
            Ok(Err(e)) => {
                last_error = e.to_string();
                if !retry::is_retryable(&e) {
                    break;
                }
            }
            Err(_) => {
                last_error = format!("Timeout after {}ms", options.timeout_ms);
                // Timeouts are retryable
            }
        }
    }

    ExtractOutcome::Failure(image.source_path.clone(), last_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::llm::provider::{LlmProvider, LlmRequest, LlmResponse};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    const VALID_JSON: &str = r#"{"type":"top","color1":"blue","color2":"none","pattern":"solid",
        "dress_code":"casual","material":"cotton","seasonality":"all","fit":"fitted"}"#;

    /// A configurable mock LLM provider for testing extractor behavior.
    ///
    /// Each call to `generate()` invokes the response factory with the current
    /// call index, allowing callers to return different results per attempt.
    struct MockProvider {
        /// Factory that produces a response for each call index.
        response_fn: Box<dyn Fn(u32) -> Result<LlmResponse, PipelineError> + Send + Sync>,
        /// Tracks how many times `generate` was called (shared for post-hoc assertions).
        call_count: Arc<AtomicU32>,
        /// Optional delay before returning.
        delay: Option<Duration>,
        /// Tracks concurrent in-flight calls (for semaphore testing).
        in_flight: Option<(Arc<AtomicU32>, Arc<AtomicU32>)>, // (in_flight, max_concurrent)
    }

    impl std::fmt::Debug for MockProvider {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("MockProvider")
                .field("call_count", &self.call_count)
                .field("delay", &self.delay)
                .field("in_flight", &self.in_flight)
                .finish()
        }
    }

    impl MockProvider {
        fn success(text: &str) -> Self {
            let text = text.to_string();
            Self {
                response_fn: Box::new(move |_| {
                    Ok(LlmResponse {
                        text: text.clone(),
                        model: "mock-v1".to_string(),
                        tokens_used: Some(42),
                        latency_ms: 10,
                    })
                }),
                call_count: Arc::new(AtomicU32::new(0)),
                delay: None,
                in_flight: None,
            }
        }

        fn failing(status_code: Option<u16>, message: &str) -> Self {
            let message = message.to_string();
            Self {
                response_fn: Box::new(move |_| {
                    Err(PipelineError::Llm {
                        message: message.clone(),
                        status_code,
                    })
                }),
                call_count: Arc::new(AtomicU32::new(0)),
                delay: None,
                in_flight: None,
            }
        }

        /// First call returns an error, subsequent calls succeed.
        fn fail_then_succeed(status_code: Option<u16>, error_msg: &str, success_text: &str) -> Self {
            let error_msg = error_msg.to_string();
            let success_text = success_text.to_string();
            Self {
                response_fn: Box::new(move |idx| {
                    if idx == 0 {
                        Err(PipelineError::Llm {
                            message: error_msg.clone(),
                            status_code,
                        })
                    } else {
                        Ok(LlmResponse {
                            text: success_text.clone(),
                            model: "mock-v1".to_string(),
                            tokens_used: Some(20),
                            latency_ms: 50,
                        })
                    }
                }),
                call_count: Arc::new(AtomicU32::new(0)),
                delay: None,
                in_flight: None,
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        /// Get a shared handle to the call counter (clone before moving provider).
        fn call_count_handle(&self) -> Arc<AtomicU32> {
            self.call_count.clone()
        }
    }

    #[async_trait]
    impl LlmProvider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        async fn is_available(&self) -> bool {
            true
        }

        async fn generate(&self, _request: &LlmRequest) -> Result<LlmResponse, PipelineError> {
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
            if let Some((ref in_flight, ref max_concurrent)) = self.in_flight {
                let current = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_concurrent.fetch_max(current, Ordering::SeqCst);
            }
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let result = (self.response_fn)(idx);
            if let Some((ref in_flight, _)) = self.in_flight {
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }
            result
        }

        fn timeout(&self) -> Duration {
            Duration::from_secs(60)
        }
    }

    /// Write a tiny JPEG to the temp dir and return a `PreparedImage` for it.
    fn prepared_image(dir: &std::path::Path, id: &str) -> PreparedImage {
        let resized_path = dir.join(format!("{id}.jpg"));
        image::DynamicImage::new_rgb8(16, 16)
            .save_with_format(&resized_path, image::ImageFormat::Jpeg)
            .unwrap();
        PreparedImage {
            id: id.to_string(),
            source_path: dir.join(format!("{id}.png")),
            resized_path,
            width: 16,
            height: 16,
            format: "png".to_string(),
            file_size: 100,
        }
    }

    /// Collect all `ExtractOutcome`s into a vec via the callback.
    async fn run_extractor(
        provider: MockProvider,
        images: &[PreparedImage],
        options: ExtractOptions,
    ) -> (Vec<ExtractOutcome>, (usize, usize)) {
        let results = Arc::new(std::sync::Mutex::new(Vec::new()));
        let results_clone = results.clone();
        let extractor = AttributeExtractor::new(Box::new(provider), options);
        let counts = extractor
            .extract_batch(images, move |r| {
                results_clone.lock().unwrap().push(r);
            })
            .await;
        let results = Arc::try_unwrap(results).unwrap().into_inner().unwrap();
        (results, counts)
    }

    fn fast_options() -> ExtractOptions {
        ExtractOptions {
            parallel: 4,
            timeout_ms: 5000,
            retry_attempts: 0,
            retry_delay_ms: 10,
            ..ExtractOptions::default()
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_extractor_basic_success() {
        let dir = tempfile::tempdir().unwrap();
        let provider = MockProvider::success(VALID_JSON);
        let images = vec![prepared_image(dir.path(), "t01")];
        let (results, (succeeded, failed)) = run_extractor(provider, &images, fast_options()).await;

        assert_eq!(succeeded, 1);
        assert_eq!(failed, 0);
        assert_eq!(results.len(), 1);
        match &results[0] {
            ExtractOutcome::Success(attrs) => {
                assert_eq!(attrs.id, "t01");
                assert_eq!(attrs.kind, "top");
                assert_eq!(attrs.color1, "blue");
            }
            ExtractOutcome::Failure(path, msg) => {
                panic!("Expected success, got failure for {path:?}: {msg}");
            }
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_extractor_parses_fenced_response() {
        let dir = tempfile::tempdir().unwrap();
        let provider = MockProvider::success(&format!("```json\n{VALID_JSON}\n```"));
        let images = vec![prepared_image(dir.path(), "b01")];
        let (results, (succeeded, _)) = run_extractor(provider, &images, fast_options()).await;

        assert_eq!(succeeded, 1);
        match &results[0] {
            ExtractOutcome::Success(attrs) => assert_eq!(attrs.id, "b01"),
            ExtractOutcome::Failure(_, msg) => panic!("Expected fenced parse: {msg}"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_extractor_prose_response_fails_without_retry() {
        let dir = tempfile::tempdir().unwrap();
        let provider = MockProvider::success("A lovely blue shirt.");
        let call_count = provider.call_count_handle();
        let options = ExtractOptions {
            retry_attempts: 3,
            ..fast_options()
        };
        let images = vec![prepared_image(dir.path(), "t01")];
        let (results, (succeeded, failed)) = run_extractor(provider, &images, options).await;

        assert_eq!(succeeded, 0);
        assert_eq!(failed, 1);
        // The API call succeeded; the unparseable body must not trigger retries
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        match &results[0] {
            ExtractOutcome::Failure(_, msg) => assert!(msg.contains("Unparseable")),
            ExtractOutcome::Success(_) => panic!("Expected parse failure"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_extractor_retry_on_transient_error() {
        let dir = tempfile::tempdir().unwrap();
        // First call: 429 (retryable), second call: success
        let provider = MockProvider::fail_then_succeed(Some(429), "rate limited", VALID_JSON);
        let options = ExtractOptions {
            retry_attempts: 1,
            ..fast_options()
        };
        let images = vec![prepared_image(dir.path(), "t01")];
        let (results, (succeeded, failed)) = run_extractor(provider, &images, options).await;

        assert_eq!(succeeded, 1);
        assert_eq!(failed, 0);
        assert!(matches!(&results[0], ExtractOutcome::Success(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_extractor_no_retry_on_auth_error() {
        let dir = tempfile::tempdir().unwrap();
        let provider = MockProvider::failing(Some(401), "unauthorized");
        let call_count = provider.call_count_handle();
        let options = ExtractOptions {
            retry_attempts: 3, // Would retry 3 times if retryable
            ..fast_options()
        };
        let images = vec![prepared_image(dir.path(), "t01")];
        let (results, (succeeded, failed)) = run_extractor(provider, &images, options).await;

        assert_eq!(succeeded, 0);
        assert_eq!(failed, 1);
        // Verify provider was called exactly once (no retries on 401)
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        match &results[0] {
            ExtractOutcome::Failure(_, msg) => assert!(msg.contains("unauthorized")),
            ExtractOutcome::Success(_) => panic!("Expected auth failure"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_extractor_timeout() {
        let dir = tempfile::tempdir().unwrap();
        // Provider sleeps longer than the extractor's per-request timeout
        let provider = MockProvider::success(VALID_JSON).with_delay(Duration::from_secs(5));
        let options = ExtractOptions {
            timeout_ms: 50, // 50ms timeout — provider sleeps 5s
            retry_attempts: 0,
            ..fast_options()
        };
        let images = vec![prepared_image(dir.path(), "t01")];
        let (results, (succeeded, failed)) = run_extractor(provider, &images, options).await;

        assert_eq!(succeeded, 0);
        assert_eq!(failed, 1);
        match &results[0] {
            ExtractOutcome::Failure(_, msg) => {
                assert!(msg.contains("Timeout"), "Expected timeout, got: {msg}");
            }
            ExtractOutcome::Success(_) => panic!("Expected timeout failure"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_extractor_missing_resized_file() {
        let dir = tempfile::tempdir().unwrap();
        let provider = MockProvider::success(VALID_JSON);
        let call_count = provider.call_count_handle();
        let mut image = prepared_image(dir.path(), "ghost");
        image.resized_path = PathBuf::from("/nonexistent/ghost.jpg");
        let (results, (succeeded, failed)) =
            run_extractor(provider, &[image], fast_options()).await;

        assert_eq!(succeeded, 0);
        assert_eq!(failed, 1);
        // Verify provider was never called (file read fails first)
        assert_eq!(call_count.load(Ordering::SeqCst), 0);
        match &results[0] {
            ExtractOutcome::Failure(path, msg) => {
                assert_eq!(path, &PathBuf::from("/nonexistent/ghost.jpg"));
                assert!(msg.contains("Failed to read"), "Got: {msg}");
            }
            ExtractOutcome::Success(_) => panic!("Expected file-not-found failure"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_extractor_batch_partial_failure() {
        let dir = tempfile::tempdir().unwrap();
        let provider = MockProvider::success(VALID_JSON);
        let mut images = vec![
            prepared_image(dir.path(), "t01"),
            prepared_image(dir.path(), "t02"),
            prepared_image(dir.path(), "b01"),
        ];
        images[1].resized_path = PathBuf::from("/tmp/definitely_does_not_exist.jpg");
        let (results, (succeeded, failed)) = run_extractor(provider, &images, fast_options()).await;

        assert_eq!(succeeded, 2);
        assert_eq!(failed, 1);
        assert_eq!(results.len(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_extractor_semaphore_bounds_concurrency() {
        let dir = tempfile::tempdir().unwrap();
        // Track concurrent in-flight calls to verify semaphore enforcement.
        let in_flight = Arc::new(AtomicU32::new(0));
        let max_concurrent = Arc::new(AtomicU32::new(0));

        let json = VALID_JSON.to_string();
        let provider = MockProvider {
            response_fn: Box::new(move |_| {
                Ok(LlmResponse {
                    text: json.clone(),
                    model: "mock-v1".to_string(),
                    tokens_used: Some(10),
                    latency_ms: 5,
                })
            }),
            call_count: Arc::new(AtomicU32::new(0)),
            delay: Some(Duration::from_millis(200)), // Hold permit for 200ms
            in_flight: Some((in_flight.clone(), max_concurrent.clone())),
        };

        // 6 images, parallel=2 → at most 2 concurrent calls
        let images: Vec<_> = (0..6)
            .map(|i| prepared_image(dir.path(), &format!("g{i}")))
            .collect();
        let options = ExtractOptions {
            parallel: 2,
            timeout_ms: 5000,
            retry_attempts: 0,
            retry_delay_ms: 10,
            ..ExtractOptions::default()
        };
        let (_, (succeeded, failed)) = run_extractor(provider, &images, options).await;

        assert_eq!(succeeded, 6);
        assert_eq!(failed, 0);
        assert!(
            max_concurrent.load(Ordering::SeqCst) <= 2,
            "semaphore violated: max concurrent was {}",
            max_concurrent.load(Ordering::SeqCst)
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_extractor_exhausts_retries() {
        let dir = tempfile::tempdir().unwrap();
        // Always fail with 429 (retryable) — should exhaust all retries.
        let provider = MockProvider::failing(Some(429), "rate limited");
        let call_count = provider.call_count_handle();
        let options = ExtractOptions {
            retry_attempts: 2,
            ..fast_options()
        };
        let images = vec![prepared_image(dir.path(), "t01")];
        let (results, (succeeded, failed)) = run_extractor(provider, &images, options).await;

        assert_eq!(succeeded, 0);
        assert_eq!(failed, 1);
        // 1 initial + 2 retries = 3 total calls
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
        match &results[0] {
            ExtractOutcome::Failure(_, msg) => assert!(msg.contains("rate limited")),
            ExtractOutcome::Success(_) => panic!("Expected retry exhaustion failure"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_extractor_empty_batch() {
        let provider = MockProvider::success(VALID_JSON);
        let call_count = provider.call_count_handle();
        let (results, (succeeded, failed)) = run_extractor(provider, &[], fast_options()).await;

        assert_eq!(succeeded, 0);
        assert_eq!(failed, 0);
        assert_eq!(call_count.load(Ordering::SeqCst), 0);
        assert!(results.is_empty());
    }
}
