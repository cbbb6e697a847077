//! The asynchronous analysis queue.
//!
//! Single entry point for "is this resource safe": deduplicates
//! concurrent requests, short-circuits trusted sources, and dispatches
//! the fetch/decode/classify/fuse/decide pipeline onto worker tasks.
//! Always fails open - an infrastructure error marks the resource
//! not-blocked and never stalls the content pipeline.
//!
//! ## Pipeline
//!
//! ```text
//! enqueue ─> decided? ─> pending? ─> trusted? ─> spawn worker
//!                                                   │
//!                 explicit text check ── hard block ─┤
//!                 fetch ─> decode ─> fingerprint ────┤ (cache hit?)
//!                 classify ─> fuse ─> decide ────────┘
//!                                    │
//!                     publish + cache + event sink
//! ```
//!
//! The pending-set entry is released by a drop guard on every path,
//! success or failure; at most one worker runs per request id.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::task::JoinSet;

use warden_core::cache::BoundedCache;
use warden_core::{
    classify_image_fail_open, classify_text_fail_open, decide, emoji, explicit_block, fingerprint,
    host_of, keywords, pixels, url_risk, AgeProfile, ContentClassifier, ContentSignals,
    ContentSource, ContextTextAnalyzer, Decision, DecisionResult, DomainReputation, RiskSignals,
    StaticReputation, TrustedSources, UrlSignalRouting, DEFAULT_CLASSIFIER_TIMEOUT,
};
use warden_storage::hash_request_id;

use crate::error::{AnalysisError, Result};
use crate::fetch::ResourceFetcher;
use crate::perceptual::PerceptualCache;
use crate::sessions::SessionRegistry;
use crate::sink::{DecisionPublisher, EventSink};

/// Cap on the request-id decision cache.
const PROCESSED_CAPACITY: usize = 1000;

/// One unit of work for the queue.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AnalysisRequest {
    /// Browsing session/tab the resource belongs to.
    pub session_id: String,
    /// Dedup key: at most one in-flight analysis per id.
    pub request_id: String,
    /// Source URL of the resource.
    pub url: String,
    /// Page text surrounding the resource, when the surface has it.
    pub page_text: Option<String>,
    /// Active protection tier.
    pub profile: AgeProfile,
    /// Content source kind.
    pub source: ContentSource,
}

impl AnalysisRequest {
    /// A plain image request without page text.
    pub fn image(
        session_id: impl Into<String>,
        request_id: impl Into<String>,
        url: impl Into<String>,
        profile: AgeProfile,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            request_id: request_id.into(),
            url: url.into(),
            page_text: None,
            profile,
            source: ContentSource::Image,
        }
    }

    /// Attaches surrounding page text.
    pub fn with_page_text(mut self, text: impl Into<String>) -> Self {
        self.page_text = Some(text.into());
        self
    }
}

/// What enqueue did with the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// A decision is already cached for this id.
    AlreadyDecided,
    /// Another worker is already analyzing this id.
    AlreadyPending,
    /// The source is allowlisted; recorded not-blocked without analysis.
    TrustedSource,
    /// A worker task was dispatched.
    Dispatched,
}

/// Queue tuning knobs.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Timeout for a single classifier invocation.
    pub classifier_timeout: Duration,
    /// Where URL-pattern risk merges before weighting.
    pub url_routing: UrlSignalRouting,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            classifier_timeout: DEFAULT_CLASSIFIER_TIMEOUT,
            url_routing: UrlSignalRouting::default(),
        }
    }
}

/// Builder for [`AnalysisQueue`].
pub struct AnalysisQueueBuilder {
    config: QueueConfig,
    classifier: Arc<dyn ContentClassifier>,
    fetcher: Arc<dyn ResourceFetcher>,
    cache: Option<Arc<PerceptualCache>>,
    trusted: TrustedSources,
    reputation: Arc<dyn DomainReputation>,
    context: ContextTextAnalyzer,
    sink: Option<Arc<dyn EventSink>>,
    publisher: Option<Arc<dyn DecisionPublisher>>,
}

impl AnalysisQueueBuilder {
    /// Starts a builder with the two required collaborators.
    pub fn new(classifier: Arc<dyn ContentClassifier>, fetcher: Arc<dyn ResourceFetcher>) -> Self {
        Self {
            config: QueueConfig::default(),
            classifier,
            fetcher,
            cache: None,
            trusted: TrustedSources::default(),
            reputation: Arc::new(StaticReputation::default()),
            context: ContextTextAnalyzer::new(),
            sink: None,
            publisher: None,
        }
    }

    /// Overrides the queue configuration.
    pub fn config(mut self, config: QueueConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses a shared perceptual cache (e.g. one loaded from disk).
    pub fn cache(mut self, cache: Arc<PerceptualCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Replaces the trusted-source allowlist.
    pub fn trusted_sources(mut self, trusted: TrustedSources) -> Self {
        self.trusted = trusted;
        self
    }

    /// Replaces the reputation store.
    pub fn reputation(mut self, reputation: Arc<dyn DomainReputation>) -> Self {
        self.reputation = reputation;
        self
    }

    /// Replaces the context text analyzer (e.g. with dynamic keywords).
    pub fn context_analyzer(mut self, context: ContextTextAnalyzer) -> Self {
        self.context = context;
        self
    }

    /// Attaches the event sink.
    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Attaches the decision publisher.
    pub fn publisher(mut self, publisher: Arc<dyn DecisionPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Builds the queue.
    pub fn build(self) -> AnalysisQueue {
        AnalysisQueue {
            inner: Arc::new(QueueInner {
                config: self.config,
                processed: Mutex::new(BoundedCache::new(PROCESSED_CAPACITY)),
                pending: Mutex::new(HashSet::new()),
                trusted: self.trusted,
                reputation: self.reputation,
                classifier: self.classifier,
                fetcher: self.fetcher,
                cache: self.cache.unwrap_or_else(|| Arc::new(PerceptualCache::new())),
                sessions: SessionRegistry::new(),
                context: self.context,
                sink: self.sink,
                publisher: self.publisher,
                tasks: Mutex::new(JoinSet::new()),
            }),
        }
    }
}

/// Deduplicating, fail-open asynchronous analysis queue.
#[derive(Clone)]
pub struct AnalysisQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    config: QueueConfig,
    /// request id -> blocked. Bounded so ids from long sessions age out.
    processed: Mutex<BoundedCache<String, bool>>,
    /// Ids currently being analyzed. Guarded by a drop guard per worker.
    pending: Mutex<HashSet<String>>,
    trusted: TrustedSources,
    reputation: Arc<dyn DomainReputation>,
    classifier: Arc<dyn ContentClassifier>,
    fetcher: Arc<dyn ResourceFetcher>,
    cache: Arc<PerceptualCache>,
    sessions: SessionRegistry,
    context: ContextTextAnalyzer,
    sink: Option<Arc<dyn EventSink>>,
    publisher: Option<Arc<dyn DecisionPublisher>>,
    tasks: Mutex<JoinSet<()>>,
}

/// Releases a pending-set entry when the worker ends, on every path.
struct PendingGuard {
    inner: Arc<QueueInner>,
    request_id: String,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.inner.pending.lock().remove(&self.request_id);
    }
}

impl AnalysisQueue {
    /// Starts a builder.
    pub fn builder(
        classifier: Arc<dyn ContentClassifier>,
        fetcher: Arc<dyn ResourceFetcher>,
    ) -> AnalysisQueueBuilder {
        AnalysisQueueBuilder::new(classifier, fetcher)
    }

    /// The single entry point. Must be called within a Tokio runtime.
    ///
    /// Order of checks: cached decision, in-flight dedup, trusted-source
    /// short-circuit, async dispatch.
    pub fn enqueue(&self, request: AnalysisRequest) -> EnqueueOutcome {
        let id = request.request_id.clone();

        // 1. Already decided: nothing to do.
        if self.inner.processed.lock().contains_key(&id) {
            return EnqueueOutcome::AlreadyDecided;
        }

        // 2. Atomic check-and-set: at most one in-flight per id.
        if !self.inner.pending.lock().insert(id.clone()) {
            return EnqueueOutcome::AlreadyPending;
        }
        let guard = PendingGuard {
            inner: self.inner.clone(),
            request_id: id.clone(),
        };

        // 3. Trusted source: record not-blocked, skip the classifier.
        if self.inner.trusted.is_trusted_url(&request.url) {
            tracing::debug!("Trusted source, skipping analysis: {}", request.url);
            self.inner.record_unblocked(&id);
            drop(guard);
            return EnqueueOutcome::TrustedSource;
        }

        // 4. Dispatch.
        let inner = self.inner.clone();
        self.inner.tasks.lock().spawn(async move {
            let _guard = guard;
            if let Err(e) = inner.analyze(&request).await {
                tracing::warn!(
                    "Analysis failed for {} (fail open): {}",
                    request.request_id,
                    e
                );
                inner.record_unblocked(&request.request_id);
                inner.record_event(
                    "analysis_failure",
                    json!({
                        "request": hash_request_id(&request.request_id),
                        "error": e.to_string(),
                    }),
                );
            }
        });

        EnqueueOutcome::Dispatched
    }

    /// Returns the cached decision for a request id, if any.
    pub fn decided(&self, request_id: &str) -> Option<bool> {
        self.inner
            .processed
            .lock()
            .get(&request_id.to_string())
            .copied()
    }

    /// Number of requests currently in flight.
    pub fn pending_len(&self) -> usize {
        self.inner.pending.lock().len()
    }

    /// The perceptual cache backing this queue.
    pub fn perceptual_cache(&self) -> &Arc<PerceptualCache> {
        &self.inner.cache
    }

    /// Clears a session's smoothing state (page navigation).
    pub async fn reset_session(&self, session_id: &str) {
        self.inner.sessions.reset(session_id).await;
    }

    /// Drops a session entirely (tab closed).
    pub fn remove_session(&self, session_id: &str) {
        self.inner.sessions.remove(session_id);
    }

    /// Waits for all currently dispatched workers to finish.
    pub async fn drain(&self) {
        let mut tasks = std::mem::take(&mut *self.inner.tasks.lock());
        while tasks.join_next().await.is_some() {}
    }

    /// Cancels all in-flight workers and releases their pending entries.
    pub fn shutdown(&self) {
        self.inner.tasks.lock().abort_all();
        self.inner.pending.lock().clear();
        tracing::info!("Analysis queue shut down");
    }
}

/// Text signals derived from surrounding page text.
struct TextSignals {
    text_risk: f32,
    emoji_risk: f32,
    keyword_risk: f32,
    has_safe_context: bool,
    safe_context_label: Option<String>,
    /// Set on a non-overridable explicit-phrase match.
    explicit_label: Option<String>,
}

impl TextSignals {
    fn text_core(&self) -> f32 {
        self.text_risk.max(self.emoji_risk).max(self.keyword_risk)
    }
}

impl QueueInner {
    /// The worker pipeline. Any error propagated from here is handled
    /// fail-open by the dispatch wrapper.
    async fn analyze(&self, request: &AnalysisRequest) -> Result<()> {
        // Page text first: an explicit phrase is fail-closed and needs no
        // fetch, and nothing downstream may weaken it.
        let text = match request.page_text.as_deref() {
            Some(text) => Some(self.text_signals(text).await),
            None => None,
        };

        if let Some(label) = text.as_ref().and_then(|t| t.explicit_label.clone()) {
            self.hard_block(request, &label, text.as_ref());
            return Ok(());
        }

        // Fetch and decode. Failures propagate and fail open.
        let bytes = self.fetcher.fetch(&request.url).await?;
        let image = image::load_from_memory(&bytes)
            .map_err(|e| AnalysisError::Decode(format!("{}: {}", request.url, e)))?;

        // Perceptual cache: visually identical content was already judged.
        let fp = fingerprint(&image);
        if let Some(entry) = self.cache.lookup(fp) {
            tracing::debug!(
                "Perceptual cache hit for {}: blocked={}",
                request.request_id,
                entry.blocked
            );
            self.processed
                .lock()
                .insert(request.request_id.clone(), entry.blocked);
            self.publish(&request.request_id, entry.blocked, None);
            return Ok(());
        }

        // Network and context signals.
        let host = host_of(&request.url).unwrap_or_default();
        let trust = self.reputation.trust_for(&host);
        let mut risk_signals = RiskSignals::from_trust(trust);
        risk_signals.merge_url_signal(url_risk::analyze(&request.url).score(), self.config.url_routing);
        if let Some(text) = &text {
            risk_signals.context_score = risk_signals.context_score.max(text.text_core() * 100.0);
        }

        // Classifier (fail open), then fusion on the session's engine.
        let scores =
            classify_image_fail_open(self.classifier.as_ref(), &image, self.config.classifier_timeout)
                .await;
        let ai_raw = scores.max_explicit() * 100.0;

        let engine = self.sessions.engine(&request.session_id);
        let fused = {
            let mut engine = engine.lock().await;
            engine.store_ai_score(fp, ai_raw);
            let fused = engine.fuse(ai_raw, &risk_signals, request.profile);
            engine.smooth(fused, request.source == ContentSource::Video)
        };

        // Assemble the signal bundle and decide.
        let signals = ContentSignals {
            porn: scores.porn,
            hentai: scores.hentai,
            suggestive: scores.suggestive,
            drawing: scores.drawing,
            neutral: scores.neutral,
            skin_ratio: pixels::skin_ratio(&image),
            edge_density: pixels::edge_density(&image),
            video_consistency: 1,
            text_risk: text.as_ref().map(|t| t.text_risk).unwrap_or(0.0),
            emoji_risk: text.as_ref().map(|t| t.emoji_risk).unwrap_or(0.0),
            keyword_risk: text.as_ref().map(|t| t.keyword_risk).unwrap_or(0.0),
            has_safe_context: text.as_ref().map(|t| t.has_safe_context).unwrap_or(false),
            safe_context_label: text.as_ref().and_then(|t| t.safe_context_label.clone()),
            profile: request.profile,
            source: request.source,
        };

        let decision = decide(&signals);

        // Uncertain content stays withheld for children; only an explicit
        // allow releases it there.
        let blocked = decision.decision == Decision::Block
            || (decision.decision == Decision::Uncertain && request.profile == AgeProfile::Child);

        self.processed
            .lock()
            .insert(request.request_id.clone(), blocked);
        self.cache.store(fp, blocked);
        self.publish(&request.request_id, blocked, Some(&decision));

        if decision.requires_logging() {
            self.record_event(
                "decision",
                json!({
                    "request": hash_request_id(&request.request_id),
                    "host": host,
                    "decision": decision.decision.name(),
                    "profile": request.profile.as_str(),
                    "reason": decision.dominant_reason,
                    "downgrade": decision.downgrade_reason,
                    "risk": fused,
                    "signals": decision.signals,
                }),
            );
        }

        Ok(())
    }

    /// Derives text signals; an explicit match short-circuits everything.
    async fn text_signals(&self, text: &str) -> TextSignals {
        let context = self.context.analyze(text);

        if context.is_explicit_match() {
            return TextSignals {
                text_risk: context.confidence,
                emoji_risk: emoji::score(text),
                keyword_risk: 1.0,
                has_safe_context: false,
                safe_context_label: None,
                explicit_label: context
                    .trigger_word
                    .unwrap_or_else(|| "explicit content".to_string())
                    .into(),
            };
        }

        let text_risk =
            classify_text_fail_open(self.classifier.as_ref(), text, self.config.classifier_timeout)
                .await;

        TextSignals {
            text_risk,
            emoji_risk: emoji::score(text),
            keyword_risk: if context.is_risky {
                context.confidence
            } else {
                keywords::risk_score(text)
            },
            has_safe_context: !context.is_risky && context.context.is_some(),
            safe_context_label: context.context.map(|c| c.name().to_string()),
            explicit_label: None,
        }
    }

    /// Non-overridable hard block from an explicit text match.
    fn hard_block(&self, request: &AnalysisRequest, label: &str, text: Option<&TextSignals>) {
        let signals = ContentSignals {
            text_risk: text.map(|t| t.text_risk).unwrap_or(1.0),
            emoji_risk: text.map(|t| t.emoji_risk).unwrap_or(0.0),
            keyword_risk: 1.0,
            profile: request.profile,
            source: request.source,
            ..Default::default()
        };
        let decision = explicit_block(signals, label);

        self.processed
            .lock()
            .insert(request.request_id.clone(), true);
        self.publish(&request.request_id, true, Some(&decision));
        self.record_event(
            "decision",
            json!({
                "request": hash_request_id(&request.request_id),
                "decision": decision.decision.name(),
                "profile": request.profile.as_str(),
                "reason": decision.dominant_reason,
            }),
        );
    }

    /// Fail-open bookkeeping: mark not-blocked and tell the surface.
    fn record_unblocked(&self, request_id: &str) {
        self.processed.lock().insert(request_id.to_string(), false);
        self.publish(request_id, false, None);
    }

    fn publish(&self, request_id: &str, blocked: bool, decision: Option<&DecisionResult>) {
        if let Some(publisher) = &self.publisher {
            publisher.publish(request_id, blocked, decision);
        }
    }

    /// Fire-and-forget event record; sink failures never reach callers.
    fn record_event(&self, event_type: &str, payload: serde_json::Value) {
        if let Some(sink) = &self.sink {
            sink.record(event_type, payload);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use image::{Rgb, RgbImage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use warden_core::ImageCategoryScores;

    struct CountingClassifier {
        calls: AtomicUsize,
        scores: ImageCategoryScores,
    }

    impl CountingClassifier {
        fn new(scores: ImageCategoryScores) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                scores,
            })
        }
    }

    #[async_trait]
    impl ContentClassifier for CountingClassifier {
        async fn classify_image(
            &self,
            _image: &image::DynamicImage,
        ) -> warden_core::Result<ImageCategoryScores> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            // Yield so concurrent enqueues overlap realistically.
            tokio::task::yield_now().await;
            Ok(self.scores)
        }

        async fn classify_text(&self, _vector: &warden_core::TextVector) -> warden_core::Result<f32> {
            Ok(0.0)
        }
    }

    struct StubFetcher {
        bytes: Vec<u8>,
    }

    #[async_trait]
    impl ResourceFetcher for StubFetcher {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>> {
            Ok(self.bytes.clone())
        }
    }

    struct FailingFetcher;

    #[async_trait]
    impl ResourceFetcher for FailingFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            Err(AnalysisError::Fetch(format!("{}: connection refused", url)))
        }
    }

    #[derive(Default)]
    struct RecordingPublisher {
        published: Mutex<Vec<(String, bool)>>,
    }

    impl DecisionPublisher for RecordingPublisher {
        fn publish(&self, request_id: &str, blocked: bool, _decision: Option<&DecisionResult>) {
            self.published
                .lock()
                .push((request_id.to_string(), blocked));
        }
    }

    fn png_bytes() -> Vec<u8> {
        let img = RgbImage::from_fn(16, 16, |x, y| Rgb([(x * 16) as u8, (y * 16) as u8, 128]));
        let mut out = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    fn queue_with(
        classifier: Arc<CountingClassifier>,
        fetcher: Arc<dyn ResourceFetcher>,
    ) -> (AnalysisQueue, Arc<RecordingPublisher>) {
        let publisher = Arc::new(RecordingPublisher::default());
        let queue = AnalysisQueue::builder(classifier, fetcher)
            .publisher(publisher.clone())
            .build();
        (queue, publisher)
    }

    #[tokio::test]
    async fn concurrent_enqueues_run_one_classifier_call() {
        let classifier = CountingClassifier::new(ImageCategoryScores::default());
        let fetcher = Arc::new(StubFetcher { bytes: png_bytes() });
        let (queue, _) = queue_with(classifier.clone(), fetcher);

        let first = queue.enqueue(AnalysisRequest::image(
            "tab-1",
            "img-1",
            "https://cdn.example.com/a.png",
            AgeProfile::Teen,
        ));
        let second = queue.enqueue(AnalysisRequest::image(
            "tab-1",
            "img-1",
            "https://cdn.example.com/a.png",
            AgeProfile::Teen,
        ));

        assert_eq!(first, EnqueueOutcome::Dispatched);
        assert_eq!(second, EnqueueOutcome::AlreadyPending);

        queue.drain().await;
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
        assert_eq!(queue.pending_len(), 0);
    }

    #[tokio::test]
    async fn decided_requests_short_circuit() {
        let classifier = CountingClassifier::new(ImageCategoryScores::default());
        let fetcher = Arc::new(StubFetcher { bytes: png_bytes() });
        let (queue, _) = queue_with(classifier.clone(), fetcher);

        queue.enqueue(AnalysisRequest::image(
            "tab-1",
            "img-1",
            "https://cdn.example.com/a.png",
            AgeProfile::Adult,
        ));
        queue.drain().await;

        let again = queue.enqueue(AnalysisRequest::image(
            "tab-1",
            "img-1",
            "https://cdn.example.com/a.png",
            AgeProfile::Adult,
        ));
        assert_eq!(again, EnqueueOutcome::AlreadyDecided);
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn trusted_sources_skip_the_classifier() {
        let classifier = CountingClassifier::new(ImageCategoryScores::default());
        let fetcher = Arc::new(StubFetcher { bytes: png_bytes() });
        let (queue, publisher) = queue_with(classifier.clone(), fetcher);

        let outcome = queue.enqueue(AnalysisRequest::image(
            "tab-1",
            "img-wiki",
            "https://upload.wikimedia.org/commons/photo.jpg",
            AgeProfile::Child,
        ));

        assert_eq!(outcome, EnqueueOutcome::TrustedSource);
        assert_eq!(queue.decided("img-wiki"), Some(false));
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
        assert_eq!(queue.pending_len(), 0);
        assert_eq!(
            publisher.published.lock().as_slice(),
            &[("img-wiki".to_string(), false)]
        );
    }

    #[tokio::test]
    async fn fetch_failure_fails_open() {
        let classifier = CountingClassifier::new(ImageCategoryScores::default());
        let (queue, publisher) = queue_with(classifier.clone(), Arc::new(FailingFetcher));

        queue.enqueue(AnalysisRequest::image(
            "tab-1",
            "img-dead",
            "https://gone.example.com/a.png",
            AgeProfile::Child,
        ));
        queue.drain().await;

        // Never block on infrastructure errors.
        assert_eq!(queue.decided("img-dead"), Some(false));
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
        assert!(publisher
            .published
            .lock()
            .iter()
            .any(|(id, blocked)| id == "img-dead" && !blocked));
    }

    #[tokio::test]
    async fn undecodable_bytes_fail_open() {
        let classifier = CountingClassifier::new(ImageCategoryScores::default());
        let fetcher = Arc::new(StubFetcher {
            bytes: b"definitely not an image".to_vec(),
        });
        let (queue, _) = queue_with(classifier.clone(), fetcher);

        queue.enqueue(AnalysisRequest::image(
            "tab-1",
            "img-junk",
            "https://cdn.example.com/junk.bin",
            AgeProfile::Teen,
        ));
        queue.drain().await;

        assert_eq!(queue.decided("img-junk"), Some(false));
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn explicit_page_text_blocks_without_fetching() {
        let classifier = CountingClassifier::new(ImageCategoryScores::default());
        // The fetcher fails: the hard block must fire before any fetch.
        let (queue, publisher) = queue_with(classifier.clone(), Arc::new(FailingFetcher));

        queue.enqueue(
            AnalysisRequest::image(
                "tab-1",
                "img-evil",
                "https://cdn.example.com/a.png",
                AgeProfile::Adult,
            )
            .with_page_text("how to make a bomb"),
        );
        queue.drain().await;

        assert_eq!(queue.decided("img-evil"), Some(true));
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
        assert!(publisher
            .published
            .lock()
            .iter()
            .any(|(id, blocked)| id == "img-evil" && *blocked));
    }

    #[tokio::test]
    async fn child_uncertain_content_stays_blocked() {
        let classifier = CountingClassifier::new(ImageCategoryScores {
            porn: 0.10,
            ..Default::default()
        });
        let fetcher = Arc::new(StubFetcher { bytes: png_bytes() });
        let (queue, _) = queue_with(classifier, fetcher);

        queue.enqueue(AnalysisRequest::image(
            "tab-1",
            "img-borderline",
            "https://cdn.example.com/a.png",
            AgeProfile::Child,
        ));
        queue.drain().await;

        // Raw child decision is Uncertain; for children that withholds.
        assert_eq!(queue.decided("img-borderline"), Some(true));
    }

    #[tokio::test]
    async fn clean_content_is_released_for_adults() {
        let classifier = CountingClassifier::new(ImageCategoryScores {
            neutral: 0.95,
            ..Default::default()
        });
        let fetcher = Arc::new(StubFetcher { bytes: png_bytes() });
        let (queue, publisher) = queue_with(classifier, fetcher);

        queue.enqueue(AnalysisRequest::image(
            "tab-1",
            "img-ok",
            "https://cdn.example.com/ok.png",
            AgeProfile::Adult,
        ));
        queue.drain().await;

        assert_eq!(queue.decided("img-ok"), Some(false));
        assert!(publisher
            .published
            .lock()
            .iter()
            .any(|(id, blocked)| id == "img-ok" && !blocked));
    }

    #[tokio::test]
    async fn identical_images_hit_the_perceptual_cache() {
        let classifier = CountingClassifier::new(ImageCategoryScores::default());
        let fetcher = Arc::new(StubFetcher { bytes: png_bytes() });
        let (queue, _) = queue_with(classifier.clone(), fetcher);

        queue.enqueue(AnalysisRequest::image(
            "tab-1",
            "img-a",
            "https://cdn.example.com/a.png",
            AgeProfile::Teen,
        ));
        queue.drain().await;

        // Different request id, same pixels: fingerprint match, no new call.
        queue.enqueue(AnalysisRequest::image(
            "tab-1",
            "img-b",
            "https://mirror.example.com/b.png",
            AgeProfile::Teen,
        ));
        queue.drain().await;

        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
        assert_eq!(queue.decided("img-b"), queue.decided("img-a"));
    }

    #[tokio::test]
    async fn decisions_reach_the_event_sink() {
        let db = Arc::new(warden_storage::Database::in_memory().unwrap());
        let classifier = CountingClassifier::new(ImageCategoryScores {
            porn: 0.95,
            ..Default::default()
        });
        let fetcher = Arc::new(StubFetcher { bytes: png_bytes() });
        let queue = AnalysisQueue::builder(classifier, fetcher)
            .event_sink(db.clone())
            .build();

        queue.enqueue(AnalysisRequest::image(
            "tab-1",
            "img-bad",
            "https://cdn.example.com/bad.png",
            AgeProfile::Child,
        ));
        queue.drain().await;

        assert_eq!(queue.decided("img-bad"), Some(true));
        assert_eq!(db.event_count_by_type("decision").unwrap(), 1);
    }

    #[tokio::test]
    async fn shutdown_releases_pending_entries() {
        let classifier = CountingClassifier::new(ImageCategoryScores::default());
        let fetcher = Arc::new(StubFetcher { bytes: png_bytes() });
        let (queue, _) = queue_with(classifier, fetcher);

        queue.enqueue(AnalysisRequest::image(
            "tab-1",
            "img-1",
            "https://cdn.example.com/a.png",
            AgeProfile::Teen,
        ));
        queue.shutdown();
        assert_eq!(queue.pending_len(), 0);
    }
}
