use std::future::Future;
use std::pin::pin;
use std::time::Duration;

use formats::PointFeature;
use futures_util::future::{Either, join_all, select};

use crate::card::{CardStatus, DEFAULT_IMAGE, ResultCard};
use crate::taxa::TaxonLookup;

pub const DEFAULT_CARD_TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Debug, Clone, PartialEq)]
pub struct ImageLoadError {
    pub url: String,
    pub reason: String,
}

impl std::fmt::Display for ImageLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "image {} failed to load: {}", self.url, self.reason)
    }
}

impl std::error::Error for ImageLoadError {}

/// Resolves once the image behind `url` is ready to display.
pub trait ImageLoader {
    fn load(&self, url: &str) -> impl Future<Output = Result<(), ImageLoadError>>;
}

pub trait Timer {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct CardRendererConfig {
    pub default_image: String,
    pub card_timeout: Duration,
}

impl Default for CardRendererConfig {
    fn default() -> Self {
        Self {
            default_image: DEFAULT_IMAGE.to_string(),
            card_timeout: DEFAULT_CARD_TIMEOUT,
        }
    }
}

/// Cards requested by one click, tagged with the panel generation they were
/// issued for.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub generation: u64,
    pub features: Vec<PointFeature>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedBatch {
    pub generation: u64,
    /// Same order as the request's features.
    pub cards: Vec<ResultCard>,
}

pub struct CardRenderer<L, I, T> {
    lookup: L,
    images: I,
    timer: T,
    config: CardRendererConfig,
}

impl<L, I, T> CardRenderer<L, I, T>
where
    L: TaxonLookup,
    I: ImageLoader,
    T: Timer,
{
    pub fn new(lookup: L, images: I, timer: T, config: CardRendererConfig) -> Self {
        Self {
            lookup,
            images,
            timer,
            config,
        }
    }

    pub fn config(&self) -> &CardRendererConfig {
        &self.config
    }

    /// Renders every requested card concurrently. Never fails: each card
    /// degrades to the default image or a timed-out placeholder.
    pub async fn render_batch(&self, request: RenderRequest) -> RenderedBatch {
        let cards = join_all(request.features.iter().map(|f| self.render_card(f))).await;
        RenderedBatch {
            generation: request.generation,
            cards,
        }
    }

    pub async fn render_card(&self, feature: &PointFeature) -> ResultCard {
        let work = pin!(self.resolve_card(feature));
        let deadline = pin!(self.timer.sleep(self.config.card_timeout));
        match select(work, deadline).await {
            Either::Left((card, _)) => card,
            Either::Right(((), _)) => {
                tracing::warn!(
                    feature = feature.index,
                    timeout_ms = self.config.card_timeout.as_millis() as u64,
                    "card timed out"
                );
                ResultCard::new(feature, self.config.default_image.as_str(), CardStatus::TimedOut)
            }
        }
    }

    async fn resolve_card(&self, feature: &PointFeature) -> ResultCard {
        let default_image = self.config.default_image.as_str();
        let (image, mut status) = self.resolve_image(feature).await;

        match self.images.load(&image).await {
            Ok(()) => ResultCard::new(feature, image, status),
            Err(err) => {
                tracing::warn!(feature = feature.index, "{err}");
                status = CardStatus::Fallback;
                if image != default_image
                    && let Err(err) = self.images.load(default_image).await
                {
                    tracing::warn!(feature = feature.index, "{err}");
                }
                ResultCard::new(feature, default_image, status)
            }
        }
    }

    async fn resolve_image(&self, feature: &PointFeature) -> (String, CardStatus) {
        let default_image = self.config.default_image.clone();
        let name = feature.scientific_name.trim();
        if name.is_empty() {
            return (default_image, CardStatus::Complete);
        }
        match self.lookup.lookup(name).await {
            Ok(Some(url)) => (url, CardStatus::Complete),
            Ok(None) => (default_image, CardStatus::Complete),
            Err(err) => {
                tracing::warn!(feature = feature.index, "{err}");
                (default_image, CardStatus::Fallback)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxa::LookupError;
    use formats::Dataset;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Answers from a fixed table; names mapped to `None` never resolve.
    #[derive(Default)]
    struct FakeLookup {
        photos: HashMap<String, Option<Result<Option<String>, LookupError>>>,
        calls: RefCell<Vec<String>>,
    }

    impl FakeLookup {
        fn with(mut self, name: &str, answer: Option<Result<Option<String>, LookupError>>) -> Self {
            self.photos.insert(name.to_string(), answer);
            self
        }
    }

    impl TaxonLookup for FakeLookup {
        async fn lookup(&self, scientific_name: &str) -> Result<Option<String>, LookupError> {
            self.calls.borrow_mut().push(scientific_name.to_string());
            match self.photos.get(scientific_name) {
                Some(Some(answer)) => answer.clone(),
                Some(None) => std::future::pending().await,
                None => Ok(None),
            }
        }
    }

    #[derive(Default)]
    struct FakeImages {
        broken: Vec<String>,
        loaded: RefCell<Vec<String>>,
    }

    impl ImageLoader for FakeImages {
        async fn load(&self, url: &str) -> Result<(), ImageLoadError> {
            self.loaded.borrow_mut().push(url.to_string());
            if self.broken.iter().any(|b| b == url) {
                return Err(ImageLoadError {
                    url: url.to_string(),
                    reason: "404".to_string(),
                });
            }
            Ok(())
        }
    }

    /// Deadline that fires immediately, so anything not already resolved
    /// on first poll times out.
    struct InstantTimer;

    impl Timer for InstantTimer {
        async fn sleep(&self, _duration: Duration) {}
    }

    struct NeverTimer;

    impl Timer for NeverTimer {
        async fn sleep(&self, _duration: Duration) {
            std::future::pending::<()>().await
        }
    }

    fn demo() -> Dataset {
        let payload = include_str!("../../apps/web/assets/data/macaulaylibrary.geojson");
        Dataset::from_geojson_str(payload).unwrap()
    }

    fn photo(url: &str) -> Option<Result<Option<String>, LookupError>> {
        Some(Ok(Some(url.to_string())))
    }

    #[tokio::test]
    async fn uses_first_result_photo() {
        let ds = demo();
        let renderer = CardRenderer::new(
            FakeLookup::default().with("Turdus migratorius", photo("https://x/robin.jpg")),
            FakeImages::default(),
            NeverTimer,
            CardRendererConfig::default(),
        );
        let card = renderer.render_card(&ds.features[0]).await;
        assert_eq!(card.image, "https://x/robin.jpg");
        assert_eq!(card.status, CardStatus::Complete);
        assert_eq!(*renderer.images.loaded.borrow(), vec!["https://x/robin.jpg"]);
    }

    #[tokio::test]
    async fn no_photo_uses_default_image() {
        let ds = demo();
        let renderer = CardRenderer::new(
            FakeLookup::default(),
            FakeImages::default(),
            NeverTimer,
            CardRendererConfig::default(),
        );
        let card = renderer.render_card(&ds.features[1]).await;
        assert_eq!(card.image, DEFAULT_IMAGE);
        assert_eq!(card.status, CardStatus::Complete);
    }

    #[tokio::test]
    async fn lookup_failure_falls_back() {
        let ds = demo();
        let renderer = CardRenderer::new(
            FakeLookup::default().with("Turdus migratorius", Some(Err(LookupError::Status(503)))),
            FakeImages::default(),
            NeverTimer,
            CardRendererConfig::default(),
        );
        let card = renderer.render_card(&ds.features[0]).await;
        assert_eq!(card.image, DEFAULT_IMAGE);
        assert_eq!(card.status, CardStatus::Fallback);
    }

    #[tokio::test]
    async fn broken_photo_falls_back_to_default_image() {
        let ds = demo();
        let renderer = CardRenderer::new(
            FakeLookup::default().with("Turdus migratorius", photo("https://x/gone.jpg")),
            FakeImages {
                broken: vec!["https://x/gone.jpg".to_string()],
                ..Default::default()
            },
            NeverTimer,
            CardRendererConfig::default(),
        );
        let card = renderer.render_card(&ds.features[0]).await;
        assert_eq!(card.image, DEFAULT_IMAGE);
        assert_eq!(card.status, CardStatus::Fallback);
        assert_eq!(
            *renderer.images.loaded.borrow(),
            vec!["https://x/gone.jpg".to_string(), DEFAULT_IMAGE.to_string()]
        );
    }

    #[tokio::test]
    async fn stalled_lookup_times_out_without_blocking_batch() {
        let ds = demo();
        let renderer = CardRenderer::new(
            FakeLookup::default().with("Cardinalis cardinalis", None),
            FakeImages::default(),
            InstantTimer,
            CardRendererConfig::default(),
        );
        let request = RenderRequest {
            generation: 7,
            features: ds.features[..3].to_vec(),
        };
        let batch = renderer.render_batch(request).await;
        assert_eq!(batch.generation, 7);
        let statuses: Vec<CardStatus> = batch.cards.iter().map(|c| c.status).collect();
        assert_eq!(
            statuses,
            vec![CardStatus::Complete, CardStatus::TimedOut, CardStatus::Complete]
        );
        assert_eq!(batch.cards[1].common_name, "Northern Cardinal");
    }

    #[tokio::test]
    async fn batch_preserves_source_order() {
        let ds = demo();
        let renderer = CardRenderer::new(
            FakeLookup::default(),
            FakeImages::default(),
            NeverTimer,
            CardRendererConfig::default(),
        );
        let request = RenderRequest {
            generation: 1,
            features: ds.features[..10].to_vec(),
        };
        let batch = renderer.render_batch(request).await;
        let indices: Vec<usize> = batch.cards.iter().map(|c| c.feature_index).collect();
        assert_eq!(indices, (0..10).collect::<Vec<_>>());
        assert_eq!(renderer.lookup.calls.borrow().len(), 10);
    }
}
