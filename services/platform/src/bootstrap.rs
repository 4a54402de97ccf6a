//! Wiring: collaborators from configuration, one store per aggregate, and the
//! consumers that carry events between them.
//!
//! ```text
//! manuscript-events    ─▶ publishing   (PublishingRequested ─▶ RequestPublishing)
//! user-events          ─▶ points       (UserRegistered ─▶ sign-up credit)
//! subscription-events  ─▶ points       (SubscriptionApplied ─▶ charge)
//! point-events         ─▶ subscribers  (OutOfPoint ─▶ SubscriptionFailed)
//! author-events        ─▶ roster       (AuthorApproved / AuthorDisapproved)
//! ```

use crate::config::Config;
use crate::runtime::{EventConsumer, EventHandler, RosterUpdater, StoreForwarder};
use crate::server::{
    AuthorStore, PointStore, PublishingStore, ReviewStore, SubscriberStore, WritingStore,
};
use bookpress_author::{AuthorEnvironment, AuthorReducer, AuthorState};
use bookpress_contracts::{BookId, ManuscriptEvent, topics};
use bookpress_core::environment::Clock;
use bookpress_core::event_bus::EventBus;
use bookpress_openai::{OpenAiClient, OpenAiError};
use bookpress_publishing::enrichment::openai::{OpenAiCompletion, OpenAiImages};
use bookpress_publishing::render::{GlyphPolicy, HttpImageFetcher};
use bookpress_publishing::{
    AuthorDirectory, AuthorRoster, DocumentProducer, Enricher, HttpAuthorDirectory,
    InMemoryBookStore, ManuscriptText, PublishingAction, PublishingEnvironment, PublishingPipeline,
    PublishingReducer, PublishingSettings, PublishingState, RenderError, Renderer, Storage,
    StorageError,
};
use bookpress_review::{ReviewEnvironment, ReviewReducer, ReviewState};
use bookpress_runtime::{Store, StoreError};
use bookpress_subscription::{
    BookCatalog, PointAction, PointEnvironment, PointReducer, PointState, StaticBookCatalog,
    SubscriberAction, SubscriberEnvironment, SubscriberReducer, SubscriberState,
};
use bookpress_writing::{ManuscriptEnvironment, ManuscriptReducer, ManuscriptState};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Startup failure
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// No AI provider key configured
    #[error("OPENAI_API_KEY is not set")]
    MissingApiKey,

    /// AI client could not be built
    #[error("OpenAI client: {0}")]
    OpenAi(#[from] OpenAiError),

    /// Cover fetcher could not be built
    #[error("Image fetcher: {0}")]
    Render(#[from] RenderError),

    /// Storage tree could not be created
    #[error("Storage: {0}")]
    Storage(#[from] StorageError),
}

/// Build the publishing pipeline and its storage from configuration.
///
/// Without `AUTHOR_SERVICE_URL`, author names come from `roster`, which the
/// `author-events` consumer keeps current.
///
/// # Errors
///
/// See [`BootstrapError`].
pub async fn build_pipeline(
    config: &Config,
    clock: Arc<dyn Clock>,
    roster: AuthorRoster,
) -> Result<(PublishingPipeline, Storage), BootstrapError> {
    let openai = &config.openai;
    let api_key = openai.api_key.clone().ok_or(BootstrapError::MissingApiKey)?;
    let client = OpenAiClient::new(api_key)
        .with_base_url(openai.base_url.clone())
        .with_timeout(Duration::from_secs(openai.request_timeout))?;

    let enricher = Enricher::new(
        Arc::new(OpenAiCompletion::new(client.clone(), openai.chat_model.clone())),
        Arc::new(OpenAiImages::new(client, openai.image_model.clone())),
    )
    .with_image_size(openai.image_size.clone());

    let authors: Arc<dyn AuthorDirectory> = match &config.authors.service_url {
        Some(url) => Arc::new(HttpAuthorDirectory::new(url.clone())),
        None => {
            tracing::info!("AUTHOR_SERVICE_URL not set, naming approved authors from author-events");
            Arc::new(roster)
        },
    };

    let storage = Storage::init(config.storage.root.clone()).await?;
    let renderer = Renderer::new(Arc::new(HttpImageFetcher::with_timeout(Duration::from_secs(
        openai.request_timeout,
    ))?))
    .with_glyph_policy(GlyphPolicy::new(config.storage.glyph_replacement));

    let pipeline = PublishingPipeline::new(
        enricher,
        authors,
        DocumentProducer::new(renderer, storage.clone()),
        Arc::new(InMemoryBookStore::new()),
        clock,
    )
    .with_public_base_url(config.server.public_base_url.clone());

    Ok((pipeline, storage))
}

/// Publishing settings from configuration
#[must_use]
pub fn publishing_settings(config: &Config) -> PublishingSettings {
    PublishingSettings {
        topic: config.publishing.publishing_topic.clone(),
        max_concurrent_publishes: config.publishing.max_concurrent_publishes,
        announcement_retry_delay: Duration::from_millis(config.publishing.announcement_retry_delay_ms),
        max_announcement_rounds: config.publishing.max_announcement_rounds,
    }
}

/// Bestseller catalog from configuration
#[must_use]
pub fn book_catalog(config: &Config) -> StaticBookCatalog {
    config
        .catalog
        .bestsellers
        .iter()
        .map(|id| BookId::from(id.as_str()))
        .collect()
}

fn publishing_request(event: ManuscriptEvent) -> Option<PublishingAction> {
    ManuscriptText::from_event(event).map(|manuscript| PublishingAction::RequestPublishing { manuscript })
}

/// One store per aggregate, all on the same bus
#[derive(Clone)]
pub struct Services {
    /// Manuscript aggregate
    pub manuscripts: Arc<WritingStore>,
    /// Publishing aggregate
    pub publishing: Arc<PublishingStore>,
    /// Subscriber aggregate
    pub subscribers: Arc<SubscriberStore>,
    /// Point aggregate
    pub points: Arc<PointStore>,
    /// Author aggregate
    pub authors: Arc<AuthorStore>,
    /// Review aggregate
    pub reviews: Arc<ReviewStore>,
    /// Approved author names, fed by `author-events`
    pub roster: AuthorRoster,
    event_bus: Arc<dyn EventBus>,
}

impl Services {
    /// Create every store.
    #[must_use]
    pub fn new(
        pipeline: PublishingPipeline,
        settings: PublishingSettings,
        catalog: Arc<dyn BookCatalog>,
        clock: Arc<dyn Clock>,
        event_bus: Arc<dyn EventBus>,
        roster: AuthorRoster,
    ) -> Self {
        let manuscripts = Store::new(
            ManuscriptState::new(),
            ManuscriptReducer::new(),
            ManuscriptEnvironment::new(Arc::clone(&clock), Arc::clone(&event_bus)),
        );
        let publishing = Store::new(
            PublishingState::new(),
            PublishingReducer::new(),
            PublishingEnvironment::new(pipeline, Arc::clone(&event_bus), settings),
        );
        let subscribers = Store::new(
            SubscriberState::new(),
            SubscriberReducer::new(),
            SubscriberEnvironment::new(Arc::clone(&clock), Arc::clone(&event_bus)),
        );
        let authors = Store::new(
            AuthorState::new(),
            AuthorReducer::new(),
            AuthorEnvironment::new(Arc::clone(&clock), Arc::clone(&event_bus)),
        );
        let reviews = Store::new(
            ReviewState::new(),
            ReviewReducer::new(),
            ReviewEnvironment::new(clock, Arc::clone(&event_bus)),
        );
        let points = Store::new(
            PointState::new(),
            PointReducer::new(),
            PointEnvironment::new(catalog, Arc::clone(&event_bus)),
        );

        Self {
            manuscripts: Arc::new(manuscripts),
            publishing: Arc::new(publishing),
            subscribers: Arc::new(subscribers),
            points: Arc::new(points),
            authors: Arc::new(authors),
            reviews: Arc::new(reviews),
            roster,
            event_bus,
        }
    }

    fn consumer(
        &self,
        name: &str,
        topic: &str,
        handler: Arc<dyn EventHandler>,
        shutdown: &broadcast::Sender<()>,
    ) -> JoinHandle<()> {
        EventConsumer::new(
            name,
            vec![topic.to_string()],
            Arc::clone(&self.event_bus),
            handler,
            shutdown.subscribe(),
        )
        .spawn()
    }

    /// Spawn the consumers that carry events between aggregates.
    ///
    /// Each runs until `shutdown` fires.
    #[must_use]
    pub fn spawn_consumers(
        &self,
        manuscript_topic: &str,
        shutdown: &broadcast::Sender<()>,
    ) -> Vec<JoinHandle<()>> {
        vec![
            self.consumer(
                "publishing",
                manuscript_topic,
                Arc::new(StoreForwarder::new(Arc::clone(&self.publishing), publishing_request)),
                shutdown,
            ),
            self.consumer(
                "points-sign-up",
                topics::USER_EVENTS,
                Arc::new(StoreForwarder::new(Arc::clone(&self.points), PointAction::from_user_event)),
                shutdown,
            ),
            self.consumer(
                "points-charge",
                topics::SUBSCRIPTION_EVENTS,
                Arc::new(StoreForwarder::new(
                    Arc::clone(&self.points),
                    PointAction::from_subscription_event,
                )),
                shutdown,
            ),
            self.consumer(
                "subscriber-rollback",
                topics::POINT_EVENTS,
                Arc::new(StoreForwarder::new(
                    Arc::clone(&self.subscribers),
                    SubscriberAction::from_point_event,
                )),
                shutdown,
            ),
            self.consumer(
                "author-roster",
                topics::AUTHOR_EVENTS,
                Arc::new(RosterUpdater::new(self.roster.clone())),
                shutdown,
            ),
        ]
    }

    /// Shut every store down, waiting up to `timeout` for each.
    ///
    /// # Errors
    ///
    /// Returns the first [`StoreError`]; the remaining stores are still shut down.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        let results = [
            self.manuscripts.shutdown(timeout).await,
            self.publishing.shutdown(timeout).await,
            self.subscribers.shutdown(timeout).await,
            self.points.shutdown(timeout).await,
            self.authors.shutdown(timeout).await,
            self.reviews.shutdown(timeout).await,
        ];
        results.into_iter().collect()
    }
}
