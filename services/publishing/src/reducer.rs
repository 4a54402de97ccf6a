//! Publishing aggregate.
//!
//! Tracks one [`Publication`] per manuscript. A request runs the whole
//! [`PublishingPipeline`] inside a single effect while holding a permit of the
//! publish queue, so at most `max_concurrent_publishes` pipelines run at once
//! and later requests wait instead of being dropped. Once the record is
//! persisted the `Published` event is announced, with delayed re-announcement
//! rounds when the bus keeps failing. When every round fails the publication
//! is abandoned; a new request or an explicit retry re-announces the stored
//! record without running the pipeline again.

use crate::error::ValidationError;
use crate::pipeline::{ManuscriptText, PublishingPipeline};
use crate::store::BookRecord;
use bookpress_contracts::{BookId, ManuscriptId, envelope, topics};
use bookpress_core::{
    SmallVec, async_effect, delay, effect::Effect, event_bus::EventBus, publish_event,
    reducer::Reducer, smallvec,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

// ============================================================================
// State
// ============================================================================

/// Lifecycle of one publish request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublicationStatus {
    /// Pipeline queued or running
    Processing,
    /// Record stored, announcement in flight
    Persisted,
    /// Announcement failed, waiting for the next round
    AnnouncementPending,
    /// Every announcement round failed; a new request re-announces the record
    AnnouncementAbandoned,
    /// Announced
    Published,
    /// Rejected before any work
    Rejected,
    /// Pipeline failed, nothing stored
    Aborted,
}

impl PublicationStatus {
    /// Whether a new request for the same manuscript is a duplicate
    #[must_use]
    pub const fn blocks_new_request(self) -> bool {
        matches!(
            self,
            Self::Processing | Self::Persisted | Self::AnnouncementPending | Self::Published
        )
    }
}

/// Publish request of one manuscript
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    /// Where the request stands
    pub status: PublicationStatus,
    /// Stored record, once persisted
    pub record: Option<BookRecord>,
    /// Announcement rounds started
    pub announcement_rounds: u32,
    /// Why the request was rejected or aborted
    pub failure: Option<String>,
}

impl Publication {
    const fn with_status(status: PublicationStatus) -> Self {
        Self {
            status,
            record: None,
            announcement_rounds: 0,
            failure: None,
        }
    }
}

/// State of the publishing aggregate
#[derive(Debug, Clone, Default)]
pub struct PublishingState {
    /// Publications by manuscript
    pub publications: HashMap<ManuscriptId, Publication>,
}

impl PublishingState {
    /// Creates an empty state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Status of `manuscript_id`
    #[must_use]
    pub fn status(&self, manuscript_id: &ManuscriptId) -> Option<PublicationStatus> {
        self.publications.get(manuscript_id).map(|p| p.status)
    }
}

// ============================================================================
// Actions
// ============================================================================

/// Actions of the publishing aggregate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishingAction {
    // Commands
    /// Publish a manuscript
    RequestPublishing {
        /// Manuscript to publish
        manuscript: ManuscriptText,
    },
    /// Start another announcement round
    RetryAnnouncement {
        /// Manuscript whose record is announced
        manuscript_id: ManuscriptId,
    },

    // Events
    /// The request was invalid
    PublishingRejected {
        /// Manuscript
        manuscript_id: ManuscriptId,
        /// Validation message
        reason: String,
    },
    /// The pipeline failed before persisting
    PublishingAborted {
        /// Manuscript
        manuscript_id: ManuscriptId,
        /// Failure message
        reason: String,
    },
    /// The record was stored
    BookPersisted {
        /// Stored record
        record: BookRecord,
    },
    /// The `Published` event was accepted by the bus
    Published {
        /// Manuscript
        manuscript_id: ManuscriptId,
        /// Announced book
        book_id: BookId,
    },
    /// Every publish attempt of an announcement round failed
    AnnouncementFailed {
        /// Manuscript
        manuscript_id: ManuscriptId,
        /// Last bus error
        error: String,
    },
}

// ============================================================================
// Environment
// ============================================================================

/// Announcement and queue settings
#[derive(Debug, Clone)]
pub struct PublishingSettings {
    /// Topic of the `Published` event
    pub topic: String,
    /// Pipelines allowed to run at once
    pub max_concurrent_publishes: usize,
    /// Wait before a re-announcement round
    pub announcement_retry_delay: Duration,
    /// Announcement rounds before giving up
    pub max_announcement_rounds: u32,
}

impl Default for PublishingSettings {
    fn default() -> Self {
        Self {
            topic: topics::PUBLISHING_EVENTS.to_string(),
            max_concurrent_publishes: 1,
            announcement_retry_delay: Duration::from_secs(5),
            max_announcement_rounds: 3,
        }
    }
}

/// Environment of the publishing aggregate
#[derive(Clone)]
pub struct PublishingEnvironment {
    /// Publish request steps
    pub pipeline: Arc<PublishingPipeline>,
    /// Bus for announcements
    pub event_bus: Arc<dyn EventBus>,
    /// Bounded publish queue
    pub publish_queue: Arc<Semaphore>,
    /// Settings
    pub settings: PublishingSettings,
}

impl PublishingEnvironment {
    /// Creates an environment with a queue of `settings.max_concurrent_publishes` permits
    #[must_use]
    pub fn new(
        pipeline: PublishingPipeline,
        event_bus: Arc<dyn EventBus>,
        settings: PublishingSettings,
    ) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            event_bus,
            publish_queue: Arc::new(Semaphore::new(settings.max_concurrent_publishes.max(1))),
            settings,
        }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer of the publishing aggregate
#[derive(Clone, Debug, Default)]
pub struct PublishingReducer;

impl PublishingReducer {
    /// Creates a new `PublishingReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn run_pipeline(
        manuscript: ManuscriptText,
        env: &PublishingEnvironment,
    ) -> Effect<PublishingAction> {
        let pipeline = Arc::clone(&env.pipeline);
        let queue = Arc::clone(&env.publish_queue);

        async_effect! {
            let manuscript_id = manuscript.manuscript_id.clone();
            let Ok(_permit) = queue.acquire_owned().await else {
                return Some(PublishingAction::PublishingAborted {
                    manuscript_id,
                    reason: "publish queue closed".to_string(),
                });
            };

            match pipeline.publish(&manuscript).await {
                Ok(record) => Some(PublishingAction::BookPersisted { record }),
                Err(error) => {
                    tracing::error!(manuscript_id = %manuscript_id, error = %error, "Publishing aborted");
                    Some(PublishingAction::PublishingAborted {
                        manuscript_id,
                        reason: error.to_string(),
                    })
                },
            }
        }
    }

    /// Start a fresh series of announcement rounds for an abandoned publication
    fn reannounce(
        publication: &mut Publication,
        manuscript_id: &ManuscriptId,
        env: &PublishingEnvironment,
    ) -> SmallVec<[Effect<PublishingAction>; 4]> {
        let Some(record) = publication.record.clone() else {
            return SmallVec::new();
        };
        publication.status = PublicationStatus::Persisted;
        publication.announcement_rounds = 1;
        tracing::info!(manuscript_id = %manuscript_id, "Re-announcing abandoned book");
        smallvec![Self::announce(&record, env)]
    }

    fn announce(record: &BookRecord, env: &PublishingEnvironment) -> Effect<PublishingAction> {
        let manuscript_id = record.manuscript_id.clone();

        let event = match envelope(&record.published_event(), record.book_id.as_str()) {
            Ok(event) => event,
            Err(error) => {
                return Effect::emit(PublishingAction::AnnouncementFailed {
                    manuscript_id,
                    error: error.to_string(),
                });
            },
        };

        let book_id = record.book_id.clone();
        let failed_id = manuscript_id.clone();
        publish_event! {
            bus: env.event_bus,
            topic: env.settings.topic,
            event: event,
            on_success: || Some(PublishingAction::Published { manuscript_id, book_id }),
            on_error: |error| Some(PublishingAction::AnnouncementFailed {
                manuscript_id: failed_id,
                error: error.to_string(),
            })
        }
    }
}

impl Reducer for PublishingReducer {
    type State = PublishingState;
    type Action = PublishingAction;
    type Environment = PublishingEnvironment;

    #[allow(clippy::too_many_lines)] // One arm per action
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Commands ==========
            PublishingAction::RequestPublishing { manuscript } => {
                let manuscript_id = manuscript.manuscript_id.clone();

                if let Some(publication) = state
                    .publications
                    .get_mut(&manuscript_id)
                    .filter(|p| p.status == PublicationStatus::AnnouncementAbandoned)
                {
                    return Self::reannounce(publication, &manuscript_id, env);
                }

                if let Some(status) = state
                    .status(&manuscript_id)
                    .filter(|status| status.blocks_new_request())
                {
                    tracing::debug!(
                        manuscript_id = %manuscript_id,
                        status = ?status,
                        "Duplicate publish request ignored"
                    );
                    return SmallVec::new();
                }

                if let Err(error) = manuscript.validate() {
                    return reject(state, manuscript_id, &error);
                }

                tracing::info!(manuscript_id = %manuscript_id, title = %manuscript.title, "Publish request queued");
                metrics::counter!("publishing.requests").increment(1);
                state.publications.insert(
                    manuscript_id,
                    Publication::with_status(PublicationStatus::Processing),
                );

                smallvec![Self::run_pipeline(manuscript, env)]
            },

            PublishingAction::RetryAnnouncement { manuscript_id } => {
                let Some(publication) = state.publications.get_mut(&manuscript_id) else {
                    return SmallVec::new();
                };
                if publication.status == PublicationStatus::AnnouncementAbandoned {
                    return Self::reannounce(publication, &manuscript_id, env);
                }
                if publication.status != PublicationStatus::AnnouncementPending {
                    return SmallVec::new();
                }
                let Some(record) = publication.record.clone() else {
                    return SmallVec::new();
                };

                publication.status = PublicationStatus::Persisted;
                publication.announcement_rounds += 1;
                tracing::info!(
                    manuscript_id = %manuscript_id,
                    round = publication.announcement_rounds,
                    "Re-announcing book"
                );
                smallvec![Self::announce(&record, env)]
            },

            // ========== Events ==========
            PublishingAction::PublishingRejected {
                manuscript_id,
                reason,
            } => {
                let publication = state
                    .publications
                    .entry(manuscript_id)
                    .or_insert_with(|| Publication::with_status(PublicationStatus::Rejected));
                publication.status = PublicationStatus::Rejected;
                publication.failure = Some(reason);
                SmallVec::new()
            },

            PublishingAction::PublishingAborted {
                manuscript_id,
                reason,
            } => {
                metrics::counter!("publishing.aborted").increment(1);
                let publication = state
                    .publications
                    .entry(manuscript_id)
                    .or_insert_with(|| Publication::with_status(PublicationStatus::Aborted));
                publication.status = PublicationStatus::Aborted;
                publication.failure = Some(reason);
                SmallVec::new()
            },

            PublishingAction::BookPersisted { record } => {
                let effect = Self::announce(&record, env);
                let publication = state
                    .publications
                    .entry(record.manuscript_id.clone())
                    .or_insert_with(|| Publication::with_status(PublicationStatus::Persisted));
                publication.status = PublicationStatus::Persisted;
                publication.record = Some(record);
                publication.announcement_rounds = 1;
                smallvec![effect]
            },

            PublishingAction::Published {
                manuscript_id,
                book_id,
            } => {
                if let Some(publication) = state.publications.get_mut(&manuscript_id) {
                    publication.status = PublicationStatus::Published;
                }
                tracing::info!(manuscript_id = %manuscript_id, book_id = %book_id, "Book published");
                metrics::counter!("publishing.published").increment(1);
                SmallVec::new()
            },

            PublishingAction::AnnouncementFailed {
                manuscript_id,
                error,
            } => {
                let Some(publication) = state.publications.get_mut(&manuscript_id) else {
                    return SmallVec::new();
                };
                if publication.announcement_rounds >= env.settings.max_announcement_rounds {
                    publication.status = PublicationStatus::AnnouncementAbandoned;
                    tracing::error!(
                        manuscript_id = %manuscript_id,
                        rounds = publication.announcement_rounds,
                        error = %error,
                        "Announcement abandoned"
                    );
                    metrics::counter!("publishing.announcement_abandoned").increment(1);
                    return SmallVec::new();
                }
                publication.status = PublicationStatus::AnnouncementPending;

                tracing::warn!(
                    manuscript_id = %manuscript_id,
                    error = %error,
                    retry_in = ?env.settings.announcement_retry_delay,
                    "Announcement failed, scheduling another round"
                );
                smallvec![delay! {
                    duration: env.settings.announcement_retry_delay,
                    action: PublishingAction::RetryAnnouncement { manuscript_id }
                }]
            },
        }
    }
}

fn reject(
    state: &mut PublishingState,
    manuscript_id: ManuscriptId,
    error: &ValidationError,
) -> SmallVec<[Effect<PublishingAction>; 4]> {
    tracing::warn!(manuscript_id = %manuscript_id, error = %error, "Publish request rejected");
    let mut publication = Publication::with_status(PublicationStatus::Rejected);
    publication.failure = Some(error.to_string());
    state.publications.insert(manuscript_id.clone(), publication);

    smallvec![Effect::emit(PublishingAction::PublishingRejected {
        manuscript_id,
        reason: error.to_string(),
    })]
}
