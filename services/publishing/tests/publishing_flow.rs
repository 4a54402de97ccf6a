//! End-to-end publishing through the Store runtime.

#![allow(clippy::unwrap_used)] // Test code

use bookpress_contracts::{AuthorId, ManuscriptId, PublishingEvent, topics};
use bookpress_publishing::enrichment::DEFAULT_COVER_URL;
use bookpress_publishing::error::UpstreamError;
use bookpress_publishing::testing::{
    ScriptedCompletion, ScriptedImages, TestPipeline, enrichment_script,
};
use bookpress_publishing::{
    ManuscriptText, PublicationStatus, PublishingAction, PublishingEnvironment, PublishingReducer,
    PublishingSettings, PublishingState,
};
use bookpress_runtime::{RetryPolicy, Store};
use bookpress_testing::InMemoryEventBus;
use std::sync::Arc;
use std::time::Duration;

type PublishingStore =
    Store<PublishingState, PublishingAction, PublishingEnvironment, PublishingReducer>;

const WAIT: Duration = Duration::from_secs(10);

fn manuscript(id: &str, body: &str) -> ManuscriptText {
    ManuscriptText {
        manuscript_id: ManuscriptId::from(id),
        title: "Tides".to_string(),
        body: body.to_string(),
        author_id: AuthorId::from("a-1"),
    }
}

fn settings() -> PublishingSettings {
    PublishingSettings {
        announcement_retry_delay: Duration::from_millis(10),
        ..PublishingSettings::default()
    }
}

fn store(fixture: &TestPipeline, bus: &InMemoryEventBus, settings: PublishingSettings) -> PublishingStore {
    let env = PublishingEnvironment::new(fixture.pipeline.clone(), Arc::new(bus.clone()), settings);
    Store::with_retry_policy(
        PublishingState::new(),
        PublishingReducer::new(),
        env,
        RetryPolicy::no_retry(),
    )
}

/// Wait until every effect, including the feedback of the last action, finished
async fn settle(store: &PublishingStore) {
    tokio::time::timeout(WAIT, async {
        while store.pending_effects() > 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}

fn is_outcome(action: &PublishingAction) -> bool {
    matches!(
        action,
        PublishingAction::Published { .. }
            | PublishingAction::PublishingAborted { .. }
            | PublishingAction::PublishingRejected { .. }
    )
}

#[tokio::test]
async fn published_event_is_announced_with_the_book_id() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = TestPipeline::new(
        dir.path(),
        enrichment_script("essay", "A quiet book about the sea."),
        ScriptedImages::url("https://img.example.com/c.png"),
    )
    .await
    .unwrap();
    let bus = InMemoryEventBus::new();
    let store = store(&fixture, &bus, settings());

    let outcome = store
        .send_and_wait_for(
            PublishingAction::RequestPublishing {
                manuscript: manuscript("m-1", "The tide came in.\n\nThe tide went out."),
            },
            is_outcome,
            WAIT,
        )
        .await
        .unwrap();

    let PublishingAction::Published { book_id, .. } = outcome else {
        unreachable!("expected Published, got {outcome:?}");
    };

    let events = bus.published_to(topics::PUBLISHING_EVENTS);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, "Published.v1");
    assert_eq!(events[0].correlation_id(), Some(book_id.as_str()));

    let PublishingEvent::Published {
        book_id: announced,
        category,
        author_name,
        page_count,
        ..
    } = events[0].decode::<PublishingEvent>().unwrap();
    assert_eq!(announced, book_id);
    assert_eq!(category, "essay");
    assert_eq!(author_name, "Mina Park");
    assert_eq!(page_count, 3);

    settle(&store).await;
    let status = store
        .state(|s| s.status(&ManuscriptId::from("m-1")))
        .await;
    assert_eq!(status, Some(PublicationStatus::Published));
    assert_eq!(fixture.books.len(), 1);
}

#[tokio::test]
async fn unreachable_cover_still_publishes_with_a_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = TestPipeline::new(
        dir.path(),
        enrichment_script("novel", "Summary."),
        ScriptedImages::url("https://img.example.com/missing.png"),
    )
    .await
    .unwrap();
    let bus = InMemoryEventBus::new();
    let store = store(&fixture, &bus, settings());

    let outcome = store
        .send_and_wait_for(
            PublishingAction::RequestPublishing {
                manuscript: manuscript("m-1", "Body."),
            },
            is_outcome,
            WAIT,
        )
        .await
        .unwrap();

    assert!(matches!(outcome, PublishingAction::Published { .. }));
    let record = fixture.books.records().pop().unwrap();
    assert_eq!(record.image_ref, "https://img.example.com/missing.png");
    assert!(record.document_ref.ends_with(".pdf"));

    let html = std::fs::read_to_string(fixture.storage.html_path(&record.document_id)).unwrap();
    assert!(html.contains("missing.png"));
    assert_eq!(bus.published_to(topics::PUBLISHING_EVENTS).len(), 1);
}

#[tokio::test]
async fn failing_image_generation_publishes_the_default_cover() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = TestPipeline::new(
        dir.path(),
        enrichment_script("history", "Summary."),
        ScriptedImages::failing(UpstreamError::RateLimited),
    )
    .await
    .unwrap();
    let bus = InMemoryEventBus::new();
    let store = store(&fixture, &bus, settings());

    store
        .send_and_wait_for(
            PublishingAction::RequestPublishing {
                manuscript: manuscript("m-1", "Body."),
            },
            is_outcome,
            WAIT,
        )
        .await
        .unwrap();

    let PublishingEvent::Published { image_url, .. } = bus.published_to(topics::PUBLISHING_EVENTS)[0]
        .decode::<PublishingEvent>()
        .unwrap();
    assert_eq!(image_url, DEFAULT_COVER_URL);
}

#[tokio::test]
async fn summary_failure_aborts_without_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let text = ScriptedCompletion::new()
        .fail("Summarize", UpstreamError::Status {
            status: 500,
            message: "boom".to_string(),
        })
        .respond("", "essay");
    let fixture = TestPipeline::new(dir.path(), text, ScriptedImages::url("https://img.example.com/c.png"))
        .await
        .unwrap();
    let bus = InMemoryEventBus::new();
    let store = store(&fixture, &bus, settings());

    let outcome = store
        .send_and_wait_for(
            PublishingAction::RequestPublishing {
                manuscript: manuscript("m-1", "Body."),
            },
            is_outcome,
            WAIT,
        )
        .await
        .unwrap();

    assert!(matches!(outcome, PublishingAction::PublishingAborted { .. }));
    assert!(fixture.books.is_empty());
    assert_eq!(bus.published_count(), 0);
    assert_eq!(
        std::fs::read_dir(fixture.storage.pdfs_dir()).unwrap().count(),
        0
    );
    settle(&store).await;
    let status = store
        .state(|s| s.status(&ManuscriptId::from("m-1")))
        .await;
    assert_eq!(status, Some(PublicationStatus::Aborted));
}

#[tokio::test]
async fn blank_manuscript_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = TestPipeline::new(
        dir.path(),
        enrichment_script("essay", "Summary."),
        ScriptedImages::url("https://img.example.com/c.png"),
    )
    .await
    .unwrap();
    let bus = InMemoryEventBus::new();
    let store = store(&fixture, &bus, settings());

    let outcome = store
        .send_and_wait_for(
            PublishingAction::RequestPublishing {
                manuscript: manuscript("m-1", " \n "),
            },
            is_outcome,
            WAIT,
        )
        .await
        .unwrap();

    assert!(matches!(outcome, PublishingAction::PublishingRejected { .. }));
    assert!(fixture.text.requests().is_empty());
    assert!(fixture.books.is_empty());
}

#[tokio::test]
async fn failed_announcements_are_retried_in_rounds() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = TestPipeline::new(
        dir.path(),
        enrichment_script("essay", "Summary."),
        ScriptedImages::url("https://img.example.com/c.png"),
    )
    .await
    .unwrap();
    let bus = InMemoryEventBus::new();
    bus.fail_next_publishes(2);
    let store = store(&fixture, &bus, settings());

    let outcome = store
        .send_and_wait_for(
            PublishingAction::RequestPublishing {
                manuscript: manuscript("m-1", "Body."),
            },
            is_outcome,
            WAIT,
        )
        .await
        .unwrap();

    assert!(matches!(outcome, PublishingAction::Published { .. }));
    assert_eq!(bus.publish_attempts(), 3);
    assert_eq!(bus.published_count(), 1);
    settle(&store).await;
    let rounds = store
        .state(|s| s.publications[&ManuscriptId::from("m-1")].announcement_rounds)
        .await;
    assert_eq!(rounds, 3);
}

#[tokio::test]
async fn abandoned_announcement_is_recovered_by_a_new_request() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = TestPipeline::new(
        dir.path(),
        enrichment_script("essay", "Summary."),
        ScriptedImages::url("https://img.example.com/c.png"),
    )
    .await
    .unwrap();
    let bus = InMemoryEventBus::new();
    bus.set_unavailable(true);
    let store = store(
        &fixture,
        &bus,
        PublishingSettings {
            max_announcement_rounds: 2,
            ..settings()
        },
    );
    let mut actions = store.subscribe_actions();

    store
        .send(PublishingAction::RequestPublishing {
            manuscript: manuscript("m-1", "Body."),
        })
        .await
        .unwrap();

    let mut failures = 0;
    tokio::time::timeout(WAIT, async {
        while failures < 2 {
            if let PublishingAction::AnnouncementFailed { .. } = actions.recv().await.unwrap() {
                failures += 1;
            }
        }
    })
    .await
    .unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(bus.publish_attempts(), 2);
    assert_eq!(fixture.books.len(), 1);
    settle(&store).await;
    let status = store
        .state(|s| s.status(&ManuscriptId::from("m-1")))
        .await;
    assert_eq!(status, Some(PublicationStatus::AnnouncementAbandoned));

    bus.set_unavailable(false);
    let outcome = store
        .send_and_wait_for(
            PublishingAction::RequestPublishing {
                manuscript: manuscript("m-1", "Body."),
            },
            is_outcome,
            WAIT,
        )
        .await
        .unwrap();

    assert!(matches!(outcome, PublishingAction::Published { .. }));
    assert_eq!(bus.published_count(), 1);
    assert_eq!(fixture.books.len(), 1);
}

#[tokio::test]
async fn duplicate_request_runs_the_pipeline_once() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = TestPipeline::new(
        dir.path(),
        enrichment_script("essay", "Summary."),
        ScriptedImages::url("https://img.example.com/c.png"),
    )
    .await
    .unwrap();
    let bus = InMemoryEventBus::new();
    let store = store(&fixture, &bus, settings());
    let request = PublishingAction::RequestPublishing {
        manuscript: manuscript("m-1", "Body."),
    };

    let mut actions = store.subscribe_actions();

    store.send(request.clone()).await.unwrap();
    store.send(request).await.unwrap();
    tokio::time::timeout(WAIT, async {
        while !is_outcome(&actions.recv().await.unwrap()) {}
    })
    .await
    .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(bus.published_count(), 1);
    assert_eq!(fixture.text.requests().len(), 3);
    assert_eq!(fixture.books.len(), 1);
}

#[tokio::test]
async fn queued_requests_all_complete() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = TestPipeline::new(
        dir.path(),
        enrichment_script("essay", "Summary."),
        ScriptedImages::url("https://img.example.com/c.png"),
    )
    .await
    .unwrap();
    let bus = InMemoryEventBus::new();
    let store = store(&fixture, &bus, settings());
    let mut actions = store.subscribe_actions();

    for id in ["m-1", "m-2", "m-3"] {
        store
            .send(PublishingAction::RequestPublishing {
                manuscript: manuscript(id, "Body."),
            })
            .await
            .unwrap();
    }

    let mut published = 0;
    tokio::time::timeout(WAIT, async {
        while published < 3 {
            if let PublishingAction::Published { .. } = actions.recv().await.unwrap() {
                published += 1;
            }
        }
    })
    .await
    .unwrap();

    assert_eq!(fixture.books.len(), 3);
    assert_eq!(bus.published_to(topics::PUBLISHING_EVENTS).len(), 3);
}
