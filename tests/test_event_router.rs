//! Event routing: counter deltas per lifecycle event and image cleanup on delete.

mod common;

use common::{image_url, recipe, Harness, RecordingObjectStore};
use recipe_catalog::app::event_router::effects_of;
use recipe_catalog::domain::{CounterKey, CounterSnapshot, DocumentEvent, RecipeId};
use recipe_catalog::infra::object_store::object_path_from_url;
use recipe_catalog::storage::{CounterBackend, MemoryCounterBackend};
use recipe_catalog::{CounterPolicy, CounterService, EventRouter};
use std::sync::Arc;
use std::time::Duration;

fn id(s: &str) -> RecipeId {
    RecipeId::new(s)
}

#[test]
fn created_counts_towards_all_and_maybe_published() {
    let effects = effects_of(&DocumentEvent::Created {
        id: id("a"),
        after: recipe("Omelette", false),
    });
    assert_eq!(effects.deltas, vec![(CounterKey::All, 1)]);
    assert_eq!(effects.image_url, None);

    let effects = effects_of(&DocumentEvent::Created {
        id: id("a"),
        after: recipe("Omelette", true),
    });
    assert_eq!(effects.deltas, vec![(CounterKey::All, 1), (CounterKey::Published, 1)]);
}

#[test]
fn updated_only_moves_published_on_a_flip() {
    let unchanged = effects_of(&DocumentEvent::Updated {
        id: id("a"),
        before: recipe("Omelette", true),
        after: recipe("Spanish omelette", true),
    });
    assert!(unchanged.deltas.is_empty());

    let published = effects_of(&DocumentEvent::Updated {
        id: id("a"),
        before: recipe("Omelette", false),
        after: recipe("Omelette", true),
    });
    assert_eq!(published.deltas, vec![(CounterKey::Published, 1)]);

    let retracted = effects_of(&DocumentEvent::Updated {
        id: id("a"),
        before: recipe("Omelette", true),
        after: recipe("Omelette", false),
    });
    assert_eq!(retracted.deltas, vec![(CounterKey::Published, -1)]);
}

#[test]
fn deleted_decrements_and_requests_cleanup() {
    let mut before = recipe("Omelette", true);
    before.image_url = Some(image_url("images/omelette.jpg"));
    let effects = effects_of(&DocumentEvent::Deleted { id: id("a"), before });
    assert_eq!(effects.deltas, vec![(CounterKey::All, -1), (CounterKey::Published, -1)]);
    assert_eq!(effects.image_url, Some(image_url("images/omelette.jpg")));

    let effects = effects_of(&DocumentEvent::Deleted {
        id: id("b"),
        before: recipe("Toast", false),
    });
    assert_eq!(effects.deltas, vec![(CounterKey::All, -1)]);
    assert_eq!(effects.image_url, None);
}

#[test]
fn object_path_is_decoded_from_download_url() {
    assert_eq!(
        object_path_from_url(&image_url("images/pancakes stack.jpg")).as_deref(),
        Some("images/pancakes stack.jpg")
    );
    assert_eq!(
        object_path_from_url("https://storage.example.com/o/flat.png").as_deref(),
        Some("flat.png")
    );
    assert_eq!(object_path_from_url("https://storage.example.com/images/x.png"), None);
    assert_eq!(object_path_from_url("https://storage.example.com/o/?alt=media"), None);
}

fn fresh_router() -> (EventRouter, Arc<MemoryCounterBackend>, CounterService) {
    let backend = Arc::new(MemoryCounterBackend::new());
    let counters = Arc::new(CounterService::new(backend.clone(), CounterPolicy::default()));
    let router = EventRouter::new(counters, Arc::new(RecordingObjectStore::new()));
    let reader = CounterService::new(backend.clone(), CounterPolicy::default());
    (router, backend, reader)
}

#[tokio::test]
async fn out_of_order_events_converge() -> Result<(), Box<dyn std::error::Error>> {
    // Delete routed ahead of its create; the document no longer exists.
    let (router, backend, reader) = fresh_router();
    router
        .route(DocumentEvent::Deleted {
            id: id("a"),
            before: recipe("Tortilla", true),
        })
        .await;
    assert_eq!(backend.read(CounterKey::All).await?, Some(-1));
    assert_eq!(backend.read(CounterKey::Published).await?, Some(-1));
    router
        .route(DocumentEvent::Created {
            id: id("a"),
            after: recipe("Tortilla", true),
        })
        .await;
    assert_eq!(reader.snapshot().await?, CounterSnapshot { all: 0, published: 0 });
    assert_eq!(backend.read(CounterKey::All).await?, Some(0));
    assert_eq!(backend.read(CounterKey::Published).await?, Some(0));

    // Created draft, published, then retracted; the retraction lands first.
    let (router, backend, reader) = fresh_router();
    router
        .route(DocumentEvent::Updated {
            id: id("b"),
            before: recipe("Migas", true),
            after: recipe("Migas", false),
        })
        .await;
    router
        .route(DocumentEvent::Created {
            id: id("b"),
            after: recipe("Migas", false),
        })
        .await;
    router
        .route(DocumentEvent::Updated {
            id: id("b"),
            before: recipe("Migas", false),
            after: recipe("Migas", true),
        })
        .await;
    assert_eq!(reader.snapshot().await?, CounterSnapshot { all: 1, published: 0 });
    assert_eq!(backend.read(CounterKey::Published).await?, Some(0));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn lifecycle_events_keep_counters_in_step() -> Result<(), Box<dyn std::error::Error>> {
    let harness = Harness::new();
    let catalog = harness.catalog();

    let draft = catalog.create(recipe("Shakshuka", false)).await?;
    let live = catalog.create(recipe("Eggs Benedict", true)).await?;
    let snapshot = harness
        .wait_for_counters(CounterSnapshot { all: 2, published: 1 })
        .await;
    assert_eq!(snapshot, CounterSnapshot { all: 2, published: 1 });

    catalog.replace(&draft, recipe("Shakshuka", true)).await?;
    let snapshot = harness
        .wait_for_counters(CounterSnapshot { all: 2, published: 2 })
        .await;
    assert_eq!(snapshot, CounterSnapshot { all: 2, published: 2 });

    catalog.delete(&live).await?;
    // Deleting twice produces no second event.
    catalog.delete(&live).await?;
    let snapshot = harness
        .wait_for_counters(CounterSnapshot { all: 1, published: 1 })
        .await;
    assert_eq!(snapshot, CounterSnapshot { all: 1, published: 1 });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(catalog.counters().await?, CounterSnapshot { all: 1, published: 1 });
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_image_cleanup_is_attempted_once_and_absorbed() -> Result<(), Box<dyn std::error::Error>> {
    let harness = Harness::with_objects(RecordingObjectStore::failing());
    let catalog = harness.catalog();

    let mut with_image = recipe("Croque madame", true);
    with_image.image_url = Some(image_url("images/croque madame.jpg"));
    let id = catalog.create(with_image).await?;
    harness
        .wait_for_counters(CounterSnapshot { all: 1, published: 1 })
        .await;

    catalog.delete(&id).await?;
    let snapshot = harness
        .wait_for_counters(CounterSnapshot { all: 0, published: 0 })
        .await;
    assert_eq!(snapshot, CounterSnapshot { all: 0, published: 0 });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(harness.objects.requests(), vec!["images/croque madame.jpg".to_string()]);
    assert!(harness.store.is_empty().await);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn router_drains_queued_events_on_close() -> Result<(), Box<dyn std::error::Error>> {
    let harness = Harness::new();
    for i in 0..20 {
        harness
            .catalog()
            .create(recipe(&format!("Frittata {i}"), i % 2 == 0))
            .await?;
    }

    // Dropping every sender closes the feed; the router must still apply
    // everything queued before it.
    let Harness {
        runtime, counters, ..
    } = harness;
    let recorder = CounterService::new(
        counters,
        CounterPolicy::default(),
    );
    drop(runtime);
    let mut snapshot = CounterSnapshot::default();
    for _ in 0..200 {
        snapshot = recorder.snapshot().await?;
        if snapshot == (CounterSnapshot { all: 20, published: 10 }) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(snapshot, CounterSnapshot { all: 20, published: 10 });
    Ok(())
}
