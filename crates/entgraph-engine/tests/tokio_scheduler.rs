//! Background hard-deletion passes on a tokio runtime.

use std::sync::Arc;
use std::time::{Duration, Instant};

use entgraph_common::fields;
use entgraph_core::schema::{DeletionPolicy, EdgeDecl, EntDef, FieldType};
use entgraph_core::{EntSchema, MemoryStore};
use entgraph_engine::{Config, EntDb, TokioScheduler};

fn schema(delay: Duration) -> EntSchema {
    EntSchema::build([
        EntDef::new("notebooks")
            .field("title", FieldType::String)
            .edge(EdgeDecl::many("notes").soft_cascade())
            .deletion(DeletionPolicy::Scheduled { delay }),
        EntDef::new("notes")
            .field("text", FieldType::String)
            .edge(EdgeDecl::single("notebook"))
            .deletion(DeletionPolicy::Soft),
    ])
    .unwrap()
}

async fn wait_until(mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    done()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_scheduled_pass_runs_in_background() {
    let store = Arc::new(MemoryStore::new());
    let (scheduler, worker) = TokioScheduler::new();
    let db = Arc::new(
        EntDb::builder(schema(Duration::from_millis(20)))
            .store(store.clone())
            .scheduler(Arc::new(scheduler))
            .config(Config::default().with_deletion_batch_size(3))
            .build()
            .unwrap(),
    );
    let handle = worker.spawn(&db);

    let book = db
        .mutation(|ctx| {
            let book = ctx.insert("notebooks", fields! { "title" => "ideas" })?;
            ctx.insert_many(
                "notes",
                (0..10).map(|i| fields! { "text" => format!("n{i}"), "notebookId" => book }),
            )?;
            Ok(book)
        })
        .unwrap();

    db.mutation(|ctx| ctx.delete("notebooks", book)).unwrap();
    assert_eq!(store.document_count("notes"), 10);

    let gone = wait_until(|| {
        store.document_count("notebooks") == 0 && store.document_count("notes") == 0
    })
    .await;
    assert!(gone);

    drop(db);
    handle.abort();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_undelete_before_pass_keeps_entities() {
    let store = Arc::new(MemoryStore::new());
    let (scheduler, worker) = TokioScheduler::new();
    let db = Arc::new(
        EntDb::builder(schema(Duration::from_millis(200)))
            .store(store.clone())
            .scheduler(Arc::new(scheduler))
            .build()
            .unwrap(),
    );
    let handle = worker.spawn(&db);

    let book = db
        .mutation(|ctx| ctx.insert("notebooks", fields! { "title" => "keep" }))
        .unwrap();
    db.mutation(|ctx| ctx.delete("notebooks", book)).unwrap();
    db.mutation(|ctx| ctx.undelete("notebooks", book)).unwrap();

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(store.document_count("notebooks"), 1);
    assert!(db.query(|ctx| ctx.get("notebooks", book)).unwrap().is_some());

    handle.abort();
}
