use awaitility::at_most;
use rowshape::errors::{ErrorKind, RowshapeError};
use rowshape::migration::EntityMeta;
use rowshape_derive::Entity;
use rowshape_int_test::test_util::{create_test_context, run_test};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

#[derive(Entity, Debug, Clone, PartialEq)]
struct Event {
    id: i64,
    source: String,
    seq: i32,
}

fn event(source: &str, seq: i32) -> Event {
    Event {
        id: 0,
        source: source.to_string(),
        seq,
    }
}

fn events_meta() -> EntityMeta {
    EntityMeta::of::<Event>(1).limited_to_table("Events")
}

#[test]
fn test_spawned_operation_runs_under_lock() {
    run_test(create_test_context, |ctx| {
        let db = ctx.open(&[events_meta()])?;
        let done = Arc::new(AtomicBool::new(false));

        let writer = db.clone();
        let flag = done.clone();
        db.lock().spawn(move || {
            writer.insert("Events", &event("spawned", 1))?;
            flag.store(true, Ordering::SeqCst);
            Ok(())
        });

        at_most(Duration::from_secs(5)).until(|| done.load(Ordering::SeqCst));
        let rows = db.select_rows("Events", &["source"], |_| {})?;
        assert_eq!(rows.len(), 1);
        Ok(())
    });
}

#[test]
fn test_spawn_get_hands_default_on_failure() {
    run_test(create_test_context, |ctx| {
        let db = ctx.open(&[events_meta()])?;
        let (tx, rx) = mpsc::channel();

        let reader = db.clone();
        let ok_tx = tx.clone();
        db.lock().spawn_get(
            usize::MAX,
            move || Ok(reader.select_rows("Events", &[], |_| {})?.len()),
            move |count| {
                let _ = ok_tx.send(count);
            },
        );
        db.lock().spawn_get(
            usize::MAX,
            || Err(RowshapeError::new("no rows for you", ErrorKind::InternalError)),
            move |count| {
                let _ = tx.send(count);
            },
        );

        let mut results = vec![
            rx.recv_timeout(Duration::from_secs(5)).expect("first result"),
            rx.recv_timeout(Duration::from_secs(5)).expect("second result"),
        ];
        results.sort();
        assert_eq!(results, vec![0, usize::MAX]);
        Ok(())
    });
}

#[test]
fn test_concurrent_inserts_are_serialized() {
    run_test(create_test_context, |ctx| {
        let db = ctx.open(&[events_meta()])?;
        let inside = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let db = db.clone();
                let inside = inside.clone();
                thread::spawn(move || {
                    for seq in 0..10 {
                        db.lock()
                            .run(|| {
                                assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                                let result = db.insert("Events", &event(&format!("w{}", worker), seq));
                                inside.fetch_sub(1, Ordering::SeqCst);
                                result
                            })
                            .expect("insert");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("worker thread");
        }

        let rows = db.select_rows("Events", &[], |_| {})?;
        assert_eq!(rows.len(), 40);
        let w2: Vec<Event> = db.select_entities("Events", |q| {
            q.filter(|w| {
                w.eq("source", "w2");
            })
            .order_by(|o| {
                o.asc("seq");
            });
        })?;
        assert_eq!(w2.iter().map(|e| e.seq).collect::<Vec<_>>(), (0..10).collect::<Vec<_>>());
        Ok(())
    });
}

#[tokio::test(flavor = "multi_thread")]
async fn test_async_access() {
    let ctx = create_test_context().expect("test context");
    let db = ctx.open(&[events_meta()]).expect("open");

    let writer = db.clone();
    let inserted = db
        .lock()
        .run_async(move || writer.insert("Events", &event("async", 1)))
        .await
        .expect("async insert");
    assert_eq!(inserted, 1);

    let reader = db.clone();
    let count = db
        .lock()
        .get_or_async(0, move || Ok(reader.select_rows("Events", &[], |_| {})?.len()))
        .await;
    assert_eq!(count, 1);

    let fallback = db
        .lock()
        .get_or_async(-1, || {
            Err(RowshapeError::new("unavailable", ErrorKind::BackendError))
        })
        .await;
    assert_eq!(fallback, -1);
}
