//! Integration tests for the store.

use provisional::{
    completion, Action, Controls, Handlers, Record, Route, Status, Store, Table,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

type Counters = Table<String, i64>;

const WAIT: Duration = Duration::from_millis(1000);

fn set(key: &'static str, value: i64) -> impl Fn(Counters) -> Counters + Send + Sync {
    move |state| state.set(key.to_string(), value)
}

fn counters(pairs: &[(&str, i64)]) -> Counters {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

/// Handlers used by most tests:
/// - "set": applies `{key, value}` and commits immediately
/// - "stage": applies `{key, value}` and hands the controls back to the test
/// - "save": async transform writing `{key, value}`
fn handlers(staged: crossbeam_channel::Sender<Controls<Counters, Value>>) -> Handlers<Counters> {
    Handlers::new()
        .on_sync("set", |controls, payload: &Value, _| {
            let key = payload["key"].as_str().unwrap_or_default().to_string();
            let value = payload["value"].as_i64().unwrap_or_default();
            controls.apply(move |state: Counters| state.set(key.clone(), value));
            controls.commit();
        })
        .on_sync("stage", move |controls, payload: &Value, _| {
            let key = payload["key"].as_str().unwrap_or_default().to_string();
            let value = payload["value"].as_i64().unwrap_or_default();
            controls.apply(move |state: Counters| state.set(key.clone(), value));
            let _ = staged.send(controls);
        })
        .on_async("save", |state, action| {
            let key = action.payload["key"].as_str().unwrap_or_default().to_string();
            let value = action.payload["value"].as_i64().unwrap_or_default();
            state.set(key, value)
        })
}

fn kv(key: &str, value: i64) -> Value {
    json!({"key": key, "value": value})
}

// --- Transition Ordering ---

#[test]
fn test_commit_then_reject_scenario() {
    let store: Store<Counters> = Store::empty(Handlers::new());
    let snapshots = store.watch().unwrap();

    let a = store.apply(set("x", 1));
    assert!(store.commit(a));
    assert_eq!(store.canonical(), counters(&[("x", 1)]));

    // Apply and commit produce equal previews; only one is delivered.
    let delivered: Vec<_> = snapshots.try_iter().collect();
    assert_eq!(delivered.len(), 1);
    assert_eq!(*delivered[0], counters(&[("x", 1)]));

    let b = store.apply(set("x", 2));
    assert!(store.reject(b));
    assert_eq!(store.canonical(), counters(&[("x", 1)]));

    let delivered: Vec<_> = snapshots.try_iter().map(|s| (*s).clone()).collect();
    assert_eq!(delivered, vec![counters(&[("x", 2)]), counters(&[("x", 1)])]);
}

#[test]
fn test_rejection_transparency() {
    let store: Store<Vec<u8>> = Store::empty(Handlers::new());
    let push = |n: u8| {
        move |mut v: Vec<u8>| {
            v.push(n);
            v
        }
    };

    let a1 = store.apply(push(1));
    let a2 = store.apply(push(2));
    let a3 = store.apply(push(3));

    store.commit(a1);
    store.commit(a3);
    assert_eq!(store.canonical(), vec![1]);
    assert_eq!(store.status(a3), Some(Status::Committed));

    store.reject(a2);
    assert_eq!(store.canonical(), vec![1, 3]);
    assert_eq!(store.pending_len(), 0);

    let stats = store.stats();
    assert_eq!(stats.promoted, 2);
    assert_eq!(stats.discarded, 1);
}

#[test]
fn test_preview_overlay() {
    let store: Store<Counters> = Store::empty(Handlers::new());

    let a1 = store.apply(set("a", 1));
    store.apply(set("b", 2));
    store.commit(a1);

    assert_eq!(store.canonical(), counters(&[("a", 1)]));
    assert_eq!(*store.preview(), counters(&[("a", 1), ("b", 2)]));
}

// --- Action Routing ---

#[test]
fn test_sync_handler_apply_commit() {
    let (staged, _) = crossbeam_channel::unbounded();
    let store = Store::empty(handlers(staged));
    let actions = store.watch_actions().unwrap();

    let route = store.dispatch(Action::new("set", kv("x", 5))).unwrap();
    assert_eq!(route, Route::Sync);
    assert_eq!(store.canonical(), counters(&[("x", 5)]));

    let forwarded = actions.try_recv().unwrap();
    assert_eq!(forwarded.name, "set");
    assert_eq!(forwarded.payload, kv("x", 5));
    assert!(forwarded.completion.is_none());
}

#[test]
fn test_sync_handler_deferred_commit() {
    let (staged, staged_rx) = crossbeam_channel::unbounded();
    let store = Store::empty(handlers(staged));
    let actions = store.watch_actions().unwrap();

    store.dispatch(Action::new("stage", kv("x", 1))).unwrap();
    let controls = staged_rx.try_recv().unwrap();

    assert!(controls.applied().is_some());
    assert!(store.canonical().is_empty());
    assert_eq!(*store.preview(), counters(&[("x", 1)]));
    // Nothing is forwarded until the transition resolves.
    assert!(actions.try_recv().is_err());

    std::thread::spawn(move || controls.commit()).join().unwrap();

    assert_eq!(store.canonical(), counters(&[("x", 1)]));
    assert_eq!(actions.try_recv().unwrap().name, "stage");
}

#[test]
fn test_later_commit_waits_for_earlier_stage() {
    let (staged, staged_rx) = crossbeam_channel::unbounded();
    let store = Store::empty(handlers(staged));

    store.dispatch(Action::new("stage", kv("first", 1))).unwrap();
    store.dispatch(Action::new("set", kv("second", 2))).unwrap();

    // "second" is committed but queued behind the unresolved "first".
    assert!(store.canonical().is_empty());
    assert_eq!(*store.preview(), counters(&[("first", 1), ("second", 2)]));

    staged_rx.try_recv().unwrap().commit();
    assert_eq!(store.canonical(), counters(&[("first", 1), ("second", 2)]));
}

#[test]
fn test_second_apply_retargets_commit() {
    let handlers: Handlers<Counters> = Handlers::new().on_sync("twice", |controls, _, _| {
        let first = controls.apply(set("a", 1));
        let second = controls.apply(set("b", 2));
        assert_ne!(first, second);
        assert_eq!(controls.applied(), Some(second));
        controls.commit();
    });
    let store = Store::empty(handlers);

    store.dispatch(Action::new("twice", Value::Null)).unwrap();

    // The first transition is still pending at the head, blocking the second.
    assert!(store.canonical().is_empty());
    assert_eq!(store.pending_len(), 2);
    assert_eq!(*store.preview(), counters(&[("a", 1), ("b", 2)]));
}

#[test]
fn test_async_action_commits_on_success() {
    let (staged, _) = crossbeam_channel::unbounded();
    let store = Store::empty(handlers(staged));
    let actions = store.watch_actions().unwrap();

    let (completer, signal) = completion();
    let route = store
        .dispatch(Action::new("save", kv("doc", 7)).with_completion(signal))
        .unwrap();
    let id = match route {
        Route::Async(id) => id,
        other => panic!("Expected async route, got {:?}", other),
    };

    assert_eq!(store.status(id), Some(Status::Pending));
    assert_eq!(*store.preview(), counters(&[("doc", 7)]));
    assert!(store.canonical().is_empty());

    completer.succeed();
    let forwarded = actions.recv_timeout(WAIT).unwrap();
    assert_eq!(forwarded.name, "save");
    assert_eq!(store.canonical(), counters(&[("doc", 7)]));
    assert_eq!(store.status(id), None);
}

#[test]
fn test_async_action_without_completion_commits() {
    let (staged, _) = crossbeam_channel::unbounded();
    let store = Store::empty(handlers(staged));

    let route = store.dispatch(Action::new("save", kv("doc", 1))).unwrap();
    assert!(matches!(route, Route::Async(_)));
    assert_eq!(store.canonical(), counters(&[("doc", 1)]));
}

#[test]
fn test_unhandled_action_passes_through() {
    let (staged, _) = crossbeam_channel::unbounded();
    let store = Store::empty(handlers(staged));
    let snapshots = store.watch().unwrap();
    let actions = store.watch_actions().unwrap();

    let route = store.dispatch(Action::new("ping", json!({"n": 1}))).unwrap();
    assert_eq!(route, Route::PassThrough);

    assert_eq!(actions.try_recv().unwrap().payload, json!({"n": 1}));
    assert!(snapshots.try_recv().is_err());
    assert!(store.canonical().is_empty());
}

// --- Subscriptions ---

#[test]
fn test_fan_out_to_many_subscribers() {
    let store: Store<Counters> = Store::empty(Handlers::new());

    let receivers: Vec<_> = (0..5)
        .map(|_| {
            let (tx, rx) = crossbeam_channel::unbounded();
            let sub = store
                .subscribe(
                    move |snapshot: Arc<Counters>| {
                        tx.send(snapshot)?;
                        Ok(())
                    },
                    |_| {},
                    || {},
                )
                .unwrap();
            (sub, rx)
        })
        .collect();
    assert_eq!(store.subscriber_count(), 5);

    let a = store.apply(set("x", 1));
    store.commit(a);
    let b = store.apply(set("x", 2));
    store.commit(b);

    for (_, rx) in &receivers {
        let first = rx.recv_timeout(WAIT).unwrap();
        let second = rx.recv_timeout(WAIT).unwrap();
        assert_eq!(*first, counters(&[("x", 1)]));
        assert_eq!(*second, counters(&[("x", 2)]));
        assert!(rx.recv_timeout(Duration::from_millis(20)).is_err());
    }
}

#[test]
fn test_observe_maps_snapshots() {
    let store: Store<Counters> = Store::empty(Handlers::new());
    let (tx, rx) = crossbeam_channel::unbounded();

    let sub = store
        .observe(|snapshot| snapshot.len())
        .subscribe(
            move |len| {
                tx.send(len)?;
                Ok(())
            },
            |_| {},
            || {},
        )
        .unwrap();

    store.apply(set("a", 1));
    store.apply(set("b", 1));

    assert_eq!(rx.recv_timeout(WAIT).unwrap(), 1);
    assert_eq!(rx.recv_timeout(WAIT).unwrap(), 2);
    assert!(sub.dispose());
}

#[test]
fn test_subscribe_actions() {
    let store: Store<Counters> = Store::empty(Handlers::new());
    let (tx, rx) = crossbeam_channel::unbounded();

    let _sub = store
        .subscribe_actions(
            move |action| {
                tx.send(action.name.clone())?;
                Ok(())
            },
            |_| {},
            || {},
        )
        .unwrap();

    store.dispatch(Action::new("one", Value::Null)).unwrap();
    store.dispatch(Action::new("two", Value::Null)).unwrap();

    assert_eq!(rx.recv_timeout(WAIT).unwrap(), "one");
    assert_eq!(rx.recv_timeout(WAIT).unwrap(), "two");
}

#[test]
fn test_tap_receives_snapshots() {
    let store: Store<Counters> = Store::empty(Handlers::new());
    let (tx, rx) = crossbeam_channel::bounded(10);

    let id = store.tap(tx).unwrap();
    store.apply(set("x", 1));
    assert_eq!(*rx.try_recv().unwrap(), counters(&[("x", 1)]));

    assert!(store.untap(id));
    store.apply(set("y", 1));
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_drop_store_completes_subscribers() {
    let store: Store<Counters> = Store::empty(Handlers::new());
    let (done_tx, done_rx) = crossbeam_channel::bounded(1);

    let _sub = store
        .subscribe(|_| Ok(()), |_| {}, move || done_tx.send(()).unwrap())
        .unwrap();

    drop(store);
    assert!(done_rx.recv_timeout(WAIT).is_ok());
}

// --- Construction ---

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
struct User {
    id: u64,
    name: String,
}

impl Record for User {
    type Key = u64;

    fn key(&self) -> u64 {
        self.id
    }
}

#[test]
fn test_initial_state_from_records() {
    let users = vec![
        User {
            id: 2,
            name: "bo".to_string(),
        },
        User {
            id: 1,
            name: "al".to_string(),
        },
    ];
    let handlers: Handlers<Table<u64, User>> = Handlers::new().on_sync("rename", |c, p: &Value, _| {
        let name = p["name"].as_str().unwrap_or_default().to_string();
        c.apply(move |t: Table<u64, User>| {
            let name = name.clone();
            t.update(&1, move |u| User { name, ..u })
        });
        c.commit();
    });
    let store = Store::new(Table::from_records(users), handlers);

    store
        .dispatch(Action::new("rename", json!({"name": "alice"})))
        .unwrap();

    let state = store.canonical();
    assert_eq!(state.len(), 2);
    assert_eq!(state.get(&1).unwrap().name, "alice");
    assert_eq!(
        store.to_json().unwrap(),
        r#"{"1":{"id":1,"name":"alice"},"2":{"id":2,"name":"bo"}}"#
    );
}
