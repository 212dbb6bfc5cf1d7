use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::future;
use graphload::{BatchFunction, LoadError, Loader};

#[derive(Debug, PartialEq, Eq, Clone)]
struct DummyData(String);

#[derive(Default)]
struct DummyContext {
    map: HashMap<i64, String>,
    fail: bool,
    calls: AtomicUsize,
    batches: Mutex<Vec<Vec<i64>>>,
}

impl DummyContext {
    fn with_entries(entries: &[(i64, &str)]) -> Arc<Self> {
        Arc::new(Self {
            map: entries.iter().map(|(k, v)| (*k, (*v).to_owned())).collect(),
            ..Default::default()
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self { fail: true, ..Default::default() })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn batches(&self) -> Vec<Vec<i64>> {
        self.batches.lock().unwrap().clone()
    }
}

struct DummyBatchFn;

#[async_trait]
impl BatchFunction<i64, DummyData> for DummyBatchFn {
    type Context = Arc<DummyContext>;

    async fn load(
        keys: &[i64],
        context: &Arc<DummyContext>,
    ) -> Result<Vec<Option<DummyData>>, LoadError> {
        context.calls.fetch_add(1, Ordering::SeqCst);
        context.batches.lock().unwrap().push(keys.to_vec());
        if context.fail {
            return Err(LoadError::fetch("backing store down"));
        }
        Ok(keys.iter().map(|k| context.map.get(k).cloned().map(DummyData)).collect())
    }
}

/// Returns one slot too few, whatever it is asked for.
struct MisalignedBatchFn;

#[async_trait]
impl BatchFunction<i64, DummyData> for MisalignedBatchFn {
    type Context = Arc<DummyContext>;

    async fn load(
        keys: &[i64],
        _context: &Arc<DummyContext>,
    ) -> Result<Vec<Option<DummyData>>, LoadError> {
        Ok(vec![None; keys.len().saturating_sub(1)])
    }
}

#[tokio::test]
async fn basic_load() {
    let context = DummyContext::with_entries(&[(42, "Foo")]);
    let loader = Loader::new(DummyBatchFn, context.clone());
    assert_eq!(loader.load(42).await, Ok(Some(DummyData("Foo".to_owned()))));
}

#[tokio::test]
async fn not_found_is_a_value_not_an_error() {
    let context = DummyContext::with_entries(&[(42, "Foo")]);
    let loader = Loader::new(DummyBatchFn, context.clone());
    assert_eq!(loader.load(7).await, Ok(None));
    assert_eq!(context.calls(), 1);
}

#[tokio::test]
async fn repeated_load_hits_the_session_cache() {
    let context = DummyContext::with_entries(&[(42, "Foo")]);
    let loader = Loader::new(DummyBatchFn, context.clone());
    assert_eq!(loader.load(42).await, Ok(Some(DummyData("Foo".to_owned()))));
    assert_eq!(loader.load(42).await, Ok(Some(DummyData("Foo".to_owned()))));
    assert_eq!(context.calls(), 1);

    // Cached not-found is just as final.
    assert_eq!(loader.load(9).await, Ok(None));
    assert_eq!(loader.load(9).await, Ok(None));
    assert_eq!(context.calls(), 2);
}

#[tokio::test]
async fn basic_load_many() {
    let context =
        DummyContext::with_entries(&[(42, "one fish"), (12, "two fish"), (5, "red fish")]);
    let loader = Loader::new(DummyBatchFn, context.clone());
    assert_eq!(
        loader.load_many(vec![5, 12, 8]).await,
        Ok(vec![
            Some(DummyData("red fish".to_owned())),
            Some(DummyData("two fish".to_owned())),
            None,
        ])
    );
    assert_eq!(context.calls(), 1);
}

#[tokio::test]
async fn empty_load_many_issues_no_fetch() {
    let context = DummyContext::with_entries(&[]);
    let loader = Loader::new(DummyBatchFn, context.clone());
    assert_eq!(loader.load_many(Vec::new()).await, Ok(Vec::new()));
    assert_eq!(context.calls(), 0);
}

#[tokio::test]
async fn same_turn_loads_coalesce_into_one_batch() {
    let context = DummyContext::with_entries(&[
        (42, "one fish"),
        (12, "two fish"),
        (5, "red fish"),
        (8, "blue fish"),
    ]);
    let loader = Loader::new(DummyBatchFn, context.clone());

    let tuple = future::join4(
        loader.load(5),
        loader.load_many(vec![5, 42]),
        loader.load(99),
        loader.load(12),
    );

    assert_eq!(
        tuple.await,
        (
            Ok(Some(DummyData("red fish".to_owned()))),
            Ok(vec![
                Some(DummyData("red fish".to_owned())),
                Some(DummyData("one fish".to_owned())),
            ]),
            Ok(None),
            Ok(Some(DummyData("two fish".to_owned()))),
        )
    );

    // Six requested keys, four distinct, one invocation, first-seen order.
    assert_eq!(context.calls(), 1);
    assert_eq!(context.batches(), vec![vec![5, 42, 99, 12]]);
}

#[tokio::test]
async fn duplicate_keys_share_one_slot_and_one_value() {
    let context = DummyContext::with_entries(&[(42, "Foo")]);
    let loader = Loader::new(DummyBatchFn, context.clone());

    let (a, b, c) = future::join3(loader.load(42), loader.load(42), loader.load(42)).await;
    assert_eq!(a, b);
    assert_eq!(b, c);
    assert_eq!(a, Ok(Some(DummyData("Foo".to_owned()))));
    assert_eq!(context.batches(), vec![vec![42]]);
}

#[tokio::test]
async fn batch_failure_fans_out_to_every_request() {
    let context = DummyContext::failing();
    let loader = Loader::new(DummyBatchFn, context.clone());

    let (a, b) = future::join(loader.load(1), loader.load(2)).await;
    let expected = Err(LoadError::fetch("backing store down"));
    assert_eq!(a, expected);
    assert_eq!(b, expected);
    assert_eq!(context.calls(), 1);

    // The failure is the session's final answer for those keys; no retry.
    assert_eq!(loader.load(1).await, expected);
    assert_eq!(context.calls(), 1);
}

#[tokio::test]
async fn load_many_failure_is_an_aggregate_naming_each_key() {
    let context = DummyContext::failing();
    let loader = Loader::new(DummyBatchFn, context.clone());

    let error = loader.load_many(vec![1, 2]).await.unwrap_err();
    match error {
        LoadError::Aggregate(failures) => {
            assert_eq!(failures.len(), 2);
            assert_eq!(failures[0].key, "1");
            assert_eq!(failures[1].key, "2");
            assert_eq!(*failures[0].error, LoadError::fetch("backing store down"));
        }
        other => panic!("expected aggregate error, got {other:?}"),
    }
}

#[tokio::test]
async fn misaligned_batch_function_is_a_contract_violation() {
    let context = DummyContext::with_entries(&[]);
    let loader = Loader::new(MisalignedBatchFn, context.clone());

    let (a, b) = future::join(loader.load(1), loader.load(2)).await;
    for result in [a, b] {
        match result {
            Err(LoadError::Contract(msg)) => {
                assert!(msg.contains("1 results for 2 distinct keys"), "unexpected: {msg}");
            }
            other => panic!("expected contract violation, got {other:?}"),
        }
    }
}
