//! Integration tests for the vector store

use std::sync::{Arc, RwLock};
use std::thread;
use storex::{
    Engine, FlatSearchEngine, LshParams, LshSearchEngine, Metadata, MetadataFilter,
    MetadataValue, SearchEngine, SimilarityMetric, VectorDbError, VectorStore,
};
use tempfile::TempDir;

fn meta(pairs: &[(&str, MetadataValue)]) -> Metadata {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[test]
fn test_basic_workflow() {
    let mut store = VectorStore::new();

    // Insert documents
    store.insert(vec![1.0, 0.0, 0.0], meta(&[("name", "x".into())])).unwrap();
    store.insert(vec![0.0, 1.0, 0.0], meta(&[("name", "y".into())])).unwrap();
    store.insert(vec![0.0, 0.0, 1.0], meta(&[("name", "z".into())])).unwrap();

    assert_eq!(store.len(), 3);
    assert_eq!(store.dimension(), Some(3));

    // Search
    let engine = FlatSearchEngine::new(&store, SimilarityMetric::Cosine);
    let results = engine.search(&[1.0, 0.1, 0.0], 2, None).unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].document.id, 0);
    assert_eq!(results[0].document.field("name"), Some(&MetadataValue::from("x")));

    // Clear
    store.clear();
    assert!(store.is_empty());
    assert_eq!(store.dimension(), None);
}

#[test]
fn test_different_metrics() {
    let metrics = vec![
        SimilarityMetric::Euclidean,
        SimilarityMetric::Cosine,
        SimilarityMetric::DotProduct,
    ];

    for metric in metrics {
        let mut store = VectorStore::new();
        store.insert(vec![1.0, 2.0, 3.0], Metadata::new()).unwrap();
        store.insert(vec![-1.0, -2.0, -3.0], Metadata::new()).unwrap();

        let results = FlatSearchEngine::new(&store, metric)
            .search(&[1.0, 2.0, 3.0], 1, None)
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.id, 0, "metric {}", metric);
    }
}

#[test]
fn test_dimension_locked_by_first_insert() {
    let mut store = VectorStore::new();
    store.insert(vec![1.0, 2.0], Metadata::new()).unwrap();

    let err = store.insert(vec![1.0, 2.0, 3.0], Metadata::new()).unwrap_err();
    assert!(matches!(
        err,
        VectorDbError::DimensionMismatch { expected: 2, actual: 3 }
    ));
    assert_eq!(store.len(), 1);
}

#[test]
fn test_filtered_search_across_engines() {
    let mut store = VectorStore::new();
    let langs = ["en", "de", "fr"];
    for i in 0..60 {
        let angle = i as f32 * 0.1;
        store
            .insert(
                vec![angle.cos(), angle.sin(), 0.5],
                meta(&[("lang", langs[i % 3].into()), ("rank", (i as i64).into())]),
            )
            .unwrap();
    }

    let filter = MetadataFilter::and(vec![
        MetadataFilter::equals("lang", "de"),
        MetadataFilter::range("rank", 10.0, 40.0),
    ]);

    let engines: Vec<Engine<'_>> = vec![
        FlatSearchEngine::new(&store, SimilarityMetric::Cosine).into(),
        LshSearchEngine::new(&store, SimilarityMetric::Cosine, LshParams::new(12, 2).with_seed(4))
            .unwrap()
            .into(),
    ];

    for engine in &engines {
        let results = engine.search(&[1.0, 0.0, 0.5], 5, Some(&filter)).unwrap();
        assert!(!results.is_empty());
        for r in &results {
            assert_eq!(r.document.field("lang"), Some(&MetadataValue::from("de")));
            let rank = r.document.field("rank").and_then(MetadataValue::as_f64).unwrap();
            assert!((10.0..=40.0).contains(&rank));
        }
    }
}

#[test]
fn test_filter_from_json() {
    let mut store = VectorStore::new();
    store.insert(vec![1.0, 0.0], meta(&[("price", 5.into())])).unwrap();
    store.insert(vec![1.0, 0.1], meta(&[("price", 50.into())])).unwrap();
    store.insert(vec![1.0, 0.2], Metadata::new()).unwrap();

    let filter = MetadataFilter::from_json(&serde_json::json!({
        "op": "AND",
        "children": [
            {"op": "EXISTS", "field": "price"},
            {"op": "LT", "field": "price", "value": 10}
        ]
    }))
    .unwrap();

    let results = FlatSearchEngine::new(&store, SimilarityMetric::Euclidean)
        .search(&[1.0, 0.0], 10, Some(&filter))
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].document.id, 0);
}

#[test]
fn test_persistent_workflow() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data").join("store.db");

    {
        let mut store = VectorStore::open(&path, true).unwrap();
        store.insert(vec![0.1, 0.2], meta(&[("k", "a".into())])).unwrap();
        store.insert(vec![0.3, 0.4], meta(&[("k", "b".into())])).unwrap();
    }
    assert!(path.exists());

    let mut reopened = VectorStore::open(&path, true).unwrap();
    assert_eq!(reopened.len(), 2);
    assert_eq!(reopened.get(1).unwrap().field("k"), Some(&MetadataValue::from("b")));

    // Ids continue after a reload
    let id = reopened.insert(vec![0.5, 0.6], Metadata::new()).unwrap();
    assert_eq!(id, 2);
}

#[test]
fn test_shared_store_behind_rwlock() {
    let store = Arc::new(RwLock::new(VectorStore::new()));
    store
        .write()
        .unwrap()
        .insert(vec![1.0, 0.0], Metadata::new())
        .unwrap();

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for i in 0..100 {
                let x = i as f32 / 100.0;
                store
                    .write()
                    .unwrap()
                    .insert(vec![x, 1.0 - x], Metadata::new())
                    .unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..50 {
                    let guard = store.read().unwrap();
                    let engine = FlatSearchEngine::new(&guard, SimilarityMetric::Cosine);
                    let results = engine.search(&[1.0, 0.0], 3, None).unwrap();
                    // Document 0 is an exact match and is never removed
                    assert_eq!(results[0].document.id, 0);
                    assert!(results.len() <= guard.len());
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for r in readers {
        r.join().unwrap();
    }

    assert_eq!(store.read().unwrap().len(), 101);
}
