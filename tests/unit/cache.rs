//! Unit tests for the price fetch cache

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use stocklens::cache::{CachePolicy, PriceFetchCache};
use stocklens::error::FetchError;
use stocklens::metrics::Metrics;
use stocklens::models::{Period, PriceQuery};
use tokio_test::assert_err;

use crate::test_utils::ScriptedProvider;

fn cache_with(provider: Arc<ScriptedProvider>, policy: CachePolicy) -> PriceFetchCache {
    PriceFetchCache::new(provider, policy)
}

fn query(ticker: &str, period: Period) -> PriceQuery {
    PriceQuery::new(ticker, period).unwrap()
}

#[tokio::test]
async fn repeat_query_is_served_from_cache() {
    let provider = Arc::new(ScriptedProvider::new().with_series("MSFT", 1));
    let cache = cache_with(provider.clone(), CachePolicy::default());
    let q = query("MSFT", Period::OneDay);

    let first = cache.get(&q).await.unwrap();
    let second = cache.get(&q).await.unwrap();

    assert_eq!(provider.calls_for(&q), 1);
    assert_eq!(first.len(), 1);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.bars[0], second.bars[0]);
}

#[tokio::test]
async fn periods_do_not_share_entries() {
    let provider = Arc::new(ScriptedProvider::new().with_series("AAPL", 5));
    let cache = cache_with(provider.clone(), CachePolicy::default());
    let month = query("AAPL", Period::OneMonth);
    let year = query("AAPL", Period::OneYear);

    cache.get(&month).await.unwrap();
    cache.get(&year).await.unwrap();
    cache.get(&month).await.unwrap();

    assert_eq!(provider.calls_for(&month), 1);
    assert_eq!(provider.calls_for(&year), 1);
    assert_eq!(cache.len().await, 2);
}

#[tokio::test]
async fn ticker_case_maps_to_same_entry() {
    let provider = Arc::new(ScriptedProvider::new().with_series("AAPL", 3));
    let cache = cache_with(provider.clone(), CachePolicy::default());

    cache.get_raw("aapl", "1mo").await.unwrap();
    cache.get_raw(" AAPL ", "1MO").await.unwrap();

    assert_eq!(provider.total_calls(), 1);
}

#[tokio::test]
async fn empty_result_is_an_error_and_not_cached() {
    let provider = Arc::new(ScriptedProvider::new());
    let cache = cache_with(provider.clone(), CachePolicy::default());
    let q = query("ZZZINVALID", Period::OneMonth);

    let err = cache.get(&q).await.unwrap_err();
    assert_eq!(
        err,
        FetchError::EmptyData {
            ticker: "ZZZINVALID".to_string(),
            period: "1mo".to_string(),
        }
    );
    assert!(cache.is_empty().await);

    assert_err!(cache.get(&q).await);
    assert_eq!(provider.calls_for(&q), 2);
}

#[tokio::test]
async fn network_failure_is_retried_on_next_call() {
    let provider = Arc::new(ScriptedProvider::new().with_failures(
        "NVDA",
        1,
        FetchError::Network("connection refused".to_string()),
        4,
    ));
    let cache = cache_with(provider.clone(), CachePolicy::default());
    let q = query("NVDA", Period::FiveDays);

    let err = cache.get(&q).await.unwrap_err();
    assert!(matches!(err, FetchError::Network(_)));
    assert!(cache.is_empty().await);

    let series = cache.get(&q).await.unwrap();
    assert_eq!(series.len(), 4);
    assert_eq!(provider.calls_for(&q), 2);

    cache.get(&q).await.unwrap();
    assert_eq!(provider.calls_for(&q), 2);
}

#[tokio::test]
async fn invalid_input_never_reaches_provider() {
    let provider = Arc::new(ScriptedProvider::new());
    let cache = cache_with(provider.clone(), CachePolicy::default());

    let err = cache.get_raw("", "1mo").await.unwrap_err();
    assert!(matches!(err, FetchError::InvalidQuery(_)));

    let err = cache.get_raw("AAPL", "3w").await.unwrap_err();
    assert!(matches!(err, FetchError::InvalidQuery(_)));

    assert_eq!(provider.total_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn entries_expire_after_ttl() {
    let provider = Arc::new(ScriptedProvider::new().with_series("TSLA", 2));
    let policy = CachePolicy {
        ttl: Some(Duration::from_secs(60)),
        capacity: 16,
    };
    let cache = cache_with(provider.clone(), policy);
    let q = query("TSLA", Period::OneMonth);

    let first = cache.get(&q).await.unwrap();
    tokio::time::advance(Duration::from_secs(59)).await;
    let still_cached = cache.get(&q).await.unwrap();
    assert!(Arc::ptr_eq(&first, &still_cached));
    assert_eq!(provider.calls_for(&q), 1);

    tokio::time::advance(Duration::from_secs(2)).await;
    let refreshed = cache.get(&q).await.unwrap();
    assert!(!Arc::ptr_eq(&first, &refreshed));
    assert_eq!(provider.calls_for(&q), 2);
}

#[tokio::test(start_paused = true)]
async fn no_ttl_keeps_entries_for_process_lifetime() {
    let provider = Arc::new(ScriptedProvider::new().with_series("TSLA", 2));
    let policy = CachePolicy {
        ttl: None,
        capacity: 16,
    };
    let cache = cache_with(provider.clone(), policy);
    let q = query("TSLA", Period::OneYear);

    cache.get(&q).await.unwrap();
    tokio::time::advance(Duration::from_secs(60 * 60 * 24)).await;
    cache.get(&q).await.unwrap();

    assert_eq!(provider.calls_for(&q), 1);
}

#[tokio::test(start_paused = true)]
async fn full_cache_evicts_oldest_entry() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_series("AAPL", 1)
            .with_series("MSFT", 1)
            .with_series("TSLA", 1),
    );
    let policy = CachePolicy {
        ttl: None,
        capacity: 2,
    };
    let cache = cache_with(provider.clone(), policy);
    let aapl = query("AAPL", Period::OneDay);
    let msft = query("MSFT", Period::OneDay);
    let tsla = query("TSLA", Period::OneDay);

    cache.get(&aapl).await.unwrap();
    tokio::time::advance(Duration::from_secs(1)).await;
    cache.get(&msft).await.unwrap();
    tokio::time::advance(Duration::from_secs(1)).await;
    cache.get(&tsla).await.unwrap();

    assert_eq!(cache.len().await, 2);

    cache.get(&msft).await.unwrap();
    cache.get(&tsla).await.unwrap();
    assert_eq!(provider.calls_for(&msft), 1);
    assert_eq!(provider.calls_for(&tsla), 1);

    cache.get(&aapl).await.unwrap();
    assert_eq!(provider.calls_for(&aapl), 2);
}

#[tokio::test]
async fn concurrent_misses_share_one_fetch() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_series("AMZN", 10)
            .with_delay(Duration::from_millis(50)),
    );
    let cache = cache_with(provider.clone(), CachePolicy::default());
    let q = query("AMZN", Period::ThreeMonths);

    let results = join_all((0..8).map(|_| cache.get(&q))).await;

    let series: Vec<_> = results.into_iter().map(Result::unwrap).collect();
    assert_eq!(provider.calls_for(&q), 1);
    assert!(series.iter().all(|s| Arc::ptr_eq(s, &series[0])));
}

#[tokio::test(start_paused = true)]
async fn failed_fetch_keeps_later_misses_serialized() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_failures("TSLA", 100, FetchError::Network("timed out".to_string()), 5)
            .with_delay(Duration::from_millis(100)),
    );
    let cache = Arc::new(cache_with(provider.clone(), CachePolicy::default()));
    let q = query("TSLA", Period::OneMonth);

    let callers = (0..4u64).map(|i| {
        let cache = cache.clone();
        let q = q.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(60 * i)).await;
            cache.get(&q).await
        })
    });
    let results = join_all(callers).await;

    for result in results {
        assert_err!(result.unwrap());
    }
    assert_eq!(provider.calls_for(&q), 4);
    assert_eq!(provider.max_concurrent_fetches(), 1);
    assert_eq!(cache.stats().await.in_flight, 0);
}

#[tokio::test(start_paused = true)]
async fn dropped_request_releases_its_key() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_series("NFLX", 4)
            .with_delay(Duration::from_millis(100)),
    );
    let cache = cache_with(provider.clone(), CachePolicy::default());
    let q = query("NFLX", Period::OneMonth);

    let abandoned = tokio::time::timeout(Duration::from_millis(30), cache.get(&q)).await;
    assert!(abandoned.is_err());
    assert_eq!(cache.stats().await.in_flight, 0);

    let series = cache.get(&q).await.unwrap();
    assert_eq!(series.len(), 4);
    assert_eq!(cache.stats().await.in_flight, 0);
}

#[tokio::test]
async fn zero_capacity_stores_nothing() {
    let provider = Arc::new(ScriptedProvider::new().with_series("IBM", 2));
    let cache = cache_with(
        provider.clone(),
        CachePolicy {
            ttl: None,
            capacity: 0,
        },
    );
    let q = query("IBM", Period::OneYear);

    for _ in 0..3 {
        assert_eq!(cache.get(&q).await.unwrap().len(), 2);
    }

    assert_eq!(provider.calls_for(&q), 3);
    assert_eq!(cache.len().await, 0);
}

#[tokio::test]
async fn invalidate_and_clear_force_refetch() {
    let provider = Arc::new(ScriptedProvider::new().with_series("GOOGL", 3));
    let cache = cache_with(provider.clone(), CachePolicy::default());
    let q = query("GOOGL", Period::SixMonths);

    cache.get(&q).await.unwrap();
    assert!(cache.invalidate(&q).await);
    assert!(!cache.invalidate(&q).await);
    cache.get(&q).await.unwrap();
    assert_eq!(provider.calls_for(&q), 2);

    cache.clear().await;
    assert!(cache.is_empty().await);
    cache.get(&q).await.unwrap();
    assert_eq!(provider.calls_for(&q), 3);
}

#[tokio::test]
async fn stats_and_metrics_track_hits_and_misses() {
    let metrics = Arc::new(Metrics::new().unwrap());
    let provider = Arc::new(ScriptedProvider::new().with_series("META", 2));
    let cache = PriceFetchCache::new(provider, CachePolicy::default()).with_metrics(metrics.clone());
    let q = query("META", Period::OneMonth);

    cache.get(&q).await.unwrap();
    cache.get(&q).await.unwrap();
    cache.get(&q).await.unwrap();
    let _ = cache.get_raw("NOPE", "1mo").await;

    let stats = cache.stats().await;
    assert_eq!(stats.entries, 1);
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.fetches, 2);

    assert_eq!(metrics.price_cache_hits_total.get(), 2);
    assert_eq!(metrics.price_cache_misses_total.get(), 2);
    assert_eq!(
        metrics
            .price_fetch_errors_total
            .with_label_values(&["empty_data"])
            .get(),
        1
    );
}
