use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;
use model::Departure;

/// Live departure forecasts. Implementations must swallow per-site failures
/// and return an empty list instead; the batch helper relies on it.
#[async_trait]
pub trait DepartureFeed: Send + Sync {
    /// Bus departures expected at `site_id` within `forecast`. Empty on
    /// per-site failure (logged by the implementation).
    async fn departures(&self, site_id: i64, forecast: Duration) -> Vec<Departure>;
}

/// Fetches departures for several sites strictly in input order, sleeping
/// `pace` between successive requests. The upstream feed has unstated rate
/// limits, so requests are never issued concurrently.
pub async fn batch_departures<F>(
    feed: &F,
    site_ids: &[i64],
    forecast: Duration,
    pace: Duration,
) -> IndexMap<i64, Vec<Departure>>
where
    F: DepartureFeed + ?Sized,
{
    let mut batch: IndexMap<i64, Vec<Departure>> = IndexMap::new();
    for &site_id in site_ids {
        if batch.contains_key(&site_id) {
            continue;
        }
        if !batch.is_empty() {
            tokio::time::sleep(pace).await;
        }
        let departures = feed.departures(site_id, forecast).await;
        log::debug!("site {site_id}: {} departures in window", departures.len());
        batch.insert(site_id, departures);
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubFeed;

    #[tokio::test]
    async fn empty_site_list_yields_empty_map() {
        let feed = StubFeed::default();
        let batch =
            batch_departures(&feed, &[], Duration::from_secs(1200), Duration::ZERO)
                .await;
        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn failing_site_still_yields_entries_for_others() {
        let mut feed = StubFeed::default();
        feed.push_departure(1, crate::test_support::departure(7, 4, 1, 101, 300));
        feed.fail_site(2);
        feed.push_departure(3, crate::test_support::departure(8, 4, 1, 301, 420));

        let batch = batch_departures(
            &feed,
            &[1, 2, 3],
            Duration::from_secs(1200),
            Duration::ZERO,
        )
        .await;

        assert_eq!(batch.len(), 3);
        assert_eq!(batch[&1].len(), 1);
        assert!(batch[&2].is_empty());
        assert_eq!(batch[&3].len(), 1);
        // Input order is preserved.
        let keys: Vec<i64> = batch.keys().copied().collect();
        assert_eq!(keys, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn duplicate_site_ids_are_fetched_once() {
        let mut feed = StubFeed::default();
        feed.push_departure(5, crate::test_support::departure(9, 2, 1, 501, 200));

        let batch = batch_departures(
            &feed,
            &[5, 5, 5],
            Duration::from_secs(1200),
            Duration::ZERO,
        )
        .await;

        assert_eq!(batch.len(), 1);
        assert_eq!(feed.call_count(), 1);
    }
}
