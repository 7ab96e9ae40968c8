use parking_lot::Mutex;
use serde::Serialize;

// ============================================================================
// Streaming Price Analytics
// ============================================================================
//
// Running count/sum/average/min/max over every successfully processed price.
//
// All five values live in one struct behind one lock, so a reader can never
// pair a sum with a count from a different update. The lock is held only for
// the arithmetic or the copy, never across I/O. An update that would push
// the sum past f64 range is refused and leaves the state untouched.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AggregationError {
    #[error("price {price} would overflow the running sum {total_sum}")]
    SumOverflow { price: f64, total_sum: f64 },
}

#[derive(Debug, Default)]
struct AggregationState {
    total_orders: u64,
    total_sum: f64,
    running_average: f64,
    min_price: Option<f64>,
    max_price: Option<f64>,
}

impl AggregationState {
    fn apply(&mut self, price: f64) -> Result<(), AggregationError> {
        let total_sum = self.total_sum + price;
        if !total_sum.is_finite() {
            return Err(AggregationError::SumOverflow {
                price,
                total_sum: self.total_sum,
            });
        }

        self.total_orders += 1;
        self.total_sum = total_sum;
        self.running_average = self.total_sum / self.total_orders as f64;
        self.min_price = Some(self.min_price.map_or(price, |min| min.min(price)));
        self.max_price = Some(self.max_price.map_or(price, |max| max.max(price)));
        Ok(())
    }

    fn snapshot(&self) -> AggregationStats {
        AggregationStats {
            running_average: self.running_average,
            total_orders: self.total_orders,
            min_price: self.min_price.unwrap_or(0.0),
            max_price: self.max_price.unwrap_or(0.0),
            total_sum: self.total_sum,
        }
    }
}

/// Immutable snapshot of the aggregation state.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AggregationStats {
    pub running_average: f64,
    pub total_orders: u64,
    pub min_price: f64,
    pub max_price: f64,
    pub total_sum: f64,
}

#[derive(Debug, Default)]
pub struct PriceAnalytics {
    state: Mutex<AggregationState>,
}

impl PriceAnalytics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one price into the running statistics and return the snapshot
    /// produced by exactly this update.
    pub fn add_price(&self, price: f64) -> Result<AggregationStats, AggregationError> {
        let stats = {
            let mut state = self.state.lock();
            state.apply(price)?;
            state.snapshot()
        };

        tracing::info!(
            price,
            average = stats.running_average,
            count = stats.total_orders,
            min = stats.min_price,
            max = stats.max_price,
            "Price update"
        );

        Ok(stats)
    }

    pub fn stats(&self) -> AggregationStats {
        self.state.lock().snapshot()
    }

    pub fn reset(&self) {
        *self.state.lock() = AggregationState::default();
        tracing::info!("Price analytics statistics have been reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_empty_stats_read_as_zero() {
        let analytics = PriceAnalytics::new();
        let stats = analytics.stats();

        assert_eq!(stats.total_orders, 0);
        assert_eq!(stats.total_sum, 0.0);
        assert_eq!(stats.running_average, 0.0);
        assert_eq!(stats.min_price, 0.0);
        assert_eq!(stats.max_price, 0.0);
    }

    #[test]
    fn test_price_sequence() {
        let analytics = PriceAnalytics::new();
        analytics.add_price(10.0).unwrap();
        analytics.add_price(20.0).unwrap();
        analytics.add_price(5.0).unwrap();

        let stats = analytics.stats();
        assert_eq!(stats.total_orders, 3);
        assert_eq!(stats.total_sum, 35.0);
        assert!((stats.running_average - 11.666_666).abs() < 1e-4);
        assert_eq!(stats.min_price, 5.0);
        assert_eq!(stats.max_price, 20.0);
    }

    #[test]
    fn test_add_price_returns_its_own_snapshot() {
        let analytics = PriceAnalytics::new();
        analytics.add_price(4.0).unwrap();
        let stats = analytics.add_price(8.0).unwrap();

        assert_eq!(stats.total_orders, 2);
        assert_eq!(stats.total_sum, 12.0);
        assert_eq!(stats.running_average, 6.0);
    }

    #[test]
    fn test_single_price_is_both_min_and_max() {
        let analytics = PriceAnalytics::new();
        let stats = analytics.add_price(0.01).unwrap();

        assert_eq!(stats.min_price, 0.01);
        assert_eq!(stats.max_price, 0.01);
    }

    #[test]
    fn test_reset_returns_to_empty_state() {
        let analytics = PriceAnalytics::new();
        analytics.add_price(42.0).unwrap();
        analytics.add_price(7.0).unwrap();
        analytics.reset();

        let stats = analytics.stats();
        assert_eq!(
            stats,
            AggregationStats {
                running_average: 0.0,
                total_orders: 0,
                min_price: 0.0,
                max_price: 0.0,
                total_sum: 0.0,
            }
        );

        // Extremes restart from scratch after a reset
        let stats = analytics.add_price(100.0).unwrap();
        assert_eq!(stats.min_price, 100.0);
        assert_eq!(stats.max_price, 100.0);
    }

    #[test]
    fn test_concurrent_updates_match_sequential_computation() {
        let analytics = Arc::new(PriceAnalytics::new());
        let threads = 8;
        let per_thread = 500;

        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let analytics = analytics.clone();
                std::thread::spawn(move || {
                    for i in 0..per_thread {
                        // Whole numbers keep the float sum exact in any order
                        analytics.add_price((t * per_thread + i + 1) as f64).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let prices: Vec<f64> = (1..=threads * per_thread).map(|p| p as f64).collect();
        let expected_sum: f64 = prices.iter().sum();

        let stats = analytics.stats();
        assert_eq!(stats.total_orders, prices.len() as u64);
        assert_eq!(stats.total_sum, expected_sum);
        assert_eq!(stats.min_price, 1.0);
        assert_eq!(stats.max_price, (threads * per_thread) as f64);
        assert_eq!(stats.running_average, expected_sum / prices.len() as f64);
    }

    #[test]
    fn test_overflowing_price_is_refused_without_touching_state() {
        let analytics = PriceAnalytics::new();
        analytics.add_price(1e308).unwrap();

        let err = analytics.add_price(1e308).unwrap_err();
        assert!(matches!(err, AggregationError::SumOverflow { .. }));

        let stats = analytics.stats();
        assert_eq!(stats.total_orders, 1);
        assert_eq!(stats.total_sum, 1e308);
        assert!(stats.running_average.is_finite());

        // Still usable afterwards
        let stats = analytics.add_price(1.0).unwrap();
        assert_eq!(stats.total_orders, 2);
    }

    #[test]
    fn test_stats_serialize_camel_case() {
        let analytics = PriceAnalytics::new();
        analytics.add_price(2.5).unwrap();

        let json = serde_json::to_value(analytics.stats()).unwrap();
        assert_eq!(json["totalOrders"], 1);
        assert_eq!(json["runningAverage"], 2.5);
        assert_eq!(json["minPrice"], 2.5);
    }
}
