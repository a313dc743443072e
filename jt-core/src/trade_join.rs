use crate::catalog::Catalog;
use crate::price_index::PriceIndex;
use jt_domain::{PriceEntry, StationId, Trade};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// Gain-per-ton bounds a trade must satisfy.
#[derive(Debug, Clone)]
pub struct ProfitBounds {
    pub min_gain_per_ton: i64,
    pub max_gain_per_ton: Option<i64>,
}

impl Default for ProfitBounds {
    fn default() -> Self {
        ProfitBounds {
            min_gain_per_ton: 1,
            max_gain_per_ton: None,
        }
    }
}

/// Merge-joins a station's sellings against another's buyings and keeps the
/// items worth shipping, best gain first, cheaper item breaking ties.
pub fn profitable_trades(
    catalog: &Catalog,
    src_selling: &[PriceEntry],
    dst_buying: &[PriceEntry],
    bounds: &ProfitBounds,
) -> Vec<Trade> {
    let max_gain = bounds.max_gain_per_ton.unwrap_or(i64::MAX);
    let mut trades = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < src_selling.len() && j < dst_buying.len() {
        let sell = &src_selling[i];
        let buy = &dst_buying[j];
        match sell.item_id.cmp(&buy.item_id) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                // price 0 marks an n/a listing on either side
                if sell.price_cr > 0 && buy.price_cr > 0 {
                    let gain_cr = buy.price_cr - sell.price_cr;
                    if gain_cr >= bounds.min_gain_per_ton && gain_cr <= max_gain {
                        if let Some(item) = catalog.item(sell.item_id) {
                            trades.push(Trade {
                                item: item.clone(),
                                cost_cr: sell.price_cr,
                                gain_cr,
                                src_units: sell.units,
                                src_level: sell.level,
                                dst_units: buy.units,
                                dst_level: buy.level,
                                src_age_s: sell.age_s,
                                dst_age_s: buy.age_s,
                            });
                        }
                    }
                }
                i += 1;
                j += 1;
            }
        }
    }
    trades.sort_by(|a, b| b.gain_cr.cmp(&a.gain_cr).then(a.cost_cr.cmp(&b.cost_cr)));
    trades
}

/// Memoized join results, owned by the planner so station values stay
/// immutable. `None` records a pair already known to have nothing to trade.
#[derive(Debug, Default)]
pub struct TradeCache {
    trading_with: HashMap<(StationId, StationId), Option<Arc<Vec<Trade>>>>,
}

impl TradeCache {
    pub fn trades_between(
        &mut self,
        src: StationId,
        dst: StationId,
        catalog: &Catalog,
        prices: &PriceIndex,
        bounds: &ProfitBounds,
    ) -> Option<Arc<Vec<Trade>>> {
        if let Some(cached) = self.trading_with.get(&(src, dst)) {
            return cached.clone();
        }
        let computed = match (prices.selling(src), prices.buying(dst)) {
            (Some(selling), Some(buying)) => {
                let trades = profitable_trades(catalog, selling, buying, bounds);
                trace!("join {} -> {}: {} profitable items", src, dst, trades.len());
                if trades.is_empty() {
                    None
                } else {
                    Some(Arc::new(trades))
                }
            }
            _ => None,
        };
        self.trading_with.insert((src, dst), computed.clone());
        computed
    }

    pub fn len(&self) -> usize {
        self.trading_with.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trading_with.is_empty()
    }
}
