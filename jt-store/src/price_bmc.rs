use crate::DbModelManager;
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use jt_domain::{ItemId, PlanError, PriceEntry, StationId, SupplyLevel};
use mockall::automock;
use sqlx::FromRow;
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Row filters applied while loading price data.
#[derive(Debug, Clone, Default)]
pub struct PriceFilter {
    /// Items that must not appear in any trade.
    pub avoid_item_ids: HashSet<ItemId>,
    /// Drop rows whose `modified` timestamp is older than this many days.
    pub max_age_days: Option<f64>,
}

impl PriceFilter {
    fn admits(&self, entry: &PriceEntry) -> bool {
        if self.avoid_item_ids.contains(&entry.item_id) {
            return false;
        }
        match self.max_age_days {
            Some(days) => (entry.age_s as f64) <= days * 86_400.0,
            None => true,
        }
    }
}

/// Price lists per station, each list sorted by item id.
pub type StationPrices = HashMap<StationId, Vec<PriceEntry>>;

#[automock]
#[async_trait]
pub trait PriceBmcTrait: Send + Sync + Debug {
    /// What each station offers to sell to the player.
    async fn load_selling(&self, filter: &PriceFilter) -> Result<StationPrices>;
    /// What each station pays the player for.
    async fn load_buying(&self, filter: &PriceFilter) -> Result<StationPrices>;
}

#[derive(Debug)]
pub struct DbPriceBmc {
    pub mm: DbModelManager,
}

#[derive(Debug, FromRow)]
struct DbPriceRow {
    station_id: i64,
    item_id: i64,
    price: i64,
    units: i64,
    level: i64,
    epoch: Option<String>,
}

impl DbPriceBmc {
    async fn load_table(&self, table: &'static str, filter: &PriceFilter) -> Result<StationPrices> {
        let mut sql = format!(
            r#"
select station_id, item_id, price, units, level
     , cast(strftime('%s', modified) as text) as epoch
  from {table}
        "#
        );
        if filter.max_age_days.is_some() {
            sql.push_str(" where modified >= datetime('now', ?)");
        }
        sql.push_str(" order by station_id, item_id");

        let mut query = sqlx::query_as::<_, DbPriceRow>(&sql);
        if let Some(days) = filter.max_age_days {
            query = query.bind(format!("-{} days", days));
        }
        let rows = query.fetch_all(self.mm.pool()).await?;

        let now = Utc::now().timestamp();
        let mut prices: StationPrices = HashMap::new();
        let mut count = 0usize;
        for row in rows {
            let station = StationId(row.station_id);
            let item = ItemId(row.item_id);
            if filter.avoid_item_ids.contains(&item) {
                continue;
            }
            let epoch = row
                .epoch
                .as_deref()
                .and_then(|epoch| epoch.parse::<i64>().ok())
                .ok_or(PlanError::BadTimestamp { table, station, item })?;
            prices.entry(station).or_default().push(PriceEntry {
                item_id: item,
                price_cr: row.price,
                units: row.units,
                level: SupplyLevel::from_db(row.level),
                age_s: now - epoch,
            });
            count += 1;
        }
        debug!("loaded {} {} values for {} stations", count, table, prices.len());
        Ok(prices)
    }
}

#[async_trait]
impl PriceBmcTrait for DbPriceBmc {
    async fn load_selling(&self, filter: &PriceFilter) -> Result<StationPrices> {
        self.load_table("StationSelling", filter).await
    }

    async fn load_buying(&self, filter: &PriceFilter) -> Result<StationPrices> {
        self.load_table("StationBuying", filter).await
    }
}

#[derive(Debug, Default)]
pub struct InMemoryPrices {
    pub selling: StationPrices,
    pub buying: StationPrices,
}

/// Fixture-backed price source; applies the same filters as the Db variant.
#[derive(Debug, Default)]
pub struct InMemoryPriceBmc {
    prices: Arc<RwLock<InMemoryPrices>>,
}

impl InMemoryPriceBmc {
    pub fn new(prices: InMemoryPrices) -> Self {
        Self {
            prices: Arc::new(RwLock::new(prices)),
        }
    }

    fn apply_filter(prices: &StationPrices, filter: &PriceFilter) -> StationPrices {
        prices
            .iter()
            .map(|(station, entries)| {
                let mut kept: Vec<PriceEntry> = entries
                    .iter()
                    .filter(|entry| filter.admits(entry))
                    .cloned()
                    .collect();
                kept.sort_by_key(|entry| entry.item_id);
                (*station, kept)
            })
            .filter(|(_, entries)| !entries.is_empty())
            .collect()
    }
}

#[async_trait]
impl PriceBmcTrait for InMemoryPriceBmc {
    async fn load_selling(&self, filter: &PriceFilter) -> Result<StationPrices> {
        Ok(Self::apply_filter(&self.prices.read().await.selling, filter))
    }

    async fn load_buying(&self, filter: &PriceFilter) -> Result<StationPrices> {
        Ok(Self::apply_filter(&self.prices.read().await.buying, filter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::in_memory_pool;

    async fn fixture_manager() -> DbModelManager {
        let pool = in_memory_pool().await;

        for table in ["StationSelling", "StationBuying"] {
            sqlx::query(&format!(
                r#"
create table {table} (
    station_id integer not null,
    item_id integer not null,
    price integer not null,
    units integer not null default -1,
    level integer not null default -1,
    modified datetime not null
)
            "#
            ))
            .execute(&pool)
            .await
            .expect("create price table");
        }

        sqlx::query(
            r#"
insert into StationSelling values
    (1, 1, 100, 50, 3, datetime('now', '-10 minutes')),
    (1, 2, 9000, -1, -1, datetime('now', '-5 days')),
    (2, 1, 90, 10, 2, datetime('now', '-30 minutes'))
        "#,
        )
        .execute(&pool)
        .await
        .expect("insert selling");

        sqlx::query(
            r#"
insert into StationBuying values
    (2, 1, 300, 40, 3, datetime('now', '-20 minutes')),
    (2, 2, 9500, -1, -1, datetime('now', '-6 days'))
        "#,
        )
        .execute(&pool)
        .await
        .expect("insert buying");

        DbModelManager::new(pool)
    }

    #[test_log::test(tokio::test)]
    async fn groups_rows_by_station_with_ages() -> Result<()> {
        let bmc = DbPriceBmc {
            mm: fixture_manager().await,
        };

        let selling = bmc.load_selling(&PriceFilter::default()).await?;
        assert_eq!(selling.len(), 2);
        let azeban = &selling[&StationId(1)];
        assert_eq!(azeban.len(), 2);
        assert_eq!(azeban[0].item_id, ItemId(1));
        assert_eq!(azeban[0].price_cr, 100);
        assert_eq!(azeban[0].units, 50);
        assert_eq!(azeban[0].level, SupplyLevel::High);
        assert!(azeban[0].age_s >= 10 * 60 && azeban[0].age_s < 15 * 60);
        assert_eq!(azeban[1].level, SupplyLevel::Unknown);

        let buying = bmc.load_buying(&PriceFilter::default()).await?;
        assert_eq!(buying.len(), 1);
        assert_eq!(buying[&StationId(2)].len(), 2);
        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn age_and_item_filters_trim_rows() -> Result<()> {
        let bmc = DbPriceBmc {
            mm: fixture_manager().await,
        };

        let fresh_only = bmc
            .load_selling(&PriceFilter {
                max_age_days: Some(1.0),
                ..PriceFilter::default()
            })
            .await?;
        assert_eq!(fresh_only[&StationId(1)].len(), 1);

        let no_gold = bmc
            .load_selling(&PriceFilter {
                avoid_item_ids: HashSet::from([ItemId(2)]),
                ..PriceFilter::default()
            })
            .await?;
        assert!(no_gold[&StationId(1)].iter().all(|entry| entry.item_id != ItemId(2)));
        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn unparseable_timestamp_is_fatal() -> Result<()> {
        let mm = fixture_manager().await;
        sqlx::query("insert into StationSelling values (3, 1, 70, -1, -1, 'not a datetime')")
            .execute(mm.pool())
            .await?;

        let bmc = DbPriceBmc { mm };
        let err = bmc.load_selling(&PriceFilter::default()).await.unwrap_err();
        match err.downcast_ref::<PlanError>() {
            Some(PlanError::BadTimestamp { table, station, item }) => {
                assert_eq!(*table, "StationSelling");
                assert_eq!(*station, StationId(3));
                assert_eq!(*item, ItemId(1));
            }
            other => panic!("expected BadTimestamp, got {:?}", other),
        }
        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn in_memory_variant_applies_filters() -> Result<()> {
        let entry = |item: i64, price: i64, age_s: i64| PriceEntry {
            item_id: ItemId(item),
            price_cr: price,
            units: -1,
            level: SupplyLevel::Unknown,
            age_s,
        };
        let bmc = InMemoryPriceBmc::new(InMemoryPrices {
            selling: HashMap::from([(StationId(1), vec![entry(2, 50, 600), entry(1, 100, 600), entry(3, 70, 260_000)])]),
            buying: HashMap::new(),
        });

        let selling = bmc
            .load_selling(&PriceFilter {
                avoid_item_ids: HashSet::from([ItemId(2)]),
                max_age_days: Some(2.0),
            })
            .await?;
        let entries = &selling[&StationId(1)];
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].item_id, ItemId(1));
        Ok(())
    }
}
