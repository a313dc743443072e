use anyhow::Result;
use jt_domain::{ItemId, PriceEntry, StationId};
use jt_store::{PriceBmcTrait, PriceFilter, StationPrices};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Per-station selling and buying lists, kept sorted by item id so a pair of
/// stations can be joined with a single merge scan.
#[derive(Debug, Default)]
pub struct PriceIndex {
    selling: StationPrices,
    buying: StationPrices,
    newest_age: HashMap<StationId, i64>,
}

impl PriceIndex {
    pub async fn load(bmc: &dyn PriceBmcTrait, filter: &PriceFilter) -> Result<PriceIndex> {
        let selling = bmc.load_selling(filter).await?;
        let buying = bmc.load_buying(filter).await?;
        Ok(Self::from_parts(selling, buying))
    }

    pub fn from_parts(mut selling: StationPrices, mut buying: StationPrices) -> PriceIndex {
        for entries in selling.values_mut().chain(buying.values_mut()) {
            entries.sort_by_key(|entry| entry.item_id);
        }
        let mut index = PriceIndex {
            selling,
            buying,
            newest_age: HashMap::new(),
        };
        index.rebuild_ages();
        debug!(
            "price index: {} selling stations, {} buying stations",
            index.selling.len(),
            index.buying.len()
        );
        index
    }

    fn rebuild_ages(&mut self) {
        let mut newest_age: HashMap<StationId, i64> = HashMap::new();
        for (station, entries) in self.selling.iter().chain(self.buying.iter()) {
            for entry in entries {
                newest_age
                    .entry(*station)
                    .and_modify(|age| *age = (*age).min(entry.age_s))
                    .or_insert(entry.age_s);
            }
        }
        self.newest_age = newest_age;
    }

    pub fn selling(&self, station: StationId) -> Option<&[PriceEntry]> {
        self.selling.get(&station).map(Vec::as_slice)
    }

    pub fn buying(&self, station: StationId) -> Option<&[PriceEntry]> {
        self.buying.get(&station).map(Vec::as_slice)
    }

    pub fn has_selling(&self, station: StationId) -> bool {
        self.selling.get(&station).map(|e| !e.is_empty()).unwrap_or(false)
    }

    /// Age of the freshest price datum the station has, if any.
    pub fn newest_age_s(&self, station: StationId) -> Option<i64> {
        self.newest_age.get(&station).copied()
    }

    /// Drops entries for the given items; mirrors the load-time avoid filter
    /// for indices built from fixtures.
    pub fn remove_items(&mut self, avoid: &HashSet<ItemId>) {
        if avoid.is_empty() {
            return;
        }
        for prices in [&mut self.selling, &mut self.buying] {
            for entries in prices.values_mut() {
                entries.retain(|entry| !avoid.contains(&entry.item_id));
            }
            prices.retain(|_, entries| !entries.is_empty());
        }
        self.rebuild_ages();
    }

    /// Drops entries older than the cutoff; mirrors the load-time age filter.
    pub fn remove_older_than(&mut self, max_age_s: i64) {
        for prices in [&mut self.selling, &mut self.buying] {
            for entries in prices.values_mut() {
                entries.retain(|entry| entry.age_s <= max_age_s);
            }
            prices.retain(|_, entries| !entries.is_empty());
        }
        self.rebuild_ages();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jt_domain::SupplyLevel;

    fn entry(item: i64, price: i64, age_s: i64) -> PriceEntry {
        PriceEntry {
            item_id: ItemId(item),
            price_cr: price,
            units: -1,
            level: SupplyLevel::Unknown,
            age_s,
        }
    }

    #[test]
    fn entries_are_sorted_for_merging() {
        let index = PriceIndex::from_parts(
            HashMap::from([(StationId(1), vec![entry(3, 10, 60), entry(1, 20, 60), entry(2, 30, 60)])]),
            HashMap::new(),
        );
        let items: Vec<i64> = index
            .selling(StationId(1))
            .unwrap()
            .iter()
            .map(|e| e.item_id.0)
            .collect();
        assert_eq!(items, vec![1, 2, 3]);
    }

    #[test]
    fn newest_age_spans_both_sides() {
        let index = PriceIndex::from_parts(
            HashMap::from([(StationId(1), vec![entry(1, 10, 900)])]),
            HashMap::from([(StationId(1), vec![entry(2, 15, 300)]), (StationId(2), vec![entry(1, 25, 4000)])]),
        );
        assert_eq!(index.newest_age_s(StationId(1)), Some(300));
        assert_eq!(index.newest_age_s(StationId(2)), Some(4000));
        assert_eq!(index.newest_age_s(StationId(3)), None);
    }

    #[test]
    fn removing_items_prunes_empty_stations() {
        let mut index = PriceIndex::from_parts(
            HashMap::from([(StationId(1), vec![entry(1, 10, 60)]), (StationId(2), vec![entry(1, 10, 60), entry(2, 5, 60)])]),
            HashMap::new(),
        );
        index.remove_items(&HashSet::from([ItemId(1)]));
        assert!(!index.has_selling(StationId(1)));
        assert_eq!(index.selling(StationId(2)).unwrap().len(), 1);
        assert_eq!(index.newest_age_s(StationId(1)), None);
    }

    #[test]
    fn age_cutoff_drops_stale_entries() {
        let mut index = PriceIndex::from_parts(
            HashMap::from([(StationId(1), vec![entry(1, 10, 100), entry(2, 10, 100_000)])]),
            HashMap::new(),
        );
        index.remove_older_than(86_400);
        assert_eq!(index.selling(StationId(1)).unwrap().len(), 1);
    }
}
