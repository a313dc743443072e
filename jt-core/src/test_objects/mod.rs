use crate::catalog::Catalog;
use crate::planner::Planner;
use crate::price_index::PriceIndex;
use jt_domain::{
    Amenity, Item, ItemId, PadSize, PlanError, PlannerConfig, PriceEntry, Ship, ShipId, Station,
    StationId, SupplyLevel, System, SystemId,
};
use jt_store::{InMemoryCatalogBmc, InMemoryPriceBmc, InMemoryPrices, StationPrices};

/// Builder for small hand-made universes used across the test modules.
#[derive(Debug, Default)]
pub struct TestUniverse {
    systems: Vec<System>,
    stations: Vec<Station>,
    items: Vec<Item>,
    ships: Vec<Ship>,
    selling: StationPrices,
    buying: StationPrices,
}

impl TestUniverse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_system(&mut self, name: &str, pos: [f64; 3]) -> SystemId {
        let id = SystemId(self.systems.len() as i64 + 1);
        self.systems.push(System {
            id,
            name: name.to_string(),
            pos,
            station_ids: Vec::new(),
        });
        id
    }

    pub fn add_station(&mut self, system: SystemId, name: &str) -> StationId {
        let id = StationId(self.stations.len() as i64 + 1);
        let system_name = self
            .systems
            .iter()
            .find(|s| s.id == system)
            .map(|s| s.name.clone())
            .unwrap_or_default();
        self.stations.push(Station {
            id,
            system_id: system,
            system_name,
            name: name.to_string(),
            ls_from_star: 0.0,
            black_market: Amenity::Unknown,
            max_pad_size: PadSize::Unknown,
            shipyard: Amenity::Unknown,
            outfitting: Amenity::Unknown,
            refuel: Amenity::Unknown,
            item_count: 0,
        });
        id
    }

    fn station_mut(&mut self, id: StationId) -> &mut Station {
        self.stations
            .iter_mut()
            .find(|s| s.id == id)
            .expect("known station")
    }

    pub fn set_pad_size(&mut self, station: StationId, pad: PadSize) {
        self.station_mut(station).max_pad_size = pad;
    }

    pub fn set_ls_from_star(&mut self, station: StationId, ls: f64) {
        self.station_mut(station).ls_from_star = ls;
    }

    pub fn set_black_market(&mut self, station: StationId, flag: Amenity) {
        self.station_mut(station).black_market = flag;
    }

    pub fn add_item(&mut self, name: &str) -> ItemId {
        let id = ItemId(self.items.len() as i64 + 1);
        self.items.push(Item {
            id,
            name: name.to_string(),
            category: "Test".to_string(),
        });
        id
    }

    pub fn add_ship(&mut self, name: &str, capacity: u32, max_ly_full: f64) -> ShipId {
        let id = ShipId(self.ships.len() as i64 + 1);
        self.ships.push(Ship {
            id,
            name: name.to_string(),
            capacity,
            max_ly_full,
            max_ly_empty: max_ly_full * 1.2,
        });
        id
    }

    pub fn sells(&mut self, station: StationId, item: ItemId, price_cr: i64, units: i64) {
        self.selling.entry(station).or_default().push(PriceEntry {
            item_id: item,
            price_cr,
            units,
            level: SupplyLevel::Med,
            age_s: 600,
        });
    }

    pub fn buys(&mut self, station: StationId, item: ItemId, price_cr: i64, units: i64) {
        self.buying.entry(station).or_default().push(PriceEntry {
            item_id: item,
            price_cr,
            units,
            level: SupplyLevel::Med,
            age_s: 600,
        });
    }

    /// Overrides the data age of every price entry at a station.
    pub fn set_price_age(&mut self, station: StationId, age_s: i64) {
        for prices in [&mut self.selling, &mut self.buying] {
            if let Some(entries) = prices.get_mut(&station) {
                for entry in entries {
                    entry.age_s = age_s;
                }
            }
        }
    }

    fn stations_with_counts(&self) -> Vec<Station> {
        let mut stations = self.stations.clone();
        for station in &mut stations {
            let sell_count = self.selling.get(&station.id).map(Vec::len).unwrap_or(0);
            let buy_count = self.buying.get(&station.id).map(Vec::len).unwrap_or(0);
            station.item_count = (sell_count + buy_count) as u32;
        }
        stations
    }

    pub fn catalog(&self) -> Catalog {
        Catalog::from_parts(
            self.systems.clone(),
            self.stations_with_counts(),
            self.items.clone(),
            self.ships.clone(),
        )
    }

    pub fn price_index(&self) -> PriceIndex {
        PriceIndex::from_parts(self.selling.clone(), self.buying.clone())
    }

    pub fn catalog_bmc(&self) -> InMemoryCatalogBmc {
        InMemoryCatalogBmc::new(
            self.systems.clone(),
            self.stations_with_counts(),
            self.items.clone(),
            self.ships.clone(),
        )
    }

    pub fn price_bmc(&self) -> InMemoryPriceBmc {
        InMemoryPriceBmc::new(InMemoryPrices {
            selling: self.selling.clone(),
            buying: self.buying.clone(),
        })
    }

    pub fn planner(&self, config: &PlannerConfig) -> Result<Planner, PlanError> {
        Planner::from_parts(self.catalog(), self.price_index(), config)
    }
}
