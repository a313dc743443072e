use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use strum::Display;

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct SystemId(pub i64);

impl Display for SystemId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct StationId(pub i64);

impl Display for StationId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct ItemId(pub i64);

impl Display for ItemId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct ShipId(pub i64);

impl Display for ShipId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A star system with its 3D galactic position in light years.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct System {
    pub id: SystemId,
    pub name: String,
    pub pos: [f64; 3],
    pub station_ids: Vec<StationId>,
}

impl System {
    pub fn distance_to(&self, other: &System) -> f64 {
        let dx = self.pos[0] - other.pos[0];
        let dy = self.pos[1] - other.pos[1];
        let dz = self.pos[2] - other.pos[2];
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Yes/no/unknown flag for station amenities (black market, shipyard, ...).
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Amenity {
    Yes,
    No,
    #[default]
    Unknown,
}

impl Amenity {
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "Y" | "y" => Amenity::Yes,
            "N" | "n" => Amenity::No,
            _ => Amenity::Unknown,
        }
    }

    pub fn code(&self) -> char {
        match self {
            Amenity::Yes => 'Y',
            Amenity::No => 'N',
            Amenity::Unknown => '?',
        }
    }
}

/// Largest landing pad a station offers. `Unknown` passes every pad filter.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display)]
pub enum PadSize {
    Small,
    Medium,
    Large,
    #[default]
    Unknown,
}

impl PadSize {
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "S" | "s" => PadSize::Small,
            "M" | "m" => PadSize::Medium,
            "L" | "l" => PadSize::Large,
            _ => PadSize::Unknown,
        }
    }

    pub fn code(&self) -> char {
        match self {
            PadSize::Small => 'S',
            PadSize::Medium => 'M',
            PadSize::Large => 'L',
            PadSize::Unknown => '?',
        }
    }

    fn rank(&self) -> u8 {
        match self {
            PadSize::Small => 1,
            PadSize::Medium => 2,
            PadSize::Large => 3,
            PadSize::Unknown => 0,
        }
    }

    /// Whether a station with this pad size can take a ship needing `required`.
    /// Unknown pad data never filters a station out.
    pub fn accommodates(&self, required: PadSize) -> bool {
        match (self, required) {
            (PadSize::Unknown, _) | (_, PadSize::Unknown) => true,
            (pad, req) => pad.rank() >= req.rank(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Station {
    pub id: StationId,
    pub system_id: SystemId,
    pub system_name: String,
    pub name: String,
    /// Supercruise distance from the star in light seconds; 0 = unknown.
    pub ls_from_star: f64,
    pub black_market: Amenity,
    pub max_pad_size: PadSize,
    pub shipyard: Amenity,
    pub outfitting: Amenity,
    pub refuel: Amenity,
    pub item_count: u32,
}

impl Station {
    /// "System/Station" qualified name.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.system_name, self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ship {
    pub id: ShipId,
    pub name: String,
    pub capacity: u32,
    pub max_ly_full: f64,
    pub max_ly_empty: f64,
}

/// Coarse supply/demand bracket attached to a price entry.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display)]
pub enum SupplyLevel {
    #[default]
    Unknown,
    None,
    Low,
    Med,
    High,
}

impl SupplyLevel {
    pub fn from_db(value: i64) -> Self {
        match value {
            0 => SupplyLevel::None,
            1 => SupplyLevel::Low,
            2 => SupplyLevel::Med,
            3 => SupplyLevel::High,
            _ => SupplyLevel::Unknown,
        }
    }
}

/// One selling or buying line at a station. `units == -1` means unknown stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceEntry {
    pub item_id: ItemId,
    pub price_cr: i64,
    pub units: i64,
    pub level: SupplyLevel,
    pub age_s: i64,
}

/// A profitable src → dst exchange for a single item.
#[derive(Debug, Clone)]
pub struct Trade {
    pub item: Arc<Item>,
    /// Purchase price per ton at the source station.
    pub cost_cr: i64,
    /// Sale price minus purchase price, per ton. Always positive.
    pub gain_cr: i64,
    pub src_units: i64,
    pub src_level: SupplyLevel,
    pub dst_units: i64,
    pub dst_level: SupplyLevel,
    pub src_age_s: i64,
    pub dst_age_s: i64,
}

impl Trade {
    pub fn name(&self) -> &str {
        &self.item.name
    }
}

/// Manifest of items bought for one hop.
#[derive(Debug, Clone, Default)]
pub struct TradeLoad {
    pub items: Vec<(Trade, u32)>,
    pub gain_cr: i64,
    pub cost_cr: i64,
    pub units: u32,
}

impl TradeLoad {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.units == 0
    }

    pub fn single(trade: Trade, qty: u32) -> Self {
        let gain_cr = trade.gain_cr * qty as i64;
        let cost_cr = trade.cost_cr * qty as i64;
        TradeLoad {
            items: vec![(trade, qty)],
            gain_cr,
            cost_cr,
            units: qty,
        }
    }

    pub fn merged_with(mut self, other: TradeLoad) -> Self {
        self.items.extend(other.items);
        self.gain_cr += other.gain_cr;
        self.cost_cr += other.cost_cr;
        self.units += other.units;
        self
    }
}

// Loads are ranked by gain, then by units carried, then by cheaper outlay.
impl PartialEq for TradeLoad {
    fn eq(&self, other: &Self) -> bool {
        self.gain_cr == other.gain_cr && self.units == other.units && self.cost_cr == other.cost_cr
    }
}

impl Eq for TradeLoad {}

impl PartialOrd for TradeLoad {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TradeLoad {
    fn cmp(&self, other: &Self) -> Ordering {
        self.gain_cr
            .cmp(&other.gain_cr)
            .then(self.units.cmp(&other.units))
            .then(other.cost_cr.cmp(&self.cost_cr))
    }
}

/// A reachable station together with the system path that leads to it.
#[derive(Debug, Clone)]
pub struct Destination {
    pub system: Arc<System>,
    pub station: Arc<Station>,
    /// Systems traversed from the source to the destination, inclusive.
    pub via: Vec<Arc<System>>,
    pub dist_ly: f64,
}

/// Either kind of place a caller can name in avoid/via/goal options.
#[derive(Debug, Clone)]
pub enum Place {
    System(Arc<System>),
    Station(Arc<Station>),
}

impl Place {
    pub fn name(&self) -> &str {
        match self {
            Place::System(system) => &system.name,
            Place::Station(station) => &station.name,
        }
    }
}

/// A sequence of hops: load cargo, jump through 0+ systems, dock and sell.
#[derive(Debug, Clone)]
pub struct Route {
    pub stations: Vec<Arc<Station>>,
    pub hops: Vec<(TradeLoad, i64)>,
    /// Per hop, the systems traversed from source to destination inclusive.
    pub jumps: Vec<Vec<Arc<System>>>,
    pub start_cr: i64,
    pub gain_cr: i64,
    pub score: f64,
}

impl Route {
    pub fn seed(origin: Arc<Station>, start_cr: i64) -> Self {
        Route {
            stations: vec![origin],
            hops: Vec::new(),
            jumps: Vec::new(),
            start_cr,
            gain_cr: 0,
            score: 0.0,
        }
    }

    pub fn first_station(&self) -> &Arc<Station> {
        &self.stations[0]
    }

    pub fn last_station(&self) -> &Arc<Station> {
        self.stations.last().expect("route has at least one station")
    }

    /// System the i-th station of the route lies in, reconstructed from the
    /// jump paths. Unknown for a route that has not been extended yet.
    pub fn system_at(&self, i: usize) -> Option<&Arc<System>> {
        if i == 0 {
            self.jumps.first().and_then(|path| path.first())
        } else {
            self.jumps.get(i - 1).and_then(|path| path.last())
        }
    }

    /// Total system-to-system jumps; in-system hops contribute none.
    pub fn num_jumps(&self) -> usize {
        self.jumps.iter().map(|path| path.len().saturating_sub(1)).sum()
    }

    /// A new route extended by one hop.
    pub fn plus(&self, dst: Arc<Station>, hop: (TradeLoad, i64), jumps: Vec<Arc<System>>, score: f64) -> Route {
        let mut stations = self.stations.clone();
        stations.push(dst);
        let mut hops = self.hops.clone();
        let hop_gain = hop.1;
        hops.push(hop);
        let mut all_jumps = self.jumps.clone();
        all_jumps.push(jumps);
        Route {
            stations,
            hops,
            jumps: all_jumps,
            start_cr: self.start_cr,
            gain_cr: self.gain_cr + hop_gain,
            score: self.score + score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str) -> Arc<Item> {
        Arc::new(Item {
            id: ItemId(1),
            name: name.to_string(),
            category: "Foods".to_string(),
        })
    }

    fn trade(gain_cr: i64, cost_cr: i64) -> Trade {
        Trade {
            item: item("Algae"),
            cost_cr,
            gain_cr,
            src_units: -1,
            src_level: SupplyLevel::Unknown,
            dst_units: -1,
            dst_level: SupplyLevel::Unknown,
            src_age_s: 0,
            dst_age_s: 0,
        }
    }

    #[test]
    fn distance_is_symmetric() {
        let a = System {
            id: SystemId(1),
            name: "Eranin".into(),
            pos: [1.0, 2.0, 3.0],
            station_ids: vec![],
        };
        let b = System {
            id: SystemId(2),
            name: "Asellus".into(),
            pos: [4.0, 6.0, 3.0],
            station_ids: vec![],
        };
        assert_eq!(a.distance_to(&b), b.distance_to(&a));
        assert_eq!(a.distance_to(&b), 5.0);
    }

    #[test]
    fn pad_size_accommodates() {
        assert!(PadSize::Large.accommodates(PadSize::Medium));
        assert!(PadSize::Medium.accommodates(PadSize::Medium));
        assert!(!PadSize::Small.accommodates(PadSize::Large));
        assert!(PadSize::Unknown.accommodates(PadSize::Large));
        assert!(PadSize::Small.accommodates(PadSize::Unknown));
    }

    #[test]
    fn load_ordering_prefers_gain_then_units_then_cheapness() {
        let richer = TradeLoad::single(trade(50, 100), 4);
        let poorer = TradeLoad::single(trade(40, 100), 4);
        assert!(richer > poorer);

        let more_units = TradeLoad::single(trade(25, 100), 4);
        let fewer_units = TradeLoad::single(trade(50, 100), 2);
        assert_eq!(more_units.gain_cr, fewer_units.gain_cr);
        assert!(more_units > fewer_units);

        let cheap = TradeLoad::single(trade(50, 100), 4);
        let dear = TradeLoad::single(trade(50, 200), 4);
        assert!(cheap > dear);
    }

    #[test]
    fn route_plus_accumulates_gain_and_score() {
        let station_a = Arc::new(Station {
            id: StationId(1),
            system_id: SystemId(1),
            system_name: "Eranin".into(),
            name: "Azeban City".into(),
            ls_from_star: 295.0,
            black_market: Amenity::Yes,
            max_pad_size: PadSize::Medium,
            shipyard: Amenity::Unknown,
            outfitting: Amenity::Unknown,
            refuel: Amenity::Yes,
            item_count: 5,
        });
        let station_b = Arc::new(Station {
            id: StationId(2),
            system_id: SystemId(2),
            system_name: "Asellus".into(),
            name: "Beagle 2".into(),
            ls_from_star: 0.0,
            black_market: Amenity::No,
            max_pad_size: PadSize::Large,
            shipyard: Amenity::Unknown,
            outfitting: Amenity::Unknown,
            refuel: Amenity::Unknown,
            item_count: 3,
        });
        let sys_a = Arc::new(System {
            id: SystemId(1),
            name: "Eranin".into(),
            pos: [0.0; 3],
            station_ids: vec![StationId(1)],
        });
        let sys_b = Arc::new(System {
            id: SystemId(2),
            name: "Asellus".into(),
            pos: [4.0, 0.0, 0.0],
            station_ids: vec![StationId(2)],
        });

        let load = TradeLoad::single(trade(100, 30), 4);
        let gain = load.gain_cr;
        let route = Route::seed(station_a, 10_000).plus(station_b, (load, gain), vec![sys_a, sys_b], 400.0);

        assert_eq!(route.gain_cr, 400);
        assert_eq!(route.score, 400.0);
        assert_eq!(route.stations.len(), 2);
        assert_eq!(route.hops.len(), 1);
        assert_eq!(route.jumps.len(), 1);
        assert_eq!(route.num_jumps(), 1);
        assert_eq!(route.system_at(0).unwrap().name, "Eranin");
        assert_eq!(route.system_at(1).unwrap().name, "Asellus");
    }
}
