use anyhow::Result;
use itertools::Itertools;
use jt_domain::{Item, ItemId, Place, PlanError, Ship, Station, StationId, System, SystemId};
use jt_store::CatalogBmcTrait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Strips punctuation and case so "dom.App" matches "Dom. Appliances".
pub fn normalized(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// In-memory indices over the immutable game entities.
#[derive(Debug, Default)]
pub struct Catalog {
    systems: Vec<Arc<System>>,
    stations: Vec<Arc<Station>>,
    items: Vec<Arc<Item>>,
    ships: Vec<Arc<Ship>>,
    systems_by_id: HashMap<SystemId, Arc<System>>,
    stations_by_id: HashMap<StationId, Arc<Station>>,
    items_by_id: HashMap<ItemId, Arc<Item>>,
}

impl Catalog {
    pub async fn load(bmc: &dyn CatalogBmcTrait) -> Result<Catalog> {
        let systems = bmc.load_systems().await?;
        let stations = bmc.load_stations().await?;
        let items = bmc.load_items().await?;
        let ships = bmc.load_ships().await?;
        Ok(Self::from_parts(systems, stations, items, ships))
    }

    pub fn from_parts(mut systems: Vec<System>, stations: Vec<Station>, items: Vec<Item>, ships: Vec<Ship>) -> Catalog {
        let mut station_ids_by_system: HashMap<SystemId, Vec<StationId>> = stations
            .iter()
            .map(|station| (station.system_id, station.id))
            .into_group_map();
        for system in &mut systems {
            if let Some(ids) = station_ids_by_system.remove(&system.id) {
                system.station_ids = ids;
            }
        }

        let systems: Vec<Arc<System>> = systems.into_iter().map(Arc::new).collect();
        let stations: Vec<Arc<Station>> = stations.into_iter().map(Arc::new).collect();
        let items: Vec<Arc<Item>> = items.into_iter().map(Arc::new).collect();
        let ships: Vec<Arc<Ship>> = ships.into_iter().map(Arc::new).collect();

        debug!(
            "catalog: {} systems, {} stations, {} items, {} ships",
            systems.len(),
            stations.len(),
            items.len(),
            ships.len()
        );

        Catalog {
            systems_by_id: systems.iter().map(|s| (s.id, s.clone())).collect(),
            stations_by_id: stations.iter().map(|s| (s.id, s.clone())).collect(),
            items_by_id: items.iter().map(|i| (i.id, i.clone())).collect(),
            systems,
            stations,
            items,
            ships,
        }
    }

    pub fn systems(&self) -> &[Arc<System>] {
        &self.systems
    }

    pub fn stations(&self) -> &[Arc<Station>] {
        &self.stations
    }

    pub fn items(&self) -> &[Arc<Item>] {
        &self.items
    }

    pub fn ships(&self) -> &[Arc<Ship>] {
        &self.ships
    }

    pub fn system(&self, id: SystemId) -> Option<&Arc<System>> {
        self.systems_by_id.get(&id)
    }

    pub fn station(&self, id: StationId) -> Option<&Arc<Station>> {
        self.stations_by_id.get(&id)
    }

    pub fn item(&self, id: ItemId) -> Option<&Arc<Item>> {
        self.items_by_id.get(&id)
    }

    pub fn lookup_system(&self, name: &str) -> Result<Arc<System>, PlanError> {
        find_by_name(
            "system",
            name,
            self.systems.iter().map(|s| (s.name.clone(), s.clone())),
        )
    }

    /// Accepts a bare station name or a "System/Station" qualified one.
    pub fn lookup_station(&self, name: &str) -> Result<Arc<Station>, PlanError> {
        if name.contains('/') {
            find_by_name(
                "station",
                name,
                self.stations.iter().map(|s| (s.full_name(), s.clone())),
            )
        } else {
            find_by_name(
                "station",
                name,
                self.stations.iter().map(|s| (s.name.clone(), s.clone())),
            )
        }
    }

    pub fn lookup_item(&self, name: &str) -> Result<Arc<Item>, PlanError> {
        find_by_name(
            "item",
            name,
            self.items.iter().map(|i| (i.name.clone(), i.clone())),
        )
    }

    pub fn lookup_ship(&self, name: &str) -> Result<Arc<Ship>, PlanError> {
        find_by_name(
            "ship",
            name,
            self.ships.iter().map(|s| (s.name.clone(), s.clone())),
        )
    }

    /// Resolves a name that may denote either a system or a station. A name
    /// matching both resolves to the system when the station lies inside it,
    /// and is ambiguous otherwise.
    pub fn lookup_place(&self, name: &str) -> Result<Place, PlanError> {
        match (self.lookup_system(name), self.lookup_station(name)) {
            (Ok(system), Err(_)) => Ok(Place::System(system)),
            (Err(_), Ok(station)) => Ok(Place::Station(station)),
            (Ok(system), Ok(station)) => {
                if station.system_id == system.id {
                    Ok(Place::System(system))
                } else {
                    Err(PlanError::Ambiguous {
                        kind: "place",
                        name: name.to_string(),
                        first: system.name.clone(),
                        second: station.full_name(),
                    })
                }
            }
            (Err(PlanError::Ambiguous { kind, name, first, second }), Err(_)) => {
                Err(PlanError::Ambiguous { kind, name, first, second })
            }
            (Err(_), Err(PlanError::Ambiguous { kind, name, first, second })) => {
                Err(PlanError::Ambiguous { kind, name, first, second })
            }
            (Err(_), Err(_)) => Err(PlanError::NotFound {
                kind: "place",
                name: name.to_string(),
            }),
        }
    }
}

// Exact normalized matches beat partial ones; anything still plural is
// ambiguous.
fn find_by_name<T>(
    kind: &'static str,
    name: &str,
    candidates: impl Iterator<Item = (String, T)>,
) -> Result<T, PlanError> {
    let wanted = normalized(name);
    let mut exact: Vec<(String, T)> = Vec::new();
    let mut partial: Vec<(String, T)> = Vec::new();
    for (candidate_name, value) in candidates {
        let candidate = normalized(&candidate_name);
        if candidate == wanted {
            exact.push((candidate_name, value));
        } else if candidate.contains(&wanted) {
            partial.push((candidate_name, value));
        }
    }
    let pool = if exact.is_empty() { partial } else { exact };
    match pool.len() {
        0 => Err(PlanError::NotFound {
            kind,
            name: name.to_string(),
        }),
        1 => Ok(pool.into_iter().next().expect("one candidate").1),
        _ => Err(PlanError::Ambiguous {
            kind,
            name: name.to_string(),
            first: pool[0].0.clone(),
            second: pool[1].0.clone(),
        }),
    }
}
