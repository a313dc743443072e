use crate::catalog::Catalog;
use itertools::Itertools;
use jt_domain::{Destination, PadSize, Station, StationId, System, SystemId};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::trace;

/// Constraints for one destination enumeration.
#[derive(Debug)]
pub struct DestinationQuery<'a> {
    pub max_jumps: u32,
    pub max_ly_per: f64,
    pub avoid_systems: &'a HashSet<SystemId>,
    pub avoid_stations: &'a HashSet<StationId>,
    /// Smallest pad the ship fits on; stations with smaller (known) pads drop out.
    pub pad_size: Option<PadSize>,
    pub max_ls_from_star: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
struct Reach {
    dist_ly: f64,
    jumps: u32,
    prev: Option<SystemId>,
}

/// Implicit weighted graph over the systems' 3D positions. Neighbors are
/// computed on demand from the coordinates rather than from stored edge
/// lists, so the same code serves tiny fixtures and full dumps.
#[derive(Debug, Default)]
pub struct JumpGraph {
    systems: Vec<Arc<System>>,
    systems_by_id: HashMap<SystemId, Arc<System>>,
    stations_by_system: HashMap<SystemId, Vec<Arc<Station>>>,
}

impl JumpGraph {
    pub fn new(catalog: &Catalog) -> JumpGraph {
        let stations_by_system: HashMap<SystemId, Vec<Arc<Station>>> = catalog
            .stations()
            .iter()
            .map(|station| (station.system_id, station.clone()))
            .into_group_map();
        JumpGraph {
            systems: catalog.systems().to_vec(),
            systems_by_id: catalog.systems().iter().map(|s| (s.id, s.clone())).collect(),
            stations_by_system,
        }
    }

    /// All systems within `max_ly` of `origin`, the origin itself excluded.
    pub fn systems_in_range(&self, origin: &System, max_ly: f64) -> Vec<(Arc<System>, f64)> {
        self.systems
            .iter()
            .filter(|system| system.id != origin.id)
            .filter_map(|system| {
                let dist = origin.distance_to(system);
                (dist <= max_ly).then(|| (system.clone(), dist))
            })
            .collect()
    }

    /// Stations reachable from `src` within the jump and distance limits.
    ///
    /// Breadth-first over jump rings: a system keeps the jump count of the
    /// ring that first reached it; an equal-ring path only wins with a
    /// strictly shorter cumulative distance. The whole frontier is expanded
    /// (no early exit) because the caller wants every destination.
    pub fn destinations(&self, src: &Station, query: &DestinationQuery) -> Vec<Destination> {
        let Some(origin) = self.systems_by_id.get(&src.system_id) else {
            return Vec::new();
        };

        let mut reached: HashMap<SystemId, Reach> = HashMap::from([(
            origin.id,
            Reach {
                dist_ly: 0.0,
                jumps: 0,
                prev: None,
            },
        )]);
        let mut frontier: Vec<SystemId> = vec![origin.id];

        for ring in 1..=query.max_jumps {
            let mut next: Vec<SystemId> = Vec::new();
            for system_id in &frontier {
                let base = reached[system_id].dist_ly;
                let system = &self.systems_by_id[system_id];
                for (neighbor, dist) in self.systems_in_range(system, query.max_ly_per) {
                    if query.avoid_systems.contains(&neighbor.id) {
                        continue;
                    }
                    let total = base + dist;
                    match reached.entry(neighbor.id) {
                        Entry::Vacant(entry) => {
                            entry.insert(Reach {
                                dist_ly: total,
                                jumps: ring,
                                prev: Some(*system_id),
                            });
                            next.push(neighbor.id);
                        }
                        Entry::Occupied(mut entry) => {
                            let reach = entry.get_mut();
                            if reach.jumps == ring && total < reach.dist_ly {
                                reach.dist_ly = total;
                                reach.prev = Some(*system_id);
                            }
                        }
                    }
                }
            }
            next.sort();
            next.dedup();
            if next.is_empty() {
                break;
            }
            frontier = next;
        }

        let mut result = Vec::new();
        let mut system_ids: Vec<SystemId> = reached.keys().copied().collect();
        system_ids.sort();
        for system_id in system_ids {
            let Some(stations) = self.stations_by_system.get(&system_id) else {
                continue;
            };
            let system = self.systems_by_id[&system_id].clone();
            let via = self.path_to(&reached, system_id);
            let dist_ly = reached[&system_id].dist_ly;
            for station in stations {
                if query.avoid_stations.contains(&station.id) {
                    continue;
                }
                if let Some(required) = query.pad_size {
                    if !station.max_pad_size.accommodates(required) {
                        continue;
                    }
                }
                if let Some(max_ls) = query.max_ls_from_star {
                    if station.ls_from_star > max_ls {
                        continue;
                    }
                }
                result.push(Destination {
                    system: system.clone(),
                    station: station.clone(),
                    via: via.clone(),
                    dist_ly,
                });
            }
        }
        trace!(
            "destinations from {}: {} systems reached, {} stations",
            src.name,
            reached.len(),
            result.len()
        );
        result
    }

    fn path_to(&self, reached: &HashMap<SystemId, Reach>, target: SystemId) -> Vec<Arc<System>> {
        let mut path = vec![self.systems_by_id[&target].clone()];
        let mut cursor = target;
        while let Some(prev) = reached[&cursor].prev {
            path.push(self.systems_by_id[&prev].clone());
            cursor = prev;
        }
        path.reverse();
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_objects::TestUniverse;

    fn query<'a>(
        max_jumps: u32,
        max_ly_per: f64,
        avoid_systems: &'a HashSet<SystemId>,
        avoid_stations: &'a HashSet<StationId>,
    ) -> DestinationQuery<'a> {
        DestinationQuery {
            max_jumps,
            max_ly_per,
            avoid_systems,
            avoid_stations,
            pad_size: None,
            max_ls_from_star: None,
        }
    }

    // A --5-- B --4-- C, with D off to the side 3 ly from A.
    fn chain() -> (TestUniverse, Vec<SystemId>, Vec<StationId>) {
        let mut universe = TestUniverse::new();
        let a = universe.add_system("Alpha", [0.0, 0.0, 0.0]);
        let b = universe.add_system("Beta", [5.0, 0.0, 0.0]);
        let c = universe.add_system("Gamma", [9.0, 0.0, 0.0]);
        let d = universe.add_system("Delta", [2.0, 2.2360679774997896, 0.0]);
        let sa = universe.add_station(a, "Alpha Port");
        let sb = universe.add_station(b, "Beta Port");
        let sc = universe.add_station(c, "Gamma Port");
        let sd = universe.add_station(d, "Delta Port");
        (universe, vec![a, b, c, d], vec![sa, sb, sc, sd])
    }

    #[test]
    fn systems_in_range_excludes_self_and_far_systems() {
        let (universe, ids, _) = chain();
        let catalog = universe.catalog();
        let graph = JumpGraph::new(&catalog);
        let alpha = catalog.system(ids[0]).unwrap();
        let mut in_range: Vec<String> = graph
            .systems_in_range(alpha, 5.0)
            .into_iter()
            .map(|(s, _)| s.name.clone())
            .collect();
        in_range.sort();
        assert_eq!(in_range, vec!["Beta", "Delta"]);
    }

    #[test]
    fn bfs_reaches_stations_within_jump_budget() {
        let (universe, _, stations) = chain();
        let catalog = universe.catalog();
        let graph = JumpGraph::new(&catalog);
        let src = catalog.station(stations[0]).unwrap();

        let none: HashSet<SystemId> = HashSet::new();
        let none_stations: HashSet<StationId> = HashSet::new();
        let one_jump = graph.destinations(src, &query(1, 5.0, &none, &none_stations));
        let names: HashSet<&str> = one_jump.iter().map(|d| d.station.name.as_str()).collect();
        assert!(names.contains("Beta Port"));
        assert!(names.contains("Delta Port"));
        assert!(!names.contains("Gamma Port"));

        let two_jumps = graph.destinations(src, &query(2, 5.0, &none, &none_stations));
        let gamma = two_jumps
            .iter()
            .find(|d| d.station.name == "Gamma Port")
            .expect("Gamma reachable in two jumps");
        assert_eq!(gamma.dist_ly, 9.0);
        let via: Vec<&str> = gamma.via.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(via, vec!["Alpha", "Beta", "Gamma"]);
    }

    #[test]
    fn own_system_stations_are_zero_jump_destinations() {
        let (mut universe, ids, stations) = chain();
        universe.add_station(ids[0], "Alpha Outpost");
        let catalog = universe.catalog();
        let graph = JumpGraph::new(&catalog);
        let src = catalog.station(stations[0]).unwrap();

        let none: HashSet<SystemId> = HashSet::new();
        let none_stations: HashSet<StationId> = HashSet::new();
        let dests = graph.destinations(src, &query(1, 5.0, &none, &none_stations));
        let outpost = dests
            .iter()
            .find(|d| d.station.name == "Alpha Outpost")
            .expect("same-system station listed");
        assert_eq!(outpost.dist_ly, 0.0);
        assert_eq!(outpost.via.len(), 1);
    }

    #[test]
    fn avoided_systems_and_stations_are_skipped() {
        let (universe, ids, stations) = chain();
        let catalog = universe.catalog();
        let graph = JumpGraph::new(&catalog);
        let src = catalog.station(stations[0]).unwrap();

        // avoiding Beta cuts off Gamma as well at 5 ly per jump
        let avoid_systems = HashSet::from([ids[1]]);
        let none_stations: HashSet<StationId> = HashSet::new();
        let dests = graph.destinations(src, &query(2, 5.0, &avoid_systems, &none_stations));
        let names: HashSet<&str> = dests.iter().map(|d| d.station.name.as_str()).collect();
        assert!(!names.contains("Beta Port"));
        assert!(!names.contains("Gamma Port"));
        assert!(names.contains("Delta Port"));

        let none_systems: HashSet<SystemId> = HashSet::new();
        let avoid_stations = HashSet::from([stations[1]]);
        let dests = graph.destinations(src, &query(2, 5.0, &none_systems, &avoid_stations));
        let names: HashSet<&str> = dests.iter().map(|d| d.station.name.as_str()).collect();
        assert!(!names.contains("Beta Port"));
        // the system itself is still usable as a waypoint
        assert!(names.contains("Gamma Port"));
    }

    #[test]
    fn equal_jump_paths_keep_the_shorter_distance() {
        let mut universe = TestUniverse::new();
        // two 2-jump routes into Target: via Near (total 4.5) and via Far (~5.06)
        let start = universe.add_system("Start", [0.0, 0.0, 0.0]);
        let near = universe.add_system("Near", [2.0, 0.0, 0.0]);
        let far = universe.add_system("Far", [0.0, 3.0, 0.0]);
        let target = universe.add_system("Target", [2.0, 2.5, 0.0]);
        let s0 = universe.add_station(start, "Start Port");
        universe.add_station(near, "Near Port");
        universe.add_station(far, "Far Port");
        universe.add_station(target, "Target Port");

        let catalog = universe.catalog();
        let graph = JumpGraph::new(&catalog);
        let src = catalog.station(s0).unwrap();
        let none: HashSet<SystemId> = HashSet::new();
        let none_stations: HashSet<StationId> = HashSet::new();
        let dests = graph.destinations(src, &query(2, 3.0, &none, &none_stations));
        let dest = dests
            .iter()
            .find(|d| d.station.name == "Target Port")
            .expect("target reachable");
        assert_eq!(dest.dist_ly, 4.5);
        let via: Vec<&str> = dest.via.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(via, vec!["Start", "Near", "Target"]);
    }

    #[test]
    fn station_filters_apply() {
        let mut universe = TestUniverse::new();
        let a = universe.add_system("Alpha", [0.0; 3]);
        let b = universe.add_system("Beta", [3.0, 0.0, 0.0]);
        let src = universe.add_station(a, "Alpha Port");
        let small = universe.add_station(b, "Small Pad");
        universe.set_pad_size(small, PadSize::Small);
        let distant = universe.add_station(b, "Distant Orbital");
        universe.set_ls_from_star(distant, 3200.0);
        universe.add_station(b, "Beta Port");

        let catalog = universe.catalog();
        let graph = JumpGraph::new(&catalog);
        let none: HashSet<SystemId> = HashSet::new();
        let none_stations: HashSet<StationId> = HashSet::new();
        let mut q = query(1, 5.0, &none, &none_stations);
        q.pad_size = Some(PadSize::Large);
        q.max_ls_from_star = Some(1000.0);
        let dests = graph.destinations(catalog.station(src).unwrap(), &q);
        let names: HashSet<&str> = dests.iter().map(|d| d.station.name.as_str()).collect();
        assert!(!names.contains("Small Pad"));
        assert!(!names.contains("Distant Orbital"));
        // unknown pad size is not filtered out
        assert!(names.contains("Beta Port"));
    }
}
