use crate::catalog::Catalog;
use crate::fit::fast_fit;
use crate::jump_graph::{DestinationQuery, JumpGraph};
use crate::price_index::PriceIndex;
use crate::trade_join::{ProfitBounds, TradeCache};
use anyhow::Result;
use jt_domain::{
    Amenity, Destination, ItemId, PadSize, Place, PlanError, PlannerConfig, Route, Station,
    StationId, System, SystemId, TradeLoad, MAX_CAPACITY,
};
use jt_store::{CatalogBmcTrait, PriceBmcTrait, PriceFilter};
use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Score boost that makes a goal-system destination dominate everything else.
const GOAL_MULTIPLIER: f64 = 1e11;
/// Applied to hops that close in on the goal but drift back toward the origin.
const BACKTRACK_MULTIPLIER: f64 = 0.6;

pub type ProgressFn = Box<dyn Fn(usize, usize) + Send + Sync>;

/// Planner configuration after every name has been resolved against the
/// catalog and ship defaults have been applied.
#[derive(Debug)]
struct ResolvedOptions {
    credits: i64,
    capacity: u32,
    max_units: u32,
    hops: u32,
    routes: usize,
    max_jumps_per: u32,
    max_ly_per: f64,
    margin: f64,
    insurance: i64,
    unique: bool,
    avoid_systems: HashSet<SystemId>,
    avoid_stations: HashSet<StationId>,
    via: Vec<Arc<Station>>,
    via_start: usize,
    origin: Option<Arc<Station>>,
    dest: Option<Arc<Station>>,
    pad_size: Option<PadSize>,
    max_ls: Option<f64>,
    black_market: bool,
    goal_system: Option<Arc<System>>,
    ls_penalty: f64,
    direct: bool,
    max_age_s: Option<i64>,
    bounds: ProfitBounds,
}

struct GoalContext {
    goal: Arc<System>,
    origin: Arc<System>,
    src_goal_dist: f64,
    src_orig_dist: f64,
}

struct HopCandidate {
    dst: Arc<Station>,
    route_idx: usize,
    load: TradeLoad,
    via: Vec<Arc<System>>,
    dist_ly: f64,
    score: f64,
    src_id: StationId,
}

/// Beam-style multi-hop trade planner. Indices are built once at
/// construction; `plan` can be called repeatedly and only grows the
/// memoized trade joins.
pub struct Planner {
    catalog: Catalog,
    prices: PriceIndex,
    graph: JumpGraph,
    cache: TradeCache,
    options: ResolvedOptions,
    progress: Option<ProgressFn>,
}

impl Planner {
    /// Builds a planner from the backing store.
    pub async fn load(
        catalog_bmc: &dyn CatalogBmcTrait,
        price_bmc: &dyn PriceBmcTrait,
        config: &PlannerConfig,
    ) -> Result<Planner> {
        let catalog = Catalog::load(catalog_bmc).await?;
        let (options, avoid_item_ids) = resolve(&catalog, config)?;
        let filter = PriceFilter {
            avoid_item_ids,
            max_age_days: config.max_age_days,
        };
        let prices = PriceIndex::load(price_bmc, &filter).await?;
        Ok(Self::assemble(catalog, prices, options))
    }

    /// Builds a planner from already-loaded data, applying the same avoid and
    /// age filters the load path pushes into the store queries.
    pub fn from_parts(catalog: Catalog, mut prices: PriceIndex, config: &PlannerConfig) -> Result<Planner, PlanError> {
        let (options, avoid_item_ids) = resolve(&catalog, config)?;
        prices.remove_items(&avoid_item_ids);
        if let Some(max_age_s) = options.max_age_s {
            prices.remove_older_than(max_age_s);
        }
        Ok(Self::assemble(catalog, prices, options))
    }

    fn assemble(catalog: Catalog, prices: PriceIndex, options: ResolvedOptions) -> Planner {
        let graph = JumpGraph::new(&catalog);
        Planner {
            catalog,
            prices,
            graph,
            cache: TradeCache::default(),
            options,
            progress: None,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Called once per frontier route processed during each extension pass.
    pub fn set_progress(&mut self, progress: impl Fn(usize, usize) + Send + Sync + 'static) {
        self.progress = Some(Box::new(progress));
    }

    /// Runs the configured number of hop extensions and returns the best
    /// routes, highest score first.
    pub fn plan(&mut self) -> Result<Vec<Route>, PlanError> {
        let start_cr = self.options.credits - self.options.insurance;
        let mut routes: Vec<Route> = match &self.options.origin {
            Some(origin) => vec![Route::seed(origin.clone(), start_cr)],
            None => self
                .catalog
                .stations()
                .iter()
                .filter(|station| {
                    !self.options.avoid_stations.contains(&station.id)
                        && !self.options.avoid_systems.contains(&station.system_id)
                })
                .map(|station| Route::seed(station.clone(), start_cr))
                .collect(),
        };
        if routes.is_empty() {
            return Err(PlanError::NoHops);
        }

        let hops = self.options.hops;
        let via_ids: HashSet<StationId> = self.options.via.iter().map(|s| s.id).collect();
        let via_start = self.options.via_start;
        let dest_id = self.options.dest.as_ref().map(|dest| dest.id);
        info!("planning {} hops over {} origin routes", hops, routes.len());

        for hop_no in 0..hops {
            let last_hop = hop_no + 1 == hops;
            let mut restrict: Option<HashSet<StationId>> = None;
            if last_hop {
                if let Some(dest_id) = dest_id {
                    restrict = Some(HashSet::from([dest_id]));
                    if !via_ids.is_empty() {
                        // keep only routes that already touch the via set
                        routes.retain(|route| {
                            route
                                .stations
                                .iter()
                                .skip(via_start)
                                .any(|station| via_ids.contains(&station.id))
                        });
                        if routes.is_empty() {
                            return Ok(Vec::new());
                        }
                    }
                }
            }

            let extended = self.extend(&routes, restrict.as_ref(), hops - hop_no);
            if extended.is_empty() {
                if hop_no == 0 {
                    return Err(PlanError::NoHops);
                }
                debug!("hop {} reached nothing new; keeping the previous pass", hop_no + 1);
                break;
            }
            debug!("hop {}: {} candidate routes", hop_no + 1, extended.len());
            routes = extended;
        }

        if !via_ids.is_empty() {
            routes.retain(|route| {
                let visited: HashSet<StationId> =
                    route.stations.iter().skip(via_start).map(|s| s.id).collect();
                via_ids.is_subset(&visited)
            });
        }

        routes.sort_by_key(|route| (Reverse(OrderedFloat(route.score)), route.num_jumps()));
        routes.truncate(self.options.routes);
        Ok(routes)
    }

    /// Extends every frontier route by one hop, keeping only the best
    /// incoming option per destination station.
    fn extend(
        &mut self,
        routes: &[Route],
        restrict: Option<&HashSet<StationId>>,
        hops_remaining: u32,
    ) -> Vec<Route> {
        let mut best_to_dest: HashMap<StationId, HopCandidate> = HashMap::new();
        let total = routes.len();

        for (idx, route) in routes.iter().enumerate() {
            self.extend_route(idx, route, routes, restrict, hops_remaining, &mut best_to_dest);
            if let Some(progress) = &self.progress {
                progress(idx + 1, total);
            }
        }

        let mut extended: Vec<Route> = best_to_dest
            .into_values()
            .map(|candidate| {
                let gain = candidate.load.gain_cr;
                routes[candidate.route_idx].plus(
                    candidate.dst,
                    (candidate.load, gain),
                    candidate.via,
                    candidate.score,
                )
            })
            .collect();
        extended.sort_by_key(|route| route.last_station().id);
        extended
    }

    fn extend_route(
        &mut self,
        idx: usize,
        route: &Route,
        routes: &[Route],
        restrict: Option<&HashSet<StationId>>,
        hops_remaining: u32,
        best_to_dest: &mut HashMap<StationId, HopCandidate>,
    ) {
        let src = route.last_station().clone();
        if !self.prices.has_selling(src.id) {
            trace!("{} sells nothing; skipping", src.name);
            return;
        }
        let Some(src_system) = self.catalog.system(src.system_id).cloned() else {
            return;
        };
        let budget = self.options.credits - self.options.insurance
            + (route.gain_cr as f64 * (1.0 - self.options.margin)).floor() as i64;

        // A route that must still visit as many via stations as it has hops
        // left can only go to unvisited via stations.
        let via_remaining: HashSet<StationId> = self
            .options
            .via
            .iter()
            .map(|s| s.id)
            .filter(|id| {
                !route
                    .stations
                    .iter()
                    .skip(self.options.via_start)
                    .any(|s| s.id == *id)
            })
            .collect();
        let effective_restrict: Option<HashSet<StationId>> = match restrict {
            Some(set) => Some(set.clone()),
            None if !via_remaining.is_empty() && via_remaining.len() == hops_remaining as usize => {
                Some(via_remaining)
            }
            None => None,
        };

        let goal_ctx: Option<GoalContext> = if self.options.direct {
            None
        } else {
            self.options.goal_system.as_ref().and_then(|goal| {
                let origin = self.catalog.system(route.first_station().system_id)?.clone();
                Some(GoalContext {
                    src_goal_dist: src_system.distance_to(goal),
                    src_orig_dist: src_system.distance_to(&origin),
                    goal: goal.clone(),
                    origin,
                })
            })
        };

        let destinations: Vec<Destination> = if self.options.direct {
            self.direct_destinations(&src_system, effective_restrict.as_ref())
        } else {
            let query = DestinationQuery {
                max_jumps: self.options.max_jumps_per,
                max_ly_per: self.options.max_ly_per,
                avoid_systems: &self.options.avoid_systems,
                avoid_stations: &self.options.avoid_stations,
                pad_size: self.options.pad_size,
                max_ls_from_star: self.options.max_ls,
            };
            self.graph.destinations(&src, &query)
        };

        for dest in destinations {
            let dst = dest.station.clone();
            if dst.id == src.id {
                continue;
            }
            if self.options.unique && route.stations.iter().any(|s| s.id == dst.id) {
                continue;
            }
            if self.options.black_market && dst.black_market != Amenity::Yes {
                continue;
            }
            if let Some(max_age_s) = self.options.max_age_s {
                match self.prices.newest_age_s(dst.id) {
                    Some(age) if age <= max_age_s => {}
                    _ => continue,
                }
            }

            let mut multiplier = 1.0_f64;
            if let Some(allowed) = &effective_restrict {
                if !allowed.contains(&dst.id) {
                    continue;
                }
            } else if let Some(ctx) = &goal_ctx {
                if dest.system.id == src_system.id {
                    if self.options.unique {
                        continue;
                    }
                } else if dest.system.id == ctx.goal.id {
                    multiplier = GOAL_MULTIPLIER;
                } else {
                    let dst_goal_dist = dest.system.distance_to(&ctx.goal);
                    if dst_goal_dist >= ctx.src_goal_dist {
                        continue;
                    }
                    let dst_orig_dist = dest.system.distance_to(&ctx.origin);
                    if dst_orig_dist < ctx.src_orig_dist {
                        multiplier *= BACKTRACK_MULTIPLIER;
                    } else {
                        multiplier *= 1.0 + ctx.src_goal_dist / dst_goal_dist;
                    }
                }
            }

            let Some(trades) =
                self.cache
                    .trades_between(src.id, dst.id, &self.catalog, &self.prices, &self.options.bounds)
            else {
                continue;
            };
            let load = fast_fit(&trades, budget, self.options.capacity, self.options.max_units);
            if load.is_empty() {
                continue;
            }

            if self.options.ls_penalty > 0.0 {
                // flat under ~1kls, punishing past ~4kls
                let kls = (dst.ls_from_star / 100.0).floor() / 10.0;
                let penalty = ((kls * kls) - kls) / 3.0 * self.options.ls_penalty;
                multiplier *= 1.0 - penalty;
            }
            let score = load.gain_cr as f64 * multiplier;

            let replace = match best_to_dest.get(&dst.id) {
                None => true,
                Some(best) => {
                    let best_total = routes[best.route_idx].score + best.score;
                    let new_total = route.score + score;
                    if new_total != best_total {
                        new_total > best_total
                    } else if dest.dist_ly != best.dist_ly {
                        dest.dist_ly < best.dist_ly
                    } else {
                        // deterministic last resort
                        src.id < best.src_id
                    }
                }
            };
            if replace {
                best_to_dest.insert(
                    dst.id,
                    HopCandidate {
                        dst,
                        route_idx: idx,
                        load,
                        via: dest.via,
                        dist_ly: dest.dist_ly,
                        score,
                        src_id: src.id,
                    },
                );
            }
        }
    }

    // Direct mode skips the jump graph: every allowed target is reached in a
    // straight line from the source system.
    fn direct_destinations(
        &self,
        src_system: &Arc<System>,
        restrict: Option<&HashSet<StationId>>,
    ) -> Vec<Destination> {
        let mut pool: Vec<Arc<Station>> = match restrict {
            Some(ids) => ids
                .iter()
                .filter_map(|id| self.catalog.station(*id).cloned())
                .collect(),
            None => match &self.options.goal_system {
                Some(goal) => goal
                    .station_ids
                    .iter()
                    .filter_map(|id| self.catalog.station(*id).cloned())
                    .collect(),
                None => Vec::new(),
            },
        };
        pool.sort_by_key(|station| station.id);

        pool.into_iter()
            .filter_map(|station| {
                if self.options.avoid_stations.contains(&station.id)
                    || self.options.avoid_systems.contains(&station.system_id)
                {
                    return None;
                }
                if let Some(required) = self.options.pad_size {
                    if !station.max_pad_size.accommodates(required) {
                        return None;
                    }
                }
                if let Some(max_ls) = self.options.max_ls {
                    if station.ls_from_star > max_ls {
                        return None;
                    }
                }
                let system = self.catalog.system(station.system_id)?.clone();
                Some(Destination {
                    dist_ly: src_system.distance_to(&system),
                    via: vec![src_system.clone(), system.clone()],
                    system,
                    station,
                })
            })
            .collect()
    }
}

fn resolve(catalog: &Catalog, config: &PlannerConfig) -> Result<(ResolvedOptions, HashSet<ItemId>), PlanError> {
    config.validate()?;

    let ship = match &config.ship {
        Some(name) => Some(catalog.lookup_ship(name)?),
        None => None,
    };
    let capacity = config
        .capacity
        .or_else(|| ship.as_ref().map(|s| s.capacity))
        .ok_or_else(|| PlanError::InvalidConfig("capacity or ship required".into()))?;
    if capacity == 0 {
        return Err(PlanError::InvalidConfig("zero cargo capacity".into()));
    }
    if capacity > MAX_CAPACITY {
        return Err(PlanError::InvalidConfig(format!("capacity > {} not supported", MAX_CAPACITY)));
    }
    let max_units = config.max_units.unwrap_or(capacity);
    if max_units > capacity {
        return Err(PlanError::InvalidConfig("max_units must be <= capacity".into()));
    }
    let max_ly_per = config
        .max_ly_per
        .or_else(|| ship.as_ref().map(|s| s.max_ly_full))
        .ok_or_else(|| PlanError::InvalidConfig("max_ly_per or ship required".into()))?;
    if max_ly_per <= 0.0 {
        return Err(PlanError::InvalidConfig("max_ly_per must be positive".into()));
    }

    let origin = match &config.origin {
        Some(name) => Some(catalog.lookup_station(name)?),
        None => None,
    };
    let dest = match &config.dest {
        Some(name) => Some(catalog.lookup_station(name)?),
        None => None,
    };
    for station in origin.iter().chain(dest.iter()) {
        if station.item_count == 0 {
            return Err(PlanError::NoData(format!(
                "station {} has no price data",
                station.full_name()
            )));
        }
    }
    if config.hops == 1 {
        if let (Some(origin), Some(dest)) = (&origin, &dest) {
            if origin.id == dest.id {
                return Err(PlanError::InvalidConfig(
                    "more than one hop required to use the same origin and destination".into(),
                ));
            }
        }
    }

    let mut via: Vec<Arc<Station>> = Vec::new();
    for name in &config.via {
        let station = catalog.lookup_station(name)?;
        if station.item_count == 0 {
            return Err(PlanError::NoData(format!(
                "no price data for via station {}",
                station.full_name()
            )));
        }
        via.push(station);
    }

    let mut avoid_systems: HashSet<SystemId> = HashSet::new();
    let mut avoid_stations: HashSet<StationId> = HashSet::new();
    for name in &config.avoid_places {
        match catalog.lookup_place(name)? {
            Place::System(system) => {
                avoid_systems.insert(system.id);
            }
            Place::Station(station) => {
                avoid_stations.insert(station.id);
            }
        }
    }
    let mut avoid_item_ids: HashSet<ItemId> = HashSet::new();
    for name in &config.avoid_items {
        avoid_item_ids.insert(catalog.lookup_item(name)?.id);
    }

    if config.unique {
        if config.hops as usize >= catalog.stations().len() {
            return Err(PlanError::InvalidConfig(
                "unique trip needs more stations than hops".into(),
            ));
        }
        let mut pinned: Vec<StationId> = via.iter().map(|s| s.id).collect();
        pinned.extend(origin.iter().map(|s| s.id));
        pinned.extend(dest.iter().map(|s| s.id));
        let distinct: HashSet<StationId> = pinned.iter().copied().collect();
        if distinct.len() != pinned.len() {
            return Err(PlanError::InvalidConfig(
                "origin/dest/via repeats conflict with unique".into(),
            ));
        }
    }

    let via_start = usize::from(origin.is_some());
    let unspecified_hops =
        config.hops as usize + usize::from(origin.is_none()) - usize::from(dest.is_some());
    if via.len() > unspecified_hops {
        return Err(PlanError::InvalidConfig(format!(
            "too many vias: {} stations for {} free hops",
            via.len(),
            unspecified_hops
        )));
    }

    let goal_system = match &config.goal_system {
        Some(name) => Some(catalog.lookup_system(name)?),
        None => None,
    };
    if config.direct && dest.is_none() && goal_system.is_none() {
        return Err(PlanError::InvalidConfig(
            "direct mode needs a destination or a goal system".into(),
        ));
    }

    let options = ResolvedOptions {
        credits: config.credits,
        capacity,
        max_units,
        hops: config.hops,
        routes: config.routes,
        max_jumps_per: config.max_jumps_per,
        max_ly_per,
        margin: config.margin,
        insurance: config.insurance,
        unique: config.unique,
        avoid_systems,
        avoid_stations,
        via,
        via_start,
        origin,
        dest,
        pad_size: config.pad_size,
        max_ls: config.max_ls,
        black_market: config.black_market,
        goal_system,
        ls_penalty: config.ls_penalty,
        direct: config.direct,
        max_age_s: config.max_age_days.map(|days| (days * 86_400.0) as i64),
        bounds: ProfitBounds {
            min_gain_per_ton: config.min_gain_per_ton,
            max_gain_per_ton: config.max_gain_per_ton,
        },
    };
    Ok((options, avoid_item_ids))
}
