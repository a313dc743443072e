use crate::errors::PlanError;
use crate::model::PadSize;

/// Buffer kept between insurance and starting credits so a rebuy never
/// swallows the whole trading budget.
pub const INSURANCE_BUFFER_CR: i64 = 42;

pub const MAX_HOPS: u32 = 64;
pub const MAX_CAPACITY: u32 = 1000;
pub const MAX_MARGIN: f64 = 0.25;

/// Everything the route planner recognizes. Name-valued options are resolved
/// against the catalog when the planner is constructed.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Starting credits.
    pub credits: i64,
    /// Cargo hold size in tons; defaults from `ship` when unset.
    pub capacity: Option<u32>,
    /// Per-item cap on units bought; defaults to `capacity`.
    pub max_units: Option<u32>,
    /// Station-to-station hops to plan.
    pub hops: u32,
    /// Number of routes to return.
    pub routes: usize,
    /// Cap on system-to-system jumps inside one hop.
    pub max_jumps_per: u32,
    /// Per-jump distance limit in ly; defaults from `ship` when unset.
    pub max_ly_per: Option<f64>,
    /// Fraction (0..=0.25) by which projected gains are discounted when
    /// budgeting later hops.
    pub margin: f64,
    /// Credits held back from the trading budget.
    pub insurance: i64,
    /// Each station may appear at most once in a route.
    pub unique: bool,
    pub avoid_items: Vec<String>,
    pub avoid_places: Vec<String>,
    /// Stations that must appear en route.
    pub via: Vec<String>,
    /// Starting station; any station when unset.
    pub origin: Option<String>,
    /// Final station; any station when unset.
    pub dest: Option<String>,
    /// Ship whose capacity / jump range fill in unset limits.
    pub ship: Option<String>,
    /// Smallest landing pad the ship needs.
    pub pad_size: Option<PadSize>,
    /// Skip stations further than this many ls from their star.
    pub max_ls: Option<f64>,
    /// Only consider stations with a black market.
    pub black_market: bool,
    /// Bias hops toward this system.
    pub goal_system: Option<String>,
    /// Fraction (0..=1) controlling how hard long supercruise distances are
    /// penalized in the score.
    pub ls_penalty: f64,
    /// Skip the jump-graph search and fly straight lines to the allowed
    /// destinations.
    pub direct: bool,
    /// Ignore price data older than this many days.
    pub max_age_days: Option<f64>,
    pub min_gain_per_ton: i64,
    pub max_gain_per_ton: Option<i64>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig {
            credits: 0,
            capacity: None,
            max_units: None,
            hops: 2,
            routes: 1,
            max_jumps_per: 2,
            max_ly_per: None,
            margin: 0.0,
            insurance: 0,
            unique: false,
            avoid_items: Vec::new(),
            avoid_places: Vec::new(),
            via: Vec::new(),
            origin: None,
            dest: None,
            ship: None,
            pad_size: None,
            max_ls: None,
            black_market: false,
            goal_system: None,
            ls_penalty: 0.0,
            direct: false,
            max_age_days: None,
            min_gain_per_ton: 1,
            max_gain_per_ton: None,
        }
    }
}

impl PlannerConfig {
    /// Checks every constraint that does not need the catalog. Capacity and
    /// jump range are validated after ship defaults have been applied.
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.credits < 0 {
            return Err(PlanError::InvalidConfig("negative starting credits".into()));
        }
        if self.routes < 1 {
            return Err(PlanError::InvalidConfig("routes must be 1 or higher".into()));
        }
        if self.hops < 1 {
            return Err(PlanError::InvalidConfig("at least 1 hop required".into()));
        }
        if self.hops > MAX_HOPS {
            return Err(PlanError::InvalidConfig(format!(
                "too many hops ({} > {})",
                self.hops, MAX_HOPS
            )));
        }
        if let Some(capacity) = self.capacity {
            if capacity == 0 {
                return Err(PlanError::InvalidConfig("zero cargo capacity".into()));
            }
            if capacity > MAX_CAPACITY {
                return Err(PlanError::InvalidConfig(format!(
                    "capacity > {} not supported",
                    MAX_CAPACITY
                )));
            }
            if let Some(limit) = self.max_units {
                if limit > capacity {
                    return Err(PlanError::InvalidConfig("max_units must be <= capacity".into()));
                }
            }
        }
        if !(0.0..=MAX_MARGIN).contains(&self.margin) {
            return Err(PlanError::InvalidConfig(format!(
                "margin must lie within 0..={}",
                MAX_MARGIN
            )));
        }
        if !(0.0..=1.0).contains(&self.ls_penalty) {
            return Err(PlanError::InvalidConfig("ls_penalty must lie within 0..=1".into()));
        }
        if self.insurance > 0 && self.insurance >= self.credits + INSURANCE_BUFFER_CR {
            return Err(PlanError::InvalidConfig(
                "insurance leaves no margin for trade".into(),
            ));
        }
        if let Some(max_ly) = self.max_ly_per {
            if max_ly <= 0.0 {
                return Err(PlanError::InvalidConfig("max_ly_per must be positive".into()));
            }
        }
        if let Some(max_age) = self.max_age_days {
            if max_age <= 0.0 {
                return Err(PlanError::InvalidConfig("max_age_days must be positive".into()));
            }
        }
        if self.min_gain_per_ton < 1 {
            return Err(PlanError::InvalidConfig("min_gain_per_ton must be >= 1".into()));
        }
        if let Some(max_gain) = self.max_gain_per_ton {
            if max_gain < self.min_gain_per_ton {
                return Err(PlanError::InvalidConfig(
                    "max_gain_per_ton must be >= min_gain_per_ton".into(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> PlannerConfig {
        PlannerConfig {
            credits: 10_000,
            capacity: Some(16),
            max_ly_per: Some(10.0),
            ..PlannerConfig::default()
        }
    }

    #[test]
    fn default_passes_validation_once_capacity_is_set() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn rejects_zero_hops_and_excessive_hops() {
        let mut config = valid();
        config.hops = 0;
        assert!(matches!(config.validate(), Err(PlanError::InvalidConfig(_))));
        config.hops = MAX_HOPS + 1;
        assert!(matches!(config.validate(), Err(PlanError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_limit_above_capacity() {
        let mut config = valid();
        config.max_units = Some(17);
        assert!(matches!(config.validate(), Err(PlanError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_insurance_eating_the_budget() {
        let mut config = valid();
        config.insurance = config.credits + INSURANCE_BUFFER_CR;
        assert!(matches!(config.validate(), Err(PlanError::InvalidConfig(_))));
        config.insurance = config.credits;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_margin() {
        let mut config = valid();
        config.margin = 0.3;
        assert!(matches!(config.validate(), Err(PlanError::InvalidConfig(_))));
    }
}
