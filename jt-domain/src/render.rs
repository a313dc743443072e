use crate::model::{Route, Station, System, Trade};
use itertools::Itertools;
use thousands::Separable;

/// Rough human description of how old a price datum is.
pub fn describe_age(age_s: i64) -> String {
    let mins = age_s / 60;
    if mins < 2 {
        return "just now".to_string();
    }
    if mins < 60 {
        return format!("{} mins", mins);
    }
    let hours = age_s as f64 / 3600.0;
    if hours < 48.0 {
        return format!("{:.1} hrs", hours);
    }
    format!("{:.1} days", age_s as f64 / 86_400.0)
}

// Within half an hour the two sides were effectively captured together.
fn describe_trade_age(trade: &Trade) -> String {
    if (trade.src_age_s - trade.dst_age_s).abs() <= 30 * 60 {
        describe_age(trade.src_age_s.max(trade.dst_age_s))
    } else {
        format!(
            "{} vs {}",
            describe_age(trade.src_age_s),
            describe_age(trade.dst_age_s)
        )
    }
}

fn decorate_station(station: &Station) -> String {
    let mut details: Vec<String> = Vec::new();
    if station.ls_from_star > 0.0 {
        details.push(format!("{:.0}ls", station.ls_from_star));
    }
    if station.black_market.code() != '?' {
        details.push(format!("BMk:{}", station.black_market.code()));
    }
    if station.max_pad_size.code() != '?' {
        details.push(format!("Pad:{}", station.max_pad_size.code()));
    }
    if station.shipyard.code() != '?' {
        details.push(format!("Shp:{}", station.shipyard.code()));
    }
    if station.outfitting.code() != '?' {
        details.push(format!("Out:{}", station.outfitting.code()));
    }
    if station.refuel.code() != '?' {
        details.push(format!("Ref:{}", station.refuel.code()));
    }
    if details.is_empty() {
        format!("{} (no details)", station.full_name())
    } else {
        format!("{} ({})", station.full_name(), details.join(", "))
    }
}

impl Route {
    /// Short "origin -> destination" label.
    pub fn label(&self) -> String {
        format!(
            "{} -> {}",
            self.first_station().full_name(),
            self.last_station().full_name()
        )
    }

    /// Six-line recap of credits, hops, jumps and gains.
    pub fn summary(&self) -> String {
        let gain: i64 = self.hops.iter().map(|(_, gain)| gain).sum();
        let hops = self.hops.len().max(1) as i64;
        format!(
            "Start CR: {:>12}\n\
             Hops    : {:>12}\n\
             Jumps   : {:>12}\n\
             Gain CR : {:>12}\n\
             Gain/Hop: {:>12}\n\
             Final CR: {:>12}\n",
            self.start_cr.separate_with_commas(),
            self.hops.len(),
            self.num_jumps(),
            gain.separate_with_commas(),
            (gain / hops).separate_with_commas(),
            (self.start_cr + gain).separate_with_commas(),
        )
    }

    /// Renders the route at increasing levels of verbosity (0..=3).
    /// `insurance` is added back when reporting final credits.
    pub fn detail(&self, detail: u8, goal_system: Option<&System>, insurance: i64) -> String {
        let credits = self.start_cr + insurance;
        let longest_name = self
            .hops
            .iter()
            .flat_map(|(load, _)| load.items.iter())
            .map(|(trade, _)| trade.name().len())
            .max()
            .unwrap_or(0);

        let mut text = self.label();
        if detail >= 1 {
            text.push_str(&format!(" (score: {:.2})", self.score));
        }
        text.push('\n');
        if detail > 2 {
            text.push_str(&self.summary());
        }

        let goal_distance = |system: Option<&std::sync::Arc<System>>| -> String {
            match (goal_system, system) {
                (Some(goal), Some(system)) if detail >= 1 => format!(
                    "  [Distance to {}: {:.2} ly]\n",
                    goal.name,
                    system.distance_to(goal)
                ),
                _ => String::new(),
            }
        };

        let mut gained: i64 = 0;
        for (i, (load, hop_gain)) in self.hops.iter().enumerate() {
            let src = &self.stations[i];
            let dst = &self.stations[i + 1];
            let mut purchases = load.items.clone();
            purchases.sort_by_key(|(trade, qty)| -(trade.gain_cr * *qty as i64));

            text.push_str(&goal_distance(self.system_at(i)));

            if detail > 1 {
                text.push_str(&format!("  Load from {}:\n", decorate_station(src)));
                for (trade, qty) in &purchases {
                    text.push_str(&format!(
                        "     {:>4} x {:<width$} {:>9}cr vs {:>9}cr, {}",
                        qty,
                        trade.name(),
                        trade.cost_cr.separate_with_commas(),
                        (trade.cost_cr + trade.gain_cr).separate_with_commas(),
                        describe_trade_age(trade),
                        width = longest_name,
                    ));
                    if detail > 2 {
                        text.push_str(&format!(
                            ", total: {:>11}cr",
                            (trade.cost_cr * *qty as i64).separate_with_commas()
                        ));
                    }
                    text.push('\n');
                }
            } else if detail == 1 {
                let items = purchases
                    .iter()
                    .map(|(trade, qty)| format!("{} x {} (@{}cr)", qty, trade.name(), trade.cost_cr))
                    .join(", ");
                text.push_str(&format!("  Load from {}: {}\n", src.full_name(), items));
            } else {
                let items = purchases
                    .iter()
                    .map(|(trade, qty)| format!("{} x {}", qty, trade.name()))
                    .join(", ");
                text.push_str(&format!("  {}: {}\n", src.name, items));
            }

            if detail >= 1 && self.jumps[i].len() > 1 {
                let path = self.jumps[i].iter().map(|system| system.name.as_str()).join(" -> ");
                text.push_str(&format!("  Jump {}\n", path));
            }

            if detail > 1 {
                let per_ton = if load.units > 0 { hop_gain / load.units as i64 } else { 0 };
                text.push_str(&format!(
                    "  Unload at {} => Gain {}cr ({}cr/ton) => {}cr\n",
                    decorate_station(dst),
                    hop_gain.separate_with_commas(),
                    per_ton.separate_with_commas(),
                    (credits + gained + hop_gain).separate_with_commas(),
                ));
            }

            gained += hop_gain;
        }

        let last = self.last_station();
        if detail > 1 {
            let at_goal = goal_system
                .map(|goal| self.system_at(self.stations.len() - 1).map(|s| s.id) == Some(goal.id))
                .unwrap_or(false);
            if !at_goal {
                text.push_str(&goal_distance(self.system_at(self.stations.len() - 1)));
            }
            text.push_str("  ");
            text.push_str(&"-".repeat(76));
            text.push('\n');
            text.push_str(&format!(
                "  Finish at {} gaining {}cr => est {}cr total\n",
                last.full_name(),
                gained.separate_with_commas(),
                (credits + gained).separate_with_commas(),
            ));
        } else if detail == 1 {
            text.push_str(&format!(
                "  Finish {} + {}cr => {}cr\n",
                last.full_name(),
                gained.separate_with_commas(),
                (credits + gained).separate_with_commas(),
            ));
        } else {
            text.push_str(&format!("  {} +{}cr", last.name, gained.separate_with_commas()));
        }

        text
    }
}
