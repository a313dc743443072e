use jt_domain::{Trade, TradeLoad};

// Largest quantity the credit, capacity, per-item and stock limits allow.
// Negative stock means unknown and does not constrain.
fn max_feasible_qty(trade: &Trade, cr: i64, cap: u32, max_units: u32) -> u32 {
    if trade.cost_cr <= 0 {
        return 0;
    }
    let by_credits = (cr / trade.cost_cr).clamp(0, u32::MAX as i64) as u32;
    let mut qty = max_units.min(cap).min(by_credits);
    if trade.src_units >= 0 {
        qty = qty.min(trade.src_units.min(u32::MAX as i64) as u32);
    }
    qty
}

/// Picks the best cargo manifest from `trades`, which must be sorted by gain
/// descending then cost ascending (the order the trade join produces).
///
/// Recursive search: at each position take the maximum feasible quantity and
/// solve the remainder further down the list, or skip the item entirely.
/// Because the list is gain-sorted, a full hold of the current item that beats
/// the best-so-far ends the scan; nothing later can improve on it.
pub fn fast_fit(trades: &[Trade], credits: i64, capacity: u32, max_units: u32) -> TradeLoad {
    fit_combos(trades, 0, credits, capacity, max_units)
}

fn fit_combos(trades: &[Trade], offset: usize, cr: i64, cap: u32, max_units: u32) -> TradeLoad {
    let mut best = TradeLoad::empty();
    for idx in offset..trades.len() {
        let trade = &trades[idx];
        let qty = max_feasible_qty(trade, cr, cap, max_units);
        if qty == 0 {
            continue;
        }

        if qty == cap {
            let load = TradeLoad::single(trade.clone(), qty);
            if load > best {
                best = load;
                break;
            }
            continue;
        }

        let load = TradeLoad::single(trade.clone(), qty);
        let cr_left = cr - load.cost_cr;
        let cap_left = cap - qty;
        let candidate = if cr_left > 0 && cap_left > 0 {
            let sub = fit_combos(trades, idx + 1, cr_left, cap_left, max_units);
            if sub.is_empty() {
                load
            } else {
                load.merged_with(sub)
            }
        } else {
            load
        };
        if candidate > best {
            best = candidate;
        }
    }
    best
}

/// Exhaustive fit over every (item, quantity) combination. Far too slow for
/// real data; exists to validate `fast_fit` in tests.
pub fn brute_force_fit(trades: &[Trade], credits: i64, capacity: u32, max_units: u32) -> TradeLoad {
    fit_all_combos(trades, 0, credits, capacity, max_units)
}

fn fit_all_combos(trades: &[Trade], mut offset: usize, cr: i64, cap: u32, max_units: u32) -> TradeLoad {
    if cr <= 0 || cap == 0 {
        return TradeLoad::empty();
    }
    let (trade, max_qty) = loop {
        if offset >= trades.len() {
            return TradeLoad::empty();
        }
        let trade = &trades[offset];
        offset += 1;
        let qty = max_feasible_qty(trade, cr, cap, max_units);
        if qty > 0 {
            break (trade, qty);
        }
    };

    // combinations that skip this item entirely
    let mut best = fit_all_combos(trades, offset, cr, cap, max_units);
    for qty in 1..=max_qty {
        let load = TradeLoad::single(trade.clone(), qty);
        let sub = fit_all_combos(trades, offset, cr - load.cost_cr, cap - qty, max_units);
        let candidate = if sub.is_empty() { load } else { load.merged_with(sub) };
        if candidate > best {
            best = candidate;
        }
    }
    best
}
