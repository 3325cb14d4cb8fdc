//! Linear objectives over the reachable set.
//!
//! Maximizes `Σ w_p · m_p` over the markings of a diagram by dynamic
//! programming on its nodes. A path in the diagram fixes the places tested on
//! it; every place skipped between two nodes is free, so it contributes
//! `max(0, w_p)`. The optimum therefore needs one pass over the nodes rather
//! than one per marking.
//!
//! Sums are kept in `i128`, so no combination of `i64` weights overflows
//! inside the pass; only the final value has to fit back into `i64`.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::bdd::Bdd;
use crate::error::{Error, Result};
use crate::net::Marking;
use crate::reach::ReachableSet;
use crate::reference::Ref;

/// DP over one diagram with weights given per level.
struct MarkingOptimizer<'a> {
    reach: &'a ReachableSet,
    bdd: &'a Bdd,
    // weight of the place at each level
    weights: Vec<i128>,
    // prefix[k] = Σ_{j<k} max(0, weights[j])
    prefix: Vec<i128>,
    // None stands for "no marking below this node"
    memo: HashMap<Ref, Option<i128>>,
}

impl<'a> MarkingOptimizer<'a> {
    fn new(reach: &'a ReachableSet, weights: Vec<i128>) -> Self {
        let mut prefix = Vec::with_capacity(weights.len() + 1);
        prefix.push(0);
        for &w in &weights {
            prefix.push(prefix[prefix.len() - 1] + w.max(0));
        }
        Self {
            reach,
            bdd: reach.bdd(),
            weights,
            prefix,
            memo: HashMap::new(),
        }
    }

    /// Variable of `node`, with terminals placed just below the last level.
    fn var(&self, node: Ref) -> u32 {
        if self.bdd.is_terminal(node) {
            self.weights.len() as u32 + 1
        } else {
            self.bdd.variable(node.index())
        }
    }

    /// Best contribution of the free levels strictly between variables `from` and `to`.
    fn skipped(&self, from: u32, to: u32) -> i128 {
        self.prefix[to as usize - 1] - self.prefix[from as usize]
    }

    fn value(&mut self, node: Ref) -> Option<i128> {
        let bdd = self.bdd;
        if bdd.is_zero(node) {
            return None;
        }
        if bdd.is_one(node) {
            return Some(0);
        }
        if let Some(&res) = self.memo.get(&node) {
            return res;
        }

        let (res, _) = self.choose(node);
        self.memo.insert(node, res);
        res
    }

    /// Best value below `node` and whether it is reached through the 1-branch.
    fn choose(&mut self, node: Ref) -> (Option<i128>, bool) {
        let bdd = self.bdd;
        let v = bdd.variable(node.index());
        let low = bdd.low_node(node);
        let high = bdd.high_node(node);

        let via_low = self.value(low).map(|x| x + self.skipped(v, self.var(low)));
        let via_high = self
            .value(high)
            .map(|x| x + self.weights[v as usize - 1] + self.skipped(v, self.var(high)));

        // ties go to the 1-branch
        match (via_low, via_high) {
            (Some(l), Some(h)) if l > h => (Some(l), false),
            (_, Some(h)) => (Some(h), true),
            (l, None) => (l, false),
        }
    }

    /// Set every free level strictly between `from` and `to` with positive weight.
    fn fill(&self, from: u32, to: u32, levels: &mut [bool]) {
        for k in from as usize..to as usize - 1 {
            levels[k] = self.weights[k] > 0;
        }
    }

    /// Optimal value and per-level assignment.
    fn maximize(&mut self) -> Option<(Vec<bool>, i128)> {
        let root = self.reach.root();
        let total = self.value(root)? + self.skipped(0, self.var(root));

        let bdd = self.bdd;
        let mut levels = vec![false; self.weights.len()];
        self.fill(0, self.var(root), &mut levels);

        let mut node = root;
        while !bdd.is_terminal(node) {
            let v = bdd.variable(node.index());
            let (_, take_high) = self.choose(node);
            let next = if take_high { bdd.high_node(node) } else { bdd.low_node(node) };
            levels[v as usize - 1] = take_high;
            self.fill(v, self.var(next), &mut levels);
            node = next;
        }
        debug_assert!(bdd.is_one(node));

        debug!("optimum {} over {} memoized nodes", total, self.memo.len());
        Some((levels, total))
    }
}

/// Maximize `Σ weights[i] · m[place_order[i]]` over the reachable markings.
///
/// `place_order` lists place ids and fixes the indexing of `weights` and of
/// the returned marking. Returns `None` when the set is empty, and
/// [`Error::WeightOverflow`] when the optimum does not fit in `i64`.
pub fn optimize_marking(place_order: &[&str], reach: &ReachableSet, weights: &[i64]) -> Result<Option<(Marking, i64)>> {
    optimize_signed(place_order, reach, weights, 1)
}

/// Minimize the weighted token sum instead.
pub fn minimize_marking(place_order: &[&str], reach: &ReachableSet, weights: &[i64]) -> Result<Option<(Marking, i64)>> {
    optimize_signed(place_order, reach, weights, -1)
}

// Maximize `sign · Σ w·m`; the reported value is `Σ w·m` itself.
fn optimize_signed(
    place_order: &[&str],
    reach: &ReachableSet,
    weights: &[i64],
    sign: i128,
) -> Result<Option<(Marking, i64)>> {
    let n = reach.num_places();
    if weights.len() != n {
        return Err(Error::WeightLength {
            found: weights.len(),
            expected: n,
        });
    }
    let places = resolve(place_order, reach)?;

    // caller index -> net index -> level
    let order = reach.order();
    let mut level_weights = vec![0; n];
    for (i, &p) in places.iter().enumerate() {
        level_weights[order.level_of(p)] = sign * i128::from(weights[i]);
    }

    let mut optimizer = MarkingOptimizer::new(reach, level_weights);
    let Some((levels, value)) = optimizer.maximize() else {
        return Ok(None);
    };

    let value = i64::try_from(sign * value).map_err(|_| Error::WeightOverflow)?;
    let marking = Marking::new(places.iter().map(|&p| levels[order.level_of(p)]).collect());
    Ok(Some((marking, value)))
}

// Net index of every id in `place_order`.
fn resolve(place_order: &[&str], reach: &ReachableSet) -> Result<Vec<usize>> {
    let ids = reach.place_ids();
    if place_order.len() != ids.len() {
        return Err(Error::InvalidOrder(format!(
            "{} place ids given for {} places",
            place_order.len(),
            ids.len()
        )));
    }
    let index = ids.iter().enumerate().map(|(i, id)| (id.as_str(), i)).collect::<HashMap<_, _>>();
    let mut seen = HashSet::new();
    place_order
        .iter()
        .map(|&id| {
            let &p = index.get(id).ok_or_else(|| Error::UnknownPlace(id.to_string()))?;
            if !seen.insert(p) {
                return Err(Error::DuplicateId {
                    kind: "place",
                    id: id.to_string(),
                });
            }
            Ok(p)
        })
        .collect()
}
