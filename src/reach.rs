//! Symbolic reachability fixpoint.
//!
//! Starting from the initial marking, the solver repeatedly fires every
//! transition on the states discovered in the previous round (the frontier)
//! and keeps whatever is new:
//!
//! ```text
//! Reach    := {M0}
//! Frontier := Reach
//! loop:
//!     New := (⋃_t image(Frontier, t)) ∧ ¬Reach
//!     if New = ∅: stop
//!     Reach    := Reach ∨ New
//!     Frontier := New
//! ```
//!
//! Every round adds at least one marking and there are at most `2^n` of them,
//! so the loop always terminates.

use std::rc::Rc;

use log::{debug, info};
use num_bigint::BigUint;

use crate::bdd::Bdd;
use crate::config::AnalysisConfig;
use crate::error::{Error, Result};
use crate::net::{Marking, NetModel};
use crate::order::{compute_order, VariableOrder};
use crate::reference::Ref;
use crate::relation::build_relations;

/// Set of markings that can answer membership queries.
pub trait MembershipOracle {
    /// Whether `marking` belongs to the set. Markings of the wrong length never do.
    fn contains(&self, marking: &Marking) -> bool;
}

/// Progress of one fixpoint round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationStats {
    pub iteration: usize,
    pub new_states: BigUint,
    pub reachable_states: BigUint,
    /// Nodes in the reachable-set diagram after the round, terminal included.
    pub diagram_size: usize,
}

/// Diagram of all reachable markings together with its variable order.
#[derive(Debug, Clone)]
pub struct ReachableSet {
    bdd: Rc<Bdd>,
    root: Ref,
    order: Rc<VariableOrder>,
    place_ids: Vec<String>,
    count: BigUint,
    stats: Vec<IterationStats>,
}

impl ReachableSet {
    /// Wrap a diagram built elsewhere.
    ///
    /// Every variable in the support of `root` must be mapped by `order`, and
    /// `place_ids` names the places in net order.
    pub fn from_parts(bdd: Rc<Bdd>, root: Ref, order: VariableOrder, place_ids: Vec<String>) -> Result<Self> {
        if order.len() != place_ids.len() {
            return Err(Error::InvalidOrder(format!(
                "order covers {} places but {} ids were given",
                order.len(),
                place_ids.len()
            )));
        }
        for var in bdd.support(root) {
            order.place_of(var)?;
        }
        let count = bdd.sat_count(root, order.len());
        Ok(Self {
            bdd,
            root,
            order: Rc::new(order),
            place_ids,
            count,
            stats: Vec::new(),
        })
    }

    pub fn bdd(&self) -> &Rc<Bdd> {
        &self.bdd
    }

    pub fn root(&self) -> Ref {
        self.root
    }

    pub fn order(&self) -> &VariableOrder {
        &self.order
    }

    /// Place ids in net order.
    pub fn place_ids(&self) -> &[String] {
        &self.place_ids
    }

    pub fn num_places(&self) -> usize {
        self.place_ids.len()
    }

    /// Number of reachable markings.
    pub fn count(&self) -> &BigUint {
        &self.count
    }

    pub fn is_empty(&self) -> bool {
        self.bdd.is_zero(self.root)
    }

    /// Statistics of each fixpoint round, empty for sets built with [`from_parts`][Self::from_parts].
    pub fn stats(&self) -> &[IterationStats] {
        &self.stats
    }

    pub fn contains(&self, marking: &Marking) -> bool {
        if marking.len() != self.num_places() {
            return false;
        }
        let cube = (0..marking.len()).map(|p| self.order.lit(p, marking[p]));
        self.bdd.is_one(self.bdd.cofactor_cube(self.root, cube))
    }

    /// All markings of the set, sorted.
    ///
    /// The list is exponential in the number of places in the worst case.
    pub fn markings(&self) -> Vec<Marking> {
        let mut result = Vec::new();
        let mut bits = vec![false; self.num_places()];
        self.expand(self.root, 1, &mut bits, &mut result);
        result.sort();
        result
    }

    fn expand(&self, node: Ref, var: u32, bits: &mut [bool], out: &mut Vec<Marking>) {
        if self.bdd.is_zero(node) {
            return;
        }
        if var as usize > self.order.len() {
            debug_assert!(self.bdd.is_one(node));
            out.push(Marking::new(bits.to_vec()));
            return;
        }

        let place = self.order.place_at(var as usize - 1);
        let (low, high) = if !self.bdd.is_terminal(node) && self.bdd.variable(node.index()) == var {
            (self.bdd.low_node(node), self.bdd.high_node(node))
        } else {
            (node, node)
        };
        bits[place] = false;
        self.expand(low, var + 1, bits, out);
        bits[place] = true;
        self.expand(high, var + 1, bits, out);
        bits[place] = false;
    }

    /// Graphviz rendering with place labels; formatting failures surface as [`Error::Render`].
    pub fn to_dot(&self, net: &NetModel) -> Result<String> {
        let mut labels = Vec::with_capacity(self.order.len());
        for var in 1..=self.order.len() as u32 {
            labels.push(net.place(self.order.place_of(var)?).label().to_string());
        }
        let dot = self
            .bdd
            .to_dot_labelled(&[self.root], &Default::default(), |v| labels[v as usize - 1].clone())?;
        Ok(dot)
    }
}

impl MembershipOracle for ReachableSet {
    fn contains(&self, marking: &Marking) -> bool {
        ReachableSet::contains(self, marking)
    }
}

/// Fixpoint driver owning the configuration of one run.
#[derive(Debug)]
pub struct ReachabilitySolver<'a> {
    net: &'a NetModel,
    config: AnalysisConfig,
}

impl<'a> ReachabilitySolver<'a> {
    pub fn new(net: &'a NetModel, config: AnalysisConfig) -> Self {
        Self { net, config }
    }

    pub fn solve(&self) -> Result<ReachableSet> {
        self.net.validate()?;
        let order = compute_order(self.net, self.config.order);
        self.solve_with_order(order)
    }

    /// Run the fixpoint with an explicit variable order.
    pub fn solve_with_order(&self, order: VariableOrder) -> Result<ReachableSet> {
        let orientation = self.net.validate()?;
        let n = self.net.num_places();
        debug!("reachability: {} places, {:?} incidence", n, orientation);
        if order.len() != n {
            return Err(Error::InvalidOrder(format!(
                "order covers {} places but the net has {}",
                order.len(),
                n
            )));
        }

        let bdd = Rc::new(Bdd::with_config(self.config.bdd_config()));
        let relations = build_relations(&bdd, self.net, &order);

        let initial = self.net.initial_marking();
        let mut reach = bdd.cube((0..n).map(|p| order.lit(p, initial[p])));
        let mut frontier = reach;
        let mut stats = Vec::new();

        for iteration in 1.. {
            if let Some(limit) = self.config.max_iterations {
                if iteration > limit {
                    return Err(Error::IterationLimit(limit));
                }
            }

            let successors = bdd.apply_or_many(relations.iter().map(|rel| rel.image(&bdd, frontier)));
            let new = bdd.apply_diff(successors, reach);
            if bdd.is_zero(new) {
                debug!("fixpoint reached after {} rounds", iteration - 1);
                break;
            }
            reach = bdd.apply_or(reach, new);
            frontier = new;

            let round = IterationStats {
                iteration,
                new_states: bdd.sat_count(new, n),
                reachable_states: bdd.sat_count(reach, n),
                diagram_size: bdd.size(reach),
            };
            debug!(
                "round {}: {} new, {} reachable, {} nodes",
                round.iteration, round.new_states, round.reachable_states, round.diagram_size
            );
            stats.push(round);
        }

        let count = bdd.sat_count(reach, n);
        info!(
            "reachable set: {} markings, {} diagram nodes, {} rounds",
            count,
            bdd.size(reach),
            stats.len()
        );

        Ok(ReachableSet {
            bdd,
            root: reach,
            order: Rc::new(order),
            place_ids: self.net.places().iter().map(|p| p.id.clone()).collect(),
            count,
            stats,
        })
    }
}

/// Reachable set of `net` with the default configuration.
pub fn compute_reachable_set(net: &NetModel) -> Result<ReachableSet> {
    ReachabilitySolver::new(net, AnalysisConfig::default()).solve()
}
