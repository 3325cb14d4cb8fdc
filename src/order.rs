//! Mapping between places and BDD variables.

use std::collections::{BTreeSet, VecDeque};

use log::debug;

use crate::error::{Error, Result};
use crate::net::NetModel;

/// How to choose the variable order of the reachable-set diagram.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum OrderStrategy {
    /// Breadth-first traversal of the place adjacency graph.
    #[default]
    Bfs,
    /// Places in declaration order.
    Identity,
}

/// Bijection between places and BDD variables.
///
/// The place at position `k` of the order is BDD variable `k + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableOrder {
    // level -> place
    places: Vec<usize>,
    // place -> level
    levels: Vec<usize>,
}

impl VariableOrder {
    pub fn identity(num_places: usize) -> Self {
        Self {
            places: (0..num_places).collect(),
            levels: (0..num_places).collect(),
        }
    }

    /// Build an order from a permutation of `0..n` listing places top to bottom.
    pub fn from_permutation(places: Vec<usize>) -> Result<Self> {
        let n = places.len();
        let mut levels = vec![usize::MAX; n];
        for (level, &p) in places.iter().enumerate() {
            if p >= n {
                return Err(Error::InvalidOrder(format!("place index {} out of range 0..{}", p, n)));
            }
            if levels[p] != usize::MAX {
                return Err(Error::InvalidOrder(format!("place index {} appears twice", p)));
            }
            levels[p] = level;
        }
        Ok(Self { places, levels })
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }

    /// Places from the top of the diagram to the bottom.
    pub fn places(&self) -> &[usize] {
        &self.places
    }

    pub fn level_of(&self, place: usize) -> usize {
        self.levels[place]
    }

    pub fn place_at(&self, level: usize) -> usize {
        self.places[level]
    }

    /// BDD variable encoding `place`.
    pub fn var_of(&self, place: usize) -> u32 {
        (self.levels[place] + 1) as u32
    }

    /// Place encoded by the BDD variable `var`.
    pub fn place_of(&self, var: u32) -> Result<usize> {
        if var == 0 || var as usize > self.places.len() {
            return Err(Error::UnmappedVariable(var));
        }
        Ok(self.places[var as usize - 1])
    }

    /// Signed literal asserting `place` holds `value`.
    pub fn lit(&self, place: usize, value: bool) -> i32 {
        let v = self.var_of(place) as i32;
        if value {
            v
        } else {
            -v
        }
    }
}

/// Compute a variable order for `net` according to `strategy`.
pub fn compute_order(net: &NetModel, strategy: OrderStrategy) -> VariableOrder {
    let order = match strategy {
        OrderStrategy::Identity => VariableOrder::identity(net.num_places()),
        OrderStrategy::Bfs => bfs_order(net),
    };
    debug!("variable order ({:?}): {:?}", strategy, order.places());
    order
}

/// Breadth-first order over the place adjacency graph.
///
/// Two places are adjacent iff some transition touches both. Each component is
/// traversed from its lowest-indexed place, neighbors in ascending order, so
/// places that interact end up close together in the diagram.
pub fn bfs_order(net: &NetModel) -> VariableOrder {
    let n = net.num_places();
    let mut adjacency = vec![BTreeSet::new(); n];
    for transition in net.transitions() {
        let touched = transition.touched();
        for &p in &touched {
            for &q in &touched {
                if p != q {
                    adjacency[p].insert(q);
                }
            }
        }
    }

    let mut visited = vec![false; n];
    let mut places = Vec::with_capacity(n);
    let mut queue = VecDeque::new();
    for start in 0..n {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        queue.push_back(start);
        while let Some(p) = queue.pop_front() {
            places.push(p);
            for &q in &adjacency[p] {
                if !visited[q] {
                    visited[q] = true;
                    queue.push_back(q);
                }
            }
        }
    }

    let mut levels = vec![0; n];
    for (level, &p) in places.iter().enumerate() {
        levels[p] = level;
    }
    VariableOrder { places, levels }
}
