//! Explicit-state reachability by breadth-first search.
//!
//! Only feasible for small nets. Used as an independent membership oracle and
//! to cross-check the symbolic results.

use std::collections::{HashSet, VecDeque};

use log::debug;

use crate::net::{Marking, NetModel};
use crate::reach::MembershipOracle;

#[derive(Debug, Clone)]
pub struct ExplicitReachability {
    visited: HashSet<Marking>,
    // discovery order
    markings: Vec<Marking>,
}

impl ExplicitReachability {
    pub fn explore(net: &NetModel) -> Self {
        let initial = net.initial_marking().clone();
        let mut visited = HashSet::from([initial.clone()]);
        let mut markings = vec![initial.clone()];
        let mut queue = VecDeque::from([initial]);

        while let Some(marking) = queue.pop_front() {
            for t in net.enabled_transitions(&marking) {
                if let Some(next) = net.fire(&marking, t) {
                    if visited.insert(next.clone()) {
                        markings.push(next.clone());
                        queue.push_back(next);
                    }
                }
            }
        }

        debug!("explicit exploration: {} markings", markings.len());
        Self { visited, markings }
    }

    pub fn len(&self) -> usize {
        self.markings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markings.is_empty()
    }

    /// Markings in discovery order, the initial one first.
    pub fn markings(&self) -> &[Marking] {
        &self.markings
    }

    pub fn sorted(&self) -> Vec<Marking> {
        let mut markings = self.markings.clone();
        markings.sort();
        markings
    }

    pub fn contains(&self, marking: &Marking) -> bool {
        self.visited.contains(marking)
    }

    /// Reachable markings where no transition is enabled.
    pub fn deadlocks<'a>(&'a self, net: &'a NetModel) -> impl Iterator<Item = &'a Marking> + 'a {
        self.markings.iter().filter(move |m| net.is_dead(m))
    }
}

impl MembershipOracle for ExplicitReachability {
    fn contains(&self, marking: &Marking) -> bool {
        ExplicitReachability::contains(self, marking)
    }
}
