//! Per-transition symbolic relations.
//!
//! The relation of a transition is kept in three parts instead of as one BDD
//! over current and next-state variables: the enabling condition, the set of
//! variables the firing rewrites, and the cube they are rewritten to. The image
//! then needs no primed variables and no renaming:
//!
//! ```text
//! image(S, t) = (∃ changed. S ∧ enable) ∧ update
//! ```

use log::debug;

use crate::bdd::Bdd;
use crate::net::{Marking, NetModel};
use crate::order::VariableOrder;
use crate::reference::Ref;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRelation {
    /// Index of the transition in the net.
    pub transition: usize,
    /// Inputs marked and pure outputs empty.
    pub enable: Ref,
    /// Outputs set to 1 and consumed inputs set to 0.
    pub update: Ref,
    /// Variables of every place the transition touches, ascending.
    pub changed: Vec<u32>,
}

impl TransitionRelation {
    pub fn new(bdd: &Bdd, net: &NetModel, order: &VariableOrder, transition: usize) -> Self {
        let t = net.transition(transition);

        // A transition without inputs and pure outputs gets the constant `one`
        // and fires everywhere.
        let enable = bdd.cube(
            t.inputs()
                .iter()
                .map(|&p| order.lit(p, true))
                .chain(t.pure_outputs().map(|p| order.lit(p, false))),
        );
        let update = bdd.cube(
            t.outputs()
                .iter()
                .map(|&p| order.lit(p, true))
                .chain(t.pure_inputs().map(|p| order.lit(p, false))),
        );
        let mut changed = t.touched().into_iter().map(|p| order.var_of(p)).collect::<Vec<_>>();
        changed.sort_unstable();

        debug!(
            "relation {}: enable = {}, update = {}, changed = {:?}",
            t.id, enable, update, changed
        );

        Self {
            transition,
            enable,
            update,
            changed,
        }
    }

    /// Markings reached from `set` by firing this transition once.
    pub fn image(&self, bdd: &Bdd, set: Ref) -> Ref {
        let enabled = bdd.apply_and(set, self.enable);
        if bdd.is_zero(enabled) {
            return bdd.zero;
        }
        let abstracted = bdd.exists(enabled, self.changed.iter().copied());
        bdd.apply_and(abstracted, self.update)
    }

    /// Whether the transition may fire at `marking`; never for a marking of the wrong length.
    pub fn is_enabled_at(&self, bdd: &Bdd, order: &VariableOrder, marking: &Marking) -> bool {
        if marking.len() != order.len() {
            return false;
        }
        let cube = (0..marking.len()).map(|p| order.lit(p, marking[p]));
        bdd.is_one(bdd.cofactor_cube(self.enable, cube))
    }
}

/// Relations of all transitions of `net`, in transition order.
pub fn build_relations(bdd: &Bdd, net: &NetModel, order: &VariableOrder) -> Vec<TransitionRelation> {
    (0..net.num_transitions())
        .map(|t| TransitionRelation::new(bdd, net, order, t))
        .collect()
}
