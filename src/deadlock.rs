//! Deadlock search combining a 0-1 program with reachability checks.
//!
//! The program describes markings where every transition is disabled. Each
//! transition `t` gets a switch `δ_t` choosing why it is disabled:
//!
//! ```text
//! δ_t = 0:  Σ inputs(t)       ≤ |inputs(t)| − 1     (some input is empty)
//! δ_t = 1:  Σ pure_outputs(t) ≥ 1                   (some output is full)
//! ```
//!
//! both written with a big-M constant so the inactive side is always satisfied.
//! A solution is only a candidate: it must also be reachable. Unreachable
//! candidates are excluded with a no-good cut and the program is solved again
//! under the next objective of the [`ObjectivePolicy`].

use log::{debug, info, warn};
use num_traits::ToPrimitive;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::AnalysisConfig;
use crate::error::{Error, Result};
use crate::ilp::{BinaryProgram, LinearConstraint, SolveOutcome, VarId};
use crate::invariant::place_invariants;
use crate::net::{Marking, NetModel};
use crate::reach::{MembershipOracle, ReachableSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeadlockOutcome {
    /// A reachable marking where no transition is enabled.
    Found(Marking),
    /// No marking, reachable or not, has every transition disabled
    /// (or every such marking was shown unreachable).
    NoDeadlock,
    /// The search gave up before reaching a verdict.
    Undetermined { attempts: usize },
}

impl DeadlockOutcome {
    pub fn marking(&self) -> Option<&Marking> {
        match self {
            DeadlockOutcome::Found(m) => Some(m),
            _ => None,
        }
    }
}

/// Objective of one solve, over the place variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Objective {
    MinimizeTokens,
    MaximizeTokens,
    /// Minimize `Σ w_p · m_p`.
    Weighted(Vec<i64>),
}

impl Objective {
    fn coefficient(&self, place: usize) -> i64 {
        match self {
            Objective::MinimizeTokens => 1,
            Objective::MaximizeTokens => -1,
            Objective::Weighted(weights) => weights.get(place).copied().unwrap_or(0),
        }
    }
}

/// Picks the objective of each attempt.
pub trait ObjectivePolicy {
    /// Objective of attempt number `attempt` (starting at 1).
    fn objective(&mut self, attempt: usize, num_places: usize) -> Objective;
}

/// Cycles maximize tokens, random weights, minimize tokens.
///
/// Random weights are drawn from `[-2, 2]` with a seeded generator, so a
/// given seed always yields the same sequence.
#[derive(Debug, Clone)]
pub struct AlternatingPolicy {
    rng: StdRng,
}

impl AlternatingPolicy {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl ObjectivePolicy for AlternatingPolicy {
    fn objective(&mut self, attempt: usize, num_places: usize) -> Objective {
        match attempt % 3 {
            0 => Objective::MinimizeTokens,
            1 => Objective::MaximizeTokens,
            _ => Objective::Weighted((0..num_places).map(|_| self.rng.gen_range(-2..=2)).collect()),
        }
    }
}

/// Replays a fixed list of objectives, wrapping around.
#[derive(Debug, Clone)]
pub struct FixedPolicy {
    objectives: Vec<Objective>,
}

impl FixedPolicy {
    pub fn new(objectives: Vec<Objective>) -> Self {
        Self { objectives }
    }
}

impl ObjectivePolicy for FixedPolicy {
    fn objective(&mut self, attempt: usize, _num_places: usize) -> Objective {
        if self.objectives.is_empty() {
            return Objective::MinimizeTokens;
        }
        self.objectives[(attempt - 1) % self.objectives.len()].clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchReport {
    pub outcome: DeadlockOutcome,
    /// Solves performed.
    pub attempts: usize,
    /// Unreachable candidates excluded.
    pub cuts: usize,
    /// Invariant equalities added to the program.
    pub invariants: usize,
}

/// Owner of the deadlock program for one net.
#[derive(Debug)]
pub struct DeadlockSearcher<'a> {
    net: &'a NetModel,
    config: AnalysisConfig,
    program: BinaryProgram,
    places: Vec<VarId>,
    invariants: usize,
}

impl<'a> DeadlockSearcher<'a> {
    pub fn new(net: &'a NetModel, config: AnalysisConfig) -> Result<Self> {
        net.validate()?;

        let n = net.num_places();
        let big_m = n as i64 + 5;
        let mut program = BinaryProgram::new();
        let places = net.places().iter().map(|p| program.add_var(format!("m_{}", p.id))).collect::<Vec<_>>();

        for (t, transition) in net.transitions().iter().enumerate() {
            let delta = program.add_var(format!("delta_{}", transition.id));

            let inputs = net.inputs(t);
            // Σ inputs − M·δ ≤ |inputs| − 1; without inputs this forces δ = 1.
            program.add_constraint(
                LinearConstraint::le(
                    inputs.iter().map(|&p| (places[p], 1)).chain([(delta, -big_m)]),
                    inputs.len() as i64 - 1,
                )
                .named(format!("dead_in_{}", transition.id)),
            );

            // Σ pure_outputs − M·δ ≥ 1 − M; without pure outputs this forces δ = 0.
            program.add_constraint(
                LinearConstraint::ge(
                    transition.pure_outputs().map(|p| (places[p], 1)).chain([(delta, -big_m)]),
                    1 - big_m,
                )
                .named(format!("dead_out_{}", transition.id)),
            );
        }

        let mut invariants = 0;
        if config.use_invariants {
            let initial = net.initial_marking();
            for (k, y) in place_invariants(net).into_iter().enumerate() {
                let Some(weights) = y.iter().map(|v| v.to_i64()).collect::<Option<Vec<_>>>() else {
                    warn!("dropping invariant {} with coefficients outside i64", k);
                    continue;
                };
                let rhs = initial.dot(&weights);
                program.add_constraint(
                    LinearConstraint::eq(places.iter().zip(&weights).map(|(&v, &w)| (v, w)), rhs)
                        .named(format!("inv_{}", k)),
                );
                invariants += 1;
            }
        }
        debug!(
            "deadlock program: {} variables, {} constraints ({} invariants)",
            program.num_vars(),
            program.constraints().len(),
            invariants
        );

        Ok(Self {
            net,
            config,
            program,
            places,
            invariants,
        })
    }

    pub fn program(&self) -> &BinaryProgram {
        &self.program
    }

    /// Run the search loop until a verdict or until `max_attempts` solves.
    pub fn search(&mut self, oracle: &dyn MembershipOracle, policy: &mut dyn ObjectivePolicy) -> SearchReport {
        let n = self.net.num_places();
        let mut cuts = 0;

        for attempt in 1..=self.config.max_attempts {
            let objective = policy.objective(attempt, n);
            debug!("attempt {}: {:?}", attempt, objective);
            self.program
                .set_objective(self.places.iter().enumerate().map(|(p, &v)| (v, objective.coefficient(p))));

            let solution = match self.program.solve(self.config.ilp_timeout_ms) {
                SolveOutcome::Optimal(solution) | SolveOutcome::Timeout(Some(solution)) => solution,
                SolveOutcome::Infeasible => {
                    info!("no deadlock: program infeasible after {} cuts", cuts);
                    return self.report(DeadlockOutcome::NoDeadlock, attempt, cuts);
                }
                SolveOutcome::Timeout(None) => {
                    warn!("deadlock search undetermined: solver timed out at attempt {}", attempt);
                    return self.report(DeadlockOutcome::Undetermined { attempts: attempt }, attempt, cuts);
                }
            };

            let candidate = Marking::new(self.places.iter().map(|&v| solution.values[v]).collect());
            debug_assert!(self.net.is_dead(&candidate));

            if oracle.contains(&candidate) {
                info!("deadlock found at attempt {}: {}", attempt, candidate);
                return self.report(DeadlockOutcome::Found(candidate), attempt, cuts);
            }

            debug!("candidate {} is unreachable, cutting it off", candidate);
            self.add_cut(&candidate, attempt);
            cuts += 1;
        }

        let attempts = self.config.max_attempts;
        warn!("deadlock search undetermined after {} attempts", attempts);
        self.report(DeadlockOutcome::Undetermined { attempts }, attempts, cuts)
    }

    /// Exclude exactly `marking`: `Σ ones − Σ zeros ≤ |ones| − 1`.
    fn add_cut(&mut self, marking: &Marking, attempt: usize) {
        let terms = self
            .places
            .iter()
            .enumerate()
            .map(|(p, &v)| (v, if marking[p] { 1 } else { -1 }));
        let rhs = marking.tokens() as i64 - 1;
        self.program
            .add_constraint(LinearConstraint::le(terms, rhs).named(format!("cut_{}", attempt)));
    }

    fn report(&self, outcome: DeadlockOutcome, attempts: usize, cuts: usize) -> SearchReport {
        SearchReport {
            outcome,
            attempts,
            cuts,
            invariants: self.invariants,
        }
    }
}

/// Search with an arbitrary membership oracle.
pub fn find_deadlock_with_oracle(
    net: &NetModel,
    oracle: &dyn MembershipOracle,
    config: &AnalysisConfig,
) -> Result<SearchReport> {
    let mut policy = AlternatingPolicy::new(config.seed);
    let mut searcher = DeadlockSearcher::new(net, config.clone())?;
    Ok(searcher.search(oracle, &mut policy))
}

/// Reachable deadlock of `net`, checked against its reachable-set diagram.
pub fn find_deadlock(net: &NetModel, reach: &ReachableSet) -> Result<DeadlockOutcome> {
    if reach.num_places() != net.num_places() {
        return Err(Error::MarkingLength {
            found: reach.num_places(),
            expected: net.num_places(),
        });
    }
    for (position, (found, place)) in reach.place_ids().iter().zip(net.places()).enumerate() {
        if *found != place.id {
            return Err(Error::PlaceMismatch {
                position,
                found: found.clone(),
                expected: place.id.clone(),
            });
        }
    }
    let report = find_deadlock_with_oracle(net, reach, &AnalysisConfig::default())?;
    Ok(report.outcome)
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use std::rc::Rc;

    use super::*;
    use crate::bdd::Bdd;
    use crate::explicit::ExplicitReachability;
    use crate::net::NetBuilder;
    use crate::order::VariableOrder;
    use crate::reach::compute_reachable_set;

    fn cycle3() -> NetModel {
        let mut builder = NetBuilder::new();
        let p1 = builder.place("p1", true);
        let p2 = builder.place("p2", false);
        let p3 = builder.place("p3", false);
        builder.transition("t1", [p1], [p2]);
        builder.transition("t2", [p2], [p3]);
        builder.transition("t3", [p3], [p1]);
        builder.build().unwrap()
    }

    fn chain() -> NetModel {
        let mut builder = NetBuilder::new();
        let a = builder.place("a", true);
        let b = builder.place("b", false);
        let c = builder.place("c", false);
        builder.transition("ab", [a], [b]);
        builder.transition("bc", [b], [c]);
        builder.build().unwrap()
    }

    #[test]
    fn test_cycle_has_no_deadlock() {
        let net = cycle3();
        let reach = compute_reachable_set(&net).unwrap();
        assert_eq!(find_deadlock(&net, &reach).unwrap(), DeadlockOutcome::NoDeadlock);
    }

    #[test]
    fn test_invariants_close_the_cycle_at_once() {
        let net = cycle3();
        let reach = compute_reachable_set(&net).unwrap();
        let report = find_deadlock_with_oracle(&net, &reach, &AnalysisConfig::default()).unwrap();
        assert_eq!(report.outcome, DeadlockOutcome::NoDeadlock);
        assert_eq!(report.invariants, 1);
        assert_eq!(report.attempts, 1);
        assert_eq!(report.cuts, 0);
    }

    #[test]
    fn test_cuts_without_invariants() {
        // Only (0,0,0) and (1,1,1) disable every transition; both are unreachable.
        let net = cycle3();
        let reach = compute_reachable_set(&net).unwrap();
        let config = AnalysisConfig::default().with_invariants(false);
        let report = find_deadlock_with_oracle(&net, &reach, &config).unwrap();
        assert_eq!(report.outcome, DeadlockOutcome::NoDeadlock);
        assert_eq!(report.cuts, 2);
        assert_eq!(report.attempts, 3);
    }

    #[test]
    fn test_undetermined_when_attempts_run_out() {
        let net = cycle3();
        let reach = compute_reachable_set(&net).unwrap();
        let config = AnalysisConfig::default().with_invariants(false).with_max_attempts(1);
        let report = find_deadlock_with_oracle(&net, &reach, &config).unwrap();
        assert_eq!(report.outcome, DeadlockOutcome::Undetermined { attempts: 1 });
        assert_eq!(report.cuts, 1);
    }

    #[test]
    fn test_chain_deadlock() {
        let net = chain();
        let reach = compute_reachable_set(&net).unwrap();
        let outcome = find_deadlock(&net, &reach).unwrap();
        let marking = outcome.marking().unwrap();
        assert_eq!(marking, &Marking::from_bits(&[0, 0, 1]));
        assert!(net.is_dead(marking));
        assert!(reach.contains(marking));
    }

    #[test]
    fn test_explicit_oracle_agrees() {
        let net = chain();
        let explicit = ExplicitReachability::explore(&net);
        let report = find_deadlock_with_oracle(&net, &explicit, &AnalysisConfig::default()).unwrap();
        assert_eq!(report.outcome, DeadlockOutcome::Found(Marking::from_bits(&[0, 0, 1])));
    }

    #[test]
    fn test_source_transition_deadlock() {
        let mut builder = NetBuilder::new();
        let p1 = builder.place("p1", false);
        let p2 = builder.place("p2", false);
        builder.transition("src", [], [p1, p2]);
        let net = builder.build().unwrap();

        let reach = compute_reachable_set(&net).unwrap();
        let outcome = find_deadlock(&net, &reach).unwrap();
        assert_eq!(outcome, DeadlockOutcome::Found(Marking::from_bits(&[1, 1])));
    }

    #[test]
    fn test_fixed_policy() {
        let net = chain();
        let reach = compute_reachable_set(&net).unwrap();
        let mut searcher = DeadlockSearcher::new(&net, AnalysisConfig::default()).unwrap();
        let mut policy = FixedPolicy::new(vec![Objective::Weighted(vec![0, 0, -1])]);
        let report = searcher.search(&reach, &mut policy);
        assert_eq!(report.outcome, DeadlockOutcome::Found(Marking::from_bits(&[0, 0, 1])));
    }

    #[test]
    fn test_alternating_policy_is_reproducible() {
        let mut a = AlternatingPolicy::new(7);
        let mut b = AlternatingPolicy::new(7);
        assert_eq!(a.objective(1, 4), Objective::MaximizeTokens);
        assert_eq!(b.objective(1, 4), Objective::MaximizeTokens);
        let wa = a.objective(2, 4);
        let wb = b.objective(2, 4);
        assert_eq!(wa, wb);
        match wa {
            Objective::Weighted(w) => {
                assert_eq!(w.len(), 4);
                assert!(w.iter().all(|x| (-2..=2).contains(x)));
            }
            other => panic!("expected weights, got {:?}", other),
        }
        assert_eq!(a.objective(3, 4), Objective::MinimizeTokens);
    }

    #[test]
    fn test_program_shape() {
        let net = chain();
        let searcher = DeadlockSearcher::new(&net, AnalysisConfig::default().with_invariants(false)).unwrap();
        // three places, two switches, two constraints per transition
        assert_eq!(searcher.program().num_vars(), 5);
        assert_eq!(searcher.program().constraints().len(), 4);
    }

    #[test]
    fn test_diagram_of_other_places_is_rejected() {
        let net = cycle3();
        let bdd = Rc::new(Bdd::default());
        let root = bdd.cube([1, -2, -3]);
        let ids = ["x", "y", "z"].map(String::from).to_vec();
        let reach = ReachableSet::from_parts(bdd, root, VariableOrder::identity(3), ids).unwrap();

        assert_eq!(
            find_deadlock(&net, &reach),
            Err(Error::PlaceMismatch {
                position: 0,
                found: "x".to_string(),
                expected: "p1".to_string(),
            })
        );
    }

    #[test]
    fn test_diagram_with_permuted_places_is_rejected() {
        let net = cycle3();
        let bdd = Rc::new(Bdd::default());
        let root = bdd.cube([1, -2, -3]);
        let ids = ["p1", "p3", "p2"].map(String::from).to_vec();
        let reach = ReachableSet::from_parts(bdd, root, VariableOrder::identity(3), ids).unwrap();

        assert!(matches!(
            find_deadlock(&net, &reach),
            Err(Error::PlaceMismatch { position: 1, .. })
        ));
    }
}
