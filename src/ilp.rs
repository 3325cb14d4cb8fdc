//! 0-1 integer linear programs.
//!
//! Programs built by the deadlock search: every variable is binary,
//! coefficients are integers, and the objective is minimized. Solving is
//! delegated to Z3's `Optimize` engine, with each binary variable a `Bool`
//! and each linear row a sum of `ite(x, a, 0)` terms.

use std::fmt;

use log::debug;
use z3::ast::{Ast, Bool, Int};
use z3::{Config, Context, Optimize, Params, SatResult};

pub type VarId = usize;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Comparison {
    Le,
    Ge,
    Eq,
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparison::Le => write!(f, "<="),
            Comparison::Ge => write!(f, ">="),
            Comparison::Eq => write!(f, "="),
        }
    }
}

/// `Σ coeff·x  (≤ | ≥ | =)  rhs`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearConstraint {
    pub terms: Vec<(VarId, i64)>,
    pub cmp: Comparison,
    pub rhs: i64,
    pub name: String,
}

impl LinearConstraint {
    pub fn new(terms: impl IntoIterator<Item = (VarId, i64)>, cmp: Comparison, rhs: i64) -> Self {
        Self {
            terms: merge_terms(terms),
            cmp,
            rhs,
            name: String::new(),
        }
    }

    pub fn le(terms: impl IntoIterator<Item = (VarId, i64)>, rhs: i64) -> Self {
        Self::new(terms, Comparison::Le, rhs)
    }

    pub fn ge(terms: impl IntoIterator<Item = (VarId, i64)>, rhs: i64) -> Self {
        Self::new(terms, Comparison::Ge, rhs)
    }

    pub fn eq(terms: impl IntoIterator<Item = (VarId, i64)>, rhs: i64) -> Self {
        Self::new(terms, Comparison::Eq, rhs)
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn lhs(&self, values: &[bool]) -> i64 {
        self.terms.iter().filter(|&&(v, _)| values[v]).map(|&(_, a)| a).sum()
    }

    pub fn is_satisfied(&self, values: &[bool]) -> bool {
        let lhs = self.lhs(values);
        match self.cmp {
            Comparison::Le => lhs <= self.rhs,
            Comparison::Ge => lhs >= self.rhs,
            Comparison::Eq => lhs == self.rhs,
        }
    }
}

impl fmt::Display for LinearConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.name.is_empty() {
            write!(f, "{}: ", self.name)?;
        }
        if self.terms.is_empty() {
            write!(f, "0")?;
        }
        for (i, &(v, a)) in self.terms.iter().enumerate() {
            if i > 0 {
                write!(f, " + ")?;
            }
            write!(f, "{}·x{}", a, v)?;
        }
        write!(f, " {} {}", self.cmp, self.rhs)
    }
}

// Sum duplicate variables, drop zero coefficients, sort by variable.
fn merge_terms(terms: impl IntoIterator<Item = (VarId, i64)>) -> Vec<(VarId, i64)> {
    let mut terms = terms.into_iter().collect::<Vec<_>>();
    terms.sort_by_key(|&(v, _)| v);
    let mut merged: Vec<(VarId, i64)> = Vec::with_capacity(terms.len());
    for (v, a) in terms {
        match merged.last_mut() {
            Some((last, acc)) if *last == v => *acc += a,
            _ => merged.push((v, a)),
        }
    }
    merged.retain(|&(_, a)| a != 0);
    merged
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    pub values: Vec<bool>,
    pub objective: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveOutcome {
    Optimal(Solution),
    Infeasible,
    /// The time budget ran out, possibly after finding a feasible point.
    Timeout(Option<Solution>),
}

/// Minimization program over binary variables.
#[derive(Debug, Clone, Default)]
pub struct BinaryProgram {
    names: Vec<String>,
    constraints: Vec<LinearConstraint>,
    objective: Vec<i64>,
}

impl BinaryProgram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_var(&mut self, name: impl Into<String>) -> VarId {
        self.names.push(name.into());
        self.objective.push(0);
        self.names.len() - 1
    }

    pub fn num_vars(&self) -> usize {
        self.names.len()
    }

    pub fn var_name(&self, var: VarId) -> &str {
        &self.names[var]
    }

    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    pub fn add_constraint(&mut self, constraint: LinearConstraint) {
        debug!("ilp: add {}", constraint);
        debug_assert!(constraint.terms.iter().all(|&(v, _)| v < self.num_vars()));
        self.constraints.push(constraint);
    }

    /// Replace the objective with `Σ coeff·x`, to be minimized.
    pub fn set_objective(&mut self, terms: impl IntoIterator<Item = (VarId, i64)>) {
        self.objective.iter_mut().for_each(|c| *c = 0);
        for (v, a) in terms {
            self.objective[v] += a;
        }
    }

    pub fn objective_value(&self, values: &[bool]) -> i64 {
        self.objective.iter().zip(values).filter(|(_, &x)| x).map(|(&c, _)| c).sum()
    }

    pub fn is_feasible(&self, values: &[bool]) -> bool {
        values.len() == self.num_vars() && self.constraints.iter().all(|c| c.is_satisfied(values))
    }

    /// Solve with Z3's optimizing solver; `timeout_ms` bounds one call.
    pub fn solve(&self, timeout_ms: Option<u32>) -> SolveOutcome {
        let cfg = Config::new();
        let ctx = Context::new(&cfg);
        let opt = Optimize::new(&ctx);
        if let Some(ms) = timeout_ms {
            let mut params = Params::new(&ctx);
            params.set_u32("timeout", ms);
            opt.set_params(&params);
        }

        let vars = (0..self.num_vars())
            .map(|v| Bool::new_const(&ctx, format!("x{}_{}", v, self.names[v])))
            .collect::<Vec<_>>();
        let zero = Int::from_i64(&ctx, 0);
        let linear = |terms: &[(VarId, i64)]| {
            let summands = terms
                .iter()
                .map(|&(v, a)| vars[v].ite(&Int::from_i64(&ctx, a), &zero))
                .collect::<Vec<_>>();
            if summands.is_empty() {
                return zero.clone();
            }
            Int::add(&ctx, &summands.iter().collect::<Vec<_>>())
        };

        for c in &self.constraints {
            let lhs = linear(&c.terms);
            let rhs = Int::from_i64(&ctx, c.rhs);
            let row = match c.cmp {
                Comparison::Le => lhs.le(&rhs),
                Comparison::Ge => lhs.ge(&rhs),
                Comparison::Eq => lhs._eq(&rhs),
            };
            opt.assert(&row);
        }
        let cost = self
            .objective
            .iter()
            .enumerate()
            .filter(|(_, &c)| c != 0)
            .map(|(v, &c)| (v, c))
            .collect::<Vec<_>>();
        if !cost.is_empty() {
            opt.minimize(&linear(&cost));
        }

        let status = opt.check(&[]);
        let solution = match status {
            SatResult::Unsat => None,
            SatResult::Sat | SatResult::Unknown => opt.get_model().and_then(|model| {
                let values = vars
                    .iter()
                    .map(|x| model.eval(x, true).and_then(|b| b.as_bool()))
                    .collect::<Option<Vec<_>>>()?;
                self.is_feasible(&values).then(|| Solution {
                    objective: self.objective_value(&values),
                    values,
                })
            }),
        };
        debug!(
            "ilp: {} vars, {} constraints, {:?}, best = {:?}",
            self.num_vars(),
            self.constraints.len(),
            status,
            solution.as_ref().map(|s| s.objective)
        );

        match (status, solution) {
            (SatResult::Unsat, _) => SolveOutcome::Infeasible,
            (SatResult::Sat, Some(best)) => SolveOutcome::Optimal(best),
            (_, best) => SolveOutcome::Timeout(best),
        }
    }
}
