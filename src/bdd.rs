//! The BDD manager.
//!
//! All diagrams built for one analysis live in a single [`Bdd`] manager, which
//! hash-conses nodes (so structural equality of [`Ref`]s is semantic equality)
//! and memoizes ITE results in a computed table.
//!
//! Variables are 1-indexed `u32`s and the variable id *is* the order: a node
//! labelled `v` only has children labelled with variables `> v`. Mapping places
//! onto variable ids is the job of [`VariableOrder`][crate::order::VariableOrder].
//!
//! Edges may be complemented (negative [`Ref`]s). To keep the representation
//! canonical, the high edge of a stored node is never complemented.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt::Debug;

use log::debug;

use crate::cache::Cache;
use crate::node::Node;
use crate::reference::Ref;
use crate::table::Table;
use crate::utils::{pairing3, MyHash};

type Storage = Table<Node>;

impl Storage {
    pub fn variable(&self, index: u32) -> u32 {
        self.value(index as usize).variable
    }
    pub fn low(&self, index: u32) -> Ref {
        self.value(index as usize).low
    }
    pub fn high(&self, index: u32) -> Ref {
        self.value(index as usize).high
    }
}

#[derive(Debug, Eq, PartialEq, Clone)]
pub enum OpKey {
    Ite(Ref, Ref, Ref),
}

impl MyHash for OpKey {
    fn hash(&self) -> u64 {
        match self {
            OpKey::Ite(f, g, h) => pairing3(
                f.unsigned() as u64,
                g.unsigned() as u64,
                h.unsigned() as u64,
            ),
        }
    }
}

/// Sizing of the manager's tables.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BddConfig {
    /// The unique table has `2^storage_bits` buckets.
    pub storage_bits: usize,
    /// The computed table has `2^cache_bits` slots.
    pub cache_bits: usize,
}

impl Default for BddConfig {
    fn default() -> Self {
        Self {
            storage_bits: 16,
            cache_bits: 16,
        }
    }
}

pub struct Bdd {
    storage: RefCell<Storage>,
    cache: RefCell<Cache<OpKey, Ref>>,
    pub zero: Ref,
    pub one: Ref,
}

impl Bdd {
    pub fn with_config(config: BddConfig) -> Self {
        let mut storage = Storage::new(config.storage_bits);

        // Allocate the terminal node:
        let one = storage.push(Node::default());
        assert_eq!(one, 1); // Make sure the terminal node is (1).
        let one = Ref::positive(one as u32);
        let zero = -one;

        Self {
            storage: RefCell::new(storage),
            cache: RefCell::new(Cache::new(config.cache_bits)),
            zero,
            one,
        }
    }
}

impl Default for Bdd {
    fn default() -> Self {
        Bdd::with_config(BddConfig::default())
    }
}

impl Debug for Bdd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let storage = self.storage.borrow();
        let cache = self.cache.borrow();
        f.debug_struct("Bdd")
            .field("nodes", &storage.size())
            .field("buckets", &storage.num_buckets())
            .field("cache_hits", &cache.hits())
            .field("cache_misses", &cache.misses())
            .finish()
    }
}

impl Bdd {
    pub fn cache_hits(&self) -> usize {
        self.cache.borrow().hits()
    }
    pub fn cache_misses(&self) -> usize {
        self.cache.borrow().misses()
    }

    pub fn variable(&self, index: u32) -> u32 {
        self.storage.borrow().variable(index)
    }
    pub fn low(&self, index: u32) -> Ref {
        self.storage.borrow().low(index)
    }
    pub fn high(&self, index: u32) -> Ref {
        self.storage.borrow().high(index)
    }

    pub fn low_node(&self, node: Ref) -> Ref {
        let low = self.low(node.index());
        if node.is_negated() {
            -low
        } else {
            low
        }
    }
    pub fn high_node(&self, node: Ref) -> Ref {
        let high = self.high(node.index());
        if node.is_negated() {
            -high
        } else {
            high
        }
    }

    pub fn is_zero(&self, node: Ref) -> bool {
        node == self.zero
    }
    pub fn is_one(&self, node: Ref) -> bool {
        node == self.one
    }
    pub fn is_terminal(&self, node: Ref) -> bool {
        self.is_zero(node) || self.is_one(node)
    }

    pub fn mk_node(&self, v: u32, low: Ref, high: Ref) -> Ref {
        debug!("mk(v = {}, low = {}, high = {})", v, low, high);

        assert_ne!(v, 0, "Variable index should not be zero");

        // Handle canonicity
        if high.is_negated() {
            debug!("mk: restoring canonicity");
            return -self.mk_node(v, -low, -high);
        }

        // Handle duplicates
        if low == high {
            debug!("mk: duplicates {} == {}", low, high);
            return low;
        }

        let i = self.storage.borrow_mut().put(Node {
            variable: v,
            low,
            high,
        });
        Ref::positive(i as u32)
    }

    pub fn mk_var(&self, v: u32) -> Ref {
        assert_ne!(v, 0, "Variable index should not be zero");
        self.mk_node(v, self.zero, self.one)
    }

    /// Conjunction of literals, given as signed variable ids.
    pub fn cube(&self, literals: impl IntoIterator<Item = i32>) -> Ref {
        let mut literals = literals.into_iter().collect::<Vec<_>>();
        literals.sort_by_key(|&v| v.abs());
        debug!("cube(literals = {:?})", literals);
        literals.reverse();
        let mut current = self.one;
        for lit in literals {
            assert_ne!(lit, 0, "Variable index should not be zero");
            current = if lit < 0 {
                self.mk_node(lit.unsigned_abs(), current, self.zero)
            } else {
                self.mk_node(lit as u32, self.zero, current)
            };
        }
        current
    }

    pub fn top_cofactors(&self, node: Ref, v: u32) -> (Ref, Ref) {
        assert_ne!(v, 0, "Variable index should not be zero");

        let i = node.index();
        if self.is_terminal(node) || v < self.variable(i) {
            return (node, node);
        }
        assert_eq!(v, self.variable(i));
        if node.is_negated() {
            (-self.low(i), -self.high(i))
        } else {
            (self.low(i), self.high(i))
        }
    }

    /// Apply the ITE operation to the arguments.
    ///
    /// ```text
    /// ITE(x, y, z) = (x ∧ y) ∨ (¬x ∧ z)
    /// ```
    ///
    /// # Examples
    ///
    /// ```
    /// use petri_reach::bdd::Bdd;
    ///
    /// let bdd = Bdd::default();
    /// let x = bdd.mk_var(1);
    /// let y = bdd.mk_var(2);
    /// let z = bdd.mk_var(3);
    /// let f = bdd.apply_ite(x, y, z);
    /// let x_and_y = bdd.apply_and(x, y);
    /// let not_x_and_z = bdd.apply_and(-x, z);
    /// assert_eq!(f, bdd.apply_or(x_and_y, not_x_and_z));
    /// ```
    pub fn apply_ite(&self, f: Ref, g: Ref, h: Ref) -> Ref {
        debug!("apply_ite(f = {}, g = {}, h = {})", f, g, h);

        // Base cases:
        //   ite(1,G,H) => G
        //   ite(0,G,H) => H
        if self.is_one(f) {
            return g;
        }
        if self.is_zero(f) {
            return h;
        }

        // From now on, F is known not to be a constant

        // More base cases:
        //   ite(F,G,G) => G
        //   ite(F,1,0) => F
        //   ite(F,0,1) => ~F
        //   ite(F,1,~F) => 1
        //   ite(F,F,1) => 1
        //   ite(F,~F,0) => 0
        //   ite(F,0,F) => F
        if g == h {
            return g;
        }
        if self.is_one(g) && self.is_zero(h) {
            return f;
        }
        if self.is_zero(g) && self.is_one(h) {
            return -f;
        }
        if self.is_one(g) && h == -f {
            return self.one;
        }
        if g == f && self.is_one(h) {
            return self.one;
        }
        if g == -f && self.is_zero(h) {
            return self.zero;
        }
        if self.is_zero(g) && h == f {
            return f;
        }

        // Standard triples:
        //   ite(F,F,H) => ite(F,1,H)
        //   ite(F,G,F) => ite(F,G,0)
        //   ite(F,~F,H) => ite(F,0,H)
        //   ite(F,G,~F) => ite(F,G,1)
        if g == f {
            return self.apply_ite(f, self.one, h);
        }
        if h == f {
            return self.apply_ite(f, g, self.zero);
        }
        if g == -f {
            return self.apply_ite(f, self.zero, h);
        }
        if h == -f {
            return self.apply_ite(f, g, self.one);
        }

        let i = self.variable(f.index());
        let j = self.variable(g.index());
        let k = self.variable(h.index());
        assert_ne!(i, 0);

        // Equivalent pairs:
        //   ite(F,1,H) == ite(H,1,F) == F ∨ H
        //   ite(F,G,0) == ite(G,F,0) == F ∧ G
        //   ite(F,G,1) == ite(~G,~F,1) == F -> G
        //   ite(F,0,H) == ite(~H,0,~F) == ~F ∧ H
        //   ite(F,G,~G) == ite(G,F,~F)
        // (choose the one with the lowest variable)
        if self.is_one(g) && k != 0 && k < i {
            return self.apply_ite(h, self.one, f);
        }
        if self.is_zero(h) && j != 0 && j < i {
            return self.apply_ite(g, f, self.zero);
        }
        if self.is_one(h) && j != 0 && j < i {
            return self.apply_ite(-g, -f, self.one);
        }
        if self.is_zero(g) && k != 0 && k < i {
            return self.apply_ite(-h, self.zero, -f);
        }
        if g == -h && j != 0 && j < i {
            return self.apply_ite(g, f, -f);
        }

        // Make sure the first two pointers (f and g) are regular (not negated)
        let (mut f, mut g, mut h) = (f, g, h);

        // ite(~F,G,H) => ite(F,H,G)
        if f.is_negated() {
            f = -f;
            std::mem::swap(&mut g, &mut h);
        }

        // ite(F,~G,H) => ~ite(F,G,~H)
        let mut n = false;
        if g.is_negated() {
            n = true;
            g = -g;
            h = -h;
        }

        let key = OpKey::Ite(f, g, h);
        if let Some(&res) = self.cache.borrow().get(&key) {
            debug!("cache: apply_ite(f = {}, g = {}, h = {}) -> {}", f, g, h, res);
            return if n { -res } else { res };
        }

        // Determine the top variable:
        let mut m = i;
        if j != 0 {
            m = m.min(j);
        }
        if k != 0 {
            m = m.min(k);
        }
        assert_ne!(m, 0);

        let (f0, f1) = self.top_cofactors(f, m);
        let (g0, g1) = self.top_cofactors(g, m);
        let (h0, h1) = self.top_cofactors(h, m);

        let e = self.apply_ite(f0, g0, h0);
        let t = self.apply_ite(f1, g1, h1);

        let res = self.mk_node(m, e, t);
        debug!("computed: apply_ite(f = {}, g = {}, h = {}) -> {}", f, g, h, res);
        self.cache.borrow_mut().insert(key, res);

        if n {
            -res
        } else {
            res
        }
    }

    pub fn apply_and(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, self.zero)
    }

    pub fn apply_or(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, self.one, v)
    }

    /// Set difference `u ∧ ¬v`.
    pub fn apply_diff(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(v, self.zero, u)
    }

    pub fn apply_or_many(&self, nodes: impl IntoIterator<Item = Ref>) -> Ref {
        let mut res = self.zero;
        for node in nodes.into_iter() {
            res = self.apply_or(res, node);
        }
        res
    }

    /// Existential quantification `∃vars. f`.
    pub fn exists(&self, f: Ref, vars: impl IntoIterator<Item = u32>) -> Ref {
        let mut vars = vars.into_iter().collect::<Vec<_>>();
        vars.sort_unstable();
        vars.dedup();
        debug!("exists(f = {}, vars = {:?})", f, vars);
        let mut cache = HashMap::new();
        self.exists_(f, &vars, &mut cache)
    }

    fn exists_(&self, f: Ref, vars: &[u32], cache: &mut HashMap<Ref, Ref>) -> Ref {
        if self.is_terminal(f) {
            return f;
        }

        let i = self.variable(f.index());
        // Variables above `i` cannot appear below `f`.
        let vars = &vars[vars.partition_point(|&v| v < i)..];
        if vars.is_empty() {
            return f;
        }

        if let Some(&res) = cache.get(&f) {
            return res;
        }

        let low = self.exists_(self.low_node(f), vars, cache);
        let high = self.exists_(self.high_node(f), vars, cache);
        let res = if vars[0] == i {
            self.apply_or(low, high)
        } else {
            self.mk_node(i, low, high)
        };
        cache.insert(f, res);
        res
    }

    /// Cofactor of `f` with respect to several variables at once.
    pub fn restrict_multi(&self, f: Ref, values: &HashMap<u32, bool>) -> Ref {
        let mut cache = HashMap::new();
        self.restrict_multi_(f, values, &mut cache)
    }

    fn restrict_multi_(&self, f: Ref, values: &HashMap<u32, bool>, cache: &mut HashMap<Ref, Ref>) -> Ref {
        if self.is_terminal(f) || values.is_empty() {
            return f;
        }

        if let Some(&res) = cache.get(&f) {
            return res;
        }

        let i = self.variable(f.index());
        let res = match values.get(&i) {
            Some(true) => self.restrict_multi_(self.high_node(f), values, cache),
            Some(false) => self.restrict_multi_(self.low_node(f), values, cache),
            None => {
                let low = self.restrict_multi_(self.low_node(f), values, cache);
                let high = self.restrict_multi_(self.high_node(f), values, cache);
                self.mk_node(i, low, high)
            }
        };
        cache.insert(f, res);
        res
    }

    /// Cofactor of `f` with respect to a cube given as signed variable ids.
    ///
    /// With a literal for every variable in the support, the result is a terminal.
    pub fn cofactor_cube(&self, f: Ref, literals: impl IntoIterator<Item = i32>) -> Ref {
        let values = literals
            .into_iter()
            .map(|lit| {
                assert_ne!(lit, 0, "Variable index should not be zero");
                (lit.unsigned_abs(), lit > 0)
            })
            .collect::<HashMap<_, _>>();
        self.restrict_multi(f, &values)
    }

    /// Indices of all nodes reachable from `nodes`, the terminal included.
    pub fn descendants(&self, nodes: impl IntoIterator<Item = Ref>) -> HashSet<u32> {
        let mut visited = HashSet::new();
        visited.insert(self.one.index());
        let mut queue = VecDeque::from_iter(nodes);

        while let Some(node) = queue.pop_front() {
            let i = node.index();
            if visited.insert(i) {
                queue.push_back(self.low(i));
                queue.push_back(self.high(i));
            }
        }

        visited
    }

    /// Number of distinct nodes in `f`, the terminal included.
    pub fn size(&self, f: Ref) -> usize {
        self.descendants([f]).len()
    }

    /// Variables tested on some path from `f`.
    pub fn support(&self, f: Ref) -> BTreeSet<u32> {
        self.descendants([f])
            .into_iter()
            .filter(|&i| i != self.one.index())
            .map(|i| self.variable(i))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_var() {
        let bdd = Bdd::default();

        let x = bdd.mk_var(1);

        assert_eq!(bdd.variable(x.index()), 1);
        assert_eq!(bdd.high_node(x), bdd.one);
        assert_eq!(bdd.low_node(x), bdd.zero);
    }

    #[test]
    fn test_not_var() {
        let bdd = Bdd::default();

        let x = bdd.mk_var(1);
        let not_x = -x;

        assert_eq!(bdd.variable(not_x.index()), 1);
        assert_eq!(bdd.high_node(not_x), bdd.zero);
        assert_eq!(bdd.low_node(not_x), bdd.one);
    }

    #[test]
    fn test_terminal() {
        let bdd = Bdd::default();

        assert!(bdd.is_terminal(bdd.zero));
        assert!(bdd.is_zero(bdd.zero));
        assert!(!bdd.is_one(bdd.zero));

        assert!(bdd.is_terminal(bdd.one));
        assert!(bdd.is_one(bdd.one));

        assert_eq!(bdd.variable(bdd.one.index()), 0);
    }

    #[test]
    fn test_cube() {
        let bdd = Bdd::default();

        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);
        let x3 = bdd.mk_var(3);

        let f = bdd.apply_and(bdd.apply_and(x1, x2), x3);
        assert_eq!(f, bdd.cube([1, 2, 3]));

        let f = bdd.apply_and(bdd.apply_and(x1, -x2), -x3);
        assert_eq!(f, bdd.cube([-3, 1, -2]));

        assert_eq!(bdd.cube([]), bdd.one);
    }

    #[test]
    fn test_de_morgan() {
        let bdd = Bdd::default();

        let x = bdd.mk_var(1);
        let y = bdd.mk_var(2);

        assert_eq!(-bdd.apply_and(x, y), bdd.apply_or(-x, -y));
        assert_eq!(-bdd.apply_or(x, y), bdd.apply_and(-x, -y));
    }

    #[test]
    fn test_apply_ite() {
        let bdd = Bdd::default();

        let g = bdd.mk_var(2);
        let h = bdd.mk_var(3);
        assert_eq!(bdd.apply_ite(bdd.one, g, h), g);
        assert_eq!(bdd.apply_ite(bdd.zero, g, h), h);

        let f = bdd.mk_node(1, bdd.one, h);
        assert_eq!(bdd.apply_ite(f, f, h), bdd.apply_or(f, h));
        assert_eq!(bdd.apply_ite(f, g, f), bdd.apply_and(f, g));
        assert_eq!(bdd.apply_ite(f, -g, bdd.one), -bdd.apply_and(f, g));
        assert_eq!(bdd.apply_ite(f, bdd.zero, -h), -bdd.apply_or(f, h));

        let f = bdd.mk_var(6);
        let g = bdd.mk_var(7);
        let h = bdd.mk_var(8);
        let result = bdd.mk_node(bdd.variable(f.index()), -g, -h);
        assert_eq!(bdd.apply_ite(-f, -g, -h), result);
    }

    #[test]
    fn test_diff() {
        let bdd = Bdd::default();

        let x = bdd.mk_var(1);
        let y = bdd.mk_var(2);
        let f = bdd.apply_or(x, y);

        assert_eq!(bdd.apply_diff(f, x), bdd.apply_and(-x, y));
        assert_eq!(bdd.apply_diff(f, f), bdd.zero);
        assert_eq!(bdd.apply_diff(f, bdd.zero), f);
    }

    #[test]
    fn test_exists() {
        let bdd = Bdd::default();

        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);
        let x3 = bdd.mk_var(3);

        // ∃x2. (x1 ∧ x2 ∧ ¬x3) = x1 ∧ ¬x3
        let f = bdd.apply_and(bdd.apply_and(x1, x2), -x3);
        assert_eq!(bdd.exists(f, [2]), bdd.apply_and(x1, -x3));

        // ∃x1,x3. (x1 ∧ x2 ∧ ¬x3) = x2
        assert_eq!(bdd.exists(f, [3, 1]), x2);

        // Quantifying a variable outside the support changes nothing.
        let g = bdd.apply_and(x1, x2);
        assert_eq!(bdd.exists(g, [3]), g);

        // ∃x1. (x1 xor x2) = 1
        assert_eq!(bdd.exists(bdd.apply_ite(x1, -x2, x2), [1]), bdd.one);
    }

    #[test]
    fn test_exists_under_complement() {
        let bdd = Bdd::default();

        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);

        // ∃x2. ¬(x1 ∧ x2) = 1
        let f = -bdd.apply_and(x1, x2);
        assert_eq!(bdd.exists(f, [2]), bdd.one);
        // ∃x1. ¬(x1 ∨ x2) = ¬x2
        let g = -bdd.apply_or(x1, x2);
        assert_eq!(bdd.exists(g, [1]), -x2);
    }

    #[test]
    fn test_restrict_multi() {
        let bdd = Bdd::default();

        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);
        let x3 = bdd.mk_var(3);
        let x4 = bdd.mk_var(4);

        let values = HashMap::from([(2, true), (4, false)]);

        let f = bdd.apply_and(bdd.apply_and(-x1, x2), bdd.apply_and(x3, -x4));
        let g = bdd.restrict_multi(f, &values);
        assert_eq!(g, bdd.apply_and(-x1, x3));

        let full = HashMap::from([(1, false), (2, true), (3, true), (4, false)]);
        assert_eq!(bdd.restrict_multi(f, &full), bdd.one);
        let other = HashMap::from([(1, true), (2, true), (3, true), (4, false)]);
        assert_eq!(bdd.restrict_multi(f, &other), bdd.zero);
    }

    #[test]
    fn test_cofactor_cube() {
        let bdd = Bdd::default();

        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);
        let f = bdd.apply_and(x1, -x2);

        assert!(bdd.is_one(bdd.cofactor_cube(f, [1, -2])));
        assert!(bdd.is_zero(bdd.cofactor_cube(f, [1, 2])));
        assert_eq!(bdd.cofactor_cube(f, [1]), -x2);
    }

    #[test]
    fn test_support() {
        let bdd = Bdd::default();

        let x1 = bdd.mk_var(1);
        let x3 = bdd.mk_var(3);
        let f = bdd.apply_or(x1, -x3);

        assert_eq!(bdd.support(f), BTreeSet::from([1, 3]));
        assert!(bdd.support(bdd.one).is_empty());
        assert!(bdd.support(bdd.zero).is_empty());
    }

    #[test]
    fn test_size_and_sharing() {
        let bdd = Bdd::default();

        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);
        let f = bdd.apply_and(x1, x2);
        let g = bdd.apply_and(x2, x1);

        assert_eq!(f, g);
        // two decision nodes and the terminal
        assert_eq!(bdd.size(f), 3);
    }
}
