use crate::bdd::BddConfig;
use crate::order::OrderStrategy;

/// Knobs for the whole analysis pipeline.
///
/// ```
/// use petri_reach::config::AnalysisConfig;
///
/// let config = AnalysisConfig::default().with_seed(7).with_max_attempts(10);
/// assert_eq!(config.seed, 7);
/// assert_eq!(config.max_attempts, 10);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Initial unique table has `2^storage_bits` buckets.
    pub storage_bits: usize,
    /// Computed table has `2^cache_bits` slots.
    pub cache_bits: usize,
    pub order: OrderStrategy,
    /// Cap on fixpoint iterations; `None` runs to the fixpoint.
    pub max_iterations: Option<usize>,
    /// Candidate markings tried by the deadlock search before giving up.
    pub max_attempts: usize,
    /// Add P-invariant equalities to the deadlock program.
    pub use_invariants: bool,
    /// Seed of the random objectives used by the deadlock search.
    pub seed: u64,
    /// Time budget of one ILP solve in milliseconds; `None` solves to optimality.
    pub ilp_timeout_ms: Option<u32>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            storage_bits: 16,
            cache_bits: 16,
            order: OrderStrategy::Bfs,
            max_iterations: None,
            max_attempts: 100,
            use_invariants: true,
            seed: 42,
            ilp_timeout_ms: None,
        }
    }
}

impl AnalysisConfig {
    pub fn with_storage_bits(mut self, bits: usize) -> Self {
        self.storage_bits = bits;
        self
    }

    pub fn with_cache_bits(mut self, bits: usize) -> Self {
        self.cache_bits = bits;
        self
    }

    pub fn with_order(mut self, order: OrderStrategy) -> Self {
        self.order = order;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: Option<usize>) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_invariants(mut self, use_invariants: bool) -> Self {
        self.use_invariants = use_invariants;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_ilp_timeout_ms(mut self, ms: u32) -> Self {
        self.ilp_timeout_ms = Some(ms);
        self
    }

    pub fn bdd_config(&self) -> BddConfig {
        BddConfig {
            storage_bits: self.storage_bits,
            cache_bits: self.cache_bits,
        }
    }
}
