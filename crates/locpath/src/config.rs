/// Engine tuning knobs shared by every cursor driven through one [`EvalContext`].
///
/// [`EvalContext`]: crate::context::EvalContext
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Recycle detached cursors through the [`CursorPool`](crate::pool::CursorPool).
    pub pooling: bool,
    /// Maximum number of idle cursors kept per template.
    pub pool_capacity: usize,
    /// Upper bound on candidates visited by reverse-axis recounts during one
    /// top-level evaluation, nested path predicates included. `None` leaves
    /// recounts unbounded.
    pub recount_limit: Option<usize>,
    /// Maximum number of predicates on a single step.
    pub max_predicate_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { pooling: true, pool_capacity: 8, recount_limit: None, max_predicate_depth: 32 }
    }
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::new()
    }
}

#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    cfg: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn new() -> Self {
        Self { cfg: EngineConfig::default() }
    }

    pub fn with_pooling(mut self, enabled: bool) -> Self {
        self.cfg.pooling = enabled;
        self
    }

    pub fn with_pool_capacity(mut self, capacity: usize) -> Self {
        self.cfg.pool_capacity = capacity;
        self
    }

    pub fn with_recount_limit(mut self, limit: usize) -> Self {
        self.cfg.recount_limit = Some(limit);
        self
    }

    pub fn with_max_predicate_depth(mut self, depth: usize) -> Self {
        self.cfg.max_predicate_depth = depth;
        self
    }

    pub fn build(self) -> EngineConfig {
        self.cfg
    }
}
