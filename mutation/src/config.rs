//! Engine configuration.

/// What a nested `update` does when the relation has no linked entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingTargetPolicy {
    /// Skip the update, like `disconnect` on an empty relation.
    #[default]
    Ignore,
    /// Fail with a not-found error.
    Error,
}

/// Configuration for an [`Engine`](crate::Engine).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum nesting depth of an input tree.
    pub max_depth: usize,
    /// Behaviour of nested to-one `update` against an empty relation.
    pub missing_nested_target: MissingTargetPolicy,
    /// Whether `clientMutationId` is echoed in responses.
    pub echo_client_mutation_id: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: 32,
            missing_nested_target: MissingTargetPolicy::Ignore,
            echo_client_mutation_id: true,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_missing_nested_target(mut self, policy: MissingTargetPolicy) -> Self {
        self.missing_nested_target = policy;
        self
    }

    pub fn with_echo_client_mutation_id(mut self, echo: bool) -> Self {
        self.echo_client_mutation_id = echo;
        self
    }
}
