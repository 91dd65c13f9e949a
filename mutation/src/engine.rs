//! Mutation engine.
//!
//! Runs each request end to end inside one store transaction: normalize
//! the input, resolve it, assemble the response, commit. Any error drops
//! the transaction, which rolls back every write the request made.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value as Json;
use strata_core::{Clock, SystemClock};
use strata_registry::Registry;
use strata_store::{MemoryStore, Store, Transaction};
use tracing::{debug, instrument, warn};

use crate::config::EngineConfig;
use crate::error::{MutationError, MutationResult};
use crate::input::{NormalizedRequest, Normalizer};
use crate::request::{MutationKind, MutationRequest};
use crate::resolver::Resolver;
use crate::response::{Assembler, MutationResponse};
use crate::result::MutationOutcome;
use crate::selection::Selection;

/// Executes mutation requests against a store.
pub struct Engine<S: Store = MemoryStore> {
    registry: Arc<Registry>,
    store: S,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl Engine<MemoryStore> {
    /// An engine over a fresh in-memory store for `registry`.
    pub fn in_memory(registry: impl Into<Arc<Registry>>) -> Self {
        let registry = registry.into();
        let store = MemoryStore::for_registry(&registry);
        Self::new(registry, store)
    }
}

impl<S: Store> Engine<S> {
    pub fn new(registry: impl Into<Arc<Registry>>, store: S) -> Self {
        Self {
            registry: registry.into(),
            store,
            clock: Arc::new(SystemClock::new()),
            config: EngineConfig::default(),
        }
    }

    /// Replace the time source used for `created`/`updated` stamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Execute one mutation request atomically.
    #[instrument(skip_all, fields(kind = %request.kind, type_name = %request.type_name))]
    pub fn execute(&self, request: &MutationRequest) -> MutationResult<MutationOutcome> {
        let normalized = Normalizer::new(&self.registry, &self.config).normalize(
            request.kind,
            &request.type_name,
            &request.input,
        )?;
        let mut txn = self.store.begin()?;
        // read under the writer lock so commit order follows stamp order
        let now = self.clock.now();

        match self.run(txn.as_mut(), request, &normalized, now) {
            Ok(outcome) => {
                txn.commit()?;
                debug!(
                    created = outcome.effects.created.len(),
                    updated = outcome.effects.updated.len(),
                    deleted = outcome.effects.deleted.len(),
                    linked = outcome.effects.linked.len(),
                    unlinked = outcome.effects.unlinked.len(),
                    "mutation committed"
                );
                Ok(outcome)
            }
            Err(err) => {
                warn!(error = %err, "mutation rolled back");
                Err(err)
            }
        }
    }

    fn run(
        &self,
        txn: &mut dyn Transaction,
        request: &MutationRequest,
        normalized: &NormalizedRequest,
        now: DateTime<Utc>,
    ) -> MutationResult<MutationOutcome> {
        let mut resolver = Resolver::new(&self.registry, &mut *txn, now, &self.config);
        let resolution = resolver.resolve(normalized.type_id, &normalized.mutation)?;
        let effects = resolver.into_effects();

        let client_mutation_id = if self.config.echo_client_mutation_id {
            normalized.client_mutation_id.clone()
        } else {
            None
        };
        let response =
            Assembler::new(&self.registry, &*txn).assemble(request, &resolution, client_mutation_id)?;
        Ok(MutationOutcome { response, effects })
    }

    fn call(
        &self,
        kind: MutationKind,
        type_name: &str,
        input: Json,
        selection: &str,
    ) -> MutationResult<MutationResponse> {
        let request = MutationRequest::new(kind, type_name, input)
            .with_selection(Selection::parse(selection)?);
        Ok(self.execute(&request)?.response)
    }

    pub fn create(&self, type_name: &str, input: Json, selection: &str) -> MutationResult<MutationResponse> {
        self.call(MutationKind::Create, type_name, input, selection)
    }

    pub fn update(&self, type_name: &str, input: Json, selection: &str) -> MutationResult<MutationResponse> {
        self.call(MutationKind::Update, type_name, input, selection)
    }

    pub fn upsert(&self, type_name: &str, input: Json, selection: &str) -> MutationResult<MutationResponse> {
        self.call(MutationKind::Upsert, type_name, input, selection)
    }

    pub fn delete(&self, type_name: &str, input: Json, selection: &str) -> MutationResult<MutationResponse> {
        self.call(MutationKind::Delete, type_name, input, selection)
    }

    pub fn update_many(&self, type_name: &str, input: Json) -> MutationResult<MutationResponse> {
        self.call(MutationKind::UpdateMany, type_name, input, "")
    }

    pub fn delete_many(&self, type_name: &str, input: Json) -> MutationResult<MutationResponse> {
        self.call(MutationKind::DeleteMany, type_name, input, "")
    }

    /// Execute a mutation by its API operation name, such as `createUser`
    /// or `deleteManyUsers`. Bulk forms name the type by its plural.
    pub fn execute_operation(
        &self,
        operation: &str,
        input: Json,
        selection: &str,
    ) -> MutationResult<MutationResponse> {
        let (kind, subject) = MutationKind::parse_operation(operation).ok_or_else(|| {
            MutationError::validation(format!("unknown mutation {}", operation))
        })?;
        let type_name = if kind.is_bulk() {
            let plural = lower_first(subject);
            let type_id = self
                .registry
                .get_type_id_by_plural(&plural)
                .ok_or_else(|| MutationError::unknown_type(subject))?;
            self.registry.type_name(type_id).to_string()
        } else {
            subject.to_string()
        };
        self.call(kind, &type_name, input, selection)
    }

    /// Read entities of `type_name` (or its subtypes) matching `filter`,
    /// shaped by `selection`. Writes nothing.
    pub fn find(&self, type_name: &str, filter: Json, selection: &str) -> MutationResult<Vec<Json>> {
        let type_id = self
            .registry
            .get_type_id(type_name)
            .ok_or_else(|| MutationError::unknown_type(type_name))?;
        let condition = Normalizer::new(&self.registry, &self.config).selector(type_id, &filter)?;
        let selection = Selection::parse(selection)?;

        let txn = self.store.begin()?;
        let assembler = Assembler::new(&self.registry, txn.as_ref());
        let types = self.registry.concrete_types(type_id);
        let entities = txn.find_many(&types, &condition)?;
        entities
            .iter()
            .map(|entity| assembler.entity(entity, &selection))
            .collect()
    }
}

fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
