//! The turn API: flow registration, compiled-config caching, per-session
//! serialization and copy-on-write persistence.

use crate::advice::{AdviceTargeter, SelectedAdvice};
use crate::backend::{
    AdviceSource, ExtractedPair, ExtractionRequest, FieldExtractor, SessionStore,
};
use crate::compiler::{ConfigCache, FlowCompiler, validate};
use crate::config::EngineConfig;
use crate::engine::TransitionEngine;
use crate::error::{ConfigError, TurnError};
use crate::evaluator::ConceptMap;
use crate::flow::{FieldDefinition, StateMachineConfig};
use crate::rules::Answers;
use crate::session::{IdlePolicy, SessionController, SessionState, TurnOutcome, TurnStatus};
use ahash::AHashMap;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, info, warn};

/// How a flow's state machine is obtained.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowSource {
    /// A versioned field list, compiled on demand.
    Fields {
        version: u32,
        fields: Vec<FieldDefinition>,
    },
    /// A hand-authored, already validated machine.
    Authored(StateMachineConfig),
}

impl FlowSource {
    pub fn version(&self) -> u32 {
        match self {
            Self::Fields { version, .. } => *version,
            Self::Authored(config) => config.version,
        }
    }
}

struct LoadedSession {
    session: SessionState,
    entry: Arc<FlowEntry>,
    config: Arc<StateMachineConfig>,
}

#[derive(Debug)]
struct FlowEntry {
    source: FlowSource,
    concepts: ConceptMap,
}

/// Registered flows keyed by flow id.
#[derive(Debug, Default)]
pub struct FlowRegistry {
    flows: RwLock<AHashMap<String, Arc<FlowEntry>>>,
}

impl FlowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces a flow. Concept tags come from the field list, or
    /// from the collected fields of an authored machine.
    pub fn register(&self, flow_id: impl Into<String>, source: FlowSource) {
        let concepts = match &source {
            FlowSource::Fields { fields, .. } => ConceptMap::from_fields(fields),
            FlowSource::Authored(config) => ConceptMap::from_config(config),
        };
        let mut flows = self.flows.write().unwrap_or_else(PoisonError::into_inner);
        flows.insert(flow_id.into(), Arc::new(FlowEntry { source, concepts }));
    }

    pub fn version_of(&self, flow_id: &str) -> Option<u32> {
        self.get(flow_id).map(|entry| entry.source.version())
    }

    fn get(&self, flow_id: &str) -> Option<Arc<FlowEntry>> {
        let flows = self.flows.read().unwrap_or_else(PoisonError::into_inner);
        flows.get(flow_id).cloned()
    }
}

/// What the chat surface needs after a turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnResponse {
    pub status: TurnStatus,
    /// The state the session is now at (the completion state once completed).
    pub new_state_id: String,
    pub prompt_to_show: String,
    pub attached_advice: Vec<SelectedAdvice>,
    pub outcome: TurnOutcome,
}

/// Runs conversation turns against registered flows.
///
/// Turns for one session are serialized through a per-session lock; turns for
/// different sessions proceed in parallel. Each turn works on a copy of the
/// stored session, and the copy replaces the stored one only if `save`
/// succeeds, so a failed write leaves the previous snapshot intact and the
/// turn can be retried with the same input.
pub struct Orchestrator {
    config: EngineConfig,
    registry: FlowRegistry,
    cache: ConfigCache,
    store: Arc<dyn SessionStore>,
    advice: Arc<dyn AdviceSource>,
    locks: Mutex<AHashMap<String, Arc<Mutex<()>>>>,
}

impl Orchestrator {
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn SessionStore>,
        advice: Arc<dyn AdviceSource>,
    ) -> Self {
        Self {
            config,
            registry: FlowRegistry::new(),
            cache: ConfigCache::new(),
            store,
            advice,
            locks: Mutex::new(AHashMap::new()),
        }
    }

    pub fn engine_config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &FlowRegistry {
        &self.registry
    }

    /// Registers a field list. Registering a new version makes the next turn
    /// recompile.
    pub fn register_fields(&self, flow_id: impl Into<String>, version: u32, fields: Vec<FieldDefinition>) {
        self.registry
            .register(flow_id, FlowSource::Fields { version, fields });
    }

    /// Registers a hand-authored machine after validating it.
    pub fn register_config(&self, config: StateMachineConfig) -> Result<(), ConfigError> {
        validate(&config)?;
        self.registry
            .register(config.id.clone(), FlowSource::Authored(config));
        Ok(())
    }

    /// The compiled machine for the flow's current version.
    pub fn config_for(&self, flow_id: &str) -> Result<Arc<StateMachineConfig>, TurnError> {
        let entry = self
            .registry
            .get(flow_id)
            .ok_or_else(|| TurnError::UnknownFlow(flow_id.to_string()))?;
        self.compiled(flow_id, &entry)
    }

    fn compiled(&self, flow_id: &str, entry: &FlowEntry) -> Result<Arc<StateMachineConfig>, TurnError> {
        let config = match &entry.source {
            FlowSource::Fields { version, fields } => {
                self.cache.get_or_compile(flow_id, *version, || {
                    FlowCompiler::builder(fields.clone())
                        .with_flow_id(flow_id)
                        .with_version(*version)
                        .with_config(&self.config)
                        .build()
                        .compile()
                })?
            }
            FlowSource::Authored(config) => self
                .cache
                .get_or_compile(flow_id, config.version, || Ok(config.clone()))?,
        };
        Ok(config)
    }

    /// Runs `f` while holding the lock of `session_id`. The table entry is
    /// dropped again once no other turn for the session is waiting on it.
    fn with_session_lock<T>(&self, session_id: &str, f: impl FnOnce() -> T) -> T {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(session_id.to_string()).or_default())
        };
        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };

        // Clones are only handed out under the table lock, so a count of two
        // (table plus `lock`) means no one else holds or waits for it.
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        let idle = locks
            .get(session_id)
            .is_some_and(|entry| Arc::ptr_eq(entry, &lock) && Arc::strong_count(&lock) == 2);
        if idle {
            locks.remove(session_id);
        }
        result
    }

    /// Number of sessions with a turn in flight or queued.
    pub fn locked_sessions(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn controller<'a>(
        &self,
        config: &'a StateMachineConfig,
        concepts: &'a ConceptMap,
    ) -> SessionController<'a> {
        let mut engine = TransitionEngine::new(config).with_concepts(concepts);
        if let Some(hops) = self.config.max_cascade_hops {
            engine = engine.with_max_hops(hops);
        }
        SessionController::with_engine(engine)
    }

    /// Opens a new session on `flow_id`, optionally seeded with answers known
    /// from elsewhere.

    /// Opens a new session on `flow_id`, optionally seeded with answers known
    /// from elsewhere.
    pub fn start_session(
        &self,
        flow_id: &str,
        session_id: &str,
        prefilled: Answers,
    ) -> Result<TurnResponse, TurnError> {
        self.with_session_lock(session_id, || -> Result<TurnResponse, TurnError> {
            if self.store.load(session_id)?.is_some() {
                return Err(TurnError::SessionExists(session_id.to_string()));
            }
            let entry = self
                .registry
                .get(flow_id)
                .ok_or_else(|| TurnError::UnknownFlow(flow_id.to_string()))?;
            let config = self.compiled(flow_id, &entry)?;

            let (session, outcome) =
                self.controller(&config, &entry.concepts)
                    .start(session_id, prefilled, Utc::now())?;
            self.store.save(session_id, &session)?;
            self.respond(&config, &entry.concepts, &session, outcome)
        })
    }

    /// Applies one turn of extracted pairs to a stored session.
    pub fn process_turn(
        &self,
        session_id: &str,
        pairs: &[ExtractedPair],
        raw_text: Option<&str>,
    ) -> Result<TurnResponse, TurnError> {
        self.process_turn_at(session_id, pairs, raw_text, Utc::now())
    }

    pub fn process_turn_at(
        &self,
        session_id: &str,
        pairs: &[ExtractedPair],
        raw_text: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<TurnResponse, TurnError> {
        self.with_session_lock(session_id, || -> Result<TurnResponse, TurnError> {
            let loaded = self.load_session(session_id)?;
            self.apply_locked(loaded, pairs, raw_text, now)
        })
    }

    /// Extracts pairs from free text with `extractor`, then runs the turn.
    /// Extraction sees the same snapshot the turn is applied to.
    pub fn process_utterance(
        &self,
        session_id: &str,
        text: &str,
        extractor: &dyn FieldExtractor,
    ) -> Result<TurnResponse, TurnError> {
        self.with_session_lock(session_id, || -> Result<TurnResponse, TurnError> {
            let loaded = self.load_session(session_id)?;
            let state = TransitionEngine::new(&loaded.config).state(&loaded.session.current_state_id)?;
            let vocabulary = loaded.config.vocabulary();

            let result = extractor.extract(&ExtractionRequest {
                text,
                collects: &state.collects,
                choices: &state.choices,
                vocabulary: &vocabulary,
            });
            if result.failed {
                debug!(session_id, "Extraction failed; treating turn as unsatisfied");
            }
            let pairs: Vec<ExtractedPair> = result
                .usable_pairs()
                .map(|(key, value)| ExtractedPair::new(key, value))
                .collect();
            self.apply_locked(loaded, &pairs, Some(text), Utc::now())
        })
    }

    /// Marks the session abandoned if it has been idle past the configured
    /// timeout. Returns `true` if it was abandoned by this call.
    pub fn abandon_if_idle(&self, session_id: &str, now: DateTime<Utc>) -> Result<bool, TurnError> {
        self.with_session_lock(session_id, || -> Result<bool, TurnError> {
            let mut working = self
                .store
                .load(session_id)?
                .ok_or_else(|| TurnError::SessionNotFound(session_id.to_string()))?;
            if !working.abandon_if_idle(now, &IdlePolicy::from(&self.config)) {
                return Ok(false);
            }
            self.store.save(session_id, &working)?;
            Ok(true)
        })
    }

    pub fn session(&self, session_id: &str) -> Result<Option<SessionState>, TurnError> {
        Ok(self.store.load(session_id)?)
    }

    /// Loads a session with its flow entry and compiled machine. Callers hold
    /// the session lock.
    fn load_session(&self, session_id: &str) -> Result<LoadedSession, TurnError> {
        let session = self
            .store
            .load(session_id)?
            .ok_or_else(|| TurnError::SessionNotFound(session_id.to_string()))?;
        let entry = self
            .registry
            .get(&session.flow_id)
            .ok_or_else(|| TurnError::UnknownFlow(session.flow_id.clone()))?;
        let config = self.compiled(&session.flow_id, &entry)?;
        Ok(LoadedSession {
            session,
            entry,
            config,
        })
    }

    /// Runs the turn on a copy of the loaded session and commits it with `save`.
    fn apply_locked(
        &self,
        loaded: LoadedSession,
        pairs: &[ExtractedPair],
        raw_text: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<TurnResponse, TurnError> {
        let LoadedSession {
            session: stored,
            entry,
            config,
        } = loaded;
        let session_id = stored.session_id.clone();
        if let Some(text) = raw_text {
            debug!(session_id = %session_id, chars = text.chars().count(), "Turn carries raw text");
        }

        let already_closed = stored.status.is_closed();
        let mut working = stored;
        let outcome = self.controller(&config, &entry.concepts).apply_turn(
            &mut working,
            pairs
                .iter()
                .map(|p| (p.mapping_key.as_str(), p.value.as_str())),
            now,
        )?;

        // A completed session is answered without mutation, so nothing to commit.
        if !already_closed {
            self.store.save(&session_id, &working)?;
        }
        self.respond(&config, &entry.concepts, &working, outcome)
    }

    fn respond(
        &self,
        config: &StateMachineConfig,
        concepts: &ConceptMap,
        session: &SessionState,
        outcome: TurnOutcome,
    ) -> Result<TurnResponse, TurnError> {
        let state = TransitionEngine::new(config).state(&session.current_state_id)?;

        let attached_advice = if outcome.is_completed() {
            Vec::new()
        } else {
            match self.advice.snapshot(&config.id, session) {
                Ok(items) => AdviceTargeter::new(self.config.advice_limit_per_state)
                    .with_concepts(concepts)
                    .select_for_state(&items, state, &session.answers),
                Err(e) => {
                    warn!(error = %e, session_id = %session.session_id, "Advice snapshot unavailable");
                    Vec::new()
                }
            }
        };

        if outcome.is_completed() {
            info!(session_id = %session.session_id, flow_id = %config.id, "Conversation completed");
        }
        Ok(TurnResponse {
            status: outcome.status(),
            new_state_id: state.id.clone(),
            prompt_to_show: state.prompt.clone(),
            attached_advice,
            outcome,
        })
    }
}
