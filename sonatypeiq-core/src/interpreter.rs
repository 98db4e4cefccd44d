//! Interpreter - Execute Effects using a Provider
//!
//! The Interpreter executes Effects contained in a Plan in order,
//! collecting the results. This is where side effects actually occur.
//! References are resolved right before each Effect runs, so values
//! produced by earlier Effects (e.g., a new organization id) flow into
//! later ones.

use log::debug;

use crate::binding::{Bindings, unresolved_references};
use crate::effect::Effect;
use crate::plan::Plan;
use crate::provider::{Provider, ProviderError, ProviderResult};
use crate::resource::{Diagnostic, Resource, ResourceId, State};

/// Result of executing each Effect
#[derive(Debug)]
pub enum EffectOutcome {
    /// Read succeeded
    Read { state: State },
    /// Create succeeded
    Created { state: State },
    /// Update succeeded
    Updated { state: State },
    /// Delete and re-create succeeded
    Replaced {
        state: State,
        diagnostics: Vec<Diagnostic>,
    },
    /// Delete succeeded
    Deleted {
        id: ResourceId,
        diagnostics: Vec<Diagnostic>,
    },
    /// Skipped (e.g., dry-run)
    Skipped { reason: String },
}

impl EffectOutcome {
    /// Warnings attached to this outcome
    pub fn diagnostics(&self) -> Vec<&Diagnostic> {
        match self {
            EffectOutcome::Read { state }
            | EffectOutcome::Created { state }
            | EffectOutcome::Updated { state } => state.diagnostics.iter().collect(),
            EffectOutcome::Replaced { state, diagnostics } => {
                diagnostics.iter().chain(state.diagnostics.iter()).collect()
            }
            EffectOutcome::Deleted { diagnostics, .. } => diagnostics.iter().collect(),
            EffectOutcome::Skipped { .. } => Vec::new(),
        }
    }
}

/// Result of executing the entire Plan
///
/// `outcomes[i]` belongs to `plan.effects()[i]`; execution stops after the
/// first failure unless `continue_on_error` is set.
#[derive(Debug)]
pub struct ApplyResult {
    pub outcomes: Vec<Result<EffectOutcome, ProviderError>>,
    pub success_count: usize,
    pub failure_count: usize,
}

impl ApplyResult {
    pub fn is_success(&self) -> bool {
        self.failure_count == 0
    }
}

/// Interpreter configuration
#[derive(Debug, Clone, Default)]
pub struct InterpreterConfig {
    /// If true, skip actual side effects
    pub dry_run: bool,
    /// Continue on error
    pub continue_on_error: bool,
}

/// Interpreter that executes Effects using a Provider
pub struct Interpreter<P: Provider> {
    provider: P,
    config: InterpreterConfig,
    bindings: Bindings,
}

impl<P: Provider> Interpreter<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            config: InterpreterConfig::default(),
            bindings: Bindings::new(),
        }
    }

    pub fn with_config(mut self, config: InterpreterConfig) -> Self {
        self.config = config;
        self
    }

    /// Seed known attribute values (refreshed states, data sources)
    pub fn with_bindings(mut self, bindings: Bindings) -> Self {
        self.bindings = bindings;
        self
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Execute a Plan, interpreting all Effects and causing side effects
    pub async fn apply(&mut self, plan: &Plan) -> ApplyResult {
        let mut outcomes = Vec::new();
        let mut success_count = 0;
        let mut failure_count = 0;

        for effect in plan.effects() {
            let result = self.execute_effect(effect).await;

            match &result {
                Ok(_) => success_count += 1,
                Err(_) => {
                    failure_count += 1;
                    if !self.config.continue_on_error {
                        outcomes.push(result);
                        break;
                    }
                }
            }

            outcomes.push(result);
        }

        ApplyResult {
            outcomes,
            success_count,
            failure_count,
        }
    }

    /// Execute a single Effect
    async fn execute_effect(&mut self, effect: &Effect) -> ProviderResult<EffectOutcome> {
        if self.config.dry_run {
            return Ok(EffectOutcome::Skipped {
                reason: "dry-run mode".to_string(),
            });
        }

        debug!("Executing {} {}", effect.symbol(), effect.resource_id());

        match effect {
            Effect::Read(resource) => {
                let resolved = self.resolve(resource)?;
                let state = self.provider.read_data_source(&resolved).await?;
                self.record(resource, &state);
                Ok(EffectOutcome::Read { state })
            }
            Effect::Create(resource) => {
                let resolved = self.resolve(resource)?;
                let state = self.provider.create(&resolved).await?;
                self.record(resource, &state);
                Ok(EffectOutcome::Created { state })
            }
            Effect::Update { id, from, to, .. } => {
                let resolved = self.resolve(to)?;
                let state = self.provider.update(id, from, &resolved).await?;
                self.record(to, &state);
                Ok(EffectOutcome::Updated { state })
            }
            Effect::Replace { from, to, .. } => {
                let resolved = self.resolve(to)?;
                let diagnostics = self.provider.delete(from).await?;
                let state = self.provider.create(&resolved).await?;
                self.record(to, &state);
                Ok(EffectOutcome::Replaced { state, diagnostics })
            }
            Effect::Delete(state) => {
                let diagnostics = self.provider.delete(state).await?;
                Ok(EffectOutcome::Deleted {
                    id: state.id.clone(),
                    diagnostics,
                })
            }
        }
    }

    fn resolve(&self, resource: &Resource) -> ProviderResult<Resource> {
        let resolved = self.bindings.resolve(resource);
        let unresolved = unresolved_references(&resolved);
        if unresolved.is_empty() {
            Ok(resolved)
        } else {
            Err(ProviderError::new(format!(
                "Unresolved reference(s): {}",
                unresolved.join(", ")
            ))
            .for_resource(resource.id.clone()))
        }
    }

    fn record(&mut self, resource: &Resource, state: &State) {
        self.bindings.insert(resource.binding(), &state.attributes);
    }
}
