//! Configuration resolution
//!
//! Turns an ordered set of layers into a [`ResolvedDescriptor`]:
//! 1. Load layers (when given locators)
//! 2. Merge config layers by precedence
//! 3. Validate against the schema
//! 4. Resolve signing material (release only)
//! 5. Assemble the descriptor
//!
//! Any failure ends the run; no partial descriptor is returned.

mod merge;
mod state;

pub use merge::{merge_layers, overlay, precedence_order, MergedConfig, MergedEntry};
pub use state::{InvalidTransition, ResolutionState, StateTracker};

use crate::descriptor::ResolvedDescriptor;
use crate::error::ResolveError;
use crate::schema::Schema;
use crate::secrets::{SecretResolver, SigningMaterialRef};
use crate::source::{self, LayerRole, Locator, PropertyLayer};
use crate::variant::Variant;

/// Resolves layers against a schema.
///
/// Holds nothing but the schema, so one resolver can serve concurrent runs.
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    schema: Schema,
}

/// Outcome of a run together with the states it went through
#[derive(Debug)]
pub struct Resolution {
    pub result: Result<ResolvedDescriptor, ResolveError>,
    pub states: Vec<ResolutionState>,
}

impl Resolution {
    pub fn final_state(&self) -> ResolutionState {
        self.states
            .last()
            .copied()
            .unwrap_or(ResolutionState::Init)
    }
}

impl ConfigResolver {
    pub fn new(schema: Schema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Resolve already-loaded layers
    pub fn resolve(
        &self,
        layers: Vec<PropertyLayer>,
        variant: Variant,
    ) -> Result<ResolvedDescriptor, ResolveError> {
        self.resolve_traced(layers, variant).result
    }

    /// Load every locator in order, then resolve
    pub fn resolve_locators(
        &self,
        locators: &[Locator],
        variant: Variant,
    ) -> Result<ResolvedDescriptor, ResolveError> {
        self.resolve_locators_traced(locators, variant).result
    }

    /// Like [`resolve_locators`](Self::resolve_locators), keeping the state history
    pub fn resolve_locators_traced(&self, locators: &[Locator], variant: Variant) -> Resolution {
        let tracker = StateTracker::new();

        let mut layers = Vec::with_capacity(locators.len());
        for locator in locators {
            match source::load(locator) {
                Ok(layer) => layers.push(layer),
                Err(e) => {
                    tracing::debug!(%locator, error = %e, "layer load failed");
                    return fail(tracker, e);
                }
            }
        }

        self.run(layers, variant, tracker)
    }

    /// Like [`resolve`](Self::resolve), keeping the state history
    pub fn resolve_traced(&self, layers: Vec<PropertyLayer>, variant: Variant) -> Resolution {
        self.run(layers, variant, StateTracker::new())
    }

    fn run(&self, layers: Vec<PropertyLayer>, variant: Variant, mut tracker: StateTracker) -> Resolution {
        advance(&mut tracker, ResolutionState::LayersLoaded);
        match self.pipeline(&layers, variant, &mut tracker) {
            Ok(descriptor) => Resolution {
                result: Ok(descriptor),
                states: tracker.history().to_vec(),
            },
            Err(e) => fail(tracker, e),
        }
    }

    fn pipeline(
        &self,
        layers: &[PropertyLayer],
        variant: Variant,
        tracker: &mut StateTracker,
    ) -> Result<ResolvedDescriptor, ResolveError> {
        let config_layers = layers.iter().filter(|l| l.role() == LayerRole::Config);
        let merged = merge_layers(config_layers);
        advance(tracker, ResolutionState::Merged);

        for key in self.schema.unknown_keys(&merged) {
            tracing::warn!(
                key,
                layer = merged.winner(key).unwrap_or_default(),
                "ignoring key not declared in schema"
            );
        }

        self.schema.validate(&merged, variant)?;
        advance(tracker, ResolutionState::Validated);

        let signing = if variant.requires_release_signing() {
            let signing = SecretResolver::new(layers).resolve(&self.schema.secret_keys)?;
            advance(tracker, ResolutionState::SigningResolved);
            signing
        } else {
            SigningMaterialRef::debug()
        };

        let sources = precedence_order(layers)
            .into_iter()
            .map(PropertyLayer::provenance)
            .collect();

        let descriptor =
            ResolvedDescriptor::assemble(&merged, &self.schema, variant, signing, sources)?;
        advance(tracker, ResolutionState::Resolved);

        tracing::info!(
            variant = %variant,
            application_id = descriptor.application_id(),
            version_code = descriptor.version_code(),
            layers = layers.len(),
            "configuration resolved"
        );

        Ok(descriptor)
    }
}

fn advance(tracker: &mut StateTracker, to: ResolutionState) {
    if let Err(e) = tracker.advance(to) {
        debug_assert!(false, "{}", e);
        tracing::error!(error = %e, "resolver state machine out of order");
    }
}

fn fail(mut tracker: StateTracker, error: ResolveError) -> Resolution {
    let target = error.failure_state();
    if let Err(e) = tracker.advance(target) {
        tracing::debug!(error = %e, "failure state not reachable");
    }
    Resolution {
        result: Err(error),
        states: tracker.history().to_vec(),
    }
}
