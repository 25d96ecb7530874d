//! State machine support for domain aggregates
//!
//! Aggregates use these state machines to enforce valid state
//! transitions and keep a record of how they got where they are.
//! Transitions are guarded: a guard either admits the transition or
//! refuses it with a [`DomainError`] naming the reason, so a refusal
//! can be surfaced to the user verbatim instead of collapsing into a
//! generic "invalid transition".

use crate::errors::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::marker::PhantomData;
use uuid::Uuid;

/// Input to a state machine transition
pub trait TransitionInput: Debug + Clone + Send + Sync {
    /// Get a description of this input for logging
    fn description(&self) -> String;
}

/// Output produced by a completed transition
pub trait TransitionOutput: Debug + Clone + Send + Sync {}

/// Trait for types that can be used as states in a state machine
pub trait State: Debug + Clone + PartialEq + Eq + Send + Sync {
    /// Get the name of this state for logging/debugging
    fn name(&self) -> &'static str;

    /// Check if this is a terminal state
    fn is_terminal(&self) -> bool {
        false
    }
}

/// Guarded transitions: output depends on current state AND input, and
/// every candidate transition passes through a guard that can refuse it
/// with a specific error.
pub trait GuardedTransitions: State {
    /// The input type for transitions
    type Input: TransitionInput;
    /// The output type for transitions
    type Output: TransitionOutput;

    /// Admit or refuse a transition for the given input.
    ///
    /// Refusals carry the concrete reason (`GuardFailed`,
    /// `InvalidStateTransition`, ...) so callers can report it.
    fn guard(&self, target: &Self, input: &Self::Input) -> DomainResult<()>;

    /// Get valid target states for a given input
    fn valid_transitions(&self, input: &Self::Input) -> Vec<Self>;

    /// Get the output for an admitted transition
    fn transition_output(&self, target: &Self, input: &Self::Input) -> Self::Output;
}

/// Record of a state transition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition<S, I, O> {
    /// The state before the transition
    pub from: S,
    /// The state after the transition
    pub to: S,
    /// The input that triggered the transition
    pub input: I,
    /// The output produced by the transition
    pub output: O,
    /// Unique identifier for this transition instance
    pub transition_id: Uuid,
    /// When the transition occurred
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Guarded state machine for aggregates
///
/// `M` is the marker type of the owning aggregate; the machine holds
/// the aggregate's typed id so transition records can be correlated.
#[derive(Debug, Clone)]
pub struct GuardedMachine<S: GuardedTransitions, M> {
    current_state: S,
    aggregate_id: crate::entity::EntityId<M>,
    transition_history: Vec<StateTransition<S, S::Input, S::Output>>,
    _phantom: PhantomData<M>,
}

impl<S: GuardedTransitions, M> GuardedMachine<S, M> {
    /// Create a new machine for an aggregate
    pub fn new(initial_state: S, aggregate_id: crate::entity::EntityId<M>) -> Self {
        Self {
            current_state: initial_state,
            aggregate_id,
            transition_history: Vec::new(),
            _phantom: PhantomData,
        }
    }

    /// Get the current state
    pub fn current_state(&self) -> &S {
        &self.current_state
    }

    /// Get the aggregate ID
    pub fn aggregate_id(&self) -> &crate::entity::EntityId<M> {
        &self.aggregate_id
    }

    /// Transition to a new state with input
    pub fn transition_to(
        &mut self,
        new_state: S,
        input: S::Input,
    ) -> DomainResult<StateTransition<S, S::Input, S::Output>> {
        if self.current_state.is_terminal() {
            return Err(DomainError::InvalidStateTransition {
                from: self.current_state.name().to_string(),
                to: new_state.name().to_string(),
            });
        }

        self.current_state.guard(&new_state, &input)?;

        let output = self.current_state.transition_output(&new_state, &input);

        tracing::debug!(
            aggregate_id = %self.aggregate_id,
            from = self.current_state.name(),
            to = new_state.name(),
            input = %input.description(),
            "state transition"
        );

        let transition = StateTransition {
            from: self.current_state.clone(),
            to: new_state.clone(),
            input,
            output,
            transition_id: Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
        };

        self.current_state = new_state;
        self.transition_history.push(transition.clone());

        Ok(transition)
    }

    /// Get the transition history
    pub fn history(&self) -> &[StateTransition<S, S::Input, S::Output>] {
        &self.transition_history
    }

    /// Check if in a specific state
    pub fn is_in_state(&self, state: &S) -> bool {
        &self.current_state == state
    }

    /// Get valid next states for given input
    pub fn valid_next_states(&self, input: &S::Input) -> Vec<S> {
        self.current_state.valid_transitions(input)
    }
}
