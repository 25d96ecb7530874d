//! Contract submission gate
//!
//! A [`ContractSession`] governs the terms-acceptance + signature gate
//! between the cart and order creation. It is transient: scoped to one
//! contract page visit, consumed exactly once at confirmation, and
//! never persisted. The underlying state machine is
//! `Drafting -> AwaitingConfirmation -> Submitted`, with guards
//! evaluated in a fixed order: signature presence first, then terms
//! acceptance.

use crate::entity::{ContractId, ContractMarker, Entity, ProductId};
use crate::errors::{DomainError, DomainResult, GuardReason};
use crate::state_machine::{
    GuardedMachine, GuardedTransitions, State, TransitionInput, TransitionOutput,
};
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// Lifecycle states of a contract session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractState {
    /// Initial: the user may toggle terms and produce/clear a signature
    Drafting,
    /// The confirmation prompt is showing
    AwaitingConfirmation,
    /// Terminal: confirmed and handed off to order creation
    Submitted,
}

impl State for ContractState {
    fn name(&self) -> &'static str {
        match self {
            Self::Drafting => "Drafting",
            Self::AwaitingConfirmation => "AwaitingConfirmation",
            Self::Submitted => "Submitted",
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, Self::Submitted)
    }
}

/// User actions driving the gate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ContractAction {
    /// Submit the contract for confirmation
    Submit {
        /// Whether a signature mark is present
        signature_present: bool,
        /// Whether the terms checkbox is checked
        terms_accepted: bool,
    },
    /// Dismiss the confirmation prompt
    Cancel,
    /// Confirm and proceed to order creation
    Confirm,
}

impl TransitionInput for ContractAction {
    fn description(&self) -> String {
        match self {
            Self::Submit { .. } => "Submit".to_string(),
            Self::Cancel => "Cancel".to_string(),
            Self::Confirm => "Confirm".to_string(),
        }
    }
}

/// Effect of a completed gate transition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ContractEffect {
    /// Show the confirmation prompt
    PromptConfirmation,
    /// Back to drafting; nothing discarded but the prompt
    ReturnToDraft,
    /// Hand off to order creation for the target product
    ProceedToOrder(ProductId),
}

impl TransitionOutput for ContractEffect {}

// Machine state: the gate state plus the contract target, so the
// transition output can carry the product id forward.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Gate(ContractState, ProductId);

impl State for Gate {
    fn name(&self) -> &'static str {
        self.0.name()
    }

    fn is_terminal(&self) -> bool {
        self.0.is_terminal()
    }
}

impl GuardedTransitions for Gate {
    type Input = ContractAction;
    type Output = ContractEffect;

    fn guard(&self, target: &Self, input: &Self::Input) -> DomainResult<()> {
        use ContractState::*;
        match (&self.0, &target.0, input) {
            (
                Drafting,
                AwaitingConfirmation,
                ContractAction::Submit {
                    signature_present,
                    terms_accepted,
                },
            ) => {
                // Guard order is fixed: signature first, then terms
                if !signature_present {
                    return Err(DomainError::GuardFailed {
                        reason: GuardReason::MissingSignature,
                    });
                }
                if !terms_accepted {
                    return Err(DomainError::GuardFailed {
                        reason: GuardReason::TermsNotAccepted,
                    });
                }
                Ok(())
            }
            (AwaitingConfirmation, Drafting, ContractAction::Cancel) => Ok(()),
            (AwaitingConfirmation, Submitted, ContractAction::Confirm) => Ok(()),
            _ => Err(DomainError::InvalidStateTransition {
                from: self.name().to_string(),
                to: target.name().to_string(),
            }),
        }
    }

    fn valid_transitions(&self, input: &Self::Input) -> Vec<Self> {
        use ContractState::*;
        let states = match (&self.0, input) {
            (Drafting, ContractAction::Submit { .. }) => vec![AwaitingConfirmation],
            (AwaitingConfirmation, ContractAction::Cancel) => vec![Drafting],
            (AwaitingConfirmation, ContractAction::Confirm) => vec![Submitted],
            _ => vec![],
        };
        states.into_iter().map(|s| Gate(s, self.1)).collect()
    }

    fn transition_output(&self, target: &Self, _input: &Self::Input) -> Self::Output {
        use ContractState::*;
        match &target.0 {
            AwaitingConfirmation => ContractEffect::PromptConfirmation,
            Drafting => ContractEffect::ReturnToDraft,
            Submitted => ContractEffect::ProceedToOrder(self.1),
        }
    }
}

/// Transient contract session
#[derive(Debug, Clone)]
pub struct ContractSession {
    entity: Entity<ContractMarker>,
    terms_accepted: bool,
    signature_present: bool,
    machine: GuardedMachine<Gate, ContractMarker>,
}

impl ContractSession {
    /// Start a new session for the product being contracted
    pub fn new(target_product_id: ProductId) -> Self {
        let entity = Entity::<ContractMarker>::new();
        let machine = GuardedMachine::new(Gate(ContractState::Drafting, target_product_id), entity.id);
        Self {
            entity,
            terms_accepted: false,
            signature_present: false,
            machine,
        }
    }

    /// Session id
    pub fn id(&self) -> ContractId {
        self.entity.id
    }

    /// The product whose license is being contracted
    pub fn target_product_id(&self) -> ProductId {
        self.machine.current_state().1
    }

    /// Current gate state
    pub fn state(&self) -> &ContractState {
        &self.machine.current_state().0
    }

    /// Whether the terms checkbox is checked
    pub fn terms_accepted(&self) -> bool {
        self.terms_accepted
    }

    /// Whether a signature mark is present
    pub fn signature_present(&self) -> bool {
        self.signature_present
    }

    /// Toggle terms acceptance. Refused once the session is consumed.
    pub fn set_terms_accepted(&mut self, accepted: bool) -> DomainResult<()> {
        self.ensure_mutable()?;
        self.terms_accepted = accepted;
        Ok(())
    }

    /// Record the signature collaborator's "mark present" signal.
    /// `false` means the mark was cleared.
    pub fn signature_changed(&mut self, present: bool) -> DomainResult<()> {
        self.ensure_mutable()?;
        self.signature_present = present;
        Ok(())
    }

    /// Try to move to the confirmation prompt. Guards run in order:
    /// signature presence, then terms acceptance; a refusal names the
    /// failed guard and leaves the state at `Drafting`.
    pub fn submit(&mut self) -> DomainResult<ContractEffect> {
        let target = Gate(
            ContractState::AwaitingConfirmation,
            self.target_product_id(),
        );
        let action = ContractAction::Submit {
            signature_present: self.signature_present,
            terms_accepted: self.terms_accepted,
        };
        Ok(self.machine.transition_to(target, action)?.output)
    }

    /// Dismiss the confirmation prompt; terms and signature are kept.
    pub fn cancel(&mut self) -> DomainResult<()> {
        let target = Gate(ContractState::Drafting, self.target_product_id());
        self.machine.transition_to(target, ContractAction::Cancel)?;
        Ok(())
    }

    /// Confirm and consume the session, yielding the contract target
    /// for order creation. Terminal: every later call fails.
    pub fn confirm(&mut self) -> DomainResult<ProductId> {
        let target = Gate(ContractState::Submitted, self.target_product_id());
        let transition = self
            .machine
            .transition_to(target, ContractAction::Confirm)?;
        match transition.output {
            ContractEffect::ProceedToOrder(product_id) => Ok(product_id),
            _ => Err(DomainError::InvalidStateTransition {
                from: "AwaitingConfirmation".to_string(),
                to: "Submitted".to_string(),
            }),
        }
    }

    fn ensure_mutable(&self) -> DomainResult<()> {
        if self.state().is_terminal() {
            return Err(DomainError::Validation(
                "contract session already submitted".to_string(),
            ));
        }
        Ok(())
    }
}

/// Signature capture collaborator: a boolean "mark present since last
/// clear" stream plus an explicit clear.
pub trait SignatureCapture: Send + Sync {
    /// Stream of mark-present updates
    fn marks(&self) -> BoxStream<'static, bool>;

    /// Clear the current mark
    fn clear(&self);
}

/// Forward mark-present updates from a capture stream into a session
/// until the stream ends or the session is consumed.
pub async fn feed_signature(
    session: &mut ContractSession,
    mut marks: BoxStream<'_, bool>,
) -> DomainResult<()> {
    while let Some(present) = marks.next().await {
        session.signature_changed(present)?;
    }
    Ok(())
}

/// Watch-channel backed signature capture for tests and demos
pub struct WatchSignatureCapture {
    tx: watch::Sender<bool>,
}

impl Default for WatchSignatureCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchSignatureCapture {
    /// Start with no mark
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Simulate the user drawing a mark
    pub fn draw(&self) {
        let _ = self.tx.send(true);
    }
}

impl SignatureCapture for WatchSignatureCapture {
    fn marks(&self) -> BoxStream<'static, bool> {
        WatchStream::new(self.tx.subscribe()).boxed()
    }

    fn clear(&self) {
        let _ = self.tx.send(false);
    }
}
