//! Network-level blocking
//!
//! Two mechanisms keep request blocking in line with the block state:
//!
//! - `DeclarativeRule`: a single dynamic rule (id 1) whose presence tracks the
//!   state. Preferred wherever the declarative rule engine exists.
//! - `RequestPredicate`: a blocking per-request hook that consults the state
//!   on every request. Used on platforms that can't express the configured
//!   action declaratively.
//!
//! Exactly one is selected at initialization and both expose the same
//! idempotent `apply` / `teardown` pair.

use std::cell::Cell;
use std::rc::Rc;

use crate::config::MechanismChoice;
use crate::error::{Error, HostError, Result};
use crate::host::{RequestHook, RuleEngine};
use crate::rule::{NetworkRule, RulePolicy, UpdateRuleOptions};
use crate::types::{BlockState, BlockingResponse, RequestDetails, ResourceTypes};

// =============================================================================
// Selection
// =============================================================================

/// What the platform offers for network blocking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub declarative_rules: bool,
    /// Declarative engine accepts `redirect` actions
    pub declarative_redirect: bool,
    pub blocking_request_hook: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MechanismKind {
    DeclarativeRule,
    RequestPredicate,
}

impl MechanismKind {
    /// Pick a mechanism and the policy it will actually enforce.
    ///
    /// The policy comes back downgraded to `block` when only a declarative
    /// engine without redirect support is available.
    pub fn select(
        choice: MechanismChoice,
        caps: Capabilities,
        policy: &RulePolicy,
    ) -> Result<(Self, RulePolicy)> {
        let declarative_fits = caps.declarative_rules
            && (caps.declarative_redirect || !policy.action.is_redirect());

        match choice {
            MechanismChoice::Declarative if caps.declarative_rules => {
                Ok((Self::DeclarativeRule, declarative_policy(caps, policy)))
            }
            MechanismChoice::RequestPredicate if caps.blocking_request_hook => {
                Ok((Self::RequestPredicate, policy.clone()))
            }
            MechanismChoice::Auto if declarative_fits => Ok((Self::DeclarativeRule, policy.clone())),
            MechanismChoice::Auto if caps.blocking_request_hook => {
                Ok((Self::RequestPredicate, policy.clone()))
            }
            MechanismChoice::Auto if caps.declarative_rules => {
                Ok((Self::DeclarativeRule, declarative_policy(caps, policy)))
            }
            _ => Err(Error::NoBlockingMechanism),
        }
    }
}

fn declarative_policy(caps: Capabilities, policy: &RulePolicy) -> RulePolicy {
    if policy.action.is_redirect() && !caps.declarative_redirect {
        log::warn!("Declarative engine lacks redirect support, blocking images instead");
        policy.downgraded_to_block()
    } else {
        policy.clone()
    }
}

// =============================================================================
// Declarative Rule
// =============================================================================

/// Dynamic rule toggled by presence.
pub struct DeclarativeRule {
    engine: Rc<dyn RuleEngine>,
    rule: NetworkRule,
}

impl DeclarativeRule {
    pub fn new(engine: Rc<dyn RuleEngine>, policy: &RulePolicy) -> Self {
        Self {
            engine,
            rule: policy.to_rule(),
        }
    }

    /// Register or remove the rule so its presence matches `state`.
    pub async fn apply(&self, state: BlockState) -> Result<(), HostError> {
        let present = self.is_registered().await?;

        match (state, present) {
            (BlockState::Enabled, false) => {
                log::info!("Registering image rule {}", self.rule.id);
                self.engine
                    .update_dynamic_rules(UpdateRuleOptions::replace(self.rule.clone()))
                    .await
            }
            (BlockState::Disabled, true) => {
                log::info!("Removing image rule {}", self.rule.id);
                self.engine
                    .update_dynamic_rules(UpdateRuleOptions::remove(self.rule.id))
                    .await
            }
            _ => {
                log::debug!("Image rule already in sync with {:?}", state);
                Ok(())
            }
        }
    }

    pub async fn teardown(&self) -> Result<(), HostError> {
        self.apply(BlockState::Disabled).await
    }

    async fn is_registered(&self) -> Result<bool, HostError> {
        let ids = self.engine.dynamic_rule_ids().await?;
        Ok(ids.contains(&self.rule.id))
    }
}

// =============================================================================
// Request Predicate
// =============================================================================

/// Live per-request check against the block state.
///
/// The hook answers synchronously, so it can't await storage. It consults a
/// mirror of the state that every `apply` refreshes; `apply` runs on each
/// re-read and on every storage change notification.
pub struct RequestPredicate {
    hook: Rc<dyn RequestHook>,
    resource_types: ResourceTypes,
    state: Cell<BlockState>,
}

impl RequestPredicate {
    pub fn new(hook: Rc<dyn RequestHook>, policy: &RulePolicy) -> Self {
        Self {
            hook,
            resource_types: policy.resource_types,
            state: Cell::new(BlockState::default()),
        }
    }

    pub fn apply(&self, state: BlockState) -> Result<(), HostError> {
        self.state.set(state);
        if !self.hook.is_installed() {
            log::info!("Installing request hook for {:?}", self.resource_types.names());
            self.hook.install()?;
        }
        Ok(())
    }

    pub fn teardown(&self) -> Result<(), HostError> {
        self.state.set(BlockState::Disabled);
        if self.hook.is_installed() {
            self.hook.uninstall()?;
        }
        Ok(())
    }

    pub fn evaluate(&self, request: &RequestDetails<'_>) -> BlockingResponse {
        let covered = ResourceTypes::parse(request.resource_type)
            .map(|kind| self.resource_types.intersects(kind))
            .unwrap_or(false);

        BlockingResponse {
            cancel: covered && self.state.get().is_enabled(),
        }
    }
}

// =============================================================================
// Blocking Mechanism
// =============================================================================

pub enum BlockingMechanism {
    DeclarativeRule(DeclarativeRule),
    RequestPredicate(RequestPredicate),
}

impl BlockingMechanism {
    pub fn kind(&self) -> MechanismKind {
        match self {
            Self::DeclarativeRule(_) => MechanismKind::DeclarativeRule,
            Self::RequestPredicate(_) => MechanismKind::RequestPredicate,
        }
    }

    /// Idempotent: repeating the same state changes nothing.
    pub async fn apply(&self, state: BlockState) -> Result<(), HostError> {
        match self {
            Self::DeclarativeRule(rule) => rule.apply(state).await,
            Self::RequestPredicate(predicate) => predicate.apply(state),
        }
    }

    pub async fn teardown(&self) -> Result<(), HostError> {
        match self {
            Self::DeclarativeRule(rule) => rule.teardown().await,
            Self::RequestPredicate(predicate) => predicate.teardown(),
        }
    }

    /// Per-request decision. Declarative rules are evaluated by the host.
    pub fn evaluate(&self, request: &RequestDetails<'_>) -> BlockingResponse {
        match self {
            Self::DeclarativeRule(_) => BlockingResponse::default(),
            Self::RequestPredicate(predicate) => predicate.evaluate(request),
        }
    }
}
