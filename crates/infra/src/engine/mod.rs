//! Back-office operations.
//!
//! Every public operation on [`BackOffice`] runs as exactly one store
//! transaction:
//!
//! ```text
//! operation
//!   ↓
//! 1. take the writer lock, copy the committed state
//!   ↓
//! 2. validate the transition, then mutate stock, lines, ledger, approvals
//!   ↓
//! 3. recompute rollups of every touched subject
//!   ↓
//! 4. commit (swap the copy in) or discard it on the first error
//!   ↓
//! 5. publish the outbox to the event bus
//! ```
//!
//! Domain errors are returned to the caller untouched; nothing they reached
//! before failing survives.

mod approvals;
mod assemblies;
mod compensation;
mod orders;
mod setup;
mod stock;

use anyhow::Context;
use tracing::{error, info, warn};

use petalerp_accounting::{CompensationPolicy, LedgerEntry, Subject};
use petalerp_core::DomainResult;
use petalerp_core::WorkerId;
use petalerp_events::{EventBus, InMemoryEventBus};

use crate::config::BackOfficeConfig;
use crate::error::{BackOfficeError, BackOfficeResult};
use crate::events::Envelope;
use crate::store::{State, Store, Transaction};

pub use orders::NewPayment;

/// The back office: shared state plus the bus its commits are published to.
#[derive(Debug)]
pub struct BackOffice<B> {
    store: Store,
    bus: B,
    config: BackOfficeConfig,
    policy: CompensationPolicy,
}

impl BackOffice<InMemoryEventBus<Envelope>> {
    /// Build from `PETALERP_*` environment and `config/` files with an in-process bus.
    pub fn from_env() -> anyhow::Result<Self> {
        let config = BackOfficeConfig::load().context("failed to load back-office configuration")?;
        Ok(Self::new(config, InMemoryEventBus::new()))
    }
}

impl<B> BackOffice<B> {
    pub fn new(config: BackOfficeConfig, bus: B) -> Self {
        let policy = CompensationPolicy {
            salesman_percent: config.commission.salesman_percent,
        };
        Self {
            store: Store::new(),
            bus,
            config,
            policy,
        }
    }

    pub fn config(&self) -> &BackOfficeConfig {
        &self.config
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }
}

impl<B> BackOffice<B>
where
    B: EventBus<Envelope>,
{
    /// Execute `op` as one transaction and publish its events after the commit.
    fn run<T>(
        &self,
        operation: &'static str,
        op: impl FnOnce(&mut Transaction) -> DomainResult<T>,
    ) -> BackOfficeResult<T> {
        let commit = match self.store.transaction(|tx| op(tx).map_err(BackOfficeError::from)) {
            Ok(commit) => commit,
            Err(BackOfficeError::Domain(e)) => {
                warn!(operation, error = %e, "operation rejected");
                return Err(e.into());
            }
            Err(e) => {
                error!(operation, error = %e, "transaction aborted");
                return Err(e);
            }
        };

        info!(
            operation,
            commit = commit.sequence,
            events = commit.envelopes.len(),
            "transaction committed"
        );

        for envelope in commit.envelopes {
            self.bus
                .publish(envelope)
                .map_err(|e| BackOfficeError::Publish(e.to_string()))?;
        }
        Ok(commit.value)
    }

    fn read<T>(&self, f: impl FnOnce(&State) -> DomainResult<T>) -> BackOfficeResult<T> {
        Ok(self.store.read(f)??)
    }

    /// Copy of the committed state, for reporting.
    pub fn snapshot(&self) -> BackOfficeResult<State> {
        Ok(self.store.read(State::clone)?)
    }

    /// Cached running balance of a worker.
    pub fn worker_balance(&self, worker_id: WorkerId) -> BackOfficeResult<i64> {
        self.read(|s| Ok(s.ledger.balance(worker_id)))
    }

    /// Worker balance summed from ledger entries.
    pub fn derived_worker_balance(&self, worker_id: WorkerId) -> BackOfficeResult<i64> {
        self.read(|s| Ok(s.ledger.derived_balance(worker_id)))
    }

    pub fn ledger_entries(&self, subject: Subject) -> BackOfficeResult<Vec<LedgerEntry>> {
        self.read(|s| Ok(s.ledger.entries_for(subject).cloned().collect()))
    }
}
