//! In-process transactional store.
//!
//! All back-office state lives behind one `RwLock`. A transaction takes the
//! write lock, works on a copy of the state and swaps it in only when the
//! closure succeeds, so a failed operation leaves nothing behind (including
//! partial multi-lot draws). Holding the write lock for the whole transaction
//! serialises every mutation, wholesale rollups and worker balances included.

use std::collections::BTreeMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use petalerp_accounting::WorkerLedger;
use petalerp_approval::ApprovalBook;
use petalerp_assembly::Assembly;
use petalerp_catalog::Catalog;
use petalerp_core::{AssemblyId, ClientId, OrderId, WorkerId};
use petalerp_inventory::StockBook;
use petalerp_parties::{Client, Worker};
use petalerp_sales::Order;

use crate::error::{BackOfficeError, BackOfficeResult, StoreError};
use crate::events::{BackOfficeEvent, Envelope};

/// Everything the back office knows.
#[derive(Debug, Clone, Default)]
pub struct State {
    pub catalog: Catalog,
    pub workers: BTreeMap<WorkerId, Worker>,
    pub clients: BTreeMap<ClientId, Client>,
    pub stock: StockBook,
    pub assemblies: BTreeMap<AssemblyId, Assembly>,
    pub orders: BTreeMap<OrderId, Order>,
    pub ledger: WorkerLedger,
    pub approvals: ApprovalBook,
}

/// Working copy handed to a transaction closure.
#[derive(Debug)]
pub struct Transaction {
    pub state: State,
    outbox: Vec<BackOfficeEvent>,
    now: DateTime<Utc>,
}

impl Transaction {
    /// Timestamp shared by every record written in this transaction.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Queue an event; it is published only if the transaction commits.
    pub fn emit(&mut self, event: BackOfficeEvent) {
        self.outbox.push(event);
    }
}

/// Result of a committed transaction.
#[derive(Debug)]
pub struct Commit<T> {
    pub value: T,
    pub sequence: u64,
    pub envelopes: Vec<Envelope>,
}

#[derive(Debug, Default)]
struct Inner {
    state: State,
    sequence: u64,
}

#[derive(Debug, Default)]
pub struct Store {
    inner: RwLock<Inner>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` against the committed state.
    pub fn read<T>(&self, f: impl FnOnce(&State) -> T) -> Result<T, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&inner.state))
    }

    /// Number of committed transactions.
    pub fn sequence(&self) -> Result<u64, StoreError> {
        Ok(self.inner.read().map_err(|_| StoreError::Poisoned)?.sequence)
    }

    /// Run `f` as one atomic transaction.
    ///
    /// On `Ok` the working copy replaces the committed state and the outbox is
    /// turned into envelopes stamped with the new commit sequence. On `Err`
    /// the working copy and outbox are dropped.
    ///
    /// The working copy is a full clone of `State`, ledger and order history
    /// included, so the cost of every write grows with the history held.
    pub fn transaction<T>(
        &self,
        f: impl FnOnce(&mut Transaction) -> BackOfficeResult<T>,
    ) -> BackOfficeResult<Commit<T>> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;

        let mut tx = Transaction {
            state: inner.state.clone(),
            outbox: Vec::new(),
            now: Utc::now(),
        };
        let value = f(&mut tx)?;

        let sequence = inner.sequence + 1;
        let envelopes = tx
            .outbox
            .iter()
            .map(|event| event.to_envelope(sequence))
            .collect::<Result<Vec<_>, StoreError>>()
            .map_err(BackOfficeError::from)?;

        inner.state = tx.state;
        inner.sequence = sequence;
        Ok(Commit { value, sequence, envelopes })
    }
}
