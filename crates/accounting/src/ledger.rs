use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use petalerp_core::{
    AssemblyId, DomainResult, LedgerEntryId, OrderId, WorkerId, ensure_positive,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Income,
    Outcome,
}

/// Why a worker is compensated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    /// Salesman share of an order's product lines.
    SaleCommission,
    /// Florist share of an assembly's sale price.
    AssemblySaleCommission,
    /// Flat pay for building an assembly.
    AssemblyCreation,
}

impl Reason {
    pub fn label(self) -> &'static str {
        match self {
            Reason::SaleCommission => "sale commission",
            Reason::AssemblySaleCommission => "assembly sale commission",
            Reason::AssemblyCreation => "assembly creation",
        }
    }
}

/// The business record an entry is tied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Subject {
    Order(OrderId),
    Assembly(AssemblyId),
}

impl core::fmt::Display for Subject {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Subject::Order(id) => write!(f, "order {id}"),
            Subject::Assembly(id) => write!(f, "assembly {id}"),
        }
    }
}

/// One append-only compensation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: LedgerEntryId,
    /// Position in the ledger; strictly increasing.
    pub seq: u64,
    pub worker_id: WorkerId,
    pub subject: Subject,
    pub reason: Reason,
    pub direction: Direction,
    /// Always positive; `direction` carries the sign.
    pub amount: i64,
    /// For outcome entries: the income entry this one cancels.
    pub reverses: Option<LedgerEntryId>,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn signed_amount(&self) -> i64 {
        match self.direction {
            Direction::Income => self.amount,
            Direction::Outcome => -self.amount,
        }
    }

    fn matches(&self, worker_id: WorkerId, subject: Subject, reason: Reason) -> bool {
        self.worker_id == worker_id && self.subject == subject && self.reason == reason
    }
}

/// Append-only ledger plus each worker's cached balance.
///
/// The cached balance moves together with every appended entry. Callers must
/// hold the store's writer lock, which serialises updates per worker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerLedger {
    entries: Vec<LedgerEntry>,
    balances: BTreeMap<WorkerId, i64>,
}

impl WorkerLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn entries_for(&self, subject: Subject) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.iter().filter(move |e| e.subject == subject)
    }

    /// Cached running balance.
    pub fn balance(&self, worker_id: WorkerId) -> i64 {
        self.balances.get(&worker_id).copied().unwrap_or(0)
    }

    /// Balance recomputed from the entries, for auditing the cached value.
    pub fn derived_balance(&self, worker_id: WorkerId) -> i64 {
        self.entries
            .iter()
            .filter(|e| e.worker_id == worker_id)
            .map(LedgerEntry::signed_amount)
            .sum()
    }

    /// Most recent income for the key that no outcome cancels yet.
    fn open_income(&self, worker_id: WorkerId, subject: Subject, reason: Reason) -> Option<&LedgerEntry> {
        self.entries
            .iter()
            .rev()
            .filter(|e| e.direction == Direction::Income && e.matches(worker_id, subject, reason))
            .find(|income| !self.entries.iter().any(|e| e.reverses == Some(income.id)))
    }

    pub fn is_paid(&self, worker_id: WorkerId, subject: Subject, reason: Reason) -> bool {
        self.open_income(worker_id, subject, reason).is_some()
    }

    /// Workers holding an un-reversed income on `subject`, with its reason.
    pub fn open_incomes(&self, subject: Subject) -> Vec<(WorkerId, Reason)> {
        let mut keys: Vec<(WorkerId, Reason)> = Vec::new();
        for e in self.entries_for(subject) {
            if e.direction == Direction::Income
                && !keys.contains(&(e.worker_id, e.reason))
                && self.is_paid(e.worker_id, subject, e.reason)
            {
                keys.push((e.worker_id, e.reason));
            }
        }
        keys
    }

    fn append(&mut self, mut entry: LedgerEntry) -> LedgerEntry {
        entry.seq = self.entries.len() as u64 + 1;
        *self.balances.entry(entry.worker_id).or_insert(0) += entry.signed_amount();
        self.entries.push(entry.clone());
        entry
    }

    /// Append an income entry and credit the worker.
    pub fn pay(
        &mut self,
        worker_id: WorkerId,
        subject: Subject,
        reason: Reason,
        amount: i64,
        comment: impl Into<String>,
        at: DateTime<Utc>,
    ) -> DomainResult<LedgerEntry> {
        ensure_positive(amount, "compensation amount")?;
        Ok(self.append(LedgerEntry {
            id: LedgerEntryId::new(),
            seq: 0,
            worker_id,
            subject,
            reason,
            direction: Direction::Income,
            amount,
            reverses: None,
            comment: comment.into(),
            created_at: at,
        }))
    }

    /// Cancel the most recent un-reversed income for the key with an outcome of
    /// the same amount. `None` when nothing is open.
    pub fn reverse(
        &mut self,
        worker_id: WorkerId,
        subject: Subject,
        reason: Reason,
        comment: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Option<LedgerEntry> {
        let income = self.open_income(worker_id, subject, reason)?;
        let (amount, reverses) = (income.amount, income.id);
        Some(self.append(LedgerEntry {
            id: LedgerEntryId::new(),
            seq: 0,
            worker_id,
            subject,
            reason,
            direction: Direction::Outcome,
            amount,
            reverses: Some(reverses),
            comment: comment.into(),
            created_at: at,
        }))
    }

    /// Reverse every open income tied to `subject`.
    pub fn reverse_subject(
        &mut self,
        subject: Subject,
        comment: &str,
        at: DateTime<Utc>,
    ) -> Vec<LedgerEntry> {
        let mut reversed = Vec::new();
        for (worker_id, reason) in self.open_incomes(subject) {
            while let Some(entry) = self.reverse(worker_id, subject, reason, comment, at) {
                reversed.push(entry);
            }
        }
        reversed
    }

    /// Reverse whatever is open for the key, then pay `amount` (skipped when 0).
    pub fn reassign(
        &mut self,
        worker_id: WorkerId,
        subject: Subject,
        reason: Reason,
        amount: i64,
        comment: &str,
        at: DateTime<Utc>,
    ) -> DomainResult<Vec<LedgerEntry>> {
        let mut posted = Vec::new();
        while let Some(entry) = self.reverse(worker_id, subject, reason, comment, at) {
            posted.push(entry);
        }
        if amount > 0 {
            posted.push(self.pay(worker_id, subject, reason, amount, comment, at)?);
        }
        Ok(posted)
    }
}
