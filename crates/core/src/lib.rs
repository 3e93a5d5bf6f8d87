//! `petalerp-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the business error taxonomy, entity lookup helpers and integer
//! money arithmetic.

pub mod entity;
pub mod error;
pub mod id;
pub mod money;

pub use entity::Entity;
pub use error::{DomainError, DomainResult, ensure_non_negative, ensure_positive};
pub use id::{
    ApprovalRequestId, AssemblyCategoryId, AssemblyId, AssemblyLineId, AssemblySaleLineId,
    ClientId, LedgerEntryId, LotId, OrderId, OrderLineId, PaymentId, PaymentMethodId, ProductCategoryId,
    ProductId, ReturnId, UserId, WorkerId,
};
pub use money::{percent_of, prorate};
