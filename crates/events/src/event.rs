use chrono::{DateTime, Utc};

/// A committed back-office fact.
///
/// Events are immutable, carry a stable type name for consumers, and name the
/// subject (order, assembly, lot, worker, approval request) they concern.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name (e.g. "sales.order.completed").
    fn event_type(&self) -> &'static str;

    /// Subject kind (e.g. "order", "assembly").
    fn subject_type(&self) -> &'static str;

    /// Identifier of the subject the event concerns.
    fn subject_id(&self) -> uuid::Uuid;

    /// When the owning transaction ran (business time).
    fn occurred_at(&self) -> DateTime<Utc>;
}
