use crate::domain::payment::PaymentStatus;
use crate::gateways::GatewayPaymentStatus;

/// Result of proposing a status transition against the stored state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// First write of this transition; the caller owns its side effects.
    Apply(PaymentStatus),
    /// Same state re-reported (or a stale `pending`); no effect.
    AlreadyApplied,
    /// A terminal state would be overwritten by a different terminal state.
    /// Never written; surfaced for manual reconciliation.
    Conflict {
        from: PaymentStatus,
        to: PaymentStatus,
    },
}

/// pending -> {completed, failed, cancelled, under_review};
/// completed -> refunded; under_review resolves to any conclusive outcome.
/// Transitions are driven only by adapter-normalized events.
pub fn apply_transition(current: PaymentStatus, incoming: PaymentStatus) -> TransitionOutcome {
    use PaymentStatus::*;

    if incoming == current || incoming == Pending {
        return TransitionOutcome::AlreadyApplied;
    }

    match (current, incoming) {
        (Pending, Completed | Failed | Cancelled | UnderReview) => TransitionOutcome::Apply(incoming),
        (UnderReview, Completed | Failed | Cancelled) => TransitionOutcome::Apply(incoming),
        (Completed, Refunded) => TransitionOutcome::Apply(Refunded),
        (from, to) => TransitionOutcome::Conflict { from, to },
    }
}

/// Maps a normalized gateway event onto the payment lifecycle. An event the
/// adapter could not classify lands in `under_review`, never in a guessed
/// terminal state.
pub fn status_from_event(event: GatewayPaymentStatus) -> PaymentStatus {
    match event {
        GatewayPaymentStatus::Pending => PaymentStatus::Pending,
        GatewayPaymentStatus::Completed => PaymentStatus::Completed,
        GatewayPaymentStatus::Failed => PaymentStatus::Failed,
        GatewayPaymentStatus::Cancelled => PaymentStatus::Cancelled,
        GatewayPaymentStatus::Refunded => PaymentStatus::Refunded,
        GatewayPaymentStatus::Unknown => PaymentStatus::UnderReview,
    }
}
