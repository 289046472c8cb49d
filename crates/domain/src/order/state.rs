//! Order fulfillment state machine.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::OrderError;

/// The fulfillment status of an order.
///
/// State transitions:
/// ```text
/// Received ──► InPreparation ──► Ready ──► Completed
///     │              │
///     └──────────────┴──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Order was accepted and is waiting for the kitchen.
    #[default]
    Received,

    /// The kitchen is preparing the order.
    InPreparation,

    /// The order is ready for pickup.
    Ready,

    /// The order was handed to the customer (terminal state).
    Completed,

    /// The order was cancelled before it was ready (terminal state).
    Cancelled,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Received,
        OrderStatus::InPreparation,
        OrderStatus::Ready,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    /// Returns the statuses reachable from this one in a single step.
    pub fn allowed_transitions(&self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::Received => &[OrderStatus::InPreparation, OrderStatus::Cancelled],
            OrderStatus::InPreparation => &[OrderStatus::Ready, OrderStatus::Cancelled],
            OrderStatus::Ready => &[OrderStatus::Completed],
            OrderStatus::Completed | OrderStatus::Cancelled => &[],
        }
    }

    /// Returns the forward successor, skipping the cancellation edge.
    pub fn next(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Received => Some(OrderStatus::InPreparation),
            OrderStatus::InPreparation => Some(OrderStatus::Ready),
            OrderStatus::Ready => Some(OrderStatus::Completed),
            OrderStatus::Completed | OrderStatus::Cancelled => None,
        }
    }

    /// Returns true if `target` is reachable in a single step.
    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        self.allowed_transitions().contains(&target)
    }

    /// Validates a transition and returns the new status.
    ///
    /// Performs no I/O; persisting the result is the caller's job.
    pub fn transition_to(self, target: OrderStatus) -> Result<OrderStatus, OrderError> {
        if self.can_transition_to(target) {
            Ok(target)
        } else {
            Err(OrderError::InvalidTransition {
                from: self,
                to: target,
            })
        }
    }

    /// Returns true if the order can be cancelled in this status.
    pub fn can_cancel(&self) -> bool {
        self.can_transition_to(OrderStatus::Cancelled)
    }

    /// Returns true if this is a terminal status (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Received => "Received",
            OrderStatus::InPreparation => "InPreparation",
            OrderStatus::Ready => "Ready",
            OrderStatus::Completed => "Completed",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;

    /// Accepts `InPreparation`, `inpreparation` and `in_preparation` alike.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace(['_', '-'], "");
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| OrderError::InvalidRequest {
                reason: format!("unknown order status '{s}'"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_received() {
        assert_eq!(OrderStatus::default(), OrderStatus::Received);
    }

    #[test]
    fn test_transition_table_is_exact() {
        use OrderStatus::*;

        let expected: [(OrderStatus, &[OrderStatus]); 5] = [
            (Received, &[InPreparation, Cancelled]),
            (InPreparation, &[Ready, Cancelled]),
            (Ready, &[Completed]),
            (Completed, &[]),
            (Cancelled, &[]),
        ];

        for (from, allowed) in expected {
            for to in OrderStatus::ALL {
                let result = from.transition_to(to);
                if allowed.contains(&to) {
                    assert_eq!(result.unwrap(), to, "{from} -> {to} should be legal");
                } else {
                    assert!(
                        matches!(result, Err(OrderError::InvalidTransition { from: f, to: t }) if f == from && t == to),
                        "{from} -> {to} should be rejected"
                    );
                }
            }
        }
    }

    #[test]
    fn test_no_self_transitions() {
        for status in OrderStatus::ALL {
            assert!(!status.can_transition_to(status));
        }
    }

    #[test]
    fn test_next_follows_happy_path() {
        assert_eq!(OrderStatus::Received.next(), Some(OrderStatus::InPreparation));
        assert_eq!(OrderStatus::InPreparation.next(), Some(OrderStatus::Ready));
        assert_eq!(OrderStatus::Ready.next(), Some(OrderStatus::Completed));
        assert_eq!(OrderStatus::Completed.next(), None);
        assert_eq!(OrderStatus::Cancelled.next(), None);
    }

    #[test]
    fn test_cancel_only_before_ready() {
        assert!(OrderStatus::Received.can_cancel());
        assert!(OrderStatus::InPreparation.can_cancel());
        assert!(!OrderStatus::Ready.can_cancel());
        assert!(!OrderStatus::Completed.can_cancel());
        assert!(!OrderStatus::Cancelled.can_cancel());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!OrderStatus::Received.is_terminal());
        assert!(!OrderStatus::InPreparation.is_terminal());
        assert!(!OrderStatus::Ready.is_terminal());
        assert!(OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_parse_accepts_common_spellings() {
        assert_eq!(
            "InPreparation".parse::<OrderStatus>().unwrap(),
            OrderStatus::InPreparation
        );
        assert_eq!(
            "in_preparation".parse::<OrderStatus>().unwrap(),
            OrderStatus::InPreparation
        );
        assert_eq!("READY".parse::<OrderStatus>().unwrap(), OrderStatus::Ready);
        assert!(matches!(
            "shipped".parse::<OrderStatus>(),
            Err(OrderError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn test_display_matches_parse() {
        for status in OrderStatus::ALL {
            assert_eq!(status.to_string().parse::<OrderStatus>().unwrap(), status);
        }
    }
}
