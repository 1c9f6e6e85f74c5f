//! Status enums for orders, bookings, payments, outbox rows and admin roles.
//!
//! Statuses are stored as `TEXT` using the human-readable spellings the back
//! office has always used (`"In Transit"`, `"Not Booked"`), so each enum has a
//! matching `as_str`/`FromStr` pair instead of a `PostgreSQL` enum type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when a stored or submitted status string is unknown.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value:?}")]
pub struct StatusParseError {
    /// Which status family was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

macro_rules! text_status {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The stored spelling of this status.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = StatusParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(StatusParseError {
                        kind: $kind,
                        value: s.to_owned(),
                    }),
                }
            }
        }
    };
}

text_status! {
    /// Lifecycle of an order header.
    ///
    /// `Pending` is set at checkout; the stock allocator moves an order to
    /// `In Transit` once every requested line has been issued.
    OrderStatus, "order status" {
        /// Created at checkout, nothing issued yet.
        Pending => "Pending",
        /// Stock issued from the warehouse.
        InTransit => "In Transit",
        /// Received by the customer.
        Delivered => "Delivered",
        /// Cancelled before dispatch.
        Cancelled => "Cancelled",
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl OrderStatus {
    /// Whether an order may move from `self` to `next`.
    ///
    /// ```
    /// use backoffice_core::OrderStatus;
    ///
    /// assert!(OrderStatus::Pending.can_transition_to(OrderStatus::InTransit));
    /// assert!(!OrderStatus::InTransit.can_transition_to(OrderStatus::Pending));
    /// assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Cancelled));
    /// ```
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::InTransit | Self::Cancelled)
                | (Self::InTransit, Self::Delivered | Self::Cancelled)
        )
    }

    /// Terminal statuses accept no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }
}

text_status! {
    /// Reservation state of a single order item.
    BookingStatus, "booking status" {
        /// Created at checkout (schema default).
        NotBooked => "Not Booked",
        /// Stock has been issued against the order item.
        Issued => "Issued",
    }
}

text_status! {
    /// Payment record state.
    PaymentStatus, "payment status" {
        /// Recorded at checkout, not yet settled.
        Pending => "Pending",
        /// Settled by the payment provider.
        Paid => "Paid",
        /// Returned to the customer.
        Refunded => "Refunded",
    }
}

text_status! {
    /// Delivery state of a queued invoice email.
    OutboxStatus, "outbox status" {
        /// Waiting for (another) delivery attempt.
        Pending => "pending",
        /// Delivered to the SMTP relay.
        Sent => "sent",
        /// Gave up after the maximum number of attempts.
        Failed => "failed",
    }
}

text_status! {
    /// Admin role with different permission levels.
    AdminRole, "admin role" {
        /// Full access, including managing other admins.
        SuperAdmin => "super_admin",
        /// Full access to the tenant's catalog, stock and orders.
        Admin => "admin",
        /// Read-only access to the tenant's data.
        Viewer => "viewer",
    }
}

impl AdminRole {
    /// Whether this role may create, update or delete tenant data.
    #[must_use]
    pub const fn can_write(self) -> bool {
        matches!(self, Self::SuperAdmin | Self::Admin)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_text_round_trip() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), *status);
        }
        assert_eq!(OrderStatus::InTransit.to_string(), "In Transit");
    }

    #[test]
    fn test_order_status_serde_uses_stored_spelling() {
        let json = serde_json::to_string(&OrderStatus::InTransit).unwrap();
        assert_eq!(json, "\"In Transit\"");
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let err = "Shipped".parse::<OrderStatus>().unwrap_err();
        assert_eq!(err.kind, "order status");
        assert_eq!(err.value, "Shipped");
    }

    #[test]
    fn test_terminal_statuses_have_no_transitions() {
        for from in OrderStatus::ALL.iter().filter(|s| s.is_terminal()) {
            for to in OrderStatus::ALL {
                assert!(!from.can_transition_to(*to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_booking_status_spelling() {
        assert_eq!(BookingStatus::NotBooked.as_str(), "Not Booked");
        assert_eq!("Issued".parse::<BookingStatus>().unwrap(), BookingStatus::Issued);
    }

    #[test]
    fn test_admin_role_write_access() {
        assert!(AdminRole::SuperAdmin.can_write());
        assert!(AdminRole::Admin.can_write());
        assert!(!AdminRole::Viewer.can_write());
        assert_eq!("viewer".parse::<AdminRole>().unwrap(), AdminRole::Viewer);
    }
}
