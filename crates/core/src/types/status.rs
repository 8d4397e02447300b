//! Enumerations persisted as integer codes.
//!
//! Every enum here is stored in an integer column and exchanged over JSON as
//! the same integer, so a patch document can carry `"status": 2` without any
//! name mapping. Codes start at 1; `0` is reserved for [`AuthLevel::None`].

use serde::{Deserialize, Serialize};

/// An integer that does not correspond to any variant of the target enum.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("invalid {kind} code: {code}")]
pub struct UnknownCode {
    pub kind: &'static str,
    pub code: i64,
}

macro_rules! storage_codes {
    (
        $name:ident,
        $kind:literal,
        { $($variant:ident = $code:literal => $label:literal),+ $(,)? }
    ) => {
        impl $name {
            /// Integer stored in the database and sent over JSON.
            #[must_use]
            pub const fn code(self) -> i64 {
                match self {
                    $(Self::$variant => $code,)+
                }
            }

            /// Look up a variant by its storage code.
            ///
            /// # Errors
            ///
            /// Returns [`UnknownCode`] when no variant carries `code`.
            pub const fn from_code(code: i64) -> Result<Self, UnknownCode> {
                match code {
                    $($code => Ok(Self::$variant),)+
                    _ => Err(UnknownCode { kind: $kind, code }),
                }
            }
        }

        impl TryFrom<i64> for $name {
            type Error = UnknownCode;

            fn try_from(code: i64) -> Result<Self, Self::Error> {
                Self::from_code(code)
            }
        }

        impl From<$name> for i64 {
            fn from(value: $name) -> Self {
                value.code()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($label),)+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($label => Ok(Self::$variant),)+
                    _ => Err(format!("invalid {}: {s}", $kind)),
                }
            }
        }
    };
}

/// Authorization level, totally ordered `None < User < Staff`.
///
/// The same type describes what an account is and what a route requires, so a
/// check is a plain comparison: `account.level >= route.required`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(into = "i64", try_from = "i64")]
pub enum AuthLevel {
    /// Anonymous caller. Never stored on an account.
    #[default]
    None,
    User,
    Staff,
}

storage_codes!(AuthLevel, "auth level", {
    None = 0 => "none",
    User = 1 => "user",
    Staff = 2 => "staff",
});

impl AuthLevel {
    /// Whether a caller at this level may use something requiring `required`.
    #[must_use]
    pub fn satisfies(self, required: Self) -> bool {
        self >= required
    }
}

/// Order lifecycle.
///
/// `Created -> Paid -> InRealisation -> Shipped -> Completed`, with `Canceled`
/// reachable from every non-terminal state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum OrderStatus {
    #[default]
    Created,
    Paid,
    InRealisation,
    Shipped,
    Completed,
    Canceled,
}

storage_codes!(OrderStatus, "order status", {
    Created = 1 => "created",
    Paid = 2 => "paid",
    InRealisation = 3 => "in_realisation",
    Shipped = 4 => "shipped",
    Completed = 5 => "completed",
    Canceled = 6 => "canceled",
});

impl OrderStatus {
    /// Statuses from which an order can still be canceled.
    pub const OPEN: [Self; 4] = [Self::Created, Self::Paid, Self::InRealisation, Self::Shipped];

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Canceled)
    }

    /// The status that follows this one on the happy path.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Created => Some(Self::Paid),
            Self::Paid => Some(Self::InRealisation),
            Self::InRealisation => Some(Self::Shipped),
            Self::Shipped => Some(Self::Completed),
            Self::Completed | Self::Canceled => None,
        }
    }

    /// A status may stay the same, advance one step, or become `Canceled`
    /// while the order is still open.
    #[must_use]
    pub fn can_transition_to(self, target: Self) -> bool {
        if self == target {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        target == Self::Canceled || self.next() == Some(target)
    }
}

/// Product availability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum ProductStatus {
    #[default]
    InStock,
    OutOfStock,
    Discontinued,
}

storage_codes!(ProductStatus, "product status", {
    InStock = 1 => "in_stock",
    OutOfStock = 2 => "out_of_stock",
    Discontinued = 3 => "discontinued",
});

/// What happened to an audited resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum EntryKind {
    Creation,
    Modification,
    Deletion,
}

storage_codes!(EntryKind, "entry kind", {
    Creation = 1 => "creation",
    Modification = 2 => "modification",
    Deletion = 3 => "deletion",
});

/// Which kind of resource an audit entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum ResourceKind {
    Product,
    Order,
    Account,
    AccountPassword,
    Session,
}

storage_codes!(ResourceKind, "resource kind", {
    Product = 1 => "product",
    Order = 2 => "order",
    Account = 3 => "account",
    AccountPassword = 4 => "account_password",
    Session = 5 => "session",
});

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_level_ordering() {
        assert!(AuthLevel::None < AuthLevel::User);
        assert!(AuthLevel::User < AuthLevel::Staff);
        assert!(AuthLevel::Staff.satisfies(AuthLevel::User));
        assert!(!AuthLevel::User.satisfies(AuthLevel::Staff));
        assert!(AuthLevel::None.satisfies(AuthLevel::None));
    }

    #[test]
    fn test_codes_start_at_one() {
        assert_eq!(AuthLevel::User.code(), 1);
        assert_eq!(AuthLevel::Staff.code(), 2);
        assert_eq!(OrderStatus::Created.code(), 1);
        assert_eq!(OrderStatus::Canceled.code(), 6);
        assert_eq!(EntryKind::Deletion.code(), 3);
        assert_eq!(ResourceKind::Session.code(), 5);
    }

    #[test]
    fn test_from_code_rejects_unknown() {
        assert_eq!(OrderStatus::from_code(3).unwrap(), OrderStatus::InRealisation);
        let err = OrderStatus::from_code(9).unwrap_err();
        assert_eq!(err.code, 9);
        assert_eq!(err.to_string(), "invalid order status code: 9");
    }

    #[test]
    fn test_json_uses_codes() {
        assert_eq!(serde_json::to_string(&OrderStatus::Paid).unwrap(), "2");
        let status: ProductStatus = serde_json::from_str("3").unwrap();
        assert_eq!(status, ProductStatus::Discontinued);
        assert!(serde_json::from_str::<EntryKind>("0").is_err());
    }

    #[test]
    fn test_display_and_parse() {
        assert_eq!(ResourceKind::AccountPassword.to_string(), "account_password");
        assert_eq!("staff".parse::<AuthLevel>().unwrap(), AuthLevel::Staff);
        assert!("admin".parse::<AuthLevel>().is_err());
    }

    #[test]
    fn test_order_lifecycle() {
        use OrderStatus::*;
        assert!(Created.can_transition_to(Created));
        assert!(Created.can_transition_to(Paid));
        assert!(!Created.can_transition_to(Shipped));
        assert!(Shipped.can_transition_to(Completed));
        assert!(Paid.can_transition_to(Canceled));
        assert!(!Completed.can_transition_to(Canceled));
        assert!(!Canceled.can_transition_to(Created));
        assert!(!Paid.can_transition_to(Created));
    }

    #[test]
    fn test_open_statuses_are_not_terminal() {
        assert!(OrderStatus::OPEN.iter().all(|s| !s.is_terminal()));
        assert!(OrderStatus::Completed.is_terminal());
    }
}
