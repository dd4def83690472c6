//! Value objects shared by orders, offers and notifications.

use common::UserId;
use serde::{Deserialize, Serialize};

/// Money amount represented in cents to avoid floating point issues.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a new Money amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the dollar portion (whole number).
    pub fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the cents portion (remainder after dollars).
    pub fn cents_part(&self) -> i64 {
        self.0.abs() % 100
    }

    /// Returns true if the amount is positive.
    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Adds two amounts, clamping at the bounds instead of overflowing.
    pub fn saturating_add(self, other: Money) -> Money {
        Money(self.0.saturating_add(other.0))
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0 < 0 {
            write!(f, "-${}.{:02}", self.dollars().abs(), self.cents_part())
        } else {
            write!(f, "${}.{:02}", self.dollars(), self.cents_part())
        }
    }
}

/// Role of an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Creator,
    Manufacturer,
    Admin,
}

impl AccountType {
    /// Returns the wire name of the account type.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Creator => "creator",
            AccountType::Manufacturer => "manufacturer",
            AccountType::Admin => "admin",
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "creator" => Ok(AccountType::Creator),
            "manufacturer" => Ok(AccountType::Manufacturer),
            "admin" => Ok(AccountType::Admin),
            other => Err(format!("unknown account type: {other}")),
        }
    }
}

/// A user as referenced from orders and offers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
}

impl Contact {
    pub fn new(user_id: UserId, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user_id,
            name: name.into(),
            email: email.into(),
        }
    }
}

/// The authenticated caller of a domain operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub contact: Contact,
    pub account_type: AccountType,
}

impl Actor {
    pub fn new(contact: Contact, account_type: AccountType) -> Self {
        Self {
            contact,
            account_type,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.contact.user_id
    }

    pub fn is_admin(&self) -> bool {
        self.account_type == AccountType::Admin
    }

    pub fn is_manufacturer(&self) -> bool {
        self.account_type == AccountType::Manufacturer
    }

    /// Returns true if the actor is `user` or an admin.
    pub fn acts_for(&self, user: UserId) -> bool {
        self.is_admin() || self.user_id() == user
    }
}

/// Structured delivery address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}, {}, {} {}, {}",
            self.street, self.city, self.state, self.postal_code, self.country
        )
    }
}

/// Carrier details recorded once an order ships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingInfo {
    pub carrier: String,
    #[serde(default)]
    pub tracking_number: Option<String>,
}

/// Price terms copied from the accepted offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub unit_cost: Money,
    pub projected_cost: Money,
    pub projected_units: u32,
    pub shipping_cost: Money,
}

impl PriceSnapshot {
    /// Projected cost plus shipping.
    pub fn total(&self) -> Money {
        self.projected_cost.saturating_add(self.shipping_cost)
    }
}
