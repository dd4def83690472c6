//! Order status state machine.

use serde::{Deserialize, Serialize};

/// The stage of an order in its lifecycle.
///
/// State transitions:
/// ```text
/// Order Created ──► Manufacturer Offer ──► Order Accepted ──► Machine Setup
///   ──► Started Manufacturing ──► Quality Check ──► Shipped ──► Completed
/// ```
///
/// The first two transitions are driven by offers; the rest by the
/// manufacturer advancing the order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum OrderStatus {
    #[default]
    #[serde(rename = "Order Created")]
    OrderCreated,

    #[serde(rename = "Manufacturer Offer")]
    ManufacturerOffer,

    #[serde(rename = "Order Accepted")]
    OrderAccepted,

    #[serde(rename = "Machine Setup")]
    MachineSetup,

    #[serde(rename = "Started Manufacturing")]
    StartedManufacturing,

    #[serde(rename = "Quality Check")]
    QualityCheck,

    Shipped,

    /// Terminal.
    Completed,
}

impl OrderStatus {
    /// All stages, first to last.
    pub const ALL: [OrderStatus; 8] = [
        OrderStatus::OrderCreated,
        OrderStatus::ManufacturerOffer,
        OrderStatus::OrderAccepted,
        OrderStatus::MachineSetup,
        OrderStatus::StartedManufacturing,
        OrderStatus::QualityCheck,
        OrderStatus::Shipped,
        OrderStatus::Completed,
    ];

    /// Position of the stage in the lifecycle, starting at 0.
    pub fn ordinal(&self) -> usize {
        *self as usize
    }

    /// Returns true if this stage is `other` or comes after it.
    pub fn is_at_or_beyond(&self, other: OrderStatus) -> bool {
        self.ordinal() >= other.ordinal()
    }

    /// Returns true once a manufacturer has been assigned.
    pub fn is_claimed(&self) -> bool {
        self.is_at_or_beyond(OrderStatus::OrderAccepted)
    }

    /// Returns true if no further stage follows.
    pub fn is_terminal(&self) -> bool {
        StatusMachine::LINEAR.next(*self).is_none()
    }

    /// Returns the display name of the stage.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::OrderCreated => "Order Created",
            OrderStatus::ManufacturerOffer => "Manufacturer Offer",
            OrderStatus::OrderAccepted => "Order Accepted",
            OrderStatus::MachineSetup => "Machine Setup",
            OrderStatus::StartedManufacturing => "Started Manufacturing",
            OrderStatus::QualityCheck => "Quality Check",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Completed => "Completed",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown order status: {s}"))
    }
}

/// A transition table between order stages.
///
/// Each stage has at most one successor; a stage with no entry is terminal.
#[derive(Debug, Clone, Copy)]
pub struct StatusMachine {
    transitions: &'static [(OrderStatus, OrderStatus)],
}

impl StatusMachine {
    /// The fixed lifecycle every order follows.
    pub const LINEAR: StatusMachine = StatusMachine {
        transitions: &[
            (OrderStatus::OrderCreated, OrderStatus::ManufacturerOffer),
            (OrderStatus::ManufacturerOffer, OrderStatus::OrderAccepted),
            (OrderStatus::OrderAccepted, OrderStatus::MachineSetup),
            (OrderStatus::MachineSetup, OrderStatus::StartedManufacturing),
            (OrderStatus::StartedManufacturing, OrderStatus::QualityCheck),
            (OrderStatus::QualityCheck, OrderStatus::Shipped),
            (OrderStatus::Shipped, OrderStatus::Completed),
        ],
    };

    /// Builds a machine from a custom table.
    pub const fn new(transitions: &'static [(OrderStatus, OrderStatus)]) -> Self {
        Self { transitions }
    }

    /// Returns the stage following `current`, if any.
    pub fn next(&self, current: OrderStatus) -> Option<OrderStatus> {
        self.transitions
            .iter()
            .find(|(from, _)| *from == current)
            .map(|(_, to)| *to)
    }
}

impl Default for StatusMachine {
    fn default() -> Self {
        Self::LINEAR
    }
}

/// Returns the stage that follows `current`, or `None` at the terminal stage.
pub fn next_status(current: OrderStatus) -> Option<OrderStatus> {
    StatusMachine::LINEAR.next(current)
}

/// Like [`next_status`] for a display name; `None` for unrecognized names.
pub fn next_status_named(current: &str) -> Option<OrderStatus> {
    current.parse().ok().and_then(next_status)
}
