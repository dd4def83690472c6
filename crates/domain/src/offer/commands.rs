//! Offer commands.

use serde::Deserialize;

use super::{OfferError, OfferTerms};
use crate::value_objects::Money;

/// Command to bid on an order.
///
/// Every term is optional on the wire so that a missing field is reported as
/// a validation error naming it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitOffer {
    #[serde(default)]
    pub unit_cost: Option<Money>,
    #[serde(default)]
    pub projected_cost: Option<Money>,
    #[serde(default)]
    pub projected_units: Option<u32>,
    #[serde(default)]
    pub shipping_cost: Option<Money>,
    #[serde(default)]
    pub lead_time_days: Option<u32>,
}

fn money(value: Option<Money>, field: &'static str) -> Result<Money, OfferError> {
    let value = value.ok_or(OfferError::MissingTerm { field })?;
    if !value.is_positive() {
        return Err(OfferError::NonPositiveTerm { field });
    }
    Ok(value)
}

fn count(value: Option<u32>, field: &'static str) -> Result<u32, OfferError> {
    match value {
        None => Err(OfferError::MissingTerm { field }),
        Some(0) => Err(OfferError::NonPositiveTerm { field }),
        Some(value) => Ok(value),
    }
}

impl TryFrom<SubmitOffer> for OfferTerms {
    type Error = OfferError;

    fn try_from(cmd: SubmitOffer) -> Result<Self, Self::Error> {
        Ok(OfferTerms {
            unit_cost: money(cmd.unit_cost, "unit_cost")?,
            projected_cost: money(cmd.projected_cost, "projected_cost")?,
            projected_units: count(cmd.projected_units, "projected_units")?,
            shipping_cost: money(cmd.shipping_cost, "shipping_cost")?,
            lead_time_days: count(cmd.lead_time_days, "lead_time_days")?,
        })
    }
}
