//! Email templates for marketplace events.

use domain::{Contact, MarketEvent, OfferSummary, OrderSummary, ShippingInfo};

use crate::mailer::Email;

/// Rendered in place of an absent optional field.
pub const NOT_PROVIDED: &str = "Not provided";

fn or_placeholder(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => NOT_PROVIDED,
    }
}

fn offer_terms(offer: &OfferSummary) -> String {
    format!(
        "Unit cost: {}\nProjected cost: {}\nProjected units: {}\nShipping cost: {}\nTotal: {}\nLead time: {} days",
        offer.unit_cost,
        offer.projected_cost,
        offer.projected_units,
        offer.shipping_cost,
        offer.price().total(),
        offer.lead_time_days,
    )
}

fn offer_submitted(order: &OrderSummary, offer: &OfferSummary) -> Email {
    Email {
        to: order.creator.email.clone(),
        subject: format!("New offer on \"{}\"", order.title),
        text: format!(
            "Hi {},\n\n{} submitted an offer on your order \"{}\".\n\n{}\n\nReview it from your order page.",
            order.creator.name,
            offer.manufacturer.name,
            order.title,
            offer_terms(offer),
        ),
    }
}

fn offer_accepted(order: &OrderSummary, offer: &OfferSummary) -> Email {
    Email {
        to: offer.manufacturer.email.clone(),
        subject: format!("Your offer on \"{}\" was accepted", order.title),
        text: format!(
            "Hi {},\n\n{} accepted your offer on \"{}\".\n\nQuantity: {}\nDue date: {}\n\n{}",
            offer.manufacturer.name,
            order.creator.name,
            order.title,
            order.quantity,
            order.due_date,
            offer_terms(offer),
        ),
    }
}

fn offer_declined(order: &OrderSummary, offer: &OfferSummary) -> Email {
    Email {
        to: offer.manufacturer.email.clone(),
        subject: format!("Your offer on \"{}\" was declined", order.title),
        text: format!(
            "Hi {},\n\nYour offer on \"{}\" was not selected. Thank you for bidding.",
            offer.manufacturer.name, order.title,
        ),
    }
}

fn order_shipped(order: &OrderSummary, shipping: Option<&ShippingInfo>) -> Email {
    let carrier = or_placeholder(shipping.map(|s| s.carrier.as_str()));
    let tracking = or_placeholder(shipping.and_then(|s| s.tracking_number.as_deref()));
    let manufacturer = or_placeholder(order.manufacturer.as_ref().map(|m| m.name.as_str()));

    Email {
        to: order.creator.email.clone(),
        subject: format!("\"{}\" has shipped", order.title),
        text: format!(
            "Hi {},\n\nYour order \"{}\" has shipped.\n\nManufacturer: {}\nCarrier: {}\nTracking number: {}",
            order.creator.name, order.title, manufacturer, carrier, tracking,
        ),
    }
}

fn order_updated(order: &OrderSummary, recipient: &Contact, changes: &[String]) -> Email {
    let changed = if changes.is_empty() {
        NOT_PROVIDED.to_string()
    } else {
        changes.join(", ")
    };
    Email {
        to: recipient.email.clone(),
        subject: format!("\"{}\" was updated", order.title),
        text: format!(
            "Hi {},\n\nThe order \"{}\" was updated.\n\nChanged: {}\nStatus: {}",
            recipient.name, order.title, changed, order.status,
        ),
    }
}

/// Renders the emails an event triggers; most events trigger none.
pub fn render(event: &MarketEvent) -> Vec<Email> {
    match event {
        MarketEvent::OfferSubmitted { order, offer } => vec![offer_submitted(order, offer)],
        MarketEvent::OfferAccepted { order, offer } => vec![offer_accepted(order, offer)],
        MarketEvent::OfferDeclined { order, offer } => vec![offer_declined(order, offer)],
        MarketEvent::OrderShipped { order, shipping } => {
            vec![order_shipped(order, shipping.as_ref())]
        }
        MarketEvent::OrderUpdated {
            order,
            recipient: Some(recipient),
            changes,
        } => vec![order_updated(order, recipient, changes)],
        _ => Vec::new(),
    }
}
