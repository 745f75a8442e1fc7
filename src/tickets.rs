use crate::error::{Result, StoreError};
use crate::models::{Event, TicketType};
use crate::utils;

const DEFAULT_QUANTITY: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketPreset {
    GeneralAdmission,
    Vip,
    EarlyBird,
    Student,
    Group,
}

impl TicketPreset {
    pub const ALL: [TicketPreset; 5] = [
        TicketPreset::GeneralAdmission,
        TicketPreset::Vip,
        TicketPreset::EarlyBird,
        TicketPreset::Student,
        TicketPreset::Group,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TicketPreset::GeneralAdmission => "General Admission",
            TicketPreset::Vip => "VIP",
            TicketPreset::EarlyBird => "Early Bird",
            TicketPreset::Student => "Student",
            TicketPreset::Group => "Group (5+)",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            TicketPreset::GeneralAdmission => "Standard event access",
            TicketPreset::Vip => "Premium experience",
            TicketPreset::EarlyBird => "Limited time discount",
            TicketPreset::Student => "Discounted student rate",
            TicketPreset::Group => "Group discount for 5+ people",
        }
    }

    pub fn benefits(self) -> &'static [&'static str] {
        match self {
            TicketPreset::GeneralAdmission => &["Event access", "Basic seating"],
            TicketPreset::Vip => &["Priority seating", "Welcome drink", "VIP lounge access"],
            TicketPreset::EarlyBird => &["Discounted price", "Event access"],
            TicketPreset::Student => &["Student discount", "Event access"],
            TicketPreset::Group => &["Group discount", "Reserved seating"],
        }
    }

    /// Factor applied to the event's base price.
    pub fn price_multiplier(self) -> f64 {
        match self {
            TicketPreset::GeneralAdmission => 1.0,
            TicketPreset::Vip => 1.5,
            TicketPreset::EarlyBird => 0.8,
            TicketPreset::Student => 0.7,
            TicketPreset::Group => 0.85,
        }
    }

    pub fn ticket(self, event_price: f64) -> TicketType {
        TicketType {
            id: utils::next_id(),
            name: self.name().to_string(),
            description: self.description().to_string(),
            price: event_price * self.price_multiplier(),
            quantity: DEFAULT_QUANTITY,
            available: DEFAULT_QUANTITY,
            benefits: self.benefits().iter().map(|b| b.to_string()).collect(),
            is_limited: self == TicketPreset::EarlyBird,
            sold: 0,
        }
    }
}

/// Organizer-defined ticket type. Blank benefit lines are dropped.
pub fn custom_ticket(
    name: &str,
    description: &str,
    price: f64,
    quantity: u32,
    benefits: &[String],
    is_limited: bool,
) -> Result<TicketType> {
    if name.trim().is_empty() {
        return Err(StoreError::Validation("ticket name is required".to_string()));
    }
    if !price.is_finite() || price < 0.0 {
        return Err(StoreError::Validation(format!("invalid ticket price {price}")));
    }
    if quantity == 0 {
        return Err(StoreError::Validation(
            "ticket quantity must be at least 1".to_string(),
        ));
    }

    Ok(TicketType {
        id: utils::next_id(),
        name: name.trim().to_string(),
        description: description.to_string(),
        price,
        quantity,
        available: quantity,
        benefits: benefits
            .iter()
            .filter(|b| !b.trim().is_empty())
            .cloned()
            .collect(),
        is_limited,
        sold: 0,
    })
}

/// Ticket types on offer; events without any sell one general admission tier
/// covering the remaining capacity.
pub fn ticket_types_for(event: &Event) -> Vec<TicketType> {
    match &event.ticket_types {
        Some(types) if !types.is_empty() => types.clone(),
        _ => vec![TicketType {
            id: "general".to_string(),
            name: "General Admission".to_string(),
            description: "Standard event access".to_string(),
            price: event.price,
            quantity: event.max_attendees,
            available: event.spots_left(),
            benefits: vec!["Event access".to_string(), "Standard seating".to_string()],
            is_limited: false,
            sold: event.current_attendees,
        }],
    }
}

impl Event {
    /// Seats across every ticket type on offer.
    pub fn total_available_tickets(&self) -> u32 {
        ticket_types_for(self).iter().map(|t| t.quantity).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::sample_event;

    #[test]
    fn presets_scale_event_price() {
        let vip = TicketPreset::Vip.ticket(20.0);
        assert_eq!(vip.price, 30.0);
        assert_eq!(vip.available, vip.quantity);
        assert!(!vip.is_limited);

        let early = TicketPreset::EarlyBird.ticket(20.0);
        assert_eq!(early.price, 16.0);
        assert!(early.is_limited);
    }

    #[test]
    fn custom_ticket_drops_blank_benefits() {
        let benefits = vec!["Front row".to_string(), "  ".to_string()];
        let ticket = custom_ticket("Front Row", "", 50.0, 10, &benefits, true).unwrap();
        assert_eq!(ticket.benefits, vec!["Front row"]);
        assert_eq!(ticket.available, 10);
        assert_eq!(ticket.sold, 0);
    }

    #[test]
    fn custom_ticket_requires_name() {
        assert!(custom_ticket(" ", "", 1.0, 1, &[], false).is_err());
        assert!(custom_ticket("VIP", "", 1.0, 0, &[], false).is_err());
    }

    #[test]
    fn default_tier_covers_remaining_capacity() {
        let mut event = sample_event("1", "Music", 15.0, 40);
        event.current_attendees = 10;
        let types = ticket_types_for(&event);
        assert_eq!(types.len(), 1);
        assert_eq!(types[0].id, "general");
        assert_eq!(types[0].price, 15.0);
        assert_eq!(types[0].available, 30);
    }

    #[test]
    fn total_tickets_sum_quantities() {
        let mut event = sample_event("1", "Music", 15.0, 40);
        assert_eq!(event.total_available_tickets(), 40);

        event.ticket_types = Some(vec![
            TicketPreset::Vip.ticket(15.0),
            custom_ticket("Balcony", "", 5.0, 25, &[], false).unwrap(),
        ]);
        assert_eq!(event.total_available_tickets(), 125);
    }

    #[test]
    fn explicit_ticket_types_win() {
        let mut event = sample_event("1", "Music", 15.0, 40);
        event.ticket_types = Some(vec![TicketPreset::Student.ticket(10.0)]);
        let types = ticket_types_for(&event);
        assert_eq!(types[0].name, "Student");
    }
}
