use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::DEFAULT_USD_TO_SLL;
use crate::models::{Event, TicketType};
use crate::tickets::ticket_types_for;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\S+@\S+\.\S+").expect("valid email regex"));
static FEE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+(?:\.\d+)?)").expect("valid fee regex"));

const SLL_TO_USD: f64 = 0.000045;

#[derive(Debug, Error, PartialEq)]
pub enum CheckoutError {
    #[error("no tickets selected")]
    EmptySelection,
    #[error("unknown ticket type: {0}")]
    UnknownTicket(String),
    #[error("only {available} {ticket} tickets left, {requested} requested")]
    SoldOut {
        ticket: String,
        requested: u32,
        available: u32,
    },
    #[error("invalid customer details: {0:?}")]
    InvalidCustomer(BTreeMap<&'static str, String>),
    #[error("payment method not accepted for this event: {0}")]
    MethodUnavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "SLL")]
    Sll,
    /// Either currency is accepted.
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    Cash,
    MobileMoney,
    DigitalWallet,
    BankTransfer,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethod {
    pub id: &'static str,
    pub name: &'static str,
    pub kind: PaymentKind,
    pub currency: Currency,
    pub fees: &'static str,
    pub processing_time: &'static str,
    pub popular: bool,
}

pub const PAYMENT_METHODS: [PaymentMethod; 10] = [
    PaymentMethod {
        id: "usd_cash",
        name: "US Dollar (Cash)",
        kind: PaymentKind::Cash,
        currency: Currency::Usd,
        fees: "0%",
        processing_time: "Instant",
        popular: true,
    },
    PaymentMethod {
        id: "sll_cash",
        name: "Sierra Leone Leone (Cash)",
        kind: PaymentKind::Cash,
        currency: Currency::Sll,
        fees: "0%",
        processing_time: "Instant",
        popular: true,
    },
    PaymentMethod {
        id: "orange_money",
        name: "Orange Money",
        kind: PaymentKind::MobileMoney,
        currency: Currency::Sll,
        fees: "2.5%",
        processing_time: "Instant",
        popular: true,
    },
    PaymentMethod {
        id: "airtel_money",
        name: "Airtel Money",
        kind: PaymentKind::MobileMoney,
        currency: Currency::Sll,
        fees: "2.5%",
        processing_time: "Instant",
        popular: true,
    },
    PaymentMethod {
        id: "afrimoney",
        name: "AfriMoney",
        kind: PaymentKind::MobileMoney,
        currency: Currency::Sll,
        fees: "2.5%",
        processing_time: "Instant",
        popular: false,
    },
    PaymentMethod {
        id: "qmoney",
        name: "QMoney",
        kind: PaymentKind::MobileMoney,
        currency: Currency::Sll,
        fees: "2.5%",
        processing_time: "Instant",
        popular: false,
    },
    PaymentMethod {
        id: "cashapp",
        name: "Cash App",
        kind: PaymentKind::DigitalWallet,
        currency: Currency::Usd,
        fees: "2.9%",
        processing_time: "1-3 business days",
        popular: false,
    },
    PaymentMethod {
        id: "zelle",
        name: "Zelle",
        kind: PaymentKind::BankTransfer,
        currency: Currency::Usd,
        fees: "0%",
        processing_time: "Instant",
        popular: false,
    },
    PaymentMethod {
        id: "bank_transfer",
        name: "Bank Transfer",
        kind: PaymentKind::BankTransfer,
        currency: Currency::Both,
        fees: "1-3%",
        processing_time: "1-5 business days",
        popular: false,
    },
    PaymentMethod {
        id: "paypal",
        name: "PayPal",
        kind: PaymentKind::DigitalWallet,
        currency: Currency::Usd,
        fees: "3.4% + $0.30",
        processing_time: "Instant",
        popular: false,
    },
];

pub fn payment_method(id: &str) -> Option<&'static PaymentMethod> {
    PAYMENT_METHODS.iter().find(|m| m.id == id)
}

pub fn methods_of_kind(kind: PaymentKind) -> Vec<&'static PaymentMethod> {
    PAYMENT_METHODS.iter().filter(|m| m.kind == kind).collect()
}

/// Methods the organizer accepts; every method when the event lists none.
pub fn available_methods(event: &Event) -> Vec<&'static PaymentMethod> {
    match &event.payment_methods {
        Some(ids) => PAYMENT_METHODS
            .iter()
            .filter(|m| ids.iter().any(|id| id == m.id))
            .collect(),
        None => PAYMENT_METHODS.iter().collect(),
    }
}

impl Event {
    /// Some accepted method settles in leones.
    pub fn accepts_local_currency(&self) -> bool {
        available_methods(self)
            .iter()
            .any(|m| m.currency == Currency::Sll)
    }

    /// Some accepted method settles in dollars.
    pub fn accepts_usd(&self) -> bool {
        available_methods(self)
            .iter()
            .any(|m| m.currency == Currency::Usd)
    }
}

/// Mean of the leading percentage of each selected method, one decimal.
pub fn estimated_fee_percent(method_ids: &[String]) -> f64 {
    let fees: Vec<f64> = PAYMENT_METHODS
        .iter()
        .filter(|m| method_ids.iter().any(|id| id == m.id))
        .map(|m| parse_fee(m.fees))
        .collect();
    if fees.is_empty() {
        return 0.0;
    }
    let mean = fees.iter().sum::<f64>() / fees.len() as f64;
    (mean * 10.0).round() / 10.0
}

fn parse_fee(text: &str) -> f64 {
    FEE_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Display-only exchange between US dollars and leones.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurrencyConverter {
    pub usd_to_sll: f64,
}

impl Default for CurrencyConverter {
    fn default() -> Self {
        Self {
            usd_to_sll: DEFAULT_USD_TO_SLL,
        }
    }
}

impl CurrencyConverter {
    pub fn new(usd_to_sll: f64) -> Self {
        Self { usd_to_sll }
    }

    /// Whole leones.
    pub fn to_sll(&self, usd: f64) -> f64 {
        (usd * self.usd_to_sll).round()
    }

    /// Dollars rounded to cents.
    pub fn to_usd(&self, sll: f64) -> f64 {
        (sll * SLL_TO_USD * 100.0).round() / 100.0
    }

    pub fn convert(&self, amount: f64, from: Currency, to: Currency) -> f64 {
        match (from, to) {
            (Currency::Usd, Currency::Sll) => self.to_sll(amount),
            (Currency::Sll, Currency::Usd) => self.to_usd(amount),
            _ => amount,
        }
    }
}

/// `Free`, `Le 1,234,000` or `$12.5`.
pub fn format_price(amount: f64, currency: Currency) -> String {
    if amount == 0.0 {
        return "Free".to_string();
    }
    match currency {
        Currency::Sll => format!("Le {}", group_thousands(amount.round() as i64)),
        _ => format!("${}", format_dollars(amount)),
    }
}

fn format_dollars(amount: f64) -> String {
    let text = format!("{amount:.2}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if value < 0 {
        out.insert(0, '-');
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookedTicket {
    pub ticket_id: String,
    pub name: String,
    pub unit_price: f64,
    pub quantity: u32,
}

impl BookedTicket {
    pub fn subtotal(&self) -> f64 {
        self.unit_price * f64::from(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingSummary {
    pub event_id: String,
    pub event_title: String,
    pub tickets: Vec<BookedTicket>,
    pub total_quantity: u32,
    pub total_price: f64,
    pub total_price_sll: f64,
}

impl BookingSummary {
    /// Builds a summary from ticket id → quantity. Negative quantities count
    /// as zero and zero lines are dropped.
    pub fn build(
        event: &Event,
        selections: &BTreeMap<String, i64>,
        converter: &CurrencyConverter,
    ) -> Result<Self, CheckoutError> {
        let offered = ticket_types_for(event);
        let mut tickets = Vec::new();

        for (ticket_id, requested) in selections {
            let quantity = u32::try_from((*requested).max(0)).unwrap_or(u32::MAX);
            if quantity == 0 {
                continue;
            }
            let ticket: &TicketType = offered
                .iter()
                .find(|t| &t.id == ticket_id)
                .ok_or_else(|| CheckoutError::UnknownTicket(ticket_id.clone()))?;
            if quantity > ticket.available {
                return Err(CheckoutError::SoldOut {
                    ticket: ticket.name.clone(),
                    requested: quantity,
                    available: ticket.available,
                });
            }
            tickets.push(BookedTicket {
                ticket_id: ticket.id.clone(),
                name: ticket.name.clone(),
                unit_price: ticket.price,
                quantity,
            });
        }

        if tickets.is_empty() {
            return Err(CheckoutError::EmptySelection);
        }

        let total_quantity = tickets.iter().map(|t| t.quantity).sum();
        let total_price: f64 = tickets.iter().map(BookedTicket::subtotal).sum();
        Ok(Self {
            event_id: event.id.clone(),
            event_title: event.title.clone(),
            tickets,
            total_quantity,
            total_price,
            total_price_sll: converter.to_sll(total_price),
        })
    }

    pub fn is_free(&self) -> bool {
        self.total_price == 0.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerDetails {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub notes: String,
}

impl CustomerDetails {
    pub fn validate(&self) -> Result<(), CheckoutError> {
        let mut errors = BTreeMap::new();
        if self.name.trim().is_empty() {
            errors.insert("name", "Name is required".to_string());
        }
        if self.email.trim().is_empty() {
            errors.insert("email", "Email is required".to_string());
        } else if !EMAIL_RE.is_match(&self.email) {
            errors.insert("email", "Email is invalid".to_string());
        }
        if self.phone.trim().is_empty() {
            errors.insert("phone", "Phone number is required".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(CheckoutError::InvalidCustomer(errors))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Confirmed,
    PendingPayment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSelection {
    pub method_id: String,
    pub amount: f64,
    pub currency: Currency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingConfirmation {
    pub booking_id: String,
    pub customer: CustomerDetails,
    pub summary: BookingSummary,
    pub payment: PaymentSelection,
    pub booking_date: DateTime<Utc>,
    pub status: BookingStatus,
}

/// Final checkout step. Free bookings are confirmed at once; paid ones wait
/// for the attendee to follow the payment instructions.
pub fn complete_booking(
    event: &Event,
    summary: BookingSummary,
    customer: CustomerDetails,
    method_id: &str,
) -> Result<BookingConfirmation, CheckoutError> {
    customer.validate()?;
    let method = available_methods(event)
        .into_iter()
        .find(|m| m.id == method_id)
        .ok_or_else(|| CheckoutError::MethodUnavailable(method_id.to_string()))?;

    let amount = match method.currency {
        Currency::Sll => summary.total_price_sll,
        Currency::Usd | Currency::Both => summary.total_price,
    };
    let status = if summary.is_free() {
        BookingStatus::Confirmed
    } else {
        BookingStatus::PendingPayment
    };
    let now = Utc::now();

    log::info!(
        "booking for event {} via {} ({:?})",
        summary.event_id,
        method.id,
        status
    );
    Ok(BookingConfirmation {
        booking_id: format!("BK-{}", now.timestamp_millis()),
        customer,
        payment: PaymentSelection {
            method_id: method.id.to_string(),
            amount,
            currency: method.currency,
        },
        summary,
        booking_date: now,
        status,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInstructions {
    pub title: String,
    pub steps: Vec<String>,
    pub recipient: String,
    pub amount: String,
    pub additional_info: Option<String>,
}

/// Simulated instructions shown after choosing a paid method.
pub fn payment_instructions(
    payment: &PaymentSelection,
    event_title: &str,
    organizer_name: &str,
) -> Option<PaymentInstructions> {
    let method = payment_method(&payment.method_id)?;
    let amount = format_price(payment.amount, payment.currency);

    let mobile = |ussd: &str, phone: &str, fee: &str| PaymentInstructions {
        title: format!("{} Payment Instructions", method.name),
        steps: vec![
            format!("Dial {ussd} on your phone"),
            "Select \"Send Money\"".to_string(),
            format!("Enter the recipient number: {phone}"),
            format!("Enter amount: {amount}"),
            "Enter your PIN to confirm".to_string(),
            "Save the transaction reference number".to_string(),
            "Send the reference to the organizer".to_string(),
        ],
        recipient: format!("{organizer_name} ({phone})"),
        amount: amount.clone(),
        additional_info: Some(fee.to_string()),
    };

    let instructions = match method.id {
        "orange_money" => mobile(
            "*144#",
            "+232 76 123 456",
            "Transaction fee: Le 500 (charged by Orange Money)",
        ),
        "airtel_money" => mobile(
            "*432#",
            "+232 78 987 654",
            "Transaction fee: Le 500 (charged by Airtel Money)",
        ),
        "afrimoney" => mobile(
            "*797#",
            "+232 77 555 123",
            "Transaction fee: Le 300-1000 depending on amount",
        ),
        "qmoney" => mobile("*955#", "+232 99 888 777", "Transaction fee: 1.5% of amount"),
        "usd_cash" | "sll_cash" => PaymentInstructions {
            title: "Cash Payment Instructions".to_string(),
            steps: vec![
                format!("Bring {amount} in cash to the event entrance"),
                "Show your booking reference at check-in".to_string(),
                "Collect your receipt from the organizer".to_string(),
            ],
            recipient: organizer_name.to_string(),
            amount: amount.clone(),
            additional_info: None,
        },
        _ => PaymentInstructions {
            title: format!("{} Payment Instructions", method.name),
            steps: vec![
                format!("Open {}", method.name),
                format!("Send {amount} to {organizer_name}"),
                format!("Add note: \"Event Booking - {event_title}\""),
                "Keep the confirmation and share it with the organizer".to_string(),
            ],
            recipient: organizer_name.to_string(),
            amount: amount.clone(),
            additional_info: Some(format!("Processing time: {}", method.processing_time)),
        },
    };
    Some(instructions)
}
