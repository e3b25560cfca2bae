//! Turns the text of one framed message into an [`EventRecord`].
//!
//! Extraction is lenient: a missing or malformed field falls back to `None`
//! (strings) or `0` (numbers). Only two conditions drop the whole message:
//! no `<message` token in the text, or no resolvable event type.

use crate::models::{EventFields, EventRecord};
use crate::scan::{self, MESSAGE_OPEN};

/// Self-contained assist-mode tags recognised even when the message's
/// attributes cannot be resolved.
const ASSIST_MODE_SIGNATURES: [(&str, &str); 2] = [
    (r#"<message name="EnterAssistMode""#, "EnterAssistMode"),
    (r#"<message name="ExitAssistMode""#, "ExitAssistMode"),
];

/// Field text that turns a `Command` message into `EnteredStoreMode`.
const ENTERED_STORE_MODE: &str = "EnteredStoreMode";

// ── Public API ────────────────────────────────────────────────────────────────

/// Extract a typed event from a framed message.
///
/// Returns `None` for malformed messages (no message element, or no event
/// type). Identical input always yields an identical record.
pub fn extract(text: &str) -> Option<EventRecord> {
    let timestamp = extract_timestamp(text).map(str::to_string);

    let start = text.find(MESSAGE_OPEN)?;
    let fragment = &text[start..];

    let resolved = resolve_event_type(text, fragment)?;
    let event_type = if resolved == "Command" && has_field_text(fragment, ENTERED_STORE_MODE) {
        ENTERED_STORE_MODE
    } else {
        resolved
    };

    let (event_type, fields) = match event_type {
        "ItemSold" => item_sold_or_discount(fragment),
        "Totals" => (
            event_type,
            EventFields::Totals {
                total_amount: int_field(fragment, "TotalAmount"),
                balance_due: int_field(fragment, "BalanceDue"),
                item_count: int_field(fragment, "ItemCount"),
            },
        ),
        "TenderAccepted" => (
            event_type,
            EventFields::TenderAccepted {
                amount: int_field(fragment, "Amount"),
                tender_type: owned_field(fragment, "TenderType"),
                description: owned_field(fragment, "Description"),
            },
        ),
        _ => (event_type, EventFields::Empty),
    };

    Some(EventRecord::new(timestamp, event_type, fields))
}

/// Text between the first `[` and the next `]`.
pub fn extract_timestamp(text: &str) -> Option<&str> {
    let open = text.find('[')?;
    scan::text_until(&text[open + 1..], "]")
}

/// Trimmed text of the first `<field>` element whose `name` attribute is
/// `name`, captured up to the next `</field>`.
pub fn field<'a>(fragment: &'a str, name: &str) -> Option<&'a str> {
    scan::field_elements(fragment)
        .find(|element| element.name == Some(name))
        .map(|element| element.text)
}

/// Integer value of the field named `name`, or `0` when absent or not numeric.
pub fn int_field(fragment: &str, name: &str) -> i64 {
    field(fragment, name).map(parse_leading_int).unwrap_or(0)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Resolve the event type: `id` attribute, then `name` attribute, then the
/// literal assist-mode signatures.
fn resolve_event_type<'a>(text: &str, fragment: &'a str) -> Option<&'a str> {
    let tag = scan::opening_tag(fragment);
    scan::find_attribute(tag, "id")
        .or_else(|| scan::find_attribute(tag, "name"))
        .or_else(|| {
            ASSIST_MODE_SIGNATURES
                .iter()
                .find(|(signature, _)| text.contains(signature))
                .map(|(_, event_type)| *event_type)
        })
}

fn has_field_text(fragment: &str, wanted: &str) -> bool {
    scan::field_elements(fragment).any(|element| element.text == wanted)
}

fn owned_field(fragment: &str, name: &str) -> Option<String> {
    field(fragment, name).map(str::to_string)
}

/// An `ItemSold` message with a positive `DiscountAmount` is a discount line.
fn item_sold_or_discount(fragment: &str) -> (&'static str, EventFields) {
    let discount_amount = int_field(fragment, "DiscountAmount");
    if discount_amount > 0 {
        return (
            "Discount",
            EventFields::Discount {
                upc: owned_field(fragment, "UPC"),
                discount_amount,
                discount_description: owned_field(fragment, "DiscountDescription.1"),
            },
        );
    }

    (
        "ItemSold",
        EventFields::ItemSold {
            description: owned_field(fragment, "Description"),
            upc: owned_field(fragment, "UPC"),
            item_number: int_field(fragment, "ItemNumber"),
            price: int_field(fragment, "Price"),
            quantity: int_field(fragment, "Quantity"),
        },
    )
}

/// Parse an optional sign followed by a run of ASCII digits.
///
/// Anything after the run is ignored. No digits, or a value that does not fit
/// in an `i64`, gives `0`.
fn parse_leading_int(text: &str) -> i64 {
    let text = text.trim_start();
    let sign_len = usize::from(text.starts_with(|c: char| c == '+' || c == '-'));
    let digits_len = text[sign_len..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();

    if digits_len == 0 {
        return 0;
    }
    text[..sign_len + digits_len].parse().unwrap_or(0)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
