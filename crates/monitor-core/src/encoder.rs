//! Minified JSON rendering of [`EventRecord`]s.
//!
//! Output shape: `{"timestamp":"..","event_type":"..","data":{..}}`, one
//! object per record, keys in a fixed order per event type.
//!
//! Two conventions are deliberate and visible to consumers:
//! - numeric fields equal to `0` are omitted, the same as absent ones;
//! - with [`StringPolicy::Verbatim`] string values are written as found in
//!   the log, so a quote or backslash in a description yields invalid JSON.

use serde::{Deserialize, Serialize};

use crate::models::{EventFields, EventRecord};

/// How string values are written into the JSON output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StringPolicy {
    /// Embed text unchanged between quotes.
    #[default]
    Verbatim,
    /// Escape quotes, backslashes and control characters.
    Escaped,
}

/// Renders records as single-line JSON objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEncoder {
    policy: StringPolicy,
}

impl JsonEncoder {
    pub fn new(policy: StringPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> StringPolicy {
        self.policy
    }

    /// Encode `record` without a trailing newline.
    pub fn encode(&self, record: &EventRecord) -> String {
        let mut out = ObjectWriter::new(self.policy);

        if let Some(ts) = record.timestamp() {
            out.string("timestamp", ts);
        }
        out.string("event_type", record.event_type());
        out.open_object("data");

        match record.fields() {
            EventFields::ItemSold {
                description,
                upc,
                item_number: _,
                price,
                quantity,
            } => {
                out.opt_string("description", description.as_deref());
                out.opt_string("upc", upc.as_deref());
                out.nonzero("price", *price);
                out.nonzero("quantity", *quantity);
            }
            EventFields::Discount {
                upc,
                discount_amount,
                discount_description,
            } => {
                out.opt_string("upc", upc.as_deref());
                out.nonzero("discount_amount", *discount_amount);
                out.opt_string("discount_description", discount_description.as_deref());
            }
            EventFields::Totals {
                total_amount,
                balance_due,
                item_count,
            } => {
                out.nonzero("total_amount", *total_amount);
                out.nonzero("balance_due", *balance_due);
                out.nonzero("item_count", *item_count);
            }
            EventFields::TenderAccepted {
                amount,
                tender_type,
                description,
            } => {
                out.nonzero("amount", *amount);
                out.opt_string("tender_type", tender_type.as_deref());
                out.opt_string("description", description.as_deref());
            }
            EventFields::Empty => {}
        }

        out.close_object();
        out.finish()
    }
}

/// Encode with the default [`StringPolicy::Verbatim`].
pub fn encode(record: &EventRecord) -> String {
    JsonEncoder::default().encode(record)
}

// ── ObjectWriter ──────────────────────────────────────────────────────────────

/// Appends `"key":value` members, tracking comma placement per nesting level.
struct ObjectWriter {
    buf: String,
    /// One entry per open object: `true` until its first member is written.
    first: Vec<bool>,
    policy: StringPolicy,
}

impl ObjectWriter {
    fn new(policy: StringPolicy) -> Self {
        Self {
            buf: String::from("{"),
            first: vec![true],
            policy,
        }
    }

    fn key(&mut self, key: &str) {
        if let Some(first) = self.first.last_mut() {
            if !*first {
                self.buf.push(',');
            }
            *first = false;
        }
        self.buf.push('"');
        self.buf.push_str(key);
        self.buf.push_str("\":");
    }

    fn string(&mut self, key: &str, value: &str) {
        self.key(key);
        match self.policy {
            StringPolicy::Verbatim => {
                self.buf.push('"');
                self.buf.push_str(value);
                self.buf.push('"');
            }
            StringPolicy::Escaped => {
                let escaped = serde_json::Value::String(value.to_owned()).to_string();
                self.buf.push_str(&escaped);
            }
        }
    }

    fn opt_string(&mut self, key: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.string(key, value);
        }
    }

    /// Zero is the "absent" sentinel and is never written.
    fn nonzero(&mut self, key: &str, value: i64) {
        if value != 0 {
            self.key(key);
            self.buf.push_str(&value.to_string());
        }
    }

    fn open_object(&mut self, key: &str) {
        self.key(key);
        self.buf.push('{');
        self.first.push(true);
    }

    fn close_object(&mut self) {
        self.buf.push('}');
        self.first.pop();
    }

    fn finish(mut self) -> String {
        self.buf.push('}');
        self.buf
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn item_sold(description: &str, upc: &str, price: i64, quantity: i64) -> EventRecord {
        EventRecord::new(
            Some("2026-02-01 16:16:02:879".to_string()),
            "ItemSold",
            EventFields::ItemSold {
                description: Some(description.to_string()),
                upc: Some(upc.to_string()),
                item_number: 7,
                price,
                quantity,
            },
        )
    }

    #[test]
    fn test_encode_item_sold_omits_zero_and_item_number() {
        let json = encode(&item_sold("Milk", "123", 250, 0));
        assert_eq!(
            json,
            r#"{"timestamp":"2026-02-01 16:16:02:879","event_type":"ItemSold","data":{"description":"Milk","upc":"123","price":250}}"#
        );
    }

    #[test]
    fn test_encode_item_sold_with_quantity() {
        let json = encode(&item_sold("Bread", "456", 120, 2));
        assert!(json.ends_with(r#""data":{"description":"Bread","upc":"456","price":120,"quantity":2}}"#));
    }

    #[test]
    fn test_encode_discount_order() {
        let record = EventRecord::new(
            Some("t".to_string()),
            "Discount",
            EventFields::Discount {
                upc: Some("555".to_string()),
                discount_amount: 10,
                discount_description: Some("Promo".to_string()),
            },
        );
        assert_eq!(
            encode(&record),
            r#"{"timestamp":"t","event_type":"Discount","data":{"upc":"555","discount_amount":10,"discount_description":"Promo"}}"#
        );
    }

    #[test]
    fn test_encode_totals_order() {
        let record = EventRecord::new(
            Some("t".to_string()),
            "Totals",
            EventFields::Totals {
                total_amount: 1299,
                balance_due: 299,
                item_count: 3,
            },
        );
        assert_eq!(
            encode(&record),
            r#"{"timestamp":"t","event_type":"Totals","data":{"total_amount":1299,"balance_due":299,"item_count":3}}"#
        );
    }

    #[test]
    fn test_encode_tender_accepted_missing_strings_omitted() {
        let record = EventRecord::new(
            Some("t".to_string()),
            "TenderAccepted",
            EventFields::TenderAccepted {
                amount: 500,
                tender_type: None,
                description: Some("EUR".to_string()),
            },
        );
        assert_eq!(
            encode(&record),
            r#"{"timestamp":"t","event_type":"TenderAccepted","data":{"amount":500,"description":"EUR"}}"#
        );
    }

    #[test]
    fn test_encode_negative_values_are_emitted() {
        let record = EventRecord::new(
            None,
            "Totals",
            EventFields::Totals {
                total_amount: -50,
                balance_due: 0,
                item_count: 0,
            },
        );
        assert_eq!(
            encode(&record),
            r#"{"event_type":"Totals","data":{"total_amount":-50}}"#
        );
    }

    #[test]
    fn test_encode_empty_without_timestamp() {
        let record = EventRecord::new(None, "EnterAssistMode", EventFields::Empty);
        assert_eq!(encode(&record), r#"{"event_type":"EnterAssistMode","data":{}}"#);
    }

    #[test]
    fn test_encode_verbatim_keeps_quotes() {
        let json = encode(&item_sold(r#"12" Pizza"#, "1", 0, 0));
        assert!(json.contains(r#""description":"12" Pizza""#));
    }

    #[test]
    fn test_encode_escaped_policy_produces_valid_json() {
        let encoder = JsonEncoder::new(StringPolicy::Escaped);
        let json = encoder.encode(&item_sold("12\" Pizza\\\t", "1", 0, 0));

        let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        assert_eq!(value["data"]["description"], "12\" Pizza\\\t");
        assert_eq!(value["event_type"], "ItemSold");
    }

    #[test]
    fn test_encode_is_deterministic() {
        let record = item_sold("Milk", "123", 250, 1);
        assert_eq!(encode(&record), encode(&record));
    }

    #[test]
    fn test_encoder_default_policy_is_verbatim() {
        assert_eq!(JsonEncoder::default().policy(), StringPolicy::Verbatim);
    }
}
