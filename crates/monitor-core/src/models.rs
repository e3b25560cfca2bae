/// Event-specific payload of an [`EventRecord`].
///
/// Numeric fields use `0` for "absent or not a number". The encoder treats a
/// zero value as absent as well, so a genuine zero price or amount in the log
/// is indistinguishable from a missing field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventFields {
    /// A regular item sale.
    ItemSold {
        description: Option<String>,
        upc: Option<String>,
        /// Extracted but never emitted.
        item_number: i64,
        price: i64,
        quantity: i64,
    },
    /// An `ItemSold` message carrying a positive `DiscountAmount`.
    Discount {
        upc: Option<String>,
        discount_amount: i64,
        discount_description: Option<String>,
    },
    /// Running transaction totals.
    Totals {
        total_amount: i64,
        balance_due: i64,
        item_count: i64,
    },
    /// A payment accepted by the device.
    TenderAccepted {
        amount: i64,
        tender_type: Option<String>,
        description: Option<String>,
    },
    /// Events that carry no data (transaction and mode changes).
    Empty,
}

/// One device event reconstructed from a framed log message.
///
/// Built once by the extractor and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    timestamp: Option<String>,
    event_type: String,
    fields: EventFields,
}

impl EventRecord {
    pub fn new(timestamp: Option<String>, event_type: impl Into<String>, fields: EventFields) -> Self {
        Self {
            timestamp,
            event_type: event_type.into(),
            fields,
        }
    }

    /// Text found between the first `[` and `]` of the message, if any.
    pub fn timestamp(&self) -> Option<&str> {
        self.timestamp.as_deref()
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn fields(&self) -> &EventFields {
        &self.fields
    }
}
