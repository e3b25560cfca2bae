//! Substring scanning primitives for the tag-like payload of SCO messages.
//!
//! The device log embeds fragments such as
//! `<message id="ItemSold" name="Item"><fields><field name="UPC" ftype="string">123</field>...`.
//! These helpers locate pieces of that text without parsing it as a
//! document: there is no entity decoding, no nesting awareness and no
//! validation. Each one returns `None` instead of guessing when the text it
//! needs is missing, so malformed input only affects the lookup at hand.

/// Opening token of a message element.
pub const MESSAGE_OPEN: &str = "<message";
/// Opening token of a field element.
pub const FIELD_OPEN: &str = "<field";
/// Closing token of a field element.
pub const FIELD_CLOSE: &str = "</field>";

/// Byte offset of the `>` that ends the opening tag at the start of `text`.
///
/// `text` is expected to begin at the tag's `<`. Returns `None` when the tag
/// is never closed.
pub fn find_element_close(text: &str) -> Option<usize> {
    text.find('>')
}

/// Value of the double-quoted attribute `name` inside `tag`.
///
/// The attribute name must be preceded by whitespace, so looking up `id`
/// never matches `uid="..."` or the tail of another attribute. Returns
/// `None` when the attribute is missing, empty or has no closing quote.
pub fn find_attribute<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    let needle = format!("{name}=\"");

    for (pos, _) in tag.match_indices(&needle) {
        let preceded_by_space = tag[..pos]
            .chars()
            .next_back()
            .is_some_and(char::is_whitespace);
        if !preceded_by_space {
            continue;
        }

        let value_start = pos + needle.len();
        let value = text_until(&tag[value_start..], "\"")?;
        return if value.is_empty() { None } else { Some(value) };
    }

    None
}

/// The prefix of `text` that precedes the first `close_token`.
///
/// Returns `None` when `close_token` does not occur.
pub fn text_until<'a>(text: &'a str, close_token: &str) -> Option<&'a str> {
    text.find(close_token).map(|end| &text[..end])
}

/// The opening tag at the start of `fragment`, without its trailing `>`.
///
/// Falls back to the whole fragment when the tag is unterminated.
pub fn opening_tag(fragment: &str) -> &str {
    match find_element_close(fragment) {
        Some(end) => &fragment[..end],
        None => fragment,
    }
}

/// One `<field ...>text</field>` element found by [`field_elements`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldElement<'a> {
    /// Value of the element's `name` attribute, if it has one.
    pub name: Option<&'a str>,
    /// Element text with surrounding whitespace trimmed.
    pub text: &'a str,
}

/// Iterate over every `<field ...>` element in `fragment`, in document
/// order. Elements without a closing tag are skipped.
pub fn field_elements(fragment: &str) -> impl Iterator<Item = FieldElement<'_>> {
    fragment
        .match_indices(FIELD_OPEN)
        .filter_map(move |(pos, _)| {
            let element = &fragment[pos..];
            // `<fields>` shares the prefix; only accept `<field` followed by
            // whitespace, `>` or `/`.
            let next = element[FIELD_OPEN.len()..].chars().next()?;
            if !(next.is_whitespace() || next == '>' || next == '/') {
                return None;
            }
            let close = find_element_close(element)?;
            let tag = &element[..close];
            let text = if tag.ends_with('/') {
                ""
            } else {
                text_until(&element[close + 1..], FIELD_CLOSE)?
            };
            Some(FieldElement {
                name: find_attribute(tag, "name"),
                text: text.trim(),
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── find_element_close ────────────────────────────────────────────────────

    #[test]
    fn test_find_element_close_simple() {
        let text = r#"<message id="ItemSold"><fields>"#;
        assert_eq!(find_element_close(text), Some(22));
    }

    #[test]
    fn test_find_element_close_unterminated() {
        assert_eq!(find_element_close(r#"<message id="ItemSold""#), None);
    }

    // ── find_attribute ────────────────────────────────────────────────────────

    #[test]
    fn test_find_attribute_present() {
        let tag = r#"<message id="ItemSold" name="Item" version="1""#;
        assert_eq!(find_attribute(tag, "id"), Some("ItemSold"));
        assert_eq!(find_attribute(tag, "name"), Some("Item"));
        assert_eq!(find_attribute(tag, "version"), Some("1"));
    }

    #[test]
    fn test_find_attribute_missing() {
        let tag = r#"<message name="EnterAssistMode""#;
        assert_eq!(find_attribute(tag, "id"), None);
    }

    #[test]
    fn test_find_attribute_requires_word_boundary() {
        let tag = r#"<message uid="abc" id="Totals""#;
        assert_eq!(find_attribute(tag, "id"), Some("Totals"));

        let tag = r#"<message uid="abc""#;
        assert_eq!(find_attribute(tag, "id"), None);
    }

    #[test]
    fn test_find_attribute_unclosed_quote() {
        assert_eq!(find_attribute(r#"<message id="Item"#, "id"), None);
    }

    #[test]
    fn test_find_attribute_empty_value() {
        assert_eq!(find_attribute(r#"<message id="" name="Item""#, "id"), None);
    }

    // ── text_until ────────────────────────────────────────────────────────────

    #[test]
    fn test_text_until_found() {
        assert_eq!(text_until("  Milk </field><field>", FIELD_CLOSE), Some("  Milk "));
    }

    #[test]
    fn test_text_until_missing_close() {
        assert_eq!(text_until("Milk", FIELD_CLOSE), None);
    }

    #[test]
    fn test_text_until_empty_prefix() {
        assert_eq!(text_until("</field>", FIELD_CLOSE), Some(""));
    }

    // ── opening_tag ───────────────────────────────────────────────────────────

    #[test]
    fn test_opening_tag_bounded() {
        let fragment = r#"<message id="Totals"><fields><field name="x">1</field>"#;
        assert_eq!(opening_tag(fragment), r#"<message id="Totals""#);
    }

    #[test]
    fn test_opening_tag_unterminated_uses_everything() {
        let fragment = r#"<message id="Totals""#;
        assert_eq!(opening_tag(fragment), fragment);
    }

    // ── field_elements ────────────────────────────────────────────────────────

    #[test]
    fn test_field_elements_in_order() {
        let fragment = r#"<message id="Command"><fields><field name="Command.1" ftype="string"> EnteredStoreMode </field><field name="X">2</field></fields></message>"#;
        let elements: Vec<FieldElement> = field_elements(fragment).collect();
        assert_eq!(
            elements,
            vec![
                FieldElement {
                    name: Some("Command.1"),
                    text: "EnteredStoreMode",
                },
                FieldElement {
                    name: Some("X"),
                    text: "2",
                },
            ]
        );
    }

    #[test]
    fn test_field_elements_without_name() {
        let fragment = r#"<field ftype="int">7</field>"#;
        let elements: Vec<FieldElement> = field_elements(fragment).collect();
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].name, None);
        assert_eq!(elements[0].text, "7");
    }

    #[test]
    fn test_field_elements_self_closing_is_empty() {
        let fragment = r#"<field name="A"/><field name="B">2</field>"#;
        let elements: Vec<FieldElement> = field_elements(fragment).collect();
        assert_eq!(elements[0], FieldElement { name: Some("A"), text: "" });
        assert_eq!(elements[1], FieldElement { name: Some("B"), text: "2" });
    }

    #[test]
    fn test_field_elements_skips_unclosed() {
        let fragment = r#"<fields><field name="A">1</field><field name="B">2"#;
        let texts: Vec<&str> = field_elements(fragment).map(|f| f.text).collect();
        assert_eq!(texts, vec!["1"]);
    }
}
