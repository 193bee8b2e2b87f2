pub mod threat;
pub mod user;

/// Error returned when a stored enum label has no matching variant.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind}: {value:?}")]
pub struct ParseLabelError {
    pub kind: &'static str,
    pub value: String,
}

/// Parses a record identifier taken from a request path.
///
/// Only a non-empty run of ASCII digits that fits an `i64` is accepted;
/// signs, whitespace and anything else yield `None`.
pub fn parse_record_id(raw: &str) -> Option<i64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_digits() {
        assert_eq!(parse_record_id("1"), Some(1));
        assert_eq!(parse_record_id("000042"), Some(42));
    }

    #[test]
    fn rejects_malformed_ids() {
        assert_eq!(parse_record_id(""), None);
        assert_eq!(parse_record_id("abc"), None);
        assert_eq!(parse_record_id("+1"), None);
        assert_eq!(parse_record_id("-1"), None);
        assert_eq!(parse_record_id(" 1"), None);
        assert_eq!(parse_record_id("1.0"), None);
        // one past i64::MAX
        assert_eq!(parse_record_id("9223372036854775808"), None);
    }
}
