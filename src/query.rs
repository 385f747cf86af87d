//! Filter construction for the lookup tools.

use mongodb::bson::{doc, Bson, Document};

/// Maximum records returned by customer-ID and tracking-number lookups.
pub const LOOKUP_LIMIT: i64 = 50;

/// Response for free-text input to the customer-ID lookup.
pub const CUST_ID_FREE_TEXT_MESSAGE: &str = "The prompt you provided does not match any tools. Please provide a valid customer ID or tracking number.";

/// Response for free-text input to the tracking-number lookup, and the
/// default tool's reply.
pub const DEFAULT_MESSAGE: &str = "Hello from the MCP server!";

/// Input containing any whitespace is treated as a sentence rather than an
/// identifier.
#[must_use]
pub fn is_free_text(input: &str) -> bool {
    input.chars().any(char::is_whitespace)
}

/// Customer IDs are stored as strings, 64-bit integers or doubles depending
/// on when they were ingested, so digit-only input probes every form.
#[must_use]
pub fn cust_id_filter(cust_id: &str) -> Document {
    if !is_all_digits(cust_id) {
        return doc! { "cust_id": cust_id };
    }

    let mut forms: Vec<Bson> = vec![Bson::String(cust_id.to_string())];
    match cust_id.parse::<i64>() {
        Ok(long) => forms.push(Bson::Int64(long)),
        Err(_) => tracing::debug!(cust_id, "customer ID overflows i64; skipping integer probe"),
    }
    // A digit string always parses as f64, possibly losing precision.
    if let Ok(number) = cust_id.parse::<f64>() {
        forms.push(Bson::Double(number));
    }
    doc! { "cust_id": { "$in": forms } }
}

/// Matches records with at least one scan whose status equals `status`,
/// ignoring case.
#[must_use]
pub fn delivery_status_filter(status: &str) -> Document {
    let pattern = format!("^{}$", regex::escape(status));
    doc! { "scans.delivery_status": { "$regex": pattern, "$options": "i" } }
}

#[must_use]
pub fn tracking_number_filter(imb: &str) -> Document {
    doc! { "imb": imb }
}

fn is_all_digits(input: &str) -> bool {
    !input.is_empty() && input.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_marks_free_text() {
        assert!(is_free_text("has space"));
        assert!(is_free_text("tab\there"));
        assert!(is_free_text("trailing\n"));
        assert!(!is_free_text("abc-123"));
        assert!(!is_free_text("12345"));
    }

    #[test]
    fn numeric_cust_id_probes_all_representations() {
        let filter = cust_id_filter("12345");
        assert_eq!(
            filter,
            doc! {
                "cust_id": {
                    "$in": [Bson::String("12345".into()), Bson::Int64(12345), Bson::Double(12345.0)]
                }
            }
        );
    }

    #[test]
    fn leading_zeros_keep_string_form() {
        let filter = cust_id_filter("007");
        let forms = filter
            .get_document("cust_id")
            .unwrap()
            .get_array("$in")
            .unwrap();
        assert_eq!(forms[0], Bson::String("007".into()));
        assert_eq!(forms[1], Bson::Int64(7));
        assert_eq!(forms[2], Bson::Double(7.0));
    }

    #[test]
    fn oversized_numeric_cust_id_skips_integer_probe() {
        let filter = cust_id_filter("99999999999999999999");
        let forms = filter
            .get_document("cust_id")
            .unwrap()
            .get_array("$in")
            .unwrap();
        assert_eq!(forms.len(), 2);
        assert_eq!(forms[0], Bson::String("99999999999999999999".into()));
        assert!(matches!(forms[1], Bson::Double(_)));
    }

    #[test]
    fn non_numeric_cust_id_is_exact_string() {
        assert_eq!(cust_id_filter("abc-123"), doc! { "cust_id": "abc-123" });
        assert_eq!(cust_id_filter("-12"), doc! { "cust_id": "-12" });
        assert_eq!(cust_id_filter("1.5"), doc! { "cust_id": "1.5" });
    }

    #[test]
    fn status_filter_is_anchored_and_case_insensitive() {
        assert_eq!(
            delivery_status_filter("delivered"),
            doc! { "scans.delivery_status": { "$regex": "^delivered$", "$options": "i" } }
        );
    }

    #[test]
    fn status_filter_escapes_pattern_characters() {
        let filter = delivery_status_filter("In Transit (2)");
        let pattern = filter
            .get_document("scans.delivery_status")
            .unwrap()
            .get_str("$regex")
            .unwrap();
        assert_eq!(pattern, r"^In Transit \(2\)$");
    }

    #[test]
    fn status_pattern_matches_whole_value_only() {
        let filter = delivery_status_filter("delivered");
        let pattern = filter
            .get_document("scans.delivery_status")
            .unwrap()
            .get_str("$regex")
            .unwrap();
        let re = regex::RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .unwrap();
        assert!(re.is_match("Delivered"));
        assert!(re.is_match("DELIVERED"));
        assert!(!re.is_match("Out for Delivered Today"));
        assert!(!re.is_match("Delivered Today"));
    }

    #[test]
    fn tracking_number_is_exact_match() {
        assert_eq!(
            tracking_number_filter("00040123456789012345"),
            doc! { "imb": "00040123456789012345" }
        );
    }
}
