//! URI normalization
//!
//! External identifiers arrive in two shapes:
//!
//! - web locators (`http`/`https`), where the value is everything after
//!   `scheme://`, query string included;
//! - namespaced identifiers (`urn:isbn:...`, `info:doi:...`), where the
//!   hierarchical part is split on its first colon into a namespace and a
//!   value, and the stored scheme becomes `<scheme>:<namespace>`.
//!
//! Both halves are stored lowercased. ISBN values are stored without hyphens.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, TranslatorError};

/// Namespace whose values are stored hyphenless
pub const ISBN_NAMESPACE: &str = "isbn";

const WEB_SCHEMES: [&str; 2] = ["http", "https"];

/// Canonical `(scheme, value)` decomposition of a URI
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UriParts {
    pub scheme: String,
    pub value: String,
}

impl UriParts {
    pub fn new(scheme: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            value: value.into(),
        }
    }

    /// Rebuild a full URI string from the stored parts
    pub fn to_uri(&self) -> String {
        denormalize(&self.scheme, &self.value)
    }
}

impl fmt::Display for UriParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uri())
    }
}

/// Split a URI into its canonical scheme and value.
///
/// ```
/// use identifier_translator::uri::normalize;
///
/// let parts = normalize("urn:isbn:978-1-78374-000-0").unwrap();
/// assert_eq!(parts.scheme, "urn:isbn");
/// assert_eq!(parts.value, "9781783740000");
/// ```
pub fn normalize(input: &str) -> Result<UriParts> {
    let trimmed = input.trim();
    let parsed = Url::parse(trimmed).map_err(|_| invalid(input))?;
    let scheme_name = parsed.scheme();

    // Url lowercases the scheme but rewrites the rest; work on the raw text.
    let (_, hierarchical) = trimmed.split_once(':').ok_or_else(|| invalid(input))?;

    let (scheme, value) = if WEB_SCHEMES.contains(&scheme_name) {
        let value = match hierarchical.strip_prefix("//") {
            Some(rest) => rest.to_string(),
            None => parsed
                .as_str()
                .split_once("://")
                .map(|(_, rest)| rest.to_string())
                .ok_or_else(|| invalid(input))?,
        };
        (scheme_name.to_string(), value)
    } else {
        let (namespace, value) = hierarchical
            .split_once(':')
            .ok_or_else(|| invalid(input))?;
        if namespace.is_empty() {
            return Err(invalid(input));
        }
        let value = if namespace.eq_ignore_ascii_case(ISBN_NAMESPACE) {
            value.replace('-', "")
        } else {
            value.to_string()
        };
        (format!("{scheme_name}:{namespace}"), value)
    };

    if value.is_empty() {
        return Err(invalid(input));
    }

    Ok(UriParts {
        scheme: scheme.to_lowercase(),
        value: value.to_lowercase(),
    })
}

/// Join a stored scheme and value back into a URI string.
///
/// Not byte-identical to whatever was originally submitted, but
/// `normalize(denormalize(s, v)) == (s, v)` for normalized input.
pub fn denormalize(scheme: &str, value: &str) -> String {
    if WEB_SCHEMES.contains(&scheme) {
        format!("{scheme}://{value}")
    } else {
        format!("{scheme}:{value}")
    }
}

fn invalid(input: &str) -> TranslatorError {
    TranslatorError::InvalidUri {
        input: input.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn web_uri_keeps_scheme_and_lowercases_path() {
        let parts = normalize("https://DOI.ORG/10.1/X").unwrap();
        assert_eq!(parts, UriParts::new("https", "doi.org/10.1/x"));
    }

    #[test]
    fn web_uri_preserves_query_string() {
        let parts = normalize("http://example.org/book?id=42&Format=PDF").unwrap();
        assert_eq!(parts.scheme, "http");
        assert_eq!(parts.value, "example.org/book?id=42&format=pdf");
    }

    #[test]
    fn uppercase_web_scheme_is_lowered() {
        let parts = normalize("HTTPS://Example.org/A").unwrap();
        assert_eq!(parts, UriParts::new("https", "example.org/a"));
    }

    #[test]
    fn isbn_hyphens_are_stripped() {
        let parts = normalize("urn:isbn:978-1-78374-000-0").unwrap();
        assert_eq!(parts, UriParts::new("urn:isbn", "9781783740000"));
    }

    #[test]
    fn namespaced_identifier_splits_on_first_colon() {
        let parts = normalize("info:doi:10.11647/OBP.0130").unwrap();
        assert_eq!(parts, UriParts::new("info:doi", "10.11647/obp.0130"));

        let parts = normalize("urn:uuid:a:b").unwrap();
        assert_eq!(parts, UriParts::new("urn:uuid", "a:b"));
    }

    #[test]
    fn hyphens_outside_isbn_are_kept() {
        let parts = normalize("urn:issn:2054-2437").unwrap();
        assert_eq!(parts.value, "2054-2437");
    }

    #[test]
    fn missing_namespace_colon_is_invalid() {
        let err = normalize("doi:10.11647/obp.0130").unwrap_err();
        assert!(matches!(err, TranslatorError::InvalidUri { .. }));
    }

    #[test]
    fn unparseable_inputs_are_invalid() {
        for input in ["", "no scheme here", "urn::123", "urn:isbn:", "http://"] {
            assert!(
                matches!(normalize(input), Err(TranslatorError::InvalidUri { .. })),
                "expected {input:?} to be rejected"
            );
        }
    }

    #[test]
    fn denormalize_builds_uri_per_scheme_class() {
        assert_eq!(denormalize("https", "doi.org/10.1/x"), "https://doi.org/10.1/x");
        assert_eq!(denormalize("urn:isbn", "9781783740000"), "urn:isbn:9781783740000");
    }

    #[test]
    fn denormalize_round_trips_namespaced_parts() {
        let parts = normalize("urn:isbn:978-1-78374-000-0").unwrap();
        assert_eq!(normalize(&parts.to_uri()).unwrap(), parts);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_web_uri() -> impl Strategy<Value = String> {
        (
            prop_oneof![Just("http"), Just("https"), Just("HTTP"), Just("Https")],
            "[a-zA-Z][a-zA-Z0-9]{0,10}\\.[a-zA-Z]{2,5}",
            "(/[a-zA-Z0-9_-]{1,8}){0,3}",
            "(\\?[a-z]{1,5}=[a-zA-Z0-9]{1,5})?",
        )
            .prop_map(|(scheme, host, path, query)| format!("{scheme}://{host}{path}{query}"))
    }

    proptest! {
        #[test]
        fn web_uris_normalize_to_lowercase_web_scheme(uri in arb_web_uri()) {
            let parts = normalize(&uri).unwrap();
            prop_assert!(parts.scheme == "http" || parts.scheme == "https");
            prop_assert_eq!(&parts.value, &parts.value.to_lowercase());
        }

        #[test]
        fn web_uris_round_trip_through_denormalize(uri in arb_web_uri()) {
            let parts = normalize(&uri).unwrap();
            prop_assert_eq!(normalize(&parts.to_uri()).unwrap(), parts);
        }

        #[test]
        fn isbn_values_never_keep_hyphens(digits in "[0-9]{1,4}(-[0-9]{1,4}){0,4}") {
            let parts = normalize(&format!("urn:isbn:{digits}")).unwrap();
            prop_assert!(!parts.value.contains('-'));
            prop_assert_eq!(parts.value, digits.replace('-', ""));
        }
    }
}
