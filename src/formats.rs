//! Predicates for the `format` keyword and the pluggable registry backing
//! the outsourced checks (uri, uri-reference, uri-template, email).
use std::{net::Ipv4Addr, net::Ipv6Addr, str::FromStr, sync::Arc};

use ahash::AHashMap;
use chrono::{DateTime, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::drafts::Draft;

static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}\z").expect("Is a valid regex"));
static JSON_POINTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(/(([^/~])|(~[01]))*)*\z").expect("Is a valid regex"));
static RELATIVE_JSON_POINTER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:0|[1-9][0-9]*)(?:#|(?:/(?:[^~/]|~0|~1)*)*)\z").expect("Is a valid regex")
});
static TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^([01][0-9]|2[0-3]):([0-5][0-9]):([0-5][0-9])(\.[0-9]{6})?(([Zz])|([+|\-]([01][0-9]|2[0-3]):[0-5][0-9]))\z",
    )
    .expect("Is a valid regex")
});
static URI_REFERENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\w+:(/?/?))?[^#\\\s]*(#[^\\\s]*)?\z").expect("Is a valid regex"));
static URI_TEMPLATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^(?:(?:[^\x00-\x20"'<>%\\^`{|}]|%[0-9a-f]{2})|\{[+#./;?&=,!@|]?(?:[a-z0-9_]|%[0-9a-f]{2})+(?::[1-9][0-9]{0,3}|\*)?(?:,(?:[a-z0-9_]|%[0-9a-f]{2})+(?::[1-9][0-9]{0,3}|\*)?)*})*\z"#,
    )
    .expect("Is a valid regex")
});

fn is_valid_date(instance: &str) -> bool {
    // The underlying parser ignores padding, the regex rejects it.
    NaiveDate::parse_from_str(instance, "%Y-%m-%d").is_ok() && DATE_RE.is_match(instance)
}

fn is_valid_date_time(instance: &str) -> bool {
    DateTime::parse_from_rfc3339(instance).is_ok()
}

fn is_valid_time(instance: &str) -> bool {
    TIME_RE.is_match(instance)
}

fn is_valid_email(instance: &str) -> bool {
    instance.contains('@')
}

fn is_valid_hostname(instance: &str) -> bool {
    !(instance.ends_with('-')
        || instance.starts_with('-')
        || instance.is_empty()
        || instance.chars().count() > 255
        || instance
            .chars()
            .any(|c| !(c.is_alphanumeric() || c == '-' || c == '.'))
        || instance.split('.').any(|part| part.chars().count() > 63))
}

fn is_valid_idn_hostname(instance: &str) -> bool {
    idna::domain_to_ascii(instance)
        .map(|ascii| is_valid_hostname(&ascii))
        .unwrap_or(false)
}

fn is_valid_ipv4(instance: &str) -> bool {
    Ipv4Addr::from_str(instance).is_ok()
}

fn is_valid_ipv6(instance: &str) -> bool {
    Ipv6Addr::from_str(instance).is_ok()
}

fn is_valid_iri(instance: &str) -> bool {
    Url::from_str(instance).is_ok()
}

fn is_valid_iri_reference(instance: &str) -> bool {
    URI_REFERENCE_RE.is_match(instance)
}

fn is_valid_json_pointer(instance: &str) -> bool {
    JSON_POINTER_RE.is_match(instance)
}

fn is_valid_regex(instance: &str) -> bool {
    Regex::new(instance).is_ok()
}

fn is_valid_relative_json_pointer(instance: &str) -> bool {
    RELATIVE_JSON_POINTER_RE.is_match(instance)
}

fn default_uri(instance: &str) -> bool {
    Url::from_str(instance).is_ok()
}

fn default_uri_reference(instance: &str) -> bool {
    URI_REFERENCE_RE.is_match(instance)
}

fn default_uri_template(instance: &str) -> bool {
    URI_TEMPLATE_RE.is_match(instance)
}

pub(crate) type FormatCheck = dyn Fn(&str) -> bool + Send + Sync;

/// Registry of `format` predicates.
///
/// The uri, uri-reference, uri-template and email checks live in dedicated
/// slots so hosts can substitute stricter or laxer validators; an emptied
/// slot rejects every value. All other recognized formats use the built-in
/// predicates, and arbitrary names can be registered as custom formats.
#[derive(Clone)]
pub(crate) struct FormatRegistry {
    uri: Option<Arc<FormatCheck>>,
    uri_reference: Option<Arc<FormatCheck>>,
    uri_template: Option<Arc<FormatCheck>>,
    email: Option<Arc<FormatCheck>>,
    custom: AHashMap<String, Arc<FormatCheck>>,
}

impl Default for FormatRegistry {
    fn default() -> Self {
        FormatRegistry {
            uri: Some(Arc::new(default_uri)),
            uri_reference: Some(Arc::new(default_uri_reference)),
            uri_template: Some(Arc::new(default_uri_template)),
            email: Some(Arc::new(is_valid_email)),
            custom: AHashMap::new(),
        }
    }
}

impl std::fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatRegistry")
            .field("uri", &self.uri.is_some())
            .field("uri_reference", &self.uri_reference.is_some())
            .field("uri_template", &self.uri_template.is_some())
            .field("email", &self.email.is_some())
            .field("custom", &self.custom.keys())
            .finish()
    }
}

impl FormatRegistry {
    /// Install a predicate under `name`. The four outsourced formats are
    /// replaced in place; any other name becomes a custom format.
    pub(crate) fn register(&mut self, name: &str, check: Arc<FormatCheck>) {
        match name {
            "uri" => self.uri = Some(check),
            "uri-reference" => self.uri_reference = Some(check),
            "uri-template" => self.uri_template = Some(check),
            "email" => self.email = Some(check),
            _ => {
                self.custom.insert(name.to_string(), check);
            }
        }
    }

    /// Remove the predicate registered under `name`. An emptied slot makes
    /// the corresponding format reject every string.
    pub(crate) fn unregister(&mut self, name: &str) {
        match name {
            "uri" => self.uri = None,
            "uri-reference" => self.uri_reference = None,
            "uri-template" => self.uri_template = None,
            "email" => self.email = None,
            _ => {
                self.custom.remove(name);
            }
        }
    }

    fn slot(&self, slot: &Option<Arc<FormatCheck>>, instance: &str) -> bool {
        slot.as_ref().map(|check| check(instance)).unwrap_or(false)
    }

    /// Check `instance` against the named format.
    ///
    /// `None` means the format is not recognized under `draft` and the check
    /// must be skipped.
    pub(crate) fn check(&self, draft: Draft, format: &str, instance: &str) -> Option<bool> {
        if let Some(check) = self.custom.get(format) {
            return Some(check(instance));
        }
        if !draft.supports_format(format) {
            return None;
        }
        match format {
            "date" => Some(is_valid_date(instance)),
            "date-time" => Some(is_valid_date_time(instance)),
            "email" => Some(self.slot(&self.email, instance)),
            "hostname" => Some(is_valid_hostname(instance)),
            // Accepted without checking.
            "idn-email" => Some(true),
            "idn-hostname" => Some(is_valid_idn_hostname(instance)),
            "ipv4" => Some(is_valid_ipv4(instance)),
            "ipv6" => Some(is_valid_ipv6(instance)),
            "iri" => Some(is_valid_iri(instance)),
            "iri-reference" => Some(is_valid_iri_reference(instance)),
            "json-pointer" => Some(is_valid_json_pointer(instance)),
            "regex" => Some(is_valid_regex(instance)),
            "relative-json-pointer" => Some(is_valid_relative_json_pointer(instance)),
            "time" => Some(is_valid_time(instance)),
            "uri" => Some(self.slot(&self.uri, instance)),
            "uri-reference" => Some(self.slot(&self.uri_reference, instance)),
            "uri-template" => Some(self.slot(&self.uri_template, instance)),
            _ => None,
        }
    }
}
