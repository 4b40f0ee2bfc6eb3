//! Field Rules
//!
//! Single-field checks shared by the validation phases. Each check yields a
//! [`Defect`] naming the field; the phase that ran it attaches the section
//! or item index when converting into a `ValidationError`.

use once_cell::sync::Lazy;
use orderline_core::{Section, ValidationError};
use regex::Regex;

/// International phone number: leading `+`, no leading zero, 8 to 15 digits.
pub(crate) static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+[1-9][0-9]{7,14}$").expect("Invalid phone regex"));

/// Postal code: 5 to 10 digits.
pub(crate) static ZIP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{5,10}$").expect("Invalid zip regex"));

/// Bare `local@domain` address with dot-atom local part and domain.
static ADDR_SPEC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)*$"#,
    )
    .expect("Invalid address regex")
});

/// `Display Name <local@domain>`, display name optionally quoted.
static NAME_ADDR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(?:"[^"]*"|[^<>"]*)\s*<([^<>\s]+)>$"#).expect("Invalid name-addr regex")
});

/// A failed field check, before section context is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Defect {
    pub field: &'static str,
    pub reason: String,
}

pub(crate) type CheckResult = Result<(), Defect>;

impl Defect {
    pub(crate) fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn in_section(self, section: Section) -> ValidationError {
        ValidationError::InvalidField {
            section,
            field: self.field,
            reason: self.reason,
        }
    }

    pub(crate) fn in_item(self, index: usize) -> ValidationError {
        ValidationError::InvalidItem {
            index,
            field: self.field,
            reason: self.reason,
        }
    }
}

/// Presence check for string fields.
pub(crate) trait RequireNonEmpty {
    fn require_non_empty(&self, field: &'static str) -> CheckResult;
}

impl RequireNonEmpty for str {
    fn require_non_empty(&self, field: &'static str) -> CheckResult {
        if self.is_empty() {
            return Err(Defect::new(field, "is required"));
        }
        Ok(())
    }
}

impl RequireNonEmpty for String {
    fn require_non_empty(&self, field: &'static str) -> CheckResult {
        self.as_str().require_non_empty(field)
    }
}

/// Sign and range checks for integer fields.
pub(crate) trait RequireRange: Sized {
    fn require_positive(&self, field: &'static str) -> CheckResult;

    fn require_non_negative(&self, field: &'static str) -> CheckResult;

    fn require_at_least(&self, field: &'static str, min: Self) -> CheckResult;

    fn require_between(&self, field: &'static str, min: Self, max: Self) -> CheckResult;
}

macro_rules! impl_require_range {
    ($($t:ty),*) => {
        $(
            impl RequireRange for $t {
                fn require_positive(&self, field: &'static str) -> CheckResult {
                    if *self <= 0 {
                        return Err(Defect::new(field, "must be positive"));
                    }
                    Ok(())
                }

                fn require_non_negative(&self, field: &'static str) -> CheckResult {
                    if *self < 0 {
                        return Err(Defect::new(field, "cannot be negative"));
                    }
                    Ok(())
                }

                fn require_at_least(&self, field: &'static str, min: Self) -> CheckResult {
                    if *self < min {
                        return Err(Defect::new(field, format!("must be at least {}", min)));
                    }
                    Ok(())
                }

                fn require_between(&self, field: &'static str, min: Self, max: Self) -> CheckResult {
                    if *self < min || *self > max {
                        return Err(Defect::new(
                            field,
                            format!("must be between {} and {}", min, max),
                        ));
                    }
                    Ok(())
                }
            }
        )*
    };
}

impl_require_range!(i32, i64);

/// Character-count bounds, inclusive.
pub(crate) fn require_len_between(
    value: &str,
    field: &'static str,
    min: usize,
    max: usize,
) -> CheckResult {
    let len = value.chars().count();
    if len < min {
        return Err(Defect::new(field, "is too short"));
    }
    if len > max {
        return Err(Defect::new(field, "is too long"));
    }
    Ok(())
}

pub(crate) fn require_match(
    value: &str,
    field: &'static str,
    pattern: &Regex,
    reason: &str,
) -> CheckResult {
    if !pattern.is_match(value) {
        return Err(Defect::new(field, reason));
    }
    Ok(())
}

/// Extract the `local@domain` part of a single mail address.
///
/// Accepts a bare address or the `Name <address>` form, with surrounding
/// whitespace ignored. Returns `None` if the input is not a parseable address.
pub fn parse_address(input: &str) -> Option<&str> {
    let trimmed = input.trim();
    let addr = match NAME_ADDR_RE.captures(trimmed) {
        Some(caps) => caps.get(1)?.as_str(),
        None => trimmed,
    };
    ADDR_SPEC_RE.is_match(addr).then_some(addr)
}
