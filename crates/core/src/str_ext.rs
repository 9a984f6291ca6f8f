//! Extension traits for `str` type conversions.
//!
//! Provides utilities for handling empty-as-none semantics, commonly needed
//! when normalizing optional form fields that arrive as empty strings.

/// Extension trait for `str` to handle empty-as-none semantics.
pub trait StrExt {
    /// Returns `Some(String)` if non-blank, `None` otherwise.
    ///
    /// Useful for converting blank form fields to `Option<String>`.
    #[must_use]
    fn to_opt(&self) -> Option<String>;

    /// Returns self if non-empty, otherwise returns `default`.
    #[must_use]
    fn or_str<'a>(&'a self, default: &'a str) -> &'a str;
}

impl StrExt for str {
    #[inline]
    fn to_opt(&self) -> Option<String> {
        (!self.trim().is_empty()).then(|| self.to_string())
    }

    #[inline]
    fn or_str<'a>(&'a self, default: &'a str) -> &'a str {
        if self.is_empty() { default } else { self }
    }
}

/// Extension trait for `Option<String>` to provide default value semantics.
pub trait OptionStrExt {
    /// Returns the inner `String` if `Some`, otherwise returns `default.to_string()`.
    ///
    /// # Example
    /// ```
    /// use cred_core::OptionStrExt;
    ///
    /// let some: Option<String> = Some("value".to_string());
    /// let none: Option<String> = None;
    ///
    /// assert_eq!(some.or_str("-"), "value");
    /// assert_eq!(none.or_str("-"), "-");
    /// ```
    #[must_use]
    fn or_str(self, default: &str) -> String;
}

impl OptionStrExt for Option<String> {
    #[inline]
    fn or_str(self, default: &str) -> String {
        self.unwrap_or_else(|| default.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_opt_treats_blank_as_none() {
        assert_eq!("value".to_opt(), Some("value".to_string()));
        assert_eq!("".to_opt(), None);
        assert_eq!("   ".to_opt(), None);
    }

    #[test]
    fn or_str_defaults() {
        assert_eq!("".or_str("-"), "-");
        assert_eq!("x".or_str("-"), "x");
    }
}
