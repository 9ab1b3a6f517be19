//! Field validation for request payloads.

use std::collections::HashMap;

/// Accumulates the first failure per field.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FieldErrors(HashMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn into_map(self) -> HashMap<String, String> {
        self.0
    }

    /// Folds in another set; existing entries win.
    pub fn merge(&mut self, other: FieldErrors) {
        for (field, message) in other.0 {
            self.0.entry(field).or_insert(message);
        }
    }

    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Required, non-blank, at most `max` characters.
    pub fn required_text(&mut self, field: &str, value: Option<&str>, max: Option<usize>) {
        match value.map(str::trim) {
            None | Some("") => self.add(field, format!("The {} field is required.", field)),
            Some(v) => self.max_chars(field, Some(v), max),
        }
    }

    pub fn max_chars(&mut self, field: &str, value: Option<&str>, max: Option<usize>) {
        if let (Some(v), Some(max)) = (value, max) {
            if v.chars().count() > max {
                self.add(field, format!("The {} may not be greater than {} characters.", field, max));
            }
        }
    }

    pub fn min_chars(&mut self, field: &str, value: Option<&str>, min: usize) {
        if let Some(v) = value {
            if v.trim().chars().count() < min {
                self.add(field, format!("The {} must be at least {} characters.", field, min));
            }
        }
    }

    pub fn email(&mut self, field: &str, value: Option<&str>) {
        if let Some(v) = value {
            if !is_valid_email(v) {
                self.add(field, format!("The {} must be a valid email address.", field));
            }
        }
    }

    pub fn range(&mut self, field: &str, value: Option<i32>, min: i32, max: i32) {
        if let Some(v) = value {
            if v < min || v > max {
                self.add(field, format!("The {} must be between {} and {}.", field, min, max));
            }
        }
    }

    /// Only ASCII digits, between `min` and `max` of them.
    pub fn digits(&mut self, field: &str, value: Option<&str>, min: usize, max: usize) {
        if let Some(v) = value {
            let ok = v.chars().all(|c| c.is_ascii_digit()) && (min..=max).contains(&v.len());
            if !ok {
                self.add(field, format!("The {} must be between {} and {} digits.", field, min, max));
            }
        }
    }
}

pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.is_empty() || email.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|l| !l.is_empty())
}

/// Lowercase ASCII slug with single dashes, e.g. "Hello, World!" -> "hello-world".
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_format() {
        assert!(is_valid_email("john@example.com"));
        assert!(is_valid_email("a.b+c@mail.example.org"));
        assert!(!is_valid_email("john@example"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("john@@example.com"));
        assert!(!is_valid_email("john doe@example.com"));
        assert!(!is_valid_email("john@example..com"));
    }

    #[test]
    fn slugs() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  Rust -- API  "), "rust-api");
        assert_eq!(slugify("already-slugged"), "already-slugged");
        assert_eq!(slugify("???"), "");
    }

    #[test]
    fn keeps_first_error_per_field() {
        let mut errors = FieldErrors::new();
        errors.required_text("name", None, Some(10));
        errors.max_chars("name", Some("way too long a name"), Some(10));

        assert_eq!(errors.get("name"), Some("The name field is required."));
        assert!(errors.into_result().is_err());
    }

    #[test]
    fn counts_characters_not_bytes() {
        let mut errors = FieldErrors::new();
        errors.max_chars("name", Some("ééééé"), Some(5));
        assert!(errors.is_empty());
    }

    #[test]
    fn pin_digits() {
        let mut errors = FieldErrors::new();
        errors.digits("pin", Some("1234"), 4, 6);
        errors.digits("pin", Some("123456"), 4, 6);
        assert!(errors.is_empty());

        for bad in ["123", "1234567", "12a4", "١٢٣٤"] {
            let mut errors = FieldErrors::new();
            errors.digits("pin", Some(bad), 4, 6);
            assert!(errors.get("pin").is_some(), "{bad} should be rejected");
        }
    }

    #[test]
    fn merge_keeps_existing_entries() {
        let mut errors = FieldErrors::new();
        errors.add("image", "first");
        let mut other = FieldErrors::new();
        other.add("image", "second");
        other.add("title", "missing");

        errors.merge(other);
        assert_eq!(errors.get("image"), Some("first"));
        assert_eq!(errors.get("title"), Some("missing"));
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let mut errors = FieldErrors::new();
        errors.range("level", Some(0), 0, 100);
        errors.range("level", Some(100), 0, 100);
        assert!(errors.is_empty());

        errors.range("level", Some(101), 0, 100);
        assert!(errors.get("level").is_some());
    }
}
