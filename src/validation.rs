//! Rule-table validation for request bodies.
//!
//! Each DTO lists its fields with an ordered set of rules. Every field is
//! checked; the first rule a field breaks produces its message, and all
//! failing fields are returned together.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;

pub type FieldErrors = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy)]
pub enum Value<'a> {
    Text(&'a str),
    Number(f64),
}

#[derive(Debug, Clone, Copy)]
pub enum Rule {
    Required,
    MinChars(usize),
    MaxChars(usize),
    OnlyLetters,
    ContainsAny(&'static str),
    HttpUrl,
    GreaterThan(f64),
}

impl Rule {
    fn holds(&self, value: Value<'_>) -> bool {
        match (*self, value) {
            (Rule::Required, Value::Text(s)) => !s.is_empty(),
            (Rule::Required, Value::Number(n)) => n != 0.0,
            (Rule::MinChars(min), Value::Text(s)) => s.chars().count() >= min,
            (Rule::MaxChars(max), Value::Text(s)) => s.chars().count() <= max,
            (Rule::OnlyLetters, Value::Text(s)) => is_letters(s),
            (Rule::ContainsAny(set), Value::Text(s)) => s.chars().any(|c| set.contains(c)),
            (Rule::HttpUrl, Value::Text(s)) => is_http_url(s),
            (Rule::GreaterThan(bound), Value::Number(n)) => n > bound,
            _ => true,
        }
    }

    fn message(&self, field: &str) -> String {
        match self {
            Rule::Required => format!("{field} is required"),
            Rule::MinChars(min) => format!("{field} must be at least {min} characters"),
            Rule::MaxChars(max) => format!("{field} must be at most {max} characters"),
            Rule::OnlyLetters => format!("{field} must contain only letters"),
            Rule::ContainsAny(set) => {
                format!("{field} must contain at least one character from {set}")
            }
            Rule::HttpUrl => format!("{field} must be a valid http(s) url"),
            Rule::GreaterThan(bound) => format!("{field} must be greater than {bound}"),
        }
    }
}

/// One row of a DTO's rule table.
pub struct Field<'a> {
    pub name: &'static str,
    pub value: Value<'a>,
    pub rules: &'static [Rule],
}

pub fn check(fields: &[Field<'_>]) -> FieldErrors {
    fields
        .iter()
        .filter_map(|field| {
            field
                .rules
                .iter()
                .find(|rule| !rule.holds(field.value))
                .map(|rule| (field.name.to_string(), rule.message(field.name)))
        })
        .collect()
}

fn is_letters(s: &str) -> bool {
    lazy_static! {
        static ref LETTERS_RE: Regex = Regex::new(r"^[A-Za-z]+$").unwrap();
    }
    LETTERS_RE.is_match(s)
}

fn is_http_url(s: &str) -> bool {
    match reqwest::Url::parse(s) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}
