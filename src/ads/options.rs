//! Listing query parameters: parsing, defaults and bounds checks.

use std::{collections::HashMap, str::FromStr};

pub const PARAM_PAGE: &str = "page";
pub const PARAM_LIMIT: &str = "limit";
pub const PARAM_SORT_BY: &str = "sort_by";
pub const PARAM_ORDER_BY: &str = "order_by";
pub const PARAM_MIN_PRICE: &str = "min_price";
pub const PARAM_MAX_PRICE: &str = "max_price";

pub const LIMIT_DEFAULT: i64 = 10;
pub const LIMIT_MAX: i64 = 40;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum OptionsError {
    /// A parameter did not parse as its primitive type; carries the parser's message.
    #[error("{0}")]
    Parse(String),
    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    #[default]
    CreatedAt,
    Price,
}

impl SortBy {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "created_at" => Some(SortBy::CreatedAt),
            "price" => Some(SortBy::Price),
            _ => None,
        }
    }
}

/// `order_by` travels as `1` (ascending) or `-1` (descending).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(SortOrder::Asc),
            -1 | 0 => Some(SortOrder::Desc),
            _ => None,
        }
    }
}

/// Validated listing query, built fresh for every request.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub page: i64,
    pub limit: i64,
    pub sort_by: SortBy,
    pub order: SortOrder,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            page: 1,
            limit: LIMIT_DEFAULT,
            sort_by: SortBy::default(),
            order: SortOrder::default(),
            min_price: None,
            max_price: None,
        }
    }
}

impl Options {
    /// Rows to skip. Saturates; `from_query` rejects pages that would overflow.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// Lower price bound to filter on. Zero means "no bound".
    pub fn price_floor(&self) -> Option<f64> {
        self.min_price.filter(|p| *p > 0.0)
    }

    /// Upper price bound to filter on. Zero means "no bound".
    pub fn price_ceiling(&self) -> Option<f64> {
        self.max_price.filter(|p| *p > 0.0)
    }

    /// Parses then validates. Parsing follows parameter order and stops at
    /// the first unparsable value; validation stops at the first broken rule.
    pub fn from_query(params: &HashMap<String, String>) -> Result<Self, OptionsError> {
        let page = parse_param::<i64>(params, PARAM_PAGE)?.unwrap_or(0);
        let limit = parse_param::<i64>(params, PARAM_LIMIT)?.unwrap_or(LIMIT_DEFAULT);
        let sort_by = params
            .get(PARAM_SORT_BY)
            .map(String::as_str)
            .filter(|s| !s.is_empty());
        let order_by = parse_param::<i64>(params, PARAM_ORDER_BY)?.unwrap_or(-1);
        let min_price = parse_param::<f64>(params, PARAM_MIN_PRICE)?;
        let max_price = parse_param::<f64>(params, PARAM_MAX_PRICE)?;

        if page < 1 {
            return Err(must_be_positive(PARAM_PAGE));
        }

        if limit < 1 {
            return Err(must_be_positive(PARAM_LIMIT));
        }
        let limit = limit.min(LIMIT_MAX);
        if (page - 1).checked_mul(limit).is_none() {
            return Err(OptionsError::Invalid(format!("{PARAM_PAGE} is too large")));
        }

        for (name, price) in [(PARAM_MIN_PRICE, min_price), (PARAM_MAX_PRICE, max_price)] {
            match price {
                Some(p) if !p.is_finite() => {
                    return Err(OptionsError::Invalid(format!("{name} must be a finite number")))
                }
                Some(p) if p < 0.0 => {
                    return Err(OptionsError::Invalid(format!("{name} must not be negative")))
                }
                _ => {}
            }
        }

        if let (Some(min), Some(max)) = (min_price, max_price) {
            if min > max {
                return Err(OptionsError::Invalid(
                    "min_price cannot be greater than max_price".into(),
                ));
            }
        }

        let sort_by = match sort_by {
            None => SortBy::default(),
            Some(raw) => SortBy::parse(raw)
                .ok_or_else(|| OptionsError::Invalid("invalid sort_by parameter".into()))?,
        };
        let order = SortOrder::from_code(order_by)
            .ok_or_else(|| OptionsError::Invalid("invalid order_by parameter".into()))?;

        Ok(Options {
            page,
            limit,
            sort_by,
            order,
            min_price,
            max_price,
        })
    }
}

fn parse_param<T>(params: &HashMap<String, String>, name: &str) -> Result<Option<T>, OptionsError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match params.get(name).filter(|raw| !raw.is_empty()) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| OptionsError::Parse(e.to_string())),
        None => Ok(None),
    }
}

fn must_be_positive(name: &str) -> OptionsError {
    OptionsError::Invalid(format!("{name} must be greater than 0"))
}
