use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::errors::AppError;

pub const SYMBOL_PATTERN: &str = r"^[A-Z][A-Z0-9.\-]{0,9}$";

/// Fractional digits kept by the NUMERIC(_, 2) columns.
pub const DECIMAL_SCALE: i64 = 2;

// Exclusive magnitude bounds of NUMERIC(10, 2) and NUMERIC(8, 2).
const MAX_PRICE: i64 = 100_000_000;
const MAX_CHANGE_AMOUNT: i64 = 100_000_000;
const MAX_CHANGE_PERCENT: i64 = 1_000_000;

// One row of stock_prices: the latest known snapshot for a ticker.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StockPriceSnapshot {
    pub id: i32,
    pub symbol: String,
    pub price: BigDecimal,
    pub change_amount: BigDecimal,
    pub change_percent: BigDecimal,
    pub volume: i64,
    pub market_cap: i64,
    pub last_updated: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// A seed tuple. Decimal fields are written as strings in seed files so
/// they never pass through a float.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewStockPrice {
    pub symbol: String,
    pub price: BigDecimal,
    pub change_amount: BigDecimal,
    pub change_percent: BigDecimal,
    pub volume: i64,
    pub market_cap: i64,
}

impl NewStockPrice {
    pub fn validate(&self) -> Result<(), AppError> {
        let pattern = Regex::new(SYMBOL_PATTERN).map_err(|e| AppError::Validation(e.to_string()))?;
        if !pattern.is_match(&self.symbol) {
            return Err(AppError::Validation(format!(
                "invalid symbol '{}': expected 1-10 uppercase ticker characters",
                self.symbol
            )));
        }

        for (field, value) in [
            ("price", &self.price),
            ("change_amount", &self.change_amount),
            ("change_percent", &self.change_percent),
        ] {
            if scale_of(value) > DECIMAL_SCALE {
                return Err(AppError::Validation(format!(
                    "{} for {} has more than {} fractional digits: {}",
                    field, self.symbol, DECIMAL_SCALE, value
                )));
            }
        }

        if self.price < BigDecimal::from(0i64) || self.price >= BigDecimal::from(MAX_PRICE) {
            return Err(AppError::Validation(format!(
                "price for {} is out of range: {}",
                self.symbol, self.price
            )));
        }

        for (field, value, bound) in [
            ("change_amount", &self.change_amount, MAX_CHANGE_AMOUNT),
            ("change_percent", &self.change_percent, MAX_CHANGE_PERCENT),
        ] {
            if value.abs() >= BigDecimal::from(bound) {
                return Err(AppError::Validation(format!(
                    "{} for {} is out of range: {}",
                    field, self.symbol, value
                )));
            }
        }

        if self.volume < 0 {
            return Err(AppError::Validation(format!("volume for {} is negative", self.symbol)));
        }
        if self.market_cap < 0 {
            return Err(AppError::Validation(format!("market_cap for {} is negative", self.symbol)));
        }

        Ok(())
    }
}

// Trailing zeros do not count: 175.500 has scale 2.
fn scale_of(value: &BigDecimal) -> i64 {
    let (_, exponent) = value.normalized().as_bigint_and_exponent();
    exponent
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn aapl() -> NewStockPrice {
        NewStockPrice {
            symbol: "AAPL".to_string(),
            price: BigDecimal::from_str("175.50").unwrap(),
            change_amount: BigDecimal::from_str("2.30").unwrap(),
            change_percent: BigDecimal::from_str("1.33").unwrap(),
            volume: 52_000_000,
            market_cap: 2_750_000_000_000,
        }
    }

    #[test]
    fn test_valid_snapshot_passes() {
        assert!(aapl().validate().is_ok());
    }

    #[test]
    fn test_symbol_rules() {
        for symbol in ["BRK.B", "V", "RDS-A"] {
            let mut p = aapl();
            p.symbol = symbol.to_string();
            assert!(p.validate().is_ok(), "{} should be accepted", symbol);
        }

        for symbol in ["", "aapl", "TOOLONGSYMBOL", "1ABC", "AA PL"] {
            let mut p = aapl();
            p.symbol = symbol.to_string();
            assert!(p.validate().is_err(), "{:?} should be rejected", symbol);
        }
    }

    #[test]
    fn test_three_fractional_digits_rejected() {
        let mut p = aapl();
        p.price = BigDecimal::from_str("175.505").unwrap();
        assert!(matches!(p.validate(), Err(AppError::Validation(_))));

        let mut p = aapl();
        p.change_percent = BigDecimal::from_str("-0.125").unwrap();
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_negative_change_is_allowed_but_negative_price_is_not() {
        let mut p = aapl();
        p.change_amount = BigDecimal::from_str("-3.10").unwrap();
        p.change_percent = BigDecimal::from_str("-1.74").unwrap();
        assert!(p.validate().is_ok());

        p.price = BigDecimal::from_str("-1.00").unwrap();
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_price_must_fit_column() {
        let mut p = aapl();
        p.price = BigDecimal::from_str("99999999.99").unwrap();
        assert!(p.validate().is_ok());

        p.price = BigDecimal::from_str("100000000").unwrap();
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_change_amount_must_fit_column() {
        let mut p = aapl();
        p.change_amount = BigDecimal::from_str("-99999999.99").unwrap();
        assert!(p.validate().is_ok());

        p.change_amount = BigDecimal::from_str("100000000.00").unwrap();
        assert!(matches!(p.validate(), Err(AppError::Validation(_))));

        p.change_amount = BigDecimal::from_str("-100000000").unwrap();
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_change_percent_must_fit_column() {
        let mut p = aapl();
        p.change_percent = BigDecimal::from_str("999999.99").unwrap();
        assert!(p.validate().is_ok());

        p.change_percent = BigDecimal::from_str("1000000.00").unwrap();
        match p.validate() {
            Err(AppError::Validation(msg)) => assert!(msg.contains("change_percent")),
            other => panic!("expected validation error, got {:?}", other),
        }

        p.change_percent = BigDecimal::from_str("-1000000").unwrap();
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_trailing_zeros_do_not_count_as_fractional_digits() {
        let mut p = aapl();
        p.price = BigDecimal::from_str("175.500").unwrap();
        p.change_amount = BigDecimal::from_str("2.3000").unwrap();
        assert!(p.validate().is_ok());

        p.price = BigDecimal::from_str("175.501").unwrap();
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_negative_counts_rejected() {
        let mut p = aapl();
        p.volume = -1;
        assert!(p.validate().is_err());

        let mut p = aapl();
        p.market_cap = -1;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_deserializes_string_decimals() {
        let json = r#"{
            "symbol": "MSFT",
            "price": "378.85",
            "change_amount": "-1.20",
            "change_percent": "-0.32",
            "volume": 21000000,
            "market_cap": 2810000000000
        }"#;

        let p: NewStockPrice = serde_json::from_str(json).unwrap();
        assert_eq!(p.symbol, "MSFT");
        assert_eq!(p.price, BigDecimal::from_str("378.85").unwrap());
        assert!(p.validate().is_ok());
    }
}
