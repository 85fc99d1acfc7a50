//! Lexical spaces of the built-in XSD datatypes.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use isoxsd_schema::{BuiltinType, SchemaError};
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

const TIMEZONE: &str = r"(Z|[+-]\d{2}:\d{2})?";

/// Precompiled lexical rules for built-in datatypes.
#[derive(Debug, Clone)]
pub struct LexicalRules {
    decimal: Regex,
    integer: Regex,
    float: Regex,
    duration: Regex,
    language: Regex,
    name: Regex,
    nmtoken: Regex,
    g_year: Regex,
    g_year_month: Regex,
    g_month: Regex,
    g_month_day: Regex,
    g_day: Regex,
}

fn rule(pattern: &str) -> Result<Regex, SchemaError> {
    Regex::new(pattern).map_err(|source| SchemaError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

impl LexicalRules {
    /// Compiles the rule set.
    ///
    /// # Errors
    /// Returns `SchemaError::InvalidPattern` if a rule fails to compile.
    pub fn new() -> Result<Self, SchemaError> {
        Ok(Self {
            decimal: rule(r"^[+-]?(\d+(\.\d*)?|\.\d+)$")?,
            integer: rule(r"^[+-]?\d+$")?,
            float: rule(r"^([+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?|[+-]?INF|NaN)$")?,
            duration: rule(r"^-?P(\d+Y)?(\d+M)?(\d+D)?(T(\d+H)?(\d+M)?(\d+(\.\d+)?S)?)?$")?,
            language: rule(r"^[a-zA-Z]{1,8}(-[a-zA-Z0-9]{1,8})*$")?,
            name: rule(r"^[\p{L}_:][\p{L}\p{N}._:\-\u{B7}]*$")?,
            nmtoken: rule(r"^[\p{L}\p{N}._:\-\u{B7}]+$")?,
            g_year: rule(&format!(r"^-?\d{{4,}}{TIMEZONE}$"))?,
            g_year_month: rule(&format!(r"^-?\d{{4,}}-(0[1-9]|1[0-2]){TIMEZONE}$"))?,
            g_month: rule(&format!(r"^--(0[1-9]|1[0-2]){TIMEZONE}$"))?,
            g_month_day: rule(&format!(r"^--(0[1-9]|1[0-2])-(0[1-9]|[12]\d|3[01]){TIMEZONE}$"))?,
            g_day: rule(&format!(r"^---(0[1-9]|[12]\d|3[01]){TIMEZONE}$"))?,
        })
    }

    /// Checks a whitespace-normalized value against the lexical space of
    /// `builtin`.
    ///
    /// # Returns
    /// Ok(()) if the value is in the lexical space, or a reason otherwise.
    pub fn check(&self, builtin: BuiltinType, value: &str) -> Result<(), String> {
        let valid = match builtin {
            BuiltinType::AnySimpleType
            | BuiltinType::String
            | BuiltinType::NormalizedString
            | BuiltinType::Token
            | BuiltinType::AnyUri => true,
            BuiltinType::Language => self.language.is_match(value),
            BuiltinType::Name => self.name.is_match(value),
            BuiltinType::NcName | BuiltinType::Id | BuiltinType::IdRef => {
                self.name.is_match(value) && !value.contains(':')
            }
            BuiltinType::NmToken => self.nmtoken.is_match(value),
            BuiltinType::QName => {
                let mut parts = value.splitn(2, ':');
                parts.all(|part| self.name.is_match(part) && !part.contains(':'))
            }
            BuiltinType::Boolean => matches!(value, "true" | "false" | "1" | "0"),
            BuiltinType::Decimal => self.decimal.is_match(value),
            BuiltinType::Float | BuiltinType::Double => self.float.is_match(value),
            BuiltinType::Duration => {
                self.duration.is_match(value) && !value.ends_with('P') && !value.ends_with('T')
            }
            BuiltinType::DateTime => parse_date_time(value).is_some(),
            BuiltinType::Date => parse_date(value).is_some(),
            BuiltinType::Time => parse_time(value).is_some(),
            BuiltinType::GYear => self.g_year.is_match(value),
            BuiltinType::GYearMonth => self.g_year_month.is_match(value),
            BuiltinType::GMonth => self.g_month.is_match(value),
            BuiltinType::GMonthDay => self.g_month_day.is_match(value),
            BuiltinType::GDay => self.g_day.is_match(value),
            BuiltinType::HexBinary => {
                value.len() % 2 == 0 && value.chars().all(|c| c.is_ascii_hexdigit())
            }
            BuiltinType::Base64Binary => is_base64(value),
            integer => return self.check_integer(integer, value),
        };

        if valid {
            Ok(())
        } else {
            Err(format!(
                "The value '{value}' is not a valid {}",
                builtin.xsd_name()
            ))
        }
    }

    fn check_integer(&self, builtin: BuiltinType, value: &str) -> Result<(), String> {
        let invalid = || {
            format!(
                "The value '{value}' is not a valid {}",
                builtin.xsd_name()
            )
        };
        if !self.integer.is_match(value) {
            return Err(invalid());
        }

        let negative = value.starts_with('-') && value.bytes().any(|b| b.is_ascii_digit() && b != b'0');
        let zero = !value.bytes().any(|b| b.is_ascii_digit() && b != b'0');
        let parsed = value.trim_start_matches('+').parse::<i128>().ok();

        let in_range = |min: i128, max: i128| parsed.is_some_and(|n| (min..=max).contains(&n));
        let valid = match builtin {
            BuiltinType::Integer => true,
            BuiltinType::NonNegativeInteger => !negative,
            BuiltinType::PositiveInteger => !negative && !zero,
            BuiltinType::NonPositiveInteger => negative || zero,
            BuiltinType::NegativeInteger => negative,
            BuiltinType::Long => in_range(i64::MIN.into(), i64::MAX.into()),
            BuiltinType::Int => in_range(i32::MIN.into(), i32::MAX.into()),
            BuiltinType::Short => in_range(i16::MIN.into(), i16::MAX.into()),
            BuiltinType::Byte => in_range(i8::MIN.into(), i8::MAX.into()),
            BuiltinType::UnsignedLong => in_range(0, u64::MAX.into()),
            BuiltinType::UnsignedInt => in_range(0, u32::MAX.into()),
            BuiltinType::UnsignedShort => in_range(0, u16::MAX.into()),
            BuiltinType::UnsignedByte => in_range(0, u8::MAX.into()),
            _ => true,
        };

        if valid { Ok(()) } else { Err(invalid()) }
    }
}

/// Removes a `Z` or `+hh:mm` / `-hh:mm` timezone suffix.
fn strip_timezone(value: &str) -> &str {
    if let Some(stripped) = value.strip_suffix('Z') {
        return stripped;
    }
    let bytes = value.as_bytes();
    let n = bytes.len();
    if n > 6
        && matches!(bytes[n - 6], b'+' | b'-')
        && bytes[n - 3] == b':'
        && bytes[n - 5..n - 3].iter().all(u8::is_ascii_digit)
        && bytes[n - 2..].iter().all(u8::is_ascii_digit)
    {
        return &value[..n - 6];
    }
    value
}

/// Parses an `xs:dateTime` value, converting to UTC when a timezone is given.
#[must_use]
pub fn parse_date_time(value: &str) -> Option<NaiveDateTime> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.naive_utc())
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").ok())
}

/// Parses an `xs:date` value, ignoring its timezone.
#[must_use]
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(strip_timezone(value), "%Y-%m-%d").ok()
}

/// Parses an `xs:time` value, ignoring its timezone.
#[must_use]
pub fn parse_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(strip_timezone(value), "%H:%M:%S%.f").ok()
}

fn is_base64(value: &str) -> bool {
    let compact: Vec<u8> = value.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    if compact.len() % 4 != 0 {
        return false;
    }
    let padding = compact.iter().rev().take_while(|&&b| b == b'=').count();
    padding <= 2
        && compact[..compact.len() - padding]
            .iter()
            .all(|&b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/')
}

/// Number of octets encoded by a binary value.
#[must_use]
pub fn binary_length(builtin: BuiltinType, value: &str) -> Option<usize> {
    match builtin {
        BuiltinType::HexBinary => Some(value.len() / 2),
        BuiltinType::Base64Binary => {
            let compact: Vec<u8> = value.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
            let padding = compact.iter().rev().take_while(|&&b| b == b'=').count();
            Some((compact.len() / 4 * 3).saturating_sub(padding.min(2)))
        }
        _ => None,
    }
}

/// Parses a value of a decimal-derived datatype.
#[must_use]
pub fn parse_decimal(value: &str) -> Option<Decimal> {
    let value = value.trim_start_matches('+');
    let value = if value.starts_with('.') {
        format!("0{value}")
    } else if value.starts_with("-.") {
        format!("-0{}", &value[1..])
    } else {
        value.to_string()
    };
    Decimal::from_str(value.trim_end_matches('.')).ok()
}

/// Returns `(total_digits, fraction_digits)` of a decimal value, ignoring
/// leading zeros and trailing fractional zeros.
#[must_use]
pub fn digit_counts(value: Decimal) -> (u32, u32) {
    let normalized = value.normalize();
    let mantissa = normalized.mantissa().unsigned_abs();
    let total = if mantissa == 0 {
        1
    } else {
        mantissa.to_string().len() as u32
    };
    (total.max(normalized.scale()), normalized.scale())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> LexicalRules {
        LexicalRules::new().unwrap()
    }

    #[test]
    fn test_decimal_and_integer() {
        let rules = rules();
        assert!(rules.check(BuiltinType::Decimal, "100.50").is_ok());
        assert!(rules.check(BuiltinType::Decimal, "-.5").is_ok());
        assert!(rules.check(BuiltinType::Decimal, "1e3").is_err());
        assert!(rules.check(BuiltinType::Int, "2147483647").is_ok());
        assert!(rules.check(BuiltinType::Int, "2147483648").is_err());
        assert!(rules.check(BuiltinType::PositiveInteger, "0").is_err());
        assert!(rules.check(BuiltinType::NonNegativeInteger, "-0").is_ok());
        assert!(rules.check(BuiltinType::NegativeInteger, "-3").is_ok());
        assert!(rules.check(BuiltinType::UnsignedByte, "256").is_err());
    }

    #[test]
    fn test_dates_and_times() {
        let rules = rules();
        assert!(rules.check(BuiltinType::Date, "2024-02-29").is_ok());
        assert!(rules.check(BuiltinType::Date, "2023-02-29").is_err());
        assert!(rules.check(BuiltinType::Date, "2024-01-15+02:00").is_ok());
        assert!(rules.check(BuiltinType::DateTime, "2024-01-15T10:30:00").is_ok());
        assert!(rules.check(BuiltinType::DateTime, "2024-01-15T10:30:00.123Z").is_ok());
        assert!(rules.check(BuiltinType::DateTime, "2024-01-15").is_err());
        assert!(rules.check(BuiltinType::Time, "23:59:59").is_ok());
        assert!(rules.check(BuiltinType::GYear, "2024").is_ok());
        assert!(rules.check(BuiltinType::GYearMonth, "2024-13").is_err());
        assert!(rules.check(BuiltinType::Duration, "P1Y2M").is_ok());
        assert!(rules.check(BuiltinType::Duration, "P").is_err());
    }

    #[test]
    fn test_names_and_booleans() {
        let rules = rules();
        assert!(rules.check(BuiltinType::Boolean, "true").is_ok());
        assert!(rules.check(BuiltinType::Boolean, "yes").is_err());
        assert!(rules.check(BuiltinType::NcName, "a:b").is_err());
        assert!(rules.check(BuiltinType::QName, "xs:string").is_ok());
        assert!(rules.check(BuiltinType::Language, "en-GB").is_ok());
        assert!(rules.check(BuiltinType::Name, "1abc").is_err());
    }

    #[test]
    fn test_binary() {
        let rules = rules();
        assert!(rules.check(BuiltinType::HexBinary, "0FB7").is_ok());
        assert!(rules.check(BuiltinType::HexBinary, "0FB").is_err());
        assert!(rules.check(BuiltinType::Base64Binary, "aGVsbG8=").is_ok());
        assert!(rules.check(BuiltinType::Base64Binary, "aGVsbG8").is_err());
        assert_eq!(binary_length(BuiltinType::Base64Binary, "aGVsbG8="), Some(5));
        assert_eq!(binary_length(BuiltinType::HexBinary, "0FB7"), Some(2));
    }

    #[test]
    fn test_digit_counts() {
        assert_eq!(digit_counts(parse_decimal("123.4500").unwrap()), (5, 2));
        assert_eq!(digit_counts(parse_decimal("0.5").unwrap()), (1, 1));
        assert_eq!(digit_counts(parse_decimal("100").unwrap()), (3, 0));
        assert_eq!(digit_counts(parse_decimal("0.001").unwrap()), (3, 3));
        assert_eq!(digit_counts(parse_decimal(".5").unwrap()), (1, 1));
    }
}
