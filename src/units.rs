// SPDX-FileCopyrightText: 2025 The tidemark Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Numbers tagged with a unit ('b' or 'B') and a prefix family, formatted
//! with human-readable unit prefixes ("1.5KiB", "2.5Gb", ...).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum UnitError {
    #[error("not a number: {0:?}")]
    NotANumber(String),
    #[error("cannot convert {from} to {to}")]
    UnsupportedConversion { from: String, to: String },
    #[error("unit must be 'bit'/'b' or 'byte'/'B', not {0:?}")]
    InvalidUnit(String),
    #[error("prefix family must be 'metric' or 'binary', not {0:?}")]
    InvalidPrefix(String),
    #[error("division by zero")]
    DivisionByZero,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PrefixFamily {
    #[default]
    Metric,
    Binary,
}

const PREFIXES_METRIC: [(&str, f64); 4] = [
    ("T", 1_000_000_000_000.0),
    ("G", 1_000_000_000.0),
    ("M", 1_000_000.0),
    ("k", 1_000.0),
];

const PREFIXES_BINARY: [(&str, f64); 4] = [
    ("Ti", 1_099_511_627_776.0),
    ("Gi", 1_073_741_824.0),
    ("Mi", 1_048_576.0),
    ("Ki", 1_024.0),
];

// Parse candidates in matching order: each two-letter (binary) prefix is
// tried before its one-letter (metric) counterpart so that "Ki" is never
// misread as "k" followed by a unit of "i".
const PREFIX_ALTERNATION: [(&str, f64, PrefixFamily); 8] = [
    ("ti", 1_099_511_627_776.0, PrefixFamily::Binary),
    ("t", 1_000_000_000_000.0, PrefixFamily::Metric),
    ("gi", 1_073_741_824.0, PrefixFamily::Binary),
    ("g", 1_000_000_000.0, PrefixFamily::Metric),
    ("mi", 1_048_576.0, PrefixFamily::Binary),
    ("m", 1_000_000.0, PrefixFamily::Metric),
    ("ki", 1_024.0, PrefixFamily::Binary),
    ("k", 1_000.0, PrefixFamily::Metric),
];

impl PrefixFamily {
    fn table(self) -> &'static [(&'static str, f64); 4] {
        match self {
            PrefixFamily::Metric => &PREFIXES_METRIC,
            PrefixFamily::Binary => &PREFIXES_BINARY,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PrefixFamily::Metric => "metric",
            PrefixFamily::Binary => "binary",
        }
    }
}

impl FromStr for PrefixFamily {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "metric" => Ok(PrefixFamily::Metric),
            "binary" => Ok(PrefixFamily::Binary),
            other => Err(UnitError::InvalidPrefix(other.to_string())),
        }
    }
}

/// The plain arithmetic value behind a [`UnitNumber`]. Whole-number results
/// collapse to `Int` so that e.g. `1.0` displays as `1`.
#[derive(Debug, Clone, Copy)]
pub enum Magnitude {
    Int(i64),
    Float(f64),
}

impl Magnitude {
    pub fn as_f64(self) -> f64 {
        match self {
            Magnitude::Int(i) => i as f64,
            Magnitude::Float(f) => f,
        }
    }

    pub fn is_infinite(self) -> bool {
        matches!(self, Magnitude::Float(f) if f.is_infinite())
    }

    /// Classify a mathematical result: integral values become `Int`,
    /// everything else (including infinities and NaN) stays `Float`.
    pub fn classify(value: f64) -> Self {
        if value.is_finite() && value.fract() == 0.0 && value.abs() <= i64::MAX as f64 {
            Magnitude::Int(value as i64)
        } else {
            Magnitude::Float(value)
        }
    }
}

impl PartialEq for Magnitude {
    fn eq(&self, other: &Self) -> bool {
        self.as_f64() == other.as_f64()
    }
}

impl PartialOrd for Magnitude {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.as_f64().partial_cmp(&other.as_f64())
    }
}

impl From<i64> for Magnitude {
    fn from(v: i64) -> Self {
        Magnitude::Int(v)
    }
}

impl From<i32> for Magnitude {
    fn from(v: i32) -> Self {
        Magnitude::Int(v as i64)
    }
}

impl From<u64> for Magnitude {
    fn from(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(i) => Magnitude::Int(i),
            Err(_) => Magnitude::Float(v as f64),
        }
    }
}

impl From<f64> for Magnitude {
    fn from(v: f64) -> Self {
        Magnitude::classify(v)
    }
}

impl From<UnitNumber> for Magnitude {
    fn from(v: UnitNumber) -> Self {
        v.value
    }
}

impl From<&UnitNumber> for Magnitude {
    fn from(v: &UnitNumber) -> Self {
        v.value
    }
}

/// An immutable numeric value plus its presentation: an optional unit tag,
/// a prefix family and whether `Display` includes the unit. Arithmetic
/// returns a new value carrying the left operand's presentation.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitNumber {
    value: Magnitude,
    unit: Option<String>,
    prefix: PrefixFamily,
    show_unit: bool,
}

impl UnitNumber {
    pub fn new(value: impl Into<Magnitude>) -> Self {
        Self {
            value: value.into(),
            unit: None,
            prefix: PrefixFamily::Metric,
            show_unit: true,
        }
    }

    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }

    pub fn with_prefix(mut self, prefix: PrefixFamily) -> Self {
        self.prefix = prefix;
        self
    }

    pub fn show_unit(mut self, show: bool) -> Self {
        self.show_unit = show;
        self
    }

    pub fn magnitude(&self) -> Magnitude {
        self.value
    }

    pub fn as_f64(&self) -> f64 {
        self.value.as_f64()
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn prefix(&self) -> PrefixFamily {
        self.prefix
    }

    pub fn shows_unit(&self) -> bool {
        self.show_unit
    }

    /// Convert between bits and bytes by the fixed factor of 8. An untagged
    /// value is assumed to already be in the target unit. Any other pairing
    /// is not in the converter table.
    pub fn convert_to(mut self, target: &str) -> Result<Self, UnitError> {
        match self.unit.as_deref() {
            None => {
                self.unit = Some(target.to_string());
                Ok(self)
            }
            Some(unit) if unit == target => Ok(self),
            Some("B") if target == "b" => {
                self.value = Magnitude::classify(self.value.as_f64() * 8.0);
                self.unit = Some(target.to_string());
                Ok(self)
            }
            Some("b") if target == "B" => {
                self.value = Magnitude::classify(self.value.as_f64() / 8.0);
                self.unit = Some(target.to_string());
                Ok(self)
            }
            Some(unit) => Err(UnitError::UnsupportedConversion {
                from: unit.to_string(),
                to: target.to_string(),
            }),
        }
    }

    pub fn parse(s: &str) -> Result<Self, UnitError> {
        Self::parse_with(s, None, None)
    }

    /// Parse `[sign]digits[.digits][ ][prefix][unit]`. A recognized prefix
    /// scales the magnitude immediately; a two-letter prefix selects the
    /// binary family, a one-letter prefix the metric family. Without a
    /// prefix the family falls back to `default_prefix`.
    pub fn parse_with(
        s: &str,
        default_unit: Option<&str>,
        default_prefix: Option<PrefixFamily>,
    ) -> Result<Self, UnitError> {
        let bytes = s.as_bytes();
        let mut pos = 0;
        if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
            pos = 1;
        }

        let int_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        let int_len = pos - int_start;

        let mut frac_len = 0;
        if pos < bytes.len() && bytes[pos] == b'.' {
            let mut end = pos + 1;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
            frac_len = end - pos - 1;
            // A bare trailing dot is not part of the number.
            if frac_len > 0 {
                pos = end;
            }
        }

        if int_len == 0 && frac_len == 0 {
            return Err(UnitError::NotANumber(s.to_string()));
        }

        let mut num: f64 = s[..pos]
            .parse()
            .map_err(|_| UnitError::NotANumber(s.to_string()))?;

        let mut rest = &s[pos..];
        if let Some(stripped) = rest.strip_prefix(' ') {
            rest = stripped;
        }

        let lower = rest.to_lowercase();
        let mut prefix = None;
        let mut unit_start = 0;
        for (code, size, family) in PREFIX_ALTERNATION {
            if lower.starts_with(code) {
                num *= size;
                prefix = Some(family);
                unit_start = code.len();
                break;
            }
        }

        let unit_str = &rest[unit_start..];
        if unit_str.chars().any(char::is_whitespace) {
            return Err(UnitError::NotANumber(s.to_string()));
        }

        let mut parsed = UnitNumber::new(Magnitude::classify(num))
            .with_prefix(prefix.or(default_prefix).unwrap_or_default());
        if !unit_str.is_empty() {
            parsed.unit = Some(unit_str.to_string());
        } else {
            parsed.unit = default_unit.map(str::to_string);
        }
        Ok(parsed)
    }

    /// Render the magnitude scaled by the first prefix threshold it meets,
    /// largest first. Zero is always "0"; infinities become "∞".
    pub fn format(&self, include_unit: bool) -> String {
        let n = self.value.as_f64();
        let mut out = if n == 0.0 {
            "0".to_string()
        } else if n.is_infinite() {
            pretty_float(n)
        } else {
            let abs = n.abs();
            let mut scaled = None;
            for (code, size) in self.prefix.table() {
                if abs >= *size {
                    scaled = Some(format!("{}{}", pretty_float(n / size), code));
                    break;
                }
            }
            scaled.unwrap_or_else(|| pretty_float(n))
        };
        if include_unit {
            if let Some(unit) = &self.unit {
                out.push_str(unit);
            }
        }
        out
    }

    fn wrap(&self, value: f64) -> UnitNumber {
        UnitNumber {
            value: Magnitude::classify(value),
            unit: self.unit.clone(),
            prefix: self.prefix,
            show_unit: self.show_unit,
        }
    }

    pub fn div(&self, rhs: impl Into<Magnitude>) -> Result<UnitNumber, UnitError> {
        let rhs = rhs.into().as_f64();
        if rhs == 0.0 {
            return Err(UnitError::DivisionByZero);
        }
        Ok(self.wrap(self.as_f64() / rhs))
    }

    /// Floor division, like `//`.
    pub fn floor_div(&self, rhs: impl Into<Magnitude>) -> Result<UnitNumber, UnitError> {
        let rhs = rhs.into().as_f64();
        if rhs == 0.0 {
            return Err(UnitError::DivisionByZero);
        }
        Ok(self.wrap((self.as_f64() / rhs).floor()))
    }

    /// Floored remainder: the sign follows the divisor, so `floor_div`
    /// and `rem` always satisfy `q * d + r == n`.
    pub fn rem(&self, rhs: impl Into<Magnitude>) -> Result<UnitNumber, UnitError> {
        let rhs = rhs.into().as_f64();
        if rhs == 0.0 {
            return Err(UnitError::DivisionByZero);
        }
        let n = self.as_f64();
        Ok(self.wrap(n - rhs * (n / rhs).floor()))
    }

    /// Quotient and remainder in one go, like `divmod`.
    pub fn div_rem(
        &self,
        rhs: impl Into<Magnitude>,
    ) -> Result<(UnitNumber, UnitNumber), UnitError> {
        let rhs = rhs.into();
        Ok((self.floor_div(rhs)?, self.rem(rhs)?))
    }

    pub fn pow(&self, exp: impl Into<Magnitude>) -> UnitNumber {
        self.wrap(self.as_f64().powf(exp.into().as_f64()))
    }

    pub fn floor(&self) -> UnitNumber {
        if self.value.is_infinite() {
            return self.clone();
        }
        self.wrap(self.as_f64().floor())
    }

    pub fn ceil(&self) -> UnitNumber {
        if self.value.is_infinite() {
            return self.clone();
        }
        self.wrap(self.as_f64().ceil())
    }

    pub fn round(&self) -> UnitNumber {
        // Rounding infinity must not try to produce an integer.
        if self.value.is_infinite() {
            return self.clone();
        }
        self.wrap(self.as_f64().round())
    }
}

impl<T: Into<Magnitude>> std::ops::Add<T> for &UnitNumber {
    type Output = UnitNumber;

    fn add(self, rhs: T) -> UnitNumber {
        self.wrap(self.as_f64() + rhs.into().as_f64())
    }
}

impl<T: Into<Magnitude>> std::ops::Sub<T> for &UnitNumber {
    type Output = UnitNumber;

    fn sub(self, rhs: T) -> UnitNumber {
        self.wrap(self.as_f64() - rhs.into().as_f64())
    }
}

impl<T: Into<Magnitude>> std::ops::Mul<T> for &UnitNumber {
    type Output = UnitNumber;

    fn mul(self, rhs: T) -> UnitNumber {
        self.wrap(self.as_f64() * rhs.into().as_f64())
    }
}

impl fmt::Display for UnitNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(self.show_unit))
    }
}

/// Format a float with a reasonable number of decimal places: whole values
/// get none, small values two, medium values one, large values none again.
/// Trailing fractional zeros are trimmed ("1.50" -> "1.5").
pub fn pretty_float(n: f64) -> String {
    if n.is_infinite() {
        return if n > 0.0 { "∞" } else { "-∞" }.to_string();
    }
    let abs = n.abs();
    if abs == 0.0 {
        return "0".to_string();
    }
    let rounded2 = (abs * 100.0).round() / 100.0;
    if rounded2 == abs.trunc() {
        format!("{:.0}", n)
    } else if rounded2 < 10.0 {
        trim_fraction(format!("{:.2}", n))
    } else if (abs * 10.0).round() / 10.0 < 100.0 {
        trim_fraction(format!("{:.1}", n))
    } else {
        format!("{:.0}", n)
    }
}

fn trim_fraction(s: String) -> String {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}

/// Normalizes numbers into a fixed unit (bits or bytes) and prefix family,
/// converting between the two units by the factor of 8.
#[derive(Debug, Clone)]
pub struct DataCountConverter {
    unit: &'static str,
    prefix: PrefixFamily,
}

impl Default for DataCountConverter {
    fn default() -> Self {
        Self {
            unit: "B",
            prefix: PrefixFamily::Metric,
        }
    }
}

fn normalize_unit(unit: &str) -> Result<&'static str, UnitError> {
    match unit {
        "b" | "bit" => Ok("b"),
        "B" | "byte" => Ok("B"),
        other => Err(UnitError::InvalidUnit(other.to_string())),
    }
}

impl DataCountConverter {
    pub fn new(unit: &str, prefix: PrefixFamily) -> Result<Self, UnitError> {
        Ok(Self {
            unit: normalize_unit(unit)?,
            prefix,
        })
    }

    pub fn unit(&self) -> &'static str {
        self.unit
    }

    pub fn prefix(&self) -> PrefixFamily {
        self.prefix
    }

    pub fn set_unit(&mut self, unit: &str) -> Result<(), UnitError> {
        self.unit = normalize_unit(unit)?;
        Ok(())
    }

    pub fn set_prefix(&mut self, prefix: &str) -> Result<(), UnitError> {
        self.prefix = prefix.parse()?;
        Ok(())
    }

    /// Express `num` in the configured unit and prefix family. The source
    /// unit is the number's own tag, else the `unit` argument, else the
    /// configured unit.
    pub fn convert(&self, num: UnitNumber, unit: Option<&str>) -> Result<UnitNumber, UnitError> {
        let given = match num.unit() {
            Some(u) => u.to_string(),
            None => unit.unwrap_or(self.unit).to_string(),
        };
        let source = normalize_unit(&given)?;
        num.with_unit(source)
            .with_prefix(self.prefix)
            .convert_to(self.unit)
    }

    pub fn convert_raw(
        &self,
        num: impl Into<Magnitude>,
        unit: Option<&str>,
    ) -> Result<UnitNumber, UnitError> {
        self.convert(UnitNumber::new(num), unit)
    }

    pub fn parse(&self, s: &str, unit: Option<&str>) -> Result<UnitNumber, UnitError> {
        let parsed = UnitNumber::parse_with(s, unit.or(Some(self.unit)), Some(self.prefix))?;
        self.convert(parsed, unit)
    }
}
