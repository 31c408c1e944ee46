//! Arbitrary-precision NUMERIC values.
//!
//! `Numeric` keeps the canonical decimal text form PostgreSQL prints
//! (`-12.3400`, `NaN`, `Infinity`). Binary conversion follows the server's
//! base-10000 layout:
//!
//! - 2 bytes: ndigits (number of base-10000 digits)
//! - 2 bytes: weight (power of 10000 of the first digit)
//! - 2 bytes: sign (0x0000=positive, 0x4000=negative, 0xC000=NaN, 0xD000=+Inf, 0xF000=-Inf)
//! - 2 bytes: dscale (digits after the decimal point)
//! - ndigits * 2 bytes: digits (each 0-9999)

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::protocol::codec::{read_i16, read_u16};

const NUMERIC_POS: u16 = 0x0000;
const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;

const NBASE: u16 = 10000;

/// Largest decimal exponent accepted when parsing scientific notation.
const MAX_EXPONENT: i64 = 147_455;

/// Arbitrary-precision decimal in canonical text form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Numeric(String);

impl Numeric {
    /// The canonical text form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the canonical text form.
    pub fn into_string(self) -> String {
        self.0
    }

    /// NaN
    pub fn nan() -> Self {
        Numeric("NaN".into())
    }

    /// True for NaN and the infinities.
    pub fn is_special(&self) -> bool {
        matches!(self.0.as_str(), "NaN" | "Infinity" | "-Infinity")
    }

    /// Lossy conversion to f64.
    pub fn to_f64(&self) -> f64 {
        // canonical forms always parse
        self.0.parse().unwrap_or(f64::NAN)
    }

    /// Parse decimal text, returning `None` if it is not a number.
    ///
    /// Accepts an optional sign, digits with an optional fraction, an
    /// optional exponent, and the special values. The result is
    /// normalized: no leading `+`, no redundant leading zeros, no
    /// exponent, and `-0` becomes `0`.
    fn canonicalize(s: &str) -> Option<String> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("nan") {
            return Some("NaN".into());
        }
        if s.eq_ignore_ascii_case("infinity") || s.eq_ignore_ascii_case("+infinity") {
            return Some("Infinity".into());
        }
        if s.eq_ignore_ascii_case("-infinity") {
            return Some("-Infinity".into());
        }

        let (negative, body) = match s.as_bytes().first()? {
            b'-' => (true, &s[1..]),
            b'+' => (false, &s[1..]),
            _ => (false, s),
        };
        let (mantissa, exp) = match body.find(['e', 'E']) {
            Some(pos) => {
                let exp: i64 = body[pos + 1..].parse().ok()?;
                if exp.abs() > MAX_EXPONENT {
                    return None;
                }
                (&body[..pos], exp)
            }
            None => (body, 0),
        };
        let (int, frac) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        if int.is_empty() && frac.is_empty() {
            return None;
        }
        if !int.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
            return None;
        }

        let digits: String = [int, frac].concat();
        let point = int.len() as i64 + exp;
        let (int_part, frac_part) = if point <= 0 {
            ("0".to_string(), "0".repeat((-point) as usize) + &digits)
        } else if point as usize >= digits.len() {
            (digits.clone() + &"0".repeat(point as usize - digits.len()), String::new())
        } else {
            let (i, f) = digits.split_at(point as usize);
            (i.to_string(), f.to_string())
        };

        let int_part = match int_part.trim_start_matches('0') {
            "" => "0",
            trimmed => trimmed,
        };
        let is_zero = int_part == "0" && frac_part.bytes().all(|b| b == b'0');

        let mut out = String::with_capacity(int_part.len() + frac_part.len() + 2);
        if negative && !is_zero {
            out.push('-');
        }
        out.push_str(int_part);
        if !frac_part.is_empty() {
            out.push('.');
            out.push_str(&frac_part);
        }
        Some(out)
    }

    /// Write the base-10000 binary form.
    pub(crate) fn encode_binary(&self, buf: &mut Vec<u8>) -> Result<()> {
        let special = match self.0.as_str() {
            "NaN" => Some(NUMERIC_NAN),
            "Infinity" => Some(NUMERIC_PINF),
            "-Infinity" => Some(NUMERIC_NINF),
            _ => None,
        };
        if let Some(sign) = special {
            buf.extend_from_slice(&0_i16.to_be_bytes());
            buf.extend_from_slice(&0_i16.to_be_bytes());
            buf.extend_from_slice(&sign.to_be_bytes());
            buf.extend_from_slice(&0_u16.to_be_bytes());
            return Ok(());
        }

        let (sign, body) = match self.0.strip_prefix('-') {
            Some(rest) => (NUMERIC_NEG, rest),
            None => (NUMERIC_POS, self.0.as_str()),
        };
        let (int, frac) = body.split_once('.').unwrap_or((body, ""));
        let dscale = u16::try_from(frac.len())
            .ok()
            .filter(|&d| d <= 0x3FFF)
            .ok_or_else(|| Error::Encode(format!("numeric scale too large: {}", frac.len())))?;

        // Align both halves on 4-digit group boundaries
        let int_pad = (4 - int.len() % 4) % 4;
        let frac_pad = (4 - frac.len() % 4) % 4;
        let mut aligned = Vec::with_capacity(int_pad + int.len() + frac.len() + frac_pad);
        aligned.extend(std::iter::repeat_n(b'0', int_pad));
        aligned.extend_from_slice(int.as_bytes());
        aligned.extend_from_slice(frac.as_bytes());
        aligned.extend(std::iter::repeat_n(b'0', frac_pad));

        let mut groups: Vec<i16> = aligned
            .chunks(4)
            .map(|chunk| {
                chunk
                    .iter()
                    .fold(0_i16, |acc, &b| acc * 10 + i16::from(b - b'0'))
            })
            .collect();
        let mut weight = ((int_pad + int.len()) / 4) as i64 - 1;

        let leading = groups.iter().take_while(|&&g| g == 0).count();
        groups.drain(..leading);
        weight -= leading as i64;
        while groups.last() == Some(&0) {
            groups.pop();
        }
        if groups.is_empty() {
            weight = 0;
        }

        let ndigits = i16::try_from(groups.len())
            .map_err(|_| Error::Encode("numeric has too many digits".into()))?;
        let weight = i16::try_from(weight)
            .map_err(|_| Error::Encode("numeric weight out of range".into()))?;

        buf.extend_from_slice(&ndigits.to_be_bytes());
        buf.extend_from_slice(&weight.to_be_bytes());
        buf.extend_from_slice(&sign.to_be_bytes());
        buf.extend_from_slice(&dscale.to_be_bytes());
        for g in groups {
            buf.extend_from_slice(&g.to_be_bytes());
        }
        Ok(())
    }

    /// Parse the base-10000 binary form.
    pub(crate) fn decode_binary(bytes: &[u8]) -> Result<Self> {
        let short = |_| Error::Decode(format!("invalid NUMERIC length: {}", bytes.len()));
        let (ndigits, rest) = read_i16(bytes).map_err(short)?;
        let (weight, rest) = read_i16(rest).map_err(short)?;
        let (sign, rest) = read_u16(rest).map_err(short)?;
        let (dscale, mut rest) = read_u16(rest).map_err(short)?;

        match sign {
            NUMERIC_NAN => return Ok(Numeric("NaN".into())),
            NUMERIC_PINF => return Ok(Numeric("Infinity".into())),
            NUMERIC_NINF => return Ok(Numeric("-Infinity".into())),
            NUMERIC_POS | NUMERIC_NEG => {}
            other => {
                return Err(Error::Decode(format!("invalid NUMERIC sign: 0x{:04x}", other)));
            }
        }

        let ndigits = usize::try_from(ndigits)
            .map_err(|_| Error::Decode(format!("invalid NUMERIC ndigits: {}", ndigits)))?;
        if rest.len() != ndigits * 2 {
            return Err(Error::Decode(format!(
                "invalid NUMERIC length: {} (expected {})",
                bytes.len(),
                8 + ndigits * 2
            )));
        }
        let mut digits = Vec::with_capacity(ndigits);
        for _ in 0..ndigits {
            let (d, r) = read_i16(rest)?;
            if !(0..NBASE as i16).contains(&d) {
                return Err(Error::Decode(format!("invalid NUMERIC digit: {}", d)));
            }
            digits.push(d);
            rest = r;
        }

        let weight = i64::from(weight);
        let dscale = usize::from(dscale & 0x3FFF);
        let digit_at = |idx: i64| -> i16 {
            usize::try_from(idx)
                .ok()
                .and_then(|i| digits.get(i).copied())
                .unwrap_or(0)
        };

        let mut int_part = String::new();
        for idx in 0..=weight {
            int_part.push_str(&format!("{:04}", digit_at(idx)));
        }
        let int_part = match int_part.trim_start_matches('0') {
            "" => "0",
            trimmed => trimmed,
        };

        let mut frac_part = String::new();
        let frac_groups = dscale.div_ceil(4) as i64;
        for k in 0..frac_groups {
            frac_part.push_str(&format!("{:04}", digit_at(weight + 1 + k)));
        }
        frac_part.truncate(dscale);

        let is_zero = int_part == "0" && frac_part.bytes().all(|b| b == b'0');
        let mut out = String::new();
        if sign == NUMERIC_NEG && !is_zero {
            out.push('-');
        }
        out.push_str(int_part);
        if !frac_part.is_empty() {
            out.push('.');
            out.push_str(&frac_part);
        }
        Ok(Numeric(out))
    }
}

impl FromStr for Numeric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Numeric::canonicalize(s)
            .map(Numeric)
            .ok_or_else(|| Error::Encode(format!("invalid numeric literal: {:?}", s)))
    }
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! numeric_from_int {
    ($($t:ty),+) => {
        $(
            impl From<$t> for Numeric {
                fn from(value: $t) -> Self {
                    Numeric(value.to_string())
                }
            }
        )+
    };
}

numeric_from_int!(i16, i32, i64, u32);

#[cfg(feature = "with-rust-decimal")]
impl From<rust_decimal::Decimal> for Numeric {
    fn from(value: rust_decimal::Decimal) -> Self {
        // Decimal's Display has no exponent; canonicalize drops "-0"
        let text = value.to_string();
        Numeric(Numeric::canonicalize(&text).unwrap_or(text))
    }
}

#[cfg(feature = "with-rust-decimal")]
impl TryFrom<&Numeric> for rust_decimal::Decimal {
    type Error = Error;

    fn try_from(value: &Numeric) -> Result<Self> {
        rust_decimal::Decimal::from_str_exact(value.as_str())
            .map_err(|e| Error::Decode(format!("numeric {} does not fit Decimal: {}", value, e)))
    }
}
