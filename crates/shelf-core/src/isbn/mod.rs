//! # ISBN Codec
//!
//! Parses, validates, segments and formats International Standard Book
//! Numbers in both the 10-digit and the 13-digit form.
//!
//! ## Anatomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     978 - 0 - 553 - 21350 - 8                           │
//! │                      │    │    │      │     │                           │
//! │   prefix (13 only) ──┘    │    │      │     └── check digit (0-9, X=10) │
//! │   registration group ─────┘    │      └──────── publication             │
//! │   registrant (publisher) ──────┘                                        │
//! │                                                                         │
//! │  Group length:      first band matching the leading digits             │
//! │     1 digit  {0,1,2,3,4,5,7}                                           │
//! │     2 digits [80,94]                                                    │
//! │     3 digits [600,621] ∪ [950,989]                                      │
//! │     4 digits [9926,9989]                                                │
//! │     5 digits [99901,99976]                                              │
//! │                                                                         │
//! │  Registrant length: same idea over the digits after the group          │
//! │     [0,19]→2  [200,699]→3  [7000,8499]→4  [85000,89999]→5              │
//! │     [900000,949999]→6  [9500000,9999999]→7                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Checksums
//! - 13 digits: weights alternate 1,3,1,3... and the sum is divisible by 10.
//! - 10 digits: weights run 10 down to 1 (final `X` counts as 10) and the sum
//!   is divisible by 11.
//!
//! ## Validation order
//! length → prefix → checksum → group → registrant → region. A valid
//! [`Isbn`] always has a resolvable [`Region`].
//!
//! ## Example
//! ```rust
//! use shelf_core::isbn::Isbn;
//!
//! let isbn = Isbn::parse("978-0-553-21350-8").unwrap();
//! assert_eq!(isbn.group(), "0");
//! assert_eq!(isbn.registrant(), "553");
//! assert_eq!(isbn.render(true), "978-0-553-21350-8");
//! assert_eq!(isbn.to_string(), "9780553213508");
//! ```

pub mod region;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::IsbnError;
pub use region::Region;

/// Digit value used for the `X` check character of the 10-digit form.
const CHECK_X: u8 = 10;

/// (field length, lowest value, highest value), evaluated in order.
type Band = (usize, u32, u32);

const GROUP_BANDS: &[Band] = &[
    (1, 0, 5),
    (1, 7, 7),
    (2, 80, 94),
    (3, 600, 621),
    (3, 950, 989),
    (4, 9926, 9989),
    (5, 99901, 99976),
];

const REGISTRANT_BANDS: &[Band] = &[
    (2, 0, 19),
    (3, 200, 699),
    (4, 7000, 8499),
    (5, 85000, 89999),
    (6, 900000, 949999),
    (7, 9500000, 9999999),
];

// =============================================================================
// Isbn
// =============================================================================

/// A validated ISBN, decomposed into its fields.
///
/// Equality and hashing follow the canonical digit sequence: segmentation is
/// a pure function of the digits, so field-wise equality is the same thing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Isbn {
    prefix: Option<String>,
    group: String,
    registrant: String,
    publication: String,
    check: u8,
}

impl Isbn {
    /// Parses and validates an ISBN.
    ///
    /// Separators and any other non-digit characters are ignored, except a
    /// trailing `X`/`x` which is the check character of a 10-digit ISBN.
    ///
    /// ## Errors
    /// - [`IsbnError::Format`] for the wrong number of digits, a misplaced
    ///   `X`, or digits outside every group/registrant band
    /// - [`IsbnError::InvalidPrefix`] for a 13-digit form not starting 978/979
    /// - [`IsbnError::Checksum`] when the check digit is wrong
    /// - [`IsbnError::InvalidRegion`] when the group has no region
    pub fn parse(text: &str) -> Result<Self, IsbnError> {
        let digits = normalize(text)?;
        let canonical = render_digits(&digits);

        let (prefix, body) = match digits.len() {
            13 => {
                let prefix = &digits[..3];
                let value = numeric_value(prefix);
                if value != 978 && value != 979 {
                    return Err(IsbnError::InvalidPrefix {
                        prefix: render_digits(prefix),
                    });
                }
                (Some(render_digits(prefix)), &digits[3..])
            }
            10 => (None, &digits[..]),
            n => {
                return Err(IsbnError::format(
                    text,
                    format!("expected 10 or 13 digits, found {n}"),
                ))
            }
        };

        if !checksum_holds(&digits) {
            return Err(IsbnError::Checksum { input: canonical });
        }

        let (payload, check) = body.split_at(body.len() - 1);

        let group_len = match_band(payload, GROUP_BANDS)
            .ok_or_else(|| IsbnError::format(text, "no registration group matches"))?;
        let rest = &payload[group_len..];
        let registrant_len = match_band(rest, REGISTRANT_BANDS)
            .ok_or_else(|| IsbnError::format(text, "no registrant range matches"))?;
        // May be empty: a 5-digit group with a 4-digit registrant fills the body
        let publication = &rest[registrant_len..];

        let isbn = Isbn {
            prefix,
            group: render_digits(&payload[..group_len]),
            registrant: render_digits(&rest[..registrant_len]),
            publication: render_digits(publication),
            check: check[0],
        };

        // An otherwise well-formed ISBN with an unassigned group is invalid.
        isbn.region()?;

        Ok(isbn)
    }

    /// Returns true if `text` parses as a valid ISBN.
    pub fn is_valid(text: &str) -> bool {
        Isbn::parse(text).is_ok()
    }

    /// `978` or `979` for the 13-digit form, `None` for the 10-digit form.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Registration group (language/country), 1-5 digits.
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Registrant (publisher), 2-7 digits.
    pub fn registrant(&self) -> &str {
        &self.registrant
    }

    /// Publication element.
    pub fn publication(&self) -> &str {
        &self.publication
    }

    /// Check digit value; 10 only occurs in the 10-digit form.
    pub fn check(&self) -> u8 {
        self.check
    }

    /// True for the 13-digit form.
    pub fn is_isbn13(&self) -> bool {
        self.prefix.is_some()
    }

    /// Resolves the registration group to its region.
    pub fn region(&self) -> Result<Region, IsbnError> {
        let value = self
            .group
            .parse::<u32>()
            .map_err(|_| IsbnError::format(&self.group, "group is not numeric"))?;
        Region::for_group(value).ok_or_else(|| IsbnError::InvalidRegion {
            group: self.group.clone(),
        })
    }

    /// Joins the fields, dash-separated when `with_separators` is set.
    ///
    /// ## Example
    /// ```rust
    /// use shelf_core::isbn::Isbn;
    ///
    /// let isbn = Isbn::parse("080442957X").unwrap();
    /// assert_eq!(isbn.render(true), "0-8044-2957-X");
    /// assert_eq!(isbn.render(false), "080442957X");
    /// ```
    pub fn render(&self, with_separators: bool) -> String {
        let check = check_char(self.check).to_string();
        let parts: Vec<&str> = self
            .prefix
            .as_deref()
            .into_iter()
            .chain([
                self.group.as_str(),
                self.registrant.as_str(),
                self.publication.as_str(),
                check.as_str(),
            ])
            .filter(|part| !part.is_empty())
            .collect();

        parts.join(if with_separators { "-" } else { "" })
    }

    /// Dash-separated form, e.g. `978-0-553-21350-8`.
    pub fn hyphenated(&self) -> String {
        self.render(true)
    }

    /// Converts to the 13-digit form (adds the `978` prefix and recomputes
    /// the check digit). Already-13-digit values are returned unchanged.
    pub fn to_isbn13(&self) -> Isbn {
        if self.is_isbn13() {
            return self.clone();
        }

        let mut digits = vec![9, 7, 8];
        digits.extend(self.payload_digits());
        let check = check_digit13(&digits);

        Isbn {
            prefix: Some("978".to_string()),
            check,
            ..self.clone()
        }
    }

    /// Converts to the 10-digit form. Only `978`-prefixed values have one.
    pub fn to_isbn10(&self) -> Option<Isbn> {
        match self.prefix.as_deref() {
            None => Some(self.clone()),
            Some("978") => {
                let digits = self.payload_digits();
                Some(Isbn {
                    prefix: None,
                    check: check_digit10(&digits),
                    ..self.clone()
                })
            }
            Some(_) => None,
        }
    }

    /// Group + registrant + publication digits (no prefix, no check).
    fn payload_digits(&self) -> Vec<u8> {
        self.group
            .bytes()
            .chain(self.registrant.bytes())
            .chain(self.publication.bytes())
            .map(|b| b - b'0')
            .collect()
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Canonical digit sequence without separators.
impl fmt::Display for Isbn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(false))
    }
}

impl FromStr for Isbn {
    type Err = IsbnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Isbn::parse(s)
    }
}

impl TryFrom<String> for Isbn {
    type Error = IsbnError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Isbn::parse(&value)
    }
}

impl From<Isbn> for String {
    fn from(isbn: Isbn) -> Self {
        isbn.to_string()
    }
}

// =============================================================================
// Check Digits
// =============================================================================

/// Check digit for the first 12 digits of an ISBN-13.
pub fn check_digit13(first12: &[u8]) -> u8 {
    let sum: u32 = first12
        .iter()
        .enumerate()
        .map(|(i, &d)| u32::from(d) * if i % 2 == 0 { 1 } else { 3 })
        .sum();
    ((10 - sum % 10) % 10) as u8
}

/// Check digit for the first 9 digits of an ISBN-10; 10 means `X`.
pub fn check_digit10(first9: &[u8]) -> u8 {
    let sum: u32 = first9
        .iter()
        .enumerate()
        .map(|(i, &d)| u32::from(d) * (10 - i as u32))
        .sum();
    ((11 - sum % 11) % 11) as u8
}

fn checksum_holds(digits: &[u8]) -> bool {
    match digits.len() {
        13 => {
            let sum: u32 = digits
                .iter()
                .enumerate()
                .map(|(i, &d)| u32::from(d) * if i % 2 == 0 { 1 } else { 3 })
                .sum();
            sum % 10 == 0
        }
        10 => {
            let sum: u32 = digits
                .iter()
                .enumerate()
                .map(|(i, &d)| u32::from(d) * (10 - i as u32))
                .sum();
            sum % 11 == 0
        }
        _ => false,
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Keeps digits (and a final `X`), dropping everything else.
fn normalize(text: &str) -> Result<Vec<u8>, IsbnError> {
    let mut digits = Vec::with_capacity(13);
    for c in text.chars() {
        match c {
            '0'..='9' => digits.push(c as u8 - b'0'),
            'X' | 'x' => digits.push(CHECK_X),
            _ => {}
        }
    }

    let misplaced_x = digits
        .iter()
        .position(|&d| d == CHECK_X)
        .is_some_and(|pos| digits.len() != 10 || pos != 9);
    if misplaced_x {
        return Err(IsbnError::format(
            text,
            "X is only allowed as the last character of a 10-digit ISBN",
        ));
    }

    Ok(digits)
}

/// Length of the first band whose leading digits fall in range.
fn match_band(digits: &[u8], bands: &[Band]) -> Option<usize> {
    bands
        .iter()
        .find(|(len, lo, hi)| {
            digits.len() >= *len && (*lo..=*hi).contains(&numeric_value(&digits[..*len]))
        })
        .map(|(len, _, _)| *len)
}

fn numeric_value(digits: &[u8]) -> u32 {
    digits.iter().fold(0, |acc, &d| acc * 10 + u32::from(d))
}

fn check_char(value: u8) -> char {
    if value == CHECK_X {
        'X'
    } else {
        char::from(b'0' + value)
    }
}

fn render_digits(digits: &[u8]) -> String {
    digits.iter().map(|&d| check_char(d)).collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn digits(s: &str) -> Vec<u8> {
        s.bytes().map(|b| b - b'0').collect()
    }

    /// Appends a correct ISBN-10 check character to nine digits.
    fn complete10(first9: &str) -> String {
        format!("{first9}{}", check_char(check_digit10(&digits(first9))))
    }

    /// Appends a correct ISBN-13 check digit to twelve digits.
    fn complete13(first12: &str) -> String {
        format!("{first12}{}", check_digit13(&digits(first12)))
    }

    #[test]
    fn test_parse_isbn13() {
        let isbn = Isbn::parse("9780553213508").unwrap();
        assert_eq!(isbn.prefix(), Some("978"));
        assert_eq!(isbn.group(), "0");
        assert_eq!(isbn.registrant(), "553");
        assert_eq!(isbn.publication(), "21350");
        assert_eq!(isbn.check(), 8);
        assert_eq!(isbn.region().unwrap(), Region::EnglishSpeaking);
    }

    #[test]
    fn test_parse_isbn10_with_x() {
        let isbn = Isbn::parse("0-8044-2957-X").unwrap();
        assert_eq!(isbn.prefix(), None);
        assert_eq!(isbn.registrant(), "8044");
        assert_eq!(isbn.check(), 10);
        assert_eq!(isbn.to_string(), "080442957X");

        // lower-case x is accepted
        assert!(Isbn::is_valid("080442957x"));
    }

    #[test]
    fn test_separators_are_ignored() {
        let a = Isbn::parse("ISBN 978-0-553-21350-8").unwrap();
        let b = Isbn::parse("9780553213508").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_render_round_trip() {
        let samples = [
            "9780553213508",
            "0306406152",
            "080442957X",
            &complete13("978802000001"),
            &complete13("979123456789"),
            &complete10("995010001"),
            &complete10("999011001"),
        ];

        for text in samples {
            let isbn = Isbn::parse(text).unwrap();
            let again = Isbn::parse(&isbn.render(false)).unwrap();
            assert_eq!(again.to_string(), *text);

            let hyphenated = Isbn::parse(&isbn.render(true)).unwrap();
            assert_eq!(hyphenated, isbn);
        }
    }

    #[test]
    fn test_flipped_check_digit_fails_checksum() {
        for text in ["9780553213508", "0306406152", "080442957X"] {
            let mut chars: Vec<char> = text.chars().collect();
            let last = chars.len() - 1;
            chars[last] = if chars[last] == '9' { '1' } else { '9' };
            let flipped: String = chars.into_iter().collect();

            assert!(matches!(
                Isbn::parse(&flipped),
                Err(IsbnError::Checksum { .. })
            ));
        }
    }

    #[test]
    fn test_wrong_length() {
        assert!(matches!(
            Isbn::parse("12345"),
            Err(IsbnError::Format { .. })
        ));
        assert!(matches!(Isbn::parse(""), Err(IsbnError::Format { .. })));
    }

    #[test]
    fn test_misplaced_x() {
        assert!(matches!(
            Isbn::parse("08044X9570"),
            Err(IsbnError::Format { .. })
        ));
        assert!(matches!(
            Isbn::parse("978055321350X"),
            Err(IsbnError::Format { .. })
        ));
    }

    #[test]
    fn test_invalid_prefix() {
        assert_eq!(
            Isbn::parse("9770553213508"),
            Err(IsbnError::InvalidPrefix {
                prefix: "977".to_string()
            })
        );
    }

    #[test]
    fn test_group_segmentation() {
        assert_eq!(Isbn::parse(&complete13("978802000001")).unwrap().group(), "80");
        assert_eq!(Isbn::parse(&complete10("995010001")).unwrap().group(), "9950");
        assert_eq!(Isbn::parse(&complete10("999011001")).unwrap().group(), "99901");
        assert_eq!(Isbn::parse(&complete10("600200123")).unwrap().group(), "600");
    }

    #[test]
    fn test_registrant_segmentation() {
        // [0,19] → 2 digits
        assert_eq!(Isbn::parse(&complete10("019999999")).unwrap().registrant(), "19");
        // [85000,89999] → 5 digits
        assert_eq!(Isbn::parse(&complete10("085000999")).unwrap().registrant(), "85000");
        // [9500000,9999999] → 7 digits
        assert_eq!(Isbn::parse(&complete10("095000001")).unwrap().registrant(), "9500000");
    }

    #[test]
    fn test_unmatched_group_is_format_error() {
        // 6, 69, 690, 6900, 69000 match no group band
        assert!(matches!(
            Isbn::parse(&complete10("690000000")),
            Err(IsbnError::Format { .. })
        ));
    }

    #[test]
    fn test_empty_publication_round_trips() {
        // 5-digit group + 2-digit registrant leaves two publication digits
        assert_eq!(
            Isbn::parse(&complete10("999011001")).unwrap().publication(),
            "01"
        );

        // 5-digit group + 4-digit registrant leaves nothing
        let isbn = Isbn::parse("9990170002").unwrap();
        assert_eq!(isbn.group(), "99901");
        assert_eq!(isbn.registrant(), "7000");
        assert_eq!(isbn.publication(), "");
        assert_eq!(isbn.render(false), "9990170002");
        assert_eq!(isbn.hyphenated(), "99901-7000-2");
        assert_eq!(Isbn::parse(&isbn.hyphenated()).unwrap(), isbn);
    }

    #[test]
    fn test_unassigned_group_is_invalid_region() {
        assert_eq!(
            Isbn::parse(&complete10("610200123")),
            Err(IsbnError::InvalidRegion {
                group: "610".to_string()
            })
        );
    }

    #[test]
    fn test_isbn10_to_isbn13_and_back() {
        let ten = Isbn::parse("0306406152").unwrap();
        let thirteen = ten.to_isbn13();
        assert_eq!(thirteen.to_string(), "9780306406157");
        assert_eq!(thirteen.render(true), "978-0-306-40615-7");
        assert_eq!(thirteen.to_isbn10(), Some(ten));

        let nine79 = Isbn::parse(&complete13("979123456789")).unwrap();
        assert_eq!(nine79.to_isbn10(), None);
    }

    #[test]
    fn test_serde_uses_canonical_string() {
        let isbn = Isbn::parse("978-0-553-21350-8").unwrap();
        let json = serde_json::to_string(&isbn).unwrap();
        assert_eq!(json, "\"9780553213508\"");

        let back: Isbn = serde_json::from_str(&json).unwrap();
        assert_eq!(back, isbn);

        assert!(serde_json::from_str::<Isbn>("\"9780553213509\"").is_err());
    }
}
