//! Letter/number conversion and `B3` / `B3.A1` position parsing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Separator between the segments of a nested position path.
pub const PATH_SEPARATOR: char = '.';

/// Errors produced while converting or parsing positions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Position must be at least 1, got {0}")]
    NonPositive(usize),

    #[error("Invalid column letters: '{0}'")]
    InvalidLetters(String),

    #[error("Invalid position: '{0}'")]
    InvalidPosition(String),

    #[error("Column letters overflow: '{0}'")]
    Overflow(String),
}

/// A 1-based (column, row) coordinate inside a single table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub column: usize,
    pub row: usize,
}

impl Position {
    #[must_use]
    pub fn new(column: usize, row: usize) -> Self {
        Self { column, row }
    }

    /// Column letters of this position (`A` for column 1).
    pub fn column_letters(&self) -> Result<String, AddressError> {
        to_letters(self.column)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match to_letters(self.column) {
            Ok(letters) => write!(f, "{letters}{}", self.row),
            Err(_) => write!(f, "?{}", self.row),
        }
    }
}

impl FromStr for Position {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_position(s)
    }
}

/// Convert a 1-based number into column letters.
///
/// Uses bijective base-26 numeration, so there is no zero digit:
/// 1 -> `A`, 26 -> `Z`, 27 -> `AA`, 702 -> `ZZ`, 703 -> `AAA`.
pub fn to_letters(number: usize) -> Result<String, AddressError> {
    if number == 0 {
        return Err(AddressError::NonPositive(number));
    }

    let mut n = number;
    let mut out = Vec::new();
    while n > 0 {
        let digit = ((n - 1) % 26) as u8;
        out.push((b'A' + digit) as char);
        n = (n - 1) / 26;
    }
    Ok(out.into_iter().rev().collect())
}

/// Convert column letters back into their 1-based number.
///
/// Only uppercase `A`-`Z` are accepted.
pub fn to_number(letters: &str) -> Result<usize, AddressError> {
    if letters.is_empty() {
        return Err(AddressError::InvalidLetters(letters.to_string()));
    }

    let mut result: usize = 0;
    for b in letters.bytes() {
        if !b.is_ascii_uppercase() {
            return Err(AddressError::InvalidLetters(letters.to_string()));
        }
        result = result
            .checked_mul(26)
            .and_then(|r| r.checked_add((b - b'A') as usize + 1))
            .ok_or_else(|| AddressError::Overflow(letters.to_string()))?;
    }
    Ok(result)
}

/// Format a 1-based (column, row) pair as `B3`.
pub fn get_position(column: usize, row: usize) -> Result<String, AddressError> {
    if row == 0 {
        return Err(AddressError::NonPositive(row));
    }
    Ok(format!("{}{}", to_letters(column)?, row))
}

/// Parse a single `B3` segment into a 1-based position.
///
/// The maximal leading run of letters is the column, the rest must be a
/// positive integer. Letters are matched case-insensitively.
pub fn parse_position(notation: &str) -> Result<Position, AddressError> {
    let trimmed = notation.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(trimmed.len());

    let (letters, digits) = trimmed.split_at(split);
    let numeric = !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit());
    if letters.is_empty() || !numeric {
        return Err(AddressError::InvalidPosition(notation.to_string()));
    }

    let column = to_number(&letters.to_ascii_uppercase())?;
    let row = digits
        .parse::<usize>()
        .map_err(|_| AddressError::InvalidPosition(notation.to_string()))?;
    if row == 0 {
        return Err(AddressError::InvalidPosition(notation.to_string()));
    }

    Ok(Position::new(column, row))
}

/// Parse a dotted path such as `B3.A1` into its segments, outermost first.
pub fn parse_path(path: &str) -> Result<Vec<Position>, AddressError> {
    if path.trim().is_empty() {
        return Err(AddressError::InvalidPosition(path.to_string()));
    }
    path.split(PATH_SEPARATOR).map(parse_position).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_letters() {
        assert_eq!(to_letters(1).unwrap(), "A");
        assert_eq!(to_letters(2).unwrap(), "B");
        assert_eq!(to_letters(26).unwrap(), "Z");
        assert_eq!(to_letters(27).unwrap(), "AA");
        assert_eq!(to_letters(52).unwrap(), "AZ");
        assert_eq!(to_letters(53).unwrap(), "BA");
        assert_eq!(to_letters(702).unwrap(), "ZZ");
        assert_eq!(to_letters(703).unwrap(), "AAA");
        assert!(to_letters(0).is_err());
    }

    #[test]
    fn test_to_number() {
        assert_eq!(to_number("A").unwrap(), 1);
        assert_eq!(to_number("Z").unwrap(), 26);
        assert_eq!(to_number("AA").unwrap(), 27);
        assert_eq!(to_number("ZZ").unwrap(), 702);
        assert_eq!(to_number("AAA").unwrap(), 703);
        assert!(to_number("").is_err());
        assert!(to_number("a").is_err());
        assert!(to_number("A1").is_err());
    }

    #[test]
    fn test_parse_position() {
        assert_eq!(parse_position("B3").unwrap(), Position::new(2, 3));
        assert_eq!(parse_position("aa10").unwrap(), Position::new(27, 10));
        assert!(parse_position("").is_err());
        assert!(parse_position("B").is_err());
        assert!(parse_position("3").is_err());
        assert!(parse_position("B0").is_err());
        assert!(parse_position("B3x").is_err());
    }

    #[test]
    fn test_parse_path() {
        let path = parse_path("B3.A1").unwrap();
        assert_eq!(path, vec![Position::new(2, 3), Position::new(1, 1)]);
        assert!(parse_path("B3.").is_err());
        assert!(parse_path("").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Position::new(2, 3).to_string(), "B3");
        assert_eq!("C12".parse::<Position>().unwrap(), Position::new(3, 12));
    }
}
