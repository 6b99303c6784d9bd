//! Lexicographic rank keys for ordering issues inside a status column.
//!
//! A rank is a string over `0-9a-z`. Plain string comparison of two ranks gives
//! their display order, so creating or moving an issue only ever writes that
//! issue's own rank. Ranks never end in `0`; that keeps a free slot between any
//! two distinct ranks.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

const BASE: u8 = 36;
const INITIAL: &str = "a3c";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RankError {
    #[error("rank is empty")]
    Empty,

    #[error("invalid character {ch:?} at position {position}")]
    InvalidChar { ch: char, position: usize },

    #[error("rank {0:?} ends with '0'")]
    TrailingZero(String),

    #[error("no rank fits between {lower} and {upper}")]
    OutOfOrder { lower: String, upper: String },
}

/// An opaque, sortable position key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rank(String);

/// The rank handed to the first issue of an empty column.
pub fn initial() -> Rank {
    Rank(INITIAL.to_string())
}

/// Increment a raw rank string.
///
/// Ranks only ever come out of this module, so a malformed value here is a bug
/// in the caller and aborts instead of returning an error.
pub fn increment(raw: &str) -> Rank {
    match Rank::parse(raw) {
        Ok(rank) => rank.increment(),
        Err(e) => panic!("cannot increment malformed rank {raw:?}: {e}"),
    }
}

/// Compute a rank strictly between two neighbours. `None` means the open end
/// of the column.
pub fn between(lower: Option<&Rank>, upper: Option<&Rank>) -> Result<Rank, RankError> {
    if let (Some(lower), Some(upper)) = (lower, upper) {
        if lower >= upper {
            return Err(RankError::OutOfOrder {
                lower: lower.to_string(),
                upper: upper.to_string(),
            });
        }
    }

    let lower_digits = lower.map(Rank::digits).unwrap_or_default();
    let upper_digits = upper.map(Rank::digits);
    let digits = midpoint(&lower_digits, upper_digits.as_deref());

    Ok(Rank::from_digits(&digits))
}

impl Rank {
    pub fn parse(raw: &str) -> Result<Self, RankError> {
        if raw.is_empty() {
            return Err(RankError::Empty);
        }

        for (position, ch) in raw.chars().enumerate() {
            if !matches!(ch, '0'..='9' | 'a'..='z') {
                return Err(RankError::InvalidChar { ch, position });
            }
        }

        if raw.ends_with('0') {
            return Err(RankError::TrailingZero(raw.to_string()));
        }

        Ok(Self(raw.to_string()))
    }

    /// The rank after the last one in a column, or [`initial`] for an empty
    /// column.
    pub fn after(last: Option<&Rank>) -> Rank {
        last.map(Rank::increment).unwrap_or_else(initial)
    }

    /// Add one in base 36. Carried-out trailing zeros are dropped; an all-`z`
    /// rank grows by one digit instead of wrapping.
    pub fn increment(&self) -> Rank {
        let mut digits = self.digits();

        for i in (0..digits.len()).rev() {
            if digits[i] + 1 < BASE {
                digits[i] += 1;
                digits.truncate(i + 1);
                return Rank::from_digits(&digits);
            }
            digits[i] = 0;
        }

        let mut extended = self.0.clone();
        extended.push('1');
        Rank(extended)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn digits(&self) -> Vec<u8> {
        self.0.bytes().map(digit_value).collect()
    }

    fn from_digits(digits: &[u8]) -> Rank {
        Rank(digits.iter().map(|&d| digit_char(d)).collect())
    }
}

fn digit_value(byte: u8) -> u8 {
    match byte {
        b'0'..=b'9' => byte - b'0',
        _ => byte - b'a' + 10,
    }
}

fn digit_char(value: u8) -> char {
    if value < 10 {
        (b'0' + value) as char
    } else {
        (b'a' + value - 10) as char
    }
}

/// Fractional midpoint of two digit strings. `lower` is padded with zeros,
/// a missing `upper` stands for one past the largest key.
fn midpoint(lower: &[u8], upper: Option<&[u8]>) -> Vec<u8> {
    if let Some(upper) = upper {
        let shared = upper
            .iter()
            .enumerate()
            .take_while(|(i, d)| lower.get(*i).copied().unwrap_or(0) == **d)
            .count();

        if shared > 0 {
            let mut out = upper[..shared].to_vec();
            out.extend(midpoint(
                lower.get(shared..).unwrap_or(&[]),
                Some(&upper[shared..]),
            ));
            return out;
        }
    }

    let low = lower.first().copied().unwrap_or(0);
    let high = upper.and_then(|u| u.first().copied()).unwrap_or(BASE);

    if high.saturating_sub(low) > 1 {
        return vec![(low + high) / 2];
    }

    match upper {
        Some(upper) if upper.len() > 1 => vec![upper[0]],
        _ => {
            let mut out = vec![low];
            out.extend(midpoint(lower.get(1..).unwrap_or(&[]), None));
            out
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Rank {
    type Err = RankError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rank::parse(s)
    }
}

impl AsRef<str> for Rank {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for Rank {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Rank {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Rank::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rank(raw: &str) -> Rank {
        Rank::parse(raw).unwrap()
    }

    #[test]
    fn initial_then_increments_match_seed_ranks() {
        let first = initial();
        let second = first.increment();
        let third = second.increment();

        assert_eq!(first.as_str(), "a3c");
        assert_eq!(second.as_str(), "a3d");
        assert_eq!(third.as_str(), "a3e");
        assert!(first < second && second < third);
    }

    #[test]
    fn increment_carries_and_drops_trailing_zeros() {
        assert_eq!(rank("a3z").increment().as_str(), "a4");
        assert_eq!(rank("azz").increment().as_str(), "b");
        assert_eq!(rank("a9").increment().as_str(), "aa");
    }

    #[test]
    fn increment_grows_when_every_digit_overflows() {
        assert_eq!(rank("z").increment().as_str(), "z1");
        assert_eq!(rank("zzz").increment().as_str(), "zzz1");
        assert!(rank("zzz").increment() > rank("zzz"));
    }

    #[test]
    fn repeated_increments_are_strictly_increasing() {
        let mut current = initial();
        let mut issued = vec![current.clone()];
        let mut grew = false;

        for _ in 0..5_000 {
            let next = current.increment();
            assert!(next > current, "{next} should sort after {current}");
            grew |= next.as_str().len() > current.as_str().len();
            issued.push(next.clone());
            current = next;
        }

        assert!(grew, "5000 increments from a3c should reach length growth");
        let mut sorted = issued.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted, issued);
    }

    #[test]
    fn increment_of_larger_rank_is_not_bounded_by_neighbour() {
        let low = rank("a3z");
        let high = rank("a4");
        assert!(low < high);
        assert!(low.increment() >= high);
    }

    #[test]
    fn parse_rejects_malformed_values() {
        assert_eq!(Rank::parse(""), Err(RankError::Empty));
        assert_eq!(
            Rank::parse("a3C"),
            Err(RankError::InvalidChar { ch: 'C', position: 2 })
        );
        assert_eq!(
            Rank::parse("a30"),
            Err(RankError::TrailingZero("a30".to_string()))
        );
        assert!(Rank::parse("0001").is_ok());
    }

    #[test]
    #[should_panic(expected = "malformed rank")]
    fn increment_of_malformed_string_panics() {
        increment("not a rank");
    }

    #[test]
    fn raw_increment_accepts_valid_strings() {
        assert_eq!(increment("a3c").as_str(), "a3d");
    }

    #[test]
    fn between_adjacent_ranks_extends_precision() {
        let lower = rank("a3c");
        let upper = rank("a3d");
        let mid = between(Some(&lower), Some(&upper)).unwrap();

        assert_eq!(mid.as_str(), "a3ci");
        assert!(lower < mid && mid < upper);
    }

    #[test]
    fn between_open_ends() {
        let anchor = rank("a3c");

        let before = between(None, Some(&anchor)).unwrap();
        let after = between(Some(&anchor), None).unwrap();
        let alone = between(None, None).unwrap();

        assert!(before < anchor);
        assert!(after > anchor);
        assert_eq!(alone.as_str(), "i");
    }

    #[test]
    fn between_handles_leading_zeros() {
        let upper = rank("0001");
        let mid = between(None, Some(&upper)).unwrap();
        assert!(mid < upper);
        assert!(!mid.as_str().ends_with('0'));
    }

    #[test]
    fn between_prefix_neighbours() {
        let lower = rank("a4");
        let upper = rank("a4z1");
        let mid = between(Some(&lower), Some(&upper)).unwrap();
        assert!(lower < mid && mid < upper, "{lower} < {mid} < {upper}");
    }

    #[test]
    fn repeated_insertion_at_same_gap_never_collides() {
        let lower = rank("a3c");
        let mut upper = rank("a3d");

        for _ in 0..200 {
            let mid = between(Some(&lower), Some(&upper)).unwrap();
            assert!(lower < mid && mid < upper);
            assert!(!mid.as_str().ends_with('0'));
            upper = mid;
        }
    }

    #[test]
    fn between_rejects_out_of_order_bounds() {
        let a = rank("b");
        let b = rank("a");
        assert!(matches!(
            between(Some(&a), Some(&b)),
            Err(RankError::OutOfOrder { .. })
        ));
        assert!(between(Some(&a), Some(&a)).is_err());
    }

    #[test]
    fn serde_rejects_malformed_ranks() {
        let parsed: Rank = serde_json::from_str("\"a3c\"").unwrap();
        assert_eq!(parsed, initial());
        assert!(serde_json::from_str::<Rank>("\"A\"").is_err());
    }
}
