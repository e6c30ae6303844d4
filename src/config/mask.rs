//! Mask index expressions: free text such as `"1, 3-5，8"` selecting 1-based cell numbers.
//!
//! Grammar: tokens are separated by `,`, `，`, `、` or whitespace. A token is an integer or a
//! range `A-B` where the separator is one of `-`, `—`, `–`, `~`. Ranges expand inclusively in
//! either direction. Tokens that fail to parse are skipped; parsing never fails.

use std::fmt;
use std::str::FromStr;

const TOKEN_SEPARATORS: [char; 3] = [',', '，', '、'];
const RANGE_SEPARATORS: [char; 4] = ['-', '—', '–', '~'];

/// Set of 1-based global cell numbers targeted for redaction.
///
/// Stored as sorted, disjoint, non-adjacent inclusive ranges so that wide ranges such as
/// `1-4000000000` stay cheap.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct MaskIndexSet {
    ranges: Vec<(u32, u32)>,
}

impl MaskIndexSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a mask expression. Malformed tokens are dropped.
    pub fn parse(expr: &str) -> Self {
        let mut ranges = Vec::new();
        let tokens = expr
            .split(|c: char| c.is_whitespace() || TOKEN_SEPARATORS.contains(&c))
            .filter(|t| !t.is_empty());
        for token in tokens {
            if let Some(r) = parse_token(token) {
                ranges.push(r);
            }
        }
        Self::from_ranges(ranges)
    }

    fn from_ranges(mut ranges: Vec<(u32, u32)>) -> Self {
        ranges.sort_unstable();
        let mut merged: Vec<(u32, u32)> = Vec::with_capacity(ranges.len());
        for (lo, hi) in ranges {
            match merged.last_mut() {
                Some(last) if lo <= last.1.saturating_add(1) => last.1 = last.1.max(hi),
                _ => merged.push((lo, hi)),
            }
        }
        Self { ranges: merged }
    }

    /// Return `true` if `number` is targeted.
    pub fn contains(&self, number: u32) -> bool {
        let idx = self.ranges.partition_point(|&(_, hi)| hi < number);
        self.ranges
            .get(idx)
            .is_some_and(|&(lo, hi)| lo <= number && number <= hi)
    }

    /// Number of targeted cell numbers.
    pub fn len(&self) -> u64 {
        self.ranges
            .iter()
            .map(|&(lo, hi)| u64::from(hi - lo) + 1)
            .sum()
    }

    /// Return `true` when nothing is targeted.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Iterate targeted numbers in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.ranges.iter().flat_map(|&(lo, hi)| lo..=hi)
    }

    /// Canonical expression: ascending, comma separated, runs of three or more collapsed to `A-B`.
    pub fn to_expression(&self) -> String {
        let mut parts = Vec::with_capacity(self.ranges.len());
        for &(lo, hi) in &self.ranges {
            match hi - lo {
                0 => parts.push(lo.to_string()),
                1 => {
                    parts.push(lo.to_string());
                    parts.push(hi.to_string());
                }
                _ => parts.push(format!("{lo}-{hi}")),
            }
        }
        parts.join(",")
    }
}

fn parse_token(token: &str) -> Option<(u32, u32)> {
    match token.split_once(|c: char| RANGE_SEPARATORS.contains(&c)) {
        Some((a, b)) => {
            let a = a.trim().parse::<u32>().ok()?;
            let b = b.trim().parse::<u32>().ok()?;
            Some((a.min(b), a.max(b)))
        }
        None => {
            let n = token.trim().parse::<u32>().ok()?;
            Some((n, n))
        }
    }
}

impl FromStr for MaskIndexSet {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for MaskIndexSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_expression())
    }
}

impl FromIterator<u32> for MaskIndexSet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self::from_ranges(iter.into_iter().map(|n| (n, n)).collect())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/config/mask.rs"]
mod tests;
