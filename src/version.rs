//! Debian-policy version ordering.
//!
//! A version is `[epoch:]upstream[-revision]`. Comparison splits upstream and
//! revision into alternating runs of non-digits and digits: non-digit runs
//! compare by a modified lexicographic order where `~` sorts before the empty
//! string and letters sort before every other non-alphanumeric character;
//! digit runs compare as arbitrary-precision integers. The comparator is
//! self-contained so nothing here shells out to an external package manager.

use std::cmp::Ordering;
use std::fmt;

use crate::error::{Error, Result};

/// A parsed Debian package version with the policy total order.
///
/// The original string is kept verbatim for display and persistence;
/// equality is semantic (`1.0` equals `1.00`), so `Hash` is deliberately
/// not implemented.
#[derive(Debug, Clone)]
pub struct DebVersion {
    raw: String,
    epoch: u64,
    upstream: String,
    revision: String,
}

impl DebVersion {
    /// Parse and validate a version string.
    ///
    /// Accepted characters are alphanumerics plus `. + - ~`, with `:`
    /// permitted only as the epoch separator. Anything else is an
    /// `InvalidVersion` error.
    pub fn parse(s: &str) -> Result<Self> {
        let raw = s.trim();
        if raw.is_empty() {
            return Err(Error::invalid_version(s, "empty version string"));
        }
        if let Some(bad) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '+' | '-' | '~' | ':')))
        {
            return Err(Error::invalid_version(
                raw,
                format!("unexpected character {bad:?}"),
            ));
        }

        let (epoch, rest) = match raw.split_once(':') {
            Some((epoch, rest)) => {
                if epoch.is_empty() || !epoch.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(Error::invalid_version(raw, "epoch is not a number"));
                }
                let epoch = epoch
                    .parse::<u64>()
                    .map_err(|_| Error::invalid_version(raw, "epoch out of range"))?;
                (epoch, rest)
            }
            None => (0, raw),
        };
        if rest.contains(':') {
            return Err(Error::invalid_version(raw, "':' is only valid in an epoch"));
        }

        let (upstream, revision) = match rest.rsplit_once('-') {
            Some((upstream, revision)) => (upstream, revision),
            None => (rest, ""),
        };
        if upstream.is_empty() {
            return Err(Error::invalid_version(raw, "empty upstream version"));
        }

        Ok(DebVersion {
            raw: raw.to_string(),
            epoch,
            upstream: upstream.to_string(),
            revision: revision.to_string(),
        })
    }

    /// Three-way comparison per Debian policy: epoch first, then upstream,
    /// then revision (a missing revision compares as the empty string).
    pub fn compare(&self, other: &DebVersion) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| verrevcmp(&self.upstream, &other.upstream))
            .then_with(|| verrevcmp(&self.revision, &other.revision))
    }

    /// The verbatim string this version was parsed from.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for DebVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for DebVersion {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl Eq for DebVersion {}

impl PartialOrd for DebVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}

impl Ord for DebVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

/// Sort weight of a byte inside a non-digit run. End-of-string weighs 0, so
/// `~` (weight -1) sorts before nothing at all and every other character
/// after it. Letters keep their ASCII value; remaining punctuation is pushed
/// past the letters.
fn char_order(c: u8) -> i32 {
    match c {
        b'~' => -1,
        c if c.is_ascii_alphabetic() => i32::from(c),
        c => i32::from(c) + 256,
    }
}

/// Compare two upstream-or-revision strings by alternating non-digit and
/// digit runs.
fn verrevcmp(a: &str, b: &str) -> Ordering {
    let a = a.as_bytes();
    let b = b.as_bytes();
    let mut i = 0;
    let mut j = 0;

    while i < a.len() || j < b.len() {
        // Non-digit run, with end-of-string weighing 0.
        while (i < a.len() && !a[i].is_ascii_digit()) || (j < b.len() && !b[j].is_ascii_digit()) {
            let oa = if i < a.len() && !a[i].is_ascii_digit() {
                char_order(a[i])
            } else {
                0
            };
            let ob = if j < b.len() && !b[j].is_ascii_digit() {
                char_order(b[j])
            } else {
                0
            };
            if oa != ob {
                return oa.cmp(&ob);
            }
            i += 1;
            j += 1;
        }

        // Digit run: leading zeros are insignificant, then longer runs win,
        // then the first differing digit decides.
        while i < a.len() && a[i] == b'0' {
            i += 1;
        }
        while j < b.len() && b[j] == b'0' {
            j += 1;
        }
        let mut first_diff = Ordering::Equal;
        while i < a.len() && j < b.len() && a[i].is_ascii_digit() && b[j].is_ascii_digit() {
            if first_diff == Ordering::Equal {
                first_diff = a[i].cmp(&b[j]);
            }
            i += 1;
            j += 1;
        }
        if i < a.len() && a[i].is_ascii_digit() {
            return Ordering::Greater;
        }
        if j < b.len() && b[j].is_ascii_digit() {
            return Ordering::Less;
        }
        if first_diff != Ordering::Equal {
            return first_diff;
        }
    }

    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> DebVersion {
        DebVersion::parse(s).unwrap()
    }

    #[test]
    fn test_equal_versions() {
        assert_eq!(v("1.2.3"), v("1.2.3"));
        assert_eq!(v("1.0"), v("1.00"));
        assert_eq!(v("0:1.0"), v("1.0"));
    }

    #[test]
    fn test_simple_ordering() {
        assert!(v("5.4.3") < v("5.4.4"));
        assert!(v("5.4.4") > v("5.4.3"));
        assert!(v("1.0") < v("1.0.1"));
        assert!(v("2.10") > v("2.9"));
    }

    #[test]
    fn test_tilde_sorts_before_everything() {
        assert!(v("1.0~rc1") < v("1.0"));
        assert!(v("1.0~rc1") < v("1.0~rc2"));
        assert!(v("1.0~~") < v("1.0~"));
        assert!(v("1.0~") < v("1.0"));
    }

    #[test]
    fn test_letters_sort_before_other_punctuation() {
        assert!(v("1.0a") < v("1.0+"));
        assert!(v("1.0alpha") < v("1.0+git2026"));
    }

    #[test]
    fn test_epoch_outranks_upstream() {
        assert!(v("2:1.0") > v("1:1.9"));
        assert!(v("1:1.0") > v("1.9"));
        assert!(v("2:1.0") > v("1.9"));
    }

    #[test]
    fn test_revision_ordering() {
        assert!(v("1.0-1") < v("1.0-2"));
        assert!(v("1.0-1") > v("1.0"));
        assert!(v("1.0-1ubuntu1") > v("1.0-1"));
        // The last '-' splits the revision; earlier ones belong upstream.
        assert!(v("1.0-rc1-1") > v("1.0-rc1"));
    }

    #[test]
    fn test_digit_runs_compare_numerically() {
        assert!(v("1.09") < v("1.10"));
        assert_eq!(v("1.09"), v("1.9"));
        assert!(v("1.123456789012345678901") > v("1.99"));
    }

    #[test]
    fn test_comparison_is_antisymmetric() {
        let pairs = [
            ("1.0~rc1", "1.0"),
            ("2:1.0", "1.9"),
            ("1.0-1", "1.0-2"),
            ("1.0a", "1.0+"),
            ("5.4.3", "5.4.4"),
        ];
        for (a, b) in pairs {
            assert_eq!(v(a).compare(&v(b)), v(b).compare(&v(a)).reverse());
        }
    }

    #[test]
    fn test_comparison_is_transitive_on_a_chain() {
        let chain = ["1.0~~", "1.0~rc1", "1.0", "1.0-1", "1.0.1", "1.1", "1:0.1"];
        for pair in chain.windows(2) {
            assert!(v(pair[0]) < v(pair[1]), "{} < {}", pair[0], pair[1]);
        }
        // Spot-check the ends.
        assert!(v(chain[0]) < v(chain[chain.len() - 1]));
    }

    #[test]
    fn test_relations_map_onto_compare() {
        assert_eq!(v("1.0").compare(&v("1.0")), Ordering::Equal);
        assert_eq!(v("1.0").compare(&v("2.0")), Ordering::Less);
        assert_eq!(v("2.0").compare(&v("1.0")), Ordering::Greater);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(DebVersion::parse("").is_err());
        assert!(DebVersion::parse("   ").is_err());
        assert!(DebVersion::parse("1.0 beta").is_err());
        assert!(DebVersion::parse("1.0_1").is_err());
        assert!(DebVersion::parse("x:1.0").is_err());
        assert!(DebVersion::parse(":1.0").is_err());
        assert!(DebVersion::parse("1:2:3").is_err());
        assert!(DebVersion::parse("1:").is_err());
    }

    #[test]
    fn test_parse_keeps_raw_string() {
        assert_eq!(v("2:1.0-1").as_str(), "2:1.0-1");
        assert_eq!(v(" 1.0 ").as_str(), "1.0");
        assert_eq!(v("1.0~rc1").to_string(), "1.0~rc1");
    }

    #[test]
    fn test_invalid_version_error_names_the_input() {
        let err = DebVersion::parse("1.0 beta").unwrap_err();
        assert!(err.to_string().contains("1.0 beta"));
    }
}
