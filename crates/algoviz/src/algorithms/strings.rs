//! Substring search.

use super::{check_len, Algorithm, Trace};
use crate::error::Result;
use crate::store::LineRange;

use serde::{Deserialize, Serialize};

const MAX_TEXT: usize = 256;
const MAX_PATTERN: usize = 64;

const DEMO_TEXT: &str = "ABABDABACDABABCABAB";
const DEMO_PATTERN: &str = "ABABCABAB";

fn validate_search(text: &str, pattern: &str) -> Result<()> {
    check_len("text", text.chars().count(), 0, MAX_TEXT)?;
    check_len("pattern", pattern.chars().count(), 1, MAX_PATTERN)
}

fn summarize(matches: &[usize]) -> String {
    if matches.is_empty() {
        "No matches".to_string()
    } else {
        format!("Matches at {:?}", matches)
    }
}

/// Knuth-Morris-Pratt search using a failure table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnuthMorrisPratt {
    pub text: String,
    pub pattern: String,
}

impl Default for KnuthMorrisPratt {
    fn default() -> Self {
        Self {
            text: DEMO_TEXT.to_string(),
            pattern: DEMO_PATTERN.to_string(),
        }
    }
}

const KMP: &str = "\
f = failure table of p
j = 0
for i in 0..len(text):
    while j > 0 and text[i] != p[j]: j = f[j - 1]
    if text[i] == p[j]: j = j + 1
    if j == len(p):
        report match at i - len(p) + 1; j = f[j - 1]";

/// `f[i]` is the length of the longest proper prefix of `p[..=i]` that is
/// also its suffix.
fn failure_table(p: &[char]) -> Vec<usize> {
    let mut f = vec![0; p.len()];
    let mut k = 0;
    for i in 1..p.len() {
        while k > 0 && p[i] != p[k] {
            k = f[k - 1];
        }
        if p[i] == p[k] {
            k += 1;
        }
        f[i] = k;
    }
    f
}

impl Algorithm for KnuthMorrisPratt {
    fn source(&self) -> &'static str {
        KMP
    }

    fn validate(&self) -> Result<()> {
        validate_search(&self.text, &self.pattern)
    }

    fn trace(&self) -> Trace {
        let text: Vec<char> = self.text.chars().collect();
        let p: Vec<char> = self.pattern.chars().collect();
        let f = failure_table(&p);
        let mut t = Trace::new();
        let mut matches = Vec::new();

        t.at(1, format!("Failure table: {:?}", f));
        let mut j = 0;
        for (i, &c) in text.iter().enumerate() {
            while j > 0 && c != p[j] {
                let fallback = f[j - 1];
                t.at(
                    4,
                    format!("'{}' != '{}' at text[{}]: fall back to j = {}", c, p[j], i, fallback),
                );
                j = fallback;
            }
            if c == p[j] {
                t.at(5, format!("text[{}] = '{}' matches p[{}]", i, c, j));
                j += 1;
            }
            if j == p.len() {
                let start = i + 1 - p.len();
                matches.push(start);
                t.span(LineRange::new(6, 7), format!("Match at index {}", start));
                j = f[j - 1];
            }
        }

        t.note(summarize(&matches));
        t
    }
}

/// Rabin-Karp search with a rolling hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RabinKarp {
    pub text: String,
    pub pattern: String,
}

impl Default for RabinKarp {
    fn default() -> Self {
        Self {
            text: DEMO_TEXT.to_string(),
            pattern: DEMO_PATTERN.to_string(),
        }
    }
}

const BASE: u64 = 256;
const MODULUS: u64 = 101;

const RABIN_KARP: &str = "\
h = base^(m - 1) mod q
compute hash(p) and hash(text[0..m])
for s in 0..=n - m:
    if hash(p) == hash(window):
        if text[s..s + m] == p: report match at s
    if s < n - m:
        window = (base * (window - text[s] * h) + text[s + m]) mod q";

fn hash(chars: &[char]) -> u64 {
    chars
        .iter()
        .fold(0, |acc, &c| (acc * BASE + c as u64) % MODULUS)
}

impl Algorithm for RabinKarp {
    fn source(&self) -> &'static str {
        RABIN_KARP
    }

    fn validate(&self) -> Result<()> {
        validate_search(&self.text, &self.pattern)
    }

    fn trace(&self) -> Trace {
        let text: Vec<char> = self.text.chars().collect();
        let p: Vec<char> = self.pattern.chars().collect();
        let (n, m) = (text.len(), p.len());
        let mut t = Trace::new();
        let mut matches = Vec::new();

        if m > n {
            t.note(format!("Pattern longer than text ({} > {})", m, n));
            t.note(summarize(&matches));
            return t;
        }

        let h = (1..m).fold(1, |acc, _| acc * BASE % MODULUS);
        t.at(1, format!("h = {}", h));
        let target = hash(&p);
        let mut window = hash(&text[..m]);
        t.at(2, format!("hash(p) = {}, first window hash = {}", target, window));

        for s in 0..=n - m {
            let shown: String = text[s..s + m].iter().collect();
            t.at(3, format!("Window {} \"{}\": hash {}", s, shown, window));
            if window == target {
                if text[s..s + m] == p[..] {
                    matches.push(s);
                    t.span(LineRange::new(4, 5), format!("Match at index {}", s));
                } else {
                    t.span(LineRange::new(4, 5), format!("Spurious hit at index {}", s));
                }
            }
            if s < n - m {
                let dropped = text[s] as u64 * h % MODULUS;
                window = ((window + MODULUS - dropped) * BASE + text[s + m] as u64) % MODULUS;
                t.span(LineRange::new(6, 7), format!("Roll past '{}': hash {}", text[s], window));
            }
        }

        t.note(summarize(&matches));
        t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kmp(text: &str, pattern: &str) -> Trace {
        KnuthMorrisPratt {
            text: text.to_string(),
            pattern: pattern.to_string(),
        }
        .trace()
    }

    fn rabin_karp(text: &str, pattern: &str) -> Trace {
        RabinKarp {
            text: text.to_string(),
            pattern: pattern.to_string(),
        }
        .trace()
    }

    #[test]
    fn test_failure_table() {
        let p: Vec<char> = "ABABCABAB".chars().collect();
        assert_eq!(failure_table(&p), vec![0, 0, 1, 2, 0, 1, 2, 3, 4]);
        let p: Vec<char> = "AAAA".chars().collect();
        assert_eq!(failure_table(&p), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_demo_match() {
        assert_eq!(
            KnuthMorrisPratt::default().trace().last_message(),
            Some("Matches at [10]")
        );
        assert_eq!(RabinKarp::default().trace().last_message(), Some("Matches at [10]"));
    }

    #[test]
    fn test_overlapping_matches() {
        assert_eq!(kmp("AAAAA", "AA").last_message(), Some("Matches at [0, 1, 2, 3]"));
        assert_eq!(
            rabin_karp("AAAAA", "AA").last_message(),
            Some("Matches at [0, 1, 2, 3]")
        );
    }

    #[test]
    fn test_no_match() {
        assert_eq!(kmp("hello", "xyz").last_message(), Some("No matches"));
        assert_eq!(rabin_karp("hello", "xyz").last_message(), Some("No matches"));
        assert_eq!(rabin_karp("ab", "abc").last_message(), Some("No matches"));
    }

    #[test]
    fn test_both_agree() {
        let cases = [
            ("abracadabra", "abra"),
            ("mississippi", "issi"),
            ("ünïcödé ünï", "ünï"),
        ];
        for (text, pattern) in cases {
            assert_eq!(
                kmp(text, pattern).last_message(),
                rabin_karp(text, pattern).last_message()
            );
        }
    }

    #[test]
    fn test_empty_pattern_rejected() {
        let search = KnuthMorrisPratt {
            text: "abc".to_string(),
            pattern: String::new(),
        };
        assert!(search.validate().is_err());
        let search = RabinKarp {
            text: "a".repeat(MAX_TEXT + 1),
            pattern: "a".to_string(),
        };
        assert!(search.validate().is_err());
    }
}
