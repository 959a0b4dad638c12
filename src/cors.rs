//! Cross-origin allow-list.
//!
//! Entries are either exact origins (`https://example.com`) or shell-style
//! wildcard patterns (`https://*.example.com`). Wildcard entries that carry a
//! scheme are also tried against the origin with both schemes stripped.

use regex::Regex;
use tracing::{debug, warn};

pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:8080";

const SCHEME_SEPARATOR: &str = "://";

#[derive(Debug, Clone)]
struct OriginRule {
    entry: String,
    pattern: Option<Regex>,
    domain_pattern: Option<Regex>,
}

impl OriginRule {
    fn new(entry: &str) -> Self {
        let (pattern, domain_pattern) = if entry.contains('*') {
            let domain_pattern = entry
                .split_once(SCHEME_SEPARATOR)
                .and_then(|(_, domain)| compile(entry, domain));
            (compile(entry, entry), domain_pattern)
        } else {
            (None, None)
        };

        Self {
            entry: entry.to_string(),
            pattern,
            domain_pattern,
        }
    }

    fn matches(&self, origin: &str) -> bool {
        if origin == self.entry {
            return true;
        }
        if self.pattern.as_ref().is_some_and(|p| p.is_match(origin)) {
            return true;
        }
        match (&self.domain_pattern, origin.split_once(SCHEME_SEPARATOR)) {
            (Some(domain_pattern), Some((_, origin_domain))) => {
                domain_pattern.is_match(origin_domain)
            }
            _ => false,
        }
    }
}

/// Decides which request origins receive CORS headers
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    rules: Vec<OriginRule>,
}

impl OriginPolicy {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = entries
            .into_iter()
            .map(|e| e.as_ref().trim().to_string())
            .filter(|e| !e.is_empty())
            .map(|e| OriginRule::new(&e))
            .collect();
        Self { rules }
    }

    /// Comma-separated allow-list as found in `CORS_ORIGINS`.
    pub fn from_list(list: &str) -> Self {
        Self::new(list.split(','))
    }

    pub fn entries(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.entry.as_str()).collect()
    }

    pub fn is_allowed(&self, origin: Option<&str>) -> bool {
        let Some(origin) = origin.filter(|o| !o.is_empty()) else {
            return false;
        };
        let allowed = self.rules.iter().any(|rule| rule.matches(origin));
        debug!(origin = %origin, allowed, "Origin checked");
        allowed
    }
}

impl Default for OriginPolicy {
    fn default() -> Self {
        Self::new([DEFAULT_CORS_ORIGIN])
    }
}

fn compile(entry: &str, glob: &str) -> Option<Regex> {
    glob_to_regex(glob)
        .inspect_err(|e| warn!(entry = %entry, error = %e, "Unusable wildcard, matching exactly"))
        .ok()
}

/// Translate a shell glob (`*`, `?`, `[...]`, `[!...]`) into an anchored regex.
/// An unterminated `[` is taken literally.
fn glob_to_regex(glob: &str) -> Result<Regex, regex::Error> {
    let chars: Vec<char> = glob.chars().collect();
    let mut out = String::from("(?s)^");
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => match class_end(&chars, i) {
                Some(end) => {
                    let negated = chars.get(i + 1) == Some(&'!');
                    let start = if negated { i + 2 } else { i + 1 };
                    out.push('[');
                    if negated {
                        out.push('^');
                    }
                    out.push_str(&class_body(&chars[start..end], negated));
                    out.push(']');
                    i = end;
                }
                None => out.push_str("\\["),
            },
            c => out.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }
    out.push('$');

    Regex::new(&out)
}

/// Regex class body for the glob class members in `raw`. Every member is
/// literal except single `-` ranges, so regex class operators (`&&`, `--`,
/// `~~`) and nested `[` are escaped.
fn class_body(raw: &[char], negated: bool) -> String {
    let mut body = String::with_capacity(raw.len() * 2);
    for (k, &c) in raw.iter().enumerate() {
        let dash_run = c == '-'
            && ((k > 0 && raw[k - 1] == '-') || raw.get(k + 1) == Some(&'-'));
        match c {
            '\\' | '[' | '&' | '~' => {
                body.push('\\');
                body.push(c);
            }
            '-' if dash_run => body.push_str("\\-"),
            '^' if k == 0 && !negated => body.push_str("\\^"),
            _ => body.push(c),
        }
    }
    body
}

/// Index of the `]` closing the class opened at `start`, if any.
fn class_end(chars: &[char], start: usize) -> Option<usize> {
    let mut j = start + 1;
    if chars.get(j) == Some(&'!') {
        j += 1;
    }
    // A `]` right after the opening bracket is part of the class.
    if chars.get(j) == Some(&']') {
        j += 1;
    }
    while j < chars.len() {
        if chars[j] == ']' {
            return Some(j);
        }
        j += 1;
    }
    None
}
