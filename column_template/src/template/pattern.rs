//! Regex compilation and replacement expansion for `regex` and `replace`
//! template nodes
//!
//! Flags and replacement syntax follow the conventions extension authors
//! write templates in: `g` replaces every match (otherwise only the first),
//! and replacements understand `$$`, `$&`, `` $` ``, `$'`, `$n`/`$nn` and
//! `$<name>`.

use super::error::TemplateError;
use fancy_regex::{Captures, Regex};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegexFlags {
    pub global: bool,
    pub ignore_case: bool,
    pub multi_line: bool,
    pub dot_all: bool,
}

impl RegexFlags {
    pub fn parse(flags: &str) -> Result<Self, TemplateError> {
        let mut parsed = Self::default();
        let mut seen = Vec::new();

        for flag in flags.chars() {
            let unsupported = || TemplateError::UnsupportedFlag {
                flags: flags.to_string(),
                flag,
            };
            if seen.contains(&flag) {
                return Err(unsupported());
            }
            seen.push(flag);

            match flag {
                'g' => parsed.global = true,
                'i' => parsed.ignore_case = true,
                'm' => parsed.multi_line = true,
                's' => parsed.dot_all = true,
                // Unicode matching is always on
                'u' => {}
                _ => return Err(unsupported()),
            }
        }

        Ok(parsed)
    }

    /// Inline group switching on the matching-mode flags, e.g. `(?is)`
    fn inline_prefix(&self) -> String {
        let mut modes = String::new();
        if self.ignore_case {
            modes.push('i');
        }
        if self.multi_line {
            modes.push('m');
        }
        if self.dot_all {
            modes.push('s');
        }
        if modes.is_empty() {
            modes
        } else {
            format!("(?{})", modes)
        }
    }
}

/// A pattern compiled with backtracking support, so look-around and
/// backreferences work the way template authors expect
#[derive(Debug)]
pub struct CompiledPattern {
    pattern: String,
    regex: Regex,
    flags: RegexFlags,
    has_named_groups: bool,
}

impl CompiledPattern {
    pub fn compile(pattern: &str, flags: &str) -> Result<Self, TemplateError> {
        let flags = RegexFlags::parse(flags)?;
        let source = format!("{}{}", flags.inline_prefix(), pattern);
        let regex = Regex::new(&source).map_err(|err| TemplateError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: err.to_string(),
        })?;
        let has_named_groups = regex.capture_names().flatten().next().is_some();

        Ok(Self {
            pattern: pattern.to_string(),
            regex,
            flags,
            has_named_groups,
        })
    }

    /// Replace the first match, or every match for global patterns
    ///
    /// Fails only when matching itself gives up (backtracking limit).
    pub fn replace(&self, input: &str, replacement: &str) -> Result<String, TemplateError> {
        let limit = if self.flags.global { usize::MAX } else { 1 };
        let mut out = String::with_capacity(input.len());
        let mut last = 0;

        for caps in self.regex.captures_iter(input).take(limit) {
            let caps = caps.map_err(|err| TemplateError::MatchFailed {
                pattern: self.pattern.clone(),
                reason: err.to_string(),
            })?;
            let Some(whole) = caps.get(0) else {
                continue;
            };
            out.push_str(&input[last..whole.start()]);
            Substitution {
                input,
                start: whole.start(),
                end: whole.end(),
                groups: Some(&caps),
                named_groups: self.has_named_groups,
            }
            .expand(replacement, &mut out);
            last = whole.end();
        }

        out.push_str(&input[last..]);
        Ok(out)
    }
}

/// Replace occurrences of a plain-text `target`
///
/// The target is never a pattern, but the replacement still understands
/// `$$`, `$&`, `` $` `` and `$'`. Group references stay literal.
pub fn replace_literal(input: &str, target: &str, replacement: &str, all: bool) -> String {
    let limit = if all { usize::MAX } else { 1 };
    let mut out = String::with_capacity(input.len());
    let mut last = 0;

    for (start, matched) in input.match_indices(target).take(limit) {
        out.push_str(&input[last..start]);
        Substitution {
            input,
            start,
            end: start + matched.len(),
            groups: None,
            named_groups: false,
        }
        .expand(replacement, &mut out);
        last = start + matched.len();
    }

    out.push_str(&input[last..]);
    out
}

/// One match being substituted into a replacement string
struct Substitution<'c, 't> {
    input: &'t str,
    start: usize,
    end: usize,
    groups: Option<&'c Captures<'t>>,
    named_groups: bool,
}

impl Substitution<'_, '_> {
    fn expand(&self, replacement: &str, out: &mut String) {
        let bytes = replacement.as_bytes();
        let mut literal_start = 0;
        let mut i = 0;

        while i < bytes.len() {
            if bytes[i] == b'$' {
                let mut piece = String::new();
                let consumed = self.substitute(&replacement[i + 1..], &mut piece);
                if consumed > 0 {
                    out.push_str(&replacement[literal_start..i]);
                    out.push_str(&piece);
                    i += 1 + consumed;
                    literal_start = i;
                    continue;
                }
            }
            i += 1;
        }

        out.push_str(&replacement[literal_start..]);
    }

    /// Expand one `$` sequence; returns how many bytes after the `$` it used,
    /// or 0 when the `$` is literal
    fn substitute(&self, rest: &str, out: &mut String) -> usize {
        let bytes = rest.as_bytes();
        let group_count = self.groups.map_or(0, |caps| caps.len().saturating_sub(1));

        match bytes.first() {
            Some(b'$') => {
                out.push('$');
                1
            }
            Some(b'&') => {
                out.push_str(&self.input[self.start..self.end]);
                1
            }
            Some(b'`') => {
                out.push_str(&self.input[..self.start]);
                1
            }
            Some(b'\'') => {
                out.push_str(&self.input[self.end..]);
                1
            }
            Some(first) if first.is_ascii_digit() => {
                let Some(caps) = self.groups else {
                    return 0;
                };
                let one = (first - b'0') as usize;
                let two = bytes
                    .get(1)
                    .filter(|b| b.is_ascii_digit())
                    .map(|second| one * 10 + (second - b'0') as usize);

                let (group, consumed) = match two {
                    Some(n) if (1..=group_count).contains(&n) => (n, 2),
                    _ if (1..=group_count).contains(&one) => (one, 1),
                    _ => return 0,
                };
                if let Some(m) = caps.get(group) {
                    out.push_str(m.as_str());
                }
                consumed
            }
            Some(b'<') if self.named_groups => {
                let (Some(caps), Some(close)) = (self.groups, rest.find('>')) else {
                    return 0;
                };
                if let Some(m) = caps.name(&rest[1..close]) {
                    out.push_str(m.as_str());
                }
                close + 1
            }
            _ => 0,
        }
    }
}

/// Per-template memo of compiled patterns, including compile failures
#[derive(Debug, Default)]
pub struct PatternCache {
    entries: RefCell<HashMap<(String, String), Result<Rc<CompiledPattern>, TemplateError>>>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, pattern: &str, flags: &str) -> Result<Rc<CompiledPattern>, TemplateError> {
        let key = (pattern.to_string(), flags.to_string());
        if let Some(entry) = self.entries.borrow().get(&key) {
            return entry.clone();
        }

        let entry = CompiledPattern::compile(pattern, flags).map(Rc::new);
        self.entries.borrow_mut().insert(key, entry.clone());
        entry
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replace(input: &str, pattern: &str, flags: &str, replacement: &str) -> String {
        CompiledPattern::compile(pattern, flags)
            .unwrap()
            .replace(input, replacement)
            .unwrap()
    }

    #[test]
    fn test_greedy_first_match_only() {
        assert_eq!(
            replace("Jane Doe <jane@example.com>", ".*@", "", ""),
            "example.com>"
        );
        assert_eq!(replace("a1b2c3", "[0-9]", "", "#"), "a#b2c3");
    }

    #[test]
    fn test_global_flag() {
        assert_eq!(replace("a1b2c3", "[0-9]", "g", "#"), "a#b#c#");
    }

    #[test]
    fn test_case_insensitive_flag() {
        assert_eq!(replace("Re: RE: hello", "re: ", "gi", ""), "hello");
    }

    #[test]
    fn test_numbered_groups() {
        assert_eq!(
            replace("Doe, Jane", "(\\w+), (\\w+)", "", "$2 $1"),
            "Jane Doe"
        );
        // Group 3 does not exist and stays literal
        assert_eq!(replace("ab", "(a)(b)", "", "$3$1"), "$3a");
        // Two-digit form falls back to one digit followed by a literal
        assert_eq!(replace("ab", "(a)(b)", "", "$10"), "a0");
    }

    #[test]
    fn test_special_sequences() {
        assert_eq!(replace("xay", "a", "", "[$&]"), "x[a]y");
        assert_eq!(replace("xay", "a", "", "$`"), "xxy");
        assert_eq!(replace("xay", "a", "", "$'"), "xyy");
        assert_eq!(replace("xay", "a", "", "$$"), "x$y");
        assert_eq!(replace("xay", "a", "", "$"), "x$y");
    }

    #[test]
    fn test_named_groups() {
        assert_eq!(
            replace("jane@example.com", "(?P<user>[^@]+)@(?P<host>.+)", "", "$<host>/$<user>"),
            "example.com/jane"
        );
        // Without named groups `$<` is literal
        assert_eq!(replace("a", "a", "", "$<x>"), "$<x>");
    }

    #[test]
    fn test_unmatched_group_expands_empty() {
        assert_eq!(replace("b", "(a)?b", "", "[$1]"), "[]");
    }

    #[test]
    fn test_multi_line_and_dot_all_flags() {
        assert_eq!(replace("a\nb", "^b", "m", "B"), "a\nB");
        assert_eq!(replace("a\nb", "^b", "", "B"), "a\nb");
        assert_eq!(replace("a\nb", "a.b", "s", "-"), "-");
    }

    #[test]
    fn test_look_around() {
        assert_eq!(
            replace("Jane <jane@example.com>", "(?<=<)[^@]+@", "", ""),
            "Jane <example.com>"
        );
        assert_eq!(replace("user@host", "^.*@(?=[a-z])", "", ""), "host");
        assert_eq!(replace("a1b2", "[a-z](?![0-9])", "g", "_"), "a1b2");
        assert_eq!(replace("price 10 USD", "\\d+(?= USD)", "", "$&.00"), "price 10.00 USD");
    }

    #[test]
    fn test_backreferences() {
        assert_eq!(replace("aab", "(a)\\1", "", "x"), "xb");
        assert_eq!(replace("hello hello world", "\\b(\\w+) \\1\\b", "g", "$1"), "hello world");
    }

    #[test]
    fn test_named_group_angle_syntax() {
        assert_eq!(
            replace("jane@example.com", "(?<user>[^@]+)@(?<host>.+)", "", "$<user> at $<host>"),
            "jane at example.com"
        );
    }

    #[test]
    fn test_literal_replace_expands_specials() {
        assert_eq!(replace_literal("price: 5", "5", "$$5", false), "price: $5");
        assert_eq!(replace_literal("a-b", "-", "[$&]", true), "a[-]b");
        assert_eq!(replace_literal("xay", "a", "$`|$'", false), "xx|yy");
        // No groups in a plain-text target
        assert_eq!(replace_literal("a.b", ".", "$1", true), "a$1b");
        assert_eq!(replace_literal("a.b.c", ".", "_", false), "a_b.c");
        assert_eq!(replace_literal("abc", "z", "$&", true), "abc");
    }

    #[test]
    fn test_flag_errors() {
        assert!(matches!(
            RegexFlags::parse("gy"),
            Err(TemplateError::UnsupportedFlag { flag: 'y', .. })
        ));
        assert!(matches!(
            RegexFlags::parse("gg"),
            Err(TemplateError::UnsupportedFlag { flag: 'g', .. })
        ));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(matches!(
            CompiledPattern::compile("(unclosed", ""),
            Err(TemplateError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_cache_memoizes_failures() {
        let cache = PatternCache::new();
        assert!(cache.get("(", "").is_err());
        assert!(cache.get("(", "").is_err());
        assert!(cache.get("a", "g").is_ok());
        assert_eq!(cache.len(), 2);
    }
}
