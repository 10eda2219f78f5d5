//! Step selectors.
//!
//! A selector picks steps out of the registry. The string syntax is:
//!
//! | Form | Meaning |
//! |---|---|
//! | `install-node`, `0201`, `id:0201` | explicit id |
//! | `category:install` | every step in a category |
//! | `tag:git` | every step carrying a tag |
//! | `0200-0299`, `range:200..299` | inclusive numeric range |
//! | `git-*`, `02?1*` | id glob |
//!
//! Any selector may end with `?` to mark it optional, in which case
//! matching zero steps is not an error. A trailing `?` is always read as
//! the optional marker, never as a glob wildcard.

use regex::Regex;
use std::fmt;
use std::str::FromStr;

/// What a selector matches on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorKind {
    /// A single step by id.
    Id(String),
    /// All steps in a category.
    Category(String),
    /// All steps carrying a tag.
    Tag(String),
    /// Steps whose ordinal falls within `start..=end`.
    Range { start: u32, end: u32 },
    /// Steps whose id matches a glob.
    Pattern(String),
}

/// A parsed step selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    raw: String,
    kind: SelectorKind,
    optional: bool,
}

impl Selector {
    /// The text this selector was parsed from.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn kind(&self) -> &SelectorKind {
        &self.kind
    }

    /// Whether zero matches is acceptable.
    pub fn is_optional(&self) -> bool {
        self.optional
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl FromStr for Selector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let (body, optional) = match raw.strip_suffix('?') {
            Some(rest) => (rest.trim_end(), true),
            None => (raw, false),
        };

        if body.is_empty() {
            return Err("empty step selector".to_string());
        }

        let kind = if let Some(id) = body.strip_prefix("id:") {
            SelectorKind::Id(non_empty(id, "id")?)
        } else if let Some(category) = body.strip_prefix("category:") {
            SelectorKind::Category(non_empty(category, "category")?)
        } else if let Some(tag) = body.strip_prefix("tag:") {
            SelectorKind::Tag(non_empty(tag, "tag")?)
        } else if let Some(range) = body.strip_prefix("range:") {
            parse_range(range, "..").ok_or_else(|| format!("invalid range selector '{}'", raw))??
        } else if body.contains('*') || body.contains('?') {
            SelectorKind::Pattern(body.to_string())
        } else if let Some(range) = parse_range(body, "-") {
            range?
        } else {
            SelectorKind::Id(body.to_string())
        };

        Ok(Self {
            raw: raw.to_string(),
            kind,
            optional,
        })
    }
}

fn non_empty(value: &str, what: &str) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        Err(format!("empty {} in step selector", what))
    } else {
        Ok(value.to_string())
    }
}

/// Parse `start<sep>end`. Returns `None` if the text is not shaped like a range.
fn parse_range(text: &str, sep: &str) -> Option<Result<SelectorKind, String>> {
    let (start, end) = text.split_once(sep)?;
    let start: u32 = start.trim().parse().ok()?;
    let end: u32 = end.trim().parse().ok()?;
    if start > end {
        return Some(Err(format!(
            "range selector start {} is greater than end {}",
            start, end
        )));
    }
    Some(Ok(SelectorKind::Range { start, end }))
}

/// Compile an id glob (`*` and `?` wildcards) into an anchored regex.
pub fn glob_to_regex(glob: &str) -> Option<Regex> {
    let mut pattern = String::with_capacity(glob.len() + 8);
    pattern.push('^');
    for c in glob.chars() {
        match c {
            '*' => pattern.push_str(".*"),
            '?' => pattern.push('.'),
            other => pattern.push_str(&regex::escape(&other.to_string())),
        }
    }
    pattern.push('$');
    Regex::new(&pattern).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Selector {
        s.parse().unwrap()
    }

    #[test]
    fn plain_text_is_an_id() {
        assert_eq!(parse("install-node").kind(), &SelectorKind::Id("install-node".into()));
        assert_eq!(parse("0201").kind(), &SelectorKind::Id("0201".into()));
    }

    #[test]
    fn explicit_id_prefix() {
        assert_eq!(parse("id:0200-0299").kind(), &SelectorKind::Id("0200-0299".into()));
    }

    #[test]
    fn category_and_tag() {
        assert_eq!(parse("category:lint").kind(), &SelectorKind::Category("lint".into()));
        assert_eq!(parse("tag:git").kind(), &SelectorKind::Tag("git".into()));
    }

    #[test]
    fn dash_range() {
        assert_eq!(
            parse("0200-0299").kind(),
            &SelectorKind::Range {
                start: 200,
                end: 299
            }
        );
    }

    #[test]
    fn dotted_range() {
        assert_eq!(
            parse("range:5..9").kind(),
            &SelectorKind::Range { start: 5, end: 9 }
        );
    }

    #[test]
    fn reversed_range_is_rejected() {
        assert!("0300-0200".parse::<Selector>().is_err());
        assert!("range:9..5".parse::<Selector>().is_err());
    }

    #[test]
    fn malformed_range_prefix_is_rejected() {
        assert!("range:abc".parse::<Selector>().is_err());
    }

    #[test]
    fn hyphenated_name_is_not_a_range() {
        assert_eq!(parse("git-sync").kind(), &SelectorKind::Id("git-sync".into()));
    }

    #[test]
    fn glob_pattern() {
        assert_eq!(parse("git-*").kind(), &SelectorKind::Pattern("git-*".into()));
    }

    #[test]
    fn trailing_question_mark_marks_optional() {
        let selector = parse("category:docker?");
        assert!(selector.is_optional());
        assert_eq!(selector.kind(), &SelectorKind::Category("docker".into()));
        assert_eq!(selector.raw(), "category:docker?");
    }

    #[test]
    fn empty_selectors_rejected() {
        assert!("".parse::<Selector>().is_err());
        assert!("?".parse::<Selector>().is_err());
        assert!("category:".parse::<Selector>().is_err());
    }

    #[test]
    fn glob_regex_matches_whole_id() {
        let re = glob_to_regex("02??_*").unwrap();
        assert!(re.is_match("0201_install"));
        assert!(!re.is_match("x0201_install"));
        assert!(!re.is_match("021_install"));
    }

    #[test]
    fn glob_regex_escapes_literals() {
        let re = glob_to_regex("a.b*").unwrap();
        assert!(re.is_match("a.bc"));
        assert!(!re.is_match("axbc"));
    }
}
