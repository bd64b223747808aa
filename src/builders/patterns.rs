use regex::Regex;
use serde::Serialize;
use std::fmt;

use crate::core::error::{HelperError, Result};

/// Horizontal whitespace only. Generated patterns must never match across a
/// line break, otherwise a replacement could swallow neighbouring blank lines.
const WS: &str = r"[ \t]";

/// An IPv4 literal as found at the start of a hosts file line. ASCII digits
/// only; `\d` would also accept other scripts' digits.
const IPV4: &str = r"[0-9]{1,3}(?:\.[0-9]{1,3}){3}";

/// The state of a directive marker inside a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LineState {
    /// The literal line is present and not commented out.
    Active,
    /// The literal line is present only behind a `#`.
    CommentedOut,
    /// Neither form appears in the file.
    Absent,
}

impl fmt::Display for LineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineState::Active => write!(f, "active"),
            LineState::CommentedOut => write!(f, "commented out"),
            LineState::Absent => write!(f, "absent"),
        }
    }
}

/// A line found by a [`DomainPattern`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainMatch {
    /// The full matched line.
    pub line: String,
    /// The captured value, if the pattern has one (the IP address of a hosts
    /// entry).
    pub value: Option<String>,
}

/// Whether a domain-keyed line exists in a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence {
    Present(DomainMatch),
    Absent,
}

impl Presence {
    pub fn is_present(&self) -> bool {
        matches!(self, Presence::Present(_))
    }
}

/// The `PatternMatcher` trait lets the engine classify a file's text against
/// any kind of marker without knowing how the marker builds its patterns.
///
/// Classification never fails: "not configured yet" is a state, not an error.
pub trait PatternMatcher {
    /// What a classification reports, e.g. [`LineState`] or [`Presence`].
    type State;

    /// Classifies the whole text of a configuration file.
    ///
    /// # Arguments
    /// * `text`: The full file contents. Patterns are matched line by line.
    ///
    /// # Returns
    /// The marker's state in `text`. The text itself is never modified.
    fn classify(&self, text: &str) -> Self::State;
}

/// A single configuration line whose presence, absence or commented state is
/// the unit of idempotent patching, e.g.
/// `LoadModule php5_module libexec/apache2/libphp5.so`.
///
/// Two patterns are derived from the literal. The active one tolerates any
/// run of spaces or tabs between tokens and around the line. The commented
/// one is the same with a leading `#`. Since the active pattern only allows
/// whitespace before the first token, the two can never match the same line.
#[derive(Debug, Clone)]
pub struct DirectiveMarker {
    literal: String,
    active: Regex,
    commented: Regex,
}

impl DirectiveMarker {
    /// Builds a marker from its literal line.
    ///
    /// # Arguments
    /// * `literal`: The directive as it should appear when active. It is
    ///   trimmed and its regex metacharacters are escaped.
    ///
    /// # Returns
    /// `Result<Self>` with both patterns compiled, or `HelperError::Config`
    /// for a blank literal.
    pub fn new(literal: &str) -> Result<Self> {
        let literal = literal.trim();
        if literal.is_empty() {
            return Err(HelperError::Config(
                "a directive marker cannot be blank".to_string(),
            ));
        }
        let body = whitespace_tolerant(literal);
        let active = Regex::new(&format!(r"(?m)^{WS}*{body}{WS}*$"))?;
        let commented = Regex::new(&format!(r"(?m)^{WS}*#{WS}*{body}{WS}*$"))?;

        Ok(Self {
            literal: literal.to_string(),
            active,
            commented,
        })
    }

    pub fn literal(&self) -> &str {
        &self.literal
    }

    pub fn active_pattern(&self) -> &Regex {
        &self.active
    }

    pub fn commented_pattern(&self) -> &Regex {
        &self.commented
    }

    /// Replaces the first commented occurrence with the bare literal and
    /// leaves the rest of the text untouched.
    ///
    /// # Arguments
    /// * `text`: The full file contents.
    ///
    /// # Returns
    /// The patched text, or `None` if there is nothing to uncomment.
    pub fn uncomment_first(&self, text: &str) -> Option<String> {
        let found = self.commented.find(text)?;
        let mut patched = String::with_capacity(text.len());
        patched.push_str(&text[..found.start()]);
        patched.push_str(&self.literal);
        patched.push_str(&text[found.end()..]);
        Some(patched)
    }
}

impl PatternMatcher for DirectiveMarker {
    type State = LineState;

    fn classify(&self, text: &str) -> LineState {
        if self.active.is_match(text) {
            LineState::Active
        } else if self.commented.is_match(text) {
            LineState::CommentedOut
        } else {
            LineState::Absent
        }
    }
}

/// Which kind of domain-keyed line a [`DomainPattern`] looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainKind {
    /// `Include <path>` in the main configuration.
    Include,
    /// `ServerName <domain>` inside a virtual host stanza.
    ServerName,
    /// `<ipv4> <domain>` in the hosts file.
    HostEntry,
}

/// A pattern keyed on a domain name or path, with only two interesting
/// states: present or absent.
///
/// Inline trailing comments are not stripped, so `ServerName a.local # old`
/// does not count as a match for `a.local`.
#[derive(Debug, Clone)]
pub struct DomainPattern {
    kind: DomainKind,
    key: String,
    regex: Regex,
}

impl DomainPattern {
    pub fn include(path: &str) -> Result<Self> {
        let pattern = format!(r"(?m)^Include{WS}+{}{WS}*$", regex::escape(path));
        Self::build(DomainKind::Include, path, &pattern)
    }

    pub fn server_name(domain: &str) -> Result<Self> {
        let pattern = format!(
            r"(?m)^{WS}*ServerName{WS}+{}{WS}*$",
            regex::escape(domain)
        );
        Self::build(DomainKind::ServerName, domain, &pattern)
    }

    pub fn host_entry(domain: &str) -> Result<Self> {
        let pattern = format!(
            r"(?m)^{WS}*({IPV4}){WS}+{}{WS}*$",
            regex::escape(domain)
        );
        Self::build(DomainKind::HostEntry, domain, &pattern)
    }

    fn build(kind: DomainKind, key: &str, pattern: &str) -> Result<Self> {
        Ok(Self {
            kind,
            key: key.to_string(),
            regex: Regex::new(pattern)?,
        })
    }

    pub fn kind(&self) -> DomainKind {
        self.kind
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl PatternMatcher for DomainPattern {
    type State = Presence;

    fn classify(&self, text: &str) -> Presence {
        match self.regex.captures(text) {
            Some(caps) => Presence::Present(DomainMatch {
                line: caps[0].to_string(),
                value: caps.get(1).map(|m| m.as_str().to_string()),
            }),
            None => Presence::Absent,
        }
    }
}

/// Lists the domains of every active `ServerName` line, in file order.
pub fn server_names(text: &str) -> Vec<String> {
    // Literal pattern, cannot fail to compile.
    let Ok(regex) = Regex::new(&format!(r"(?m)^{WS}*ServerName{WS}+(\S+){WS}*$")) else {
        return Vec::new();
    };
    regex
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Escapes each whitespace-separated token of `literal` and joins them with
/// "one or more spaces or tabs".
fn whitespace_tolerant(literal: &str) -> String {
    literal
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(&format!("{WS}+"))
}
