use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Words that collide with system paths or concepts and can never be claimed.
pub const DEFAULT_RESERVED: [&str; 30] = [
    "admin",
    "api",
    "www",
    "mail",
    "ftp",
    "localhost",
    "root",
    "support",
    "help",
    "about",
    "contact",
    "privacy",
    "terms",
    "login",
    "signup",
    "signin",
    "register",
    "dashboard",
    "profile",
    "settings",
    "account",
    "billing",
    "pricing",
    "features",
    "blog",
    "news",
    "docs",
    "documentation",
    "status",
    "health",
];

pub const DEFAULT_BASE_PATH: &str = "123l.ink";
pub const DEFAULT_MIN_LEN: usize = 3;
pub const DEFAULT_MAX_LEN: usize = 30;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static INVALID_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9-]").unwrap());
static DASH_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").unwrap());
static EDGE_DASHES: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-+|-+$").unwrap());

/// Normalizes free-form input into the canonical username grammar `[a-z0-9]+(-[a-z0-9]+)*`.
///
/// The order of the steps matters: whitespace and underscores become dashes
/// before invalid characters are stripped, and dash runs are collapsed after
/// the strip since removed characters can leave new runs behind.
pub fn sanitize(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let dashed = WHITESPACE_RUN.replace_all(lowered.trim(), "-");
    let dashed = dashed.replace('_', "-");
    let stripped = INVALID_CHARS.replace_all(&dashed, "");
    let collapsed = DASH_RUN.replace_all(&stripped, "-");
    EDGE_DASHES.replace_all(&collapsed, "").into_owned()
}

/// One failed rule. The `Display` text is what the user gets to see.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsernameIssue {
    #[error("Username must be at least {min} characters long")]
    TooShort { min: usize },

    #[error("Username must be {max} characters or less")]
    TooLong { max: usize },

    #[error("This username is reserved and cannot be used")]
    Reserved,

    #[error("Username cannot start or end with a dash")]
    DashBoundary,

    /// Only produced when parsing a stored token, never by `validate`.
    #[error("Username may only contain lowercase letters, numbers and single dashes")]
    NotCanonical,
}

impl Serialize for UsernameIssue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    /// Canonical token derived from the input
    pub sanitized: String,
    /// True iff `errors` is empty and the token is long enough
    pub is_valid: bool,
    /// Every failed rule, in rule order. Only the first one is shown to users.
    pub errors: Vec<UsernameIssue>,
    /// Public address the profile would live at
    pub preview: String,
}

impl ValidationResult {
    pub fn first_error(&self) -> Option<&UsernameIssue> {
        self.errors.first()
    }

    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

/// A token that passed every rule. Can only be obtained through [`UsernameRules::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The username rule table. Reserved words and the preview base path are
/// configuration, so alternate rule sets can be built without touching the code.
#[derive(Debug, Clone)]
pub struct UsernameRules {
    base_path: String,
    reserved: BTreeSet<String>,
    min_len: usize,
    max_len: usize,
}

impl Default for UsernameRules {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_PATH, DEFAULT_RESERVED)
    }
}

impl UsernameRules {
    pub fn new<I, S>(base_path: impl Into<String>, reserved: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            base_path: base_path.into(),
            reserved: reserved.into_iter().map(|s| sanitize(s.as_ref())).collect(),
            min_len: DEFAULT_MIN_LEN,
            max_len: DEFAULT_MAX_LEN,
        }
    }

    pub fn with_lengths(mut self, min_len: usize, max_len: usize) -> Self {
        self.min_len = min_len;
        self.max_len = max_len;
        self
    }

    pub fn is_reserved(&self, token: &str) -> bool {
        self.reserved.contains(token)
    }

    pub fn preview(&self, sanitized: &str) -> String {
        format!("{}/{}", self.base_path, sanitized)
    }

    /// Sanitizes the raw input and runs the rule table on the result. Never fails:
    /// empty input simply comes back invalid with the minimum length message.
    pub fn validate(&self, raw: &str) -> ValidationResult {
        self.check(&sanitize(raw))
    }

    /// Runs the rule table on `token` exactly as given, without sanitizing it first.
    ///
    /// This is the path for tokens that come from somewhere other than the sanitizer
    /// (stored rows, admin tooling), which is why the dash boundary rule is kept.
    pub fn check(&self, token: &str) -> ValidationResult {
        let len = token.chars().count();
        let mut errors = Vec::new();

        if len < self.min_len {
            errors.push(UsernameIssue::TooShort { min: self.min_len });
        }
        if len > self.max_len {
            errors.push(UsernameIssue::TooLong { max: self.max_len });
        }
        if self.is_reserved(token) {
            errors.push(UsernameIssue::Reserved);
        }
        if token.starts_with('-') || token.ends_with('-') {
            errors.push(UsernameIssue::DashBoundary);
        }

        ValidationResult {
            sanitized: token.to_string(),
            is_valid: errors.is_empty() && len >= self.min_len,
            errors,
            preview: self.preview(token),
        }
    }

    /// Accepts a token only if it is already canonical and passes every rule.
    pub fn parse(&self, token: &str) -> Result<Username, UsernameIssue> {
        let result = self.check(token);
        if let Some(issue) = result.errors.into_iter().next() {
            return Err(issue);
        }
        if sanitize(token) != token {
            return Err(UsernameIssue::NotCanonical);
        }
        Ok(Username(result.sanitized))
    }
}

/// Describes what sanitizing `raw` did, for inline feedback under the input field.
///
/// Every category is checked on its own against the raw input. `None` means no
/// category applied; there is no separate "nothing changed" comparison.
pub fn describe_transformation(raw: &str, sanitized: &str) -> Option<String> {
    if raw == sanitized {
        return None;
    }

    let mut changes = Vec::new();
    if raw != raw.to_lowercase() {
        changes.push("converted to lowercase");
    }
    if raw.contains(' ') {
        changes.push("spaces replaced with dashes");
    }
    if raw.contains('_') {
        changes.push("underscores replaced with dashes");
    }
    if raw
        .chars()
        .any(|c| !(c.is_ascii_alphanumeric() || c.is_whitespace() || c == '_' || c == '-'))
    {
        changes.push("special characters removed");
    }

    if changes.is_empty() {
        return None;
    }
    Some(format!("Automatically {}", changes.join(", ")))
}

/// First guess for a new profile: the display name if it yields anything, else
/// the local part of the email address.
pub fn suggest_username(display_name: &str, email: &str) -> String {
    let from_name = sanitize(display_name);
    if !from_name.is_empty() {
        return from_name;
    }
    let local = email.split('@').next().unwrap_or_default();
    sanitize(local)
}
