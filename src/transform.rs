//! Ordered text rewriting applied to templates before they are installed.
//!
//! A [`RuleSet`] is a small pipeline of pure `&str -> String` rewrites. Each
//! rule transforms every occurrence it matches or leaves the text untouched;
//! later rules see the output of earlier ones.
use regex::Regex;

use crate::error::TransformError;
use crate::sources::front_matter_len;

/// Pattern for the name part of a namespaced identifier.
const NAME_PATTERN: &str = r"[A-Za-z0-9][A-Za-z0-9_-]*";

/// A single rewrite operation.
#[derive(Debug, Clone)]
pub enum Rewrite {
    /// Replace every regex match; `replacement` may use `${name}` captures.
    Pattern {
        /// Human-readable rule name.
        label: String,
        /// Compiled pattern.
        regex: Regex,
        /// Replacement template.
        replacement: String,
    },
    /// Insert a marker line after the front matter (or at the top).
    Annotate {
        /// Marker text, inserted once.
        marker: String,
    },
}

impl Rewrite {
    /// Re-delimit namespaced identifiers: `ns<from>name` becomes `ns<to>name`.
    ///
    /// ```
    /// use skill_deploy::transform::Rewrite;
    ///
    /// let rule = Rewrite::redelimit("gsd", ':', '-').unwrap();
    /// assert_eq!(rule.apply("run gsd:new-project"), "run gsd-new-project");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern fails to compile.
    pub fn redelimit(namespace: &str, from: char, to: char) -> Result<Self, TransformError> {
        let pattern = format!(
            r"\b{}{}(?P<name>{NAME_PATTERN})",
            regex::escape(namespace),
            regex::escape(&from.to_string())
        );
        Self::pattern(
            format!("redelimit {namespace}{from}"),
            &pattern,
            format!("{namespace}{to}${{name}}"),
        )
    }

    /// Rewrite slash-command references `/ns:name` into `<prefix>ns<sep>name`,
    /// e.g. `/gsd:plan-phase` into `$gsd-plan-phase`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern fails to compile.
    pub fn invocation(namespace: &str, prefix: &str, separator: char) -> Result<Self, TransformError> {
        let pattern = format!(
            r"(?P<lead>^|[^\w/.~-])/{}:(?P<name>{NAME_PATTERN})",
            regex::escape(namespace)
        );
        let escaped_prefix = prefix.replace('$', "$$");
        Self::pattern(
            format!("invocation /{namespace}:"),
            &pattern,
            format!("${{lead}}{escaped_prefix}{namespace}{separator}${{name}}"),
        )
    }

    /// Replace references to another tool's home directory (`~/.dir/`,
    /// `$HOME/.dir/`) with `replacement`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern fails to compile.
    pub fn home_path(dir: &str, replacement: &str) -> Result<Self, TransformError> {
        let pattern = format!(r"(?:~|\$HOME)/{}/", regex::escape(dir));
        Self::pattern(
            format!("home path {dir}"),
            &pattern,
            replacement.replace('$', "$$"),
        )
    }

    /// Replace project-relative references to another tool's directory
    /// (`./.dir/`) with `replacement`. Parent-relative forms such as
    /// `../.dir/` do not match.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern fails to compile.
    pub fn project_path(dir: &str, replacement: &str) -> Result<Self, TransformError> {
        let pattern = format!(r"(?P<lead>^|[^\w/.~-])\./{}/", regex::escape(dir));
        Self::pattern(
            format!("project path {dir}"),
            &pattern,
            format!("${{lead}}{}", replacement.replace('$', "$$")),
        )
    }

    /// Insert `marker` on its own line after the front matter.
    #[must_use]
    pub fn annotate(marker: impl Into<String>) -> Self {
        Self::Annotate {
            marker: marker.into(),
        }
    }

    fn pattern(label: String, pattern: &str, replacement: String) -> Result<Self, TransformError> {
        let regex = Regex::new(pattern).map_err(|source| TransformError::Pattern {
            rule: label.clone(),
            source,
        })?;
        Ok(Self::Pattern {
            label,
            regex,
            replacement,
        })
    }

    /// Apply this rule to `input`.
    #[must_use]
    pub fn apply(&self, input: &str) -> String {
        match self {
            Self::Pattern {
                regex, replacement, ..
            } => regex.replace_all(input, replacement.as_str()).into_owned(),
            Self::Annotate { marker } => annotate(input, marker),
        }
    }

    /// Short description for logs.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Pattern { label, .. } => label.clone(),
            Self::Annotate { marker } => format!("annotate '{marker}'"),
        }
    }
}

fn annotate(input: &str, marker: &str) -> String {
    if marker.is_empty() || input.contains(marker) {
        return input.to_string();
    }
    match front_matter_len(input) {
        Some(end) => {
            let (head, body) = input.split_at(end);
            let body = body.strip_prefix('\n').unwrap_or(body);
            format!("{head}\n{marker}\n\n{body}")
        }
        None => format!("{marker}\n\n{input}"),
    }
}

/// An ordered sequence of rewrites.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rewrite>,
}

impl RuleSet {
    /// Create a rule set from rules in application order.
    #[must_use]
    pub const fn new(rules: Vec<Rewrite>) -> Self {
        Self { rules }
    }

    /// Rules in application order.
    #[must_use]
    pub fn rules(&self) -> &[Rewrite] {
        &self.rules
    }

    /// Run every rule in order over `input`.
    #[must_use]
    pub fn apply(&self, input: &str) -> String {
        self.rules
            .iter()
            .fold(input.to_string(), |text, rule| rule.apply(&text))
    }
}
