// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Patterns of step definitions.

use std::{
    fmt,
    hash::{Hash, Hasher},
};

use cucumber_expressions::Expression;
use regex::Regex;

use super::error::PatternError;

/// Pattern of a step definition: decides whether a step text applies and
/// extracts its positional parameters.
#[derive(Clone, Debug)]
pub struct Matcher {
    /// Compiled [`Regex`] the step text is matched against.
    regex: Regex,

    /// Original source of this [`Matcher`], for diagnostics.
    source: String,

    /// Names of [Cucumber Expression][1] parameters, in order. Empty for raw
    /// [`Regex`]es.
    ///
    /// [1]: https://github.com/cucumber/cucumber-expressions
    parameters: Vec<String>,
}

impl Matcher {
    /// Creates a [`Matcher`] out of a raw [`Regex`].
    #[must_use]
    pub fn regex(regex: Regex) -> Self {
        Self { source: regex.as_str().to_owned(), regex, parameters: Vec::new() }
    }

    /// Creates a [`Matcher`] out of a [Cucumber Expression][1], like
    /// `I have {int} cucumbers in my {word}`.
    ///
    /// # Errors
    ///
    /// If the `expr` is not a valid [Cucumber Expression][1].
    ///
    /// [1]: https://github.com/cucumber/cucumber-expressions
    pub fn expression(expr: &str) -> Result<Self, PatternError> {
        let regex = Expression::regex(expr).map_err(|e| PatternError {
            pattern: expr.to_owned(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            regex,
            source: expr.to_owned(),
            parameters: parameter_names(expr),
        })
    }

    /// Creates a [`Matcher`] accepting exactly the given `text`.
    #[must_use]
    pub fn literal(text: &str) -> Self {
        let regex = Regex::new(&format!("^{}$", regex::escape(text)))
            .unwrap_or_else(|e| unreachable!("escaped literal is valid: {e}"));
        Self { regex, source: text.to_owned(), parameters: Vec::new() }
    }

    /// Returns the source this [`Matcher`] was created from.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Indicates whether the given step `text` applies to this [`Matcher`].
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Extracts positional parameters out of the given step `text`, or
    /// returns [`None`] if it doesn't match.
    ///
    /// Alternative groups generated for a single `{string}` parameter yield a
    /// single value, stripped of its quotes.
    #[must_use]
    pub fn captures(&self, text: &str) -> Option<Vec<String>> {
        let caps = self.regex.captures(text)?;

        let mut values = Vec::<String>::new();
        let mut alternation = None;
        for (i, name) in self.regex.capture_names().enumerate().skip(1) {
            let value = caps.get(i).map(|m| m.as_str());
            let group = name.and_then(alternation_id);
            match (group, alternation) {
                (Some(id), Some(current)) if id == current => {
                    if let (Some(v), Some(last)) = (value, values.last_mut()) {
                        *last = v.to_owned();
                    }
                }
                _ => values.push(value.unwrap_or_default().to_owned()),
            }
            alternation = group;
        }

        if values.len() == self.parameters.len() {
            for (value, name) in values.iter_mut().zip(&self.parameters) {
                if name == "string" {
                    *value = unquote(value);
                }
            }
        }

        Some(values)
    }
}

impl From<Regex> for Matcher {
    fn from(regex: Regex) -> Self {
        Self::regex(regex)
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl Hash for Matcher {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.regex.as_str().hash(state);
    }
}

impl PartialEq for Matcher {
    fn eq(&self, other: &Self) -> bool {
        self.regex.as_str() == other.regex.as_str()
    }
}

impl Eq for Matcher {}

/// Returns the identifier of a `__{id}_{n}` capture group, which Cucumber
/// Expressions generate for alternatives of one parameter.
fn alternation_id(name: &str) -> Option<&str> {
    let (id, n) = name.strip_prefix("__")?.rsplit_once('_')?;
    n.chars().all(|c| c.is_ascii_digit()).then_some(id)
}

/// Strips one level of matching single or double quotes, unescaping the
/// quote character inside.
fn unquote(value: &str) -> String {
    ['"', '\'']
        .into_iter()
        .find_map(|q| {
            let inner = value.strip_prefix(q)?.strip_suffix(q)?;
            Some(inner.replace(&format!("\\{q}"), &q.to_string()))
        })
        .unwrap_or_else(|| value.to_owned())
}

/// Scans a Cucumber Expression for its `{parameter}` names, honoring `\`
/// escapes.
fn parameter_names(expr: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut current: Option<String> = None;
    let mut chars = expr.chars();
    while let Some(c) = chars.next() {
        match (c, current.as_mut()) {
            ('\\', _) => {
                _ = chars.next();
            }
            ('{', None) => current = Some(String::new()),
            ('}', Some(_)) => names.extend(current.take()),
            (c, Some(name)) => name.push(c),
            (_, None) => {}
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regex_extracts_positional_groups() {
        let m = Matcher::regex(Regex::new(r"^I have (\d+) (\w+)$").unwrap());
        assert_eq!(
            m.captures("I have 5 cucumbers"),
            Some(vec!["5".to_owned(), "cucumbers".to_owned()]),
        );
        assert_eq!(m.captures("I have none"), None);
        assert!(!m.matches("You have 5 cucumbers"));
    }

    #[test]
    fn expression_extracts_unquoted_string() {
        let m = Matcher::expression("open {string} url").unwrap();
        assert!(m.matches(r#"open "https://example.com" url"#));
        assert_eq!(
            m.captures(r#"open "https://example.com" url"#),
            Some(vec!["https://example.com".to_owned()]),
        );
        assert_eq!(
            m.captures("open 'single' url"),
            Some(vec!["single".to_owned()]),
        );
    }

    #[test]
    fn expression_extracts_mixed_parameters() {
        let m = Matcher::expression("I eat {int} {string} in {word}").unwrap();
        assert_eq!(
            m.captures(r#"I eat 3 "red apples" in kitchen"#),
            Some(vec![
                "3".to_owned(),
                "red apples".to_owned(),
                "kitchen".to_owned(),
            ]),
        );
    }

    #[test]
    fn expression_unescapes_quotes_in_string() {
        let m = Matcher::expression("I say {string}").unwrap();
        assert_eq!(
            m.captures(r#"I say "a \"b\" c""#),
            Some(vec![r#"a "b" c"#.to_owned()]),
        );
        assert_eq!(
            m.captures(r"I say 'it\'s \n'"),
            Some(vec![r"it's \n".to_owned()]),
        );
    }

    #[test]
    fn literal_matches_exact_text_only() {
        let m = Matcher::literal("I pay $5 (cash)");
        assert!(m.matches("I pay $5 (cash)"));
        assert!(!m.matches("I pay $5 (cash) twice"));
        assert_eq!(m.captures("I pay $5 (cash)"), Some(vec![]));
    }

    #[test]
    fn invalid_expression_is_reported() {
        let err = Matcher::expression("I have {int cucumbers").unwrap_err();
        assert_eq!(err.pattern, "I have {int cucumbers");
    }

    #[test]
    fn scans_parameter_names() {
        assert_eq!(parameter_names("a {int} \\{b} {} {string}"), [
            "int", "", "string"
        ]);
    }
}
