//! Minimal `{{.Name}}` text templates.
//!
//! A template is literal text interleaved with actions. The only supported
//! action is a variable reference, `{{.Name}}`, optionally padded with
//! whitespace (`{{ .Name }}`). Anything else between `{{` and `}}` is a
//! syntax error reported at parse time, before any bindings are known.
use std::collections::BTreeMap;

use crate::error::TemplateError;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Var(String),
}

/// A parsed template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Template {
    name: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Parse `text`. `name` identifies the template in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Syntax`] for an unterminated `{{`, an empty
    /// action, or an action that is not a `.Name` reference.
    pub fn parse(name: impl Into<String>, text: &str) -> Result<Self, TemplateError> {
        let name = name.into();
        let mut segments = Vec::new();
        let mut rest = text;
        let mut line = 1;

        while let Some((before, after)) = rest.split_once(OPEN) {
            if !before.is_empty() {
                segments.push(Segment::Text(before.to_string()));
            }
            line += before.matches('\n').count();
            let syntax = |message: String| TemplateError::Syntax {
                template: name.clone(),
                line,
                message,
            };

            let Some((action, remainder)) = after.split_once(CLOSE) else {
                return Err(syntax("unclosed action".to_string()));
            };
            segments.push(Segment::Var(parse_action(action.trim()).map_err(syntax)?));
            line += action.matches('\n').count();
            rest = remainder;
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }
        Ok(Self { name, segments })
    }

    /// A template named `name` that renders to the empty string.
    #[must_use]
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            segments: Vec::new(),
        }
    }

    /// Name used in error messages.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Variables referenced by this template, in order of appearance
    /// (repeats included).
    pub fn vars(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Var(v) => Some(v.as_str()),
            Segment::Text(_) => None,
        })
    }

    /// Substitute every variable from `vars`.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::MissingVariable`] for the first referenced
    /// variable with no binding.
    pub fn render(&self, vars: &BTreeMap<String, String>) -> Result<String, TemplateError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Var(var) => {
                    let value = vars.get(var).ok_or_else(|| TemplateError::MissingVariable {
                        template: self.name.clone(),
                        name: var.clone(),
                    })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

fn parse_action(action: &str) -> Result<String, String> {
    if action.is_empty() {
        return Err("missing value for action".to_string());
    }
    let Some(ident) = action.strip_prefix('.') else {
        return Err(format!(
            "unsupported action {action:?}: only {{{{.Name}}}} references are allowed"
        ));
    };
    if !is_identifier(ident) {
        return Err(format!("bad variable name {ident:?}"));
    }
    Ok(ident.to_string())
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}
