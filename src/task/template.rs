//! `{placeholder}` templates for task descriptions and agent goals
//!
//! Templates are parsed once when a crew is assembled, so syntax mistakes
//! surface before anything runs. Rendering happens per run, against that
//! run's inputs.
//!
//! - `{name}` is replaced by the input called `name`
//! - `{{` and `}}` render literal braces
//! - names may contain ASCII letters, digits, `_`, `-` and `.`
//!
//! A placeholder with no matching input is an error, never an empty string.

use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

/// Named run inputs, e.g. `{"topic": "quantum computing"}`
pub type RunInputs = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("missing input '{name}' referenced at position {position}")]
    MissingInput { name: String, position: usize },
    #[error("unmatched '{{' at position {position}")]
    UnmatchedBrace { position: usize },
    #[error("empty placeholder '{{}}' at position {position}")]
    EmptyPlaceholder { position: usize },
    #[error("invalid placeholder name '{name}' at position {position}")]
    InvalidPlaceholder { name: String, position: usize },
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Placeholder { name: String, position: usize },
}

/// A parsed template
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(source: impl Into<String>) -> Result<Self, TemplateError> {
        let source = source.into();
        let segments = parse_segments(&source)?;
        Ok(Self { source, segments })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Distinct placeholder names, sorted
    pub fn placeholders(&self) -> BTreeSet<&str> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Placeholder { name, .. } => Some(name.as_str()),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    pub fn render(&self, inputs: &RunInputs) -> Result<String, TemplateError> {
        let mut rendered = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => rendered.push_str(text),
                Segment::Placeholder { name, position } => match inputs.get(name) {
                    Some(value) => rendered.push_str(value),
                    None => {
                        return Err(TemplateError::MissingInput {
                            name: name.clone(),
                            position: *position,
                        })
                    }
                },
            }
        }
        Ok(rendered)
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.'
}

fn parse_segments(source: &str) -> Result<Vec<Segment>, TemplateError> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = source.char_indices().peekable();

    while let Some((position, ch)) = chars.next() {
        match ch {
            '{' if matches!(chars.peek(), Some((_, '{'))) => {
                chars.next();
                literal.push('{');
            }
            '}' if matches!(chars.peek(), Some((_, '}'))) => {
                chars.next();
                literal.push('}');
            }
            '{' => {
                let mut raw = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    raw.push(c);
                }
                if !closed {
                    return Err(TemplateError::UnmatchedBrace { position });
                }

                let name = raw.trim();
                if name.is_empty() {
                    return Err(TemplateError::EmptyPlaceholder { position });
                }
                if !name.chars().all(is_name_char) {
                    return Err(TemplateError::InvalidPlaceholder {
                        name: name.to_string(),
                        position,
                    });
                }

                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Placeholder {
                    name: name.to_string(),
                    position,
                });
            }
            // A lone closing brace is ordinary text
            _ => literal.push(ch),
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

/// Build a [`RunInputs`] map from key-value pairs
pub fn inputs<I, K, V>(pairs: I) -> RunInputs
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn render(source: &str, run_inputs: &RunInputs) -> Result<String, TemplateError> {
        Template::parse(source)?.render(run_inputs)
    }

    #[test]
    fn test_substitutes_topic() {
        let result = render(
            "Identify the next big trend in {topic}.",
            &inputs([("topic", "quantum computing")]),
        )
        .unwrap();
        assert_eq!(result, "Identify the next big trend in quantum computing.");
    }

    #[test]
    fn test_repeated_and_adjacent_placeholders() {
        let vars = inputs([("a", "A"), ("b", "B")]);
        assert_eq!(render("{a}{b}-{a}", &vars).unwrap(), "AB-A");
    }

    #[test]
    fn test_whitespace_inside_braces_is_trimmed() {
        let vars = inputs([("question", "why?")]);
        assert_eq!(render("Q: { question }", &vars).unwrap(), "Q: why?");
    }

    #[test]
    fn test_escaped_braces() {
        let vars = RunInputs::new();
        assert_eq!(
            render("Reply as {{\"label\": ...}}", &vars).unwrap(),
            "Reply as {\"label\": ...}"
        );
    }

    #[test]
    fn test_lone_closing_brace_is_literal() {
        assert_eq!(render("a } b", &RunInputs::new()).unwrap(), "a } b");
    }

    #[test]
    fn test_missing_input_reports_name_and_position() {
        let err = render("Research {topic}", &RunInputs::new()).unwrap_err();
        assert_eq!(
            err,
            TemplateError::MissingInput {
                name: "topic".to_string(),
                position: 9
            }
        );
        assert_eq!(
            err.to_string(),
            "missing input 'topic' referenced at position 9"
        );
    }

    #[test]
    fn test_syntax_errors_fail_at_parse() {
        assert_eq!(
            Template::parse("Hello {name").unwrap_err(),
            TemplateError::UnmatchedBrace { position: 6 }
        );
        assert_eq!(
            Template::parse("Hello {}").unwrap_err(),
            TemplateError::EmptyPlaceholder { position: 6 }
        );
        assert!(matches!(
            Template::parse("{\"json\": 1}"),
            Err(TemplateError::InvalidPlaceholder { .. })
        ));
    }

    #[test]
    fn test_placeholders_are_distinct_and_sorted() {
        let template = Template::parse("{topic} {question} {topic}").unwrap();
        let names: Vec<_> = template.placeholders().into_iter().collect();
        assert_eq!(names, vec!["question", "topic"]);
        assert_eq!(template.source(), "{topic} {question} {topic}");
    }

    #[test]
    fn test_unicode_literal_text() {
        let vars = inputs([("x", "ü")]);
        assert_eq!(render("→ {x} ←", &vars).unwrap(), "→ ü ←");
    }

    proptest! {
        #[test]
        fn prop_full_inputs_leave_no_placeholders(
            names in prop::collection::vec("[a-z][a-z_]{0,8}", 1..5),
            value in "[A-Za-z0-9 ]{0,20}",
        ) {
            let source = names
                .iter()
                .map(|n| format!("start {{{n}}} end"))
                .collect::<Vec<_>>()
                .join("\n");
            let vars = inputs(names.iter().map(|n| (n.clone(), value.clone())));

            let rendered = render(&source, &vars).unwrap();
            prop_assert!(!rendered.contains('{'), "rendered output contains '{{'");
            prop_assert!(!rendered.contains('}'), "rendered output contains '}}'");
        }

        #[test]
        fn prop_any_missing_input_fails(
            names in prop::collection::btree_set("[a-z][a-z_]{0,8}", 1..5),
            skip in 0usize..5,
        ) {
            let names: Vec<String> = names.into_iter().collect();
            let skip = skip % names.len();
            let source = names
                .iter()
                .map(|n| format!("{{{n}}}"))
                .collect::<Vec<_>>()
                .join(" ");
            let vars = inputs(
                names
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != skip)
                    .map(|(_, n)| (n.clone(), "v".to_string())),
            );

            let result = render(&source, &vars);
            let is_missing = matches!(result, Err(TemplateError::MissingInput { .. }));
            prop_assert!(is_missing);
        }
    }
}
