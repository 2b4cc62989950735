use smallvec::SmallVec;
use smartstring::alias::String;

use crate::feature::Tags;

#[derive(Debug, Clone, PartialEq, Eq)]
enum TemplatePart {
    Literal(String),
    Field(String),
}

/// Text pattern with `{key}` references into feature tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Template {
    parts: SmallVec<[TemplatePart; 2]>,
}

impl Template {
    /// An unterminated `{` or an empty `{}` is kept as literal text.
    pub fn parse(pattern: &str) -> Self {
        let mut parts = SmallVec::new();
        let mut literal = String::new();
        let mut rest = pattern;

        while let Some(open) = rest.find('{') {
            literal.push_str(&rest[..open]);
            let after = &rest[open + 1..];

            let close = after.find(['{', '}']);
            match close {
                Some(close) if close > 0 && after[close..].starts_with('}') => {
                    if !literal.is_empty() {
                        parts.push(TemplatePart::Literal(std::mem::take(&mut literal)));
                    }
                    parts.push(TemplatePart::Field(after[..close].into()));
                    rest = &after[close + 1..];
                }
                _ => {
                    literal.push('{');
                    rest = after;
                }
            }
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            parts.push(TemplatePart::Literal(literal));
        }

        Template { parts }
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn resolve(&self, tags: &Tags) -> String {
        let mut text = String::new();
        for part in &self.parts {
            match part {
                TemplatePart::Literal(s) => text.push_str(s),
                TemplatePart::Field(key) => {
                    if let Some(value) = tags.get(key) {
                        value.write_to(&mut text);
                    }
                }
            }
        }

        text
    }
}

impl<'de> serde::Deserialize<'de> for Template {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = std::string::String::deserialize(deserializer)?;
        Ok(Template::parse(&s))
    }
}
