use std::cmp::Ordering;

use smartstring::alias::String;

use crate::feature::{Tags, Value};

#[derive(Debug, Clone, Default, PartialEq)]
pub enum FilterExpression {
    All(Vec<FilterExpression>),
    Any(Vec<FilterExpression>),
    NoneOf(Vec<FilterExpression>),
    In(String, Vec<Value>),
    NotIn(String, Vec<Value>),
    Has(String),
    NotHas(String),
    Cmp(String, Comparison, Value),
    #[default]
    True,
}

impl FilterExpression {
    pub fn eval(&self, tags: &Tags) -> bool {
        match self {
            FilterExpression::All(filters) => filters.iter().all(|f| f.eval(tags)),
            FilterExpression::Any(filters) => filters.iter().any(|f| f.eval(tags)),
            FilterExpression::NoneOf(filters) => !filters.iter().any(|f| f.eval(tags)),
            FilterExpression::In(key, values) => tags
                .get(key)
                .map(|tag| values.iter().any(|v| loose_eq(v, tag)))
                .unwrap_or(false),
            FilterExpression::NotIn(key, values) => tags
                .get(key)
                .map(|tag| !values.iter().any(|v| loose_eq(v, tag)))
                .unwrap_or(true),
            FilterExpression::Has(key) => tags.contains(key),
            FilterExpression::NotHas(key) => !tags.contains(key),
            FilterExpression::Cmp(key, cmp, value) => tags
                .get(key)
                .map(|tag| cmp.cmp(tag, value))
                .unwrap_or(false),
            FilterExpression::True => true,
        }
    }
}

/// Numeric equality when both sides read as numbers, text equality otherwise.
fn loose_eq(l: &Value, r: &Value) -> bool {
    if let (Some(l), Some(r)) = (l.as_number(), r.as_number()) {
        return l == r;
    }

    match (l, r) {
        (Value::String(l), Value::String(r)) => l == r,
        (Value::Bool(l), Value::Bool(r)) => l == r,
        (Value::Bool(b), Value::String(s)) | (Value::String(s), Value::Bool(b)) => {
            s.as_str() == if *b { "true" } else { "false" }
        }
        _ => false,
    }
}

fn loose_cmp(l: &Value, r: &Value) -> Option<Ordering> {
    l.as_number()?.partial_cmp(&r.as_number()?)
}

impl<'de> serde::de::Deserialize<'de> for FilterExpression {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_seq(FilterVisitor)
    }
}

struct FilterVisitor;

impl<'de> serde::de::Visitor<'de> for FilterVisitor {
    type Value = FilterExpression;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a filter array such as [\"==\", \"class\", \"park\"]")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::SeqAccess<'de>,
    {
        use serde::de::Error as E;

        let op: String = required(&mut seq, "an operator")?;

        let exp = match op.as_str() {
            "all" => FilterExpression::All(remaining(&mut seq)?),
            "any" => FilterExpression::Any(remaining(&mut seq)?),
            "none" => FilterExpression::NoneOf(remaining(&mut seq)?),
            "in" => FilterExpression::In(required(&mut seq, "a key")?, remaining(&mut seq)?),
            "!in" => FilterExpression::NotIn(required(&mut seq, "a key")?, remaining(&mut seq)?),
            "has" => FilterExpression::Has(required(&mut seq, "a key")?),
            "!has" => FilterExpression::NotHas(required(&mut seq, "a key")?),
            other => match Comparison::from_op(other) {
                Some(cmp) => {
                    let key = required(&mut seq, "a key")?;
                    let value = required(&mut seq, "a value")?;
                    FilterExpression::Cmp(key, cmp, value)
                }
                None => return Err(E::custom(format_args!("unknown filter operator '{op}'"))),
            },
        };

        if seq.next_element::<serde::de::IgnoredAny>()?.is_some() {
            return Err(E::custom(format_args!("too many operands for '{op}'")));
        }

        Ok(exp)
    }
}

fn required<'de, A, T>(seq: &mut A, what: &str) -> Result<T, A::Error>
where
    A: serde::de::SeqAccess<'de>,
    T: serde::Deserialize<'de>,
{
    use serde::de::Error as E;

    seq.next_element()?
        .ok_or_else(|| E::custom(format_args!("filter is missing {what}")))
}

fn remaining<'de, A, T>(seq: &mut A) -> Result<Vec<T>, A::Error>
where
    A: serde::de::SeqAccess<'de>,
    T: serde::Deserialize<'de>,
{
    let mut items = Vec::new();
    while let Some(item) = seq.next_element()? {
        items.push(item);
    }
    Ok(items)
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Neq,
    Lteq,
    GtEq,
    Lt,
    Gt,
}

impl Comparison {
    fn cmp(&self, tag: &Value, value: &Value) -> bool {
        match self {
            Comparison::Eq => loose_eq(tag, value),
            Comparison::Neq => !loose_eq(tag, value),
            Comparison::Lteq => matches!(loose_cmp(tag, value), Some(o) if o.is_le()),
            Comparison::GtEq => matches!(loose_cmp(tag, value), Some(o) if o.is_ge()),
            Comparison::Lt => loose_cmp(tag, value) == Some(Ordering::Less),
            Comparison::Gt => loose_cmp(tag, value) == Some(Ordering::Greater),
        }
    }

    fn from_op(op: &str) -> Option<Self> {
        Some(match op {
            "==" => Comparison::Eq,
            "!=" => Comparison::Neq,
            "<=" => Comparison::Lteq,
            ">=" => Comparison::GtEq,
            "<" => Comparison::Lt,
            ">" => Comparison::Gt,
            _ => return None,
        })
    }
}
