use async_trait::async_trait;
use mongodb::bson::{self, oid::ObjectId, Bson, Document};

use crate::{
    error::{Error, Result},
    model::{fields, ArchiveEntry},
};

use super::EntryStore;

/// An [`EntryStore`] holding its documents in memory.
///
/// Pipelines are evaluated in process. Only the stages and expressions needed to total page
/// counts are implemented: `$project` (inclusion, `_id` exclusion, field paths, `$sum`,
/// `$literal`), `$group` with `$sum` accumulators, `$skip` and `$limit`. Anything else fails with
/// [`ErrorKind::UnsupportedPipeline`](crate::error::ErrorKind::UnsupportedPipeline).
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    docs: Vec<Document>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from raw documents, kept as they are.
    pub fn from_documents(docs: impl IntoIterator<Item = Document>) -> Self {
        Self {
            docs: docs.into_iter().collect(),
        }
    }

    /// Builds a store from entries. Entries without an identifier are given a fresh `ObjectId`,
    /// as the server would on insert.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a ArchiveEntry>) -> Result<Self> {
        let docs = entries
            .into_iter()
            .map(|entry| -> Result<Document> {
                let mut doc = bson::to_document(entry)?;
                if !doc.contains_key(fields::ID) {
                    let mut with_id = Document::new();
                    with_id.insert(fields::ID, ObjectId::new());
                    for (key, value) in doc {
                        with_id.insert(key, value);
                    }
                    doc = with_id;
                }
                Ok(doc)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { docs })
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Evaluates `pipeline` over the stored documents.
    pub fn run_pipeline(&self, pipeline: &[Document]) -> Result<Vec<Document>> {
        pipeline
            .iter()
            .try_fold(self.docs.clone(), |docs, stage| apply_stage(stage, docs))
    }
}

#[async_trait]
impl EntryStore for MemoryStore {
    async fn fetch_entries(&self) -> Result<Vec<ArchiveEntry>> {
        self.docs
            .iter()
            .map(|doc| bson::from_document(doc.clone()).map_err(Error::from))
            .collect()
    }

    async fn aggregate(&self, pipeline: Vec<Document>) -> Result<Vec<Document>> {
        self.run_pipeline(&pipeline)
    }

    fn describe(&self) -> String {
        format!("memory ({} documents)", self.docs.len())
    }
}

fn apply_stage(stage: &Document, docs: Vec<Document>) -> Result<Vec<Document>> {
    let mut iter = stage.iter();
    let (name, body) = match (iter.next(), iter.next()) {
        (Some(only), None) => only,
        _ => {
            return Err(Error::unsupported_pipeline(format!(
                "a pipeline stage must have exactly one field, got {stage}"
            )))
        }
    };

    match name.as_str() {
        "$project" => {
            let body = as_document(name, body)?;
            docs.iter().map(|doc| project(body, doc)).collect()
        }
        "$group" => group(as_document(name, body)?, &docs),
        "$limit" => {
            let n = as_count(name, body)?;
            Ok(docs.into_iter().take(n).collect())
        }
        "$skip" => {
            let n = as_count(name, body)?;
            Ok(docs.into_iter().skip(n).collect())
        }
        other => Err(Error::unsupported_pipeline(format!(
            "stage {other} is not supported"
        ))),
    }
}

fn as_document<'a>(stage: &str, body: &'a Bson) -> Result<&'a Document> {
    body.as_document().ok_or_else(|| {
        Error::unsupported_pipeline(format!("{stage} requires a document, got {body}"))
    })
}

fn as_count(stage: &str, body: &Bson) -> Result<usize> {
    match Number::from_bson(body) {
        Some(Number::Int(n)) if n >= 0 => Ok(n as usize),
        Some(Number::Double(f)) if f >= 0.0 && f.fract() == 0.0 => Ok(f as usize),
        _ => Err(Error::unsupported_pipeline(format!(
            "{stage} requires a non-negative integer, got {body}"
        ))),
    }
}

fn project(body: &Document, doc: &Document) -> Result<Document> {
    let mut include_id = true;
    let mut excluded = Vec::new();
    let mut computed = Document::new();

    for (key, value) in body {
        match flag(value) {
            Some(false) if key == fields::ID => include_id = false,
            Some(false) => excluded.push(key.as_str()),
            Some(true) => {
                if let Some(v) = resolve_path(doc, key) {
                    computed.insert(key.clone(), v);
                }
            }
            None => {
                if let Some(v) = evaluate(value, doc)? {
                    computed.insert(key.clone(), v);
                }
            }
        }
    }

    if !excluded.is_empty() {
        if !computed.is_empty() {
            return Err(Error::unsupported_pipeline(
                "$project cannot mix exclusions with inclusions or computed fields",
            ));
        }
        let mut out = doc.clone();
        for key in excluded {
            out.remove(key);
        }
        if !include_id {
            out.remove(fields::ID);
        }
        return Ok(out);
    }

    let mut out = Document::new();
    if include_id && !computed.contains_key(fields::ID) {
        if let Some(id) = doc.get(fields::ID) {
            out.insert(fields::ID, id.clone());
        }
    }
    for (key, value) in computed {
        out.insert(key, value);
    }
    Ok(out)
}

/// Interprets a `$project` value as an inclusion or exclusion flag, if it is one.
fn flag(value: &Bson) -> Option<bool> {
    match value {
        Bson::Boolean(b) => Some(*b),
        Bson::Int32(n) => Some(*n != 0),
        Bson::Int64(n) => Some(*n != 0),
        Bson::Double(f) => Some(*f != 0.0),
        _ => None,
    }
}

fn group(body: &Document, docs: &[Document]) -> Result<Vec<Document>> {
    let key_expr = body.get(fields::ID).ok_or_else(|| {
        Error::unsupported_pipeline("$group requires an _id expression")
    })?;

    let mut accumulators = Vec::new();
    for (field, acc) in body.iter().filter(|(k, _)| k.as_str() != fields::ID) {
        let operand = acc
            .as_document()
            .and_then(|acc| match acc.iter().next() {
                Some((op, operand)) if acc.len() == 1 && op == "$sum" => Some(operand),
                _ => None,
            })
            .ok_or_else(|| {
                Error::unsupported_pipeline(format!(
                    "$group accumulator {field} must be {{ $sum: <expression> }}, got {acc}"
                ))
            })?;
        accumulators.push((field.as_str(), operand));
    }

    let mut groups: Vec<(Bson, Vec<Number>)> = Vec::new();
    for doc in docs {
        let key = evaluate(key_expr, doc)?.unwrap_or(Bson::Null);
        let index = match groups.iter().position(|(k, _)| *k == key) {
            Some(index) => index,
            None => {
                groups.push((key, vec![Number::Int(0); accumulators.len()]));
                groups.len() - 1
            }
        };
        for (total, (_, operand)) in groups[index].1.iter_mut().zip(&accumulators) {
            // Non-numeric values, arrays included, are ignored by a $sum accumulator.
            if let Some(n) = evaluate(operand, doc)?.as_ref().and_then(Number::from_bson) {
                *total = total.add(n);
            }
        }
    }

    Ok(groups
        .into_iter()
        .map(|(key, totals)| {
            let mut out = Document::new();
            out.insert(fields::ID, key);
            for ((field, _), total) in accumulators.iter().zip(totals) {
                out.insert(*field, total.into_bson());
            }
            out
        })
        .collect())
}

/// Evaluates an aggregation expression against `doc`. `None` means the expression resolved to a
/// missing field.
fn evaluate(expr: &Bson, doc: &Document) -> Result<Option<Bson>> {
    match expr {
        Bson::String(s) if s.starts_with("$$") => Err(Error::unsupported_pipeline(format!(
            "variable {s} is not supported"
        ))),
        Bson::String(s) if s.starts_with('$') => Ok(resolve_path(doc, &s[1..])),
        Bson::Document(operator) if operator.keys().any(|k| k.starts_with('$')) => {
            let mut iter = operator.iter();
            match (iter.next(), iter.next()) {
                (Some((op, operand)), None) if op == "$sum" => sum_expression(operand, doc),
                (Some((op, operand)), None) if op == "$literal" => Ok(Some(operand.clone())),
                _ => Err(Error::unsupported_pipeline(format!(
                    "expression {operator} is not supported"
                ))),
            }
        }
        Bson::Document(nested) => {
            let mut out = Document::new();
            for (key, value) in nested {
                if let Some(v) = evaluate(value, doc)? {
                    out.insert(key.clone(), v);
                }
            }
            Ok(Some(Bson::Document(out)))
        }
        literal => Ok(Some(literal.clone())),
    }
}

/// `$sum` as an expression: a single array operand is summed element-wise, a list of operands
/// is summed operand by operand, and non-numeric values count as nothing.
fn sum_expression(operand: &Bson, doc: &Document) -> Result<Option<Bson>> {
    let values = match operand {
        Bson::Array(operands) => operands
            .iter()
            .map(|operand| evaluate(operand, doc))
            .collect::<Result<Vec<_>>>()?,
        operand => match evaluate(operand, doc)? {
            Some(Bson::Array(elements)) => elements.into_iter().map(Some).collect(),
            value => vec![value],
        },
    };

    let total = values
        .iter()
        .flatten()
        .filter_map(Number::from_bson)
        .fold(Number::Int(0), Number::add);
    Ok(Some(total.into_bson()))
}

/// Resolves a dotted field path. Traversing an array maps the rest of the path over its
/// document elements, so `Documents.PageCount` yields the array of every document's page count.
fn resolve_path(doc: &Document, path: &str) -> Option<Bson> {
    let segments: Vec<&str> = path.split('.').collect();
    resolve(doc, &segments)
}

fn resolve(doc: &Document, segments: &[&str]) -> Option<Bson> {
    let (first, rest) = segments.split_first()?;
    let value = doc.get(*first)?;
    if rest.is_empty() {
        return Some(value.clone());
    }
    match value {
        Bson::Document(child) => resolve(child, rest),
        Bson::Array(elements) => Some(Bson::Array(
            elements
                .iter()
                .filter_map(|element| element.as_document().and_then(|d| resolve(d, rest)))
                .collect(),
        )),
        _ => None,
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Number {
    Int(i64),
    Double(f64),
}

impl Number {
    fn from_bson(value: &Bson) -> Option<Self> {
        match value {
            Bson::Int32(n) => Some(Number::Int(i64::from(*n))),
            Bson::Int64(n) => Some(Number::Int(*n)),
            Bson::Double(f) => Some(Number::Double(*f)),
            _ => None,
        }
    }

    fn add(self, other: Number) -> Number {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => match a.checked_add(b) {
                Some(sum) => Number::Int(sum),
                None => Number::Double(a as f64 + b as f64),
            },
            (a, b) => Number::Double(a.as_f64() + b.as_f64()),
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Double(f) => f,
        }
    }

    /// Integers that fit are reported as `Int32`, matching what the server returns for sums of
    /// 32-bit values.
    fn into_bson(self) -> Bson {
        match self {
            Number::Int(n) => match i32::try_from(n) {
                Ok(small) => Bson::Int32(small),
                Err(_) => Bson::Int64(n),
            },
            Number::Double(f) => Bson::Double(f),
        }
    }
}
