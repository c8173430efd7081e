//! Entry points accepting case blocks in any supported form.

use std::borrow::Cow;

use case_xml::{element_to_json, xml_to_json_with, ConvertOptions};
use roxmltree::Node;
use serde_json::Value;

use crate::delta::Delta;
use crate::error::{CaseError, ParsingError};
use crate::merge::merge_deltas;
use crate::model::Transaction;
use crate::projection::project;
use crate::schema::kind_of;

/// A case block in one of the accepted representations.
#[derive(Debug, Clone)]
pub enum CaseInput<'a, 'input> {
    /// Generic mapping with `@`-prefixed attribute keys.
    Mapping(Value),
    /// Raw case XML.
    Markup(Cow<'a, str>),
    /// An already parsed `<case>` element.
    Tree(Node<'a, 'input>),
    /// A block that has already been validated.
    Parsed(Transaction),
}

impl From<Value> for CaseInput<'_, '_> {
    /// JSON strings are taken as markup.
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => CaseInput::Markup(Cow::Owned(text)),
            other => CaseInput::Mapping(other),
        }
    }
}

impl<'a> From<&'a str> for CaseInput<'a, '_> {
    fn from(text: &'a str) -> Self {
        CaseInput::Markup(Cow::Borrowed(text))
    }
}

impl<'a> From<&'a String> for CaseInput<'a, '_> {
    fn from(text: &'a String) -> Self {
        CaseInput::Markup(Cow::Borrowed(text.as_str()))
    }
}

impl From<String> for CaseInput<'_, '_> {
    fn from(text: String) -> Self {
        CaseInput::Markup(Cow::Owned(text))
    }
}

impl<'a, 'input> From<Node<'a, 'input>> for CaseInput<'a, 'input> {
    fn from(node: Node<'a, 'input>) -> Self {
        CaseInput::Tree(node)
    }
}

impl From<Transaction> for CaseInput<'_, '_> {
    fn from(transaction: Transaction) -> Self {
        CaseInput::Parsed(transaction)
    }
}

/// Validates a case block given in any supported form.
pub fn parse_casexml<'a, 'input: 'a>(
    input: impl Into<CaseInput<'a, 'input>>,
) -> Result<Transaction, ParsingError> {
    match input.into() {
        CaseInput::Mapping(value) => parse_casexml_json(value),
        CaseInput::Markup(text) => parse_casexml_string(&text),
        CaseInput::Tree(node) => parse_casexml_tree(node),
        CaseInput::Parsed(transaction) => Ok(transaction),
    }
}

/// Validates a generic case mapping.
pub fn parse_casexml_json(value: Value) -> Result<Transaction, ParsingError> {
    if !value.is_object() {
        let kind = kind_of(&value);
        tracing::debug!(kind, "unsupported case input");
        return Err(ParsingError::UnsupportedInput { kind });
    }
    Transaction::from_json(value).map_err(|err| {
        tracing::debug!(field = err.field(), error = %err, "rejected case block");
        ParsingError::from(err)
    })
}

/// Converts and validates raw case XML.
pub fn parse_casexml_string(text: &str) -> Result<Transaction, ParsingError> {
    parse_casexml_string_with(text, &ConvertOptions::default())
}

pub fn parse_casexml_string_with(
    text: &str,
    opts: &ConvertOptions,
) -> Result<Transaction, ParsingError> {
    let (_, value) = xml_to_json_with(text, opts).map_err(|err| {
        tracing::debug!(error = %err, "rejected case markup");
        ParsingError::from(err)
    })?;
    parse_casexml_json(value)
}

/// Converts and validates a parsed `<case>` element.
pub fn parse_casexml_tree(node: Node<'_, '_>) -> Result<Transaction, ParsingError> {
    let (_, value) = element_to_json(node);
    parse_casexml_json(value)
}

/// Parses `input` (unless it is already a [`Transaction`]) and projects it.
pub fn case_delta<'a, 'input: 'a>(
    input: impl Into<CaseInput<'a, 'input>>,
) -> Result<Delta, ParsingError> {
    let transaction = parse_casexml(input)?;
    Ok(project(&transaction))
}

/// Parses, projects and merges a chronologically ordered batch of blocks for
/// one case.
pub fn case_delta_all<'a, 'input: 'a, I>(inputs: I) -> Result<Option<Delta>, CaseError>
where
    I: IntoIterator,
    I::Item: Into<CaseInput<'a, 'input>>,
{
    let deltas = inputs
        .into_iter()
        .map(case_delta)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(merge_deltas(deltas)?)
}
