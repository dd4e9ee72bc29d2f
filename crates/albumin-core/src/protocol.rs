//! # Wire Protocol
//!
//! Line-oriented JSON messages exchanged with the metadata service.
//!
//! ```text
//! -> {"key":"SHA256E-s1--aa.jpg"}
//! <- {"key":"SHA256E-s1--aa.jpg","fields":{"datetime":["2016-05-01@07-00-00"]}}
//! -> {"key":"SHA256E-s1--aa.jpg","fields":{"datetime+":["2017-01-01@00-00-00"],"datetime-":["2016-05-01@07-00-00"]}}
//! <- {"key":"SHA256E-s1--aa.jpg","fields":{"datetime":["2017-01-01@00-00-00"]}}
//! ```
//!
//! A field name suffixed with `+` adds the listed values, one suffixed with
//! `-` removes them. Diffing is the client's job; the service executes the
//! directives literally and answers with the record's fields afterwards.

use crate::primitives::{ADD_DIRECTIVE, REMOVE_DIRECTIVE};
use crate::{AlbuminError, ContentKey};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Field name → string values, as carried on the wire.
pub type WireFields = BTreeMap<String, Vec<String>>;

// =============================================================================
// REQUEST
// =============================================================================

/// One request line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub key: ContentKey,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: WireFields,
}

impl Request {
    /// A request that only reads the record.
    #[must_use]
    pub fn read(key: ContentKey) -> Self {
        Self {
            key,
            fields: WireFields::new(),
        }
    }

    /// A request that adds and removes values of one field.
    ///
    /// Empty directive lists are left out of the message.
    #[must_use]
    pub fn edit(
        key: ContentKey,
        field: &str,
        add: BTreeSet<String>,
        remove: BTreeSet<String>,
    ) -> Self {
        let mut fields = WireFields::new();
        if !add.is_empty() {
            fields.insert(format!("{field}{ADD_DIRECTIVE}"), add.into_iter().collect());
        }
        if !remove.is_empty() {
            fields.insert(
                format!("{field}{REMOVE_DIRECTIVE}"),
                remove.into_iter().collect(),
            );
        }
        Self { key, fields }
    }

    /// True if the request carries no write directives.
    #[must_use]
    pub fn is_read(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A parsed write directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive<'a> {
    Add(&'a str),
    Remove(&'a str),
    Replace(&'a str),
}

impl<'a> Directive<'a> {
    /// Split a wire field name into its directive and target field.
    #[must_use]
    pub fn parse(name: &'a str) -> Self {
        if let Some(field) = name.strip_suffix(ADD_DIRECTIVE) {
            Directive::Add(field)
        } else if let Some(field) = name.strip_suffix(REMOVE_DIRECTIVE) {
            Directive::Remove(field)
        } else {
            Directive::Replace(name)
        }
    }

    /// The field the directive targets.
    #[must_use]
    pub fn field(&self) -> &'a str {
        match *self {
            Directive::Add(field) | Directive::Remove(field) | Directive::Replace(field) => field,
        }
    }
}

// =============================================================================
// RESPONSE
// =============================================================================

/// One response line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<ContentKey>,
    pub fields: WireFields,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Response {
    /// Build a successful response for `key`.
    #[must_use]
    pub fn ok(key: ContentKey, fields: WireFields) -> Self {
        Self {
            key: Some(key),
            fields,
            success: Some(true),
            note: None,
        }
    }

    /// Current values of `field`, empty if the field is not set.
    #[must_use]
    pub fn values(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Encode a request as one line (without the trailing newline).
pub fn encode_request(request: &Request) -> Result<String, AlbuminError> {
    serde_json::to_string(request)
        .map_err(|e| AlbuminError::protocol(format!("cannot encode request: {e}"), ""))
}

/// Decode one response line.
///
/// Empty lines, undecodable JSON, and responses flagged `success: false`
/// are protocol errors carrying the raw line.
pub fn decode_response(line: &str) -> Result<Response, AlbuminError> {
    let trimmed = line.trim_end_matches(['\r', '\n']);
    if trimmed.trim().is_empty() {
        return Err(AlbuminError::protocol("empty response", line));
    }
    let response: Response = serde_json::from_str(trimmed)
        .map_err(|e| AlbuminError::protocol(format!("undecodable response: {e}"), trimmed))?;
    if response.success == Some(false) {
        let note = response.note.clone().unwrap_or_default();
        return Err(AlbuminError::protocol(
            format!("service reported failure: {note}"),
            trimmed,
        ));
    }
    Ok(response)
}

// =============================================================================
// SERVICE TRAIT
// =============================================================================

/// A metadata service reachable through strictly alternating requests.
///
/// `query` takes `&mut self`: exclusive access for the duration of one call
/// is what keeps responses matched to their requests.
pub trait MetadataService {
    /// Send one request and wait for its response.
    fn query(&mut self, request: &Request) -> Result<Response, AlbuminError>;
}

impl<S: MetadataService + ?Sized> MetadataService for Box<S> {
    fn query(&mut self, request: &Request) -> Result<Response, AlbuminError> {
        (**self).query(request)
    }
}

// =============================================================================
// TESTS
// =============================================================================
