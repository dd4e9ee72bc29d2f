//! # In-Memory Metadata Service
//!
//! An in-process implementation of the metadata wire semantics.
//!
//! Executes `+`/`-`/replace directives literally, maintains the
//! `<field>-lastchanged` and `lastchanged` fields, and counts queries.
//! Used wherever a real service process is unnecessary.

use crate::primitives::{LASTCHANGED_SUFFIX, STORE_LAYOUT, is_reserved};
use crate::protocol::{Directive, MetadataService, Request, Response, WireFields};
use crate::{AlbuminError, ContentKey};
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};

type Fields = BTreeMap<String, BTreeSet<String>>;

/// Metadata records held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryService {
    records: BTreeMap<ContentKey, Fields>,
    queries: Vec<Request>,
}

impl MemoryService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record field, bypassing the protocol (and `lastchanged`).
    #[must_use]
    pub fn with_field(mut self, key: &ContentKey, field: &str, values: &[&str]) -> Self {
        let entry = self
            .records
            .entry(key.clone())
            .or_default()
            .entry(field.to_string())
            .or_default();
        entry.extend(values.iter().map(|v| (*v).to_string()));
        self
    }

    /// Current values of one field, without going through the protocol.
    #[must_use]
    pub fn values(&self, key: &ContentKey, field: &str) -> Vec<String> {
        self.records
            .get(key)
            .and_then(|fields| fields.get(field))
            .map(|values| values.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Every request received so far, in order.
    #[must_use]
    pub fn queries(&self) -> &[Request] {
        &self.queries
    }

    /// Requests that carried write directives.
    #[must_use]
    pub fn writes(&self) -> Vec<&Request> {
        self.queries.iter().filter(|r| !r.is_read()).collect()
    }

    fn apply(&mut self, request: &Request) -> Result<(), AlbuminError> {
        // A refused request leaves the record untouched.
        if let Some(field) = request
            .fields
            .keys()
            .map(|name| Directive::parse(name).field())
            .find(|field| is_reserved(field))
        {
            return Err(AlbuminError::protocol(
                format!("{field} is read-only"),
                serde_json::to_string(request).unwrap_or_default(),
            ));
        }

        let fields = self.records.entry(request.key.clone()).or_default();
        let mut changed = BTreeSet::new();

        for (name, values) in &request.fields {
            let directive = Directive::parse(name);
            let field = directive.field();
            let current = fields.entry(field.to_string()).or_default();
            let before = current.clone();
            match directive {
                Directive::Add(_) => current.extend(values.iter().cloned()),
                Directive::Remove(_) => {
                    for value in values {
                        current.remove(value);
                    }
                }
                Directive::Replace(_) => *current = values.iter().cloned().collect(),
            }
            if *current != before {
                changed.insert(field.to_string());
            }
        }

        if !changed.is_empty() {
            let stamp = Utc::now().format(STORE_LAYOUT).to_string();
            for field in changed {
                fields.insert(
                    format!("{field}-{LASTCHANGED_SUFFIX}"),
                    BTreeSet::from([stamp.clone()]),
                );
            }
            fields.insert(LASTCHANGED_SUFFIX.to_string(), BTreeSet::from([stamp]));
        }
        fields.retain(|_, values| !values.is_empty());
        Ok(())
    }
}

impl MetadataService for MemoryService {
    fn query(&mut self, request: &Request) -> Result<Response, AlbuminError> {
        self.queries.push(request.clone());
        if !request.is_read() {
            self.apply(request)?;
        }
        let fields: WireFields = self
            .records
            .get(&request.key)
            .map(|fields| {
                fields
                    .iter()
                    .map(|(name, values)| (name.clone(), values.iter().cloned().collect()))
                    .collect()
            })
            .unwrap_or_default();
        Ok(Response::ok(request.key.clone(), fields))
    }
}
