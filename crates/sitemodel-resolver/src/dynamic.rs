//! Edit-time resolution of dynamic forms.
//!
//! An `accordion` or `leaf-array` with `dynFormSearchKey` renders each item
//! with its static item fields plus the fields of the partial named by the
//! item's search-key value. Partials are resolved the first time a value is
//! seen and reused after that.

use std::{borrow::Cow, collections::HashMap};

use serde_json::Value;
use sitemodel_core::{Field, ModelError, Result, Validator};
use tracing::debug;

use crate::{loader::merge_partial_fields, partials::DynamicPartials};

/// Per-item field selection for one dynamic container.
pub struct DynamicForm<'a> {
    container: &'a Field,
    search_key: &'a str,
    partials: &'a dyn DynamicPartials,
    validator: &'a Validator,
    resolved: HashMap<String, Vec<Field>>,
}

impl<'a> DynamicForm<'a> {
    /// `None` when the container has no search key.
    pub fn new(
        container: &'a Field,
        partials: &'a dyn DynamicPartials,
        validator: &'a Validator,
    ) -> Option<Self> {
        let search_key = container.dyn_form_search_key.as_deref()?;
        Some(Self {
            container,
            search_key,
            partials,
            validator,
            resolved: HashMap::new(),
        })
    }

    pub fn container(&self) -> &Field {
        self.container
    }

    pub fn search_key(&self) -> &str {
        self.search_key
    }

    /// The item's non-empty search-key value.
    ///
    /// Numbers and booleans select the partial named by their text, so a
    /// select option `1` picks partial `1`.
    pub fn discriminator<'v>(&self, item: &'v Value) -> Option<Cow<'v, str>> {
        match item.get(self.search_key)? {
            Value::String(value) if !value.is_empty() => Some(Cow::Borrowed(value.as_str())),
            value @ (Value::Number(_) | Value::Bool(_)) => Some(Cow::Owned(value.to_string())),
            _ => None,
        }
    }

    /// Fields to render for one array item.
    ///
    /// Items without a search-key value get the static item fields. Others
    /// get the static fields followed by the partial's fields whose keys are
    /// not already present.
    pub fn fields_for(&mut self, item: &Value) -> Result<&[Field]> {
        let Some(name) = self.discriminator(item) else {
            return Ok(self.container.fields.as_slice());
        };

        if !self.resolved.contains_key(&*name) {
            let fields = self.resolve(&name)?;
            self.resolved.insert(name.to_string(), fields);
        }
        Ok(self.resolved[&*name].as_slice())
    }

    /// Number of distinct partials resolved so far.
    pub fn resolved_count(&self) -> usize {
        self.resolved.len()
    }

    fn resolve(&self, name: &str) -> Result<Vec<Field>> {
        let raw = self.partials.resolve(name)?.ok_or_else(|| {
            ModelError::partial_not_found(name, format!("Field[key={}]", self.container.key))
        })?;

        let raw = Value::Array(merge_partial_fields(name, raw, self.partials)?);
        self.validator
            .check_fields(&raw, &format!("Dynamic[key={name}]"))?;
        let partial: Vec<Field> = serde_json::from_value(raw)?;

        let mut fields = self.container.fields.clone();
        fields.extend(
            partial
                .into_iter()
                .filter(|field| self.container.child(&field.key).is_none()),
        );

        debug!(
            container = %self.container.key,
            partial = name,
            fields = fields.len(),
            "resolved dynamic form"
        );
        Ok(fields)
    }
}

/// Every container in a field tree that selects fields per item.
pub fn dynamic_containers(fields: &[Field]) -> Vec<&Field> {
    let mut found = Vec::new();
    for field in fields {
        field.walk(&mut |f| {
            if f.dyn_form_search_key.is_some() {
                found.push(f);
            }
        });
    }
    found
}
