use std::collections::{HashMap, HashSet};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use stream_error::{
    Result, Severity, StreamError, ValidationCategory, ValidationError,
};

/// A compact structural schema for node-by-node validation.
///
/// Schemas are described as XML themselves:
///
/// ```xml
/// <schema root="order">
///   <element name="order">
///     <attribute name="id" required="true" pattern="[0-9]+"/>
///     <child name="item"/>
///   </element>
///   <element name="item">
///     <text pattern="[a-z ]+"/>
///   </element>
/// </schema>
/// ```
///
/// An element without `<child>` entries accepts any children; one with
/// entries accepts only the named ones. Pattern facets are anchored
/// regular expressions applied to attribute values and element text.
#[derive(Debug, Default)]
pub struct Schema {
    root: Option<String>,
    elements: HashMap<String, ElementRule>,
}

#[derive(Debug, Default)]
struct ElementRule {
    children: Option<HashSet<String>>,
    attributes: Vec<AttributeRule>,
    text_pattern: Option<Regex>,
}

#[derive(Debug)]
struct AttributeRule {
    name: String,
    required: bool,
    pattern: Option<Regex>,
}

impl Schema {
    /// Parse a schema description. Malformed descriptions are
    /// configuration errors, not validation errors.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(bytes);
        let mut buf = Vec::new();
        let mut schema = Schema::default();
        let mut current: Option<String> = None;

        loop {
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|err| {
                    StreamError::Config(format!("malformed schema: {err}"))
                })?
                .into_owned();
            match event {
                Event::Eof => break,
                Event::Start(e) => {
                    schema.take_tag(&e, false, &mut current)?;
                }
                Event::Empty(e) => {
                    schema.take_tag(&e, true, &mut current)?;
                }
                Event::End(e) => {
                    if e.name().as_ref() == b"element" {
                        current = None;
                    }
                }
                _ => {}
            }
            buf.clear();
        }
        Ok(schema)
    }

    fn take_tag(
        &mut self,
        tag: &BytesStart,
        empty: bool,
        current: &mut Option<String>,
    ) -> Result<()> {
        let attrs = tag_attributes(tag)?;
        match tag.name().as_ref() {
            b"schema" => {
                self.root = attrs.get("root").cloned();
            }
            b"element" => {
                let name = require_attr(&attrs, "element", "name")?;
                self.elements.entry(name.clone()).or_default();
                if !empty {
                    *current = Some(name);
                }
            }
            b"child" => {
                let name = require_attr(&attrs, "child", "name")?;
                self.rule_mut(current)?
                    .children
                    .get_or_insert_with(HashSet::new)
                    .insert(name);
            }
            b"attribute" => {
                let name = require_attr(&attrs, "attribute", "name")?;
                let required = attrs
                    .get("required")
                    .map(|v| v == "true" || v == "1")
                    .unwrap_or(false);
                let pattern = attrs
                    .get("pattern")
                    .map(|p| compile_pattern(p))
                    .transpose()?;
                self.rule_mut(current)?.attributes.push(AttributeRule {
                    name,
                    required,
                    pattern,
                });
            }
            b"text" => {
                let pattern = require_attr(&attrs, "text", "pattern")?;
                self.rule_mut(current)?.text_pattern =
                    Some(compile_pattern(&pattern)?);
            }
            other => {
                return Err(StreamError::Config(format!(
                    "unknown schema tag `{}`",
                    String::from_utf8_lossy(other)
                )));
            }
        }
        Ok(())
    }

    fn rule_mut(
        &mut self,
        current: &Option<String>,
    ) -> Result<&mut ElementRule> {
        let name = current.as_ref().ok_or_else(|| {
            StreamError::Config(
                "schema facet outside of an element declaration".to_owned(),
            )
        })?;
        Ok(self
            .elements
            .get_mut(name)
            .expect("current element rule must exist"))
    }
}

fn compile_pattern(pattern: &str) -> Result<Regex> {
    // Facets match the whole value, the way schema pattern facets do.
    Regex::new(&format!("^(?:{pattern})$")).map_err(|err| {
        StreamError::Config(format!("invalid pattern facet: {err}"))
    })
}

fn require_attr(
    attrs: &HashMap<String, String>,
    tag: &str,
    name: &str,
) -> Result<String> {
    attrs.get(name).cloned().ok_or_else(|| {
        StreamError::Config(format!(
            "schema tag `{tag}` is missing its `{name}` attribute"
        ))
    })
}

fn tag_attributes(tag: &BytesStart) -> Result<HashMap<String, String>> {
    let mut attrs = HashMap::new();
    for attr in tag.attributes().with_checks(false) {
        let attr = attr.map_err(|err| {
            StreamError::Config(format!("malformed schema: {err}"))
        })?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let raw = String::from_utf8_lossy(&attr.value).into_owned();
        let value = quick_xml::escape::unescape(&raw)
            .map(|v| v.into_owned())
            .unwrap_or(raw);
        attrs.insert(key, value);
    }
    Ok(attrs)
}

/// Collects schema violations while the translator walks the document.
///
/// Violations are captured, never raised at detection time; the engine
/// escalates them in aggregate at end-of-stream.
pub(crate) struct SchemaValidator {
    schema: Schema,
    stack: Vec<String>,
    seen_root: bool,
    errors: Vec<ValidationError>,
}

impl SchemaValidator {
    pub(crate) fn new(schema: Schema) -> Self {
        Self {
            schema,
            stack: Vec::new(),
            seen_root: false,
            errors: Vec::new(),
        }
    }

    pub(crate) fn element_started(
        &mut self,
        local: &str,
        namespace: &str,
        attrs: &[(String, String)],
        empty: bool,
    ) {
        if !self.seen_root {
            self.seen_root = true;
            if let Some(root) = &self.schema.root {
                if root != local {
                    Self::record(
                        &mut self.errors,
                        Severity::Error,
                        ValidationCategory::Structural,
                        local,
                        namespace,
                        "",
                        format!(
                            "document root is `{local}`, expected `{root}`"
                        ),
                    );
                }
            }
        }

        if !self.schema.elements.contains_key(local) {
            Self::record(
                &mut self.errors,
                Severity::Warning,
                ValidationCategory::Structural,
                local,
                namespace,
                "",
                format!("no declaration found for element `{local}`"),
            );
        }

        if let Some(parent) = self.stack.last() {
            if let Some(rule) = self.schema.elements.get(parent) {
                if let Some(children) = &rule.children {
                    if !children.contains(local) {
                        Self::record(
                            &mut self.errors,
                            Severity::Error,
                            ValidationCategory::Structural,
                            local,
                            namespace,
                            "",
                            format!(
                                "element `{local}` is not permitted \
                                 inside `{parent}`"
                            ),
                        );
                    }
                }
            }
        }

        if let Some(rule) = self.schema.elements.get(local) {
            for attr_rule in &rule.attributes {
                let value = attrs
                    .iter()
                    .find(|(name, _)| name == &attr_rule.name)
                    .map(|(_, value)| value.as_str());
                match value {
                    None if attr_rule.required => {
                        Self::record(
                            &mut self.errors,
                            Severity::Error,
                            ValidationCategory::Structural,
                            local,
                            namespace,
                            "",
                            format!(
                                "required attribute `{}` is missing",
                                attr_rule.name
                            ),
                        );
                    }
                    Some(value) => {
                        if let Some(pattern) = &attr_rule.pattern {
                            if !pattern.is_match(value) {
                                Self::record(
                                    &mut self.errors,
                                    Severity::Error,
                                    ValidationCategory::Pattern,
                                    local,
                                    namespace,
                                    value,
                                    format!(
                                        "value of attribute `{}` does \
                                         not match its pattern facet",
                                        attr_rule.name
                                    ),
                                );
                            }
                        }
                    }
                    None => {}
                }
            }
        }

        if !empty {
            self.stack.push(local.to_owned());
        }
    }

    pub(crate) fn text(&mut self, value: &str, namespace: &str) {
        if value.chars().all(|c| matches!(c, ' ' | '\t' | '\r' | '\n')) {
            return;
        }
        let current = match self.stack.last() {
            Some(current) => current,
            None => return,
        };
        if let Some(rule) = self.schema.elements.get(current) {
            if let Some(pattern) = &rule.text_pattern {
                if !pattern.is_match(value.trim()) {
                    Self::record(
                        &mut self.errors,
                        Severity::Error,
                        ValidationCategory::Pattern,
                        current,
                        namespace,
                        value.trim(),
                        format!(
                            "text of element `{current}` does not \
                             match its pattern facet"
                        ),
                    );
                }
            }
        }
    }

    pub(crate) fn element_ended(&mut self) {
        self.stack.pop();
    }

    pub(crate) fn document_ended(&mut self) {
        if let Some(open) = self.stack.last() {
            Self::record(
                &mut self.errors,
                Severity::Error,
                ValidationCategory::Structural,
                open,
                "",
                "",
                format!("document ended inside element `{open}`"),
            );
        }
    }

    pub(crate) fn has_failures(&self) -> bool {
        self.errors
            .iter()
            .any(|err| err.severity == Severity::Error)
    }

    pub(crate) fn warnings_only(&self) -> bool {
        !self.errors.is_empty() && !self.has_failures()
    }

    pub(crate) fn take_errors(&mut self) -> Vec<ValidationError> {
        std::mem::take(&mut self.errors)
    }

    fn record(
        errors: &mut Vec<ValidationError>,
        severity: Severity,
        category: ValidationCategory,
        node_name: &str,
        node_namespace: &str,
        node_value: &str,
        description: String,
    ) {
        log::debug!("validate/{node_name}: {description}");
        errors.push(ValidationError {
            severity,
            node_name: node_name.to_owned(),
            node_namespace: node_namespace.to_owned(),
            node_value: node_value.to_owned(),
            description,
            category,
        });
    }
}
