//! Structural checks of a loaded document against the OpenAPI meta-model.
//!
//! Nothing here is fatal: real-world documents routinely violate a rule or
//! two without affecting field extraction, so the loader logs every issue
//! and carries on with the document as-is.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::models::{
    component_name, Components, OpenAPI, Operation, Parameter, ReferenceOr, Schema,
};

static PATH_TEMPLATE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([^{}/]+)\}").unwrap());

const PARAMETER_LOCATIONS: [&str; 4] = ["path", "query", "header", "cookie"];

/// A single rule violation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    /// Where the issue occurred (e.g. "paths./pets.get", "info")
    pub location: String,
    pub message: String,
}

impl ValidationIssue {
    fn new(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

/// Type checks on the raw input for scalars the typed model accepts in any
/// form, such as an unquoted YAML `version: 1.0`
pub fn validate_raw(raw: &Value) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    for key in ["openapi", "swagger"] {
        expect_string(raw.get(key), key, &mut issues);
    }
    expect_string(raw.pointer("/info/title"), "info.title", &mut issues);
    expect_string(raw.pointer("/info/version"), "info.version", &mut issues);

    let servers = raw.get("servers").and_then(Value::as_array);
    for (index, server) in servers.into_iter().flatten().enumerate() {
        expect_string(server.get("url"), &format!("servers[{}].url", index), &mut issues);
        let variables = server.get("variables").and_then(Value::as_object);
        for (name, variable) in variables.into_iter().flatten() {
            expect_string(
                variable.get("default"),
                &format!("servers[{}].variables.{}.default", index, name),
                &mut issues,
            );
        }
    }

    issues
}

fn expect_string(value: Option<&Value>, location: &str, issues: &mut Vec<ValidationIssue>) {
    match value {
        None | Some(Value::String(_)) => {}
        Some(other) => issues.push(ValidationIssue::new(
            location,
            format!("expected a string, found {}", kind_of(other)),
        )),
    }
}

/// Human-readable JSON type name
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Runs every structural check and returns the issues found
pub fn validate(doc: &OpenAPI) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if !doc.openapi.starts_with('3') {
        issues.push(ValidationIssue::new(
            "openapi",
            format!("unsupported version {:?}, expected 3.x", doc.openapi),
        ));
    }
    if doc.info.title.trim().is_empty() {
        issues.push(ValidationIssue::new("info.title", "must not be empty"));
    }
    if doc.info.version.trim().is_empty() {
        issues.push(ValidationIssue::new("info.version", "must not be empty"));
    }

    for (index, server) in doc.servers.iter().enumerate() {
        if server.url.trim().is_empty() {
            issues.push(ValidationIssue::new(
                format!("servers[{}].url", index),
                "must not be empty",
            ));
        }
    }

    for (index, tag) in doc.tags.iter().enumerate() {
        if tag.name.trim().is_empty() {
            issues.push(ValidationIssue::new(
                format!("tags[{}].name", index),
                "must not be empty",
            ));
        }
    }

    let mut operation_ids: HashMap<&str, String> = HashMap::new();
    let mut refs = Vec::new();

    for (path, item) in &doc.paths {
        if !path.starts_with('/') {
            issues.push(ValidationIssue::new(
                format!("paths.{}", path),
                "path must begin with '/'",
            ));
        }
        check_parameters(&item.parameters, &format!("paths.{}", path), &mut issues);

        let templated: BTreeSet<&str> = PATH_TEMPLATE_REGEX
            .captures_iter(path)
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .collect();

        for (method, op) in item.operations() {
            let location = format!("paths.{}.{}", path, method);

            check_parameters(&op.parameters, &location, &mut issues);

            if op.responses.is_empty() {
                issues.push(ValidationIssue::new(
                    location.clone(),
                    "operation declares no responses",
                ));
            }

            if let Some(id) = op.operationId.as_deref() {
                if let Some(previous) = operation_ids.insert(id, location.clone()) {
                    issues.push(ValidationIssue::new(
                        location.clone(),
                        format!("operationId {:?} already used by {}", id, previous),
                    ));
                }
            }

            let params: Vec<&Parameter> = item
                .parameters
                .iter()
                .chain(op.parameters.iter())
                .filter_map(|p| resolve_parameter(p, doc.components.as_ref()))
                .collect();

            for param in params.iter().filter(|p| p.in_type == "path") {
                if param.required != Some(true) {
                    issues.push(ValidationIssue::new(
                        location.clone(),
                        format!("path parameter {:?} must be required", param.name),
                    ));
                }
                if !templated.contains(param.name.as_str()) {
                    issues.push(ValidationIssue::new(
                        location.clone(),
                        format!("path parameter {:?} is not in the path template", param.name),
                    ));
                }
            }

            for name in &templated {
                let declared = params
                    .iter()
                    .any(|p| p.in_type == "path" && p.name == *name);
                if !declared {
                    issues.push(ValidationIssue::new(
                        location.clone(),
                        format!("path template parameter {:?} is not declared", name),
                    ));
                }
            }

            let mut found = Vec::new();
            let schemas = operation_schemas(
                item.parameters.iter().chain(op.parameters.iter()),
                op,
                &mut found,
            );
            for schema in schemas {
                collect_schema_refs(schema, &mut found);
                check_schema(schema, &location, &mut issues);
            }
            refs.extend(found.into_iter().map(|r| (location.clone(), r)));
        }
    }

    if let Some(components) = &doc.components {
        for (name, schema) in &components.schemas {
            let location = format!("components.schemas.{}", name);
            let mut found = Vec::new();
            collect_schema_refs(schema, &mut found);
            check_schema(schema, &location, &mut issues);
            refs.extend(found.into_iter().map(|r| (location.clone(), r)));
        }

        for (name, param) in &components.parameters {
            if let ReferenceOr::Item(param) = param {
                check_parameter(param, &format!("components.parameters.{}", name), &mut issues);
            }
        }

        for (name, scheme) in &components.securitySchemes {
            if let ReferenceOr::Item(scheme) = scheme {
                if scheme.type_.trim().is_empty() {
                    issues.push(ValidationIssue::new(
                        format!("components.securitySchemes.{}.type", name),
                        "must not be empty",
                    ));
                }
            }
        }
    }

    for (location, reference) in refs {
        if !ref_exists(doc.components.as_ref(), &reference) {
            issues.push(ValidationIssue::new(
                location,
                format!("unresolved reference {}", reference),
            ));
        }
    }

    issues
}

fn resolve_parameter<'a>(
    param: &'a ReferenceOr<Parameter>,
    components: Option<&'a Components>,
) -> Option<&'a Parameter> {
    match param {
        ReferenceOr::Item(p) => Some(p),
        ReferenceOr::Reference { reference } => components?.parameter(reference),
    }
}

fn check_parameters(
    params: &[ReferenceOr<Parameter>],
    location: &str,
    issues: &mut Vec<ValidationIssue>,
) {
    for (index, param) in params.iter().enumerate() {
        if let ReferenceOr::Item(param) = param {
            check_parameter(param, &format!("{}.parameters[{}]", location, index), issues);
        }
    }
}

fn check_parameter(param: &Parameter, location: &str, issues: &mut Vec<ValidationIssue>) {
    if param.name.trim().is_empty() {
        issues.push(ValidationIssue::new(location, "parameter has no name"));
    }
    if !PARAMETER_LOCATIONS.contains(&param.in_type.as_str()) {
        issues.push(ValidationIssue::new(
            location,
            format!(
                "parameter {:?} has invalid location {:?}",
                param.name, param.in_type
            ),
        ));
    }
}

/// `required` must list property names at every nesting level
fn check_schema(schema: &Schema, location: &str, issues: &mut Vec<ValidationIssue>) {
    walk_schema(schema, &mut |s: &Schema| {
        let Some(required) = &s.required else {
            return;
        };
        let names = required
            .as_array()
            .map_or(false, |entries| entries.iter().all(Value::is_string));
        if !names {
            issues.push(ValidationIssue::new(
                location,
                format!("required must list property names, found {}", required),
            ));
        }
    });
}

/// Inline schemas of an operation's parameters, body and responses. `$ref`
/// parameters, bodies and responses are pushed onto `refs` instead.
fn operation_schemas<'a>(
    params: impl Iterator<Item = &'a ReferenceOr<Parameter>>,
    op: &'a Operation,
    refs: &mut Vec<String>,
) -> Vec<&'a Schema> {
    let mut schemas = Vec::new();

    for param in params {
        match param {
            ReferenceOr::Reference { reference } => refs.push(reference.clone()),
            ReferenceOr::Item(p) => schemas.extend(p.schema.as_ref()),
        }
    }

    match &op.requestBody {
        Some(ReferenceOr::Reference { reference }) => refs.push(reference.clone()),
        Some(ReferenceOr::Item(body)) => {
            schemas.extend(body.content.values().filter_map(|m| m.schema.as_ref()));
        }
        None => {}
    }

    for response in op.responses.values() {
        match response {
            ReferenceOr::Reference { reference } => refs.push(reference.clone()),
            ReferenceOr::Item(r) => {
                schemas.extend(r.content.values().filter_map(|m| m.schema.as_ref()));
            }
        }
    }

    schemas
}

/// Recursively collects every `$ref` reachable from a schema
pub fn collect_schema_refs(schema: &Schema, refs: &mut Vec<String>) {
    walk_schema(schema, &mut |s: &Schema| {
        if let Some(reference) = &s.ref_ {
            refs.push(reference.clone());
        }
    });
}

/// Visits `schema` and every subschema nested below it
fn walk_schema<F: FnMut(&Schema)>(schema: &Schema, visit: &mut F) {
    visit(schema);

    if let Some(items) = &schema.items {
        walk_schema(items, visit);
    }

    for property in schema.properties.values() {
        walk_schema(property, visit);
    }

    for group in [&schema.allOf, &schema.anyOf, &schema.oneOf].into_iter().flatten() {
        for member in group {
            walk_schema(member, visit);
        }
    }

    if let Some(not) = &schema.not {
        walk_schema(not, visit);
    }

    if let Some(additional) = &schema.additionalProperties {
        if let Ok(nested) = serde_json::from_value::<Schema>(additional.clone()) {
            walk_schema(&nested, visit);
        }
    }
}

/// Whether a local component pointer names an existing entry. Pointers
/// outside `#/components/` are not checked.
fn ref_exists(components: Option<&Components>, reference: &str) -> bool {
    if !reference.starts_with("#/components/") {
        return true;
    }
    let Some(components) = components else {
        return false;
    };

    if let Some(name) = component_name(reference, "schemas") {
        components.schemas.contains_key(&name)
    } else if let Some(name) = component_name(reference, "responses") {
        components.responses.contains_key(&name)
    } else if let Some(name) = component_name(reference, "parameters") {
        components.parameters.contains_key(&name)
    } else if let Some(name) = component_name(reference, "requestBodies") {
        components.requestBodies.contains_key(&name)
    } else if let Some(name) = component_name(reference, "securitySchemes") {
        components.securitySchemes.contains_key(&name)
    } else {
        true
    }
}
