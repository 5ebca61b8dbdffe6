#![allow(non_snake_case)]

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// HTTP verbs an OpenAPI path item can carry, in document order
pub const HTTP_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// Represents a complete OpenAPI 3.x document
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct OpenAPI {
    #[serde(default, deserialize_with = "string_or_scalar")]
    pub openapi: String,
    #[serde(default)]
    pub info: Info,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub servers: Vec<Server>,
    #[serde(
        skip_serializing_if = "BTreeMap::is_empty",
        default,
        deserialize_with = "deserialize_paths"
    )]
    pub paths: BTreeMap<String, PathItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Components>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub security: Vec<BTreeMap<String, Vec<String>>>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<Tag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub externalDocs: Option<ExternalDocs>,
    /// `webhooks`, `x-*` extensions and any other top-level key, kept untyped
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

/// Either a `$ref` pointer or an inline object
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum ReferenceOr<T> {
    Reference {
        #[serde(rename = "$ref")]
        reference: String,
    },
    Item(T),
}

impl<T> ReferenceOr<T> {
    pub fn reference(reference: impl Into<String>) -> Self {
        ReferenceOr::Reference {
            reference: reference.into(),
        }
    }

    pub fn as_item(&self) -> Option<&T> {
        match self {
            ReferenceOr::Item(item) => Some(item),
            ReferenceOr::Reference { .. } => None,
        }
    }

    pub fn as_reference(&self) -> Option<&str> {
        match self {
            ReferenceOr::Reference { reference } => Some(reference),
            ReferenceOr::Item(_) => None,
        }
    }
}

/// Server object used for API endpoints
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Server {
    #[serde(default)]
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub variables: BTreeMap<String, ServerVariable>,
}

/// Server variable for templated server URLs
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ServerVariable {
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "string_or_scalar")]
    pub default: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Components object for reusable components
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Components {
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub schemas: BTreeMap<String, Schema>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub responses: BTreeMap<String, ReferenceOr<Response>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub parameters: BTreeMap<String, ReferenceOr<Parameter>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub requestBodies: BTreeMap<String, ReferenceOr<RequestBody>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub securitySchemes: BTreeMap<String, ReferenceOr<SecurityScheme>>,
    /// headers, examples, links, callbacks and friends; not consumed
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Request body object
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct RequestBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub content: BTreeMap<String, MediaType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
}

/// Media type object
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct MediaType {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub examples: BTreeMap<String, Value>,
}

/// Information about the API
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Info {
    #[serde(default, deserialize_with = "string_or_scalar")]
    pub title: String,
    #[serde(default, deserialize_with = "string_or_scalar")]
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub termsOfService: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// Contact information for the API
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Contact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// License information for the API
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct License {
    #[serde(default)]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
}

/// External documentation for the API
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ExternalDocs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub url: String,
}

/// Tag information for API operations
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Tag {
    #[serde(default)]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub externalDocs: Option<ExternalDocs>,
}

/// A single path item with all its operations
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct PathItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Operation>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub servers: Vec<Server>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub parameters: Vec<ReferenceOr<Parameter>>,
}

impl PathItem {
    pub fn operation(&self, method: &str) -> Option<&Operation> {
        match method {
            "get" => self.get.as_ref(),
            "put" => self.put.as_ref(),
            "post" => self.post.as_ref(),
            "delete" => self.delete.as_ref(),
            "options" => self.options.as_ref(),
            "head" => self.head.as_ref(),
            "patch" => self.patch.as_ref(),
            "trace" => self.trace.as_ref(),
            _ => None,
        }
    }

    pub fn operation_mut(&mut self, method: &str) -> Option<&mut Option<Operation>> {
        match method {
            "get" => Some(&mut self.get),
            "put" => Some(&mut self.put),
            "post" => Some(&mut self.post),
            "delete" => Some(&mut self.delete),
            "options" => Some(&mut self.options),
            "head" => Some(&mut self.head),
            "patch" => Some(&mut self.patch),
            "trace" => Some(&mut self.trace),
            _ => None,
        }
    }

    /// Every defined operation paired with its lowercase verb
    pub fn operations(&self) -> impl Iterator<Item = (&'static str, &Operation)> {
        HTTP_METHODS
            .iter()
            .filter_map(move |method| self.operation(method).map(|op| (*method, op)))
    }
}

/// An operation (endpoint) of the API
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Operation {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub externalDocs: Option<ExternalDocs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operationId: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub parameters: Vec<ReferenceOr<Parameter>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requestBody: Option<ReferenceOr<RequestBody>>,
    #[serde(default)]
    pub responses: BTreeMap<String, ReferenceOr<Response>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub security: Vec<BTreeMap<String, Vec<String>>>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub servers: Vec<Server>,
}

/// Parameter for an operation
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Parameter {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "in", default)]
    pub in_type: String, // path, query, header, cookie
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub content: BTreeMap<String, MediaType>,
}

/// API response
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Response {
    #[serde(default, deserialize_with = "string_or_scalar")]
    pub description: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub headers: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub content: BTreeMap<String, MediaType>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub links: BTreeMap<String, Value>,
}

/// JSON Schema as used by OpenAPI. Keywords the converter never inspects
/// are carried through `extra` untouched.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Schema {
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub ref_: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<Value>, // Can be a string or array of strings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readOnly: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub writeOnly: Option<bool>,
    /// Property names; other shapes (Swagger's per-property `true`) are
    /// kept as written and reported by validation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Value>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub properties: BTreeMap<String, Box<Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additionalProperties: Option<Value>, // Can be a boolean or Schema
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allOf: Option<Vec<Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anyOf: Option<Vec<Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oneOf: Option<Vec<Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not: Option<Box<Schema>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Schema {
    pub fn reference(target: impl Into<String>) -> Self {
        Self {
            ref_: Some(target.into()),
            ..Default::default()
        }
    }

    pub fn of_type(type_name: &str) -> Self {
        Self {
            type_: Some(Value::String(type_name.to_string())),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Schema::default()
    }
}

/// Security scheme object
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct SecurityScheme {
    #[serde(rename = "type", default)]
    pub type_: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "in")]
    pub in_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearerFormat: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flows: Option<OAuthFlows>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openIdConnectUrl: Option<String>,
}

/// OAuth Flows Object
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct OAuthFlows {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implicit: Option<OAuthFlow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<OAuthFlow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clientCredentials: Option<OAuthFlow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorizationCode: Option<OAuthFlow>,
}

/// OAuth Flow Object
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct OAuthFlow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorizationUrl: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokenUrl: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refreshUrl: Option<String>,
    #[serde(default)]
    pub scopes: BTreeMap<String, String>,
}

impl Components {
    pub fn parameter(&self, reference: &str) -> Option<&Parameter> {
        let name = component_name(reference, "parameters")?;
        self.parameters.get(&name)?.as_item()
    }

    pub fn response(&self, reference: &str) -> Option<&Response> {
        let name = component_name(reference, "responses")?;
        self.responses.get(&name)?.as_item()
    }

    pub fn security_scheme(&self, reference: &str) -> Option<&SecurityScheme> {
        let name = component_name(reference, "securitySchemes")?;
        self.securitySchemes.get(&name)?.as_item()
    }
}

/// Accepts a string or an unquoted scalar such as YAML's `version: 1.0`.
/// Null and structured values decode as empty.
pub fn string_or_scalar<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

/// Decodes a Paths object one entry at a time. `x-` extension keys are
/// ignored and an entry that fails to decode is logged and skipped.
pub fn deserialize_paths<'de, D, T>(deserializer: D) -> Result<BTreeMap<String, T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
    let mut paths = BTreeMap::new();

    for (path, entry) in raw {
        if path.starts_with("x-") {
            debug!("Ignoring paths extension {}", path);
            continue;
        }
        match serde_json::from_value(entry) {
            Ok(item) => {
                paths.insert(path, item);
            }
            Err(e) => warn!("Skipping malformed path item {}: {}", path, e),
        }
    }

    Ok(paths)
}

/// Builds the local pointer `#/components/<section>/<name>`
pub fn component_ref(section: &str, name: &str) -> String {
    format!(
        "#/components/{}/{}",
        section,
        name.replace('~', "~0").replace('/', "~1")
    )
}

/// Extracts the component name from a local pointer into `section`,
/// undoing JSON pointer escaping
pub fn component_name(reference: &str, section: &str) -> Option<String> {
    let prefix = format!("#/components/{}/", section);
    let name = reference.strip_prefix(&prefix)?;
    if name.is_empty() || name.contains('/') {
        return None;
    }
    Some(name.replace("~1", "/").replace("~0", "~"))
}
