#![allow(non_snake_case)]

//! Swagger 2.0 document model and its upgrade to OpenAPI 3.0.
//!
//! The upgrade first rewrites every `$ref` in the raw document so pointers
//! into `definitions`, `parameters` and `responses` land in the matching
//! `components` section, then decodes the typed Swagger document and maps
//! each object onto its OpenAPI 3 counterpart.

use log::{debug, warn};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use url::Url;

use crate::error::ConvertError;
use crate::models::{
    component_name, deserialize_paths, string_or_scalar, Components, ExternalDocs, Info,
    MediaType, OAuthFlow, OAuthFlows, OpenAPI, Operation, Parameter, PathItem, ReferenceOr,
    RequestBody, Response, Schema, SecurityScheme, Server, Tag,
};

/// OpenAPI version written into upgraded documents
pub const UPGRADED_OPENAPI_VERSION: &str = "3.0.3";

const DEFAULT_MIME_TYPE: &str = "application/json";
const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
const MULTIPART_FORM: &str = "multipart/form-data";

/// Schema keywords a non-body Swagger parameter may carry inline
const INLINE_SCHEMA_KEYWORDS: [&str; 11] = [
    "maximum",
    "exclusiveMaximum",
    "minimum",
    "exclusiveMinimum",
    "maxLength",
    "minLength",
    "pattern",
    "maxItems",
    "minItems",
    "uniqueItems",
    "multipleOf",
];

/// Represents a complete Swagger 2.0 document
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SwaggerDoc {
    #[serde(default, deserialize_with = "string_or_scalar")]
    pub swagger: String,
    #[serde(default)]
    pub info: Info,
    pub host: Option<String>,
    pub basePath: Option<String>,
    #[serde(default)]
    pub schemes: Vec<String>,
    #[serde(default)]
    pub consumes: Vec<String>,
    #[serde(default)]
    pub produces: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_paths")]
    pub paths: BTreeMap<String, SwaggerPathItem>,
    #[serde(default)]
    pub definitions: BTreeMap<String, Schema>,
    #[serde(default)]
    pub parameters: BTreeMap<String, SwaggerParameter>,
    #[serde(default)]
    pub responses: BTreeMap<String, SwaggerResponse>,
    #[serde(default)]
    pub securityDefinitions: BTreeMap<String, SwaggerSecurityScheme>,
    #[serde(default)]
    pub security: Vec<BTreeMap<String, Vec<String>>>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    pub externalDocs: Option<ExternalDocs>,
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SwaggerPathItem {
    pub get: Option<SwaggerOperation>,
    pub put: Option<SwaggerOperation>,
    pub post: Option<SwaggerOperation>,
    pub delete: Option<SwaggerOperation>,
    pub options: Option<SwaggerOperation>,
    pub head: Option<SwaggerOperation>,
    pub patch: Option<SwaggerOperation>,
    #[serde(default)]
    pub parameters: Vec<ReferenceOr<SwaggerParameter>>,
}

impl SwaggerPathItem {
    fn operations(&self) -> Vec<(&'static str, &SwaggerOperation)> {
        [
            ("get", &self.get),
            ("put", &self.put),
            ("post", &self.post),
            ("delete", &self.delete),
            ("options", &self.options),
            ("head", &self.head),
            ("patch", &self.patch),
        ]
        .into_iter()
        .filter_map(|(method, op)| op.as_ref().map(|op| (method, op)))
        .collect()
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SwaggerOperation {
    #[serde(default)]
    pub tags: Vec<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub externalDocs: Option<ExternalDocs>,
    pub operationId: Option<String>,
    #[serde(default)]
    pub consumes: Vec<String>,
    #[serde(default)]
    pub produces: Vec<String>,
    #[serde(default)]
    pub parameters: Vec<ReferenceOr<SwaggerParameter>>,
    #[serde(default)]
    pub responses: BTreeMap<String, ReferenceOr<SwaggerResponse>>,
    pub deprecated: Option<bool>,
    #[serde(default)]
    pub security: Vec<BTreeMap<String, Vec<String>>>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SwaggerParameter {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "in", default)]
    pub in_type: String, // path, query, header, body, formData
    pub description: Option<String>,
    pub required: Option<bool>,
    pub schema: Option<Schema>,
    #[serde(rename = "type")]
    pub type_: Option<String>,
    pub format: Option<String>,
    pub items: Option<Box<Schema>>,
    #[serde(rename = "enum")]
    pub enum_values: Option<Vec<Value>>,
    pub default: Option<Value>,
    pub collectionFormat: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl SwaggerParameter {
    /// Schema of a non-body parameter, assembled from its inline keywords
    fn inline_schema(&self) -> Schema {
        if let Some(schema) = &self.schema {
            return schema.clone();
        }

        let (type_, format) = match self.type_.as_deref() {
            Some("file") => (Some("string".to_string()), Some("binary".to_string())),
            other => (other.map(str::to_string), self.format.clone()),
        };

        let extra = self
            .extra
            .iter()
            .filter(|(key, _)| INLINE_SCHEMA_KEYWORDS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Schema {
            type_: type_.map(Value::String),
            format,
            items: self.items.clone(),
            enum_values: self.enum_values.clone(),
            default: self.default.clone(),
            extra,
            ..Default::default()
        }
    }

    fn is_file(&self) -> bool {
        self.type_.as_deref() == Some("file")
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SwaggerResponse {
    #[serde(default)]
    pub description: String,
    pub schema: Option<Schema>,
    #[serde(default)]
    pub headers: BTreeMap<String, Value>,
    #[serde(default)]
    pub examples: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SwaggerSecurityScheme {
    #[serde(rename = "type", default)]
    pub type_: String, // basic, apiKey, oauth2
    pub description: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "in")]
    pub in_type: Option<String>,
    pub flow: Option<String>,
    pub authorizationUrl: Option<String>,
    pub tokenUrl: Option<String>,
    #[serde(default)]
    pub scopes: BTreeMap<String, String>,
}

/// Upgrades a raw Swagger 2.0 document into the OpenAPI 3 model
pub fn upgrade(mut raw: Value) -> Result<OpenAPI, ConvertError> {
    let body_params = body_parameter_names(&raw);
    rewrite_refs(&mut raw, &body_params);

    let doc: SwaggerDoc =
        serde_json::from_value(raw).map_err(|e| ConvertError::UpgradeError(e.to_string()))?;
    debug!(
        "Upgrading Swagger {} document with {} paths",
        doc.swagger,
        doc.paths.len()
    );

    Upgrader::new(&doc).run()
}

/// Names of the global parameters that describe a request body
fn body_parameter_names(raw: &Value) -> BTreeSet<String> {
    raw.get("parameters")
        .and_then(Value::as_object)
        .map(|params| {
            params
                .iter()
                .filter(|(_, param)| param.get("in").and_then(Value::as_str) == Some("body"))
                .map(|(name, _)| name.clone())
                .collect()
        })
        .unwrap_or_default()
}

fn rewrite_refs(value: &mut Value, body_params: &BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                match child {
                    Value::String(reference) if key == "$ref" => {
                        *reference = upgrade_ref(reference, body_params);
                    }
                    _ => rewrite_refs(child, body_params),
                }
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                rewrite_refs(item, body_params);
            }
        }
        _ => {}
    }
}

fn upgrade_ref(reference: &str, body_params: &BTreeSet<String>) -> String {
    if let Some(name) = reference.strip_prefix("#/definitions/") {
        format!("#/components/schemas/{}", name)
    } else if let Some(name) = reference.strip_prefix("#/parameters/") {
        let unescaped = name.replace("~1", "/").replace("~0", "~");
        if body_params.contains(&unescaped) {
            format!("#/components/requestBodies/{}", name)
        } else {
            format!("#/components/parameters/{}", name)
        }
    } else if let Some(name) = reference.strip_prefix("#/responses/") {
        format!("#/components/responses/{}", name)
    } else {
        reference.to_string()
    }
}

struct Upgrader<'a> {
    doc: &'a SwaggerDoc,
}

impl<'a> Upgrader<'a> {
    fn new(doc: &'a SwaggerDoc) -> Self {
        Self { doc }
    }

    fn run(&self) -> Result<OpenAPI, ConvertError> {
        let mut paths = BTreeMap::new();
        for (path, item) in &self.doc.paths {
            paths.insert(path.clone(), self.convert_path_item(item)?);
        }

        let mut extensions = self.doc.extensions.clone();
        if let Some(base_path) = self.doc.basePath.as_deref().filter(|p| !p.is_empty()) {
            extensions
                .entry("x-basePath".to_string())
                .or_insert_with(|| Value::String(base_path.to_string()));
        }

        Ok(OpenAPI {
            openapi: UPGRADED_OPENAPI_VERSION.to_string(),
            info: self.doc.info.clone(),
            servers: self.servers(),
            paths,
            components: Some(self.components()?),
            security: self.doc.security.clone(),
            tags: self.doc.tags.clone(),
            externalDocs: self.doc.externalDocs.clone(),
            extensions,
        })
    }

    /// Converts legacy host/basePath/schemes into server entries
    fn servers(&self) -> Vec<Server> {
        let base_path = self.doc.basePath.as_deref().unwrap_or("");

        match self.doc.host.as_deref().filter(|h| !h.is_empty()) {
            Some(host) => {
                let schemes = if self.doc.schemes.is_empty() {
                    vec!["https".to_string()]
                } else {
                    self.doc.schemes.clone()
                };

                schemes
                    .iter()
                    .map(|scheme| {
                        let url = format!("{}://{}{}", scheme, host, base_path);
                        if let Err(e) = Url::parse(&url) {
                            warn!("Upgraded server URL {} is not a valid URL: {}", url, e);
                        }
                        Server {
                            url,
                            ..Default::default()
                        }
                    })
                    .collect()
            }
            None if !base_path.is_empty() => vec![Server {
                url: base_path.to_string(),
                ..Default::default()
            }],
            None => Vec::new(),
        }
    }

    fn components(&self) -> Result<Components, ConvertError> {
        let mut components = Components {
            schemas: self.doc.definitions.clone(),
            ..Default::default()
        };

        let produces = self.mime_types(&[], &self.doc.produces);
        for (name, response) in &self.doc.responses {
            components.responses.insert(
                name.clone(),
                ReferenceOr::Item(self.convert_response(response, &produces)),
            );
        }

        let consumes = self.mime_types(&[], &self.doc.consumes);
        for (name, param) in &self.doc.parameters {
            match param.in_type.as_str() {
                "body" => {
                    let body = self.convert_body(param, &consumes)?;
                    components
                        .requestBodies
                        .insert(name.clone(), ReferenceOr::Item(body));
                }
                "formData" => {
                    debug!(
                        "Global formData parameter {} is folded into the bodies that reference it",
                        name
                    );
                }
                _ => {
                    components
                        .parameters
                        .insert(name.clone(), ReferenceOr::Item(self.convert_parameter(param)));
                }
            }
        }

        for (name, scheme) in &self.doc.securityDefinitions {
            let converted = self.convert_security_scheme(name, scheme)?;
            components
                .securitySchemes
                .insert(name.clone(), ReferenceOr::Item(converted));
        }

        Ok(components)
    }

    fn convert_path_item(&self, item: &SwaggerPathItem) -> Result<PathItem, ConvertError> {
        let mut path_item = PathItem::default();

        // body and formData parameters cannot live on an OpenAPI 3 path item;
        // they are folded into every operation instead
        let mut inherited = Vec::new();
        for param in &item.parameters {
            match param {
                ReferenceOr::Item(p) if p.in_type == "body" || p.in_type == "formData" => {
                    inherited.push(param.clone());
                }
                ReferenceOr::Reference { reference }
                    if reference.starts_with("#/components/requestBodies/")
                        || self.global_form_field(reference).is_some() =>
                {
                    inherited.push(param.clone());
                }
                ReferenceOr::Item(p) => {
                    path_item
                        .parameters
                        .push(ReferenceOr::Item(self.convert_parameter(p)));
                }
                ReferenceOr::Reference { reference } => {
                    path_item
                        .parameters
                        .push(ReferenceOr::reference(reference.clone()));
                }
            }
        }

        for (method, op) in item.operations() {
            let converted = self.convert_operation(op, &inherited)?;
            if let Some(slot) = path_item.operation_mut(method) {
                *slot = Some(converted);
            }
        }

        Ok(path_item)
    }

    fn convert_operation(
        &self,
        op: &SwaggerOperation,
        inherited: &[ReferenceOr<SwaggerParameter>],
    ) -> Result<Operation, ConvertError> {
        let consumes = self.mime_types(&op.consumes, &self.doc.consumes);
        let produces = self.mime_types(&op.produces, &self.doc.produces);

        let mut parameters = Vec::new();
        let mut request_body: Option<ReferenceOr<RequestBody>> = None;
        let mut form_fields: Vec<&SwaggerParameter> = Vec::new();

        for param in inherited.iter().chain(op.parameters.iter()) {
            match param {
                ReferenceOr::Reference { reference } => {
                    if reference.starts_with("#/components/requestBodies/") {
                        request_body = Some(ReferenceOr::reference(reference.clone()));
                    } else if let Some(field) = self.global_form_field(reference) {
                        form_fields.retain(|f| f.name != field.name);
                        form_fields.push(field);
                    } else {
                        parameters.push(ReferenceOr::reference(reference.clone()));
                    }
                }
                ReferenceOr::Item(p) => match p.in_type.as_str() {
                    "body" => {
                        request_body = Some(ReferenceOr::Item(self.convert_body(p, &consumes)?));
                    }
                    "formData" => {
                        form_fields.retain(|f| f.name != p.name);
                        form_fields.push(p);
                    }
                    _ => parameters.push(ReferenceOr::Item(self.convert_parameter(p))),
                },
            }
        }

        if request_body.is_none() && !form_fields.is_empty() {
            request_body = Some(ReferenceOr::Item(self.convert_form(&form_fields, &consumes)));
        }

        let mut responses = BTreeMap::new();
        for (code, response) in &op.responses {
            let converted = match response {
                ReferenceOr::Reference { reference } => ReferenceOr::reference(reference.clone()),
                ReferenceOr::Item(r) => ReferenceOr::Item(self.convert_response(r, &produces)),
            };
            responses.insert(code.clone(), converted);
        }

        Ok(Operation {
            tags: op.tags.clone(),
            summary: op.summary.clone(),
            description: op.description.clone(),
            externalDocs: op.externalDocs.clone(),
            operationId: op.operationId.clone(),
            parameters,
            requestBody: request_body,
            responses,
            deprecated: op.deprecated,
            security: op.security.clone(),
            servers: Vec::new(),
        })
    }

    /// Global formData parameter behind an upgraded `#/parameters/` pointer
    fn global_form_field(&self, reference: &str) -> Option<&'a SwaggerParameter> {
        let name = component_name(reference, "parameters")?;
        self.doc
            .parameters
            .get(&name)
            .filter(|param| param.in_type == "formData")
    }

    /// Unknown locations are carried over as written; validation reports them
    fn convert_parameter(&self, param: &SwaggerParameter) -> Parameter {
        if !matches!(param.in_type.as_str(), "path" | "query" | "header") {
            warn!(
                "Parameter {:?} has location {:?}, which OpenAPI 3 does not define",
                param.name, param.in_type
            );
        }

        let (style, explode) = collection_style(param.collectionFormat.as_deref(), &param.in_type);

        Parameter {
            name: param.name.clone(),
            in_type: param.in_type.clone(),
            description: param.description.clone(),
            required: param.required,
            style,
            explode,
            schema: Some(param.inline_schema()),
            example: param.extra.get("x-example").cloned(),
            ..Default::default()
        }
    }

    fn convert_body(
        &self,
        param: &SwaggerParameter,
        consumes: &[String],
    ) -> Result<RequestBody, ConvertError> {
        let schema = param.schema.clone().ok_or_else(|| {
            ConvertError::UpgradeError(format!("body parameter {} has no schema", param.name))
        })?;

        let content = consumes
            .iter()
            .map(|mime| {
                (
                    mime.clone(),
                    MediaType {
                        schema: Some(schema.clone()),
                        ..Default::default()
                    },
                )
            })
            .collect();

        Ok(RequestBody {
            description: param.description.clone(),
            content,
            required: param.required,
        })
    }

    /// Folds formData parameters into a single object-typed request body
    fn convert_form(&self, fields: &[&SwaggerParameter], consumes: &[String]) -> RequestBody {
        let mut schema = Schema::of_type("object");
        let mut required = Vec::new();

        for field in fields {
            let mut property = field.inline_schema();
            if property.description.is_none() {
                property.description = field.description.clone();
            }
            schema
                .properties
                .insert(field.name.clone(), Box::new(property));
            if field.required == Some(true) {
                required.push(field.name.clone());
            }
        }
        if !required.is_empty() {
            schema.required = Some(Value::from(required));
        }

        let multipart =
            fields.iter().any(|f| f.is_file()) || consumes.iter().any(|m| m == MULTIPART_FORM);
        let mime = if multipart { MULTIPART_FORM } else { FORM_URLENCODED };

        let mut content = BTreeMap::new();
        content.insert(
            mime.to_string(),
            MediaType {
                schema: Some(schema),
                ..Default::default()
            },
        );

        RequestBody {
            description: None,
            content,
            required: Some(fields.iter().any(|f| f.required == Some(true))),
        }
    }

    fn convert_response(&self, response: &SwaggerResponse, produces: &[String]) -> Response {
        let content = match &response.schema {
            Some(schema) => produces
                .iter()
                .map(|mime| {
                    (
                        mime.clone(),
                        MediaType {
                            schema: Some(schema.clone()),
                            example: response.examples.get(mime).cloned(),
                            ..Default::default()
                        },
                    )
                })
                .collect(),
            None => BTreeMap::new(),
        };

        Response {
            description: response.description.clone(),
            headers: response.headers.clone(),
            content,
            links: BTreeMap::new(),
        }
    }

    fn convert_security_scheme(
        &self,
        name: &str,
        scheme: &SwaggerSecurityScheme,
    ) -> Result<SecurityScheme, ConvertError> {
        let mut converted = SecurityScheme {
            description: scheme.description.clone(),
            ..Default::default()
        };

        match scheme.type_.as_str() {
            "basic" => {
                converted.type_ = "http".to_string();
                converted.scheme = Some("basic".to_string());
            }
            "apiKey" => {
                converted.type_ = "apiKey".to_string();
                converted.name = scheme.name.clone();
                converted.in_type = scheme.in_type.clone();
            }
            "oauth2" => {
                converted.type_ = "oauth2".to_string();
                let flow = OAuthFlow {
                    authorizationUrl: scheme.authorizationUrl.clone(),
                    tokenUrl: scheme.tokenUrl.clone(),
                    refreshUrl: None,
                    scopes: scheme.scopes.clone(),
                };
                let mut flows = OAuthFlows::default();
                match scheme.flow.as_deref() {
                    Some("implicit") => flows.implicit = Some(flow),
                    Some("password") => flows.password = Some(flow),
                    Some("application") => flows.clientCredentials = Some(flow),
                    Some("accessCode") => flows.authorizationCode = Some(flow),
                    other => {
                        return Err(ConvertError::UpgradeError(format!(
                            "security scheme {} has unsupported oauth2 flow {:?}",
                            name, other
                        )))
                    }
                }
                converted.flows = Some(flows);
            }
            other => {
                return Err(ConvertError::UpgradeError(format!(
                    "security scheme {} has unsupported type {}",
                    name, other
                )))
            }
        }

        Ok(converted)
    }

    fn mime_types(&self, local: &[String], global: &[String]) -> Vec<String> {
        if !local.is_empty() {
            local.to_vec()
        } else if !global.is_empty() {
            global.to_vec()
        } else {
            vec![DEFAULT_MIME_TYPE.to_string()]
        }
    }
}

/// Maps a Swagger `collectionFormat` onto OpenAPI 3 style/explode
fn collection_style(format: Option<&str>, location: &str) -> (Option<String>, Option<bool>) {
    let default_style = if location == "query" { "form" } else { "simple" };
    match format {
        Some("csv") => (Some(default_style.to_string()), Some(false)),
        Some("ssv") => (Some("spaceDelimited".to_string()), Some(false)),
        Some("pipes") => (Some("pipeDelimited".to_string()), Some(false)),
        Some("multi") => (Some("form".to_string()), Some(true)),
        _ => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn petstore() -> Value {
        json!({
            "swagger": "2.0",
            "info": {"title": "Petstore", "version": "1.0"},
            "host": "petstore.swagger.io",
            "basePath": "/v2",
            "schemes": ["https", "http"],
            "produces": ["application/json"],
            "paths": {
                "/pets": {
                    "get": {
                        "tags": ["pet"],
                        "parameters": [
                            {"name": "limit", "in": "query", "type": "integer", "format": "int32", "minimum": 1},
                            {"$ref": "#/parameters/Tags"}
                        ],
                        "responses": {
                            "200": {"description": "ok", "schema": {"type": "array", "items": {"$ref": "#/definitions/Pet"}}},
                            "default": {"$ref": "#/responses/Error"}
                        }
                    },
                    "post": {
                        "consumes": ["application/json", "application/xml"],
                        "parameters": [
                            {"name": "pet", "in": "body", "required": true, "schema": {"$ref": "#/definitions/Pet"}}
                        ],
                        "responses": {"201": {"description": "created"}}
                    }
                },
                "/pets/{id}/photo": {
                    "post": {
                        "parameters": [
                            {"name": "id", "in": "path", "required": true, "type": "string"},
                            {"name": "file", "in": "formData", "type": "file", "required": true},
                            {"name": "caption", "in": "formData", "type": "string"}
                        ],
                        "responses": {"200": {"description": "ok"}}
                    }
                }
            },
            "definitions": {
                "Pet": {"type": "object", "properties": {"name": {"type": "string"}}}
            },
            "parameters": {
                "Tags": {"name": "tags", "in": "query", "type": "array", "items": {"type": "string"}, "collectionFormat": "multi"},
                "NewPet": {"name": "pet", "in": "body", "schema": {"$ref": "#/definitions/Pet"}}
            },
            "responses": {
                "Error": {"description": "error", "schema": {"type": "string"}}
            },
            "securityDefinitions": {
                "basicAuth": {"type": "basic"},
                "api_key": {"type": "apiKey", "name": "X-API-Key", "in": "header"},
                "oauth": {"type": "oauth2", "flow": "accessCode", "authorizationUrl": "https://a", "tokenUrl": "https://t", "scopes": {"read": "read"}}
            },
            "x-logo": "logo.png"
        })
    }

    #[test]
    fn test_servers_from_host_base_path_and_schemes() {
        let doc = upgrade(petstore()).unwrap();
        let urls: Vec<&str> = doc.servers.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://petstore.swagger.io/v2", "http://petstore.swagger.io/v2"]
        );
        assert_eq!(doc.extensions.get("x-basePath"), Some(&json!("/v2")));
        assert_eq!(doc.extensions.get("x-logo"), Some(&json!("logo.png")));
        assert_eq!(doc.openapi, UPGRADED_OPENAPI_VERSION);
    }

    #[test]
    fn test_refs_are_moved_into_components() {
        let doc = upgrade(petstore()).unwrap();
        let components = doc.components.as_ref().unwrap();
        assert!(components.schemas.contains_key("Pet"));
        assert!(components.requestBodies.contains_key("NewPet"));
        assert!(components.parameters.contains_key("Tags"));

        let get = doc.paths["/pets"].get.as_ref().unwrap();
        assert_eq!(
            get.parameters[1].as_reference(),
            Some("#/components/parameters/Tags")
        );
        assert_eq!(
            get.responses["default"].as_reference(),
            Some("#/components/responses/Error")
        );

        let ok = get.responses["200"].as_item().unwrap();
        let schema = ok.content["application/json"].schema.as_ref().unwrap();
        assert_eq!(
            schema.items.as_ref().unwrap().ref_.as_deref(),
            Some("#/components/schemas/Pet")
        );
    }

    #[test]
    fn test_inline_parameter_schema_keeps_constraints() {
        let doc = upgrade(petstore()).unwrap();
        let get = doc.paths["/pets"].get.as_ref().unwrap();
        let limit = get.parameters[0].as_item().unwrap();
        let schema = limit.schema.as_ref().unwrap();
        assert_eq!(schema.type_, Some(json!("integer")));
        assert_eq!(schema.format.as_deref(), Some("int32"));
        assert_eq!(schema.extra.get("minimum"), Some(&json!(1)));

        let components = doc.components.as_ref().unwrap();
        let tags = components.parameters["Tags"].as_item().unwrap();
        assert_eq!(tags.style.as_deref(), Some("form"));
        assert_eq!(tags.explode, Some(true));
    }

    #[test]
    fn test_body_parameter_becomes_request_body() {
        let doc = upgrade(petstore()).unwrap();
        let post = doc.paths["/pets"].post.as_ref().unwrap();
        let body = post.requestBody.as_ref().unwrap().as_item().unwrap();
        let mimes: Vec<&String> = body.content.keys().collect();
        assert_eq!(mimes, vec!["application/json", "application/xml"]);
        assert_eq!(body.required, Some(true));
        assert!(post.parameters.is_empty());
    }

    #[test]
    fn test_form_data_becomes_multipart_body() {
        let doc = upgrade(petstore()).unwrap();
        let post = doc.paths["/pets/{id}/photo"].post.as_ref().unwrap();
        assert_eq!(post.parameters.len(), 1);

        let body = post.requestBody.as_ref().unwrap().as_item().unwrap();
        let media = &body.content[MULTIPART_FORM];
        let schema = media.schema.as_ref().unwrap();
        assert_eq!(schema.properties["file"].format.as_deref(), Some("binary"));
        assert_eq!(schema.required, Some(json!(["file"])));
    }

    #[test]
    fn test_security_definitions_are_converted() {
        let doc = upgrade(petstore()).unwrap();
        let schemes = &doc.components.as_ref().unwrap().securitySchemes;

        let basic = schemes["basicAuth"].as_item().unwrap();
        assert_eq!(basic.type_, "http");
        assert_eq!(basic.scheme.as_deref(), Some("basic"));

        let oauth = schemes["oauth"].as_item().unwrap();
        let flow = oauth
            .flows
            .as_ref()
            .unwrap()
            .authorizationCode
            .as_ref()
            .unwrap();
        assert_eq!(flow.tokenUrl.as_deref(), Some("https://t"));
    }

    #[test]
    fn test_unknown_security_type_fails_upgrade() {
        let mut raw = petstore();
        raw["securityDefinitions"]["bad"] = json!({"type": "mutualTLS"});
        let err = upgrade(raw).unwrap_err();
        assert!(matches!(err, ConvertError::UpgradeError(_)));
    }

    #[test]
    fn test_body_without_schema_fails_upgrade() {
        let raw = json!({
            "swagger": "2.0",
            "info": {"title": "t", "version": "1"},
            "paths": {"/x": {"post": {
                "parameters": [{"name": "b", "in": "body"}],
                "responses": {"200": {"description": "ok"}}
            }}}
        });
        assert!(matches!(
            upgrade(raw).unwrap_err(),
            ConvertError::UpgradeError(_)
        ));
    }

    #[test]
    fn test_referenced_global_form_field_joins_request_body() {
        let raw = json!({
            "swagger": "2.0",
            "info": {"title": "t", "version": "1"},
            "parameters": {
                "Upload": {"name": "file", "in": "formData", "type": "file", "required": true}
            },
            "paths": {
                "/files": {
                    "parameters": [{"$ref": "#/parameters/Upload"}],
                    "post": {
                        "parameters": [{"name": "caption", "in": "formData", "type": "string"}],
                        "responses": {"201": {"description": "created"}}
                    }
                },
                "/avatars": {"put": {
                    "parameters": [{"$ref": "#/parameters/Upload"}],
                    "responses": {"204": {"description": "stored"}}
                }}
            }
        });
        let doc = upgrade(raw).unwrap();
        assert!(doc.components.as_ref().unwrap().parameters.is_empty());

        let post = doc.paths["/files"].post.as_ref().unwrap();
        assert!(post.parameters.is_empty());
        assert!(doc.paths["/files"].parameters.is_empty());
        let body = post.requestBody.as_ref().unwrap().as_item().unwrap();
        let schema = body.content[MULTIPART_FORM].schema.as_ref().unwrap();
        let fields: Vec<&String> = schema.properties.keys().collect();
        assert_eq!(fields, vec!["caption", "file"]);
        assert_eq!(schema.required, Some(json!(["file"])));

        let put = doc.paths["/avatars"].put.as_ref().unwrap();
        assert!(put.parameters.is_empty());
        assert_eq!(put.requestBody.as_ref().unwrap().as_item().unwrap().required, Some(true));
    }

    #[test]
    fn test_paths_extension_keys_are_ignored() {
        let raw = json!({
            "swagger": "2.0",
            "info": {"title": "t", "version": "1"},
            "paths": {
                "x-internal": true,
                "/a": {"get": {"responses": {"200": {"description": "ok"}}}}
            }
        });
        let doc = upgrade(raw).unwrap();
        let paths: Vec<&String> = doc.paths.keys().collect();
        assert_eq!(paths, vec!["/a"]);
    }

    #[test]
    fn test_parameter_without_location_is_carried_over() {
        let raw = json!({
            "swagger": 2.0,
            "info": {"title": "t", "version": 1.5},
            "paths": {"/a": {"get": {
                "parameters": [{"name": "q", "type": "string"}],
                "responses": {"200": {"description": "ok"}}
            }}}
        });
        let doc = upgrade(raw).unwrap();
        assert_eq!(doc.info.version, "1.5");
        let param = doc.paths["/a"].get.as_ref().unwrap().parameters[0].as_item().unwrap();
        assert_eq!(param.name, "q");
        assert_eq!(param.in_type, "");
    }

    #[test]
    fn test_no_host_no_servers() {
        let raw = json!({"swagger": "2.0", "info": {"title": "t", "version": "1"}, "paths": {}});
        let doc = upgrade(raw).unwrap();
        assert!(doc.servers.is_empty());
        assert!(!doc.extensions.contains_key("x-basePath"));
    }
}
