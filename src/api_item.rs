use log::{debug, warn};
use std::collections::BTreeMap;

use crate::export::{ApiItem, ParameterItem, Parameters, RequestBodyItem, ResponseItem};
use crate::models::{
    component_name, Components, MediaType, Operation, Parameter, PathItem, ReferenceOr, Schema,
};
use crate::refs::ResolvedRefs;
use crate::schema_folders::first_schema;

/// Content type reported for a `$ref` response or body whose target is missing
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Turns one (path, verb) pair into an exported API item
pub struct ApiItemConverter<'a> {
    components: Option<&'a Components>,
    refs: &'a ResolvedRefs,
}

impl<'a> ApiItemConverter<'a> {
    pub fn new(components: Option<&'a Components>, refs: &'a ResolvedRefs) -> Self {
        Self { components, refs }
    }

    pub fn convert(
        &self,
        path: &str,
        method: &str,
        path_item: &PathItem,
        operation: &Operation,
        webhook: bool,
    ) -> ApiItem {
        let name = operation
            .summary
            .clone()
            .filter(|s| !s.is_empty())
            .or_else(|| operation.operationId.clone())
            .unwrap_or_else(|| path.to_string());

        ApiItem {
            name,
            description: operation.description.clone(),
            operation_id: operation.operationId.clone(),
            path: path.to_string(),
            method: method.to_string(),
            tags: operation.tags.clone(),
            deprecated: operation.deprecated.unwrap_or(false),
            webhook,
            parameters: self.parameters(path, method, path_item, operation),
            responses: self.responses(path, method, operation),
            request_body: self.request_body(operation),
        }
    }

    /// Path-level parameters overridden by operation-level ones sharing the
    /// same name and location, then bucketed by location
    fn parameters(
        &self,
        path: &str,
        method: &str,
        path_item: &PathItem,
        operation: &Operation,
    ) -> Parameters {
        let mut merged: Vec<&Parameter> = Vec::new();

        for param in path_item.parameters.iter().chain(operation.parameters.iter()) {
            let Some(param) = self.resolve_parameter(param) else {
                continue;
            };
            if let Some(existing) = merged
                .iter_mut()
                .find(|p| p.name == param.name && p.in_type == param.in_type)
            {
                debug!(
                    "{} {}: parameter {} ({}) overridden by operation",
                    method, path, param.name, param.in_type
                );
                *existing = param;
            } else {
                merged.push(param);
            }
        }

        let mut parameters = Parameters::default();
        for param in merged {
            let bucket = match param.in_type.as_str() {
                "path" => &mut parameters.path,
                "query" => &mut parameters.query,
                "header" => &mut parameters.header,
                "cookie" => &mut parameters.cookie,
                other => {
                    warn!(
                        "{} {}: parameter {} has unknown location {}, skipping",
                        method, path, param.name, other
                    );
                    continue;
                }
            };
            bucket.push(parameter_item(param));
        }

        parameters
    }

    fn resolve_parameter<'p>(&'p self, param: &'p ReferenceOr<Parameter>) -> Option<&'p Parameter> {
        match param {
            ReferenceOr::Item(p) => Some(p),
            ReferenceOr::Reference { reference } => {
                let resolved = self.components.and_then(|c| c.parameter(reference));
                if resolved.is_none() {
                    warn!("Unresolvable parameter reference {}, skipping", reference);
                }
                resolved
            }
        }
    }

    fn responses(&self, path: &str, method: &str, operation: &Operation) -> Vec<ResponseItem> {
        operation
            .responses
            .iter()
            .map(|(status, response)| {
                let id = format!("{}:{}:{}", method, path, status);
                let code = parse_status_code(status);

                match response {
                    ReferenceOr::Reference { reference } => {
                        let target = self.components.and_then(|c| c.response(reference));
                        ResponseItem {
                            id,
                            name: status.clone(),
                            code,
                            content_type: target.map_or_else(
                                || DEFAULT_CONTENT_TYPE.to_string(),
                                |r| first_content_type(&r.content),
                            ),
                            description: target
                                .map(|r| r.description.clone())
                                .filter(|d| !d.is_empty()),
                            json_schema: Some(Schema::reference(reference.clone())),
                        }
                    }
                    ReferenceOr::Item(r) => ResponseItem {
                        id,
                        name: status.clone(),
                        code,
                        content_type: first_content_type(&r.content),
                        description: Some(r.description.clone()).filter(|d| !d.is_empty()),
                        json_schema: first_schema(&r.content),
                    },
                }
            })
            .collect()
    }

    fn request_body(&self, operation: &Operation) -> Option<RequestBodyItem> {
        match operation.requestBody.as_ref()? {
            ReferenceOr::Reference { reference } => {
                let target = self.refs.target(reference)?;
                let name = component_name(target, "requestBodies");
                let body = name.and_then(|n| {
                    self.components
                        .and_then(|c| c.requestBodies.get(&n))
                        .and_then(ReferenceOr::as_item)
                });

                Some(RequestBodyItem {
                    required: body.and_then(|b| b.required).unwrap_or(false),
                    content_type: body.map_or_else(
                        || DEFAULT_CONTENT_TYPE.to_string(),
                        |b| first_content_type(&b.content),
                    ),
                    description: body.and_then(|b| b.description.clone()),
                    json_schema: Some(Schema::reference(target)),
                })
            }
            ReferenceOr::Item(body) => Some(RequestBodyItem {
                required: body.required.unwrap_or(false),
                content_type: first_content_type(&body.content),
                description: body.description.clone(),
                json_schema: first_schema(&body.content),
            }),
        }
    }
}

/// First declared content type in key order, empty when there is none
fn first_content_type(content: &BTreeMap<String, MediaType>) -> String {
    content.keys().next().cloned().unwrap_or_default()
}

/// Decimal status code, or 0 for keys such as `default` or `2XX`
pub fn parse_status_code(status: &str) -> i64 {
    status.trim().parse().unwrap_or(0)
}

fn parameter_item(param: &Parameter) -> ParameterItem {
    let schema = param
        .schema
        .clone()
        .or_else(|| first_schema(&param.content));

    ParameterItem {
        name: param.name.clone(),
        required: param.required.unwrap_or(false),
        description: param.description.clone(),
        deprecated: param.deprecated.unwrap_or(false),
        schema,
        example: param.example.clone(),
    }
}
