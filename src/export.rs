//! Shape of the collection export written by the converter.

use serde::Serialize;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::models::{OAuthFlows, Schema, HTTP_METHODS};

/// Everything one conversion produces
#[derive(Debug, Serialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportResult {
    pub http_collections: Vec<Collection>,
    pub data_schemas: Vec<SchemaFolder>,
    pub security_schemes: Vec<SecurityCollection>,
    pub environments: Vec<Environment>,
    pub extra: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub content_version: String,
}

impl ExportResult {
    /// Every API item across the collection tree, depth first
    pub fn api_items(&self) -> Vec<&ApiItem> {
        let mut items = Vec::new();
        for collection in &self.http_collections {
            collection.collect_items(&mut items);
        }
        items
    }

    /// Finds a collection anywhere in the tree by name
    pub fn find_collection(&self, name: &str) -> Option<&Collection> {
        self.http_collections.iter().find_map(|c| c.find(name))
    }
}

/// A folder of operations
#[derive(Debug, Serialize, Clone, Default, PartialEq)]
pub struct Collection {
    pub name: String,
    pub items: Vec<ApiItem>,
    pub children: Vec<Collection>,
}

impl Collection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Children by descending name, items by ascending path then verb order
    pub fn sort(&mut self) {
        self.items.sort_by(compare_items);
        self.children.sort_by(|a, b| b.name.cmp(&a.name));
        for child in &mut self.children {
            child.sort();
        }
    }

    pub fn find(&self, name: &str) -> Option<&Collection> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    fn collect_items<'a>(&'a self, items: &mut Vec<&'a ApiItem>) {
        items.extend(self.items.iter());
        for child in &self.children {
            child.collect_items(items);
        }
    }
}

fn compare_items(a: &ApiItem, b: &ApiItem) -> Ordering {
    a.path
        .cmp(&b.path)
        .then_with(|| method_rank(&a.method).cmp(&method_rank(&b.method)))
}

fn method_rank(method: &str) -> usize {
    HTTP_METHODS
        .iter()
        .position(|m| *m == method)
        .unwrap_or(HTTP_METHODS.len())
}

/// One HTTP operation
#[derive(Debug, Serialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiItem {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    pub path: String,
    pub method: String,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub deprecated: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub webhook: bool,
    pub parameters: Parameters,
    pub responses: Vec<ResponseItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBodyItem>,
}

/// Parameters bucketed by location
#[derive(Debug, Serialize, Clone, Default, PartialEq)]
pub struct Parameters {
    pub path: Vec<ParameterItem>,
    pub query: Vec<ParameterItem>,
    pub header: Vec<ParameterItem>,
    pub cookie: Vec<ParameterItem>,
}

#[derive(Debug, Serialize, Clone, Default, PartialEq)]
pub struct ParameterItem {
    pub name: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub deprecated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
}

#[derive(Debug, Serialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResponseItem {
    pub id: String,
    pub name: String,
    pub code: i64,
    pub content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_schema: Option<Schema>,
}

#[derive(Debug, Serialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RequestBodyItem {
    pub required: bool,
    pub content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_schema: Option<Schema>,
}

/// Named bucket of reusable schemas, one per component section
#[derive(Debug, Serialize, Clone, Default, PartialEq)]
pub struct SchemaFolder {
    pub name: String,
    pub items: Vec<SchemaItem>,
}

#[derive(Debug, Serialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SchemaItem {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_schema: Option<Schema>,
}

#[derive(Debug, Serialize, Clone, Default, PartialEq)]
pub struct SecurityCollection {
    pub name: String,
    pub items: Vec<SecuritySchemeItem>,
}

#[derive(Debug, Serialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SecuritySchemeItem {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "in", skip_serializing_if = "Option::is_none")]
    pub in_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearer_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flows: Option<OAuthFlows>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_id_connect_url: Option<String>,
}

/// One environment per declared server
#[derive(Debug, Serialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub name: String,
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub variables: BTreeMap<String, String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}
