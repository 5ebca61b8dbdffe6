use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use url::Url;

use crate::api_item::ApiItemConverter;
use crate::error::ConvertError;
use crate::export::{
    ApiItem, Collection, Environment, ExportResult, SecurityCollection, SecuritySchemeItem,
};
use crate::folders::FolderTree;
use crate::loader::LoadedDocument;
use crate::models::{OpenAPI, PathItem, ReferenceOr, Server};
use crate::refs::{RefMap, ResolvedRefs};
use crate::schema_folders::{build_schema_folders, record_request_body_refs};

/// Folder holding untagged operations; the tag forest hangs below it
pub const DEFAULT_FOLDER: &str = "Default";
pub const SECURITY_COLLECTION: &str = "SecuritySchemes";

/// Extension keys that carry webhook path items, in lookup order
const WEBHOOK_KEYS: [&str; 2] = ["webhooks", "x-webhooks"];
/// Extension keys that carry a base path, in lookup order
const BASE_PATH_KEYS: [&str; 2] = ["x-basePath", "x-base-path"];

static SERVER_VARIABLE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([^{}]+)\}").unwrap());

/// Converts a loaded document into the collection export
pub struct Converter {
    document: OpenAPI,
    content_version: String,
}

impl Converter {
    pub fn new(document: OpenAPI, content_version: impl Into<String>) -> Self {
        Self {
            document,
            content_version: content_version.into(),
        }
    }

    pub fn from_loaded(loaded: LoadedDocument) -> Self {
        debug!(
            "Converting {:?} document declared as {}",
            loaded.dialect, loaded.declared_version
        );
        Self::new(loaded.document, loaded.declared_version)
    }

    pub fn convert(&self) -> Result<ExportResult, ConvertError> {
        let components = self.document.components.as_ref();

        let mut refs = RefMap::new();
        record_request_body_refs(components, &mut refs);
        if !refs.is_empty() {
            debug!("Recorded {} request body reference(s)", refs.len());
        }
        let refs = refs.resolve();

        let data_schemas = build_schema_folders(components, &refs);
        let http_collections = vec![self.collections(&refs)];

        let result = ExportResult {
            http_collections,
            data_schemas,
            security_schemes: vec![self.security_collection()],
            environments: self.environments(),
            extra: self.extra(),
            base_path: self.base_path(),
            title: self.document.info.title.clone(),
            description: self
                .document
                .info
                .description
                .clone()
                .filter(|d| !d.is_empty()),
            content_version: self.content_version.clone(),
        };

        info!(
            "Converted {} operation(s) and {} schema folder(s)",
            result.api_items().len(),
            result.data_schemas.len()
        );
        Ok(result)
    }

    /// Walks paths and webhooks into the default folder and the tag forest
    fn collections(&self, refs: &ResolvedRefs) -> Collection {
        let converter = ApiItemConverter::new(self.document.components.as_ref(), refs);
        let mut tree = FolderTree::new();
        let mut root = Collection::new(DEFAULT_FOLDER);

        for (path, item) in &self.document.paths {
            self.walk(&converter, path, item, false, &mut tree, &mut root);
        }

        for (name, item) in self.webhooks() {
            self.walk(&converter, &name, &item, true, &mut tree, &mut root);
        }

        if tree.is_empty() {
            debug!("No tagged operations, everything stays in {}", DEFAULT_FOLDER);
        } else {
            debug!("Built {} tag folder(s)", tree.len());
        }
        root.children = tree.into_forest();
        root.sort();
        root
    }

    fn walk(
        &self,
        converter: &ApiItemConverter,
        path: &str,
        path_item: &PathItem,
        webhook: bool,
        tree: &mut FolderTree,
        root: &mut Collection,
    ) {
        for (method, operation) in path_item.operations() {
            let api_item = converter.convert(path, method, path_item, operation, webhook);
            let unfiled: Option<ApiItem> = match operation.tags.first() {
                Some(tag) => tree.insert(tag, api_item),
                None => Some(api_item),
            };
            if let Some(api_item) = unfiled {
                root.items.push(api_item);
            }
        }
    }

    /// Re-decodes each webhook entry into a path item; malformed entries
    /// are skipped
    fn webhooks(&self) -> Vec<(String, PathItem)> {
        let Some(raw) = WEBHOOK_KEYS
            .iter()
            .find_map(|key| self.document.extensions.get(*key))
        else {
            return Vec::new();
        };

        let Some(entries) = raw.as_object() else {
            warn!("Ignoring webhooks: expected an object keyed by webhook name");
            return Vec::new();
        };

        entries
            .iter()
            .filter_map(|(name, entry)| {
                match serde_json::from_value::<PathItem>(entry.clone()) {
                    Ok(item) => Some((name.clone(), item)),
                    Err(e) => {
                        warn!("Skipping malformed webhook {}: {}", name, e);
                        None
                    }
                }
            })
            .collect()
    }

    fn security_collection(&self) -> SecurityCollection {
        let mut items = Vec::new();

        if let Some(components) = &self.document.components {
            for (name, scheme) in &components.securitySchemes {
                let scheme = match scheme {
                    ReferenceOr::Item(scheme) => scheme,
                    ReferenceOr::Reference { reference } => {
                        match components.security_scheme(reference) {
                            Some(scheme) => scheme,
                            None => {
                                warn!(
                                    "Security scheme {} references unknown {}, skipping",
                                    name, reference
                                );
                                continue;
                            }
                        }
                    }
                };

                items.push(SecuritySchemeItem {
                    name: name.clone(),
                    type_: scheme.type_.clone(),
                    description: scheme.description.clone(),
                    in_type: scheme.in_type.clone(),
                    param_name: scheme.name.clone(),
                    scheme: scheme.scheme.clone(),
                    bearer_format: scheme.bearerFormat.clone(),
                    flows: scheme.flows.clone(),
                    open_id_connect_url: scheme.openIdConnectUrl.clone(),
                });
            }
        }

        SecurityCollection {
            name: SECURITY_COLLECTION.to_string(),
            items,
        }
    }

    fn environments(&self) -> Vec<Environment> {
        self.document.servers.iter().map(environment).collect()
    }

    fn base_path(&self) -> Option<String> {
        BASE_PATH_KEYS
            .iter()
            .find_map(|key| self.document.extensions.get(*key))
            .and_then(Value::as_str)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
    }

    /// Document metadata with no dedicated export field, plus every
    /// extension the converter did not consume
    fn extra(&self) -> Map<String, Value> {
        let info = &self.document.info;
        let mut extra = Map::new();

        if !info.version.is_empty() {
            extra.insert("version".to_string(), Value::String(info.version.clone()));
        }
        insert_serialized(&mut extra, "summary", &info.summary);
        insert_serialized(&mut extra, "termsOfService", &info.termsOfService);
        insert_serialized(&mut extra, "contact", &info.contact);
        insert_serialized(&mut extra, "license", &info.license);
        insert_serialized(&mut extra, "externalDocs", &self.document.externalDocs);
        if !self.document.tags.is_empty() {
            insert_serialized(&mut extra, "tags", &Some(&self.document.tags));
        }
        if !self.document.security.is_empty() {
            insert_serialized(&mut extra, "security", &Some(&self.document.security));
        }

        for (key, value) in &self.document.extensions {
            if WEBHOOK_KEYS.contains(&key.as_str()) || BASE_PATH_KEYS.contains(&key.as_str()) {
                continue;
            }
            extra.insert(key.clone(), value.clone());
        }

        extra
    }
}

fn insert_serialized<T: serde::Serialize>(extra: &mut Map<String, Value>, key: &str, value: &Option<T>) {
    if let Some(value) = value {
        match serde_json::to_value(value) {
            Ok(serialized) => {
                extra.insert(key.to_string(), serialized);
            }
            Err(e) => warn!("Could not carry {} into extra: {}", key, e),
        }
    }
}

/// One environment per server, named by its description or else its URL
fn environment(server: &Server) -> Environment {
    let base_url = SERVER_VARIABLE_REGEX
        .replace_all(&server.url, |caps: &Captures| {
            server
                .variables
                .get(&caps[1])
                .map(|v| v.default.clone())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned();

    if base_url.contains("://") {
        if let Err(e) = Url::parse(&base_url) {
            warn!("Server URL {} does not parse: {}", base_url, e);
        }
    }

    let description = server.description.clone().filter(|d| !d.is_empty());

    Environment {
        name: description.clone().unwrap_or_else(|| server.url.clone()),
        base_url,
        description,
        variables: server
            .variables
            .iter()
            .map(|(name, variable)| (name.clone(), variable.default.clone()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_value;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn convert(doc: Value) -> ExportResult {
        Converter::from_loaded(load_value(doc).unwrap())
            .convert()
            .unwrap()
    }

    fn base() -> Value {
        json!({
            "openapi": "3.0.0",
            "info": {"title": "Store", "version": "2.1", "description": "store api"},
            "paths": {}
        })
    }

    #[test]
    fn test_untagged_operations_land_in_default_folder() {
        let mut doc = base();
        doc["paths"] = json!({
            "/b": {"get": {"responses": {"200": {"description": "ok"}}}},
            "/a": {
                "post": {"responses": {"200": {"description": "ok"}}},
                "get": {"tags": [], "responses": {"200": {"description": "ok"}}}
            }
        });
        let result = convert(doc);

        assert_eq!(result.http_collections.len(), 1);
        let root = &result.http_collections[0];
        assert_eq!(root.name, DEFAULT_FOLDER);
        let order: Vec<(&str, &str)> = root
            .items
            .iter()
            .map(|i| (i.path.as_str(), i.method.as_str()))
            .collect();
        assert_eq!(order, vec![("/a", "get"), ("/a", "post"), ("/b", "get")]);
        assert!(root.children.is_empty());
    }

    #[test]
    fn test_tag_forest_nested_under_default_folder() {
        let mut doc = base();
        doc["paths"] = json!({
            "/orders": {"get": {"tags": ["Shop/Orders", "ignored"], "responses": {"200": {"description": "ok"}}}},
            "/carts": {"get": {"tags": ["Shop/Carts"], "responses": {"200": {"description": "ok"}}}},
            "/admin": {"get": {"tags": ["Admin"], "responses": {"200": {"description": "ok"}}}}
        });
        let result = convert(doc);

        let root = &result.http_collections[0];
        let roots: Vec<&str> = root.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(roots, vec!["Shop", "Admin"]);

        let shop = &root.children[0];
        let nested: Vec<&str> = shop.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(nested, vec!["Orders", "Carts"]);
        assert_eq!(shop.children[0].items[0].path, "/orders");
        assert!(result.find_collection("ignored").is_none());
    }

    #[test]
    fn test_webhooks_are_walked_and_malformed_entries_skipped() {
        let mut doc = base();
        doc["x-webhooks"] = json!({
            "newOrder": {"post": {"tags": ["Hooks"], "responses": {"200": {"description": "ok"}}}},
            "broken": {"post": {"parameters": "nope"}}
        });
        let result = convert(doc);

        let items = result.api_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].path, "newOrder");
        assert!(items[0].webhook);
        assert!(!result.extra.contains_key("x-webhooks"));
    }

    #[test]
    fn test_webhooks_field_is_walked() {
        let mut doc = base();
        doc["openapi"] = json!("3.1.0");
        doc["webhooks"] = json!({
            "petAdded": {"post": {"responses": {"200": {"description": "ok"}}}}
        });
        let result = convert(doc);

        let root = &result.http_collections[0];
        assert_eq!(root.items.len(), 1);
        assert_eq!(root.items[0].path, "petAdded");
        assert_eq!(root.items[0].method, "post");
        assert!(root.items[0].webhook);
        assert!(!result.extra.contains_key("webhooks"));
    }

    #[test]
    fn test_webhooks_field_wins_over_extension() {
        let mut doc = base();
        doc["webhooks"] = json!({
            "fromField": {"post": {"responses": {"200": {"description": "ok"}}}}
        });
        doc["x-webhooks"] = json!({
            "fromExtension": {"post": {"responses": {"200": {"description": "ok"}}}}
        });
        let result = convert(doc);

        let paths: Vec<&str> = result.api_items().iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["fromField"]);
    }

    #[test]
    fn test_base_path_from_kebab_case_extension() {
        let mut doc = base();
        doc["x-base-path"] = json!("/v3");
        let result = convert(doc);

        assert_eq!(result.base_path.as_deref(), Some("/v3"));
        assert!(!result.extra.contains_key("x-base-path"));
    }

    #[test]
    fn test_environments_from_servers() {
        let mut doc = base();
        doc["servers"] = json!([
            {"url": "https://{region}.example.com/v1", "variables": {"region": {"default": "eu"}}},
            {"url": "http://localhost:8080", "description": "Local"}
        ]);
        let result = convert(doc);

        assert_eq!(result.environments.len(), 2);
        let remote = &result.environments[0];
        assert_eq!(remote.name, "https://{region}.example.com/v1");
        assert_eq!(remote.base_url, "https://eu.example.com/v1");
        assert_eq!(remote.variables.get("region").map(String::as_str), Some("eu"));
        assert_eq!(result.environments[1].name, "Local");
    }

    #[test]
    fn test_security_schemes_collection() {
        let mut doc = base();
        doc["components"] = json!({"securitySchemes": {
            "bearer": {"type": "http", "scheme": "bearer", "bearerFormat": "JWT"},
            "key": {"type": "apiKey", "name": "X-Key", "in": "header"},
            "alias": {"$ref": "#/components/securitySchemes/key"}
        }});
        let result = convert(doc);

        assert_eq!(result.security_schemes.len(), 1);
        let collection = &result.security_schemes[0];
        assert_eq!(collection.name, SECURITY_COLLECTION);
        let names: Vec<&str> = collection.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["alias", "bearer", "key"]);
        assert_eq!(collection.items[0].param_name.as_deref(), Some("X-Key"));
        assert_eq!(collection.items[1].bearer_format.as_deref(), Some("JWT"));
    }

    #[test]
    fn test_metadata_base_path_and_extra() {
        let mut doc = base();
        doc["x-basePath"] = json!("/api");
        doc["x-internal-id"] = json!(42);
        doc["tags"] = json!([{"name": "Shop"}]);
        let result = convert(doc);

        assert_eq!(result.title, "Store");
        assert_eq!(result.description.as_deref(), Some("store api"));
        assert_eq!(result.content_version, "3.0.0");
        assert_eq!(result.base_path.as_deref(), Some("/api"));
        assert_eq!(result.extra.get("version"), Some(&json!("2.1")));
        assert_eq!(result.extra.get("x-internal-id"), Some(&json!(42)));
        assert_eq!(result.extra.get("tags"), Some(&json!([{"name": "Shop"}])));
        assert!(!result.extra.contains_key("x-basePath"));
    }

    #[test]
    fn test_base_path_omitted_when_absent() {
        let value = serde_json::to_value(convert(base())).unwrap();
        assert!(value.get("basePath").is_none());
    }
}
