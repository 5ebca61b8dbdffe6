pub mod api_item;
pub mod converter;
pub mod error;
pub mod export;
pub mod folders;
pub mod loader;
pub mod models;
pub mod refs;
pub mod schema_folders;
pub mod swagger2;
pub mod validate;

use std::path::Path;

use crate::converter::Converter;
use crate::error::ConvertError;
use crate::export::ExportResult;
use crate::loader::InputFormat;

/// Loads, validates and converts the document at `path`
pub fn convert_file(path: impl AsRef<Path>) -> Result<ExportResult, ConvertError> {
    let loaded = loader::load_file(path)?;
    Converter::from_loaded(loaded).convert()
}

/// Loads, validates and converts an in-memory document
pub fn convert_slice(bytes: &[u8], format: InputFormat) -> Result<ExportResult, ConvertError> {
    let loaded = loader::load_slice(bytes, format)?;
    Converter::from_loaded(loaded).convert()
}

/// Serializes an export, indented when `pretty` is set
pub fn to_json(result: &ExportResult, pretty: bool) -> Result<String, ConvertError> {
    let json = if pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };
    Ok(json)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    use crate::export::ExportResult;
    use crate::{convert_file, convert_slice, to_json};
    use crate::loader::InputFormat;

    fn convert_json(doc: &Value) -> ExportResult {
        convert_slice(doc.to_string().as_bytes(), InputFormat::Json).unwrap()
    }

    fn ping_openapi() -> Value {
        json!({
            "openapi": "3.0.0",
            "info": {"title": "Ping", "version": "1.0"},
            "paths": {
                "/ping": {
                    "get": {
                        "tags": ["Health"],
                        "responses": {
                            "200": {
                                "description": "pong",
                                "content": {"application/json": {"schema": {"type": "string"}}}
                            }
                        }
                    }
                }
            }
        })
    }

    fn ping_swagger() -> Value {
        json!({
            "swagger": "2.0",
            "info": {"title": "Ping", "version": "1.0"},
            "produces": ["application/json"],
            "paths": {
                "/ping": {
                    "get": {
                        "tags": ["Health"],
                        "responses": {
                            "200": {"description": "pong", "schema": {"type": "string"}}
                        }
                    }
                }
            }
        })
    }

    #[test]
    fn test_ping_round_trip() {
        let result = convert_json(&ping_openapi());

        let health = result.find_collection("Health").unwrap();
        assert_eq!(health.items.len(), 1);
        assert!(health.children.is_empty());

        let item = &health.items[0];
        assert_eq!(item.path, "/ping");
        assert_eq!(item.method, "get");
        assert_eq!(item.responses.len(), 1);
        assert_eq!(item.responses[0].code, 200);
        assert_eq!(item.responses[0].content_type, "application/json");

        let schema = serde_json::to_value(item.responses[0].json_schema.as_ref().unwrap()).unwrap();
        assert_eq!(schema["type"], json!("string"));

        assert_eq!(result.api_items().len(), 1);
    }

    #[test]
    fn test_swagger2_matches_openapi3_shape() {
        let current = convert_json(&ping_openapi());
        let older = convert_json(&ping_swagger());

        assert_eq!(older.http_collections, current.http_collections);
        assert_eq!(older.data_schemas, current.data_schemas);
        assert_eq!(older.environments, current.environments);
        assert_eq!(older.content_version, "2.0");
        assert_eq!(current.content_version, "3.0.0");
    }

    #[test]
    fn test_zero_servers_gives_empty_environment_list() {
        let result = convert_json(&ping_openapi());
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["environments"], json!([]));
    }

    #[test]
    fn test_item_count_matches_operation_count() {
        let doc = json!({
            "openapi": "3.0.0",
            "info": {"title": "Count", "version": "1.0"},
            "paths": {
                "/a": {
                    "get": {"responses": {"200": {"description": "ok"}}},
                    "put": {"tags": ["X/Y"], "responses": {"200": {"description": "ok"}}},
                    "post": {"tags": ["X"], "responses": {"200": {"description": "ok"}}},
                    "delete": {"responses": {"200": {"description": "ok"}}},
                    "options": {"responses": {"200": {"description": "ok"}}},
                    "head": {"responses": {"200": {"description": "ok"}}},
                    "patch": {"tags": ["Z"], "responses": {"200": {"description": "ok"}}},
                    "trace": {"responses": {"200": {"description": "ok"}}}
                },
                "/b": {"get": {"tags": ["X/Y/Z"], "responses": {"200": {"description": "ok"}}}}
            }
        });
        let result = convert_json(&doc);
        assert_eq!(result.api_items().len(), 9);
    }

    #[test]
    fn test_tag_path_nesting() {
        let doc = json!({
            "openapi": "3.0.0",
            "info": {"title": "Nest", "version": "1.0"},
            "paths": {
                "/z": {"get": {"tags": ["X/Y/Z"], "responses": {"200": {"description": "ok"}}}},
                "/z2": {"post": {"tags": ["X/Y/Z"], "responses": {"200": {"description": "ok"}}}},
                "/y": {"get": {"tags": ["X/Y"], "responses": {"200": {"description": "ok"}}}}
            }
        });
        let result = convert_json(&doc);

        let x = result.find_collection("X").unwrap();
        let y = x.find("Y").unwrap();
        let z = y.find("Z").unwrap();
        let paths: Vec<&str> = z.items.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["/z", "/z2"]);
        assert_eq!(y.items.len(), 1);
        assert!(x.items.is_empty());
    }

    #[test]
    fn test_convert_yaml_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("openapi.yaml");
        let mut file = File::create(&file_path).unwrap();
        write!(
            file,
            r#"
openapi: 3.1.0
info:
  title: Yaml API
  version: "1.0"
servers:
  - url: https://api.example.com
    description: Production
paths:
  /users:
    get:
      tags: [Users]
      responses:
        200:
          description: ok
"#
        )
        .unwrap();

        let result = convert_file(&file_path).unwrap();
        assert_eq!(result.title, "Yaml API");
        assert_eq!(result.environments[0].name, "Production");
        assert_eq!(result.environments[0].base_url, "https://api.example.com");
        assert_eq!(result.find_collection("Users").unwrap().items[0].responses[0].code, 200);
    }

    #[test]
    fn test_swagger2_base_path_reaches_export() {
        let mut doc = ping_swagger();
        doc["host"] = json!("api.example.com");
        doc["basePath"] = json!("/v2");
        let result = convert_json(&doc);

        assert_eq!(result.base_path.as_deref(), Some("/v2"));
        assert_eq!(result.environments[0].base_url, "https://api.example.com/v2");
        assert!(!result.extra.contains_key("x-basePath"));
    }

    #[test]
    fn test_minor_violations_still_convert() {
        let yaml = br#"
openapi: 3.0.0
info:
  title: Loose
  version: 1.0
tags:
  - description: nameless
paths:
  x-owner: platform
  /items:
    get:
      tags: [Items]
      parameters:
        - name: q
      responses:
        200:
          description: ok
          content:
            application/json:
              schema:
                type: object
                properties:
                  id:
                    type: string
                    required: true
"#;
        let result = convert_slice(yaml, InputFormat::Yaml).unwrap();

        assert_eq!(result.extra.get("version"), Some(&json!("1.0")));
        let items = result.api_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].path, "/items");
        assert!(items[0].parameters.query.is_empty());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(convert_file(dir.path().join("nope.json")).is_err());
    }

    #[test]
    fn test_pretty_and_compact_output() {
        let result = convert_json(&ping_openapi());
        let pretty = to_json(&result, true).unwrap();
        let compact = to_json(&result, false).unwrap();

        assert!(pretty.contains('\n'));
        assert!(!compact.contains('\n'));
        let reparsed: Value = serde_json::from_str(&compact).unwrap();
        for key in ["httpCollections", "dataSchemas", "securitySchemes", "environments", "extra", "title", "contentVersion"] {
            assert!(reparsed.get(key).is_some(), "missing {}", key);
        }
    }
}
