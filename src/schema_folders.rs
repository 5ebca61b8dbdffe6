use log::{debug, warn};
use std::collections::BTreeMap;

use crate::export::{SchemaFolder, SchemaItem};
use crate::models::{component_ref, Components, MediaType, ReferenceOr, Schema};
use crate::refs::{RefMap, ResolvedRefs};

pub const SCHEMAS_FOLDER: &str = "Schemas";
pub const RESPONSES_FOLDER: &str = "Response";
pub const REQUEST_BODIES_FOLDER: &str = "RequestBodies";

/// Records every request-body component that is itself a `$ref`
pub fn record_request_body_refs(components: Option<&Components>, refs: &mut RefMap) {
    let Some(components) = components else {
        return;
    };

    for (name, body) in &components.requestBodies {
        if let ReferenceOr::Reference { reference } = body {
            refs.record(component_ref("requestBodies", name), reference.clone());
        }
    }
}

/// Groups the reusable schemas, responses and request bodies into one
/// folder per section. Folders appear in section order and only once they
/// hold an item; items within a folder are ordered by name.
pub fn build_schema_folders(
    components: Option<&Components>,
    refs: &ResolvedRefs,
) -> Vec<SchemaFolder> {
    let mut folders = SchemaFolders::default();
    let Some(components) = components else {
        return folders.into_inner();
    };

    for (name, schema) in &components.schemas {
        if schema.is_empty() {
            debug!("Skipping empty schema {}", name);
            continue;
        }
        folders.insert(
            SCHEMAS_FOLDER,
            SchemaItem {
                id: component_ref("schemas", name),
                name: name.clone(),
                description: schema.description.clone(),
                json_schema: Some(schema.clone()),
            },
        );
    }

    for (name, response) in &components.responses {
        let id = component_ref("responses", name);
        let item = match response {
            ReferenceOr::Reference { reference } => SchemaItem {
                id,
                name: name.clone(),
                description: None,
                json_schema: Some(Schema::reference(reference.clone())),
            },
            ReferenceOr::Item(response) => {
                if response.description.is_empty() && response.content.is_empty() {
                    debug!("Skipping empty response {}", name);
                    continue;
                }
                SchemaItem {
                    id,
                    name: name.clone(),
                    description: non_empty(&response.description),
                    json_schema: first_schema(&response.content),
                }
            }
        };
        folders.insert(RESPONSES_FOLDER, item);
    }

    for (name, body) in &components.requestBodies {
        let id = component_ref("requestBodies", name);
        let item = match body {
            ReferenceOr::Reference { .. } => match refs.target(&id) {
                Some(target) => SchemaItem {
                    id: id.clone(),
                    name: name.clone(),
                    description: None,
                    json_schema: Some(Schema::reference(target)),
                },
                None => {
                    warn!("Request body {} has a cyclic reference chain, skipping", name);
                    continue;
                }
            },
            ReferenceOr::Item(body) => {
                let description = body.description.as_deref().unwrap_or_default();
                if description.is_empty() && body.content.is_empty() {
                    debug!("Skipping empty request body {}", name);
                    continue;
                }
                SchemaItem {
                    id,
                    name: name.clone(),
                    description: non_empty(description),
                    json_schema: first_schema(&body.content),
                }
            }
        };
        folders.insert(REQUEST_BODIES_FOLDER, item);
    }

    folders.into_inner()
}

/// Schema of the first media type in key order
pub fn first_schema(content: &BTreeMap<String, MediaType>) -> Option<Schema> {
    content.values().next().and_then(|media| media.schema.clone())
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[derive(Default)]
struct SchemaFolders {
    folders: Vec<SchemaFolder>,
}

impl SchemaFolders {
    fn insert(&mut self, label: &str, item: SchemaItem) {
        let index = match self.folders.iter().position(|f| f.name == label) {
            Some(index) => index,
            None => {
                self.folders.push(SchemaFolder {
                    name: label.to_string(),
                    items: Vec::new(),
                });
                self.folders.len() - 1
            }
        };
        self.folders[index].items.push(item);
    }

    fn into_inner(mut self) -> Vec<SchemaFolder> {
        for folder in &mut self.folders {
            folder.items.sort_by(|a, b| a.name.cmp(&b.name));
        }
        self.folders
    }
}
