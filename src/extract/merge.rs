use crate::extract::templates::ExtractionTemplate;
use serde_json::{Map, Value};

/// Combines a template schema with an optional caller schema
///
/// A caller object schema with `properties` extends the template: caller
/// properties override template properties of the same name and the
/// `required` lists are unioned (template order first). A caller schema
/// without `properties` replaces the template schema outright.
pub fn merge_schema(template: &ExtractionTemplate, caller: Option<&Value>) -> Value {
    let caller = match caller {
        Some(Value::Null) | None => return template.schema.clone(),
        Some(caller) => caller,
    };

    let caller_props = match caller.get("properties").and_then(Value::as_object) {
        Some(props) => props,
        None => return caller.clone(),
    };

    let mut merged = match template.schema.as_object() {
        Some(obj) => obj.clone(),
        None => Map::new(),
    };

    let mut properties = merged
        .get("properties")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    for (name, definition) in caller_props {
        properties.insert(name.clone(), definition.clone());
    }

    let mut required: Vec<Value> = Vec::new();
    for list in [merged.get("required"), caller.get("required")] {
        for name in list.and_then(Value::as_array).into_iter().flatten() {
            if !required.contains(name) {
                required.push(name.clone());
            }
        }
    }

    merged.insert("type".to_string(), Value::String("object".to_string()));
    merged.insert("properties".to_string(), Value::Object(properties));
    if !required.is_empty() {
        merged.insert("required".to_string(), Value::Array(required));
    }

    Value::Object(merged)
}

/// Template instruction followed by the caller's, as separate paragraphs
pub fn merge_prompt(template: &ExtractionTemplate, caller: Option<&str>) -> String {
    match caller.map(str::trim).filter(|p| !p.is_empty()) {
        Some(extra) => format!("{}\n\n{}", template.prompt, extra),
        None => template.prompt.to_string(),
    }
}
