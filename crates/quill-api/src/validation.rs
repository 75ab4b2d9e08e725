//! Request body shape checks, run before anything reaches the note service.

use quill_core::validation::ValidationErrors;
use quill_core::{NewNote, NoteUpdate};
use serde_json::{Map, Value};

/// Validate a create body: `title` required, `content` string, `tags` string array.
pub fn parse_new_note(body: &Value) -> Result<NewNote, ValidationErrors> {
    let object = as_object(body)?;
    let mut errors = ValidationErrors::new();

    let title = match object.get("title") {
        Some(Value::String(title)) if !title.trim().is_empty() => Some(title.clone()),
        _ => {
            errors.push("title", "Title required");
            None
        }
    };
    let content = optional_string(object, "content", &mut errors);
    let tags = optional_tags(object, &mut errors);

    errors.into_result()?;
    Ok(NewNote {
        title: title.unwrap_or_default(),
        content: content.flatten(),
        tags: tags.flatten(),
    })
}

/// Validate an update body; only fields that are present are checked.
pub fn parse_note_update(body: &Value) -> Result<NoteUpdate, ValidationErrors> {
    let object = as_object(body)?;
    let mut errors = ValidationErrors::new();

    let title = optional_string(object, "title", &mut errors).flatten();
    if title.as_deref().is_some_and(|title| title.trim().is_empty()) {
        errors.push("title", "Title cannot be empty");
    }
    let content = optional_string(object, "content", &mut errors).flatten();
    let tags = optional_tags(object, &mut errors).flatten();
    let is_archived = optional_bool(object, "isArchived", &mut errors);
    let is_pinned = optional_bool(object, "isPinned", &mut errors);

    errors.into_result()?;
    Ok(NoteUpdate {
        title,
        content,
        tags,
        is_archived,
        is_pinned,
    })
}

fn as_object(body: &Value) -> Result<&Map<String, Value>, ValidationErrors> {
    body.as_object()
        .ok_or_else(|| ValidationErrors::single("body", "Request body must be a JSON object"))
}

/// `None` when absent, `Some(None)` when present with the wrong type.
fn optional_string(
    object: &Map<String, Value>,
    field: &str,
    errors: &mut ValidationErrors,
) -> Option<Option<String>> {
    match object.get(field)? {
        Value::String(value) => Some(Some(value.clone())),
        _ => {
            errors.push(field, format!("{} must be a string", capitalize(field)));
            Some(None)
        }
    }
}

fn optional_tags(
    object: &Map<String, Value>,
    errors: &mut ValidationErrors,
) -> Option<Option<Vec<String>>> {
    let Value::Array(items) = object.get("tags")? else {
        errors.push("tags", "Tags must be an array of strings");
        return Some(None);
    };

    let tags: Option<Vec<String>> = items
        .iter()
        .map(|item| item.as_str().map(ToString::to_string))
        .collect();
    if tags.is_none() {
        errors.push("tags", "Tags must be an array of strings");
    }
    Some(tags)
}

fn optional_bool(
    object: &Map<String, Value>,
    field: &str,
    errors: &mut ValidationErrors,
) -> Option<bool> {
    match object.get(field)? {
        Value::Bool(value) => Some(*value),
        _ => {
            errors.push(field, format!("{field} must be a boolean"));
            None
        }
    }
}

fn capitalize(field: &str) -> String {
    let mut chars = field.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn fields(errors: &ValidationErrors) -> Vec<&str> {
        errors.fields().iter().map(|e| e.field.as_str()).collect()
    }

    #[test]
    fn create_accepts_title_only() {
        let new = parse_new_note(&json!({ "title": "X" })).unwrap();
        assert_eq!(new, NewNote::titled("X"));
    }

    #[test]
    fn create_accepts_all_fields() {
        let new =
            parse_new_note(&json!({ "title": "X", "content": "body", "tags": ["a", "b"] }))
                .unwrap();
        assert_eq!(new.content.as_deref(), Some("body"));
        assert_eq!(new.tags, Some(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn create_requires_title() {
        for body in [json!({}), json!({ "title": "" }), json!({ "title": 7 })] {
            let errors = parse_new_note(&body).unwrap_err();
            assert_eq!(fields(&errors), vec!["title"]);
        }
    }

    #[test]
    fn create_reports_every_bad_field() {
        let errors =
            parse_new_note(&json!({ "content": 1, "tags": "not-an-array" })).unwrap_err();
        assert_eq!(fields(&errors), vec!["title", "content", "tags"]);
    }

    #[test]
    fn create_rejects_non_string_tags() {
        let errors = parse_new_note(&json!({ "title": "X", "tags": ["a", 2] })).unwrap_err();
        assert_eq!(fields(&errors), vec!["tags"]);
    }

    #[test]
    fn body_must_be_object() {
        let errors = parse_new_note(&json!(["title"])).unwrap_err();
        assert_eq!(fields(&errors), vec!["body"]);
    }

    #[test]
    fn update_keeps_absent_fields_absent() {
        let update = parse_note_update(&json!({ "isPinned": true, "unknown": 1 })).unwrap();
        assert_eq!(
            update,
            NoteUpdate {
                is_pinned: Some(true),
                ..NoteUpdate::default()
            }
        );
    }

    #[test]
    fn update_rejects_wrong_types_and_null() {
        let errors = parse_note_update(&json!({
            "title": null,
            "isArchived": "yes",
            "tags": [1],
        }))
        .unwrap_err();
        assert_eq!(fields(&errors), vec!["title", "tags", "isArchived"]);
    }

    #[test]
    fn update_rejects_empty_title() {
        let errors = parse_note_update(&json!({ "title": "  " })).unwrap_err();
        assert_eq!(errors.fields()[0].message, "Title cannot be empty");
    }
}
