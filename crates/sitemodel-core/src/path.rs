//! Lookup of fields by nested editor path.
//!
//! Paths look like `author.address.city` or `content_blocks[0].button`. The
//! static schema does not repeat per array item, so indices are dropped when
//! walking it.

use std::sync::LazyLock;

use regex::Regex;

use crate::field::Field;

static ARRAY_INDEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\d+\]").expect("valid array index pattern"));

/// Find a field by its nested path.
///
/// Returns `None` when a segment matches no key, which includes fields that
/// only exist in a dynamic partial and not in the static schema.
pub fn find_field_by_path<'a>(fields: &'a [Field], path: &str) -> Option<&'a Field> {
    let normalized = ARRAY_INDEX.replace_all(path, "");
    let mut current = fields;
    let mut found = None;

    for segment in normalized.split('.') {
        let field = current.iter().find(|f| f.key == segment)?;
        if field.is_container() {
            current = &field.fields;
        }
        found = Some(field);
    }

    found
}

/// Key of the top-level field a path starts at.
pub fn top_level_key(path: &str) -> &str {
    path.split(['[', '.']).next().unwrap_or(path)
}

/// Whether the path passes through an array item.
pub fn path_has_array_index(path: &str) -> bool {
    ARRAY_INDEX.is_match(path)
}

/// Item index of `nest_path` directly under the array field at `field_path`.
///
/// `("content_blocks[2].button", "content_blocks")` gives `Some(2)`.
pub fn sub_target_index(nest_path: Option<&str>, field_path: &str) -> Option<usize> {
    let rest = nest_path?.strip_prefix(field_path)?.strip_prefix('[')?;
    let (digits, _) = rest.split_once(']')?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldType;

    fn static_fields() -> Vec<Field> {
        vec![
            Field::new("draft", FieldType::Boolean),
            Field::new("title", FieldType::String),
            Field::new("content_blocks", FieldType::Accordion).with_fields(vec![
                Field::new("disabled", FieldType::Boolean),
                Field::new("content_type", FieldType::String),
            ]),
            Field::new("author", FieldType::Nest).with_fields(vec![
                Field::new("name", FieldType::String),
                Field::new("address", FieldType::Nest).with_fields(vec![
                    Field::new("street", FieldType::String),
                    Field::new("city", FieldType::String),
                ]),
            ]),
        ]
    }

    #[test]
    fn test_find_top_level_and_nested() {
        let fields = static_fields();
        assert_eq!(find_field_by_path(&fields, "title").map(|f| f.key.as_str()), Some("title"));
        assert_eq!(
            find_field_by_path(&fields, "author.name").map(|f| f.key.as_str()),
            Some("name")
        );
        assert_eq!(
            find_field_by_path(&fields, "author.address.city").map(|f| f.key.as_str()),
            Some("city")
        );
    }

    #[test]
    fn test_find_strips_array_indices() {
        let fields = static_fields();
        let field = find_field_by_path(&fields, "content_blocks[0].content_type");
        assert_eq!(field.map(|f| f.key.as_str()), Some("content_type"));
    }

    #[test]
    fn test_find_dynamic_only_field_is_none() {
        let fields = static_fields();
        assert!(find_field_by_path(&fields, "content_blocks[0].button").is_none());
        assert!(find_field_by_path(&fields, "missing").is_none());
        assert!(find_field_by_path(&fields, "").is_none());
    }

    #[test]
    fn test_find_does_not_skip_empty_container() {
        let fields = vec![
            Field::new("gallery", FieldType::Accordion),
            Field::new("caption", FieldType::String),
        ];
        assert!(find_field_by_path(&fields, "gallery.caption").is_none());
        assert_eq!(
            find_field_by_path(&fields, "gallery").map(|f| f.key.as_str()),
            Some("gallery")
        );
    }

    #[test]
    fn test_top_level_key() {
        assert_eq!(top_level_key("author.name"), "author");
        assert_eq!(top_level_key("content_blocks[0].button"), "content_blocks");
        assert_eq!(top_level_key("title"), "title");
    }

    #[test]
    fn test_path_has_array_index() {
        assert!(path_has_array_index("content_blocks[3].button"));
        assert!(!path_has_array_index("author.address"));
        assert!(!path_has_array_index("weird[x]"));
    }

    #[test]
    fn test_sub_target_index() {
        assert_eq!(
            sub_target_index(Some("content_blocks[2].button"), "content_blocks"),
            Some(2)
        );
        assert_eq!(sub_target_index(Some("content_blocks[11]"), "content_blocks"), Some(11));
        assert_eq!(sub_target_index(Some("author.name"), "content_blocks"), None);
        assert_eq!(sub_target_index(Some("content_blocks.button"), "content_blocks"), None);
        assert_eq!(sub_target_index(None, "content_blocks"), None);
    }
}
