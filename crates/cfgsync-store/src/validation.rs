//! Validation for record names, collection names and record keys

use serde_json::Value;

use crate::{Error, Record, Result};

/// Maximum length of a record name.
pub const MAX_NAME_LENGTH: usize = 250;

/// Characters never allowed in record or collection names.
pub const FORBIDDEN_NAME_CHARS: [char; 9] = [':', '?', '*', '<', '>', '"', '\'', '/', '\\'];

/// Validate a record name.
///
/// A name must be namespaced (contain a dot), be at most
/// [`MAX_NAME_LENGTH`] characters and avoid [`FORBIDDEN_NAME_CHARS`].
pub fn validate_name(name: &str) -> Result<()> {
    if !name.contains('.') {
        return Err(Error::invalid_name(
            name,
            "missing namespace, expected '<namespace>.<name>'",
        ));
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(Error::invalid_name(
            name,
            format!("exceeds the maximum length of {MAX_NAME_LENGTH} characters"),
        ));
    }

    check_characters(name)?;

    if name.split('.').any(str::is_empty) {
        return Err(Error::invalid_name(name, "contains an empty segment"));
    }

    Ok(())
}

/// Check a name used to look a record up.
///
/// Looser than [`validate_name`] so records already on disk stay reachable,
/// but a name can never leave its collection directory.
pub fn validate_lookup_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_name(name, "is empty"));
    }
    if let Some(c) = name.chars().find(|c| matches!(c, '/' | '\\')) {
        return Err(Error::invalid_name(
            name,
            format!("contains the path separator '{c}'"),
        ));
    }
    if name.chars().any(char::is_control) {
        return Err(Error::invalid_name(name, "contains a control character"));
    }
    Ok(())
}

/// Validate a collection name. The empty string is the default collection.
pub fn validate_collection_name(collection: &str) -> Result<()> {
    if collection.is_empty() {
        return Ok(());
    }

    check_characters(collection)?;

    if collection.split('.').any(|segment| segment.is_empty() || segment.starts_with('.')) {
        return Err(Error::invalid_name(collection, "contains an empty segment"));
    }

    Ok(())
}

fn check_characters(name: &str) -> Result<()> {
    if let Some(c) = name.chars().find(|c| FORBIDDEN_NAME_CHARS.contains(c)) {
        return Err(Error::invalid_name(
            name,
            format!("contains the forbidden character '{c}'"),
        ));
    }
    if name.chars().any(char::is_control) {
        return Err(Error::invalid_name(name, "contains a control character"));
    }
    Ok(())
}

/// Validate the keys of a record.
///
/// Dots are reserved as the nesting separator, so no mapping key at any
/// depth may contain one.
pub fn validate_record(name: &str, data: &Record) -> Result<()> {
    let mut path = Vec::new();
    check_mapping(name, data, &mut path)
}

fn check_mapping<'a>(name: &str, map: &'a Record, path: &mut Vec<&'a str>) -> Result<()> {
    for (key, value) in map {
        path.push(key);
        if key.contains('.') {
            return Err(Error::InvalidValue {
                name: name.to_string(),
                key: path.join("/"),
                reason: "keys must not contain a dot".into(),
            });
        }
        check_value(name, value, path)?;
        path.pop();
    }
    Ok(())
}

fn check_value<'a>(name: &str, value: &'a Value, path: &mut Vec<&'a str>) -> Result<()> {
    match value {
        Value::Object(map) => check_mapping(name, map, path),
        Value::Array(items) => items.iter().try_for_each(|item| check_value(name, item, path)),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("system.site")]
    #[case("views.view.content")]
    #[case("language.entity.fr")]
    fn accepts_valid_names(#[case] name: &str) {
        assert!(validate_name(name).is_ok());
    }

    #[rstest]
    #[case("nonamespace")]
    #[case("system/site")]
    #[case("system.site:x")]
    #[case("system.si?te")]
    #[case("system.*")]
    #[case("system.<site>")]
    #[case("system.\"site\"")]
    #[case("system.'site'")]
    #[case("system\\site.x")]
    #[case("system..site")]
    fn rejects_invalid_names(#[case] name: &str) {
        let err = validate_name(name).unwrap_err();
        assert!(matches!(err, Error::InvalidName { .. }), "{name}: {err:?}");
    }

    #[test]
    fn rejects_overlong_names() {
        let name = format!("system.{}", "a".repeat(MAX_NAME_LENGTH));
        assert!(validate_name(&name).is_err());

        let exact = format!("system.{}", "a".repeat(MAX_NAME_LENGTH - "system.".len()));
        assert!(validate_name(&exact).is_ok());
    }

    #[rstest]
    #[case("../system.site")]
    #[case("../../outside")]
    #[case("language\\fr.x")]
    #[case("")]
    fn lookup_rejects_names_leaving_the_collection(#[case] name: &str) {
        assert!(validate_lookup_name(name).is_err(), "{name}");
    }

    #[test]
    fn lookup_accepts_names_found_on_disk() {
        assert!(validate_lookup_name("system.site").is_ok());
        assert!(validate_lookup_name("README").is_ok());
        assert!(validate_lookup_name("..").is_ok());
    }

    #[test]
    fn collection_names_allow_default_and_plain_segments() {
        assert!(validate_collection_name("").is_ok());
        assert!(validate_collection_name("language").is_ok());
        assert!(validate_collection_name("language.fr").is_ok());
        assert!(validate_collection_name("language/fr").is_err());
        assert!(validate_collection_name("language..fr").is_err());
    }

    #[test]
    fn dotted_key_is_reported_with_its_path() {
        let data = json!({"settings": {"items": [{"bad.key": 1}]}});
        let err = validate_record("system.site", data.as_object().unwrap()).unwrap_err();

        match err {
            Error::InvalidValue { name, key, .. } => {
                assert_eq!(name, "system.site");
                assert_eq!(key, "settings/items/bad.key");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn dots_in_values_are_fine() {
        let data = json!({"front": "node.page", "list": ["a.b", "c.d"]});
        assert!(validate_record("system.site", data.as_object().unwrap()).is_ok());
    }
}
