use super::*;

fn tree(yaml: &str) -> ConfigTree {
    ConfigTree::from_value(serde_yaml::from_str(yaml).unwrap())
}

#[test]
fn test_virtual_tree_is_empty_mapping() {
    let t = ConfigTree::virtual_empty();
    assert!(t.is_virtual());
    assert_eq!(t.root(), &Value::Mapping(Mapping::new()));
}

#[test]
fn test_null_document_is_present_but_empty() {
    let t = ConfigTree::from_value(Value::Null);
    assert!(!t.is_virtual());
    assert!(t.root().as_mapping().unwrap().is_empty());
}

#[test]
fn test_get_nested_path() {
    let t = tree("limits:\n  timeout: 30\n  retries: 2\n");
    assert_eq!(t.get("limits.timeout"), Some(&Value::from(30)));
    assert!(t.get("limits.missing").is_none());
    assert!(t.get("limits.timeout.deeper").is_none());
}

#[test]
fn test_set_creates_intermediate_mappings() {
    let mut t = ConfigTree::virtual_empty();
    t.set("a.b.c", Value::from("x"));
    assert_eq!(t.get("a.b.c"), Some(&Value::from("x")));
}

#[test]
fn test_set_replaces_scalar_parent() {
    let mut t = tree("a: 1\n");
    t.set("a.b", Value::from(2));
    assert_eq!(t.get("a.b"), Some(&Value::from(2)));
}

#[test]
fn test_rename_moves_value() {
    let mut t = tree("motd: hello\n");
    assert!(t.rename("motd", "message.text"));
    assert!(t.get("motd").is_none());
    assert_eq!(t.get("message.text"), Some(&Value::from("hello")));
    assert!(!t.rename("motd", "elsewhere"));
}

#[test]
fn test_version_marker() {
    let mut t = tree("version: 2\nname: x\n");
    assert_eq!(t.version(DEFAULT_VERSION_KEY), Some(2));
    t.set_version(DEFAULT_VERSION_KEY, 4);
    assert_eq!(t.version(DEFAULT_VERSION_KEY), Some(4));

    let quoted = tree("version: \"3\"\n");
    assert_eq!(quoted.version(DEFAULT_VERSION_KEY), Some(3));

    let missing = tree("name: x\n");
    assert_eq!(missing.version(DEFAULT_VERSION_KEY), None);
}

#[test]
fn test_merge_keeps_unknown_keys_and_version() {
    let mut t = tree("version: 3\nname: old\nextra: kept\n");
    t.merge_from(serde_yaml::from_str("name: new\ncount: 5\n").unwrap());

    assert_eq!(t.get("name"), Some(&Value::from("new")));
    assert_eq!(t.get("count"), Some(&Value::from(5)));
    assert_eq!(t.get("extra"), Some(&Value::from("kept")));
    assert_eq!(t.version(DEFAULT_VERSION_KEY), Some(3));
}

#[test]
fn test_tree_path_display() {
    assert_eq!(TreePath::parse("a.b").to_string(), "a.b");
    assert!(TreePath::parse("").is_root());
}
