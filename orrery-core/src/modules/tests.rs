use super::*;

#[test]
fn test_resolve_registered_module() {
    let registry = StaticModuleRegistry::new();
    registry.register(ModuleHandle::new("core", "/tmp/core"));

    let handle = registry.resolve(&ModuleId::new("core")).unwrap();
    assert_eq!(handle.id().as_str(), "core");
    assert_eq!(handle.data_dir(), Path::new("/tmp/core"));
}

#[test]
fn test_resolve_missing_module() {
    let registry = StaticModuleRegistry::new();
    assert!(registry.resolve(&ModuleId::new("absent")).is_none());
}

#[test]
fn test_register_replaces_and_unregister_removes() {
    let registry = StaticModuleRegistry::new();
    assert!(registry.register(ModuleHandle::new("core", "/a")).is_none());
    let previous = registry.register(ModuleHandle::new("core", "/b")).unwrap();
    assert_eq!(previous.data_dir(), Path::new("/a"));
    assert_eq!(registry.len(), 1);

    registry.unregister(&ModuleId::new("core"));
    assert!(registry.is_empty());
}

#[test]
fn test_ids_are_sorted() {
    let registry = StaticModuleRegistry::new();
    registry.register(ModuleHandle::new("zeta", "/z"));
    registry.register(ModuleHandle::new("alpha", "/a"));
    assert_eq!(registry.ids(), vec![ModuleId::new("alpha"), ModuleId::new("zeta")]);
}
