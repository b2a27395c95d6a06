use super::*;

fn ids(order: &[ExtensionId]) -> Vec<&str> {
    order.iter().map(ExtensionId::as_str).collect()
}

#[test]
fn test_ties_break_by_registration_order() {
    let decls = vec![
        DependencyDecl::new("a", &[]),
        DependencyDecl::new("c", &["a"]),
        DependencyDecl::new("b", &["a"]),
    ];
    assert_eq!(ids(&load_order(&decls).unwrap()), vec!["a", "c", "b"]);
    assert_eq!(ids(&unload_order(&decls).unwrap()), vec!["b", "c", "a"]);
}

#[test]
fn test_dependencies_come_first() {
    let decls = vec![
        DependencyDecl::new("web", &["db", "cache"]),
        DependencyDecl::new("cache", &["db"]),
        DependencyDecl::new("db", &[]),
        DependencyDecl::new("metrics", &[]),
    ];
    let order = load_order(&decls).unwrap();
    let pos = |name: &str| order.iter().position(|id| id.as_str() == name).unwrap();

    for decl in &decls {
        for dep in &decl.dependencies {
            assert!(pos(dep.as_str()) < pos(decl.id.as_str()), "{} before {}", dep, decl.id);
        }
    }
    assert_eq!(ids(&order), vec!["db", "cache", "web", "metrics"]);
}

#[test]
fn test_cycle_is_detected() {
    let decls = vec![
        DependencyDecl::new("a", &["c"]),
        DependencyDecl::new("b", &["a"]),
        DependencyDecl::new("c", &["b"]),
        DependencyDecl::new("free", &[]),
    ];
    match load_order(&decls) {
        Err(OrchestratorError::DependencyCycle(msg)) => {
            assert!(msg.contains("a, b, c"), "unexpected message: {msg}");
            assert!(!msg.contains("free"));
        }
        other => panic!("expected a cycle, got {other:?}"),
    }
}

#[test]
fn test_self_dependency_is_a_cycle() {
    let decls = vec![DependencyDecl::new("loop", &["loop"])];
    assert!(matches!(
        load_order(&decls),
        Err(OrchestratorError::DependencyCycle(_))
    ));
}

#[test]
fn test_unregistered_dependencies_are_ignored() {
    let decls = vec![
        DependencyDecl::new("b", &["ghost"]),
        DependencyDecl::new("a", &[]),
    ];
    assert_eq!(ids(&load_order(&decls).unwrap()), vec!["b", "a"]);
}

#[test]
fn test_with_dependencies() {
    let decls = vec![
        DependencyDecl::new("a", &[]),
        DependencyDecl::new("b", &["a"]),
        DependencyDecl::new("c", &["b", "ghost"]),
        DependencyDecl::new("d", &["a"]),
    ];
    let order = with_dependencies(&ExtensionId::from("c"), &decls).unwrap();
    assert_eq!(ids(&order), vec!["a", "b", "c"]);

    assert!(matches!(
        with_dependencies(&ExtensionId::from("zzz"), &decls),
        Err(OrchestratorError::ExtensionNotFound(_))
    ));
}
