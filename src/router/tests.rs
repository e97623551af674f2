use super::*;
use http::Method;
use std::time::Instant;

fn router(routes: &[(Method, &str, &'static str)]) -> Router<&'static str> {
    let mut router = Router::new();
    for (method, pattern, name) in routes {
        router.insert(method.clone(), pattern, *name);
    }
    router
}

#[test]
fn test_root_path() {
    let router = router(&[(Method::GET, "/", "root")]);
    match router.lookup(&Method::GET, "/") {
        Lookup::Found(entry, vars) => {
            assert_eq!(entry.value, "root");
            assert!(vars.is_empty());
        }
        other => panic!("expected match, got {other:?}"),
    }
}

#[test]
fn test_parameterized_path() {
    let router = router(&[(Method::GET, "/items/{id}", "get_item")]);
    let Lookup::Found(entry, vars) = router.lookup(&Method::GET, "/items/123") else {
        panic!("expected match");
    };
    assert_eq!(&*entry.pattern, "/items/{id}");
    let vars = RouteVars(vars);
    assert_eq!(vars.get("id"), Some("123"));
    assert_eq!(vars.to_values().get_all("id"), ["123"]);
}

#[test]
fn test_trailing_and_repeated_slashes() {
    let router = router(&[(Method::GET, "//a/{b}/c/", "nested")]);
    assert!(matches!(
        router.lookup(&Method::GET, "/a/1/c"),
        Lookup::Found(..)
    ));
    assert!(matches!(
        router.lookup(&Method::GET, "/a/1/c/"),
        Lookup::Found(..)
    ));
}

#[test]
fn test_method_not_allowed_lists_methods() {
    let router = router(&[
        (Method::POST, "/items", "create"),
        (Method::GET, "/items", "list"),
    ]);
    match router.lookup(&Method::DELETE, "/items") {
        Lookup::MethodNotAllowed(allowed) => assert_eq!(allowed, [Method::GET, Method::POST]),
        other => panic!("expected 405, got {other:?}"),
    }
    assert!(matches!(
        router.lookup(&Method::GET, "/nothing"),
        Lookup::NotFound
    ));
}

#[test]
fn test_duplicate_registration_replaces() {
    let router = router(&[
        (Method::GET, "/items", "first"),
        (Method::GET, "/items/", "second"),
    ]);
    assert_eq!(router.len(), 1);
    let Lookup::Found(entry, _) = router.lookup(&Method::GET, "/items") else {
        panic!("expected match");
    };
    assert_eq!(entry.value, "second");
}

#[test]
fn test_repeated_param_name_last_wins() {
    let router = router(&[(Method::GET, "/org/{id}/user/{id}", "user")]);
    let Lookup::Found(_, vars) = router.lookup(&Method::GET, "/org/1/user/2") else {
        panic!("expected match");
    };
    let vars = RouteVars(vars);
    assert_eq!(vars.get("id"), Some("2"));
    assert_eq!(vars.to_values().get_all("id"), ["2"]);
}

#[test]
fn test_join_paths() {
    assert_eq!(join_paths("/v1/", "/pets"), "/v1/pets");
    assert_eq!(join_paths("", ""), "/");
    assert_eq!(join_paths("/v1", "pets/{id}"), "/v1/pets/{id}");
}

#[test]
fn test_lookup_scales_with_many_routes() {
    let mut router = Router::new();
    for i in 0..500 {
        router.insert(Method::GET, &format!("/api/v1/resource{i}/{{id}}"), i);
    }

    let start = Instant::now();
    for _ in 0..1000 {
        assert!(matches!(
            router.lookup(&Method::GET, "/api/v1/resource250/123"),
            Lookup::Found(..)
        ));
    }
    let duration = start.elapsed();
    assert!(
        duration.as_millis() < 500,
        "Router performance degraded: {}ms for 1000 lookups with 500 routes",
        duration.as_millis()
    );
}
