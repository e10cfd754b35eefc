//! End-to-end resolution tests against a stubbed forge.

use marionette_core::{Slug, Version};
use marionette_manifest::parse;
use marionette_resolver::{ResolveError, Resolver, ResolverOptions, write_dump};
use serde_json::json;
use std::collections::HashSet;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn stub_module(server: &MockServer, slug: &str, versions: &[&str]) {
    let releases: Vec<_> = versions.iter().map(|v| json!({"version": v})).collect();
    Mock::given(method("GET"))
        .and(path(format!("/v3/modules/{slug}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "slug": slug,
            "releases": releases,
        })))
        .mount(server)
        .await;
}

async fn stub_release(server: &MockServer, slug: &str, version: &str, deps: &[(&str, &str)]) {
    let dependencies: Vec<_> = deps
        .iter()
        .map(|(name, req)| {
            if req.is_empty() {
                json!({"name": name})
            } else {
                json!({"name": name, "version_requirement": req})
            }
        })
        .collect();
    Mock::given(method("GET"))
        .and(path(format!("/v3/releases/{slug}-{version}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "slug": format!("{slug}-{version}"),
            "metadata": {"dependencies": dependencies},
        })))
        .mount(server)
        .await;
}

fn slugs(items: &[&str]) -> HashSet<Slug> {
    items.iter().map(|s| Slug::parse(s).unwrap()).collect()
}

fn module_versions(modules: &[marionette_manifest::ModuleDecl]) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = modules
        .iter()
        .map(|m| {
            (
                m.slug().to_string(),
                m.version().map(ToString::to_string).unwrap_or_default(),
            )
        })
        .collect();
    out.sort();
    out
}

#[tokio::test]
async fn basic_resolution_pins_discovered_dependencies() {
    let server = MockServer::start().await;
    stub_module(&server, "test-default", &["1.2.3"]).await;
    stub_release(
        &server,
        "test-default",
        "1.2.3",
        &[("test/defaultdependency", ">=1.2.4")],
    )
    .await;
    stub_module(&server, "test-defaultdependency", &["1.2.5"]).await;
    stub_release(&server, "test-defaultdependency", "1.2.5", &[]).await;

    let manifest = format!(
        "forge '{}'\n\
         \n\
         mod 'test-default', '1.2.3'\n\
         \n\
         ## dependencies\n\
         mod 'test-dependency', '1.2.4'\n",
        server.uri()
    );

    let parsed = parse(&manifest).unwrap();
    let mut resolver = Resolver::new(parsed, ResolverOptions::default()).unwrap();
    let resolved = resolver.run().await.unwrap();

    assert_eq!(
        module_versions(&resolved.top_level),
        vec![("test-default".to_string(), "1.2.3".to_string())]
    );
    assert_eq!(
        module_versions(&resolved.dependent),
        vec![("test-defaultdependency".to_string(), "1.2.5".to_string())]
    );

    // Stale dependent entries from the input are not carried over.
    let text = resolved.emit();
    assert!(!text.contains("test-dependency'"));
}

#[tokio::test]
async fn unsatisfiable_dependency_reports_the_violated_requirement() {
    let server = MockServer::start().await;
    stub_module(&server, "test-wrongdepa", &["1.2.3"]).await;
    stub_module(&server, "test-wrongdepb", &["1.2.3"]).await;
    stub_module(&server, "test-wrongdepc", &["1.2.3"]).await;
    stub_release(
        &server,
        "test-wrongdepa",
        "1.2.3",
        &[("test/wrongdepc", ">=1.2.3")],
    )
    .await;
    stub_release(
        &server,
        "test-wrongdepb",
        "1.2.3",
        &[("test/wrongdepc", "<1.2.3")],
    )
    .await;
    stub_release(&server, "test-wrongdepc", "1.2.3", &[]).await;

    let manifest = format!(
        "forge '{}'\n\
         \n\
         mod 'test-wrongdepa', '1.2.3'\n\
         mod 'test-wrongdepb', '1.2.3'\n",
        server.uri()
    );

    let parsed = parse(&manifest).unwrap();
    let mut resolver = Resolver::new(parsed, ResolverOptions::default()).unwrap();
    let err = resolver.run().await.unwrap_err();

    match &err {
        ResolveError::NoVersionFound { requirement } => {
            assert_eq!(requirement, "test-wrongdepb => test-wrongdepc (<1.2.3)");
        }
        other => panic!("expected NoVersionFound, got {other:?}"),
    }
}

#[tokio::test]
async fn unsatisfiable_dependency_is_demoted_when_ignored() {
    let server = MockServer::start().await;
    stub_module(&server, "test-wrongdepa", &["1.2.3"]).await;
    stub_module(&server, "test-wrongdepb", &["1.2.3"]).await;
    stub_module(&server, "test-wrongdepc", &["1.2.3"]).await;
    stub_release(
        &server,
        "test-wrongdepa",
        "1.2.3",
        &[("test/wrongdepc", ">=1.2.3")],
    )
    .await;
    stub_release(
        &server,
        "test-wrongdepb",
        "1.2.3",
        &[("test/wrongdepc", "<1.2.3")],
    )
    .await;
    stub_release(&server, "test-wrongdepc", "1.2.3", &[]).await;

    let manifest = format!(
        "forge '{}'\n\
         \n\
         mod 'test-wrongdepa', '1.2.3'\n\
         mod 'test-wrongdepb', '1.2.3'\n",
        server.uri()
    );

    let parsed = parse(&manifest).unwrap();
    let options = ResolverOptions {
        ignore: slugs(&["test-wrongdepc"]),
        ..ResolverOptions::default()
    };
    let mut resolver = Resolver::new(parsed, options).unwrap();
    let resolved = resolver.run().await.unwrap();

    assert_eq!(resolved.top_level.len(), 2);
    assert_eq!(
        module_versions(&resolved.dependent),
        vec![("test-wrongdepc".to_string(), "1.2.3".to_string())]
    );
}

#[tokio::test]
async fn deprecated_module_fails_with_full_context() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/modules/test-deprecated"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "slug": "test-deprecated",
            "releases": [{"version": "1.2.3"}],
            "deprecated_at": "2019-04-12 08:57:41 -0700",
            "deprecated_for": "some reason",
            "superseded_by": {"slug": "other-module"},
        })))
        .mount(&server)
        .await;

    let manifest = format!(
        "forge '{}'\n\nmod 'test-deprecated', '1.2.3'\n",
        server.uri()
    );

    let parsed = parse(&manifest).unwrap();
    let mut resolver = Resolver::new(parsed, ResolverOptions::default()).unwrap();
    let err = resolver.run().await.unwrap_err();

    assert!(matches!(err, ResolveError::ModuleDeprecated { .. }));
    let message = err.to_string();
    assert!(message.contains("2019-04-12 08:57:41 -0700"));
    assert!(message.contains("other-module"));
    assert!(message.contains("some reason"));
}

#[tokio::test]
async fn deprecated_module_is_kept_when_ignored() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/modules/test-deprecated"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "slug": "test-deprecated",
            "releases": [{"version": "1.2.3"}],
            "deprecated_at": "2019-04-12 08:57:41 -0700",
            "deprecated_for": "some reason",
            "superseded_by": {"slug": "other-module"},
        })))
        .mount(&server)
        .await;
    stub_release(&server, "test-deprecated", "1.2.3", &[]).await;

    let manifest = format!(
        "forge '{}'\n\nmod 'test-deprecated', '1.2.3'\n",
        server.uri()
    );

    let parsed = parse(&manifest).unwrap();
    let options = ResolverOptions {
        ignore: slugs(&["test-deprecated"]),
        ..ResolverOptions::default()
    };
    let mut resolver = Resolver::new(parsed, options).unwrap();
    let resolved = resolver.run().await.unwrap();

    assert_eq!(
        module_versions(&resolved.top_level),
        vec![("test-deprecated".to_string(), "1.2.3".to_string())]
    );
}

#[tokio::test]
async fn shared_target_settles_on_a_version_satisfying_both_sources() {
    let server = MockServer::start().await;
    stub_module(&server, "test-sone", &["1.0.0"]).await;
    stub_module(&server, "test-stwo", &["1.0.0"]).await;
    stub_module(&server, "test-shared", &["1.0.0", "0.9.0"]).await;
    stub_release(&server, "test-sone", "1.0.0", &[("test/shared", ">=0.9.0")]).await;
    stub_release(&server, "test-stwo", "1.0.0", &[("test/shared", ">=1.0.0")]).await;
    stub_release(&server, "test-shared", "1.0.0", &[]).await;

    let manifest = format!(
        "forge '{}'\n\
         \n\
         mod 'test-sone', '1.0.0'\n\
         mod 'test-stwo', '1.0.0'\n",
        server.uri()
    );

    let parsed = parse(&manifest).unwrap();
    let mut resolver = Resolver::new(parsed, ResolverOptions::default()).unwrap();
    let resolved = resolver.run().await.unwrap();

    assert_eq!(
        module_versions(&resolved.dependent),
        vec![("test-shared".to_string(), "1.0.0".to_string())]
    );
}

#[tokio::test]
async fn backtracking_downgrades_until_the_graph_validates() {
    let server = MockServer::start().await;
    stub_module(&server, "test-down", &["1.0.0"]).await;
    stub_module(&server, "test-target", &["2.0.0", "1.5.0"]).await;
    stub_release(&server, "test-down", "1.0.0", &[("test/target", "<2.0.0")]).await;
    stub_release(&server, "test-target", "1.5.0", &[]).await;

    let manifest = format!("forge '{}'\n\nmod 'test-down', '1.0.0'\n", server.uri());

    let parsed = parse(&manifest).unwrap();
    let mut resolver = Resolver::new(parsed, ResolverOptions::default()).unwrap();
    let resolved = resolver.run().await.unwrap();

    assert_eq!(
        module_versions(&resolved.dependent),
        vec![("test-target".to_string(), "1.5.0".to_string())]
    );
}

#[tokio::test]
async fn hiding_a_module_only_removes_it_from_the_output() {
    let server = MockServer::start().await;
    stub_module(&server, "test-default", &["1.2.3"]).await;
    stub_release(
        &server,
        "test-default",
        "1.2.3",
        &[("test/defaultdependency", ">=1.2.4")],
    )
    .await;
    stub_module(&server, "test-defaultdependency", &["1.2.5"]).await;
    stub_release(&server, "test-defaultdependency", "1.2.5", &[]).await;

    let manifest = format!("forge '{}'\n\nmod 'test-default', '1.2.3'\n", server.uri());

    let parsed = parse(&manifest).unwrap();
    let options = ResolverOptions {
        hide: slugs(&["test-default"]),
        ..ResolverOptions::default()
    };
    let mut resolver = Resolver::new(parsed, options).unwrap();
    let resolved = resolver.run().await.unwrap();

    assert!(resolved.top_level.is_empty());
    assert_eq!(
        module_versions(&resolved.dependent),
        vec![("test-defaultdependency".to_string(), "1.2.5".to_string())]
    );
}

#[tokio::test]
async fn emission_of_a_resolved_state_is_idempotent() {
    let server = MockServer::start().await;
    stub_module(&server, "test-default", &["1.2.3"]).await;
    stub_release(
        &server,
        "test-default",
        "1.2.3",
        &[("test/defaultdependency", ">=1.2.4")],
    )
    .await;
    stub_module(&server, "test-defaultdependency", &["1.2.5"]).await;
    stub_release(&server, "test-defaultdependency", "1.2.5", &[]).await;

    let manifest = format!("forge '{}'\n\nmod 'test-default', '1.2.3'\n", server.uri());

    let parsed = parse(&manifest).unwrap();
    let mut resolver = Resolver::new(parsed, ResolverOptions::default()).unwrap();
    let emitted = resolver.run().await.unwrap().emit();

    let reparsed = parse(&emitted).unwrap();
    let rebuilt = marionette_manifest::ResolvedManifest::from_parsed(
        &reparsed,
        "## dependencies".to_string(),
    )
    .unwrap();
    assert_eq!(rebuilt.emit(), emitted);
}

/// Build a throwaway git repository containing the given metadata.json.
fn fixture_repo(dir: &std::path::Path, metadata: &str) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join("metadata.json"), metadata).unwrap();

    let git = |args: &[&str]| {
        let status = std::process::Command::new("git")
            .args(["-c", "user.name=test", "-c", "user.email=test@example.com"])
            .args(args)
            .current_dir(dir)
            .status()
            .expect("git not available");
        assert!(status.success(), "git {args:?} failed");
    };

    git(&["init", "--quiet", "--initial-branch=main"]);
    git(&["add", "metadata.json"]);
    git(&["commit", "--quiet", "-m", "metadata"]);
}

#[tokio::test]
async fn repository_module_resolves_through_its_metadata() {
    let server = MockServer::start().await;
    stub_module(&server, "test-stdlib", &["4.2.0"]).await;
    stub_release(&server, "test-stdlib", "4.2.0", &[]).await;

    let tmp = tempfile::tempdir().unwrap();
    let origin = tmp.path().join("origin");
    fixture_repo(
        &origin,
        r#"{
            "name": "acme-repo",
            "version": "3.0.0",
            "dependencies": [
                {"name": "test/stdlib", "version_requirement": ">=4.0.0"}
            ]
        }"#,
    );

    let manifest = format!(
        "forge '{}'\n\nmod 'acme-repo', :git => '{}'\n",
        server.uri(),
        origin.display()
    );

    let parsed = parse(&manifest).unwrap();
    let mut resolver = Resolver::new(parsed, ResolverOptions::default()).unwrap();
    let resolved = resolver.run().await.unwrap();

    assert_eq!(resolved.top_level.len(), 1);
    assert!(resolved.top_level[0].is_repo());
    assert_eq!(
        resolved.top_level[0].version(),
        Some(&Version::new(3, 0, 0))
    );
    assert_eq!(
        module_versions(&resolved.dependent),
        vec![("test-stdlib".to_string(), "4.2.0".to_string())]
    );

    // The emitted text keeps the repository form.
    let text = resolved.emit();
    assert!(text.contains("mod 'acme-repo', :git => '"));
    assert!(text.contains("mod 'test-stdlib', '4.2.0'"));
}

#[tokio::test]
async fn cancellation_aborts_between_requirements() {
    let server = MockServer::start().await;
    stub_module(&server, "test-default", &["1.2.3"]).await;

    let manifest = format!("forge '{}'\n\nmod 'test-default', '1.2.3'\n", server.uri());

    let token = tokio_util::sync::CancellationToken::new();
    token.cancel();

    let parsed = parse(&manifest).unwrap();
    let options = ResolverOptions {
        cancellation: Some(token),
        ..ResolverOptions::default()
    };
    let mut resolver = Resolver::new(parsed, options).unwrap();
    let err = resolver.run().await.unwrap_err();
    assert!(matches!(err, ResolveError::Cancelled));
}

#[tokio::test]
async fn diagnostic_dump_captures_cache_and_graph() {
    let server = MockServer::start().await;
    stub_module(&server, "test-wrongdepa", &["1.2.3"]).await;
    stub_module(&server, "test-wrongdepb", &["1.2.3"]).await;
    stub_module(&server, "test-wrongdepc", &["1.2.3"]).await;
    stub_release(
        &server,
        "test-wrongdepa",
        "1.2.3",
        &[("test/wrongdepc", ">=1.2.3")],
    )
    .await;
    stub_release(
        &server,
        "test-wrongdepb",
        "1.2.3",
        &[("test/wrongdepc", "<1.2.3")],
    )
    .await;
    stub_release(&server, "test-wrongdepc", "1.2.3", &[]).await;

    let manifest = format!(
        "forge '{}'\n\
         \n\
         mod 'test-wrongdepa', '1.2.3'\n\
         mod 'test-wrongdepb', '1.2.3'\n",
        server.uri()
    );

    let parsed = parse(&manifest).unwrap();
    let mut resolver = Resolver::new(parsed, ResolverOptions::default()).unwrap();
    resolver.run().await.unwrap_err();

    let tmp = tempfile::tempdir().unwrap();
    let dump_path = tmp.path().join("errorDump.js");
    write_dump(&dump_path, &resolver.diagnostic_dump()).unwrap();

    let text = std::fs::read_to_string(&dump_path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert!(value.get("forgeCache").is_some());
    assert!(value.get("dependencyGraph").is_some());
    let nodes = value["dependencyGraph"]["nodes"].as_array().unwrap();
    assert!(
        nodes
            .iter()
            .any(|n| n["id"].as_str() == Some("test-wrongdepc"))
    );
}

#[tokio::test]
async fn forge_transport_errors_are_fatal() {
    // Point at a closed port: connection refused.
    let manifest = "forge 'http://127.0.0.1:1'\n\nmod 'test-default'\n";
    let parsed = parse(manifest).unwrap();
    let mut resolver = Resolver::new(parsed, ResolverOptions::default()).unwrap();
    let err = resolver.run().await.unwrap_err();
    assert!(matches!(
        err,
        ResolveError::Manifest(marionette_manifest::ManifestError::Forge(_))
    ));
}

#[tokio::test]
async fn output_lists_do_not_overlap() {
    let server = MockServer::start().await;
    stub_module(&server, "test-default", &["1.2.3"]).await;
    stub_release(
        &server,
        "test-default",
        "1.2.3",
        &[("test/defaultdependency", ">=1.2.4")],
    )
    .await;
    stub_module(&server, "test-defaultdependency", &["1.2.5"]).await;
    stub_release(&server, "test-defaultdependency", "1.2.5", &[]).await;

    let manifest = format!(
        "forge '{}'\n\
         \n\
         mod 'test-default', '1.2.3'\n",
        server.uri()
    );

    let parsed = parse(&manifest).unwrap();
    let mut resolver = Resolver::new(parsed, ResolverOptions::default()).unwrap();
    let resolved = resolver.run().await.unwrap();

    let top: HashSet<String> = resolved
        .top_level
        .iter()
        .map(|m| m.slug().to_string())
        .collect();
    let dependent: HashSet<String> = resolved
        .dependent
        .iter()
        .map(|m| m.slug().to_string())
        .collect();
    assert!(top.is_disjoint(&dependent));

    // Every emitted module carries a concrete version.
    for module in resolved.top_level.iter().chain(&resolved.dependent) {
        assert!(module.version().is_some());
        assert!(Version::parse(&module.version().unwrap().to_string()).is_ok());
    }
}
