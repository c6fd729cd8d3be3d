mod common;

use common::{
    FakeRepository, JarTarget, LibraryTable, jar_bytes, widget_binary, widget_sources, write_jar,
};
use serde_json::json;
use sourcescope_api::AttachTarget;
use sourcescope_core::hash::sha1_file;
use sourcescope_core::http::{join_url, with_query};
use sourcescope_core::{FinderConfig, OrchestratorConfig, ResolutionOutcome, SourceScope, SourceScopeConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const NEXUS: &str = "https://nexus.example.com";
const WIDGET_JAR: &str =
    "https://nexus.example.com/repository/releases/org/example/widget/2.1/widget-2.1.jar";
const WIDGET_SOURCES: &str =
    "https://nexus.example.com/repository/releases/org/example/widget/2.1/widget-2.1-sources.jar";

fn config(temp: &Path, finders: Vec<FinderConfig>) -> SourceScopeConfig {
    SourceScopeConfig {
        workers: 2,
        poll_interval_ms: 5,
        maven_repository: Some(temp.join("m2")),
        gradle_cache: Some(temp.join("gradle")),
        finders,
        ..SourceScopeConfig::default()
    }
}

fn nexus() -> FinderConfig {
    FinderConfig::Nexus {
        url: NEXUS.to_string(),
        credentials: None,
        repository_id: None,
    }
}

fn orchestrator_config() -> OrchestratorConfig {
    OrchestratorConfig {
        workers: 2,
        poll_interval: Duration::from_millis(5),
        time_budget: Some(Duration::from_secs(60)),
    }
}

fn resolve(scope: &SourceScope, table: &Arc<LibraryTable>, binary: &Path) -> ResolutionOutcome {
    let targets: Vec<Arc<dyn AttachTarget>> = vec![Arc::new(JarTarget(binary.to_path_buf()))];
    scope
        .orchestrator_with(table.clone(), orchestrator_config())
        .resolve(&targets, None)
        .unwrap()
}

/// Nexus 3 answering the hash search with the main jar; sources sit next to it.
fn serve_nexus3(repo: &FakeRepository, sha1: &str) {
    repo.route(join_url(NEXUS, "service/rest/v1/status"), 200, Vec::new());
    repo.route_json(
        with_query(&join_url(NEXUS, "service/rest/v1/search/assets"), &[("sha1", sha1)]),
        json!({
            "items": [{
                "downloadUrl": WIDGET_JAR,
                "path": "org/example/widget/2.1/widget-2.1.jar",
                "repository": "releases",
                "maven2": {"groupId": "org.example", "artifactId": "widget", "version": "2.1"}
            }],
            "continuationToken": null
        }),
    );
    repo.route(WIDGET_SOURCES, 200, widget_sources());
}

#[test]
fn test_nexus_resolution_is_cached_across_sessions() {
    let temp = tempfile::tempdir().unwrap();
    let home = temp.path().join("home");
    let binary = temp.path().join("project/lib/widget-2.1.jar");
    widget_binary(&binary);
    let sha1 = sha1_file(&binary).unwrap();

    let repo = Arc::new(FakeRepository::new());
    serve_nexus3(&repo, &sha1);
    let table = Arc::new(LibraryTable::new());

    {
        let scope = SourceScope::with_transport(
            home.clone(),
            config(temp.path(), vec![nexus()]),
            repo.clone(),
        )
        .unwrap();
        let outcome = resolve(&scope, &table, &binary);

        let report = outcome.report().unwrap();
        assert!(outcome.is_completed());
        assert_eq!(report.resolved.len(), 1);
        assert!(repo.call_count() > 0);

        let record = scope.bindings().find_by_sha1(&sha1).unwrap().unwrap();
        assert_eq!(record.download_url.as_deref(), Some(WIDGET_SOURCES));
        assert!(record.source.starts_with(home.join("sources")));
        assert_eq!(table.source_of(&binary), record.temp);
    }

    // a new session: the session copy is gone, the long-lived copy is not
    let calls_before = repo.call_count();
    let scope =
        SourceScope::with_transport(home.clone(), config(temp.path(), vec![nexus()]), repo.clone())
            .unwrap();
    let outcome = resolve(&scope, &table, &binary);

    assert_eq!(outcome.report().unwrap().resolved.len(), 1);
    assert_eq!(repo.call_count(), calls_before);
    let attached = table.source_of(&binary).unwrap();
    assert!(attached.starts_with(scope.storage().session_sources_dir()));
    assert!(attached.is_file());
}

#[test]
fn test_resolving_twice_reattaches_instead_of_copying() {
    let temp = tempfile::tempdir().unwrap();
    let binary = temp.path().join("project/lib/widget-2.1.jar");
    widget_binary(&binary);
    let sha1 = sha1_file(&binary).unwrap();

    let repo = Arc::new(FakeRepository::new());
    serve_nexus3(&repo, &sha1);
    let table = Arc::new(LibraryTable::new());
    let scope = SourceScope::with_transport(
        temp.path().join("home"),
        config(temp.path(), vec![nexus()]),
        repo.clone(),
    )
    .unwrap();

    resolve(&scope, &table, &binary);
    let first = table.source_of(&binary).unwrap();
    let calls = repo.call_count();

    let outcome = resolve(&scope, &table, &binary);
    assert!(outcome.is_completed());
    assert_eq!(table.source_of(&binary).unwrap(), first);
    assert_eq!(table.reattach_count(), 1);
    assert_eq!(repo.call_count(), calls);

    let records = scope.bindings().records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].sha, vec![sha1]);
}

#[test]
fn test_nexus2_plain_artifact_with_bundled_sources() {
    let temp = tempfile::tempdir().unwrap();
    let binary = temp.path().join("project/lib/widget-2.1.jar");
    widget_binary(&binary);
    let sha1 = sha1_file(&binary).unwrap();

    let repo = Arc::new(FakeRepository::new());
    repo.route(join_url(NEXUS, "service/local/status"), 200, b"{}".to_vec());
    repo.route_json(
        join_url(NEXUS, &format!("service/local/identify/sha1/{sha1}")),
        json!({"groupId": "org.example", "artifactId": "widget", "version": "2.1", "repoId": "releases"}),
    );
    let plain = with_query(
        &join_url(NEXUS, "service/local/artifact/maven/redirect"),
        &[("r", "releases"), ("g", "org.example"), ("a", "widget"), ("v", "2.1"), ("e", "jar")],
    );
    // classes and sources shipped in one jar, no -sources classifier
    repo.route(
        &plain,
        200,
        jar_bytes(&[
            ("org/example/widget/Widget.class", "x"),
            ("org/example/widget/Widget.java", "public class Widget {}"),
            ("org/example/widget/Gadget.class", "x"),
            ("org/example/widget/Gadget.java", "public class Gadget {}"),
        ]),
    );

    let table = Arc::new(LibraryTable::new());
    let scope = SourceScope::with_transport(
        temp.path().join("home"),
        config(temp.path(), vec![nexus()]),
        repo.clone(),
    )
    .unwrap();
    let outcome = resolve(&scope, &table, &binary);

    assert_eq!(outcome.report().unwrap().resolved.len(), 1);
    let record = scope.bindings().find_by_sha1(&sha1).unwrap().unwrap();
    assert_eq!(record.download_url.as_deref(), Some(plain.as_str()));
}

#[test]
fn test_shaded_binary_unknown_to_repositories_stays_unresolved() {
    let temp = tempfile::tempdir().unwrap();
    let binary = temp.path().join("project/lib/bundle-1.0.jar");
    write_jar(
        &binary,
        &[
            ("org/example/widget/Widget.class", "x"),
            ("org/example/gadget/Gadget.class", "x"),
            (
                "META-INF/maven/org.example/widget/pom.properties",
                "groupId=org.example\nartifactId=widget\nversion=2.1\n",
            ),
            (
                "META-INF/maven/org.example/gadget/pom.properties",
                "groupId=org.example\nartifactId=gadget\nversion=1.4\n",
            ),
        ],
    );
    // sources for one of the embedded coordinates sit in the local repository
    let local_sources = temp
        .path()
        .join("m2/org/example/widget/2.1/widget-2.1-sources.jar");
    std::fs::create_dir_all(local_sources.parent().unwrap()).unwrap();
    std::fs::write(&local_sources, widget_sources()).unwrap();

    let repo = Arc::new(FakeRepository::new());
    let table = Arc::new(LibraryTable::new());
    let finders = vec![
        FinderConfig::Local,
        FinderConfig::MavenCentral {
            search_url: "https://central.example.com/solrsearch/select".to_string(),
            repository_url: "https://central.example.com/maven2".to_string(),
        },
        nexus(),
        FinderConfig::Artifactory {
            url: "https://artifactory.example.com/artifactory".to_string(),
            credentials: None,
        },
    ];
    let scope =
        SourceScope::with_transport(temp.path().join("home"), config(temp.path(), finders), repo.clone())
            .unwrap();

    let outcome = resolve(&scope, &table, &binary);

    assert!(matches!(outcome, ResolutionOutcome::Completed(_)));
    assert_eq!(outcome.report().unwrap().unresolved.len(), 1);
    assert!(scope.bindings().records().unwrap().is_empty());
    assert!(table.source_of(&binary).is_none());
    // only hash lookups went out; nothing was derived from the embedded metadata
    assert!(repo.call_count() > 0);
    for (_, url) in repo.calls() {
        for derived in ["redirect", "maven.groupId", "gavc", "widget", "gadget"] {
            assert!(!url.contains(derived), "unexpected request {url}");
        }
    }
}

#[test]
fn test_unrelated_sources_are_not_bound() {
    let temp = tempfile::tempdir().unwrap();
    let binary = temp.path().join("project/lib/widget-2.1.jar");
    widget_binary(&binary);
    let sha1 = sha1_file(&binary).unwrap();

    let repo = Arc::new(FakeRepository::new());
    serve_nexus3(&repo, &sha1);
    repo.route(
        WIDGET_SOURCES,
        200,
        jar_bytes(&[("com/elsewhere/Thing.java", "class Thing {}")]),
    );

    let table = Arc::new(LibraryTable::new());
    let scope = SourceScope::with_transport(
        temp.path().join("home"),
        config(temp.path(), vec![nexus()]),
        repo,
    )
    .unwrap();
    let outcome = resolve(&scope, &table, &binary);

    assert_eq!(outcome.report().unwrap().unresolved.len(), 1);
    assert!(scope.bindings().records().unwrap().is_empty());
    assert!(table.source_of(&binary).is_none());
}

#[test]
fn test_local_cache_wins_before_remote() {
    let temp = tempfile::tempdir().unwrap();
    let binary = temp.path().join("project/lib/widget-2.1.jar");
    widget_binary(&binary);
    let local_sources: PathBuf = temp
        .path()
        .join("m2/org/example/widget/2.1/widget-2.1-sources.jar");
    std::fs::create_dir_all(local_sources.parent().unwrap()).unwrap();
    std::fs::write(&local_sources, widget_sources()).unwrap();

    let repo = Arc::new(FakeRepository::new());
    let table = Arc::new(LibraryTable::new());
    let scope = SourceScope::with_transport(
        temp.path().join("home"),
        config(temp.path(), vec![FinderConfig::Local, nexus()]),
        repo.clone(),
    )
    .unwrap();
    let outcome = resolve(&scope, &table, &binary);

    assert_eq!(outcome.report().unwrap().resolved.len(), 1);
    assert_eq!(repo.call_count(), 0);
    let record = scope.bindings().records().unwrap().remove(0);
    assert!(record.download_url.is_none());
}

#[test]
fn test_batch_with_unreadable_target() {
    let temp = tempfile::tempdir().unwrap();
    let repo = Arc::new(FakeRepository::new());
    let table = Arc::new(LibraryTable::new());
    let scope = SourceScope::with_transport(
        temp.path().join("home"),
        config(temp.path(), vec![]),
        repo,
    )
    .unwrap();

    let targets: Vec<Arc<dyn AttachTarget>> = vec![
        Arc::new(JarTarget(temp.path().join("missing.jar"))),
        Arc::new(JarTarget(temp.path().join("also-missing.jar"))),
    ];
    let outcome = scope
        .orchestrator_with(table, orchestrator_config())
        .resolve(&targets, None)
        .unwrap();

    let report = outcome.report().unwrap();
    assert!(outcome.is_completed());
    assert_eq!(report.invalid.len(), 2);
    assert!(report.resolved.is_empty());
}
