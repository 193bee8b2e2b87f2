use openbpl_repo::{build_repos, Repos};
use openbpl_types::ports::{ThreatRepository, UserRepository};
use std::time::Duration;

#[tokio::test]
async fn builds_repos_from_url() {
    // Use a temp DB path for isolation.
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("openbpl-test.db");
    let url = format!("sqlite://{}", db_path.display());

    let repos: Repos = build_repos(Some(&url)).await.expect("build repos");
    repos.ping().await.expect("ping");
    // basic sanity: a fresh store lists nothing
    assert!(repos.users.list().await.expect("list users").is_empty());
    assert!(repos.threats.list().await.expect("list threats").is_empty());
    assert!(repos.users.get(1).await.expect("get user").is_none());
    // Nothing checked out, so the close finishes well inside the bound.
    assert!(repos.close_within(Duration::from_secs(5)).await);
}
