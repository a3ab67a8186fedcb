use std::{fs, time::Duration};

use helpers::{
    AcceptancePolicy, ArtifactStore, DeployError, DeployOptions, Deployer, Felt, Manifest, Plan,
};
use temp_dir::TempDir;
use tests::MockGateway;

const MANIFEST: &str = r#"
[[step]]
action = "declare_and_deploy"
name = "token"
artifact = "token.json"
abi = "token_abi.json"

[[step]]
action = "declare_and_deploy"
name = "vault"
artifact = "vault.json"
calldata = [{ address = "token" }]

[[step]]
action = "invoke"
contract = "token"
entrypoint = "approve"
calldata = [{ address = "vault" }]

[[step]]
action = "invoke"
contract = "token"
entrypoint = "mint"

[[step]]
action = "invoke"
contract = "token"
entrypoint = "pause"
"#;

const TOKEN_ABI: &str = r#"[
    {"type": "function", "name": "approve"},
    {"type": "function", "name": "mint"},
    {"type": "function", "name": "pause"}
]"#;

fn setup(artifacts: &[&str]) -> anyhow::Result<(TempDir, ArtifactStore, Plan)> {
    let dir = TempDir::new()?;
    for file in artifacts {
        fs::write(dir.child(file), r#"{"program": {}}"#)?;
    }
    fs::write(dir.child("token_abi.json"), TOKEN_ABI)?;
    let store = ArtifactStore::new(dir.path());
    let plan = Manifest::from_toml(MANIFEST)?.validate()?;
    Ok((dir, store, plan))
}

#[tokio::test]
async fn test_reverted_invocation_stops_the_run() -> anyhow::Result<()> {
    let (_dir, store, plan) = setup(&["token.json", "vault.json"])?;
    // submissions: 4 for the two contracts, then approve (4) and mint (5)
    let gateway = MockGateway::new(Felt::ONE).revert(5);

    let err = Deployer::new(&gateway, &store, DeployOptions::default())
        .run(&plan)
        .await
        .unwrap_err();

    match err {
        DeployError::TransactionRejected { step, reason } => {
            assert_eq!(step, "token::mint");
            assert!(reason.contains("reverted"), "{reason}");
        }
        other => panic!("unexpected error: {other}"),
    }

    // approve went through, pause was never sent
    let invocations = gateway.invocations();
    assert_eq!(invocations.len(), 2);
    assert_eq!(invocations[0].calldata, [MockGateway::address_of(1)]);
    assert_eq!(gateway.submissions().len(), 6);
    Ok(())
}

#[tokio::test]
async fn test_refused_submission_stops_the_run() -> anyhow::Result<()> {
    let (_dir, store, plan) = setup(&["token.json", "vault.json"])?;
    let gateway = MockGateway::new(Felt::ONE).refuse(3);

    let err = Deployer::new(&gateway, &store, DeployOptions::default())
        .run(&plan)
        .await
        .unwrap_err();

    assert!(
        matches!(&err, DeployError::TransactionRejected { step, .. } if step == "vault"),
        "{err}"
    );
    assert_eq!(gateway.submissions().len(), 4);
    assert!(gateway.invocations().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_missing_artifact_fails_before_any_transaction() -> anyhow::Result<()> {
    let (dir, store, plan) = setup(&["token.json"])?;
    let gateway = MockGateway::new(Felt::ONE);

    let err = Deployer::new(&gateway, &store, DeployOptions::default())
        .run(&plan)
        .await
        .unwrap_err();

    match err {
        DeployError::ArtifactNotFound(path) => assert_eq!(path, dir.child("vault.json")),
        other => panic!("unexpected error: {other}"),
    }
    assert!(gateway.submissions().is_empty());
    assert_eq!(gateway.status_polls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_malformed_artifact_fails_before_any_transaction() -> anyhow::Result<()> {
    let (dir, store, plan) = setup(&["token.json"])?;
    fs::write(dir.child("vault.json"), "{ not json")?;
    let gateway = MockGateway::new(Felt::ONE);

    let err = Deployer::new(&gateway, &store, DeployOptions::default())
        .run(&plan)
        .await
        .unwrap_err();

    let vault = dir.child("vault.json");
    assert!(
        matches!(&err, DeployError::MalformedArtifact { path, .. } if *path == vault),
        "{err}"
    );
    assert!(gateway.submissions().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_unknown_entrypoint_fails_before_any_transaction() -> anyhow::Result<()> {
    let (dir, store, plan) = setup(&["token.json", "vault.json"])?;
    fs::write(
        dir.child("token_abi.json"),
        r#"[{"type": "function", "name": "approve"}]"#,
    )?;
    let gateway = MockGateway::new(Felt::ONE);

    let err = Deployer::new(&gateway, &store, DeployOptions::default())
        .run(&plan)
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::Configuration(_)), "{err}");
    assert!(err.to_string().contains("mint"), "{err}");
    assert!(gateway.submissions().is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_unaccepted_transaction_times_out() -> anyhow::Result<()> {
    let (_dir, store, plan) = setup(&["token.json", "vault.json"])?;
    let gateway = MockGateway::new(Felt::ONE).never_accept(4);
    let options = DeployOptions {
        acceptance: AcceptancePolicy {
            poll_interval: Duration::from_secs(2),
            timeout: Duration::from_secs(30),
        },
        ..Default::default()
    };

    let err = Deployer::new(&gateway, &store, options)
        .run(&plan)
        .await
        .unwrap_err();

    match err {
        DeployError::Timeout {
            step,
            tx_hash,
            timeout,
        } => {
            assert_eq!(step, "token::approve");
            assert_eq!(tx_hash, MockGateway::transaction_hash_of(4));
            assert_eq!(timeout, Duration::from_secs(30));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(gateway.invocations().len(), 1);
    // the stuck transaction keeps being polled until the deadline
    assert!(gateway.status_polls() > 4 + 10, "{}", gateway.status_polls());
    Ok(())
}

#[tokio::test]
async fn test_reverted_deployment_stops_the_run() -> anyhow::Result<()> {
    let (_dir, store, plan) = setup(&["token.json", "vault.json"])?;
    let gateway = MockGateway::new(Felt::ONE).revert(1);

    let err = Deployer::new(&gateway, &store, DeployOptions::default())
        .run(&plan)
        .await
        .unwrap_err();

    assert!(
        matches!(&err, DeployError::TransactionRejected { step, .. } if step == "token"),
        "{err}"
    );
    // the token class was declared, its deployment reverted
    assert_eq!(gateway.submissions().len(), 2);
    assert!(gateway.deployments()[0].calldata.is_empty());
    Ok(())
}
