use std::fs;

use helpers::{
    Action, ArtifactStore, DeployOptions, Deployer, Felt, Manifest, Plan, StepRecord,
    DEFAULT_MAX_FEE,
};
use temp_dir::TempDir;
use tests::{MockGateway, Submission};

const ADMIN: u64 = 0xad;

const TOKEN_AND_VAULT: &str = r#"
[[step]]
action = "declare_and_deploy"
name = "token"
artifact = "token.json"
calldata = ["account_address", { felt = "1000" }]

[[step]]
action = "declare_and_deploy"
name = "vault"
artifact = "vault.json"
abi = "vault_abi.json"
salt = "0x5"
unique = false
calldata = [{ address = "token" }, { class_hash = "token" }]

[[step]]
action = "invoke"
contract = "vault"
entrypoint = "set_token"
calldata = [{ address = "token" }]

[[step]]
action = "invoke"
contract = "token"
entrypoint = "approve"
calldata = [{ address = "vault" }, { felt = "0x10" }]
"#;

fn build_dir(files: &[&str]) -> anyhow::Result<TempDir> {
    let dir = TempDir::new()?;
    for file in files {
        fs::write(dir.child(file), r#"{"abi": [], "program": {}}"#)?;
    }
    Ok(dir)
}

fn plan(manifest: &str) -> anyhow::Result<Plan> {
    Ok(Manifest::from_toml(manifest)?.validate()?)
}

fn selector_of(plan: &Plan, step: &str) -> Felt {
    plan.steps
        .iter()
        .find_map(|s| match &s.action {
            Action::Invoke { selector, .. } if s.name == step => Some(*selector),
            _ => None,
        })
        .unwrap()
}

#[tokio::test]
async fn test_deploys_two_contracts_then_configures_them() -> anyhow::Result<()> {
    let dir = build_dir(&["token.json", "vault.json"])?;
    fs::write(
        dir.child("vault_abi.json"),
        r#"[{"type": "function", "name": "set_token", "inputs": []}]"#,
    )?;
    let store = ArtifactStore::new(dir.path());
    let plan = plan(TOKEN_AND_VAULT)?;
    let gateway = MockGateway::new(Felt::from(ADMIN));

    let report = Deployer::new(&gateway, &store, DeployOptions::default())
        .run(&plan)
        .await?;

    // Contracts come back in deploy order with distinct, nonzero addresses
    let contracts: Vec<_> = report
        .contracts()
        .map(|(name, contract)| (name, contract.address))
        .collect();
    assert_eq!(
        contracts,
        [
            ("token", MockGateway::address_of(0)),
            ("vault", MockGateway::address_of(1))
        ]
    );
    assert!(contracts.iter().all(|(_, address)| *address != Felt::ZERO));

    let invoked: Vec<_> = report.invocations().map(StepRecord::name).collect();
    assert_eq!(invoked, ["vault::set_token", "token::approve"]);

    let submissions = gateway.submissions();
    assert_eq!(submissions.len(), 6);
    assert_eq!(
        submissions[0],
        Submission::Declare {
            artifact: dir.child("token.json"),
            max_fee: DEFAULT_MAX_FEE,
        }
    );
    assert!(matches!(submissions[1], Submission::Deploy(_)));
    assert!(matches!(submissions[2], Submission::Declare { .. }));
    assert!(matches!(submissions[3], Submission::Deploy(_)));
    assert!(matches!(submissions[4], Submission::Invoke(_)));
    assert!(matches!(submissions[5], Submission::Invoke(_)));

    let deployments = gateway.deployments();
    assert_eq!(deployments[0].class_hash, MockGateway::class_hash_of(0));
    assert_eq!(
        deployments[0].calldata,
        [Felt::from(ADMIN), Felt::from(1000u64)]
    );
    assert!(deployments[0].unique);

    // Constructor arguments resolve against what earlier steps produced
    assert_eq!(deployments[1].class_hash, MockGateway::class_hash_of(1));
    assert_eq!(
        deployments[1].calldata,
        [MockGateway::address_of(0), MockGateway::class_hash_of(0)]
    );
    assert_eq!(deployments[1].salt, Felt::from(5u64));
    assert!(!deployments[1].unique);

    let invocations = gateway.invocations();
    assert_eq!(invocations[0].contract, MockGateway::address_of(1));
    assert_eq!(invocations[0].selector, selector_of(&plan, "vault::set_token"));
    assert_eq!(invocations[0].calldata, [MockGateway::address_of(0)]);
    assert_eq!(invocations[1].contract, MockGateway::address_of(0));
    assert_eq!(invocations[1].selector, selector_of(&plan, "token::approve"));
    assert_eq!(
        invocations[1].calldata,
        [MockGateway::address_of(1), Felt::from(0x10u64)]
    );

    Ok(())
}

#[tokio::test]
async fn test_declared_class_is_reused_by_later_deploys() -> anyhow::Result<()> {
    let dir = build_dir(&["account.json"])?;
    let store = ArtifactStore::new(dir.path());
    let plan = plan(
        r#"
        [[step]]
        action = "declare"
        name = "account"
        artifact = "account.json"

        [[step]]
        action = "deploy"
        name = "alice"
        class = "account"
        calldata = [{ felt = "0x1" }]

        [[step]]
        action = "deploy"
        name = "bob"
        class = "account"
        calldata = [{ address = "alice" }, { array = [{ class_hash = "account" }, "account_address"] }]
        "#,
    )?;
    let gateway = MockGateway::new(Felt::from(ADMIN));

    let report = Deployer::new(&gateway, &store, DeployOptions::default())
        .run(&plan)
        .await?;

    assert_eq!(gateway.submissions().len(), 3);
    let deployments = gateway.deployments();
    assert_eq!(deployments.len(), 2);
    assert!(deployments
        .iter()
        .all(|d| d.class_hash == MockGateway::class_hash_of(0)));
    assert_eq!(
        deployments[1].calldata,
        [
            MockGateway::address_of(0),
            Felt::from(2u64),
            MockGateway::class_hash_of(0),
            Felt::from(ADMIN)
        ]
    );

    let names: Vec<_> = report.steps.iter().map(StepRecord::name).collect();
    assert_eq!(names, ["account", "alice", "bob"]);

    Ok(())
}

#[tokio::test]
async fn test_max_fee_precedence() -> anyhow::Result<()> {
    let dir = build_dir(&["token.json"])?;
    let store = ArtifactStore::new(dir.path());
    let plan = plan(
        r#"
        max_fee = "0x100"

        [[step]]
        action = "declare_and_deploy"
        name = "token"
        artifact = "token.json"

        [[step]]
        action = "invoke"
        contract = "token"
        entrypoint = "mint"

        [[step]]
        action = "invoke"
        contract = "token"
        entrypoint = "pause"
        max_fee = "0x300"
        "#,
    )?;

    // Manifest level fee, overridden per step
    let gateway = MockGateway::new(Felt::from(ADMIN));
    Deployer::new(&gateway, &store, DeployOptions::default())
        .run(&plan)
        .await?;
    assert_eq!(gateway.deployments()[0].max_fee, Felt::from(0x100u64));
    let fees: Vec<_> = gateway.invocations().iter().map(|i| i.max_fee).collect();
    assert_eq!(fees, [Felt::from(0x100u64), Felt::from(0x300u64)]);

    // Command line fee replaces the manifest's
    let gateway = MockGateway::new(Felt::from(ADMIN));
    let options = DeployOptions {
        max_fee: Some(Felt::from(0x200u64)),
        ..Default::default()
    };
    Deployer::new(&gateway, &store, options).run(&plan).await?;
    match &gateway.submissions()[0] {
        Submission::Declare { max_fee, .. } => assert_eq!(*max_fee, Felt::from(0x200u64)),
        other => panic!("expected a declare, got {other:?}"),
    }
    assert_eq!(gateway.deployments()[0].max_fee, Felt::from(0x200u64));
    assert_eq!(gateway.invocations()[0].max_fee, Felt::from(0x200u64));
    assert_eq!(gateway.invocations()[1].max_fee, Felt::from(0x300u64));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_waits_for_pending_transactions() -> anyhow::Result<()> {
    let dir = build_dir(&["token.json"])?;
    let store = ArtifactStore::new(dir.path());
    let plan = plan(
        r#"
        [[step]]
        action = "declare_and_deploy"
        name = "token"
        artifact = "token.json"
        "#,
    )?;
    let gateway = MockGateway::new(Felt::from(ADMIN)).with_pending_polls(2);

    Deployer::new(&gateway, &store, DeployOptions::default())
        .run(&plan)
        .await?;

    // Declare and deploy each answer pending twice before being accepted
    assert_eq!(gateway.status_polls(), 6);
    Ok(())
}

#[tokio::test]
async fn test_kakarot_manifest_wiring() -> anyhow::Result<()> {
    let dir = build_dir(&[
        "contract_account.json",
        "kakarot.json",
        "kakarot_proxy.json",
        "account_registry.json",
    ])?;
    fs::write(
        dir.child("kakarot_abi.json"),
        r#"[{"type": "function", "name": "set_account_registry"}]"#,
    )?;
    let store = ArtifactStore::new(dir.path());
    let plan = plan(scripts::KAKAROT_MANIFEST)?;
    let admin = Felt::from_hex_unchecked("0x1234");
    let gateway = MockGateway::new(admin);

    let report = Deployer::new(&gateway, &store, DeployOptions::default())
        .run(&plan)
        .await?;

    let contract_account = MockGateway::class_hash_of(0);
    let kakarot = MockGateway::class_hash_of(1);
    let init_selector = Felt::from_hex_unchecked(
        "0x3b6771b04b068edcfb8c265b21ed5c6a5748d427138f776f3f164cc45f75b31",
    );
    let eth = Felt::from_hex_unchecked(
        "0x49d36570d4e46f48e99674bd3fcc84644ddd6b96f7c741b1562b82f9e004dc7",
    );

    let deployments = gateway.deployments();
    assert_eq!(
        deployments[0].calldata,
        [
            kakarot,
            init_selector,
            Felt::from(3u64),
            admin,
            eth,
            contract_account
        ]
    );
    assert_eq!(deployments[1].calldata, [MockGateway::address_of(0)]);

    let invocations = gateway.invocations();
    assert_eq!(invocations.len(), 1);
    assert_eq!(invocations[0].contract, MockGateway::address_of(0));
    assert_eq!(invocations[0].calldata, [MockGateway::address_of(1)]);
    assert_eq!(invocations[0].max_fee, DEFAULT_MAX_FEE);

    let names: Vec<_> = report.contracts().map(|(name, _)| name).collect();
    assert_eq!(names, ["kakarot_proxy", "account_registry"]);
    Ok(())
}

#[tokio::test]
async fn test_report_is_written_as_hex_json() -> anyhow::Result<()> {
    let dir = build_dir(&["token.json"])?;
    let store = ArtifactStore::new(dir.path());
    let plan = plan(
        r#"
        [[step]]
        action = "declare_and_deploy"
        name = "token"
        artifact = "token.json"

        [[step]]
        action = "invoke"
        contract = "token"
        entrypoint = "mint"
        "#,
    )?;
    let gateway = MockGateway::new(Felt::from(ADMIN));
    let report = Deployer::new(&gateway, &store, DeployOptions::default())
        .run(&plan)
        .await?;

    let path = dir.child("deployments").join("devnet.json");
    report.write_json(&path)?;
    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path)?)?;

    assert_eq!(json["account_address"], "0xad");
    assert_eq!(json["steps"][0]["action"], "deploy");
    assert_eq!(json["steps"][0]["name"], "token");
    assert_eq!(
        json["steps"][0]["address"],
        format!("{:#x}", MockGateway::address_of(0))
    );
    assert_eq!(json["steps"][1]["action"], "invoke");
    assert_eq!(json["steps"][1]["name"], "token::mint");
    assert_eq!(
        json["steps"][1]["transaction_hash"],
        format!("{:#x}", MockGateway::transaction_hash_of(2))
    );
    Ok(())
}
