use std::env;

use helpers::{
    setup_client, ArtifactStore, ClientConfig, ClientSetup, Credentials, DeployOptions, Deployer,
    Felt, Manifest, Network,
};

#[tokio::test]
#[ignore = "needs a running devnet, a funded account and the compiled Kakarot contracts"]
async fn test_deploy_kakarot_on_devnet() -> anyhow::Result<()> {
    // Deploys the bundled Kakarot manifest against a live node, e.g. katana
    let private_key = env::var("PRIVATE_KEY")?;
    let account_address = env::var("ACCOUNT_ADDRESS")?;
    let network: Network = env::var("NETWORK")
        .unwrap_or_else(|_| "devnet".to_string())
        .parse()?;
    let build_dir = env::var("BUILD_PATH").unwrap_or_else(|_| "../build".to_string());

    let credentials = Credentials::parse(&private_key, &account_address)?;
    let ClientSetup { gateway, identity } =
        setup_client(&credentials, &ClientConfig::new(network)).await?;
    assert_eq!(identity.account_address, credentials.account_address());
    assert_eq!(identity.public_key, credentials.public_key());

    let plan = Manifest::from_toml(scripts::KAKAROT_MANIFEST)?.validate()?;
    let store = ArtifactStore::new(build_dir);
    let report = Deployer::new(&gateway, &store, DeployOptions::default())
        .run(&plan)
        .await?;

    let addresses: Vec<Felt> = report.contracts().map(|(_, c)| c.address).collect();
    assert_eq!(addresses.len(), 2);
    assert!(addresses.iter().all(|address| *address != Felt::ZERO));
    assert_ne!(addresses[0], addresses[1], "proxy and registry share an address");
    assert_eq!(report.invocations().count(), 1);

    println!("{}", report.to_json()?);
    Ok(())
}
