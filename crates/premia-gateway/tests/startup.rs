//! Wiring from the shipped configuration.

use std::path::PathBuf;

use alloy::primitives::Address;
use premia_gateway::{AppConfig, AppError, GatewayContext};
use premia_registry::ChainClient;

const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const TEST_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

fn shipped_config(key_file_name: &str) -> AppConfig {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/default.toml");
    let mut config = AppConfig::load(path).unwrap();

    let key_file: PathBuf = std::env::temp_dir().join(key_file_name);
    std::fs::write(&key_file, format!("0x{TEST_PRIVATE_KEY}\n")).unwrap();
    config.signer.key_file = Some(key_file);
    config
}

#[test]
fn test_transactions_are_sent_from_maker_key() {
    let config = shipped_config("premia-gateway-startup-maker.key");
    let ctx = GatewayContext::from_config(&config).unwrap();

    let maker: Address = TEST_ADDRESS.parse().unwrap();
    assert_eq!(ctx.orchestrator.signer().address(), maker);
    assert_eq!(ctx.orchestrator.resolver().chain().sender(), maker);
}

#[test]
fn test_expected_address_mismatch_fails_startup() {
    let mut config = shipped_config("premia-gateway-startup-mismatch.key");
    config.signer.expected_address = Some(Address::repeat_byte(0x01));

    assert!(matches!(
        GatewayContext::from_config(&config),
        Err(AppError::Key(_))
    ));
}
