//! Wallet Tests - Real BDK wallets on disk, no network
//!
//! These tests verify:
//! 1. Seeds derive the BIP84 addresses BDK is known to produce
//! 2. Derivation is deterministic and passphrase-sensitive
//! 3. The wallet store persists revealed addresses across reopen
//! 4. Chain operations refuse to run without an Electrum backend
//! 5. Spending from an empty wallet fails coin selection before any broadcast

use relaynode::chain::ChainSource;
use relaynode::forward::{ForwardError, ForwardingWallet};
use relaynode::wallet::{parse_address, BdkWallet, Network, WalletError, WalletFiles};
use relaynode::WalletSeed;
use bitcoin::{Amount, Txid};
use tempfile::TempDir;

// Well-known test vector, never use with real funds
const TEST_MNEMONIC: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

// m/84'/1'/0'/0/0 and m/84'/0'/0'/0/0 for the mnemonic above, empty passphrase
const EXPECTED_TESTNET_ADDR_0: &str = "tb1q6rz28mcfaxtmd6v789l9rrlrusdprr9pqcpvkl";
const EXPECTED_MAINNET_ADDR_0: &str = "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu";

fn seed(passphrase: &str) -> WalletSeed {
    WalletSeed::from_phrase(TEST_MNEMONIC, passphrase, 1_409_478_661).expect("valid mnemonic")
}

fn open(dir: &TempDir, network: Network) -> BdkWallet {
    let files = WalletFiles::new(dir.path(), network.file_prefix("wallet-test"));
    BdkWallet::open_offline(&seed(""), network, &files.wallet_path()).expect("open wallet")
}

#[test]
fn bip84_addresses_match_known_vectors() {
    let dir = TempDir::new().unwrap();
    assert_eq!(open(&dir, Network::Testnet).peek_address(0).unwrap(), EXPECTED_TESTNET_ADDR_0);
    assert_eq!(open(&dir, Network::Signet).peek_address(0).unwrap(), EXPECTED_TESTNET_ADDR_0);
    assert_eq!(open(&dir, Network::Bitcoin).peek_address(0).unwrap(), EXPECTED_MAINNET_ADDR_0);
}

#[test]
fn address_sequence_is_deterministic() {
    let a = TempDir::new().unwrap();
    let b = TempDir::new().unwrap();
    let wa = open(&a, Network::Testnet);
    let wb = open(&b, Network::Testnet);

    for index in 0..5 {
        assert_eq!(wa.peek_address(index).unwrap(), wb.peek_address(index).unwrap());
    }
    assert_ne!(wa.peek_address(0).unwrap(), wa.peek_address(1).unwrap());
}

#[test]
fn passphrase_changes_the_wallet() {
    let dir = TempDir::new().unwrap();
    let plain = open(&dir, Network::Testnet);

    let other = TempDir::new().unwrap();
    let path = WalletFiles::new(other.path(), "salted").wallet_path();
    let salted = BdkWallet::open_offline(&seed("TREZOR"), Network::Testnet, &path).unwrap();

    assert_ne!(plain.peek_address(0).unwrap(), salted.peek_address(0).unwrap());
}

#[test]
fn revealed_addresses_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let (first, second) = {
        let wallet = open(&dir, Network::Testnet);
        (wallet.new_address().unwrap(), wallet.new_address().unwrap())
    };
    assert_eq!(first, EXPECTED_TESTNET_ADDR_0);
    assert_ne!(first, second);

    let reopened = open(&dir, Network::Testnet);
    let third = reopened.new_address().unwrap();
    assert_ne!(third, first);
    assert_ne!(third, second);
    assert_eq!(reopened.summary().unwrap().receive_index, Some(2));
}

#[test]
fn receive_address_is_stable_until_used() {
    let dir = TempDir::new().unwrap();
    let wallet = open(&dir, Network::Testnet);
    let a = wallet.receive_address().unwrap();
    let b = wallet.receive_address().unwrap();
    assert_eq!(a, b);
    assert_eq!(a, EXPECTED_TESTNET_ADDR_0);
}

#[test]
fn fresh_wallet_is_empty() {
    let dir = TempDir::new().unwrap();
    let wallet = open(&dir, Network::Testnet);

    let balance = wallet.balance().unwrap();
    assert_eq!(balance.total(), 0);
    assert!(wallet.transactions(10).unwrap().is_empty());

    let snapshot = ChainSource::snapshot(&wallet).unwrap();
    assert!(snapshot.transactions.is_empty());

    let summary = wallet.summary().unwrap();
    assert_eq!(summary.network, Network::Testnet);
    assert_eq!(summary.transactions, 0);
}

#[test]
fn wallet_store_is_created_on_disk() {
    let dir = TempDir::new().unwrap();
    let files = WalletFiles::new(dir.path(), Network::Regtest.file_prefix("forwarding-service"));
    assert!(!files.wallet_path().exists());

    let wallet = BdkWallet::open_offline(&seed(""), Network::Regtest, &files.wallet_path()).unwrap();
    wallet.receive_address().unwrap();

    assert!(files.wallet_path().ends_with("forwarding-service-regtest.wallet"));
    assert!(files.wallet_path().exists());
}

#[test]
fn network_mismatch_is_rejected_on_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("shared.wallet");
    BdkWallet::open_offline(&seed(""), Network::Testnet, &path).unwrap().receive_address().unwrap();

    let err = BdkWallet::open_offline(&seed(""), Network::Bitcoin, &path).err().expect("mismatch");
    assert!(matches!(err, WalletError::Load(_)), "got {err:?}");
}

#[test]
fn chain_operations_need_a_backend() {
    let dir = TempDir::new().unwrap();
    let wallet = open(&dir, Network::Testnet);
    assert!(!wallet.is_online());

    assert!(matches!(wallet.sync(), Err(WalletError::Offline)));
    assert!(matches!(wallet.refresh(), Err(WalletError::Offline)));
}

#[test]
fn empty_wallet_forward_is_insufficient_funds() {
    let dir = TempDir::new().unwrap();
    let wallet = open(&dir, Network::Testnet);

    let to = parse_address(EXPECTED_TESTNET_ADDR_0, Network::Testnet).unwrap();
    let err = wallet
        .forward(&to, Amount::from_sat(10_000), Amount::from_sat(5_000))
        .err()
        .expect("nothing to spend");
    assert!(matches!(err, WalletError::InsufficientFunds(_)), "got {err:?}");

    let incoming: Txid = "11".repeat(32).parse().unwrap();
    let forward_err = ForwardError::from_wallet(incoming, err);
    assert!(forward_err.is_insufficient_funds());
    assert_eq!(forward_err.txid(), incoming);
}

#[test]
fn parse_address_checks_network() {
    assert!(parse_address(EXPECTED_TESTNET_ADDR_0, Network::Testnet).is_ok());
    assert!(parse_address(EXPECTED_MAINNET_ADDR_0, Network::Bitcoin).is_ok());
    assert!(parse_address(EXPECTED_MAINNET_ADDR_0, Network::Testnet).is_err());
    assert!(parse_address("not-an-address", Network::Bitcoin).is_err());
}
