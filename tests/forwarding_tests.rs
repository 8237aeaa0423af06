//! Forwarding Tests - Service, policy and the monitor → service pipeline
//!
//! A scripted wallet stands in for BDK + Electrum:
//! 1. Received coins register a confirmation watch and send nothing
//! 2. Reaching depth sends exactly value - fee with fee F
//! 3. Payments that cannot cover the fee fail without touching the wallet
//! 4. LogAndDrop keeps going; Escalate stops the service
//! 5. End to end, nothing is forwarded before the first confirmation

use relaynode::chain::{ChainMonitor, ChainSnapshot, ChainSource, DepthWatch, TxObservation, WalletEvent};
use relaynode::forward::{FailurePolicy, ForwardContext, ForwardState, Forwarder, ForwardingService, ForwardingWallet};
use relaynode::wallet::{parse_address, Network, WalletError, WalletResult};
use bitcoin::{Address, Amount, Txid};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

const DESTINATION: &str = "tb1q6rz28mcfaxtmd6v789l9rrlrusdprr9pqcpvkl";
const FEE_SAT: u64 = 5_000;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Sent {
    to: String,
    amount: Amount,
    fee: Amount,
}

/// Records forwards and serves a mutable chain view
#[derive(Default)]
struct ScriptedWallet {
    sent: Mutex<Vec<Sent>>,
    fail_with: Mutex<Option<String>>,
    chain: Mutex<ChainSnapshot>,
    counter: AtomicUsize,
}

impl ScriptedWallet {
    fn sent(&self) -> Vec<Sent> { self.sent.lock().unwrap().clone() }

    fn fail_insufficient(&self, detail: &str) { *self.fail_with.lock().unwrap() = Some(detail.to_string()); }

    fn push_tx(&self, txid: Txid, received: u64, height: Option<u32>) {
        self.chain.lock().unwrap().transactions.push(TxObservation {
            txid,
            received: Amount::from_sat(received),
            sent: Amount::ZERO,
            confirmation_height: height,
        });
    }

    fn confirm(&self, txid: Txid, height: u32) {
        let mut chain = self.chain.lock().unwrap();
        chain.tip_height = height;
        if let Some(tx) = chain.transactions.iter_mut().find(|tx| tx.txid == txid) {
            tx.confirmation_height = Some(height);
        }
    }
}

impl ForwardingWallet for ScriptedWallet {
    fn forward(&self, to: &Address, amount: Amount, fee: Amount) -> WalletResult<Txid> {
        if let Some(detail) = self.fail_with.lock().unwrap().clone() {
            return Err(WalletError::InsufficientFunds(detail));
        }
        self.sent.lock().unwrap().push(Sent { to: to.to_string(), amount, fee });
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(txid(0xf0 + n as u8))
    }
}

impl ChainSource for ScriptedWallet {
    fn refresh(&self) -> WalletResult<()> { Ok(()) }
    fn snapshot(&self) -> WalletResult<ChainSnapshot> { Ok(self.chain.lock().unwrap().clone()) }
}

fn txid(byte: u8) -> Txid {
    Txid::from_str(&format!("{:02x}", byte).repeat(32)).unwrap()
}

fn context() -> ForwardContext {
    ForwardContext {
        destination: parse_address(DESTINATION, Network::Testnet).unwrap(),
        fee: Amount::from_sat(FEE_SAT),
        required_depth: 1,
    }
}

fn service(wallet: &Arc<ScriptedWallet>, policy: FailurePolicy) -> ForwardingService<ScriptedWallet> {
    ForwardingService::new(Forwarder::new(wallet.clone(), context()), policy)
}

#[tokio::test]
async fn received_coins_register_watch_and_send_nothing() {
    let wallet = Arc::new(ScriptedWallet::default());
    let mut svc = service(&wallet, FailurePolicy::LogAndDrop);
    let (watch_tx, mut watch_rx) = mpsc::unbounded_channel();

    let incoming = txid(0x01);
    svc.handle(WalletEvent::CoinsReceived { txid: incoming, value: Amount::from_sat(100_000) }, &watch_tx)
        .await
        .unwrap();

    assert_eq!(watch_rx.try_recv().unwrap(), DepthWatch { txid: incoming, depth: 1 });
    assert!(wallet.sent().is_empty());
    assert_eq!(svc.forwarder().state(&incoming), Some(&ForwardState::AwaitingConfirmation));
}

#[tokio::test]
async fn depth_reached_forwards_value_minus_fee_once() {
    let wallet = Arc::new(ScriptedWallet::default());
    let mut svc = service(&wallet, FailurePolicy::LogAndDrop);
    let (watch_tx, _watch_rx) = mpsc::unbounded_channel();

    let incoming = txid(0x02);
    svc.handle(WalletEvent::CoinsReceived { txid: incoming, value: Amount::from_sat(100_000) }, &watch_tx)
        .await
        .unwrap();
    svc.handle(WalletEvent::DepthReached { txid: incoming, depth: 1 }, &watch_tx).await.unwrap();
    svc.handle(WalletEvent::DepthReached { txid: incoming, depth: 2 }, &watch_tx).await.unwrap();

    assert_eq!(
        wallet.sent(),
        vec![Sent { to: DESTINATION.into(), amount: Amount::from_sat(95_000), fee: Amount::from_sat(FEE_SAT) }]
    );
    assert_eq!(svc.forwarder().state(&incoming), Some(&ForwardState::Forwarded { txid: txid(0xf0) }));
}

#[tokio::test]
async fn payment_not_covering_fee_fails_without_sending() {
    let wallet = Arc::new(ScriptedWallet::default());
    let mut svc = service(&wallet, FailurePolicy::LogAndDrop);
    let (watch_tx, _watch_rx) = mpsc::unbounded_channel();

    let incoming = txid(0x03);
    svc.handle(WalletEvent::CoinsReceived { txid: incoming, value: Amount::from_sat(FEE_SAT) }, &watch_tx)
        .await
        .unwrap();
    svc.handle(WalletEvent::DepthReached { txid: incoming, depth: 1 }, &watch_tx).await.unwrap();

    assert!(wallet.sent().is_empty());
    assert!(matches!(svc.forwarder().state(&incoming), Some(ForwardState::Failed { .. })));
}

#[tokio::test]
async fn log_and_drop_keeps_forwarding_later_payments() {
    let wallet = Arc::new(ScriptedWallet::default());
    let mut svc = service(&wallet, FailurePolicy::LogAndDrop);
    let (watch_tx, _watch_rx) = mpsc::unbounded_channel();

    wallet.fail_insufficient("wallet is empty");
    let first = txid(0x04);
    svc.handle(WalletEvent::CoinsReceived { txid: first, value: Amount::from_sat(50_000) }, &watch_tx).await.unwrap();
    svc.handle(WalletEvent::DepthReached { txid: first, depth: 1 }, &watch_tx).await.unwrap();

    *wallet.fail_with.lock().unwrap() = None;
    let second = txid(0x05);
    svc.handle(WalletEvent::CoinsReceived { txid: second, value: Amount::from_sat(50_000) }, &watch_tx).await.unwrap();
    svc.handle(WalletEvent::DepthReached { txid: second, depth: 1 }, &watch_tx).await.unwrap();

    assert!(matches!(svc.forwarder().state(&first), Some(ForwardState::Failed { .. })));
    assert!(matches!(svc.forwarder().state(&second), Some(ForwardState::Forwarded { .. })));
    assert_eq!(wallet.sent().len(), 1);
}

#[tokio::test]
async fn escalate_stops_the_service() {
    let wallet = Arc::new(ScriptedWallet::default());
    wallet.fail_insufficient("wallet is empty");
    let mut svc = service(&wallet, FailurePolicy::Escalate);

    let (event_tx, event_rx) = mpsc::channel(4);
    let (watch_tx, _watch_rx) = mpsc::unbounded_channel();
    let (_stop_tx, stop_rx) = broadcast::channel(1);

    let incoming = txid(0x06);
    event_tx.send(WalletEvent::CoinsReceived { txid: incoming, value: Amount::from_sat(20_000) }).await.unwrap();
    event_tx.send(WalletEvent::DepthReached { txid: incoming, depth: 1 }).await.unwrap();

    let err = tokio::time::timeout(Duration::from_secs(5), svc.run(event_rx, watch_tx, stop_rx))
        .await
        .expect("service should stop on its own")
        .expect_err("escalated failure");
    assert!(err.is_insufficient_funds());
    assert_eq!(err.txid(), incoming);
}

#[tokio::test]
async fn watch_failure_marks_entry_failed() {
    let wallet = Arc::new(ScriptedWallet::default());
    let mut svc = service(&wallet, FailurePolicy::Escalate);
    let (watch_tx, _watch_rx) = mpsc::unbounded_channel();

    let incoming = txid(0x07);
    svc.handle(WalletEvent::CoinsReceived { txid: incoming, value: Amount::from_sat(20_000) }, &watch_tx).await.unwrap();
    let err = svc
        .handle(WalletEvent::WatchFailed { txid: incoming, reason: "reorged out".into() }, &watch_tx)
        .await
        .expect_err("escalated watch failure");

    assert_eq!(err.txid(), incoming);
    assert!(matches!(svc.forwarder().state(&incoming), Some(ForwardState::Failed { .. })));
    assert!(wallet.sent().is_empty());
}

async fn wait_for_sends(wallet: &ScriptedWallet, count: usize) -> Vec<Sent> {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let sent = wallet.sent();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("forward within timeout")
}

#[tokio::test]
async fn pipeline_forwards_only_new_payments_after_confirmation() {
    let wallet = Arc::new(ScriptedWallet::default());
    wallet.chain.lock().unwrap().tip_height = 100;
    // Already in the wallet at startup; must not be forwarded
    wallet.push_tx(txid(0x10), 70_000, Some(90));

    let mut monitor = ChainMonitor::new(wallet.clone(), Duration::from_millis(10));
    monitor.prime().await.unwrap();

    let (event_tx, event_rx) = mpsc::channel(16);
    let (watch_tx, watch_rx) = mpsc::unbounded_channel();
    let (stop_tx, _) = broadcast::channel(1);
    let monitor_task = tokio::spawn(monitor.run(event_tx, watch_rx, stop_tx.subscribe()));
    let mut svc = service(&wallet, FailurePolicy::LogAndDrop);
    let stop_rx = stop_tx.subscribe();
    let service_task = tokio::spawn(async move {
        let result = svc.run(event_rx, watch_tx, stop_rx).await;
        (svc, result)
    });

    let incoming = txid(0x11);
    wallet.push_tx(incoming, 100_000, None);
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(wallet.sent().is_empty(), "unconfirmed payment must not be forwarded");

    wallet.confirm(incoming, 101);
    let sent = wait_for_sends(&wallet, 1).await;
    assert_eq!(sent[0].amount, Amount::from_sat(95_000));
    assert_eq!(sent[0].fee, Amount::from_sat(FEE_SAT));

    // More blocks do not trigger a second send
    wallet.confirm(incoming, 105);
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(wallet.sent().len(), 1);

    stop_tx.send(()).unwrap();
    monitor_task.await.unwrap().unwrap();
    let (svc, result) = service_task.await.unwrap();
    result.unwrap();
    assert!(svc.forwarder().state(&txid(0x10)).is_none());
    assert!(matches!(svc.forwarder().state(&incoming), Some(ForwardState::Forwarded { .. })));
}

#[tokio::test]
async fn payment_burst_does_not_block_shutdown() {
    const BURST: u32 = 300;
    let wallet = Arc::new(ScriptedWallet::default());
    let mut monitor = ChainMonitor::new(wallet.clone(), Duration::from_millis(10));
    monitor.prime().await.unwrap();

    // Same event queue depth as the daemon
    let (event_tx, event_rx) = mpsc::channel(64);
    let (watch_tx, watch_rx) = mpsc::unbounded_channel();
    let (stop_tx, _) = broadcast::channel(1);
    let monitor_task = tokio::spawn(monitor.run(event_tx, watch_rx, stop_tx.subscribe()));
    let mut svc = service(&wallet, FailurePolicy::LogAndDrop);
    let stop_rx = stop_tx.subscribe();
    let service_task = tokio::spawn(async move { svc.run(event_rx, watch_tx, stop_rx).await });

    for n in 0..BURST {
        let id = Txid::from_str(&format!("{:064x}", 0x1000 + n)).unwrap();
        wallet.push_tx(id, 50_000, None);
    }
    tokio::time::sleep(Duration::from_millis(300)).await;
    stop_tx.send(()).unwrap();

    let stopped = tokio::time::timeout(Duration::from_secs(3), async {
        monitor_task.await.unwrap().unwrap();
        service_task.await.unwrap().unwrap();
    })
    .await;
    assert!(stopped.is_ok(), "monitor and service must stop after a payment burst");
    assert!(wallet.sent().is_empty(), "nothing confirmed, nothing forwarded");
}
