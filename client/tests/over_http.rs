//! A session talking HTTP to a live reference registry.

use std::sync::Arc;

use docchain_backend::HttpBackend;
use docchain_client::{ClientConfig, LedgerConfig, Session};
use docchain_ledger::{LedgerAdapter, Receipt, TxEvent};
use docchain_nullables::backend::{registry_abi, NULL_CONTRACT};
use docchain_nullables::NullLedger;
use docchain_registration::RegistrationOutcome;
use docchain_server::{RegistryServer, ServerConfig};
use docchain_types::TxHash;
use docchain_verification::VerificationOutcome;
use tokio::net::TcpListener;

async fn spawn_registry(dir: &tempfile::TempDir) -> String {
    let abi_path = dir.path().join("DocumentRegistry.json");
    std::fs::write(
        &abi_path,
        serde_json::json!({ "abi": registry_abi() }).to_string(),
    )
    .unwrap();

    let server = RegistryServer::new(ServerConfig {
        contract_address: Some(NULL_CONTRACT.to_string()),
        contract_abi_path: Some(abi_path),
        ..Default::default()
    })
    .unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { server.serve(listener).await });
    format!("http://{addr}")
}

#[tokio::test]
async fn register_and_verify_over_http() {
    let dir = tempfile::tempdir().unwrap();
    let url = spawn_registry(&dir).await;

    let ledger = Arc::new(NullLedger::new());
    ledger.script(vec![
        TxEvent::Hash(TxHash::new("0xfeed")),
        TxEvent::Receipt(Receipt {
            tx_hash: TxHash::new("0xfeed"),
            block_number: Some(11),
        }),
    ]);
    let config = ClientConfig {
        backend_url: url.clone(),
        ledger: Some(LedgerConfig::new("http://127.0.0.1:8545")),
        ..Default::default()
    };
    let s = Session::new(
        config,
        Arc::new(HttpBackend::new(url).unwrap()),
        Some(ledger.clone() as Arc<dyn LedgerAdapter>),
    );

    assert_eq!(s.health().await.unwrap().status, "healthy");

    let fingerprint = s.select_bytes("lease.pdf", b"lease agreement".to_vec()).unwrap();
    let outcome = s.register(Some("landlord")).await.unwrap();
    assert!(matches!(outcome, RegistrationOutcome::Confirmed { .. }));
    let id = outcome.document_id().clone();

    let sent = ledger.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].call.target.contract_address, NULL_CONTRACT);
    assert_eq!(sent[0].call.file_hash, fingerprint);
    assert_eq!(sent[0].call.document_id, id);

    let verdict = s.verify(Some(id.as_str())).await.unwrap();
    assert_eq!(
        verdict,
        VerificationOutcome::Verified {
            fingerprint,
            document_id: Some(id.clone()),
            tx_hash: Some(TxHash::new("0xfeed")),
        }
    );

    s.select_bytes("lease.pdf", b"lease agreement, amended".to_vec())
        .unwrap();
    assert!(matches!(
        s.verify(Some(id.as_str())).await.unwrap(),
        VerificationOutcome::Tampered { .. }
    ));

    let dash = s.dashboard().await.unwrap();
    assert_eq!(dash.documents.len(), 1);
    assert_eq!(dash.documents[0].blockchain_tx, Some(TxHash::new("0xfeed")));
    assert_eq!(dash.stats.registered_documents, 1);
    assert_eq!(dash.stats.total_verifications, 2);
}

#[tokio::test]
async fn unreachable_registry_fails_verification() {
    // Nothing listens on port 9 on the loopback interface.
    let backend = HttpBackend::new("http://127.0.0.1:9").unwrap();
    let s = Session::new(ClientConfig::default(), Arc::new(backend), None);
    s.select_bytes("lease.pdf", b"lease agreement".to_vec()).unwrap();

    assert!(matches!(
        s.verify(None).await,
        Err(docchain_client::SessionError::Verification(_))
    ));
}
