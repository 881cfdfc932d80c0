//! Fixtures for scenario tests on the in-memory ledger.

use crate::chaincode::{Chaincode, Response};
use crate::constants::{TRANSIENT_NEW_PIN, TRANSIENT_PIN};
use crate::stub::StubConfig;
use chrono::{DateTime, TimeZone, Utc};
use kid_crypto::shake256_hex;
use kid_ledger::{BackendExt, ClientIdentity, MemoryLedger, TxContext, NS_STATE};

pub const ALICE: &str = "x509::CN=alice,OU=client::CN=ca.org1.example.com";
pub const BOB: &str = "x509::CN=bob,OU=client::CN=ca.org1.example.com";

/// Serial `aa`
pub const SERIAL_A: &[u8] = &[0xAA];
/// Serial `bb`, with a leading zero byte as some issuers encode it
pub const SERIAL_B: &[u8] = &[0x00, 0xBB];

pub fn timestamp(offset_secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + offset_secs, 0).unwrap()
}

pub fn ctx(client: &str, serial: &[u8], tx_id: &str) -> TxContext {
    TxContext::new(tx_id, timestamp(0), ClientIdentity::new(client, serial))
}

pub fn ctx_with_pin(client: &str, serial: &[u8], tx_id: &str, pin: &str) -> TxContext {
    ctx(client, serial, tx_id).with_transient(TRANSIENT_PIN, pin)
}

pub fn ctx_with_new_pin(
    client: &str,
    serial: &[u8],
    tx_id: &str,
    pin: &str,
    new_pin: &str,
) -> TxContext {
    ctx_with_pin(client, serial, tx_id, pin).with_transient(TRANSIENT_NEW_PIN, new_pin)
}

pub fn kid_key(client: &str) -> String {
    format!("KID_{}", shake256_hex(client.as_bytes()))
}

pub fn cert_key(client: &str, sn: &str) -> String {
    format!("CERT_{}_{}", shake256_hex(client.as_bytes()), sn)
}

/// Ledger plus dispatcher, committing every successful invocation
pub struct Fixture {
    pub ledger: MemoryLedger,
    pub chaincode: Chaincode,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(StubConfig::default())
    }

    pub fn with_config(config: StubConfig) -> Self {
        Self {
            ledger: MemoryLedger::new(),
            chaincode: Chaincode::new(config, tracing::Span::none()),
        }
    }

    pub fn invoke(&self, ctx: TxContext, function: &str, params: &[&str]) -> Response {
        let params: Vec<String> = params.iter().map(|p| p.to_string()).collect();

        let mut tx = self.ledger.begin(ctx);
        let response = self.chaincode.invoke(&mut tx, function, &params);
        if response.is_success() {
            tx.commit().unwrap();
        } else {
            tx.rollback();
        }
        response
    }

    pub fn state(&self, key: &str) -> Option<Vec<u8>> {
        self.ledger.read_committed(NS_STATE, key).unwrap()
    }
}

pub fn json(response: &Response) -> serde_json::Value {
    match response {
        Response::Success(payload) => serde_json::from_slice(payload).unwrap(),
        Response::Error(message) => panic!("unexpected error response: {}", message),
    }
}

pub fn error(response: &Response) -> &str {
    response
        .message()
        .unwrap_or_else(|| panic!("expected an error, got {:?}", response))
}
