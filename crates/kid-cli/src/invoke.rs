/*!
 * Single invocation against a local ledger
 */

use anyhow::{bail, Result};
use chrono::Utc;
use kid_identity::constants::{TRANSIENT_NEW_PIN, TRANSIENT_PIN};
use kid_identity::{Chaincode, Response};
use kid_ledger::{Backend, BackendExt, ClientIdentity, TxContext};
use tracing::info;

/// Everything the ordering platform would supply for one transaction
pub struct Invocation {
    pub identity: String,
    pub serial_number: Vec<u8>,
    pub pin: Option<String>,
    pub new_pin: Option<String>,
    pub tx_id: String,
    pub function: String,
    pub params: Vec<String>,
}

impl Invocation {
    fn into_context(self) -> (TxContext, String, Vec<String>) {
        let creator = ClientIdentity::new(self.identity, self.serial_number);
        let mut ctx = TxContext::new(self.tx_id, Utc::now(), creator);

        if let Some(pin) = self.pin {
            ctx = ctx.with_transient(TRANSIENT_PIN, pin.into_bytes());
        }
        if let Some(new_pin) = self.new_pin {
            ctx = ctx.with_transient(TRANSIENT_NEW_PIN, new_pin.into_bytes());
        }

        (ctx, self.function, self.params)
    }
}

/// Run the invocation and commit it when it succeeds
///
/// Returns the response payload; an error response becomes an error.
pub fn execute<B: Backend>(
    ledger: &B,
    chaincode: &Chaincode,
    invocation: Invocation,
) -> Result<Vec<u8>> {
    let (ctx, function, params) = invocation.into_context();
    let tx_id = ctx.tx_id.clone();

    let mut tx = ledger.begin(ctx);
    match chaincode.invoke(&mut tx, &function, &params) {
        Response::Success(payload) => {
            let writes = tx.pending_writes();
            tx.commit()?;
            info!(tx_id = %tx_id, function = %function, writes, "Invocation committed");
            Ok(payload)
        }
        Response::Error(message) => {
            tx.rollback();
            bail!(message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kid_identity::StubConfig;
    use kid_ledger::RocksDbLedger;

    fn invocation(function: &str, params: &[&str], pin: Option<&str>, tx_id: &str) -> Invocation {
        Invocation {
            identity: "x509::CN=carol::CN=ca".to_string(),
            serial_number: vec![0x01, 0x02],
            pin: pin.map(str::to_string),
            new_pin: None,
            tx_id: tx_id.to_string(),
            function: function.to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn test_register_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger");
        let chaincode = Chaincode::new(StubConfig::default(), tracing::Span::none());

        let registered = {
            let ledger = RocksDbLedger::open(&path, &["kiesnet-id"]).unwrap();
            execute(&ledger, &chaincode, invocation("register", &[], Some("1234"), "tx1")).unwrap()
        };

        let ledger = RocksDbLedger::open(&path, &["kiesnet-id"]).unwrap();
        let fetched = execute(&ledger, &chaincode, invocation("get", &[], None, "tx2")).unwrap();
        assert_eq!(fetched, registered);

        let listed = execute(&ledger, &chaincode, invocation("list", &[], None, "tx3")).unwrap();
        let listed = String::from_utf8(listed).unwrap();
        assert!(listed.contains(r#""sn":"0102""#));
    }

    #[test]
    fn test_error_response_is_not_committed() {
        let ledger = RocksDbLedger::open_test(&["kiesnet-id"]).unwrap();
        let chaincode = Chaincode::default();

        let err = execute(&ledger, &chaincode, invocation("get", &[], None, "tx1")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to get the invoker's identity: not registered certificate"
        );

        execute(&ledger, &chaincode, invocation("register", &[], Some("1234"), "tx2")).unwrap();
        let err = execute(&ledger, &chaincode, invocation("pin", &[], Some("0000"), "tx3"))
            .unwrap_err();
        assert!(err.to_string().ends_with("mismatched PIN"));
    }
}
