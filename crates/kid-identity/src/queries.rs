//! Rich queries and their result envelope.

use crate::certificate::Certificate;
use crate::errors::Result;
use kid_ledger::{QueryRecord, QueryResponseMetadata};
use serde::Serialize;
use serde_json::json;

/// Live (not revoked) certificates of a KID
pub fn not_revoked_certificates_query(kid: &str) -> String {
    json!({
        "selector": {
            "@certificate": kid,
            "revoked_time": { "$exists": false },
        },
        "use_index": "certificate",
    })
    .to_string()
}

/// KID documents carrying the given public id
pub fn kid_by_id_query(id: &str) -> String {
    json!({
        "selector": {
            "@kid": { "$exists": true },
            "id": id,
        },
    })
    .to_string()
}

/// One page of certificates
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub meta: QueryResponseMetadata,
    pub records: Vec<Certificate>,
}

impl QueryResult {
    pub fn new(meta: QueryResponseMetadata, records: Vec<QueryRecord>) -> Result<Self> {
        let records = records
            .iter()
            .map(|record| serde_json::from_slice(&record.value))
            .collect::<std::result::Result<Vec<Certificate>, _>>()?;
        Ok(Self { meta, records })
    }
}
