//! Identity view returned to callers.

use crate::certificate::Certificate;
use crate::kid::Kid;
use serde::Serialize;

/// Public view of a KID and one of its certificates
///
/// Serializes to `{"id", "sn"}` only. The back-references are for the
/// operations that need the full records.
#[derive(Debug, Clone, Serialize)]
pub struct Identity {
    pub id: String,
    pub sn: String,

    #[serde(skip)]
    kid: Kid,
    #[serde(skip)]
    cert: Certificate,
}

impl Identity {
    pub fn new(kid: Kid, cert: Certificate) -> Self {
        Self {
            id: kid.id.clone(),
            sn: cert.sn.clone(),
            kid,
            cert,
        }
    }

    pub fn kid(&self) -> &Kid {
        &self.kid
    }

    pub fn kid_mut(&mut self) -> &mut Kid {
        &mut self.kid
    }

    pub fn certificate(&self) -> &Certificate {
        &self.cert
    }

    pub fn set_kid(&mut self, kid: Kid) {
        self.id = kid.id.clone();
        self.kid = kid;
    }

    pub fn set_certificate(&mut self, cert: Certificate) {
        self.sn = cert.sn.clone();
        self.cert = cert;
    }
}
