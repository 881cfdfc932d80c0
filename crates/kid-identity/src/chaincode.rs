//! Invocation dispatch.
//!
//! Maps a function name and its parameters onto the identity use cases and
//! turns every outcome into a [`Response`]. Domain errors are described to
//! the caller; infrastructure errors are logged and replaced by the
//! operation's generic message.

use crate::constants::TRANSIENT_PIN;
use crate::errors::{IdentityError, Result};
use crate::identity::Identity;
use crate::stub::{normalize_serial, IdentityStub, StubConfig};
use kid_ledger::LedgerStub;
use serde::Serialize;
use tracing::{debug, debug_span, Span};

/// Outcome of one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// JSON payload, or the bare KID id for `kid`
    Success(Vec<u8>),
    /// Caller-facing error message
    Error(String),
}

impl Response {
    pub fn success(payload: impl Into<Vec<u8>>) -> Self {
        Response::Success(payload.into())
    }

    pub fn error(message: impl Into<String>) -> Self {
        Response::Error(message.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success(_))
    }

    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            Response::Success(payload) => Some(payload),
            Response::Error(_) => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Response::Success(_) => None,
            Response::Error(message) => Some(message),
        }
    }
}

type Outcome = std::result::Result<Vec<u8>, Response>;

/// Attach an operation message to a failed identity result
trait ResponseExt<T> {
    fn or_respond(self, message: &str) -> std::result::Result<T, Response>;
}

impl<T> ResponseExt<T> for Result<T> {
    fn or_respond(self, message: &str) -> std::result::Result<T, Response> {
        self.map_err(|e| response_error(&e, message))
    }
}

fn response_error(err: &IdentityError, message: &str) -> Response {
    debug!(error = %err, kind = ?err.kind(), "{}", message);

    if err.kind().exposes_detail() {
        Response::error(format!("{}: {}", message, err))
    } else {
        Response::error(message)
    }
}

fn to_json<T: Serialize>(value: &T, message: &str) -> Outcome {
    serde_json::to_vec(value)
        .map_err(IdentityError::from)
        .or_respond(message)
}

fn respond_identity(identity: &Identity) -> Outcome {
    to_json(identity, "failed to marshal the identity")
}

/// Identity dispatcher
///
/// Owns the repository configuration and the span every invocation is
/// logged under.
pub struct Chaincode {
    config: StubConfig,
    span: Span,
}

impl Default for Chaincode {
    fn default() -> Self {
        Self::new(StubConfig::default(), Span::none())
    }
}

impl Chaincode {
    pub fn new(config: StubConfig, span: Span) -> Self {
        Self { config, span }
    }

    pub fn config(&self) -> &StubConfig {
        &self.config
    }

    /// Run one named invocation against `stub`
    ///
    /// Functions: `get`, `kid [secure]`, `list [bookmark]`, `pin`,
    /// `register`, `revoke <sn>`, `lock`, `unlock`.
    pub fn invoke<S: LedgerStub + ?Sized>(
        &self,
        stub: &mut S,
        function: &str,
        params: &[String],
    ) -> Response {
        let span = debug_span!(parent: &self.span, "invoke", function, tx_id = %stub.tx_id());
        let _guard = span.enter();

        let mut id_stub = IdentityStub::new(stub, &self.config);

        let outcome = match function {
            "get" => get(&mut id_stub),
            "kid" => kid(&mut id_stub, params.first().is_some_and(|p| !p.is_empty())),
            "list" => list(&mut id_stub, params),
            "pin" => pin(&mut id_stub),
            "register" => register(&mut id_stub),
            "revoke" => revoke(&mut id_stub, params),
            "lock" => lock(&mut id_stub),
            "unlock" => unlock(&mut id_stub),
            _ => {
                debug!("Unknown function");
                Err(Response::error(format!("unknown function: '{}'", function)))
            }
        };

        match outcome {
            Ok(payload) => Response::Success(payload),
            Err(response) => response,
        }
    }
}

/// Caller's identity: an active certificate and the KID it belongs to
fn invoker<S: LedgerStub + ?Sized>(
    id_stub: &mut IdentityStub<'_, S>,
    secure: bool,
) -> Result<Identity> {
    let cert = id_stub.get_certificate("")?;
    cert.validate()?;
    let kid = id_stub.get_kid(secure)?;
    Ok(Identity::new(kid, cert))
}

const INVOKER_FAILED: &str = "failed to get the invoker's identity";

fn get<S: LedgerStub + ?Sized>(id_stub: &mut IdentityStub<'_, S>) -> Outcome {
    let identity = invoker(id_stub, false).or_respond(INVOKER_FAILED)?;
    respond_identity(&identity)
}

fn kid<S: LedgerStub + ?Sized>(id_stub: &mut IdentityStub<'_, S>, secure: bool) -> Outcome {
    let identity = invoker(id_stub, secure).or_respond(INVOKER_FAILED)?;
    Ok(identity.id.into_bytes())
}

// params[0]: bookmark
fn list<S: LedgerStub + ?Sized>(id_stub: &mut IdentityStub<'_, S>, params: &[String]) -> Outcome {
    let identity = invoker(id_stub, false).or_respond(INVOKER_FAILED)?;

    let bookmark = params.first().map(String::as_str).unwrap_or_default();
    let result = id_stub
        .query_certificates(&identity.id, bookmark)
        .or_respond("failed to get certificate list")?;

    to_json(&result, "failed to marshal certificate list")
}

fn pin<S: LedgerStub + ?Sized>(id_stub: &mut IdentityStub<'_, S>) -> Outcome {
    let mut identity = invoker(id_stub, true).or_respond(INVOKER_FAILED)?;

    id_stub
        .update_pin(identity.kid_mut())
        .or_respond("failed to update the PIN")?;

    respond_identity(&identity)
}

fn register<S: LedgerStub + ?Sized>(id_stub: &mut IdentityStub<'_, S>) -> Outcome {
    const REGISTER_FAILED: &str = "failed to register the certificate";

    let cert = match id_stub.get_certificate("") {
        Ok(cert) => {
            cert.validate().or_respond(REGISTER_FAILED)?;
            Some(cert)
        }
        Err(IdentityError::NotRegistered) => None,
        Err(e) => return Err(response_error(&e, REGISTER_FAILED)),
    };

    let kid = match id_stub.get_kid(true) {
        Ok(kid) => kid,
        Err(IdentityError::NotRegistered) => {
            let code = id_stub.transient_code(TRANSIENT_PIN);
            id_stub
                .create_kid(&code)
                .or_respond("failed to create new KID")?
        }
        Err(e) => return Err(response_error(&e, "failed to get the invoker's KID")),
    };

    let cert = match cert {
        Some(cert) => cert,
        None => id_stub
            .create_certificate(&kid.id)
            .or_respond(REGISTER_FAILED)?,
    };

    respond_identity(&Identity::new(kid, cert))
}

// params[0]: serial number
fn revoke<S: LedgerStub + ?Sized>(id_stub: &mut IdentityStub<'_, S>, params: &[String]) -> Outcome {
    let [sn] = params else {
        return Err(Response::error(
            IdentityError::InvalidParams("1".to_string()).to_string(),
        ));
    };

    invoker(id_stub, true).or_respond(INVOKER_FAILED)?;

    let mut revokee = id_stub
        .get_certificate(&normalize_serial(sn))
        .or_respond("failed to get the certificate to be revoked")?;
    if revokee.is_revoked() {
        return Err(Response::error(IdentityError::AlreadyRevoked.to_string()));
    }

    id_stub
        .revoke_certificate(&mut revokee)
        .or_respond("failed to revoke the certificate")?;

    to_json(&revokee, "failed to marshal the certificate")
}

fn lock<S: LedgerStub + ?Sized>(id_stub: &mut IdentityStub<'_, S>) -> Outcome {
    let mut identity = invoker(id_stub, true).or_respond(INVOKER_FAILED)?;

    id_stub
        .set_lock(identity.kid_mut())
        .or_respond("failed to lock the KID")?;

    respond_identity(&identity)
}

fn unlock<S: LedgerStub + ?Sized>(id_stub: &mut IdentityStub<'_, S>) -> Outcome {
    let mut identity = invoker(id_stub, true).or_respond(INVOKER_FAILED)?;

    id_stub
        .clear_lock(identity.kid_mut())
        .or_respond("failed to unlock the KID")?;

    respond_identity(&identity)
}
