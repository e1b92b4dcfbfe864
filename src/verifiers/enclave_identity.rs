use std::time::SystemTime;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::{
    status::Status,
    types::{cert::Certificate, chain::CertificateChain, crl::CrlStore, enclave_identity::EnclaveIdentity},
    utils::Expireable,
};

use super::{ensure, tcb_info::signing_pair, tcb_signing_chain, verdict, Check};

/// Validate an enclave identity document the same way TCB info is validated.
pub fn verify(
    identity: &EnclaveIdentity,
    chain: &CertificateChain,
    root_ca_crl: &CrlStore,
    trusted_root: &Certificate,
    time: SystemTime,
) -> Status {
    verdict(check(identity, chain, root_ca_crl, trusted_root, time))
}

fn check(
    identity: &EnclaveIdentity,
    chain: &CertificateChain,
    root_ca_crl: &CrlStore,
    trusted_root: &Certificate,
    time: SystemTime,
) -> Check {
    tcb_signing_chain::check(chain, root_ca_crl, trusted_root)?;
    let (root, signing) = signing_pair(chain)?;

    if let Err(e) = signing
        .public_key()
        .and_then(|key| identity.verify_signature(&key))
    {
        warn!(status = %Status::SgxEnclaveIdentityInvalidSignature, "{e:#}");
        return Err(Status::SgxEnclaveIdentityInvalidSignature);
    }

    ensure(
        [root, signing].valid_at(time),
        Status::SgxSigningCertChainExpired,
        "identity signing chain is not valid at the verification time",
    )?;
    ensure(root_ca_crl.valid_at(time), Status::SgxCrlExpired, "root CA crl is not valid at the verification time")?;
    ensure(
        identity.is_fresh_at(DateTime::<Utc>::from(time)),
        Status::SgxEnclaveIdentityExpired,
        "enclave identity is outside its issue window",
    )?;

    debug!(id = ?identity.id, version = identity.version, "enclave identity verified");
    Ok(())
}
