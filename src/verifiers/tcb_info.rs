use std::time::SystemTime;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::{
    status::Status,
    types::{cert::Certificate, chain::CertificateChain, crl::CrlStore, tcb_info::TcbInfo},
    utils::Expireable,
};

use super::{ensure, tcb_signing_chain, verdict, Check};

/// Validate the TCB info signature, its signing chain and its freshness at `time`.
pub fn verify(
    tcb_info: &TcbInfo,
    chain: &CertificateChain,
    root_ca_crl: &CrlStore,
    trusted_root: &Certificate,
    time: SystemTime,
) -> Status {
    verdict(check(tcb_info, chain, root_ca_crl, trusted_root, time))
}

fn check(
    tcb_info: &TcbInfo,
    chain: &CertificateChain,
    root_ca_crl: &CrlStore,
    trusted_root: &Certificate,
    time: SystemTime,
) -> Check {
    tcb_signing_chain::check(chain, root_ca_crl, trusted_root)?;
    let (root, signing) = signing_pair(chain)?;

    let signature = signing
        .public_key()
        .and_then(|key| tcb_info.verify_signature(&key));
    if let Err(e) = signature {
        warn!(status = %Status::TcbInfoInvalidSignature, "{e:#}");
        return Err(Status::TcbInfoInvalidSignature);
    }

    ensure(
        [root, signing].valid_at(time),
        Status::SgxSigningCertChainExpired,
        "TCB signing chain is not valid at the verification time",
    )?;
    ensure(root_ca_crl.valid_at(time), Status::SgxCrlExpired, "root CA crl is not valid at the verification time")?;
    ensure(
        DateTime::<Utc>::from(time) <= tcb_info.next_update,
        Status::SgxTcbInfoExpired,
        "TCB info is past its next update",
    )?;

    debug!(fmspc = hex::encode(tcb_info.fmspc), version = tcb_info.version, "TCB info verified");
    Ok(())
}

/// Root and TCB signing certificate of a chain that already passed the signing chain checks.
pub(crate) fn signing_pair(chain: &CertificateChain) -> Result<(&Certificate, &Certificate), Status> {
    let root = chain.root_cert().ok_or(Status::SgxRootCaMissing)?;
    let signing = chain.topmost_cert().ok_or(Status::SgxTcbSigningCertMissing)?;
    Ok((root, signing))
}
