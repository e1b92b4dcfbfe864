use std::time::SystemTime;

use tracing::debug;

use crate::{
    status::Status,
    types::{cert::Certificate, chain::CertificateChain, crl::CrlStore},
    utils::Expireable,
};

use super::{
    ensure, verdict, verify_crl_issuer, verify_intermediate_ca, verify_pck, verify_root_ca, verify_trusted_root,
    Check,
};

/// Validate a PCK chain (root, intermediate CA, PCK) with its two CRLs against `trusted_root`.
pub fn verify(
    chain: &CertificateChain,
    root_ca_crl: &CrlStore,
    intermediate_crl: &CrlStore,
    trusted_root: &Certificate,
    time: SystemTime,
) -> Status {
    verdict(check(chain, root_ca_crl, intermediate_crl, trusted_root, time))
}

fn check(
    chain: &CertificateChain,
    root_ca_crl: &CrlStore,
    intermediate_crl: &CrlStore,
    trusted_root: &Certificate,
    time: SystemTime,
) -> Check {
    let root = chain.root_cert().ok_or(Status::SgxRootCaMissing)?;
    verify_root_ca(root)?;

    let intermediate = chain.intermediate_cert().ok_or(Status::SgxIntermediateCaMissing)?;
    verify_intermediate_ca(intermediate, root)?;

    let pck = chain.pck_cert().ok_or(Status::SgxPckMissing)?.certificate();
    verify_pck(pck, intermediate)?;

    verify_trusted_root(root, trusted_root, Status::SgxPckCertChainUntrusted)?;

    verify_crl_issuer(root_ca_crl, root)?;
    verify_crl_issuer(intermediate_crl, intermediate)?;

    ensure(
        !root_ca_crl.is_revoked(intermediate),
        Status::SgxIntermediateCaRevoked,
        "intermediate CA is revoked",
    )?;
    ensure(!intermediate_crl.is_revoked(pck), Status::SgxPckRevoked, "PCK certificate is revoked")?;

    ensure(
        [root, intermediate, pck].valid_at(time),
        Status::SgxPckCertChainExpired,
        "PCK certificate chain is not valid at the verification time",
    )?;
    ensure(
        [root_ca_crl, intermediate_crl].valid_at(time),
        Status::SgxCrlExpired,
        "crl is not valid at the verification time",
    )?;

    debug!("PCK certificate chain verified");
    Ok(())
}
