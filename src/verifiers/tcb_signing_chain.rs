use crate::{
    status::Status,
    types::{cert::Certificate, chain::CertificateChain, crl::CrlStore},
};

use super::{ensure, verdict, verify_crl_issuer, verify_root_ca, verify_tcb_signing_cert, verify_trusted_root, Check};

/// Validate the chain (TCB signing certificate, root) that signs TCB info and identity documents.
pub fn verify(chain: &CertificateChain, root_ca_crl: &CrlStore, trusted_root: &Certificate) -> Status {
    verdict(check(chain, root_ca_crl, trusted_root))
}

pub(crate) fn check(chain: &CertificateChain, root_ca_crl: &CrlStore, trusted_root: &Certificate) -> Check {
    let root = chain.root_cert().ok_or(Status::SgxRootCaMissing)?;
    verify_root_ca(root)?;

    let signing = chain
        .topmost_cert()
        .filter(|topmost| *topmost != root)
        .ok_or(Status::SgxTcbSigningCertMissing)?;
    verify_tcb_signing_cert(signing, root)?;

    verify_crl_issuer(root_ca_crl, root)?;
    verify_trusted_root(root, trusted_root, Status::SgxTcbSigningCertChainUntrusted)?;

    ensure(
        !root_ca_crl.is_revoked(signing),
        Status::SgxTcbSigningCertRevoked,
        "TCB signing certificate is revoked",
    )
}
