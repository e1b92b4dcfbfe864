use crate::{
    status::Status,
    types::{cert::Certificate, chain::CertificateChain, crl::CrlStore},
};

use super::{verdict, verify_crl_issuer, verify_intermediate_ca, verify_root_ca, verify_trusted_root, Check};

/// Validate a CRL issued by the root or an intermediate CA of `issuer_chain`.
pub fn verify(crl: &CrlStore, issuer_chain: &CertificateChain, trusted_root: &Certificate) -> Status {
    verdict(check(crl, issuer_chain, trusted_root))
}

fn check(crl: &CrlStore, issuer_chain: &CertificateChain, trusted_root: &Certificate) -> Check {
    let root = issuer_chain.root_cert().ok_or(Status::SgxRootCaMissing)?;
    verify_root_ca(root)?;

    // A root CA CRL can come with a chain holding only the root.
    let issuer = match issuer_chain.intermediate_cert() {
        Some(intermediate) => {
            verify_intermediate_ca(intermediate, root)?;
            if crl.is_issued_by(intermediate) {
                intermediate
            } else {
                root
            }
        }
        None => root,
    };
    verify_crl_issuer(crl, issuer)?;

    verify_trusted_root(root, trusted_root, Status::SgxRootCaUntrusted)
}
