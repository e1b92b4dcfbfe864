//! Verifiers for chains, collateral documents and quotes.
//!
//! Each verifier returns exactly one [`Status`]. Internally the checks are written as
//! `Result<(), Status>` so that the first failing gate short-circuits with `?`.

use tracing::warn;

use crate::{
    constants::{
        SGX_PCK_CN_PHRASE, SGX_PCK_PLATFORM_CA_CN_PHRASE, SGX_PCK_PROCESSOR_CA_CN_PHRASE,
        SGX_ROOT_CA_CN_PHRASE, SGX_TCB_SIGNING_CN_PHRASE,
    },
    status::Status,
    types::{
        cert::{common_name, Certificate},
        crl::CrlStore,
    },
};

pub mod enclave_identity;
pub mod enclave_report;
pub mod pck_cert;
pub mod pck_crl;
pub mod quote;
pub mod tcb_info;
pub mod tcb_level;
pub mod tcb_signing_chain;

pub(crate) type Check = Result<(), Status>;

/// Collapse a chain of checks into its verdict.
pub(crate) fn verdict(check: Check) -> Status {
    match check {
        Ok(()) => Status::Ok,
        Err(status) => status,
    }
}

/// `Ok` when `condition` holds, otherwise log `reason` and fail with `status`.
pub(crate) fn ensure(condition: bool, status: Status, reason: &str) -> Check {
    if condition {
        Ok(())
    } else {
        warn!(%status, "{reason}");
        Err(status)
    }
}

pub(crate) fn apply_mask<const N: usize>(value: &[u8; N], mask: &[u8; N]) -> [u8; N] {
    let mut out = [0u8; N];
    for (o, (v, m)) in out.iter_mut().zip(value.iter().zip(mask)) {
        *o = v & m;
    }
    out
}

/// Expected shape of a certificate role within a chain.
struct Role {
    name: &'static str,
    cn_phrases: &'static [&'static str],
    invalid_issuer: Status,
    invalid: Status,
}

const ROOT_CA: Role = Role {
    name: "root CA",
    cn_phrases: &[SGX_ROOT_CA_CN_PHRASE],
    invalid_issuer: Status::SgxRootCaInvalidIssuer,
    invalid: Status::SgxRootCaInvalid,
};

const INTERMEDIATE_CA: Role = Role {
    name: "intermediate CA",
    cn_phrases: &[SGX_PCK_PROCESSOR_CA_CN_PHRASE, SGX_PCK_PLATFORM_CA_CN_PHRASE],
    invalid_issuer: Status::SgxIntermediateCaInvalidIssuer,
    invalid: Status::SgxIntermediateCaInvalid,
};

const PCK: Role = Role {
    name: "PCK certificate",
    cn_phrases: &[SGX_PCK_CN_PHRASE],
    invalid_issuer: Status::SgxPckInvalidIssuer,
    invalid: Status::SgxPckInvalid,
};

const TCB_SIGNING: Role = Role {
    name: "TCB signing certificate",
    cn_phrases: &[SGX_TCB_SIGNING_CN_PHRASE],
    invalid_issuer: Status::SgxTcbSigningCertInvalidIssuer,
    invalid: Status::SgxTcbSigningCertInvalid,
};

fn verify_role(cert: &Certificate, issuer: &Certificate, role: &Role) -> Check {
    if !cert.is_issued_by(issuer) {
        warn!(
            status = %role.invalid_issuer,
            issuer = ?cert.issuer_cn(),
            expected = ?issuer.subject_cn(),
            "{} has unexpected issuer", role.name
        );
        return Err(role.invalid_issuer);
    }
    ensure(
        role.cn_phrases.iter().any(|phrase| cert.subject_cn_contains(phrase)),
        role.invalid,
        role.name,
    )?;
    if let Err(e) = cert.verify_signed_by(issuer) {
        warn!(status = %role.invalid_issuer, "{}: {e:#}", role.name);
        return Err(role.invalid_issuer);
    }
    Ok(())
}

pub(crate) fn verify_root_ca(root: &Certificate) -> Check {
    verify_role(root, root, &ROOT_CA)
}

pub(crate) fn verify_intermediate_ca(intermediate: &Certificate, root: &Certificate) -> Check {
    verify_role(intermediate, root, &INTERMEDIATE_CA)
}

pub(crate) fn verify_pck(pck: &Certificate, intermediate: &Certificate) -> Check {
    verify_role(pck, intermediate, &PCK)
}

pub(crate) fn verify_tcb_signing_cert(signing: &Certificate, root: &Certificate) -> Check {
    verify_role(signing, root, &TCB_SIGNING)
}

/// The trusted root must be self-issued and carry the same signature as the chain root.
pub(crate) fn verify_trusted_root(chain_root: &Certificate, trusted_root: &Certificate, untrusted: Status) -> Check {
    ensure(
        trusted_root.is_self_issued(),
        Status::TrustedRootCaInvalid,
        "trusted root is not self-issued",
    )?;
    ensure(
        chain_root.signature() == trusted_root.signature(),
        untrusted,
        "chain root does not match the trusted root",
    )
}

/// The CRL names one of the PCK issuing CAs (Processor or Platform) as its issuer.
pub(crate) fn is_pck_ca_crl(crl: &CrlStore) -> bool {
    common_name(crl.issuer())
        .is_some_and(|cn| INTERMEDIATE_CA.cn_phrases.iter().any(|phrase| cn.contains(phrase)))
}

pub(crate) fn verify_crl_issuer(crl: &CrlStore, issuer: &Certificate) -> Check {
    ensure(
        crl.is_issued_by(issuer),
        Status::SgxCrlUnknownIssuer,
        "crl was not issued by the expected certificate",
    )?;
    if let Err(e) = crl.verify_signed_by(issuer) {
        warn!(status = %Status::SgxCrlInvalidSignature, "{e:#}");
        return Err(Status::SgxCrlInvalidSignature);
    }
    Ok(())
}
