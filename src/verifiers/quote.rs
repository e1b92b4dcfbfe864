use tracing::{debug, warn};
use zerocopy::AsBytes;

use crate::{
    constants::SGX_PCK_CN_PHRASE,
    status::Status,
    types::{
        cert::PckCertificate,
        crl::CrlStore,
        enclave_identity::{EnclaveIdentity, EnclaveType},
        quote::{Quote, QuoteBody},
        report::EnclaveReportBody,
        tcb_info::{TcbInfo, TcbInfoId, TCB_INFO_V3},
    },
    utils::crypto::{sha256sum, verify_p256_signature, verifying_key_from_raw},
};

use super::{
    apply_mask, enclave_report, ensure, is_pck_ca_crl,
    tcb_level::{check_tcb_level, converge_tcb_status, select_tcb_level},
    Check,
};

/// Verify a decoded quote against its PCK certificate, the PCK CRL, TCB info and,
/// optionally, the QE identity.
///
/// Collateral is expected to have been verified on its own already; this only checks that
/// the pieces belong together and that the quote is signed through them.
pub fn verify(
    quote: &Quote,
    pck: &PckCertificate,
    pck_crl: &CrlStore,
    tcb_info: &TcbInfo,
    identity: Option<&EnclaveIdentity>,
) -> Status {
    match check(quote, pck, pck_crl, tcb_info, identity) {
        Ok(status) => status,
        Err(status) => status,
    }
}

fn check(
    quote: &Quote,
    pck: &PckCertificate,
    pck_crl: &CrlStore,
    tcb_info: &TcbInfo,
    identity: Option<&EnclaveIdentity>,
) -> Result<Status, Status> {
    let cert = pck.certificate();
    ensure(
        cert.subject_cn_contains(SGX_PCK_CN_PHRASE),
        Status::InvalidPckCert,
        "PCK certificate has an unexpected common name",
    )?;
    ensure(
        is_pck_ca_crl(pck_crl),
        Status::InvalidPckCrl,
        "PCK crl was not issued by a PCK CA",
    )?;
    ensure(
        pck_crl.issuer() == cert.issuer(),
        Status::InvalidPckCrl,
        "PCK crl was not issued by the PCK issuer",
    )?;
    if pck_crl.is_revoked(cert) {
        warn!(
            status = %Status::PckRevoked,
            serial = hex::encode(cert.serial_number()),
            "PCK certificate is revoked"
        );
        return Err(Status::PckRevoked);
    }

    check_tee_type(quote, tcb_info)?;
    if pck.fmspc() != tcb_info.fmspc || pck.pce_id() != tcb_info.pce_id {
        warn!(
            status = %Status::TcbInfoMismatch,
            pck_fmspc = hex::encode(pck.fmspc()),
            tcb_fmspc = hex::encode(tcb_info.fmspc),
            pck_pce_id = hex::encode(pck.pce_id()),
            tcb_pce_id = hex::encode(tcb_info.pce_id),
            "PCK certificate does not match TCB info"
        );
        return Err(Status::TcbInfoMismatch);
    }

    ensure(
        quote.certification_data().is_consistent(),
        Status::UnsupportedQuoteFormat,
        "certification data size is inconsistent",
    )?;
    let pck_key = cert.public_key().map_err(|e| {
        warn!(status = %Status::InvalidPckCert, "{e:#}");
        Status::InvalidPckCert
    })?;

    check_tdx_module(quote, tcb_info)?;

    let (qe_report, qe_report_signature, qe_auth_data) =
        match (quote.qe_report(), quote.qe_report_signature(), quote.qe_auth_data()) {
            (Some(report), Some(signature), Some(auth)) => (report, signature, auth),
            _ => {
                warn!(status = %Status::UnsupportedQuoteFormat, "quote carries no QE report");
                return Err(Status::UnsupportedQuoteFormat);
            }
        };
    if let Err(e) = verify_p256_signature(&pck_key, qe_report.as_bytes(), qe_report_signature) {
        warn!(status = %Status::InvalidQeReportSignature, "{e:#}");
        return Err(Status::InvalidQeReportSignature);
    }

    let binding = sha256sum(&[quote.attestation_key(), qe_auth_data.data]);
    if binding[..] != qe_report.report_data[..32] {
        warn!(
            status = %Status::InvalidQeReportData,
            expected = hex::encode(binding),
            reported = hex::encode(&qe_report.report_data[..32]),
            "QE report data does not bind the attestation key"
        );
        return Err(Status::InvalidQeReportData);
    }

    let qe_status = match identity {
        Some(identity) => Some(check_qe_identity(quote, identity, qe_report)?),
        None => None,
    };

    let attestation_key = verifying_key_from_raw(quote.attestation_key()).map_err(|e| {
        warn!(status = %Status::UnsupportedQuoteFormat, "{e:#}");
        Status::UnsupportedQuoteFormat
    })?;
    if let Err(e) = verify_p256_signature(&attestation_key, quote.signed_data(), quote.isv_signature()) {
        warn!(status = %Status::InvalidQuoteSignature, "{e:#}");
        return Err(Status::InvalidQuoteSignature);
    }

    let level = select_tcb_level(tcb_info, pck.tcb(), &quote.body)?;
    let tcb_status = check_tcb_level(tcb_info, level, &quote.body);
    if tcb_status == Status::TcbInfoMismatch {
        return Err(tcb_status);
    }

    let status = match qe_status {
        Some(qe_status) => converge_tcb_status(tcb_status, qe_status),
        None => tcb_status,
    };
    debug!(%status, ?qe_status, tcb = %tcb_status, "quote verified");
    Ok(status)
}

fn check_tee_type(quote: &Quote, tcb_info: &TcbInfo) -> Check {
    let is_tdx_quote = matches!(quote.body, QuoteBody::Tdx(_));
    let matches = if tcb_info.version >= TCB_INFO_V3 {
        match tcb_info.id {
            TcbInfoId::Tdx => is_tdx_quote,
            TcbInfoId::Sgx => !is_tdx_quote,
        }
    } else {
        !is_tdx_quote
    };
    if !matches {
        warn!(
            status = %Status::TcbInfoMismatch,
            tee_type = quote.tee_type(),
            tcb_info_id = ?tcb_info.id,
            tcb_info_version = tcb_info.version,
            "quote tee type does not match TCB info"
        );
        return Err(Status::TcbInfoMismatch);
    }
    Ok(())
}

fn check_tdx_module(quote: &Quote, tcb_info: &TcbInfo) -> Check {
    if !tcb_info.is_tdx() {
        return Ok(());
    }
    let (Some(module), QuoteBody::Tdx(td)) = (&tcb_info.tdx_module, &quote.body) else {
        return Ok(());
    };

    if td.mr_signer_seam != module.mrsigner {
        warn!(
            status = %Status::TdxModuleMismatch,
            reported = hex::encode(td.mr_signer_seam),
            expected = hex::encode(module.mrsigner),
            "TDX module mrsigner mismatch"
        );
        return Err(Status::TdxModuleMismatch);
    }
    ensure(
        apply_mask(&td.seam_attributes, &module.attributes_mask) == module.attributes,
        Status::TdxModuleMismatch,
        "TDX module attributes mismatch",
    )
}

fn check_qe_identity(
    quote: &Quote,
    identity: &EnclaveIdentity,
    qe_report: &EnclaveReportBody,
) -> Result<Status, Status> {
    let expected_id = match quote.body {
        QuoteBody::Tdx(_) => {
            ensure(identity.version > 1, Status::QeIdentityMismatch, "TDX quotes need a v2 identity")?;
            EnclaveType::TdQe
        }
        QuoteBody::Sgx(_) => EnclaveType::Qe,
    };
    if identity.id != expected_id {
        warn!(
            status = %Status::QeIdentityMismatch,
            id = ?identity.id,
            expected = ?expected_id,
            "QE identity is for a different enclave"
        );
        return Err(Status::QeIdentityMismatch);
    }

    grade_qe_report(enclave_report::verify(identity, qe_report))
}

/// Hard failures of the QE report check end verification; any other status, the ISV SVN
/// verdicts included, is carried on into TCB convergence.
fn grade_qe_report(status: Status) -> Result<Status, Status> {
    match status {
        Status::SgxEnclaveReportUnsupportedFormat => Err(Status::UnsupportedQuoteFormat),
        Status::SgxEnclaveIdentityUnsupportedFormat
        | Status::SgxEnclaveIdentityInvalid
        | Status::SgxEnclaveIdentityUnsupportedVersion => Err(Status::UnsupportedQeIdentityFormat),
        Status::SgxEnclaveReportMiscselectMismatch
        | Status::SgxEnclaveReportAttributesMismatch
        | Status::SgxEnclaveReportMrsignerMismatch
        | Status::SgxEnclaveReportIsvprodidMismatch => Err(Status::QeIdentityMismatch),
        status => Ok(status),
    }
}
