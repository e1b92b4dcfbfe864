//! Verification of Intel SGX/TDX DCAP ECDSA quotes and their collateral.
//!
//! Every entry point takes fully materialized inputs and returns exactly one [`Status`].
//! `Status::Ok` and the TCB staleness verdicts (see [`Status::is_usable_with_caveats`]) mean
//! the quote can be trusted with caveats; everything else means reject.

pub mod constants;
pub mod engine;
pub mod error;
pub mod status;
pub mod types;
pub mod utils;
pub mod verifiers;

#[cfg(test)]
mod test_utils;

use std::time::SystemTime;

use tracing::{debug, warn};

pub use engine::Engine;
pub use status::Status;
pub use types::collateral::Collateral;

use constants::{EXPECTED_CERTIFICATE_COUNT_IN_PCK_CHAIN, EXPECTED_CERTIFICATE_COUNT_IN_TCB_CHAIN};
use error::ParseError;
use types::{
    cert::{Certificate, PckCertificate},
    chain::CertificateChain,
    crl::CrlStore,
    enclave_identity::EnclaveIdentity,
    quote::Quote,
    report::EnclaveReportBody,
    tcb_info::TcbInfo,
};

type Verdict = Result<Status, Status>;

fn settle(verdict: Verdict) -> Status {
    verdict.unwrap_or_else(|status| status)
}

fn rejected(what: &str, e: ParseError, format: Status, invalid: Status) -> Status {
    let status = e.to_status(format, invalid);
    warn!(%status, "{what}: {e}");
    status
}

fn check_time(time: SystemTime) -> Result<(), Status> {
    match time.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(_) => Ok(()),
        Err(_) => {
            warn!(status = %Status::InvalidParameter, "verification time is before the UNIX epoch");
            Err(Status::InvalidParameter)
        }
    }
}

fn parse_chain(pem: &str, expected: usize) -> Result<CertificateChain, Status> {
    let chain = CertificateChain::parse(pem)?;
    if chain.len() != expected {
        warn!(
            status = %Status::UnsupportedCertFormat,
            certificates = chain.len(),
            expected,
            "unexpected certificate count"
        );
        return Err(Status::UnsupportedCertFormat);
    }
    Ok(chain)
}

fn parse_crl(input: &str) -> Result<CrlStore, Status> {
    CrlStore::parse(input)
        .map_err(|e| rejected("crl", e, Status::SgxCrlUnsupportedFormat, Status::SgxCrlUnsupportedFormat))
}

/// Verify a PCK certificate chain against the root CA CRL, the intermediate CA CRL
/// (`crls`, in that order) and the trusted root.
pub fn verify_pck_certificate(
    _engine: &Engine,
    chain_pem: &str,
    crls: [&str; 2],
    trusted_root_pem: &str,
    time: SystemTime,
) -> Status {
    settle(pck_certificate(chain_pem, crls, trusted_root_pem, time))
}

fn pck_certificate(chain_pem: &str, crls: [&str; 2], trusted_root_pem: &str, time: SystemTime) -> Verdict {
    check_time(time)?;
    if chain_pem.is_empty() || crls.iter().any(|crl| crl.is_empty()) || trusted_root_pem.is_empty() {
        return Err(Status::UnsupportedCertFormat);
    }

    let chain = parse_chain(chain_pem, EXPECTED_CERTIFICATE_COUNT_IN_PCK_CHAIN)?;
    let root_ca_crl = parse_crl(crls[0])?;
    let intermediate_crl = parse_crl(crls[1])?;
    let trusted_root = Certificate::from_pem(trusted_root_pem).map_err(|e| {
        rejected(
            "trusted root",
            e,
            Status::TrustedRootCaUnsupportedFormat,
            Status::TrustedRootCaUnsupportedFormat,
        )
    })?;

    Ok(verifiers::pck_cert::verify(
        &chain,
        &root_ca_crl,
        &intermediate_crl,
        &trusted_root,
        time,
    ))
}

/// Verify a single CRL against the chain of its issuer.
///
/// Superseded by [`verify_pck_certificate`], which checks both CRLs together with the chain.
pub fn verify_pck_revocation_list(_engine: &Engine, crl: &str, chain_pem: &str, trusted_root_pem: &str) -> Status {
    settle(pck_revocation_list(crl, chain_pem, trusted_root_pem))
}

fn pck_revocation_list(crl: &str, chain_pem: &str, trusted_root_pem: &str) -> Verdict {
    if crl.is_empty() || chain_pem.is_empty() || trusted_root_pem.is_empty() {
        return Err(Status::SgxCrlUnsupportedFormat);
    }

    let crl = parse_crl(crl)?;
    let chain = CertificateChain::parse(chain_pem).map_err(|status| {
        warn!(%status, "crl issuer chain");
        Status::SgxCaCertUnsupportedFormat
    })?;
    let trusted_root = Certificate::from_pem(trusted_root_pem).map_err(|e| {
        rejected(
            "trusted root",
            e,
            Status::TrustedRootCaUnsupportedFormat,
            Status::TrustedRootCaUnsupportedFormat,
        )
    })?;

    Ok(verifiers::pck_crl::verify(&crl, &chain, &trusted_root))
}

/// Parsed TCB signing chain, root CA CRL and trusted root shared by the collateral
/// document entry points.
struct SigningInputs {
    chain: CertificateChain,
    root_ca_crl: CrlStore,
    trusted_root: Certificate,
}

impl SigningInputs {
    fn parse(chain_pem: &str, root_ca_crl: &str, trusted_root_pem: &str) -> Result<Self, Status> {
        let chain = parse_chain(chain_pem, EXPECTED_CERTIFICATE_COUNT_IN_TCB_CHAIN)?;
        let root_ca_crl = parse_crl(root_ca_crl)?;
        let trusted_root = Certificate::from_pem(trusted_root_pem).map_err(|e| {
            rejected(
                "trusted root",
                e,
                Status::UnsupportedCertFormat,
                Status::SgxRootCaInvalidExtensions,
            )
        })?;
        Ok(Self {
            chain,
            root_ca_crl,
            trusted_root,
        })
    }
}

/// Verify a signed TCB info document, its signing chain and its freshness at `time`.
pub fn verify_tcb_info(
    _engine: &Engine,
    tcb_info_json: &str,
    chain_pem: &str,
    root_ca_crl: &str,
    trusted_root_pem: &str,
    time: SystemTime,
) -> Status {
    settle(tcb_info(tcb_info_json, chain_pem, root_ca_crl, trusted_root_pem, time))
}

fn tcb_info(tcb_info_json: &str, chain_pem: &str, root_ca_crl: &str, trusted_root_pem: &str, time: SystemTime) -> Verdict {
    check_time(time)?;
    if [tcb_info_json, chain_pem, root_ca_crl, trusted_root_pem].iter().any(|input| input.is_empty()) {
        return Err(Status::UnsupportedCertFormat);
    }

    let tcb_info = TcbInfo::parse(tcb_info_json).map_err(|e| {
        rejected("tcb info", e, Status::SgxTcbInfoUnsupportedFormat, Status::SgxTcbInfoInvalid)
    })?;
    let inputs = SigningInputs::parse(chain_pem, root_ca_crl, trusted_root_pem)?;

    Ok(verifiers::tcb_info::verify(
        &tcb_info,
        &inputs.chain,
        &inputs.root_ca_crl,
        &inputs.trusted_root,
        time,
    ))
}

/// Verify a signed enclave identity document (QE, QVE or TD QE identity).
pub fn verify_enclave_identity(
    _engine: &Engine,
    identity_json: &str,
    chain_pem: &str,
    root_ca_crl: &str,
    trusted_root_pem: &str,
    time: SystemTime,
) -> Status {
    settle(enclave_identity(identity_json, chain_pem, root_ca_crl, trusted_root_pem, time))
}

fn enclave_identity(
    identity_json: &str,
    chain_pem: &str,
    root_ca_crl: &str,
    trusted_root_pem: &str,
    time: SystemTime,
) -> Verdict {
    check_time(time)?;
    if [identity_json, chain_pem, root_ca_crl, trusted_root_pem].iter().any(|input| input.is_empty()) {
        return Err(Status::UnsupportedCertFormat);
    }

    let identity = parse_identity(identity_json)?;
    let inputs = SigningInputs::parse(chain_pem, root_ca_crl, trusted_root_pem)?;

    Ok(verifiers::enclave_identity::verify(
        &identity,
        &inputs.chain,
        &inputs.root_ca_crl,
        &inputs.trusted_root,
        time,
    ))
}

fn parse_identity(identity_json: &str) -> Result<EnclaveIdentity, Status> {
    EnclaveIdentity::parse(identity_json).map_err(|e| {
        rejected(
            "enclave identity",
            e,
            Status::SgxEnclaveIdentityUnsupportedFormat,
            Status::SgxEnclaveIdentityInvalid,
        )
    })
}

/// Verify a quote against its PCK certificate, the PCK CRL, TCB info and, optionally, the
/// QE identity.
///
/// The collateral is only parsed here; verify it first with [`verify_pck_certificate`],
/// [`verify_tcb_info`] and [`verify_enclave_identity`].
pub fn verify_quote(
    _engine: &Engine,
    quote: &[u8],
    pck_pem: &str,
    pck_crl: &str,
    tcb_info_json: &str,
    qe_identity_json: Option<&str>,
) -> Status {
    settle(quote_verdict(quote, pck_pem, pck_crl, tcb_info_json, qe_identity_json))
}

fn decode_quote(bytes: &[u8]) -> Result<Quote<'_>, Status> {
    let quote = Quote::decode(bytes).map_err(|e| {
        warn!(status = %Status::UnsupportedQuoteFormat, "{e}");
        Status::UnsupportedQuoteFormat
    })?;
    quote.validate().map_err(|e| {
        warn!(status = %Status::UnsupportedQuoteFormat, "{e}");
        Status::UnsupportedQuoteFormat
    })?;
    Ok(quote)
}

fn quote_verdict(
    quote: &[u8],
    pck_pem: &str,
    pck_crl: &str,
    tcb_info_json: &str,
    qe_identity_json: Option<&str>,
) -> Verdict {
    if quote.is_empty() || pck_pem.is_empty() || pck_crl.is_empty() || tcb_info_json.is_empty() {
        return Err(Status::MissingParameters);
    }

    let quote = decode_quote(quote)?;
    let pck_crl = CrlStore::parse(pck_crl).map_err(|e| {
        rejected("PCK crl", e, Status::UnsupportedPckRlFormat, Status::UnsupportedPckRlFormat)
    })?;
    let tcb_info = TcbInfo::parse(tcb_info_json).map_err(|e| {
        rejected("tcb info", e, Status::UnsupportedTcbInfoFormat, Status::UnsupportedTcbInfoFormat)
    })?;
    let identity = qe_identity_json
        .map(|json| {
            EnclaveIdentity::parse(json).map_err(|e| {
                warn!(status = %Status::UnsupportedQeIdentityFormat, "QE identity: {e}");
                Status::UnsupportedQeIdentityFormat
            })
        })
        .transpose()?;
    let pck = PckCertificate::from_pem(pck_pem).map_err(|e| {
        let status = match e {
            ParseError::InvalidExtension(_) => Status::InvalidPckCert,
            _ => Status::UnsupportedPckCertFormat,
        };
        warn!(%status, "PCK certificate: {e}");
        status
    })?;

    Ok(verifiers::quote::verify(&quote, &pck, &pck_crl, &tcb_info, identity.as_ref()))
}

/// Match a raw 384-byte enclave report against an enclave identity document.
pub fn verify_enclave_report(_engine: &Engine, report: &[u8], identity_json: &str) -> Status {
    settle(enclave_report(report, identity_json))
}

fn enclave_report(report: &[u8], identity_json: &str) -> Verdict {
    let report = EnclaveReportBody::from_exact(report).ok_or_else(|| {
        warn!(
            status = %Status::SgxEnclaveReportUnsupportedFormat,
            len = report.len(),
            "enclave report has the wrong size"
        );
        Status::SgxEnclaveReportUnsupportedFormat
    })?;
    if identity_json.is_empty() {
        return Err(Status::SgxEnclaveReportUnsupportedFormat);
    }
    let identity = parse_identity(identity_json)?;
    Ok(verifiers::enclave_report::verify(&identity, &report))
}

/// Size of the certification data identifying the PCK; for v4 quotes this is the data nested
/// in the QE report certification block.
pub fn qe_certification_data_size(_engine: &Engine, quote: &[u8]) -> Result<u32, Status> {
    if quote.is_empty() {
        return Err(Status::MissingParameters);
    }
    let quote = decode_quote(quote)?;
    Ok(quote.certification_data().declared_size)
}

/// Type and bytes of the certification data identifying the PCK.
///
/// `expected_size` must be the value returned by [`qe_certification_data_size`].
pub fn qe_certification_data(_engine: &Engine, quote: &[u8], expected_size: u32) -> Result<(u16, Vec<u8>), Status> {
    if quote.is_empty() {
        return Err(Status::MissingParameters);
    }
    let quote = decode_quote(quote)?;
    let data = quote.certification_data();
    if data.declared_size != expected_size {
        warn!(
            status = %Status::InvalidQeCertificationDataSize,
            expected_size,
            actual = data.declared_size,
            "certification data size mismatch"
        );
        return Err(Status::InvalidQeCertificationDataSize);
    }
    Ok((data.cert_type, data.data.to_vec()))
}

/// Verify a quote end to end: the PCK chain it carries, the PCK CRL, TCB info, QE identity and
/// finally the quote itself.
///
/// Returns the first status that is not usable; otherwise the verdict of [`verify_quote`].
/// An empty `collateral.qe_identity` skips the QE identity checks.
pub fn verify_quote_with_collateral(
    engine: &Engine,
    quote: &[u8],
    collateral: &Collateral,
    trusted_root_pem: &str,
    time: SystemTime,
) -> Status {
    settle(quote_with_collateral(engine, quote, collateral, trusted_root_pem, time))
}

fn usable(stage: &str, status: Status) -> Result<(), Status> {
    if status.is_usable_with_caveats() {
        debug!(%status, stage, "stage passed");
        Ok(())
    } else {
        warn!(%status, stage, "stage failed");
        Err(status)
    }
}

fn quote_with_collateral(
    engine: &Engine,
    quote_bytes: &[u8],
    collateral: &Collateral,
    trusted_root_pem: &str,
    time: SystemTime,
) -> Verdict {
    if quote_bytes.is_empty() {
        return Err(Status::MissingParameters);
    }
    let quote = decode_quote(quote_bytes)?;
    let certification_data = quote.certification_data();
    let chain_pem = certification_data.pck_cert_chain_pem()?;
    let chain = certification_data.pck_cert_chain()?;
    let pck = chain.pck_cert().ok_or(Status::SgxPckMissing)?;
    let pck_pem = pck.certificate().to_pem().map_err(|e| {
        warn!(status = %Status::UnsupportedPckCertFormat, "{e:#}");
        Status::UnsupportedPckCertFormat
    })?;

    usable(
        "PCK certificate chain",
        verify_pck_certificate(
            engine,
            chain_pem,
            [collateral.root_ca_crl.as_str(), collateral.pck_crl.as_str()],
            trusted_root_pem,
            time,
        ),
    )?;
    usable(
        "PCK crl",
        verify_pck_revocation_list(
            engine,
            &collateral.pck_crl,
            &collateral.pck_crl_issuer_chain,
            trusted_root_pem,
        ),
    )?;
    usable(
        "TCB info",
        verify_tcb_info(
            engine,
            &collateral.tcb_info,
            &collateral.tcb_info_issuer_chain,
            &collateral.root_ca_crl,
            trusted_root_pem,
            time,
        ),
    )?;

    let qe_identity = (!collateral.qe_identity.is_empty()).then_some(collateral.qe_identity.as_str());
    if let Some(identity) = qe_identity {
        usable(
            "QE identity",
            verify_enclave_identity(
                engine,
                identity,
                &collateral.qe_identity_issuer_chain,
                &collateral.root_ca_crl,
                trusted_root_pem,
                time,
            ),
        )?;
    }

    Ok(verify_quote(
        engine,
        quote_bytes,
        &pck_pem,
        &collateral.pck_crl,
        &collateral.tcb_info,
        qe_identity,
    ))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rstest::rstest;
    use zerocopy::AsBytes;

    use super::*;
    use crate::test_utils::{
        at, pck_chain, qe_report_matching, tcb_signing_chain, IdentityBuilder, PckChainFixture, PckProfile,
        QuoteBuilder, TcbInfoBuilder, VALID_AT,
    };

    /// Offset of `authDataSize` in an SGX quote.
    const SGX_AUTH_DATA_SIZE_OFFSET: usize = 48 + 384;

    struct Scenario {
        chain: PckChainFixture,
        quote: Vec<u8>,
        pck_crl: String,
        tcb_info: String,
        identity: String,
    }

    impl Scenario {
        fn sgx() -> Self {
            Self {
                chain: pck_chain(&PckProfile::default()),
                quote: QuoteBuilder::sgx_v3().build(),
                pck_crl: pck_chain(&PckProfile::default()).intermediate_crl_pem(&[]),
                tcb_info: TcbInfoBuilder::sgx_v2().build_signed(),
                identity: IdentityBuilder::qe_v2().build_signed(),
            }
        }

        fn verify(&self) -> Status {
            verify_quote(
                &Engine::init(),
                &self.quote,
                &self.chain.pck_pem,
                &self.pck_crl,
                &self.tcb_info,
                Some(&self.identity),
            )
        }

        fn collateral(&self) -> Collateral {
            let signing = tcb_signing_chain();
            Collateral {
                root_ca_crl: self.chain.root_crl_pem(&[]),
                pck_crl: self.pck_crl.clone(),
                pck_crl_issuer_chain: format!("{}{}", self.chain.intermediate_pem, self.chain.root_pem),
                tcb_info_issuer_chain: signing.chain_pem(),
                qe_identity_issuer_chain: signing.chain_pem(),
                tcb_info: self.tcb_info.clone(),
                qe_identity: self.identity.clone(),
            }
        }
    }

    #[test]
    fn up_to_date_sgx_quote_is_ok() {
        assert_eq!(Scenario::sgx().verify(), Status::Ok);
    }

    #[test]
    fn revoked_pck_is_reported() {
        let mut scenario = Scenario::sgx();
        let pck = Certificate::from_pem(&scenario.chain.pck_pem).unwrap();
        scenario.pck_crl = scenario.chain.intermediate_crl_pem(&[pck.serial_number()]);
        assert_eq!(scenario.verify(), Status::PckRevoked);
    }

    #[test]
    fn auth_data_size_off_by_one_is_a_format_failure() {
        let mut scenario = Scenario::sgx();
        let offset = SGX_AUTH_DATA_SIZE_OFFSET;
        let size = u32::from_le_bytes(scenario.quote[offset..offset + 4].try_into().unwrap());
        scenario.quote[offset..offset + 4].copy_from_slice(&(size + 1).to_le_bytes());

        assert!(Quote::decode(&scenario.quote).is_err());
        assert_eq!(scenario.verify(), Status::UnsupportedQuoteFormat);
    }

    #[test]
    fn tdx_quote_against_v2_tcb_info_is_a_mismatch() {
        let mut scenario = Scenario::sgx();
        scenario.quote = QuoteBuilder::tdx_v4().build();
        assert_eq!(scenario.verify(), Status::TcbInfoMismatch);
    }

    #[test]
    fn tdx_quote_is_ok_with_tdx_collateral() {
        let mut scenario = Scenario::sgx();
        scenario.quote = QuoteBuilder::tdx_v4().build();
        scenario.tcb_info = TcbInfoBuilder::tdx_v3().build_signed();
        let mut identity = IdentityBuilder::qe_v2();
        identity.id = "TD_QE".into();
        scenario.identity = identity.build_signed();
        assert_eq!(scenario.verify(), Status::Ok);
    }

    #[test]
    fn verification_is_deterministic() {
        let scenario = Scenario::sgx();
        let first = scenario.verify();
        assert!((0..3).all(|_| scenario.verify() == first));
    }

    #[rstest]
    #[case("", Status::MissingParameters)]
    #[case("not a crl", Status::UnsupportedPckRlFormat)]
    fn quote_inputs_are_parsed_at_the_boundary(#[case] pck_crl: &str, #[case] expected: Status) {
        let mut scenario = Scenario::sgx();
        scenario.pck_crl = pck_crl.into();
        assert_eq!(scenario.verify(), expected);
    }

    #[test]
    fn quote_collateral_parse_failures() {
        let engine = Engine::init();
        let scenario = Scenario::sgx();
        let verify = |pck: &str, tcb_info: &str, identity: Option<&str>| {
            verify_quote(&engine, &scenario.quote, pck, &scenario.pck_crl, tcb_info, identity)
        };

        assert_eq!(
            verify(&scenario.chain.pck_pem, "{}", Some(&scenario.identity)),
            Status::UnsupportedTcbInfoFormat
        );
        assert_eq!(
            verify(&scenario.chain.pck_pem, &scenario.tcb_info, Some("{}")),
            Status::UnsupportedQeIdentityFormat
        );
        assert_eq!(
            verify("garbage", &scenario.tcb_info, Some(&scenario.identity)),
            Status::UnsupportedPckCertFormat
        );
        assert_eq!(verify(&scenario.chain.pck_pem, &scenario.tcb_info, None), Status::Ok);
    }

    #[test]
    fn pck_certificate_entry_point() {
        let engine = Engine::init();
        let chain = pck_chain(&PckProfile::default());
        let root_crl = chain.root_crl_pem(&[]);
        let intermediate_crl = chain.intermediate_crl_pem(&[]);
        let crls = [root_crl.as_str(), intermediate_crl.as_str()];

        let verify = |chain_pem: &str, crls: [&str; 2], time: SystemTime| {
            verify_pck_certificate(&engine, chain_pem, crls, &chain.root_pem, time)
        };

        assert_eq!(verify(&chain.chain_pem(), crls, at(VALID_AT)), Status::Ok);
        assert_eq!(
            verify(&chain.chain_pem(), crls, SystemTime::UNIX_EPOCH - Duration::from_secs(1)),
            Status::InvalidParameter
        );
        assert_eq!(verify("", crls, at(VALID_AT)), Status::UnsupportedCertFormat);

        let two = format!("{}{}", chain.pck_pem, chain.intermediate_pem);
        assert_eq!(verify(&two, crls, at(VALID_AT)), Status::UnsupportedCertFormat);
        assert_eq!(
            verify(&chain.chain_pem(), [crls[0], "not a crl"], at(VALID_AT)),
            Status::SgxCrlUnsupportedFormat
        );
        assert_eq!(
            verify_pck_certificate(&engine, &chain.chain_pem(), crls, "not a cert", at(VALID_AT)),
            Status::TrustedRootCaUnsupportedFormat
        );
    }

    #[test]
    fn pck_revocation_list_entry_point() {
        let engine = Engine::init();
        let chain = pck_chain(&PckProfile::default());
        let issuers = format!("{}{}", chain.intermediate_pem, chain.root_pem);

        assert_eq!(
            verify_pck_revocation_list(&engine, &chain.intermediate_crl_pem(&[]), &issuers, &chain.root_pem),
            Status::Ok
        );
        assert_eq!(
            verify_pck_revocation_list(&engine, "nope", &issuers, &chain.root_pem),
            Status::SgxCrlUnsupportedFormat
        );
        assert_eq!(
            verify_pck_revocation_list(&engine, &chain.intermediate_crl_pem(&[]), "nope", &chain.root_pem),
            Status::SgxCaCertUnsupportedFormat
        );
        assert_eq!(
            verify_pck_revocation_list(&engine, &chain.intermediate_crl_pem(&[]), &issuers, "nope"),
            Status::TrustedRootCaUnsupportedFormat
        );
    }

    #[test]
    fn collateral_document_entry_points() {
        let engine = Engine::init();
        let signing = tcb_signing_chain();
        let crl = signing.root_crl_pem(&[]);
        let tcb_info = TcbInfoBuilder::sgx_v3().build_signed();
        let identity = IdentityBuilder::qe_v2().build_signed();

        assert_eq!(
            verify_tcb_info(&engine, &tcb_info, &signing.chain_pem(), &crl, &signing.root_pem, at(VALID_AT)),
            Status::Ok
        );
        assert_eq!(
            verify_enclave_identity(&engine, &identity, &signing.chain_pem(), &crl, &signing.root_pem, at(VALID_AT)),
            Status::Ok
        );

        assert_eq!(
            verify_tcb_info(&engine, "[]", &signing.chain_pem(), &crl, &signing.root_pem, at(VALID_AT)),
            Status::SgxTcbInfoUnsupportedFormat
        );
        assert_eq!(
            verify_tcb_info(&engine, &tcb_info, &signing.signing_pem, &crl, &signing.root_pem, at(VALID_AT)),
            Status::UnsupportedCertFormat
        );
        assert_eq!(
            verify_tcb_info(&engine, &tcb_info, &signing.chain_pem(), &crl, "not a cert", at(VALID_AT)),
            Status::UnsupportedCertFormat
        );
        assert_eq!(
            verify_enclave_identity(&engine, "[]", &signing.chain_pem(), &crl, &signing.root_pem, at(VALID_AT)),
            Status::SgxEnclaveIdentityUnsupportedFormat
        );
    }

    #[test]
    fn enclave_report_entry_point() {
        let engine = Engine::init();
        let identity = IdentityBuilder::qe_v2().build_signed();
        let report = qe_report_matching(8);

        assert_eq!(verify_enclave_report(&engine, report.as_bytes(), &identity), Status::Ok);
        assert_eq!(
            verify_enclave_report(&engine, &report.as_bytes()[..383], &identity),
            Status::SgxEnclaveReportUnsupportedFormat
        );
        assert_eq!(
            verify_enclave_report(&engine, report.as_bytes(), "nope"),
            Status::SgxEnclaveIdentityUnsupportedFormat
        );
        assert_eq!(
            verify_enclave_report(&engine, qe_report_matching(7).as_bytes(), &identity),
            Status::SgxEnclaveReportIsvsvnOutOfDate
        );
    }

    #[rstest]
    #[case(QuoteBuilder::sgx_v3())]
    #[case(QuoteBuilder::tdx_v4())]
    fn certification_data_accessors(#[case] builder: QuoteBuilder) {
        let engine = Engine::init();
        let quote = builder.build();

        let size = qe_certification_data_size(&engine, &quote).unwrap();
        assert_eq!(size as usize, builder.pck_chain_pem.len());

        let (cert_type, data) = qe_certification_data(&engine, &quote, size).unwrap();
        assert_eq!(cert_type, 5);
        assert_eq!(data, builder.pck_chain_pem.as_bytes());

        assert_eq!(
            qe_certification_data(&engine, &quote, size + 1),
            Err(Status::InvalidQeCertificationDataSize)
        );
        assert_eq!(
            qe_certification_data_size(&engine, &quote[..quote.len() - 1]),
            Err(Status::UnsupportedQuoteFormat)
        );
        assert_eq!(qe_certification_data_size(&engine, &[]), Err(Status::MissingParameters));
    }

    #[test]
    fn end_to_end_with_collateral() {
        let engine = Engine::init();
        let scenario = Scenario::sgx();
        let collateral = scenario.collateral();
        let root = &scenario.chain.root_pem;

        assert_eq!(
            verify_quote_with_collateral(&engine, &scenario.quote, &collateral, root, at(VALID_AT)),
            Status::Ok
        );
        assert_eq!(
            verify_quote_with_collateral(&engine, &scenario.quote, &collateral, root, at(2_100_000_000)),
            Status::SgxPckCertChainExpired
        );

        let without_identity = Collateral {
            qe_identity: String::new(),
            ..collateral.clone()
        };
        assert_eq!(
            verify_quote_with_collateral(&engine, &scenario.quote, &without_identity, root, at(VALID_AT)),
            Status::Ok
        );
    }

    #[test]
    fn end_to_end_stops_at_stale_tcb_info() {
        let engine = Engine::init();
        let mut scenario = Scenario::sgx();
        let mut builder = TcbInfoBuilder::sgx_v2();
        builder.next_update = "2024-12-31T00:00:00Z".into();
        scenario.tcb_info = builder.build_signed();

        assert_eq!(
            verify_quote_with_collateral(
                &engine,
                &scenario.quote,
                &scenario.collateral(),
                &scenario.chain.root_pem,
                at(VALID_AT)
            ),
            Status::SgxTcbInfoExpired
        );
    }

    #[test]
    fn stale_qe_degrades_the_end_to_end_verdict() {
        let engine = Engine::init();
        let mut scenario = Scenario::sgx();
        let mut builder = QuoteBuilder::sgx_v3();
        builder.qe_isv_svn = 7;
        scenario.quote = builder.build();

        let status = verify_quote_with_collateral(
            &engine,
            &scenario.quote,
            &scenario.collateral(),
            &scenario.chain.root_pem,
            at(VALID_AT),
        );
        assert_eq!(status, Status::TcbOutOfDate);
        assert!(status.is_usable_with_caveats());
    }
}
