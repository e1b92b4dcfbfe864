use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! statuses {
    ($($(#[$doc:meta])* $variant:ident = $code:literal => $name:literal,)+) => {
        /// Verdict of a verification entry point.
        ///
        /// The numeric codes are stable and follow the order of the reference C ABI, so a
        /// value can be handed across an FFI boundary with `status as u32`.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[repr(u32)]
        pub enum Status {
            $($(#[$doc])* $variant = $code,)+
        }

        impl Status {
            /// Canonical `STATUS_*` name.
            pub fn name(&self) -> &'static str {
                match self {
                    $(Status::$variant => $name,)+
                }
            }

            pub fn from_code(code: u32) -> Option<Self> {
                match code {
                    $($code => Some(Status::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

statuses! {
    Ok = 0 => "STATUS_OK",
    UnsupportedCertFormat = 1 => "STATUS_UNSUPPORTED_CERT_FORMAT",
    SgxRootCaMissing = 2 => "STATUS_SGX_ROOT_CA_MISSING",
    SgxRootCaInvalid = 3 => "STATUS_SGX_ROOT_CA_INVALID",
    SgxRootCaInvalidExtensions = 4 => "STATUS_SGX_ROOT_CA_INVALID_EXTENSIONS",
    SgxRootCaInvalidIssuer = 5 => "STATUS_SGX_ROOT_CA_INVALID_ISSUER",
    SgxRootCaUntrusted = 6 => "STATUS_SGX_ROOT_CA_UNTRUSTED",
    SgxIntermediateCaMissing = 7 => "STATUS_SGX_INTERMEDIATE_CA_MISSING",
    SgxIntermediateCaInvalid = 8 => "STATUS_SGX_INTERMEDIATE_CA_INVALID",
    SgxIntermediateCaInvalidExtensions = 9 => "STATUS_SGX_INTERMEDIATE_CA_INVALID_EXTENSIONS",
    SgxIntermediateCaInvalidIssuer = 10 => "STATUS_SGX_INTERMEDIATE_CA_INVALID_ISSUER",
    SgxIntermediateCaRevoked = 11 => "STATUS_SGX_INTERMEDIATE_CA_REVOKED",
    SgxPckMissing = 12 => "STATUS_SGX_PCK_MISSING",
    SgxPckInvalid = 13 => "STATUS_SGX_PCK_INVALID",
    SgxPckInvalidExtensions = 14 => "STATUS_SGX_PCK_INVALID_EXTENSIONS",
    SgxPckInvalidIssuer = 15 => "STATUS_SGX_PCK_INVALID_ISSUER",
    SgxPckRevoked = 16 => "STATUS_SGX_PCK_REVOKED",
    TrustedRootCaInvalid = 17 => "STATUS_TRUSTED_ROOT_CA_INVALID",
    SgxPckCertChainUntrusted = 18 => "STATUS_SGX_PCK_CERT_CHAIN_UNTRUSTED",
    SgxTcbInfoUnsupportedFormat = 19 => "STATUS_SGX_TCB_INFO_UNSUPPORTED_FORMAT",
    SgxTcbInfoInvalid = 20 => "STATUS_SGX_TCB_INFO_INVALID",
    TcbInfoInvalidSignature = 21 => "STATUS_TCB_INFO_INVALID_SIGNATURE",
    SgxTcbSigningCertMissing = 22 => "STATUS_SGX_TCB_SIGNING_CERT_MISSING",
    SgxTcbSigningCertInvalid = 23 => "STATUS_SGX_TCB_SIGNING_CERT_INVALID",
    SgxTcbSigningCertInvalidExtensions = 24 => "STATUS_SGX_TCB_SIGNING_CERT_INVALID_EXTENSIONS",
    SgxTcbSigningCertInvalidIssuer = 25 => "STATUS_SGX_TCB_SIGNING_CERT_INVALID_ISSUER",
    SgxTcbSigningCertChainUntrusted = 26 => "STATUS_SGX_TCB_SIGNING_CERT_CHAIN_UNTRUSTED",
    SgxTcbSigningCertRevoked = 27 => "STATUS_SGX_TCB_SIGNING_CERT_REVOKED",
    SgxCrlUnsupportedFormat = 28 => "STATUS_SGX_CRL_UNSUPPORTED_FORMAT",
    SgxCrlUnknownIssuer = 29 => "STATUS_SGX_CRL_UNKNOWN_ISSUER",
    SgxCrlInvalid = 30 => "STATUS_SGX_CRL_INVALID",
    SgxCrlInvalidExtensions = 31 => "STATUS_SGX_CRL_INVALID_EXTENSIONS",
    SgxCrlInvalidSignature = 32 => "STATUS_SGX_CRL_INVALID_SIGNATURE",
    SgxCaCertUnsupportedFormat = 33 => "STATUS_SGX_CA_CERT_UNSUPPORTED_FORMAT",
    SgxCaCertInvalid = 34 => "STATUS_SGX_CA_CERT_INVALID",
    TrustedRootCaUnsupportedFormat = 35 => "STATUS_TRUSTED_ROOT_CA_UNSUPPORTED_FORMAT",
    MissingParameters = 36 => "STATUS_MISSING_PARAMETERS",
    UnsupportedQuoteFormat = 37 => "STATUS_UNSUPPORTED_QUOTE_FORMAT",
    UnsupportedPckCertFormat = 38 => "STATUS_UNSUPPORTED_PCK_CERT_FORMAT",
    InvalidPckCert = 39 => "STATUS_INVALID_PCK_CERT",
    UnsupportedPckRlFormat = 40 => "STATUS_UNSUPPORTED_PCK_RL_FORMAT",
    InvalidPckCrl = 41 => "STATUS_INVALID_PCK_CRL",
    UnsupportedTcbInfoFormat = 42 => "STATUS_UNSUPPORTED_TCB_INFO_FORMAT",
    PckRevoked = 43 => "STATUS_PCK_REVOKED",
    TcbInfoMismatch = 44 => "STATUS_TCB_INFO_MISMATCH",
    TcbOutOfDate = 45 => "STATUS_TCB_OUT_OF_DATE",
    TcbRevoked = 46 => "STATUS_TCB_REVOKED",
    TcbConfigurationNeeded = 47 => "STATUS_TCB_CONFIGURATION_NEEDED",
    TcbOutOfDateConfigurationNeeded = 48 => "STATUS_TCB_OUT_OF_DATE_CONFIGURATION_NEEDED",
    TcbNotSupported = 49 => "STATUS_TCB_NOT_SUPPORTED",
    TcbUnrecognizedStatus = 50 => "STATUS_TCB_UNRECOGNIZED_STATUS",
    UnsupportedQeCertification = 51 => "STATUS_UNSUPPORTED_QE_CERTIFICATION",
    InvalidQeCertificationDataSize = 52 => "STATUS_INVALID_QE_CERTIFICATION_DATA_SIZE",
    UnsupportedQeCertificationDataType = 53 => "STATUS_UNSUPPORTED_QE_CERTIFICATION_DATA_TYPE",
    PckCertMismatch = 54 => "STATUS_PCK_CERT_MISMATCH",
    InvalidQeReportSignature = 55 => "STATUS_INVALID_QE_REPORT_SIGNATURE",
    InvalidQeReportData = 56 => "STATUS_INVALID_QE_REPORT_DATA",
    InvalidQuoteSignature = 57 => "STATUS_INVALID_QUOTE_SIGNATURE",
    SgxQeIdentityUnsupportedFormat = 58 => "STATUS_SGX_QE_IDENTITY_UNSUPPORTED_FORMAT",
    SgxQeIdentityInvalid = 59 => "STATUS_SGX_QE_IDENTITY_INVALID",
    SgxQeIdentityInvalidSignature = 60 => "STATUS_SGX_QE_IDENTITY_INVALID_SIGNATURE",
    SgxEnclaveReportUnsupportedFormat = 61 => "STATUS_SGX_ENCLAVE_REPORT_UNSUPPORTED_FORMAT",
    SgxEnclaveIdentityUnsupportedFormat = 62 => "STATUS_SGX_ENCLAVE_IDENTITY_UNSUPPORTED_FORMAT",
    SgxEnclaveIdentityInvalid = 63 => "STATUS_SGX_ENCLAVE_IDENTITY_INVALID",
    SgxEnclaveIdentityUnsupportedVersion = 64 => "STATUS_SGX_ENCLAVE_IDENTITY_UNSUPPORTED_VERSION",
    SgxEnclaveIdentityOutOfDate = 65 => "STATUS_SGX_ENCLAVE_IDENTITY_OUT_OF_DATE",
    SgxEnclaveReportMiscselectMismatch = 66 => "STATUS_SGX_ENCLAVE_REPORT_MISCSELECT_MISMATCH",
    SgxEnclaveReportAttributesMismatch = 67 => "STATUS_SGX_ENCLAVE_REPORT_ATTRIBUTES_MISMATCH",
    SgxEnclaveReportMrenclaveMismatch = 68 => "STATUS_SGX_ENCLAVE_REPORT_MRENCLAVE_MISMATCH",
    SgxEnclaveReportMrsignerMismatch = 69 => "STATUS_SGX_ENCLAVE_REPORT_MRSIGNER_MISMATCH",
    SgxEnclaveReportIsvprodidMismatch = 70 => "STATUS_SGX_ENCLAVE_REPORT_ISVPRODID_MISMATCH",
    SgxEnclaveReportIsvsvnOutOfDate = 71 => "STATUS_SGX_ENCLAVE_REPORT_ISVSVN_OUT_OF_DATE",
    UnsupportedQeIdentityFormat = 72 => "STATUS_UNSUPPORTED_QE_IDENTITY_FORMAT",
    QeIdentityOutOfDate = 73 => "STATUS_QE_IDENTITY_OUT_OF_DATE",
    QeIdentityMismatch = 74 => "STATUS_QE_IDENTITY_MISMATCH",
    SgxTcbInfoExpired = 75 => "STATUS_SGX_TCB_INFO_EXPIRED",
    SgxEnclaveIdentityInvalidSignature = 76 => "STATUS_SGX_ENCLAVE_IDENTITY_INVALID_SIGNATURE",
    InvalidParameter = 77 => "STATUS_INVALID_PARAMETER",
    SgxPckCertChainExpired = 78 => "STATUS_SGX_PCK_CERT_CHAIN_EXPIRED",
    SgxCrlExpired = 79 => "STATUS_SGX_CRL_EXPIRED",
    SgxSigningCertChainExpired = 80 => "STATUS_SGX_SIGNING_CERT_CHAIN_EXPIRED",
    SgxEnclaveIdentityExpired = 81 => "STATUS_SGX_ENCLAVE_IDENTITY_EXPIRED",
    TcbSwHardeningNeeded = 82 => "STATUS_TCB_SW_HARDENING_NEEDED",
    TcbConfigurationAndSwHardeningNeeded = 83 => "STATUS_TCB_CONFIGURATION_AND_SW_HARDENING_NEEDED",
    SgxEnclaveReportIsvsvnRevoked = 84 => "STATUS_SGX_ENCLAVE_REPORT_ISVSVN_REVOKED",
    TdxModuleMismatch = 85 => "STATUS_TDX_MODULE_MISMATCH",
}

impl Status {
    pub fn is_ok(&self) -> bool {
        *self == Status::Ok
    }

    /// `OK` and the TCB staleness verdicts. Everything else should be rejected by a relying
    /// party.
    pub fn is_usable_with_caveats(&self) -> bool {
        matches!(
            self,
            Status::Ok
                | Status::TcbOutOfDate
                | Status::TcbConfigurationNeeded
                | Status::TcbOutOfDateConfigurationNeeded
                | Status::TcbSwHardeningNeeded
                | Status::TcbConfigurationAndSwHardeningNeeded
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<Status> for u32 {
    fn from(status: Status) -> u32 {
        status as u32
    }
}
