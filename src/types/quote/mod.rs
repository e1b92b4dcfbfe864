mod auth_data;
mod body;
mod cert_data;
mod header;

pub use auth_data::*;
pub use body::*;
pub use cert_data::*;
pub use header::*;

use tracing::debug;
use zerocopy::AsBytes;

use crate::{
    constants::{
        ECDSA_PUBKEY_LEN, ECDSA_SIGNATURE_LEN, INTEL_QE_VENDOR_ID, QUOTE_V3, SGX_TEE_TYPE,
        SUPPORTED_ATTESTATION_KEY_TYPES, SUPPORTED_QUOTE_VERSIONS, SUPPORTED_TEE_TYPES, TDX_TEE_TYPE,
    },
    error::{FormatError, PolicyError},
    types::report::{EnclaveReportBody, TdxReportBody},
    utils::cursor::WireCursor,
};

/// A DCAP quote, decoded from and borrowing the raw quote buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote<'a> {
    /// Header of the quote data structure.
    pub header: QuoteHeader,

    /// Enclave report (SGX) or TD report (TDX).
    pub body: QuoteBody,

    /// Declared size of `auth_data`, equal to its encoded length.
    pub auth_data_size: u32,

    /// Signature and certification data.
    pub auth_data: AuthData<'a>,

    signed_data: &'a [u8],
}

impl<'a> Quote<'a> {
    /// Decodes `bytes` into a quote. Every byte must belong to the quote.
    pub fn decode(bytes: &'a [u8]) -> Result<Self, FormatError> {
        let mut cursor = WireCursor::new(bytes);
        let header = cursor.read_struct::<QuoteHeader>("quote header")?;

        let version = header.version.get();
        if !SUPPORTED_QUOTE_VERSIONS.contains(&version) {
            return Err(FormatError::UnsupportedVersion(version));
        }

        let body = match header.tee_type.get() {
            SGX_TEE_TYPE => QuoteBody::Sgx(cursor.read_struct::<EnclaveReportBody>("enclave report")?),
            TDX_TEE_TYPE => QuoteBody::Tdx(cursor.read_struct::<TdxReportBody>("td report")?),
            other => return Err(FormatError::UnsupportedTeeType(other)),
        };
        let signed_data = cursor.consumed();

        let auth_data_size = cursor.read_u32_le("auth data size")?;
        if auth_data_size as usize != cursor.remaining() {
            return Err(FormatError::LengthMismatch {
                field: "auth data",
                declared: auth_data_size as usize,
                actual: cursor.remaining(),
            });
        }

        let mut auth = cursor.sub_cursor(auth_data_size as usize, "auth data")?;
        let auth_data = if version == QUOTE_V3 {
            AuthData::V3(AuthDataV3::read(&mut auth)?)
        } else {
            AuthData::V4(AuthDataV4::read(&mut auth)?)
        };
        auth.finish("auth data")?;
        cursor.finish("quote")?;

        debug!(version, tee_type = header.tee_type.get(), "decoded quote");
        Ok(Self {
            header,
            body,
            auth_data_size,
            auth_data,
            signed_data,
        })
    }

    /// Checks the allow-lists and the version/tee type/certification type combinations.
    pub fn validate(&self) -> Result<(), PolicyError> {
        let version = self.header.version.get();
        if !SUPPORTED_QUOTE_VERSIONS.contains(&version) {
            return Err(PolicyError::Version(version));
        }

        let key_type = self.header.attestation_key_type.get();
        if !SUPPORTED_ATTESTATION_KEY_TYPES.contains(&key_type) {
            return Err(PolicyError::AttestationKeyType(key_type));
        }

        let tee_type = self.header.tee_type.get();
        if !SUPPORTED_TEE_TYPES.contains(&tee_type) {
            return Err(PolicyError::TeeType(tee_type));
        }

        if self.header.qe_vendor_id != INTEL_QE_VENDOR_ID {
            return Err(PolicyError::QeVendorId(hex::encode(self.header.qe_vendor_id)));
        }

        match &self.auth_data {
            AuthData::V3(v3) => {
                if tee_type != SGX_TEE_TYPE {
                    return Err(PolicyError::VersionTeeType { version, tee_type });
                }
                check_pck_identifier(v3.certification_data.cert_type)
            }
            AuthData::V4(v4) => match &v4.qe_report_data {
                Some(qe) => check_pck_identifier(qe.certification_data.cert_type),
                None => Err(PolicyError::CertificationDataType(v4.certification_data.cert_type)),
            },
        }
    }

    /// Re-encodes the quote; for a decoded quote this reproduces the input exactly.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.signed_data.len() + 4 + self.auth_data_size as usize);
        out.extend_from_slice(self.header.as_bytes());
        out.extend_from_slice(self.body.as_bytes());
        out.extend_from_slice(&self.auth_data_size.to_le_bytes());
        self.auth_data.write_to(&mut out);
        out
    }

    /// Header || body, the bytes covered by the quote signature.
    pub fn signed_data(&self) -> &'a [u8] {
        self.signed_data
    }

    pub fn version(&self) -> u16 {
        self.header.version.get()
    }

    pub fn tee_type(&self) -> u32 {
        self.header.tee_type.get()
    }

    pub fn isv_signature(&self) -> &[u8; ECDSA_SIGNATURE_LEN] {
        self.auth_data.signature()
    }

    pub fn attestation_key(&self) -> &[u8; ECDSA_PUBKEY_LEN] {
        self.auth_data.attestation_key()
    }

    pub fn qe_report(&self) -> Option<&EnclaveReportBody> {
        self.auth_data.qe_report()
    }

    pub fn qe_report_signature(&self) -> Option<&[u8; ECDSA_SIGNATURE_LEN]> {
        self.auth_data.qe_report_signature()
    }

    pub fn qe_auth_data(&self) -> Option<&QeAuthData<'a>> {
        self.auth_data.qe_auth_data()
    }

    pub fn certification_data(&self) -> &CertificationData<'a> {
        self.auth_data.certification_data()
    }
}

fn check_pck_identifier(cert_type: u16) -> Result<(), PolicyError> {
    match CertificationKeyType::try_from(cert_type) {
        Ok(key_type) if key_type.is_pck_identifier() => Ok(()),
        _ => Err(PolicyError::CertificationDataType(cert_type)),
    }
}
