use zerocopy::AsBytes;

use crate::{
    constants::{ECDSA_PUBKEY_LEN, ECDSA_SIGNATURE_LEN},
    error::FormatError,
    types::report::EnclaveReportBody,
    utils::cursor::WireCursor,
};

use super::{CertificationData, CertificationKeyType, QeAuthData, QeReportCertificationData};

/// Version-specific authentication data following the quote body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthData<'a> {
    V3(AuthDataV3<'a>),
    V4(AuthDataV4<'a>),
}

/// ECDSA 256-bit quote v3 authentication data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthDataV3<'a> {
    /// Signature of header || body by the attestation key.
    pub signature: [u8; ECDSA_SIGNATURE_LEN],
    /// Raw X || Y of the attestation key.
    pub attestation_key: [u8; ECDSA_PUBKEY_LEN],
    pub qe_report: EnclaveReportBody,
    /// Signature of the QE report by the PCK key.
    pub qe_report_signature: [u8; ECDSA_SIGNATURE_LEN],
    pub qe_auth_data: QeAuthData<'a>,
    pub certification_data: CertificationData<'a>,
}

/// ECDSA 256-bit quote v4 authentication data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthDataV4<'a> {
    pub signature: [u8; ECDSA_SIGNATURE_LEN],
    pub attestation_key: [u8; ECDSA_PUBKEY_LEN],
    pub certification_data: CertificationData<'a>,
    /// Decoded payload of `certification_data` when it is of type 6.
    pub qe_report_data: Option<QeReportCertificationData<'a>>,
}

impl<'a> AuthDataV3<'a> {
    pub fn read(cursor: &mut WireCursor<'a>) -> Result<Self, FormatError> {
        let signature = cursor.read_array::<ECDSA_SIGNATURE_LEN>("quote signature")?;
        let attestation_key = cursor.read_array::<ECDSA_PUBKEY_LEN>("attestation key")?;
        let qe_report = cursor.read_struct::<EnclaveReportBody>("qe report")?;
        let qe_report_signature = cursor.read_array::<ECDSA_SIGNATURE_LEN>("qe report signature")?;
        let qe_auth_data = QeAuthData::read_prefixed(cursor)?;
        let certification_data = CertificationData::read_prefixed(cursor)?;
        Ok(Self {
            signature,
            attestation_key,
            qe_report,
            qe_report_signature,
            qe_auth_data,
            certification_data,
        })
    }
}

impl<'a> AuthDataV4<'a> {
    pub fn read(cursor: &mut WireCursor<'a>) -> Result<Self, FormatError> {
        let signature = cursor.read_array::<ECDSA_SIGNATURE_LEN>("quote signature")?;
        let attestation_key = cursor.read_array::<ECDSA_PUBKEY_LEN>("attestation key")?;
        let certification_data = CertificationData::read_prefixed(cursor)?;
        let qe_report_data = match certification_data.key_type() {
            Some(CertificationKeyType::QeReportCertificationData) => {
                Some(QeReportCertificationData::read(certification_data.data)?)
            }
            _ => None,
        };
        Ok(Self {
            signature,
            attestation_key,
            certification_data,
            qe_report_data,
        })
    }
}

impl<'a> AuthData<'a> {
    pub fn signature(&self) -> &[u8; ECDSA_SIGNATURE_LEN] {
        match self {
            Self::V3(v3) => &v3.signature,
            Self::V4(v4) => &v4.signature,
        }
    }

    pub fn attestation_key(&self) -> &[u8; ECDSA_PUBKEY_LEN] {
        match self {
            Self::V3(v3) => &v3.attestation_key,
            Self::V4(v4) => &v4.attestation_key,
        }
    }

    pub fn qe_report(&self) -> Option<&EnclaveReportBody> {
        match self {
            Self::V3(v3) => Some(&v3.qe_report),
            Self::V4(v4) => v4.qe_report_data.as_ref().map(|qe| &qe.qe_report),
        }
    }

    pub fn qe_report_signature(&self) -> Option<&[u8; ECDSA_SIGNATURE_LEN]> {
        match self {
            Self::V3(v3) => Some(&v3.qe_report_signature),
            Self::V4(v4) => v4.qe_report_data.as_ref().map(|qe| &qe.qe_report_signature),
        }
    }

    pub fn qe_auth_data(&self) -> Option<&QeAuthData<'a>> {
        match self {
            Self::V3(v3) => Some(&v3.qe_auth_data),
            Self::V4(v4) => v4.qe_report_data.as_ref().map(|qe| &qe.qe_auth_data),
        }
    }

    /// Certification data identifying the PCK: the v3 block, or the block nested in the
    /// v4 QE report data.
    pub fn certification_data(&self) -> &CertificationData<'a> {
        match self {
            Self::V3(v3) => &v3.certification_data,
            Self::V4(v4) => match &v4.qe_report_data {
                Some(qe) => &qe.certification_data,
                None => &v4.certification_data,
            },
        }
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            Self::V3(v3) => {
                out.extend_from_slice(&v3.signature);
                out.extend_from_slice(&v3.attestation_key);
                out.extend_from_slice(v3.qe_report.as_bytes());
                out.extend_from_slice(&v3.qe_report_signature);
                v3.qe_auth_data.write_to(out);
                v3.certification_data.write_to(out);
            }
            Self::V4(v4) => {
                out.extend_from_slice(&v4.signature);
                out.extend_from_slice(&v4.attestation_key);
                v4.certification_data.write_to(out);
            }
        }
    }
}
