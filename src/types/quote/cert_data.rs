use crate::{
    constants::ECDSA_SIGNATURE_LEN,
    error::FormatError,
    status::Status,
    types::{chain::CertificateChain, report::EnclaveReportBody},
    utils::cursor::WireCursor,
};

/// Type tag of a certification data block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CertificationKeyType {
    PpidClearText = 1,
    PpidRsa2048Encrypted = 2,
    PpidRsa3072Encrypted = 3,
    PckCleartext = 4,
    PckCertChain = 5,
    QeReportCertificationData = 6,
}

impl TryFrom<u16> for CertificationKeyType {
    type Error = u16;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Ok(match value {
            1 => Self::PpidClearText,
            2 => Self::PpidRsa2048Encrypted,
            3 => Self::PpidRsa3072Encrypted,
            4 => Self::PckCleartext,
            5 => Self::PckCertChain,
            6 => Self::QeReportCertificationData,
            other => return Err(other),
        })
    }
}

impl CertificationKeyType {
    /// Types that may identify the PCK certificate directly.
    pub fn is_pck_identifier(&self) -> bool {
        !matches!(self, Self::QeReportCertificationData)
    }
}

/// Certification data: `{type: u16, size: u32, data}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificationData<'a> {
    pub cert_type: u16,
    pub declared_size: u32,
    pub data: &'a [u8],
}

impl<'a> CertificationData<'a> {
    /// Reads a certification data block that must span the whole cursor.
    pub fn read(cursor: &mut WireCursor<'a>) -> Result<Self, FormatError> {
        let cert_type = cursor.read_u16_le("certification data type")?;
        let declared_size = cursor.read_u32_le("certification data size")?;
        if declared_size as usize != cursor.remaining() {
            return Err(FormatError::LengthMismatch {
                field: "certification data",
                declared: declared_size as usize,
                actual: cursor.remaining(),
            });
        }
        let data = cursor.read_fixed(declared_size as usize, "certification data")?;
        Ok(Self {
            cert_type,
            declared_size,
            data,
        })
    }

    /// Carves `type || size || data` out of `cursor`, using the size field to find its end.
    pub fn read_prefixed(cursor: &mut WireCursor<'a>) -> Result<Self, FormatError> {
        let mut peek = cursor.clone();
        peek.read_u16_le("certification data type")?;
        let size = peek.read_u32_le("certification data size")? as usize;
        let mut block = cursor.sub_cursor(size + 6, "certification data")?;
        Self::read(&mut block)
    }

    pub fn key_type(&self) -> Option<CertificationKeyType> {
        CertificationKeyType::try_from(self.cert_type).ok()
    }

    pub fn is_consistent(&self) -> bool {
        self.declared_size as usize == self.data.len()
    }

    /// Text of the PEM chain carried by a type 5 block, without the trailing NUL.
    pub fn pck_cert_chain_pem(&self) -> Result<&'a str, Status> {
        if self.key_type() != Some(CertificationKeyType::PckCertChain) {
            return Err(Status::UnsupportedQeCertificationDataType);
        }
        let pem = self.data.strip_suffix(&[0]).unwrap_or(self.data);
        std::str::from_utf8(pem).map_err(|_| Status::UnsupportedCertFormat)
    }

    /// The PEM chain carried by a type 5 block.
    pub fn pck_cert_chain(&self) -> Result<CertificateChain, Status> {
        CertificateChain::parse(self.pck_cert_chain_pem()?)
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.cert_type.to_le_bytes());
        out.extend_from_slice(&self.declared_size.to_le_bytes());
        out.extend_from_slice(self.data);
    }
}

/// QE authentication data: `{size: u16, data}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QeAuthData<'a> {
    pub declared_size: u16,
    pub data: &'a [u8],
}

impl<'a> QeAuthData<'a> {
    /// Carves `size || data` out of `cursor`; the nested block must be consumed exactly.
    pub fn read_prefixed(cursor: &mut WireCursor<'a>) -> Result<Self, FormatError> {
        let mut peek = cursor.clone();
        let size = peek.read_u16_le("qe auth data size")? as usize;
        let mut block = cursor.sub_cursor(size + 2, "qe auth data")?;
        let declared_size = block.read_u16_le("qe auth data size")?;
        let data = block.read_fixed(declared_size as usize, "qe auth data")?;
        block.finish("qe auth data")?;
        Ok(Self {
            declared_size,
            data,
        })
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.declared_size.to_le_bytes());
        out.extend_from_slice(self.data);
    }
}

/// The QE report block embedded as type 6 certification data in v4 quotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QeReportCertificationData<'a> {
    pub qe_report: EnclaveReportBody,
    pub qe_report_signature: [u8; ECDSA_SIGNATURE_LEN],
    pub qe_auth_data: QeAuthData<'a>,
    pub certification_data: CertificationData<'a>,
}

impl<'a> QeReportCertificationData<'a> {
    /// Parses the whole of `bytes`; trailing bytes are an error.
    pub fn read(bytes: &'a [u8]) -> Result<Self, FormatError> {
        let mut cursor = WireCursor::new(bytes);
        let qe_report = cursor.read_struct::<EnclaveReportBody>("qe report")?;
        let qe_report_signature = cursor.read_array::<ECDSA_SIGNATURE_LEN>("qe report signature")?;
        let qe_auth_data = QeAuthData::read_prefixed(&mut cursor)?;
        let certification_data = CertificationData::read_prefixed(&mut cursor)?;
        cursor.finish("qe report certification data")?;
        Ok(Self {
            qe_report,
            qe_report_signature,
            qe_auth_data,
            certification_data,
        })
    }
}
