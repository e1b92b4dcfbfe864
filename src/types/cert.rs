use std::{collections::BTreeSet, time::SystemTime};

use anyhow::anyhow;
use x509_cert::{
    certificate::CertificateInner,
    der::{asn1::ObjectIdentifier, pem::LineEnding, Decode, EncodePem},
    name::Name,
};

use crate::{
    error::ParseError,
    types::sgx_x509::{PckTcb, SgxPckExtension},
    utils::Expireable,
};

const COMMON_NAME_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");

/// Returns the first common name of `name`, if it has one encoded as text.
pub fn common_name(name: &Name) -> Option<&str> {
    name.0
        .iter()
        .flat_map(|rdn| rdn.0.iter())
        .find(|atv| atv.oid == COMMON_NAME_OID)
        .and_then(|atv| std::str::from_utf8(atv.value.value()).ok())
}

/// A parsed X.509 certificate with the accessors the verifiers need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    inner: CertificateInner,
}

impl Certificate {
    /// Decode a DER certificate.
    ///
    /// Duplicate extensions, or an SGX extension that does not decode, are reported as
    /// [`ParseError::InvalidExtension`]; anything else that is wrong is a format error.
    pub fn from_der(der: &[u8]) -> Result<Self, ParseError> {
        let inner = CertificateInner::from_der(der)
            .map_err(|e| ParseError::format(format!("malformed certificate: {e}")))?;

        let mut seen = BTreeSet::new();
        for ext in inner.tbs_certificate.extensions.iter().flatten() {
            if !seen.insert(ext.extn_id) {
                return Err(ParseError::invalid(format!("duplicate extension {}", ext.extn_id)));
            }
            if SgxPckExtension::is_pck_ext(&ext.extn_id) {
                SgxPckExtension::from_der(ext.extn_value.as_bytes())
                    .map_err(|e| ParseError::invalid(format!("{e:#}")))?;
            }
        }

        Ok(Self { inner })
    }

    /// Decode a single PEM `CERTIFICATE` block.
    pub fn from_pem(pem: &str) -> Result<Self, ParseError> {
        let pem = pem::parse(pem.trim())
            .map_err(|e| ParseError::format(format!("malformed pem certificate: {e}")))?;
        if pem.tag() != "CERTIFICATE" {
            return Err(ParseError::format(format!("unexpected pem label {}", pem.tag())));
        }
        Self::from_der(pem.contents())
    }

    pub fn to_pem(&self) -> anyhow::Result<String> {
        self.inner
            .to_pem(LineEnding::LF)
            .map_err(|e| anyhow!("failed to encode certificate: {e}"))
    }

    pub fn inner(&self) -> &CertificateInner {
        &self.inner
    }

    pub fn subject(&self) -> &Name {
        &self.inner.tbs_certificate.subject
    }

    pub fn issuer(&self) -> &Name {
        &self.inner.tbs_certificate.issuer
    }

    pub fn subject_cn(&self) -> Option<&str> {
        common_name(self.subject())
    }

    pub fn issuer_cn(&self) -> Option<&str> {
        common_name(self.issuer())
    }

    pub fn subject_cn_contains(&self, phrase: &str) -> bool {
        self.subject_cn().is_some_and(|cn| cn.contains(phrase))
    }

    pub fn serial_number(&self) -> &[u8] {
        self.inner.tbs_certificate.serial_number.as_bytes()
    }

    pub fn is_self_issued(&self) -> bool {
        self.subject() == self.issuer()
    }

    /// `issuer` is the subject of `other` (no signature check).
    pub fn is_issued_by(&self, other: &Certificate) -> bool {
        self.issuer() == other.subject()
    }

    /// SEC1-encoded subject public key.
    pub fn public_key_bytes(&self) -> &[u8] {
        self.inner
            .tbs_certificate
            .subject_public_key_info
            .subject_public_key
            .raw_bytes()
    }

    /// Subject public key as a P-256 ECDSA key.
    pub fn public_key(&self) -> anyhow::Result<p256::ecdsa::VerifyingKey> {
        p256::ecdsa::VerifyingKey::from_sec1_bytes(self.public_key_bytes())
            .map_err(|e| anyhow!("certificate key is not a p256 key: {e}"))
    }

    /// Raw bytes of the certificate signature bit string.
    pub fn signature(&self) -> &[u8] {
        self.inner.signature.raw_bytes()
    }

    /// Verify this certificate's signature with the public key of `issuer`.
    pub fn verify_signed_by(&self, issuer: &Certificate) -> anyhow::Result<()> {
        let pk: x509_verify::VerifyingKey = (&issuer.inner)
            .try_into()
            .map_err(|e| anyhow!("failed to decode key from certificate: {}", e))?;
        pk.verify_strict(&self.inner)
            .map_err(|e| anyhow!("failed to verify issuer signature: {}", e))
    }
}

impl Expireable for Certificate {
    fn valid_at(&self, timestamp: SystemTime) -> bool {
        self.inner.valid_at(timestamp)
    }
}

/// A certificate known to carry a well-formed SGX PCK extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PckCertificate {
    cert: Certificate,
    extension: SgxPckExtension,
}

impl PckCertificate {
    pub fn from_certificate(cert: Certificate) -> Result<Self, ParseError> {
        let ext = cert
            .inner
            .tbs_certificate
            .extensions
            .iter()
            .flatten()
            .find(|ext| SgxPckExtension::is_pck_ext(&ext.extn_id))
            .ok_or_else(|| ParseError::invalid("pck certificate is missing the sgx extension"))?;
        let extension = SgxPckExtension::from_der(ext.extn_value.as_bytes())
            .map_err(|e| ParseError::invalid(format!("{e:#}")))?;
        Ok(Self { cert, extension })
    }

    pub fn from_pem(pem: &str) -> Result<Self, ParseError> {
        Self::from_certificate(Certificate::from_pem(pem)?)
    }

    pub fn certificate(&self) -> &Certificate {
        &self.cert
    }

    pub fn extension(&self) -> &SgxPckExtension {
        &self.extension
    }

    pub fn fmspc(&self) -> [u8; 6] {
        self.extension.fmspc
    }

    pub fn pce_id(&self) -> [u8; 2] {
        self.extension.pceid
    }

    pub fn tcb(&self) -> &PckTcb {
        &self.extension.tcb
    }
}
