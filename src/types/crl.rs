use std::{collections::BTreeSet, time::SystemTime};

use anyhow::anyhow;
use x509_cert::{crl::CertificateList, der::Decode, name::Name};

use crate::{constants::PEM_CRL_LABEL, error::ParseError, types::cert::Certificate, utils::Expireable};

/// A parsed certificate revocation list together with its revoked serial numbers.
#[derive(Debug, Clone)]
pub struct CrlStore {
    inner: CertificateList,
    revoked: BTreeSet<Vec<u8>>,
}

impl CrlStore {
    pub fn from_der(der: &[u8]) -> Result<Self, ParseError> {
        let inner = CertificateList::from_der(der)
            .map_err(|e| ParseError::format(format!("malformed crl: {e}")))?;

        let mut seen = BTreeSet::new();
        for ext in inner.tbs_cert_list.crl_extensions.iter().flatten() {
            if !seen.insert(ext.extn_id) {
                return Err(ParseError::invalid(format!("duplicate crl extension {}", ext.extn_id)));
            }
        }

        let revoked = inner
            .tbs_cert_list
            .revoked_certificates
            .iter()
            .flatten()
            .map(|entry| entry.serial_number.as_bytes().to_vec())
            .collect();

        Ok(Self { inner, revoked })
    }

    pub fn from_pem(pem: &str) -> Result<Self, ParseError> {
        let pem = pem::parse(pem.trim())
            .map_err(|e| ParseError::format(format!("malformed pem crl: {e}")))?;
        if pem.tag() != PEM_CRL_LABEL {
            return Err(ParseError::format(format!("unexpected pem label {}", pem.tag())));
        }
        Self::from_der(pem.contents())
    }

    /// Accepts either a PEM `X509 CRL` block or hex-encoded DER, the two encodings PCS hands out.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let input = input.trim();
        if input.starts_with("-----BEGIN") {
            return Self::from_pem(input);
        }
        let der = hex::decode(input).map_err(|e| ParseError::format(format!("crl is neither pem nor hex: {e}")))?;
        Self::from_der(&der)
    }

    pub fn issuer(&self) -> &Name {
        &self.inner.tbs_cert_list.issuer
    }

    pub fn this_update(&self) -> SystemTime {
        self.inner.tbs_cert_list.this_update.to_system_time()
    }

    pub fn next_update(&self) -> Option<SystemTime> {
        self.inner.tbs_cert_list.next_update.map(|t| t.to_system_time())
    }

    pub fn is_revoked(&self, cert: &Certificate) -> bool {
        self.revoked.contains(cert.serial_number())
    }

    /// The CRL names `cert` as its issuer (no signature check).
    pub fn is_issued_by(&self, cert: &Certificate) -> bool {
        self.issuer() == cert.subject()
    }

    pub fn verify_signed_by(&self, issuer: &Certificate) -> anyhow::Result<()> {
        let pk: x509_verify::VerifyingKey = issuer
            .inner()
            .try_into()
            .map_err(|e| anyhow!("failed to decode key from certificate: {}", e))?;
        pk.verify_strict(&self.inner)
            .map_err(|e| anyhow!("failed to verify crl signature: {}", e))
    }
}

impl Expireable for CrlStore {
    fn valid_at(&self, timestamp: SystemTime) -> bool {
        self.inner.valid_at(timestamp)
    }
}
