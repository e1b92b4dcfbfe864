use tracing::{debug, warn};

use crate::{
    constants::{
        PEM_CERTIFICATE_BEGIN, PEM_CERTIFICATE_END, SGX_PCK_CN_PHRASE, SGX_PCK_PLATFORM_CA_CN_PHRASE,
        SGX_PCK_PROCESSOR_CA_CN_PHRASE,
    },
    error::ParseError,
    status::Status,
    types::cert::{Certificate, PckCertificate},
};

/// Certificates of a PEM bundle, with their roles resolved from subject/issuer linkage.
#[derive(Debug, Clone)]
pub struct CertificateChain {
    certs: Vec<Certificate>,
    root: Option<usize>,
    topmost: Option<usize>,
    intermediate: Option<usize>,
    pck: Option<PckCertificate>,
}

impl CertificateChain {
    /// Parse a bundle of concatenated PEM certificates.
    ///
    /// Any certificate that fails to parse fails the whole chain. Certificates are not
    /// guaranteed to be in any particular order, so when one is rejected for a bad extension
    /// its role is guessed from its position.
    pub fn parse(pem_bundle: &str) -> Result<Self, Status> {
        let blocks = split_pem_bundle(pem_bundle)?;
        let total = blocks.len();

        let mut certs = Vec::with_capacity(total);
        let mut pck = None;
        for (position, block) in blocks.into_iter().enumerate() {
            let cert = Certificate::from_pem(block).map_err(|e| parse_failure(&e, position, total))?;
            if cert.subject_cn_contains(SGX_PCK_CN_PHRASE) {
                let parsed = PckCertificate::from_certificate(cert.clone())
                    .map_err(|e| parse_failure(&e, position, total))?;
                pck = Some(parsed);
            }
            certs.push(cert);
        }

        if certs.is_empty() {
            return Err(Status::UnsupportedCertFormat);
        }

        let root = certs.iter().position(Certificate::is_self_issued);
        let topmost = certs.iter().position(|candidate| {
            !certs
                .iter()
                .any(|other| other != candidate && other.is_issued_by(candidate))
        });
        let intermediate = certs.iter().position(|cert| {
            !cert.is_self_issued()
                && (cert.subject_cn_contains(SGX_PCK_PROCESSOR_CA_CN_PHRASE)
                    || cert.subject_cn_contains(SGX_PCK_PLATFORM_CA_CN_PHRASE))
        });

        debug!(
            certificates = certs.len(),
            has_root = root.is_some(),
            has_pck = pck.is_some(),
            "parsed certificate chain"
        );
        Ok(Self {
            certs,
            root,
            topmost,
            intermediate,
            pck,
        })
    }

    pub fn len(&self) -> usize {
        self.certs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certs.is_empty()
    }

    pub fn certificates(&self) -> &[Certificate] {
        &self.certs
    }

    pub fn root_cert(&self) -> Option<&Certificate> {
        self.root.map(|i| &self.certs[i])
    }

    /// The certificate that signs no other certificate of the chain.
    pub fn topmost_cert(&self) -> Option<&Certificate> {
        self.topmost.map(|i| &self.certs[i])
    }

    pub fn intermediate_cert(&self) -> Option<&Certificate> {
        self.intermediate.map(|i| &self.certs[i])
    }

    pub fn pck_cert(&self) -> Option<&PckCertificate> {
        self.pck.as_ref()
    }
}

/// Split a bundle on the certificate markers. Unterminated or nested blocks are rejected.
fn split_pem_bundle(bundle: &str) -> Result<Vec<&str>, Status> {
    let mut blocks = Vec::new();
    let mut rest = bundle;
    while let Some(begin) = rest.find(PEM_CERTIFICATE_BEGIN) {
        let after_begin = &rest[begin + PEM_CERTIFICATE_BEGIN.len()..];
        let end = after_begin
            .find(PEM_CERTIFICATE_END)
            .ok_or(Status::UnsupportedCertFormat)?;
        if after_begin[..end].contains(PEM_CERTIFICATE_BEGIN) {
            return Err(Status::UnsupportedCertFormat);
        }
        let block_len = PEM_CERTIFICATE_BEGIN.len() + end + PEM_CERTIFICATE_END.len();
        blocks.push(&rest[begin..begin + block_len]);
        rest = &rest[begin + block_len..];
    }
    if rest.contains(PEM_CERTIFICATE_END) {
        return Err(Status::UnsupportedCertFormat);
    }
    Ok(blocks)
}

/// Map a certificate parse failure at `position` of a `total`-long chain to a status.
fn parse_failure(err: &ParseError, position: usize, total: usize) -> Status {
    let status = match err {
        ParseError::InvalidExtension(_) => match position {
            0 => Status::SgxRootCaInvalidExtensions,
            1 if total == 2 => Status::SgxTcbSigningCertInvalidExtensions,
            1 => Status::SgxIntermediateCaInvalidExtensions,
            _ => Status::SgxPckInvalidExtensions,
        },
        ParseError::Format(_) => Status::UnsupportedCertFormat,
        ParseError::Status(status, _) => *status,
    };
    warn!(position, total, %status, "rejecting certificate chain: {err}");
    status
}
