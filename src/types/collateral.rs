use serde::{Deserialize, Serialize};

/// Already-fetched collateral for one quote, as served by the PCS/PCCS APIs.
///
/// Everything is kept as text; each verifier parses the piece it needs and maps parse failures
/// to its own status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collateral {
    /* Certificate Revocation Lists */
    /// Root CA CRL, PEM or hex-encoded DER.
    /// Signed by the Intel SGX Root CA and used to check the intermediate and signing certificates.
    pub root_ca_crl: String,

    /// PCK CRL, PEM or hex-encoded DER, issued by the PCK platform or processor CA.
    pub pck_crl: String,

    /* Issuer Certificate Chains */
    /// PCK CRL Issuer Chain in PEM format.
    pub pck_crl_issuer_chain: String,

    /// Chain of certificates used to verify the TCB Info signature.
    pub tcb_info_issuer_chain: String,

    /// Chain of certificates used to verify the QE Identity signature.
    pub qe_identity_issuer_chain: String,

    /* Structured Data */
    /// Signed TCB Info JSON.
    pub tcb_info: String,

    /// Signed QE Identity JSON.
    pub qe_identity: String,
}
