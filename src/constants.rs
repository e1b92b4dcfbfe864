// https://github.com/intel/SGX-TDX-DCAP-QuoteVerificationLibrary/blob/16b7291a7a86e486fdfcf1dfb4be885c0cc00b4e/Src/AttestationLibrary/src/QuoteVerification/QuoteConstants.h

pub const QUOTE_V3: u16 = 3;
pub const QUOTE_V4: u16 = 4;
pub const SUPPORTED_QUOTE_VERSIONS: [u16; 2] = [QUOTE_V3, QUOTE_V4];

pub const SGX_TEE_TYPE: u32 = 0x00000000;
pub const TDX_TEE_TYPE: u32 = 0x00000081;
pub const SUPPORTED_TEE_TYPES: [u32; 2] = [SGX_TEE_TYPE, TDX_TEE_TYPE];

pub const ECDSA_256_WITH_P256_CURVE: u16 = 2;
pub const SUPPORTED_ATTESTATION_KEY_TYPES: [u16; 1] = [ECDSA_256_WITH_P256_CURVE];

pub const HEADER_LEN: usize = 48;
pub const ENCLAVE_REPORT_LEN: usize = 384;
pub const TD10_REPORT_LEN: usize = 584;
pub const ECDSA_SIGNATURE_LEN: usize = 64;
pub const ECDSA_PUBKEY_LEN: usize = 64;

pub const INTEL_QE_VENDOR_ID: [u8; 16] = [
    0x93, 0x9A, 0x72, 0x33, 0xF7, 0x9C, 0x4C, 0xA9, 0x94, 0x0A, 0x0D, 0xB3, 0x95, 0x7F, 0x06, 0x07,
];

// Common name phrases used to classify certificates.
pub const SGX_ROOT_CA_CN_PHRASE: &str = "SGX Root CA";
pub const SGX_PCK_PROCESSOR_CA_CN_PHRASE: &str = "SGX PCK Processor CA";
pub const SGX_PCK_PLATFORM_CA_CN_PHRASE: &str = "SGX PCK Platform CA";
pub const SGX_PCK_CN_PHRASE: &str = "SGX PCK Certificate";
pub const SGX_TCB_SIGNING_CN_PHRASE: &str = "SGX TCB Signing";

pub const PEM_CERTIFICATE_BEGIN: &str = "-----BEGIN CERTIFICATE-----";
pub const PEM_CERTIFICATE_END: &str = "-----END CERTIFICATE-----";
pub const PEM_CRL_LABEL: &str = "X509 CRL";

pub const EXPECTED_CERTIFICATE_COUNT_IN_PCK_CHAIN: usize = 3;
pub const EXPECTED_CERTIFICATE_COUNT_IN_TCB_CHAIN: usize = 2;
