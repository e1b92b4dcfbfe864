use zerocopy::AsBytes;

use crate::{
    constants::{SGX_TEE_TYPE, TDX_TEE_TYPE},
    types::report::{EnclaveReportBody, TdxReportBody},
};

/// Body of the quote data structure; which variant is present follows the header's tee type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteBody {
    Sgx(EnclaveReportBody),
    Tdx(TdxReportBody),
}

impl QuoteBody {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Sgx(body) => body.as_bytes(),
            Self::Tdx(body) => body.as_bytes(),
        }
    }

    pub fn tee_type(&self) -> u32 {
        match self {
            Self::Sgx(_) => SGX_TEE_TYPE,
            Self::Tdx(_) => TDX_TEE_TYPE,
        }
    }

    pub fn as_enclave_report_body(&self) -> Option<&EnclaveReportBody> {
        match self {
            Self::Sgx(body) => Some(body),
            _ => None,
        }
    }

    pub fn as_tdx_report_body(&self) -> Option<&TdxReportBody> {
        match self {
            Self::Tdx(body) => Some(body),
            _ => None,
        }
    }
}
