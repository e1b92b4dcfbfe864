pub mod cert;
pub mod chain;
pub mod collateral;
pub mod crl;
pub mod enclave_identity;
pub mod quote;
pub mod report;
pub mod sgx_x509;
pub mod tcb_info;
