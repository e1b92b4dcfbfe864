use zerocopy::{little_endian, AsBytes, FromBytes, FromZeroes};

use crate::constants::{ENCLAVE_REPORT_LEN, TD10_REPORT_LEN};

/// SGX enclave report, as carried in the quote body and as the QE report.
///
/// We use zerocopy so the struct can be read straight out of the quote buffer and written
/// back without any field-by-field bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromZeroes, FromBytes, AsBytes)]
#[repr(C)]
pub struct EnclaveReportBody {
    /// Security version of the CPU.
    /// [16 bytes]
    pub cpu_svn: [u8; 16],

    /// SSA frame extended feature set.
    /// [4 bytes]
    pub misc_select: little_endian::U32,

    /// [28 bytes]
    pub reserved_1: [u8; 28],

    /// Set of flags describing attributes of the enclave.
    /// [16 bytes]
    pub attributes: [u8; 16],

    /// Measurement of the enclave.
    /// [32 bytes]
    pub mr_enclave: [u8; 32],

    /// [32 bytes]
    pub reserved_2: [u8; 32],

    /// Measurement of the enclave signer.
    /// [32 bytes]
    pub mr_signer: [u8; 32],

    /// [96 bytes]
    pub reserved_3: [u8; 96],

    /// Product ID of the enclave.
    /// [2 bytes]
    pub isv_prod_id: little_endian::U16,

    /// Security version of the enclave.
    /// [2 bytes]
    pub isv_svn: little_endian::U16,

    /// [60 bytes]
    pub reserved_4: [u8; 60],

    /// Data provided by the enclave. For the QE report the first 32 bytes bind the
    /// attestation key.
    /// [64 bytes]
    pub report_data: [u8; 64],
}

/// TDX 1.0 TD report, as carried in the body of a TDX quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromZeroes, FromBytes, AsBytes)]
#[repr(C)]
pub struct TdxReportBody {
    /// Describes the TCB of TDX. Index 0 is the TDX module ISV SVN, index 1 its major version.
    /// [16 bytes]
    pub tee_tcb_svn: [u8; 16],

    /// Measurement of the TDX module.
    /// [48 bytes]
    pub mr_seam: [u8; 48],

    /// Signer of the TDX module, zero for Intel.
    /// [48 bytes]
    pub mr_signer_seam: [u8; 48],

    /// [8 bytes]
    pub seam_attributes: [u8; 8],

    /// [8 bytes]
    pub td_attributes: [u8; 8],

    /// Extended features enabled for the TD.
    /// [8 bytes]
    pub xfam: [u8; 8],

    /// Measurement of the initial contents of the TD.
    /// [48 bytes]
    pub mr_td: [u8; 48],

    /// [48 bytes]
    pub mr_config_id: [u8; 48],

    /// [48 bytes]
    pub mr_owner: [u8; 48],

    /// [48 bytes]
    pub mr_owner_config: [u8; 48],

    /// Runtime extendable measurement registers.
    /// [48 bytes each]
    pub rtmr0: [u8; 48],
    pub rtmr1: [u8; 48],
    pub rtmr2: [u8; 48],
    pub rtmr3: [u8; 48],

    /// [64 bytes]
    pub report_data: [u8; 64],
}

const _: () = assert!(std::mem::size_of::<EnclaveReportBody>() == ENCLAVE_REPORT_LEN);
const _: () = assert!(std::mem::size_of::<TdxReportBody>() == TD10_REPORT_LEN);

impl EnclaveReportBody {
    /// Reads a report from exactly `ENCLAVE_REPORT_LEN` bytes.
    pub fn from_exact(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != ENCLAVE_REPORT_LEN {
            return None;
        }
        Self::read_from(bytes)
    }
}
