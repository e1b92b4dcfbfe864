use zerocopy::{little_endian, AsBytes, FromBytes, FromZeroes};

use crate::constants::HEADER_LEN;

/// Header of the quote data structure.
///
/// All multi-byte integers are little-endian on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromZeroes, FromBytes, AsBytes)]
#[repr(C)]
pub struct QuoteHeader {
    /// Version of the quote data structure.
    /// [2 bytes]
    pub version: little_endian::U16,

    /// Type of attestation key used by the quoting enclave.
    /// 2 (ECDSA-256-with-P-256 curve)
    /// [2 bytes]
    pub attestation_key_type: little_endian::U16,

    /// TEE for this attestation
    /// 0x00000000: SGX
    /// 0x00000081: TDX
    /// [4 bytes]
    pub tee_type: little_endian::U32,

    /// Security version of the quoting enclave.
    /// [2 bytes]
    pub qe_svn: little_endian::U16,

    /// Security version of the PCE.
    /// [2 bytes]
    pub pce_svn: little_endian::U16,

    /// Unique identifier of the QE vendor.
    /// [16 bytes]
    pub qe_vendor_id: [u8; 16],

    /// Custom user-defined data.
    /// [20 bytes]
    pub user_data: [u8; 20],
}

const _: () = assert!(std::mem::size_of::<QuoteHeader>() == HEADER_LEN);
