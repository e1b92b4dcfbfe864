use tracing::{debug, warn};

use crate::{
    status::Status,
    types::{
        quote::QuoteBody,
        sgx_x509::PckTcb,
        tcb_info::{TcbInfo, TcbLevel, TcbStatus},
    },
};

const TDX_MODULE_VERSION_INDEX: usize = 1;

fn matches_level(tcb_info: &TcbInfo, level: &TcbLevel, pck_tcb: &PckTcb, body: &QuoteBody) -> bool {
    let sgx_ok = pck_tcb
        .compsvn
        .iter()
        .enumerate()
        .all(|(i, svn)| *svn >= level.sgx_svn(i));
    if !sgx_ok || pck_tcb.pcesvn < level.pcesvn {
        return false;
    }

    match body {
        QuoteBody::Tdx(td) if tcb_info.is_tdx() => td
            .tee_tcb_svn
            .iter()
            .enumerate()
            .all(|(i, svn)| level.tdx_svn(i).map_or(true, |expected| *svn >= expected)),
        _ => true,
    }
}

/// Pick the first level, in document order, that the platform TCB is at or above.
///
/// Every SGX component and the PCE SVN are compared individually; for a TDX document and a
/// TDX quote the TEE TCB SVN of the TD report is compared as well.
pub fn select_tcb_level<'a>(
    tcb_info: &'a TcbInfo,
    pck_tcb: &PckTcb,
    body: &QuoteBody,
) -> Result<&'a TcbLevel, Status> {
    match tcb_info
        .tcb_levels
        .iter()
        .position(|level| matches_level(tcb_info, level, pck_tcb, body))
    {
        Some(index) => {
            let level = &tcb_info.tcb_levels[index];
            debug!(index, status = ?level.tcb_status, "selected TCB level");
            Ok(level)
        }
        None => {
            warn!(
                status = %Status::TcbNotSupported,
                compsvn = hex::encode(pck_tcb.compsvn),
                pcesvn = pck_tcb.pcesvn,
                "no TCB level matches the platform"
            );
            Err(Status::TcbNotSupported)
        }
    }
}

/// Status of a selected level, after the TDX module version cross-check.
pub fn check_tcb_level(tcb_info: &TcbInfo, level: &TcbLevel, body: &QuoteBody) -> Status {
    if let QuoteBody::Tdx(td) = body {
        let reported = td.tee_tcb_svn[TDX_MODULE_VERSION_INDEX];
        if tcb_info.is_tdx() && level.tdx_svn(TDX_MODULE_VERSION_INDEX) != Some(reported) {
            warn!(
                status = %Status::TcbInfoMismatch,
                reported,
                expected = ?level.tdx_svn(TDX_MODULE_VERSION_INDEX),
                "TDX module version does not match the TCB level"
            );
            return Status::TcbInfoMismatch;
        }
    }

    match level.tcb_status {
        TcbStatus::UpToDate => Status::Ok,
        TcbStatus::OutOfDate => Status::TcbOutOfDate,
        TcbStatus::Revoked => Status::TcbRevoked,
        TcbStatus::ConfigurationNeeded => Status::TcbConfigurationNeeded,
        TcbStatus::ConfigurationAndSWHardeningNeeded => Status::TcbConfigurationAndSwHardeningNeeded,
        TcbStatus::SWHardeningNeeded => Status::TcbSwHardeningNeeded,
        TcbStatus::OutOfDateConfigurationNeeded => Status::TcbOutOfDateConfigurationNeeded,
    }
}

/// Fold the QE identity verdict into the platform TCB status.
// https://github.com/intel/SGX-TDX-DCAP-QuoteVerificationLibrary/blob/7e5b2a13ca5472de8d97dd7d7024c2ea5af9a6ba/Src/AttestationLibrary/src/Verifiers/QuoteVerifier.cpp#L74-L120
pub fn converge_tcb_status(tcb: Status, qe: Status) -> Status {
    match qe {
        Status::SgxEnclaveReportIsvsvnOutOfDate => match tcb {
            Status::Ok | Status::TcbSwHardeningNeeded => return Status::TcbOutOfDate,
            Status::TcbConfigurationNeeded | Status::TcbConfigurationAndSwHardeningNeeded => {
                return Status::TcbOutOfDateConfigurationNeeded
            }
            _ => {}
        },
        Status::SgxEnclaveReportIsvsvnRevoked => return Status::TcbRevoked,
        _ => {}
    }

    match tcb {
        Status::Ok
        | Status::TcbOutOfDate
        | Status::TcbRevoked
        | Status::TcbConfigurationNeeded
        | Status::TcbOutOfDateConfigurationNeeded
        | Status::TcbSwHardeningNeeded
        | Status::TcbConfigurationAndSwHardeningNeeded => tcb,
        other => {
            warn!(status = %other, "unrecognized TCB status");
            Status::TcbUnrecognizedStatus
        }
    }
}
