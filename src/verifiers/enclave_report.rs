use tracing::warn;

use crate::{
    status::Status,
    types::{
        enclave_identity::{EnclaveIdentity, QeTcbStatus},
        report::EnclaveReportBody,
    },
};

use super::{apply_mask, ensure, verdict, Check};

/// Match an enclave report against an identity document.
pub fn verify(identity: &EnclaveIdentity, report: &EnclaveReportBody) -> Status {
    verdict(check(identity, report))
}

fn check(identity: &EnclaveIdentity, report: &EnclaveReportBody) -> Check {
    let misc_select = report.misc_select.get() & identity.miscselect_mask;
    if misc_select != identity.miscselect {
        warn!(
            status = %Status::SgxEnclaveReportMiscselectMismatch,
            report = format!("{misc_select:08x}"),
            expected = format!("{:08x}", identity.miscselect),
            "miscselect mismatch"
        );
        return Err(Status::SgxEnclaveReportMiscselectMismatch);
    }

    ensure(
        apply_mask(&report.attributes, &identity.attributes_mask) == identity.attributes,
        Status::SgxEnclaveReportAttributesMismatch,
        "attributes mismatch",
    )?;

    if let Some(mrsigner) = identity.mrsigner {
        if report.mr_signer != mrsigner {
            warn!(
                status = %Status::SgxEnclaveReportMrsignerMismatch,
                report = hex::encode(report.mr_signer),
                expected = hex::encode(mrsigner),
                "mrsigner mismatch"
            );
            return Err(Status::SgxEnclaveReportMrsignerMismatch);
        }
    }

    ensure(
        report.isv_prod_id.get() == identity.isvprodid,
        Status::SgxEnclaveReportIsvprodidMismatch,
        "isvprodid mismatch",
    )?;

    match identity.tcb_status(report.isv_svn.get()) {
        QeTcbStatus::UpToDate => Ok(()),
        QeTcbStatus::OutOfDate => Err(Status::SgxEnclaveReportIsvsvnOutOfDate),
        QeTcbStatus::Revoked => Err(Status::SgxEnclaveReportIsvsvnRevoked),
    }
}
