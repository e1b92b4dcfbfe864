use std::str::FromStr;

use chrono::{DateTime, Utc};
use p256::ecdsa::VerifyingKey;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    constants::ECDSA_SIGNATURE_LEN,
    error::ParseError,
    status::Status,
    utils::json::{JsonFields, SignedEnvelope},
};

const ENCLAVE_IDENTITY_V1: u32 = 1;
const ENCLAVE_IDENTITY_V2: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EnclaveType {
    /// Quoting Enclave
    Qe,
    /// Quote Verification Enclave
    Qve,
    /// TDX Quoting Enclave
    #[serde(rename = "TD_QE")]
    TdQe,
}

/// TCB level status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QeTcbStatus {
    /// TCB level of the enclave is up-to-date.
    UpToDate,
    /// TCB level of the enclave is outdated.
    OutOfDate,
    /// TCB level of the enclave is revoked.
    Revoked,
}

impl FromStr for QeTcbStatus {
    type Err = String;

    fn from_str(status: &str) -> Result<Self, Self::Err> {
        match status {
            "UpToDate" => Ok(QeTcbStatus::UpToDate),
            "OutOfDate" => Ok(QeTcbStatus::OutOfDate),
            "Revoked" => Ok(QeTcbStatus::Revoked),
            other => Err(format!("unknown enclave tcb status {other}")),
        }
    }
}

/// Enclave TCB level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QeTcbLevel {
    /// SGX Enclave's ISV SVN
    pub isvsvn: u16,
    pub tcb_date: DateTime<Utc>,
    pub tcb_status: QeTcbStatus,
    pub advisory_ids: Vec<String>,
}

impl QeTcbLevel {
    fn parse(value: &Value) -> Result<Self, ParseError> {
        let fields = JsonFields::new(value, "enclave TCB level")?;
        let tcb = fields.object("tcb", "enclave TCB level tcb")?;
        Ok(Self {
            isvsvn: tcb.typed("isvsvn")?,
            tcb_date: fields.date("tcbDate")?,
            tcb_status: fields
                .string("tcbStatus")?
                .parse()
                .map_err(ParseError::invalid)?,
            advisory_ids: fields.optional_strings("advisoryIDs")?,
        })
    }
}

/// How the identity grades the ISV SVN of a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityTcb {
    /// Version 1: a single minimum ISV SVN.
    MinimumSvn(u16),
    /// Version 2: levels in descending ISV SVN order.
    Levels(Vec<QeTcbLevel>),
}

/// Signed identity of an Intel enclave (QE, QVE or TD QE).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnclaveIdentity {
    /// Identifier of the SGX Enclave issued by Intel. Version 1 documents always describe the QE.
    pub id: EnclaveType,

    /// Version of the structure.
    pub version: u32,

    /// The time the Enclave Identity Information was created.
    pub issue_date: DateTime<Utc>,

    /// The time by which next Enclave Identity information will be issued.
    pub next_update: DateTime<Utc>,

    /// Only present from version 2 on.
    pub tcb_evaluation_data_number: Option<u32>,

    /// miscselect "golden" value (upon applying mask).
    pub miscselect: u32,

    /// Mask to be applied to miscselect value retrieved from the platform.
    pub miscselect_mask: u32,

    /// attributes "golden" value (upon applying mask).
    pub attributes: [u8; 16],

    /// Mask to be applied to attributes value retrieved from the platform.
    pub attributes_mask: [u8; 16],

    /// `None` when the document leaves MRSIGNER unconstrained.
    pub mrsigner: Option<[u8; 32]>,

    /// Enclave Product ID.
    pub isvprodid: u16,

    pub tcb: IdentityTcb,

    envelope: SignedEnvelope,
}

impl EnclaveIdentity {
    /// Parse a v1 (`qeIdentity`) or v2 (`enclaveIdentity`) document.
    ///
    /// Errors carry the exact identity status: unsupported format, invalid, or unsupported
    /// version. A document without a signature is an unsupported format, while a missing or
    /// non-object identity body is invalid.
    pub fn parse(json: &str) -> Result<Self, ParseError> {
        let document = SignedEnvelope::parse_document(json).map_err(|e| {
            ParseError::Status(Status::SgxEnclaveIdentityUnsupportedFormat, e.to_string())
        })?;
        let envelope = SignedEnvelope::from_document(&document, &["enclaveIdentity", "qeIdentity"])
            .map_err(|e| {
                let status = e.to_status(
                    Status::SgxEnclaveIdentityInvalid,
                    Status::SgxEnclaveIdentityUnsupportedFormat,
                );
                ParseError::Status(status, e.to_string())
            })?;

        Self::parse_body(envelope).map_err(|e| match e {
            ParseError::Status(..) => e,
            other => ParseError::Status(Status::SgxEnclaveIdentityInvalid, other.to_string()),
        })
    }

    fn parse_body(envelope: SignedEnvelope) -> Result<Self, ParseError> {
        let fields = JsonFields::new(&envelope.body, "enclave identity")?;

        let version = fields.typed::<u32>("version")?;
        if version != ENCLAVE_IDENTITY_V1 && version != ENCLAVE_IDENTITY_V2 {
            return Err(ParseError::Status(
                Status::SgxEnclaveIdentityUnsupportedVersion,
                format!("unsupported enclave identity version {version}"),
            ));
        }

        let issue_date = fields.date("issueDate")?;
        let next_update = fields.date("nextUpdate")?;
        let miscselect = u32::from_be_bytes(fields.hex::<4>("miscselect")?);
        let miscselect_mask = u32::from_be_bytes(fields.hex::<4>("miscselectMask")?);
        let attributes = fields.hex("attributes")?;
        let attributes_mask = fields.hex("attributesMask")?;
        let mrsigner = match fields.string("mrsigner")? {
            "" => None,
            _ => Some(fields.hex("mrsigner")?),
        };
        let isvprodid = fields.typed("isvprodid")?;

        let (id, tcb_evaluation_data_number, tcb) = if version == ENCLAVE_IDENTITY_V1 {
            (EnclaveType::Qe, None, IdentityTcb::MinimumSvn(fields.typed("isvsvn")?))
        } else {
            let levels = fields.array("tcbLevels")?;
            if levels.is_empty() {
                return Err(ParseError::invalid("[tcbLevels] should not be empty"));
            }
            let levels = levels.iter().map(QeTcbLevel::parse).collect::<Result<Vec<_>, _>>()?;
            (
                fields.typed("id")?,
                Some(fields.typed("tcbEvaluationDataNumber")?),
                IdentityTcb::Levels(levels),
            )
        };

        Ok(Self {
            id,
            version,
            issue_date,
            next_update,
            tcb_evaluation_data_number,
            miscselect,
            miscselect_mask,
            attributes,
            attributes_mask,
            mrsigner,
            isvprodid,
            tcb,
            envelope,
        })
    }

    /// Grade `isv_svn`: the first level at or below it wins, and no match means revoked.
    pub fn tcb_status(&self, isv_svn: u16) -> QeTcbStatus {
        match &self.tcb {
            IdentityTcb::MinimumSvn(min) if isv_svn >= *min => QeTcbStatus::UpToDate,
            IdentityTcb::MinimumSvn(_) => QeTcbStatus::OutOfDate,
            IdentityTcb::Levels(levels) => levels
                .iter()
                .find(|level| level.isvsvn <= isv_svn)
                .map(|level| level.tcb_status)
                .unwrap_or(QeTcbStatus::Revoked),
        }
    }

    /// `issueDate < time <= nextUpdate`
    pub fn is_fresh_at(&self, time: DateTime<Utc>) -> bool {
        self.issue_date < time && time <= self.next_update
    }

    pub fn signed_body(&self) -> &str {
        &self.envelope.body_text
    }

    pub fn signature(&self) -> &[u8; ECDSA_SIGNATURE_LEN] {
        &self.envelope.signature
    }

    pub fn verify_signature(&self, public_key: &VerifyingKey) -> anyhow::Result<()> {
        self.envelope.verify(public_key)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::test_utils::{sign_document, IdentityBuilder};

    fn status_of(json: &str) -> Status {
        EnclaveIdentity::parse(json)
            .unwrap_err()
            .to_status(Status::Ok, Status::Ok)
    }

    #[test]
    fn parses_v2_identity() {
        let identity = EnclaveIdentity::parse(&IdentityBuilder::qe_v2().build_signed()).unwrap();
        assert_eq!(identity.id, EnclaveType::Qe);
        assert_eq!(identity.version, 2);
        assert!(identity.mrsigner.is_some());
        assert!(matches!(identity.tcb, IdentityTcb::Levels(ref levels) if !levels.is_empty()));
    }

    #[test]
    fn parses_v1_identity() {
        let identity = EnclaveIdentity::parse(&IdentityBuilder::qe_v1().build_signed()).unwrap();
        assert_eq!(identity.version, 1);
        assert_eq!(identity.id, EnclaveType::Qe);
        assert_eq!(identity.tcb_status(8), QeTcbStatus::UpToDate);
        assert_eq!(identity.tcb_status(7), QeTcbStatus::OutOfDate);
    }

    #[test]
    fn miscselect_is_big_endian_and_empty_mrsigner_is_unconstrained() {
        let mut builder = IdentityBuilder::qe_v2();
        builder.miscselect = "00000001".into();
        builder.mrsigner = String::new();
        let identity = EnclaveIdentity::parse(&builder.build_signed()).unwrap();
        assert_eq!(identity.miscselect, 1);
        assert_eq!(identity.mrsigner, None);
    }

    #[rstest]
    #[case(10, QeTcbStatus::UpToDate)]
    #[case(8, QeTcbStatus::UpToDate)]
    #[case(7, QeTcbStatus::OutOfDate)]
    #[case(6, QeTcbStatus::OutOfDate)]
    #[case(5, QeTcbStatus::Revoked)]
    #[case(1, QeTcbStatus::Revoked)]
    fn levels_are_first_match_wins(#[case] isv_svn: u16, #[case] expected: QeTcbStatus) {
        // levels: 8 UpToDate, 6 OutOfDate, 5 Revoked
        let identity = EnclaveIdentity::parse(&IdentityBuilder::qe_v2().build_signed()).unwrap();
        assert_eq!(identity.tcb_status(isv_svn), expected);
    }

    #[test]
    fn parse_errors_carry_identity_statuses() {
        assert_eq!(status_of("nope"), Status::SgxEnclaveIdentityUnsupportedFormat);
        assert_eq!(
            status_of(&sign_document("enclaveIdentity", &json!({"version": 3}))),
            Status::SgxEnclaveIdentityUnsupportedVersion
        );
        assert_eq!(
            status_of(&sign_document("enclaveIdentity", &json!({"version": 2}))),
            Status::SgxEnclaveIdentityInvalid
        );

        let mut builder = IdentityBuilder::qe_v2();
        builder.id = "XE".into();
        assert_eq!(status_of(&builder.build_signed()), Status::SgxEnclaveIdentityInvalid);
    }

    #[rstest]
    #[case::empty("", Status::SgxEnclaveIdentityUnsupportedFormat)]
    #[case::plain_text("Plain string.", Status::SgxEnclaveIdentityUnsupportedFormat)]
    #[case::missing_body(r#"{"signature": "adad"}"#, Status::SgxEnclaveIdentityInvalid)]
    #[case::array_body(
        r#"{"enclaveIdentity": [], "signature": "abababababababababababababababababababababababababababababababababababababababababababababababababababababababababababababababab"}"#,
        Status::SgxEnclaveIdentityInvalid
    )]
    #[case::missing_signature(r#"{"enclaveIdentity": {"version": 2}}"#, Status::SgxEnclaveIdentityUnsupportedFormat)]
    fn envelope_errors_carry_identity_statuses(#[case] json: &str, #[case] expected: Status) {
        assert_eq!(status_of(json), expected);
    }

    #[test]
    fn unsigned_full_identity_is_unsupported_format() {
        let signed = IdentityBuilder::qe_v2().build_signed();
        let mut document: serde_json::Map<String, Value> = serde_json::from_str(&signed).unwrap();
        document.remove("signature");
        let unsigned = serde_json::to_string(&document).unwrap();
        assert_eq!(status_of(&unsigned), Status::SgxEnclaveIdentityUnsupportedFormat);
    }

    #[test]
    fn freshness_window_excludes_issue_date() {
        let identity = EnclaveIdentity::parse(&IdentityBuilder::qe_v2().build_signed()).unwrap();
        assert!(!identity.is_fresh_at(identity.issue_date));
        assert!(identity.is_fresh_at(identity.next_update));
        assert!(!identity.is_fresh_at(identity.next_update + chrono::Duration::seconds(1)));
    }
}
