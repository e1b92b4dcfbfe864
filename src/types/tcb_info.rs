use std::str::FromStr;

use chrono::{DateTime, Utc};
use p256::ecdsa::VerifyingKey;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    constants::ECDSA_SIGNATURE_LEN,
    error::ParseError,
    utils::json::{JsonFields, SignedEnvelope},
};

const TCB_INFO_KEY: &str = "tcbInfo";
const SUPPORTED_TCB_INFO_VERSIONS: [u32; 2] = [2, 3];
const TCB_COMPONENTS: usize = 16;

/// Version of the TcbInfo JSON structure
///
/// In the PCS V3 API the TcbInfo version is V2, in the PCS V4 API the TcbInfo
/// version is V3. The V3 API adds the `id` field, the TDX module and component
/// lists with categories.
pub const TCB_INFO_V2: u32 = 2;
pub const TCB_INFO_V3: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TcbInfoId {
    Sgx,
    Tdx,
}

#[derive(Debug, Eq, PartialEq, Clone, Copy, Deserialize, Serialize)]
pub enum TcbStatus {
    UpToDate,
    OutOfDate,
    ConfigurationNeeded,
    SWHardeningNeeded,
    ConfigurationAndSWHardeningNeeded,
    OutOfDateConfigurationNeeded,
    Revoked,
}

impl FromStr for TcbStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "UpToDate" => TcbStatus::UpToDate,
            "OutOfDate" => TcbStatus::OutOfDate,
            "ConfigurationNeeded" => TcbStatus::ConfigurationNeeded,
            "SWHardeningNeeded" => TcbStatus::SWHardeningNeeded,
            "ConfigurationAndSWHardeningNeeded" => TcbStatus::ConfigurationAndSWHardeningNeeded,
            "OutOfDateConfigurationNeeded" => TcbStatus::OutOfDateConfigurationNeeded,
            "Revoked" => TcbStatus::Revoked,
            other => return Err(format!("unknown tcb status {other}")),
        })
    }
}

/// One SVN of a TCB level, with the v3 descriptive fields when present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TcbComponent {
    pub svn: u8,
    pub category: Option<String>,
    pub component_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcbLevel {
    pub sgx_components: [TcbComponent; TCB_COMPONENTS],
    /// Present only in TDX documents.
    pub tdx_components: Option<[TcbComponent; TCB_COMPONENTS]>,
    pub pcesvn: u16,
    pub tcb_date: DateTime<Utc>,
    pub tcb_status: TcbStatus,
    pub advisory_ids: Vec<String>,
}

impl TcbLevel {
    pub fn sgx_svn(&self, index: usize) -> u8 {
        self.sgx_components[index].svn
    }

    pub fn tdx_svn(&self, index: usize) -> Option<u8> {
        self.tdx_components.as_ref().map(|c| c[index].svn)
    }

    fn same_tcb(&self, other: &TcbLevel) -> bool {
        self.pcesvn == other.pcesvn
            && (0..TCB_COMPONENTS).all(|i| self.sgx_svn(i) == other.sgx_svn(i) && self.tdx_svn(i) == other.tdx_svn(i))
    }

    fn parse(value: &Value, version: u32, id: TcbInfoId) -> Result<Self, ParseError> {
        let fields = JsonFields::new(value, "TCB level")?;
        let tcb_date = fields.date("tcbDate")?;
        let tcb_status = fields
            .required("tcbStatus")?
            .as_str()
            .ok_or_else(|| ParseError::format("[tcbStatus] of TCB level should be a string"))?
            .parse::<TcbStatus>()
            .map_err(ParseError::invalid)?;
        let advisory_ids = fields.optional_strings("advisoryIDs")?;

        let tcb = fields.object("tcb", "TCB level tcb")?;
        let pcesvn = tcb.typed::<u16>("pcesvn").map_err(into_format)?;

        let (sgx_components, tdx_components) = if version == TCB_INFO_V2 {
            let mut components: [TcbComponent; TCB_COMPONENTS] = Default::default();
            for (i, component) in components.iter_mut().enumerate() {
                component.svn = tcb.typed(&format!("sgxtcbcomp{:02}svn", i + 1))?;
            }
            (components, None)
        } else {
            let sgx = parse_components(&tcb, "sgxtcbcomponents")?;
            let tdx = match id {
                TcbInfoId::Tdx => Some(parse_components(&tcb, "tdxtcbcomponents")?),
                TcbInfoId::Sgx => None,
            };
            (sgx, tdx)
        };

        Ok(Self {
            sgx_components,
            tdx_components,
            pcesvn,
            tcb_date,
            tcb_status,
            advisory_ids,
        })
    }
}

fn into_format(err: ParseError) -> ParseError {
    match err {
        ParseError::InvalidExtension(msg) => ParseError::Format(msg),
        other => other,
    }
}

fn parse_components(tcb: &JsonFields, name: &str) -> Result<[TcbComponent; TCB_COMPONENTS], ParseError> {
    let values = tcb.array(name).map_err(into_format)?;
    if values.len() != TCB_COMPONENTS {
        return Err(ParseError::format(format!(
            "[{name}] should have {TCB_COMPONENTS} entries, found {}",
            values.len()
        )));
    }

    let mut components: [TcbComponent; TCB_COMPONENTS] = Default::default();
    for (component, value) in components.iter_mut().zip(values) {
        let fields = JsonFields::new(value, "TCB component")?;
        component.svn = fields.typed("svn")?;
        if fields.has("category") {
            component.category = Some(fields.string("category")?.to_owned());
        }
        if fields.has("type") {
            component.component_type = Some(fields.string("type")?.to_owned());
        }
    }
    Ok(components)
}

/// TDX module identity expected by a TDX TCB info document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TdxModule {
    pub mrsigner: [u8; 48],
    pub attributes: [u8; 8],
    pub attributes_mask: [u8; 8],
}

impl TdxModule {
    fn parse(fields: &JsonFields) -> Result<Self, ParseError> {
        Ok(Self {
            mrsigner: fields.hex("mrsigner")?,
            attributes: fields.hex("attributes")?,
            attributes_mask: fields.hex("attributesMask")?,
        })
    }
}

/// Signed TCB info document listing the TCB levels of one platform family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcbInfo {
    pub version: u32,
    pub id: TcbInfoId,
    pub issue_date: DateTime<Utc>,
    pub next_update: DateTime<Utc>,
    pub fmspc: [u8; 6],
    pub pce_id: [u8; 2],
    pub tcb_type: u32,
    pub tcb_evaluation_data_number: u32,
    pub tdx_module: Option<TdxModule>,
    /// Levels in document order, which is descending precedence.
    pub tcb_levels: Vec<TcbLevel>,
    envelope: SignedEnvelope,
}

impl TcbInfo {
    pub fn parse(json: &str) -> Result<Self, ParseError> {
        let envelope = SignedEnvelope::parse(json, &[TCB_INFO_KEY])?;
        let fields = JsonFields::new(&envelope.body, "TCB info")?;

        let version = fields.typed::<u32>("version")?;
        if !SUPPORTED_TCB_INFO_VERSIONS.contains(&version) {
            return Err(ParseError::invalid(format!("unsupported TCB info version {version}")));
        }

        let id = if version >= TCB_INFO_V3 {
            match fields.string("id")? {
                "SGX" => TcbInfoId::Sgx,
                "TDX" => TcbInfoId::Tdx,
                other => return Err(ParseError::invalid(format!("unknown TCB info id {other}"))),
            }
        } else {
            TcbInfoId::Sgx
        };

        let issue_date = fields.date("issueDate")?;
        let next_update = fields.date("nextUpdate")?;
        let fmspc = fields.hex("fmspc")?;
        let pce_id = fields.hex("pceId")?;
        let tcb_type = fields.typed("tcbType")?;
        let tcb_evaluation_data_number = fields.typed("tcbEvaluationDataNumber")?;

        let tdx_module = match id {
            TcbInfoId::Tdx => Some(TdxModule::parse(&fields.object("tdxModule", "TDX module")?)?),
            TcbInfoId::Sgx if fields.has("tdxModule") => {
                return Err(ParseError::invalid("SGX TCB info should not have [tdxModule] field"));
            }
            TcbInfoId::Sgx => None,
        };

        let levels = fields.array("tcbLevels")?;
        if levels.is_empty() {
            return Err(ParseError::invalid("[tcbLevels] should not be empty"));
        }
        let mut tcb_levels: Vec<TcbLevel> = Vec::with_capacity(levels.len());
        for value in levels {
            let level = TcbLevel::parse(value, version, id)?;
            if tcb_levels.iter().any(|seen| seen.same_tcb(&level)) {
                return Err(ParseError::invalid("detected duplicated TCB levels"));
            }
            tcb_levels.push(level);
        }

        Ok(Self {
            version,
            id,
            issue_date,
            next_update,
            fmspc,
            pce_id,
            tcb_type,
            tcb_evaluation_data_number,
            tdx_module,
            tcb_levels,
            envelope,
        })
    }

    /// Whether levels carry TDX components that apply to TDX quotes.
    pub fn is_tdx(&self) -> bool {
        self.version >= TCB_INFO_V3 && self.id == TcbInfoId::Tdx
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
