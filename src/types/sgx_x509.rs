use anyhow::{anyhow, bail, Context, Result};
use asn1::{oid, ObjectIdentifier, SequenceOf};

/// OID of the SGX extension carried by PCK certificates, as seen by `x509-cert`.
pub const SGX_EXTENSIONS_OID: x509_cert::der::asn1::ObjectIdentifier =
    x509_cert::der::asn1::ObjectIdentifier::new_unwrap("1.2.840.113741.1.13.1");

const PPID_OID: ObjectIdentifier = oid!(1, 2, 840, 113741, 1, 13, 1, 1);
const TCB_OID: ObjectIdentifier = oid!(1, 2, 840, 113741, 1, 13, 1, 2);
const TCB_PCESVN_OID: ObjectIdentifier = oid!(1, 2, 840, 113741, 1, 13, 1, 2, 17);
const TCB_CPUSVN_OID: ObjectIdentifier = oid!(1, 2, 840, 113741, 1, 13, 1, 2, 18);
const PCE_ID_OID: ObjectIdentifier = oid!(1, 2, 840, 113741, 1, 13, 1, 3);
const FMSPC_OID: ObjectIdentifier = oid!(1, 2, 840, 113741, 1, 13, 1, 4);
const SGX_TYPE_OID: ObjectIdentifier = oid!(1, 2, 840, 113741, 1, 13, 1, 5);
const PLATFORM_INSTANCE_OID: ObjectIdentifier = oid!(1, 2, 840, 113741, 1, 13, 1, 6);
const CONFIGURATION_OID: ObjectIdentifier = oid!(1, 2, 840, 113741, 1, 13, 1, 7);
const CONFIGURATION_DYNAMIC_PLATFORM_OID: ObjectIdentifier = oid!(1, 2, 840, 113741, 1, 13, 1, 7, 1);
const CONFIGURATION_CACHED_KEYS_OID: ObjectIdentifier = oid!(1, 2, 840, 113741, 1, 13, 1, 7, 2);
const CONFIGURATION_SMT_ENABLED_OID: ObjectIdentifier = oid!(1, 2, 840, 113741, 1, 13, 1, 7, 3);

const TCB_COMPSVN_OIDS: [ObjectIdentifier; 16] = [
    oid!(1, 2, 840, 113741, 1, 13, 1, 2, 1),
    oid!(1, 2, 840, 113741, 1, 13, 1, 2, 2),
    oid!(1, 2, 840, 113741, 1, 13, 1, 2, 3),
    oid!(1, 2, 840, 113741, 1, 13, 1, 2, 4),
    oid!(1, 2, 840, 113741, 1, 13, 1, 2, 5),
    oid!(1, 2, 840, 113741, 1, 13, 1, 2, 6),
    oid!(1, 2, 840, 113741, 1, 13, 1, 2, 7),
    oid!(1, 2, 840, 113741, 1, 13, 1, 2, 8),
    oid!(1, 2, 840, 113741, 1, 13, 1, 2, 9),
    oid!(1, 2, 840, 113741, 1, 13, 1, 2, 10),
    oid!(1, 2, 840, 113741, 1, 13, 1, 2, 11),
    oid!(1, 2, 840, 113741, 1, 13, 1, 2, 12),
    oid!(1, 2, 840, 113741, 1, 13, 1, 2, 13),
    oid!(1, 2, 840, 113741, 1, 13, 1, 2, 14),
    oid!(1, 2, 840, 113741, 1, 13, 1, 2, 15),
    oid!(1, 2, 840, 113741, 1, 13, 1, 2, 16),
];

const PPID_LEN: usize = 16;
const CPUSVN_LEN: usize = 16;
const PCEID_LEN: usize = 2;
const FMSPC_LEN: usize = 6;
const PLATFORM_INSTANCE_ID_LEN: usize = 16;

/// One `SEQUENCE { OID, value }` entry of the SGX extension.
#[derive(asn1::Asn1Read)]
struct SgxExtensionEntry<'a> {
    id: ObjectIdentifier,
    value: asn1::Tlv<'a>,
}

/// Platform TCB recorded in the PCK certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PckTcb {
    pub compsvn: [u8; 16],
    pub pcesvn: u16,
    pub cpusvn: [u8; CPUSVN_LEN],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PckPlatformConfiguration {
    pub dynamic_platform: Option<bool>,
    pub cached_keys: Option<bool>,
    pub smt_enabled: Option<bool>,
}

/// Decoded SGX extension of a PCK certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SgxPckExtension {
    pub ppid: [u8; PPID_LEN],
    pub tcb: PckTcb,
    pub pceid: [u8; PCEID_LEN],
    pub fmspc: [u8; FMSPC_LEN],
    pub sgx_type: u32,
    pub platform_instance_id: Option<[u8; PLATFORM_INSTANCE_ID_LEN]>,
    pub configuration: Option<PckPlatformConfiguration>,
}

impl SgxPckExtension {
    pub fn is_pck_ext(oid: &x509_cert::der::asn1::ObjectIdentifier) -> bool {
        *oid == SGX_EXTENSIONS_OID
    }

    /// Decodes the DER value of the SGX extension.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let entries = asn1::parse_single::<SequenceOf<SgxExtensionEntry>>(der)
            .map_err(|e| anyhow!("malformed sgx extension: {e:?}"))?;

        let mut ppid = None;
        let mut tcb = None;
        let mut pceid = None;
        let mut fmspc = None;
        let mut sgx_type = None;
        let mut platform_instance_id = None;
        let mut configuration = None;

        for entry in entries {
            match entry.id {
                id if id == PPID_OID => set_once(&mut ppid, octets::<PPID_LEN>(&entry.value)?, "ppid")?,
                id if id == TCB_OID => set_once(&mut tcb, parse_tcb(&entry.value)?, "tcb")?,
                id if id == PCE_ID_OID => {
                    set_once(&mut pceid, octets::<PCEID_LEN>(&entry.value)?, "pceid")?
                }
                id if id == FMSPC_OID => {
                    set_once(&mut fmspc, octets::<FMSPC_LEN>(&entry.value)?, "fmspc")?
                }
                id if id == SGX_TYPE_OID => {
                    let value = entry
                        .value
                        .parse::<asn1::Enumerated>()
                        .map_err(|e| anyhow!("sgx type should be enumerated: {e:?}"))?;
                    set_once(&mut sgx_type, value.value(), "sgx type")?
                }
                id if id == PLATFORM_INSTANCE_OID => set_once(
                    &mut platform_instance_id,
                    octets::<PLATFORM_INSTANCE_ID_LEN>(&entry.value)?,
                    "platform instance id",
                )?,
                id if id == CONFIGURATION_OID => {
                    set_once(&mut configuration, parse_configuration(&entry.value)?, "configuration")?
                }
                other => bail!("unexpected sgx extension {other}"),
            }
        }

        Ok(Self {
            ppid: ppid.context("sgx extension is missing ppid")?,
            tcb: tcb.context("sgx extension is missing tcb")?,
            pceid: pceid.context("sgx extension is missing pceid")?,
            fmspc: fmspc.context("sgx extension is missing fmspc")?,
            sgx_type: sgx_type.context("sgx extension is missing sgx type")?,
            platform_instance_id,
            configuration,
        })
    }
}

fn set_once<T>(slot: &mut Option<T>, value: T, name: &str) -> Result<()> {
    if slot.is_some() {
        bail!("duplicate {name} in sgx extension");
    }
    *slot = Some(value);
    Ok(())
}

fn octets<const N: usize>(value: &asn1::Tlv) -> Result<[u8; N]> {
    let bytes = value
        .parse::<&[u8]>()
        .map_err(|e| anyhow!("expected octet string: {e:?}"))?;
    bytes
        .try_into()
        .map_err(|_| anyhow!("expected {N} bytes, got {}", bytes.len()))
}

fn integer<T: TryFrom<u64>>(value: &asn1::Tlv) -> Result<T> {
    let raw = value
        .parse::<u64>()
        .map_err(|e| anyhow!("expected integer: {e:?}"))?;
    T::try_from(raw).map_err(|_| anyhow!("integer {raw} out of range"))
}

fn parse_tcb(value: &asn1::Tlv) -> Result<PckTcb> {
    let entries = value
        .parse::<SequenceOf<SgxExtensionEntry>>()
        .map_err(|e| anyhow!("tcb should be a sequence: {e:?}"))?;

    let mut compsvn: [Option<u8>; 16] = [None; 16];
    let mut pcesvn = None;
    let mut cpusvn = None;
    for entry in entries {
        if let Some(index) = TCB_COMPSVN_OIDS.iter().position(|oid| *oid == entry.id) {
            set_once(&mut compsvn[index], integer::<u8>(&entry.value)?, "tcb component")?;
        } else if entry.id == TCB_PCESVN_OID {
            set_once(&mut pcesvn, integer::<u16>(&entry.value)?, "pcesvn")?;
        } else if entry.id == TCB_CPUSVN_OID {
            set_once(&mut cpusvn, octets::<CPUSVN_LEN>(&entry.value)?, "cpusvn")?;
        } else {
            bail!("unexpected tcb entry {}", entry.id);
        }
    }

    let mut tcb = PckTcb {
        pcesvn: pcesvn.context("tcb is missing pcesvn")?,
        cpusvn: cpusvn.context("tcb is missing cpusvn")?,
        ..Default::default()
    };
    for (index, svn) in compsvn.into_iter().enumerate() {
        tcb.compsvn[index] = svn.with_context(|| format!("tcb is missing component {}", index + 1))?;
    }
    Ok(tcb)
}

fn parse_configuration(value: &asn1::Tlv) -> Result<PckPlatformConfiguration> {
    let entries = value
        .parse::<SequenceOf<SgxExtensionEntry>>()
        .map_err(|e| anyhow!("configuration should be a sequence: {e:?}"))?;

    let mut configuration = PckPlatformConfiguration::default();
    for entry in entries {
        let flag = entry
            .value
            .parse::<bool>()
            .map_err(|e| anyhow!("configuration flag should be boolean: {e:?}"))?;
        let slot = match entry.id {
            id if id == CONFIGURATION_DYNAMIC_PLATFORM_OID => &mut configuration.dynamic_platform,
            id if id == CONFIGURATION_CACHED_KEYS_OID => &mut configuration.cached_keys,
            id if id == CONFIGURATION_SMT_ENABLED_OID => &mut configuration.smt_enabled,
            other => bail!("unexpected configuration entry {other}"),
        };
        set_once(slot, flag, "configuration flag")?;
    }
    Ok(configuration)
}
