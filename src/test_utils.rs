//! Hermetic fixtures: deterministic keys, an Intel-shaped PKI, signed collateral and quotes.

use std::{
    str::FromStr,
    time::{Duration, SystemTime},
};

use p256::{
    ecdsa::{signature::Signer, DerSignature, Signature, SigningKey},
    pkcs8::EncodePublicKey,
};
use serde_json::{json, Map, Value};
use x509_cert::{
    certificate::{Certificate, TbsCertificate, Version},
    crl::{CertificateList, RevokedCert, TbsCertList},
    der::{
        asn1::{BitString, ObjectIdentifier, OctetString, UtcTime},
        Decode, Encode,
    },
    ext::Extension,
    name::Name,
    serial_number::SerialNumber,
    spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned},
    time::{Time, Validity},
};
use zerocopy::{AsBytes, FromZeroes};

use crate::{
    constants::{INTEL_QE_VENDOR_ID, QUOTE_V3, QUOTE_V4, SGX_TEE_TYPE, TDX_TEE_TYPE},
    types::{
        report::{EnclaveReportBody, TdxReportBody},
        sgx_x509::SGX_EXTENSIONS_OID,
    },
    utils::crypto::sha256sum,
};

/// 2025-01-01T00:00:00Z, inside the validity of every generated certificate and CRL.
pub const VALID_AT: u64 = 1_735_689_600;
/// 2024-01-01T00:00:00Z
pub const NOT_BEFORE: u64 = 1_704_067_200;
/// 2034-01-01T00:00:00Z
pub const NOT_AFTER: u64 = 2_019_686_400;

const ROOT_SEED: u8 = 0x01;
const INTERMEDIATE_SEED: u8 = 0x02;
const PCK_SEED: u8 = 0x03;
const TCB_SIGNING_SEED: u8 = 0x04;
const OTHER_ROOT_SEED: u8 = 0x05;
const ATTESTATION_SEED: u8 = 0x06;

const ROOT_NAME: &str = "CN=Intel SGX Root CA,O=Intel Corporation,L=Santa Clara,ST=CA,C=US";
const INTERMEDIATE_NAME: &str = "CN=Intel SGX PCK Platform CA,O=Intel Corporation,L=Santa Clara,ST=CA,C=US";
const PCK_NAME: &str = "CN=Intel SGX PCK Certificate,O=Intel Corporation,L=Santa Clara,ST=CA,C=US";
const TCB_SIGNING_NAME: &str = "CN=Intel SGX TCB Signing,O=Intel Corporation,L=Santa Clara,ST=CA,C=US";

const ECDSA_WITH_SHA256_OID: &str = "1.2.840.10045.4.3.2";
const SGX_EXTENSION_ARC: &str = "1.2.840.113741.1.13.1";

pub const IDENTITY_MRSIGNER: [u8; 32] = [0x8c; 32];
const ISSUE_DATE: &str = "2024-06-01T00:00:00Z";
const NEXT_UPDATE: &str = "2030-01-01T00:00:00Z";
const TCB_DATE: &str = "2024-03-01T00:00:00Z";

pub fn at(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}

fn key(seed: u8) -> SigningKey {
    SigningKey::from_slice(&[seed; 32]).unwrap()
}

fn raw_public_key(key: &SigningKey) -> [u8; 64] {
    let point = key.verifying_key().to_encoded_point(false);
    point.as_bytes()[1..].try_into().unwrap()
}

fn utc(secs: u64) -> Time {
    Time::UtcTime(UtcTime::from_unix_duration(Duration::from_secs(secs)).unwrap())
}

fn ecdsa_with_sha256() -> AlgorithmIdentifierOwned {
    AlgorithmIdentifierOwned {
        oid: ObjectIdentifier::new_unwrap(ECDSA_WITH_SHA256_OID),
        parameters: None,
    }
}

fn pem_block(label: &str, der: Vec<u8>) -> String {
    pem::encode(&pem::Pem::new(label, der))
}

fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    match content.len() {
        len if len < 0x80 => out.push(len as u8),
        len if len < 0x100 => out.extend([0x81, len as u8]),
        len => out.extend([0x82, (len >> 8) as u8, len as u8]),
    }
    out.extend_from_slice(content);
    out
}

fn der_uint(value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
    let mut content = bytes[first..].to_vec();
    if content[0] & 0x80 != 0 {
        content.insert(0, 0);
    }
    tlv(0x02, &content)
}

fn sgx_entry(arc: &str, value: Vec<u8>) -> Vec<u8> {
    let oid = ObjectIdentifier::new(&format!("{SGX_EXTENSION_ARC}.{arc}")).unwrap();
    tlv(0x30, &[oid.to_der().unwrap(), value].concat())
}

/// What the generated PCK certificate says about its platform.
#[derive(Debug, Clone)]
pub struct PckProfile {
    pub compsvn: [u8; 16],
    pub pcesvn: u16,
    pub fmspc: [u8; 6],
    pub pceid: [u8; 2],
    /// Emit an SGX extension that does not decode.
    pub broken_extension: bool,
}

impl Default for PckProfile {
    fn default() -> Self {
        Self {
            compsvn: [5; 16],
            pcesvn: 11,
            fmspc: [0x00, 0x90, 0x6e, 0xd5, 0x00, 0x00],
            pceid: [0x00, 0x00],
            broken_extension: false,
        }
    }
}

/// DER value of the SGX extension for `profile`.
pub fn sgx_extension_der(profile: &PckProfile) -> Vec<u8> {
    if profile.broken_extension {
        return tlv(0x30, &[]);
    }

    let mut tcb = Vec::new();
    for (i, svn) in profile.compsvn.iter().enumerate() {
        tcb.extend(sgx_entry(&format!("2.{}", i + 1), der_uint(*svn as u64)));
    }
    tcb.extend(sgx_entry("2.17", der_uint(profile.pcesvn as u64)));
    tcb.extend(sgx_entry("2.18", tlv(0x04, &profile.compsvn)));

    let entries = [
        sgx_entry("1", tlv(0x04, &[0x11; 16])),
        sgx_entry("2", tlv(0x30, &tcb)),
        sgx_entry("3", tlv(0x04, &profile.pceid)),
        sgx_entry("4", tlv(0x04, &profile.fmspc)),
        sgx_entry("5", tlv(0x0a, &[0x00])),
    ]
    .concat();
    tlv(0x30, &entries)
}

fn certificate_pem(
    serial: u8,
    subject: &str,
    subject_key: &SigningKey,
    issuer: &str,
    issuer_key: &SigningKey,
    extensions: Option<Vec<Extension>>,
) -> String {
    let spki_der = subject_key.verifying_key().to_public_key_der().unwrap();
    let tbs_certificate = TbsCertificate {
        version: Version::V3,
        serial_number: SerialNumber::new(&[serial]).unwrap(),
        signature: ecdsa_with_sha256(),
        issuer: Name::from_str(issuer).unwrap(),
        validity: Validity {
            not_before: utc(NOT_BEFORE),
            not_after: utc(NOT_AFTER),
        },
        subject: Name::from_str(subject).unwrap(),
        subject_public_key_info: SubjectPublicKeyInfoOwned::from_der(spki_der.as_bytes()).unwrap(),
        issuer_unique_id: None,
        subject_unique_id: None,
        extensions,
    };
    let signature: DerSignature = issuer_key.sign(&tbs_certificate.to_der().unwrap());
    let cert = Certificate {
        tbs_certificate,
        signature_algorithm: ecdsa_with_sha256(),
        signature: BitString::from_bytes(signature.as_bytes()).unwrap(),
    };
    pem_block("CERTIFICATE", cert.to_der().unwrap())
}

fn crl_pem(issuer: &str, issuer_key: &SigningKey, revoked: &[&[u8]]) -> String {
    let revoked_certificates = revoked
        .iter()
        .map(|serial| RevokedCert {
            serial_number: SerialNumber::new(serial).unwrap(),
            revocation_date: utc(NOT_BEFORE),
            crl_entry_extensions: None,
        })
        .collect::<Vec<_>>();
    let tbs_cert_list = TbsCertList {
        version: Version::V2,
        signature: ecdsa_with_sha256(),
        issuer: Name::from_str(issuer).unwrap(),
        this_update: utc(NOT_BEFORE),
        next_update: Some(utc(NOT_AFTER)),
        revoked_certificates: (!revoked_certificates.is_empty()).then_some(revoked_certificates),
        crl_extensions: None,
    };
    let signature: DerSignature = issuer_key.sign(&tbs_cert_list.to_der().unwrap());
    let crl = CertificateList {
        tbs_cert_list,
        signature_algorithm: ecdsa_with_sha256(),
        signature: BitString::from_bytes(signature.as_bytes()).unwrap(),
    };
    pem_block("X509 CRL", crl.to_der().unwrap())
}

fn root_pem() -> String {
    certificate_pem(0x01, ROOT_NAME, &key(ROOT_SEED), ROOT_NAME, &key(ROOT_SEED), None)
}

/// Root CA, PCK Platform CA and a PCK certificate.
#[derive(Debug, Clone)]
pub struct PckChainFixture {
    pub intermediate_name: &'static str,
    pub root_pem: String,
    pub intermediate_pem: String,
    pub pck_pem: String,
}

impl PckChainFixture {
    /// Leaf first, as carried in quotes.
    pub fn chain_pem(&self) -> String {
        format!("{}{}{}", self.pck_pem, self.intermediate_pem, self.root_pem)
    }

    pub fn root_crl_pem(&self, revoked: &[&[u8]]) -> String {
        crl_pem(ROOT_NAME, &key(ROOT_SEED), revoked)
    }

    pub fn intermediate_crl_pem(&self, revoked: &[&[u8]]) -> String {
        crl_pem(self.intermediate_name, &key(INTERMEDIATE_SEED), revoked)
    }
}

pub fn pck_chain(profile: &PckProfile) -> PckChainFixture {
    pck_chain_under(profile, INTERMEDIATE_NAME)
}

/// Like [`pck_chain`], with the intermediate CA (and so the PCK issuer) named `intermediate_name`.
pub fn pck_chain_under(profile: &PckProfile, intermediate_name: &'static str) -> PckChainFixture {
    let sgx_extension = Extension {
        extn_id: SGX_EXTENSIONS_OID,
        critical: false,
        extn_value: OctetString::new(sgx_extension_der(profile)).unwrap(),
    };
    PckChainFixture {
        intermediate_name,
        root_pem: root_pem(),
        intermediate_pem: certificate_pem(
            0x02,
            intermediate_name,
            &key(INTERMEDIATE_SEED),
            ROOT_NAME,
            &key(ROOT_SEED),
            None,
        ),
        pck_pem: certificate_pem(
            0x10,
            PCK_NAME,
            &key(PCK_SEED),
            intermediate_name,
            &key(INTERMEDIATE_SEED),
            Some(vec![sgx_extension]),
        ),
    }
}

/// Root CA and the TCB signing certificate, plus a look-alike root with another key.
#[derive(Debug, Clone)]
pub struct TcbSigningFixture {
    pub root_pem: String,
    pub signing_pem: String,
    pub other_root_pem: String,
}

impl TcbSigningFixture {
    pub fn chain_pem(&self) -> String {
        format!("{}{}", self.signing_pem, self.root_pem)
    }

    pub fn root_crl_pem(&self, revoked: &[&[u8]]) -> String {
        crl_pem(ROOT_NAME, &key(ROOT_SEED), revoked)
    }
}

pub fn tcb_signing_chain() -> TcbSigningFixture {
    TcbSigningFixture {
        root_pem: root_pem(),
        signing_pem: certificate_pem(
            0x03,
            TCB_SIGNING_NAME,
            &key(TCB_SIGNING_SEED),
            ROOT_NAME,
            &key(ROOT_SEED),
            None,
        ),
        other_root_pem: certificate_pem(
            0x01,
            ROOT_NAME,
            &key(OTHER_ROOT_SEED),
            ROOT_NAME,
            &key(OTHER_ROOT_SEED),
            None,
        ),
    }
}

fn sign_with(seed: u8, body_key: &str, body: &Value) -> String {
    let body_text = serde_json::to_string(body).unwrap();
    let signature: Signature = key(seed).sign(body_text.as_bytes());
    format!(
        r#"{{"{body_key}":{body_text},"signature":"{}"}}"#,
        hex::encode(signature.to_bytes())
    )
}

/// Wrap `body` under `body_key` and sign it with the TCB signing key.
pub fn sign_document(body_key: &str, body: &Value) -> String {
    sign_with(TCB_SIGNING_SEED, body_key, body)
}

/// One TCB level of a generated TCB info document.
#[derive(Debug, Clone)]
pub struct LevelSpec {
    pub sgx: [u8; 16],
    /// Only emitted by TDX documents.
    pub tdx: Option<[u8; 16]>,
    pub pcesvn: u16,
    pub status: String,
}

impl LevelSpec {
    fn new(sgx: u8, pcesvn: u16, status: &str) -> Self {
        Self {
            sgx: [sgx; 16],
            tdx: None,
            pcesvn,
            status: status.into(),
        }
    }

    fn with_tdx(mut self, tdx: u8) -> Self {
        self.tdx = Some([tdx; 16]);
        self
    }
}

fn components(svns: &[u8; 16]) -> Value {
    svns.iter().map(|svn| json!({ "svn": svn })).collect()
}

#[derive(Debug, Clone)]
pub struct TcbInfoBuilder {
    pub version: u32,
    pub id: String,
    pub fmspc: String,
    pub pce_id: String,
    pub next_update: String,
    pub with_tdx_module: bool,
    pub tdx_module_mrsigner: String,
    pub signer_seed: u8,
    pub levels: Vec<LevelSpec>,
}

impl TcbInfoBuilder {
    fn new(version: u32, id: &str) -> Self {
        Self {
            version,
            id: id.into(),
            fmspc: "00906ED50000".into(),
            pce_id: "0000".into(),
            next_update: NEXT_UPDATE.into(),
            with_tdx_module: false,
            tdx_module_mrsigner: hex::encode([0u8; 48]),
            signer_seed: TCB_SIGNING_SEED,
            levels: vec![
                LevelSpec::new(5, 11, "UpToDate"),
                LevelSpec::new(3, 10, "OutOfDate"),
                LevelSpec::new(1, 5, "Revoked"),
            ],
        }
    }

    pub fn sgx_v2() -> Self {
        Self::new(2, "SGX")
    }

    pub fn sgx_v3() -> Self {
        Self::new(3, "SGX")
    }

    pub fn tdx_v3() -> Self {
        Self {
            with_tdx_module: true,
            levels: vec![
                LevelSpec::new(5, 11, "UpToDate").with_tdx(3),
                LevelSpec::new(3, 10, "OutOfDate").with_tdx(2),
            ],
            ..Self::new(3, "TDX")
        }
    }

    pub fn signing_key(&self) -> SigningKey {
        key(self.signer_seed)
    }

    fn level(&self, level: &LevelSpec) -> Value {
        let tcb = if self.version == 2 {
            let mut tcb = Map::new();
            for (i, svn) in level.sgx.iter().enumerate() {
                tcb.insert(format!("sgxtcbcomp{:02}svn", i + 1), json!(svn));
            }
            tcb.insert("pcesvn".into(), json!(level.pcesvn));
            Value::Object(tcb)
        } else {
            let mut tcb = json!({
                "sgxtcbcomponents": components(&level.sgx),
                "pcesvn": level.pcesvn,
            });
            if self.id == "TDX" {
                tcb["tdxtcbcomponents"] = components(&level.tdx.unwrap_or([0; 16]));
            }
            tcb
        };

        let mut value = json!({
            "tcb": tcb,
            "tcbDate": TCB_DATE,
            "tcbStatus": level.status,
        });
        if level.status != "UpToDate" {
            value["advisoryIDs"] = json!(["INTEL-SA-00615"]);
        }
        value
    }

    pub fn body(&self) -> Value {
        let mut body = json!({
            "version": self.version,
            "issueDate": ISSUE_DATE,
            "nextUpdate": self.next_update,
            "fmspc": self.fmspc,
            "pceId": self.pce_id,
            "tcbType": 0,
            "tcbEvaluationDataNumber": 17,
            "tcbLevels": self.levels.iter().map(|level| self.level(level)).collect::<Vec<_>>(),
        });
        if self.version >= 3 {
            body["id"] = json!(self.id);
        }
        if self.with_tdx_module {
            body["tdxModule"] = json!({
                "mrsigner": self.tdx_module_mrsigner,
                "attributes": "0000000000000000",
                "attributesMask": "FFFFFFFFFFFFFFFF",
            });
        }
        body
    }

    pub fn build_signed(&self) -> String {
        sign_with(self.signer_seed, "tcbInfo", &self.body())
    }
}

#[derive(Debug, Clone)]
pub struct IdentityBuilder {
    pub version: u32,
    pub id: String,
    pub issue_date: String,
    pub next_update: String,
    pub miscselect: String,
    pub mrsigner: String,
    pub isvprodid: u16,
    pub signer_seed: u8,
}

impl IdentityBuilder {
    fn new(version: u32) -> Self {
        Self {
            version,
            id: "QE".into(),
            issue_date: ISSUE_DATE.into(),
            next_update: NEXT_UPDATE.into(),
            miscselect: "00000000".into(),
            mrsigner: hex::encode(IDENTITY_MRSIGNER),
            isvprodid: 1,
            signer_seed: TCB_SIGNING_SEED,
        }
    }

    /// Levels: 8 UpToDate, 6 OutOfDate, 5 Revoked.
    pub fn qe_v2() -> Self {
        Self::new(2)
    }

    /// Minimum ISV SVN 8.
    pub fn qe_v1() -> Self {
        Self::new(1)
    }

    pub fn build_signed(&self) -> String {
        let mut body = json!({
            "version": self.version,
            "issueDate": self.issue_date,
            "nextUpdate": self.next_update,
            "miscselect": self.miscselect,
            "miscselectMask": "FFFFFFFF",
            "attributes": "11000000000000000000000000000000",
            "attributesMask": "FBFFFFFFFFFFFFFF0000000000000000",
            "mrsigner": self.mrsigner,
            "isvprodid": self.isvprodid,
        });

        if self.version == 1 {
            body["isvsvn"] = json!(8);
            return sign_with(self.signer_seed, "qeIdentity", &body);
        }

        body["id"] = json!(self.id);
        body["tcbEvaluationDataNumber"] = json!(17);
        body["tcbLevels"] = json!([
            {"tcb": {"isvsvn": 8}, "tcbDate": TCB_DATE, "tcbStatus": "UpToDate"},
            {"tcb": {"isvsvn": 6}, "tcbDate": TCB_DATE, "tcbStatus": "OutOfDate", "advisoryIDs": ["INTEL-SA-00615"]},
            {"tcb": {"isvsvn": 5}, "tcbDate": TCB_DATE, "tcbStatus": "Revoked", "advisoryIDs": ["INTEL-SA-00615"]},
        ]);
        sign_with(self.signer_seed, "enclaveIdentity", &body)
    }
}

/// A QE report accepted by [`IdentityBuilder::qe_v2`], at the given ISV SVN.
pub fn qe_report_matching(isv_svn: u16) -> EnclaveReportBody {
    let mut report = EnclaveReportBody::new_zeroed();
    report.attributes[0] = 0x11;
    report.mr_signer = IDENTITY_MRSIGNER;
    report.isv_prod_id = 1u16.into();
    report.isv_svn = isv_svn.into();
    report
}

/// Assembles a signed quote whose QE report is signed by the fixture PCK key.
#[derive(Debug, Clone)]
pub struct QuoteBuilder {
    pub version: u16,
    pub attestation_key_type: u16,
    pub tee_type: u32,
    pub qe_vendor_id: [u8; 16],
    /// Type of the certification data that identifies the PCK.
    pub cert_type: u16,
    pub tee_tcb_svn: [u8; 16],
    pub qe_isv_svn: u16,
    /// Replaces the report data that binds the attestation key.
    pub qe_report_data: Option<[u8; 64]>,
    pub pck_chain_pem: String,
}

impl QuoteBuilder {
    fn new(version: u16, tee_type: u32) -> Self {
        Self {
            version,
            attestation_key_type: 2,
            tee_type,
            qe_vendor_id: INTEL_QE_VENDOR_ID,
            cert_type: 5,
            tee_tcb_svn: [3; 16],
            qe_isv_svn: 8,
            qe_report_data: None,
            pck_chain_pem: pck_chain(&PckProfile::default()).chain_pem(),
        }
    }

    pub fn sgx_v3() -> Self {
        Self::new(QUOTE_V3, SGX_TEE_TYPE)
    }

    pub fn tdx_v4() -> Self {
        Self::new(QUOTE_V4, TDX_TEE_TYPE)
    }

    fn header(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(48);
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&self.attestation_key_type.to_le_bytes());
        out.extend_from_slice(&self.tee_type.to_le_bytes());
        out.extend_from_slice(&7u16.to_le_bytes());
        out.extend_from_slice(&11u16.to_le_bytes());
        out.extend_from_slice(&self.qe_vendor_id);
        out.extend_from_slice(&[0u8; 20]);
        out
    }

    fn body(&self) -> Vec<u8> {
        if self.tee_type == TDX_TEE_TYPE {
            let mut td = TdxReportBody::new_zeroed();
            td.tee_tcb_svn = self.tee_tcb_svn;
            td.report_data = [0x5a; 64];
            td.as_bytes().to_vec()
        } else {
            let mut report = EnclaveReportBody::new_zeroed();
            report.isv_prod_id = 3u16.into();
            report.report_data = [0x5a; 64];
            report.as_bytes().to_vec()
        }
    }

    fn certification_data(cert_type: u16, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(6 + data.len());
        out.extend_from_slice(&cert_type.to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(data);
        out
    }

    pub fn build(&self) -> Vec<u8> {
        let attestation_key = key(ATTESTATION_SEED);
        let attestation_pub = raw_public_key(&attestation_key);
        let qe_auth_data: Vec<u8> = (0u8..32).collect();

        let mut qe_report = qe_report_matching(self.qe_isv_svn);
        match self.qe_report_data {
            Some(data) => qe_report.report_data = data,
            None => {
                let binding = sha256sum(&[attestation_pub.as_slice(), qe_auth_data.as_slice()]);
                qe_report.report_data[..32].copy_from_slice(&binding);
            }
        }
        let qe_report_signature: Signature = key(PCK_SEED).sign(qe_report.as_bytes());

        let mut qe_block = Vec::new();
        qe_block.extend_from_slice(qe_report.as_bytes());
        qe_block.extend_from_slice(&qe_report_signature.to_bytes());
        qe_block.extend_from_slice(&(qe_auth_data.len() as u16).to_le_bytes());
        qe_block.extend_from_slice(&qe_auth_data);
        qe_block.extend(Self::certification_data(self.cert_type, self.pck_chain_pem.as_bytes()));

        let mut out = self.header();
        out.extend(self.body());
        let signature: Signature = attestation_key.sign(&out);

        let mut auth = Vec::new();
        auth.extend_from_slice(&signature.to_bytes());
        auth.extend_from_slice(&attestation_pub);
        if self.version == QUOTE_V3 {
            auth.extend(qe_block);
        } else {
            auth.extend(Self::certification_data(6, &qe_block));
        }

        out.extend_from_slice(&(auth.len() as u32).to_le_bytes());
        out.extend(auth);
        out
    }
}
