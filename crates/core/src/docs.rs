//! Persisted document model and canonical codec.
//!
//! Every document carries a `docType` discriminator matching its key
//! category, and camelCase field names on the wire. Documents are encoded
//! through [`encode_doc`], which routes serialization via `serde_json::Value`
//! so that object keys are emitted in sorted order: identical logical
//! documents must produce byte-identical ledger entries on every replica.

use chrono::{DateTime, Utc};
use medledger_store::{LedgerKey, StateStore};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

/// Encodes a document with canonical, key-sorted JSON.
///
/// `serde_json`'s map type is ordered by key (the `preserve_order` feature is
/// deliberately not enabled anywhere in this workspace), so converting to a
/// `Value` first makes the byte encoding independent of struct field order.
pub fn encode_doc<T: Serialize>(doc: &T) -> LedgerResult<Vec<u8>> {
    let value = serde_json::to_value(doc)?;
    Ok(serde_json::to_vec(&value)?)
}

/// Decodes a document previously written with [`encode_doc`].
pub fn decode_doc<T: DeserializeOwned>(bytes: &[u8]) -> LedgerResult<T> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Reads and decodes the document under `key`, if present.
pub(crate) fn read_doc<S: StateStore, T: DeserializeOwned>(
    store: &S,
    key: &LedgerKey,
) -> LedgerResult<Option<T>> {
    match store.get(key)? {
        Some(bytes) => Ok(Some(decode_doc(&bytes)?)),
        None => Ok(None),
    }
}

/// Reads the document under `key`, failing with `NotFound` when absent.
pub(crate) fn require_doc<S: StateStore, T: DeserializeOwned>(
    store: &S,
    key: &LedgerKey,
    what: &'static str,
    id: &str,
) -> LedgerResult<T> {
    read_doc(store, key)?.ok_or_else(|| LedgerError::NotFound {
        what,
        id: id.to_owned(),
    })
}

/// Canonically encodes and writes a document under `key`.
pub(crate) fn write_doc<S: StateStore, T: Serialize>(
    store: &mut S,
    key: &LedgerKey,
    doc: &T,
) -> LedgerResult<()> {
    let bytes = encode_doc(doc)?;
    store.put(key, bytes)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Registry documents
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HospitalDoc {
    pub doc_type: String,
    pub hospital_id: String,
    pub name: String,
    pub city: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorDoc {
    pub doc_type: String,
    pub doctor_id: String,
    pub hospital_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientDoc {
    pub doc_type: String,
    pub patient_id: String,
    pub hospital_id: String,
    pub name: String,
    pub dob: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// Entity ids the patient has granted access to. Grows monotonically:
    /// grant operations add, nothing removes.
    pub authorized_entities: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsCenterDoc {
    pub doc_type: String,
    pub center_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// Hospital that onboarded the center.
    pub created_by: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PharmacyDoc {
    pub doc_type: String,
    pub pharmacy_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    pub created_by: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearcherDoc {
    pub doc_type: String,
    pub researcher_id: String,
    pub name: String,
    pub institution: String,
    pub created_by: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsuranceAgentDoc {
    pub doc_type: String,
    pub agent_id: String,
    pub name: String,
    pub insurance_company: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    pub created_by: String,
    pub status: String,
    pub wallet_balance: u64,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Consent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentStatus {
    Approved,
    Revoked,
}

/// Per-(patient, entity) consent record, distinct from plain membership in
/// the patient's `authorizedEntities` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentDoc {
    pub doc_type: String,
    pub patient_id: String,
    pub entity_id: String,
    pub entity_role: String,
    pub status: ConsentStatus,
    pub granted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Clinical records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabReport {
    pub lab_id: String,
    pub report_type: String,
    pub report_data: String,
    pub created_at: DateTime<Utc>,
}

/// One dispense event as recorded on the clinical record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispensedMedicine {
    pub medicine_name: String,
    pub quantity: u64,
    pub pharmacy_id: String,
    pub dispensed_at: DateTime<Utc>,
}

/// A doctor-authored diagnosis/prescription record, or a diagnostics-authored
/// lab report (which carries no `doctorId` and a nested `labReport`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalRecordDoc {
    pub doc_type: String,
    pub record_id: String,
    pub patient_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prescription: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lab_report: Option<LabReport>,
    #[serde(default)]
    pub dispensed_medicines: Vec<DispensedMedicine>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Free-text description uploaded by a doctor, stored separately from the
/// clinical record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptionDoc {
    pub doc_type: String,
    pub description_id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Pharmacy stock
// ---------------------------------------------------------------------------

/// One dispense event as recorded on the stock document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispenseHistoryEntry {
    pub patient_id: String,
    pub record_id: String,
    pub quantity: u64,
    pub dispensed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicineStockDoc {
    pub doc_type: String,
    pub pharmacy_id: String,
    pub medicine_name: String,
    /// Units on hand. Never negative: dispensing checks availability first.
    pub quantity: u64,
    #[serde(default)]
    pub dispensed_history: Vec<DispenseHistoryEntry>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Financial documents
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsurancePolicyDoc {
    pub doc_type: String,
    pub policy_number: String,
    /// Id of the admin or agent that issued the policy.
    pub insurance_id: String,
    pub insurance_company: String,
    pub patient_id: String,
    pub coverage_amount: u64,
    /// Claims are tracked as separate documents; this list is kept for wire
    /// compatibility and stays empty.
    #[serde(default)]
    pub claims: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimStatus {
    Pending,
    Approved,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimDoc {
    pub doc_type: String,
    pub claim_id: String,
    pub policy_number: String,
    pub patient_id: String,
    pub insurance_id: String,
    pub insurance_company: String,
    pub amount: u64,
    pub reason: String,
    pub status: ClaimStatus,
    pub requested_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardDoc {
    pub doc_type: String,
    pub patient_id: String,
    /// Point balance. Never negative: debits check the balance first.
    pub balance: u64,
    pub updated_at: DateTime<Utc>,
}
