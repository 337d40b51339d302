//! Ledger key layout for every document category.
//!
//! All key construction lives here so that direct lookups and prefix scans
//! can never drift apart. Hospitals and doctors keep the legacy plain-key
//! shapes (`hospitalId` and `{hospitalId}_DOCTOR_{doctorId}`); every other
//! category uses composite keys.

use medledger_store::{KeyPrefix, LedgerKey};

use crate::constants::{
    DOC_CLAIM, DOC_CONSENT, DOC_DESCRIPTION, DOC_DIAGNOSTICS, DOC_INSURANCE, DOC_INSURANCE_AGENT,
    DOC_MEDICINE_STOCK, DOC_PATIENT, DOC_PHARMACY, DOC_RECORD, DOC_RESEARCHER, DOC_REWARD,
    DOCTOR_KEY_INFIX,
};
use crate::error::LedgerResult;

pub fn hospital(hospital_id: &str) -> LedgerKey {
    LedgerKey::plain(hospital_id)
}

pub fn doctor(hospital_id: &str, doctor_id: &str) -> LedgerKey {
    LedgerKey::plain(format!("{hospital_id}{DOCTOR_KEY_INFIX}{doctor_id}"))
}

pub fn doctors_of_hospital(hospital_id: &str) -> KeyPrefix {
    KeyPrefix::plain(format!("{hospital_id}{DOCTOR_KEY_INFIX}"))
}

pub fn patient(patient_id: &str) -> LedgerResult<LedgerKey> {
    Ok(LedgerKey::composite(DOC_PATIENT, &[patient_id])?)
}

pub fn patients() -> LedgerResult<KeyPrefix> {
    Ok(KeyPrefix::category(DOC_PATIENT, &[])?)
}

pub fn consent(patient_id: &str, entity_id: &str) -> LedgerResult<LedgerKey> {
    Ok(LedgerKey::composite(DOC_CONSENT, &[patient_id, entity_id])?)
}

pub fn record(patient_id: &str, record_id: &str) -> LedgerResult<LedgerKey> {
    Ok(LedgerKey::composite(DOC_RECORD, &[patient_id, record_id])?)
}

pub fn records_of_patient(patient_id: &str) -> LedgerResult<KeyPrefix> {
    Ok(KeyPrefix::category(DOC_RECORD, &[patient_id])?)
}

pub fn all_records() -> LedgerResult<KeyPrefix> {
    Ok(KeyPrefix::category(DOC_RECORD, &[])?)
}

pub fn description(patient_id: &str, description_id: &str) -> LedgerResult<LedgerKey> {
    Ok(LedgerKey::composite(DOC_DESCRIPTION, &[patient_id, description_id])?)
}

pub fn descriptions_of_patient(patient_id: &str) -> LedgerResult<KeyPrefix> {
    Ok(KeyPrefix::category(DOC_DESCRIPTION, &[patient_id])?)
}

pub fn medicine_stock(pharmacy_id: &str, medicine_name: &str) -> LedgerResult<LedgerKey> {
    Ok(LedgerKey::composite(DOC_MEDICINE_STOCK, &[pharmacy_id, medicine_name])?)
}

pub fn insurance(policy_number: &str) -> LedgerResult<LedgerKey> {
    Ok(LedgerKey::composite(DOC_INSURANCE, &[policy_number])?)
}

pub fn claim(claim_id: &str) -> LedgerResult<LedgerKey> {
    Ok(LedgerKey::composite(DOC_CLAIM, &[claim_id])?)
}

pub fn claims() -> LedgerResult<KeyPrefix> {
    Ok(KeyPrefix::category(DOC_CLAIM, &[])?)
}

pub fn reward(patient_id: &str) -> LedgerResult<LedgerKey> {
    Ok(LedgerKey::composite(DOC_REWARD, &[patient_id])?)
}

pub fn diagnostics_center(center_id: &str) -> LedgerResult<LedgerKey> {
    Ok(LedgerKey::composite(DOC_DIAGNOSTICS, &[center_id])?)
}

pub fn pharmacy(pharmacy_id: &str) -> LedgerResult<LedgerKey> {
    Ok(LedgerKey::composite(DOC_PHARMACY, &[pharmacy_id])?)
}

pub fn researcher(researcher_id: &str) -> LedgerResult<LedgerKey> {
    Ok(LedgerKey::composite(DOC_RESEARCHER, &[researcher_id])?)
}

pub fn insurance_agent(agent_id: &str) -> LedgerResult<LedgerKey> {
    Ok(LedgerKey::composite(DOC_INSURANCE_AGENT, &[agent_id])?)
}
