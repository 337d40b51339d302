//! Query/projection engine.
//!
//! Read-only views composed from the clinical, consent, and financial
//! categories. Every per-patient row passes through the central authorization
//! predicate (or, for the system-wide feeds, the per-row consent re-check)
//! before it appears in a result. Scans are drained through the store cursor
//! and undecodable documents are skipped with a warning rather than failing
//! the whole view.
//!
//! All list views return plain vectors; an empty result is an empty vector,
//! never a message object.

use chrono::{DateTime, Utc};
use medledger_store::{KeyPrefix, StateStore};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::consent::{can_view_patient_data, has_approved_consent};
use crate::constants::DOC_DOCTOR;
use crate::docs::{
    decode_doc, require_doc, ClaimDoc, ClinicalRecordDoc, DescriptionDoc, DoctorDoc, PatientDoc,
};
use crate::error::{LedgerError, LedgerResult};
use crate::identity::{Caller, Role};
use crate::keys;
use crate::validation::{required_id, required_text};

/// One row of a patient's aggregate history: either a clinical record (which
/// covers lab reports) or an uploaded description.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HistoryEntry {
    Record(ClinicalRecordDoc),
    Description(DescriptionDoc),
}

impl HistoryEntry {
    fn created_at(&self) -> DateTime<Utc> {
        match self {
            HistoryEntry::Record(record) => record.created_at,
            HistoryEntry::Description(description) => description.created_at,
        }
    }
}

/// A patient together with their clinical records, for the doctor roster
/// view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientWithRecords {
    #[serde(flatten)]
    pub patient: PatientDoc,
    pub records: Vec<ClinicalRecordDoc>,
}

/// Read-only query operations.
pub struct QueryService<'a, S: StateStore> {
    store: &'a S,
    caller: &'a Caller,
}

impl<'a, S: StateStore> QueryService<'a, S> {
    pub fn new(store: &'a S, caller: &'a Caller) -> Self {
        Self { store, caller }
    }

    /// Drains a prefix scan into typed documents, skipping rows that fail to
    /// decode.
    fn collect<T: DeserializeOwned>(&self, prefix: &KeyPrefix) -> LedgerResult<Vec<T>> {
        let mut docs = Vec::new();
        for entry in self.store.scan_prefix(prefix)? {
            let entry = entry?;
            match decode_doc::<T>(&entry.value) {
                Ok(doc) => docs.push(doc),
                Err(err) => {
                    tracing::warn!(key = %entry.key, error = %err, "skipping undecodable document");
                }
            }
        }
        Ok(docs)
    }

    /// Verifies the caller may read `patient_id`'s data, failing with
    /// `NotFound` for an absent patient and `Authorization` otherwise.
    fn require_patient_access(&self, patient_id: &str) -> LedgerResult<()> {
        require_doc::<_, PatientDoc>(
            self.store,
            &keys::patient(patient_id)?,
            "patient",
            patient_id,
        )?;
        if !can_view_patient_data(self.store, self.caller, patient_id)? {
            return Err(LedgerError::Authorization(format!(
                "caller is not permitted to view data of patient {patient_id}"
            )));
        }
        Ok(())
    }

    /// Returns a patient's full history (clinical records, lab reports, and
    /// descriptions) sorted ascending by creation time.
    ///
    /// This is the building block for the prescription and report filter
    /// views.
    pub fn get_all_records_by_patient_id(
        &self,
        patient_id: &str,
    ) -> LedgerResult<Vec<HistoryEntry>> {
        let patient_id = required_id(patient_id, "patientId")?;
        self.require_patient_access(patient_id.as_str())?;

        let mut entries: Vec<HistoryEntry> = Vec::new();
        for record in
            self.collect::<ClinicalRecordDoc>(&keys::records_of_patient(patient_id.as_str())?)?
        {
            entries.push(HistoryEntry::Record(record));
        }
        for description in
            self.collect::<DescriptionDoc>(&keys::descriptions_of_patient(patient_id.as_str())?)?
        {
            entries.push(HistoryEntry::Description(description));
        }

        entries.sort_by_key(HistoryEntry::created_at);
        Ok(entries)
    }

    /// The full sorted history view (alias over the aggregate union).
    pub fn get_all_treatment_history(&self, patient_id: &str) -> LedgerResult<Vec<HistoryEntry>> {
        self.get_all_records_by_patient_id(patient_id)
    }

    /// Returns the patient's records that carry a prescription.
    pub fn get_patient_prescriptions(
        &self,
        patient_id: &str,
    ) -> LedgerResult<Vec<ClinicalRecordDoc>> {
        let entries = self.get_all_records_by_patient_id(patient_id)?;
        Ok(entries
            .into_iter()
            .filter_map(|entry| match entry {
                HistoryEntry::Record(record) if record.prescription.is_some() => Some(record),
                _ => None,
            })
            .collect())
    }

    /// Returns the patient's records that carry a lab report.
    pub fn get_reports_by_patient_id(
        &self,
        patient_id: &str,
    ) -> LedgerResult<Vec<ClinicalRecordDoc>> {
        let entries = self.get_all_records_by_patient_id(patient_id)?;
        Ok(entries
            .into_iter()
            .filter_map(|entry| match entry {
                HistoryEntry::Record(record) if record.lab_report.is_some() => Some(record),
                _ => None,
            })
            .collect())
    }

    /// Requires the caller to be the doctor named in the query.
    fn require_doctor_self(&self, doctor_id: &str) -> LedgerResult<()> {
        let caller_id = self.caller.require_role(Role::Doctor)?;
        if caller_id != doctor_id {
            return Err(LedgerError::Authorization(
                "a doctor can only list their own patients".into(),
            ));
        }
        Ok(())
    }

    /// Lists the patients that have granted access to the calling doctor.
    pub fn get_all_patients_by_doctor(&self, doctor_id: &str) -> LedgerResult<Vec<PatientDoc>> {
        let doctor_id = required_id(doctor_id, "doctorId")?;
        self.require_doctor_self(doctor_id.as_str())?;

        let patients: Vec<PatientDoc> = self.collect(&keys::patients()?)?;
        Ok(patients
            .into_iter()
            .filter(|p| p.authorized_entities.iter().any(|e| e == doctor_id.as_str()))
            .collect())
    }

    /// Like [`QueryService::get_all_patients_by_doctor`], with each patient's
    /// clinical records attached.
    pub fn get_all_patients_with_records_by_doctor(
        &self,
        doctor_id: &str,
    ) -> LedgerResult<Vec<PatientWithRecords>> {
        let patients = self.get_all_patients_by_doctor(doctor_id)?;
        let mut result = Vec::with_capacity(patients.len());
        for patient in patients {
            let records =
                self.collect::<ClinicalRecordDoc>(&keys::records_of_patient(&patient.patient_id)?)?;
            result.push(PatientWithRecords { patient, records });
        }
        Ok(result)
    }

    /// Lists the doctors of a hospital. Hospital-scoped listings are trusted
    /// by construction; no per-row authorization applies.
    pub fn get_all_doctors_by_hospital(&self, hospital_id: &str) -> LedgerResult<Vec<DoctorDoc>> {
        let hospital_id = required_id(hospital_id, "hospitalId")?;
        let doctors: Vec<DoctorDoc> =
            self.collect(&keys::doctors_of_hospital(hospital_id.as_str()))?;
        // The legacy plain keyspace is shared, so the docType filter stays.
        Ok(doctors
            .into_iter()
            .filter(|d| d.doc_type == DOC_DOCTOR)
            .collect())
    }

    /// Lists the patients registered under a hospital.
    pub fn get_all_patients_by_hospital(&self, hospital_id: &str) -> LedgerResult<Vec<PatientDoc>> {
        let hospital_id = required_id(hospital_id, "hospitalId")?;
        let patients: Vec<PatientDoc> = self.collect(&keys::patients()?)?;
        Ok(patients
            .into_iter()
            .filter(|p| p.hospital_id == hospital_id.as_str())
            .collect())
    }

    /// Lists all claims filed against an insurance company. Restricted to
    /// insurer-side roles.
    pub fn get_all_claims_by_insurance(
        &self,
        insurance_company: &str,
    ) -> LedgerResult<Vec<ClaimDoc>> {
        let insurance_company = required_text(insurance_company, "insuranceCompany")?;
        self.caller
            .require_any_role(&[Role::InsuranceAdmin, Role::InsuranceAgent])?;

        let claims: Vec<ClaimDoc> = self.collect(&keys::claims()?)?;
        Ok(claims
            .into_iter()
            .filter(|c| c.insurance_company == insurance_company.as_str())
            .collect())
    }

    /// Lists the calling patient's claims. The patient id comes from the
    /// caller identity, never from request input.
    pub fn get_all_claims_by_patient(&self) -> LedgerResult<Vec<ClaimDoc>> {
        let patient_id = self.caller.require_role(Role::Patient)?.to_owned();
        let claims: Vec<ClaimDoc> = self.collect(&keys::claims()?)?;
        Ok(claims
            .into_iter()
            .filter(|c| c.patient_id == patient_id)
            .collect())
    }

    /// Roles admitted to the system-wide prescription and lab-report feeds.
    const FEED_ROLES: &'static [Role] = &[
        Role::Hospital,
        Role::Diagnostics,
        Role::Pharmacy,
        Role::Researcher,
        Role::InsuranceAdmin,
    ];

    /// Applies the per-row consent re-check for researcher and
    /// insurance-admin callers; other feed roles see every row.
    fn feed_rows(
        &self,
        mut records: Vec<ClinicalRecordDoc>,
    ) -> LedgerResult<Vec<ClinicalRecordDoc>> {
        let (role, caller_id) = self.caller.require_any_role(Self::FEED_ROLES)?;
        if matches!(role, Role::Researcher | Role::InsuranceAdmin) {
            let mut filtered = Vec::with_capacity(records.len());
            for record in records {
                if has_approved_consent(self.store, &record.patient_id, caller_id)? {
                    filtered.push(record);
                }
            }
            records = filtered;
        }
        Ok(records)
    }

    /// System-wide feed of records carrying a prescription.
    pub fn get_all_prescriptions(&self) -> LedgerResult<Vec<ClinicalRecordDoc>> {
        let records: Vec<ClinicalRecordDoc> = self.collect(&keys::all_records()?)?;
        self.feed_rows(
            records
                .into_iter()
                .filter(|r| r.prescription.is_some())
                .collect(),
        )
    }

    /// System-wide feed of records carrying a lab report.
    pub fn get_all_lab_reports(&self) -> LedgerResult<Vec<ClinicalRecordDoc>> {
        let records: Vec<ClinicalRecordDoc> = self.collect(&keys::all_records()?)?;
        self.feed_rows(
            records
                .into_iter()
                .filter(|r| r.lab_report.is_some())
                .collect(),
        )
    }
}
