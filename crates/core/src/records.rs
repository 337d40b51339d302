//! Clinical record store.
//!
//! Doctor-authored diagnosis/prescription records and free-text
//! descriptions, plus the diagnostics-authored lab-report path. Record ids
//! are derived from the transaction id, which is globally unique and
//! identical on every replica, so no counter document is needed.

use medledger_store::{StateStore, TxMeta};

use crate::config::LedgerPolicy;
use crate::constants::{DOC_DESCRIPTION, DOC_RECORD};
use crate::consent::can_view_patient_data;
use crate::docs::{
    require_doc, write_doc, ClinicalRecordDoc, DescriptionDoc, LabReport, PatientDoc,
};
use crate::error::{LedgerError, LedgerResult};
use crate::identity::{Caller, Role};
use crate::keys;
use crate::validation::{optional_text, required_id, required_text};

/// Clinical record operations, scoped to one transaction.
pub struct RecordService<'a, S: StateStore> {
    store: &'a mut S,
    policy: &'a LedgerPolicy,
    caller: &'a Caller,
    tx: &'a TxMeta,
}

impl<'a, S: StateStore> RecordService<'a, S> {
    pub fn new(
        store: &'a mut S,
        policy: &'a LedgerPolicy,
        caller: &'a Caller,
        tx: &'a TxMeta,
    ) -> Self {
        Self {
            store,
            policy,
            caller,
            tx,
        }
    }

    /// Requires the caller to be a doctor that the patient has granted access
    /// to, returning the doctor id.
    fn require_authorized_doctor(&self, patient: &PatientDoc) -> LedgerResult<String> {
        let doctor_id = self.caller.require_role(Role::Doctor)?;
        if !patient.authorized_entities.iter().any(|e| e == doctor_id) {
            return Err(LedgerError::Authorization(format!(
                "doctor {} is not authorized for patient {}",
                doctor_id, patient.patient_id
            )));
        }
        Ok(doctor_id.to_owned())
    }

    /// Creates a new clinical record authored by the calling doctor.
    ///
    /// The record id has the form `R-<txid>`.
    ///
    /// # Errors
    ///
    /// `NotFound` when the patient is absent; `Authorization` unless the
    /// caller is a doctor present in the patient's `authorizedEntities`.
    pub fn add_record(
        &mut self,
        patient_id: &str,
        diagnosis: &str,
        prescription: Option<&str>,
    ) -> LedgerResult<ClinicalRecordDoc> {
        let patient_id = required_id(patient_id, "patientId")?;
        let diagnosis = required_text(diagnosis, "diagnosis")?;

        let patient: PatientDoc = require_doc(
            &*self.store,
            &keys::patient(patient_id.as_str())?,
            "patient",
            patient_id.as_str(),
        )?;
        let doctor_id = self.require_authorized_doctor(&patient)?;

        let record_id = format!("R-{}", self.tx.id);
        let record = ClinicalRecordDoc {
            doc_type: DOC_RECORD.to_owned(),
            record_id: record_id.clone(),
            patient_id: patient_id.as_str().to_owned(),
            doctor_id: Some(doctor_id),
            diagnosis: Some(diagnosis.into_inner()),
            prescription: optional_text(prescription),
            lab_report: None,
            dispensed_medicines: Vec::new(),
            created_at: self.tx.timestamp,
            updated_at: self.tx.timestamp,
        };
        write_doc(
            self.store,
            &keys::record(patient_id.as_str(), &record_id)?,
            &record,
        )?;
        Ok(record)
    }

    /// Updates the diagnosis and/or prescription of an existing record.
    ///
    /// Only the doctor that authored the record may update it, a stricter
    /// gate than the patient-level authorization, which is also re-checked.
    /// `patientId` and `doctorId` are immutable.
    pub fn update_patient_record(
        &mut self,
        patient_id: &str,
        record_id: &str,
        diagnosis: Option<&str>,
        prescription: Option<&str>,
    ) -> LedgerResult<ClinicalRecordDoc> {
        let patient_id = required_id(patient_id, "patientId")?;
        let record_id = required_id(record_id, "recordId")?;

        let patient: PatientDoc = require_doc(
            &*self.store,
            &keys::patient(patient_id.as_str())?,
            "patient",
            patient_id.as_str(),
        )?;
        let doctor_id = self.require_authorized_doctor(&patient)?;

        let record_key = keys::record(patient_id.as_str(), record_id.as_str())?;
        let mut record: ClinicalRecordDoc =
            require_doc(&*self.store, &record_key, "record", record_id.as_str())?;

        if record.doctor_id.as_deref() != Some(doctor_id.as_str()) {
            return Err(LedgerError::Authorization(format!(
                "only the authoring doctor may update record {}",
                record_id.as_str()
            )));
        }

        if let Some(diagnosis) = optional_text(diagnosis) {
            record.diagnosis = Some(diagnosis);
        }
        if let Some(prescription) = optional_text(prescription) {
            record.prescription = Some(prescription);
        }
        record.updated_at = self.tx.timestamp;

        write_doc(self.store, &record_key, &record)?;
        Ok(record)
    }

    /// Uploads a free-text description for a patient, stored as its own
    /// document category rather than merged into a clinical record.
    pub fn upload_patient_description(
        &mut self,
        patient_id: &str,
        description: &str,
    ) -> LedgerResult<DescriptionDoc> {
        let patient_id = required_id(patient_id, "patientId")?;
        let description = required_text(description, "description")?;

        let patient: PatientDoc = require_doc(
            &*self.store,
            &keys::patient(patient_id.as_str())?,
            "patient",
            patient_id.as_str(),
        )?;
        let doctor_id = self.require_authorized_doctor(&patient)?;

        let description_id = format!("desc-{}", self.tx.id);
        let doc = DescriptionDoc {
            doc_type: DOC_DESCRIPTION.to_owned(),
            description_id: description_id.clone(),
            patient_id: patient_id.as_str().to_owned(),
            doctor_id,
            description: description.into_inner(),
            created_at: self.tx.timestamp,
        };
        write_doc(
            self.store,
            &keys::description(patient_id.as_str(), &description_id)?,
            &doc,
        )?;
        Ok(doc)
    }

    /// Uploads a lab report for a patient.
    ///
    /// Restricted to diagnostics centers in the diagnostics organization.
    /// The report is stored under the record category with id `lab-<txid>`
    /// and a nested `labReport` object, independent of any doctor-authored
    /// record.
    pub fn upload_lab_report(
        &mut self,
        patient_id: &str,
        report_type: &str,
        report_data: &str,
    ) -> LedgerResult<ClinicalRecordDoc> {
        let patient_id = required_id(patient_id, "patientId")?;
        let report_type = required_text(report_type, "reportType")?;
        let report_data = required_text(report_data, "reportData")?;

        let lab_id = self.caller.require_role(Role::Diagnostics)?.to_owned();
        self.caller.require_org(self.policy.diagnostics_org())?;

        require_doc::<_, PatientDoc>(
            &*self.store,
            &keys::patient(patient_id.as_str())?,
            "patient",
            patient_id.as_str(),
        )?;

        let record_id = format!("lab-{}", self.tx.id);
        let record = ClinicalRecordDoc {
            doc_type: DOC_RECORD.to_owned(),
            record_id: record_id.clone(),
            patient_id: patient_id.as_str().to_owned(),
            doctor_id: None,
            diagnosis: None,
            prescription: None,
            lab_report: Some(LabReport {
                lab_id,
                report_type: report_type.into_inner(),
                report_data: report_data.into_inner(),
                created_at: self.tx.timestamp,
            }),
            dispensed_medicines: Vec::new(),
            created_at: self.tx.timestamp,
            updated_at: self.tx.timestamp,
        };
        write_doc(
            self.store,
            &keys::record(patient_id.as_str(), &record_id)?,
            &record,
        )?;
        Ok(record)
    }

    /// Reads a single clinical record, gated by the central authorization
    /// predicate.
    pub fn get_record(
        &self,
        patient_id: &str,
        record_id: &str,
    ) -> LedgerResult<ClinicalRecordDoc> {
        let patient_id = required_id(patient_id, "patientId")?;
        let record_id = required_id(record_id, "recordId")?;

        if !can_view_patient_data(&*self.store, self.caller, patient_id.as_str())? {
            return Err(LedgerError::Authorization(format!(
                "caller is not permitted to view data of patient {}",
                patient_id.as_str()
            )));
        }

        require_doc(
            &*self.store,
            &keys::record(patient_id.as_str(), record_id.as_str())?,
            "record",
            record_id.as_str(),
        )
    }
}
