//! Entity registry: onboarding-time create/read/update/delete operations.
//!
//! Hospitals are the bootstrap entities and in turn onboard doctors,
//! diagnostics centers, and pharmacies for themselves; research admins
//! onboard researchers; insurance admins onboard agents. Each operation
//! validates required fields, then uniqueness, then the caller's role and
//! organization, and only then writes.

use medledger_store::{StateStore, TxMeta};

use crate::config::LedgerPolicy;
use crate::constants::{
    DOC_DIAGNOSTICS, DOC_DOCTOR, DOC_HOSPITAL, DOC_INSURANCE_AGENT, DOC_PATIENT, DOC_PHARMACY,
    DOC_RESEARCHER, STATUS_ACTIVE,
};
use crate::consent;
use crate::docs::{
    read_doc, require_doc, write_doc, DiagnosticsCenterDoc, DoctorDoc, HospitalDoc,
    InsuranceAgentDoc, PatientDoc, PharmacyDoc, ResearcherDoc,
};
use crate::error::{LedgerError, LedgerResult};
use crate::identity::{Caller, Role};
use crate::keys;
use crate::validation::{optional_text, required_id, required_text};

/// Partial update of a doctor profile. Only these three fields are mutable;
/// absent fields are left untouched.
#[derive(Debug, Default, Clone)]
pub struct DoctorProfilePatch {
    pub name: Option<String>,
    pub specialization: Option<String>,
    pub city: Option<String>,
}

/// Registry operations, scoped to one transaction.
pub struct RegistryService<'a, S: StateStore> {
    store: &'a mut S,
    policy: &'a LedgerPolicy,
    caller: &'a Caller,
    tx: &'a TxMeta,
}

impl<'a, S: StateStore> RegistryService<'a, S> {
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

    /// Requires the caller to be a hospital in the provider organization and
    /// returns its id.
    fn require_hospital_caller(&self) -> LedgerResult<String> {
        let id = self.caller.require_role(Role::Hospital)?.to_owned();
        self.caller.require_org(self.policy.provider_org())?;
        Ok(id)
    }

    /// Registers a new hospital. This is the bootstrap path and carries no
    /// role restriction.
    ///
    /// # Errors
    ///
    /// `Validation` on missing fields, `Conflict` if the id is taken.
    pub fn register_hospital(
        &mut self,
        hospital_id: &str,
        name: &str,
        city: &str,
    ) -> LedgerResult<HospitalDoc> {
        let hospital_id = required_id(hospital_id, "hospitalId")?;
        let name = required_text(name, "name")?;
        let city = required_text(city, "city")?;

        let key = keys::hospital(hospital_id.as_str());
        if read_doc::<_, HospitalDoc>(&*self.store, &key)?.is_some() {
            return Err(LedgerError::Conflict {
                what: "hospital",
                id: hospital_id.into_inner(),
            });
        }

        let hospital = HospitalDoc {
            doc_type: DOC_HOSPITAL.to_owned(),
            hospital_id: hospital_id.into_inner(),
            name: name.into_inner(),
            city: city.into_inner(),
            created_at: self.tx.timestamp,
        };
        write_doc(self.store, &key, &hospital)?;
        Ok(hospital)
    }

    /// Registers a new patient under a hospital with an empty
    /// `authorizedEntities` list.
    pub fn register_patient(
        &mut self,
        hospital_id: &str,
        patient_id: &str,
        name: &str,
        dob: &str,
        city: Option<&str>,
    ) -> LedgerResult<PatientDoc> {
        let hospital_id = required_id(hospital_id, "hospitalId")?;
        let patient_id = required_id(patient_id, "patientId")?;
        let name = required_text(name, "name")?;
        let dob = required_text(dob, "dob")?;

        require_doc::<_, HospitalDoc>(
            &*self.store,
            &keys::hospital(hospital_id.as_str()),
            "hospital",
            hospital_id.as_str(),
        )?;

        let key = keys::patient(patient_id.as_str())?;
        if read_doc::<_, PatientDoc>(&*self.store, &key)?.is_some() {
            return Err(LedgerError::Conflict {
                what: "patient",
                id: patient_id.into_inner(),
            });
        }

        let patient = PatientDoc {
            doc_type: DOC_PATIENT.to_owned(),
            patient_id: patient_id.into_inner(),
            hospital_id: hospital_id.into_inner(),
            name: name.into_inner(),
            dob: dob.into_inner(),
            city: optional_text(city),
            authorized_entities: Vec::new(),
            created_at: self.tx.timestamp,
            updated_at: self.tx.timestamp,
        };
        write_doc(self.store, &key, &patient)?;
        Ok(patient)
    }

    /// Creates a doctor profile under the calling hospital.
    ///
    /// The key couples hospital and doctor ids, so lookups and deletes are
    /// symmetric, and a hospital can only ever address its own doctors.
    pub fn create_doctor(
        &mut self,
        hospital_id: &str,
        doctor_id: &str,
        name: &str,
        specialization: Option<&str>,
        city: Option<&str>,
    ) -> LedgerResult<DoctorDoc> {
        let hospital_id = required_id(hospital_id, "hospitalId")?;
        let doctor_id = required_id(doctor_id, "doctorId")?;
        let name = required_text(name, "name")?;

        let caller_id = self.require_hospital_caller()?;
        if caller_id != hospital_id.as_str() {
            return Err(LedgerError::Authorization(
                "a hospital can only create doctors for itself".into(),
            ));
        }

        require_doc::<_, HospitalDoc>(
            &*self.store,
            &keys::hospital(hospital_id.as_str()),
            "hospital",
            hospital_id.as_str(),
        )?;

        let key = keys::doctor(hospital_id.as_str(), doctor_id.as_str());
        if read_doc::<_, DoctorDoc>(&*self.store, &key)?.is_some() {
            return Err(LedgerError::Conflict {
                what: "doctor",
                id: doctor_id.into_inner(),
            });
        }

        let doctor = DoctorDoc {
            doc_type: DOC_DOCTOR.to_owned(),
            doctor_id: doctor_id.into_inner(),
            hospital_id: hospital_id.into_inner(),
            name: name.into_inner(),
            specialization: optional_text(specialization),
            city: optional_text(city),
            status: STATUS_ACTIVE.to_owned(),
            created_at: self.tx.timestamp,
            updated_at: self.tx.timestamp,
        };
        write_doc(self.store, &key, &doctor)?;
        Ok(doctor)
    }

    /// Creates a diagnostics center onboarded by the calling hospital.
    pub fn create_diagnostics_center(
        &mut self,
        center_id: &str,
        name: &str,
        city: Option<&str>,
    ) -> LedgerResult<DiagnosticsCenterDoc> {
        let center_id = required_id(center_id, "centerId")?;
        let name = required_text(name, "name")?;
        let caller_id = self.require_hospital_caller()?;

        let key = keys::diagnostics_center(center_id.as_str())?;
        if read_doc::<_, DiagnosticsCenterDoc>(&*self.store, &key)?.is_some() {
            return Err(LedgerError::Conflict {
                what: "diagnostics center",
                id: center_id.into_inner(),
            });
        }

        let center = DiagnosticsCenterDoc {
            doc_type: DOC_DIAGNOSTICS.to_owned(),
            center_id: center_id.into_inner(),
            name: name.into_inner(),
            city: optional_text(city),
            created_by: caller_id,
            status: STATUS_ACTIVE.to_owned(),
            created_at: self.tx.timestamp,
        };
        write_doc(self.store, &key, &center)?;
        Ok(center)
    }

    /// Creates a pharmacy onboarded by the calling hospital.
    pub fn create_pharmacy(
        &mut self,
        pharmacy_id: &str,
        name: &str,
        city: Option<&str>,
    ) -> LedgerResult<PharmacyDoc> {
        let pharmacy_id = required_id(pharmacy_id, "pharmacyId")?;
        let name = required_text(name, "name")?;
        let caller_id = self.require_hospital_caller()?;

        let key = keys::pharmacy(pharmacy_id.as_str())?;
        if read_doc::<_, PharmacyDoc>(&*self.store, &key)?.is_some() {
            return Err(LedgerError::Conflict {
                what: "pharmacy",
                id: pharmacy_id.into_inner(),
            });
        }

        let pharmacy = PharmacyDoc {
            doc_type: DOC_PHARMACY.to_owned(),
            pharmacy_id: pharmacy_id.into_inner(),
            name: name.into_inner(),
            city: optional_text(city),
            created_by: caller_id,
            status: STATUS_ACTIVE.to_owned(),
            created_at: self.tx.timestamp,
        };
        write_doc(self.store, &key, &pharmacy)?;
        Ok(pharmacy)
    }

    /// Onboards a researcher. Restricted to research admins in the research
    /// organization.
    pub fn onboard_researcher(
        &mut self,
        researcher_id: &str,
        name: &str,
        institution: &str,
    ) -> LedgerResult<ResearcherDoc> {
        let researcher_id = required_id(researcher_id, "researcherId")?;
        let name = required_text(name, "name")?;
        let institution = required_text(institution, "institution")?;

        let caller_id = self.caller.require_role(Role::ResearchAdmin)?.to_owned();
        self.caller.require_org(self.policy.research_org())?;

        let key = keys::researcher(researcher_id.as_str())?;
        if read_doc::<_, ResearcherDoc>(&*self.store, &key)?.is_some() {
            return Err(LedgerError::Conflict {
                what: "researcher",
                id: researcher_id.into_inner(),
            });
        }

        let researcher = ResearcherDoc {
            doc_type: DOC_RESEARCHER.to_owned(),
            researcher_id: researcher_id.into_inner(),
            name: name.into_inner(),
            institution: institution.into_inner(),
            created_by: caller_id,
            status: STATUS_ACTIVE.to_owned(),
            created_at: self.tx.timestamp,
        };
        write_doc(self.store, &key, &researcher)?;
        Ok(researcher)
    }

    /// Onboards an insurance agent with a zero wallet balance. Restricted to
    /// insurance admins in the insurer organization.
    pub fn onboard_insurance_agent(
        &mut self,
        agent_id: &str,
        insurance_company: &str,
        name: &str,
        city: Option<&str>,
    ) -> LedgerResult<InsuranceAgentDoc> {
        let agent_id = required_id(agent_id, "agentId")?;
        let insurance_company = required_text(insurance_company, "insuranceCompany")?;
        let name = required_text(name, "name")?;

        let caller_id = self.caller.require_role(Role::InsuranceAdmin)?.to_owned();
        self.caller.require_org(self.policy.insurer_org())?;

        let key = keys::insurance_agent(agent_id.as_str())?;
        if read_doc::<_, InsuranceAgentDoc>(&*self.store, &key)?.is_some() {
            return Err(LedgerError::Conflict {
                what: "insurance agent",
                id: agent_id.into_inner(),
            });
        }

        let agent = InsuranceAgentDoc {
            doc_type: DOC_INSURANCE_AGENT.to_owned(),
            agent_id: agent_id.into_inner(),
            name: name.into_inner(),
            insurance_company: insurance_company.into_inner(),
            city: optional_text(city),
            created_by: caller_id,
            status: STATUS_ACTIVE.to_owned(),
            wallet_balance: 0,
            created_at: self.tx.timestamp,
        };
        write_doc(self.store, &key, &agent)?;
        Ok(agent)
    }

    /// Applies a partial update to a doctor profile. Only name,
    /// specialization, and city are mutable.
    pub fn update_doctor_profile(
        &mut self,
        hospital_id: &str,
        doctor_id: &str,
        patch: DoctorProfilePatch,
    ) -> LedgerResult<DoctorDoc> {
        let hospital_id = required_id(hospital_id, "hospitalId")?;
        let doctor_id = required_id(doctor_id, "doctorId")?;

        let caller_id = self.require_hospital_caller()?;
        if caller_id != hospital_id.as_str() {
            return Err(LedgerError::Authorization(
                "a hospital can only update its own doctors".into(),
            ));
        }

        let key = keys::doctor(hospital_id.as_str(), doctor_id.as_str());
        let mut doctor: DoctorDoc =
            require_doc(&*self.store, &key, "doctor", doctor_id.as_str())?;

        if let Some(name) = optional_text(patch.name.as_deref()) {
            doctor.name = name;
        }
        if let Some(specialization) = optional_text(patch.specialization.as_deref()) {
            doctor.specialization = Some(specialization);
        }
        if let Some(city) = optional_text(patch.city.as_deref()) {
            doctor.city = Some(city);
        }
        doctor.updated_at = self.tx.timestamp;

        write_doc(self.store, &key, &doctor)?;
        Ok(doctor)
    }

    /// Hard-deletes a doctor profile. This is the only hard delete in the
    /// system.
    pub fn delete_doctor_profile(
        &mut self,
        hospital_id: &str,
        doctor_id: &str,
    ) -> LedgerResult<()> {
        let hospital_id = required_id(hospital_id, "hospitalId")?;
        let doctor_id = required_id(doctor_id, "doctorId")?;

        let caller_id = self.require_hospital_caller()?;
        if caller_id != hospital_id.as_str() {
            return Err(LedgerError::Authorization(
                "a hospital can only delete its own doctors".into(),
            ));
        }

        let key = keys::doctor(hospital_id.as_str(), doctor_id.as_str());
        require_doc::<_, DoctorDoc>(&*self.store, &key, "doctor", doctor_id.as_str())?;
        self.store.delete(&key)?;
        Ok(())
    }

    /// Reads a hospital document.
    pub fn get_hospital(&self, hospital_id: &str) -> LedgerResult<HospitalDoc> {
        let hospital_id = required_id(hospital_id, "hospitalId")?;
        require_doc(
            &*self.store,
            &keys::hospital(hospital_id.as_str()),
            "hospital",
            hospital_id.as_str(),
        )
    }

    /// Reads a doctor document.
    pub fn get_doctor(&self, hospital_id: &str, doctor_id: &str) -> LedgerResult<DoctorDoc> {
        let hospital_id = required_id(hospital_id, "hospitalId")?;
        let doctor_id = required_id(doctor_id, "doctorId")?;
        require_doc(
            &*self.store,
            &keys::doctor(hospital_id.as_str(), doctor_id.as_str()),
            "doctor",
            doctor_id.as_str(),
        )
    }

    /// Reads a patient document, gated by the central authorization
    /// predicate.
    pub fn get_patient(&self, patient_id: &str) -> LedgerResult<PatientDoc> {
        let patient_id = required_id(patient_id, "patientId")?;
        let patient: PatientDoc = require_doc(
            &*self.store,
            &keys::patient(patient_id.as_str())?,
            "patient",
            patient_id.as_str(),
        )?;
        if !consent::can_view_patient_data(&*self.store, self.caller, patient_id.as_str())? {
            return Err(LedgerError::Authorization(format!(
                "caller is not permitted to view data of patient {}",
                patient_id.as_str()
            )));
        }
        Ok(patient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use medledger_store::MemLedger;

    fn tx(id: &str) -> TxMeta {
        TxMeta::new(id, Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap())
    }

    fn bootstrap_hospital(ledger: &mut MemLedger, policy: &LedgerPolicy, hospital_id: &str) {
        let caller = Caller::known(Role::Hospital, hospital_id, "Org1");
        let tx = tx("tx-bootstrap");
        RegistryService::new(ledger, policy, &caller, &tx)
            .register_hospital(hospital_id, "City General", "Pune")
            .expect("hospital registration should succeed");
    }

    #[test]
    fn test_register_hospital_rejects_duplicate() {
        let mut ledger = MemLedger::new();
        let policy = LedgerPolicy::default();
        bootstrap_hospital(&mut ledger, &policy, "H1");

        let caller = Caller::known(Role::Hospital, "H1", "Org1");
        let tx = tx("tx2");
        let err = RegistryService::new(&mut ledger, &policy, &caller, &tx)
            .register_hospital("H1", "Again", "Pune")
            .expect_err("duplicate should be rejected");
        assert!(matches!(err, LedgerError::Conflict { what: "hospital", .. }));
    }

    #[test]
    fn test_register_hospital_requires_fields() {
        let mut ledger = MemLedger::new();
        let policy = LedgerPolicy::default();
        let caller = Caller::known(Role::Hospital, "H1", "Org1");
        let tx = tx("tx1");
        let err = RegistryService::new(&mut ledger, &policy, &caller, &tx)
            .register_hospital("H1", "  ", "Pune")
            .expect_err("blank name should be rejected");
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[test]
    fn test_register_patient_requires_existing_hospital() {
        let mut ledger = MemLedger::new();
        let policy = LedgerPolicy::default();
        let caller = Caller::known(Role::Hospital, "H1", "Org1");
        let tx = tx("tx1");
        let err = RegistryService::new(&mut ledger, &policy, &caller, &tx)
            .register_patient("H1", "P1", "Asha Rao", "1990-01-15", None)
            .expect_err("missing hospital should be rejected");
        assert!(matches!(err, LedgerError::NotFound { what: "hospital", .. }));
    }

    #[test]
    fn test_register_patient_starts_with_no_authorized_entities() {
        let mut ledger = MemLedger::new();
        let policy = LedgerPolicy::default();
        bootstrap_hospital(&mut ledger, &policy, "H1");

        let caller = Caller::known(Role::Hospital, "H1", "Org1");
        let tx = tx("tx2");
        let patient = RegistryService::new(&mut ledger, &policy, &caller, &tx)
            .register_patient("H1", "P1", "Asha Rao", "1990-01-15", Some("Pune"))
            .expect("patient registration should succeed");

        assert!(patient.authorized_entities.is_empty());
        assert_eq!(patient.hospital_id, "H1");
        assert_eq!(patient.city.as_deref(), Some("Pune"));
    }

    #[test]
    fn test_create_doctor_requires_hospital_role() {
        let mut ledger = MemLedger::new();
        let policy = LedgerPolicy::default();
        bootstrap_hospital(&mut ledger, &policy, "H1");

        let caller = Caller::known(Role::Patient, "P1", "Org1");
        let tx = tx("tx2");
        let err = RegistryService::new(&mut ledger, &policy, &caller, &tx)
            .create_doctor("H1", "D1", "Dr. Mehta", Some("cardiology"), None)
            .expect_err("patient caller should be rejected");
        assert!(matches!(err, LedgerError::Authorization(_)));
    }

    #[test]
    fn test_create_doctor_rejects_wrong_org() {
        let mut ledger = MemLedger::new();
        let policy = LedgerPolicy::default();
        bootstrap_hospital(&mut ledger, &policy, "H1");

        let caller = Caller::known(Role::Hospital, "H1", "Org2");
        let tx = tx("tx2");
        let err = RegistryService::new(&mut ledger, &policy, &caller, &tx)
            .create_doctor("H1", "D1", "Dr. Mehta", None, None)
            .expect_err("wrong org should be rejected");
        assert!(matches!(err, LedgerError::Authorization(_)));
    }

    #[test]
    fn test_create_doctor_rejects_foreign_hospital() {
        let mut ledger = MemLedger::new();
        let policy = LedgerPolicy::default();
        bootstrap_hospital(&mut ledger, &policy, "H1");

        let caller = Caller::known(Role::Hospital, "H2", "Org1");
        let tx = tx("tx2");
        let err = RegistryService::new(&mut ledger, &policy, &caller, &tx)
            .create_doctor("H1", "D1", "Dr. Mehta", None, None)
            .expect_err("foreign hospital should be rejected");
        assert!(matches!(err, LedgerError::Authorization(_)));
    }

    #[test]
    fn test_create_update_delete_doctor_lifecycle() {
        let mut ledger = MemLedger::new();
        let policy = LedgerPolicy::default();
        bootstrap_hospital(&mut ledger, &policy, "H1");

        let caller = Caller::known(Role::Hospital, "H1", "Org1");

        let tx_create = tx("tx2");
        let doctor = RegistryService::new(&mut ledger, &policy, &caller, &tx_create)
            .create_doctor("H1", "D1", "Dr. Mehta", Some("cardiology"), None)
            .expect("doctor creation should succeed");
        assert_eq!(doctor.status, STATUS_ACTIVE);

        let tx_update = tx("tx3");
        let updated = RegistryService::new(&mut ledger, &policy, &caller, &tx_update)
            .update_doctor_profile(
                "H1",
                "D1",
                DoctorProfilePatch {
                    city: Some("Mumbai".into()),
                    ..Default::default()
                },
            )
            .expect("update should succeed");
        assert_eq!(updated.city.as_deref(), Some("Mumbai"));
        assert_eq!(updated.specialization.as_deref(), Some("cardiology"));

        let tx_delete = tx("tx4");
        RegistryService::new(&mut ledger, &policy, &caller, &tx_delete)
            .delete_doctor_profile("H1", "D1")
            .expect("delete should succeed");

        let tx_read = tx("tx5");
        let err = RegistryService::new(&mut ledger, &policy, &caller, &tx_read)
            .get_doctor("H1", "D1")
            .expect_err("deleted doctor should be gone");
        assert!(matches!(err, LedgerError::NotFound { what: "doctor", .. }));
    }

    #[test]
    fn test_update_absent_doctor_is_not_found() {
        let mut ledger = MemLedger::new();
        let policy = LedgerPolicy::default();
        bootstrap_hospital(&mut ledger, &policy, "H1");

        let caller = Caller::known(Role::Hospital, "H1", "Org1");
        let tx = tx("tx2");
        let err = RegistryService::new(&mut ledger, &policy, &caller, &tx)
            .update_doctor_profile("H1", "D9", DoctorProfilePatch::default())
            .expect_err("absent doctor should be rejected");
        assert!(matches!(err, LedgerError::NotFound { what: "doctor", .. }));
    }

    #[test]
    fn test_onboard_researcher_requires_research_admin_in_research_org() {
        let mut ledger = MemLedger::new();
        let policy = LedgerPolicy::default();

        let wrong_org = Caller::known(Role::ResearchAdmin, "RA1", "Org1");
        let tx1 = tx("tx1");
        let err = RegistryService::new(&mut ledger, &policy, &wrong_org, &tx1)
            .onboard_researcher("R1", "Dr. Iyer", "NIMHANS")
            .expect_err("wrong org should be rejected");
        assert!(matches!(err, LedgerError::Authorization(_)));

        let admin = Caller::known(Role::ResearchAdmin, "RA1", "Org2");
        let tx2 = tx("tx2");
        let researcher = RegistryService::new(&mut ledger, &policy, &admin, &tx2)
            .onboard_researcher("R1", "Dr. Iyer", "NIMHANS")
            .expect("onboarding should succeed");
        assert_eq!(researcher.created_by, "RA1");
    }

    #[test]
    fn test_onboard_insurance_agent_initializes_zero_wallet() {
        let mut ledger = MemLedger::new();
        let policy = LedgerPolicy::default();

        let admin = Caller::known(Role::InsuranceAdmin, "IA1", "Org2");
        let tx1 = tx("tx1");
        let agent = RegistryService::new(&mut ledger, &policy, &admin, &tx1)
            .onboard_insurance_agent("AG1", "Acme Assurance", "Nilam Shah", None)
            .expect("onboarding should succeed");
        assert_eq!(agent.wallet_balance, 0);

        let err = RegistryService::new(&mut ledger, &policy, &admin, &tx1)
            .onboard_insurance_agent("AG1", "Acme Assurance", "Nilam Shah", None)
            .expect_err("duplicate agent should be rejected");
        assert!(matches!(
            err,
            LedgerError::Conflict { what: "insurance agent", .. }
        ));
    }
}
