//! MedLedger demo CLI.
//!
//! Thin glue over the core services: loads a JSON ledger snapshot, runs one
//! operation as the identity given on the command line, prints the response
//! envelope, and writes the snapshot back. Transaction ids and timestamps are
//! minted here, at the glue boundary; the core never touches a wall clock.

use clap::{Parser, Subcommand};
use medledger_core::{
    response, Caller, ConsentService, InsuranceService, LedgerPolicy, PharmacyService,
    QueryService, RecordService, RegistryService, RewardService, Role,
};
use medledger_store::{MemLedger, TxMeta};

#[derive(Parser)]
#[command(name = "medledger")]
#[command(about = "Permissioned EHR ledger demo CLI")]
struct Cli {
    /// Path of the ledger snapshot file
    #[arg(long, default_value = "ledger.json")]
    ledger: std::path::PathBuf,

    /// Caller role (hospital, doctor, patient, diagnostics, pharmacy,
    /// researcher, researchAdmin, insuranceAdmin, insuranceAgent)
    #[arg(long)]
    role: Option<String>,

    /// Caller unique id
    #[arg(long)]
    id: Option<String>,

    /// Caller organization
    #[arg(long, default_value = "Org1")]
    org: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a hospital (bootstrap path, no role restriction)
    RegisterHospital {
        hospital_id: String,
        name: String,
        city: String,
    },
    /// Register a patient under a hospital
    RegisterPatient {
        hospital_id: String,
        patient_id: String,
        name: String,
        /// Date of birth (YYYY-MM-DD)
        dob: String,
        #[arg(long)]
        city: Option<String>,
    },
    /// Create a doctor profile (hospital callers only)
    CreateDoctor {
        hospital_id: String,
        doctor_id: String,
        name: String,
        #[arg(long)]
        specialization: Option<String>,
        #[arg(long)]
        city: Option<String>,
    },
    /// Grant an entity access to the calling patient's data
    GrantAccess {
        patient_id: String,
        entity_id: String,
        entity_role: String,
    },
    /// Revoke a previously granted consent
    RevokeConsent {
        patient_id: String,
        entity_id: String,
    },
    /// Add a clinical record (granted doctors only)
    AddRecord {
        patient_id: String,
        diagnosis: String,
        #[arg(long)]
        prescription: Option<String>,
    },
    /// Upload a lab report (diagnostics centers only)
    UploadLabReport {
        patient_id: String,
        report_type: String,
        report_data: String,
    },
    /// Set the calling pharmacy's stock for a medicine
    UpdateStock {
        medicine_name: String,
        new_stock: String,
    },
    /// Dispense a prescribed medicine against a record
    Dispense {
        patient_id: String,
        record_id: String,
        medicine_name: String,
        quantity: String,
    },
    /// Issue an insurance policy (insurer-side callers only)
    IssueInsurance {
        policy_number: String,
        patient_id: String,
        coverage_amount: String,
        insurance_company: String,
    },
    /// Create a claim against a policy (patients only)
    CreateClaim {
        policy_number: String,
        amount: String,
        reason: String,
    },
    /// Approve a pending claim (insurer-side callers only)
    ApproveClaim { claim_id: String },
    /// Spend reward points (patients only)
    UseReward {
        patient_id: String,
        amount: String,
    },
    /// Show a patient's reward balance
    RewardBalance { patient_id: String },
    /// Show a patient's full history, sorted by creation time
    History { patient_id: String },
    /// List patients that granted access to the calling doctor
    MyPatients { doctor_id: String },
    /// List the calling patient's claims
    MyClaims,
}

fn caller_from_args(cli: &Cli) -> Result<Caller, Box<dyn std::error::Error>> {
    let role = match cli.role.as_deref() {
        Some(name) => Some(
            Role::parse(name).ok_or_else(|| format!("unknown role {name:?}"))?,
        ),
        None => None,
    };
    Ok(Caller {
        role,
        unique_id: cli.id.clone(),
        organization: cli.org.clone(),
    })
}

fn load_ledger(path: &std::path::Path) -> Result<MemLedger, Box<dyn std::error::Error>> {
    if path.exists() {
        let snapshot = std::fs::read_to_string(path)?;
        Ok(MemLedger::from_snapshot(&snapshot)?)
    } else {
        Ok(MemLedger::new())
    }
}

fn save_ledger(
    path: &std::path::Path,
    ledger: &MemLedger,
) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::write(path, ledger.to_snapshot()?)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let caller = caller_from_args(&cli)?;
    let policy = LedgerPolicy::default();
    let mut ledger = load_ledger(&cli.ledger)?;

    // One CLI invocation is one transaction.
    let tx = TxMeta::new(uuid::Uuid::new_v4().to_string(), chrono::Utc::now());

    let output = match &cli.command {
        Commands::RegisterHospital {
            hospital_id,
            name,
            city,
        } => {
            let hospital = RegistryService::new(&mut ledger, &policy, &caller, &tx)
                .register_hospital(hospital_id, name, city)?;
            response::success_response("hospital registered", &hospital)?
        }
        Commands::RegisterPatient {
            hospital_id,
            patient_id,
            name,
            dob,
            city,
        } => {
            let patient = RegistryService::new(&mut ledger, &policy, &caller, &tx)
                .register_patient(hospital_id, patient_id, name, dob, city.as_deref())?;
            response::success_response("patient registered", &patient)?
        }
        Commands::CreateDoctor {
            hospital_id,
            doctor_id,
            name,
            specialization,
            city,
        } => {
            let doctor = RegistryService::new(&mut ledger, &policy, &caller, &tx).create_doctor(
                hospital_id,
                doctor_id,
                name,
                specialization.as_deref(),
                city.as_deref(),
            )?;
            response::success_response("doctor created", &doctor)?
        }
        Commands::GrantAccess {
            patient_id,
            entity_id,
            entity_role,
        } => {
            let outcome = ConsentService::new(&mut ledger, &policy, &caller, &tx)
                .grant_access(patient_id, entity_id, entity_role)?;
            response::success_response("access granted", &outcome)?
        }
        Commands::RevokeConsent {
            patient_id,
            entity_id,
        } => {
            let consent = ConsentService::new(&mut ledger, &policy, &caller, &tx)
                .revoke_consent(patient_id, entity_id)?;
            response::success_response("consent revoked", &consent)?
        }
        Commands::AddRecord {
            patient_id,
            diagnosis,
            prescription,
        } => {
            let record = RecordService::new(&mut ledger, &policy, &caller, &tx).add_record(
                patient_id,
                diagnosis,
                prescription.as_deref(),
            )?;
            response::success_response("record created", &record)?
        }
        Commands::UploadLabReport {
            patient_id,
            report_type,
            report_data,
        } => {
            let record = RecordService::new(&mut ledger, &policy, &caller, &tx)
                .upload_lab_report(patient_id, report_type, report_data)?;
            response::success_response("lab report uploaded", &record)?
        }
        Commands::UpdateStock {
            medicine_name,
            new_stock,
        } => {
            let outcome = PharmacyService::new(&mut ledger, &policy, &caller, &tx)
                .update_medicine_stock(medicine_name, new_stock)?;
            response::success_response("stock updated", &outcome)?
        }
        Commands::Dispense {
            patient_id,
            record_id,
            medicine_name,
            quantity,
        } => {
            let outcome = PharmacyService::new(&mut ledger, &policy, &caller, &tx)
                .dispense_medicine(patient_id, record_id, medicine_name, quantity)?;
            response::success_response("medicine dispensed", &outcome)?
        }
        Commands::IssueInsurance {
            policy_number,
            patient_id,
            coverage_amount,
            insurance_company,
        } => {
            let issued = InsuranceService::new(&mut ledger, &policy, &caller, &tx)
                .issue_insurance(policy_number, patient_id, coverage_amount, insurance_company)?;
            response::success_response("policy issued", &issued)?
        }
        Commands::CreateClaim {
            policy_number,
            amount,
            reason,
        } => {
            let claim = InsuranceService::new(&mut ledger, &policy, &caller, &tx)
                .create_claim(policy_number, amount, reason)?;
            response::success_response("claim created", &claim)?
        }
        Commands::ApproveClaim { claim_id } => {
            let claim =
                InsuranceService::new(&mut ledger, &policy, &caller, &tx).approve_claim(claim_id)?;
            response::success_response("claim approved", &claim)?
        }
        Commands::UseReward { patient_id, amount } => {
            let outcome = RewardService::new(&mut ledger, &policy, &caller, &tx)
                .use_reward(patient_id, amount)?;
            response::success_response("reward spent", &outcome)?
        }
        Commands::RewardBalance { patient_id } => {
            let outcome = RewardService::new(&mut ledger, &policy, &caller, &tx)
                .get_reward_balance(patient_id)?;
            response::success_response("reward balance", &outcome)?
        }
        Commands::History { patient_id } => {
            let history =
                QueryService::new(&ledger, &caller).get_all_records_by_patient_id(patient_id)?;
            response::list_response(&history)?
        }
        Commands::MyPatients { doctor_id } => {
            let roster =
                QueryService::new(&ledger, &caller).get_all_patients_by_doctor(doctor_id)?;
            response::list_response(&roster)?
        }
        Commands::MyClaims => {
            let claims = QueryService::new(&ledger, &caller).get_all_claims_by_patient()?;
            response::list_response(&claims)?
        }
    };

    save_ledger(&cli.ledger, &ledger)?;
    println!("{output}");
    Ok(())
}
