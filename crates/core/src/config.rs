//! Ledger policy configuration.
//!
//! Policy knobs are resolved once at process startup and injected into every
//! service, never read from the environment during an operation. The defaults
//! reproduce the deployed network layout: provider-side participants
//! (hospitals, doctors, diagnostics centers, pharmacies) in `Org1`,
//! payer/research-side participants (researchers, insurers) in `Org2`.

/// Policy configuration injected into every ledger service.
#[derive(Clone, Debug)]
pub struct LedgerPolicy {
    provider_org: String,
    diagnostics_org: String,
    pharmacy_org: String,
    research_org: String,
    insurer_org: String,
    agent_coverage_cap: u64,
    consent_reward_points: u64,
    reward_on_regrant: bool,
}

impl Default for LedgerPolicy {
    fn default() -> Self {
        Self {
            provider_org: "Org1".to_owned(),
            diagnostics_org: "Org1".to_owned(),
            pharmacy_org: "Org1".to_owned(),
            research_org: "Org2".to_owned(),
            insurer_org: "Org2".to_owned(),
            agent_coverage_cap: 50_000,
            consent_reward_points: 10,
            reward_on_regrant: true,
        }
    }
}

impl LedgerPolicy {
    /// Creates the default policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides whether re-granting access to an already-authorized entity
    /// credits reward points again. The deployed system re-awards on every
    /// grant call; setting this to `false` restricts credit to first-time
    /// grants.
    pub fn with_reward_on_regrant(mut self, reward_on_regrant: bool) -> Self {
        self.reward_on_regrant = reward_on_regrant;
        self
    }

    /// Overrides the organization ids for each participant category, in the
    /// order provider, diagnostics, pharmacy, research, insurer.
    pub fn with_organizations(
        mut self,
        provider: impl Into<String>,
        diagnostics: impl Into<String>,
        pharmacy: impl Into<String>,
        research: impl Into<String>,
        insurer: impl Into<String>,
    ) -> Self {
        self.provider_org = provider.into();
        self.diagnostics_org = diagnostics.into();
        self.pharmacy_org = pharmacy.into();
        self.research_org = research.into();
        self.insurer_org = insurer.into();
        self
    }

    pub fn provider_org(&self) -> &str {
        &self.provider_org
    }

    pub fn diagnostics_org(&self) -> &str {
        &self.diagnostics_org
    }

    pub fn pharmacy_org(&self) -> &str {
        &self.pharmacy_org
    }

    pub fn research_org(&self) -> &str {
        &self.research_org
    }

    pub fn insurer_org(&self) -> &str {
        &self.insurer_org
    }

    /// Maximum coverage amount an insurance agent (as opposed to an admin)
    /// may issue a policy for, inclusive.
    pub fn agent_coverage_cap(&self) -> u64 {
        self.agent_coverage_cap
    }

    /// Points credited to a patient when consent is granted to a rewardable
    /// entity role.
    pub fn consent_reward_points(&self) -> u64 {
        self.consent_reward_points
    }

    pub fn reward_on_regrant(&self) -> bool {
        self.reward_on_regrant
    }
}
