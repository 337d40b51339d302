//! Caller identity resolution.
//!
//! Every operation begins here: the opaque security context supplied by the
//! transport layer is reduced to a [`Caller`]: role, unique id, and owning
//! organization. Resolution never fails; missing or unrecognized attributes
//! resolve to `None` and rejection is deferred to the operation that needs
//! them. Each operation therefore re-checks the fields it relies on through
//! the `require_*` helpers.

use crate::error::{LedgerError, LedgerResult};

/// Attribute name carrying the caller's role.
pub const ROLE_ATTRIBUTE: &str = "role";
/// Attribute name carrying the caller's unique id.
pub const UNIQUE_ID_ATTRIBUTE: &str = "uniqueId";

/// The opaque security context supplied by the transport layer.
pub trait IdentityContext {
    /// Looks up a certificate attribute by name.
    fn attribute(&self, name: &str) -> Option<String>;

    /// Returns the organization tag of the caller (e.g. `Org1`).
    fn organization(&self) -> String;
}

/// The closed set of participant roles.
///
/// Role strings arriving from the identity layer are matched against this
/// enum once; an unrecognized string resolves to no role at all and is denied
/// everywhere, rather than being re-interpreted per operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Hospital,
    Doctor,
    Patient,
    Diagnostics,
    Pharmacy,
    Researcher,
    ResearchAdmin,
    InsuranceAdmin,
    InsuranceAgent,
}

impl Role {
    /// The wire name of the role as carried in identity attributes and
    /// consent records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Hospital => "hospital",
            Role::Doctor => "doctor",
            Role::Patient => "patient",
            Role::Diagnostics => "diagnostics",
            Role::Pharmacy => "pharmacy",
            Role::Researcher => "researcher",
            Role::ResearchAdmin => "researchAdmin",
            Role::InsuranceAdmin => "insuranceAdmin",
            Role::InsuranceAgent => "insuranceAgent",
        }
    }

    /// Parses a wire name into a role. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Role> {
        match name {
            "hospital" => Some(Role::Hospital),
            "doctor" => Some(Role::Doctor),
            "patient" => Some(Role::Patient),
            "diagnostics" => Some(Role::Diagnostics),
            "pharmacy" => Some(Role::Pharmacy),
            "researcher" => Some(Role::Researcher),
            "researchAdmin" => Some(Role::ResearchAdmin),
            "insuranceAdmin" => Some(Role::InsuranceAdmin),
            "insuranceAgent" => Some(Role::InsuranceAgent),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The resolved caller identity.
#[derive(Clone, Debug)]
pub struct Caller {
    /// Role claimed by the caller's identity, if present and recognized.
    pub role: Option<Role>,
    /// Unique id of the caller within its role category.
    pub unique_id: Option<String>,
    /// Organization the identity was issued under.
    pub organization: String,
}

/// Extracts role, unique id, and organization from the security context.
///
/// Pure and infallible: absent or unrecognized attributes become `None`, and
/// the calling operation decides whether that is acceptable.
pub fn resolve_caller(ctx: &dyn IdentityContext) -> Caller {
    Caller {
        role: ctx.attribute(ROLE_ATTRIBUTE).as_deref().and_then(Role::parse),
        unique_id: ctx.attribute(UNIQUE_ID_ATTRIBUTE),
        organization: ctx.organization(),
    }
}

impl Caller {
    /// Builds a caller directly, bypassing attribute resolution. Intended for
    /// glue layers and tests that already hold the resolved identity.
    pub fn known(role: Role, unique_id: impl Into<String>, organization: impl Into<String>) -> Self {
        Self {
            role: Some(role),
            unique_id: Some(unique_id.into()),
            organization: organization.into(),
        }
    }

    /// Requires the caller to hold exactly `role`, returning the caller's
    /// unique id.
    pub fn require_role(&self, role: Role) -> LedgerResult<&str> {
        match self.role {
            Some(r) if r == role => self.require_id(),
            _ => Err(LedgerError::Authorization(format!(
                "only a {} can perform this action",
                role
            ))),
        }
    }

    /// Requires the caller to hold one of `roles`, returning the matched role
    /// and the caller's unique id.
    pub fn require_any_role(&self, roles: &[Role]) -> LedgerResult<(Role, &str)> {
        match self.role {
            Some(r) if roles.contains(&r) => Ok((r, self.require_id()?)),
            _ => {
                let allowed: Vec<&str> = roles.iter().map(Role::as_str).collect();
                Err(LedgerError::Authorization(format!(
                    "caller role must be one of: {}",
                    allowed.join(", ")
                )))
            }
        }
    }

    /// Requires the identity to carry a unique id.
    pub fn require_id(&self) -> LedgerResult<&str> {
        self.unique_id.as_deref().ok_or_else(|| {
            LedgerError::Authorization("caller identity is missing the uniqueId attribute".into())
        })
    }

    /// Requires the caller's organization to match `org`.
    pub fn require_org(&self, org: &str) -> LedgerResult<()> {
        if self.organization == org {
            Ok(())
        } else {
            Err(LedgerError::Authorization(format!(
                "caller organization {} is not permitted to perform this action",
                self.organization
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FakeContext {
        attributes: HashMap<String, String>,
        org: String,
    }

    impl IdentityContext for FakeContext {
        fn attribute(&self, name: &str) -> Option<String> {
            self.attributes.get(name).cloned()
        }

        fn organization(&self) -> String {
            self.org.clone()
        }
    }

    fn ctx(entries: &[(&str, &str)], org: &str) -> FakeContext {
        FakeContext {
            attributes: entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            org: org.to_owned(),
        }
    }

    #[test]
    fn test_resolve_caller_extracts_role_id_and_org() {
        let caller = resolve_caller(&ctx(&[("role", "doctor"), ("uniqueId", "D1")], "Org1"));
        assert_eq!(caller.role, Some(Role::Doctor));
        assert_eq!(caller.unique_id.as_deref(), Some("D1"));
        assert_eq!(caller.organization, "Org1");
    }

    #[test]
    fn test_resolve_caller_tolerates_missing_attributes() {
        let caller = resolve_caller(&ctx(&[], "Org2"));
        assert_eq!(caller.role, None);
        assert_eq!(caller.unique_id, None);
        assert_eq!(caller.organization, "Org2");
    }

    #[test]
    fn test_unknown_role_string_resolves_to_none() {
        let caller = resolve_caller(&ctx(&[("role", "superuser"), ("uniqueId", "X")], "Org1"));
        assert_eq!(caller.role, None);
        assert!(caller.require_role(Role::Hospital).is_err());
    }

    #[test]
    fn test_require_role_rejects_wrong_role() {
        let caller = Caller::known(Role::Patient, "P1", "Org1");
        let err = caller
            .require_role(Role::Doctor)
            .expect_err("should reject patient as doctor");
        assert!(err.to_string().contains("only a doctor"));
    }

    #[test]
    fn test_require_role_rejects_missing_id() {
        let caller = Caller {
            role: Some(Role::Doctor),
            unique_id: None,
            organization: "Org1".into(),
        };
        let err = caller
            .require_role(Role::Doctor)
            .expect_err("should reject missing id");
        assert!(err.to_string().contains("uniqueId"));
    }

    #[test]
    fn test_role_wire_names_round_trip() {
        for role in [
            Role::Hospital,
            Role::Doctor,
            Role::Patient,
            Role::Diagnostics,
            Role::Pharmacy,
            Role::Researcher,
            Role::ResearchAdmin,
            Role::InsuranceAdmin,
            Role::InsuranceAgent,
        ] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
    }
}
