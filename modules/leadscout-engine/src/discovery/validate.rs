//! Save-time validation. Extractors are permissive; this gate is not.
//! A prospect persists only with a valid person name and at least one way to
//! reach them (email, phone, or a real organization).

use super::extract::base::validate_person_name;
use super::extract::ProspectDraft;

/// Placeholder organizations that mean "we resolved nothing useful".
const BLOCKED_ORG_PLACEHOLDERS: &[&str] = &[
    "example",
    "localhost",
    "unknown",
    "n/a",
    "none",
    "home",
    "website",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    InvalidName,
    NoContactOrOrg,
    BlockedOrganization,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::InvalidName => write!(f, "invalid_name"),
            RejectReason::NoContactOrOrg => write!(f, "no_contact_or_org"),
            RejectReason::BlockedOrganization => write!(f, "blocked_organization"),
        }
    }
}

/// Validate a draft for persistence. Returns the cleaned name on success.
pub fn validate_for_save(draft: &ProspectDraft) -> Result<String, RejectReason> {
    let Some(name) = validate_person_name(&draft.name) else {
        return Err(RejectReason::InvalidName);
    };

    let org_ok = match draft.organization.as_deref() {
        Some(org) => {
            let lower = org.trim().to_lowercase();
            if BLOCKED_ORG_PLACEHOLDERS.iter().any(|b| lower == *b) {
                return Err(RejectReason::BlockedOrganization);
            }
            !lower.is_empty()
        }
        None => false,
    };

    if draft.email.is_none() && draft.phone.is_none() && !org_ok {
        return Err(RejectReason::NoContactOrOrg);
    }

    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(name: &str) -> ProspectDraft {
        ProspectDraft {
            name: name.to_string(),
            source_url: "https://example.org/team".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn name_plus_email_passes() {
        let mut d = draft("Jane Smith");
        d.email = Some("jane@x.com".to_string());
        assert_eq!(validate_for_save(&d), Ok("Jane Smith".to_string()));
    }

    #[test]
    fn name_plus_org_passes_without_contacts() {
        let mut d = draft("Jane Smith");
        d.organization = Some("Acme Counseling Group".to_string());
        assert!(validate_for_save(&d).is_ok());
    }

    #[test]
    fn nothing_but_a_name_is_rejected() {
        assert_eq!(
            validate_for_save(&draft("Jane Smith")),
            Err(RejectReason::NoContactOrOrg)
        );
    }

    #[test]
    fn junk_names_are_rejected() {
        let mut d = draft("Privacy Policy");
        d.email = Some("info@x.com".to_string());
        assert_eq!(validate_for_save(&d), Err(RejectReason::InvalidName));
    }

    #[test]
    fn placeholder_orgs_are_rejected() {
        let mut d = draft("Jane Smith");
        d.organization = Some("Unknown".to_string());
        assert_eq!(
            validate_for_save(&d),
            Err(RejectReason::BlockedOrganization)
        );
    }
}
