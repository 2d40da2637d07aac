use serde::{Deserialize, Serialize};
use std::fmt;

/// Role carried in access tokens. An open set of tags; only the two
/// associated constants are granted meaning by this service.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(String);

impl Role {
    pub const EV_OWNER: &'static str = "EVOwner";
    pub const BACK_OFFICE: &'static str = "BackOffice";

    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    #[must_use]
    pub fn ev_owner() -> Self {
        Self::new(Self::EV_OWNER)
    }

    #[must_use]
    pub fn back_office() -> Self {
        Self::new(Self::BACK_OFFICE)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_back_office(&self) -> bool {
        self.0 == Self::BACK_OFFICE
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predefined_roles() {
        assert_eq!(Role::ev_owner().as_str(), "EVOwner");
        assert!(Role::back_office().is_back_office());
        assert!(!Role::ev_owner().is_back_office());
    }

    #[test]
    fn unknown_tags_are_kept_verbatim() -> Result<(), serde_json::Error> {
        let role: Role = serde_json::from_str("\"Operator\"")?;
        assert_eq!(role, Role::new("Operator"));
        assert_eq!(serde_json::to_string(&role)?, "\"Operator\"");
        Ok(())
    }
}
