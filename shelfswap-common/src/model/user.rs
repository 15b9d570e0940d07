use crate::model::Id;
use regex::Regex;
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use std::sync::LazyLock;
use thiserror::Error;

pub const USER_NAME_MAX_LEN: usize = 100;

static EDU_EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@(?i:[a-z0-9-]+(\.[a-z0-9-]+)*\.edu)$")
        .unwrap_or_else(|err| unreachable!("email pattern is valid: {err}"))
});

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct UserMarker;

/// A registered student. Credentials are kept apart from this type so it
/// can be handed out in any response.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct User {
    pub id: Id<UserMarker>,
    pub email: EduEmail,
    pub name: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct CreateUser {
    pub email: EduEmail,
    pub name: String,
}

/// An address of the form `local@domain.edu`.
///
/// The domain is matched case-insensitively and stored lowercased, so
/// `Jane@MIT.EDU` and `Jane@mit.edu` are the same account.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct EduEmail(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Email must be a valid .edu address: {0}")]
pub struct InvalidEmailError(String);

impl EduEmail {
    pub fn new(email: String) -> Result<Self, InvalidEmailError> {
        let trimmed = email.trim();
        if !EDU_EMAIL.is_match(trimmed) {
            return Err(InvalidEmailError(email));
        }

        match trimmed.split_once('@') {
            Some((local, domain)) => Ok(Self(format!("{local}@{}", domain.to_lowercase()))),
            None => Err(InvalidEmailError(email)),
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl<'de> Deserialize<'de> for EduEmail {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        EduEmail::new(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"a .edu email address"))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::user::EduEmail;

    #[test]
    fn accepts_edu_addresses() {
        for email in [
            "jane@mit.edu",
            "jane.doe+books@cs.stanford.edu",
            "JD_99@Example.EDU",
        ] {
            assert!(EduEmail::new(email.to_owned()).is_ok(), "{email}");
        }
    }

    #[test]
    fn rejects_everything_else() {
        for email in [
            "jane@gmail.com",
            "jane@mit.edu.com",
            "jane@edu",
            "@mit.edu",
            "jane mit.edu",
            "jane@mit.education",
            "",
        ] {
            assert!(EduEmail::new(email.to_owned()).is_err(), "{email}");
        }
    }

    #[test]
    fn domain_is_normalised() {
        let email = EduEmail::new("Jane@MIT.EDU".to_owned()).unwrap();
        assert_eq!(email.get(), "Jane@mit.edu");
    }

    #[test]
    fn deserialization_validates() {
        assert!(serde_json::from_str::<EduEmail>("\"a@b.edu\"").is_ok());
        assert!(serde_json::from_str::<EduEmail>("\"a@b.com\"").is_err());
    }
}
