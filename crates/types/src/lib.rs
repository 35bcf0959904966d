//! Shared domain primitives for the clinical workflow client.
//!
//! These types are deliberately small and dependency-light so they can be used by the core
//! client, the export helpers and the CLI without pulling in any transport concerns.

use std::str::FromStr;

/// Errors that can occur when creating validated domain types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
    /// The input was not one of the accepted values
    #[error("Unrecognised value: {0}")]
    Unrecognised(String),
}

/// A string type that guarantees non-empty content.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// The input is automatically trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// The input is trimmed of leading and trailing whitespace. If the trimmed
    /// result is empty, an error is returned.
    ///
    /// # Errors
    ///
    /// Returns `Err(TextError::Empty)` if the input is empty or contains only whitespace.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Like [`NonEmptyText::new`], but maps blank input to `None` instead of an error.
    ///
    /// Useful for optional form fields where an empty value means "not supplied".
    pub fn optional(input: impl AsRef<str>) -> Option<Self> {
        Self::new(input).ok()
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for NonEmptyText {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// Administrative gender as captured on the intake form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    /// Wire representation used by the workflow prompts.
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            other => Err(TextError::Unrecognised(other.to_string())),
        }
    }
}

/// Optional patient details attached to a note.
///
/// Every field is optional; the workflow receives a blank (or placeholder) value for anything
/// not supplied.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PatientMetadata {
    pub patient_id: Option<NonEmptyText>,
    pub patient_name: Option<NonEmptyText>,
    /// Date of birth as entered (ISO 8601 `YYYY-MM-DD` by convention, not enforced).
    pub date_of_birth: Option<NonEmptyText>,
    pub gender: Option<Gender>,
}

impl PatientMetadata {
    /// Returns true when no field has been supplied.
    pub fn is_empty(&self) -> bool {
        self.patient_id.is_none()
            && self.patient_name.is_none()
            && self.date_of_birth.is_none()
            && self.gender.is_none()
    }

    /// Patient identifier, or `missing` when absent.
    pub fn patient_id_or<'a>(&'a self, missing: &'a str) -> &'a str {
        self.patient_id.as_ref().map_or(missing, NonEmptyText::as_str)
    }

    /// Patient name, or `missing` when absent.
    pub fn patient_name_or<'a>(&'a self, missing: &'a str) -> &'a str {
        self.patient_name.as_ref().map_or(missing, NonEmptyText::as_str)
    }

    /// Date of birth, or `missing` when absent.
    pub fn date_of_birth_or<'a>(&'a self, missing: &'a str) -> &'a str {
        self.date_of_birth
            .as_ref()
            .map_or(missing, NonEmptyText::as_str)
    }

    /// Gender wire value, or `missing` when absent.
    pub fn gender_or<'a>(&self, missing: &'a str) -> &'a str {
        self.gender.map_or(missing, |gender| gender.as_str())
    }
}

/// On the wire every key is always present; blank strings stand in for absent values.
impl serde::Serialize for PatientMetadata {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("PatientMetadata", 4)?;
        state.serialize_field("patient_id", self.patient_id_or(""))?;
        state.serialize_field("patient_name", self.patient_name_or(""))?;
        state.serialize_field("date_of_birth", self.date_of_birth_or(""))?;
        state.serialize_field("gender", self.gender_or(""))?;
        state.end()
    }
}

impl<'de> serde::Deserialize<'de> for PatientMetadata {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(serde::Deserialize)]
        struct Wire {
            #[serde(default)]
            patient_id: String,
            #[serde(default)]
            patient_name: String,
            #[serde(default)]
            date_of_birth: String,
            #[serde(default)]
            gender: String,
        }

        let wire = Wire::deserialize(deserializer)?;
        let gender = match wire.gender.trim() {
            "" => None,
            value => Some(value.parse::<Gender>().map_err(serde::de::Error::custom)?),
        };

        Ok(PatientMetadata {
            patient_id: NonEmptyText::optional(wire.patient_id),
            patient_name: NonEmptyText::optional(wire.patient_name),
            date_of_birth: NonEmptyText::optional(wire.date_of_birth),
            gender,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_text_trims_and_rejects_blank() {
        let text = NonEmptyText::new("  chest pain \n").expect("valid text");
        assert_eq!(text.as_str(), "chest pain");
        assert_eq!(NonEmptyText::new("   \t"), Err(TextError::Empty));
        assert!(NonEmptyText::optional("").is_none());
    }

    #[test]
    fn gender_parses_case_insensitively() {
        assert_eq!("Female".parse::<Gender>(), Ok(Gender::Female));
        assert_eq!(" OTHER ".parse::<Gender>(), Ok(Gender::Other));
        assert!(matches!(
            "unknown".parse::<Gender>(),
            Err(TextError::Unrecognised(_))
        ));
    }

    #[test]
    fn metadata_serialises_every_key_with_blank_defaults() {
        let metadata = PatientMetadata {
            patient_id: NonEmptyText::optional("P-001"),
            gender: Some(Gender::Male),
            ..Default::default()
        };

        let json = serde_json::to_value(&metadata).expect("serialise metadata");
        assert_eq!(
            json,
            serde_json::json!({
                "patient_id": "P-001",
                "patient_name": "",
                "date_of_birth": "",
                "gender": "male"
            })
        );
    }

    #[test]
    fn metadata_deserialises_blank_values_as_absent() {
        let metadata: PatientMetadata = serde_json::from_value(serde_json::json!({
            "patient_id": "",
            "patient_name": "Sarah Williams",
            "gender": ""
        }))
        .expect("deserialise metadata");

        assert!(metadata.patient_id.is_none());
        assert_eq!(metadata.patient_name_or("unknown"), "Sarah Williams");
        assert!(metadata.gender.is_none());
        assert_eq!(metadata.date_of_birth_or("unknown"), "unknown");
    }
}
