use super::definition::FieldDefinition;
use crate::error::FieldConversionError;

/// A trait for custom question formats that can be converted into leadflow
/// `FieldDefinition`s.
///
/// Onboarding wizards and CMS exports rarely store questions in the canonical
/// shape. Implementing this trait on your own structs provides the translation
/// layer the compiler needs.
///
/// # Example
///
/// ```rust,no_run
/// use leadflow::prelude::*;
/// use leadflow::error::FieldConversionError;
///
/// struct WizardQuestion { key: String, text: String }
/// struct WizardExport { questions: Vec<WizardQuestion> }
///
/// impl IntoFields for WizardExport {
///     fn into_fields(self) -> std::result::Result<Vec<FieldDefinition>, FieldConversionError> {
///         Ok(self
///             .questions
///             .into_iter()
///             .enumerate()
///             .map(|(i, q)| FieldDefinition::new(q.key, q.text, i as i32))
///             .collect())
///     }
/// }
/// ```
pub trait IntoFields {
    /// Consumes the object and converts it into an ordered field list.
    fn into_fields(self) -> Result<Vec<FieldDefinition>, FieldConversionError>;
}

impl IntoFields for Vec<FieldDefinition> {
    fn into_fields(self) -> Result<Vec<FieldDefinition>, FieldConversionError> {
        if let Some(field) = self.iter().find(|f| f.mapping_key.trim().is_empty()) {
            return Err(FieldConversionError::ValidationError(format!(
                "field '{}' has an empty mapping key",
                field.id
            )));
        }
        Ok(self)
    }
}
