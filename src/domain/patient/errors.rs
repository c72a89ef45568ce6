// ============================================================================
// Patient Business Rule Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PatientError {
    #[error("Patient is already discharged")]
    AlreadyDischarged,

    #[error("Patient has not been admitted")]
    NotAdmitted,

    #[error("Failed to generate patient identity: {0}")]
    IdentityGeneration(String),
}

impl PatientError {
    /// Business-rule violations; the caller may fix the request but should not retry it as-is
    pub fn is_invalid_command(&self) -> bool {
        matches!(self, Self::AlreadyDischarged | Self::NotAdmitted)
    }
}
