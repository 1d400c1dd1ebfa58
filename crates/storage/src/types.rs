//! Storage types shared across modules

/// Sort order for attribute listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttributeOrder {
    /// By attribute id (REST listing).
    #[default]
    Id,
    /// By display name (agent tool listing).
    Name,
}
