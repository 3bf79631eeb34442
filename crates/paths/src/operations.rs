//! Operation type definitions for PathBuilder

/// Distributed firewall operations exposed by the NSX-T manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DfwOperation {
    // Section operations
    ListSections,
    GetSection,
    CreateSection,
    DeleteSection,

    // Rule operations
    ListRules,
    GetRule,
    CreateRule,
    UpdateRule,
    DeleteRule,
}

impl DfwOperation {
    /// HTTP method used for this operation
    #[must_use]
    pub fn method(&self) -> &'static str {
        match self {
            DfwOperation::ListSections
            | DfwOperation::GetSection
            | DfwOperation::ListRules
            | DfwOperation::GetRule => "GET",
            DfwOperation::CreateSection | DfwOperation::CreateRule => "POST",
            DfwOperation::UpdateRule => "PUT",
            DfwOperation::DeleteSection | DfwOperation::DeleteRule => "DELETE",
        }
    }

    /// Short name used for metric labels and span names
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DfwOperation::ListSections => "list_sections",
            DfwOperation::GetSection => "get_section",
            DfwOperation::CreateSection => "create_section",
            DfwOperation::DeleteSection => "delete_section",
            DfwOperation::ListRules => "list_rules",
            DfwOperation::GetRule => "get_rule",
            DfwOperation::CreateRule => "create_rule",
            DfwOperation::UpdateRule => "update_rule",
            DfwOperation::DeleteRule => "delete_rule",
        }
    }
}
