//! PathBuilder implementation
//!
//! Provides a type-safe builder pattern for constructing firewall API paths.

use crate::errors::PathBuilderError;
use crate::firewall;
use crate::formats::PathFormat;
use crate::operations::DfwOperation;

/// Builder for constructing API paths with type safety
///
/// # Example
///
/// ```rust
/// use dfw_paths::prelude::*;
///
/// let path = PathBuilder::new()
///     .operation(DfwOperation::UpdateRule)
///     .section("s1")
///     .rule("r1")
///     .build_http_path()
///     .unwrap();
/// assert_eq!(path, "/api/v1/firewall/sections/s1/rules/r1");
/// ```
#[derive(Debug, Clone, Default)]
pub struct PathBuilder {
    operation: Option<DfwOperation>,
    section: Option<String>,
    rule: Option<String>,
    cursor: Option<String>,
}

impl PathBuilder {
    /// Create a new PathBuilder
    pub fn new() -> Self {
        Self::default()
    }

    pub fn operation(mut self, operation: DfwOperation) -> Self {
        self.operation = Some(operation);
        self
    }

    pub fn section(mut self, section_id: impl Into<String>) -> Self {
        self.section = Some(section_id.into());
        self
    }

    pub fn rule(mut self, rule_id: impl Into<String>) -> Self {
        self.rule = Some(rule_id.into());
        self
    }

    /// Pagination cursor, only honoured for list operations
    pub fn cursor(mut self, cursor: Option<impl Into<String>>) -> Self {
        self.cursor = cursor.map(Into::into);
        self
    }

    // Build methods
    pub fn build_http_path(&self) -> Result<String, PathBuilderError> {
        self.build(PathFormat::HttpPath)
    }

    pub fn build_relative_path(&self) -> Result<String, PathBuilderError> {
        self.build(PathFormat::Relative)
    }

    // Generic build with format
    pub fn build(&self, format: PathFormat) -> Result<String, PathBuilderError> {
        let op = self.operation.ok_or(PathBuilderError::MissingOperation)?;

        let path = match op {
            DfwOperation::ListSections | DfwOperation::CreateSection => firewall::sections(),
            DfwOperation::GetSection | DfwOperation::DeleteSection => {
                firewall::section(self.segment(&self.section, "section")?)
            }
            DfwOperation::ListRules | DfwOperation::CreateRule => {
                firewall::section_rules(self.segment(&self.section, "section")?)
            }
            DfwOperation::UpdateRule | DfwOperation::DeleteRule => firewall::section_rule(
                self.segment(&self.section, "section")?,
                self.segment(&self.rule, "rule")?,
            ),
            DfwOperation::GetRule => firewall::rule(self.segment(&self.rule, "rule")?),
        };

        let path = match (op, self.cursor.as_deref()) {
            (DfwOperation::ListSections | DfwOperation::ListRules, Some(cursor)) => {
                format!("{path}?cursor={}", encode_query_value(cursor))
            }
            _ => path,
        };

        Ok(match format {
            PathFormat::HttpPath => format!("{}/{}", firewall::NSXT_DFW_BASE, path),
            PathFormat::Relative => path,
        })
    }

    fn segment<'a>(
        &self,
        value: &'a Option<String>,
        name: &'static str,
    ) -> Result<&'a str, PathBuilderError> {
        let value = value
            .as_deref()
            .ok_or(PathBuilderError::MissingRequiredParameter(name))?;
        if value.is_empty() || value.contains(['/', '?']) {
            return Err(PathBuilderError::InvalidSegment(value.to_string()));
        }
        Ok(value)
    }
}

/// Percent-encode everything outside the RFC 3986 unreserved set
fn encode_query_value(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                encoded.push(char::from(byte));
            }
            _ => {
                const HEX: &[u8; 16] = b"0123456789ABCDEF";
                encoded.push('%');
                encoded.push(char::from(HEX[usize::from(byte >> 4)]));
                encoded.push(char::from(HEX[usize::from(byte & 0x0F)]));
            }
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firewall::{parse_path, FirewallResource};

    #[test]
    fn test_build_every_operation() {
        let cases = [
            (DfwOperation::ListSections, "/api/v1/firewall/sections"),
            (DfwOperation::CreateSection, "/api/v1/firewall/sections"),
            (DfwOperation::GetSection, "/api/v1/firewall/sections/s1"),
            (DfwOperation::DeleteSection, "/api/v1/firewall/sections/s1"),
            (DfwOperation::ListRules, "/api/v1/firewall/sections/s1/rules"),
            (DfwOperation::CreateRule, "/api/v1/firewall/sections/s1/rules"),
            (DfwOperation::UpdateRule, "/api/v1/firewall/sections/s1/rules/r1"),
            (DfwOperation::DeleteRule, "/api/v1/firewall/sections/s1/rules/r1"),
            (DfwOperation::GetRule, "/api/v1/firewall/rules/r1"),
        ];

        for (op, expected) in cases {
            let path = PathBuilder::new()
                .operation(op)
                .section("s1")
                .rule("r1")
                .build_http_path()
                .unwrap();
            assert_eq!(path, expected, "path for {op:?}");
        }
    }

    #[test]
    fn test_relative_path() {
        let path = PathBuilder::new()
            .operation(DfwOperation::ListRules)
            .section("s1")
            .build_relative_path()
            .unwrap();
        assert_eq!(path, "sections/s1/rules");
    }

    #[test]
    fn test_missing_section() {
        let err = PathBuilder::new()
            .operation(DfwOperation::CreateRule)
            .build_http_path()
            .unwrap_err();
        assert_eq!(err, PathBuilderError::MissingRequiredParameter("section"));
    }

    #[test]
    fn test_missing_operation() {
        let err = PathBuilder::new().section("s1").build_http_path().unwrap_err();
        assert_eq!(err, PathBuilderError::MissingOperation);
    }

    #[test]
    fn test_rejects_segment_with_slash() {
        let err = PathBuilder::new()
            .operation(DfwOperation::GetRule)
            .rule("r1/../../x")
            .build_http_path()
            .unwrap_err();
        assert!(matches!(err, PathBuilderError::InvalidSegment(_)));
    }

    #[test]
    fn test_cursor_only_on_list() {
        let list = PathBuilder::new()
            .operation(DfwOperation::ListSections)
            .cursor(Some("c1"))
            .build_http_path()
            .unwrap();
        assert_eq!(list, "/api/v1/firewall/sections?cursor=c1");

        let get = PathBuilder::new()
            .operation(DfwOperation::GetSection)
            .section("s1")
            .cursor(Some("c1"))
            .build_http_path()
            .unwrap();
        assert_eq!(get, "/api/v1/firewall/sections/s1");
    }

    #[test]
    fn test_cursor_is_percent_encoded() {
        let path = PathBuilder::new()
            .operation(DfwOperation::ListRules)
            .section("s1")
            .cursor(Some("00064+a=b&c/d é"))
            .build_relative_path()
            .unwrap();
        assert_eq!(
            path,
            "sections/s1/rules?cursor=00064%2Ba%3Db%26c%2Fd%20%C3%A9"
        );
    }

    #[test]
    fn test_built_paths_parse_back() {
        let path = PathBuilder::new()
            .operation(DfwOperation::DeleteRule)
            .section("s1")
            .rule("r9")
            .build_http_path()
            .unwrap();
        assert_eq!(
            parse_path(&path),
            Some(FirewallResource::SectionRule {
                section_id: "s1".to_string(),
                rule_id: "r9".to_string(),
            })
        );
    }
}
