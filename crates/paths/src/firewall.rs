//! NSX-T distributed firewall API paths
//!
//! Every function returns the path relative to [`NSXT_DFW_BASE`]; the
//! builder decides whether to prefix it.

/// Base path of the NSX-T distributed firewall API
pub const NSXT_DFW_BASE: &str = "/api/v1/firewall";

/// Sections collection
pub const SECTIONS: &str = "sections";

pub fn sections() -> String {
    SECTIONS.to_string()
}

pub fn section(section_id: &str) -> String {
    format!("{SECTIONS}/{section_id}")
}

pub fn section_rules(section_id: &str) -> String {
    format!("{SECTIONS}/{section_id}/rules")
}

pub fn section_rule(section_id: &str, rule_id: &str) -> String {
    format!("{SECTIONS}/{section_id}/rules/{rule_id}")
}

/// Rules can be fetched by id without knowing their section
pub fn rule(rule_id: &str) -> String {
    format!("rules/{rule_id}")
}

/// Resource addressed by an absolute firewall API path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FirewallResource {
    Sections,
    Section { section_id: String },
    SectionRules { section_id: String },
    SectionRule { section_id: String, rule_id: String },
    Rule { rule_id: String },
}

/// Classify an absolute path (query string ignored) into the resource it addresses.
///
/// Returns `None` for anything outside the firewall surface.
pub fn parse_path(path: &str) -> Option<FirewallResource> {
    let path = path.split('?').next().unwrap_or_default();
    let rest = path.strip_prefix(NSXT_DFW_BASE)?.trim_start_matches('/');
    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();

    match segments.as_slice() {
        ["sections"] => Some(FirewallResource::Sections),
        ["sections", id] => Some(FirewallResource::Section {
            section_id: (*id).to_string(),
        }),
        ["sections", id, "rules"] => Some(FirewallResource::SectionRules {
            section_id: (*id).to_string(),
        }),
        ["sections", sid, "rules", rid] => Some(FirewallResource::SectionRule {
            section_id: (*sid).to_string(),
            rule_id: (*rid).to_string(),
        }),
        ["rules", id] => Some(FirewallResource::Rule {
            rule_id: (*id).to_string(),
        }),
        _ => None,
    }
}
