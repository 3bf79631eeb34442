//! Output format definitions for PathBuilder
//!
//! - HttpPath: absolute API path sent to the NSX manager
//! - Relative: path relative to the firewall base, as logged per listing page

/// Output format for path construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathFormat {
    /// Absolute API path: "/api/v1/firewall/sections/s1/rules"
    HttpPath,

    /// Relative to the firewall base: "sections/s1/rules"
    Relative,
}
