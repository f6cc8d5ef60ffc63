//! Compile-time constants shared by the column crates

pub mod refresh {
    /// Coalescing window for "fields became ready" view refreshes
    pub const DEFAULT_REFRESH_DELAY_MS: u64 = 100;
}

pub mod template {
    /// Default nesting limit applied at registration
    pub const DEFAULT_MAX_TEMPLATE_DEPTH: usize = 32;

    /// Hard ceiling a runtime preference may not exceed
    /// SECURITY: evaluation recurses once per nesting level
    pub const MAX_TEMPLATE_DEPTH: usize = 64;

    /// Maximum number of nodes in a single template
    pub const MAX_TEMPLATE_NODES: usize = 4096;
}

pub mod view {
    /// Row flag marking a synthetic group-header row (nsMsgViewFlagsType dummy)
    pub const PLACEHOLDER_ROW_FLAG: u32 = 0x2000_0000;
}

pub mod host {
    /// First host major version whose column elements take the ordinal as a
    /// property instead of a plain attribute
    pub const ORDINAL_PROPERTY_MIN_VERSION: u32 = 74;

    /// Host version assumed when none is configured
    pub const DEFAULT_HOST_VERSION: &str = "115.0";
}

pub mod element {
    /// Attributes the host persists per column element
    pub const PERSISTED_ATTRIBUTES: &str = "hidden ordinal sortDirection width";

    pub const DEFAULT_FLEX: &str = "2";

    pub const DEFAULT_CLOSEMENU: &str = "none";

    /// Attribute name that is version-gated when restored
    pub const ORDINAL_ATTRIBUTE: &str = "ordinal";
}
