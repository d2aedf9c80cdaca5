//! Kernel metadata reported in `kernel_info_reply`.

use serde::{Deserialize, Serialize};

/// Jupyter messaging protocol version implemented by this kernel.
pub const PROTOCOL_VERSION: &str = "5.3";

const BANNER: &str = "The core language of Miking - a meta language system
for creating embedded domain-specific and general-purpose languages";

/// Static description of the kernel and its guest language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelInfo {
    pub protocol_version: String,
    pub implementation: String,
    pub implementation_version: String,
    pub language_info: LanguageInfo,
    pub banner: String,
    pub help_links: Vec<HelpLink>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageInfo {
    pub name: String,
    pub version: String,
    pub mimetype: String,
    pub file_extension: String,
    /// Editor syntax-highlighting hint.
    pub codemirror_mode: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelpLink {
    pub text: String,
    pub url: String,
}

impl KernelInfo {
    pub fn mcore() -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            implementation: "IMCore".to_string(),
            implementation_version: "0.1".to_string(),
            language_info: LanguageInfo {
                name: "MCore".to_string(),
                version: "0.1".to_string(),
                mimetype: "text/plain".to_string(),
                file_extension: ".mc".to_string(),
                codemirror_mode: "ocaml".to_string(),
            },
            banner: BANNER.to_string(),
            help_links: Vec::new(),
        }
    }
}

impl Default for KernelInfo {
    fn default() -> Self {
        Self::mcore()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_metadata() {
        let info = KernelInfo::mcore();
        assert_eq!(info.implementation, "IMCore");
        assert_eq!(info.language_info.name, "MCore");
        assert_eq!(info.language_info.version, "0.1");
        assert_eq!(info.language_info.file_extension, ".mc");
        assert_eq!(info.language_info.codemirror_mode, "ocaml");
        assert!(info.banner.starts_with("The core language of Miking"));
    }

    #[test]
    fn test_serialized_shape() {
        let value = serde_json::to_value(KernelInfo::mcore()).unwrap();
        assert_eq!(value["protocol_version"], "5.3");
        assert_eq!(value["language_info"]["mimetype"], "text/plain");
        assert_eq!(value["help_links"], serde_json::json!([]));
    }
}
