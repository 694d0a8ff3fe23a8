//! Wire messages of the engine's gRPC protocol.
//!
//! Declared by hand with `prost` derives instead of generated from `.proto`
//! files, so the crate builds without `protoc`.

#![allow(missing_docs)]

use crate::engine::types::UastMode;

pub const PARSE_PATH: &str = "/gopkg.in.bblfsh.sdk.v2.protocol.Driver/Parse";
pub const SERVER_VERSION_PATH: &str = "/gopkg.in.bblfsh.sdk.v2.protocol.DriverHost/ServerVersion";
pub const SUPPORTED_LANGUAGES_PATH: &str =
    "/gopkg.in.bblfsh.sdk.v2.protocol.DriverHost/SupportedLanguages";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Mode {
    DefaultMode = 0,
    Native = 1,
    Preprocessed = 2,
    Annotated = 4,
    Semantic = 8,
}

impl From<UastMode> for Mode {
    fn from(mode: UastMode) -> Self {
        match mode {
            UastMode::Native => Mode::Native,
            UastMode::Annotated => Mode::Annotated,
            UastMode::Semantic => Mode::Semantic,
        }
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ParseRequest {
    #[prost(string, tag = "1")]
    pub content: String,
    #[prost(enumeration = "Mode", tag = "2")]
    pub mode: i32,
    #[prost(string, tag = "3")]
    pub language: String,
    #[prost(string, tag = "4")]
    pub filename: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ParseError {
    #[prost(string, tag = "1")]
    pub text: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ParseResponse {
    /// Graph-encoded tree, see `engine::nodes`.
    #[prost(bytes = "vec", tag = "1")]
    pub uast: Vec<u8>,
    #[prost(string, tag = "2")]
    pub language: String,
    #[prost(message, repeated, tag = "3")]
    pub errors: Vec<ParseError>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VersionRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Version {
    #[prost(string, tag = "1")]
    pub version: String,
    #[prost(message, optional, tag = "2")]
    pub build: Option<::prost_types::Timestamp>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VersionResponse {
    #[prost(message, optional, tag = "1")]
    pub version: Option<Version>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SupportedLanguagesRequest {}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum DevelopmentStatus {
    Inactive = 0,
    Planning = 1,
    PreAlpha = 2,
    Alpha = 3,
    Beta = 4,
    Stable = 5,
    Mature = 6,
}

impl DevelopmentStatus {
    pub fn label(&self) -> &'static str {
        match self {
            DevelopmentStatus::Inactive => "inactive",
            DevelopmentStatus::Planning => "planning",
            DevelopmentStatus::PreAlpha => "pre-alpha",
            DevelopmentStatus::Alpha => "alpha",
            DevelopmentStatus::Beta => "beta",
            DevelopmentStatus::Stable => "stable",
            DevelopmentStatus::Mature => "mature",
        }
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DriverManifest {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub language: String,
    #[prost(string, tag = "3")]
    pub version: String,
    #[prost(enumeration = "DevelopmentStatus", tag = "4")]
    pub status: i32,
    #[prost(string, repeated, tag = "5")]
    pub features: Vec<String>,
    #[prost(string, repeated, tag = "6")]
    pub aliases: Vec<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SupportedLanguagesResponse {
    #[prost(message, repeated, tag = "1")]
    pub languages: Vec<DriverManifest>,
}

impl From<DriverManifest> for crate::engine::types::DriverManifest {
    fn from(m: DriverManifest) -> Self {
        let status = DevelopmentStatus::try_from(m.status)
            .map(|s| s.label().to_string())
            .unwrap_or_else(|_| m.status.to_string());
        Self {
            name: m.name,
            language: m.language,
            version: m.version,
            status,
            features: m.features,
            aliases: m.aliases,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn test_mode_wire_values() {
        assert_eq!(Mode::from(UastMode::Native) as i32, 1);
        assert_eq!(Mode::from(UastMode::Annotated) as i32, 4);
        assert_eq!(Mode::from(UastMode::Semantic) as i32, 8);
    }

    #[test]
    fn test_parse_request_encoding() {
        let request = ParseRequest {
            content: "x".into(),
            mode: Mode::Semantic as i32,
            language: String::new(),
            filename: String::new(),
        };
        // field 1 (len 1, "x"), field 2 (varint 8); empty strings are omitted
        assert_eq!(request.encode_to_vec(), vec![0x0a, 0x01, b'x', 0x10, 0x08]);
    }

    #[test]
    fn test_manifest_status_label() {
        let manifest = DriverManifest {
            name: "Python".into(),
            language: "python".into(),
            version: "v2.9.0".into(),
            status: DevelopmentStatus::Beta as i32,
            features: vec!["ast".into(), "uast".into()],
            aliases: vec![],
        };
        let converted = crate::engine::types::DriverManifest::from(manifest);
        assert_eq!(converted.status, "beta");
        assert_eq!(converted.language, "python");

        let unknown = DriverManifest {
            status: 42,
            ..Default::default()
        };
        assert_eq!(crate::engine::types::DriverManifest::from(unknown).status, "42");
    }
}
