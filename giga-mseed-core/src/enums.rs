//! This contains the enums that describe fixed-value header fields of miniSEED records.
//!
//! Both format versions use small integer codes for the payload encoding, and version 2.4
//! additionally has a header byte order and a quality indicator. These only take certain
//! values, which lends itself well to being represented by enums. Codes that are defined
//! by the format but can no longer be produced (the legacy gain-ranged families) are kept
//! as variants so that old archives can at least be identified, even where decoding them
//! is not supported.
use num::FromPrimitive;
#[cfg(any(feature = "to_json", feature = "serde"))]
use serde::{Deserialize, Serialize};

use crate::errors::*;

/// The payload encoding code, from byte 15 of a v3 header or blockette 1000 of a v2 record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
#[repr(C)]
#[cfg_attr(
    any(feature = "to_json", feature = "serde"),
    derive(Serialize, Deserialize)
)]
pub enum DataEncoding {
    Text = 0,
    Int16 = 1,
    Int24 = 2,
    Int32 = 3,
    Float32 = 4,
    Float64 = 5,
    Steim1 = 10,
    Steim2 = 11,
    GeoScope24 = 12,
    GeoScope163 = 13,
    GeoScope164 = 14,
    UsNational = 15,
    Cdsn = 16,
    Graefenberg = 17,
    Ipgs = 18,
    Steim3 = 19,
    Sro = 30,
    Hglp = 31,
    Dwwssn = 32,
    Rstn = 33,
}

impl std::fmt::Display for DataEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::result::Result<(), std::fmt::Error> {
        write!(f, "{}", self.name())
    }
}

impl DataEncoding {
    pub fn new(code: u8) -> Result<Self, MseedError> {
        DataEncoding::from_u8(code).ok_or(MseedError::UnknownEncoding { code })
    }

    /// A human readable name for record summaries.
    pub fn name(self) -> &'static str {
        match self {
            Self::Text => "Text (UTF-8)",
            Self::Int16 => "16-bit integer",
            Self::Int24 => "24-bit integer (legacy)",
            Self::Int32 => "32-bit integer",
            Self::Float32 => "32-bit float (IEEE)",
            Self::Float64 => "64-bit float (IEEE)",
            Self::Steim1 => "STEIM-1 integer compression",
            Self::Steim2 => "STEIM-2 integer compression",
            Self::GeoScope24 => "GEOSCOPE 24-bit integer (legacy)",
            Self::GeoScope163 => "GEOSCOPE 16-bit gain ranged, 3-bit exponent (legacy)",
            Self::GeoScope164 => "GEOSCOPE 16-bit gain ranged, 4-bit exponent (legacy)",
            Self::UsNational => "US National Network compression (legacy)",
            Self::Cdsn => "CDSN 16-bit gain ranged (legacy)",
            Self::Graefenberg => "Graefenberg 16-bit gain ranged (legacy)",
            Self::Ipgs => "IPG Strasbourg 16-bit gain ranged (legacy)",
            Self::Steim3 => "STEIM-3 integer compression",
            Self::Sro => "SRO 16-bit gain ranged (legacy)",
            Self::Hglp => "HGLP 16-bit gain ranged (legacy)",
            Self::Dwwssn => "DWWSSN 16-bit integer (legacy)",
            Self::Rstn => "RSTN 16-bit gain ranged (legacy)",
        }
    }

    /// The sample type that decoding this encoding produces.
    ///
    /// Encodings that are recognized but cannot be decoded (including STEIM-3,
    /// which is named by the format but has no published decoder) return an error.
    pub fn sample_type(self) -> Result<SampleType, MseedError> {
        use num::ToPrimitive;
        match self {
            Self::Text => Ok(SampleType::Text),
            Self::Int16 | Self::Int32 | Self::Steim1 | Self::Steim2 => Ok(SampleType::Integer32),
            Self::Cdsn | Self::Sro | Self::Dwwssn => Ok(SampleType::Integer32),
            Self::Float32 => Ok(SampleType::Float32),
            Self::Float64 => Ok(SampleType::Float64),
            Self::GeoScope24 | Self::GeoScope163 | Self::GeoScope164 => Ok(SampleType::Float32),
            Self::Int24
            | Self::UsNational
            | Self::Graefenberg
            | Self::Ipgs
            | Self::Steim3
            | Self::Hglp
            | Self::Rstn => Err(MseedError::UnknownEncoding {
                code: self.to_u8().unwrap_or(u8::MAX),
            }),
        }
    }

    /// Whether this library can produce payloads in this encoding.
    pub fn writable(self) -> bool {
        matches!(
            self,
            Self::Text
                | Self::Int16
                | Self::Int32
                | Self::Float32
                | Self::Float64
                | Self::Steim1
                | Self::Steim2
        )
    }
}

/// The type of decoded samples held in a buffer, using the format's single character codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(C)]
#[cfg_attr(
    any(feature = "to_json", feature = "serde"),
    derive(Serialize, Deserialize)
)]
pub enum SampleType {
    /// 32-bit integer samples ('i').
    Integer32 = 105,
    /// 32-bit IEEE float samples ('f').
    Float32 = 102,
    /// 64-bit IEEE float samples ('d').
    Float64 = 100,
    /// Text bytes ('t').
    Text = 116,
}

impl SampleType {
    pub fn new(code: u8) -> Result<Self, MseedError> {
        SampleType::from_u8(code).ok_or(MseedError::InvalidHeader {
            msg: format!("unknown sample type code {}", code),
        })
    }

    /// The single character code used in summaries.
    pub fn as_char(self) -> char {
        (self as u8) as char
    }

    /// The byte length of one sample of this type.
    pub fn byte_length(self) -> usize {
        match self {
            Self::Integer32 | Self::Float32 => 4,
            Self::Float64 => 8,
            Self::Text => 1,
        }
    }
}

/// The byte order of multi-byte header and payload fields.
///
/// Version 3 headers are always little endian; version 2.4 headers may be either,
/// and the order is discovered during detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
#[cfg_attr(
    any(feature = "to_json", feature = "serde"),
    derive(Serialize, Deserialize)
)]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    pub fn is_le(self) -> bool {
        self == ByteOrder::Little
    }
}

/// What to do when an incoming record overlaps samples a trace segment already holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
#[cfg_attr(
    any(feature = "to_json", feature = "serde"),
    derive(Serialize, Deserialize)
)]
pub enum OverlapPolicy {
    /// Keep the existing samples and drop the new record.
    KeepExisting,
    /// Overwrite the overlapped region with the new record's samples.
    Replace,
}
