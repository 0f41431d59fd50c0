use crate::enums::DataEncoding;

/// Basic Error types.
#[derive(Debug)]
pub enum MseedError {
    /// TryFromSliceError from the std library.
    TryFromSlice(std::array::TryFromSliceError),
    /// FromUtf8Error from the std library.
    TryFromUtf8(std::string::FromUtf8Error),
    /// IoError from the std library.
    StdIoError(std::io::Error),
    /// End of the input was reached cleanly. Informational, not a failure.
    EndOfFile,
    /// No recognizable record header was found in the input.
    NotMiniseed,
    /// Too few bytes are available for the declared record length.
    Truncated { have: usize, need: usize },
    /// A declared length is out of range or not a multiple of the codec granularity.
    BadLength { len: usize },
    /// The encoding code is not in the known set, or cannot be decoded.
    UnknownEncoding { code: u8 },
    /// The stored CRC does not match the one computed over the record.
    BadCrc { stored: u32, computed: u32 },
    /// A Steim frame contains an invalid or unsupported nibble.
    SteimBadNibble { nibble: u8, word: usize },
    /// The reverse integration constant does not match the last decoded sample.
    SteimXnMismatch { expected: i32, actual: i32 },
    /// A difference is too wide for the target Steim packing.
    SteimRange { diff: i64 },
    /// A sample buffer cannot be written with the requested encoding.
    EncodingMismatch {
        encoding: DataEncoding,
        sample_type: char,
    },
    /// An error caused by an invalid or inconsistent header field.
    InvalidHeader { msg: String },
    /// A source identifier could not be parsed or composed.
    InvalidSid { msg: String },
    /// A time value could not be converted or parsed.
    TimeError { msg: String },
    /// The extra-header CBOR document is malformed.
    CborError { msg: String },
    /// The operation is not supported for this document shape.
    Unsupported { msg: String },
    /// A selection entry or selection file line could not be parsed.
    SelectionError { msg: String },
    #[cfg(feature = "to_json")]
    /// Serialisation/Deserialisation error.
    SerdeError(serde_json::Error),
}

impl From<std::array::TryFromSliceError> for MseedError {
    fn from(e: std::array::TryFromSliceError) -> Self {
        Self::TryFromSlice(e)
    }
}

impl From<std::string::FromUtf8Error> for MseedError {
    fn from(e: std::string::FromUtf8Error) -> Self {
        Self::TryFromUtf8(e)
    }
}

impl From<std::io::Error> for MseedError {
    fn from(e: std::io::Error) -> Self {
        Self::StdIoError(e)
    }
}

impl std::fmt::Display for MseedError {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use self::MseedError::*;
        match self {
            #[cfg(feature = "to_json")]
            SerdeError(x) => write!(fmt, "{}", x),
            StdIoError(x) => write!(fmt, "{}", x),
            TryFromSlice(x) => write!(fmt, "{}", x),
            TryFromUtf8(x) => write!(fmt, "{}", x),
            EndOfFile => write!(fmt, "End of file"),
            NotMiniseed => write!(fmt, "No miniSEED record was found in the input"),
            Truncated { have, need } => write!(fmt, "Record is truncated: have {} bytes of {}", have, need),
            BadLength { len } => write!(fmt, "Record or payload length {} is invalid", len),
            UnknownEncoding { code } => write!(fmt, "Encoding {} is unknown or cannot be decoded", code),
            BadCrc { stored, computed } => write!(fmt, "CRC mismatch: stored {:#010X}, computed {:#010X}", stored, computed),
            SteimBadNibble { nibble, word } => write!(fmt, "Invalid Steim nibble {} in frame word {}", nibble, word),
            SteimXnMismatch { expected, actual } => write!(fmt, "Steim reverse integration constant is {} but last sample is {}", expected, actual),
            SteimRange { diff } => write!(fmt, "Difference {} is too wide for Steim packing", diff),
            EncodingMismatch { encoding, sample_type } => write!(fmt, "Sample type '{}' cannot be written as {:?}", sample_type, encoding),
            InvalidHeader { msg } => write!(fmt, "Invalid header: {}", msg),
            InvalidSid { msg } => write!(fmt, "Invalid source identifier: {}", msg),
            TimeError { msg } => write!(fmt, "Time conversion failed: {}", msg),
            CborError { msg } => write!(fmt, "Malformed extra headers: {}", msg),
            Unsupported { msg } => write!(fmt, "Unsupported: {}", msg),
            SelectionError { msg } => write!(fmt, "Could not parse selection: {}", msg),
        }
    }
}

impl From<MseedError> for String {
    fn from(e: MseedError) -> String {
        e.to_string()
    }
}

impl std::error::Error for MseedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        use self::MseedError::*;
        match self {
            #[cfg(feature = "to_json")]
            SerdeError(x) => x.source(),
            StdIoError(x) => x.source(),
            TryFromSlice(x) => x.source(),
            TryFromUtf8(x) => x.source(),
            _ => None,
        }
    }
}
