use std::fmt;

/// Result codes returned by every call across the Core SDK boundary.
///
/// `Success` never appears inside an `Err`; boundary calls return
/// `Result<T, SdkReturnCode>` and map success to `Ok`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SdkReturnCode {
    Success = 0,
    Error = 1,
    InvalidArgument = 2,
    ArgumentSizeMismatch = 3,
    UnsupportedStringSizeEncountered = 4,
    SdkNotAvailable = 5,
    HostFinderNotAvailable = 6,
    DataNotAvailable = 7,
    MemoryError = 8,
    InternalError = 9,
    FunctionCalledAtWrongTime = 10,
    NotConnected = 11,
    ConnectionTimeout = 12,
    InvalidId = 13,
    NullPointer = 14,
    InvalidSequence = 15,
    NoCoordinateSystemSet = 16,
    SdkIsTerminating = 17,
    StubNullPointer = 18,
    SkeletonNotLoaded = 19,
    FunctionNotAvailable = 20,
}

/// Coarse grouping of boundary failures, used to decide between retrying,
/// surfacing and shutting down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Called before the required setup step.
    Precondition,
    /// Invalid id, size mismatch or null pointer.
    Reference,
    /// A fixed maximum was exceeded.
    Capacity,
    /// Not connected or timed out; worth retrying.
    Transient,
    /// The SDK is gone or broken; shut down instead of calling further.
    Fatal,
}

impl SdkReturnCode {
    const ALL: [SdkReturnCode; 21] = [
        SdkReturnCode::Success,
        SdkReturnCode::Error,
        SdkReturnCode::InvalidArgument,
        SdkReturnCode::ArgumentSizeMismatch,
        SdkReturnCode::UnsupportedStringSizeEncountered,
        SdkReturnCode::SdkNotAvailable,
        SdkReturnCode::HostFinderNotAvailable,
        SdkReturnCode::DataNotAvailable,
        SdkReturnCode::MemoryError,
        SdkReturnCode::InternalError,
        SdkReturnCode::FunctionCalledAtWrongTime,
        SdkReturnCode::NotConnected,
        SdkReturnCode::ConnectionTimeout,
        SdkReturnCode::InvalidId,
        SdkReturnCode::NullPointer,
        SdkReturnCode::InvalidSequence,
        SdkReturnCode::NoCoordinateSystemSet,
        SdkReturnCode::SdkIsTerminating,
        SdkReturnCode::StubNullPointer,
        SdkReturnCode::SkeletonNotLoaded,
        SdkReturnCode::FunctionNotAvailable,
    ];

    /// Decode a raw code; unknown values map to `Error`.
    pub fn from_raw(raw: u32) -> Self {
        Self::ALL
            .get(raw as usize)
            .copied()
            .unwrap_or(SdkReturnCode::Error)
    }

    /// Turn a raw code into a `Result`.
    pub fn check(raw: u32) -> std::result::Result<(), SdkReturnCode> {
        match Self::from_raw(raw) {
            SdkReturnCode::Success => Ok(()),
            code => Err(code),
        }
    }

    pub fn class(self) -> ErrorClass {
        match self {
            SdkReturnCode::FunctionCalledAtWrongTime
            | SdkReturnCode::InvalidSequence
            | SdkReturnCode::NoCoordinateSystemSet
            | SdkReturnCode::SkeletonNotLoaded
            | SdkReturnCode::DataNotAvailable
            | SdkReturnCode::FunctionNotAvailable => ErrorClass::Precondition,
            SdkReturnCode::InvalidArgument
            | SdkReturnCode::ArgumentSizeMismatch
            | SdkReturnCode::UnsupportedStringSizeEncountered
            | SdkReturnCode::InvalidId
            | SdkReturnCode::NullPointer
            | SdkReturnCode::StubNullPointer => ErrorClass::Reference,
            SdkReturnCode::MemoryError => ErrorClass::Capacity,
            SdkReturnCode::NotConnected
            | SdkReturnCode::ConnectionTimeout
            | SdkReturnCode::HostFinderNotAvailable => ErrorClass::Transient,
            SdkReturnCode::Success
            | SdkReturnCode::Error
            | SdkReturnCode::SdkNotAvailable
            | SdkReturnCode::InternalError
            | SdkReturnCode::SdkIsTerminating => ErrorClass::Fatal,
        }
    }

    pub fn is_fatal(self) -> bool {
        self.class() == ErrorClass::Fatal
    }
}

impl fmt::Display for SdkReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self, *self as u32)
    }
}

impl std::error::Error for SdkReturnCode {}

/// Errors reported by the client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Too many {what} (maximum {max})")]
    ResourceExhausted { what: &'static str, max: usize },

    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Skeleton setup not ready to load: {0}")]
    NotReady(String),

    #[error("Skeleton {0} is not loaded")]
    SkeletonNotLoaded(u32),

    #[error("Platform specific initialization failed: {0}")]
    FailedPlatformSpecificInitialization(String),

    #[error("Failed to initialize the SDK: {0}")]
    FailedToInitialize(SdkReturnCode),

    #[error("No hosts found: {0}")]
    FailedToFindHosts(String),

    #[error("Failed to connect to host: {0}")]
    FailedToConnect(SdkReturnCode),

    #[error("Failed to shut down the SDK: {0}")]
    FailedToShutDownSdk(SdkReturnCode),

    #[error("Platform specific shutdown failed: {0}")]
    FailedPlatformSpecificShutdown(String),

    #[error("Cancelled by shutdown request")]
    Cancelled,

    #[error("{call} failed: {code}")]
    Sdk {
        call: &'static str,
        code: SdkReturnCode,
    },
}

impl ClientError {
    /// Wrap a boundary failure for the named call.
    pub fn sdk(call: &'static str) -> impl FnOnce(SdkReturnCode) -> ClientError {
        move |code| ClientError::Sdk { call, code }
    }

    /// Failures the connect loop retries.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::FailedToFindHosts(_) => true,
            ClientError::FailedToConnect(code) | ClientError::Sdk { code, .. } => {
                code.class() == ErrorClass::Transient
            }
            _ => false,
        }
    }

    /// The boundary code behind this error, if any.
    pub fn sdk_code(&self) -> Option<SdkReturnCode> {
        match self {
            ClientError::FailedToInitialize(code)
            | ClientError::FailedToConnect(code)
            | ClientError::FailedToShutDownSdk(code)
            | ClientError::Sdk { code, .. } => Some(*code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_round_trips_known_codes() {
        assert_eq!(SdkReturnCode::from_raw(0), SdkReturnCode::Success);
        assert_eq!(SdkReturnCode::from_raw(11), SdkReturnCode::NotConnected);
        assert_eq!(SdkReturnCode::from_raw(20), SdkReturnCode::FunctionNotAvailable);
        assert_eq!(SdkReturnCode::from_raw(999), SdkReturnCode::Error);
    }

    #[test]
    fn test_check() {
        assert!(SdkReturnCode::check(0).is_ok());
        assert_eq!(SdkReturnCode::check(16), Err(SdkReturnCode::NoCoordinateSystemSet));
    }

    #[test]
    fn test_classes() {
        assert_eq!(SdkReturnCode::NotConnected.class(), ErrorClass::Transient);
        assert_eq!(SdkReturnCode::ArgumentSizeMismatch.class(), ErrorClass::Reference);
        assert_eq!(SdkReturnCode::InvalidSequence.class(), ErrorClass::Precondition);
        assert!(SdkReturnCode::SdkIsTerminating.is_fatal());
    }

    #[test]
    fn test_transient_errors() {
        assert!(ClientError::FailedToFindHosts("none".into()).is_transient());
        assert!(ClientError::FailedToConnect(SdkReturnCode::NotConnected).is_transient());
        assert!(!ClientError::FailedToConnect(SdkReturnCode::SdkNotAvailable).is_transient());
        assert!(!ClientError::FailedToConnect(SdkReturnCode::NoCoordinateSystemSet).is_transient());
        assert!(!ClientError::Cancelled.is_transient());
    }

    #[test]
    fn test_reference_and_capacity_errors_are_not_retried() {
        for code in [
            SdkReturnCode::InvalidArgument,
            SdkReturnCode::ArgumentSizeMismatch,
            SdkReturnCode::InvalidId,
            SdkReturnCode::NullPointer,
            SdkReturnCode::MemoryError,
        ] {
            let err = ClientError::Sdk {
                call: "look for hosts",
                code,
            };
            assert!(!err.is_transient(), "{} retried", code);
            assert!(!ClientError::FailedToConnect(code).is_transient());
        }
        assert!(ClientError::FailedToConnect(SdkReturnCode::ConnectionTimeout).is_transient());
        assert!(ClientError::Sdk {
            call: "look for hosts",
            code: SdkReturnCode::HostFinderNotAvailable,
        }
        .is_transient());
    }
}
