use crate::{ClientError, Result};
use std::time::Duration;

// -- Capacity ceilings of the boundary's fixed buffers --
pub const MAX_NUMBER_OF_HOSTS: usize = 100;
pub const MAX_NUMBER_OF_DONGLES: usize = 16;
pub const MAX_NUMBER_OF_GLOVES: usize = MAX_NUMBER_OF_DONGLES * 2;
pub const MAX_NUMBER_OF_USERS: usize = MAX_NUMBER_OF_DONGLES;
pub const MAX_NUMBER_OF_SKELETONS: usize = 32;
pub const NUMBER_OF_TRACKERS_PER_POLYGON_SKELETON: usize = 8;
pub const MAX_NUMBER_OF_TRACKERS: usize =
    MAX_NUMBER_OF_USERS * NUMBER_OF_TRACKERS_PER_POLYGON_SKELETON;
pub const MAX_NUMBER_OF_SESSIONS: usize = 8;
/// Setups that may be under construction at once in one session.
pub const MAX_NUMBER_OF_SKELETONS_PER_SESSION: usize = 32;
pub const MAX_NUMBER_OF_NODES_PER_ESTIMATION_SKELETON: usize = 40;

// -- Skeleton setup geometry --
pub const MAX_CHAIN_LENGTH: usize = 32;
pub const MAX_NUM_FINGER_IDS: usize = 10;
pub const MAX_NUM_TOE_IDS: usize = 10;
pub const NUM_FINGERS_ON_HAND: usize = 5;

// -- Fixed string fields, including the terminating NUL --
pub const MAX_NUM_CHARS_IN_HOST_NAME: usize = 256;
pub const MAX_NUM_CHARS_IN_IP_ADDRESS: usize = 40;
pub const MAX_NUM_CHARS_IN_TRACKER_ID: usize = 32;
pub const MAX_NUM_CHARS_IN_TARGET_ID: usize = 32;
pub const MAX_NUM_CHARS_IN_VERSION: usize = 16;
pub const MAX_NUM_CHARS_IN_NODE_NAME: usize = 256;
pub const MAX_NUM_CHARS_IN_SKELETON_NAME: usize = 256;

// -- Client cadence defaults --
pub const SECONDS_TO_FIND_HOSTS: u32 = 1;
pub const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(1000);
/// Roughly 30 Hz.
pub const POLL_INTERVAL: Duration = Duration::from_millis(33);

/// Check that `value` fits a fixed-size NUL-terminated field of `capacity` bytes.
///
/// `field` names the field in the error message.
pub fn check_fixed_string(field: &str, value: &str, capacity: usize) -> Result<()> {
    if capacity == 0 {
        return Err(ClientError::InvalidArgument(format!(
            "{} has no room for a string",
            field
        )));
    }
    if value.as_bytes().contains(&0) {
        return Err(ClientError::InvalidArgument(format!(
            "{} contains an interior NUL byte",
            field
        )));
    }
    if value.len() >= capacity {
        return Err(ClientError::InvalidArgument(format!(
            "{} is {} bytes, which does not fit in {} (including NUL)",
            field,
            value.len(),
            capacity
        )));
    }
    Ok(())
}

/// Copy `value` into a fixed NUL-terminated buffer, truncating on a UTF-8
/// boundary when it does not fit.
pub fn copy_to_fixed<const N: usize>(value: &str) -> [u8; N] {
    let mut buf = [0u8; N];
    if N == 0 {
        return buf;
    }
    let mut len = value.len().min(N - 1);
    while !value.is_char_boundary(len) {
        len -= 1;
    }
    buf[..len].copy_from_slice(&value.as_bytes()[..len]);
    buf
}

/// Extract a NUL-terminated string from a fixed buffer.
pub fn extract_string(data: &[u8]) -> String {
    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    String::from_utf8_lossy(&data[..end]).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_fixed_string_limits() {
        assert!(check_fixed_string("name", "Hand", MAX_NUM_CHARS_IN_NODE_NAME).is_ok());
        let exactly = "x".repeat(MAX_NUM_CHARS_IN_NODE_NAME - 1);
        assert!(check_fixed_string("name", &exactly, MAX_NUM_CHARS_IN_NODE_NAME).is_ok());
        let too_long = "x".repeat(MAX_NUM_CHARS_IN_NODE_NAME);
        assert!(matches!(
            check_fixed_string("name", &too_long, MAX_NUM_CHARS_IN_NODE_NAME),
            Err(ClientError::InvalidArgument(_))
        ));
        assert!(check_fixed_string("name", "a\0b", 16).is_err());
        assert!(check_fixed_string("name", "", 0).is_err());
    }

    #[test]
    fn test_copy_to_fixed_truncates_on_char_boundary() {
        // "é" is two bytes; only one fits before the NUL.
        let buf: [u8; 3] = copy_to_fixed("aé");
        assert_eq!(&buf, &[b'a', 0, 0]);
        assert_eq!(extract_string(&buf), "a");
    }

    #[test]
    fn test_extract_string() {
        let buf: [u8; 16] = copy_to_fixed("LeftHand");
        assert_eq!(extract_string(&buf), "LeftHand");
        assert_eq!(extract_string(b"abc"), "abc");
    }

    #[test]
    fn test_tracker_capacity() {
        assert_eq!(MAX_NUMBER_OF_TRACKERS, 128);
        assert_eq!(MAX_NUMBER_OF_GLOVES, 32);
    }
}
