//! Peer identifier rules applied by connection acceptors.
//!
//! The registry itself only distinguishes empty from non-empty ids;
//! acceptors use [`validate_peer_id`] before building a handle.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PeerIdError {
    #[error("peer id is empty")]
    Empty,
    #[error("peer id is {len} bytes, limit is {max}")]
    TooLong { len: usize, max: usize },
    #[error("peer id contains whitespace or control characters")]
    InvalidCharacter,
}

/// Trim and check a peer identifier announced by a connecting client.
pub fn validate_peer_id(raw: &str, max_len: usize) -> Result<&str, PeerIdError> {
    let id = raw.trim();
    if id.is_empty() {
        return Err(PeerIdError::Empty);
    }
    if id.len() > max_len {
        return Err(PeerIdError::TooLong {
            len: id.len(),
            max: max_len,
        });
    }
    if id.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(PeerIdError::InvalidCharacter);
    }
    Ok(id)
}
