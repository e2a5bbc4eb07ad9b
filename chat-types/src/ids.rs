//! Identity types for relaychat.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Prefix of every derived conversation id.
pub const CONVERSATION_PREFIX: &str = "p2p_";

/// Prefix of relay-assigned message ids.
pub const RELAY_ID_PREFIX: &str = "msg_";

/// Prefix reserved for locally-assigned message ids.
///
/// The relay never mints ids with this prefix, so local and relay ids
/// cannot collide.
pub const LOCAL_ID_PREFIX: &str = "local_";

/// Milliseconds since the Unix epoch (0 if the clock is before 1970).
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// A normalized phone identifier, always starting with `+`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Normalize raw input into a phone identifier.
    ///
    /// Trims, keeps only digits and `+`, and ensures exactly one leading `+`
    /// (a bare numeric string is treated as missing the marker). Returns
    /// `None` when no digits remain or a `+` appears after the first digit.
    pub fn normalize(raw: &str) -> Option<Self> {
        let kept: String = raw
            .trim()
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '+')
            .collect();
        let digits = kept.trim_start_matches('+');
        if digits.is_empty() || digits.contains('+') {
            return None;
        }
        Some(Self(format!("+{digits}")))
    }

    /// The normalized string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhoneNumber({})", self.0)
    }
}

/// Deterministic, order-independent identifier of a two-party conversation.
///
/// Both participants derive the same id with no handshake.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    /// Derive the conversation id for two phones.
    ///
    /// `p2p_` followed by the lexicographically sorted pair joined with `_`.
    /// Commutative: `derive(a, b) == derive(b, a)`.
    pub fn derive(a: &PhoneNumber, b: &PhoneNumber) -> Self {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        Self(format!(
            "{CONVERSATION_PREFIX}{}_{}",
            first.as_str(),
            second.as_str()
        ))
    }

    /// Parse a stored id (for example a file stem).
    ///
    /// Only canonical ids are accepted: the input must equal what
    /// [`ConversationId::derive`] produces for its two participants.
    pub fn parse(raw: &str) -> Option<Self> {
        let (a, b) = Self(raw.to_string()).participants()?;
        let id = Self::derive(&a, &b);
        (id.0 == raw).then_some(id)
    }

    /// Recover the two participants, in sorted order.
    pub fn participants(&self) -> Option<(PhoneNumber, PhoneNumber)> {
        let rest = self.0.strip_prefix(CONVERSATION_PREFIX)?;
        let (a, b) = rest.split_once('_')?;
        Some((PhoneNumber::normalize(a)?, PhoneNumber::normalize(b)?))
    }

    /// The participant that is not `me`.
    ///
    /// For a conversation with oneself, returns `me`.
    pub fn peer_of(&self, me: &PhoneNumber) -> Option<PhoneNumber> {
        let (a, b) = self.participants()?;
        if &a == me {
            Some(b)
        } else if &b == me {
            Some(a)
        } else {
            None
        }
    }

    /// The string form of the id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConversationId({})", self.0)
    }
}

/// Sequence disambiguating local ids minted within the same millisecond.
static LOCAL_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// A message identifier, either relay-assigned or local.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Mint a relay id: `msg_<millis>_<random base36>`.
    ///
    /// Uniqueness rests on the construction alone; nothing checks for
    /// duplicates.
    pub fn relay() -> Self {
        let suffix: u64 = rand::thread_rng().gen();
        Self(format!(
            "{RELAY_ID_PREFIX}{}_{}",
            unix_millis(),
            to_base36(suffix)
        ))
    }

    /// Mint a local id for a not-yet-acknowledged outgoing message.
    pub fn local() -> Self {
        let seq = LOCAL_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Self(format!("{LOCAL_ID_PREFIX}{}_{seq}", unix_millis()))
    }

    /// Whether this id was assigned locally.
    pub fn is_local(&self) -> bool {
        self.0.starts_with(LOCAL_ID_PREFIX)
    }

    /// The string form of the id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MessageId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageId({})", self.0)
    }
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::with_capacity(13);
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phone(raw: &str) -> PhoneNumber {
        PhoneNumber::normalize(raw).unwrap()
    }

    // ===========================================
    // PhoneNumber Tests
    // ===========================================

    #[test]
    fn normalize_adds_missing_plus() {
        assert_eq!(phone("34600000001").as_str(), "+34600000001");
    }

    #[test]
    fn normalize_trims_and_strips_formatting() {
        assert_eq!(phone("  +34 600-000 001 ").as_str(), "+34600000001");
    }

    #[test]
    fn normalize_keeps_existing_plus() {
        assert_eq!(phone("+1111").as_str(), "+1111");
        assert_eq!(phone("++1111").as_str(), "+1111");
    }

    #[test]
    fn normalize_rejects_empty_and_garbage() {
        assert!(PhoneNumber::normalize("").is_none());
        assert!(PhoneNumber::normalize("   ").is_none());
        assert!(PhoneNumber::normalize("abc").is_none());
        assert!(PhoneNumber::normalize("+").is_none());
        assert!(PhoneNumber::normalize("12+34").is_none());
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = phone(" 600 000 001");
        let twice = phone(once.as_str());
        assert_eq!(once, twice);
    }

    // ===========================================
    // ConversationId Tests
    // ===========================================

    #[test]
    fn conversation_id_is_commutative() {
        let a = phone("+34600000001");
        let b = phone("+34600000002");
        assert_eq!(ConversationId::derive(&a, &b), ConversationId::derive(&b, &a));
    }

    #[test]
    fn conversation_id_matches_known_value() {
        let a = phone("+34600000001");
        let b = phone("+34600000002");
        assert_eq!(
            ConversationId::derive(&b, &a).as_str(),
            "p2p_+34600000001_+34600000002"
        );
    }

    #[test]
    fn conversation_id_has_prefix_and_both_operands() {
        let pairs = [("+1", "+2"), ("+999", "+1000"), ("+44", "+44"), ("+7", "+70")];
        for (x, y) in pairs {
            let (a, b) = (phone(x), phone(y));
            let id = ConversationId::derive(&a, &b);
            assert!(id.as_str().starts_with(CONVERSATION_PREFIX));
            assert!(id.as_str().contains(a.as_str()));
            assert!(id.as_str().contains(b.as_str()));
            assert_eq!(id, ConversationId::derive(&b, &a));
        }
    }

    #[test]
    fn conversation_id_participants_roundtrip() {
        let a = phone("+1111");
        let b = phone("+2222");
        let id = ConversationId::derive(&b, &a);
        assert_eq!(id.participants(), Some((a.clone(), b.clone())));
        assert_eq!(id.peer_of(&a), Some(b.clone()));
        assert_eq!(id.peer_of(&b), Some(a));
        assert_eq!(id.peer_of(&phone("+3333")), None);
    }

    #[test]
    fn conversation_id_parse_requires_prefix() {
        assert!(ConversationId::parse("p2p_+1111_+2222").is_some());
        assert!(ConversationId::parse("chat_+1111_+2222").is_none());
        assert!(ConversationId::parse("p2p_+1111").is_none());
    }

    #[test]
    fn conversation_id_parse_rejects_non_canonical_forms() {
        assert!(ConversationId::parse("p2p_+1/../x_+2").is_none());
        assert!(ConversationId::parse("p2p_+2222_+1111").is_none());
        assert!(ConversationId::parse("p2p_1111_+2222").is_none());
        assert!(ConversationId::parse("p2p_+1 111_+2222").is_none());

        let a = phone("+1111");
        let b = phone("+2222");
        assert_eq!(
            ConversationId::parse("p2p_+1111_+2222"),
            Some(ConversationId::derive(&a, &b))
        );
    }

    // ===========================================
    // MessageId Tests
    // ===========================================

    #[test]
    fn relay_ids_have_prefix_and_differ() {
        let a = MessageId::relay();
        let b = MessageId::relay();
        assert!(a.as_str().starts_with(RELAY_ID_PREFIX));
        assert!(!a.is_local());
        assert_ne!(a, b);
    }

    #[test]
    fn local_ids_are_reserved_and_unique() {
        let a = MessageId::local();
        let b = MessageId::local();
        assert!(a.is_local());
        assert!(a.as_str().starts_with(LOCAL_ID_PREFIX));
        assert_ne!(a, b);
    }

    #[test]
    fn base36_encoding() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }
}
