//! Identifier generation.

/// Return a new time-ordered unique identifier (UUIDv7, hyphenated).
///
/// Ids generated later sort after ids generated earlier, at millisecond
/// granularity.
pub fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}
