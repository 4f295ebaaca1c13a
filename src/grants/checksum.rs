use crate::core::Value;

/// Columns whose contents are credentials and must never be printed.
pub const PASSWORD_COLUMNS: [&str; 2] = ["Password", "authentication_string"];

pub fn is_password_column(name: &str) -> bool {
    PASSWORD_COLUMNS
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(name))
}

/// Computes a stable FNV-1a checksum of a credential value.
///
/// Lets operators see whether two nodes hold the same password hash without
/// printing the hash. NULL and the empty string both map to 0.
pub fn password_checksum(value: &Value) -> u64 {
    let text = match value {
        Value::Null => return 0,
        other => other.to_string(),
    };
    if text.is_empty() {
        return 0;
    }
    let mut hash = 14695981039346656037u64;
    for byte in text.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(1099511628211);
    }
    hash
}
