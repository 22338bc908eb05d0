use sha2::{Digest, Sha256};

use super::types::CommandId;

const FIELD_SEPARATOR: u8 = 0x1f;

/// Compute the content fingerprint of a command.
///
/// Only name, description and icon path take part, so the same command
/// registered twice (or from two places) lands on one entry.
pub fn fingerprint(name: &str, description: Option<&str>, icon: Option<&str>) -> CommandId {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update([FIELD_SEPARATOR]);
    hasher.update(description.unwrap_or_default().as_bytes());
    hasher.update([FIELD_SEPARATOR]);
    hasher.update(icon.unwrap_or_default().as_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    CommandId::from_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_deterministic() {
        let a = fingerprint("Line", Some("Draw a line"), Some("icons/line.png"));
        let b = fingerprint("Line", Some("Draw a line"), Some("icons/line.png"));
        assert_eq!(a, b);
        assert_eq!(a.to_string().len(), 16);
    }

    #[test]
    fn test_fingerprint_depends_on_each_field() {
        let base = fingerprint("Line", Some("Draw"), Some("a.png"));
        assert_ne!(base, fingerprint("Line2", Some("Draw"), Some("a.png")));
        assert_ne!(base, fingerprint("Line", Some("Draw!"), Some("a.png")));
        assert_ne!(base, fingerprint("Line", Some("Draw"), Some("b.png")));
    }

    #[test]
    fn test_fingerprint_fields_do_not_bleed() {
        assert_ne!(
            fingerprint("ab", Some("c"), None),
            fingerprint("a", Some("bc"), None)
        );
    }

    #[test]
    fn test_id_string_roundtrip() {
        let id = fingerprint("Move", None, None);
        let parsed: CommandId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("xyz".parse::<CommandId>().is_err());
        assert!("zzzzzzzzzzzzzzzz".parse::<CommandId>().is_err());
    }
}
