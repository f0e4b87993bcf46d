#[cfg(test)]
mod tests {
    use super::super::{is_placeholder_serial, IdentifierSet};

    fn full_set() -> IdentifierSet {
        IdentifierSet {
            machine_uuid: Some("4c4c4544-0051-3510-8054-b4c04f303532".to_string()),
            serial_number: Some("5QU5TX2".to_string()),
            mac_addresses: vec![
                "08:8f:c3:1a:2b:3c".to_string(),
                "d4:3b:04:aa:bb:cc".to_string(),
            ],
            hostname: Some("field-laptop".to_string()),
            os_family: "linux".to_string(),
        }
    }

    #[test]
    fn test_canonical_string_ordering() {
        let set = full_set();
        assert_eq!(
            set.canonical_string(),
            "uuid:4c4c4544-0051-3510-8054-b4c04f303532|serial:5QU5TX2|\
             macs:08:8f:c3:1a:2b:3c|d4:3b:04:aa:bb:cc|hostname:field-laptop|os:linux"
        );
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let set = full_set();
        let first = set.fingerprint_hash();
        let second = set.fingerprint_hash();
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_fingerprint_changes_with_hardware() {
        let set = full_set();
        let mut other = full_set();
        other.machine_uuid = Some("different-uuid".to_string());
        assert_ne!(set.fingerprint_hash(), other.fingerprint_hash());
    }

    #[test]
    fn test_fingerprint_ignores_superficial_fields() {
        // The canonical string contains only the collected identifiers, so two
        // sets with identical identifiers hash identically regardless of when
        // or where they were collected.
        let set = full_set();
        let clone = full_set();
        assert_eq!(set.fingerprint_hash(), clone.fingerprint_hash());
    }

    #[test]
    fn test_hostname_fallback_still_hashes() {
        let set = IdentifierSet {
            machine_uuid: None,
            serial_number: None,
            mac_addresses: vec![],
            hostname: Some("bare-host".to_string()),
            os_family: "linux".to_string(),
        };
        assert_eq!(set.canonical_string(), "hostname:bare-host|os:linux");
        assert_eq!(set.fingerprint_hash().len(), 64);
    }

    #[test]
    fn test_placeholder_serials_filtered() {
        assert!(is_placeholder_serial("To Be Filled By O.E.M."));
        assert!(is_placeholder_serial("default"));
        assert!(is_placeholder_serial("  "));
        assert!(!is_placeholder_serial("5QU5TX2"));
    }

    #[test]
    fn test_info_quality_summary() {
        let info = full_set().info();
        assert!(info.has_machine_uuid);
        assert!(info.has_serial);
        assert_eq!(info.mac_count, 2);
        assert_eq!(info.fingerprint_hash, full_set().fingerprint_hash());
    }

    #[test]
    fn test_collect_never_panics() {
        let set = IdentifierSet::collect();
        assert!(!set.os_family.is_empty());
        // Whatever was collected must produce a valid digest.
        assert_eq!(set.fingerprint_hash().len(), 64);
    }
}
