//! Wipe-path safety validation: the allowlist/denylist double check.
//!
//! This is the core safety property of the remote-wipe feature. The agent
//! treats every server-supplied path as untrusted input and accepts it only
//! when it is
//!
//! 1. absolute and free of `..` traversal,
//! 2. not under a fixed denylist of OS-critical prefixes, and
//! 3. a member of (or nested under) the locally held approved set.
//!
//! The denylist wins over the allowlist: an OS-critical path stays blocked
//! even if it was mistakenly approved. All comparisons normalize separators
//! and case so `c:/windows` and `C:\Windows` match.

/// OS-critical prefixes that are never eligible for deletion.
///
/// `/` blocks exactly the filesystem root; every other entry blocks itself
/// and everything nested under it.
pub const BLOCKED_PREFIXES: &[&str] = &[
    "/",
    "/etc",
    "/usr",
    "/bin",
    "/sbin",
    "/boot",
    "/proc",
    "/sys",
    "/dev",
    "/System",
    "/Library",
    "C:\\Windows",
    "C:\\Program Files",
    "C:\\Program Files (x86)",
    "C:\\ProgramData",
    "D:\\Windows",
    "D:\\Program Files",
    "D:\\Program Files (x86)",
    "D:\\System Volume Information",
    "D:\\$Recycle.Bin",
];

/// Normalize a path string for comparison: forward slashes, lowercase, no
/// trailing separator (the bare root keeps its slash).
fn normalize(path: &str) -> String {
    let mut p = path.trim().replace('\\', "/").to_lowercase();
    while p.len() > 1 && p.ends_with('/') {
        p.pop();
    }
    p
}

/// Whether the path looks absolute on any supported OS (`/...` or `C:/...`).
fn is_absolute_like(normalized: &str) -> bool {
    normalized.starts_with('/')
        || (normalized.len() >= 2
            && normalized.as_bytes()[1] == b':'
            && normalized.as_bytes()[0].is_ascii_alphabetic())
}

/// Whether the path contains a `..` component.
fn has_traversal(normalized: &str) -> bool {
    normalized.split('/').any(|component| component == "..")
}

/// Returns the denylist prefix the path falls under, if any.
pub fn blocked_prefix(path: &str) -> Option<&'static str> {
    let p = normalize(path);
    for prefix in BLOCKED_PREFIXES {
        let b = normalize(prefix);
        if b == "/" {
            if p == "/" {
                return Some(prefix);
            }
        } else if p == b || p.starts_with(&format!("{}/", b)) {
            return Some(prefix);
        }
    }
    None
}

/// Whether `path` is a member of, or nested under, one of the approved
/// folders.
pub fn is_within_approved(path: &str, approved: &[String]) -> bool {
    let p = normalize(path);
    approved.iter().any(|folder| {
        let f = normalize(folder);
        p == f || p.starts_with(&format!("{}/", f))
    })
}

/// Validate a single wipe path against the local approved set.
pub fn validate_wipe_path(path: &str, approved: &[String]) -> Result<(), String> {
    let p = normalize(path);
    if p.is_empty() || !is_absolute_like(&p) {
        return Err("path must be absolute".to_string());
    }
    if has_traversal(&p) {
        return Err("path traversal is not allowed".to_string());
    }
    if let Some(prefix) = blocked_prefix(path) {
        return Err(format!("inside blocked system prefix {}", prefix));
    }
    if !is_within_approved(path, approved) {
        return Err("outside the approved folder set".to_string());
    }
    Ok(())
}

/// Partition a server-supplied path list into accepted paths and
/// `(path, reason)` rejections.
///
/// The executed delete set is always drawn from the accepted side, so it is
/// a subset of the approved set minus the denylist no matter what the server
/// sent.
pub fn partition_wipe_paths(
    requested: &[String],
    approved: &[String],
) -> (Vec<String>, Vec<(String, String)>) {
    let mut accepted = Vec::new();
    let mut rejected = Vec::new();
    for path in requested {
        match validate_wipe_path(path, approved) {
            Ok(()) => accepted.push(path.clone()),
            Err(reason) => rejected.push((path.clone(), reason)),
        }
    }
    (accepted, rejected)
}

/// Filter a folder list down to entries eligible for the approved set:
/// absolute, traversal-free, outside the denylist. Used on both sides of the
/// approved-folder sync.
pub fn sanitize_approved_folders(folders: &[String]) -> Vec<String> {
    folders
        .iter()
        .map(|f| f.trim().to_string())
        .filter(|f| {
            let p = normalize(f);
            !p.is_empty() && is_absolute_like(&p) && !has_traversal(&p) && blocked_prefix(f).is_none()
        })
        .collect()
}

/// Validate a browse path: absolute, traversal-free, inside the configured
/// browse root, outside the denylist.
pub fn validate_browse_path(path: &str, root: &str) -> Result<(), String> {
    let p = normalize(path);
    if p.is_empty() || !is_absolute_like(&p) {
        return Err("path must be absolute".to_string());
    }
    if has_traversal(&p) {
        return Err("path traversal is not allowed".to_string());
    }
    if let Some(prefix) = blocked_prefix(path) {
        return Err(format!("inside blocked system prefix {}", prefix));
    }
    if !is_within_approved(path, std::slice::from_ref(&root.to_string())) {
        return Err("outside the allowed browse root".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approved() -> Vec<String> {
        vec!["/data/secrets".to_string()]
    }

    #[test]
    fn test_denylist_blocks_system_paths() {
        assert!(blocked_prefix("/etc").is_some());
        assert!(blocked_prefix("/etc/passwd").is_some());
        assert!(blocked_prefix("/usr/bin").is_some());
        assert!(blocked_prefix("C:\\Windows\\System32").is_some());
        assert!(blocked_prefix("c:/windows").is_some());
        assert!(blocked_prefix("/data/secrets").is_none());
    }

    #[test]
    fn test_root_blocks_only_itself() {
        assert!(blocked_prefix("/").is_some());
        // /data is not under any denylist prefix even though "/" is listed
        assert!(blocked_prefix("/data").is_none());
    }

    #[test]
    fn test_prefix_match_respects_separators() {
        // /etcetera must not match the /etc prefix
        assert!(blocked_prefix("/etcetera").is_none());
        assert!(blocked_prefix("/variant/data").is_none());
    }

    #[test]
    fn test_approved_membership_and_nesting() {
        assert!(is_within_approved("/data/secrets", &approved()));
        assert!(is_within_approved("/data/secrets/2024/report.pdf", &approved()));
        assert!(!is_within_approved("/data/secretstore", &approved()));
        assert!(!is_within_approved("/data", &approved()));
    }

    #[test]
    fn test_traversal_rejected() {
        let err = validate_wipe_path("/data/secrets/../../etc", &approved()).unwrap_err();
        assert!(err.contains("traversal"));
    }

    #[test]
    fn test_relative_rejected() {
        let err = validate_wipe_path("data/secrets", &approved()).unwrap_err();
        assert!(err.contains("absolute"));
    }

    #[test]
    fn test_denylist_wins_over_allowlist() {
        // /etc mistakenly approved: still blocked
        let approved = vec!["/etc".to_string()];
        let err = validate_wipe_path("/etc/passwd", &approved).unwrap_err();
        assert!(err.contains("blocked system prefix"));
    }

    #[test]
    fn test_partition_scenario() {
        // approved {"/data/secrets"}, requested includes /etc
        let requested = vec!["/data/secrets".to_string(), "/etc".to_string()];
        let (accepted, rejected) = partition_wipe_paths(&requested, &approved());
        assert_eq!(accepted, vec!["/data/secrets".to_string()]);
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].0, "/etc");
    }

    #[test]
    fn test_partition_all_rejected() {
        let requested = vec!["/etc".to_string(), "/home/user/other".to_string()];
        let (accepted, rejected) = partition_wipe_paths(&requested, &approved());
        assert!(accepted.is_empty());
        assert_eq!(rejected.len(), 2);
    }

    #[test]
    fn test_sanitize_approved_folders() {
        let folders = vec![
            "/data/secrets".to_string(),
            "  /data/projects ".to_string(),
            "/etc".to_string(),
            "relative/path".to_string(),
            String::new(),
        ];
        let sanitized = sanitize_approved_folders(&folders);
        assert_eq!(
            sanitized,
            vec!["/data/secrets".to_string(), "/data/projects".to_string()]
        );
    }

    #[test]
    fn test_browse_path_rooted() {
        assert!(validate_browse_path("/data/docs", "/data").is_ok());
        assert!(validate_browse_path("/home/user", "/data").is_err());
        assert!(validate_browse_path("/data/../etc", "/data").is_err());
    }

    #[test]
    fn test_windows_style_paths() {
        let approved = vec!["D:\\Documents".to_string()];
        assert!(validate_wipe_path("D:\\Documents\\old", &approved).is_ok());
        assert!(validate_wipe_path("d:/documents/old", &approved).is_ok());
        let err = validate_wipe_path("D:\\Windows\\Temp", &approved).unwrap_err();
        assert!(err.contains("blocked"));
    }
}
