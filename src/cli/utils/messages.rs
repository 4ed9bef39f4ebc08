//! Message formatting utilities for consistent CLI output

/// Format a success message
pub fn ok(msg: &str) -> String {
    format!("[OK] {}", msg)
}

/// Format an error message
pub fn error(msg: &str) -> String {
    format!("[ERROR] {}", msg)
}

/// Format a warning message
pub fn warning(msg: &str) -> String {
    format!("[WARNING] {}", msg)
}

/// Format an info message
pub fn info(msg: &str) -> String {
    format!("[INFO] {}", msg)
}

/// Abbreviate a checksum for tables
pub fn short_checksum(checksum: &str) -> &str {
    checksum.get(..12).unwrap_or(checksum)
}

/// Human-readable byte size
pub fn format_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;
    match bytes {
        b if b >= MIB => format!("{:.1} MiB", b as f64 / MIB as f64),
        b if b >= KIB => format!("{:.1} KiB", b as f64 / KIB as f64),
        b => format!("{} B", b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixes() {
        assert_eq!(ok("done"), "[OK] done");
        assert_eq!(error("boom"), "[ERROR] boom");
        assert_eq!(warning("careful"), "[WARNING] careful");
        assert_eq!(info("fyi"), "[INFO] fyi");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(5), "5 B");
        assert_eq!(format_size(2048), "2.0 KiB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MiB");
        assert_eq!(short_checksum("abc"), "abc");
        assert_eq!(short_checksum(&"f".repeat(64)), "ffffffffffff");
    }
}
