//! Display formatting for CLI output

use chartwright_core::ValidationErrorInfo;
use chartwright_repo::IndexDocument;
use console::style;
use std::collections::BTreeMap;

/// Print schema violations grouped by service
pub fn display_validation_errors(errors: &[ValidationErrorInfo]) {
    let mut by_service: BTreeMap<&str, Vec<&ValidationErrorInfo>> = BTreeMap::new();
    for error in errors {
        let (service, _) = split_service(&error.path);
        by_service.entry(service).or_default().push(error);
    }

    for (service, errors) in by_service {
        println!();
        println!("{}", style(service).cyan().bold());

        for error in errors {
            let (_, field) = split_service(&error.path);
            let at = if field.is_empty() {
                String::new()
            } else {
                format!(" at {}", style(field).dim())
            };
            println!("  {} {}{}", style("✗").red(), error.message, at);
        }
    }
}

/// `api/image/repository` -> (`api`, `/image/repository`)
fn split_service(path: &str) -> (&str, &str) {
    match path.find('/') {
        Some(idx) => path.split_at(idx),
        None => (path, ""),
    }
}

/// Print every chart version in an index, newest first
pub fn display_index(index: &IndexDocument) {
    if index.entries.is_empty() {
        println!("{}", style("No charts published").dim());
        return;
    }

    for (name, versions) in &index.entries {
        println!("{}", style(name).cyan().bold());
        for entry in versions {
            let created = entry
                .created
                .map(|c| c.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default();
            println!(
                "  {:<12} {:<20} {}",
                entry.version,
                created,
                style(truncate_hash(&entry.digest, 16)).dim()
            );
        }
    }
}

/// Format count with proper pluralization
pub fn pluralize(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}

/// Format a byte size as a human-readable string
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Prefix of a digest, never panicking on short input
pub fn truncate_hash(hash: &str, max_len: usize) -> &str {
    hash.get(..max_len).unwrap_or(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_service() {
        assert_eq!(split_service("api/image/repository"), ("api", "/image/repository"));
        assert_eq!(split_service("api"), ("api", ""));
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize(1, "error", "errors"), "1 error");
        assert_eq!(pluralize(3, "error", "errors"), "3 errors");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
    }

    #[test]
    fn test_truncate_hash() {
        assert_eq!(truncate_hash("abcdef1234567890abcdef", 16), "abcdef1234567890");
        assert_eq!(truncate_hash("abc", 16), "abc");
    }
}
