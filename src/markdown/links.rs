use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::Warning;

static RE_IMAGE_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"!\[[^\]\n]*\]\(([^)\s]+)(?:\s+"[^"\n]*")?\)"#).unwrap());

fn is_remote(target: &str) -> bool {
    target.starts_with("http://") || target.starts_with("https://") || target.starts_with("data:")
}

/// Relative image targets in `markdown`, in order of appearance.
pub fn image_targets(markdown: &str) -> Vec<&str> {
    RE_IMAGE_LINK
        .captures_iter(markdown)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .filter(|t| !is_remote(t))
        .collect()
}

/// Check that every relative image link resolves to a file under `base_dir`.
pub fn audit_image_links(markdown: &str, base_dir: &Path, warnings: &mut Vec<Warning>) -> usize {
    let mut missing = 0;
    for target in image_targets(markdown) {
        let path = base_dir.join(target.replace("%20", " "));
        if !path.is_file() {
            missing += 1;
            Warning::BrokenImageLink {
                path: target.to_string(),
            }
            .record(warnings);
        }
    }
    missing
}
