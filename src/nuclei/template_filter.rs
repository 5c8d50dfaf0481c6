// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Template Filter
 * Maps fingerprint tags (or an explicit file list) onto the concrete
 * template files to execute, via the workflow tag table
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::fingerprint::workflow_db;

/// Resolve the template files for one target.
///
/// An explicit `template_files` list short-circuits tag resolution
/// entirely. Otherwise custom tags override detected tags, and an empty
/// tag set (or a tag set that maps to no template name) falls back to
/// every `.yaml` under the template directories.
pub fn filter_templates(
    input_tags: &[String],
    custom_tags: &[String],
    template_files: &[PathBuf],
    template_dirs: &[PathBuf],
) -> Vec<PathBuf> {
    if !template_files.is_empty() {
        return template_files.to_vec();
    }
    find_tags_file(final_tags(input_tags, custom_tags), template_dirs, workflow_db())
}

/// Custom tags win over detected tags when present.
pub fn final_tags<'a>(detect_tags: &'a [String], custom_tags: &'a [String]) -> &'a [String] {
    if custom_tags.is_empty() {
        detect_tags
    } else {
        custom_tags
    }
}

fn find_tags_file(
    input_tags: &[String],
    template_dirs: &[PathBuf],
    workflows: &HashMap<String, Vec<String>>,
) -> Vec<PathBuf> {
    if input_tags.is_empty() {
        return expand_yaml_files(template_dirs);
    }

    let mut template_names: Vec<&str> = Vec::new();
    for tag in input_tags {
        for (name, tags) in workflows {
            if tags.iter().any(|t| t == tag) {
                template_names.push(name);
            }
        }
    }

    // No tag mapped to a template name: use the configured directories
    // rather than silently scanning nothing.
    if template_names.is_empty() {
        return expand_yaml_files(template_dirs);
    }

    let mut files: Vec<PathBuf> = Vec::new();
    for name in template_names {
        for dir in template_dirs {
            let candidate = dir.join(format!("{}.yaml", name));
            // Stat failures are indistinguishable from absence here.
            if candidate.is_file() {
                if !files.contains(&candidate) {
                    files.push(candidate);
                }
                break;
            }
        }
    }
    files
}

/// Recursively collect every `.yaml` under the given directories.
/// Unreadable entries are skipped; an unreadable directory just yields
/// nothing.
pub fn expand_yaml_files(dirs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for dir in dirs {
        for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
            if entry.file_type().is_file() && has_yaml_extension(entry.path()) {
                files.push(entry.path().to_path_buf());
            }
        }
    }
    files
}

fn has_yaml_extension(path: &Path) -> bool {
    path.extension().map(|e| e == "yaml").unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, "id: test\n").unwrap();
        path
    }

    #[test]
    fn test_explicit_files_win_over_tags() {
        let explicit = vec![PathBuf::from("/nonexistent/custom.yaml")];
        let out = filter_templates(
            &["ThinkPHP".to_string()],
            &[],
            &explicit,
            &[PathBuf::from("/nonexistent")],
        );
        assert_eq!(out, explicit);
    }

    #[test]
    fn test_custom_tags_override_detected() {
        let detected = vec!["a".to_string()];
        let custom = vec!["b".to_string()];
        assert_eq!(final_tags(&detected, &custom), custom.as_slice());
        assert_eq!(final_tags(&detected, &[]), detected.as_slice());
    }

    #[test]
    fn test_tag_resolution_takes_first_matching_dir() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        touch(first.path(), "thinkphp-5022-rce.yaml");
        touch(second.path(), "thinkphp-5022-rce.yaml");
        touch(second.path(), "thinkphp-5023-rce.yaml");

        let dirs = vec![first.path().to_path_buf(), second.path().to_path_buf()];
        let out = filter_templates(&["ThinkPHP".to_string()], &[], &[], &dirs);

        assert!(out.contains(&first.path().join("thinkphp-5022-rce.yaml")));
        assert!(out.contains(&second.path().join("thinkphp-5023-rce.yaml")));
        assert!(!out.contains(&second.path().join("thinkphp-5022-rce.yaml")));
    }

    #[test]
    fn test_unknown_tag_falls_back_to_walk() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.yaml");
        touch(dir.path(), "sub/b.yaml");
        touch(dir.path(), "ignored.yml");

        let dirs = vec![dir.path().to_path_buf()];
        let out = filter_templates(&["joomla-nonexistent-tag".to_string()], &[], &[], &dirs);

        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|p| p.extension().unwrap() == "yaml"));
    }

    #[test]
    fn test_empty_tags_walk_everything() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "x.yaml");
        let out = filter_templates(&[], &[], &[], &[dir.path().to_path_buf()]);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_resolved_files_are_deduplicated() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "tomcat-manager-weak-password.yaml");
        let dirs = vec![dir.path().to_path_buf()];
        // Both tags resolve to the same template file.
        let out = filter_templates(
            &["Apache Tomcat".to_string(), "tomcat".to_string()],
            &[],
            &[],
            &dirs,
        );
        assert_eq!(
            out.iter()
                .filter(|p| p.ends_with("tomcat-manager-weak-password.yaml"))
                .count(),
            1
        );
    }
}
