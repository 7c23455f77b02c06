//! Mod toggling
//!
//! Mods are disabled by appending `.disabled` to the file name and enabled
//! by stripping it again. Folders are never renamed; they are reported back
//! so an operator can deal with them by hand.

use super::types::{FileEntry, RenameEntry};
use regex::Regex;

pub const DISABLED_SUFFIX: &str = ".disabled";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModAction {
    Enable,
    Disable,
}

impl std::str::FromStr for ModAction {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "enable" => Ok(Self::Enable),
            "disable" => Ok(Self::Disable),
            other => Err(crate::Error::Validation(format!(
                "action must be 'enable' or 'disable', got '{}'",
                other
            ))),
        }
    }
}

/// Shell-style wildcard (`*`, `?`) matched against the whole file name
#[derive(Debug, Clone)]
pub struct WildcardPattern {
    regex: Regex,
}

impl WildcardPattern {
    pub fn new(pattern: &str) -> crate::Result<Self> {
        let mut source = String::with_capacity(pattern.len() + 8);
        source.push('^');
        for ch in pattern.chars() {
            match ch {
                '*' => source.push_str(".*"),
                '?' => source.push('.'),
                other => source.push_str(&regex::escape(&other.to_string())),
            }
        }
        source.push('$');

        let regex = Regex::new(&source)
            .map_err(|e| crate::Error::Validation(format!("invalid pattern '{}': {}", pattern, e)))?;
        Ok(Self { regex })
    }

    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }
}

/// Renames needed to apply an action, plus matching folders left alone
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModTogglePlan {
    pub renames: Vec<RenameEntry>,
    pub affected: Vec<String>,
    pub skipped_folders: Vec<String>,
}

impl ModTogglePlan {
    pub fn is_empty(&self) -> bool {
        self.renames.is_empty() && self.skipped_folders.is_empty()
    }
}

/// Work out which files in `mods_dir` change for `action`
pub fn plan_mod_toggle(
    files: &[FileEntry],
    mods_dir: &str,
    pattern: &WildcardPattern,
    action: ModAction,
) -> ModTogglePlan {
    let mods_dir = mods_dir.trim_matches('/');
    let mut plan = ModTogglePlan::default();

    for file in files.iter().filter(|f| pattern.matches(&f.name)) {
        if !file.is_file {
            plan.skipped_folders.push(file.name.clone());
            continue;
        }

        let from = format!("{}/{}", mods_dir, file.name);
        let to = match action {
            ModAction::Disable if !file.name.ends_with(DISABLED_SUFFIX) => {
                format!("{}{}", from, DISABLED_SUFFIX)
            }
            ModAction::Enable => match file.name.strip_suffix(DISABLED_SUFFIX) {
                Some(enabled) => format!("{}/{}", mods_dir, enabled),
                None => continue,
            },
            ModAction::Disable => continue,
        };

        plan.renames.push(RenameEntry { from, to });
        plan.affected.push(file.name.clone());
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str) -> FileEntry {
        FileEntry {
            name: name.to_string(),
            is_file: true,
            size: 1,
        }
    }

    fn folder(name: &str) -> FileEntry {
        FileEntry {
            name: name.to_string(),
            is_file: false,
            size: 0,
        }
    }

    #[test]
    fn test_wildcard_matching() {
        let pattern = WildcardPattern::new("jei-*.jar").unwrap();
        assert!(pattern.matches("jei-1.20.jar"));
        assert!(!pattern.matches("jei-1.20.jar.disabled"));
        assert!(!pattern.matches("xjei-1.jar"));

        let single = WildcardPattern::new("mod?.jar").unwrap();
        assert!(single.matches("mod1.jar"));
        assert!(!single.matches("mod10.jar"));
    }

    #[test]
    fn test_disable_skips_already_disabled_and_folders() {
        let files = vec![
            file("alpha.jar"),
            file("beta.jar.disabled"),
            folder("alpha-config"),
            file("gamma.zip"),
        ];
        let pattern = WildcardPattern::new("*a*").unwrap();
        let plan = plan_mod_toggle(&files, "/mods/", &pattern, ModAction::Disable);

        assert_eq!(
            plan.renames,
            vec![
                RenameEntry {
                    from: "mods/alpha.jar".into(),
                    to: "mods/alpha.jar.disabled".into()
                },
                RenameEntry {
                    from: "mods/gamma.zip".into(),
                    to: "mods/gamma.zip.disabled".into()
                },
            ]
        );
        assert_eq!(plan.skipped_folders, vec!["alpha-config".to_string()]);
    }

    #[test]
    fn test_enable_strips_suffix() {
        let files = vec![file("alpha.jar"), file("beta.jar.disabled")];
        let pattern = WildcardPattern::new("*").unwrap();
        let plan = plan_mod_toggle(&files, "mods", &pattern, ModAction::Enable);

        assert_eq!(plan.affected, vec!["beta.jar.disabled".to_string()]);
        assert_eq!(plan.renames[0].to, "mods/beta.jar");
    }

    #[test]
    fn test_no_match_is_empty() {
        let pattern = WildcardPattern::new("nothing*").unwrap();
        let plan = plan_mod_toggle(&[file("alpha.jar")], "mods", &pattern, ModAction::Disable);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_action_parse() {
        assert_eq!("Disable".parse::<ModAction>().unwrap(), ModAction::Disable);
        assert!("toggle".parse::<ModAction>().is_err());
    }
}
