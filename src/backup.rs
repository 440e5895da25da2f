//! Backup - Naming scheme for turn backups
//!
//! A backup splices the turn number in front of the extension:
//! `early_agartha.trn` backed up as turn 12 is `early_agartha-12.trn`.

use crate::{Error, Result};
use regex::Regex;

/// Backup file name for a file with the given extension for the given turn number
///
/// Fails if `file_name` does not end in `.extension`, or if it already carries
/// a turn number.
pub fn backup_filename(file_name: &str, turn_number: u32, extension: &str) -> Result<String> {
    let suffix = format!(".{}", extension);
    if !file_name.ends_with(&suffix) {
        return Err(Error::MissingExtension {
            file_name: file_name.to_string(),
            extension: extension.to_string(),
        });
    }
    let extension_start = file_name.len() - suffix.len();

    if canonical_filename(file_name, extension) != file_name {
        return Err(Error::AlreadyDecorated(file_name.to_string()));
    }

    Ok(format!(
        "{}-{}{}",
        &file_name[..extension_start],
        turn_number,
        &file_name[extension_start..]
    ))
}

/// Name of a file without any backup information
///
/// Names that carry no turn number are returned unchanged.
pub fn canonical_filename(file_name: &str, extension: &str) -> String {
    let pattern = format!(r"^(.*)-\d+(\.{})$", regex::escape(extension));

    match Regex::new(&pattern) {
        Ok(regex) => match regex.captures(file_name) {
            Some(captures) => format!("{}{}", &captures[1], &captures[2]),
            None => file_name.to_string(),
        },
        Err(_) => file_name.to_string(),
    }
}

/// Example: early_agartha.2h -> early_agartha-12.2h
pub fn backup_2h_filename(file_name: &str, turn_number: u32) -> Result<String> {
    backup_filename(file_name, turn_number, "2h")
}

/// Example: early_agartha.trn -> early_agartha-12.trn
pub fn backup_trn_filename(file_name: &str, turn_number: u32) -> Result<String> {
    backup_filename(file_name, turn_number, "trn")
}

/// Example: early_agartha-12.2h -> early_agartha.2h
pub fn canonical_2h_filename(file_name: &str) -> String {
    canonical_filename(file_name, "2h")
}

/// Example: early_agartha-12.trn -> early_agartha.trn
pub fn canonical_trn_filename(file_name: &str) -> String {
    canonical_filename(file_name, "trn")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_2h_filename() {
        assert_eq!(
            backup_2h_filename("early_agartha.2h", 17).unwrap(),
            "early_agartha-17.2h"
        );
    }

    #[test]
    fn test_backup_trn_filename() {
        assert_eq!(
            backup_trn_filename("early_agartha.trn", 0).unwrap(),
            "early_agartha-0.trn"
        );
    }

    #[test]
    fn test_canonical_trn_filename() {
        assert_eq!(canonical_trn_filename("early_agartha-12.trn"), "early_agartha.trn");
    }

    #[test]
    fn test_canonical_filename_is_noop_on_canonical_input() {
        assert_eq!(canonical_trn_filename("early_agartha.trn"), "early_agartha.trn");
        assert_eq!(canonical_2h_filename("early_agartha.2h"), "early_agartha.2h");
    }

    #[test]
    fn test_canonical_filename_ignores_other_extension() {
        assert_eq!(canonical_2h_filename("early_agartha-12.trn"), "early_agartha-12.trn");
    }

    #[test]
    fn test_round_trip() {
        for stem in ["early_agartha", "mid_ulm", "late-man", "x.trn.old", "a"] {
            for extension in ["trn", "2h"] {
                let name = format!("{}.{}", stem, extension);
                for turn in [0, 1, 9, 10, 123, u32::MAX] {
                    let backup = backup_filename(&name, turn, extension).unwrap();
                    assert_eq!(canonical_filename(&backup, extension), name);
                }
            }
        }
    }

    #[test]
    fn test_splices_at_last_extension() {
        assert_eq!(
            backup_trn_filename("old.trn.trn", 4).unwrap(),
            "old.trn-4.trn"
        );
    }

    #[test]
    fn test_missing_extension_is_an_error() {
        let err = backup_trn_filename("early_agartha.2h", 3).unwrap_err();
        assert!(matches!(err, Error::MissingExtension { .. }));
    }

    #[test]
    fn test_extension_must_be_the_suffix() {
        let err = backup_trn_filename("foo.trnx", 3).unwrap_err();
        assert!(matches!(err, Error::MissingExtension { file_name, .. } if file_name == "foo.trnx"));

        let err = backup_2h_filename("early_agartha.2h.bak", 3).unwrap_err();
        assert!(matches!(err, Error::MissingExtension { .. }));
    }

    #[test]
    fn test_decorated_name_is_rejected() {
        let err = backup_2h_filename("early_agartha-3.2h", 4).unwrap_err();
        assert!(matches!(err, Error::AlreadyDecorated(name) if name == "early_agartha-3.2h"));
    }
}
