// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages.
//
// Every technical error is mapped to plain English with a clear suggestion.
// Severity drives presentation in whatever front end shows the message.

use crate::error::FolioError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Worth trying again as-is.
    Transient,
    /// The user must change something (password, options, file choice).
    ActionRequired,
    /// Retrying will not help with this input.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Severity level.
    pub severity: Severity,
}

impl HumanError {
    fn new(message: impl Into<String>, suggestion: impl Into<String>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            suggestion: suggestion.into(),
            severity,
        }
    }
}

/// Convert a `FolioError` into a `HumanError`.
pub fn humanize_error(err: &FolioError) -> HumanError {
    match err {
        FolioError::Password(_) => HumanError::new(
            "This PDF is password protected.",
            "Enter the document's password and try again.",
            Severity::ActionRequired,
        ),

        // Never reported as corruption: a failed envelope check almost always
        // means the password was mistyped.
        FolioError::Authentication => HumanError::new(
            "Incorrect password.",
            "Check the password you used when protecting this file and try again.",
            Severity::ActionRequired,
        ),

        FolioError::Corrupt(detail) => HumanError::new(
            "This PDF file appears to be damaged.",
            format!("Try the Repair PDF tool first, then run this tool on the repaired file. ({detail})"),
            Severity::Permanent,
        ),

        FolioError::Render(detail) => HumanError::new(
            "A page could not be turned into an image.",
            format!("Try a lower quality setting, or process fewer pages at once. ({detail})"),
            Severity::Transient,
        ),

        FolioError::Validation(detail) => HumanError::new(
            "Some settings need attention.",
            detail.clone(),
            Severity::ActionRequired,
        ),

        FolioError::UnsupportedFormat(detail) => HumanError::new(
            "This type of file isn't supported.",
            detail.clone(),
            Severity::Permanent,
        ),

        FolioError::UnsupportedOperation(tool) => HumanError::new(
            "That tool doesn't exist.",
            format!("'{tool}' is not a known tool. Pick one from the tool list."),
            Severity::Permanent,
        ),

        FolioError::Pdf(_) => HumanError::new(
            "There's a problem with this PDF file.",
            "The file may be damaged. Try opening it in a PDF viewer first to check it works, or try a different file.",
            Severity::Permanent,
        ),

        FolioError::Image(_) => HumanError::new(
            "There's a problem with this image.",
            "The image may be damaged or in an unusual format. Try saving it as a JPEG or PNG first.",
            Severity::Permanent,
        ),

        FolioError::Encryption(_) => HumanError::new(
            "The file could not be encrypted.",
            "Try again. If this keeps happening, please report it.",
            Severity::Transient,
        ),

        FolioError::Container(_) => HumanError::new(
            "The output package could not be built.",
            "Try again with fewer pages.",
            Severity::Transient,
        ),

        FolioError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError::new(
                    "The file couldn't be found.",
                    "It may have been moved or deleted. Try choosing the file again.",
                    Severity::ActionRequired,
                )
            } else if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError::new(
                    "Folio doesn't have permission to read that file.",
                    "Check the file permissions, or copy the file somewhere else first.",
                    Severity::ActionRequired,
                )
            } else {
                HumanError::new(
                    "There was a problem reading or writing a file.",
                    "Try again. If this keeps happening, your disk may be full.",
                    Severity::Transient,
                )
            }
        }

        FolioError::Serialization(_) => HumanError::new(
            "The settings could not be read.",
            "Check that the options file is valid JSON.",
            Severity::ActionRequired,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_reads_as_incorrect_password() {
        let human = humanize_error(&FolioError::Authentication);
        assert_eq!(human.message, "Incorrect password.");
        assert_eq!(human.severity, Severity::ActionRequired);
    }

    #[test]
    fn password_is_never_reported_as_damage() {
        let human = humanize_error(&FolioError::Password("encrypted".into()));
        assert!(!human.message.contains("damaged"));
    }

    #[test]
    fn validation_passes_detail_through() {
        let err = FolioError::Validation("Please select at least 2 files.".into());
        let human = humanize_error(&err);
        assert_eq!(human.suggestion, "Please select at least 2 files.");
    }

    #[test]
    fn unsupported_format_is_permanent() {
        let err = FolioError::UnsupportedFormat("legacy .doc".into());
        assert_eq!(humanize_error(&err).severity, Severity::Permanent);
    }

    #[test]
    fn missing_file_is_action_required() {
        let err = FolioError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(humanize_error(&err).severity, Severity::ActionRequired);
    }
}
