//! Command line construction
//!
//! Pure string rendering of a language's run template. No I/O happens here.

use tracing::warn;

use crate::languages::{InvocationStyle, Language};

/// Placeholder replaced with `<work_dir>/<base_file_name>`
pub const FILENAME_PLACEHOLDER: &str = "{filename}";

/// Replace every `{filename}` in the template with `<work_dir>/<base_file_name>`
pub fn substitute_filename(template: &str, work_dir: &str, base_file_name: &str) -> String {
    let file_path = format!("{}/{}", work_dir, base_file_name);
    template.replace(FILENAME_PLACEHOLDER, &file_path)
}

/// Apply the language's invocation fix-up to a rendered command.
///
/// For class-name runtimes the last `/` becomes a space, so
/// `java -cp /tmp/job/Main` turns into `java -cp /tmp/job Main`.
/// Returns `None` if a class-name command has no `/` to split on.
pub fn apply_invocation_style(command: &str, style: InvocationStyle) -> Option<String> {
    match style {
        InvocationStyle::Path => Some(command.to_string()),
        InvocationStyle::ClassName => {
            let idx = command.rfind('/')?;
            let mut fixed = String::with_capacity(command.len());
            fixed.push_str(&command[..idx]);
            fixed.push(' ');
            fixed.push_str(&command[idx + 1..]);
            Some(fixed)
        }
    }
}

/// Render the full command line for running a submission's artifact
pub fn build_command_line(language: &Language, work_dir: &str, base_file_name: &str) -> String {
    let command = substitute_filename(&language.run_command, work_dir, base_file_name);

    apply_invocation_style(&command, language.invocation_style).unwrap_or_else(|| {
        warn!(
            language = %language.name,
            command = %command,
            "No path separator to split for class-name invocation, leaving command as is"
        );
        command
    })
}
