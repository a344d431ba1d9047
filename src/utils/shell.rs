//! Shell escaping and quoting.
//!
//! Everything sent through a remote shell is built from these helpers so that
//! operator-supplied values (hosts, domains, credentials) can never terminate
//! a quoted word.

/// `'` becomes `'\''` (end quote, escaped quote, start quote).
fn escape_single_quotes(value: &str) -> String {
    value.replace('\'', "'\\''")
}

// Characters that require quoting
const SHELL_META: &[char] = &[
    ' ', '\t', '\n', '\r', '\'', '"', '\\', '$', '`', '!', '*', '?', '[', ']', '(', ')', '{', '}',
    '<', '>', '|', '&', ';', '#', '~', '=', '%',
];

/// Quote a single argument for shell execution.
/// - Empty strings become `''`
/// - Strings with shell metacharacters are wrapped in single quotes
/// - Embedded single quotes are escaped
pub fn quote_arg(arg: &str) -> String {
    if arg.is_empty() {
        return "''".to_string();
    }

    if !arg.contains(SHELL_META) {
        return arg.to_string();
    }

    format!("'{}'", escape_single_quotes(arg))
}

/// Render `program arg...` with every word quoted.
pub fn join_command<S: AsRef<str>>(program: &str, args: &[S]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(|arg| arg.as_ref()))
        .map(quote_arg)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Quote a path for shell execution (always quotes).
pub fn quote_path(path: &str) -> String {
    format!("'{}'", escape_single_quotes(path))
}
