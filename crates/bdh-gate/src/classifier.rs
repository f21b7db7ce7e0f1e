//! Classification of tracker argument vectors.
//!
//! The subcommand is the first token that is neither a flag nor the value of
//! a global flag. A literal `--` ends the scan: everything after it belongs
//! to the tracker's positionals and is never treated as a subcommand.

/// Subcommands that rewrite the issue store and therefore trigger a sync.
///
/// Every `dep` subcommand counts, including the read-only ones; narrowing
/// that would change what the server observes without coordination.
pub const MUTATING_SUBCOMMANDS: &[&str] =
    &["create", "close", "update", "delete", "reopen", "dep", "sync"];

/// Global tracker flags that consume the following token as their value
/// (in the `--flag value` form; `--flag=value` consumes nothing extra).
const GLOBAL_VALUE_FLAGS: &[&str] = &["--db", "--actor", "--lock-timeout"];

/// Override flag recognized by the wrapper itself, stripped before the
/// argument vector reaches the tracker.
pub const JUMP_IN_FLAG: &str = "--:jump-in";

/// Locate the tracker subcommand in an argument vector.
#[must_use]
pub fn classify_subcommand(args: &[String]) -> Option<&str> {
    let mut skip_value = false;
    for arg in args {
        if skip_value {
            skip_value = false;
            continue;
        }
        if arg == "--" {
            return None;
        }
        if let Some(rest) = arg.strip_prefix("--") {
            let name = rest.split('=').next().unwrap_or(rest);
            let takes_value =
                GLOBAL_VALUE_FLAGS.iter().any(|flag| &flag[2..] == name) && !rest.contains('=');
            if takes_value {
                // The value is consumed even when it looks like a flag.
                skip_value = true;
            }
            continue;
        }
        if arg.starts_with('-') && arg.len() > 1 {
            continue;
        }
        return Some(arg);
    }
    None
}

/// Whether this argument vector names a mutating subcommand.
#[must_use]
pub fn is_mutating(args: &[String]) -> bool {
    classify_subcommand(args)
        .is_some_and(|subcommand| MUTATING_SUBCOMMANDS.contains(&subcommand))
}

/// Remove every occurrence of [`JUMP_IN_FLAG`], reporting whether any was
/// present. The tracker must never see the wrapper's own flag.
#[must_use]
pub fn strip_jump_in(args: &[String]) -> (Vec<String>, bool) {
    let mut present = false;
    let stripped = args
        .iter()
        .filter(|arg| {
            if *arg == JUMP_IN_FLAG {
                present = true;
                false
            } else {
                true
            }
        })
        .cloned()
        .collect();
    (stripped, present)
}
