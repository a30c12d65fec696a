/// Checked once per command before dispatch. `session_id` identifies the
/// connection issuing it; `verb` is the command's uppercase name (e.g.
/// `"STATS"`, `"SET"`). Every verb goes through the same check -- there is
/// no hardcoded admin-only list in the executor, so "admin-only" is a
/// property of whichever `Auth` is wired in.
pub trait Auth: Send + Sync {
    fn check_command(&self, session_id: &str, verb: &str) -> bool;
}

/// Wired in by default: every command is allowed.
pub struct DisabledAuth;

impl Auth for DisabledAuth {
    fn check_command(&self, _session_id: &str, _verb: &str) -> bool {
        true
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_disabled_auth_allows_everything() {
        let a = DisabledAuth;
        assert!(a.check_command("s1", "STATS"));
        assert!(a.check_command("s1", "KILL"));
    }
}
