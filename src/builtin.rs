use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;

/// Directives handled by the interpreter itself instead of a spawned process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
	Quit,
}

pub fn match_builtin(name: &OsStr) -> Option<Builtin> {
	match name.as_bytes() {
		b"quit" => Some(Builtin::Quit),
		_ => None,
	}
}

pub fn is_quit(name: &OsStr) -> bool {
	match_builtin(name) == Some(Builtin::Quit)
}
