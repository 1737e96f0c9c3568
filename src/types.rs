use std::ffi::{OsStr, OsString};
use std::path::PathBuf;

pub const DEFAULT_MAX_STAGES: usize = 16;
pub const DEFAULT_MAX_ARGS: usize = 100;

/// Upper bounds applied while a line is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
	pub max_stages: usize,
	pub max_args: usize,
}

impl Default for Limits {
	fn default() -> Limits {
		Limits { max_stages: DEFAULT_MAX_STAGES, max_args: DEFAULT_MAX_ARGS }
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
	Inherit,
	File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSink {
	Inherit,
	Truncate(PathBuf),
	Append(PathBuf),
}

/// One program invocation. `args[0]` is the program name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
	pub args: Vec<OsString>,
}

impl Stage {
	pub fn new<I, S>(args: I) -> Stage where I: IntoIterator<Item = S>, S: Into<OsString> {
		Stage { args: args.into_iter().map(Into::into).collect() }
	}

	/// `None` for a stage built without arguments.
	pub fn name(&self) -> Option<&OsStr> {
		self.args.first().map(OsString::as_os_str)
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
	pub stages: Vec<Stage>,
	pub input: InputSource,
	pub output: OutputSink,
	pub is_background: bool,
}

impl Pipeline {
	pub fn empty() -> Pipeline {
		Pipeline {
			stages: vec![],
			input: InputSource::Inherit,
			output: OutputSink::Inherit,
			is_background: false,
		}
	}

	pub fn is_empty(&self) -> bool {
		self.stages.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn stage_name_is_first_argument() {
		assert_eq!(Stage::new(vec!["wc", "-l"]).name(), Some(OsStr::new("wc")));
		assert_eq!(Stage::new(Vec::<&str>::new()).name(), None);
	}
}
