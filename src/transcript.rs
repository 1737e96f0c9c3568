use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::builtin;
use crate::types::{Pipeline, Stage};

/// Backup destination chosen at startup: typed lines are appended to it and
/// pipeline output is duplicated into it through `tee -a`.
#[derive(Debug)]
pub struct Transcript {
	path: PathBuf,
	file: fs::File,
}

impl Transcript {
	pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Transcript> {
		let path = path.as_ref().to_path_buf();
		let file = fs::OpenOptions::new().append(true).create(true).open(&path)?;
		Ok(Transcript { path: path, file: file })
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn record(&mut self, prompt: &str, line: &[u8]) -> io::Result<()> {
		let mut buf = Vec::with_capacity(prompt.len() + line.len() + 1);
		buf.extend(prompt.as_bytes());
		buf.extend(line);
		buf.push(b'\n');
		// one write so concurrent tee output cannot split the entry
		self.file.write_all(&buf)?;
		self.file.flush()
	}

	fn tee_stage(&self) -> Stage {
		Stage::new(vec![OsString::from("tee"), OsString::from("-a"), self.path.clone().into_os_string()])
	}
}

/// Appends the tee stage when a transcript is active. The pipeline-level
/// output sink then applies to tee, which becomes the last stage.
pub fn inject(mut pipeline: Pipeline, transcript: Option<&Transcript>) -> Pipeline {
	if let Some(transcript) = transcript {
		if !pipeline.is_empty() && !pipeline.stages[0].name().map_or(false, builtin::is_quit) {
			pipeline.stages.push(transcript.tee_stage());
		}
	}
	pipeline
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::parser;
	use crate::types::{Limits, OutputSink};

	fn parse(line: &str) -> Pipeline {
		parser::parse(line.as_bytes(), &Limits::default()).unwrap()
	}

	#[test]
	fn inactive_transcript_leaves_pipeline_alone() {
		let p = parse("ls -l | wc");
		assert_eq!(inject(p.clone(), None), p);
	}

	#[test]
	fn tee_becomes_last_stage() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("log.txt");
		let t = Transcript::open(&path).unwrap();

		let p = inject(parse("ls -l | wc > out.txt"), Some(&t));
		assert_eq!(p.stages.len(), 3);
		assert_eq!(p.stages[1], Stage::new(vec!["wc"]));
		assert_eq!(p.stages[2], Stage::new(vec![OsString::from("tee"), OsString::from("-a"), path.clone().into_os_string()]));
		assert_eq!(p.output, OutputSink::Truncate(PathBuf::from("out.txt")));
	}

	#[test]
	fn empty_and_quit_pipelines_are_untouched() {
		let dir = tempfile::tempdir().unwrap();
		let t = Transcript::open(dir.path().join("log.txt")).unwrap();

		assert!(inject(parse("   "), Some(&t)).is_empty());
		assert_eq!(inject(parse("quit"), Some(&t)).stages.len(), 1);
	}

	#[test]
	fn record_appends_prompt_and_line() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("log.txt");
		fs::write(&path, "earlier\n").unwrap();

		let mut t = Transcript::open(&path).unwrap();
		t.record("> ", b"echo hi").unwrap();
		t.record("> ", b"").unwrap();
		t.record("> ", b"cat a\xffb").unwrap();

		assert_eq!(fs::read(&path).unwrap(), b"earlier\n> echo hi\n> \n> cat a\xffb\n");
	}

	#[test]
	fn open_creates_missing_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("new.txt");
		let t = Transcript::open(&path).unwrap();
		assert!(path.exists());
		assert_eq!(t.path(), path.as_path());
	}

	#[test]
	fn open_reports_unwritable_location() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("missing").join("log.txt");
		assert!(Transcript::open(&path).is_err());
	}
}
