use std::io::{self, BufRead, Write};

use log::debug;

use crate::eval::{self, EvalResult};
use crate::global;
use crate::parser;
use crate::transcript;

pub const PROMPT: &str = "> ";

/// Supplies input lines as raw bytes without their terminator. `Ok(None)` is
/// end of input.
pub trait LineSource {
	fn next_line(&mut self) -> io::Result<Option<Vec<u8>>>;
}

impl<R: BufRead> LineSource for R {
	fn next_line(&mut self) -> io::Result<Option<Vec<u8>>> {
		let mut line: Vec<u8> = vec![];
		if self.read_until(b'\n', &mut line)? == 0 {
			return Ok(None);
		}
		if line.last() == Some(&b'\n') {
			line.pop();
			if line.last() == Some(&b'\r') {
				line.pop();
			}
		}
		Ok(Some(line))
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
	EndOfInput,
	Quit,
}

/// Parses and runs one line. Returns true when the interpreter should stop.
pub fn run_line(state: &mut global::State, line: &[u8]) -> bool {
	let pipeline = match parser::parse(line, &state.limits) {
		Ok(p) => p,
		Err(e) => {
			eprintln!("tsh: {}", e);
			return false;
		},
	};
	let pipeline = transcript::inject(pipeline, state.transcript.as_ref());
	debug!("{:?}", pipeline);

	match eval::eval(state, &pipeline) {
		Ok(EvalResult::Terminate) => true,
		Ok(EvalResult::Done(status)) => {
			debug!("exit status {}", status);
			false
		},
		Ok(EvalResult::Detached(pid)) => {
			debug!("running in background as {}", pid);
			false
		},
		Err(e) => {
			eprintln!("tsh: {}", e);
			false
		},
	}
}

pub fn run<L: LineSource, W: Write>(state: &mut global::State, lines: &mut L, out: &mut W) -> io::Result<Exit> {
	let exit = loop {
		state.reaper.reap();
		out.write_all(PROMPT.as_bytes())?;
		out.flush()?;

		let line = match lines.next_line()? {
			Some(line) => line,
			None => {
				out.write_all(b"\n")?;
				out.flush()?;
				break Exit::EndOfInput;
			},
		};
		if let Some(ref mut t) = state.transcript {
			if let Err(e) = t.record(PROMPT, &line) {
				eprintln!("tsh: {}: {}", t.path().display(), e);
			}
		}
		if run_line(state, &line) {
			break Exit::Quit;
		}
	};
	state.reaper.reap();
	if !state.reaper.is_empty() {
		debug!("leaving {} background processes running", state.reaper.len());
	}
	Ok(exit)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::transcript::Transcript;
	use crate::types::Limits;
	use std::fs;
	use std::io::Cursor;

	#[test]
	fn lines_lose_their_terminators() {
		let mut src = Cursor::new(&b"one\ntwo\r\n\nlast"[..]);
		assert_eq!(src.next_line().unwrap(), Some(b"one".to_vec()));
		assert_eq!(src.next_line().unwrap(), Some(b"two".to_vec()));
		assert_eq!(src.next_line().unwrap(), Some(vec![]));
		assert_eq!(src.next_line().unwrap(), Some(b"last".to_vec()));
		assert_eq!(src.next_line().unwrap(), None);
	}

	#[test]
	fn bytes_outside_utf8_are_passed_through() {
		let mut src = Cursor::new(&b"a\xffb\n"[..]);
		assert_eq!(src.next_line().unwrap(), Some(b"a\xffb".to_vec()));
	}

	#[test]
	fn file_names_keep_bytes_outside_utf8() {
		use std::ffi::OsStr;
		use std::os::unix::ffi::OsStrExt;

		let dir = tempfile::tempdir().unwrap();
		let mut state = global::State::new(Limits::default(), None);
		let mut line = format!("touch {}/", dir.path().display()).into_bytes();
		line.extend(b"a\xffb");
		assert!(!run_line(&mut state, &line));
		assert!(dir.path().join(OsStr::from_bytes(b"a\xffb")).exists());
	}

	#[test]
	fn prompts_until_end_of_input() {
		let mut state = global::State::new(Limits::default(), None);
		let mut input = Cursor::new(&b"\nls |\n"[..]);
		let mut out: Vec<u8> = vec![];
		assert_eq!(run(&mut state, &mut input, &mut out).unwrap(), Exit::EndOfInput);
		assert_eq!(out, b"> > > \n");
	}

	#[test]
	fn quit_stops_reading() {
		let mut state = global::State::new(Limits::default(), None);
		let mut input = Cursor::new(&b"quit\necho unreachable\n"[..]);
		let mut out: Vec<u8> = vec![];
		assert_eq!(run(&mut state, &mut input, &mut out).unwrap(), Exit::Quit);
		assert_eq!(out, b"> ");
		let mut rest = String::new();
		io::Read::read_to_string(&mut input, &mut rest).unwrap();
		assert_eq!(rest, "echo unreachable\n");
	}

	#[test]
	fn transcript_records_lines_and_output() {
		let dir = tempfile::tempdir().unwrap();
		let log = dir.path().join("log.txt");
		let out_file = dir.path().join("out.txt");
		let transcript = Transcript::open(&log).unwrap();
		let mut state = global::State::new(Limits::default(), Some(transcript));

		let line = format!("echo hello > {}", out_file.display());
		assert!(!run_line(&mut state, b"ls |"));
		let mut input = Cursor::new(format!("{}\nquit\n", line).into_bytes());
		let mut out: Vec<u8> = vec![];
		assert_eq!(run(&mut state, &mut input, &mut out).unwrap(), Exit::Quit);

		assert_eq!(fs::read_to_string(&out_file).unwrap(), "hello\n");
		assert_eq!(fs::read_to_string(&log).unwrap(), format!("> {}\nhello\n> quit\n", line));
	}
}
