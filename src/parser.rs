use std::ffi::{OsStr, OsString};
use std::iter::Peekable;
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;

use thiserror::Error;

use crate::token::{tokenize, Token, Tokenizer};
use crate::types::*;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
	#[error("syntax error: empty command in pipeline")]
	EmptyStage,
	#[error("syntax error: expected a file name after '{0}'")]
	MissingOperand(&'static str),
	#[error("too many commands in pipeline (at most {0})")]
	TooManyStages(usize),
	#[error("too many arguments to one command (at most {0})")]
	TooManyArguments(usize),
}

pub type ParseResult<T> = Result<T, ParseError>;

struct Parser<'a> {
	tokens: Peekable<Tokenizer<'a>>,
	limits: Limits,
	input: InputSource,
	output: OutputSink,
}

impl<'a> Parser<'a> {
	fn operand(&mut self, op: &'static str) -> ParseResult<PathBuf> {
		match self.tokens.next() {
			Some(Token::Word(w)) => Ok(PathBuf::from(OsStr::from_bytes(w))),
			_ => Err(ParseError::MissingOperand(op)),
		}
	}

	// Redirections are pipeline-level: wherever they appear, input feeds the
	// first stage and output drains the last one.
	fn parse_redirect(&mut self, op: Token<'a>) -> ParseResult<()> {
		match op {
			Token::Input => { self.input = InputSource::File(self.operand("<")?); },
			Token::Output => { self.output = OutputSink::Truncate(self.operand(">")?); },
			Token::Append => { self.output = OutputSink::Append(self.operand(">>")?); },
			Token::Word(_) | Token::Pipe => unreachable!(),
		}
		Ok(())
	}

	fn parse_stage(&mut self) -> ParseResult<Stage> {
		let mut args: Vec<OsString> = vec![];
		loop {
			match self.tokens.peek() {
				None | Some(&Token::Pipe) => { break; },
				Some(&Token::Word(word)) => {
					self.tokens.next();
					if args.len() == self.limits.max_args {
						return Err(ParseError::TooManyArguments(self.limits.max_args));
					}
					args.push(OsStr::from_bytes(word).to_os_string());
				},
				Some(&op) => {
					self.tokens.next();
					self.parse_redirect(op)?;
				},
			}
		}
		if args.is_empty() {
			return Err(ParseError::EmptyStage);
		}
		Ok(Stage { args: args })
	}

	fn parse_pipeline(mut self, is_background: bool) -> ParseResult<Pipeline> {
		if self.tokens.peek().is_none() {
			return Ok(Pipeline { is_background: is_background, ..Pipeline::empty() });
		}

		let mut stages: Vec<Stage> = vec![];
		loop {
			let stage = self.parse_stage()?;
			if stages.len() == self.limits.max_stages {
				return Err(ParseError::TooManyStages(self.limits.max_stages));
			}
			stages.push(stage);
			match self.tokens.next() {
				Some(Token::Pipe) => {},
				None => { break; },
				Some(t) => unreachable!("stage ended on {:?}", t),
			}
		}

		Ok(Pipeline { stages: stages, input: self.input, output: self.output, is_background: is_background })
	}
}

/// Strips a trailing `&`, reporting whether it was there.
fn split_background(line: &[u8]) -> (&[u8], bool) {
	let end = line.iter().rposition(|&c| !Tokenizer::is_whitespace(c)).map_or(0, |i| i + 1);
	let trimmed = &line[.. end];
	match trimmed.strip_suffix(b"&") {
		Some(rest) => (rest, true),
		None => (trimmed, false),
	}
}

pub fn parse(line: &[u8], limits: &Limits) -> ParseResult<Pipeline> {
	let (body, is_background) = split_background(line);
	let parser = Parser {
		tokens: tokenize(body).peekable(),
		limits: *limits,
		input: InputSource::Inherit,
		output: OutputSink::Inherit,
	};
	parser.parse_pipeline(is_background)
}
