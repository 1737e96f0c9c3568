#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
	Word(&'a [u8]),
	Pipe,
	Input,
	Output,
	Append,
}

impl<'a> Token<'a> {
	fn classify(s: &'a [u8]) -> Token<'a> {
		match s {
			b"|" => Token::Pipe,
			b"<" => Token::Input,
			b">" => Token::Output,
			b">>" => Token::Append,
			_ => Token::Word(s),
		}
	}
}

/// Lazy whitespace splitter over one line. `tokenize` starts a fresh pass.
#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
	line: &'a [u8],
	i: usize,
}

impl<'a> Tokenizer<'a> {
	fn proceed_while<F>(&mut self, f: F) where F: Fn(u8) -> bool {
		while let Some(&c) = self.line.get(self.i) {
			if !f(c) { break; }
			self.i += 1;
		}
	}

	pub fn is_whitespace(c: u8) -> bool {
		match c {
			b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c => true,
			_ => false,
		}
	}
}

impl<'a> Iterator for Tokenizer<'a> {
	type Item = Token<'a>;

	fn next(&mut self) -> Option<Token<'a>> {
		self.proceed_while(Tokenizer::is_whitespace);
		let orig = self.i;
		self.proceed_while(|c| !Tokenizer::is_whitespace(c));
		if orig == self.i {
			None
		} else {
			Some(Token::classify(&self.line[orig .. self.i]))
		}
	}
}

pub fn tokenize(line: &[u8]) -> Tokenizer<'_> {
	Tokenizer { line: line, i: 0 }
}
