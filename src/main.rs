mod builtin;
mod eval;
mod global;
mod job;
mod logging;
mod parser;
mod shell;
mod token;
mod transcript;
mod types;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use argh::FromArgs;
use log::info;

const EXIT_TRANSCRIPT: u8 = 2;

#[derive(FromArgs)]
/// Line-oriented shell running pipelines of external commands.
struct Args {
	/// append every typed line and the output of every pipeline to this file
	#[argh(positional)]
	transcript: Option<PathBuf>,
}

fn main() -> ExitCode {
	let args: Args = argh::from_env();
	logging::init();

	let transcript = match args.transcript {
		None => None,
		Some(path) => match transcript::Transcript::open(&path) {
			Ok(t) => {
				info!("transcript goes to {}", path.display());
				Some(t)
			},
			Err(e) => {
				eprintln!("tsh: {}: {}", path.display(), e);
				return ExitCode::from(EXIT_TRANSCRIPT);
			},
		},
	};

	let mut state = global::State::new(types::Limits::default(), transcript);
	let stdin = io::stdin();
	let stdout = io::stdout();
	match shell::run(&mut state, &mut stdin.lock(), &mut stdout.lock()) {
		Ok(_) => ExitCode::SUCCESS,
		Err(e) => {
			eprintln!("tsh: {}", e);
			ExitCode::FAILURE
		},
	}
}
