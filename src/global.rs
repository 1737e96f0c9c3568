use crate::job;
use crate::transcript::Transcript;
use crate::types::Limits;

/// Everything the interpreter carries from one line to the next.
pub struct State {
	pub limits: Limits,
	pub transcript: Option<Transcript>,
	pub reaper: job::Reaper,
}

impl State {
	pub fn new(limits: Limits, transcript: Option<Transcript>) -> State {
		let reaper = job::Reaper::new();
		State { limits: limits, transcript: transcript, reaper: reaper }
	}
}
