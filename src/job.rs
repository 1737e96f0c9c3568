use log::{debug, info, warn};
use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

/// Retries a system call interrupted by a signal.
pub fn syscall<F, T>(f: F) -> nix::Result<T> where F: Fn() -> nix::Result<T> {
	loop {
		match f() {
			Err(Errno::EINTR) => {},
			r => { return r; },
		}
	}
}

pub trait WaitStatusExt {
	fn is_terminated(&self) -> bool;
	fn code(&self) -> i32;
}

impl WaitStatusExt for WaitStatus {
	fn is_terminated(&self) -> bool {
		match *self {
			WaitStatus::Exited(..) | WaitStatus::Signaled(..) => true,
			_ => false,
		}
	}

	/// Shell-style status: the exit code, or 128 plus the signal number.
	fn code(&self) -> i32 {
		match *self {
			WaitStatus::Exited(_, code) => code,
			WaitStatus::Signaled(_, sig, _) => 128 + sig as i32,
			_ => 0,
		}
	}
}

/// Blocks until `pid` terminates and returns its status.
pub fn wait_for(pid: Pid) -> nix::Result<WaitStatus> {
	loop {
		let status = syscall(|| waitpid(pid, None))?;
		if status.is_terminated() {
			return Ok(status);
		}
	}
}

/// Background collector. Holds children nobody blocks on and reaps the ones
/// that have finished whenever `reap` is called.
#[derive(Debug, Default)]
pub struct Reaper {
	pids: Vec<Pid>,
}

impl Reaper {
	pub fn new() -> Reaper {
		Reaper { pids: vec![] }
	}

	pub fn adopt(&mut self, pid: Pid) {
		debug!("tracking background process {}", pid);
		self.pids.push(pid);
	}

	pub fn len(&self) -> usize {
		self.pids.len()
	}

	pub fn is_empty(&self) -> bool {
		self.pids.is_empty()
	}

	/// Collects every tracked child that has already terminated, without
	/// blocking. Returns how many were reaped.
	pub fn reap(&mut self) -> usize {
		let before = self.pids.len();
		self.pids.retain(|&pid| {
			match syscall(|| waitpid(pid, Some(WaitPidFlag::WNOHANG))) {
				Ok(status) if status.is_terminated() => {
					info!("process {} finished with status {}", pid, status.code());
					false
				},
				Ok(_) => true,
				Err(Errno::ECHILD) => false,
				Err(e) => {
					warn!("waitpid({}) failed: {}", pid, e);
					false
				},
			}
		});
		before - self.pids.len()
	}
}
