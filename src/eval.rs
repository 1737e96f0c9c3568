use std::ffi::{CStr, CString, NulError};
use std::fs;
use std::io;
use std::os::fd::{AsRawFd, IntoRawFd, OwnedFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::ptr;

use log::{debug, warn};
use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg, FdFlag, OFlag};
use nix::sys::signal::{self, SigHandler, Signal};
use nix::unistd::{self, ForkResult, Pid};
use thiserror::Error;

use crate::builtin::{self, Builtin};
use crate::global;
use crate::job::{self, WaitStatusExt};
use crate::types::{InputSource, OutputSink, Pipeline, Stage};

#[derive(Debug, Error)]
pub enum ExecError {
	#[error("{}: {}", .path.display(), .source)]
	Redirect { path: PathBuf, source: io::Error },
	#[error("cannot start pipeline: {0}")]
	Spawn(nix::Error),
	#[error("waiting for pipeline failed: {0}")]
	Wait(nix::Error),
	#[error("argument contains a NUL byte: {0}")]
	Nul(#[from] NulError),
	#[error("empty command in pipeline")]
	EmptyStage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalResult {
	/// Foreground pipeline finished; status of its last stage.
	Done(i32),
	/// Background pipeline started; pid of its last stage.
	Detached(Pid),
	/// The quit directive was given.
	Terminate,
}

const EXIT_NOT_FOUND: i32 = 127;
const EXIT_CANNOT_EXEC: i32 = 126;

fn redirect_error(path: &Path) -> impl FnOnce(io::Error) -> ExecError + '_ {
	move |e| ExecError::Redirect { path: path.to_path_buf(), source: e }
}

fn open_input(input: &InputSource) -> Result<Option<OwnedFd>, ExecError> {
	match *input {
		InputSource::Inherit => Ok(None),
		InputSource::File(ref path) => {
			let file = fs::File::open(path).map_err(redirect_error(path))?;
			Ok(Some(OwnedFd::from(file)))
		},
	}
}

fn open_output(output: &OutputSink) -> Result<Option<OwnedFd>, ExecError> {
	let mut oopt = fs::OpenOptions::new();
	let path = match *output {
		OutputSink::Inherit => { return Ok(None); },
		OutputSink::Truncate(ref path) => { oopt.write(true).create(true).truncate(true); path },
		OutputSink::Append(ref path) => { oopt.append(true).create(true); path },
	};
	let file = oopt.open(path).map_err(redirect_error(path))?;
	Ok(Some(OwnedFd::from(file)))
}

/// Makes `target` refer to `fd`'s file and closes `fd`.
fn redirect(fd: Option<OwnedFd>, target: RawFd) -> nix::Result<()> {
	let fd = match fd {
		Some(fd) => fd,
		None => { return Ok(()); },
	};
	if fd.as_raw_fd() == target {
		// already in place; only the close-on-exec flag has to go
		fcntl(target, FcntlArg::F_SETFD(FdFlag::empty()))?;
		let _ = fd.into_raw_fd();
	} else {
		unistd::dup2(fd.as_raw_fd(), target)?;
	}
	Ok(())
}

fn write_stderr(parts: &[&[u8]]) {
	for part in parts {
		unsafe {
			libc::write(libc::STDERR_FILENO, part.as_ptr() as *const libc::c_void, part.len());
		}
	}
}

/// Argument vector in the layout `execvp` wants, built before forking.
struct Argv {
	args: Vec<CString>,
	ptrs: Vec<*const libc::c_char>,
}

impl Argv {
	fn new(stage: &Stage) -> Result<Argv, ExecError> {
		if stage.args.is_empty() {
			return Err(ExecError::EmptyStage);
		}
		let args = stage.args.iter()
			.map(|a| CString::new(a.as_bytes()))
			.collect::<Result<Vec<CString>, NulError>>()?;
		// moving `args` into the struct leaves the strings' buffers in place
		let mut ptrs: Vec<*const libc::c_char> = args.iter().map(|a| a.as_ptr()).collect();
		ptrs.push(ptr::null());
		Ok(Argv { args: args, ptrs: ptrs })
	}

	fn program(&self) -> &CStr {
		&self.args[0]
	}
}

// The Rust runtime ignores SIGPIPE, and ignored signals survive exec.
fn reset_signals() -> nix::Result<()> {
	unsafe { signal::signal(Signal::SIGPIPE, SigHandler::SigDfl) }.map(drop)
}

// Runs in the forked child. Nothing here allocates: the argument vector was
// built by the parent and errors are written with raw `write`.
fn exec_stage(argv: &Argv, stdin: Option<OwnedFd>, stdout: Option<OwnedFd>) -> ! {
	let program = argv.program();
	let setup = reset_signals()
		.and_then(|_| redirect(stdin, libc::STDIN_FILENO))
		.and_then(|_| redirect(stdout, libc::STDOUT_FILENO));
	let errno = match setup {
		Err(e) => e,
		Ok(()) => {
			unsafe { libc::execvp(argv.ptrs[0], argv.ptrs.as_ptr()) };
			Errno::last()
		},
	};
	write_stderr(&[b"tsh: ", program.to_bytes(), b": ", errno.desc().as_bytes(), b"\n"]);
	let status = if errno == Errno::ENOENT { EXIT_NOT_FOUND } else { EXIT_CANNOT_EXEC };
	unsafe { libc::_exit(status) }
}

/// Forks one stage. The parent's copies of `stdin` and `stdout` are closed
/// when this returns, whether or not the fork succeeded.
fn spawn_stage(argv: &Argv, stdin: Option<OwnedFd>, stdout: Option<OwnedFd>) -> nix::Result<Pid> {
	match unsafe { unistd::fork() }? {
		ForkResult::Parent { child } => Ok(child),
		ForkResult::Child => exec_stage(argv, stdin, stdout),
	}
}

fn spawn_commands(pipeline: &Pipeline, argvs: &[Argv], pids: &mut Vec<Pid>) -> Result<(), ExecError> {
	let mut stdin = open_input(&pipeline.input)?;
	let mut sink = open_output(&pipeline.output)?;

	let last = argvs.len() - 1;
	for (i, argv) in argvs.iter().enumerate() {
		let (stdout, next_stdin) = if i == last {
			(sink.take(), None)
		} else {
			let (pipe_read, pipe_write) = unistd::pipe2(OFlag::O_CLOEXEC).map_err(ExecError::Spawn)?;
			(Some(pipe_write), Some(pipe_read))
		};
		let pid = spawn_stage(argv, stdin.take(), stdout).map_err(ExecError::Spawn)?;
		debug!("started {:?} as {}", argv.program(), pid);
		pids.push(pid);
		stdin = next_stdin;
	}
	Ok(())
}

fn build_argv(pipeline: &Pipeline) -> Result<Vec<Argv>, ExecError> {
	pipeline.stages.iter().map(Argv::new).collect()
}

/// Runs `pipeline`, blocking on its last stage unless it is a background
/// pipeline. Children nobody waits for are handed to the state's reaper.
pub fn eval(state: &mut global::State, pipeline: &Pipeline) -> Result<EvalResult, ExecError> {
	let first = match pipeline.stages.first() {
		Some(stage) => stage,
		None => { return Ok(EvalResult::Done(0)); },
	};
	if let Some(Builtin::Quit) = first.name().and_then(builtin::match_builtin) {
		return Ok(EvalResult::Terminate);
	}

	let argvs = build_argv(pipeline)?;
	let mut pids: Vec<Pid> = Vec::with_capacity(argvs.len());
	if let Err(e) = spawn_commands(pipeline, &argvs, &mut pids) {
		for pid in pids {
			state.reaper.adopt(pid);
		}
		return Err(e);
	}

	let (&last, rest) = match pids.split_last() {
		Some(split) => split,
		None => unreachable!("non-empty pipeline spawned nothing"),
	};
	for &pid in rest {
		state.reaper.adopt(pid);
	}
	if pipeline.is_background {
		state.reaper.adopt(last);
		return Ok(EvalResult::Detached(last));
	}
	match job::wait_for(last) {
		Ok(status) => Ok(EvalResult::Done(status.code())),
		Err(e) => {
			warn!("lost track of process {}: {}", last, e);
			state.reaper.adopt(last);
			Err(ExecError::Wait(e))
		},
	}
}
