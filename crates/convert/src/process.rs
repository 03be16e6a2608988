//! Child processes bounded by a wall-clock timeout.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use storybook_core::{Error, Result};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::timeout;

const DIAGNOSTIC_PREVIEW_CHARS: usize = 2_000;

/// How long to keep reading output after the child exits. Descendants that
/// inherited the pipes can otherwise hold them open indefinitely.
const PIPE_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub(crate) struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    /// Stderr, or stdout when stderr is empty, trimmed to a bounded preview.
    pub fn diagnostics(&self) -> String {
        let text = if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        };
        preview_text(text.trim(), DIAGNOSTIC_PREVIEW_CHARS)
    }
}

/// Run `cmd` to completion or kill it once `limit` elapses.
///
/// The child runs in its own process group (a job object on Windows), and the
/// whole group is killed on timeout, after the child exits, and when the
/// returned future is dropped early. A launcher that forks the real worker
/// therefore cannot leave the worker behind.
pub(crate) async fn run_with_timeout(
    mut cmd: Command,
    limit: Duration,
    label: &str,
) -> Result<ProcessOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = cmd.spawn().map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            Error::MissingDependency(format!("{} could not be started: {}", label, e))
        }
        _ => Error::IoError(e),
    })?;
    let mut tree = ProcessTree::attach(&child, label);
    log::debug!("Started {} (pid {:?})", label, child.id());

    let stdout = tokio::spawn(read_pipe(child.stdout.take()));
    let stderr = tokio::spawn(read_pipe(child.stderr.take()));

    let waited = timeout(limit, child.wait()).await;
    let status = match waited {
        Ok(status) => status?,
        Err(_) => {
            log::warn!(
                "{} exceeded {:?}, killing pid {:?} and its descendants",
                label,
                limit,
                child.id()
            );
            tree.kill();
            if let Err(e) = child.kill().await {
                log::debug!("Reaping {} after kill: {}", label, e);
            }
            stdout.abort();
            stderr.abort();
            return Err(Error::Timeout { limit });
        }
    };

    // Descendants still running after the child exited
    tree.kill();

    Ok(ProcessOutput {
        status,
        stdout: drain(stdout).await,
        stderr: drain(stderr).await,
    })
}

/// The child and every process it starts. Killed on drop.
struct ProcessTree {
    label: String,
    #[cfg(unix)]
    group: Option<libc::pid_t>,
    #[cfg(windows)]
    job: Option<job::Job>,
}

impl ProcessTree {
    fn attach(child: &tokio::process::Child, label: &str) -> Self {
        Self {
            label: label.to_string(),
            // The group id is the child's pid, see `process_group(0)`
            #[cfg(unix)]
            group: child.id().and_then(|pid| libc::pid_t::try_from(pid).ok()),
            #[cfg(windows)]
            job: child
                .raw_handle()
                .and_then(|handle| match job::Job::assign(handle) {
                    Ok(job) => Some(job),
                    Err(e) => {
                        log::warn!("Cannot place {} in a job object: {}", label, e);
                        None
                    }
                }),
        }
    }

    fn kill(&mut self) {
        #[cfg(unix)]
        if let Some(group) = self.group.take() {
            // SAFETY: killpg only sends a signal; a negative or stale id is reported as an error.
            if unsafe { libc::killpg(group, libc::SIGKILL) } != 0 {
                let e = std::io::Error::last_os_error();
                if e.raw_os_error() != Some(libc::ESRCH) {
                    log::error!("Failed to kill {} process group {}: {}", self.label, group, e);
                }
            }
        }
        #[cfg(windows)]
        if let Some(job) = self.job.take() {
            if let Err(e) = job.terminate() {
                log::error!("Failed to terminate {} job: {}", self.label, e);
            }
        }
    }
}

impl Drop for ProcessTree {
    fn drop(&mut self) {
        self.kill();
    }
}

/// Forcibly end a process that is not a descendant of ours, e.g. an
/// automation server started on our behalf.
pub(crate) fn terminate_pid(pid: u32) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        let pid = libc::pid_t::try_from(pid)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
        // SAFETY: kill only sends a signal.
        if unsafe { libc::kill(pid, libc::SIGKILL) } != 0 {
            let e = std::io::Error::last_os_error();
            if e.raw_os_error() != Some(libc::ESRCH) {
                return Err(e);
            }
        }
        Ok(())
    }
    #[cfg(windows)]
    {
        job::terminate_process(pid)
    }
}

#[cfg(windows)]
mod job {
    use std::io;
    use std::os::windows::io::RawHandle;
    use windows_sys::Win32::Foundation::{CloseHandle, HANDLE};
    use windows_sys::Win32::System::JobObjects::{
        AssignProcessToJobObject, CreateJobObjectW, JobObjectExtendedLimitInformation,
        SetInformationJobObject, TerminateJobObject, JOBOBJECT_EXTENDED_LIMIT_INFORMATION,
        JOB_OBJECT_LIMIT_KILL_ON_JOB_CLOSE,
    };
    use windows_sys::Win32::System::Threading::{OpenProcess, TerminateProcess, PROCESS_TERMINATE};

    /// A job object that kills its processes when terminated or closed.
    pub(super) struct Job(HANDLE);

    impl Job {
        pub(super) fn assign(process: RawHandle) -> io::Result<Self> {
            // SAFETY: every handle passed in is either freshly created here or
            // owned by the live child; failures are checked before use.
            unsafe {
                let handle = CreateJobObjectW(std::ptr::null(), std::ptr::null());
                if handle == 0 {
                    return Err(io::Error::last_os_error());
                }
                let job = Job(handle);

                let mut info: JOBOBJECT_EXTENDED_LIMIT_INFORMATION = std::mem::zeroed();
                info.BasicLimitInformation.LimitFlags = JOB_OBJECT_LIMIT_KILL_ON_JOB_CLOSE;
                if SetInformationJobObject(
                    job.0,
                    JobObjectExtendedLimitInformation,
                    &info as *const _ as *const std::ffi::c_void,
                    std::mem::size_of::<JOBOBJECT_EXTENDED_LIMIT_INFORMATION>() as u32,
                ) == 0
                {
                    return Err(io::Error::last_os_error());
                }
                if AssignProcessToJobObject(job.0, process as HANDLE) == 0 {
                    return Err(io::Error::last_os_error());
                }
                Ok(job)
            }
        }

        pub(super) fn terminate(&self) -> io::Result<()> {
            // SAFETY: the handle is owned by self and open.
            if unsafe { TerminateJobObject(self.0, 1) } == 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        }
    }

    impl Drop for Job {
        fn drop(&mut self) {
            // SAFETY: closing our own handle; KILL_ON_JOB_CLOSE ends any survivors.
            unsafe {
                CloseHandle(self.0);
            }
        }
    }

    pub(super) fn terminate_process(pid: u32) -> io::Result<()> {
        // SAFETY: the handle is checked and closed before returning.
        unsafe {
            let handle = OpenProcess(PROCESS_TERMINATE, 0, pid);
            if handle == 0 {
                return Err(io::Error::last_os_error());
            }
            let result = if TerminateProcess(handle, 1) == 0 {
                Err(io::Error::last_os_error())
            } else {
                Ok(())
            };
            CloseHandle(handle);
            result
        }
    }
}

async fn drain(mut handle: JoinHandle<String>) -> String {
    match timeout(PIPE_DRAIN_TIMEOUT, &mut handle).await {
        Ok(Ok(text)) => text,
        Ok(Err(_)) => String::new(),
        Err(_) => {
            handle.abort();
            String::new()
        }
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> String {
    let mut buffer = Vec::new();
    if let Some(mut pipe) = pipe {
        if let Err(e) = pipe.read_to_end(&mut buffer).await {
            log::debug!("Failed to read child output: {}", e);
        }
    }
    String::from_utf8_lossy(&buffer).to_string()
}

fn preview_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

/// Process liveness checks for tests.
#[cfg(all(test, target_os = "linux"))]
pub(crate) mod procfs {
    use std::time::Duration;

    /// Whether `pid` is alive. Zombies count as gone.
    pub(crate) fn is_running(pid: u32) -> bool {
        let Ok(stat) = std::fs::read_to_string(format!("/proc/{}/stat", pid)) else {
            return false;
        };
        // State is the first field after the parenthesised command name
        match stat.rfind(')').and_then(|idx| stat[idx + 1..].split_whitespace().next()) {
            Some(state) => state != "Z" && state != "X",
            None => false,
        }
    }

    /// Poll for up to two seconds for `pid` to disappear.
    pub(crate) async fn wait_gone(pid: u32) -> bool {
        for _ in 0..40 {
            if !is_running(pid) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        false
    }
}
