use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self as std_mpsc, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use portable_pty::{Child, ChildKiller, CommandBuilder, MasterPty, PtySize};
use tokio::sync::mpsc;
use tokio::task::spawn_blocking;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use super::observers::{DataObserver, ExitObserver, Observers};
use super::{ExitInfo, PtyError, SessionState, lock};
use crate::shell::ShellSpec;

/// Size of a single read from the PTY master
pub const READ_CHUNK_SIZE: usize = 4096;

/// How long `terminate` waits after the hangup signal before forcing a kill
pub const TERMINATE_GRACE: Duration = Duration::from_millis(500);

/// How long the exit event waits for the reader to drain remaining output
pub const READER_DRAIN: Duration = Duration::from_millis(250);

enum PtyEvent {
    Data(Vec<u8>),
    Exit(ExitInfo),
}

type PtyWriter = Box<dyn Write + Send>;

struct SpawnedPty {
    master: Box<dyn MasterPty + Send>,
    reader: Box<dyn Read + Send>,
    writer: PtyWriter,
    child: Box<dyn Child + Send + Sync>,
}

/// One shell process attached to a pseudo-terminal.
///
/// Output is pushed to the observer registered with [`PtySession::on_data`]
/// from a single dispatcher task, so chunks arrive in the order the child
/// produced them. The exit observer fires exactly once.
///
/// The blocking PTY ends (reader, writer, child wait) each run on their own
/// OS thread rather than the runtime's blocking pool, so a descendant that
/// keeps the terminal open cannot hold up runtime shutdown.
pub struct PtySession {
    id: Uuid,
    spec: ShellSpec,
    process_id: Option<u32>,
    state: Arc<Mutex<SessionState>>,
    observers: Arc<Observers>,
    // raised once the child is dead, before its pid is released
    exited: Arc<Mutex<bool>>,
    terminated: AtomicBool,
    input: Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
    master: Mutex<Option<Box<dyn MasterPty + Send>>>,
    killer: Mutex<Option<Box<dyn ChildKiller + Send + Sync>>>,
}

impl PtySession {
    /// Spawn the shell described by `spec` on a fresh PTY.
    ///
    /// Must be called from within a tokio runtime: the dispatcher runs as a
    /// runtime task.
    pub async fn start(spec: ShellSpec) -> Result<Self, PtyError> {
        info!(
            "PtySession: starting {:?} with args {:?} in {:?}",
            spec.executable, spec.args, spec.working_directory
        );

        // openpty and fork/exec block; keep them off the async workers
        let spawn_spec = spec.clone();
        let spawned = spawn_blocking(move || spawn_on_pty(&spawn_spec))
            .await
            .map_err(|e| PtyError::BackgroundTask(format!("PTY spawn task failed: {e}")))??;

        Self::run(spec, spawned)
    }

    fn run(spec: ShellSpec, spawned: SpawnedPty) -> Result<Self, PtyError> {
        let SpawnedPty {
            master,
            reader,
            writer,
            child,
        } = spawned;

        let id = Uuid::new_v4();
        let process_id = child.process_id();
        let mut killer = child.clone_killer();
        let state = Arc::new(Mutex::new(SessionState::Starting));
        let observers = Arc::new(Observers::default());
        let exited = Arc::new(Mutex::new(false));
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (reader_done_tx, reader_done_rx) = std_mpsc::channel::<()>();
        let (reaped_tx, reaped_rx) = std_mpsc::channel::<()>();

        let data_tx = events_tx.clone();
        let exit_flag = exited.clone();
        let started = spawn_worker("pty-reader", move || {
            read_loop(reader, data_tx, id);
            drop(reader_done_tx);
        })
        .and_then(|_| spawn_worker("pty-writer", move || write_loop(writer, input_rx, reaped_rx, id)))
        .and_then(|_| {
            spawn_worker("pty-waiter", move || {
                let exit = wait_for_child(child, process_id, &exit_flag, id);
                let _ = reaped_tx.send(());

                // let trailing output reach the dispatcher before the exit event
                if let Err(RecvTimeoutError::Timeout) = reader_done_rx.recv_timeout(READER_DRAIN) {
                    debug!("Session {}: reader still open after child exit", id);
                }
                let _ = events_tx.send(PtyEvent::Exit(exit));
            })
        });

        if let Err(e) = started {
            error!("Session {}: failed to start PTY worker threads: {}", id, e);
            let _ = killer.kill();
            return Err(e);
        }

        lock(&state).advance(SessionState::Running);
        tokio::spawn(dispatch(events_rx, state.clone(), observers.clone(), id));

        info!("Session {} running (pid {:?})", id, process_id);

        Ok(Self {
            id,
            spec,
            process_id,
            state,
            observers,
            exited,
            terminated: AtomicBool::new(false),
            input: Mutex::new(Some(input_tx)),
            master: Mutex::new(Some(master)),
            killer: Mutex::new(Some(killer)),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn spec(&self) -> &ShellSpec {
        &self.spec
    }

    pub fn process_id(&self) -> Option<u32> {
        self.process_id
    }

    pub fn state(&self) -> SessionState {
        lock(&self.state).clone()
    }

    pub fn is_running(&self) -> bool {
        !self.terminated.load(Ordering::SeqCst) && !*lock(&self.exited) && !self.state().is_exited()
    }

    /// Queue `data` for the shell's input, unmodified. Never blocks: a
    /// dedicated writer thread drains the queue in order.
    ///
    /// Returns [`PtyError::SessionClosed`] once the child has exited or the
    /// session was terminated.
    pub fn write(&self, data: &[u8]) -> Result<(), PtyError> {
        if !self.is_running() {
            return Err(PtyError::SessionClosed);
        }

        let input = lock(&self.input);
        let sender = input.as_ref().ok_or(PtyError::SessionClosed)?;
        sender
            .send(data.to_vec())
            .map_err(|_| PtyError::SessionClosed)?;
        trace!("Session {}: queued {} bytes", self.id, data.len());
        Ok(())
    }

    /// Register the output observer. Output produced before registration is
    /// replayed into it first.
    pub fn on_data(&self, observer: DataObserver) -> Result<(), PtyError> {
        self.observers.set_data(observer)
    }

    /// Register the exit observer. Fires immediately if the child already exited.
    pub fn on_exit(&self, observer: ExitObserver) -> Result<(), PtyError> {
        self.observers.set_exit(observer)
    }

    /// Ask the child to terminate and release the PTY. Idempotent.
    ///
    /// No output is delivered after this returns. The exit observer still
    /// fires once the child has been reaped.
    pub fn terminate(&self) {
        if self.terminated.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Terminating session {}", self.id);

        self.observers.close();

        let killer = lock(&self.killer).take();
        if let Some(mut killer) = killer {
            if !*lock(&self.exited) {
                if let Err(e) = killer.kill() {
                    warn!("Session {}: failed to signal child: {}", self.id, e);
                }
                self.schedule_forced_kill();
            }
        }

        // the writer thread keeps its end open until the child is reaped
        lock(&self.input).take();
        lock(&self.master).take();
    }

    #[cfg(unix)]
    fn schedule_forced_kill(&self) {
        let Some(pid) = self.process_id else {
            return;
        };
        let exited = self.exited.clone();
        let id = self.id;
        let scheduled = spawn_worker("pty-reaper", move || {
            thread::sleep(TERMINATE_GRACE);
            // the waiter raises the flag under this lock before it reaps, so
            // while we hold it and see false the pid is still our child
            let exited = lock(&exited);
            if *exited {
                return;
            }
            warn!("Session {}: child {} ignored hangup, sending SIGKILL", id, pid);
            let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGKILL) };
            if rc != 0 {
                debug!(
                    "Session {}: SIGKILL failed: {}",
                    id,
                    std::io::Error::last_os_error()
                );
            }
        });
        if let Err(e) = scheduled {
            warn!("Session {}: could not schedule forced kill: {}", id, e);
        }
    }

    // the platform killer terminates outright; nothing to escalate
    #[cfg(not(unix))]
    fn schedule_forced_kill(&self) {}
}

impl Drop for PtySession {
    fn drop(&mut self) {
        self.terminate();
    }
}

impl std::fmt::Debug for PtySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PtySession")
            .field("id", &self.id)
            .field("executable", &self.spec.executable)
            .field("process_id", &self.process_id)
            .field("state", &self.state())
            .finish()
    }
}

fn spawn_worker(name: &str, work: impl FnOnce() + Send + 'static) -> Result<(), PtyError> {
    thread::Builder::new()
        .name(name.to_string())
        .spawn(work)
        .map(|_| ())
        .map_err(PtyError::Io)
}

fn spawn_on_pty(spec: &ShellSpec) -> Result<SpawnedPty, PtyError> {
    let pty_system = portable_pty::native_pty_system();
    let pair = pty_system
        .openpty(PtySize {
            rows: spec.rows,
            cols: spec.columns,
            pixel_width: 0,
            pixel_height: 0,
        })
        .map_err(|e| PtyError::OpenPty(e.to_string()))?;

    let mut cmd = CommandBuilder::new(&spec.executable);
    cmd.args(&spec.args);
    // only the resolved environment reaches the child
    cmd.env_clear();
    for (key, value) in &spec.environment {
        cmd.env(key, value);
    }
    cmd.env("TERM", &spec.term_name);
    cmd.cwd(&spec.working_directory);

    let child = pair.slave.spawn_command(cmd).map_err(|e| PtyError::Spawn {
        program: spec.executable.clone(),
        reason: e.to_string(),
    })?;
    // only the child should hold the slave side, so the reader sees EOF on exit
    drop(pair.slave);

    let reader = pair
        .master
        .try_clone_reader()
        .map_err(|e| PtyError::OpenPty(e.to_string()))?;
    let writer = pair
        .master
        .take_writer()
        .map_err(|e| PtyError::OpenPty(e.to_string()))?;

    Ok(SpawnedPty {
        master: pair.master,
        reader,
        writer,
        child,
    })
}

fn read_loop(mut reader: Box<dyn Read + Send>, events: mpsc::UnboundedSender<PtyEvent>, id: Uuid) {
    let mut buffer = [0u8; READ_CHUNK_SIZE];
    loop {
        match reader.read(&mut buffer) {
            Ok(0) => {
                debug!("Session {}: PTY EOF", id);
                break;
            }
            Ok(n) => {
                trace!("Session {}: read {} bytes", id, n);
                if events.send(PtyEvent::Data(buffer[..n].to_vec())).is_err() {
                    debug!("Session {}: dispatcher gone, stopping reader", id);
                    break;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                // EIO is how Linux reports the slave side closing
                debug!("Session {}: PTY read ended: {}", id, e);
                break;
            }
        }
    }
}

fn write_loop(
    mut writer: PtyWriter,
    mut input: mpsc::UnboundedReceiver<Vec<u8>>,
    reaped: std_mpsc::Receiver<()>,
    id: Uuid,
) {
    while let Some(chunk) = input.blocking_recv() {
        if let Err(e) = writer.write_all(&chunk).and_then(|_| writer.flush()) {
            debug!("Session {}: dropped {} input bytes: {}", id, chunk.len(), e);
        }
    }

    // closing the master writer sends a newline and EOF to the terminal,
    // which must not reach a shell that is still alive
    let _ = reaped.recv();
    drop(writer);
    trace!("Session {}: writer closed", id);
}

fn wait_for_child(
    mut child: Box<dyn Child + Send + Sync>,
    process_id: Option<u32>,
    exited: &Mutex<bool>,
    id: Uuid,
) -> ExitInfo {
    #[cfg(unix)]
    {
        if let Some(pid) = process_id {
            if wait_until_exited(pid) {
                *lock(exited) = true;
            }
        }
    }
    #[cfg(not(unix))]
    let _ = process_id;

    let exit = match child.wait() {
        Ok(status) => ExitInfo::from(status),
        Err(e) => {
            error!("Session {}: failed to wait for child: {}", id, e);
            ExitInfo {
                exit_code: 1,
                signal: None,
            }
        }
    };
    *lock(exited) = true;
    exit
}

/// Block until `pid` has exited without reaping it, so the pid cannot be
/// recycled until the owner's `wait` collects it.
#[cfg(unix)]
fn wait_until_exited(pid: u32) -> bool {
    loop {
        let mut info: libc::siginfo_t = unsafe { std::mem::zeroed() };
        let rc = unsafe {
            libc::waitid(
                libc::P_PID,
                pid as libc::id_t,
                &mut info,
                libc::WEXITED | libc::WNOWAIT,
            )
        };
        if rc == 0 {
            return true;
        }
        if std::io::Error::last_os_error().kind() != std::io::ErrorKind::Interrupted {
            return false;
        }
    }
}

async fn dispatch(
    mut events: mpsc::UnboundedReceiver<PtyEvent>,
    state: Arc<Mutex<SessionState>>,
    observers: Arc<Observers>,
    id: Uuid,
) {
    while let Some(event) = events.recv().await {
        match event {
            PtyEvent::Data(chunk) => observers.deliver_data(chunk),
            PtyEvent::Exit(exit) => {
                info!(
                    "Session {} exited with code {} (signal {:?})",
                    id, exit.exit_code, exit.signal
                );
                lock(&state).advance(SessionState::Exited(exit.clone()));
                observers.deliver_exit(exit);
                break;
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Mutex as StdMutex;
    use tokio::sync::oneshot;
    use tokio::time::{Instant, sleep, timeout};

    fn sh_spec() -> ShellSpec {
        ShellSpec {
            executable: "/bin/sh".to_string(),
            args: Vec::new(),
            working_directory: std::env::temp_dir(),
            environment: std::env::vars().collect::<BTreeMap<_, _>>(),
            term_name: "dumb".to_string(),
            columns: 80,
            rows: 24,
        }
    }

    async fn wait_for(mut check: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if check() {
                return true;
            }
            sleep(Duration::from_millis(20)).await;
        }
        false
    }

    fn exit_channel(session: &PtySession) -> oneshot::Receiver<ExitInfo> {
        let (exit_tx, exit_rx) = oneshot::channel();
        session
            .on_exit(Box::new(move |exit: ExitInfo| {
                let _ = exit_tx.send(exit);
            }))
            .unwrap();
        exit_rx
    }

    fn capture_output(session: &PtySession) -> Arc<StdMutex<Vec<u8>>> {
        let output = Arc::new(StdMutex::new(Vec::<u8>::new()));
        let sink = output.clone();
        session
            .on_data(Box::new(move |chunk: &[u8]| sink.lock().unwrap().extend_from_slice(chunk)))
            .unwrap();
        output
    }

    #[tokio::test]
    async fn echo_round_trip_then_terminate() {
        let session = PtySession::start(sh_spec()).await.unwrap();
        assert_eq!(session.state(), SessionState::Running);

        let output = capture_output(&session);
        let exit_rx = exit_channel(&session);

        session.write(b"echo hi\n").unwrap();
        let saw_hi = wait_for(|| String::from_utf8_lossy(&output.lock().unwrap()).contains("hi")).await;
        assert!(saw_hi, "shell output never contained \"hi\"");

        session.terminate();
        let len_at_terminate = output.lock().unwrap().len();

        let exit = timeout(Duration::from_secs(5), exit_rx).await.unwrap().unwrap();
        assert!(!exit.success(), "hung-up shell reported {exit:?}");
        assert!(exit.signal.is_some(), "shell was not ended by a signal: {exit:?}");
        assert_eq!(output.lock().unwrap().len(), len_at_terminate);
        assert!(session.state().is_exited());
    }

    #[tokio::test]
    async fn terminate_does_not_submit_a_pending_line() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("submitted");

        let session = PtySession::start(sh_spec()).await.unwrap();
        let exit_rx = exit_channel(&session);

        // typed but never entered
        session
            .write(format!("touch {}", marker.display()).as_bytes())
            .unwrap();
        sleep(Duration::from_millis(200)).await;

        session.terminate();
        let exit = timeout(Duration::from_secs(5), exit_rx).await.unwrap().unwrap();
        assert!(exit.signal.is_some(), "shell saw EOF instead of a hangup: {exit:?}");

        sleep(Duration::from_millis(200)).await;
        assert!(!marker.exists(), "pending command line was executed");
    }

    #[tokio::test]
    async fn write_does_not_block_when_the_shell_stops_reading() {
        let session = PtySession::start(sh_spec()).await.unwrap();
        session.write(b"stty raw -echo; sleep 3\n").unwrap();
        sleep(Duration::from_millis(200)).await;

        // far more than the terminal's input buffer holds
        let flood = vec![b'x'; 512 * 1024];
        let started = Instant::now();
        session.write(&flood).unwrap();
        session.write(&flood).unwrap();
        assert!(
            started.elapsed() < Duration::from_millis(500),
            "write blocked for {:?}",
            started.elapsed()
        );

        session.terminate();
    }

    #[tokio::test]
    async fn hangup_ignoring_child_is_killed_after_grace() {
        let mut spec = sh_spec();
        spec.args = vec![
            "-c".to_string(),
            "trap '' HUP; echo armed; while :; do sleep 1; done".to_string(),
        ];
        let session = PtySession::start(spec).await.unwrap();
        let output = capture_output(&session);
        let exit_rx = exit_channel(&session);

        let armed = wait_for(|| String::from_utf8_lossy(&output.lock().unwrap()).contains("armed")).await;
        assert!(armed, "trap was never installed");

        let started = Instant::now();
        session.terminate();
        let exit = timeout(TERMINATE_GRACE + Duration::from_secs(2), exit_rx)
            .await
            .expect("child survived the forced kill")
            .unwrap();

        assert!(started.elapsed() >= TERMINATE_GRACE);
        assert!(
            exit.signal.as_deref().is_some_and(|s| s.starts_with("Killed")),
            "unexpected exit {exit:?}"
        );
    }

    #[test]
    fn waiting_for_exit_leaves_the_child_to_its_owner() {
        let mut child = std::process::Command::new("/bin/sh")
            .args(["-c", "exit 5"])
            .spawn()
            .unwrap();

        assert!(wait_until_exited(child.id()));
        // still a zombie, so the owner collects the real status
        let status = child.try_wait().unwrap().expect("child should be reapable");
        assert_eq!(status.code(), Some(5));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn detached_descendant_does_not_hold_up_runtime_shutdown() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let session = PtySession::start(sh_spec()).await.unwrap();
            let exit_rx = exit_channel(&session);

            // the detached sleep keeps the terminal open after the shell dies
            session.write(b"setsid sleep 8 &\n").unwrap();
            sleep(Duration::from_millis(300)).await;

            session.terminate();
            timeout(Duration::from_secs(5), exit_rx).await.unwrap().unwrap();
        });

        let started = std::time::Instant::now();
        drop(runtime);
        assert!(
            started.elapsed() < Duration::from_secs(3),
            "runtime shutdown waited {:?}",
            started.elapsed()
        );
    }

    #[tokio::test]
    async fn natural_exit_fires_once_and_closes_writes() {
        let session = PtySession::start(sh_spec()).await.unwrap();
        let exits = Arc::new(StdMutex::new(Vec::new()));
        let recorder = exits.clone();
        session
            .on_exit(Box::new(move |exit: ExitInfo| recorder.lock().unwrap().push(exit)))
            .unwrap();

        session.write(b"exit 3\n").unwrap();
        assert!(wait_for(|| !exits.lock().unwrap().is_empty()).await);

        let exits_seen = exits.lock().unwrap().clone();
        assert_eq!(exits_seen.len(), 1);
        assert_eq!(exits_seen[0].exit_code, 3);

        assert!(matches!(session.write(b"echo late\n"), Err(PtyError::SessionClosed)));
        session.terminate();
        session.terminate();
        sleep(Duration::from_millis(100)).await;
        assert_eq!(exits.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn terminate_is_idempotent() {
        let session = PtySession::start(sh_spec()).await.unwrap();
        let exits = Arc::new(StdMutex::new(0u32));
        let counter = exits.clone();
        session
            .on_exit(Box::new(move |_: ExitInfo| *counter.lock().unwrap() += 1))
            .unwrap();

        session.terminate();
        session.terminate();
        assert!(matches!(session.write(b"x"), Err(PtyError::SessionClosed)));

        assert!(wait_for(|| *exits.lock().unwrap() == 1).await);
        sleep(Duration::from_millis(100)).await;
        assert_eq!(*exits.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn missing_executable_is_a_spawn_error() {
        let mut spec = sh_spec();
        spec.executable = "/definitely/not/a/shell".to_string();
        let err = PtySession::start(spec).await.unwrap_err();
        assert!(err.is_spawn_error(), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn child_sees_term_name_and_spec_environment() {
        let mut spec = sh_spec();
        spec.term_name = "xterm-color".to_string();
        spec.environment.insert("PTY_BRIDGE_MARKER".to_string(), "marker-42".to_string());
        let session = PtySession::start(spec).await.unwrap();
        let output = capture_output(&session);

        session.write(b"echo \"$TERM:$PTY_BRIDGE_MARKER\"\n").unwrap();
        let found = wait_for(|| {
            String::from_utf8_lossy(&output.lock().unwrap()).contains("xterm-color:marker-42")
        })
        .await;
        assert!(found);
    }
}
