mod calc;
mod dashboard;
mod db;
mod debounce;
mod export;
mod filter;
mod grade;
mod ipc;
mod legacy;
mod record;
mod settings;
mod store;

use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::Instant;

use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

// stdout carries the protocol, so logs go to stderr.
fn init_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_writer(io::stderr)
        .with_target(false)
        .with_ansi(false)
        .compact()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn spawn_stdin_reader(tx: Sender<ipc::Event>) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(v) => v,
                    Err(_) => break,
                };
                if tx.send(ipc::Event::Line(line)).is_err() {
                    return;
                }
            }
            let _ = tx.send(ipc::Event::InputClosed);
        })
}

fn write_line(out: &mut impl Write, value: &serde_json::Value) {
    let _ = writeln!(
        out,
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{\"ok\":false}".to_string())
    );
    let _ = out.flush();
}

fn main() {
    init_logging();

    let (tx, rx) = mpsc::channel::<ipc::Event>();
    if let Err(e) = spawn_stdin_reader(tx.clone()) {
        warn!(error = %e, "could not start stdin reader");
        return;
    }
    let mut state = ipc::AppState::new(tx);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut input_open = true;
    info!(version = env!("CARGO_PKG_VERSION"), "studentdashd ready");

    loop {
        // Sleep no longer than the pending chart redraw allows.
        let event = match state.next_wake(Instant::now()) {
            Some(wait) => match rx.recv_timeout(wait) {
                Ok(ev) => Some(ev),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            },
            None => match rx.recv() {
                Ok(ev) => Some(ev),
                Err(_) => break,
            },
        };

        match event {
            Some(ipc::Event::Line(line)) => {
                if let Some(resp) = ipc::handle_line(&mut state, &line) {
                    write_line(&mut out, &resp);
                }
            }
            Some(ipc::Event::ExportFinished { job_id, result }) => {
                let ev = ipc::on_export_finished(&mut state, job_id, result);
                write_line(&mut out, &ev);
            }
            Some(ipc::Event::InputClosed) => input_open = false,
            None => {}
        }

        if let Some(ev) = ipc::poll_redraw(&mut state, Instant::now()) {
            write_line(&mut out, &ev);
        }

        // Let a running export report before exiting.
        if !input_open && !state.export_in_progress() {
            break;
        }
    }
}
