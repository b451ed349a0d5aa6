//! Terminal front-end: one-shot commands and an interactive interpreter.

pub mod commands;
pub mod outputformatter;

use anyhow::Result;
use rustyline::error::ReadlineError;
use tokio::runtime::Runtime;
use tokio::sync::broadcast::error::TryRecvError;

use crate::identity::SessionEvent;
pub use commands::{parse_command, report, split_args, App, Command};

/// Run a single command. Returns the process exit code.
pub fn run_once(rt: &Runtime, app: &App, args: &[String]) -> i32 {
    let cmd = match parse_command(args) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{}", msg);
            return 2;
        }
    };
    match rt.block_on(app.execute(cmd)) {
        Ok(out) => {
            if !out.is_empty() { println!("{}", out); }
            0
        }
        Err(e) => {
            eprintln!("{}", report(&e));
            1
        }
    }
}

pub fn run_repl(rt: &Runtime, app: &App) -> Result<()> {
    let mut rl = rustyline::DefaultEditor::new()?;
    let mut events = app.session.subscribe();
    println!("recipebox interpreter. Type 'help' for commands.");
    match app.session.username() {
        Some(u) => println!("signed in as {}", u),
        None => println!("not signed in; use 'login <user> <password>'"),
    }
    loop {
        let line = match rl.readline(&app.prompt()) {
            Ok(l) => l,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let words = split_args(&line);
        if words.is_empty() { continue; }
        // keep passwords out of history
        if !words[0].eq_ignore_ascii_case("login") {
            let _ = rl.add_history_entry(line.as_str());
        }
        let cmd = match parse_command(&words) {
            Ok(c) => c,
            Err(msg) => { eprintln!("{}", msg); continue; }
        };
        if cmd == Command::Quit { break; }
        match rt.block_on(app.execute(cmd)) {
            Ok(out) => { if !out.is_empty() { println!("{}", out); } }
            Err(e) => eprintln!("{}", report(&e)),
        }
        drain_events(&mut events);
    }
    Ok(())
}

fn drain_events(rx: &mut tokio::sync::broadcast::Receiver<SessionEvent>) {
    loop {
        match rx.try_recv() {
            Ok(SessionEvent::Expired) => println!("(signed out: the service rejected the session)"),
            Ok(_) => {}
            Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }
}
