//!
//! recipebox CLI binary
//! --------------------
//! Command-line tool and interactive interpreter for the recipe service.
//! The session survives between runs in the session file, so `login` once
//! and later invocations reuse the stored credential.

use std::env;
use std::path::PathBuf;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use recipebox::cli::{self, commands::HELP, App};
use recipebox::config::{normalize_base_url, ClientConfig};

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--api <url>] [--session-file <path>] [--json] <command> [args]\n  {program} --repl [--api <url>] [--session-file <path>] [--json]\n\nFlags:\n  --api <url>              Recipe service base URL (env RECIPEBOX_API_URL, default http://localhost:8080)\n  --session-file <path>    Where the session is remembered (env RECIPEBOX_SESSION_FILE)\n  --json                   Print results as JSON (env RECIPEBOX_OUTPUT=json)\n  --repl                   Start interactive mode\n  -h, --help               Show this help\n\n{HELP}"
    );
}

fn main() -> Result<()> {
    // Logs go to stderr so command output stays clean
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn"))?;
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let mut args: Vec<String> = env::args().collect();
    let program = if args.is_empty() { "recipebox".to_string() } else { args.remove(0) };

    let mut cfg = ClientConfig::from_env()?;
    let mut repl = false;
    let mut rest: Vec<String> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--api" => {
                if i + 1 >= args.len() { eprintln!("--api requires a URL"); print_usage(&program); std::process::exit(2); }
                cfg.base_url = normalize_base_url(&args[i + 1])?;
                i += 2;
            }
            "--session-file" => {
                if i + 1 >= args.len() { eprintln!("--session-file requires a path"); print_usage(&program); std::process::exit(2); }
                cfg.session_file = PathBuf::from(&args[i + 1]);
                i += 2;
            }
            "--json" => { cfg.json_output = true; i += 1; }
            "--repl" => { repl = true; i += 1; }
            "-h" | "--help" => { print_usage(&program); return Ok(()); }
            _ => {
                rest.extend_from_slice(&args[i..]);
                break;
            }
        }
    }

    info!(
        target: "recipebox",
        "recipebox starting: api='{}', session_file='{}', repl={}",
        cfg.base_url, cfg.session_file.display(), repl
    );

    let rt = tokio::runtime::Runtime::new()?;
    let app = App::from_config(&cfg)?;

    if repl {
        return cli::run_repl(&rt, &app);
    }
    if rest.is_empty() {
        print_usage(&program);
        std::process::exit(2);
    }
    let code = cli::run_once(&rt, &app, &rest);
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
