//! syscall-deception - Rule-driven syscall deception for honeypot hosts
//!
//! Reads control commands from stdin, one per line, and applies them to the
//! rule table. uname(2) is hooked against the host's real identity.
//!
//! # Usage
//!
//! ```bash
//! printf 'add:uname::Linux-Fake:\nlist\nprobe 1234\n' | syscall-deception
//!
//! # Container-scoped rule, seen from inside and outside the container
//! printf 'add:uname::Web-OS:/docker/web\nprobe 7 /docker/web\nprobe 7\n' | syscall-deception
//!
//! # Start with deception switched off
//! syscall-deception --disabled
//! ```

use std::collections::HashMap;
use std::env;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use parking_lot::Mutex;

use syscall_deception::{
    config::Config,
    container::ContainerResolver,
    engine::hooks::HookRegistry,
    engine::memory::UserBuffer,
    engine::uname::{self, HostUts, UtsName, UTSNAME_SIZE},
    engine::{DeceptionEngine, SyscallCall, Task},
    rules::{ContainerToken, Pid},
    syscalls::SYS_UNAME,
    ControlInterface,
};

/// Containers pinned to a pid for the duration of one probe
type Pins = Arc<Mutex<HashMap<Pid, ContainerToken>>>;

/// Print version information
fn print_version() {
    println!("syscall-deception {}", env!("CARGO_PKG_VERSION"));
}

/// Print help message
fn print_help() {
    println!(
        r#"syscall-deception - Rule-driven syscall deception for honeypot hosts

USAGE:
    syscall-deception [OPTIONS] < commands

OPTIONS:
    -h, --help              Print this help message
    -v, --version           Print version information
    -c, --config PATH       Path to config file
        --disabled          Start with deception switched off

COMMANDS (stdin, one per line):
    add:<syscall>:<pattern>:<replacement>:<container>[:<pid>[:<flags>]]
    remove:<rule_id>
    clear
    enable
    disable
    list                    Print the rule listing
    probe <pid> [container] Run uname as <pid> and print what it would see

ENVIRONMENT:
    DECEPTION_DISABLED=1    Start with deception switched off
    DECEPTION_AUDIT_PATH    Override the audit log path
    RUST_LOG                Log filter (default: info)
"#
    );
}

/// Parse command line arguments
struct Args {
    help: bool,
    version: bool,
    disabled: bool,
    config_path: Option<String>,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut result = Args {
            help: false,
            version: false,
            disabled: false,
            config_path: None,
        };

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "-h" | "--help" => result.help = true,
                "-v" | "--version" => result.version = true,
                "--disabled" => result.disabled = true,
                "-c" | "--config" => {
                    if i + 1 < args.len() {
                        i += 1;
                        result.config_path = Some(args[i].clone());
                    }
                }
                arg if arg.starts_with("--config=") => {
                    let path = arg.trim_start_matches("--config=");
                    result.config_path = Some(path.to_string());
                }
                _ => {}
            }
            i += 1;
        }

        result
    }
}

/// Split `<pid> [container]`
fn parse_probe(args: &str) -> Result<(Pid, Option<ContainerToken>), String> {
    let mut fields = args.split_whitespace();
    let pid = fields.next().ok_or("missing pid")?;
    let pid = pid
        .parse::<Pid>()
        .map_err(|_| format!("bad pid {:?}", pid))?;
    let container = fields.next().map(ContainerToken::new);

    if fields.next().is_some() {
        return Err("usage: probe <pid> [container]".to_string());
    }
    Ok((pid, container))
}

/// Run uname through the dispatcher on behalf of `pid`, optionally as a
/// member of the given container
fn probe(engine: &DeceptionEngine, hooks: &HookRegistry, pins: &Pins, args: &str) -> String {
    let (pid, container) = match parse_probe(args) {
        Ok(parsed) => parsed,
        Err(e) => return format!("error: {}", e),
    };

    if let Some(container) = container {
        pins.lock().insert(pid, container);
    }

    let mut buf = UserBuffer::new(UTSNAME_SIZE);
    let mut call = SyscallCall::new(Task::new(pid), None, &mut buf);
    let result = hooks.invoke(engine, SYS_UNAME, &mut call);
    pins.lock().remove(&pid);

    match result {
        Ok(_) => match UtsName::from_bytes(buf.as_bytes()) {
            Some(uts) => format!(
                "{} {} {} {} {}",
                uts.sysname, uts.nodename, uts.release, uts.version, uts.machine
            ),
            None => "error: short uname result".to_string(),
        },
        Err(e) => format!("error: {} (errno {})", e, e.errno()),
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    // Handle help and version
    if args.help {
        print_help();
        return;
    }

    if args.version {
        print_version();
        return;
    }

    // Load configuration
    let mut config = if let Some(ref path) = args.config_path {
        Config::load_from(std::path::Path::new(path)).unwrap_or_else(|e| {
            log::warn!("failed to load config from {}: {}", path, e);
            Config::default()
        })
    } else {
        Config::load()
    };
    config.apply_env_overrides();
    if args.disabled {
        config.general.enabled = false;
    }

    // probe pins take precedence over the configured resolver
    let pins: Pins = Arc::default();
    let fallback = config.container.resolver.build();
    let pinned = pins.clone();
    let engine = Arc::new(DeceptionEngine::from_config(&config).with_resolver(Box::new(
        move |task: &Task| {
            pinned
                .lock()
                .get(&task.pid)
                .cloned()
                .or_else(|| fallback.resolve(task))
        },
    )));
    let hooks = HookRegistry::new();
    if let Err(e) = uname::install(&hooks, HostUts) {
        log::error!("failed to hook uname: {}", e);
        std::process::exit(1);
    }
    let control = ControlInterface::new(engine.clone());

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for line in stdin.lock().lines() {
        let Ok(line) = line else {
            break;
        };
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let response = if line == "list" {
            control.read()
        } else if let Some(args) = line.strip_prefix("probe ") {
            probe(&engine, &hooks, &pins, args)
        } else {
            match control.submit(line) {
                Ok(outcome) => outcome.message(),
                Err(e) => format!("error: {} (errno {})", e, e.errno()),
            }
        };

        let _ = writeln!(out, "{}", response.trim_end());
        let _ = out.flush();
    }

    hooks.remove_all();
    engine.shutdown();
}
