//! memsh command-line entry point.
//!
//! Runs a script file, a single `-c` line, or reads stdin line by line,
//! holding back lines while a heredoc or `for` loop is still open. Host
//! files can be imported before the run and exported after it.

mod options;

use std::io::{BufRead, IsTerminal, Write};

use anyhow::{Context, Result};

use memsh_terminal::{Shell, needs_more_input};
use memsh_vfs::{export_host, import_host};
use options::{Options, USAGE, load_config};

/// Run `text` and print its output. Returns whether it succeeded.
fn run_text(shell: &mut Shell, text: &str) -> bool {
    match shell.execute(text) {
        Ok(output) => {
            if !output.is_empty() {
                println!("{output}");
            }
            true
        },
        Err(e) => {
            eprintln!("memsh: {e}");
            false
        },
    }
}

/// Read commands from stdin until EOF or `exit`. Returns whether the last
/// command succeeded.
fn run_stdin(shell: &mut Shell) -> Result<bool> {
    let stdin = std::io::stdin();
    let interactive = stdin.is_terminal();
    let mut ok = true;
    let mut pending = String::new();

    let prompt = |continuation: bool| -> Result<()> {
        if interactive {
            eprint!("{}", if continuation { "> " } else { "memsh$ " });
            std::io::stderr().flush()?;
        }
        Ok(())
    };

    prompt(false)?;
    for line in stdin.lock().lines() {
        let line = line?;
        if pending.is_empty() && line.trim() == "exit" {
            break;
        }
        if !pending.is_empty() {
            pending.push('\n');
        }
        pending.push_str(&line);
        if needs_more_input(&pending) {
            prompt(true)?;
            continue;
        }
        ok = run_text(shell, &pending);
        pending.clear();
        prompt(false)?;
    }
    if !pending.is_empty() {
        log::warn!("input ended inside an open heredoc or loop");
        ok = run_text(shell, &pending);
    }
    Ok(ok)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let opts = Options::parse(std::env::args().skip(1))?;
    if opts.help {
        println!("{USAGE}");
        return Ok(());
    }

    let config = load_config(opts.config.as_deref())?;
    let mut shell = Shell::new(config)?;
    log::info!("Starting memsh in {}", shell.config().initial_cwd);

    for (host, vfs_path) in &opts.imports {
        import_host(shell.vfs_mut(), host, vfs_path)
            .with_context(|| format!("importing {} into {vfs_path}", host.display()))?;
    }

    let ok = match (&opts.command, &opts.script) {
        (Some(line), _) => run_text(&mut shell, line),
        (None, Some(path)) => {
            let script = std::fs::read_to_string(path)
                .with_context(|| format!("reading script {}", path.display()))?;
            run_text(&mut shell, &script)
        },
        (None, None) => run_stdin(&mut shell)?,
    };

    for (vfs_path, host) in &opts.exports {
        export_host(shell.vfs(), vfs_path, host)
            .with_context(|| format!("exporting {vfs_path} to {}", host.display()))?;
    }

    log::info!("memsh finished");
    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
