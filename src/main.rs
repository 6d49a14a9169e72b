//! LockSleuth: find out which processes are holding a file or drive open.
//!
//! Thin binary entry point. All logic lives in the `locksleuth-core` crate.
//!
//! ```text
//! locksleuth <PATH | DRIVE:> [--partial] [--include-self] [--json] [--verbose]
//! ```

use anyhow::{anyhow, bail};

const USAGE: &str =
    "usage: locksleuth <PATH | DRIVE:> [--partial] [--include-self] [--json] [--verbose]";

#[derive(Debug, Default, PartialEq, Eq)]
struct Args {
    target: String,
    partial: bool,
    include_self: bool,
    json: bool,
    verbose: bool,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> anyhow::Result<Args> {
    let mut parsed = Args::default();
    let mut target = None;
    for arg in args {
        match arg.as_str() {
            "--partial" => parsed.partial = true,
            "--include-self" => parsed.include_self = true,
            "--json" => parsed.json = true,
            "--verbose" | "-v" => parsed.verbose = true,
            "--help" | "-h" => bail!(USAGE),
            option if option.starts_with("--") => bail!("unknown option {option}\n{USAGE}"),
            _ if target.is_some() => bail!("only one path may be given\n{USAGE}"),
            _ => target = Some(arg),
        }
    }
    parsed.target = target.ok_or_else(|| anyhow!(USAGE))?;
    Ok(parsed)
}

fn main() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1))?;

    // Report lines own stdout; logs go to stderr.
    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("LockSleuth starting");
    let found = run(&args)?;
    std::process::exit(if found { 0 } else { 1 });
}

#[cfg(windows)]
fn run(args: &Args) -> anyhow::Result<bool> {
    use locksleuth_core::{platform, SearchConfig, SearchOptions, SearchProgress};

    if !platform::is_elevated() {
        tracing::warn!("Not running elevated: processes of other users cannot be inspected");
    }
    match platform::enable_debug_privilege() {
        Ok(()) => tracing::debug!("SeDebugPrivilege enabled"),
        Err(e) => tracing::debug!("Could not enable SeDebugPrivilege: {e}"),
    }

    let (target, whole_drive) = resolve_target(&args.target)?;
    let options = SearchOptions {
        partial_match: args.partial,
        whole_volume: whole_drive,
        ignore_self: !args.include_self,
    };

    let handle = locksleuth_core::start_search(target, options, SearchConfig::default());
    let mut outcome = None;
    for message in handle.progress_rx.iter() {
        match message {
            SearchProgress::Line(line) => {
                if !args.json {
                    println!("{line}");
                }
            }
            SearchProgress::Holder(holder) => {
                tracing::debug!("holder: pid {} ({:?})", holder.pid, holder.image_path);
            }
            SearchProgress::Complete { outcome: done } => {
                outcome = Some(done);
                break;
            }
        }
    }

    let outcome = outcome.ok_or_else(|| anyhow!("search thread exited without a result"))?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    }
    Ok(outcome.found)
}

/// Turn the user's argument into the NT name the kernel reports, and whether
/// it names a whole drive (which matches every path on that volume).
#[cfg(windows)]
fn resolve_target(arg: &str) -> anyhow::Result<(String, bool)> {
    use locksleuth_core::platform;

    if arg.starts_with('\\') && !arg.starts_with(r"\\") {
        return Ok((arg.to_string(), false));
    }
    let Some((letter, rest)) = platform::split_drive(arg) else {
        bail!("{arg} is not a drive, a DOS path or an NT object name");
    };
    if rest.is_empty() || rest == "\\" {
        let device = platform::dos_device_name(&format!("{letter}:"))
            .ok_or_else(|| anyhow!("no volume is mounted at {letter}:"))?;
        return Ok((device, true));
    }
    let path = platform::nt_path(arg).ok_or_else(|| anyhow!("could not resolve the volume of {arg}"))?;
    Ok((path, false))
}

#[cfg(not(windows))]
fn run(_args: &Args) -> anyhow::Result<bool> {
    bail!("LockSleuth inspects the Windows handle table and only runs on Windows")
}
