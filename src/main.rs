//! siftline - Interactive Incremental Line Filter
//!
//! Filters lines from a file or standard input as you type and prints the chosen ones.

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use siftline::buffer::{open_input, InputSource};
use siftline::input::RawInputCollector;
use siftline::matcher::Matcher;
use siftline::render::ui::TerminalUI;
use siftline::{Coordinator, ExitStatus, Line, Options, Session};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

fn build_cli() -> Command {
    Command::new("siftline")
        .version(siftline::VERSION)
        .about("An interactive, incremental line filter for the terminal")
        .long_about(
            "siftline reads lines from FILE (or standard input when it is piped), narrows \
             them down as you type and prints the selected lines on standard output.",
        )
        .arg(
            Arg::new("file")
                .help("File to read lines from; standard input is used when omitted")
                .value_parser(value_parser!(PathBuf))
                .index(1),
        )
        .arg(
            Arg::new("query")
                .long("query")
                .value_name("QUERY")
                .help("Initial query"),
        )
        .arg(
            Arg::new("rcfile")
                .long("rcfile")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .help("Settings file to use instead of the default location"),
        )
        .arg(
            Arg::new("no-ignore-case")
                .long("no-ignore-case")
                .action(ArgAction::SetTrue)
                .help("Start with the case-sensitive matcher"),
        )
        .arg(
            Arg::new("buffer-size")
                .short('b')
                .long("buffer-size")
                .value_name("LINES")
                .value_parser(value_parser!(usize))
                .help("Keep at most LINES lines, dropping the oldest; 0 keeps everything"),
        )
        .arg(
            Arg::new("null")
                .long("null")
                .action(ArgAction::SetTrue)
                .help("Show the part before NUL and print the part after it"),
        )
        .arg(
            Arg::new("initial-matcher")
                .long("initial-matcher")
                .value_name("NAME")
                .help("Matcher to start with: IgnoreCase, CaseSensitive or Regexp"),
        )
        .arg(
            Arg::new("prompt")
                .long("prompt")
                .value_name("TEXT")
                .help("Prompt shown in front of the query"),
        )
}

fn resolve_options(matches: &ArgMatches) -> Result<Options> {
    let mut options = Options::default();

    #[cfg(feature = "config")]
    {
        use siftline::config::settings::Settings;

        let path = matches
            .get_one::<PathBuf>("rcfile")
            .cloned()
            .or_else(Settings::locate);
        if let Some(path) = path {
            log::debug!("loading settings from {}", path.display());
            Settings::load(&path)?.apply(&mut options)?;
        }
    }

    if matches.get_flag("no-ignore-case") {
        options.matcher = Matcher::CaseSensitive;
    }
    if let Some(name) = matches.get_one::<String>("initial-matcher") {
        options.matcher = name.parse()?;
    }
    if let Some(&size) = matches.get_one::<usize>("buffer-size") {
        options.buffer_size = size;
    }
    if let Some(query) = matches.get_one::<String>("query") {
        options.query = Some(query.clone());
    }
    if let Some(prompt) = matches.get_one::<String>("prompt") {
        options.prompt = prompt.clone();
    }
    options.null_separator = matches.get_flag("null");

    Ok(options)
}

async fn run(matches: ArgMatches) -> Result<(ExitStatus, Vec<Line>)> {
    let options = resolve_options(&matches)?;

    let source = InputSource::detect(matches.get_one::<PathBuf>("file").cloned())?;
    let input = open_input(&source)
        .await
        .with_context(|| format!("cannot read {}", source.describe()))?;

    let coordinator = Arc::new(Coordinator::new(&options));
    if let Some(seed) = options.seed_query() {
        coordinator.set_query(seed);
    }

    let session = Session {
        input,
        renderer: Box::new(TerminalUI::new(options.theme.clone())),
        events: Box::new(RawInputCollector::new()),
        relay_signals: true,
    };
    let status = coordinator.run(session).await?;
    if let Some(message) = coordinator.failure() {
        eprintln!("siftline: {message}");
    }

    Ok((status, coordinator.result()))
}

fn write_output(lines: &[Line]) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for line in lines {
        out.write_all(line.output().as_bytes())
            .and_then(|()| out.write_all(b"\n"))
            .context("cannot write selected lines")?;
    }
    out.flush().context("cannot write selected lines")?;
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let matches = match build_cli().try_get_matches() {
        Ok(matches) => matches,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("siftline: cannot start runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = runtime.block_on(run(matches));
    // A pending read on standard input cannot be cancelled; do not wait for it.
    runtime.shutdown_background();

    match outcome.and_then(|(status, lines)| write_output(&lines).map(|()| status)) {
        Ok(status) => ExitCode::from(status.code()),
        Err(err) => {
            eprintln!("siftline: {err:#}");
            ExitCode::FAILURE
        }
    }
}
