use std::io::{self, Write};

use color_eyre::Result;
use pipesh::{
    config::Config,
    input::{InputMessage, LineReader},
    parse_tokens, Outcome, ShellContext,
};
use tracing_subscriber::prelude::*;

#[macro_use]
extern crate tracing;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load()?;

    let (writer, _guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(
        &config.log.directory,
        &config.log.file,
    ));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(writer))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_error::ErrorLayer::default())
        .init();

    color_eyre::install()?;

    trace!(?config, "loaded config");

    let mut ctx = ShellContext::from_env()?.with_prompt(config.prompt);
    let interactive = termion::is_tty(&io::stdin());

    trace!("spawning input reader");
    let mut input = LineReader::spawn(io::BufReader::new(io::stdin()));

    loop {
        if ctx.shows_prompt(interactive) {
            ctx.render(&mut io::stdout().lock())?;
        }

        let tokens = match input.next().await {
            InputMessage::Tokens(tokens) => tokens,
            InputMessage::Invalid(err) => {
                report(&format!("failed to tokenize command: {err}"));
                continue;
            }
            InputMessage::Error(err) if err.kind() == io::ErrorKind::InvalidData => {
                report(&err.to_string());
                continue;
            }
            InputMessage::Error(err) => {
                error!(%err, "failed to read input");
                report(&err.to_string());
                break;
            }
            InputMessage::Eof => {
                trace!("end of input");
                if ctx.shows_prompt(interactive) {
                    println!();
                }
                break;
            }
        };

        let command = match parse_tokens(&tokens) {
            Ok(command) => command,
            Err(err) => {
                debug!(%err, "rejected command");
                report(&err.to_string());
                continue;
            }
        };

        match command.execute(&mut ctx).await {
            Ok(Outcome::Exit(code)) => {
                trace!(code, "exiting");
                break;
            }
            Ok(Outcome::Background(pid)) => {
                println!("[{pid}]");
            }
            Ok(_) => {}
            Err(err) => {
                warn!(%err, "command failed");
                report(&err.to_string());
            }
        }
    }

    Ok(())
}

fn report(msg: &str) {
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "pipesh: {msg}");
}
