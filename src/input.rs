use std::io::{self, BufRead};

use crate::{
    parse::token::{tokenize, LexerError},
    prelude::*,
};

#[derive(Debug)]
pub enum InputMessage {
    Tokens(Vec<String>),
    Invalid(LexerError),
    Eof,
    Error(io::Error),
}

pub type InputReceiver = Receiver<InputMessage>;
pub type InputSender = Sender<InputMessage>;

/// Reads and tokenizes lines on a blocking task, one line per request.
///
/// Nothing is read until [`LineReader::next`] asks for it, so a foreground
/// child never has to share the terminal with the shell.
pub struct LineReader {
    requests: Sender<()>,
    lines: InputReceiver,
}

impl LineReader {
    pub fn spawn<R>(mut reader: R) -> Self
    where
        R: BufRead + Send + 'static,
    {
        let (request_tx, mut request_rx) = unbounded_channel::<()>();
        let (sender, receiver): (InputSender, InputReceiver) = unbounded_channel();

        tokio::task::spawn_blocking(move || {
            let mut line = String::new();

            while request_rx.blocking_recv().is_some() {
                line.clear();

                let msg = match reader.read_line(&mut line) {
                    Ok(0) => InputMessage::Eof,
                    Ok(_) => match tokenize(&line) {
                        Ok(tokens) => InputMessage::Tokens(tokens),
                        Err(err) => InputMessage::Invalid(err),
                    },
                    Err(err) => InputMessage::Error(err),
                };

                if sender.send(msg).is_err() {
                    break;
                }
            }

            trace!("input reader finished");
        });

        Self {
            requests: request_tx,
            lines: receiver,
        }
    }

    pub async fn next(&mut self) -> InputMessage {
        if self.requests.send(()).is_err() {
            return InputMessage::Eof;
        }

        self.lines.recv().await.unwrap_or(InputMessage::Eof)
    }
}
