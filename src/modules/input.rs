/// ----- INPUT MODULE -----
/// Reads operator commands from stdin on its own thread and hands them to
/// the run loop over a channel.

use std::io::{self, BufRead};
use std::thread;

use crossbeam_channel::{unbounded, Receiver};
use log::warn;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Raw floor number. The scheduler rejects anything past `u8`.
    Call { floor: u32, origin: Option<u8>, requester: Option<String> },
    Go,
    Status,
    Json,
    Clear,
    Quit,
}

impl Command {
    /// `5`, `call 5 [who]`, `from 1 5 [who]`, `go`, `status`, `json`, `clear`, `quit`.
    pub fn parse(line: &str) -> Option<Self> {
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            [] => None,
            ["go"] => Some(Command::Go),
            ["status"] => Some(Command::Status),
            ["json"] => Some(Command::Json),
            ["clear"] => Some(Command::Clear),
            ["quit"] | ["exit"] => Some(Command::Quit),
            ["call", floor, rest @ ..] => Some(Command::Call {
                floor: floor.parse().ok()?,
                origin: None,
                requester: requester(rest)?,
            }),
            ["from", origin, floor, rest @ ..] => Some(Command::Call {
                floor: floor.parse().ok()?,
                origin: Some(origin.parse().ok()?),
                requester: requester(rest)?,
            }),
            [floor] => Some(Command::Call {
                floor: floor.parse().ok()?,
                origin: None,
                requester: None,
            }),
            _ => None,
        }
    }
}

fn requester(rest: &[&str]) -> Option<Option<String>> {
    match rest {
        [] => Some(None),
        [id] => Some(Some(id.to_string())),
        _ => None,
    }
}

pub fn init() -> io::Result<Receiver<Command>> {
    let (command_tx, command_rx) = unbounded();
    thread::Builder::new().name("stdin_commands".to_string()).spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(_) => break,
            };
            match Command::parse(&line) {
                Some(command) => {
                    if command_tx.send(command).is_err() {
                        return;
                    }
                },
                None if line.trim().is_empty() => (),
                None => warn!("could not understand '{}', skipping...", line.trim()),
            }
        }
        // stdin closed
        let _ = command_tx.send(Command::Quit);
    })?;
    Ok(command_rx)
}
