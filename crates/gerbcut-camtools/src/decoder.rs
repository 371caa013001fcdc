//! Parses an encoded GP-GL job back into commands.

use crate::encoder::{ENQ, EOT, ESC};
use gerbcut_core::Point;
use gerbcut_devicedb::Dialect;

/// One decoded device command. Coordinates are in steps, x first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `ESC EOT`
    Initialize,
    /// `ESC ENQ`
    StatusQuery,
    /// `FN`
    Orientation(i64),
    /// `\`, frame lower-left corner
    LowerLeft { x: i64, y: i64 },
    /// `Z`, frame upper-right corner
    UpperRight { x: i64, y: i64 },
    /// `!`
    Speed(u32),
    /// `FX`
    Force(u32),
    /// `M`, pen-up move
    Move { x: i64, y: i64 },
    /// `D`, pen-down draw
    Draw { x: i64, y: i64 },
    /// `&1,1,1`
    EndOfJob,
    /// `FO`
    FeedOut(i64),
    /// `H`
    Home,
    Unknown(String),
}

impl Command {
    /// Coordinate of a positional command, in inches
    pub fn point(&self, dialect: &Dialect) -> Option<Point> {
        let spi = dialect.steps_per_inch as f64;
        match self {
            Command::LowerLeft { x, y }
            | Command::UpperRight { x, y }
            | Command::Move { x, y }
            | Command::Draw { x, y } => Some(Point::new(*x as f64 / spi, *y as f64 / spi)),
            _ => None,
        }
    }
}

/// Split a job into commands
pub fn decode(bytes: &[u8], dialect: &Dialect) -> Vec<Command> {
    let mut commands = Vec::new();
    for segment in bytes.split(|b| *b == dialect.terminator) {
        let mut rest = segment;
        while rest.len() >= 2 && rest[0] == ESC {
            match rest[1] {
                EOT => commands.push(Command::Initialize),
                ENQ => commands.push(Command::StatusQuery),
                other => commands.push(Command::Unknown(format!("ESC {:#04x}", other))),
            }
            rest = &rest[2..];
        }
        if rest.is_empty() {
            continue;
        }
        commands.push(parse_command(&String::from_utf8_lossy(rest), dialect));
    }
    commands
}

fn parse_command(text: &str, dialect: &Dialect) -> Command {
    let unknown = || Command::Unknown(text.to_string());
    let pair = |args: &str| -> Option<(i64, i64)> {
        let (a, b) = args.split_once(',')?;
        let (a, b) = (a.trim().parse().ok()?, b.trim().parse().ok()?);
        Some(if dialect.swap_axes { (b, a) } else { (a, b) })
    };

    if text == "&1,1,1" {
        return Command::EndOfJob;
    }
    if text == "H" {
        return Command::Home;
    }
    if let Some(args) = text.strip_prefix("FN") {
        return args.parse().map(Command::Orientation).unwrap_or_else(|_| unknown());
    }
    if let Some(args) = text.strip_prefix("FX") {
        return args.parse().map(Command::Force).unwrap_or_else(|_| unknown());
    }
    if let Some(args) = text.strip_prefix("FO") {
        return args.parse().map(Command::FeedOut).unwrap_or_else(|_| unknown());
    }
    if let Some(args) = text.strip_prefix('!') {
        return args.parse().map(Command::Speed).unwrap_or_else(|_| unknown());
    }

    let positional: [(char, fn(i64, i64) -> Command); 4] = [
        ('\\', |x, y| Command::LowerLeft { x, y }),
        ('Z', |x, y| Command::UpperRight { x, y }),
        ('M', |x, y| Command::Move { x, y }),
        ('D', |x, y| Command::Draw { x, y }),
    ];
    for (prefix, build) in positional {
        if let Some(args) = text.strip_prefix(prefix) {
            return pair(args).map(|(x, y)| build(x, y)).unwrap_or_else(unknown);
        }
    }
    unknown()
}
