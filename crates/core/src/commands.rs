//! Tokenizer for raw Redis command uploads.
//!
//! An upload is plain text with one command per line, written the way
//! `redis-cli` accepts it: arguments separated by whitespace, double
//! quotes with escapes, single quotes with `\'` only.

use crate::error::CoreError;

/// One parsed command line of an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCommand {
    /// 1-based line number in the uploaded text.
    pub line: usize,
    /// The trimmed source text, used as the report key.
    pub text: String,
    /// Command name followed by its arguments.
    pub args: Vec<Vec<u8>>,
}

impl RawCommand {
    /// First argument after the command name, which Redis uses as the key
    /// for routing in the common single-key commands.
    pub fn routing_key(&self) -> Option<&[u8]> {
        self.args.get(1).map(Vec::as_slice)
    }
}

/// Split uploaded text into commands, skipping blank lines.
pub fn parse_commands(text: &str) -> Result<Vec<RawCommand>, CoreError> {
    let mut commands = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let args = parse_command_line(trimmed).map_err(|reason| {
            CoreError::Validation(format!("Line {}: {reason}", idx + 1))
        })?;
        commands.push(RawCommand {
            line: idx + 1,
            text: trimmed.to_string(),
            args,
        });
    }
    Ok(commands)
}

/// Split a single command line into arguments.
pub fn parse_command_line(line: &str) -> Result<Vec<Vec<u8>>, &'static str> {
    let mut args = Vec::new();
    let mut chars = line.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        let Some(&first) = chars.peek() else {
            break;
        };

        let mut current = Vec::new();
        match first {
            '"' => {
                chars.next();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    match c {
                        '"' => {
                            closed = true;
                            break;
                        }
                        '\\' => match chars.next() {
                            Some('n') => current.push(b'\n'),
                            Some('r') => current.push(b'\r'),
                            Some('t') => current.push(b'\t'),
                            Some('b') => current.push(0x08),
                            Some('a') => current.push(0x07),
                            Some('x') => {
                                let hi = chars.next().and_then(|c| c.to_digit(16));
                                let lo = chars.next().and_then(|c| c.to_digit(16));
                                match (hi, lo) {
                                    (Some(hi), Some(lo)) => current.push((hi * 16 + lo) as u8),
                                    _ => return Err("invalid \\x escape"),
                                }
                            }
                            Some(other) => push_char(&mut current, other),
                            None => return Err("unbalanced quotes"),
                        },
                        other => push_char(&mut current, other),
                    }
                }
                if !closed {
                    return Err("unbalanced quotes");
                }
                if chars.peek().is_some_and(|c| !c.is_whitespace()) {
                    return Err("closing quote must be followed by a space");
                }
            }
            '\'' => {
                chars.next();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    match c {
                        '\'' => {
                            closed = true;
                            break;
                        }
                        '\\' if chars.peek() == Some(&'\'') => {
                            chars.next();
                            current.push(b'\'');
                        }
                        other => push_char(&mut current, other),
                    }
                }
                if !closed {
                    return Err("unbalanced quotes");
                }
                if chars.peek().is_some_and(|c| !c.is_whitespace()) {
                    return Err("closing quote must be followed by a space");
                }
            }
            _ => {
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() {
                        break;
                    }
                    push_char(&mut current, c);
                    chars.next();
                }
            }
        }
        args.push(current);
    }

    Ok(args)
}

fn push_char(buf: &mut Vec<u8>, c: char) {
    let mut tmp = [0u8; 4];
    buf.extend_from_slice(c.encode_utf8(&mut tmp).as_bytes());
}
