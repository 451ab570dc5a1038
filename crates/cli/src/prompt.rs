//! Interactive save destination read from stdin.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use tabula_client::Destination;

/// Asks on stderr for a file name; an empty answer takes the suggestion and
/// end of input cancels.
pub struct StdinPrompt;

impl Destination for StdinPrompt {
    fn choose(&self, suggested: &str) -> Option<PathBuf> {
        let stdin = io::stdin();
        match ask(&mut stdin.lock(), &mut io::stderr(), suggested) {
            Ok(choice) => choice,
            Err(e) => {
                tracing::warn!("could not read destination: {}", e);
                None
            }
        }
    }
}

pub fn ask(input: &mut impl BufRead, output: &mut impl Write, suggested: &str) -> io::Result<Option<PathBuf>> {
    write!(output, "Save as [{}]: ", suggested)?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        writeln!(output)?;
        return Ok(None);
    }

    let answer = line.trim();
    Ok(Some(PathBuf::from(if answer.is_empty() { suggested } else { answer })))
}
