//! Console line reader. Reads one line at a time from stdin (or any buffered
//! reader in tests), racing each read against the shutdown token.

use std::io::Write as _;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct Console<R> {
    lines: Lines<R>,
}

impl Console<BufReader<Stdin>> {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl<R: AsyncBufRead + Unpin> Console<R> {
    pub fn new(reader: R) -> Self {
        Self { lines: reader.lines() }
    }

    /// Print `prompt` and wait for a line. `None` on EOF, read error, or
    /// shutdown.
    pub async fn read_line(&mut self, prompt: &str, shutdown: &CancellationToken) -> Option<String> {
        print!("{prompt}");
        let _ = std::io::stdout().flush();

        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                println!();
                info!("console: shutdown signal received");
                None
            }

            line = self.lines.next_line() => match line {
                Ok(Some(line)) => Some(line),
                Ok(None) => {
                    info!("console: stdin closed");
                    None
                }
                Err(e) => {
                    warn!("console read error: {e}");
                    None
                }
            }
        }
    }
}
