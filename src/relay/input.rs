//! Line-oriented console input.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};
use tokio::sync::{mpsc, Mutex};

/// Failure of the interactive input source.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("end of input")]
    Eof,
    #[error("interrupted")]
    Interrupted,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A source of complete input lines, without their line terminators.
#[async_trait]
pub trait LineSource: Send {
    /// Wait for the next line.
    async fn read_line(&mut self) -> Result<String, InputError>;
}

/// Scripted input: each received string is one line; a closed channel is EOF.
#[async_trait]
impl LineSource for mpsc::Receiver<String> {
    async fn read_line(&mut self) -> Result<String, InputError> {
        self.recv().await.ok_or(InputError::Eof)
    }
}

/// Console input shared by every session of the process.
///
/// Clones read from the same underlying reader, so each line is delivered
/// whole to exactly one reader. Bytes that are not UTF-8 are replaced, never
/// fatal.
pub struct ConsoleInput<R = BufReader<Stdin>> {
    reader: Arc<Mutex<R>>,
    watch_ctrl_c: bool,
}

impl<R> Clone for ConsoleInput<R> {
    fn clone(&self) -> Self {
        Self {
            reader: Arc::clone(&self.reader),
            watch_ctrl_c: self.watch_ctrl_c,
        }
    }
}

impl ConsoleInput {
    /// Read from the process's stdin; Ctrl-C is reported as [`InputError::Interrupted`].
    pub fn stdin() -> Self {
        Self {
            reader: Arc::new(Mutex::new(BufReader::new(tokio::io::stdin()))),
            watch_ctrl_c: true,
        }
    }
}

impl<R: AsyncBufRead + Unpin> ConsoleInput<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader: Arc::new(Mutex::new(reader)),
            watch_ctrl_c: false,
        }
    }
}

#[async_trait]
impl<R> LineSource for ConsoleInput<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn read_line(&mut self) -> Result<String, InputError> {
        let next = async {
            let mut reader = self.reader.lock().await;
            let mut buf = Vec::new();
            let n = reader.read_until(b'\n', &mut buf).await?;
            Ok::<_, std::io::Error>((n, buf))
        };

        tokio::select! {
            read = next => {
                let (n, buf) = read?;
                if n == 0 {
                    return Err(InputError::Eof);
                }
                Ok(decode_line(&buf))
            },
            signal = tokio::signal::ctrl_c(), if self.watch_ctrl_c => {
                signal?;
                Err(InputError::Interrupted)
            }
        }
    }
}

/// Strip the line terminator and decode lossily.
fn decode_line(buf: &[u8]) -> String {
    let line = buf.strip_suffix(b"\n").unwrap_or(buf);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}
