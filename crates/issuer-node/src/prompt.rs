//! Interactive exit confirmation.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

pub const EXIT_PROMPT: &str = "Are you sure you want to exit? (y/n) ";

/// Ask whether to exit and read one answer line.
///
/// Only `y` (any case) confirms. A closed input also confirms, since nobody
/// is left to answer.
pub async fn confirm_exit<R, W>(reader: &mut R, writer: &mut W) -> std::io::Result<bool>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    writer.write_all(EXIT_PROMPT.as_bytes()).await?;
    writer.flush().await?;

    let mut answer = String::new();
    if reader.read_line(&mut answer).await? == 0 {
        return Ok(true);
    }
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}
