//! Length-prefixed framing used on both control sockets: a request frame is
//! `[len: u32 LE][op: u8][body]`, a response frame is `[len: u32 LE][status: u8][body]`, where
//! `len` counts the op/status byte plus the body. Neither original ioctl table needed this —
//! a single `ioctl()` call already carries exactly one fixed-size struct — but a stream socket
//! has no call boundary of its own, so the reimplementation adds one.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Frames larger than this are rejected before the length-prefixed body is read, so a bad
/// peer cannot make the daemon allocate an unbounded buffer.
pub const MAX_FRAME_LEN: u32 = 1 << 20;

#[derive(Debug)]
pub enum FramingError {
    Io(std::io::Error),
    TooLarge(u32),
    Empty,
}

impl std::fmt::Display for FramingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FramingError::Io(e) => write!(f, "io error: {e}"),
            FramingError::TooLarge(n) => write!(f, "frame of {n} bytes exceeds the {MAX_FRAME_LEN}-byte limit"),
            FramingError::Empty => write!(f, "frame carried no tag byte"),
        }
    }
}

impl std::error::Error for FramingError {}

impl From<std::io::Error> for FramingError {
    fn from(e: std::io::Error) -> Self {
        FramingError::Io(e)
    }
}

/// Builds a `[len][tag][body]` frame in memory, for the one reply that can't go through
/// [`write_frame`] directly: a `GET_FD` response rides alongside `SCM_RIGHTS` ancillary data
/// on a raw `sendmsg`, which needs the complete frame bytes up front rather than a
/// `AsyncWrite` to stream into.
pub fn encode_frame(tag: u8, body: &[u8]) -> Vec<u8> {
    let len = 1u32 + body.len() as u32;
    let mut out = Vec::with_capacity(4 + body.len() + 1);
    out.extend_from_slice(&len.to_le_bytes());
    out.push(tag);
    out.extend_from_slice(body);
    out
}

/// Writes `[len][tag][body]`. `tag` is the control op on a request, the status code on a
/// response; the two sides of the wire never need to tell which from the frame alone because
/// direction already disambiguates it.
pub async fn write_frame<W: AsyncWrite + Unpin>(w: &mut W, tag: u8, body: &[u8]) -> Result<(), FramingError> {
    let len = 1u32 + body.len() as u32;
    w.write_all(&len.to_le_bytes()).await?;
    w.write_all(&[tag]).await?;
    w.write_all(body).await?;
    w.flush().await?;
    Ok(())
}

/// Reads one `[len][tag][body]` frame, returning `(tag, body)`. Returns `Err` on EOF before a
/// full length prefix arrives, exactly as an unexpected-disconnect signal.
pub async fn read_frame<R: AsyncRead + Unpin>(r: &mut R) -> Result<(u8, Vec<u8>), FramingError> {
    let mut len_buf = [0u8; 4];
    r.read_exact(&mut len_buf).await?;
    let len = u32::from_le_bytes(len_buf);
    if len == 0 {
        return Err(FramingError::Empty);
    }
    if len > MAX_FRAME_LEN {
        return Err(FramingError::TooLarge(len));
    }
    let mut buf = vec![0u8; len as usize];
    r.read_exact(&mut buf).await?;
    let tag = buf[0];
    Ok((tag, buf[1..].to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frame_round_trips_through_a_duplex_pipe() {
        let (mut a, mut b) = tokio::io::duplex(256);
        write_frame(&mut a, 7, b"hello").await.unwrap();
        let (tag, body) = read_frame(&mut b).await.unwrap();
        assert_eq!(tag, 7);
        assert_eq!(body, b"hello");
    }

    #[tokio::test]
    async fn encode_frame_matches_write_frame() {
        let (mut a, mut b) = tokio::io::duplex(256);
        write_frame(&mut a, 9, b"payload").await.unwrap();
        drop(a);
        let mut expected = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut b, &mut expected).await.unwrap();
        assert_eq!(encode_frame(9, b"payload"), expected);
    }

    #[tokio::test]
    async fn empty_body_frame_round_trips() {
        let (mut a, mut b) = tokio::io::duplex(64);
        write_frame(&mut a, 3, &[]).await.unwrap();
        let (tag, body) = read_frame(&mut b).await.unwrap();
        assert_eq!(tag, 3);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn oversized_frame_is_rejected_before_reading_the_body() {
        let (mut a, mut b) = tokio::io::duplex(64);
        let len = MAX_FRAME_LEN + 1;
        a.write_all(&len.to_le_bytes()).await.unwrap();
        match read_frame(&mut b).await {
            Err(FramingError::TooLarge(n)) => assert_eq!(n, len),
            other => panic!("expected TooLarge, got {other:?}"),
        }
    }
}
