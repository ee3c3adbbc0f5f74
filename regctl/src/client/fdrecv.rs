//! Receiving a `GET_FD` reply: an ordinary length-prefixed frame riding alongside one
//! `SCM_RIGHTS` descriptor, the client-side mirror of [`regd::region::Region::send_fd`].

use std::os::fd::{AsRawFd, OwnedFd};

use nix::cmsg_space;
use nix::sys::socket::{recvmsg, ControlMessageOwned, MsgFlags};
use tokio::io::Interest;
use tokio::net::UnixStream;

use crate::error::ClientError;

/// Reads one frame plus its accompanying descriptor. `shared::framing::read_frame` can't be
/// reused here because it has no notion of ancillary data, so this duplicates its
/// length-prefix parsing over a raw `recvmsg` loop instead.
pub async fn recv_frame_with_fd(stream: &UnixStream) -> Result<(u8, Vec<u8>, OwnedFd), ClientError> {
    loop {
        stream.readable().await?;
        let res = stream.try_io(Interest::READABLE, || recv_once(stream));
        match res {
            Ok(v) => return v.ok_or(ClientError::MissingDescriptor),
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => continue,
            Err(e) => return Err(ClientError::Io(e)),
        }
    }
}

fn recv_once(stream: &UnixStream) -> std::io::Result<Option<(u8, Vec<u8>, OwnedFd)>> {
    use std::os::fd::FromRawFd;

    let mut buf = [0u8; 4096];
    let mut iov = [std::io::IoSliceMut::new(&mut buf)];
    let mut cmsg_buffer = cmsg_space!([std::os::fd::RawFd; 1]);

    let msg = recvmsg::<()>(stream.as_raw_fd(), &mut iov, Some(&mut cmsg_buffer), MsgFlags::empty())
        .map_err(std::io::Error::from)?;

    let mut fd: Option<OwnedFd> = None;
    for cmsg in msg.cmsgs().map_err(|_| std::io::Error::from(std::io::ErrorKind::InvalidData))? {
        if let ControlMessageOwned::ScmRights(fds) = cmsg {
            if let Some(&raw) = fds.first() {
                fd = Some(unsafe { OwnedFd::from_raw_fd(raw) });
            }
        }
    }

    let n = msg.bytes;
    if n < 5 {
        return Ok(None);
    }
    let len = u32::from_le_bytes(buf[0..4].try_into().unwrap()) as usize;
    if len + 4 > n {
        return Ok(None);
    }
    let tag = buf[4];
    let body = buf[5..4 + len].to_vec();
    Ok(fd.map(|fd| (tag, body, fd)))
}
