//! Shared-region factory (component E): page-backed anonymous memory objects handed out to
//! clients as real file descriptors over `SCM_RIGHTS`, the userspace analogue of the original
//! driver's `ZwOpenSection`/`fd_install` broker pattern.

use std::io;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};

use nix::sys::memfd::{memfd_create, MemFdCreateFlag};
use nix::sys::socket::{sendmsg, ControlMessage, MsgFlags};
use nix::unistd::ftruncate;
use tokio::io::Interest;
use tokio::net::UnixStream;

/// Rounds `requested` up to the next multiple of the host page size, matching "size ... bytes
/// (rounded up internally to the page)".
pub fn round_up_to_page(requested: u64) -> u64 {
    let page = page_size::get() as u64;
    if requested == 0 {
        return page;
    }
    requested.div_ceil(page) * page
}

/// A page-backed anonymous memory object. Creating one does not hand out any descriptor to a
/// client; [`send_fd`] does that per `GET_FD` call, each call producing an independent
/// descriptor that keeps the backing pages alive for as long as the client holds (or maps) it,
/// regardless of what later happens to the registry entry.
pub struct Region {
    fd: OwnedFd,
    size: u64,
}

impl Region {
    /// Creates a new `memfd`-backed region sized to `round_up_to_page(requested)`.
    pub fn create(name: &str, requested: u64) -> io::Result<Self> {
        let size = round_up_to_page(requested);
        let cname = std::ffi::CString::new(name)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let fd = memfd_create(cname.as_c_str(), MemFdCreateFlag::MFD_CLOEXEC)
            .map_err(io::Error::from)?;
        ftruncate(&fd, size as i64).map_err(io::Error::from)?;
        Ok(Self { fd, size })
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    fn raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }

    /// Sends this region's descriptor to `stream`'s peer as `SCM_RIGHTS` ancillary data,
    /// along with `payload` as the ordinary response bytes (the control reply header). The
    /// receiving process gets its own independent descriptor into the same memfd — a real
    /// descriptor install into the caller's table, not a shared one.
    pub async fn send_fd(&self, stream: &UnixStream, payload: &[u8]) -> io::Result<usize> {
        let raw = self.raw_fd();
        loop {
            stream.writable().await?;
            let res = stream.try_io(Interest::WRITABLE, || {
                use std::io::IoSlice;
                let iov = [IoSlice::new(payload)];
                let cmsgs = [ControlMessage::ScmRights(std::slice::from_ref(&raw))];
                sendmsg::<()>(stream.as_raw_fd(), &iov, &cmsgs, MsgFlags::empty(), None)
                    .map_err(io::Error::from)
            });
            match res {
                Ok(n) => return Ok(n),
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                Err(e) => return Err(e),
            }
        }
    }
}
