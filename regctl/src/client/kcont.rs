//! Client for the KCONT control socket.

use std::io::{Read, Write};
use std::os::fd::OwnedFd;
use std::os::unix::net::UnixStream as StdUnixStream;
use std::path::{Path, PathBuf};

use memmap2::{MmapMut, MmapOptions};
use shared::constants::kcont_op;
use shared::framing::{read_frame, write_frame};
use shared::wire::{CreateReq, IdReq, InfoRec};
use shared::IpcError;
use tokio::net::UnixStream;

use crate::client::fdrecv::recv_frame_with_fd;
use crate::error::ClientError;

pub struct KcontClient {
    stream: UnixStream,
    socket_path: PathBuf,
}

impl KcontClient {
    pub async fn connect(socket_path: &Path) -> Result<Self, ClientError> {
        let stream = UnixStream::connect(socket_path).await?;
        Ok(Self { stream, socket_path: socket_path.to_path_buf() })
    }

    pub async fn create(&mut self, id: u64, size: u64) -> Result<(), ClientError> {
        let req = CreateReq { id, size, flags: 0 };
        write_frame(&mut self.stream, kcont_op::CREATE, &req.to_bytes()).await?;
        self.read_status().await
    }

    pub async fn destroy(&mut self, id: u64) -> Result<(), ClientError> {
        write_frame(&mut self.stream, kcont_op::DESTROY, &IdReq { id }.to_bytes()).await?;
        self.read_status().await
    }

    pub async fn force_destroy(&mut self, id: u64) -> Result<(), ClientError> {
        write_frame(&mut self.stream, kcont_op::FORCE_DESTROY, &IdReq { id }.to_bytes()).await?;
        self.read_status().await
    }

    pub async fn info(&mut self, id: u64) -> Result<InfoRec, ClientError> {
        write_frame(&mut self.stream, kcont_op::INFO, &IdReq { id }.to_bytes()).await?;
        let (status, body) = read_frame(&mut self.stream).await?;
        check_status(status)?;
        InfoRec::from_bytes(&body).map_err(|_| ClientError::MalformedReply)
    }

    /// `GET_FD`. The returned [`KcontHandle`] releases its reference (via `RELEASE_FD`) when
    /// dropped, so ordinary RAII use gives the daemon accurate `user_refs` bookkeeping.
    pub async fn get_fd(&mut self, id: u64) -> Result<KcontHandle, ClientError> {
        write_frame(&mut self.stream, kcont_op::GET_FD, &IdReq { id }.to_bytes()).await?;
        let (status, body, fd) = recv_frame_with_fd(&self.stream).await?;
        check_status(status)?;
        let info = InfoRec::from_bytes(&body).map_err(|_| ClientError::MalformedReply)?;
        Ok(KcontHandle { fd, id: info.id, size: info.size, socket_path: self.socket_path.clone() })
    }

    async fn read_status(&mut self) -> Result<(), ClientError> {
        let (status, _body) = read_frame(&mut self.stream).await?;
        check_status(status)
    }
}

fn check_status(status: u8) -> Result<(), ClientError> {
    match IpcError::from_code(status) {
        None => Ok(()),
        Some(e) => Err(ClientError::Daemon(e)),
    }
}

/// An open KCONT descriptor. Mapping it hands out ordinary shared memory; dropping it tells
/// the daemon the descriptor is gone, synchronously and independent of any async runtime,
/// mirroring the original `Device`'s `CloseHandle`-in-`Drop`.
pub struct KcontHandle {
    fd: OwnedFd,
    pub id: u64,
    pub size: u64,
    socket_path: PathBuf,
}

impl KcontHandle {
    pub fn map(&self) -> std::io::Result<MmapMut> {
        unsafe { MmapOptions::new().len(self.size as usize).map_mut(&self.fd) }
    }
}

impl Drop for KcontHandle {
    fn drop(&mut self) {
        if let Ok(mut stream) = StdUnixStream::connect(&self.socket_path) {
            let _ = release_fd_sync(&mut stream, self.id);
        }
    }
}

fn release_fd_sync(stream: &mut StdUnixStream, id: u64) -> std::io::Result<()> {
    let body = IdReq { id }.to_bytes();
    let frame = shared::framing::encode_frame(kcont_op::RELEASE_FD, &body);
    stream.write_all(&frame)?;
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf)?;
    let len = u32::from_le_bytes(len_buf) as usize;
    let mut body = vec![0u8; len];
    stream.read_exact(&mut body)?;
    Ok(())
}
