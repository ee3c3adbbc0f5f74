//! Per-connection dispatch for the KCONT control socket — the reimplementation's analogue of
//! `kcontainer_ioctl`'s `switch (cmd)`.

use std::sync::Arc;

use shared::constants::kcont_op;
use shared::framing::{encode_frame, read_frame, write_frame, FramingError};
use shared::wire::{CreateReq, IdReq, InfoRec};
use shared::IpcError;
use tokio::net::UnixStream;

use crate::kcont::KcontRegistry;

pub async fn serve(mut stream: UnixStream, registry: Arc<KcontRegistry>) {
    loop {
        let (op, body) = match read_frame(&mut stream).await {
            Ok(frame) => frame,
            Err(FramingError::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => return,
            Err(e) => {
                log::warn!("kcont: framing error, closing connection: {e}");
                return;
            }
        };

        let result = dispatch(&mut stream, &registry, op, &body).await;
        if let Err(e) = result {
            log::warn!("kcont: connection write failed: {e}");
            return;
        }
    }
}

async fn dispatch(
    stream: &mut UnixStream,
    registry: &Arc<KcontRegistry>,
    op: u8,
    body: &[u8],
) -> Result<(), FramingError> {
    match op {
        kcont_op::CREATE => {
            let reply = match CreateReq::from_bytes(body) {
                Ok(req) => registry.create(req.id, req.size).err(),
                Err(_) => Some(IpcError::InvalidArgument),
            };
            write_status(stream, reply).await
        }
        kcont_op::GET_FD => {
            let id = match IdReq::from_bytes(body) {
                Ok(req) => req.id,
                Err(_) => return write_status(stream, Some(IpcError::InvalidArgument)).await,
            };
            match registry.get_fd(id) {
                Ok(obj) => {
                    let info = InfoRec { id: obj.id, size: obj.region.size(), user_refs: obj.user_refs(), kernel_refs: obj.kernel_refs() };
                    let frame = encode_frame(shared::error::code::OK, &info.to_bytes());
                    match obj.region.send_fd(stream, &frame).await {
                        Ok(_) => Ok(()),
                        Err(e) => {
                            registry.rollback_get_fd(&obj);
                            Err(FramingError::Io(e))
                        }
                    }
                }
                Err(e) => write_status(stream, Some(e)).await,
            }
        }
        kcont_op::DESTROY => {
            let reply = match IdReq::from_bytes(body) {
                Ok(req) => registry.destroy(req.id).err(),
                Err(_) => Some(IpcError::InvalidArgument),
            };
            write_status(stream, reply).await
        }
        kcont_op::FORCE_DESTROY => {
            let reply = match IdReq::from_bytes(body) {
                Ok(req) => registry.force_destroy(req.id).err(),
                Err(_) => Some(IpcError::InvalidArgument),
            };
            write_status(stream, reply).await
        }
        kcont_op::RELEASE_FD => {
            let reply = match IdReq::from_bytes(body) {
                Ok(req) => registry.release(req.id).err(),
                Err(_) => Some(IpcError::InvalidArgument),
            };
            write_status(stream, reply).await
        }
        kcont_op::INFO => {
            let id = match IdReq::from_bytes(body) {
                Ok(req) => req.id,
                Err(_) => return write_status(stream, Some(IpcError::InvalidArgument)).await,
            };
            match registry.info(id) {
                Ok((size, user_refs, kernel_refs)) => {
                    let rec = InfoRec { id, size, user_refs, kernel_refs };
                    write_frame(stream, shared::error::code::OK, &rec.to_bytes()).await
                }
                Err(e) => write_status(stream, Some(e)).await,
            }
        }
        _ => write_status(stream, Some(IpcError::UnknownOp)).await,
    }
}

async fn write_status(stream: &mut UnixStream, err: Option<IpcError>) -> Result<(), FramingError> {
    let code = err.map(|e| e.code()).unwrap_or(shared::error::code::OK);
    write_frame(stream, code, &[]).await
}
