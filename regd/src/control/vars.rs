//! Per-connection dispatch for the VARS control socket (original `varser_ioctl`'s
//! `switch (cmd)`). Unlike KCONT, this socket is stateful per connection: `OPEN_CONTAINER`
//! binds a [`VarsSession`] that `GET`/`SET` then read through.

use std::sync::Arc;

use shared::constants::{vars_op, LIST_CONTAINERS_BUF};
use shared::framing::{read_frame, write_frame, FramingError};
use shared::wire::{container_name_from_bytes, RegisterReq, VarAccessHeader};
use shared::IpcError;
use tokio::net::UnixStream;

use crate::session::VarsSession;
use crate::vars::VarsRegistry;

pub async fn serve(mut stream: UnixStream, registry: Arc<VarsRegistry>) {
    let session = VarsSession::new(registry.clone());
    loop {
        let (op, body) = match read_frame(&mut stream).await {
            Ok(frame) => frame,
            Err(FramingError::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => return,
            Err(e) => {
                log::warn!("vars: framing error, closing connection: {e}");
                return;
            }
        };

        if let Err(e) = dispatch(&mut stream, &registry, &session, op, &body).await {
            log::warn!("vars: connection write failed: {e}");
            return;
        }
    }
}

async fn dispatch(
    stream: &mut UnixStream,
    registry: &Arc<VarsRegistry>,
    session: &VarsSession,
    op: u8,
    body: &[u8],
) -> Result<(), FramingError> {
    match op {
        vars_op::REGISTER => {
            let reply = match RegisterReq::from_bytes(body) {
                Ok(req) => registry.register(&req.container_name, &req.vars).err(),
                Err(_) => Some(IpcError::InvalidArgument),
            };
            write_status(stream, reply).await
        }
        vars_op::OPEN_CONTAINER => {
            let reply = match container_name_from_bytes(body) {
                Ok(name) => session.open(&name).err(),
                Err(_) => Some(IpcError::InvalidArgument),
            };
            write_status(stream, reply).await
        }
        vars_op::CLOSE_CONTAINER => {
            let reply = session.close().err();
            write_status(stream, reply).await
        }
        vars_op::GET => {
            let header = match VarAccessHeader::from_bytes(body) {
                Ok(h) => h,
                Err(_) => return write_status(stream, Some(IpcError::InvalidArgument)).await,
            };
            match session.bound_container_for_access().and_then(|c| c.var(&header.var_name).ok_or(IpcError::NotFound)) {
                Ok(var) => match var.get(header.buf_size) {
                    Ok(data) => write_frame(stream, shared::error::code::OK, &data).await,
                    Err(e) => write_status(stream, Some(e)).await,
                },
                Err(e) => write_status(stream, Some(e)).await,
            }
        }
        vars_op::SET => {
            if body.len() < VarAccessHeader::WIRE_SIZE {
                return write_status(stream, Some(IpcError::InvalidArgument)).await;
            }
            let header = match VarAccessHeader::from_bytes(&body[..VarAccessHeader::WIRE_SIZE]) {
                Ok(h) => h,
                Err(_) => return write_status(stream, Some(IpcError::InvalidArgument)).await,
            };
            let payload = &body[VarAccessHeader::WIRE_SIZE..];
            let reply = match session.bound_container_for_access().and_then(|c| c.var(&header.var_name).ok_or(IpcError::NotFound)) {
                Ok(var) => var.set(payload, header.buf_size).err(),
                Err(e) => Some(e),
            };
            write_status(stream, reply).await
        }
        vars_op::LIST_CONTAINERS => {
            let listing = encode_list(&registry.list());
            write_frame(stream, shared::error::code::OK, &listing).await
        }
        _ => write_status(stream, Some(IpcError::UnknownOp)).await,
    }
}

/// Builds the newline-joined listing, silently stopping before a name would overflow the
/// fixed buffer — matching the original's `snprintf`-into-`buf[4096]` loop, which dropped
/// the remaining names rather than erroring.
fn encode_list(names: &[String]) -> Vec<u8> {
    let mut buf = Vec::new();
    for name in names {
        let needed = name.len() + 1;
        if buf.len() + needed > LIST_CONTAINERS_BUF {
            break;
        }
        buf.extend_from_slice(name.as_bytes());
        buf.push(b'\n');
    }
    buf
}

async fn write_status(stream: &mut UnixStream, err: Option<IpcError>) -> Result<(), FramingError> {
    let code = err.map(|e| e.code()).unwrap_or(shared::error::code::OK);
    write_frame(stream, code, &[]).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_list_stops_before_overflowing_the_buffer() {
        let names: Vec<String> = (0..10_000).map(|i| format!("container-{i}")).collect();
        let buf = encode_list(&names);
        assert!(buf.len() <= LIST_CONTAINERS_BUF);
        assert!(!names.iter().all(|n| {
            let line = format!("{n}\n");
            buf.windows(line.len()).any(|w| w == line.as_bytes())
        }));
    }
}
