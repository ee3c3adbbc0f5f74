//! Client for the VARS control socket.

use std::path::Path;

use shared::constants::vars_op;
use shared::framing::{read_frame, write_frame};
use shared::wire::{container_name_to_bytes, RegisterReq, VarAccessHeader, VarDesc};
use shared::IpcError;
use tokio::net::UnixStream;

use crate::error::ClientError;

pub struct VarsClient {
    stream: UnixStream,
}

impl VarsClient {
    pub async fn connect(socket_path: &Path) -> Result<Self, ClientError> {
        Ok(Self { stream: UnixStream::connect(socket_path).await? })
    }

    pub async fn register(&mut self, container_name: &str, vars: Vec<VarDesc>) -> Result<(), ClientError> {
        let req = RegisterReq { container_name: container_name.to_string(), vars };
        let body = req.to_bytes().map_err(|_| ClientError::MalformedReply)?;
        write_frame(&mut self.stream, vars_op::REGISTER, &body).await?;
        self.read_status().await
    }

    pub async fn open_container(&mut self, container_name: &str) -> Result<(), ClientError> {
        let name = container_name_to_bytes(container_name).map_err(|_| ClientError::MalformedReply)?;
        write_frame(&mut self.stream, vars_op::OPEN_CONTAINER, &name).await?;
        self.read_status().await
    }

    pub async fn close_container(&mut self) -> Result<(), ClientError> {
        write_frame(&mut self.stream, vars_op::CLOSE_CONTAINER, &[]).await?;
        self.read_status().await
    }

    pub async fn get(&mut self, var_name: &str, buf_size: u32) -> Result<Vec<u8>, ClientError> {
        let header = VarAccessHeader { var_name: var_name.to_string(), buf_size };
        let body = header.to_bytes().map_err(|_| ClientError::MalformedReply)?;
        write_frame(&mut self.stream, vars_op::GET, &body).await?;
        let (status, body) = read_frame(&mut self.stream).await?;
        check_status(status)?;
        Ok(body)
    }

    pub async fn set(&mut self, var_name: &str, payload: &[u8]) -> Result<(), ClientError> {
        let header = VarAccessHeader { var_name: var_name.to_string(), buf_size: payload.len() as u32 };
        let mut body = header.to_bytes().map_err(|_| ClientError::MalformedReply)?.to_vec();
        body.extend_from_slice(payload);
        write_frame(&mut self.stream, vars_op::SET, &body).await?;
        self.read_status().await
    }

    pub async fn list_containers(&mut self) -> Result<Vec<String>, ClientError> {
        write_frame(&mut self.stream, vars_op::LIST_CONTAINERS, &[]).await?;
        let (status, body) = read_frame(&mut self.stream).await?;
        check_status(status)?;
        let text = String::from_utf8_lossy(&body);
        Ok(text.lines().map(str::to_string).collect())
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
