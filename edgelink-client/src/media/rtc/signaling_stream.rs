use crate::transport::DeviceStream;
use edgelink_core::codec::{self, FrameDecoder};
use edgelink_core::{CodecError, SignalMessage};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::Mutex;
use tracing::trace;

/// Splits a device stream into a cloneable sending half and a receiving half
/// speaking length-prefixed signal messages.
pub fn signaling_channel(stream: DeviceStream) -> (SignalingSender, SignalingReceiver) {
    let (reader, writer) = tokio::io::split(stream);
    (
        SignalingSender {
            writer: Arc::new(Mutex::new(writer)),
        },
        SignalingReceiver {
            reader,
            decoder: FrameDecoder::new(),
        },
    )
}

#[derive(Clone)]
pub struct SignalingSender {
    writer: Arc<Mutex<WriteHalf<DeviceStream>>>,
}

impl SignalingSender {
    pub async fn send(&self, msg: &SignalMessage) -> Result<(), CodecError> {
        let frame = codec::encode(msg)?;
        trace!(kind = ?msg.kind, len = frame.len(), "Sending signal message");

        let mut writer = self.writer.lock().await;
        writer.write_all(&frame).await?;
        writer.flush().await?;
        Ok(())
    }

    pub async fn shutdown(&self) {
        let _ = self.writer.lock().await.shutdown().await;
    }
}

pub struct SignalingReceiver {
    reader: ReadHalf<DeviceStream>,
    decoder: FrameDecoder,
}

impl SignalingReceiver {
    /// Next whole message. [`CodecError::Closed`] once the device ends the stream.
    pub async fn recv(&mut self) -> Result<SignalMessage, CodecError> {
        loop {
            if let Some(msg) = self.decoder.decode()? {
                trace!(kind = ?msg.kind, "Received signal message");
                return Ok(msg);
            }
            let read = self.reader.read_buf(self.decoder.buffer_mut()).await?;
            if read == 0 {
                return Err(CodecError::Closed);
            }
        }
    }
}
