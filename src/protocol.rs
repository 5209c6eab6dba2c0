//! TCP protocol between a landmark estimator and the trigger server.
//!
//! Frames are bincode payloads behind a length prefix.

use bytes::Bytes;
use futures::{Sink, SinkExt, StreamExt};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::gesture::{Status, TriggerEvent};
use crate::landmark::LandmarkSnapshot;

pub const MAX_FRAME_LENGTH: usize = 16 * 1024 * 1024;

// --- Message types ---

/// Estimator → server
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// One frame. `timestamp_us` is the estimator's capture time, informational only.
    Snapshot { timestamp_us: u64, snapshot: LandmarkSnapshot },
    /// Re-read the gesture definition file.
    Reload,
    SetDebug { enabled: bool },
}

/// Server → estimator
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Ready,
    Status(Status),
    Trigger { gesture_name: String, video_path: String },
    ReloadAck { ok: bool, error: Option<String> },
}

impl From<&TriggerEvent> for ServerMessage {
    fn from(ev: &TriggerEvent) -> Self {
        ServerMessage::Trigger {
            gesture_name: ev.gesture_name.clone(),
            video_path: ev.action.video_path.display().to_string(),
        }
    }
}

// --- TCP codec helpers ---

pub type MessageStream<T = TcpStream> = Framed<T, LengthDelimitedCodec>;

/// Create a framed message stream with length-delimited framing.
pub fn message_stream<T: AsyncRead + AsyncWrite>(stream: T) -> MessageStream<T> {
    let codec = LengthDelimitedCodec::builder()
        .max_frame_length(MAX_FRAME_LENGTH)
        .new_codec();
    Framed::new(stream, codec)
}

/// Send a serializable message (bincode + length prefix).
pub async fn send_message<T, M>(stream: &mut MessageStream<T>, msg: &M) -> anyhow::Result<()>
where
    T: AsyncRead + AsyncWrite + Unpin,
    M: Serialize,
{
    let data = bincode::serialize(msg)?;
    stream.send(Bytes::from(data)).await?;
    Ok(())
}

/// Send on the write half of a split stream.
pub async fn send_to_sink<S, M>(sink: &mut S, msg: &M) -> anyhow::Result<()>
where
    S: Sink<Bytes, Error = std::io::Error> + Unpin,
    M: Serialize,
{
    let data = bincode::serialize(msg)?;
    sink.send(Bytes::from(data)).await?;
    Ok(())
}

/// Receive and deserialize a message. `Ok(None)` when the peer closed the connection.
pub async fn recv_message<T, M>(stream: &mut MessageStream<T>) -> anyhow::Result<Option<M>>
where
    T: AsyncRead + AsyncWrite + Unpin,
    M: DeserializeOwned,
{
    match stream.next().await {
        Some(Ok(bytes)) => Ok(Some(bincode::deserialize(&bytes)?)),
        Some(Err(e)) => Err(e.into()),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::{ActionRef, GestureDefinition, GestureKind};
    use crate::landmark::sample;
    use std::time::Duration;

    #[tokio::test]
    async fn test_snapshot_over_duplex() {
        let (a, b) = tokio::io::duplex(64 * 1024);
        let mut client = message_stream(a);
        let mut server = message_stream(b);

        let msg = ClientMessage::Snapshot {
            timestamp_us: 1_500_000,
            snapshot: sample::for_kind(GestureKind::PeaceOut),
        };
        send_message(&mut client, &msg).await.unwrap();
        send_message(&mut client, &ClientMessage::SetDebug { enabled: true }).await.unwrap();

        let got: Option<ClientMessage> = recv_message(&mut server).await.unwrap();
        assert_eq!(got, Some(msg));
        let got: Option<ClientMessage> = recv_message(&mut server).await.unwrap();
        assert_eq!(got, Some(ClientMessage::SetDebug { enabled: true }));
    }

    #[tokio::test]
    async fn test_server_messages() {
        let (a, b) = tokio::io::duplex(4096);
        let mut server = message_stream(a);
        let mut client = message_stream(b);

        let status = Status {
            kind: GestureKind::Violin,
            elapsed: Duration::from_millis(400),
            progress: 0.4,
            ready: false,
        };
        send_message(&mut server, &ServerMessage::Status(status.clone())).await.unwrap();
        send_message(
            &mut server,
            &ServerMessage::ReloadAck { ok: false, error: Some("duplicate gesture name: a".into()) },
        )
        .await
        .unwrap();

        let got: Option<ServerMessage> = recv_message(&mut client).await.unwrap();
        assert_eq!(got, Some(ServerMessage::Status(status)));
        match recv_message::<_, ServerMessage>(&mut client).await.unwrap() {
            Some(ServerMessage::ReloadAck { ok, error }) => {
                assert!(!ok);
                assert!(error.unwrap().contains("duplicate"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_split_sink() {
        let (a, b) = tokio::io::duplex(4096);
        let (mut sink, _reader) = message_stream(a).split();
        let mut client = message_stream(b);
        send_to_sink(&mut sink, &ServerMessage::Ready).await.unwrap();
        let got: Option<ServerMessage> = recv_message(&mut client).await.unwrap();
        assert_eq!(got, Some(ServerMessage::Ready));
    }

    #[tokio::test]
    async fn test_closed_connection() {
        let (a, b) = tokio::io::duplex(1024);
        let mut server = message_stream(b);
        drop(a);
        let got: Option<ClientMessage> = recv_message(&mut server).await.unwrap();
        assert!(got.is_none());
    }

    #[test]
    fn test_trigger_message_from_event() {
        let def = GestureDefinition::new(
            "celebrate",
            GestureKind::HandsUp,
            ActionRef::video("emotes/hands_up.mp4"),
        );
        let msg = ServerMessage::from(&TriggerEvent::from_definition(&def));
        assert_eq!(
            msg,
            ServerMessage::Trigger {
                gesture_name: "celebrate".into(),
                video_path: "emotes/hands_up.mp4".into(),
            }
        );
    }
}
