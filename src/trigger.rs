use anyhow::Result;
use rosc::{encoder, OscMessage, OscPacket, OscType};
use std::net::UdpSocket;
use tracing::info;

use crate::config::{SinkKind, TriggerConfig};
use crate::gesture::TriggerEvent;

/// クリッププレイヤーが受け取る OSC アドレス
pub const TRIGGER_OSC_ADDR: &str = "/emote/trigger";

/// トリガーの受け手。再生そのものは外部プロセスが担当する
pub trait TriggerSink: Send {
    fn name(&self) -> &str;
    fn on_trigger(&mut self, event: &TriggerEvent) -> Result<()>;
}

/// トリガーを OSC メッセージに変換
/// 引数: name, video_path, audio_path (無ければ空文字)
pub fn build_osc_message(event: &TriggerEvent) -> OscMessage {
    let audio = event
        .action
        .audio_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    OscMessage {
        addr: TRIGGER_OSC_ADDR.to_string(),
        args: vec![
            OscType::String(event.gesture_name.clone()),
            OscType::String(event.action.video_path.display().to_string()),
            OscType::String(audio),
        ],
    }
}

/// OSCメッセージをバイト列にエンコード
pub fn encode_osc_message(msg: &OscMessage) -> Result<Vec<u8>> {
    let packet = OscPacket::Message(msg.clone());
    let encoded = encoder::encode(&packet)?;
    Ok(encoded)
}

/// UDP で送りっぱなしにする OSC 送信側
pub struct OscTriggerSink {
    socket: UdpSocket,
    target_addr: String,
}

impl OscTriggerSink {
    pub fn new(target_addr: &str) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        Ok(Self {
            socket,
            target_addr: target_addr.to_string(),
        })
    }

    pub fn target_addr(&self) -> &str {
        &self.target_addr
    }
}

impl TriggerSink for OscTriggerSink {
    fn name(&self) -> &str {
        "osc"
    }

    fn on_trigger(&mut self, event: &TriggerEvent) -> Result<()> {
        let msg = build_osc_message(event);
        let data = encode_osc_message(&msg)?;
        self.socket.send_to(&data, &self.target_addr)?;
        Ok(())
    }
}

/// ログに出すだけ (プレイヤー無しでの動作確認用)
#[derive(Default)]
pub struct LogTriggerSink {
    count: u64,
}

impl LogTriggerSink {
    pub fn count(&self) -> u64 {
        self.count
    }
}

impl TriggerSink for LogTriggerSink {
    fn name(&self) -> &str {
        "log"
    }

    fn on_trigger(&mut self, event: &TriggerEvent) -> Result<()> {
        self.count += 1;
        info!(
            "▶ {} ({}) -> {}",
            event.gesture_name,
            event.kind,
            event.action.video_path.display()
        );
        if let Some(desc) = &event.action.description {
            info!("  {}", desc);
        }
        Ok(())
    }
}

pub fn create_sink(config: &TriggerConfig) -> Result<Box<dyn TriggerSink>> {
    match config.sink {
        SinkKind::Osc => {
            let sink = OscTriggerSink::new(&config.osc_addr)?;
            info!("OSC trigger sink -> {}", sink.target_addr());
            Ok(Box::new(sink))
        }
        SinkKind::Log => Ok(Box::new(LogTriggerSink::default())),
    }
}
