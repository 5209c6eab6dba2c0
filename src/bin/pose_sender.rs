//! 合成ランドマークをサーバーへ送る動作確認用コンソール

use std::io::Write;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use clap::Parser;
use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;

use emote_stream::gesture::GestureKind;
use emote_stream::landmark::{sample, LandmarkSnapshot};
use emote_stream::protocol::{self, ClientMessage, ServerMessage};

const FRAME_INTERVAL: Duration = Duration::from_millis(33);

#[derive(Parser, Debug)]
#[command(name = "pose_sender", about = "Stream synthetic landmarks to emote-stream")]
struct Cli {
    #[arg(long, default_value = "127.0.0.1:9300")]
    server: String,
}

#[derive(Debug, PartialEq)]
enum Input {
    Gesture(GestureKind, f32),
    Neutral(f32),
    Reload,
    Debug(bool),
    Quit,
}

fn parse_input(line: &str) -> Result<Option<Input>> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let secs = |i: usize| -> Result<f32> {
        match parts.get(i) {
            Some(s) => Ok(s.parse()?),
            None => Ok(2.0),
        }
    };
    let input = match parts.as_slice() {
        [] => return Ok(None),
        ["g", kind, ..] => Input::Gesture(kind.parse()?, secs(2)?),
        ["n", ..] => Input::Neutral(secs(1)?),
        ["r"] => Input::Reload,
        ["d", "on"] => Input::Debug(true),
        ["d", "off"] => Input::Debug(false),
        ["q"] => Input::Quit,
        _ => bail!("不明なコマンド: {}", line.trim()),
    };
    Ok(Some(input))
}

fn print_help() {
    println!("コマンド:");
    println!("  g <kind> [秒]  - ジェスチャーの姿勢を送り続ける (既定 2 秒)");
    println!("                   kind: {}", GestureKind::ALL.map(|k| k.as_str()).join(", "));
    println!("  n [秒]         - 何もしていない姿勢を送る");
    println!("  r              - 定義の再読み込み");
    println!("  d on|off       - デバッグ表示");
    println!("  q              - 終了");
    println!();
}

async fn stream_snapshot<S>(sink: &mut S, snapshot: &LandmarkSnapshot, secs: f32, started: Instant) -> Result<()>
where
    S: futures::Sink<bytes::Bytes, Error = std::io::Error> + Unpin,
{
    let deadline = Instant::now() + Duration::try_from_secs_f32(secs).unwrap_or_default();
    let mut ticker = tokio::time::interval(FRAME_INTERVAL);
    while Instant::now() < deadline {
        ticker.tick().await;
        let msg = ClientMessage::Snapshot {
            timestamp_us: started.elapsed().as_micros() as u64,
            snapshot: snapshot.clone(),
        };
        protocol::send_to_sink(sink, &msg).await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    println!("=== emote-stream - Pose Sender ===");
    println!("接続先: {}", cli.server);
    let tcp = TcpStream::connect(&cli.server).await?;
    tcp.set_nodelay(true)?;
    let mut stream = protocol::message_stream(tcp);

    match protocol::recv_message::<_, ServerMessage>(&mut stream).await? {
        Some(ServerMessage::Ready) => println!("サーバー準備完了"),
        other => bail!("expected Ready, got {other:?}"),
    }
    println!();
    print_help();

    let (mut sink, mut reader) = stream.split();

    // サーバーからの応答を表示
    let reader_task = tokio::spawn(async move {
        while let Some(frame) = reader.next().await {
            let bytes = match frame {
                Ok(b) => b,
                Err(e) => {
                    eprintln!("[tcp] {}", e);
                    break;
                }
            };
            match bincode::deserialize::<ServerMessage>(&bytes) {
                Ok(ServerMessage::Status(status)) => {
                    if status.elapsed.is_zero() {
                        println!("  {}", status);
                    }
                }
                Ok(ServerMessage::Trigger { gesture_name, video_path }) => {
                    println!("  ▶ {} ({})", gesture_name, video_path);
                }
                Ok(ServerMessage::ReloadAck { ok: true, .. }) => println!("  再読み込みしました"),
                Ok(ServerMessage::ReloadAck { ok: false, error }) => {
                    println!("  再読み込み失敗: {}", error.unwrap_or_default());
                }
                Ok(ServerMessage::Ready) => {}
                Err(e) => eprintln!("[tcp] deserialize error: {}", e),
            }
        }
        println!("サーバーとの接続が切れました");
    });

    let started = Instant::now();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = match parse_input(&line) {
            Ok(Some(input)) => input,
            Ok(None) => continue,
            Err(e) => {
                println!("{:#}", e);
                continue;
            }
        };

        match input {
            Input::Gesture(kind, secs) => {
                println!("{} を {} 秒送信中...", kind, secs);
                stream_snapshot(&mut sink, &sample::for_kind(kind), secs, started).await?;
            }
            Input::Neutral(secs) => {
                println!("待機姿勢を {} 秒送信中...", secs);
                stream_snapshot(&mut sink, &sample::neutral(), secs, started).await?;
            }
            Input::Reload => protocol::send_to_sink(&mut sink, &ClientMessage::Reload).await?,
            Input::Debug(enabled) => {
                protocol::send_to_sink(&mut sink, &ClientMessage::SetDebug { enabled }).await?
            }
            Input::Quit => {
                println!("終了します");
                break;
            }
        }
    }

    reader_task.abort();
    Ok(())
}
