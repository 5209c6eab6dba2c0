//! Trigger server: receives landmark snapshots over TCP, runs gesture detection,
//! and hands triggers to the clip player.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::Interval;
use tracing::{info, warn};

use emote_stream::config::{load_definitions, Config, SinkKind};
use emote_stream::gesture::GestureDetector;
use emote_stream::protocol::{self, ClientMessage, ServerMessage};
use emote_stream::stats::SessionStats;
use emote_stream::trigger::{create_sink, TriggerSink};

#[derive(Parser, Debug)]
#[command(name = "emote-stream", about = "Gesture-triggered emote clips")]
struct Cli {
    /// Application config
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Override [app] listen_addr
    #[arg(long)]
    listen: Option<String>,

    /// Override [app] emotes_path
    #[arg(long)]
    emotes: Option<PathBuf>,

    /// Log triggers instead of sending OSC
    #[arg(long)]
    log_only: bool,

    /// Start with debug annotations on
    #[arg(long)]
    debug: bool,
}

#[derive(Debug, Clone, Copy)]
enum Command {
    Reload,
    ToggleDebug,
    Stats,
    Quit,
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Disconnected,
    Quit,
}

/// 検出器を所有するセッション。接続をまたいで状態を持ち越す
struct Session {
    detector: GestureDetector,
    sink: Box<dyn TriggerSink>,
    stats: SessionStats,
    config_path: PathBuf,
    emotes_path: PathBuf,
    started: Instant,
}

impl Session {
    /// 壊れたフレームは 1 フレーム分だけ捨てて接続は維持する
    fn handle_frame(&mut self, bytes: &[u8]) -> Vec<ServerMessage> {
        match bincode::deserialize::<ClientMessage>(bytes) {
            Ok(msg) => self.handle_message(msg),
            Err(e) => {
                warn!("dropping malformed frame ({} bytes): {}", bytes.len(), e);
                Vec::new()
            }
        }
    }

    fn handle_message(&mut self, msg: ClientMessage) -> Vec<ServerMessage> {
        match msg {
            ClientMessage::Snapshot { snapshot, .. } => {
                let now = self.started.elapsed();
                let out = self.detector.process(&snapshot, now);
                self.stats.record(&out, now);

                let mut replies = Vec::new();
                if let Some(ev) = &out.trigger {
                    if let Err(e) = self.sink.on_trigger(ev) {
                        warn!("{} sink failed for {}: {:#}", self.sink.name(), ev.gesture_name, e);
                    }
                    replies.push(ServerMessage::from(ev));
                }
                if let Some(status) = out.status {
                    replies.push(ServerMessage::Status(status));
                }
                replies
            }
            ClientMessage::Reload => {
                let ack = match self.reload() {
                    Ok(()) => ServerMessage::ReloadAck { ok: true, error: None },
                    Err(e) => ServerMessage::ReloadAck {
                        ok: false,
                        error: Some(format!("{:#}", e)),
                    },
                };
                vec![ack]
            }
            ClientMessage::SetDebug { enabled } => {
                self.detector.set_debug(enabled);
                Vec::new()
            }
        }
    }

    fn handle_command(&mut self, cmd: Command) -> Flow {
        match cmd {
            Command::Reload => {
                if let Err(e) = self.reload() {
                    warn!("reload failed, keeping previous configuration: {:#}", e);
                }
            }
            Command::ToggleDebug => {
                let enabled = !self.detector.is_debug();
                self.detector.set_debug(enabled);
            }
            Command::Stats => self.log_stats(),
            Command::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    /// `config.toml` と定義ファイルを読み直す。両方とも検証を通ってから差し替える
    fn reload(&mut self) -> Result<()> {
        let config = Config::load_or_default(&self.config_path)?;
        let defs = load_definitions(&self.emotes_path)?;
        self.detector.reconfigure(config.thresholds, &config.detection)?;
        self.detector.reload(defs)?;
        Ok(())
    }

    fn log_stats(&self) {
        info!("{}", self.stats);
    }
}

/// 標準入力のコマンドを検出タスクへ渡す
fn spawn_console(tx: mpsc::Sender<Command>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut line = String::new();
        loop {
            line.clear();
            match stdin.read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            let cmd = match line.trim() {
                "r" => Command::Reload,
                "d" => Command::ToggleDebug,
                "s" => Command::Stats,
                "q" => Command::Quit,
                "" => continue,
                other => {
                    eprintln!("[input] unknown command: {} (r/d/s/q)", other);
                    continue;
                }
            };
            if tx.blocking_send(cmd).is_err() {
                break;
            }
        }
    });
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(t) => {
            t.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

async fn serve(
    tcp: TcpStream,
    session: &mut Session,
    commands: &mut mpsc::Receiver<Command>,
    ticker: &mut Option<Interval>,
) -> Result<Flow> {
    let (mut sink, mut reader) = protocol::message_stream(tcp).split();
    protocol::send_to_sink(&mut sink, &ServerMessage::Ready).await?;

    loop {
        tokio::select! {
            frame = reader.next() => {
                let bytes = match frame {
                    Some(Ok(b)) => b,
                    Some(Err(e)) => return Err(e.into()),
                    None => return Ok(Flow::Disconnected),
                };
                for reply in session.handle_frame(&bytes) {
                    protocol::send_to_sink(&mut sink, &reply).await?;
                }
            }
            Some(cmd) = commands.recv() => {
                if session.handle_command(cmd) == Flow::Quit {
                    return Ok(Flow::Quit);
                }
            }
            _ = tick(ticker) => session.log_stats(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "emote_stream=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::load_or_default(&cli.config)?;
    if let Some(addr) = cli.listen {
        config.app.listen_addr = addr;
    }
    if let Some(path) = cli.emotes {
        config.app.emotes_path = path;
    }
    if cli.log_only {
        config.trigger.sink = SinkKind::Log;
    }

    info!("emote-stream ({})", env!("GIT_VERSION"));
    info!(
        "hold={}s cooldown={}s window={} min_occurrences={}",
        config.detection.hold_time,
        config.detection.cooldown_time,
        config.detection.window_size,
        config.detection.min_occurrences
    );

    let defs = load_definitions(&config.app.emotes_path)?;
    for (i, def) in defs.iter().enumerate() {
        info!("  {}. {} ({}) -> {}", i + 1, def.name, def.kind, def.action.video_path.display());
    }
    let mut detector = GestureDetector::new(defs, config.thresholds.clone(), &config.detection)?;
    if cli.debug || config.app.debug {
        detector.set_debug(true);
    }

    let mut session = Session {
        detector,
        sink: create_sink(&config.trigger)?,
        stats: SessionStats::new(),
        config_path: cli.config,
        emotes_path: config.app.emotes_path.clone(),
        started: Instant::now(),
    };

    let (cmd_tx, mut commands) = mpsc::channel::<Command>(8);
    spawn_console(cmd_tx);

    let mut ticker = (config.app.stats_interval_secs > 0).then(|| {
        let period = Duration::from_secs(config.app.stats_interval_secs);
        tokio::time::interval_at(tokio::time::Instant::now() + period, period)
    });

    let listener = TcpListener::bind(config.app.listen_addr.as_str())
        .await
        .with_context(|| format!("failed to bind {}", config.app.listen_addr))?;
    info!("listening on {} (console: r=reload d=debug s=stats q=quit)", config.app.listen_addr);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (tcp, addr) = accepted?;
                tcp.set_nodelay(true)?;
                info!("estimator connected: {}", addr);
                match serve(tcp, &mut session, &mut commands, &mut ticker).await {
                    Ok(Flow::Quit) => break,
                    Ok(_) => info!("estimator disconnected, waiting for next connection"),
                    Err(e) => warn!("connection error: {:#}", e),
                }
            }
            Some(cmd) = commands.recv() => {
                if session.handle_command(cmd) == Flow::Quit {
                    break;
                }
            }
            _ = tick(&mut ticker) => session.log_stats(),
        }
    }

    session.log_stats();
    info!("bye");
    Ok(())
}
