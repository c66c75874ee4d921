use rps_core::{Individual, Kind};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use thiserror::Error;

// --- Error Type ---

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("binary serialization error: {0}")]
    Binary(#[from] bincode::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[cfg(feature = "websocket")]
    #[error("WebSocket error: {0}")]
    WebSocket(String),
}

// --- Frame Model ---

/// Rectangle the viewer wipes before drawing a frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// One draw op: where to blit which sprite.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityView {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub kind: Kind,
    pub sprite: String,
}

/// Everything a viewer needs to paint one render pass: a clear op followed
/// by draw ops in population order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub frame: u64,
    pub clear: Region,
    pub entities: Vec<EntityView>,
}

// --- Sprites ---

/// Kind-to-asset lookup, consulted at frame build time. A converted
/// individual picks up its new sprite on the next frame with no bookkeeping
/// here; whether the viewer has finished loading the image is its problem.
#[derive(Clone, Debug)]
pub struct SpriteCatalog {
    rock: String,
    paper: String,
    scissor: String,
}

impl SpriteCatalog {
    pub fn new(rock: String, paper: String, scissor: String) -> Self {
        SpriteCatalog {
            rock,
            paper,
            scissor,
        }
    }

    pub fn sprite(&self, kind: Kind) -> &str {
        match kind {
            Kind::Rock => &self.rock,
            Kind::Paper => &self.paper,
            Kind::Scissor => &self.scissor,
        }
    }
}

impl Default for SpriteCatalog {
    fn default() -> Self {
        SpriteCatalog::new(
            "rock.png".to_string(),
            "paper.png".to_string(),
            "scissor.png".to_string(),
        )
    }
}

// --- Traits ---

/// Turns a frame into its wire representation.
pub trait Serializer: Send + Sync {
    fn serialize(&self, frame: &Frame) -> Result<String, TransportError>;
}

/// Delivers serialized frames to a viewer.
pub trait Sender {
    fn send(&mut self, data: &[u8]) -> Result<(), TransportError>;
}

// --- Serializers ---

pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn serialize(&self, frame: &Frame) -> Result<String, TransportError> {
        Ok(serde_json::to_string(frame)?)
    }
}

/// Bincode payload, base64-wrapped so it survives text transports.
pub struct BinarySerializer;

impl Serializer for BinarySerializer {
    fn serialize(&self, frame: &Frame) -> Result<String, TransportError> {
        let payload = bincode::serialize(frame)?;
        Ok(base64::encode(payload))
    }
}

// --- Senders ---

/// Newline-delimited frames on stdout.
pub struct StdioSender {
    stdout: io::Stdout,
}

impl StdioSender {
    pub fn new() -> Self {
        StdioSender {
            stdout: io::stdout(),
        }
    }
}

impl Default for StdioSender {
    fn default() -> Self {
        Self::new()
    }
}

impl Sender for StdioSender {
    fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.stdout.write_all(data)?;
        self.stdout.write_all(b"\n")?;
        self.stdout.flush()?;
        Ok(())
    }
}

// --- Render Surface ---

/// The simulation's drawing surface: builds a frame (clear + one draw per
/// individual, in population order) and pushes it through the configured
/// serializer and sender. One `present` per render pass; the terminal frame
/// gets two.
pub struct RenderSurface {
    serializer: Box<dyn Serializer>,
    sender: Box<dyn Sender>,
    sprites: SpriteCatalog,
    clear: Region,
    entity_size: f32,
    frames_sent: u64,
}

impl RenderSurface {
    pub fn new(
        serializer: Box<dyn Serializer>,
        sender: Box<dyn Sender>,
        sprites: SpriteCatalog,
        clear: Region,
        entity_size: f32,
    ) -> Self {
        RenderSurface {
            serializer,
            sender,
            sprites,
            clear,
            entity_size,
            frames_sent: 0,
        }
    }

    pub fn build_frame(&self, population: &[Individual]) -> Frame {
        let entities = population
            .iter()
            .map(|ind| EntityView {
                x: ind.position.x,
                y: ind.position.y,
                size: self.entity_size,
                kind: ind.kind,
                sprite: self.sprites.sprite(ind.kind).to_string(),
            })
            .collect();
        Frame {
            frame: self.frames_sent,
            clear: self.clear,
            entities,
        }
    }

    pub fn present(&mut self, population: &[Individual]) -> Result<(), TransportError> {
        let frame = self.build_frame(population);
        let data = self.serializer.serialize(&frame)?;
        self.sender.send(data.as_bytes())?;
        self.frames_sent += 1;
        Ok(())
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }
}

// --- WebSocket Sender ---

#[cfg(feature = "websocket")]
mod websocket {
    use super::{Sender, TransportError};
    use futures::{SinkExt, StreamExt};
    use log::{debug, info, warn};
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::net::TcpStream;
    use tokio::runtime::Runtime;
    use tokio::sync::broadcast;
    use tokio_tungstenite::accept_async;
    use tokio_tungstenite::tungstenite::{Error as WsError, Message};

    /// Broadcasts each frame to every connected viewer. Connection handling
    /// lives on a background tokio runtime; the simulation thread only hands
    /// this type bytes.
    pub struct WebSocketSender {
        tx: broadcast::Sender<String>,
        clients: Arc<AtomicUsize>,
        // Keeps the accept loop alive for the lifetime of the sender.
        _runtime: Runtime,
    }

    impl WebSocketSender {
        /// Binds the listener and starts accepting viewers. Binding happens
        /// synchronously so a bad address fails at startup, not mid-run.
        pub fn start(host: &str, port: u16) -> Result<Self, TransportError> {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(|e| TransportError::WebSocket(e.to_string()))?;

            let addr: SocketAddr = format!("{host}:{port}")
                .parse()
                .map_err(|e| TransportError::WebSocket(format!("invalid address: {e}")))?;
            let listener = runtime
                .block_on(tokio::net::TcpListener::bind(addr))
                .map_err(|e| TransportError::WebSocket(format!("bind {addr}: {e}")))?;

            let (tx, _) = broadcast::channel::<String>(16);
            let clients = Arc::new(AtomicUsize::new(0));

            let accept_tx = tx.clone();
            let accept_clients = clients.clone();
            runtime.spawn(async move {
                info!("WebSocket server listening on ws://{addr}");
                loop {
                    match listener.accept().await {
                        Ok((stream, peer)) => {
                            let rx = accept_tx.subscribe();
                            let clients = accept_clients.clone();
                            tokio::spawn(handle_viewer(stream, rx, peer.to_string(), clients));
                        }
                        Err(e) => warn!("failed to accept viewer connection: {e}"),
                    }
                }
            });

            Ok(WebSocketSender {
                tx,
                clients,
                _runtime: runtime,
            })
        }

        pub fn client_count(&self) -> usize {
            self.clients.load(Ordering::Relaxed)
        }
    }

    impl Sender for WebSocketSender {
        fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
            // Nobody watching: dropping the frame is fine, the next one
            // carries the full state anyway.
            if self.client_count() == 0 {
                return Ok(());
            }
            let text = std::str::from_utf8(data)
                .map_err(|e| TransportError::WebSocket(format!("frame is not UTF-8: {e}")))?;
            // An error here means every receiver vanished since the count
            // check, which is just another quiet frame drop.
            let _ = self.tx.send(text.to_string());
            Ok(())
        }
    }

    async fn handle_viewer(
        stream: TcpStream,
        mut rx: broadcast::Receiver<String>,
        peer: String,
        clients: Arc<AtomicUsize>,
    ) {
        let ws = match accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                warn!("WebSocket handshake with {peer} failed: {e}");
                return;
            }
        };
        let count = clients.fetch_add(1, Ordering::Relaxed) + 1;
        info!("viewer connected: {peer} ({count} total)");

        let (mut outgoing, mut incoming) = ws.split();
        loop {
            tokio::select! {
                frame = rx.recv() => match frame {
                    Ok(frame) => {
                        if let Err(e) = outgoing.send(Message::Text(frame)).await {
                            if !is_disconnect(&e) {
                                warn!("send to viewer {peer} failed: {e}");
                            }
                            break;
                        }
                    }
                    // A lagging viewer skips ahead to live frames.
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!("viewer {peer} lagged, skipped {skipped} frames");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                msg = incoming.next() => match msg {
                    // Viewers have nothing to say; drain and ignore.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        if !is_disconnect(&e) {
                            warn!("receive from viewer {peer} failed: {e}");
                        }
                        break;
                    }
                    None => break,
                },
            }
        }

        let count = clients.fetch_sub(1, Ordering::Relaxed) - 1;
        info!("viewer disconnected: {peer} ({count} total)");
    }

    fn is_disconnect(e: &WsError) -> bool {
        match e {
            WsError::ConnectionClosed | WsError::AlreadyClosed => true,
            WsError::Io(io_err) => matches!(
                io_err.kind(),
                std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
            ),
            _ => false,
        }
    }
}

#[cfg(feature = "websocket")]
pub use websocket::WebSocketSender;

#[cfg(test)]
mod tests {
    use super::*;
    use rps_core::Position;

    fn arena() -> Vec<Individual> {
        vec![
            Individual::new(Position::new(200.0, 200.0), Kind::Rock, 0.4),
            Individual::new(Position::new(400.0, 200.0), Kind::Paper, 0.4),
            Individual::new(Position::new(300.0, 400.0), Kind::Scissor, 0.4),
        ]
    }

    fn surface(serializer: Box<dyn Serializer>, sink: SinkSender) -> RenderSurface {
        RenderSurface::new(
            serializer,
            Box::new(sink),
            SpriteCatalog::default(),
            Region {
                x: 0.0,
                y: 0.0,
                width: 800.0,
                height: 600.0,
            },
            16.0,
        )
    }

    /// Test sender that records everything it is asked to deliver.
    #[derive(Clone, Default)]
    struct SinkSender {
        sent: std::rc::Rc<std::cell::RefCell<Vec<String>>>,
    }

    impl Sender for SinkSender {
        fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
            self.sent
                .borrow_mut()
                .push(String::from_utf8(data.to_vec()).unwrap());
            Ok(())
        }
    }

    #[test]
    fn sprite_catalog_lookup() {
        let catalog = SpriteCatalog::default();
        assert_eq!(catalog.sprite(Kind::Rock), "rock.png");
        assert_eq!(catalog.sprite(Kind::Paper), "paper.png");
        assert_eq!(catalog.sprite(Kind::Scissor), "scissor.png");

        let custom = SpriteCatalog::new("r.webp".into(), "p.webp".into(), "s.webp".into());
        assert_eq!(custom.sprite(Kind::Paper), "p.webp");
    }

    #[test]
    fn frames_keep_population_order_and_count_frames() {
        let sink = SinkSender::default();
        let mut surface = surface(Box::new(JsonSerializer), sink.clone());
        let population = arena();

        surface.present(&population).unwrap();
        surface.present(&population).unwrap();
        assert_eq!(surface.frames_sent(), 2);

        let sent = sink.sent.borrow();
        assert_eq!(sent.len(), 2);
        let first: Frame = serde_json::from_str(&sent[0]).unwrap();
        let second: Frame = serde_json::from_str(&sent[1]).unwrap();
        assert_eq!(first.frame, 0);
        assert_eq!(second.frame, 1);
        assert_eq!(first.clear.width, 800.0);
        assert_eq!(first.entities.len(), 3);
        // Draw ops follow population order, not kind order.
        assert_eq!(first.entities[0].kind, Kind::Rock);
        assert_eq!(first.entities[1].kind, Kind::Paper);
        assert_eq!(first.entities[2].kind, Kind::Scissor);
        assert_eq!(first.entities[0].sprite, "rock.png");
        assert_eq!(first.entities[0].size, 16.0);
    }

    #[test]
    fn converted_individual_gets_new_sprite_next_frame() {
        let sink = SinkSender::default();
        let mut surface = surface(Box::new(JsonSerializer), sink.clone());
        let mut population = arena();

        surface.present(&population).unwrap();
        population[0].convert(Kind::Scissor);
        surface.present(&population).unwrap();

        let sent = sink.sent.borrow();
        let before: Frame = serde_json::from_str(&sent[0]).unwrap();
        let after: Frame = serde_json::from_str(&sent[1]).unwrap();
        assert_eq!(before.entities[0].sprite, "rock.png");
        assert_eq!(after.entities[0].sprite, "scissor.png");
    }

    #[test]
    fn binary_frames_decode_through_base64_and_bincode() {
        let sink = SinkSender::default();
        let mut surface = surface(Box::new(BinarySerializer), sink.clone());
        let population = arena();

        let expected = surface.build_frame(&population);
        surface.present(&population).unwrap();

        let sent = sink.sent.borrow();
        let payload = base64::decode(&sent[0]).unwrap();
        let decoded: Frame = bincode::deserialize(&payload).unwrap();
        assert_eq!(decoded, expected);
    }
}
