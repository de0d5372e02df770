#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use std::time::Duration;

use deskpilot_lib::errors::{DeskError, DeskResult};
use deskpilot_lib::perception::types::ScreenshotMeta;
use deskpilot_lib::platform::{CapturedFrame, DesktopBackend, InputStep};
use image::RgbaImage;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// In-memory desktop: serves a blank frame and records every input step.
pub struct RecordingBackend {
    width: u32,
    height: u32,
    captures: Mutex<usize>,
    steps: Mutex<Vec<InputStep>>,
    perform_delay: Duration,
    reject_input: bool,
}

impl RecordingBackend {
    pub fn new(width: u32, height: u32) -> Arc<Self> {
        Arc::new(Self::build(width, height, Duration::ZERO, false))
    }

    /// Every `perform` blocks for `delay` before recording.
    pub fn slow(width: u32, height: u32, delay: Duration) -> Arc<Self> {
        Arc::new(Self::build(width, height, delay, false))
    }

    /// Every `perform` fails the way a refused OS injection does.
    pub fn rejecting(width: u32, height: u32) -> Arc<Self> {
        Arc::new(Self::build(width, height, Duration::ZERO, true))
    }

    fn build(width: u32, height: u32, perform_delay: Duration, reject_input: bool) -> Self {
        Self {
            width,
            height,
            captures: Mutex::new(0),
            steps: Mutex::new(Vec::new()),
            perform_delay,
            reject_input,
        }
    }

    pub fn captures(&self) -> usize {
        *self.captures.lock().unwrap()
    }

    pub fn steps(&self) -> Vec<InputStep> {
        self.steps.lock().unwrap().clone()
    }

    pub fn take_steps(&self) -> Vec<InputStep> {
        std::mem::take(&mut *self.steps.lock().unwrap())
    }
}

impl DesktopBackend for RecordingBackend {
    fn name(&self) -> &str {
        "recording"
    }

    fn capture(&self) -> DeskResult<CapturedFrame> {
        *self.captures.lock().unwrap() += 1;
        Ok(CapturedFrame {
            image: RgbaImage::new(self.width, self.height),
            meta: ScreenshotMeta {
                monitor_name: "virtual".into(),
                scale_factor: 1.0,
                physical_width: self.width,
                physical_height: self.height,
                logical_width: self.width,
                logical_height: self.height,
            },
        })
    }

    fn perform(&self, steps: &[InputStep]) -> DeskResult<()> {
        std::thread::sleep(self.perform_delay);
        if self.reject_input {
            return Err(DeskError::InputInjectionFailed("input rejected by the session".into()));
        }
        self.steps.lock().unwrap().extend_from_slice(steps);
        Ok(())
    }
}

/// Minimal HTTP detection service on a random local port. `/parse` answers
/// from a queue of canned responses (the last one repeats), `/health`
/// reports a loaded model.
pub struct FakeDetector {
    pub base_url: String,
    parse_requests: Arc<Mutex<Vec<serde_json::Value>>>,
}

impl FakeDetector {
    pub async fn start(responses: Vec<(u16, serde_json::Value)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let queue = Arc::new(Mutex::new(VecDeque::from(responses)));
        let parse_requests = Arc::new(Mutex::new(Vec::new()));

        let seen = Arc::clone(&parse_requests);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let queue = Arc::clone(&queue);
                let seen = Arc::clone(&seen);
                tokio::spawn(async move {
                    let _ = handle(stream, queue, seen).await;
                });
            }
        });

        Self {
            base_url: format!("http://{addr}"),
            parse_requests,
        }
    }

    /// Accepts connections and reads requests but never answers.
    pub async fn silent() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut sink = [0u8; 8192];
                    while let Ok(n) = stream.read(&mut sink).await {
                        if n == 0 {
                            break;
                        }
                    }
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                });
            }
        });

        Self {
            base_url: format!("http://{addr}"),
            parse_requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn parse_requests(&self) -> Vec<serde_json::Value> {
        self.parse_requests.lock().unwrap().clone()
    }
}

async fn handle(
    mut stream: TcpStream,
    queue: Arc<Mutex<VecDeque<(u16, serde_json::Value)>>>,
    seen: Arc<Mutex<Vec<serde_json::Value>>>,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|l| {
            let (name, value) = l.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let request_line = head.lines().next().unwrap_or_default();
    let (status, body) = if request_line.starts_with("GET /health") {
        (200, serde_json::json!({"status": "ok", "device": "cpu", "modelLoaded": true}))
    } else if request_line.starts_with("POST /parse") {
        let body: serde_json::Value =
            serde_json::from_slice(&buf[header_end..]).unwrap_or(serde_json::Value::Null);
        seen.lock().unwrap().push(body);
        let mut q = queue.lock().unwrap();
        if q.len() > 1 {
            q.pop_front().unwrap()
        } else {
            q.front().cloned().unwrap_or((500, serde_json::json!({"error": "no canned response"})))
        }
    } else {
        (404, serde_json::json!({"error": "not found"}))
    };

    let payload = body.to_string();
    let response = format!(
        "HTTP/1.1 {status} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{payload}",
        if status == 200 { "OK" } else { "Error" },
        payload.len(),
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

/// A successful `/parse` body with one labelled element per `(label, bbox)`.
pub fn parse_body(width: u32, height: u32, elements: &[(&str, [f64; 4])]) -> serde_json::Value {
    let elements: Vec<_> = elements
        .iter()
        .enumerate()
        .map(|(id, (label, bbox))| {
            serde_json::json!({
                "id": id,
                "content": {
                    "type": "text",
                    "bbox": bbox,
                    "interactivity": true,
                    "content": label,
                    "source": "box_ocr_content_ocr"
                }
            })
        })
        .collect();
    serde_json::json!({
        "success": true,
        "image_size": {"width": width, "height": height},
        "element_count": elements.len(),
        "elements": elements,
    })
}

/// A blank PNG of the given size, base64-encoded.
pub fn png_base64(width: u32, height: u32) -> String {
    use base64::Engine as _;

    let mut png = Vec::new();
    RgbaImage::new(width, height)
        .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        .unwrap();
    base64::engine::general_purpose::STANDARD.encode(png)
}
