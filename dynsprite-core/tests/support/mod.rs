//! Shared fakes for cache and atlas integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::{ImageFormat, Rgba, RgbaImage};
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use dynsprite_core::{MainThreadPump, ResourceFetcher, Result, SpriteError};

pub fn png_bytes(width: u32, height: u32, shade: u8) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([shade, shade, shade, 255]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

/// In-process fetcher serving 16x16 PNGs. Counts calls per key, can fail
/// chosen keys, can serve undecodable bytes and can hold every fetch behind a
/// gate.
#[derive(Default)]
pub struct FakeFetcher {
    calls: Mutex<HashMap<String, usize>>,
    failing: Mutex<HashSet<String>>,
    sizes: Mutex<HashMap<String, (u32, u32)>>,
    garbage: Mutex<HashSet<String>>,
    gate: Option<Arc<Semaphore>>,
}

impl FakeFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every fetch waits for a permit from the returned semaphore.
    pub fn gated() -> (Arc<Self>, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let fetcher = Self {
            gate: Some(Arc::clone(&gate)),
            ..Self::default()
        };
        (Arc::new(fetcher), gate)
    }

    pub fn fail(&self, key: &str) {
        self.failing.lock().insert(key.to_string());
    }

    pub fn heal(&self, key: &str) {
        self.failing.lock().remove(key);
        self.garbage.lock().remove(key);
    }

    /// Answer `key` successfully with bytes no decoder accepts.
    pub fn serve_garbage(&self, key: &str) {
        self.garbage.lock().insert(key.to_string());
    }

    pub fn serve_size(&self, key: &str, width: u32, height: u32) {
        self.sizes.lock().insert(key.to_string(), (width, height));
    }

    pub fn calls(&self, key: &str) -> usize {
        self.calls.lock().get(key).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }
}

#[async_trait]
impl ResourceFetcher for FakeFetcher {
    async fn fetch(&self, key: &str) -> Result<Vec<u8>> {
        *self.calls.lock().entry(key.to_string()).or_default() += 1;
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| SpriteError::Internal(e.to_string()))?
                .forget();
        }
        if self.failing.lock().contains(key) {
            return Err(SpriteError::FetchFailed {
                key: key.to_string(),
                reason: "HTTP 503".into(),
            });
        }
        if self.garbage.lock().contains(key) {
            return Ok(b"<html>not found</html>".to_vec());
        }
        let (w, h) = self.sizes.lock().get(key).copied().unwrap_or((16, 16));
        Ok(png_bytes(w, h, 200))
    }
}

/// Drain `pump` until `done` holds, failing the test after two seconds.
pub async fn pump_until<S>(
    pump: &mut MainThreadPump<S>,
    state: &mut S,
    mut done: impl FnMut(&S) -> bool,
) {
    for _ in 0..400 {
        pump.drain(state);
        if done(state) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached while pumping the dispatcher");
}
