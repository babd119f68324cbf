//! What the server does with a decoded message.

use std::sync::{Arc, Mutex, MutexGuard};

use sofablend_core::SceneGraph;
use sofablend_io::{apply_live_message, ApplyReport, LiveMessage};

use crate::error::{Result, ServerError};

/// Consumer of decoded live messages.
///
/// Called from the connection workers, possibly from several threads at
/// once.
pub trait MessageHandler: Send + Sync {
    fn handle(&self, message: LiveMessage) -> Result<ApplyReport>;
}

/// The live scene graph fed by the server.
#[derive(Debug, Default)]
pub struct LiveScene {
    pub graph: SceneGraph,
    /// Iteration of the last applied message.
    pub last_iteration: Option<u64>,
}

/// Scene graph shared between the server and its readers.
pub type SharedScene = Arc<Mutex<LiveScene>>;

/// Lock a shared scene.
pub fn lock_scene(scene: &SharedScene) -> Result<MutexGuard<'_, LiveScene>> {
    scene.lock().map_err(|_| ServerError::Poisoned)
}

/// Applies every message to a shared [`LiveScene`].
///
/// The lock is held for a whole message, so applies never interleave and
/// readers only observe fully applied messages.
#[derive(Debug, Clone, Default)]
pub struct SceneSink {
    scene: SharedScene,
}

impl SceneSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed an existing scene.
    pub fn with_scene(scene: SharedScene) -> Self {
        Self { scene }
    }

    pub fn scene(&self) -> SharedScene {
        Arc::clone(&self.scene)
    }
}

impl MessageHandler for SceneSink {
    fn handle(&self, message: LiveMessage) -> Result<ApplyReport> {
        let mut scene = lock_scene(&self.scene)?;
        let report = apply_live_message(&mut scene.graph, &message);
        scene.last_iteration = Some(message.iteration);
        Ok(report)
    }
}

/// Decode a message body.
pub fn decode_message(body: &[u8]) -> Result<LiveMessage> {
    let text = std::str::from_utf8(body)?;
    Ok(LiveMessage::from_slice(text.as_bytes())?)
}
