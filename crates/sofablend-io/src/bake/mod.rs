//! Bake directories: a `scene.json` hierarchy manifest plus one JSON file
//! per (object, frame).

pub mod clock;
pub mod exporter;
pub mod library;
pub mod paths;
pub mod reader;
pub mod selection;
pub mod writer;

pub use clock::{FrameClock, Timing};
pub use exporter::{BakeExporter, ExportOptions, SimulationSource};
pub use library::BakeLibrary;
pub use paths::{frame_file_name, frame_file_path, hash_digest, SCENE_FILE};
pub use reader::{import_bake, load_frame, remove_baked, BakeDirectory, ImportOutcome};
pub use selection::{load_rules, parse_rules, select, FieldSelection, Selected, SelectionRule};
pub use writer::BakeWriter;
