//! Downloads domain - control protocol, selected links, drain cycle

pub mod actions;
pub mod control;
pub mod orchestrator;
pub mod selection;

pub use actions::{request_local_download, request_relay};
pub use control::ControlMessage;
pub use orchestrator::{DownloadOrchestrator, DrainError, DrainReport};
pub use selection::{
    load_save_path, load_selection, save_selection, store_save_path, SAVE_PATH_KEY,
    SELECTED_LINKS_KEY,
};
