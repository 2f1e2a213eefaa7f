//! Static UI and generated audio files.
//!
//! Lookups go to the static directory first and fall through to the output
//! directory, so `/` serves `index.html` and `/generated_<id>.wav` serves a
//! generated file. `ServeDir` refuses paths that escape either directory.

use tower_http::services::ServeDir;

use crate::config::ServerConfig;

pub type StaticFileService = ServeDir<ServeDir>;

pub fn static_file_service(config: &ServerConfig) -> StaticFileService {
    ServeDir::new(&config.static_dir)
        .append_index_html_on_directories(true)
        .fallback(ServeDir::new(&config.output_dir))
}
