//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements / provides | Connects to                 |
//! |----------------|-----------------------|-----------------------------|
//! | `content_file` | ContentStore          | JSON content map on disk    |
//! | `hardware`     | Port registry         | GPIO bank or simulation     |
//! | `log_sink`     | EventSink             | `log` facade                |
//! | `tags`         | Tag table             | network tag server          |

pub mod content_file;
pub mod hardware;
pub mod log_sink;
pub mod tags;
