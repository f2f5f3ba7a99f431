//! Spotify Playback Core for Deck Controllers
//!
//! This library provides the playback subsystem of a deck/macro-pad plugin
//! that lets hardware buttons control Spotify playback. It owns the OAuth
//! token lifecycle and a background polling loop that detects playback-state
//! changes and fans them out to registered subscribers.
//!
//! # Modules
//!
//! - `config` - Typed plugin settings and API endpoint configuration
//! - `host` - Capability traits for the host application (settings store,
//!   login window, UI dispatcher)
//! - `management` - High-level controllers for authentication and playback
//! - `retry` - Retry policy for outbound HTTP calls
//! - `spotify` - Spotify Web API client implementation
//! - `types` - Data structures and type definitions
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use spotideck::{config, host, management, retry};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = Arc::new(host::MemorySettingsStore::default());
//!     let window = Arc::new(MyLoginWindow::new());
//!     let auth = Arc::new(management::AuthController::new(
//!         store,
//!         window,
//!         config::ApiEndpoints::default(),
//!         retry::RetryPolicy::default(),
//!     ));
//!     // Build a SpotifyController on top and start polling...
//! }
//! ```

pub mod config;
pub mod host;
pub mod management;
pub mod retry;
pub mod spotify;
pub mod types;

/// A convenient Result type alias for operations that may fail.
///
/// Provides a standard error handling pattern throughout the library
/// using a boxed dynamic error trait object. This allows for flexible
/// error handling while maintaining Send + Sync bounds for async contexts.
///
/// # Type Parameters
///
/// - `T` - The success type returned on successful operations
///
/// # Example
///
/// ```
/// use spotideck::Res;
///
/// fn load_data() -> Res<String> {
///     Ok("data".to_string())
/// }
/// ```
pub type Res<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Prints an informational message with a blue bullet point.
///
/// Creates a formatted output line with a distinctive blue "o" indicator
/// followed by the provided message. Used for general information and
/// status updates throughout the library.
///
/// # Arguments
///
/// The macro accepts the same arguments as `println!`, supporting format
/// strings and interpolation.
///
/// # Example
///
/// ```
/// info!("Opening login window...");
/// info!("Playback state changed on device {}", device_id);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
///
/// Creates a formatted output line with a green "✓" indicator to signify
/// successful completion of operations. Used to provide positive feedback
/// when operations complete successfully.
///
/// # Arguments
///
/// The macro accepts the same arguments as `println!`, supporting format
/// strings and interpolation.
///
/// # Example
///
/// ```
/// success!("Authentication completed successfully");
/// ```
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark.
///
/// Creates a formatted error output with a red "!" indicator. The caller
/// decides how to degrade afterwards; controller methods typically log
/// through this macro and then return a failure value to their caller
/// rather than propagating an error.
///
/// # Arguments
///
/// The macro accepts the same arguments as `println!`, supporting format
/// strings and interpolation.
///
/// # Example
///
/// ```
/// error!("Token exchange failed: {}", err);
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a warning message with a yellow exclamation mark.
///
/// Creates a formatted output line with a yellow "!" indicator to highlight
/// potential issues or important notices that don't abort the current
/// operation. Used for recoverable issues or important information that
/// users should notice.
///
/// # Arguments
///
/// The macro accepts the same arguments as `println!`, supporting format
/// strings and interpolation.
///
/// # Example
///
/// ```
/// warning!("Polling task did not stop within {:?}", grace);
/// ```
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
