use std::env;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::thread;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent},
    terminal,
};
use tracing::{debug, warn};

use crate::error::AIError;

/// How long the interactive key prompt waits before giving up.
const KEY_PROMPT_TIMEOUT: Duration = Duration::from_secs(15);

/// Trait for types that can retrieve their configuration key from environment variables
pub trait KeyFromEnv {
    /// The environment variable name for this client's API key
    const KEY_NAME: &'static str;

    /// Find the API key by checking environment variables first, then .env file
    fn find_key() -> Option<String> {
        let _ = dotenvy::dotenv();
        env::var(Self::KEY_NAME).ok().filter(|k| !k.trim().is_empty())
    }

    /// Find the API key, or read it from the terminal.
    fn find_key_with_user() -> Result<String, AIError> {
        if let Some(key) = Self::find_key() {
            return Ok(key);
        }

        print!(
            "Environment variable {} not found. Please enter the API key ({} second timeout): ",
            Self::KEY_NAME,
            KEY_PROMPT_TIMEOUT.as_secs()
        );
        let _ = io::stdout().flush();

        let (sender, receiver) = std::sync::mpsc::channel();
        thread::spawn(move || {
            let mut input = String::new();
            if io::stdin().read_line(&mut input).is_ok() {
                let _ = sender.send(input.trim().to_string());
            }
        });

        let api_key = match receiver.recv_timeout(KEY_PROMPT_TIMEOUT) {
            Ok(input) if !input.is_empty() => input,
            _ => return Err(AIError::MissingKey(Self::KEY_NAME.to_string())),
        };

        if Self::prompt_save_to_env() {
            match Self::save_to_env_file(&api_key) {
                Ok(()) => println!("API key saved to .env file"),
                Err(e) => warn!(error = %e, "Failed to save API key to .env file"),
            }
        }

        Ok(api_key)
    }

    /// Ask whether the key should be appended to `.env`. Defaults to no.
    fn prompt_save_to_env() -> bool {
        print!("Add {} to .env file? (y/N): ", Self::KEY_NAME);
        let _ = io::stdout().flush();

        if let Ok(answer) = Self::read_single_key() {
            println!("{}", if answer { "y" } else { "n" });
            return answer;
        }

        let mut input = String::new();
        io::stdin().read_line(&mut input).is_ok() && input.trim().eq_ignore_ascii_case("y")
    }

    /// Single keystroke y/n; anything else, or no key within 30s, is "no".
    fn read_single_key() -> io::Result<bool> {
        terminal::enable_raw_mode()?;
        restoring(Self::poll_yes, terminal::disable_raw_mode)
    }

    fn poll_yes() -> io::Result<bool> {
        if !event::poll(Duration::from_secs(30))? {
            return Ok(false);
        }
        Ok(matches!(
            event::read()?,
            Event::Key(KeyEvent { code: KeyCode::Char('y' | 'Y'), .. })
        ))
    }

    /// Append `KEY_NAME=<key>` to `.env` unless the key is already there.
    fn save_to_env_file(api_key: &str) -> io::Result<()> {
        if let Ok(content) = std::fs::read_to_string(".env") {
            if content.contains(&format!("{}=", Self::KEY_NAME)) {
                debug!(key = Self::KEY_NAME, ".env already defines key");
                return Ok(());
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(".env")?;
        file.write_all(format!("{}={}\n", Self::KEY_NAME, api_key).as_bytes())
    }
}

/// Run `body`, then `restore` whether or not `body` failed. The body's error
/// wins over the restore error.
fn restoring<T>(body: impl FnOnce() -> io::Result<T>, restore: impl FnOnce() -> io::Result<()>) -> io::Result<T> {
    let result = body();
    let restored = restore();
    let value = result?;
    restored?;
    Ok(value)
}

/// Resolver-level settings shared by every extraction task.
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// Append the JSON Schema of the task output to the prompt.
    pub schema_guidance: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self { schema_guidance: true }
    }
}

impl ExtractionConfig {
    #[must_use]
    pub const fn with_schema_guidance(mut self, enabled: bool) -> Self {
        self.schema_guidance = enabled;
        self
    }
}
