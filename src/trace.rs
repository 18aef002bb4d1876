use mongodb::{
    bson::{Bson, Document},
    event::command::CommandEvent,
};
use tracing_subscriber::{fmt, EnvFilter};

pub(crate) const COMMAND_TRACING_EVENT_TARGET: &str = "archive_page_count::command";
pub(crate) const MEASUREMENT_TRACING_EVENT_TARGET: &str = "archive_page_count::measure";

/// Commands and replies rendered into log events are cut off after this many bytes unless
/// configured otherwise.
pub const DEFAULT_MAX_DOCUMENT_LENGTH_BYTES: usize = 1000;

pub(crate) trait TracingRepresentation {
    type Representation;

    fn tracing_representation(&self, max_length_bytes: usize) -> Self::Representation;
}

impl TracingRepresentation for Document {
    type Representation = String;

    fn tracing_representation(&self, max_length_bytes: usize) -> String {
        let mut s = Bson::Document(self.clone())
            .into_relaxed_extjson()
            .to_string();
        truncate_on_char_boundary(&mut s, max_length_bytes);
        s
    }
}

impl TracingRepresentation for mongodb::error::Error {
    type Representation = String;

    fn tracing_representation(&self, max_length_bytes: usize) -> String {
        let mut s = self.to_string();
        truncate_on_char_boundary(&mut s, max_length_bytes);
        s
    }
}

/// Truncates `s` to at most `new_length` bytes, rounding up to the end of the character that
/// straddles the cut, and marks the cut with "...". Strings that already fit, or that would only
/// fit by rounding up, are left alone.
pub(crate) fn truncate_on_char_boundary(s: &mut String, new_length: usize) {
    if s.len() <= new_length {
        return;
    }
    let mut cut = new_length;
    while !s.is_char_boundary(cut) {
        cut += 1;
    }
    if cut == s.len() {
        return;
    }
    s.truncate(cut);
    s.push_str("...");
}

/// Listens for the driver's command monitoring events and re-emits them as `tracing` debug
/// events on the command target.
#[derive(Clone, Debug)]
pub(crate) struct CommandLogger {
    max_document_length_bytes: usize,
}

impl CommandLogger {
    pub(crate) fn new(max_document_length_bytes: usize) -> Self {
        Self {
            max_document_length_bytes,
        }
    }

    pub(crate) fn handle(&self, event: CommandEvent) {
        let max = self.max_document_length_bytes;
        match event {
            CommandEvent::Started(event) => {
                tracing::debug!(
                    target: COMMAND_TRACING_EVENT_TARGET,
                    command = event.command.tracing_representation(max),
                    databaseName = event.db.as_str(),
                    commandName = event.command_name.as_str(),
                    requestId = event.request_id,
                    server = %event.connection.address,
                    "Command started"
                );
            }
            CommandEvent::Succeeded(event) => {
                tracing::debug!(
                    target: COMMAND_TRACING_EVENT_TARGET,
                    reply = event.reply.tracing_representation(max),
                    commandName = event.command_name.as_str(),
                    requestId = event.request_id,
                    server = %event.connection.address,
                    durationMS = event.duration.as_millis() as u64,
                    "Command succeeded"
                );
            }
            CommandEvent::Failed(event) => {
                tracing::debug!(
                    target: COMMAND_TRACING_EVENT_TARGET,
                    failure = event.failure.tracing_representation(max),
                    commandName = event.command_name.as_str(),
                    requestId = event.request_id,
                    server = %event.connection.address,
                    durationMS = event.duration.as_millis() as u64,
                    "Command failed"
                );
            }
            #[allow(unreachable_patterns)]
            _ => {}
        }
    }
}

/// The filter applied when `RUST_LOG` is unset.
pub fn default_filter(verbose: bool) -> String {
    if verbose {
        format!("warn,archive_page_count=debug,{COMMAND_TRACING_EVENT_TARGET}=debug")
    } else {
        "warn,archive_page_count=info".to_string()
    }
}

/// Installs the global `tracing` subscriber, writing to stderr. `RUST_LOG` takes precedence over
/// the default filter. Calling this more than once leaves the first subscriber in place.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
